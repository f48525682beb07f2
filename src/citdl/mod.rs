//! CITDL expression tokenizer.
//!
//! CITDL (Code Intelligence Type Definition Language) is the deferred
//! type-expression mini-language attached to variables, return types and
//! inheritance edges by the scanners. An expression such as
//! `foo.bar(baz).qux` tokenizes into `foo`, `bar`, `(baz)`, `qux`:
//! `.`-separated identifiers are individual tokens and a parenthesized
//! argument list is one atomic call token (nested parens included in full).

use std::fmt;

/// One token of a CITDL expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    /// An identifier segment.
    Name(String),
    /// A call-argument list, parens included (e.g. `(a, b(c))`).
    Call(String),
}

impl Token {
    pub fn as_str(&self) -> &str {
        match self {
            Token::Name(s) | Token::Call(s) => s,
        }
    }

    pub fn is_call(&self) -> bool {
        matches!(self, Token::Call(_))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tokenize a CITDL expression.
///
/// Scans left to right tracking paren nesting depth; while depth > 0 all
/// characters accumulate into the current call token, at depth 0 the text
/// splits on `.`. A leading `.` yields an empty leading name token, which
/// callers strip; empty segments elsewhere (consecutive dots, the dot after
/// a call token) are dropped.
pub fn tokenize(expr: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut name = String::new();
    let mut call = String::new();
    let mut depth = 0usize;

    for ch in expr.chars() {
        if depth > 0 {
            call.push(ch);
            match ch {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        tokens.push(Token::Call(std::mem::take(&mut call)));
                    }
                }
                _ => {}
            }
            continue;
        }
        match ch {
            '.' => {
                if !name.is_empty() || tokens.is_empty() {
                    tokens.push(Token::Name(std::mem::take(&mut name)));
                } else {
                    name.clear();
                }
            }
            '(' => {
                if !name.is_empty() {
                    tokens.push(Token::Name(std::mem::take(&mut name)));
                }
                call.push('(');
                depth = 1;
            }
            _ => name.push(ch),
        }
    }
    if !name.is_empty() {
        tokens.push(Token::Name(name));
    }
    // An unterminated call token still counts; the resolver will fail to
    // apply it, which beats silently dropping text.
    if !call.is_empty() {
        tokens.push(Token::Call(call));
    }
    tokens
}

/// Re-join tokens into an equivalent resolvable expression.
pub fn join(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(Token::as_str)
        .collect::<Vec<_>>()
        .join(".")
}

/// Split a call token's argument list on top-level commas.
///
/// `"(a, b(c, d))"` yields `["a", "b(c, d)"]`; an empty list yields no
/// arguments.
pub fn call_args(call_token: &str) -> Vec<&str> {
    let inner = call_token
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or(call_token);
    if inner.trim().is_empty() {
        return Vec::new();
    }
    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, ch) in inner.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                args.push(inner[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    args.push(inner[start..].trim());
    args
}
