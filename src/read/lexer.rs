use std::io::BufRead;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::Error;

/// One lexical token. Punctuation that can never be part of a bare atom gets
/// its own variant; bare atoms are classified further by the reader.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    LeftParen,
    RightParen,
    Quote,
    Quasiquote,
    Unquote,
    UnquoteSplicing,
    Str(String),
    Atom(String),
}

lazy_static! {
    // One token per match: splicing unquote, single-character punctuation, a
    // complete string literal, a comment to end of line, or a bare atom.
    static ref TOKEN: Regex =
        Regex::new(r#"^\s*(,@|[('`,)]|"(?:\\.|[^\\"])*"|;.*|[^\s('"`,;)]*)"#).unwrap();
}

/// Line-buffered lexer over any `BufRead` source.
pub struct Lexer<R> {
    input: R,
    line: String,
}

impl<R: BufRead> Lexer<R> {
    pub fn new(input: R) -> Lexer<R> {
        Lexer {
            input,
            line: String::new(),
        }
    }

    /// Drop whatever remains of the current line. Drivers call this after a
    /// syntax error so the next read starts on fresh input.
    pub fn discard_line(&mut self) {
        self.line.clear();
    }

    /// The next token, refilling the line buffer as needed; `None` at end of
    /// input.
    pub fn next_token(&mut self) -> Result<Option<Token>, Error> {
        loop {
            if self.line.is_empty() && self.input.read_line(&mut self.line)? == 0 {
                return Ok(None);
            }
            let matched = match TOKEN.captures(&self.line).and_then(|c| c.get(1)) {
                Some(matched) => matched,
                None => {
                    let bad = self.line.trim().to_string();
                    self.line.clear();
                    return Err(Error::Syntax(format!("unlexable input: {:?}", bad)));
                }
            };
            let text = matched.as_str().to_string();
            let rest = self.line[matched.end()..].to_string();
            if text.is_empty() {
                // An empty match with text left over means the remainder
                // cannot start any token: an unterminated string literal.
                if !rest.trim().is_empty() {
                    self.line.clear();
                    return Err(Error::Syntax(format!(
                        "malformed token near {:?}",
                        rest.trim()
                    )));
                }
                self.line.clear();
                continue;
            }
            self.line = rest;
            if text.starts_with(';') {
                continue;
            }
            return classify(text).map(Some);
        }
    }
}

fn classify(text: String) -> Result<Token, Error> {
    Ok(match text.as_str() {
        "(" => Token::LeftParen,
        ")" => Token::RightParen,
        "'" => Token::Quote,
        "`" => Token::Quasiquote,
        "," => Token::Unquote,
        ",@" => Token::UnquoteSplicing,
        _ if text.starts_with('"') => Token::Str(decode_string(&text)?),
        _ => Token::Atom(text),
    })
}

fn decode_string(text: &str) -> Result<String, Error> {
    let body = &text[1..text.len() - 1];
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some(other) => {
                return Err(Error::Syntax(format!(
                    "unknown string escape \\{} in {}",
                    other, text
                )))
            }
            None => {
                return Err(Error::Syntax(format!("dangling string escape in {}", text)))
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod test {
    use super::{Lexer, Token};
    use crate::error::Error;

    fn tokens(input: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(input.as_bytes());
        let mut out = Vec::new();
        while let Some(token) = lexer.next_token().unwrap() {
            out.push(token);
        }
        out
    }

    #[test]
    fn basic_tokens() {
        assert_eq!(
            tokens("(x y)"),
            vec![
                Token::LeftParen,
                Token::Atom("x".to_string()),
                Token::Atom("y".to_string()),
                Token::RightParen,
            ]
        );
    }

    #[test]
    fn quote_punctuation() {
        assert_eq!(
            tokens("'a `b ,c ,@d"),
            vec![
                Token::Quote,
                Token::Atom("a".to_string()),
                Token::Quasiquote,
                Token::Atom("b".to_string()),
                Token::Unquote,
                Token::Atom("c".to_string()),
                Token::UnquoteSplicing,
                Token::Atom("d".to_string()),
            ]
        );
    }

    #[test]
    fn comments_run_to_end_of_line() {
        assert_eq!(
            tokens("1 ; the rest is ignored (even parens\n2"),
            vec![Token::Atom("1".to_string()), Token::Atom("2".to_string())]
        );
    }

    #[test]
    fn string_tokens_decode_escapes() {
        assert_eq!(
            tokens(r#""a\nb" "q\"q""#),
            vec![
                Token::Str("a\nb".to_string()),
                Token::Str("q\"q".to_string()),
            ]
        );
    }

    #[test]
    fn unterminated_string_is_a_syntax_error() {
        let mut lexer = Lexer::new("\"oops".as_bytes());
        assert!(matches!(lexer.next_token(), Err(Error::Syntax(_))));
    }

    #[test]
    fn punctuation_splits_atoms() {
        assert_eq!(
            tokens("a(b"),
            vec![
                Token::Atom("a".to_string()),
                Token::LeftParen,
                Token::Atom("b".to_string()),
            ]
        );
    }
}
