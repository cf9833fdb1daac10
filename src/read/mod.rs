//! The reader: turns a character stream into `Value` trees, one expression
//! per call.

mod lexer;

use std::io::BufRead;

use num::complex::Complex64;

use crate::error::Error;
use crate::value::{intern, Value};

use self::lexer::{Lexer, Token};

/// Read a single expression from a string. Errors on empty input; trailing
/// text is ignored.
pub fn read(input: &str) -> Result<Value, Error> {
    Reader::new(input.as_bytes())
        .read()?
        .ok_or_else(|| Error::Syntax("unexpected end of input".to_string()))
}

pub struct Reader<R> {
    lexer: Lexer<R>,
}

impl<R: BufRead> Reader<R> {
    pub fn new(input: R) -> Reader<R> {
        Reader {
            lexer: Lexer::new(input),
        }
    }

    /// Drop buffered input after a syntax error, so the next `read` starts
    /// on a fresh line.
    pub fn discard_line(&mut self) {
        self.lexer.discard_line();
    }

    /// Pull one expression from the source; `None` at end of input.
    pub fn read(&mut self) -> Result<Option<Value>, Error> {
        match self.lexer.next_token()? {
            None => Ok(None),
            Some(token) => self.read_form(token).map(Some),
        }
    }

    fn read_form(&mut self, token: Token) -> Result<Value, Error> {
        match token {
            Token::LeftParen => self.read_list(),
            Token::RightParen => Err(Error::Syntax("unexpected )".to_string())),
            Token::Quote => self.read_quoted("quote"),
            Token::Quasiquote => self.read_quoted("quasiquote"),
            Token::Unquote => self.read_quoted("unquote"),
            Token::UnquoteSplicing => self.read_quoted("unquote-splicing"),
            Token::Str(s) => Ok(Value::Str(s)),
            Token::Atom(text) => Ok(atom(&text)),
        }
    }

    fn read_quoted(&mut self, marker: &str) -> Result<Value, Error> {
        let token = self
            .lexer
            .next_token()?
            .ok_or_else(|| Error::Syntax(format!("unexpected end of input after {}", marker)))?;
        let form = self.read_form(token)?;
        Ok(Value::list(vec![Value::Symbol(intern(marker)), form]))
    }

    fn read_list(&mut self) -> Result<Value, Error> {
        let mut items = Vec::new();
        loop {
            match self.lexer.next_token()? {
                None => return Err(Error::Syntax("unexpected end of input in list".to_string())),
                Some(Token::RightParen) => return Ok(Value::list(items)),
                Some(token) => items.push(self.read_form(token)?),
            }
        }
    }
}

/// Classify a bare token: `#t`/`#f`, then integer, float, complex (`N+Mi`),
/// and finally an interned symbol.
fn atom(text: &str) -> Value {
    match text {
        "#t" => return Value::Bool(true),
        "#f" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(n) = text.parse::<i64>() {
        Value::Exact(n)
    } else if let Ok(x) = text.parse::<f64>() {
        Value::Inexact(x)
    } else if let Ok(z) = text.parse::<Complex64>() {
        Value::Complex(z)
    } else {
        Value::Symbol(intern(text))
    }
}
