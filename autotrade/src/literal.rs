//! Textual form of tuple lists stored in configuration options.
//!
//! `[('click', '10, 20'), ('write_share_size',)]` is a bracketed list of
//! parenthesised tuples. A 1-tuple carries no value; a 2-tuple carries one.
//! Strings may be single or double quoted; bare numbers and nested tuples are
//! accepted as values and kept as their text.

use crate::errors::AutomationError;
use std::fmt;

/// One `(key, value)` or `(key,)` element of a tuple list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TupleEntry {
    pub key: String,
    pub value: Option<String>,
}

impl TupleEntry {
    pub fn new(key: impl Into<String>, value: Option<String>) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    /// Empty input means "no value" and yields a 1-tuple.
    pub fn from_input(key: impl Into<String>, value: &str) -> Self {
        let value = value.trim();
        Self::new(key, (!value.is_empty()).then(|| value.to_string()))
    }
}

impl fmt::Display for TupleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "({}, {})", quote(&self.key), quote(value)),
            None => write!(f, "({},)", quote(&self.key)),
        }
    }
}

pub fn format_tuple_list(entries: &[TupleEntry]) -> String {
    let items: Vec<String> = entries.iter().map(ToString::to_string).collect();
    format!("[{}]", items.join(", "))
}

pub fn format_string_list(items: &[String]) -> String {
    let items: Vec<String> = items.iter().map(|item| quote(item)).collect();
    format!("[{}]", items.join(", "))
}

pub fn parse_tuple_list(text: &str) -> Result<Vec<TupleEntry>, AutomationError> {
    let Literal::List(items) = parse_literal(text)? else {
        return Err(parse_error(text, "expected a list"));
    };
    items
        .into_iter()
        .map(|item| match item {
            Literal::Tuple(mut fields) if (1..=2).contains(&fields.len()) => {
                let value = if fields.len() == 2 {
                    fields.pop().and_then(Literal::into_text)
                } else {
                    None
                };
                let key = fields
                    .pop()
                    .and_then(Literal::into_text)
                    .ok_or_else(|| parse_error(text, "tuple key must be a string"))?;
                Ok(TupleEntry { key, value })
            }
            _ => Err(parse_error(text, "list items must be 1- or 2-tuples")),
        })
        .collect()
}

pub fn parse_string_list(text: &str) -> Result<Vec<String>, AutomationError> {
    let Literal::List(items) = parse_literal(text)? else {
        return Err(parse_error(text, "expected a list"));
    };
    items
        .into_iter()
        .map(|item| {
            item.into_text()
                .ok_or_else(|| parse_error(text, "list items must be strings"))
        })
        .collect()
}

fn quote(s: &str) -> String {
    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push('\'');
    for c in s.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '\'' => quoted.push_str("\\'"),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            c => quoted.push(c),
        }
    }
    quoted.push('\'');
    quoted
}

fn parse_error(text: &str, reason: &str) -> AutomationError {
    AutomationError::Parse(format!("{reason} in '{text}'"))
}

#[derive(Debug, Clone, PartialEq)]
enum Literal {
    Str(String),
    Bare(String),
    None,
    Tuple(Vec<Literal>),
    List(Vec<Literal>),
}

impl Literal {
    /// Scalar and tuple values as argument text; `None` stays absent.
    fn into_text(self) -> Option<String> {
        match self {
            Literal::Str(s) | Literal::Bare(s) => Some(s),
            Literal::None => None,
            Literal::Tuple(items) | Literal::List(items) => {
                let parts: Vec<String> = items
                    .into_iter()
                    .map(|item| item.into_text().unwrap_or_default())
                    .collect();
                Some(format!("({})", parts.join(", ")))
            }
        }
    }
}

fn parse_literal(text: &str) -> Result<Literal, AutomationError> {
    let mut parser = Parser {
        chars: text.chars().collect(),
        pos: 0,
        text,
    };
    let literal = parser.value()?;
    parser.skip_whitespace();
    if parser.pos != parser.chars.len() {
        return Err(parse_error(text, "trailing characters"));
    }
    Ok(literal)
}

struct Parser<'a> {
    chars: Vec<char>,
    pos: usize,
    text: &'a str,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn value(&mut self) -> Result<Literal, AutomationError> {
        self.skip_whitespace();
        match self.peek() {
            Some('[') => {
                self.pos += 1;
                let (items, _) = self.sequence(']')?;
                Ok(Literal::List(items))
            }
            Some('(') => {
                self.pos += 1;
                let (mut items, saw_comma) = self.sequence(')')?;
                // `('a')` is just a parenthesised string, as in Python.
                if items.len() == 1 && !saw_comma {
                    Ok(items.remove(0))
                } else {
                    Ok(Literal::Tuple(items))
                }
            }
            Some(quote @ ('\'' | '"')) => {
                self.pos += 1;
                self.string(quote).map(Literal::Str)
            }
            Some(_) => {
                let start = self.pos;
                while self
                    .peek()
                    .is_some_and(|c| !matches!(c, ',' | ')' | ']') && !c.is_whitespace())
                {
                    self.pos += 1;
                }
                let word: String = self.chars[start..self.pos].iter().collect();
                match word.as_str() {
                    "" => Err(parse_error(self.text, "expected a value")),
                    "None" => Ok(Literal::None),
                    _ => Ok(Literal::Bare(word)),
                }
            }
            None => Err(parse_error(self.text, "unexpected end of input")),
        }
    }

    /// Items up to `close`, returning whether any separating comma was seen.
    fn sequence(&mut self, close: char) -> Result<(Vec<Literal>, bool), AutomationError> {
        let mut items = Vec::new();
        let mut saw_comma = false;
        loop {
            self.skip_whitespace();
            if self.peek() == Some(close) {
                self.pos += 1;
                return Ok((items, saw_comma));
            }
            items.push(self.value()?);
            self.skip_whitespace();
            match self.peek() {
                Some(',') => {
                    self.pos += 1;
                    saw_comma = true;
                }
                Some(c) if c == close => {}
                _ => return Err(parse_error(self.text, &format!("expected ',' or '{close}'"))),
            }
        }
    }

    fn string(&mut self, quote: char) -> Result<String, AutomationError> {
        let mut out = String::new();
        loop {
            let Some(c) = self.peek() else {
                return Err(parse_error(self.text, "unterminated string"));
            };
            self.pos += 1;
            match c {
                '\\' => {
                    let escaped = self
                        .peek()
                        .ok_or_else(|| parse_error(self.text, "dangling escape"))?;
                    self.pos += 1;
                    match escaped {
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        '\\' | '\'' | '"' => out.push(escaped),
                        // Unknown escapes keep their backslash.
                        other => {
                            out.push('\\');
                            out.push(other);
                        }
                    }
                }
                c if c == quote => return Ok(out),
                c => out.push(c),
            }
        }
    }
}
