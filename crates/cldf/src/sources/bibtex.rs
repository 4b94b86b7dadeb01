//! A small BibTeX reader and writer.
//!
//! Supports `@genre{key, field = {value}, field = "value", field = 123}`
//! records with nested braces. `@comment`, `@preamble` and `@string` blocks
//! are skipped and string macros are kept verbatim.

use std::fmt::Write as _;

use indexmap::IndexMap;

use crate::error::{CldfError, Result};

/// One bibliography record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    /// Entry type, lowercased (`book`, `article`, `misc`, ...).
    pub genre: String,
    /// Citation key.
    pub id: String,
    /// Fields in file order; names are lowercased.
    pub fields: IndexMap<String, String>,
}

impl Source {
    pub fn new(genre: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            genre: genre.into().to_lowercase(),
            id: id.into(),
            fields: IndexMap::new(),
        }
    }

    pub fn with_field(mut self, name: &str, value: impl Into<String>) -> Self {
        self.fields.insert(name.to_lowercase(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// The record as BibTeX text.
    pub fn to_bibtex(&self) -> String {
        let mut out = format!("@{}{{{}", self.genre, self.id);
        for (name, value) in &self.fields {
            if !value.is_empty() {
                let _ = write!(out, ",\n    {} = {{{}}}", name, value);
            }
        }
        out.push_str("\n}\n");
        out
    }
}

struct Scanner {
    chars: Vec<char>,
    pos: usize,
    line: usize,
}

impl Scanner {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
            line: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn error(&self, message: impl Into<String>) -> CldfError {
        CldfError::Bibtex {
            line: self.line,
            message: message.into(),
        }
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        self.skip_ws();
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(self.error(format!("expected '{}', found '{}'", expected, c))),
            None => Err(self.error(format!("expected '{}', found end of input", expected))),
        }
    }

    /// Read up to (not including) any of `stops`, trimmed.
    fn read_until(&mut self, stops: &[char]) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if stops.contains(&c) {
                break;
            }
            out.push(c);
            self.bump();
        }
        out.trim().to_string()
    }

    /// Read a brace-delimited value; the opening brace is already consumed.
    fn read_braced(&mut self) -> Result<String> {
        let mut depth = 1;
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('{') => {
                    depth += 1;
                    out.push('{');
                }
                Some('}') => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(out);
                    }
                    out.push('}');
                }
                Some(c) => out.push(c),
                None => return Err(self.error("unbalanced braces")),
            }
        }
    }

    fn read_quoted(&mut self) -> Result<String> {
        let mut depth = 0;
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('"') if depth == 0 => return Ok(out),
                Some('{') => {
                    depth += 1;
                    out.push('{');
                }
                Some('}') => {
                    depth -= 1;
                    out.push('}');
                }
                Some(c) => out.push(c),
                None => return Err(self.error("unterminated quoted value")),
            }
        }
    }

    fn read_value(&mut self) -> Result<String> {
        self.skip_ws();
        match self.peek() {
            Some('{') => {
                self.bump();
                self.read_braced()
            }
            Some('"') => {
                self.bump();
                self.read_quoted()
            }
            Some(_) => Ok(self.read_until(&[',', '}', ')'])),
            None => Err(self.error("missing field value")),
        }
    }

    /// Skip a block whose opening delimiter is next.
    fn skip_block(&mut self) -> Result<()> {
        self.skip_ws();
        match self.bump() {
            Some('{') => self.read_braced().map(|_| ()),
            Some('(') => {
                self.read_until(&[')']);
                self.expect(')')
            }
            _ => Ok(()),
        }
    }

    fn read_entry(&mut self, genre: String) -> Result<Source> {
        self.skip_ws();
        let close = match self.bump() {
            Some('{') => '}',
            Some('(') => ')',
            _ => return Err(self.error(format!("expected '{{' after @{}", genre))),
        };
        let key = self.read_until(&[',', close]);
        if key.is_empty() {
            return Err(self.error("missing citation key"));
        }
        let mut source = Source::new(genre, key);
        loop {
            self.skip_ws();
            match self.bump() {
                Some(c) if c == close => return Ok(source),
                Some(',') => {}
                Some(c) => return Err(self.error(format!("unexpected '{}'", c))),
                None => return Err(self.error("unterminated entry")),
            }
            self.skip_ws();
            if self.peek() == Some(close) {
                continue;
            }
            let name = self.read_until(&['=', ',', close]);
            self.expect('=')?;
            let value = self.read_value()?;
            source.fields.insert(name.to_lowercase(), value);
        }
    }
}

/// Parse BibTeX text into records, in file order.
pub fn parse(text: &str) -> Result<Vec<Source>> {
    let mut scanner = Scanner::new(text);
    let mut sources = Vec::new();
    while let Some(c) = scanner.bump() {
        if c != '@' {
            continue;
        }
        let genre = scanner.read_until(&['{', '(']).to_lowercase();
        match genre.as_str() {
            "comment" | "preamble" | "string" => {
                scanner.skip_block()?;
                continue;
            }
            "" => return Err(scanner.error("missing entry type")),
            _ => {}
        }
        sources.push(scanner.read_entry(genre)?);
    }
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BIB: &str = r#"
@comment{ignored {nested} }
@Book{Meier2005,
    Author = {Hans Meier},
    title = {The {Big} Book},
    year = 2005,
    note = "a {quoted} note",
}
@misc(1234, glottolog_id = {1234})
"#;

    #[test]
    fn test_parse() {
        let sources = parse(BIB).unwrap();
        assert_eq!(sources.len(), 2);
        let book = &sources[0];
        assert_eq!(book.genre, "book");
        assert_eq!(book.id, "Meier2005");
        assert_eq!(book.get("author"), Some("Hans Meier"));
        assert_eq!(book.get("title"), Some("The {Big} Book"));
        assert_eq!(book.get("year"), Some("2005"));
        assert_eq!(book.get("note"), Some("a {quoted} note"));
        assert_eq!(sources[1].get("glottolog_id"), Some("1234"));
    }

    #[test]
    fn test_unbalanced_reports_line() {
        let err = parse("\n\n@book{x, title = {open").unwrap_err();
        match err {
            CldfError::Bibtex { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_write_then_parse() {
        let source = Source::new("article", "key-1").with_field("title", "On {X}");
        let parsed = parse(&source.to_bibtex()).unwrap();
        assert_eq!(parsed, vec![source]);
    }
}
