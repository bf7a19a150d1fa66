//! XML reader producing the raw element tree

use indexmap::IndexMap;
use tracing::trace;

use crate::error::{Error, ErrorKind, Pos, Result, Span};
use crate::xml::cursor::Cursor;
use crate::xml::model::{Content, Element};

/// Limits applied while reading a document
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// Maximum element nesting depth (0 means unlimited)
    pub max_depth: usize,
    /// Maximum input size in bytes (0 means unlimited)
    pub max_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_depth: 256,
            max_size: 64 * 1024 * 1024, // 64 MiB
        }
    }
}

impl Config {
    pub const fn unlimited() -> Self {
        Self {
            max_depth: 0,
            max_size: 0,
        }
    }

    pub const fn new(max_depth: usize, max_size: usize) -> Self {
        Self {
            max_depth,
            max_size,
        }
    }
}

#[derive(Debug)]
pub struct Parser<'a> {
    cursor: Cursor<'a>,
    config: Config,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self::with_config(input, Config::default())
    }

    pub fn with_config(input: &'a [u8], config: Config) -> Self {
        Self {
            cursor: Cursor::new(input),
            config,
            depth: 0,
        }
    }

    /// Read one document: optional prolog, exactly one root element, and
    /// trailing comments or processing instructions.
    pub fn parse(&mut self) -> Result<Element> {
        let size = self.cursor.remaining().len();
        if self.config.max_size != 0 && size > self.config.max_size {
            return Err(Error::new(
                ErrorKind::MaxSizeExceeded {
                    max: self.config.max_size,
                },
                Span::empty(),
            ));
        }

        self.skip_misc(true)?;
        if self.cursor.is_eof() {
            return Err(self.error_here("missing root element"));
        }

        let root = self.parse_element()?;
        self.skip_misc(false)?;

        if !self.cursor.is_eof() {
            return Err(self.error_here("unexpected content after root element"));
        }

        Ok(root)
    }

    /// Skip whitespace, comments, processing instructions and (in the
    /// prolog only) a DOCTYPE declaration.
    fn skip_misc(&mut self, prolog: bool) -> Result<()> {
        loop {
            self.cursor.skip_whitespace();
            if self.cursor.starts_with(b"<?") {
                self.skip_processing_instruction()?;
            } else if self.cursor.starts_with(b"<!--") {
                self.skip_comment()?;
            } else if prolog && self.cursor.starts_with(b"<!DOCTYPE") {
                self.skip_doctype()?;
            } else {
                return Ok(());
            }
        }
    }

    fn parse_element(&mut self) -> Result<Element> {
        self.expect_byte(b'<')?;

        self.depth += 1;
        if self.config.max_depth != 0 && self.depth > self.config.max_depth {
            let pos = self.cursor.position();
            return Err(Error::new(
                ErrorKind::MaxDepthExceeded {
                    max: self.config.max_depth,
                },
                Span::point(pos),
            ));
        }

        let name = self.parse_name()?;
        let attributes = self.parse_attributes()?;

        if self.cursor.consume(b'/') {
            self.expect_byte(b'>')?;
            self.depth -= 1;
            return Ok(Element {
                name,
                attributes,
                children: Vec::new(),
            });
        }
        self.expect_byte(b'>')?;

        let mut children = Vec::new();
        loop {
            if self.cursor.starts_with(b"</") {
                self.cursor.advance_by(2);
                let close_name = self.parse_name()?;
                if close_name != name {
                    return Err(self.error_here(&format!(
                        "mismatched closing tag: expected </{name}>, found </{close_name}>"
                    )));
                }
                self.cursor.skip_whitespace();
                self.expect_byte(b'>')?;
                break;
            }

            if self.cursor.starts_with(b"<!--") {
                self.skip_comment()?;
            } else if self.cursor.starts_with(b"<![CDATA[") {
                if let Some(text) = self.parse_cdata()? {
                    children.push(Content::Text(text));
                }
            } else if self.cursor.starts_with(b"<?") {
                self.skip_processing_instruction()?;
            } else if self.cursor.starts_with(b"<!") {
                return Err(self.error_here("markup declaration inside element"));
            } else if self.cursor.current() == Some(b'<') {
                children.push(Content::Element(self.parse_element()?));
            } else if self.cursor.is_eof() {
                return Err(self.error_here(&format!("unclosed element <{name}>")));
            } else if let Some(text) = self.parse_text()? {
                children.push(Content::Text(text));
            }
        }

        self.depth -= 1;
        trace!(element = %name, children = children.len(), "closed element");
        Ok(Element {
            name,
            attributes,
            children,
        })
    }

    fn parse_attributes(&mut self) -> Result<IndexMap<String, String>> {
        let mut attrs = IndexMap::new();

        loop {
            let had_space = matches!(
                self.cursor.current(),
                Some(b' ' | b'\t' | b'\r' | b'\n')
            );
            self.cursor.skip_whitespace();
            match self.cursor.current() {
                Some(b'/' | b'>') => break,
                Some(_) if !had_space => {
                    return Err(self.error_here("expected whitespace before attribute"));
                }
                Some(_) => {}
                None => return Err(self.error_here("unexpected end of input in tag")),
            }

            let name = self.parse_name()?;
            self.cursor.skip_whitespace();
            self.expect_byte(b'=')?;
            self.cursor.skip_whitespace();
            let value = self.parse_attribute_value()?;

            if attrs.contains_key(&name) {
                return Err(self.error_here(&format!("duplicate attribute: {name}")));
            }
            attrs.insert(name, value);
        }

        Ok(attrs)
    }

    fn parse_attribute_value(&mut self) -> Result<String> {
        let quote = match self.cursor.current() {
            Some(q @ (b'"' | b'\'')) => q,
            _ => return Err(self.error_here("expected quoted attribute value")),
        };
        self.cursor.advance();

        let start_pos = self.cursor.position();
        let start = self.cursor.pos();
        while let Some(b) = self.cursor.current() {
            if b == quote {
                let raw = self.cursor.slice_from(start);
                self.cursor.advance();
                return decode_entities(bytes_to_str(raw, start_pos)?, start_pos);
            }
            if b == b'<' {
                return Err(self.error_here("'<' not allowed in attribute value"));
            }
            self.cursor.advance();
        }

        Err(self.error_here("unterminated attribute value"))
    }

    fn parse_text(&mut self) -> Result<Option<String>> {
        let start_pos = self.cursor.position();
        let start = self.cursor.pos();
        while let Some(b) = self.cursor.current() {
            if b == b'<' {
                break;
            }
            self.cursor.advance();
        }

        let raw = self.cursor.slice_from(start);
        let text = decode_entities(bytes_to_str(raw, start_pos)?, start_pos)?;

        if text.trim().is_empty() {
            Ok(None)
        } else {
            Ok(Some(text))
        }
    }

    fn parse_cdata(&mut self) -> Result<Option<String>> {
        let start_pos = self.cursor.position();
        self.cursor.advance_by(b"<![CDATA[".len());
        let Some(raw) = self.cursor.take_until(b"]]>") else {
            return Err(Error::malformed(start_pos, "unterminated CDATA section"));
        };
        let text = bytes_to_str(raw, start_pos)?;
        if text.trim().is_empty() {
            Ok(None)
        } else {
            Ok(Some(text.to_string()))
        }
    }

    fn parse_name(&mut self) -> Result<String> {
        let start_pos = self.cursor.position();
        let start = self.cursor.pos();

        match self.cursor.current() {
            Some(first) if is_name_start(first) => self.cursor.advance(),
            _ => return Err(Error::malformed(start_pos, "expected name")),
        }
        while let Some(b) = self.cursor.current() {
            if is_name_char(b) {
                self.cursor.advance();
            } else {
                break;
            }
        }

        bytes_to_str(self.cursor.slice_from(start), start_pos).map(str::to_string)
    }

    fn skip_comment(&mut self) -> Result<()> {
        let start = self.cursor.position();
        self.cursor.advance_by(b"<!--".len());
        self.cursor
            .take_until(b"-->")
            .map(|_| ())
            .ok_or_else(|| Error::malformed(start, "unterminated comment"))
    }

    fn skip_processing_instruction(&mut self) -> Result<()> {
        let start = self.cursor.position();
        self.cursor.advance_by(b"<?".len());
        self.cursor
            .take_until(b"?>")
            .map(|_| ())
            .ok_or_else(|| Error::malformed(start, "unterminated processing instruction"))
    }

    fn skip_doctype(&mut self) -> Result<()> {
        let start = self.cursor.position();
        let mut brackets = 0usize;
        while let Some(b) = self.cursor.current() {
            self.cursor.advance();
            match b {
                b'[' => brackets += 1,
                b']' => brackets = brackets.saturating_sub(1),
                b'>' if brackets == 0 => return Ok(()),
                _ => {}
            }
        }
        Err(Error::malformed(start, "unterminated DOCTYPE declaration"))
    }

    fn expect_byte(&mut self, expected: u8) -> Result<()> {
        if self.cursor.consume(expected) {
            Ok(())
        } else {
            Err(self.error_here(&format!("expected '{}'", char::from(expected))))
        }
    }

    fn error_here(&self, message: &str) -> Error {
        Error::malformed(self.cursor.position(), message)
    }
}

fn bytes_to_str(bytes: &[u8], pos: Pos) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|_| Error::malformed(pos, "invalid utf-8"))
}

fn is_name_start(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'_' | b':') || b >= 0x80
}

fn is_name_char(b: u8) -> bool {
    is_name_start(b) || matches!(b, b'0'..=b'9' | b'-' | b'.')
}

fn decode_entities(input: &str, pos: Pos) -> Result<String> {
    if !input.contains('&') {
        return Ok(input.to_string());
    }

    let mut result = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(amp) = rest.find('&') {
        let (before, after) = rest.split_at(amp);
        result.push_str(before);

        let after = after.get(1..).unwrap_or_default();
        let Some(semi) = after.find(';') else {
            return Err(Error::malformed(pos, "unterminated entity reference"));
        };
        let (entity, tail) = after.split_at(semi);

        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => decode_numeric_entity(entity),
        };
        match decoded {
            Some(ch) => result.push(ch),
            None => {
                return Err(Error::malformed(
                    pos,
                    format!("invalid entity reference: &{entity};"),
                ))
            }
        }

        rest = tail.get(1..).unwrap_or_default();
    }
    result.push_str(rest);

    Ok(result)
}

fn decode_numeric_entity(entity: &str) -> Option<char> {
    if let Some(hex) = entity.strip_prefix("#x") {
        u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
    } else if let Some(dec) = entity.strip_prefix('#') {
        dec.parse::<u32>().ok().and_then(char::from_u32)
    } else {
        None
    }
}
