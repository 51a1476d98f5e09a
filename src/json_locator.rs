//! Source positions for JSON values.
//!
//! `serde_json::Value` keeps no spans, so the input text is scanned once more
//! and a position for every value is recorded under its JSON Pointer. The text
//! has already been accepted by `serde_json` when the index is built.
//!
//! Objects and arrays are placed at their opening bracket. Strings, numbers
//! and literals are placed at their last character, so a string points at its
//! closing quote.

use std::collections::HashMap;

/// 1-based line and column, counted in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub const START: Position = Position { line: 1, column: 1 };
}

/// JSON Pointer -> position of the value it designates
#[derive(Debug, Default)]
pub struct PositionIndex {
    positions: HashMap<String, Position>,
}

impl PositionIndex {
    pub fn build(text: &str) -> Self {
        let mut positions = HashMap::new();
        let mut scanner = Scanner::new(text);
        // A scan failure leaves a partial index; lookups fall back to ancestors.
        let _ = scanner.value(String::new(), &mut positions);
        Self { positions }
    }

    /// Position of the value at `pointer`, or of its nearest indexed ancestor.
    pub fn locate(&self, pointer: &str) -> Position {
        let mut current = pointer;
        loop {
            if let Some(position) = self.positions.get(current) {
                return *position;
            }
            match current.rfind('/') {
                Some(i) => current = &current[..i],
                None => return Position::START,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Escape one reference token (RFC 6901).
pub fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

struct Scanner<'a> {
    text: &'a str,
    offset: usize,
    line: u32,
    column: u32,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str) -> Self {
        let mut scanner = Self {
            text,
            offset: 0,
            line: 1,
            column: 1,
        };
        if scanner.peek() == Some('\u{feff}') {
            scanner.offset += '\u{feff}'.len_utf8();
        }
        scanner
    }

    fn peek(&self) -> Option<char> {
        self.text[self.offset..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.offset += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(' ' | '\t' | '\n' | '\r')) {
            self.bump();
        }
    }

    fn position(&self) -> Position {
        Position {
            line: self.line,
            column: self.column,
        }
    }

    /// Column of the character just consumed.
    fn last_position(&self) -> Position {
        Position {
            line: self.line,
            column: self.column.saturating_sub(1).max(1),
        }
    }

    fn value(&mut self, pointer: String, out: &mut HashMap<String, Position>) -> Option<()> {
        self.skip_whitespace();

        match self.peek()? {
            '{' => {
                out.insert(pointer.clone(), self.position());
                self.bump();
                self.skip_whitespace();
                if self.peek()? == '}' {
                    self.bump();
                    return Some(());
                }
                loop {
                    self.skip_whitespace();
                    let key = self.string()?;
                    self.skip_whitespace();
                    if self.bump()? != ':' {
                        return None;
                    }
                    self.value(format!("{}/{}", pointer, escape_token(&key)), out)?;
                    self.skip_whitespace();
                    match self.bump()? {
                        ',' => continue,
                        '}' => return Some(()),
                        _ => return None,
                    }
                }
            }
            '[' => {
                out.insert(pointer.clone(), self.position());
                self.bump();
                self.skip_whitespace();
                if self.peek()? == ']' {
                    self.bump();
                    return Some(());
                }
                let mut index = 0usize;
                loop {
                    self.value(format!("{}/{}", pointer, index), out)?;
                    index += 1;
                    self.skip_whitespace();
                    match self.bump()? {
                        ',' => continue,
                        ']' => return Some(()),
                        _ => return None,
                    }
                }
            }
            '"' => {
                self.string()?;
                out.insert(pointer, self.last_position());
                Some(())
            }
            _ => {
                while let Some(c) = self.peek() {
                    if matches!(c, ',' | '}' | ']') || c.is_whitespace() {
                        break;
                    }
                    self.bump();
                }
                out.insert(pointer, self.last_position());
                Some(())
            }
        }
    }

    /// Consume a string literal and return its decoded contents.
    fn string(&mut self) -> Option<String> {
        let start = self.offset;
        if self.bump()? != '"' {
            return None;
        }
        loop {
            match self.bump()? {
                '\\' => {
                    self.bump()?;
                }
                '"' => break,
                _ => {}
            }
        }
        serde_json::from_str(&self.text[start..self.offset]).ok()
    }
}
