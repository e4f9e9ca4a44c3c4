//! Tokens produced by the lexer.

use uscript_core::db::{FieldId, ObjectRef};

/// A position in the source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Mark {
    pub pos: usize,
    pub line: u32,
}

/// Decoded constant value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i32),
    Float(f32),
    Bool(bool),
    /// A byte, tagged with its enum when it came from an enum tag.
    Byte {
        value: u8,
        enum_def: Option<FieldId>,
    },
    String(String),
    Name(String),
    Vector([f32; 3]),
    Rotator([i32; 3]),
    /// `Class'Path'` object reference. `object` is `None` when unresolved.
    Object {
        class: FieldId,
        object: Option<ObjectRef>,
    },
    /// The `None` object literal.
    NoObject,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// End of input.
    End,
    Identifier,
    Symbol,
    Const(Literal),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Source spelling of identifiers, symbols and numbers.
    pub text: String,
    /// Position of the first character.
    pub start: Mark,
}

impl Token {
    pub fn end(start: Mark) -> Self {
        Self {
            kind: TokenKind::End,
            text: String::new(),
            start,
        }
    }

    pub fn is_end(&self) -> bool {
        self.kind == TokenKind::End
    }

    pub fn is_identifier(&self) -> bool {
        self.kind == TokenKind::Identifier
    }

    pub fn is_symbol(&self) -> bool {
        self.kind == TokenKind::Symbol
    }

    /// Case-insensitive keyword/identifier test.
    pub fn matches(&self, text: &str) -> bool {
        self.kind == TokenKind::Identifier && self.text.eq_ignore_ascii_case(text)
    }

    pub fn matches_symbol(&self, symbol: &str) -> bool {
        self.kind == TokenKind::Symbol && self.text == symbol
    }

    /// Identifier or symbol text usable as an operator name.
    pub fn operator_text(&self) -> Option<&str> {
        match self.kind {
            TokenKind::Identifier | TokenKind::Symbol => Some(&self.text),
            _ => None,
        }
    }

    pub fn literal(&self) -> Option<&Literal> {
        match &self.kind {
            TokenKind::Const(literal) => Some(literal),
            _ => None,
        }
    }

    /// Human readable form for error messages.
    pub fn describe(&self) -> String {
        match &self.kind {
            TokenKind::End => "end of script".to_string(),
            TokenKind::Identifier | TokenKind::Symbol => self.text.clone(),
            TokenKind::Const(Literal::String(s)) => format!("\"{s}\""),
            TokenKind::Const(Literal::Name(n)) => format!("'{n}'"),
            TokenKind::Const(_) if !self.text.is_empty() => self.text.clone(),
            TokenKind::Const(_) => "constant".to_string(),
        }
    }
}
