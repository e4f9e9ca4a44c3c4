//! Character cursor and raw tokenizer.
//!
//! The lexer knows nothing about the class being compiled. It produces
//! identifiers, symbols and the literals that need no symbol lookup; the
//! compiler layers vectors, rotators, enum tags and object constants on top.

mod token;

pub use token::{Literal, Mark, Token, TokenKind};

use uscript_core::CompileError;

/// Longest identifier, number or name literal.
pub const NAME_SIZE: usize = 64;
/// Longest string literal.
pub const MAX_STRING_CONST_SIZE: usize = 1024;

const TWO_CHAR_SYMBOLS: [&str; 18] = [
    "<<", ">>", "!=", "<=", ">=", "++", "--", "+=", "-=", "*=", "/=", "&&", "||", "^^", "==",
    "**", "~=", "@=",
];

#[derive(Debug, Clone)]
pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    /// Position before the last `get_char`, for one level of push-back.
    prev: Mark,
}

impl Lexer {
    pub fn new(text: &str, line: u32) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
            line,
            prev: Mark { pos: 0, line },
        }
    }

    pub fn mark(&self) -> Mark {
        Mark {
            pos: self.pos,
            line: self.line,
        }
    }

    pub fn reset(&mut self, mark: Mark) {
        self.pos = mark.pos;
        self.line = mark.line;
        self.prev = mark;
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Source text between two positions.
    pub fn slice(&self, start: usize, end: usize) -> String {
        let end = end.min(self.chars.len());
        self.chars[start.min(end)..end].iter().collect()
    }

    pub fn lexical(&self, message: impl Into<String>) -> CompileError {
        CompileError::Lexical {
            message: message.into(),
            line: self.line,
        }
    }

    fn raw(&self, at: usize) -> char {
        self.chars.get(at).copied().unwrap_or('\0')
    }

    /// Next significant character, `'\0'` at end of input.
    ///
    /// Outside literals, block comments are consumed here, nesting included.
    pub fn get_char(&mut self, literal: bool) -> Result<char, CompileError> {
        self.prev = self.mark();
        let mut depth = 0u32;
        loop {
            let c = self.raw(self.pos);
            if c != '\0' {
                self.pos += 1;
            }
            if c == '\n' {
                self.line += 1;
            } else if !literal && c == '/' && self.raw(self.pos) == '*' {
                depth += 1;
                self.pos += 1;
                continue;
            } else if !literal && c == '*' && self.raw(self.pos) == '/' {
                if depth == 0 {
                    return Err(self.lexical("Unexpected '*/' outside of comment"));
                }
                depth -= 1;
                self.pos += 1;
                continue;
            }
            if depth > 0 {
                if c == '\0' {
                    return Err(self.lexical("End of script encountered inside comment"));
                }
                continue;
            }
            return Ok(c);
        }
    }

    /// Undo the last `get_char`.
    pub fn unget_char(&mut self) {
        self.pos = self.prev.pos;
        self.line = self.prev.line;
    }

    pub fn peek_char(&self) -> char {
        self.raw(self.pos)
    }

    /// Skips whitespace and line comments, returning the first significant
    /// character.
    pub fn get_leading_char(&mut self) -> Result<char, CompileError> {
        loop {
            let c = self.get_char(false)?;
            match c {
                ' ' | '\t' | '\r' | '\n' => continue,
                '/' if self.peek_char() == '/' => {
                    while !matches!(self.raw(self.pos), '\n' | '\0') {
                        self.pos += 1;
                    }
                }
                _ => return Ok(c),
            }
        }
    }

    /// Reads one raw token.
    ///
    /// With `no_consts`, a leading sign is never folded into a number so
    /// `a-1` lexes as three tokens.
    pub fn get_raw_token(&mut self, no_consts: bool) -> Result<Token, CompileError> {
        let c = self.get_leading_char()?;
        if c == '\0' {
            return Ok(Token::end(self.mark()));
        }
        let start = Mark {
            pos: self.pos - 1,
            line: self.line,
        };
        let p = self.peek_char();
        if c.is_ascii_alphabetic() || c == '_' {
            self.lex_identifier(c, start)
        } else if c.is_ascii_digit() || (!no_consts && matches!(c, '+' | '-') && p.is_ascii_digit())
        {
            self.lex_number(c, start)
        } else if c == '\'' {
            self.lex_name(start)
        } else if c == '"' {
            self.lex_string(start)
        } else {
            self.lex_symbol(c, start)
        }
    }

    /// Pushes a token back by rewinding to its start.
    pub fn unget_token(&mut self, token: &Token) {
        self.reset(token.start);
    }

    /// Reads a token and restores the position.
    pub fn peek_raw_token(&mut self, no_consts: bool) -> Result<Token, CompileError> {
        let mark = self.mark();
        let token = self.get_raw_token(no_consts);
        self.reset(mark);
        token
    }

    fn lex_identifier(&mut self, first: char, start: Mark) -> Result<Token, CompileError> {
        let mut text = String::new();
        let mut c = first;
        loop {
            text.push(c);
            if text.len() >= NAME_SIZE {
                return Err(self.lexical(format!(
                    "Identifier length exceeds maximum of {NAME_SIZE}"
                )));
            }
            c = self.get_char(false)?;
            if !(c.is_ascii_alphanumeric() || c == '_') {
                break;
            }
        }
        self.unget_char();
        Ok(Token {
            kind: TokenKind::Identifier,
            text,
            start,
        })
    }

    fn lex_number(&mut self, first: char, start: Mark) -> Result<Token, CompileError> {
        let mut text = String::new();
        let mut is_float = false;
        let mut is_hex = false;
        let mut c = first;
        loop {
            is_float |= c == '.';
            is_hex |= c == 'X';
            text.push(c);
            if text.len() >= NAME_SIZE {
                return Err(self.lexical(format!("Number length exceeds maximum of {NAME_SIZE}")));
            }
            c = self.get_char(false)?.to_ascii_uppercase();
            if !(c.is_ascii_digit() || c == '.' || c == 'X' || ('A'..='F').contains(&c)) {
                break;
            }
        }
        self.unget_char();
        let literal = if is_float {
            Literal::Float(parse_float(&text))
        } else if is_hex {
            Literal::Int(parse_hex(&text))
        } else {
            Literal::Int(parse_int(&text))
        };
        Ok(Token {
            kind: TokenKind::Const(literal),
            text,
            start,
        })
    }

    fn lex_name(&mut self, start: Mark) -> Result<Token, CompileError> {
        let mut text = String::new();
        let mut c = self.get_char(false)?;
        while c.is_ascii_alphanumeric() || c == '_' || c == ' ' {
            text.push(c);
            if text.len() >= NAME_SIZE {
                return Err(self.lexical(format!("Name length exceeds maximum of {NAME_SIZE}")));
            }
            c = self.get_char(false)?;
        }
        if c != '\'' {
            return Err(self.lexical("Illegal character in name"));
        }
        Ok(Token {
            kind: TokenKind::Const(Literal::Name(text.clone())),
            text,
            start,
        })
    }

    fn lex_string(&mut self, start: Mark) -> Result<Token, CompileError> {
        let mut text = String::new();
        let mut length = 0usize;
        let mut c = self.get_char(true)?;
        while c != '"' {
            if matches!(c, '\n' | '\r' | '\0') {
                return Err(self.lexical("Unterminated string constant"));
            }
            if c == '\\' {
                c = self.get_char(true)?;
                if matches!(c, '\n' | '\r' | '\0') {
                    return Err(self.lexical("Unterminated string constant"));
                }
            }
            text.push(c);
            length += 1;
            if length >= MAX_STRING_CONST_SIZE {
                return Err(self.lexical(format!(
                    "String constant exceeds maximum of {MAX_STRING_CONST_SIZE} characters"
                )));
            }
            c = self.get_char(true)?;
        }
        Ok(Token {
            kind: TokenKind::Const(Literal::String(text)),
            text: String::new(),
            start,
        })
    }

    fn lex_symbol(&mut self, c: char, start: Mark) -> Result<Token, CompileError> {
        let mut text = String::from(c);
        let d = self.get_char(false)?;
        let mut pair = text.clone();
        pair.push(d);
        if TWO_CHAR_SYMBOLS.contains(&pair.as_str()) {
            text = pair;
            if text == ">>" {
                if self.get_char(false)? == '>' {
                    text.push('>');
                } else {
                    self.unget_char();
                }
            }
        } else {
            self.unget_char();
        }
        Ok(Token {
            kind: TokenKind::Symbol,
            text,
            start,
        })
    }

    /// Consumes up to the `}` matching an already consumed `{`, treating the
    /// contents as plain text. Returns the text between the braces.
    pub fn skip_text_block(&mut self) -> Result<String, CompileError> {
        let begin = self.pos;
        let mut depth = 1u32;
        loop {
            let c = self.get_char(false)?;
            match c {
                '\0' => return Err(self.lexical("Unexpected end of script in '{' block")),
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(self.slice(begin, self.pos - 1));
                    }
                }
                '"' => loop {
                    match self.get_char(true)? {
                        '"' | '\n' | '\0' => break,
                        '\\' => {
                            self.get_char(true)?;
                        }
                        _ => {}
                    }
                },
                '/' if self.peek_char() == '/' => {
                    while !matches!(self.raw(self.pos), '\n' | '\0') {
                        self.pos += 1;
                    }
                }
                _ => {}
            }
        }
    }

    /// Skips to the end of the current line.
    pub fn skip_line(&mut self) {
        while !matches!(self.raw(self.pos), '\n' | '\0') {
            self.pos += 1;
        }
    }
}

/// Longest leading decimal float, like C `atof`.
fn parse_float(text: &str) -> f32 {
    let end = text
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || c == '.' || (i == 0 && matches!(c, '+' | '-'))))
        .map_or(text.len(), |(i, _)| i);
    text[..end].parse().unwrap_or(0.0)
}

/// Leading decimal integer, like C `atoi`. Overflow wraps.
fn parse_int(text: &str) -> i32 {
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let value = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i64, |acc, d| acc.wrapping_mul(10).wrapping_add(i64::from(d - b'0')));
    let value = if negative { -value } else { value };
    value as i32
}

/// `0X`-prefixed hex integer. Overflow wraps.
fn parse_hex(text: &str) -> i32 {
    let (negative, body) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let digits = body.split_once('X').map_or(body, |(_, hex)| hex);
    let value = digits
        .chars()
        .map_while(|c| c.to_digit(16))
        .fold(0u32, |acc, d| acc.wrapping_mul(16).wrapping_add(d)) as i32;
    if negative { value.wrapping_neg() } else { value }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(text: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(text, 1);
        let mut out = Vec::new();
        loop {
            let token = lexer.get_raw_token(false).unwrap();
            if token.is_end() {
                return out;
            }
            out.push(token);
        }
    }

    fn literal(text: &str) -> Literal {
        tokens(text)[0].literal().cloned().unwrap()
    }

    #[test]
    fn nested_comments_yield_no_tokens() {
        let mut lexer = Lexer::new("/* a /* b */ c */", 1);
        assert!(lexer.get_raw_token(false).unwrap().is_end());
    }

    #[test]
    fn unterminated_comment() {
        let mut lexer = Lexer::new("x /* open /* inner */", 1);
        lexer.get_raw_token(false).unwrap();
        let err = lexer.get_raw_token(false).unwrap_err();
        assert!(matches!(err, CompileError::Lexical { .. }));
    }

    #[test]
    fn stray_close_comment() {
        let mut lexer = Lexer::new("*/", 1);
        assert!(lexer.get_raw_token(false).is_err());
    }

    #[test]
    fn numbers() {
        assert_eq!(literal("42"), Literal::Int(42));
        assert_eq!(literal("-7"), Literal::Int(-7));
        assert_eq!(literal("0x1f"), Literal::Int(31));
        assert_eq!(literal("1.5"), Literal::Float(1.5));
        assert_eq!(literal("2.0f"), Literal::Float(2.0));
    }

    #[test]
    fn sign_not_folded_without_consts() {
        let mut lexer = Lexer::new("-1", 1);
        let minus = lexer.get_raw_token(true).unwrap();
        assert!(minus.matches_symbol("-"));
        assert_eq!(lexer.get_raw_token(true).unwrap().literal(), Some(&Literal::Int(1)));
    }

    #[test]
    fn strings_and_names() {
        assert_eq!(literal(r#""a\"b\\c""#), Literal::String("a\"b\\c".to_string()));
        assert_eq!(literal("'Hello World'"), Literal::Name("Hello World".to_string()));
        assert_eq!(literal("''"), Literal::Name(String::new()));
    }

    #[test]
    fn unterminated_string() {
        let mut lexer = Lexer::new("\"abc\nd\"", 1);
        assert!(lexer.get_raw_token(false).is_err());
    }

    #[test]
    fn symbols_are_greedy() {
        let texts: Vec<String> = tokens("a >>> b >> c <= d ~= e . f")
            .into_iter()
            .filter(Token::is_symbol)
            .map(|t| t.text)
            .collect();
        assert_eq!(texts, [">>>", ">>", "<=", "~=", "."]);
    }

    #[test]
    fn unget_restores_token() {
        let mut lexer = Lexer::new("  foo(1)", 1);
        let token = lexer.get_raw_token(false).unwrap();
        lexer.unget_token(&token);
        assert_eq!(lexer.get_raw_token(false).unwrap(), token);
    }

    #[test]
    fn newlines_counted_in_comments() {
        let mut lexer = Lexer::new("/* a\n b */\n// c\nx", 1);
        let token = lexer.get_raw_token(false).unwrap();
        assert!(token.matches("X"));
        assert_eq!(token.start.line, 4);
    }

    #[test]
    fn identifier_too_long() {
        let long = "a".repeat(NAME_SIZE + 1);
        let mut lexer = Lexer::new(&long, 1);
        assert!(lexer.get_raw_token(false).is_err());
    }

    #[test]
    fn text_block_skips_nested_braces() {
        let mut lexer = Lexer::new("{ int a() { return \"}\"; } } tail", 1);
        assert_eq!(lexer.get_leading_char().unwrap(), '{');
        let body = lexer.skip_text_block().unwrap();
        assert_eq!(body.trim(), "int a() { return \"}\"; }");
        assert!(lexer.get_raw_token(false).unwrap().matches("tail"));
    }
}
