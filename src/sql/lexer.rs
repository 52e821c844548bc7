/// SQL Lexer - converts SQL string into tokens

use super::token::{Token, TokenType};
use crate::error::ParseError;

pub struct Lexer<'a> {
    source: &'a str,
    /// (byte offset, char) pairs
    input: Vec<(usize, char)>,
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            input: source.char_indices().collect(),
            position: 0,
        }
    }

    /// Significant tokens only, ending with `Eof`
    pub fn tokenize(&mut self) -> Result<Vec<Token>, ParseError> {
        Ok(self.tokenize_all()?.into_iter().filter(|t| !t.is_trivia()).collect())
    }

    /// Every token including whitespace and comments, ending with `Eof`
    pub fn tokenize_all(&mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token()?;
            let is_eof = matches!(token.token_type, TokenType::Eof);
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        Ok(tokens)
    }

    /// Like `tokenize_all`, but stops at the first lexical error and closes
    /// the stream with `Eof` there. Used on partial input while typing.
    pub fn tokenize_lenient(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        loop {
            match self.next_token() {
                Ok(token) => {
                    let is_eof = matches!(token.token_type, TokenType::Eof);
                    tokens.push(token);
                    if is_eof {
                        break;
                    }
                }
                Err(e) => {
                    tokens.push(Token::new(TokenType::Eof, "", e.offset, e.offset));
                    break;
                }
            }
        }

        tokens
    }

    pub fn next_token(&mut self) -> Result<Token, ParseError> {
        let start = self.offset();

        if self.is_eof() {
            return Ok(Token::new(TokenType::Eof, "", start, start));
        }

        let ch = self.current_char();

        if ch.is_whitespace() {
            self.skip_whitespace();
            return Ok(self.make_token(TokenType::Whitespace, start));
        }

        if ch == '-' && self.peek_char() == Some('-') {
            self.skip_line_comment();
            return Ok(self.make_token(TokenType::Comment, start));
        }

        if ch == '/' && self.peek_char() == Some('*') {
            self.skip_block_comment(start)?;
            return Ok(self.make_token(TokenType::Comment, start));
        }

        let token_type = match ch {
            '\'' => self.read_string(start)?,
            '"' => self.read_quoted_identifier(start)?,

            '0'..='9' => self.read_number(),
            '.' if self.peek_char().is_some_and(|c| c.is_ascii_digit()) => self.read_number(),

            'a'..='z' | 'A'..='Z' | '_' => self.read_identifier(),

            '=' => {
                self.advance();
                TokenType::Eq
            }
            '!' => {
                self.advance();
                if self.current_char() == '=' {
                    self.advance();
                    TokenType::Ne
                } else {
                    return Err(ParseError::unexpected_character("Unexpected character '!'", start));
                }
            }
            '<' => {
                self.advance();
                if self.current_char() == '=' {
                    self.advance();
                    TokenType::Le
                } else if self.current_char() == '>' {
                    self.advance();
                    TokenType::Ne
                } else {
                    TokenType::Lt
                }
            }
            '>' => {
                self.advance();
                if self.current_char() == '=' {
                    self.advance();
                    TokenType::Ge
                } else {
                    TokenType::Gt
                }
            }
            '+' => {
                self.advance();
                TokenType::Plus
            }
            '-' => {
                self.advance();
                TokenType::Minus
            }
            '*' => {
                self.advance();
                TokenType::Star
            }
            '/' => {
                self.advance();
                TokenType::Slash
            }
            '(' => {
                self.advance();
                TokenType::LParen
            }
            ')' => {
                self.advance();
                TokenType::RParen
            }
            ',' => {
                self.advance();
                TokenType::Comma
            }
            ';' => {
                self.advance();
                TokenType::Semicolon
            }
            '.' => {
                self.advance();
                TokenType::Dot
            }
            _ => {
                return Err(ParseError::unexpected_character(
                    format!("Unexpected character '{}'", ch),
                    start,
                ));
            }
        };

        Ok(self.make_token(token_type, start))
    }

    fn make_token(&self, token_type: TokenType, start: usize) -> Token {
        let end = self.offset();
        Token::new(token_type, &self.source[start..end], start, end)
    }

    /// Byte offset of the current position
    fn offset(&self) -> usize {
        self.input
            .get(self.position)
            .map(|(offset, _)| *offset)
            .unwrap_or(self.source.len())
    }

    fn current_char(&self) -> char {
        if self.is_eof() {
            '\0'
        } else {
            self.input[self.position].1
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.position + 1).map(|(_, c)| *c)
    }

    fn advance(&mut self) {
        if !self.is_eof() {
            self.position += 1;
        }
    }

    fn is_eof(&self) -> bool {
        self.position >= self.input.len()
    }

    fn skip_whitespace(&mut self) {
        while !self.is_eof() && self.current_char().is_whitespace() {
            self.advance();
        }
    }

    fn skip_line_comment(&mut self) {
        while !self.is_eof() && self.current_char() != '\n' {
            self.advance();
        }
    }

    fn skip_block_comment(&mut self, start: usize) -> Result<(), ParseError> {
        self.advance(); // skip '/'
        self.advance(); // skip '*'

        while !self.is_eof() {
            if self.current_char() == '*' && self.peek_char() == Some('/') {
                self.advance();
                self.advance();
                return Ok(());
            }
            self.advance();
        }

        Err(ParseError::unexpected_character("Unterminated block comment", start))
    }

    /// Read a quoted run; a doubled quote character is an escaped quote
    fn read_quoted(&mut self, quote: char) -> Option<String> {
        self.advance(); // skip opening quote
        let mut value = String::new();

        while !self.is_eof() {
            let ch = self.current_char();
            if ch == quote {
                if self.peek_char() == Some(quote) {
                    value.push(quote);
                    self.advance();
                    self.advance();
                    continue;
                }
                self.advance(); // skip closing quote
                return Some(value);
            }
            value.push(ch);
            self.advance();
        }

        None
    }

    fn read_string(&mut self, start: usize) -> Result<TokenType, ParseError> {
        self.read_quoted('\'')
            .map(TokenType::String)
            .ok_or_else(|| ParseError::unexpected_character("Unterminated string literal", start))
    }

    fn read_quoted_identifier(&mut self, start: usize) -> Result<TokenType, ParseError> {
        self.read_quoted('"')
            .map(TokenType::QuotedIdentifier)
            .ok_or_else(|| ParseError::unexpected_character("Unterminated quoted identifier", start))
    }

    fn read_number(&mut self) -> TokenType {
        let mut value = String::new();

        while !self.is_eof() && self.current_char().is_ascii_digit() {
            value.push(self.current_char());
            self.advance();
        }

        if self.current_char() == '.' && self.peek_char().map_or(true, |c| c.is_ascii_digit() || !c.is_alphabetic()) {
            value.push('.');
            self.advance();
            while !self.is_eof() && self.current_char().is_ascii_digit() {
                value.push(self.current_char());
                self.advance();
            }
        }

        // Optional exponent (e.g., 1.5e10), only when digits follow
        if matches!(self.current_char(), 'e' | 'E') {
            let next = self.peek_char();
            let signed = matches!(next, Some('+') | Some('-'))
                && self.input.get(self.position + 2).is_some_and(|(_, c)| c.is_ascii_digit());
            if next.is_some_and(|c| c.is_ascii_digit()) || signed {
                value.push(self.current_char());
                self.advance();
                if signed {
                    value.push(self.current_char());
                    self.advance();
                }
                while !self.is_eof() && self.current_char().is_ascii_digit() {
                    value.push(self.current_char());
                    self.advance();
                }
            }
        }

        TokenType::Number(value)
    }

    fn read_identifier(&mut self) -> TokenType {
        let mut value = String::new();

        while !self.is_eof() {
            let ch = self.current_char();
            if ch.is_ascii_alphanumeric() || ch == '_' {
                value.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        TokenType::from_keyword(&value).unwrap_or(TokenType::Identifier(value))
    }
}
