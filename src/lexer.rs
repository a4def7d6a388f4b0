use bigdecimal::{BigDecimal, ToPrimitive, num_bigint::BigInt};
use unicode_xid::UnicodeXID;

use crate::{
    ast::{Keyword, Token, TokenKind},
    error::SyntaxError,
};

const NUMERIC: &str = "Numeric";
const APPROXIMATE_NUMERIC: &str = "Approximate numeric";

pub struct Lexer<'s> {
    source: &'s str,
    input: Vec<char>,
    position: usize,
}

impl<'s> Lexer<'s> {
    pub fn new(source: &'s str) -> Self {
        Lexer {
            source,
            input: source.chars().collect(),
            position: 0,
        }
    }

    /// Splits a whole path into tokens, ending with exactly one `EndOfInput`.
    pub fn tokenize(source: &str) -> Result<Vec<Token>, SyntaxError> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token()?;
            let done = token.kind == TokenKind::EndOfInput;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn error(&self, offset: usize) -> SyntaxError {
        SyntaxError::new(self.source, offset)
    }

    fn numeric_error(&self, offset: usize, category: &'static str) -> SyntaxError {
        SyntaxError::with_category(self.source, offset, category)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch <= ' ' || ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if is_identifier_part(ch) {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    /// Single-character operator.
    fn single(&mut self, keyword: Keyword) -> TokenKind {
        self.advance();
        TokenKind::Keyword(keyword)
    }

    /// `pair` when the next character is `second`, otherwise `alone`.
    fn single_or_pair(&mut self, second: char, pair: Keyword, alone: Keyword) -> TokenKind {
        self.advance();
        if self.current_char() == Some(second) {
            self.advance();
            TokenKind::Keyword(pair)
        } else {
            TokenKind::Keyword(alone)
        }
    }

    /// Operator that only exists doubled (`&&`, `||`, `==`).
    fn doubled(&mut self, keyword: Keyword) -> Result<TokenKind, SyntaxError> {
        let start = self.position;
        match (self.current_char(), self.peek_char(1)) {
            (Some(a), Some(b)) if a == b => {
                self.advance();
                self.advance();
                Ok(TokenKind::Keyword(keyword))
            }
            _ => Err(self.error(start)),
        }
    }

    fn read_word(&mut self) -> TokenKind {
        let word = self.read_identifier();
        match Keyword::from_word(&word) {
            Some(keyword) => TokenKind::KeywordOrIdentifier(keyword, word),
            None => TokenKind::Identifier(word),
        }
    }

    fn read_string(&mut self, quote: char) -> Result<String, SyntaxError> {
        let start = self.position;
        let mut result = String::new();
        self.advance(); // opening quote

        while let Some(ch) = self.current_char() {
            self.advance();
            match ch {
                c if c == quote => return Ok(result),
                '\\' => self.read_escape(start, &mut result)?,
                c => result.push(c),
            }
        }

        Err(self.error(start))
    }

    fn read_escape(&mut self, start: usize, result: &mut String) -> Result<(), SyntaxError> {
        let Some(ch) = self.current_char() else {
            return Err(self.error(start));
        };
        self.advance();
        match ch {
            '"' | '\'' | '\\' => result.push(ch),
            '0' => result.push('\0'),
            // line continuation
            '\n' => {}
            '\r' => {
                if self.current_char() == Some('\n') {
                    self.advance();
                }
            }
            'b' => result.push('\u{0008}'),
            'f' => result.push('\u{000C}'),
            'n' => result.push('\n'),
            'r' => result.push('\r'),
            't' => result.push('\t'),
            'v' => result.push('\u{000B}'),
            'u' => {
                let c = self.read_unicode_escape(start)?;
                result.push(c);
            }
            'x' => {
                let code = self.read_hex_digits(start, 2)?;
                let c = char::from_u32(code).ok_or_else(|| self.error(start))?;
                result.push(c);
            }
            _ => return Err(self.error(start)),
        }
        Ok(())
    }

    fn read_unicode_escape(&mut self, start: usize) -> Result<char, SyntaxError> {
        if self.current_char() == Some('{') {
            self.advance();
            let mut code = 0u32;
            let mut digits = 0;
            loop {
                let Some(ch) = self.current_char() else {
                    return Err(self.error(start));
                };
                self.advance();
                if ch == '}' {
                    break;
                }
                match ch.to_digit(16) {
                    Some(digit) if digits < 6 => {
                        code = code * 16 + digit;
                        digits += 1;
                    }
                    _ => return Err(self.error(start)),
                }
            }
            if digits == 0 {
                return Err(self.error(start));
            }
            return char::from_u32(code).ok_or_else(|| self.error(start));
        }

        let code = self.read_hex_digits(start, 4)?;
        if (0xD800..0xDC00).contains(&code) {
            // high surrogate, must be followed by an escaped low surrogate
            if self.current_char() == Some('\\') && self.peek_char(1) == Some('u') {
                self.advance();
                self.advance();
                let low = self.read_hex_digits(start, 4)?;
                if (0xDC00..0xE000).contains(&low) {
                    let combined = 0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00);
                    return char::from_u32(combined).ok_or_else(|| self.error(start));
                }
            }
            return Err(self.error(start));
        }
        char::from_u32(code).ok_or_else(|| self.error(start))
    }

    fn read_hex_digits(&mut self, start: usize, count: usize) -> Result<u32, SyntaxError> {
        let mut code = 0u32;
        for _ in 0..count {
            let digit = self
                .current_char()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| self.error(start))?;
            code = code * 16 + digit;
            self.advance();
        }
        Ok(code)
    }

    fn read_number(&mut self) -> Result<TokenKind, SyntaxError> {
        let start = self.position;
        if self.current_char() == Some('0') {
            match self.peek_char(1) {
                Some('b' | 'B') => return self.read_radix_integer(start, 2, "Binary number"),
                Some('o' | 'O') => return self.read_radix_integer(start, 8, "Octal number"),
                Some('x' | 'X') => return self.read_radix_integer(start, 16, "Hex number"),
                _ => {}
            }
        }

        let mut text = String::new();
        self.read_digits(start, &mut text, NUMERIC)?;

        let mut is_decimal = false;
        if self.current_char() == Some('.') {
            self.advance();
            is_decimal = true;
            if self.current_char() == Some('_') {
                return Err(self.numeric_error(start, NUMERIC));
            }
            if self.current_char().is_some_and(|c| c.is_ascii_digit()) {
                text.push('.');
                self.read_digits(start, &mut text, NUMERIC)?;
            }
        }

        if matches!(self.current_char(), Some('e' | 'E')) {
            self.advance();
            text.push('e');
            if let Some(sign @ ('+' | '-')) = self.current_char() {
                text.push(sign);
                self.advance();
            }
            if !self.current_char().is_some_and(|c| c.is_ascii_digit()) {
                return Err(self.numeric_error(start, APPROXIMATE_NUMERIC));
            }
            self.read_digits(start, &mut text, APPROXIMATE_NUMERIC)?;
            let value = text
                .parse::<BigDecimal>()
                .map_err(|_| self.numeric_error(start, APPROXIMATE_NUMERIC))?;
            return Ok(TokenKind::DecimalLiteral(value));
        }

        let value = text
            .parse::<BigDecimal>()
            .map_err(|_| self.numeric_error(start, NUMERIC))?;
        if is_decimal {
            Ok(TokenKind::DecimalLiteral(value))
        } else {
            Ok(integer_token(value))
        }
    }

    /// Decimal digits with single `_` separators between them.
    fn read_digits(
        &mut self,
        start: usize,
        text: &mut String,
        category: &'static str,
    ) -> Result<(), SyntaxError> {
        let mut last_underscore = false;
        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                text.push(ch);
                last_underscore = false;
            } else if ch == '_' {
                if last_underscore {
                    return Err(self.numeric_error(start, category));
                }
                last_underscore = true;
            } else {
                break;
            }
            self.advance();
        }
        if last_underscore {
            return Err(self.numeric_error(start, category));
        }
        Ok(())
    }

    fn read_radix_integer(
        &mut self,
        start: usize,
        radix: u32,
        category: &'static str,
    ) -> Result<TokenKind, SyntaxError> {
        self.advance(); // 0
        self.advance(); // b, o or x

        let mut value = BigInt::from(0u32);
        let mut digits = 0;
        let mut last_underscore = false;
        while let Some(ch) = self.current_char() {
            if ch == '_' {
                if last_underscore {
                    return Err(self.numeric_error(start, category));
                }
                last_underscore = true;
            } else if let Some(digit) = ch.to_digit(radix) {
                value = value * radix + digit;
                digits += 1;
                last_underscore = false;
            } else {
                break;
            }
            self.advance();
        }

        if digits == 0 || last_underscore || self.current_char().is_some_and(is_identifier_part) {
            return Err(self.numeric_error(start, category));
        }
        Ok(integer_token(BigDecimal::new(value, 0)))
    }

    pub fn next_token(&mut self) -> Result<Token, SyntaxError> {
        self.skip_whitespace();
        let start = self.position;

        let Some(ch) = self.current_char() else {
            return Ok(Token::new(TokenKind::EndOfInput, start));
        };

        let kind = match ch {
            '!' => self.single_or_pair('=', Keyword::NotEquals, Keyword::ExclamationMark),
            '"' | '\'' => TokenKind::StringLiteral(self.read_string(ch)?),
            '$' => {
                if self.peek_char(1).is_some_and(is_identifier_part) {
                    self.advance();
                    TokenKind::NamedVariable(self.read_identifier())
                } else {
                    self.single(Keyword::DollarSign)
                }
            }
            '%' => self.single(Keyword::Percent),
            '&' => self.doubled(Keyword::DoubleAmpersand)?,
            '(' => self.single(Keyword::LeftParen),
            ')' => self.single(Keyword::RightParen),
            '*' => self.single(Keyword::Asterisk),
            '+' => self.single(Keyword::PlusSign),
            ',' => self.single(Keyword::Comma),
            '-' => self.single(Keyword::MinusSign),
            '.' => self.single(Keyword::Period),
            '/' => self.single(Keyword::Solidus),
            '0'..='9' => self.read_number()?,
            '<' => match self.peek_char(1) {
                Some('>') => {
                    self.advance();
                    self.single(Keyword::NotEquals)
                }
                _ => self.single_or_pair('=', Keyword::LessThanOrEquals, Keyword::LessThan),
            },
            '=' => self.doubled(Keyword::DoubleEquals)?,
            '>' => self.single_or_pair('=', Keyword::GreaterThanOrEquals, Keyword::GreaterThan),
            '?' => self.single(Keyword::QuestionMark),
            '@' => self.single(Keyword::AtSign),
            '[' => self.single(Keyword::LeftBracket),
            ']' => self.single(Keyword::RightBracket),
            '|' => self.doubled(Keyword::DoubleVerticalBar)?,
            c if is_identifier_start(c) => self.read_word(),
            _ => return Err(self.error(start)),
        };

        Ok(Token::new(kind, start))
    }
}

fn is_identifier_start(ch: char) -> bool {
    ch == '_' || ch.is_xid_start()
}

fn is_identifier_part(ch: char) -> bool {
    ch.is_xid_continue()
}

/// Integers up to 32 bits stay integers; anything wider is a decimal.
fn integer_token(value: BigDecimal) -> TokenKind {
    match value.to_i64() {
        Some(n) if n <= i64::from(i32::MAX) => TokenKind::IntegerLiteral(n),
        _ => TokenKind::DecimalLiteral(value),
    }
}

#[test]
fn test_keywords_keep_spelling() {
    let mut lexer = Lexer::new("strict size like_regex");
    assert_eq!(
        lexer.next_token().unwrap().kind,
        TokenKind::KeywordOrIdentifier(Keyword::Strict, "strict".to_string())
    );
    assert_eq!(
        lexer.next_token().unwrap().kind,
        TokenKind::KeywordOrIdentifier(Keyword::Size, "size".to_string())
    );
    assert_eq!(
        lexer.next_token().unwrap().kind,
        TokenKind::KeywordOrIdentifier(Keyword::LikeRegex, "like_regex".to_string())
    );
    assert_eq!(lexer.next_token().unwrap().kind, TokenKind::EndOfInput);
}

#[test]
fn test_filter_tokens() {
    let tokens = Lexer::tokenize("$?(@.x >= 5)").unwrap();
    let kinds: Vec<TokenKind> = tokens.into_iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::Keyword(Keyword::DollarSign),
            TokenKind::Keyword(Keyword::QuestionMark),
            TokenKind::Keyword(Keyword::LeftParen),
            TokenKind::Keyword(Keyword::AtSign),
            TokenKind::Keyword(Keyword::Period),
            TokenKind::Identifier("x".to_string()),
            TokenKind::Keyword(Keyword::GreaterThanOrEquals),
            TokenKind::IntegerLiteral(5),
            TokenKind::Keyword(Keyword::RightParen),
            TokenKind::EndOfInput,
        ]
    );
}
