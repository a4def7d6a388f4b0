use crate::{
    ast::{
        BinaryOp, ComparisonOp, Expr, Keyword, LogicalOp, Method, Predicate, RegexFault,
        RegexPattern, StartsWithPrefix, Subscript, Token, TokenKind, UnaryOp, UnaryPredicateOp,
    },
    datetime::DatetimeTemplate,
    error::SyntaxError,
    lexer::Lexer,
    value::Value,
};

/// Recursive-descent parser over a fully tokenized path.
///
/// The whole token list is kept so the parser can look two tokens ahead and
/// backtrack when a parenthesis turns out to open an expression rather than a
/// predicate.
pub struct Parser<'s> {
    source: &'s str,
    tokens: Vec<Token>,
    position: usize,
}

impl<'s> Parser<'s> {
    pub fn new(source: &'s str) -> Result<Self, SyntaxError> {
        Ok(Parser {
            source,
            tokens: Lexer::tokenize(source)?,
            position: 0,
        })
    }

    /// Compiles a whole path, returning its root expression and whether it
    /// runs in strict mode.
    pub fn parse(source: &str) -> Result<(Expr, bool), SyntaxError> {
        Parser::new(source)?.parse_path()
    }

    pub fn parse_path(&mut self) -> Result<(Expr, bool), SyntaxError> {
        let strict = self.check(Keyword::Strict);
        if strict || self.check(Keyword::Lax) {
            self.advance();
        }
        let expr = self.parse_expression()?;
        if self.current().kind != TokenKind::EndOfInput {
            return Err(self.error());
        }
        Ok((expr, strict))
    }

    fn current(&self) -> &Token {
        &self.tokens[self.position]
    }

    fn peek(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.position + offset)
    }

    /// Moves to the next token. Never moves past `EndOfInput`.
    fn advance(&mut self) {
        if self.position + 1 < self.tokens.len() {
            self.position += 1;
        }
    }

    fn error(&self) -> SyntaxError {
        SyntaxError::new(self.source, self.current().start)
    }

    fn expect(&mut self, expected: Keyword) -> Result<(), SyntaxError> {
        if !self.check(expected) {
            return Err(self.error());
        }
        self.advance();
        Ok(())
    }

    fn check(&self, keyword: Keyword) -> bool {
        self.current().is(keyword)
    }

    fn eat(&mut self, keyword: Keyword) -> bool {
        let found = self.check(keyword);
        if found {
            self.advance();
        }
        found
    }

    /// Consumes `first second` only when both are present.
    fn eat_pair(&mut self, first: Keyword, second: Keyword) -> bool {
        let found = self.check(first) && self.peek(1).is_some_and(|t| t.is(second));
        if found {
            self.advance();
            self.advance();
        }
        found
    }

    fn read_string(&mut self) -> Result<(String, usize), SyntaxError> {
        match &self.current().kind {
            TokenKind::StringLiteral(s) => {
                let read = (s.clone(), self.current().start);
                self.advance();
                Ok(read)
            }
            _ => Err(self.error()),
        }
    }

    /// Parse primary expressions: literals, `$`, `$name`, `@`, `last`, `( wff )`
    fn parse_primary(&mut self) -> Result<Expr, SyntaxError> {
        if self.eat(Keyword::LeftParen) {
            let expr = self.parse_expression()?;
            self.expect(Keyword::RightParen)?;
            return Ok(expr);
        }

        let expr = match &self.current().kind {
            TokenKind::StringLiteral(s) => Expr::Literal(Value::String(s.clone())),
            TokenKind::IntegerLiteral(n) => Expr::Literal(Value::from(*n)),
            TokenKind::DecimalLiteral(d) => Expr::Literal(Value::Number(d.clone())),
            TokenKind::NamedVariable(name) => Expr::NamedVariable(name.clone()),
            _ => match self.current().keyword() {
                Some(Keyword::True) => Expr::Literal(Value::Boolean(true)),
                Some(Keyword::False) => Expr::Literal(Value::Boolean(false)),
                Some(Keyword::Null) => Expr::Literal(Value::Null),
                Some(Keyword::DollarSign) => Expr::ContextVariable,
                Some(Keyword::AtSign) => Expr::CurrentItem,
                Some(Keyword::Last) => Expr::LastSubscript,
                _ => return Err(self.error()),
            },
        };
        self.advance();
        Ok(expr)
    }

    /// Parse the accessor chain following a primary
    fn parse_access(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.parse_primary()?;

        loop {
            if self.eat(Keyword::Period) {
                let is_call = self.peek(1).is_some_and(|t| t.is(Keyword::LeftParen));
                if is_call {
                    expr = self.parse_method(expr)?;
                } else if self.eat(Keyword::Asterisk) {
                    expr = Expr::MemberAccessor {
                        base: Box::new(expr),
                        key: None,
                    };
                } else {
                    let key = match &self.current().kind {
                        TokenKind::Identifier(name)
                        | TokenKind::StringLiteral(name)
                        | TokenKind::KeywordOrIdentifier(_, name) => name.clone(),
                        _ => return Err(self.error()),
                    };
                    self.advance();
                    expr = Expr::MemberAccessor {
                        base: Box::new(expr),
                        key: Some(key),
                    };
                }
            } else if self.eat(Keyword::LeftBracket) {
                let subscripts = if self.eat(Keyword::Asterisk) {
                    None
                } else {
                    Some(self.parse_subscripts()?)
                };
                self.expect(Keyword::RightBracket)?;
                expr = Expr::ArrayAccessor {
                    base: Box::new(expr),
                    subscripts,
                };
            } else if self.eat(Keyword::QuestionMark) {
                self.expect(Keyword::LeftParen)?;
                let predicate = self.parse_predicate()?;
                self.expect(Keyword::RightParen)?;
                expr = Expr::Filter {
                    base: Box::new(expr),
                    predicate: Box::new(predicate),
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_subscripts(&mut self) -> Result<Vec<Subscript>, SyntaxError> {
        let mut subscripts = vec![];
        loop {
            let from = self.parse_expression()?;
            if self.eat(Keyword::To) {
                let to = self.parse_expression()?;
                subscripts.push(Subscript::Range { from, to });
            } else {
                subscripts.push(Subscript::Index(from));
            }
            if !self.eat(Keyword::Comma) {
                return Ok(subscripts);
            }
        }
    }

    /// Parse `name(...)` after a period; the caller has seen the `(`.
    fn parse_method(&mut self, base: Expr) -> Result<Expr, SyntaxError> {
        let method = match self.current().kind {
            TokenKind::KeywordOrIdentifier(keyword, _) => keyword,
            _ => return Err(self.error()),
        };
        let simple = match method {
            Keyword::Type => Method::Type,
            Keyword::Size => Method::Size,
            Keyword::Double => Method::Double,
            Keyword::Ceiling => Method::Ceiling,
            Keyword::Floor => Method::Floor,
            Keyword::Abs => Method::Abs,
            Keyword::KeyValue => Method::KeyValue,
            Keyword::Datetime => {
                self.advance();
                self.advance();
                let template = if self.check(Keyword::RightParen) {
                    None
                } else {
                    let (text, start) = self.read_string()?;
                    let template = DatetimeTemplate::compile(&text)
                        .map_err(|_| SyntaxError::new(self.source, start))?;
                    Some(template)
                };
                self.expect(Keyword::RightParen)?;
                return Ok(Expr::DatetimeMethod {
                    base: Box::new(base),
                    template,
                });
            }
            _ => return Err(self.error()),
        };
        self.advance();
        self.advance();
        self.expect(Keyword::RightParen)?;
        Ok(Expr::SimpleMethod {
            base: Box::new(base),
            method: simple,
        })
    }

    fn parse_unary(&mut self) -> Result<Expr, SyntaxError> {
        let op = if self.check(Keyword::PlusSign) {
            UnaryOp::Plus
        } else if self.check(Keyword::MinusSign) {
            UnaryOp::Minus
        } else {
            return self.parse_access();
        };
        self.advance();
        let operand = self.parse_unary()?; // Right-associative
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.current().kind {
                TokenKind::Keyword(Keyword::Asterisk) => BinaryOp::Multiply,
                TokenKind::Keyword(Keyword::Solidus) => BinaryOp::Divide,
                TokenKind::Keyword(Keyword::Percent) => BinaryOp::Modulo,
                _ => break,
            };

            self.advance();
            let right = self.parse_unary()?;

            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.current().kind {
                TokenKind::Keyword(Keyword::PlusSign) => BinaryOp::Add,
                TokenKind::Keyword(Keyword::MinusSign) => BinaryOp::Subtract,
                _ => break,
            };

            self.advance();
            let right = self.parse_multiplicative()?;

            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    pub fn parse_expression(&mut self) -> Result<Expr, SyntaxError> {
        self.parse_additive()
    }

    pub fn parse_predicate(&mut self) -> Result<Predicate, SyntaxError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Predicate, SyntaxError> {
        let mut left = self.parse_and()?;

        while self.eat(Keyword::DoubleVerticalBar) {
            let right = self.parse_and()?;
            left = Predicate::Binary {
                op: LogicalOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Predicate, SyntaxError> {
        let mut left = self.parse_negation()?;

        while self.eat(Keyword::DoubleAmpersand) {
            let right = self.parse_negation()?;
            left = Predicate::Binary {
                op: LogicalOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_negation(&mut self) -> Result<Predicate, SyntaxError> {
        if self.eat(Keyword::ExclamationMark) {
            let operand = self.parse_delimited_predicate()?;
            return Ok(Predicate::Unary {
                op: UnaryPredicateOp::Not,
                operand: Box::new(operand),
            });
        }
        self.parse_predicate_primary()
    }

    /// `exists( wff )` or `( predicate )`, the only operands `!` accepts.
    fn parse_delimited_predicate(&mut self) -> Result<Predicate, SyntaxError> {
        if self.eat(Keyword::Exists) {
            return self.parse_exists();
        }
        self.expect(Keyword::LeftParen)?;
        let predicate = self.parse_predicate()?;
        self.expect(Keyword::RightParen)?;
        Ok(predicate)
    }

    fn parse_exists(&mut self) -> Result<Predicate, SyntaxError> {
        self.expect(Keyword::LeftParen)?;
        let expr = self.parse_expression()?;
        self.expect(Keyword::RightParen)?;
        Ok(Predicate::Exists(expr))
    }

    fn parse_predicate_primary(&mut self) -> Result<Predicate, SyntaxError> {
        if self.eat(Keyword::Exists) {
            return self.parse_exists();
        }

        if self.check(Keyword::LeftParen) {
            let saved = self.position;
            match self.parse_parenthesized_predicate() {
                Ok(predicate) => return Ok(predicate),
                Err(first) => {
                    // `(` may open an arithmetic operand instead: `(@.a + 1) > 2`
                    self.position = saved;
                    return self
                        .parse_operand_predicate()
                        .map_err(|second| farthest(first, second));
                }
            }
        }

        self.parse_operand_predicate()
    }

    fn parse_parenthesized_predicate(&mut self) -> Result<Predicate, SyntaxError> {
        self.expect(Keyword::LeftParen)?;
        let predicate = self.parse_predicate()?;
        self.expect(Keyword::RightParen)?;
        if self.eat_pair(Keyword::Is, Keyword::Unknown) {
            return Ok(Predicate::Unary {
                op: UnaryPredicateOp::IsUnknown,
                operand: Box::new(predicate),
            });
        }
        // A predicate followed by an operator was really an expression.
        if comparison_op(self.current()).is_some()
            || self.check(Keyword::LikeRegex)
            || self.check(Keyword::Starts)
        {
            return Err(self.error());
        }
        Ok(predicate)
    }

    /// A comparison, `like_regex` or `starts with` applied to an expression.
    fn parse_operand_predicate(&mut self) -> Result<Predicate, SyntaxError> {
        let left = self.parse_expression()?;

        if let Some(op) = comparison_op(self.current()) {
            self.advance();
            let right = self.parse_expression()?;
            return Ok(Predicate::Comparison { op, left, right });
        }

        if self.eat(Keyword::LikeRegex) {
            let (pattern, pattern_start) = self.read_string()?;
            let flags = if self.eat(Keyword::Flag) {
                Some(self.read_string()?)
            } else {
                None
            };
            let compiled = RegexPattern::new(&pattern, flags.as_ref().map(|(f, _)| f.as_str()))
                .map_err(|fault| match (fault, &flags) {
                    (RegexFault::Flags, Some((_, flags_start))) => {
                        SyntaxError::new(self.source, *flags_start)
                    }
                    _ => SyntaxError::new(self.source, pattern_start),
                })?;
            return Ok(Predicate::LikeRegex {
                subject: left,
                pattern: compiled,
            });
        }

        if self.eat(Keyword::Starts) {
            self.expect(Keyword::With)?;
            let prefix = match &self.current().kind {
                TokenKind::StringLiteral(s) => StartsWithPrefix::Literal(s.clone()),
                TokenKind::NamedVariable(name) => StartsWithPrefix::Variable(name.clone()),
                _ => return Err(self.error()),
            };
            self.advance();
            return Ok(Predicate::StartsWith {
                subject: left,
                prefix,
            });
        }

        Err(self.error())
    }
}

fn comparison_op(token: &Token) -> Option<ComparisonOp> {
    match token.kind {
        TokenKind::Keyword(Keyword::DoubleEquals) => Some(ComparisonOp::Equal),
        TokenKind::Keyword(Keyword::NotEquals) => Some(ComparisonOp::NotEqual),
        TokenKind::Keyword(Keyword::LessThan) => Some(ComparisonOp::LessThan),
        TokenKind::Keyword(Keyword::GreaterThan) => Some(ComparisonOp::GreaterThan),
        TokenKind::Keyword(Keyword::LessThanOrEquals) => Some(ComparisonOp::LessEqual),
        TokenKind::Keyword(Keyword::GreaterThanOrEquals) => Some(ComparisonOp::GreaterEqual),
        _ => None,
    }
}

/// Of two failed parse attempts, report the one that got further.
fn farthest(first: SyntaxError, second: SyntaxError) -> SyntaxError {
    if first.offset > second.offset {
        first
    } else {
        second
    }
}
