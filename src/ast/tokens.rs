use bigdecimal::BigDecimal;

/// Operator and reserved-word token types.
///
/// Punctuation always lexes to one of these. Reserved words lex to
/// [`TokenKind::KeywordOrIdentifier`] because after `.` they are plain member
/// names; only the parser knows which reading applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    // Punctuation
    /// `*` - wildcard or multiplication
    Asterisk,
    /// `@` - current item
    AtSign,
    /// `,` - subscript separator
    Comma,
    /// `$` - context variable
    DollarSign,
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// `[`
    LeftBracket,
    /// `]`
    RightBracket,
    /// `?` - filter introducer
    QuestionMark,
    /// `+`
    PlusSign,
    /// `-`
    MinusSign,
    /// `.` - accessor or method call
    Period,
    /// `/`
    Solidus,
    /// `%`
    Percent,
    /// `!` - predicate negation
    ExclamationMark,
    /// `&&`
    DoubleAmpersand,
    /// `||`
    DoubleVerticalBar,
    /// `==`
    DoubleEquals,
    /// `<>` or `!=`
    NotEquals,
    /// `<`
    LessThan,
    /// `<=`
    LessThanOrEquals,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterThanOrEquals,

    // Reserved words
    Abs,
    Ceiling,
    Datetime,
    Double,
    Exists,
    False,
    Flag,
    Floor,
    Is,
    KeyValue,
    Last,
    Lax,
    LikeRegex,
    Null,
    Size,
    Starts,
    Strict,
    To,
    True,
    Type,
    Unknown,
    With,
}

impl Keyword {
    /// Looks up a reserved word. Matching is exact and case-sensitive.
    pub fn from_word(word: &str) -> Option<Keyword> {
        let keyword = match word {
            "abs" => Keyword::Abs,
            "ceiling" => Keyword::Ceiling,
            "datetime" => Keyword::Datetime,
            "double" => Keyword::Double,
            "exists" => Keyword::Exists,
            "false" => Keyword::False,
            "flag" => Keyword::Flag,
            "floor" => Keyword::Floor,
            "is" => Keyword::Is,
            "keyvalue" => Keyword::KeyValue,
            "last" => Keyword::Last,
            "lax" => Keyword::Lax,
            "like_regex" => Keyword::LikeRegex,
            "null" => Keyword::Null,
            "size" => Keyword::Size,
            "starts" => Keyword::Starts,
            "strict" => Keyword::Strict,
            "to" => Keyword::To,
            "true" => Keyword::True,
            "type" => Keyword::Type,
            "unknown" => Keyword::Unknown,
            "with" => Keyword::With,
            _ => return None,
        };
        Some(keyword)
    }
}

/// A lexical token together with the character offset where it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
}

impl Token {
    pub fn new(kind: TokenKind, start: usize) -> Self {
        Token { kind, start }
    }

    /// The keyword this token stands for, whether it was punctuation or a word.
    pub fn keyword(&self) -> Option<Keyword> {
        match self.kind {
            TokenKind::Keyword(k) | TokenKind::KeywordOrIdentifier(k, _) => Some(k),
            _ => None,
        }
    }

    pub fn is(&self, keyword: Keyword) -> bool {
        self.keyword() == Some(keyword)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// End of the path source. Always the last token, exactly once.
    EndOfInput,

    /// Operator or punctuation
    ///
    /// # Examples
    /// ```text
    /// $  @  [  ]  ==  <>  &&
    /// ```
    Keyword(Keyword),

    /// Reserved word, kept with its spelling for member-name position
    ///
    /// # Examples
    /// ```text
    /// $.size()      // method
    /// $.size        // member named "size"
    /// ```
    KeywordOrIdentifier(Keyword, String),

    /// Bare member name
    ///
    /// Starts with a letter or underscore, continues with Unicode identifier
    /// characters.
    ///
    /// # Examples
    /// ```text
    /// $.customer_id
    /// $.émigré
    /// ```
    Identifier(String),

    /// Named parameter reference (`$name`), stored without the `$`
    ///
    /// # Examples
    /// ```text
    /// $threshold
    /// $1
    /// ```
    NamedVariable(String),

    /// Single- or double-quoted string with escapes resolved
    StringLiteral(String),

    /// Integer literal that fits in 32 bits
    IntegerLiteral(i64),

    /// Any other numeric literal: fractions, exponents, wide integers
    DecimalLiteral(BigDecimal),
}
