/// Token types for SQL lexer
use phf::phf_map;

// 🚀 Perfect hash map for O(1) keyword lookup
static KEYWORDS: phf::Map<&'static str, TokenType> = phf_map! {
    "select" => TokenType::Select,
    "from" => TokenType::From,
    "where" => TokenType::Where,
    "group" => TokenType::Group,
    "by" => TokenType::By,
    "having" => TokenType::Having,
    "order" => TokenType::Order,
    "asc" => TokenType::Asc,
    "desc" => TokenType::Desc,
    "limit" => TokenType::Limit,
    "top" => TokenType::Top,
    "as" => TokenType::As,
    "join" => TokenType::Join,
    "inner" => TokenType::Inner,
    "left" => TokenType::Left,
    "outer" => TokenType::Outer,
    "on" => TokenType::On,
    "and" => TokenType::And,
    "or" => TokenType::Or,
    "not" => TokenType::Not,
    "in" => TokenType::In,
    "like" => TokenType::Like,
    "is" => TokenType::Is,
    "null" => TokenType::Null,
    "distinct" => TokenType::Distinct,
    "true" => TokenType::True,
    "false" => TokenType::False,
    "count" => TokenType::Count,
    "sum" => TokenType::Sum,
    "avg" => TokenType::Avg,
    "min" => TokenType::Min,
    "max" => TokenType::Max,
};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenType {
    // Keywords
    Select,
    From,
    Where,
    Group,
    By,
    Having,
    Order,
    Asc,
    Desc,
    Limit,
    Top,
    As,
    Join,
    Inner,
    Left,
    Outer,
    On,
    And,
    Or,
    Not,
    In,
    Like,
    Is,
    Null,
    Distinct,
    True,
    False,

    // Aggregate names
    Count,
    Sum,
    Avg,
    Min,
    Max,

    // Operators
    Eq,           // =
    Ne,           // != or <>
    Lt,           // <
    Gt,           // >
    Le,           // <=
    Ge,           // >=
    Plus,         // +
    Minus,        // -
    Star,         // *
    Slash,        // /

    // Delimiters
    LParen,       // (
    RParen,       // )
    Comma,        // ,
    Semicolon,    // ;
    Dot,          // .

    // Literals
    Number(String),
    String(String),
    Identifier(String),
    QuotedIdentifier(String),

    // Trivia
    Whitespace,
    Comment,

    // Special
    Eof,
}

/// Coarse token classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Keyword,
    Identifier,
    Number,
    String,
    Punctuator,
    Operator,
    Whitespace,
    Comment,
    EndOfInput,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    /// Source text of the token
    pub text: String,
    /// Byte offset of the first character
    pub start: usize,
    /// Byte offset one past the last character
    pub end: usize,
}

impl Token {
    pub fn new(token_type: TokenType, text: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            token_type,
            text: text.into(),
            start,
            end,
        }
    }

    pub fn kind(&self) -> TokenKind {
        self.token_type.kind()
    }

    pub fn is_trivia(&self) -> bool {
        matches!(self.token_type, TokenType::Whitespace | TokenType::Comment)
    }

    /// Human-readable description for error messages
    pub fn describe(&self) -> String {
        match &self.token_type {
            TokenType::Eof => "end of input".to_string(),
            TokenType::String(_) => format!("string '{}'", self.text),
            _ => format!("'{}'", self.text),
        }
    }
}

impl TokenType {
    /// Check if this word is a keyword (case-insensitive, O(1) perfect hash lookup)
    pub fn from_keyword(s: &str) -> Option<Self> {
        let lowercase = s.to_lowercase();
        KEYWORDS.get(lowercase.as_str()).cloned()
    }

    pub fn kind(&self) -> TokenKind {
        match self {
            TokenType::Eq
            | TokenType::Ne
            | TokenType::Lt
            | TokenType::Gt
            | TokenType::Le
            | TokenType::Ge
            | TokenType::Plus
            | TokenType::Minus
            | TokenType::Star
            | TokenType::Slash => TokenKind::Operator,
            TokenType::LParen
            | TokenType::RParen
            | TokenType::Comma
            | TokenType::Semicolon
            | TokenType::Dot => TokenKind::Punctuator,
            TokenType::Number(_) => TokenKind::Number,
            TokenType::String(_) => TokenKind::String,
            TokenType::Identifier(_) | TokenType::QuotedIdentifier(_) => TokenKind::Identifier,
            TokenType::Whitespace => TokenKind::Whitespace,
            TokenType::Comment => TokenKind::Comment,
            TokenType::Eof => TokenKind::EndOfInput,
            _ => TokenKind::Keyword,
        }
    }

    /// Aggregate function named by this token, if any
    pub fn aggregate_name(&self) -> Option<&'static str> {
        match self {
            TokenType::Count => Some("COUNT"),
            TokenType::Sum => Some("SUM"),
            TokenType::Avg => Some("AVG"),
            TokenType::Min => Some("MIN"),
            TokenType::Max => Some("MAX"),
            _ => None,
        }
    }

    pub fn is_keyword(&self) -> bool {
        self.kind() == TokenKind::Keyword
    }
}
