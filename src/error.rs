//! Error types for the labsql engine
//!
//! Four kinds surface from the public operations: parse, bind, execution and
//! catalog errors. `Error` wraps them so every layer can propagate with `?`.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Bind(#[from] BindError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl Error {
    /// Source offset of the offending token or expression, when known
    pub fn offset(&self) -> Option<usize> {
        match self {
            Error::Parse(e) => Some(e.offset),
            Error::Bind(e) => e.offset(),
            Error::Execution(e) => Some(e.offset),
            Error::Catalog(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Grammar violation
    Syntax,
    /// Lexer failure: unrecognized character, unterminated string or comment
    UnexpectedCharacter,
    /// `SELECT` followed directly by `FROM` or end of input
    EmptySelect,
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Parse error at offset {offset}: {message}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    pub offset: usize,
    pub expected: Option<String>,
}

impl ParseError {
    pub fn syntax(message: impl Into<String>, offset: usize) -> Self {
        Self {
            kind: ParseErrorKind::Syntax,
            message: message.into(),
            offset,
            expected: None,
        }
    }

    pub fn expected(expected: impl Into<String>, found: &str, offset: usize) -> Self {
        let expected = expected.into();
        Self {
            kind: ParseErrorKind::Syntax,
            message: format!("Expected {}, found {}", expected, found),
            offset,
            expected: Some(expected),
        }
    }

    pub fn unexpected_character(message: impl Into<String>, offset: usize) -> Self {
        Self {
            kind: ParseErrorKind::UnexpectedCharacter,
            message: message.into(),
            offset,
            expected: None,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BindError {
    #[error("Unknown table '{name}'")]
    UnknownTable { name: String, offset: Option<usize> },

    #[error("Unknown column '{name}'")]
    UnknownColumn { name: String, offset: usize },

    #[error("Column '{name}' is ambiguous; qualify it with a table alias")]
    AmbiguousColumn { name: String, offset: usize },

    #[error("Expression at offset {offset} must appear in GROUP BY or be used in an aggregate function")]
    NonGroupedColumn { offset: usize },

    #[error("Aggregate functions are not allowed in {clause}")]
    AggregateInWhere { clause: &'static str, offset: usize },

    #[error("Aggregate functions are not allowed in GROUP BY")]
    AggregateInGroupBy { offset: usize },

    #[error("Aggregate function calls cannot be nested")]
    NestedAggregate { offset: usize },

    #[error("TOP and LIMIT cannot be used in the same statement")]
    TopAndLimitConflict,

    #[error("DISTINCT and GROUP BY cannot be used in the same statement")]
    DistinctAndGroupByConflict,

    #[error("Table alias '{alias}' is specified more than once")]
    DuplicateAlias { alias: String, offset: usize },

    #[error("ORDER BY position {position} is not in the select list")]
    InvalidOrdinal { position: i64, offset: usize },
}

impl BindError {
    pub fn offset(&self) -> Option<usize> {
        match self {
            BindError::UnknownTable { offset, .. } => *offset,
            BindError::UnknownColumn { offset, .. }
            | BindError::AmbiguousColumn { offset, .. }
            | BindError::NonGroupedColumn { offset }
            | BindError::AggregateInWhere { offset, .. }
            | BindError::AggregateInGroupBy { offset }
            | BindError::NestedAggregate { offset }
            | BindError::DuplicateAlias { offset, .. }
            | BindError::InvalidOrdinal { offset, .. } => Some(*offset),
            BindError::TopAndLimitConflict | BindError::DistinctAndGroupByConflict => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionErrorKind {
    TypeMismatch,
    DivisionByZero,
    UnknownFunction,
    InvalidArgument,
    EmptyAggregate,
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Execution error at offset {offset}: {message}")]
pub struct ExecutionError {
    pub kind: ExecutionErrorKind,
    pub message: String,
    pub offset: usize,
}

impl ExecutionError {
    pub fn new(kind: ExecutionErrorKind, message: impl Into<String>, offset: usize) -> Self {
        Self {
            kind,
            message: message.into(),
            offset,
        }
    }

    pub fn type_mismatch(message: impl Into<String>, offset: usize) -> Self {
        Self::new(ExecutionErrorKind::TypeMismatch, message, offset)
    }

    pub fn division_by_zero(offset: usize) -> Self {
        Self::new(ExecutionErrorKind::DivisionByZero, "Division by zero", offset)
    }

    pub fn invalid_argument(message: impl Into<String>, offset: usize) -> Self {
        Self::new(ExecutionErrorKind::InvalidArgument, message, offset)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    #[error("Table name must not be empty")]
    EmptyName,

    #[error("Duplicate column '{column}' in table '{table}'")]
    DuplicateColumn { table: String, column: String },

    #[error("Row {row} of table '{table}' has {found} values, expected {expected}")]
    RowWidthMismatch {
        table: String,
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Invalid dataset '{table}': {reason}")]
    InvalidDataset { table: String, reason: String },
}
