/// SQL pipeline for the workbench query engine
///
/// Architecture:
/// - Lexer: Tokenizes SQL strings, trivia included
/// - Parser: Builds the SELECT AST with byte offsets
/// - Planner: Binds names against a table source and checks the statement
/// - Executor: Scan, join, filter, group, project, order, cap
/// - Completion: Cursor-aware suggestions for the editor

pub mod token;
pub mod lexer;
pub mod ast;
pub mod parser;
pub mod planner;
pub mod evaluator;
pub mod executor;
pub mod completion;

pub use token::{Token, TokenKind, TokenType};
pub use lexer::Lexer;
pub use ast::{BinaryOperator, Expr, ExprKind, SelectStmt};
pub use parser::{parse_sql, Parser};
pub use planner::{plan, SelectPlan};
pub use executor::QueryExecutor;
pub use completion::{suggest, Suggestion, SuggestionKind};
