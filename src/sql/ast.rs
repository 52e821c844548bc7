/// Abstract Syntax Tree for SELECT statements
use crate::types::Value;

/// SELECT statement
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStmt {
    pub distinct: bool,                    // SELECT DISTINCT
    pub top: Option<TopClause>,            // SELECT TOP n
    pub columns: Vec<SelectColumn>,
    pub from: Option<FromClause>,
    pub where_clause: Option<Expr>,
    pub group_by: Vec<Expr>,               // GROUP BY expr_list (empty if absent)
    pub having: Option<Expr>,
    pub order_by: Vec<OrderByExpr>,
    pub limit: Option<LimitClause>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopClause {
    pub count: u64,
    pub offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitClause {
    pub count: u64,
    pub offset: usize,
}

/// FROM clause: a primary table followed by joins in source order
#[derive(Debug, Clone, PartialEq)]
pub struct FromClause {
    pub table: TableRef,
    pub joins: Vec<Join>,
}

impl FromClause {
    /// All table references in FROM order
    pub fn tables(&self) -> impl Iterator<Item = &TableRef> {
        std::iter::once(&self.table).chain(self.joins.iter().map(|j| &j.table))
    }
}

/// Table reference: table_name [AS alias]
#[derive(Debug, Clone, PartialEq)]
pub struct TableRef {
    pub name: String,
    pub alias: Option<String>,
    pub offset: usize,
}

impl TableRef {
    /// Name other clauses refer to this table by
    pub fn effective_alias(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub join_type: JoinType,
    pub table: TableRef,
    pub on_condition: Expr,
}

/// JOIN types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectColumn {
    /// *
    Star { offset: usize },
    /// qualifier.*
    QualifiedStar { qualifier: String, offset: usize },
    /// expression [AS alias]
    Expr { expr: Expr, alias: Option<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByExpr {
    pub expr: Expr,
    pub asc: bool,  // true = ASC, false = DESC
}

/// Expression with the byte offset where it starts
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub offset: usize,
}

impl Expr {
    pub fn new(kind: ExprKind, offset: usize) -> Self {
        Self { kind, offset }
    }

    pub fn boxed(self) -> Box<Expr> {
        Box::new(self)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Column reference, optionally qualified by a table name or alias
    Column {
        qualifier: Option<String>,
        name: String,
    },

    /// Literal value
    Literal(Value),

    /// Unary operation
    UnaryOp {
        op: UnaryOperator,
        expr: Box<Expr>,
    },

    /// Binary operation
    BinaryOp {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },

    /// IN expression: expr [NOT] IN (val1, val2, ...)
    In {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },

    /// LIKE expression: expr [NOT] LIKE 'pattern'
    Like {
        expr: Box<Expr>,
        pattern: String,
        negated: bool,
    },

    /// IS [NOT] NULL expression
    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },

    /// Function call, aggregate or scalar
    FunctionCall {
        name: String,
        args: FunctionArgs,
        distinct: bool,  // For COUNT(DISTINCT column)
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum FunctionArgs {
    /// f(*)
    Star,
    /// f(a, b, ...), possibly empty
    List(Vec<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Comparison
    Eq,   // =
    Ne,   // <> or !=
    Lt,   // <
    Gt,   // >
    Le,   // <=
    Ge,   // >=

    // Logical
    And,
    Or,

    // Arithmetic
    Add,  // +
    Sub,  // -
    Mul,  // *
    Div,  // /
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    Minus,
}

impl BinaryOperator {
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Eq
                | BinaryOperator::Ne
                | BinaryOperator::Lt
                | BinaryOperator::Gt
                | BinaryOperator::Le
                | BinaryOperator::Ge
        )
    }

    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Add | BinaryOperator::Sub | BinaryOperator::Mul | BinaryOperator::Div
        )
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Eq => "=",
            BinaryOperator::Ne => "<>",
            BinaryOperator::Lt => "<",
            BinaryOperator::Gt => ">",
            BinaryOperator::Le => "<=",
            BinaryOperator::Ge => ">=",
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
        }
    }
}
