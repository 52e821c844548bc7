/// SQL Parser - converts tokens into AST
use super::ast::*;
use super::lexer::Lexer;
use super::token::{Token, TokenType};
use crate::error::{ParseError, ParseErrorKind};
use crate::types::Value;

type Result<T> = std::result::Result<T, ParseError>;

/// Deepest nesting of parentheses, NOT and unary minus the parser accepts
const MAX_EXPRESSION_DEPTH: usize = 64;

/// Most binary and unary operators in one top-level expression. Together with
/// the nesting limit this bounds the tree height the binder and evaluator recurse over.
const MAX_EXPRESSION_OPERATORS: usize = 256;

pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
    /// Current expression nesting
    depth: usize,
    /// Operators seen in the current top-level expression
    operators: usize,
}

impl Parser {
    /// `tokens` must be significant tokens ending with `Eof`, as produced by
    /// `Lexer::tokenize`.
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if !matches!(tokens.last().map(|t| &t.token_type), Some(TokenType::Eof)) {
            let end = tokens.last().map(|t| t.end).unwrap_or(0);
            tokens.push(Token::new(TokenType::Eof, "", end, end));
        }
        Self {
            tokens,
            position: 0,
            depth: 0,
            operators: 0,
        }
    }

    /// Parse a single SELECT statement
    pub fn parse(&mut self) -> Result<SelectStmt> {
        if !matches!(self.current().token_type, TokenType::Select) {
            return Err(self.expected("SELECT"));
        }
        let stmt = self.parse_select()?;

        // Optionally consume semicolon
        if matches!(self.current().token_type, TokenType::Semicolon) {
            self.advance();
        }

        if !matches!(self.current().token_type, TokenType::Eof) {
            return Err(self.expected("end of input"));
        }

        Ok(stmt)
    }

    /// Parse SELECT statement
    fn parse_select(&mut self) -> Result<SelectStmt> {
        self.expect(TokenType::Select, "SELECT")?;

        let distinct = self.match_token(TokenType::Distinct);

        let top = if matches!(self.current().token_type, TokenType::Top) {
            let offset = self.current().start;
            self.advance();
            Some(TopClause {
                count: self.parse_count()?,
                offset,
            })
        } else {
            None
        };

        if matches!(
            self.current().token_type,
            TokenType::From | TokenType::Eof | TokenType::Semicolon
        ) {
            return Err(ParseError {
                kind: ParseErrorKind::EmptySelect,
                message: "SELECT list is empty".to_string(),
                offset: self.current().start,
                expected: Some("expression".to_string()),
            });
        }

        let columns = self.parse_select_columns()?;

        let from = if self.match_token(TokenType::From) {
            Some(self.parse_from_clause()?)
        } else {
            if let Some(offset) = columns.iter().find_map(|c| match c {
                SelectColumn::Star { offset } | SelectColumn::QualifiedStar { offset, .. } => Some(*offset),
                SelectColumn::Expr { .. } => None,
            }) {
                return Err(ParseError::syntax("SELECT * requires a FROM clause", offset));
            }
            None
        };

        let where_clause = if self.match_token(TokenType::Where) {
            Some(self.parse_expression()?)
        } else {
            None
        };

        let group_by = if self.match_token(TokenType::Group) {
            self.expect(TokenType::By, "BY")?;
            self.parse_expr_list()?
        } else {
            Vec::new()
        };

        let having = if self.match_token(TokenType::Having) {
            Some(self.parse_expression()?)
        } else {
            None
        };

        let order_by = if self.match_token(TokenType::Order) {
            self.expect(TokenType::By, "BY")?;
            self.parse_order_by()?
        } else {
            Vec::new()
        };

        let limit = if matches!(self.current().token_type, TokenType::Limit) {
            let offset = self.current().start;
            self.advance();
            Some(LimitClause {
                count: self.parse_count()?,
                offset,
            })
        } else {
            None
        };

        Ok(SelectStmt {
            distinct,
            top,
            columns,
            from,
            where_clause,
            group_by,
            having,
            order_by,
            limit,
        })
    }

    fn parse_select_columns(&mut self) -> Result<Vec<SelectColumn>> {
        let mut columns = vec![self.parse_select_column()?];
        while self.match_token(TokenType::Comma) {
            columns.push(self.parse_select_column()?);
        }
        Ok(columns)
    }

    fn parse_select_column(&mut self) -> Result<SelectColumn> {
        let offset = self.current().start;

        if self.match_token(TokenType::Star) {
            return Ok(SelectColumn::Star { offset });
        }

        // qualifier.*
        if let Some(qualifier) = self.identifier_at(0) {
            if matches!(self.peek(1).token_type, TokenType::Dot)
                && matches!(self.peek(2).token_type, TokenType::Star)
            {
                self.advance();
                self.advance();
                self.advance();
                return Ok(SelectColumn::QualifiedStar { qualifier, offset });
            }
        }

        let expr = self.parse_expression()?;
        let alias = self.parse_alias(true)?;
        Ok(SelectColumn::Expr { expr, alias })
    }

    /// `[AS] alias`. String literals are accepted after AS in projections.
    fn parse_alias(&mut self, allow_string: bool) -> Result<Option<String>> {
        if self.match_token(TokenType::As) {
            let token = self.current().clone();
            return match token.token_type {
                TokenType::Identifier(name) | TokenType::QuotedIdentifier(name) => {
                    self.advance();
                    Ok(Some(name))
                }
                TokenType::String(name) if allow_string => {
                    self.advance();
                    Ok(Some(name))
                }
                _ => Err(self.expected("alias")),
            };
        }

        match self.identifier_at(0) {
            Some(name) => {
                self.advance();
                Ok(Some(name))
            }
            None => Ok(None),
        }
    }

    fn parse_from_clause(&mut self) -> Result<FromClause> {
        let table = self.parse_table_ref()?;
        let mut joins = Vec::new();

        loop {
            let join_type = match self.current().token_type {
                TokenType::Join => {
                    self.advance();
                    JoinType::Inner
                }
                TokenType::Inner => {
                    self.advance();
                    self.expect(TokenType::Join, "JOIN")?;
                    JoinType::Inner
                }
                TokenType::Left => {
                    self.advance();
                    self.match_token(TokenType::Outer);
                    self.expect(TokenType::Join, "JOIN")?;
                    JoinType::Left
                }
                _ => break,
            };

            let table = self.parse_table_ref()?;
            self.expect(TokenType::On, "ON")?;
            let on_condition = self.parse_expression()?;

            joins.push(Join {
                join_type,
                table,
                on_condition,
            });
        }

        Ok(FromClause { table, joins })
    }

    fn parse_table_ref(&mut self) -> Result<TableRef> {
        let offset = self.current().start;
        let name = match self.identifier_at(0) {
            Some(name) => name,
            None => return Err(self.expected("table name")),
        };
        self.advance();

        let alias = self.parse_alias(false)?;
        Ok(TableRef { name, alias, offset })
    }

    fn parse_order_by(&mut self) -> Result<Vec<OrderByExpr>> {
        let mut items = Vec::new();

        loop {
            let expr = self.parse_expression()?;
            let asc = if self.match_token(TokenType::Desc) {
                false
            } else {
                self.match_token(TokenType::Asc);
                true
            };
            items.push(OrderByExpr { expr, asc });

            if !self.match_token(TokenType::Comma) {
                break;
            }
        }

        Ok(items)
    }

    /// Non-negative integer after TOP / LIMIT
    fn parse_count(&mut self) -> Result<u64> {
        if let TokenType::Number(text) = &self.current().token_type {
            if let Ok(n) = text.parse::<u64>() {
                self.advance();
                return Ok(n);
            }
        }
        Err(self.expected("non-negative integer"))
    }

    fn parse_expr_list(&mut self) -> Result<Vec<Expr>> {
        let mut exprs = vec![self.parse_expression()?];
        while self.match_token(TokenType::Comma) {
            exprs.push(self.parse_expression()?);
        }
        Ok(exprs)
    }

    // ===== Expressions =====

    pub fn parse_expression(&mut self) -> Result<Expr> {
        if self.depth == 0 {
            self.operators = 0;
        }
        self.descend()?;
        let expr = self.parse_or();
        self.depth -= 1;
        expr
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;
        while self.match_token(TokenType::Or) {
            self.count_operator(self.current().start)?;
            let right = self.parse_and()?;
            left = binary(left, BinaryOperator::Or, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_not()?;
        while self.match_token(TokenType::And) {
            self.count_operator(self.current().start)?;
            let right = self.parse_not()?;
            left = binary(left, BinaryOperator::And, right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr> {
        if matches!(self.current().token_type, TokenType::Not) {
            let offset = self.current().start;
            self.descend()?;
            self.advance();
            let expr = self.parse_not();
            self.depth -= 1;
            let expr = expr?;
            self.count_operator(offset)?;
            return Ok(Expr::new(
                ExprKind::UnaryOp {
                    op: UnaryOperator::Not,
                    expr: expr.boxed(),
                },
                offset,
            ));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let left = self.parse_additive()?;
        let offset = left.offset;

        let expr = if let Some(op) = comparison_operator(&self.current().token_type) {
            self.advance();
            let right = self.parse_additive()?;
            binary(left, op, right)
        } else {
            match self.current().token_type {
                TokenType::Is => {
                    self.advance();
                    let negated = self.match_token(TokenType::Not);
                    self.expect(TokenType::Null, "NULL")?;
                    Expr::new(
                        ExprKind::IsNull {
                            expr: left.boxed(),
                            negated,
                        },
                        offset,
                    )
                }
                TokenType::In => {
                    self.advance();
                    self.parse_in_list(left, false)?
                }
                TokenType::Like => {
                    self.advance();
                    self.parse_like(left, false)?
                }
                TokenType::Not if matches!(self.peek(1).token_type, TokenType::In) => {
                    self.advance();
                    self.advance();
                    self.parse_in_list(left, true)?
                }
                TokenType::Not if matches!(self.peek(1).token_type, TokenType::Like) => {
                    self.advance();
                    self.advance();
                    self.parse_like(left, true)?
                }
                _ => return Ok(left),
            }
        };

        if self.at_comparison() {
            return Err(ParseError::syntax(
                "Comparison operators cannot be chained; use AND",
                self.current().start,
            ));
        }

        Ok(expr)
    }

    fn at_comparison(&self) -> bool {
        let token = &self.current().token_type;
        comparison_operator(token).is_some()
            || matches!(token, TokenType::Is | TokenType::In | TokenType::Like)
            || (matches!(token, TokenType::Not)
                && matches!(self.peek(1).token_type, TokenType::In | TokenType::Like))
    }

    fn parse_in_list(&mut self, left: Expr, negated: bool) -> Result<Expr> {
        let offset = left.offset;
        self.expect(TokenType::LParen, "'('")?;
        let list = self.parse_expr_list()?;
        self.expect(TokenType::RParen, "')'")?;
        Ok(Expr::new(
            ExprKind::In {
                expr: left.boxed(),
                list,
                negated,
            },
            offset,
        ))
    }

    fn parse_like(&mut self, left: Expr, negated: bool) -> Result<Expr> {
        let offset = left.offset;
        let pattern = match &self.current().token_type {
            TokenType::String(s) => s.clone(),
            _ => return Err(self.expected("string pattern")),
        };
        self.advance();
        Ok(Expr::new(
            ExprKind::Like {
                expr: left.boxed(),
                pattern,
                negated,
            },
            offset,
        ))
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.current().token_type {
                TokenType::Plus => BinaryOperator::Add,
                TokenType::Minus => BinaryOperator::Sub,
                _ => break,
            };
            self.count_operator(self.current().start)?;
            self.advance();
            let right = self.parse_multiplicative()?;
            left = binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.current().token_type {
                TokenType::Star => BinaryOperator::Mul,
                TokenType::Slash => BinaryOperator::Div,
                _ => break,
            };
            self.count_operator(self.current().start)?;
            self.advance();
            let right = self.parse_unary()?;
            left = binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        if matches!(self.current().token_type, TokenType::Minus) {
            let offset = self.current().start;
            self.descend()?;
            self.advance();
            let expr = self.parse_unary();
            self.depth -= 1;
            let expr = expr?;

            // Fold negative numeric literals so `-1` stays a literal
            let kind = match expr.kind {
                ExprKind::Literal(Value::Integer(i)) if i != i64::MIN => ExprKind::Literal(Value::Integer(-i)),
                ExprKind::Literal(Value::Float(f)) => ExprKind::Literal(Value::Float(-f)),
                kind => {
                    self.count_operator(offset)?;
                    ExprKind::UnaryOp {
                        op: UnaryOperator::Minus,
                        expr: Expr::new(kind, expr.offset).boxed(),
                    }
                }
            };
            return Ok(Expr::new(kind, offset));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let token = self.current().clone();
        let offset = token.start;

        match token.token_type {
            TokenType::Number(text) => {
                self.advance();
                Ok(Expr::new(ExprKind::Literal(parse_number(&text, offset)?), offset))
            }
            TokenType::String(s) => {
                self.advance();
                Ok(Expr::new(ExprKind::Literal(Value::text_or_date(s)), offset))
            }
            TokenType::True => {
                self.advance();
                Ok(Expr::new(ExprKind::Literal(Value::Bool(true)), offset))
            }
            TokenType::False => {
                self.advance();
                Ok(Expr::new(ExprKind::Literal(Value::Bool(false)), offset))
            }
            TokenType::Null => {
                self.advance();
                Ok(Expr::new(ExprKind::Literal(Value::Null), offset))
            }
            TokenType::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(TokenType::RParen, "')'")?;
                Ok(expr)
            }
            ref tt if tt.aggregate_name().is_some() => {
                let name = tt.aggregate_name().unwrap_or_default().to_string();
                self.advance();
                if !matches!(self.current().token_type, TokenType::LParen) {
                    return Err(self.expected("'('"));
                }
                self.parse_function_call(name, offset)
            }
            TokenType::Identifier(name) => {
                self.advance();
                match self.current().token_type {
                    TokenType::LParen => self.parse_function_call(name, offset),
                    TokenType::Dot => self.parse_qualified_column(name, offset),
                    _ => Ok(Expr::new(ExprKind::Column { qualifier: None, name }, offset)),
                }
            }
            TokenType::QuotedIdentifier(name) => {
                self.advance();
                match self.current().token_type {
                    TokenType::Dot => self.parse_qualified_column(name, offset),
                    _ => Ok(Expr::new(ExprKind::Column { qualifier: None, name }, offset)),
                }
            }
            _ => Err(self.expected("expression")),
        }
    }

    fn parse_qualified_column(&mut self, qualifier: String, offset: usize) -> Result<Expr> {
        self.expect(TokenType::Dot, "'.'")?;
        let name = match self.identifier_at(0) {
            Some(name) => name,
            None => return Err(self.expected("column name")),
        };
        self.advance();
        Ok(Expr::new(
            ExprKind::Column {
                qualifier: Some(qualifier),
                name,
            },
            offset,
        ))
    }

    /// Parse function call: name(args), name(*), name(DISTINCT arg)
    fn parse_function_call(&mut self, name: String, offset: usize) -> Result<Expr> {
        self.expect(TokenType::LParen, "'('")?;

        let distinct = self.match_token(TokenType::Distinct);

        let args = if self.match_token(TokenType::Star) {
            FunctionArgs::Star
        } else if matches!(self.current().token_type, TokenType::RParen) {
            FunctionArgs::List(Vec::new())
        } else {
            FunctionArgs::List(self.parse_expr_list()?)
        };

        self.expect(TokenType::RParen, "')'")?;

        Ok(Expr::new(
            ExprKind::FunctionCall {
                name,
                args,
                distinct,
            },
            offset,
        ))
    }

    // ===== Helpers =====

    fn descend(&mut self) -> Result<()> {
        if self.depth >= MAX_EXPRESSION_DEPTH {
            return Err(ParseError::syntax("Expression nesting too deep", self.current().start));
        }
        self.depth += 1;
        Ok(())
    }

    fn count_operator(&mut self, offset: usize) -> Result<()> {
        if self.operators >= MAX_EXPRESSION_OPERATORS {
            return Err(ParseError::syntax("Expression has too many operators", offset));
        }
        self.operators += 1;
        Ok(())
    }

    fn current(&self) -> &Token {
        self.peek(0)
    }

    fn peek(&self, ahead: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.position + ahead).min(last)]
    }

    /// Name carried by a plain or quoted identifier `ahead` tokens away
    fn identifier_at(&self, ahead: usize) -> Option<String> {
        match &self.peek(ahead).token_type {
            TokenType::Identifier(name) | TokenType::QuotedIdentifier(name) => Some(name.clone()),
            _ => None,
        }
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
    }

    fn match_token(&mut self, token_type: TokenType) -> bool {
        if std::mem::discriminant(&self.current().token_type) == std::mem::discriminant(&token_type) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token_type: TokenType, what: &str) -> Result<()> {
        if self.match_token(token_type) {
            Ok(())
        } else {
            Err(self.expected(what))
        }
    }

    fn expected(&self, what: &str) -> ParseError {
        let token = self.current();
        ParseError::expected(what, &token.describe(), token.start)
    }
}

fn binary(left: Expr, op: BinaryOperator, right: Expr) -> Expr {
    let offset = left.offset;
    Expr::new(
        ExprKind::BinaryOp {
            left: left.boxed(),
            op,
            right: right.boxed(),
        },
        offset,
    )
}

fn comparison_operator(token_type: &TokenType) -> Option<BinaryOperator> {
    match token_type {
        TokenType::Eq => Some(BinaryOperator::Eq),
        TokenType::Ne => Some(BinaryOperator::Ne),
        TokenType::Lt => Some(BinaryOperator::Lt),
        TokenType::Gt => Some(BinaryOperator::Gt),
        TokenType::Le => Some(BinaryOperator::Le),
        TokenType::Ge => Some(BinaryOperator::Ge),
        _ => None,
    }
}

/// Integer literals that fit `i64` stay integers; everything else is floating
fn parse_number(text: &str, offset: usize) -> Result<Value> {
    if let Ok(i) = text.parse::<i64>() {
        return Ok(Value::Integer(i));
    }
    text.parse::<f64>()
        .map(Value::Float)
        .map_err(|_| ParseError::syntax(format!("Invalid number '{}'", text), offset))
}

/// Tokenize and parse one statement
pub fn parse_sql(sql: &str) -> Result<SelectStmt> {
    let tokens = Lexer::new(sql).tokenize()?;
    Parser::new(tokens).parse()
}
