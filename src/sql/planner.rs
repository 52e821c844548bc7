//! Binder: resolves a parsed SELECT against a table source.
//!
//! Binding runs FROM, WHERE, GROUP BY, projection, HAVING, ORDER BY in that
//! order. Column references become positions in the combined input row (the
//! concatenation of every FROM table's columns). In grouped statements the
//! projection, HAVING and ORDER BY are then rewritten over the group row
//! `[group keys..., aggregates...]`.

use super::ast::*;
use super::evaluator::{CompiledPattern, ScalarFunc};
use crate::catalog::{Table, TableSource};
use crate::error::{BindError, ExecutionError, ExecutionErrorKind, Result};
use crate::types::{ColumnKind, Value};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Expression with names resolved to row positions
#[derive(Debug, Clone)]
pub struct BoundExpr {
    pub kind: BoundKind,
    /// Source offset, for error reporting
    pub offset: usize,
}

/// Structural equality: source offsets are ignored
impl PartialEq for BoundExpr {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoundKind {
    /// Position in the input row
    Column(usize),
    Literal(Value),
    Unary {
        op: UnaryOperator,
        expr: Box<BoundExpr>,
    },
    Binary {
        op: BinaryOperator,
        left: Box<BoundExpr>,
        right: Box<BoundExpr>,
    },
    In {
        expr: Box<BoundExpr>,
        list: Vec<BoundExpr>,
        negated: bool,
    },
    Like {
        expr: Box<BoundExpr>,
        pattern: CompiledPattern,
        negated: bool,
    },
    IsNull {
        expr: Box<BoundExpr>,
        negated: bool,
    },
    Scalar {
        func: ScalarFunc,
        args: Vec<BoundExpr>,
    },
    Aggregate(AggregateCall),
}

impl BoundExpr {
    pub fn new(kind: BoundKind, offset: usize) -> Self {
        Self { kind, offset }
    }

    pub fn contains_aggregate(&self) -> bool {
        match &self.kind {
            BoundKind::Aggregate(_) => true,
            BoundKind::Column(_) | BoundKind::Literal(_) => false,
            BoundKind::Unary { expr, .. } | BoundKind::Like { expr, .. } | BoundKind::IsNull { expr, .. } => {
                expr.contains_aggregate()
            }
            BoundKind::Binary { left, right, .. } => left.contains_aggregate() || right.contains_aggregate(),
            BoundKind::In { expr, list, .. } => {
                expr.contains_aggregate() || list.iter().any(BoundExpr::contains_aggregate)
            }
            BoundKind::Scalar { args, .. } => args.iter().any(BoundExpr::contains_aggregate),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunc {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFunc {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "COUNT" => Some(AggregateFunc::Count),
            "SUM" => Some(AggregateFunc::Sum),
            "AVG" => Some(AggregateFunc::Avg),
            "MIN" => Some(AggregateFunc::Min),
            "MAX" => Some(AggregateFunc::Max),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AggregateFunc::Count => "COUNT",
            AggregateFunc::Sum => "SUM",
            AggregateFunc::Avg => "AVG",
            AggregateFunc::Min => "MIN",
            AggregateFunc::Max => "MAX",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateCall {
    pub func: AggregateFunc,
    /// `None` for COUNT(*)
    pub arg: Option<Box<BoundExpr>>,
    pub distinct: bool,
    /// MIN/MAX whose argument is statically text; an empty group is an error
    pub text_argument: bool,
}

/// Aggregate computed once per group
#[derive(Debug, Clone)]
pub struct BoundAggregate {
    pub call: AggregateCall,
    pub offset: usize,
}

#[derive(Debug, Clone)]
pub struct JoinStep {
    pub join_type: JoinType,
    /// Bound over the tables up to and including this one
    pub on: BoundExpr,
}

#[derive(Debug, Clone)]
pub struct PlanSource {
    pub table: Arc<Table>,
    pub alias: String,
    /// `None` for the primary table
    pub join: Option<JoinStep>,
}

#[derive(Debug, Clone)]
pub struct Grouping {
    /// Bound over the input row
    pub keys: Vec<BoundExpr>,
    /// Bound over the input row; results follow the keys in the group row
    pub aggregates: Vec<BoundAggregate>,
}

#[derive(Debug, Clone)]
pub enum SortTarget {
    /// Output column by position (ORDER BY alias or ordinal)
    Output(usize),
    /// Evaluated over the pre-projection row
    Expr(BoundExpr),
}

#[derive(Debug, Clone)]
pub struct SortKey {
    pub target: SortTarget,
    pub descending: bool,
}

/// A statement bound against one catalog snapshot
#[derive(Debug, Clone)]
pub struct SelectPlan {
    pub sources: Vec<PlanSource>,
    pub filter: Option<BoundExpr>,
    pub grouping: Option<Grouping>,
    /// Over the group row
    pub having: Option<BoundExpr>,
    /// Over the input row, or the group row when grouped
    pub projection: Vec<BoundExpr>,
    pub columns: Vec<String>,
    pub distinct: bool,
    pub order_by: Vec<SortKey>,
    pub top: Option<usize>,
    pub limit: Option<usize>,
}

impl SelectPlan {
    /// Width of the combined input row
    pub fn input_width(&self) -> usize {
        self.sources.iter().map(|s| s.table.columns().len()).sum()
    }
}

/// Bind a parsed statement against `source`
#[instrument(level = "debug", skip_all)]
pub fn plan<S: TableSource + ?Sized>(stmt: &SelectStmt, source: &S) -> Result<SelectPlan> {
    if stmt.top.is_some() && stmt.limit.is_some() {
        return Err(BindError::TopAndLimitConflict.into());
    }
    if stmt.distinct && !stmt.group_by.is_empty() {
        return Err(BindError::DistinctAndGroupByConflict.into());
    }

    let mut binder = Binder::default();
    let mut sources = Vec::new();

    if let Some(from) = &stmt.from {
        let table = binder.add_table(&from.table, source)?;
        sources.push(PlanSource {
            table,
            alias: from.table.effective_alias().to_string(),
            join: None,
        });

        for join in &from.joins {
            let table = binder.add_table(&join.table, source)?;
            let on = binder.bind(&join.on_condition, AggregatePolicy::Forbidden("JOIN ON"))?;
            sources.push(PlanSource {
                table,
                alias: join.table.effective_alias().to_string(),
                join: Some(JoinStep {
                    join_type: join.join_type,
                    on,
                }),
            });
        }
    }

    let filter = stmt
        .where_clause
        .as_ref()
        .map(|e| binder.bind(e, AggregatePolicy::Forbidden("WHERE")))
        .transpose()?;

    let keys = stmt
        .group_by
        .iter()
        .map(|e| binder.bind(e, AggregatePolicy::GroupKey))
        .collect::<Result<Vec<_>>>()?;

    // Projection, with `*` expansion and output naming
    let mut projection = Vec::new();
    let mut columns = Vec::new();
    let mut aliases: Vec<Option<&str>> = Vec::new();

    for (index, item) in stmt.columns.iter().enumerate() {
        match item {
            SelectColumn::Star { offset } => {
                for pos in 0..binder.names.len() {
                    projection.push(BoundExpr::new(BoundKind::Column(pos), *offset));
                    columns.push(binder.names[pos].clone());
                    aliases.push(None);
                }
            }
            SelectColumn::QualifiedStar { qualifier, offset } => {
                let entry = binder.entry_for(qualifier, *offset)?;
                let (base, width) = (entry.base, entry.table.columns().len());
                for pos in base..base + width {
                    projection.push(BoundExpr::new(BoundKind::Column(pos), *offset));
                    columns.push(binder.names[pos].clone());
                    aliases.push(None);
                }
            }
            SelectColumn::Expr { expr, alias } => {
                let bound = binder.bind(expr, AggregatePolicy::Allowed)?;
                let name = match (alias, &expr.kind, &bound.kind) {
                    (Some(alias), _, _) => alias.clone(),
                    (None, ExprKind::Column { .. }, BoundKind::Column(pos)) => binder.names[*pos].clone(),
                    _ => format!("expr_{}", index + 1),
                };
                projection.push(bound);
                columns.push(name);
                aliases.push(alias.as_deref());
            }
        }
    }

    let mut having = stmt
        .having
        .as_ref()
        .map(|e| binder.bind(e, AggregatePolicy::Allowed))
        .transpose()?;

    let mut order_by = Vec::with_capacity(stmt.order_by.len());
    for item in &stmt.order_by {
        let target = binder.sort_target(&item.expr, &aliases)?;
        order_by.push(SortKey {
            target,
            descending: !item.asc,
        });
    }

    let grouped = !keys.is_empty()
        || having.is_some()
        || projection.iter().any(BoundExpr::contains_aggregate)
        || order_by.iter().any(|k| match &k.target {
            SortTarget::Expr(e) => e.contains_aggregate(),
            SortTarget::Output(_) => false,
        });

    let grouping = if grouped {
        let mut aggregates = Vec::new();

        projection = projection
            .iter()
            .map(|e| rewrite_grouped(e, &keys, &mut aggregates))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        having = having
            .as_ref()
            .map(|e| rewrite_grouped(e, &keys, &mut aggregates))
            .transpose()?;
        for key in &mut order_by {
            if let SortTarget::Expr(e) = &key.target {
                key.target = SortTarget::Expr(rewrite_grouped(e, &keys, &mut aggregates)?);
            }
        }

        Some(Grouping { keys, aggregates })
    } else {
        None
    };

    let plan = SelectPlan {
        sources,
        filter,
        grouping,
        having,
        projection,
        columns,
        distinct: stmt.distinct,
        order_by,
        top: stmt.top.map(|t| usize::try_from(t.count).unwrap_or(usize::MAX)),
        limit: stmt.limit.map(|l| usize::try_from(l.count).unwrap_or(usize::MAX)),
    };

    debug!(
        sources = plan.sources.len(),
        outputs = plan.columns.len(),
        grouped,
        "bound statement"
    );
    Ok(plan)
}

/// Where aggregate calls may appear while binding an expression
#[derive(Debug, Clone, Copy)]
enum AggregatePolicy {
    Allowed,
    /// Inside another aggregate's argument
    Nested,
    /// WHERE or JOIN ON
    Forbidden(&'static str),
    GroupKey,
}

#[derive(Debug)]
struct ScopeEntry {
    alias_key: String,
    table_key: String,
    table: Arc<Table>,
    /// Position of the table's first column in the combined row
    base: usize,
}

/// Tables in scope plus per-position column names and kinds
#[derive(Debug, Default)]
struct Binder {
    entries: Vec<ScopeEntry>,
    names: Vec<String>,
    kinds: Vec<ColumnKind>,
}

impl Binder {
    fn add_table<S: TableSource + ?Sized>(&mut self, table_ref: &TableRef, source: &S) -> Result<Arc<Table>> {
        let table = source.lookup(&table_ref.name).map_err(|e| match e {
            BindError::UnknownTable { name, .. } => BindError::UnknownTable {
                name,
                offset: Some(table_ref.offset),
            },
            other => other,
        })?;

        let alias = table_ref.effective_alias();
        let alias_key = alias.to_lowercase();
        if self.entries.iter().any(|e| e.alias_key == alias_key) {
            return Err(BindError::DuplicateAlias {
                alias: alias.to_string(),
                offset: table_ref.offset,
            }
            .into());
        }

        let base = self.names.len();
        for column in table.columns() {
            self.names.push(column.name.clone());
            self.kinds.push(column.kind);
        }

        self.entries.push(ScopeEntry {
            alias_key,
            table_key: table.key().to_string(),
            table: Arc::clone(&table),
            base,
        });
        Ok(table)
    }

    /// Scope entry for a qualifier: alias first, then table name
    fn entry_for(&self, qualifier: &str, offset: usize) -> std::result::Result<&ScopeEntry, BindError> {
        let key = qualifier.to_lowercase();
        if let Some(entry) = self.entries.iter().find(|e| e.alias_key == key) {
            return Ok(entry);
        }

        let mut by_table = self.entries.iter().filter(|e| e.table_key == key);
        match (by_table.next(), by_table.next()) {
            (Some(entry), None) => Ok(entry),
            (Some(_), Some(_)) => Err(BindError::AmbiguousColumn {
                name: qualifier.to_string(),
                offset,
            }),
            (None, _) => Err(BindError::UnknownTable {
                name: qualifier.to_string(),
                offset: Some(offset),
            }),
        }
    }

    fn resolve(&self, qualifier: Option<&str>, name: &str, offset: usize) -> std::result::Result<usize, BindError> {
        match qualifier {
            Some(q) => {
                let entry = self.entry_for(q, offset)?;
                entry
                    .table
                    .column_position(name)
                    .map(|pos| entry.base + pos)
                    .ok_or_else(|| BindError::UnknownColumn {
                        name: format!("{}.{}", q, name),
                        offset,
                    })
            }
            None => {
                let mut found = self
                    .entries
                    .iter()
                    .filter_map(|e| e.table.column_position(name).map(|pos| e.base + pos));
                match (found.next(), found.next()) {
                    (Some(pos), None) => Ok(pos),
                    (Some(_), Some(_)) => Err(BindError::AmbiguousColumn {
                        name: name.to_string(),
                        offset,
                    }),
                    (None, _) => Err(BindError::UnknownColumn {
                        name: name.to_string(),
                        offset,
                    }),
                }
            }
        }
    }

    fn bind(&self, expr: &Expr, policy: AggregatePolicy) -> Result<BoundExpr> {
        let kind = match &expr.kind {
            ExprKind::Column { qualifier, name } => {
                BoundKind::Column(self.resolve(qualifier.as_deref(), name, expr.offset)?)
            }

            ExprKind::Literal(value) => BoundKind::Literal(value.clone()),

            ExprKind::UnaryOp { op, expr: inner } => {
                let inner = self.bind(inner, policy)?;
                if *op == UnaryOperator::Minus {
                    require_numeric_literal(&inner, "-")?;
                }
                BoundKind::Unary {
                    op: *op,
                    expr: Box::new(inner),
                }
            }

            ExprKind::BinaryOp { left, op, right } => {
                let left = self.bind(left, policy)?;
                let right = self.bind(right, policy)?;
                if op.is_arithmetic() {
                    require_numeric_literal(&left, op.symbol())?;
                    require_numeric_literal(&right, op.symbol())?;
                }
                BoundKind::Binary {
                    op: *op,
                    left: Box::new(left),
                    right: Box::new(right),
                }
            }

            ExprKind::In { expr: inner, list, negated } => BoundKind::In {
                expr: Box::new(self.bind(inner, policy)?),
                list: list
                    .iter()
                    .map(|e| self.bind(e, policy))
                    .collect::<Result<Vec<_>>>()?,
                negated: *negated,
            },

            ExprKind::Like { expr: inner, pattern, negated } => BoundKind::Like {
                expr: Box::new(self.bind(inner, policy)?),
                pattern: CompiledPattern::compile(pattern),
                negated: *negated,
            },

            ExprKind::IsNull { expr: inner, negated } => BoundKind::IsNull {
                expr: Box::new(self.bind(inner, policy)?),
                negated: *negated,
            },

            ExprKind::FunctionCall { name, args, distinct } => {
                self.bind_function(name, args, *distinct, expr.offset, policy)?
            }
        };

        Ok(BoundExpr::new(kind, expr.offset))
    }

    fn bind_function(
        &self,
        name: &str,
        args: &FunctionArgs,
        distinct: bool,
        offset: usize,
        policy: AggregatePolicy,
    ) -> Result<BoundKind> {
        if let Some(func) = AggregateFunc::from_name(name) {
            match policy {
                AggregatePolicy::Allowed => {}
                AggregatePolicy::Nested => return Err(BindError::NestedAggregate { offset }.into()),
                AggregatePolicy::Forbidden(clause) => {
                    return Err(BindError::AggregateInWhere { clause, offset }.into())
                }
                AggregatePolicy::GroupKey => return Err(BindError::AggregateInGroupBy { offset }.into()),
            }

            let arg = match args {
                FunctionArgs::Star if func == AggregateFunc::Count && !distinct => None,
                FunctionArgs::Star => {
                    return Err(ExecutionError::invalid_argument(
                        format!("{} does not accept '*' here", func.name()),
                        offset,
                    )
                    .into())
                }
                FunctionArgs::List(list) if list.len() == 1 => {
                    Some(Box::new(self.bind(&list[0], AggregatePolicy::Nested)?))
                }
                FunctionArgs::List(list) => {
                    return Err(ExecutionError::invalid_argument(
                        format!("{} expects exactly one argument, got {}", func.name(), list.len()),
                        offset,
                    )
                    .into())
                }
            };

            let text_argument = matches!(func, AggregateFunc::Min | AggregateFunc::Max)
                && arg.as_deref().is_some_and(|a| self.is_text(a));

            return Ok(BoundKind::Aggregate(AggregateCall {
                func,
                arg,
                distinct,
                text_argument,
            }));
        }

        let func = ScalarFunc::from_name(name).ok_or_else(|| {
            ExecutionError::new(
                ExecutionErrorKind::UnknownFunction,
                format!("Unknown function '{}'", name),
                offset,
            )
        })?;

        if distinct {
            return Err(ExecutionError::invalid_argument(
                format!("DISTINCT is not allowed in {}", func.name()),
                offset,
            )
            .into());
        }

        let list = match args {
            FunctionArgs::Star => {
                return Err(ExecutionError::invalid_argument(
                    format!("{} does not accept '*'", func.name()),
                    offset,
                )
                .into())
            }
            FunctionArgs::List(list) => list,
        };

        let (min, max) = func.arity();
        if list.len() < min || list.len() > max {
            let expected = if min == max {
                min.to_string()
            } else if max == usize::MAX {
                format!("at least {}", min)
            } else {
                format!("{} to {}", min, max)
            };
            return Err(ExecutionError::invalid_argument(
                format!("{} expects {} argument(s), got {}", func.name(), expected, list.len()),
                offset,
            )
            .into());
        }

        let args = list
            .iter()
            .map(|a| self.bind(a, policy))
            .collect::<Result<Vec<_>>>()?;
        Ok(BoundKind::Scalar { func, args })
    }

    /// Statically text-valued: text/date columns, text literals, text functions
    fn is_text(&self, expr: &BoundExpr) -> bool {
        match &expr.kind {
            BoundKind::Column(pos) => matches!(self.kinds.get(*pos), Some(ColumnKind::Text | ColumnKind::Date)),
            BoundKind::Literal(value) => value.is_textual(),
            BoundKind::Scalar { func, .. } => func.returns_text(),
            _ => false,
        }
    }

    /// ORDER BY item: projection alias, 1-based ordinal, or expression
    fn sort_target(&self, expr: &Expr, aliases: &[Option<&str>]) -> Result<SortTarget> {
        match &expr.kind {
            ExprKind::Column { qualifier: None, name } => {
                if let Some(pos) = aliases
                    .iter()
                    .position(|a| a.is_some_and(|a| a.eq_ignore_ascii_case(name)))
                {
                    return Ok(SortTarget::Output(pos));
                }
            }
            ExprKind::Literal(Value::Integer(position)) => {
                let position = *position;
                return if position >= 1 && (position as u64) <= aliases.len() as u64 {
                    Ok(SortTarget::Output(position as usize - 1))
                } else {
                    Err(BindError::InvalidOrdinal {
                        position,
                        offset: expr.offset,
                    }
                    .into())
                };
            }
            _ => {}
        }

        Ok(SortTarget::Expr(self.bind(expr, AggregatePolicy::Allowed)?))
    }
}

/// Arithmetic on a literal that can never be numeric fails at bind time
fn require_numeric_literal(expr: &BoundExpr, op: &str) -> Result<()> {
    match &expr.kind {
        BoundKind::Literal(value @ (Value::Text(_) | Value::Date(_) | Value::Bool(_))) => {
            Err(ExecutionError::type_mismatch(
                format!("Operator '{}' requires numeric operands, found {}", op, value.type_name()),
                expr.offset,
            )
            .into())
        }
        _ => Ok(()),
    }
}

/// Re-express `expr` over the group row. Group keys and aggregates become
/// slots; any other column reference is an error.
fn rewrite_grouped(
    expr: &BoundExpr,
    keys: &[BoundExpr],
    aggregates: &mut Vec<BoundAggregate>,
) -> std::result::Result<BoundExpr, BindError> {
    if let Some(pos) = keys.iter().position(|k| k == expr) {
        return Ok(BoundExpr::new(BoundKind::Column(pos), expr.offset));
    }

    let kind = match &expr.kind {
        BoundKind::Aggregate(call) => {
            let slot = match aggregates.iter().position(|a| a.call == *call) {
                Some(slot) => slot,
                None => {
                    aggregates.push(BoundAggregate {
                        call: call.clone(),
                        offset: expr.offset,
                    });
                    aggregates.len() - 1
                }
            };
            BoundKind::Column(keys.len() + slot)
        }
        BoundKind::Column(_) => return Err(BindError::NonGroupedColumn { offset: expr.offset }),
        BoundKind::Literal(value) => BoundKind::Literal(value.clone()),
        BoundKind::Unary { op, expr: inner } => BoundKind::Unary {
            op: *op,
            expr: Box::new(rewrite_grouped(inner, keys, aggregates)?),
        },
        BoundKind::Binary { op, left, right } => BoundKind::Binary {
            op: *op,
            left: Box::new(rewrite_grouped(left, keys, aggregates)?),
            right: Box::new(rewrite_grouped(right, keys, aggregates)?),
        },
        BoundKind::In { expr: inner, list, negated } => BoundKind::In {
            expr: Box::new(rewrite_grouped(inner, keys, aggregates)?),
            list: list
                .iter()
                .map(|e| rewrite_grouped(e, keys, aggregates))
                .collect::<std::result::Result<Vec<_>, _>>()?,
            negated: *negated,
        },
        BoundKind::Like { expr: inner, pattern, negated } => BoundKind::Like {
            expr: Box::new(rewrite_grouped(inner, keys, aggregates)?),
            pattern: pattern.clone(),
            negated: *negated,
        },
        BoundKind::IsNull { expr: inner, negated } => BoundKind::IsNull {
            expr: Box::new(rewrite_grouped(inner, keys, aggregates)?),
            negated: *negated,
        },
        BoundKind::Scalar { func, args } => BoundKind::Scalar {
            func: *func,
            args: args
                .iter()
                .map(|e| rewrite_grouped(e, keys, aggregates))
                .collect::<std::result::Result<Vec<_>, _>>()?,
        },
    };

    Ok(BoundExpr::new(kind, expr.offset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::error::Error;
    use crate::sql::parser::parse_sql;

    fn catalog() -> Catalog {
        let catalog = Catalog::new();
        catalog
            .register(
                "samples",
                vec!["id".into(), "name".into(), "collected_on".into()],
                vec![vec![Value::Integer(1), Value::from("blood"), Value::from("2024-01-02")]],
                None,
            )
            .unwrap();
        catalog
            .register(
                "results",
                vec!["id".into(), "sample_id".into(), "value".into()],
                vec![vec![Value::Integer(10), Value::Integer(1), Value::Float(4.2)]],
                None,
            )
            .unwrap();
        catalog
    }

    fn bind(sql: &str) -> Result<SelectPlan> {
        plan(&parse_sql(sql).unwrap(), &catalog())
    }

    fn bind_err(sql: &str) -> BindError {
        match bind(sql) {
            Err(Error::Bind(e)) => e,
            other => panic!("Expected bind error for {:?}, got {:?}", sql, other),
        }
    }

    fn exec_err(sql: &str) -> ExecutionError {
        match bind(sql) {
            Err(Error::Execution(e)) => e,
            other => panic!("Expected execution error for {:?}, got {:?}", sql, other),
        }
    }

    #[test]
    fn test_output_names() {
        let p = bind("SELECT id, name AS label, id + 1, COUNT(*) FROM samples GROUP BY id, name").unwrap();
        assert_eq!(p.columns, vec!["id", "label", "expr_3", "expr_4"]);

        let p = bind("SELECT * FROM samples s JOIN results r ON r.sample_id = s.id").unwrap();
        assert_eq!(p.columns, vec!["id", "name", "collected_on", "id", "sample_id", "value"]);
        assert_eq!(p.input_width(), 6);

        let p = bind("SELECT r.*, ID FROM samples s JOIN results r ON r.sample_id = s.id").unwrap_err();
        assert!(matches!(p, Error::Bind(BindError::AmbiguousColumn { offset: 12, .. })));

        let p = bind("SELECT r.*, s.ID FROM samples s JOIN results r ON r.sample_id = s.id").unwrap();
        assert_eq!(p.columns, vec!["id", "sample_id", "value", "id"]);
        assert!(matches!(p.projection[3].kind, BoundKind::Column(0)));
    }

    #[test]
    fn test_name_resolution_errors() {
        assert_eq!(
            bind_err("SELECT nope FROM samples"),
            BindError::UnknownColumn {
                name: "nope".into(),
                offset: 7
            }
        );
        assert_eq!(
            bind_err("SELECT id FROM missing"),
            BindError::UnknownTable {
                name: "missing".into(),
                offset: Some(15)
            }
        );
        assert!(matches!(
            bind_err("SELECT x.id FROM samples s"),
            BindError::UnknownTable { offset: Some(7), .. }
        ));
        assert!(matches!(
            bind_err("SELECT 1 FROM samples s JOIN results s ON 1 = 1"),
            BindError::DuplicateAlias { .. }
        ));

        // table name still qualifies an aliased table
        assert!(bind("SELECT samples.name FROM samples s").is_ok());
    }

    #[test]
    fn test_join_on_sees_only_earlier_tables() {
        let err = plan(
            &parse_sql("SELECT 1 FROM samples s JOIN results r ON r.id = x.id JOIN samples x ON 1 = 1").unwrap(),
            &catalog(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Bind(BindError::UnknownTable { .. })));
    }

    #[test]
    fn test_aggregate_placement() {
        assert!(matches!(
            bind_err("SELECT id FROM samples WHERE COUNT(*) > 1"),
            BindError::AggregateInWhere { clause: "WHERE", offset: 29 }
        ));
        assert!(matches!(
            bind_err("SELECT COUNT(*) FROM samples GROUP BY COUNT(*)"),
            BindError::AggregateInGroupBy { .. }
        ));
        assert!(matches!(
            bind_err("SELECT SUM(COUNT(id)) FROM samples"),
            BindError::NestedAggregate { offset: 11 }
        ));
        assert_eq!(
            bind_err("SELECT name, COUNT(*) FROM samples"),
            BindError::NonGroupedColumn { offset: 7 }
        );
        assert_eq!(
            bind_err("SELECT name FROM samples GROUP BY id"),
            BindError::NonGroupedColumn { offset: 7 }
        );
    }

    #[test]
    fn test_group_rewrite_uses_slots() {
        let p = bind("SELECT id + 1, COUNT(*) * 2, 7 FROM samples GROUP BY id + 1 HAVING COUNT(*) > 0").unwrap();
        let grouping = p.grouping.as_ref().unwrap();
        assert_eq!(grouping.keys.len(), 1);
        assert_eq!(grouping.aggregates.len(), 1);

        assert!(matches!(p.projection[0].kind, BoundKind::Column(0)));
        match &p.projection[1].kind {
            BoundKind::Binary { left, .. } => assert!(matches!(left.kind, BoundKind::Column(1))),
            other => panic!("Expected binary, got {:?}", other),
        }
        assert!(p.having.is_some());
    }

    #[test]
    fn test_clause_conflicts() {
        assert_eq!(bind_err("SELECT TOP 1 id FROM samples LIMIT 1"), BindError::TopAndLimitConflict);
        assert_eq!(
            bind_err("SELECT DISTINCT id FROM samples GROUP BY id"),
            BindError::DistinctAndGroupByConflict
        );
    }

    #[test]
    fn test_order_by_alias_and_ordinal() {
        let p = bind("SELECT name AS n, id FROM samples ORDER BY n DESC, 2, id").unwrap();
        assert!(matches!(p.order_by[0].target, SortTarget::Output(0)));
        assert!(p.order_by[0].descending);
        assert!(matches!(p.order_by[1].target, SortTarget::Output(1)));
        assert!(matches!(p.order_by[2].target, SortTarget::Expr(_)));

        assert!(matches!(
            bind_err("SELECT id FROM samples ORDER BY 3"),
            BindError::InvalidOrdinal { position: 3, offset: 32 }
        ));
    }

    #[test]
    fn test_function_validation() {
        let err = exec_err("SELECT median(id) FROM samples");
        assert_eq!(err.kind, ExecutionErrorKind::UnknownFunction);
        assert_eq!(err.offset, 7);

        assert_eq!(exec_err("SELECT LOWER(name, id) FROM samples").kind, ExecutionErrorKind::InvalidArgument);
        assert_eq!(exec_err("SELECT SUM(*) FROM samples").kind, ExecutionErrorKind::InvalidArgument);

        let err = exec_err("SELECT id + 'a' FROM samples");
        assert_eq!(err.kind, ExecutionErrorKind::TypeMismatch);
        assert_eq!(err.offset, 12);
    }

    #[test]
    fn test_min_max_text_argument() {
        let p = bind("SELECT MIN(name), MAX(id) FROM samples").unwrap();
        let aggregates = &p.grouping.unwrap().aggregates;
        assert!(aggregates[0].call.text_argument);
        assert!(!aggregates[1].call.text_argument);
    }

    #[test]
    fn test_from_less_select() {
        let p = bind("SELECT 1 + 1 AS two").unwrap();
        assert!(p.sources.is_empty());
        assert_eq!(p.columns, vec!["two"]);
        assert!(matches!(bind_err("SELECT id"), BindError::UnknownColumn { .. }));
    }
}
