/// Query executor - runs a bound plan through the row pipeline
///
/// Stages: scan, join, filter, group, aggregate, having, project, distinct,
/// TOP, sort, LIMIT. Each stage consumes the previous stage's buffer.
use super::ast::JoinType;
use super::evaluator::{eval, is_truthy};
use super::planner::{AggregateFunc, BoundAggregate, BoundExpr, Grouping, JoinStep, SelectPlan, SortKey, SortTarget};
use crate::catalog::Table;
use crate::config::NullOrdering;
use crate::error::{ExecutionError, ExecutionErrorKind};
use crate::types::{KeyPart, ResultSet, Row, Value};
use ahash::{AHashMap, AHashSet};
use std::cmp::Ordering;
use tracing::debug;

type Result<T> = std::result::Result<T, ExecutionError>;

/// Projected row plus the ORDER BY key values computed alongside it
struct StagedRow {
    output: Row,
    sort_keys: Vec<Value>,
}

pub struct QueryExecutor {
    null_ordering: NullOrdering,
    /// Cap when the statement has neither TOP nor LIMIT (0 = unlimited)
    default_limit: usize,
}

impl QueryExecutor {
    pub fn new(null_ordering: NullOrdering, default_limit: usize) -> Self {
        Self {
            null_ordering,
            default_limit,
        }
    }

    /// Materialize the result of a bound plan
    pub fn execute(&self, plan: &SelectPlan) -> Result<ResultSet> {
        let mut rows = self.scan_and_join(plan)?;

        if let Some(filter) = &plan.filter {
            rows = apply_filter(rows, filter)?;
            debug!(rows = rows.len(), "where");
        }

        if let Some(grouping) = &plan.grouping {
            rows = self.apply_group_by(&rows, grouping)?;
            debug!(groups = rows.len(), "group by");

            if let Some(having) = &plan.having {
                rows = apply_filter(rows, having)?;
                debug!(groups = rows.len(), "having");
            }
        }

        let mut staged = rows
            .iter()
            .map(|row| project_row(plan, row))
            .collect::<Result<Vec<_>>>()?;
        drop(rows);

        if plan.distinct {
            staged = apply_distinct(staged);
            debug!(rows = staged.len(), "distinct");
        }

        if let Some(top) = plan.top {
            staged.truncate(top);
        }

        if !plan.order_by.is_empty() {
            self.apply_order_by(&mut staged, &plan.order_by);
        }

        if let Some(limit) = plan.limit {
            staged.truncate(limit);
        } else if plan.top.is_none() && self.default_limit > 0 {
            staged.truncate(self.default_limit);
        }

        let rows: Vec<Row> = staged.into_iter().map(|s| s.output).collect();
        debug!(rows = rows.len(), columns = plan.columns.len(), "result");
        Ok(ResultSet::new(plan.columns.clone(), rows))
    }

    /// Scan the primary table and fold in each join in source order
    fn scan_and_join(&self, plan: &SelectPlan) -> Result<Vec<Row>> {
        let Some(primary) = plan.sources.first() else {
            // FROM-less SELECT: one empty row
            return Ok(vec![Vec::new()]);
        };

        let mut rows: Vec<Row> = primary.table.rows().to_vec();
        debug!(table = primary.table.name(), rows = rows.len(), "scan");

        for source in &plan.sources[1..] {
            let Some(step) = &source.join else {
                continue;
            };
            rows = match step.join_type {
                JoinType::Inner => self.inner_join(&rows, &source.table, step)?,
                JoinType::Left => self.left_join(&rows, &source.table, step)?,
            };
            debug!(table = source.table.name(), alias = %source.alias, rows = rows.len(), "join");
        }

        Ok(rows)
    }

    /// INNER JOIN: nested loop, keeping pairs whose ON predicate is true
    fn inner_join(&self, left_rows: &[Row], right: &Table, step: &JoinStep) -> Result<Vec<Row>> {
        let mut result = Vec::new();

        for left_row in left_rows {
            for right_row in right.rows() {
                let combined = combine_rows(left_row, right_row);
                if is_truthy(&step.on, &combined)? {
                    result.push(combined);
                }
            }
        }

        Ok(result)
    }

    /// LEFT JOIN: like INNER, plus unmatched left rows padded with NULLs
    fn left_join(&self, left_rows: &[Row], right: &Table, step: &JoinStep) -> Result<Vec<Row>> {
        let mut result = Vec::new();
        let null_right_row: Row = vec![Value::Null; right.columns().len()];

        for left_row in left_rows {
            let mut matched = false;

            for right_row in right.rows() {
                let combined = combine_rows(left_row, right_row);
                if is_truthy(&step.on, &combined)? {
                    result.push(combined);
                    matched = true;
                }
            }

            if !matched {
                result.push(combine_rows(left_row, &null_right_row));
            }
        }

        Ok(result)
    }

    /// Partition rows by key tuple in first-seen order and build one group
    /// row `[keys..., aggregates...]` per partition. Without keys the whole
    /// input is a single group, even when empty.
    fn apply_group_by(&self, rows: &[Row], grouping: &Grouping) -> Result<Vec<Row>> {
        let mut index: AHashMap<Vec<KeyPart>, usize> = AHashMap::new();
        let mut groups: Vec<(Vec<Value>, Vec<&Row>)> = Vec::new();

        if grouping.keys.is_empty() {
            groups.push((Vec::new(), rows.iter().collect()));
        } else {
            for row in rows {
                let values = grouping
                    .keys
                    .iter()
                    .map(|k| eval(k, row))
                    .collect::<Result<Vec<_>>>()?;
                let key: Vec<KeyPart> = values.iter().map(Value::key).collect();

                match index.get(&key) {
                    Some(&pos) => groups[pos].1.push(row),
                    None => {
                        index.insert(key, groups.len());
                        groups.push((values, vec![row]));
                    }
                }
            }
        }

        groups
            .into_iter()
            .map(|(mut group_row, members)| -> Result<Row> {
                for aggregate in &grouping.aggregates {
                    group_row.push(eval_aggregate(aggregate, &members)?);
                }
                Ok(group_row)
            })
            .collect()
    }

    /// Stable sort; NULL placement follows the configured ordering
    fn apply_order_by(&self, rows: &mut [StagedRow], keys: &[SortKey]) {
        rows.sort_by(|a, b| {
            for (i, key) in keys.iter().enumerate() {
                let (x, y) = (&a.sort_keys[i], &b.sort_keys[i]);
                let nulls_first = self.null_ordering.nulls_first(key.descending);

                let ordering = match (x.is_null(), y.is_null()) {
                    (true, true) => Ordering::Equal,
                    (true, false) if nulls_first => Ordering::Less,
                    (true, false) => Ordering::Greater,
                    (false, true) if nulls_first => Ordering::Greater,
                    (false, true) => Ordering::Less,
                    (false, false) if key.descending => x.sort_cmp(y).reverse(),
                    (false, false) => x.sort_cmp(y),
                };

                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
    }
}

fn combine_rows(left: &[Value], right: &[Value]) -> Row {
    let mut combined = Vec::with_capacity(left.len() + right.len());
    combined.extend_from_slice(left);
    combined.extend_from_slice(right);
    combined
}

fn apply_filter(rows: Vec<Row>, predicate: &BoundExpr) -> Result<Vec<Row>> {
    let mut kept = Vec::with_capacity(rows.len());
    for row in rows {
        if is_truthy(predicate, &row)? {
            kept.push(row);
        }
    }
    Ok(kept)
}

fn project_row(plan: &SelectPlan, row: &[Value]) -> Result<StagedRow> {
    let output = plan
        .projection
        .iter()
        .map(|e| eval(e, row))
        .collect::<Result<Vec<_>>>()?;

    let sort_keys = plan
        .order_by
        .iter()
        .map(|key| match &key.target {
            SortTarget::Output(pos) => Ok(output.get(*pos).cloned().unwrap_or(Value::Null)),
            SortTarget::Expr(e) => eval(e, row),
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(StagedRow { output, sort_keys })
}

/// Keep the first occurrence of each output row (NULL equals NULL)
fn apply_distinct(rows: Vec<StagedRow>) -> Vec<StagedRow> {
    let mut seen = AHashSet::new();
    rows.into_iter()
        .filter(|row| seen.insert(row.output.iter().map(Value::key).collect::<Vec<_>>()))
        .collect()
}

/// Compute one aggregate over a group's rows
fn eval_aggregate(aggregate: &BoundAggregate, rows: &[&Row]) -> Result<Value> {
    let call = &aggregate.call;

    // COUNT(*)
    let Some(arg) = &call.arg else {
        return Ok(Value::Integer(rows.len() as i64));
    };

    if rows.is_empty() && call.text_argument {
        return Err(ExecutionError::new(
            ExecutionErrorKind::EmptyAggregate,
            format!("{} over an empty group of text values", call.func.name()),
            aggregate.offset,
        ));
    }

    let mut values = Vec::with_capacity(rows.len());
    let mut seen = AHashSet::new();
    for row in rows {
        let value = eval(arg, row)?;
        if value.is_null() || (call.distinct && !seen.insert(value.key())) {
            continue;
        }
        values.push(value);
    }

    match call.func {
        AggregateFunc::Count => Ok(Value::Integer(values.len() as i64)),
        AggregateFunc::Sum => sum_values(&values, call.func, arg.offset),
        AggregateFunc::Avg => {
            if values.is_empty() {
                return Ok(Value::Null);
            }
            let total = sum_values(&values, call.func, arg.offset)?;
            Ok(Value::Float(total.as_f64().unwrap_or_default() / values.len() as f64))
        }
        AggregateFunc::Min | AggregateFunc::Max => {
            let want = if call.func == AggregateFunc::Min {
                Ordering::Less
            } else {
                Ordering::Greater
            };
            let mut best: Option<Value> = None;
            for value in values {
                best = match best {
                    Some(current) if value.sql_cmp(&current) != Some(want) => Some(current),
                    _ => Some(value),
                };
            }
            Ok(best.unwrap_or(Value::Null))
        }
    }
}

/// Integer sum stays integer until it overflows; any float makes it float
fn sum_values(values: &[Value], func: AggregateFunc, offset: usize) -> Result<Value> {
    if values.is_empty() {
        return Ok(Value::Null);
    }

    let mut exact: Option<i64> = Some(0);
    let mut approx = 0.0f64;
    let mut saw_float = false;

    for value in values {
        match value {
            Value::Integer(i) => {
                exact = exact.and_then(|t| t.checked_add(*i));
                approx += *i as f64;
            }
            Value::Float(f) => {
                saw_float = true;
                approx += f;
            }
            other => {
                return Err(ExecutionError::type_mismatch(
                    format!("{} requires numeric values, found {}", func.name(), other.type_name()),
                    offset,
                ))
            }
        }
    }

    Ok(match exact {
        Some(total) if !saw_float => Value::Integer(total),
        _ => Value::Float(approx),
    })
}
