/// Expression evaluator - evaluates bound expressions against rows
use super::ast::{BinaryOperator, UnaryOperator};
use super::planner::{BoundExpr, BoundKind};
use crate::error::ExecutionError;
use crate::types::Value;
use std::cmp::Ordering;

type Result<T> = std::result::Result<T, ExecutionError>;

/// ⚡ Compiled LIKE pattern, built once at bind time
#[derive(Debug, Clone, PartialEq)]
pub enum CompiledPattern {
    /// Exact match: "abc" (no wildcards)
    Exact(String),
    /// Prefix match: "abc%"
    Prefix(String),
    /// Suffix match: "%abc"
    Suffix(String),
    /// Contains match: "%abc%"
    Contains(String),
    /// Anything else
    Complex(Vec<PatternToken>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PatternToken {
    Char(char),
    AnyChar,  // _
    AnyChars, // %
}

impl CompiledPattern {
    /// Compile LIKE pattern into optimized form
    pub fn compile(pattern: &str) -> Self {
        let wild_underscore = pattern.contains('_');

        // Fast path: no wildcards
        if !pattern.contains('%') && !wild_underscore {
            return CompiledPattern::Exact(pattern.to_string());
        }

        if !wild_underscore {
            let inner_percent = |s: &str| s.contains('%');

            // "abc%"
            if pattern.ends_with('%') && !inner_percent(&pattern[..pattern.len() - 1]) {
                return CompiledPattern::Prefix(pattern[..pattern.len() - 1].to_string());
            }

            // "%abc"
            if pattern.starts_with('%') && !inner_percent(&pattern[1..]) {
                return CompiledPattern::Suffix(pattern[1..].to_string());
            }

            // "%abc%"
            if pattern.len() > 2
                && pattern.starts_with('%')
                && pattern.ends_with('%')
                && !inner_percent(&pattern[1..pattern.len() - 1])
            {
                return CompiledPattern::Contains(pattern[1..pattern.len() - 1].to_string());
            }
        }

        CompiledPattern::Complex(
            pattern
                .chars()
                .map(|c| match c {
                    '%' => PatternToken::AnyChars,
                    '_' => PatternToken::AnyChar,
                    c => PatternToken::Char(c),
                })
                .collect(),
        )
    }

    #[inline]
    pub fn matches(&self, text: &str) -> bool {
        match self {
            CompiledPattern::Exact(pattern) => text == pattern,
            CompiledPattern::Prefix(prefix) => text.starts_with(prefix.as_str()),
            CompiledPattern::Suffix(suffix) => text.ends_with(suffix.as_str()),
            CompiledPattern::Contains(substring) => text.contains(substring.as_str()),
            CompiledPattern::Complex(tokens) => {
                let chars: Vec<char> = text.chars().collect();
                match_tokens(&chars, tokens)
            }
        }
    }
}

/// Wildcard match with single-star backtracking; linear in practice
fn match_tokens(text: &[char], pattern: &[PatternToken]) -> bool {
    let (mut t, mut p) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some(PatternToken::AnyChars) => {
                backtrack = Some((p, t));
                p += 1;
            }
            Some(PatternToken::AnyChar) => {
                t += 1;
                p += 1;
            }
            Some(PatternToken::Char(c)) if *c == text[t] => {
                t += 1;
                p += 1;
            }
            _ => match backtrack {
                Some((star, consumed)) => {
                    p = star + 1;
                    t = consumed + 1;
                    backtrack = Some((star, consumed + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|tok| *tok == PatternToken::AnyChars)
}

/// Built-in scalar functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarFunc {
    Lower,
    Upper,
    Length,
    Trim,
    Abs,
    Round,
    Floor,
    Ceil,
    Coalesce,
    Substr,
    Concat,
}

impl ScalarFunc {
    /// Case-insensitive lookup
    pub fn from_name(name: &str) -> Option<Self> {
        let func = match name.to_ascii_uppercase().as_str() {
            "LOWER" => ScalarFunc::Lower,
            "UPPER" => ScalarFunc::Upper,
            "LENGTH" => ScalarFunc::Length,
            "TRIM" => ScalarFunc::Trim,
            "ABS" => ScalarFunc::Abs,
            "ROUND" => ScalarFunc::Round,
            "FLOOR" => ScalarFunc::Floor,
            "CEIL" | "CEILING" => ScalarFunc::Ceil,
            "COALESCE" => ScalarFunc::Coalesce,
            "SUBSTR" | "SUBSTRING" => ScalarFunc::Substr,
            "CONCAT" => ScalarFunc::Concat,
            _ => return None,
        };
        Some(func)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScalarFunc::Lower => "LOWER",
            ScalarFunc::Upper => "UPPER",
            ScalarFunc::Length => "LENGTH",
            ScalarFunc::Trim => "TRIM",
            ScalarFunc::Abs => "ABS",
            ScalarFunc::Round => "ROUND",
            ScalarFunc::Floor => "FLOOR",
            ScalarFunc::Ceil => "CEIL",
            ScalarFunc::Coalesce => "COALESCE",
            ScalarFunc::Substr => "SUBSTR",
            ScalarFunc::Concat => "CONCAT",
        }
    }

    /// Accepted argument counts (min, max)
    pub fn arity(&self) -> (usize, usize) {
        match self {
            ScalarFunc::Round => (1, 2),
            ScalarFunc::Substr => (2, 3),
            ScalarFunc::Coalesce | ScalarFunc::Concat => (1, usize::MAX),
            _ => (1, 1),
        }
    }

    pub fn returns_text(&self) -> bool {
        matches!(
            self,
            ScalarFunc::Lower | ScalarFunc::Upper | ScalarFunc::Trim | ScalarFunc::Substr | ScalarFunc::Concat
        )
    }
}

/// Evaluate a bound expression against one input row
pub fn eval(expr: &BoundExpr, row: &[Value]) -> Result<Value> {
    match &expr.kind {
        BoundKind::Column(pos) => Ok(row.get(*pos).cloned().unwrap_or(Value::Null)),

        BoundKind::Literal(value) => Ok(value.clone()),

        BoundKind::Unary { op, expr: inner } => {
            let value = eval(inner, row)?;
            match op {
                UnaryOperator::Not => Ok(match truth(&value, inner.offset)? {
                    Some(b) => Value::Bool(!b),
                    None => Value::Null,
                }),
                UnaryOperator::Minus => negate(value, inner.offset),
            }
        }

        BoundKind::Binary { op, left, right } => match op {
            BinaryOperator::And => {
                let l = truth(&eval(left, row)?, left.offset)?;
                if l == Some(false) {
                    return Ok(Value::Bool(false));
                }
                let r = truth(&eval(right, row)?, right.offset)?;
                Ok(match (l, r) {
                    (_, Some(false)) => Value::Bool(false),
                    (Some(true), Some(true)) => Value::Bool(true),
                    _ => Value::Null,
                })
            }
            BinaryOperator::Or => {
                let l = truth(&eval(left, row)?, left.offset)?;
                if l == Some(true) {
                    return Ok(Value::Bool(true));
                }
                let r = truth(&eval(right, row)?, right.offset)?;
                Ok(match (l, r) {
                    (_, Some(true)) => Value::Bool(true),
                    (Some(false), Some(false)) => Value::Bool(false),
                    _ => Value::Null,
                })
            }
            op if op.is_comparison() => {
                let l = eval(left, row)?;
                let r = eval(right, row)?;
                Ok(compare(*op, &l, &r))
            }
            op => {
                let l = eval(left, row)?;
                let r = eval(right, row)?;
                arithmetic(*op, l, r, left.offset, right.offset)
            }
        },

        BoundKind::In { expr: inner, list, negated } => {
            let value = eval(inner, row)?;
            if value.is_null() {
                return Ok(Value::Null);
            }

            let mut saw_null = false;
            for item in list {
                let candidate = eval(item, row)?;
                match value.sql_cmp(&candidate) {
                    Some(Ordering::Equal) => return Ok(Value::Bool(!negated)),
                    Some(_) => {}
                    None => saw_null = true,
                }
            }

            Ok(if saw_null { Value::Null } else { Value::Bool(*negated) })
        }

        BoundKind::Like { expr: inner, pattern, negated } => {
            let value = eval(inner, row)?;
            if value.is_null() {
                return Ok(Value::Null);
            }
            let matched = match value.as_str() {
                Some(text) => pattern.matches(text),
                None => pattern.matches(&value.to_string()),
            };
            Ok(Value::Bool(matched != *negated))
        }

        BoundKind::IsNull { expr: inner, negated } => {
            let value = eval(inner, row)?;
            Ok(Value::Bool(value.is_null() != *negated))
        }

        BoundKind::Scalar { func, args } => {
            let values = args
                .iter()
                .map(|arg| eval(arg, row))
                .collect::<Result<Vec<_>>>()?;
            call_scalar(*func, values, args, expr.offset)
        }

        BoundKind::Aggregate(_) => Err(ExecutionError::invalid_argument(
            "Aggregate function used outside of a grouped context",
            expr.offset,
        )),
    }
}

/// Predicate reading of a value: NULL is unknown, numbers are true when non-zero
pub fn truth(value: &Value, offset: usize) -> Result<Option<bool>> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(*b)),
        Value::Integer(i) => Ok(Some(*i != 0)),
        Value::Float(f) => Ok(Some(*f != 0.0)),
        other => Err(ExecutionError::type_mismatch(
            format!("Expected a boolean condition, found {}", other.type_name()),
            offset,
        )),
    }
}

/// WHERE / ON / HAVING: only a true predicate keeps the row
pub fn is_truthy(expr: &BoundExpr, row: &[Value]) -> Result<bool> {
    let value = eval(expr, row)?;
    Ok(truth(&value, expr.offset)? == Some(true))
}

fn compare(op: BinaryOperator, left: &Value, right: &Value) -> Value {
    let Some(ordering) = left.sql_cmp(right) else {
        return Value::Null;
    };
    let result = match op {
        BinaryOperator::Eq => ordering == Ordering::Equal,
        BinaryOperator::Ne => ordering != Ordering::Equal,
        BinaryOperator::Lt => ordering == Ordering::Less,
        BinaryOperator::Gt => ordering == Ordering::Greater,
        BinaryOperator::Le => ordering != Ordering::Greater,
        BinaryOperator::Ge => ordering != Ordering::Less,
        _ => return Value::Null,
    };
    Value::Bool(result)
}

fn require_numeric(value: &Value, op: &str, offset: usize) -> Result<()> {
    if value.is_numeric() || value.is_null() {
        Ok(())
    } else {
        Err(ExecutionError::type_mismatch(
            format!("Operator '{}' requires numeric operands, found {}", op, value.type_name()),
            offset,
        ))
    }
}

fn negate(value: Value, offset: usize) -> Result<Value> {
    require_numeric(&value, "-", offset)?;
    Ok(match value {
        Value::Integer(i) => i.checked_neg().map(Value::Integer).unwrap_or(Value::Float(-(i as f64))),
        Value::Float(f) => Value::Float(-f),
        other => other,
    })
}

/// Arithmetic with checked integer math; overflow promotes to floating
pub fn arithmetic(op: BinaryOperator, left: Value, right: Value, left_offset: usize, right_offset: usize) -> Result<Value> {
    require_numeric(&left, op.symbol(), left_offset)?;
    require_numeric(&right, op.symbol(), right_offset)?;
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }

    if let (Value::Integer(l), Value::Integer(r)) = (&left, &right) {
        let (l, r) = (*l, *r);
        let exact = match op {
            BinaryOperator::Add => l.checked_add(r),
            BinaryOperator::Sub => l.checked_sub(r),
            BinaryOperator::Mul => l.checked_mul(r),
            BinaryOperator::Div => {
                if r == 0 {
                    return Err(ExecutionError::division_by_zero(right_offset));
                }
                match l.checked_rem(r) {
                    Some(0) => l.checked_div(r),
                    _ => None,
                }
            }
            _ => None,
        };
        if let Some(v) = exact {
            return Ok(Value::Integer(v));
        }
    }

    let l = left.as_f64().unwrap_or_default();
    let r = right.as_f64().unwrap_or_default();
    let v = match op {
        BinaryOperator::Add => l + r,
        BinaryOperator::Sub => l - r,
        BinaryOperator::Mul => l * r,
        BinaryOperator::Div => {
            if r == 0.0 {
                return Err(ExecutionError::division_by_zero(right_offset));
            }
            l / r
        }
        _ => {
            return Err(ExecutionError::type_mismatch(
                format!("'{}' is not an arithmetic operator", op.symbol()),
                left_offset,
            ))
        }
    };
    Ok(Value::Float(v))
}

fn text_form(value: &Value) -> String {
    match value.as_str() {
        Some(s) => s.to_string(),
        None => value.to_string(),
    }
}

fn integer_argument(value: &Value, func: ScalarFunc, offset: usize) -> Result<i64> {
    match value {
        Value::Integer(i) => Ok(*i),
        Value::Float(f) if f.fract() == 0.0 => Ok(*f as i64),
        other => Err(ExecutionError::invalid_argument(
            format!("{} expects an integer argument, found {}", func.name(), other.type_name()),
            offset,
        )),
    }
}

fn float_to_value(f: f64) -> Value {
    if f.is_finite() && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Value::Integer(f as i64)
    } else {
        Value::Float(f)
    }
}

fn call_scalar(func: ScalarFunc, values: Vec<Value>, args: &[BoundExpr], offset: usize) -> Result<Value> {
    let arg_offset = |i: usize| args.get(i).map(|a| a.offset).unwrap_or(offset);

    let first = values.first().cloned().unwrap_or(Value::Null);

    match func {
        ScalarFunc::Coalesce => Ok(values.into_iter().find(|v| !v.is_null()).unwrap_or(Value::Null)),
        ScalarFunc::Concat => Ok(Value::Text(values.iter().filter(|v| !v.is_null()).map(text_form).collect())),

        _ if values.iter().any(Value::is_null) => Ok(Value::Null),

        ScalarFunc::Lower => Ok(Value::text_or_date(text_form(&first).to_lowercase())),
        ScalarFunc::Upper => Ok(Value::text_or_date(text_form(&first).to_uppercase())),
        ScalarFunc::Trim => Ok(Value::text_or_date(text_form(&first).trim())),
        ScalarFunc::Length => Ok(Value::Integer(text_form(&first).chars().count() as i64)),

        ScalarFunc::Abs => {
            require_numeric(&first, func.name(), arg_offset(0))?;
            Ok(match &first {
                Value::Integer(i) => i.checked_abs().map(Value::Integer).unwrap_or(Value::Float((*i as f64).abs())),
                Value::Float(f) => Value::Float(f.abs()),
                other => other.clone(),
            })
        }

        ScalarFunc::Floor | ScalarFunc::Ceil => {
            require_numeric(&first, func.name(), arg_offset(0))?;
            Ok(match &first {
                Value::Float(f) if func == ScalarFunc::Floor => float_to_value(f.floor()),
                Value::Float(f) => float_to_value(f.ceil()),
                other => other.clone(),
            })
        }

        ScalarFunc::Round => {
            require_numeric(&first, func.name(), arg_offset(0))?;
            let digits = match values.get(1) {
                Some(d) => integer_argument(d, func, arg_offset(1))?,
                None => 0,
            };
            let digits = digits.clamp(-18, 18) as i32;
            let factor = 10f64.powi(digits.abs());

            Ok(match &first {
                Value::Integer(i) if digits >= 0 => Value::Integer(*i),
                Value::Integer(i) => float_to_value((*i as f64 / factor).round() * factor),
                Value::Float(f) if digits >= 0 => Value::Float((f * factor).round() / factor),
                Value::Float(f) => Value::Float((f / factor).round() * factor),
                other => other.clone(),
            })
        }

        ScalarFunc::Substr => {
            let text: Vec<char> = text_form(&first).chars().collect();
            let start = match values.get(1) {
                Some(start) => integer_argument(start, func, arg_offset(1))?,
                None => 1,
            };
            let len = match values.get(2) {
                Some(l) => {
                    let len = integer_argument(l, func, arg_offset(2))?;
                    if len < 0 {
                        return Err(ExecutionError::invalid_argument(
                            "SUBSTR length must not be negative",
                            arg_offset(2),
                        ));
                    }
                    Some(len as usize)
                }
                None => None,
            };

            // 1-based; positions before the first character are clamped
            let begin = (start.max(1) - 1) as usize;
            let begin = begin.min(text.len());
            let end = match len {
                Some(len) => begin.saturating_add(len).min(text.len()),
                None => text.len(),
            };
            Ok(Value::text_or_date(text[begin..end].iter().collect::<String>()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExecutionErrorKind;

    fn lit(v: impl Into<Value>) -> BoundExpr {
        BoundExpr::new(BoundKind::Literal(v.into()), 0)
    }

    fn col(pos: usize) -> BoundExpr {
        BoundExpr::new(BoundKind::Column(pos), pos)
    }

    fn bin(op: BinaryOperator, l: BoundExpr, r: BoundExpr) -> BoundExpr {
        BoundExpr::new(
            BoundKind::Binary {
                op,
                left: Box::new(l),
                right: Box::new(r),
            },
            0,
        )
    }

    #[test]
    fn test_like_patterns() {
        assert!(CompiledPattern::compile("a%b").matches("axxb"));
        assert!(CompiledPattern::compile("a%b").matches("ab"));
        assert!(!CompiledPattern::compile("a%b").matches("axxc"));

        let p = CompiledPattern::compile("a_b");
        assert!(p.matches("axb"));
        assert!(!p.matches("ab"));
        assert!(!p.matches("axxb"));

        assert!(matches!(CompiledPattern::compile("abc%"), CompiledPattern::Prefix(_)));
        assert!(matches!(CompiledPattern::compile("%abc"), CompiledPattern::Suffix(_)));
        assert!(matches!(CompiledPattern::compile("%abc%"), CompiledPattern::Contains(_)));
        assert!(CompiledPattern::compile("%").matches(""));
        assert!(CompiledPattern::compile("%%").matches("anything"));
        assert!(!CompiledPattern::compile("ABC").matches("abc"));
        assert!(CompiledPattern::compile("%a%b%c%").matches("xaxbxcx"));
        assert!(!CompiledPattern::compile("%a%b%c%").matches("xcxbxax"));
    }

    #[test]
    fn test_null_comparisons() {
        let row = vec![Value::Null, Value::Integer(1)];
        assert_eq!(eval(&bin(BinaryOperator::Eq, col(0), lit(Value::Null)), &row).unwrap(), Value::Null);
        assert_eq!(eval(&bin(BinaryOperator::Eq, col(1), lit(1)), &row).unwrap(), Value::Bool(true));

        let is_null = BoundExpr::new(
            BoundKind::IsNull {
                expr: Box::new(col(0)),
                negated: false,
            },
            0,
        );
        assert_eq!(eval(&is_null, &row).unwrap(), Value::Bool(true));
        assert!(!is_truthy(&bin(BinaryOperator::Gt, col(0), lit(0)), &row).unwrap());
    }

    #[test]
    fn test_three_valued_logic() {
        let row = vec![Value::Null];
        let null_cmp = bin(BinaryOperator::Eq, col(0), lit(1));

        let and_false = bin(BinaryOperator::And, null_cmp.clone(), lit(false));
        assert_eq!(eval(&and_false, &row).unwrap(), Value::Bool(false));
        let and_true = bin(BinaryOperator::And, null_cmp.clone(), lit(true));
        assert_eq!(eval(&and_true, &row).unwrap(), Value::Null);
        let or_true = bin(BinaryOperator::Or, null_cmp.clone(), lit(true));
        assert_eq!(eval(&or_true, &row).unwrap(), Value::Bool(true));

        let not = BoundExpr::new(
            BoundKind::Unary {
                op: UnaryOperator::Not,
                expr: Box::new(null_cmp),
            },
            0,
        );
        assert_eq!(eval(&not, &row).unwrap(), Value::Null);
    }

    #[test]
    fn test_arithmetic_rules() {
        let row: Vec<Value> = vec![];
        let div = |l: Value, r: Value| eval(&bin(BinaryOperator::Div, lit(l), lit(r)), &row);

        assert_eq!(div(6.into(), 3.into()).unwrap(), Value::Integer(2));
        assert_eq!(div(7.into(), 2.into()).unwrap(), Value::Float(3.5));
        assert_eq!(
            div(1.into(), 0.into()).unwrap_err().kind,
            ExecutionErrorKind::DivisionByZero
        );

        let overflow = eval(&bin(BinaryOperator::Add, lit(i64::MAX), lit(1)), &row).unwrap();
        assert!(matches!(overflow, Value::Float(_)));

        let err = eval(&bin(BinaryOperator::Mul, lit(2), lit("x")), &row).unwrap_err();
        assert_eq!(err.kind, ExecutionErrorKind::TypeMismatch);

        assert_eq!(
            eval(&bin(BinaryOperator::Sub, lit(Value::Null), lit(1)), &row).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn test_in_list_semantics() {
        let in_list = |value: Value, items: Vec<Value>, negated: bool| {
            let expr = BoundExpr::new(
                BoundKind::In {
                    expr: Box::new(lit(value)),
                    list: items.into_iter().map(lit).collect(),
                    negated,
                },
                0,
            );
            eval(&expr, &[]).unwrap()
        };

        assert_eq!(in_list(1.into(), vec![1.into(), 2.into()], false), Value::Bool(true));
        assert_eq!(in_list(3.into(), vec![1.into(), 2.into()], false), Value::Bool(false));
        assert_eq!(in_list(3.into(), vec![1.into(), Value::Null], false), Value::Null);
        assert_eq!(in_list(Value::Null, vec![1.into()], false), Value::Null);
        assert_eq!(in_list(3.into(), vec![1.into(), 2.into()], true), Value::Bool(true));
        assert_eq!(in_list("2".into(), vec![2.into()], false), Value::Bool(true));
    }

    #[test]
    fn test_scalar_functions() {
        let call = |func: ScalarFunc, args: Vec<Value>| {
            let args: Vec<BoundExpr> = args.into_iter().map(lit).collect();
            eval(&BoundExpr::new(BoundKind::Scalar { func, args }, 0), &[])
        };

        assert_eq!(call(ScalarFunc::Upper, vec!["abc".into()]).unwrap(), Value::from("ABC"));
        assert_eq!(call(ScalarFunc::Length, vec!["héllo".into()]).unwrap(), Value::Integer(5));
        assert_eq!(call(ScalarFunc::Round, vec![2.456.into(), 2.into()]).unwrap(), Value::Float(2.46));
        assert_eq!(call(ScalarFunc::Round, vec![1250.into(), (-2).into()]).unwrap(), Value::Integer(1300));
        assert_eq!(call(ScalarFunc::Floor, vec![2.7.into()]).unwrap(), Value::Integer(2));
        assert_eq!(call(ScalarFunc::Ceil, vec![2.1.into()]).unwrap(), Value::Integer(3));
        assert_eq!(call(ScalarFunc::Abs, vec![(-4).into()]).unwrap(), Value::Integer(4));
        assert_eq!(
            call(ScalarFunc::Coalesce, vec![Value::Null, 5.into(), 6.into()]).unwrap(),
            Value::Integer(5)
        );
        assert_eq!(
            call(ScalarFunc::Substr, vec!["2024-03-15".into(), 6.into(), 2.into()]).unwrap(),
            Value::from("03")
        );
        assert_eq!(
            call(ScalarFunc::Concat, vec!["a".into(), Value::Null, 1.into()]).unwrap(),
            Value::from("a1")
        );
        assert_eq!(call(ScalarFunc::Lower, vec![Value::Null]).unwrap(), Value::Null);
        assert_eq!(
            call(ScalarFunc::Abs, vec!["x".into()]).unwrap_err().kind,
            ExecutionErrorKind::TypeMismatch
        );
        assert_eq!(ScalarFunc::from_name("lower"), Some(ScalarFunc::Lower));
        assert_eq!(ScalarFunc::from_name("median"), None);
    }
}
