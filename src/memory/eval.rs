use super::parser::{CmpOp, ColumnRef, Expr, Operand, Projection, Select, Statement};
use super::store::Store;
use crate::Value;
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::sync::Arc;

pub(super) enum Outcome {
    Rows {
        labels: Arc<[String]>,
        rows: Vec<Box<[Value]>>,
    },
    Affected(u64),
}

pub(super) fn run(
    store: &mut Store,
    statement: &Statement,
    params: &[Value],
) -> Result<Outcome, String> {
    match statement {
        Statement::Select(select) => eval_select(store, select, params),
        Statement::Insert {
            table,
            columns,
            values,
        } => {
            let table = store.table_mut(table)?;
            let mut indices = Vec::with_capacity(columns.len());
            for column in columns {
                indices.push(table.column_index(column)?);
            }
            let mut row = vec![Value::Null; table.columns.len()];
            for (index, operand) in indices.iter().zip(values) {
                row[*index] = write_operand(operand, params)?;
            }
            table.rows.push(row);
            Ok(Outcome::Affected(1))
        }
        Statement::Update {
            table,
            assignments,
            cond,
        } => {
            let table = store.table_mut(table)?;
            let columns = table.columns.clone();
            let mut sets = Vec::with_capacity(assignments.len());
            for (column, operand) in assignments {
                sets.push((table.column_index(column)?, write_operand(operand, params)?));
            }
            let mut affected = 0;
            for row in table.rows.iter_mut() {
                if row_matches(&columns, row, cond.as_ref(), params)? {
                    for (index, value) in &sets {
                        row[*index] = value.clone();
                    }
                    affected += 1;
                }
            }
            Ok(Outcome::Affected(affected))
        }
        Statement::Delete { table, cond } => {
            let table = store.table_mut(table)?;
            let columns = table.columns.clone();
            let mut affected = 0;
            let mut failure = None;
            table.rows.retain(|row| {
                if failure.is_some() {
                    return true;
                }
                match row_matches(&columns, row, cond.as_ref(), params) {
                    Ok(true) => {
                        affected += 1;
                        false
                    }
                    Ok(false) => true,
                    Err(e) => {
                        failure = Some(e);
                        true
                    }
                }
            });
            match failure {
                Some(e) => Err(e),
                None => Ok(Outcome::Affected(affected)),
            }
        }
    }
}

#[derive(Clone)]
struct ScopeEntry {
    alias: String,
    table: String,
    /// Index into the table's rows, `None` for a left join that found
    /// no match.
    row: Option<usize>,
}

type Scope = Vec<ScopeEntry>;

fn eval_select(store: &mut Store, select: &Select, params: &[Value]) -> Result<Outcome, String> {
    if let Projection::NextVal { sequence } = &select.projection {
        let counter = store
            .sequences
            .get_mut(sequence)
            .ok_or_else(|| format!("no sequence {sequence}"))?;
        let value = *counter;
        *counter += 1;
        return Ok(Outcome::Rows {
            labels: Arc::from(vec!["nextval".to_owned()]),
            rows: vec![Box::from(vec![Value::Int64(Some(value))])],
        });
    }

    let store = &*store;
    let base = store.table(&select.table)?;
    let base_alias = select
        .alias
        .clone()
        .unwrap_or_else(|| select.table.clone());
    let mut scopes: Vec<Scope> = (0..base.rows.len())
        .map(|i| {
            vec![ScopeEntry {
                alias: base_alias.clone(),
                table: select.table.clone(),
                row: Some(i),
            }]
        })
        .collect();

    for join in &select.joins {
        let joined = store.table(&join.table)?;
        // The side naming the join alias probes the joined table, the
        // other side anchors into the scope built so far.
        let (probe, anchor) = if join.right.alias.as_deref() == Some(join.alias.as_str()) {
            (&join.right, &join.left)
        } else {
            (&join.left, &join.right)
        };
        let probe_index = joined.column_index(&probe.column)?;
        let mut expanded = Vec::new();
        for scope in scopes {
            let anchor_value = scope_value(store, &scope, anchor)?;
            let mut matched = false;
            if !anchor_value.is_null() {
                for (i, row) in joined.rows.iter().enumerate() {
                    if compare(&anchor_value, &row[probe_index]) == Some(Ordering::Equal) {
                        let mut grown = scope.clone();
                        grown.push(ScopeEntry {
                            alias: join.alias.clone(),
                            table: join.table.clone(),
                            row: Some(i),
                        });
                        expanded.push(grown);
                        matched = true;
                    }
                }
            }
            if !matched {
                let mut grown = scope;
                grown.push(ScopeEntry {
                    alias: join.alias.clone(),
                    table: join.table.clone(),
                    row: None,
                });
                expanded.push(grown);
            }
        }
        scopes = expanded;
    }

    let mut kept = Vec::new();
    for scope in scopes {
        let keep = match &select.cond {
            Some(cond) => eval_expr(store, &scope, cond, params)?,
            None => true,
        };
        if keep {
            kept.push(scope);
        }
    }

    match &select.projection {
        Projection::Columns(columns) => {
            let labels: Vec<String> = columns.iter().map(|c| c.label.clone()).collect();
            let mut rows = Vec::with_capacity(kept.len());
            for scope in &kept {
                let mut row = Vec::with_capacity(columns.len());
                for column in columns {
                    row.push(scope_value(store, scope, &column.source)?);
                }
                rows.push(row.into_boxed_slice());
            }
            Ok(Outcome::Rows {
                labels: Arc::from(labels),
                rows,
            })
        }
        Projection::Aggregate { function, column } => {
            let source = ColumnRef {
                alias: None,
                column: column.clone(),
            };
            // An aggregate over no matching rows has no answer at all,
            // not even a zero count.
            let value = if kept.is_empty() {
                Value::Null
            } else {
                let mut values = Vec::new();
                for scope in &kept {
                    let v = scope_value(store, scope, &source)?;
                    if !v.is_null() {
                        values.push(v);
                    }
                }
                aggregate(function, values)?
            };
            Ok(Outcome::Rows {
                labels: Arc::from(vec![function.clone()]),
                rows: vec![Box::from(vec![value])],
            })
        }
        Projection::NextVal { .. } => unreachable!("handled above"),
    }
}

fn scope_value(store: &Store, scope: &Scope, colref: &ColumnRef) -> Result<Value, String> {
    let entry = match &colref.alias {
        Some(alias) => scope
            .iter()
            .find(|e| e.alias.eq_ignore_ascii_case(alias))
            .ok_or_else(|| format!("unknown alias {alias}"))?,
        None => scope
            .iter()
            .find(|e| {
                store
                    .table(&e.table)
                    .map(|t| t.column_index(&colref.column).is_ok())
                    .unwrap_or(false)
            })
            .ok_or_else(|| format!("unknown column {}", colref.column))?,
    };
    let table = store.table(&entry.table)?;
    let index = table.column_index(&colref.column)?;
    Ok(match entry.row {
        Some(row) => table.rows[row][index].clone(),
        None => Value::Null,
    })
}

fn operand_value(
    store: &Store,
    scope: &Scope,
    operand: &Operand,
    params: &[Value],
) -> Result<Value, String> {
    match operand {
        Operand::Column(colref) => scope_value(store, scope, colref),
        Operand::Literal(value) => Ok(value.clone()),
        Operand::Param(index) => params
            .get(*index)
            .cloned()
            .ok_or_else(|| format!("missing parameter {index}")),
    }
}

fn eval_expr(store: &Store, scope: &Scope, expr: &Expr, params: &[Value]) -> Result<bool, String> {
    match expr {
        Expr::Compare { lhs, op, rhs } => Ok(compare_op(
            &operand_value(store, scope, lhs, params)?,
            *op,
            &operand_value(store, scope, rhs, params)?,
        )),
        Expr::And(lhs, rhs) => {
            Ok(eval_expr(store, scope, lhs, params)? && eval_expr(store, scope, rhs, params)?)
        }
        Expr::Or(lhs, rhs) => {
            Ok(eval_expr(store, scope, lhs, params)? || eval_expr(store, scope, rhs, params)?)
        }
    }
}

fn write_operand(operand: &Operand, params: &[Value]) -> Result<Value, String> {
    match operand {
        Operand::Literal(value) => Ok(value.clone()),
        Operand::Param(index) => params
            .get(*index)
            .cloned()
            .ok_or_else(|| format!("missing parameter {index}")),
        Operand::Column(colref) => Err(format!("column {} in a value position", colref.column)),
    }
}

fn row_value(columns: &[String], row: &[Value], colref: &ColumnRef) -> Result<Value, String> {
    if colref.alias.is_some() {
        return Err("aliases are not valid in write statements".to_owned());
    }
    columns
        .iter()
        .position(|c| c.eq_ignore_ascii_case(&colref.column))
        .map(|i| row[i].clone())
        .ok_or_else(|| format!("no column {}", colref.column))
}

fn row_matches(
    columns: &[String],
    row: &[Value],
    cond: Option<&Expr>,
    params: &[Value],
) -> Result<bool, String> {
    match cond {
        None => Ok(true),
        Some(Expr::Compare { lhs, op, rhs }) => {
            let resolve = |operand: &Operand| match operand {
                Operand::Column(colref) => row_value(columns, row, colref),
                other => write_operand(other, params),
            };
            Ok(compare_op(&resolve(lhs)?, *op, &resolve(rhs)?))
        }
        Some(Expr::And(lhs, rhs)) => Ok(row_matches(columns, row, Some(lhs), params)?
            && row_matches(columns, row, Some(rhs), params)?),
        Some(Expr::Or(lhs, rhs)) => Ok(row_matches(columns, row, Some(lhs), params)?
            || row_matches(columns, row, Some(rhs), params)?),
    }
}

/// Three way comparison with numeric widening. Nulls compare as
/// unknown, which every operator treats as a non match.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    if a.is_null() || b.is_null() {
        return None;
    }
    match (a, b) {
        (Value::Int64(Some(x)), Value::Int64(Some(y))) => Some(x.cmp(y)),
        (Value::Float64(Some(x)), Value::Float64(Some(y))) => x.partial_cmp(y),
        (Value::Decimal(Some(x)), Value::Decimal(Some(y))) => Some(x.cmp(y)),
        (Value::Int64(Some(x)), Value::Decimal(Some(y))) => Some(Decimal::from(*x).cmp(y)),
        (Value::Decimal(Some(x)), Value::Int64(Some(y))) => Some(x.cmp(&Decimal::from(*y))),
        (Value::Int64(Some(x)), Value::Float64(Some(y))) => (*x as f64).partial_cmp(y),
        (Value::Float64(Some(x)), Value::Int64(Some(y))) => x.partial_cmp(&(*y as f64)),
        (Value::Varchar(Some(x)), Value::Varchar(Some(y))) => Some(x.cmp(y)),
        (Value::Boolean(Some(x)), Value::Boolean(Some(y))) => Some(x.cmp(y)),
        (Value::Timestamp(Some(x)), Value::Timestamp(Some(y))) => Some(x.cmp(y)),
        _ => None,
    }
}

fn compare_op(lhs: &Value, op: CmpOp, rhs: &Value) -> bool {
    if op == CmpOp::Like {
        return match (lhs, rhs) {
            (Value::Varchar(Some(text)), Value::Varchar(Some(pattern))) => like(text, pattern),
            _ => false,
        };
    }
    match compare(lhs, rhs) {
        None => false,
        Some(ordering) => match op {
            CmpOp::Eq => ordering == Ordering::Equal,
            CmpOp::Ne => ordering != Ordering::Equal,
            CmpOp::Lt => ordering == Ordering::Less,
            CmpOp::Le => ordering != Ordering::Greater,
            CmpOp::Gt => ordering == Ordering::Greater,
            CmpOp::Ge => ordering != Ordering::Less,
            CmpOp::Like => unreachable!("handled above"),
        },
    }
}

/// SQL LIKE with `%` and `_`, no escape syntax.
fn like(text: &str, pattern: &str) -> bool {
    fn step(t: &[char], p: &[char]) -> bool {
        match p.first() {
            None => t.is_empty(),
            Some('%') => step(t, &p[1..]) || (!t.is_empty() && step(&t[1..], p)),
            Some('_') => !t.is_empty() && step(&t[1..], &p[1..]),
            Some(&c) => t.first() == Some(&c) && step(&t[1..], &p[1..]),
        }
    }
    let t: Vec<char> = text.chars().collect();
    let p: Vec<char> = pattern.chars().collect();
    step(&t, &p)
}

fn aggregate(function: &str, values: Vec<Value>) -> Result<Value, String> {
    match function {
        "count" => Ok(Value::Int64(Some(values.len() as i64))),
        "min" | "max" => {
            let mut best: Option<Value> = None;
            for value in values {
                best = Some(match best {
                    None => value,
                    Some(current) => {
                        let ordering = compare(&current, &value)
                            .ok_or_else(|| "incomparable values in aggregate".to_owned())?;
                        let take_new = if function == "min" {
                            ordering == Ordering::Greater
                        } else {
                            ordering == Ordering::Less
                        };
                        if take_new {
                            value
                        } else {
                            current
                        }
                    }
                });
            }
            Ok(best.unwrap_or(Value::Null))
        }
        "sum" | "avg" => {
            if values.is_empty() {
                return Ok(Value::Null);
            }
            let count = values.len();
            let mut float = false;
            let mut decimal = false;
            for value in &values {
                match value {
                    Value::Int64(..) => {}
                    Value::Decimal(..) => decimal = true,
                    Value::Float64(..) => float = true,
                    other => {
                        return Err(format!("{} over {} values", function, other.type_name()))
                    }
                }
            }
            if float {
                let mut total = 0f64;
                for value in &values {
                    total += match value {
                        Value::Int64(Some(x)) => *x as f64,
                        Value::Float64(Some(x)) => *x,
                        Value::Decimal(Some(x)) => {
                            use rust_decimal::prelude::ToPrimitive;
                            x.to_f64().ok_or_else(|| "decimal out of range".to_owned())?
                        }
                        _ => 0.0,
                    };
                }
                if function == "avg" {
                    total /= count as f64;
                }
                Ok(Value::Float64(Some(total)))
            } else {
                let mut total = Decimal::ZERO;
                for value in &values {
                    total += match value {
                        Value::Int64(Some(x)) => Decimal::from(*x),
                        Value::Decimal(Some(x)) => *x,
                        _ => Decimal::ZERO,
                    };
                }
                if function == "avg" {
                    total /= Decimal::from(count as i64);
                    Ok(Value::Decimal(Some(total)))
                } else if decimal {
                    Ok(Value::Decimal(Some(total)))
                } else {
                    use rust_decimal::prelude::ToPrimitive;
                    Ok(Value::Int64(Some(total.to_i64().ok_or_else(|| {
                        "sum out of range".to_owned()
                    })?)))
                }
            }
        }
        other => Err(format!("unknown aggregate {other}")),
    }
}
