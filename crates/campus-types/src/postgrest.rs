//! PostgREST-style text encoding of [`ListQuery`]:
//! `col=eq.v`, `col=ilike.*v*`, `col=gte.v`, `col=lte.v`, `order=col.desc`,
//! `offset=n`, `limit=n`. The total travels in a `Content-Range` header.

use crate::query::{ListQuery, Order, Predicate, QueryError, Table, Value};

pub fn to_params(query: &ListQuery) -> Vec<(String, String)> {
    let mut params = Vec::new();

    for predicate in &query.predicates {
        match predicate {
            Predicate::Eq { column, value } => {
                params.push((column.clone(), format!("eq.{value}")));
            }
            Predicate::Ilike { column, needle } => {
                params.push((column.clone(), format!("ilike.*{needle}*")));
            }
            Predicate::Range { column, min, max } => {
                if let Some(min) = min {
                    params.push((column.clone(), format!("gte.{min}")));
                }
                if let Some(max) = max {
                    params.push((column.clone(), format!("lte.{max}")));
                }
            }
        }
    }

    if let Some(order) = &query.order {
        let dir = if order.ascending { "asc" } else { "desc" };
        params.push(("order".into(), format!("{}.{dir}", order.column)));
    }
    if query.offset > 0 {
        params.push(("offset".into(), query.offset.to_string()));
    }
    if let Some(limit) = query.limit {
        params.push(("limit".into(), limit.to_string()));
    }

    params
}

/// Decodes query-string pairs into a validated [`ListQuery`]. A `gte` and an
/// `lte` on the same column merge into one inclusive range.
pub fn from_params(table: Table, params: &[(String, String)]) -> Result<ListQuery, QueryError> {
    let mut query = ListQuery::new(table);
    let bad = |key: &str, value: &str| QueryError::BadParam {
        key: key.to_string(),
        value: value.to_string(),
    };

    for (key, raw) in params {
        match key.as_str() {
            "order" => {
                let (column, dir) = raw.rsplit_once('.').unwrap_or((raw.as_str(), "asc"));
                let ascending = match dir {
                    "asc" => true,
                    "desc" => false,
                    _ => return Err(bad(key, raw)),
                };
                query.order = Some(Order { column: column.to_string(), ascending });
            }
            "offset" => query.offset = raw.parse().map_err(|_| bad(key, raw))?,
            "limit" => query.limit = Some(raw.parse().map_err(|_| bad(key, raw))?),
            "select" => {}
            column => {
                let kind = table.column(column)?.kind;
                let (op, operand) = raw.split_once('.').ok_or_else(|| bad(key, raw))?;
                let value = || Value::parse_for(kind, operand).ok_or_else(|| bad(key, raw));
                match op {
                    "eq" => query.predicates.push(Predicate::Eq {
                        column: column.to_string(),
                        value: value()?,
                    }),
                    "ilike" => query.predicates.push(Predicate::Ilike {
                        column: column.to_string(),
                        needle: strip_stars(operand).to_string(),
                    }),
                    "gte" => merge_bound(&mut query, column, Some(value()?), None),
                    "lte" => merge_bound(&mut query, column, None, Some(value()?)),
                    _ => return Err(bad(key, raw)),
                }
            }
        }
    }

    query.validate()?;
    Ok(query)
}

fn strip_stars(operand: &str) -> &str {
    let operand = operand.strip_prefix('*').unwrap_or(operand);
    operand.strip_suffix('*').unwrap_or(operand)
}

fn merge_bound(query: &mut ListQuery, column: &str, min: Option<Value>, max: Option<Value>) {
    let existing = query.predicates.iter_mut().find_map(|p| match p {
        Predicate::Range { column: c, min: lo, max: hi } if c.as_str() == column => Some((lo, hi)),
        _ => None,
    });

    match existing {
        Some((cur_min, cur_max)) => {
            if min.is_some() {
                *cur_min = min;
            }
            if max.is_some() {
                *cur_max = max;
            }
        }
        None => query.predicates.push(Predicate::Range {
            column: column.to_string(),
            min,
            max,
        }),
    }
}

impl ListQuery {
    pub fn to_params(&self) -> Vec<(String, String)> {
        to_params(self)
    }

    pub fn from_params(table: Table, params: &[(String, String)]) -> Result<Self, QueryError> {
        from_params(table, params)
    }
}

/// `Content-Range` value for a window: `0-11/42`, or `*/0` when empty.
pub fn content_range(offset: u64, len: usize, total: u64) -> String {
    if len == 0 {
        return format!("*/{total}");
    }
    format!("{}-{}/{}", offset, offset + len as u64 - 1, total)
}

/// Extracts the total from a `Content-Range` value.
pub fn parse_content_range(header: &str) -> Option<u64> {
    header.rsplit_once('/')?.1.trim().parse().ok()
}
