//! Executes the shared read contract against SQLite. Column names come from
//! the table whitelist in `campus_types::query`, values are always bound.

use anyhow::Result;
use rusqlite::Connection;
use rusqlite::functions::FunctionFlags;
use rusqlite::types::{Value as SqlValue, ValueRef};
use serde_json::{Map, Value as Json};

use campus_types::query::{ColumnKind, ListQuery, Page, Predicate, Table, Value};

use crate::Database;

impl Database {
    /// One window of rows matching `query`, plus the exact number of matches.
    pub fn list(&self, query: &ListQuery) -> Result<Page<Json>> {
        query.validate()?;
        self.with_conn(|conn| run_list(conn, query))
    }

    /// Single row by id, with the same joins as the listing.
    pub fn get_by_id(&self, table: Table, id: &str) -> Result<Option<Json>> {
        let query = ListQuery::new(table).eq("id", id).window(0, 1);
        Ok(self.list(&query)?.rows.into_iter().next())
    }
}

/// SQL name of the Unicode lower-casing function. SQLite's own `LOWER`
/// only folds ASCII, so "École" would never match "école".
const FOLD: &str = "campus_fold";

pub(crate) fn register_fold(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        FOLD,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            Ok(match ctx.get_raw(0) {
                ValueRef::Text(t) => Some(String::from_utf8_lossy(t).to_lowercase()),
                ValueRef::Integer(i) => Some(i.to_string()),
                ValueRef::Real(f) => Some(f.to_string()),
                ValueRef::Null | ValueRef::Blob(_) => None,
            })
        },
    )
}

fn source(table: Table) -> &'static str {
    match table {
        Table::Offers => "offers t LEFT JOIN sectors s ON s.id = t.sector_id",
        Table::Events => "events t",
        Table::Sectors => "sectors t",
        Table::Careers => "careers t",
        Table::Formations => "formations t",
        Table::StudentClubs => "student_clubs t",
    }
}

fn column_expr(table: Table, column: &str) -> String {
    match (table, column) {
        (Table::Offers, "sector_name") => "s.name".to_string(),
        (Table::StudentClubs, "member_count") => "(SELECT COUNT(*) FROM club_memberships m \
             WHERE m.club_id = t.id AND m.is_active = 1)"
            .to_string(),
        (_, name) => format!("t.{name}"),
    }
}

fn bind(value: &Value) -> SqlValue {
    match value {
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Int(i) => SqlValue::Integer(*i),
        Value::Text(s) => SqlValue::Text(s.clone()),
    }
}

/// `%`, `_` and the escape character itself are literal inside a needle.
fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

fn where_clause(query: &ListQuery, params: &mut Vec<SqlValue>) -> String {
    let mut conds = Vec::with_capacity(query.predicates.len());

    for predicate in &query.predicates {
        let expr = column_expr(query.table, predicate.column());
        match predicate {
            Predicate::Eq { value, .. } => {
                params.push(bind(value));
                conds.push(format!("{expr} = ?{}", params.len()));
            }
            Predicate::Ilike { needle, .. } => {
                params.push(SqlValue::Text(like_pattern(needle)));
                conds.push(format!("{FOLD}({expr}) LIKE {FOLD}(?{}) ESCAPE '\\'", params.len()));
            }
            Predicate::Range { min, max, .. } => {
                if let Some(min) = min {
                    params.push(bind(min));
                    conds.push(format!("{expr} >= ?{}", params.len()));
                }
                if let Some(max) = max {
                    params.push(bind(max));
                    conds.push(format!("{expr} <= ?{}", params.len()));
                }
            }
        }
    }

    if conds.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conds.join(" AND "))
    }
}

fn run_list(conn: &Connection, query: &ListQuery) -> Result<Page<Json>> {
    let columns = query.table.columns();
    let mut params = Vec::new();
    let filter = where_clause(query, &mut params);

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {}{}", source(query.table), filter),
        rusqlite::params_from_iter(params.iter()),
        |row| row.get(0),
    )?;

    let select = columns
        .iter()
        .map(|c| format!("{} AS {}", column_expr(query.table, c.name), c.name))
        .collect::<Vec<_>>()
        .join(", ");

    // id as tie-breaker keeps windows stable across pages
    let order = match &query.order {
        Some(order) => format!(
            " ORDER BY {} {}, t.id",
            column_expr(query.table, &order.column),
            if order.ascending { "ASC" } else { "DESC" }
        ),
        None => " ORDER BY t.id".to_string(),
    };

    let limit = query.limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));
    let offset = i64::try_from(query.offset).unwrap_or(i64::MAX);
    params.push(SqlValue::Integer(limit));
    let limit_idx = params.len();
    params.push(SqlValue::Integer(offset));
    let offset_idx = params.len();

    let sql = format!(
        "SELECT {select} FROM {}{filter}{order} LIMIT ?{limit_idx} OFFSET ?{offset_idx}",
        source(query.table)
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(params.iter()), |row| {
            let mut object = Map::with_capacity(columns.len());
            for (idx, column) in columns.iter().enumerate() {
                object.insert(column.name.to_string(), to_json(row.get_ref(idx)?, column.kind));
            }
            Ok(Json::Object(object))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(Page {
        rows,
        total: u64::try_from(total).unwrap_or(0),
    })
}

fn to_json(value: ValueRef<'_>, kind: ColumnKind) -> Json {
    match value {
        ValueRef::Null => Json::Null,
        ValueRef::Integer(i) if kind == ColumnKind::Bool => Json::Bool(i != 0),
        ValueRef::Integer(i) => Json::from(i),
        ValueRef::Real(f) => Json::from(f),
        ValueRef::Text(t) => Json::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(_) => Json::Null,
    }
}
