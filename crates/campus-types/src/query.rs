//! The read contract shared by the store, its HTTP surface and the client:
//! one table, a conjunction of predicates, an optional ordering and a
//! bounded window, answered with one page of rows plus the exact total.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Fixed page size of every listing.
pub const PAGE_SIZE: u64 = 12;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("unknown table `{0}`")]
    UnknownTable(String),
    #[error("unknown column `{column}` on `{table}`")]
    UnknownColumn { table: Table, column: String },
    #[error("column `{column}` cannot be compared with {value}")]
    TypeMismatch { column: String, value: String },
    #[error("invalid parameter `{key}={value}`")]
    BadParam { key: String, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Offers,
    Events,
    Sectors,
    Careers,
    Formations,
    StudentClubs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Integer,
    Bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
}

const fn text(name: &'static str) -> Column {
    Column { name, kind: ColumnKind::Text }
}

const fn int(name: &'static str) -> Column {
    Column { name, kind: ColumnKind::Integer }
}

const fn flag(name: &'static str) -> Column {
    Column { name, kind: ColumnKind::Bool }
}

const OFFER_COLUMNS: &[Column] = &[
    text("id"),
    text("title"),
    text("type"),
    text("location"),
    text("description"),
    text("company_name"),
    text("contract_type"),
    text("duration"),
    text("salary_range"),
    int("rent_price"),
    text("housing_type"),
    int("surface_area"),
    flag("furnished"),
    text("requirements"),
    text("contact_email"),
    text("contact_phone"),
    text("deadline"),
    text("sector_id"),
    text("sector_name"),
    flag("is_active"),
    text("created_at"),
];

const EVENT_COLUMNS: &[Column] = &[
    text("id"),
    text("title"),
    text("type"),
    text("location"),
    text("description"),
    text("organizer"),
    text("date_start"),
    text("date_end"),
    text("website_url"),
    text("created_at"),
];

const SECTOR_COLUMNS: &[Column] = &[
    text("id"),
    text("name"),
    text("description"),
    text("color"),
    text("icon"),
    text("created_at"),
];

const CAREER_COLUMNS: &[Column] = &[
    text("id"),
    text("title"),
    text("description"),
    text("sector_id"),
    text("salary_range"),
    text("prospects"),
    text("required_education"),
    text("created_at"),
];

const FORMATION_COLUMNS: &[Column] = &[
    text("id"),
    text("title"),
    text("level"),
    text("university"),
    text("location"),
    text("duration"),
    int("cost"),
    text("description"),
    text("sector_id"),
    text("created_at"),
];

const CLUB_COLUMNS: &[Column] = &[
    text("id"),
    text("name"),
    text("description"),
    text("campus"),
    text("type"),
    text("president"),
    text("email_contact"),
    int("member_count"),
    flag("is_active"),
    text("created_at"),
];

impl Table {
    pub const ALL: &'static [Table] = &[
        Table::Offers,
        Table::Events,
        Table::Sectors,
        Table::Careers,
        Table::Formations,
        Table::StudentClubs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Offers => "offers",
            Table::Events => "events",
            Table::Sectors => "sectors",
            Table::Careers => "careers",
            Table::Formations => "formations",
            Table::StudentClubs => "student_clubs",
        }
    }

    /// Columns that may appear in predicates, orderings and result rows.
    pub fn columns(&self) -> &'static [Column] {
        match self {
            Table::Offers => OFFER_COLUMNS,
            Table::Events => EVENT_COLUMNS,
            Table::Sectors => SECTOR_COLUMNS,
            Table::Careers => CAREER_COLUMNS,
            Table::Formations => FORMATION_COLUMNS,
            Table::StudentClubs => CLUB_COLUMNS,
        }
    }

    pub fn column(&self, name: &str) -> Result<Column, QueryError> {
        self.columns()
            .iter()
            .find(|c| c.name == name)
            .copied()
            .ok_or_else(|| QueryError::UnknownColumn {
                table: *self,
                column: name.to_string(),
            })
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Table {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Table::ALL
            .iter()
            .find(|t| t.as_str() == s)
            .copied()
            .ok_or_else(|| QueryError::UnknownTable(s.to_string()))
    }
}

/// A bound parameter. Timestamps and ids travel as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl Value {
    fn fits(&self, kind: ColumnKind) -> bool {
        matches!(
            (self, kind),
            (Value::Bool(_), ColumnKind::Bool)
                | (Value::Int(_), ColumnKind::Integer)
                | (Value::Text(_), ColumnKind::Text)
        )
    }

    /// Parses the textual form back according to the column's kind.
    pub fn parse_for(kind: ColumnKind, raw: &str) -> Option<Value> {
        match kind {
            ColumnKind::Text => Some(Value::Text(raw.to_string())),
            ColumnKind::Integer => raw.parse().ok().map(Value::Int),
            ColumnKind::Bool => raw.parse().ok().map(Value::Bool),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Predicate {
    Eq { column: String, value: Value },
    /// Case-insensitive substring match.
    Ilike { column: String, needle: String },
    /// Inclusive bounds; a missing side is unbounded.
    Range {
        column: String,
        min: Option<Value>,
        max: Option<Value>,
    },
}

impl Predicate {
    pub fn column(&self) -> &str {
        match self {
            Predicate::Eq { column, .. }
            | Predicate::Ilike { column, .. }
            | Predicate::Range { column, .. } => column,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

impl Order {
    pub fn asc(column: &str) -> Self {
        Self { column: column.to_string(), ascending: true }
    }

    pub fn desc(column: &str) -> Self {
        Self { column: column.to_string(), ascending: false }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListQuery {
    pub table: Table,
    pub predicates: Vec<Predicate>,
    pub order: Option<Order>,
    pub offset: u64,
    pub limit: Option<u64>,
}

impl ListQuery {
    pub fn new(table: Table) -> Self {
        Self {
            table,
            predicates: Vec::new(),
            order: None,
            offset: 0,
            limit: None,
        }
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.predicates.push(Predicate::Eq {
            column: column.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn ilike(mut self, column: &str, needle: &str) -> Self {
        self.predicates.push(Predicate::Ilike {
            column: column.to_string(),
            needle: needle.to_string(),
        });
        self
    }

    pub fn range(mut self, column: &str, min: Option<Value>, max: Option<Value>) -> Self {
        if min.is_none() && max.is_none() {
            return self;
        }
        self.predicates.push(Predicate::Range {
            column: column.to_string(),
            min,
            max,
        });
        self
    }

    pub fn order_by(mut self, order: Order) -> Self {
        self.order = Some(order);
        self
    }

    pub fn window(mut self, offset: u64, limit: u64) -> Self {
        self.offset = offset;
        self.limit = Some(limit);
        self
    }

    /// Restricts the query to one page of the default page size.
    pub fn page(self, page: u32) -> Self {
        let (offset, limit) = Pagination::default().window(page);
        self.window(offset, limit)
    }

    /// Rejects columns outside the table's whitelist and values whose type
    /// does not match the column.
    pub fn validate(&self) -> Result<(), QueryError> {
        for predicate in &self.predicates {
            let column = self.table.column(predicate.column())?;
            let mismatch = |value: &Value| QueryError::TypeMismatch {
                column: column.name.to_string(),
                value: value.to_string(),
            };
            match predicate {
                Predicate::Eq { value, .. } => {
                    if !value.fits(column.kind) {
                        return Err(mismatch(value));
                    }
                }
                Predicate::Ilike { needle, .. } => {
                    if column.kind != ColumnKind::Text {
                        return Err(mismatch(&Value::Text(needle.clone())));
                    }
                }
                Predicate::Range { min, max, .. } => {
                    for bound in [min, max].into_iter().flatten() {
                        if !bound.fits(column.kind) {
                            return Err(mismatch(bound));
                        }
                    }
                }
            }
        }
        if let Some(order) = &self.order {
            self.table.column(&order.column)?;
        }
        Ok(())
    }
}

/// One window of rows together with the number of rows matching overall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub rows: Vec<T>,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self { rows: Vec::new(), total: 0 }
    }

    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<Page<U>, E> {
        let rows = self.rows.into_iter().map(f).collect::<Result<Vec<_>, _>>()?;
        Ok(Page { rows, total: self.total })
    }
}

/// Page arithmetic. Pages are 1-based; page 0 is read as page 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page_size: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { page_size: PAGE_SIZE }
    }
}

impl Pagination {
    /// `(offset, limit)` of the half-open window `[(page-1)*size, page*size)`.
    pub fn window(&self, page: u32) -> (u64, u64) {
        let index = u64::from(page.max(1) - 1);
        (index * self.page_size, self.page_size)
    }

    pub fn total_pages(&self, total: u64) -> u32 {
        u32::try_from(total.div_ceil(self.page_size)).unwrap_or(u32::MAX)
    }

    pub fn has_prev(&self, page: u32) -> bool {
        page > 1
    }

    pub fn has_next(&self, page: u32, total: u64) -> bool {
        page.max(1) < self.total_pages(total)
    }

    /// Number of rows a page holds when `total` rows match.
    pub fn expected_len(&self, page: u32, total: u64) -> u64 {
        let (offset, limit) = self.window(page);
        total.saturating_sub(offset).min(limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_is_zero_based_offset() {
        let p = Pagination::default();
        assert_eq!(p.window(1), (0, 12));
        assert_eq!(p.window(3), (24, 12));
        assert_eq!(p.window(0), (0, 12));
    }

    #[test]
    fn page_counts_follow_total() {
        let p = Pagination::default();
        assert_eq!(p.total_pages(0), 0);
        assert_eq!(p.total_pages(12), 1);
        assert_eq!(p.total_pages(13), 2);

        for total in [0u64, 1, 11, 12, 13, 25, 48, 100] {
            let pages = p.total_pages(total);
            for page in 1..=pages {
                let expected = 12.min(total - u64::from(page - 1) * 12);
                assert_eq!(p.expected_len(page, total), expected);
                assert_eq!(p.has_next(page, total), page < pages);
            }
        }
    }

    #[test]
    fn validate_rejects_unknown_columns() {
        let q = ListQuery::new(Table::Offers).eq("password", "x");
        assert!(matches!(q.validate(), Err(QueryError::UnknownColumn { .. })));

        let q = ListQuery::new(Table::Events).order_by(Order::desc("nope"));
        assert!(q.validate().is_err());
    }

    #[test]
    fn validate_checks_value_kinds() {
        let ok = ListQuery::new(Table::Offers)
            .eq("is_active", true)
            .range("rent_price", Some(Value::Int(0)), Some(Value::Int(800)))
            .ilike("location", "tunis");
        assert_eq!(ok.validate(), Ok(()));

        let bad = ListQuery::new(Table::Offers).eq("is_active", "yes");
        assert!(matches!(bad.validate(), Err(QueryError::TypeMismatch { .. })));

        let bad = ListQuery::new(Table::Offers).ilike("rent_price", "4");
        assert!(bad.validate().is_err());
    }

    #[test]
    fn empty_range_adds_nothing() {
        let q = ListQuery::new(Table::Events).range("date_start", None, None);
        assert!(q.predicates.is_empty());
    }
}
