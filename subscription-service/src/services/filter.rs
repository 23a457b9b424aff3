//! Filter compilation for list and sum queries.
//!
//! Raw query-string values are turned into an ordered list of predicates.
//! Each predicate renders one SQL clause with positional placeholders and
//! contributes its bound values in the same order, so clause text and
//! parameter list can never drift apart. The same predicates can also be
//! evaluated directly against records.

use crate::models::{Month, Subscription};
use crate::services::ServiceError;
use crate::utils::parse_identifier;
use chrono::NaiveDate;
use uuid::Uuid;

pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 1000;

/// Optional filters of one list or sum request, as received.
///
/// An empty string means the filter was not given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    pub from: String,
    pub to: String,
    pub owner: String,
    pub service_name: String,
}

/// Row window of a list request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl Pagination {
    /// Interpret raw `limit`/`offset` values.
    ///
    /// Missing, non-numeric or negative values fall back to the defaults;
    /// the limit is capped at [`MAX_LIMIT`].
    pub fn from_raw(limit: Option<&str>, offset: Option<&str>) -> Self {
        let limit = parse_non_negative(limit)
            .unwrap_or(DEFAULT_LIMIT)
            .min(MAX_LIMIT);
        let offset = parse_non_negative(offset).unwrap_or(0);
        Self { limit, offset }
    }
}

fn parse_non_negative(value: Option<&str>) -> Option<i64> {
    value
        .and_then(|v| v.parse::<i64>().ok())
        .filter(|v| *v >= 0)
}

/// Value bound to a positional placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryParam {
    Date(NaiveDate),
    Uuid(Uuid),
    Text(String),
    Int(i64),
}

/// One condition on a subscription; predicates are combined with AND.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    StartBetween(Month, Month),
    StartEquals(Month),
    StartFrom(Month),
    StartUntil(Month),
    OwnerEquals(Uuid),
    ServiceNameEquals(String),
}

impl Predicate {
    /// Render this clause, taking placeholder numbers from `next`.
    fn clause(&self, next: &mut usize) -> String {
        let mut placeholder = || {
            let n = *next;
            *next += 1;
            format!("${}", n)
        };

        match self {
            Predicate::StartBetween(_, _) => {
                let lower = placeholder();
                let upper = placeholder();
                format!("start_date BETWEEN {} AND {}", lower, upper)
            }
            Predicate::StartEquals(_) => format!("start_date = {}", placeholder()),
            Predicate::StartFrom(_) => format!("start_date >= {}", placeholder()),
            Predicate::StartUntil(_) => format!("start_date <= {}", placeholder()),
            Predicate::OwnerEquals(_) => format!("user_id = {}", placeholder()),
            Predicate::ServiceNameEquals(_) => format!("service_name = {}", placeholder()),
        }
    }

    fn params(&self) -> Vec<QueryParam> {
        match self {
            Predicate::StartBetween(from, to) => vec![
                QueryParam::Date(from.first_day()),
                QueryParam::Date(to.first_day()),
            ],
            Predicate::StartEquals(month)
            | Predicate::StartFrom(month)
            | Predicate::StartUntil(month) => vec![QueryParam::Date(month.first_day())],
            Predicate::OwnerEquals(owner) => vec![QueryParam::Uuid(*owner)],
            Predicate::ServiceNameEquals(name) => vec![QueryParam::Text(name.clone())],
        }
    }

    pub fn matches(&self, subscription: &Subscription) -> bool {
        let start = subscription.start_month;
        match self {
            Predicate::StartBetween(from, to) => *from <= start && start <= *to,
            Predicate::StartEquals(month) => start == *month,
            Predicate::StartFrom(month) => start >= *month,
            Predicate::StartUntil(month) => start <= *month,
            Predicate::OwnerEquals(owner) => subscription.owner == *owner,
            Predicate::ServiceNameEquals(name) => subscription.service_name == *name,
        }
    }
}

/// SQL text plus the values for its placeholders, in placeholder order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlQuery {
    pub sql: String,
    pub params: Vec<QueryParam>,
}

/// Ordered predicates produced from a [`FilterSet`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledFilter {
    predicates: Vec<Predicate>,
}

impl CompiledFilter {
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn matches(&self, subscription: &Subscription) -> bool {
        self.predicates.iter().all(|p| p.matches(subscription))
    }

    /// Append ` WHERE ...` to `sql` and return the bound values.
    fn render_where(&self, sql: &mut String, next: &mut usize) -> Vec<QueryParam> {
        let mut params = Vec::new();
        let mut clauses = Vec::with_capacity(self.predicates.len());
        for predicate in &self.predicates {
            clauses.push(predicate.clause(next));
            params.extend(predicate.params());
        }

        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        params
    }
}

/// A compiled list request: predicates, ordering and page window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub filter: CompiledFilter,
    pub pagination: Pagination,
}

impl ListQuery {
    /// Render against `select` (everything up to and including `FROM ...`).
    ///
    /// Rows are ordered by start month; id breaks ties so pages are stable.
    pub fn to_sql(&self, select: &str) -> SqlQuery {
        let mut sql = select.to_string();
        let mut next = 1;
        let mut params = self.filter.render_where(&mut sql, &mut next);

        sql.push_str(&format!(
            " ORDER BY start_date ASC, id ASC LIMIT ${} OFFSET ${}",
            next,
            next + 1
        ));
        params.push(QueryParam::Int(self.pagination.limit));
        params.push(QueryParam::Int(self.pagination.offset));

        SqlQuery { sql, params }
    }
}

/// A compiled sum request. Always carries a date predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SumQuery {
    pub filter: CompiledFilter,
}

impl SumQuery {
    pub fn to_sql(&self, select: &str) -> SqlQuery {
        let mut sql = select.to_string();
        let mut next = 1;
        let params = self.filter.render_where(&mut sql, &mut next);
        SqlQuery { sql, params }
    }
}

/// Compile filters for a list request. No date range means all time.
pub fn compile_list(filters: &FilterSet, pagination: Pagination) -> Result<ListQuery, ServiceError> {
    Ok(ListQuery {
        filter: compile(filters, false)?,
        pagination,
    })
}

/// Compile filters for a sum request. A date range is mandatory.
pub fn compile_sum(filters: &FilterSet) -> Result<SumQuery, ServiceError> {
    Ok(SumQuery {
        filter: compile(filters, true)?,
    })
}

fn compile(filters: &FilterSet, require_range: bool) -> Result<CompiledFilter, ServiceError> {
    let from = Month::parse_optional(&filters.from)?;
    let to = Month::parse_optional(&filters.to)?;

    let mut predicates = Vec::new();

    match (from, to) {
        (Some(from), Some(to)) if from < to => predicates.push(Predicate::StartBetween(from, to)),
        (Some(from), Some(to)) if from == to => predicates.push(Predicate::StartEquals(to)),
        (Some(from), Some(to)) => {
            return Err(ServiceError::Validation(format!(
                "end date ({}) cannot be earlier than start ({})",
                to, from
            )));
        }
        (Some(from), None) => predicates.push(Predicate::StartFrom(from)),
        (None, Some(to)) => predicates.push(Predicate::StartUntil(to)),
        (None, None) if require_range => {
            return Err(ServiceError::Validation(
                "date range is not specified".to_string(),
            ));
        }
        (None, None) => {}
    }

    if !filters.owner.is_empty() {
        let owner = parse_identifier(&filters.owner).ok_or_else(|| {
            ServiceError::Validation(format!("invalid subscription user: {}", filters.owner))
        })?;
        predicates.push(Predicate::OwnerEquals(owner));
    }

    if !filters.service_name.is_empty() {
        predicates.push(Predicate::ServiceNameEquals(filters.service_name.clone()));
    }

    Ok(CompiledFilter { predicates })
}
