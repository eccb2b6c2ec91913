//! Forms query builder.
//!
//! Produces the OData-style `$filter` and `$orderby` expressions plus the
//! `page`/`pagesize` pagination parameters understood by the forms endpoint.

use crate::domain::form::FormStatus;
use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, UtcOffset};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormFilter {
    pub category_id: Option<i64>,
    pub status: Option<FormStatus>,
    pub from_date: Option<OffsetDateTime>,
    pub to_date: Option<OffsetDateTime>,
    pub title: Option<String>,
    pub created_by: Option<String>,
    pub min_score: Option<i32>,
    pub max_score: Option<i32>,
    pub order_by: Option<String>,
    pub descending: bool,
    pub page: u32,
    pub page_size: u32,
}

impl Default for FormFilter {
    fn default() -> Self {
        Self {
            category_id: None,
            status: None,
            from_date: None,
            to_date: None,
            title: None,
            created_by: None,
            min_score: None,
            max_score: None,
            order_by: None,
            descending: false,
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl FormFilter {
    /// Conjunction of the clauses for every set field, in a fixed order.
    ///
    /// Returns an empty string when no field is set.
    #[must_use]
    pub fn build_odata_filter(&self) -> String {
        let mut clauses = Vec::new();

        if let Some(category_id) = self.category_id {
            clauses.push(format!("categoryId eq {category_id}"));
        }
        if let Some(status) = self.status {
            clauses.push(format!("status eq {}", quote(status.as_str())));
        }
        if let Some(from) = self.from_date {
            clauses.push(format!("createdAt ge {}", format_timestamp(from)));
        }
        if let Some(to) = self.to_date {
            clauses.push(format!("createdAt le {}", format_timestamp(to)));
        }
        if let Some(title) = &self.title {
            clauses.push(format!("contains(title, {})", quote(title)));
        }
        if let Some(created_by) = &self.created_by {
            clauses.push(format!("createdBy eq {}", quote(created_by)));
        }
        if let Some(min) = self.min_score {
            clauses.push(format!("totalScore ge {min}"));
        }
        if let Some(max) = self.max_score {
            clauses.push(format!("totalScore le {max}"));
        }

        clauses.join(" and ")
    }

    #[must_use]
    pub fn build_order_by(&self) -> Option<String> {
        self.order_by.as_ref().map(|field| if self.descending { format!("{field} desc") } else { field.clone() })
    }

    /// Query parameters in the order the backend documents them.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(4);
        let filter = self.build_odata_filter();
        if !filter.is_empty() {
            pairs.push(("$filter", filter));
        }
        if let Some(order_by) = self.build_order_by() {
            pairs.push(("$orderby", order_by));
        }
        pairs.push(("page", self.page.to_string()));
        pairs.push(("pagesize", self.page_size.to_string()));
        pairs
    }

    /// URL-encoded query string, without the leading `?`.
    #[must_use]
    pub fn build_query_string(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in self.query_pairs() {
            serializer.append_pair(key, &value);
        }
        serializer.finish()
    }
}

/// OData string literal; embedded single quotes are doubled.
fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// RFC 3339 in UTC, keeping any sub-second part.
fn format_timestamp(at: OffsetDateTime) -> String {
    let utc = at.to_offset(UtcOffset::UTC);
    // Rfc3339 only rejects years outside 0..=9999
    utc.format(&Rfc3339).unwrap_or_else(|_| utc.to_string())
}
