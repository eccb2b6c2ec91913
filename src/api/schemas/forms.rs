use crate::domain::form::{Category, Form, FormStatus, PagedResult};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormRecord {
    pub id: i64,
    pub title: String,
    pub category_id: i64,
    pub status: FormStatus,
    #[serde(default)]
    pub total_score: Option<i32>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl From<FormRecord> for Form {
    fn from(r: FormRecord) -> Self {
        Self {
            id: r.id,
            title: r.title,
            category_id: r.category_id,
            status: r.status,
            total_score: r.total_score,
            created_by: r.created_by.unwrap_or_default(),
            created_at: r.created_at,
            updated_at: r.updated_at,
            data: r.data,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    #[serde(default)]
    pub has_next: bool,
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

impl<T, U> From<PageResponse<T>> for PagedResult<U>
where
    U: From<T>,
{
    fn from(page: PageResponse<T>) -> Self {
        Self { has_next: page.has_next, items: page.items.into_iter().map(U::from).collect() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryRecord {
    pub id: i64,
    pub name: String,
}

impl From<CategoryRecord> for Category {
    fn from(r: CategoryRecord) -> Self {
        Self { id: r.id, name: r.name }
    }
}
