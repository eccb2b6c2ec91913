use crate::api::ApiClient;
use crate::api::schemas::forms::CategoryRecord;
use crate::domain::form::Category;
use crate::error::Result;

const CATEGORIES_PATH: &str = "api/categories";

#[derive(Clone, Debug)]
pub struct CategoryService {
    api: ApiClient,
}

impl CategoryService {
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Lists the categories forms can be filed under.
    ///
    /// # Errors
    /// Returns an authentication, transport or API error.
    #[tracing::instrument(err, skip(self))]
    pub async fn list(&self) -> Result<Vec<Category>> {
        let records: Vec<CategoryRecord> = self.api.get_json(CATEGORIES_PATH, &[] as &[(&str, &str)]).await?;
        Ok(records.into_iter().map(Category::from).collect())
    }
}
