use crate::api::ApiClient;
use crate::api::schemas::forms::{FormRecord, PageResponse};
use crate::domain::filter::FormFilter;
use crate::domain::form::{Form, FormUpdate, NewForm, PagedResult};
use crate::error::Result;
use reqwest::Method;

const FORMS_PATH: &str = "api/forms";

#[derive(Clone, Debug)]
pub struct FormService {
    api: ApiClient,
}

impl FormService {
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Fetches one page of forms matching `filter`.
    ///
    /// # Errors
    /// Returns an authentication, transport or API error.
    #[tracing::instrument(err, skip(self, filter), fields(page = filter.page, page_size = filter.page_size))]
    pub async fn query(&self, filter: &FormFilter) -> Result<PagedResult<Form>> {
        let page: PageResponse<FormRecord> = self.api.get_json(FORMS_PATH, &filter.query_pairs()).await?;
        tracing::debug!(items = page.items.len(), has_next = page.has_next, "Forms page received");
        Ok(page.into())
    }

    /// # Errors
    /// Returns an authentication, transport or API error.
    #[tracing::instrument(err, skip(self))]
    pub async fn get(&self, id: i64) -> Result<Form> {
        let record: FormRecord = self.api.get_json(&form_path(id), &[] as &[(&str, &str)]).await?;
        Ok(record.into())
    }

    /// # Errors
    /// Returns an authentication, transport or API error.
    #[tracing::instrument(err, skip(self, form), fields(category_id = form.category_id))]
    pub async fn create(&self, form: &NewForm) -> Result<Form> {
        let record: FormRecord = self.api.send_json(Method::POST, FORMS_PATH, form).await?;
        tracing::info!(form_id = record.id, "Form created");
        Ok(record.into())
    }

    /// # Errors
    /// Returns an authentication, transport or API error.
    #[tracing::instrument(err, skip(self, update))]
    pub async fn update(&self, id: i64, update: &FormUpdate) -> Result<Form> {
        let record: FormRecord = self.api.send_json(Method::PUT, &form_path(id), update).await?;
        Ok(record.into())
    }

    /// # Errors
    /// Returns an authentication, transport or API error.
    #[tracing::instrument(err, skip(self))]
    pub async fn delete(&self, id: i64) -> Result<()> {
        self.api.delete(&form_path(id)).await?;
        tracing::info!(form_id = id, "Form deleted");
        Ok(())
    }
}

fn form_path(id: i64) -> String {
    format!("{FORMS_PATH}/{id}")
}
