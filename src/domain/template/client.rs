//! Templates sub-client.
//!
//! The catalogue changes rarely, so both calls lean on the `/templates`
//! cache rule's long TTL.

use crate::client::CohortlyClient;
use crate::domain::template::{Template, TemplatesResponse};
use crate::error::SdkError;

/// Sub-client for template operations.
pub struct Templates<'a> {
    pub(crate) client: &'a CohortlyClient,
}

impl Templates<'_> {
    pub async fn list(&self) -> Result<TemplatesResponse, SdkError> {
        self.client.get_cached("/templates", &[]).await
    }

    pub async fn get(&self, template_id: &str) -> Result<Template, SdkError> {
        self.client
            .get_cached(&format!("/templates/{}", template_id), &[])
            .await
    }
}
