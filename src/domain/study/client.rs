//! Studies sub-client — CRUD plus lifecycle, cache-aware.

use crate::client::CohortlyClient;
use crate::domain::study::{CreateStudyRequest, StudiesResponse, Study, UpdateStudyRequest};
use crate::error::SdkError;

/// Sub-client for study operations.
pub struct Studies<'a> {
    pub(crate) client: &'a CohortlyClient,
}

impl Studies<'_> {
    /// List studies. Served from the response cache within its TTL.
    pub async fn list(
        &self,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<StudiesResponse, SdkError> {
        let page = page.map(|p| p.to_string());
        let limit = limit.map(|l| l.to_string());
        let mut params: Vec<(&str, &str)> = Vec::new();
        if let Some(p) = &page {
            params.push(("page", p));
        }
        if let Some(l) = &limit {
            params.push(("limit", l));
        }
        self.client.get_cached("/studies", &params).await
    }

    /// Get a single study. Cached under its own key.
    pub async fn get(&self, study_id: &str) -> Result<Study, SdkError> {
        self.client
            .get_cached(&format!("/studies/{}", study_id), &[])
            .await
    }

    pub async fn create(&self, request: &CreateStudyRequest) -> Result<Study, SdkError> {
        let study: Study = self.client.http.post("/studies", request).await?;
        self.client.invalidate("/studies").await;
        Ok(study)
    }

    pub async fn update(
        &self,
        study_id: &str,
        request: &UpdateStudyRequest,
    ) -> Result<Study, SdkError> {
        let study: Study = self
            .client
            .http
            .patch(&format!("/studies/{}", study_id), request)
            .await?;
        self.client.invalidate("/studies").await;
        Ok(study)
    }

    pub async fn delete(&self, study_id: &str) -> Result<(), SdkError> {
        let _: serde_json::Value = self
            .client
            .http
            .delete(&format!("/studies/{}", study_id))
            .await?;
        self.client.invalidate("/studies").await;
        Ok(())
    }

    /// Move a draft study live and open recruitment.
    pub async fn publish(&self, study_id: &str) -> Result<Study, SdkError> {
        let study: Study = self
            .client
            .http
            .post(
                &format!("/studies/{}/publish", study_id),
                &serde_json::json!({}),
            )
            .await?;
        self.client.invalidate("/studies").await;
        Ok(study)
    }
}
