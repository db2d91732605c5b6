//! Analytics sub-client — cached aggregate reads.

use crate::client::CohortlyClient;
use crate::domain::analytics::{ResponseSeries, StudySummary};
use crate::error::SdkError;
use chrono::{DateTime, Utc};

/// Sub-client for analytics operations.
pub struct Analytics<'a> {
    pub(crate) client: &'a CohortlyClient,
}

impl Analytics<'_> {
    /// Headline metrics for a study. Cached under the `/analytics` rule.
    pub async fn summary(&self, study_id: &str) -> Result<StudySummary, SdkError> {
        self.client
            .get_cached(&format!("/analytics/studies/{}", study_id), &[])
            .await
    }

    /// Responses-over-time series, optionally windowed.
    pub async fn responses_over_time(
        &self,
        study_id: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<ResponseSeries, SdkError> {
        let from = from.map(|t| t.timestamp().to_string());
        let to = to.map(|t| t.timestamp().to_string());
        let mut params: Vec<(&str, &str)> = Vec::new();
        if let Some(f) = &from {
            params.push(("from", f));
        }
        if let Some(t) = &to {
            params.push(("to", t));
        }
        self.client
            .get_cached(&format!("/analytics/studies/{}/responses", study_id), &params)
            .await
    }
}
