//! Participants sub-client — recruitment operations per study.

use crate::client::CohortlyClient;
use crate::domain::participant::{InviteRequest, Participant, ParticipantsResponse};
use crate::error::SdkError;

/// Sub-client for participant operations.
pub struct Participants<'a> {
    pub(crate) client: &'a CohortlyClient,
}

impl Participants<'_> {
    fn base_path(study_id: &str) -> String {
        format!("/studies/{}/participants", study_id)
    }

    /// List a study's participants. Cached within the default TTL.
    pub async fn list(&self, study_id: &str) -> Result<ParticipantsResponse, SdkError> {
        self.client.get_cached(&Self::base_path(study_id), &[]).await
    }

    pub async fn invite(
        &self,
        study_id: &str,
        request: &InviteRequest,
    ) -> Result<Participant, SdkError> {
        let participant: Participant = self
            .client
            .http
            .post(&Self::base_path(study_id), request)
            .await?;
        self.client.invalidate(&Self::base_path(study_id)).await;
        Ok(participant)
    }

    pub async fn approve(
        &self,
        study_id: &str,
        participant_id: &str,
    ) -> Result<Participant, SdkError> {
        let participant: Participant = self
            .client
            .http
            .post(
                &format!("{}/{}/approve", Self::base_path(study_id), participant_id),
                &serde_json::json!({}),
            )
            .await?;
        self.client.invalidate(&Self::base_path(study_id)).await;
        Ok(participant)
    }

    pub async fn remove(&self, study_id: &str, participant_id: &str) -> Result<(), SdkError> {
        let _: serde_json::Value = self
            .client
            .http
            .delete(&format!("{}/{}", Self::base_path(study_id), participant_id))
            .await?;
        self.client.invalidate(&Self::base_path(study_id)).await;
        Ok(())
    }
}
