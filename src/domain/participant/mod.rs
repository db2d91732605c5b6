//! Participant domain — recruitment and screening state.

#[cfg(feature = "http")]
pub mod client;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a participant sits in the recruitment pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantStatus {
    Invited,
    Screened,
    Approved,
    Rejected,
    Completed,
}

/// A participant enrolled (or enrolling) in a study.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub study_id: String,
    pub email: String,
    pub status: ParticipantStatus,
    pub invited_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Response for `GET /api/studies/{id}/participants`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantsResponse {
    pub participants: Vec<Participant>,
    pub total: u64,
}

/// Body for `POST /api/studies/{id}/participants`.
#[derive(Debug, Clone, Serialize)]
pub struct InviteRequest {
    pub email: String,
    /// Screener the invitee must pass before approval.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screener_id: Option<String>,
}
