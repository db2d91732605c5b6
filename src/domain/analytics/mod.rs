//! Analytics domain — aggregate study metrics.

#[cfg(feature = "http")]
pub mod client;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Headline numbers for one study.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudySummary {
    pub study_id: String,
    pub total_participants: u64,
    pub completed_sessions: u64,
    /// Completed sessions over started sessions, 0.0–1.0.
    pub completion_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub median_duration_seconds: Option<u64>,
}

/// One bucket in a responses-over-time series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponsePoint {
    pub bucket: DateTime<Utc>,
    pub responses: u64,
}

/// Response for `GET /api/analytics/studies/{id}/responses`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseSeries {
    pub points: Vec<ResponsePoint>,
}
