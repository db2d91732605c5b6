//! Subscription parameters, tracking, and matching.

use serde::{Deserialize, Serialize};

/// Parameters for subscribing to a relay channel.
///
/// Wire format uses `#[serde(tag = "channel")]`; subscribe and unsubscribe
/// carry the same shape, discriminated by the outer message `type`.
#[derive(Debug, Clone, Serialize, Deserialize, Hash, Eq, PartialEq)]
#[serde(tag = "channel", rename_all = "snake_case")]
pub enum SubscribeParams {
    /// Every collaboration event for one study: comments, saves, presence.
    Study { study_id: String },
    /// Presence only — cheap cursor for member lists.
    Presence { study_id: String },
}

/// Parameters for unsubscribing from a relay channel.
#[derive(Debug, Clone, Serialize, Deserialize, Hash, Eq, PartialEq)]
#[serde(tag = "channel", rename_all = "snake_case")]
pub enum UnsubscribeParams {
    Study { study_id: String },
    Presence { study_id: String },
}

impl SubscribeParams {
    pub fn to_unsubscribe(&self) -> UnsubscribeParams {
        match self {
            SubscribeParams::Study { study_id } => UnsubscribeParams::Study {
                study_id: study_id.clone(),
            },
            SubscribeParams::Presence { study_id } => UnsubscribeParams::Presence {
                study_id: study_id.clone(),
            },
        }
    }

    pub fn matches_unsubscribe(&self, unsub: &UnsubscribeParams) -> bool {
        match (self, unsub) {
            (
                SubscribeParams::Study { study_id: a },
                UnsubscribeParams::Study { study_id: b },
            ) => a == b,
            (
                SubscribeParams::Presence { study_id: a },
                UnsubscribeParams::Presence { study_id: b },
            ) => a == b,
            _ => false,
        }
    }

    /// Stable identity used for dedup in the tracked-subscription list.
    pub fn channel_key(&self) -> String {
        match self {
            SubscribeParams::Study { study_id } => format!("study:{}", study_id),
            SubscribeParams::Presence { study_id } => format!("presence:{}", study_id),
        }
    }
}
