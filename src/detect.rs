//! Change detection between two profile observations
//!
//! [`detect`] is a pure function: it never touches the store, and its
//! output order is a contract. Fields are evaluated numeric first, then
//! text, then boolean, each in declared order, so that tests and the
//! dashboard see a deterministic event list.

use serde::{Deserialize, Serialize};

use crate::ProfileSnapshot;
use crate::storage::schema::SnapshotRow;

/// The tracked profile fields, in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Followers,
    Following,
    Likes,
    VideosCount,
    Nickname,
    Bio,
    Verified,
}

impl Metric {
    /// String form, matching the serde serialization
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Followers => "followers",
            Metric::Following => "following",
            Metric::Likes => "likes",
            Metric::VideosCount => "videos_count",
            Metric::Nickname => "nickname",
            Metric::Bio => "bio",
            Metric::Verified => "verified",
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One detected field change, before persistence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub metric: Metric,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    /// Signed difference, numeric metrics only
    pub delta: Option<i64>,
    pub message: String,
}

const NUMERIC_FIELDS: [Metric; 4] = [
    Metric::Followers,
    Metric::Following,
    Metric::Likes,
    Metric::VideosCount,
];

const TEXT_FIELDS: [Metric; 2] = [Metric::Nickname, Metric::Bio];

fn numeric_field(snapshot_field: Metric, row: &SnapshotRow) -> Option<i64> {
    match snapshot_field {
        Metric::Followers => row.followers,
        Metric::Following => row.following,
        Metric::Likes => row.likes,
        Metric::VideosCount => row.videos_count,
        _ => None,
    }
}

fn current_numeric_field(snapshot_field: Metric, profile: &ProfileSnapshot) -> Option<i64> {
    match snapshot_field {
        Metric::Followers => profile.followers,
        Metric::Following => profile.following,
        Metric::Likes => profile.likes,
        Metric::VideosCount => profile.videos_count,
        _ => None,
    }
}

fn text_field(field: Metric, row: &SnapshotRow) -> Option<&str> {
    match field {
        Metric::Nickname => row.nickname.as_deref(),
        Metric::Bio => row.bio.as_deref(),
        _ => None,
    }
}

fn current_text_field(field: Metric, profile: &ProfileSnapshot) -> Option<&str> {
    match field {
        Metric::Nickname => profile.nickname.as_deref(),
        Metric::Bio => profile.bio.as_deref(),
        _ => None,
    }
}

/// Compare two observations and produce the ordered list of change events
///
/// A missing `previous` establishes the baseline: the first observation of
/// an account is never reported as a change. Numeric fields are skipped
/// when either side is absent, which avoids false positives from transient
/// extraction gaps.
pub fn detect(previous: Option<&SnapshotRow>, current: &ProfileSnapshot) -> Vec<ChangeEvent> {
    let Some(previous) = previous else {
        return Vec::new();
    };

    let mut events = Vec::new();

    for field in NUMERIC_FIELDS {
        let (Some(old_value), Some(new_value)) = (
            numeric_field(field, previous),
            current_numeric_field(field, current),
        ) else {
            continue;
        };
        if old_value == new_value {
            continue;
        }
        let delta = new_value - old_value;
        events.push(ChangeEvent {
            metric: field,
            old_value: Some(old_value.to_string()),
            new_value: Some(new_value.to_string()),
            delta: Some(delta),
            message: format!(
                "{} changed from {} to {} ({:+}).",
                field, old_value, new_value, delta
            ),
        });
    }

    for field in TEXT_FIELDS {
        let old_value = text_field(field, previous);
        let new_value = current_text_field(field, current);
        if old_value == new_value {
            continue;
        }
        events.push(ChangeEvent {
            metric: field,
            old_value: old_value.map(str::to_string),
            new_value: new_value.map(str::to_string),
            delta: None,
            message: format!("{} changed.", field),
        });
    }

    if previous.verified != current.verified {
        events.push(ChangeEvent {
            metric: Metric::Verified,
            old_value: Some(previous.verified.to_string()),
            new_value: Some(current.verified.to_string()),
            delta: None,
            message: format!(
                "verified changed from {} to {}.",
                previous.verified, current.verified
            ),
        });
    }

    events
}
