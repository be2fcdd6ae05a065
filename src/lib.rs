pub mod detect;
pub mod fetcher;
pub mod handle;
pub mod monitor;
pub mod settings;
pub mod storage;

#[cfg(feature = "api")]
pub mod api;

use serde::{Deserialize, Serialize};

/// One point-in-time observation of a profile, as returned by a fetcher.
///
/// Numeric fields are optional because the source page does not always
/// expose them. `username` is the canonical handle reported by the source,
/// which may differ in case from the handle that was requested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    pub username: String,
    pub nickname: Option<String>,
    pub bio: Option<String>,
    pub verified: bool,
    pub followers: Option<i64>,
    pub following: Option<i64>,
    pub likes: Option<i64>,
    pub videos_count: Option<i64>,
    pub profile_url: String,
    /// Fetch-time extra; shown on manual checks, never persisted.
    #[serde(default)]
    pub recent_videos: Vec<RecentVideo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentVideo {
    pub id: Option<String>,
    pub description: String,
    pub play_count: Option<i64>,
    pub digg_count: Option<i64>,
    pub comment_count: Option<i64>,
    pub share_count: Option<i64>,
}
