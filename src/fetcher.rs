//! Profile fetching
//!
//! The engine only depends on the [`ProfileFetcher`] contract: handle in,
//! [`ProfileSnapshot`] out, classified [`ScrapeError`] on failure. The
//! shipped implementation pulls the JSON payload embedded in the profile
//! page's hydration scripts.

use std::fmt;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, instrument, trace};

use crate::handle::{HandleError, normalize_handle};
use crate::{ProfileSnapshot, RecentVideo};

const DEFAULT_BASE_URL: &str = "https://www.tiktok.com";

/// Script element ids that may carry the embedded profile payload,
/// in probing order
const PAYLOAD_SCRIPT_IDS: [&str; 3] = [
    "__UNIVERSAL_DATA_FOR_REHYDRATION__",
    "SIGI_STATE",
    "__NEXT_DATA__",
];

const RECENT_VIDEO_LIMIT: usize = 8;

/// Result type alias for fetch operations
pub type FetchResult = Result<ProfileSnapshot, ScrapeError>;

/// Classified failure modes of a profile fetch
#[derive(Debug)]
pub enum ScrapeError {
    /// The handle failed validation before any request was made
    InvalidHandle(HandleError),

    /// The HTTP request itself failed (connect, timeout, status, decode)
    Request(reqwest::Error),

    /// The page loaded but carried no readable embedded payload
    PayloadMissing,

    /// The payload parsed but contained no account details
    AccountMissing,
}

impl fmt::Display for ScrapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScrapeError::InvalidHandle(err) => write!(f, "{}", err),
            ScrapeError::Request(err) => write!(f, "profile request failed: {}", err),
            ScrapeError::PayloadMissing => {
                write!(f, "Could not read profile payload from page.")
            }
            ScrapeError::AccountMissing => {
                write!(f, "Could not find account details in payload.")
            }
        }
    }
}

impl std::error::Error for ScrapeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScrapeError::InvalidHandle(err) => Some(err),
            ScrapeError::Request(err) => Some(err),
            _ => None,
        }
    }
}

impl From<HandleError> for ScrapeError {
    fn from(err: HandleError) -> Self {
        ScrapeError::InvalidHandle(err)
    }
}

impl From<reqwest::Error> for ScrapeError {
    fn from(err: reqwest::Error) -> Self {
        ScrapeError::Request(err)
    }
}

/// Contract between the engine and whatever produces observations
#[async_trait]
pub trait ProfileFetcher: Send + Sync {
    /// Fetch a fresh snapshot for a handle
    ///
    /// The returned `username` is the canonical handle reported by the
    /// source, which may differ in case from the requested one.
    async fn fetch(&self, handle: &str) -> FetchResult;
}

/// HTTP implementation of [`ProfileFetcher`]
///
/// Fetches the public profile page and extracts the embedded hydration
/// payload. The base URL is injectable so tests can point it at a mock
/// server.
pub struct HttpProfileFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpProfileFetcher {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            base_url,
        }
    }
}

impl Default for HttpProfileFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProfileFetcher for HttpProfileFetcher {
    #[instrument(skip(self))]
    async fn fetch(&self, handle: &str) -> FetchResult {
        let normalized = normalize_handle(handle)?;
        let url = format!("{}/@{}", self.base_url, normalized);

        trace!("fetching profile page at {}", url);

        let page = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let payload = extract_payload(&page).ok_or(ScrapeError::PayloadMissing)?;
        let (user, stats) = find_account(&payload).ok_or(ScrapeError::AccountMissing)?;

        let username = user
            .get("uniqueId")
            .and_then(Value::as_str)
            .unwrap_or(&normalized)
            .to_string();

        debug!("extracted profile for {}", username);

        Ok(ProfileSnapshot {
            username,
            nickname: string_field(user, "nickname"),
            bio: string_field(user, "signature"),
            verified: user
                .get("verified")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            followers: count_field(stats, "followerCount"),
            following: count_field(stats, "followingCount"),
            likes: count_field(stats, "heartCount"),
            videos_count: count_field(stats, "videoCount"),
            profile_url: url,
            recent_videos: extract_recent_videos(&payload),
        })
    }
}

/// Locate and parse the embedded JSON payload in a profile page
fn extract_payload(page: &str) -> Option<Value> {
    static SCRIPT_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
        PAYLOAD_SCRIPT_IDS
            .iter()
            .map(|id| {
                Regex::new(&format!(
                    r#"(?s)<script[^>]*\bid="{}"[^>]*>(.*?)</script>"#,
                    regex::escape(id)
                ))
                .expect("invalid payload script regex")
            })
            .collect()
    });

    for re in SCRIPT_RES.iter() {
        let Some(captures) = re.captures(page) else {
            continue;
        };
        let raw = captures.get(1).map(|m| m.as_str())?;
        match serde_json::from_str::<Value>(raw) {
            Ok(loaded @ Value::Object(_)) => return Some(loaded),
            _ => continue,
        }
    }

    None
}

/// Depth-first walk for the first node that looks like account details
///
/// Accepts either a `userInfo: { user, stats }` wrapper or a sibling
/// `user`/`stats` pair; `user.uniqueId` is required either way.
fn find_account(value: &Value) -> Option<(&Map<String, Value>, &Map<String, Value>)> {
    static EMPTY: LazyLock<Map<String, Value>> = LazyLock::new(Map::new);

    match value {
        Value::Object(obj) => {
            if let Some(user_info) = obj.get("userInfo").and_then(Value::as_object) {
                if let Some(user) = user_info.get("user").and_then(Value::as_object) {
                    if user.get("uniqueId").and_then(Value::as_str).is_some() {
                        let stats = user_info
                            .get("stats")
                            .and_then(Value::as_object)
                            .unwrap_or(&EMPTY);
                        return Some((user, stats));
                    }
                }
            }

            if let (Some(user), Some(stats)) = (
                obj.get("user").and_then(Value::as_object),
                obj.get("stats").and_then(Value::as_object),
            ) {
                if user.get("uniqueId").and_then(Value::as_str).is_some() {
                    return Some((user, stats));
                }
            }

            obj.values().find_map(find_account)
        }
        Value::Array(items) => items.iter().find_map(find_account),
        _ => None,
    }
}

/// Collect recent videos from the payload's item module, if present
fn extract_recent_videos(payload: &Value) -> Vec<RecentVideo> {
    fn walk(value: &Value) -> Option<Vec<RecentVideo>> {
        match value {
            Value::Object(obj) => {
                if let Some(item_module) = obj.get("itemModule").and_then(Value::as_object) {
                    let videos: Vec<RecentVideo> = item_module
                        .values()
                        .filter_map(Value::as_object)
                        .map(|item| {
                            let stats = item
                                .get("stats")
                                .and_then(Value::as_object)
                                .cloned()
                                .unwrap_or_default();
                            RecentVideo {
                                id: string_field(item, "id"),
                                description: string_field(item, "desc").unwrap_or_default(),
                                play_count: count_field(&stats, "playCount"),
                                digg_count: count_field(&stats, "diggCount"),
                                comment_count: count_field(&stats, "commentCount"),
                                share_count: count_field(&stats, "shareCount"),
                            }
                        })
                        .take(RECENT_VIDEO_LIMIT)
                        .collect();
                    if !videos.is_empty() {
                        return Some(videos);
                    }
                }
                obj.values().find_map(walk)
            }
            Value::Array(items) => items.iter().find_map(walk),
            _ => None,
        }
    }

    walk(payload).unwrap_or_default()
}

fn string_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Counts may arrive as JSON numbers or as numeric strings
fn count_field(obj: &Map<String, Value>, key: &str) -> Option<i64> {
    match obj.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
