// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Gallery API client for wallhaven.cc.
//!
//! Provides a typed interface to the wallhaven v1 API: collection listings,
//! collection contents, wallpaper search and account settings. Every endpoint
//! wraps its payload in a `{"data": ...}` envelope; errors come back either as
//! a non-2xx status or as an `{"error": "..."}` body, and both are mapped onto
//! [`ApiError`].
//!
//! # Example
//!
//! ```no_run
//! use wallgrab::api::GalleryClient;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = GalleryClient::from_env();
//!
//! for collection in client.list_collections(Some("alice")).await? {
//!     println!("{} ({} wallpapers)", collection.label, collection.count);
//! }
//! # Ok(())
//! # }
//! ```

pub mod search;

use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::utils::mask_sensitive;

pub use search::{CategoryFilter, PurityFilter, SearchQuery, SortOrder, Sorting, TopRange};

/// Default wallhaven API endpoint.
const DEFAULT_API_HOST: &str = "https://wallhaven.cc/api/v1";

/// Header carrying the account API key.
const API_KEY_HEADER: &str = "X-API-Key";

/// Environment variable consulted by [`GalleryClient::from_env`].
pub const API_KEY_ENV: &str = "WALLHAVEN_API_KEY";

/// Timeout for establishing connections (in seconds).
const CONNECT_TIMEOUT_SECS: u64 = 5;

/// Timeout for metadata requests (in seconds).
const METADATA_TIMEOUT_SECS: u64 = 30;

/// Error types for gallery API operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// An operation that needs a credential was invoked without one.
    #[error("authentication required: set {API_KEY_ENV} or pass a username")]
    AuthRequired,

    /// The API answered with a non-success status.
    #[error("gallery API returned HTTP {status}: {message}")]
    Status { status: StatusCode, message: String },

    /// The API answered 2xx but reported an error in the envelope.
    #[error("gallery API error: {0}")]
    Api(String),

    /// The request exceeded its timeout.
    #[error("gallery API request timed out")]
    Timeout(#[source] reqwest::Error),

    /// Connection or transport failure.
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    /// The response body did not match the expected shape.
    #[error("malformed gallery API response: {0}")]
    Parse(#[source] reqwest::Error),
}

/// Map a reqwest transport failure onto the API error taxonomy.
fn classify_transport(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout(err)
    } else {
        ApiError::Network(err)
    }
}

/// Content rating of a wallpaper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Purity {
    Sfw,
    Sketchy,
    Nsfw,
}

/// A named collection owned by a gallery account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    /// Internal collection id, used to fetch the item list.
    pub id: u64,
    /// Human-readable collection label.
    pub label: String,
    /// View counter.
    #[serde(default)]
    pub views: u64,
    /// 1 when the collection is publicly visible.
    #[serde(default)]
    pub public: u8,
    /// Number of wallpapers in the collection.
    #[serde(default)]
    pub count: u64,
}

/// Thumbnail URLs of a wallpaper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thumbs {
    pub large: String,
    pub original: String,
    pub small: String,
}

/// One wallpaper entry as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallpaper {
    /// Wallpaper id, e.g. `94x38z`.
    pub id: String,
    /// Page URL on the gallery site.
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub short_url: String,
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub favorites: u64,
    /// Original source URL as submitted by the uploader.
    #[serde(default)]
    pub source: String,
    pub purity: Purity,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub dimension_x: u32,
    #[serde(default)]
    pub dimension_y: u32,
    #[serde(default)]
    pub resolution: String,
    #[serde(default)]
    pub ratio: String,
    /// Size of the full image in bytes.
    pub file_size: u64,
    #[serde(default)]
    pub file_type: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub colors: Vec<String>,
    /// Direct URL of the full-size image file.
    pub path: String,
    pub thumbs: Thumbs,
}

/// Account settings, only available with an API key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSettings {
    #[serde(default)]
    pub thumb_size: String,
    #[serde(default)]
    pub per_page: String,
    #[serde(default)]
    pub purity: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub resolutions: Vec<String>,
    #[serde(default)]
    pub aspect_ratios: Vec<String>,
    #[serde(default)]
    pub toplist_range: String,
    #[serde(default)]
    pub tag_blacklist: Vec<String>,
    #[serde(default)]
    pub user_blacklist: Vec<String>,
}

/// Response envelope shared by every API endpoint.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    error: Option<String>,
}

/// Client for the wallhaven gallery API.
#[derive(Debug, Clone)]
pub struct GalleryClient {
    /// Shared HTTP client; also reused for file transfers.
    http: reqwest::Client,
    /// Base URL of the API, without trailing slash.
    api_host: String,
    /// Optional account API key, sent as `X-API-Key`.
    api_key: Option<String>,
}

impl Default for GalleryClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GalleryClient {
    /// Create a client against the public wallhaven API, without a key.
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http,
            api_host: DEFAULT_API_HOST.to_string(),
            api_key: None,
        }
    }

    /// Create a client, reading the API key from `WALLHAVEN_API_KEY` if set.
    pub fn from_env() -> Self {
        let mut client = Self::new();
        if let Some(key) = std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty()) {
            debug!(key = %mask_sensitive(&key, 4), "using API key from environment");
            client.api_key = Some(key);
        }
        client
    }

    /// Point the client at a different API host (mainly for tests).
    pub fn with_api_host(mut self, host: impl Into<String>) -> Self {
        self.api_host = host.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the account API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Whether a key is configured.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// The underlying HTTP client, shared with the downloader so transfers
    /// reuse the connection pool.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// List collections owned by `username`, or by the key's account when
    /// `username` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::AuthRequired`] before any network I/O when neither
    /// a username nor an API key is available.
    pub async fn list_collections(&self, username: Option<&str>) -> Result<Vec<Collection>, ApiError> {
        if username.is_none() && self.api_key.is_none() {
            return Err(ApiError::AuthRequired);
        }

        let path = match username {
            Some(user) => format!("/collections/{}", user),
            None => "/collections".to_string(),
        };
        self.get_json(&path, &[]).await
    }

    /// List the wallpapers in one collection.
    pub async fn collection_items(&self, username: &str, id: u64) -> Result<Vec<Wallpaper>, ApiError> {
        self.get_json(&format!("/collections/{}/{}", username, id), &[]).await
    }

    /// Search wallpapers with the given filters.
    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<Wallpaper>, ApiError> {
        self.get_json("/search", &query.query_pairs()).await
    }

    /// Fetch the account settings for the configured API key.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::AuthRequired`] when no key is configured.
    pub async fn user_settings(&self) -> Result<UserSettings, ApiError> {
        if self.api_key.is_none() {
            return Err(ApiError::AuthRequired);
        }
        self.get_json("/settings", &[]).await
    }

    /// Issue a GET against `path`, unwrap the response envelope and decode
    /// the payload.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&'static str, String)],
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.api_host, path);
        debug!(%url, "requesting gallery endpoint");

        let mut request = self
            .http
            .get(&url)
            .timeout(Duration::from_secs(METADATA_TIMEOUT_SECS));
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = request.send().await.map_err(classify_transport)?;
        let status = response.status();

        if !status.is_success() {
            // The API puts a human-readable message in the envelope even for
            // error statuses; fall back to the canonical reason.
            let message = response
                .text()
                .await
                .ok()
                .and_then(|body| {
                    serde_json::from_str::<Envelope<serde_json::Value>>(&body)
                        .ok()
                        .and_then(|envelope| envelope.error)
                })
                .unwrap_or_else(|| {
                    status.canonical_reason().unwrap_or("request failed").to_string()
                });
            return Err(ApiError::Status { status, message });
        }

        let envelope: Envelope<T> = response.json().await.map_err(ApiError::Parse)?;
        if let Some(error) = envelope.error {
            return Err(ApiError::Api(error));
        }
        envelope
            .data
            .ok_or_else(|| ApiError::Api("response carried no data".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_collections_requires_user_or_key() {
        // Point at an unroutable host: the auth check must fire before any
        // network I/O, so no request is ever issued.
        let client = GalleryClient::new().with_api_host("http://127.0.0.1:1");

        let result = client.list_collections(None).await;
        assert!(matches!(result, Err(ApiError::AuthRequired)));
    }

    #[tokio::test]
    async fn test_user_settings_requires_key() {
        let client = GalleryClient::new().with_api_host("http://127.0.0.1:1");

        let result = client.user_settings().await;
        assert!(matches!(result, Err(ApiError::AuthRequired)));
    }

    #[test]
    fn test_collection_envelope_parsing() {
        let body = r#"{
            "data": [
                {"id": 42, "label": "Nature", "views": 9, "public": 1, "count": 2},
                {"id": 43, "label": "Cities"}
            ]
        }"#;

        let envelope: Envelope<Vec<Collection>> = serde_json::from_str(body).unwrap();
        let collections = envelope.data.unwrap();
        assert_eq!(collections.len(), 2);
        assert_eq!(collections[0].id, 42);
        assert_eq!(collections[0].label, "Nature");
        assert_eq!(collections[0].count, 2);
        // Missing counters default to zero.
        assert_eq!(collections[1].views, 0);
    }

    #[test]
    fn test_wallpaper_envelope_parsing() {
        let body = r#"{
            "data": [{
                "id": "94x38z",
                "url": "https://wallhaven.cc/w/94x38z",
                "purity": "sfw",
                "file_size": 500,
                "file_type": "image/jpeg",
                "path": "https://w.wallhaven.cc/full/94/sunset.jpg",
                "thumbs": {
                    "large": "https://th.wallhaven.cc/lg/94/94x38z.jpg",
                    "original": "https://th.wallhaven.cc/orig/94/94x38z.jpg",
                    "small": "https://th.wallhaven.cc/small/94/94x38z.jpg"
                }
            }]
        }"#;

        let envelope: Envelope<Vec<Wallpaper>> = serde_json::from_str(body).unwrap();
        let wallpapers = envelope.data.unwrap();
        assert_eq!(wallpapers.len(), 1);
        assert_eq!(wallpapers[0].purity, Purity::Sfw);
        assert_eq!(wallpapers[0].file_size, 500);
        assert!(wallpapers[0].path.ends_with("sunset.jpg"));
    }

    #[test]
    fn test_error_envelope_parsing() {
        let body = r#"{"error": "Nothing here"}"#;
        let envelope: Envelope<Vec<Collection>> = serde_json::from_str(body).unwrap();
        assert!(envelope.data.is_none());
        assert_eq!(envelope.error.as_deref(), Some("Nothing here"));
    }

    #[test]
    fn test_purity_rename() {
        assert_eq!(serde_json::to_string(&Purity::Nsfw).unwrap(), r#""nsfw""#);
        let parsed: Purity = serde_json::from_str(r#""sketchy""#).unwrap();
        assert_eq!(parsed, Purity::Sketchy);
    }
}
