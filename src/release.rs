use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Source of the newest published version of the managed app.
#[async_trait]
pub trait ReleaseFeed: Send + Sync {
    async fn latest_version(&self) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct LatestRelease {
    tag_name: Option<String>,
}

/// GitHub "latest release" endpoint (or anything returning the same JSON shape).
pub struct GithubReleases {
    client: reqwest::Client,
    url: String,
}

impl GithubReleases {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| Error::Release(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

/// Strip the `<product>@` prefix and a leading `v` from a release tag.
pub fn normalize_tag(tag: &str) -> Option<String> {
    let bare = tag.rsplit('@').next().unwrap_or(tag);
    let bare = bare.trim().trim_start_matches('v');
    (!bare.is_empty()).then(|| bare.to_string())
}

fn parse_latest(body: &str) -> Result<String> {
    let release: LatestRelease =
        serde_json::from_str(body).map_err(|e| Error::Release(e.to_string()))?;
    release
        .tag_name
        .as_deref()
        .and_then(normalize_tag)
        .ok_or_else(|| Error::Release("response has no tag_name".to_string()))
}

#[async_trait]
impl ReleaseFeed for GithubReleases {
    async fn latest_version(&self) -> Result<String> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::Release(e.to_string()))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| Error::Release(e.to_string()))?;
        if !status.is_success() {
            return Err(Error::Release(format!("HTTP {}", status)));
        }
        parse_latest(&body)
    }
}
