//! Per-host robots.txt cache
//!
//! robots.txt is fetched once per host and kept for the session. Entries older
//! than 24 hours are fetched again.

use crate::robots::{fetch_robots, ParsedRobots};
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use std::collections::HashMap;
use tokio::sync::Mutex;
use url::Url;

/// Cached robots.txt data for a host
#[derive(Debug, Clone)]
pub struct CachedRobots {
    pub content: ParsedRobots,
    pub fetched_at: DateTime<Utc>,
}

impl CachedRobots {
    pub fn new(content: ParsedRobots) -> Self {
        Self {
            content,
            fetched_at: Utc::now(),
        }
    }

    /// Checks if the cached robots.txt is older than 24 hours
    pub fn is_stale(&self) -> bool {
        Utc::now() - self.fetched_at > Duration::hours(24)
    }
}

/// Robots policy for a whole session, keyed by origin
pub struct RobotsCache {
    client: Client,
    user_agent: String,
    entries: Mutex<HashMap<String, CachedRobots>>,
}

impl RobotsCache {
    pub fn new(client: Client, user_agent: impl Into<String>) -> Self {
        Self {
            client,
            user_agent: user_agent.into(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the robots.txt of the URL's origin, fetching it when needed
    pub async fn robots_for(&self, url: &Url) -> ParsedRobots {
        let origin = url.origin().ascii_serialization();

        if let Some(cached) = self.entries.lock().await.get(&origin) {
            if !cached.is_stale() {
                return cached.content.clone();
            }
        }

        let robots = fetch_robots(&self.client, &origin).await;
        self.entries
            .lock()
            .await
            .insert(origin, CachedRobots::new(robots.clone()));
        robots
    }

    /// Checks a URL against its host's robots.txt
    pub async fn is_allowed(&self, url: &Url) -> bool {
        self.robots_for(url).await.is_allowed(url.as_str(), &self.user_agent)
    }
}
