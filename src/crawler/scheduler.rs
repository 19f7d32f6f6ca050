//! Frontier for managing the crawl queue
//!
//! This module handles:
//! - FIFO queue of URLs tagged with their depth
//! - De-duplication across queued and already visited URLs
//! - The request limit (no new URLs once the limit is reached)

use std::collections::{HashSet, VecDeque};
use url::Url;

/// A URL queued for a page visit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedUrl {
    /// The URL to visit
    pub url: Url,

    /// Distance from the seed (seeds are depth 0)
    pub depth: u32,

    /// Page the URL was discovered on
    pub previous_url: Option<String>,
}

impl QueuedUrl {
    pub fn seed(url: Url, depth: u32) -> Self {
        Self {
            url,
            depth,
            previous_url: None,
        }
    }
}

/// Outcome of [`Frontier::push`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueue {
    Queued,
    /// Already queued or visited
    Duplicate,
    /// The request limit leaves no room for more URLs
    LimitReached,
}

/// The crawl queue
///
/// Owned by the session loop, which is the only writer.
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<QueuedUrl>,
    seen: HashSet<String>,
    requested: usize,
    /// 0 = unlimited
    max_requests: usize,
}

impl Frontier {
    pub fn new(max_requests: usize) -> Self {
        Self {
            max_requests,
            ..Default::default()
        }
    }

    /// Adds a URL unless it was seen before or the request limit is reached
    pub fn push(&mut self, item: QueuedUrl) -> Enqueue {
        if self.seen.contains(item.url.as_str()) {
            return Enqueue::Duplicate;
        }
        if self.is_full() {
            return Enqueue::LimitReached;
        }
        self.seen.insert(item.url.as_str().to_string());
        self.queue.push_back(item);
        Enqueue::Queued
    }

    /// Takes the next URL and counts it as requested
    pub fn pop(&mut self) -> Option<QueuedUrl> {
        let item = self.queue.pop_front()?;
        self.requested += 1;
        Some(item)
    }

    /// True once requested plus queued URLs reach the limit
    pub fn is_full(&self) -> bool {
        self.max_requests > 0 && self.requested + self.queue.len() >= self.max_requests
    }

    pub fn requested(&self) -> usize {
        self.requested
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
