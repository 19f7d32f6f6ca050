//! Typed progress events and the observers that receive them

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// Progress event emitted by a crawl session or the finalizer
#[derive(Debug, Clone, PartialEq)]
pub enum CrawlEvent {
    /// A page visit was dispatched
    RequestStarted {
        url: String,
        requested: usize,
        queue_size: usize,
    },

    /// Navigation or rendering failed; the crawl continues
    RequestFailed { url: String, reason: String },

    /// robots.txt forbids the URL
    RequestDisallowed { url: String },

    /// Links of a page were not followed because of the depth limit
    MaxDepthReached { url: String, depth: u32 },

    /// The request limit was hit; no further URLs are queued
    MaxRequestReached { limit: usize },

    /// Free-form status line
    Status(String),

    /// Final report location
    Result {
        local_path: Option<PathBuf>,
        web_url: Option<String>,
    },

    /// A best-effort export step failed
    ExportFailed { step: String, reason: String },
}

impl fmt::Display for CrawlEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequestStarted {
                url,
                requested,
                queue_size,
            } => write!(f, "{:>4} {} (queue: {})", requested, url, queue_size),
            Self::RequestFailed { url, reason } => write!(f, "Failed: {} ({})", url, reason),
            Self::RequestDisallowed { url } => write!(f, "Disallowed by robots.txt: {}", url),
            Self::MaxDepthReached { url, depth } => {
                write!(f, "Max depth reached at {} (depth {})", url, depth)
            }
            Self::MaxRequestReached { limit } => write!(f, "Max requests reached ({})", limit),
            Self::Status(message) => f.write_str(message),
            Self::Result { local_path, web_url } => {
                f.write_str("Result:")?;
                if let Some(path) = local_path {
                    write!(f, " {}", path.display())?;
                }
                if let Some(url) = web_url {
                    write!(f, " {}", url)?;
                }
                Ok(())
            }
            Self::ExportFailed { step, reason } => write!(f, "{} failed: {}", step, reason),
        }
    }
}

/// Receiver of crawl events
///
/// Emission must not block; the crawl never waits on an observer.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &CrawlEvent);
}

/// Writes every event to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &CrawlEvent) {
        match event {
            CrawlEvent::RequestFailed { .. } | CrawlEvent::ExportFailed { .. } => {
                tracing::warn!("{}", event)
            }
            CrawlEvent::MaxDepthReached { .. } => tracing::debug!("{}", event),
            _ => tracing::info!("{}", event),
        }
    }
}

/// Forwards events to a live status channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: UnboundedSender<CrawlEvent>,
}

impl ChannelSink {
    pub fn new(sender: UnboundedSender<CrawlEvent>) -> Self {
        Self { sender }
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: &CrawlEvent) {
        // A closed channel means nobody is listening anymore
        let _ = self.sender.send(event.clone());
    }
}

/// Fan-out to several sinks
#[derive(Default, Clone)]
pub struct Observers {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl EventSink for Observers {
    fn emit(&self, event: &CrawlEvent) {
        for sink in &self.sinks {
            sink.emit(event);
        }
    }
}
