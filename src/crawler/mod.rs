//! Crawler module for driving a site audit
//!
//! This module contains the core crawling logic, including:
//! - The crawl session state machine and its worker pool
//! - The frontier (FIFO queue with de-duplication and request limit)
//! - Single page visits (request policy, render, extraction, audit)
//! - URL-list input parsing
//! - Typed progress events and their observers

mod coordinator;
mod events;
mod result;
mod scheduler;
mod url_list;
mod visitor;

pub use coordinator::{CrawlOutcome, CrawlSession};
pub use events::{ChannelSink, CrawlEvent, EventSink, Observers, TracingSink};
pub use result::{
    PageResult, DEPTH_FIELD, MIXED_CONTENT_FIELD, PREVIOUS_URL_FIELD, STATUS_FIELD, URL_FIELD,
};
pub use scheduler::{Enqueue, Frontier, QueuedUrl};
pub use url_list::{load_url_list, parse_url_list};
pub use visitor::PageVisitor;
