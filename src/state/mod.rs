//! State module for tracking audit session progress
//!
//! # Components
//!
//! - `SessionState`: the lifecycle of one audit session, from configuration
//!   through crawling to export finalization

mod session_state;

pub use session_state::SessionState;
