/// Crawl session lifecycle states
///
/// A session moves strictly forward through these states. Every state except
/// `Failed` can only be reached from its predecessor; `Failed` is reachable
/// only while the rendering collaborator is being launched.
use std::fmt;

/// Represents the current phase of an audit session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Configuration invariants checked, queue and visited-set constructed
    Init,

    /// Seeding the queue with the start URL or the URL list
    Queuing,

    /// Page visits in flight
    Running,

    /// Queue empty, waiting for the last in-flight visits
    Draining,

    /// Renderer and audit browser released
    Closed,

    /// Crawl finished, exports not started yet
    ExportPending,

    /// Exports, uploads and cleanup running
    Finalizing,

    /// Session finished
    Done,

    /// The rendering collaborator could not be started
    Failed,
}

impl SessionState {
    /// Returns true if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Returns true while pages may still be visited
    pub fn is_crawling(&self) -> bool {
        matches!(self, Self::Queuing | Self::Running | Self::Draining)
    }

    /// Returns true if the state machine may move from `self` to `next`
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Init, Queuing)
                | (Init, Failed)
                | (Queuing, Running)
                | (Running, Draining)
                | (Draining, Closed)
                | (Closed, ExportPending)
                | (ExportPending, Finalizing)
                | (Finalizing, Done)
        )
    }

    /// Short lowercase name used in log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Queuing => "queuing",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Closed => "closed",
            Self::ExportPending => "export_pending",
            Self::Finalizing => "finalizing",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_path_is_allowed() {
        let path = [
            SessionState::Init,
            SessionState::Queuing,
            SessionState::Running,
            SessionState::Draining,
            SessionState::Closed,
            SessionState::ExportPending,
            SessionState::Finalizing,
            SessionState::Done,
        ];
        for pair in path.windows(2) {
            assert!(
                pair[0].can_transition_to(pair[1]),
                "{} -> {} should be allowed",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_failed_only_from_init() {
        assert!(SessionState::Init.can_transition_to(SessionState::Failed));
        assert!(!SessionState::Running.can_transition_to(SessionState::Failed));
        assert!(!SessionState::Finalizing.can_transition_to(SessionState::Failed));
    }

    #[test]
    fn test_no_backwards_transitions() {
        assert!(!SessionState::Running.can_transition_to(SessionState::Queuing));
        assert!(!SessionState::Done.can_transition_to(SessionState::Init));
        assert!(!SessionState::Closed.can_transition_to(SessionState::Running));
    }

    #[test]
    fn test_terminal_states() {
        assert!(SessionState::Done.is_terminal());
        assert!(SessionState::Failed.is_terminal());
        assert!(!SessionState::ExportPending.is_terminal());
    }

    #[test]
    fn test_crawling_states() {
        assert!(SessionState::Running.is_crawling());
        assert!(!SessionState::Closed.is_crawling());
    }
}
