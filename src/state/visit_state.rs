/// Visit state definitions for tracking a URL through one crawl run
use std::fmt;

/// Represents where a URL is in its visit lifecycle
///
/// ```text
/// Unseen -> Claimed -> InFlight -> Completed | Failed
///              \______________________/
/// ```
///
/// A claimed URL may settle without ever going in flight (resumed from
/// disk, restricted, served from cache or rejected before a page opened).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisitState {
    /// Never observed during this run
    Unseen,

    /// Owned by exactly one visit computation
    Claimed,

    /// A page is open and being driven for this URL
    InFlight,

    // ===== Terminal States =====
    /// Processed successfully
    Completed,

    /// Processing ended with a recorded failure
    Failed,
}

impl VisitState {
    /// Returns true if the URL has settled for this run
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns true if moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: VisitState) -> bool {
        matches!(
            (self, next),
            (Self::Unseen, Self::Claimed)
                | (Self::Claimed, Self::InFlight)
                | (Self::Claimed, Self::Completed)
                | (Self::Claimed, Self::Failed)
                | (Self::InFlight, Self::Completed)
                | (Self::InFlight, Self::Failed)
        )
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Unseen => "unseen",
            Self::Claimed => "claimed",
            Self::InFlight => "in_flight",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "unseen" => Some(Self::Unseen),
            "claimed" => Some(Self::Claimed),
            "in_flight" => Some(Self::InFlight),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for VisitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
