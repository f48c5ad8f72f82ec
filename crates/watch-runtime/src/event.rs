//! Change notifications and watch selectors.

use std::fmt;

/// Kind of change carried by a [`WatchEvent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// Object created
    Added,
    /// Object updated
    Modified,
    /// Object removed
    Deleted,
    /// Server-side watch error
    Error,
}

impl EventType {
    /// Lowercase name, used for log fields and metric labels
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::Added => "added",
            EventType::Modified => "modified",
            EventType::Deleted => "deleted",
            EventType::Error => "error",
        }
    }

    /// Added and Modified both mean "the object now looks like this".
    pub fn is_upsert(self) -> bool {
        matches!(self, EventType::Added | EventType::Modified)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One notification from a change feed, already decoded into the watched kind.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent<K> {
    /// Object created
    Added(K),
    /// Object updated
    Modified(K),
    /// Object removed (carries its last known state)
    Deleted(K),
    /// The server reported an error on the feed
    Error {
        /// HTTP-style status code (410 means the requested version expired)
        code: u16,
        /// Server message
        message: String,
    },
}

/// Label and field selectors for a watch. `None` matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selectors {
    /// Label selector (e.g. "app=router")
    pub labels: Option<String>,
    /// Field selector (e.g. "status.phase=Running")
    pub fields: Option<String>,
}

impl Selectors {
    /// Matches every object in the collection.
    pub fn everything() -> Self {
        Self::default()
    }
}
