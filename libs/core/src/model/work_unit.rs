use serde::{Deserialize, Serialize};

use crate::model::file_metadata::FileMetadata;

/// One pending synchronization action, recomputed fresh on every call to
/// calculate_work.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "tag", content = "content")]
pub enum WorkUnit {
    /// A change made locally that needs to be pushed to the server
    LocalChange { metadata: FileMetadata },

    /// A change made on the server that needs to be pulled
    ServerChange { metadata: FileMetadata },
}

impl WorkUnit {
    pub fn get_metadata(&self) -> FileMetadata {
        match self {
            WorkUnit::LocalChange { metadata } => metadata,
            WorkUnit::ServerChange { metadata } => metadata,
        }
        .clone()
    }
}

/// What sync is currently doing, for progress reporting.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum ClientWorkUnit {
    PullMetadata,
    PushMetadata,
    PullDocument(String),
    PushDocument(String),
}
