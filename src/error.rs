//! Crate-level error types.

use std::fmt;

use crate::metadata::{DetailLevel, SegmentId};

/// Errors produced by the volseg crate.
#[derive(Debug)]
pub enum VolsegError {
    /// Entry id prefix does not map to a known source database.
    UnknownSourcePrefix(String),
    /// Entry id is not of the `<prefix>-<number>` shape.
    MalformedEntryId(String),
    /// Two annotation records share the same segment id.
    DuplicateSegment(SegmentId),
    /// No mesh detail level satisfies the requested preference.
    NoDetailAvailable {
        /// Segment whose detail levels were inspected.
        segment: SegmentId,
        /// Preferred (finest acceptable) detail level, if any.
        preferred: Option<DetailLevel>,
    },
    /// The fetched payload has no segmentation data block.
    MissingSegmentationBlock(String),
    /// Lattice data arrived without a volume grid to decode it against.
    MissingGrid,
    /// Segments were requested but no segmentation is loaded.
    NoSegmentation,
    /// Network or server failure from the API collaborator.
    Fetch(String),
    /// Payload or table decoding failure.
    Decode(String),
    /// Scene graph rejected a batch of operations.
    Scene(String),
    /// A load finished after a newer load had already started.
    StaleLoad {
        /// Generation the finished load was started with.
        ticket: u64,
        /// Generation current at the time of the commit attempt.
        current: u64,
    },
    /// Some independent parts of an operation failed; the rest succeeded.
    Partial(Vec<PartialFailure>),
    /// Generic I/O failure.
    Io(std::io::Error),
    /// Failed to spawn a background thread.
    ThreadSpawn(std::io::Error),
    /// TOML options parsing/serialization failure.
    OptionsParse(String),
}

/// The part of an operation a [`PartialFailure`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureScope {
    /// Density volume branch of a load.
    Volume,
    /// Lattice segmentation branch of a load.
    Lattice,
    /// Mesh streaming branch of a load.
    MeshStreaming,
    /// Loading a single mesh segment.
    Segment(SegmentId),
}

impl fmt::Display for FailureScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Volume => write!(f, "volume"),
            Self::Lattice => write!(f, "lattice segmentation"),
            Self::MeshStreaming => write!(f, "mesh streaming"),
            Self::Segment(id) => write!(f, "segment {id}"),
        }
    }
}

/// One isolated failure inside a [`VolsegError::Partial`].
#[derive(Debug)]
pub struct PartialFailure {
    /// Where the failure happened.
    pub scope: FailureScope,
    /// What went wrong.
    pub error: VolsegError,
}

impl fmt::Display for VolsegError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownSourcePrefix(prefix) => {
                write!(f, "unknown entry id prefix: {prefix:?}")
            }
            Self::MalformedEntryId(id) => {
                write!(f, "malformed entry id {id:?} (expected <prefix>-<number>)")
            }
            Self::DuplicateSegment(id) => {
                write!(f, "duplicate segment annotation for segment {id}")
            }
            Self::NoDetailAvailable { segment, preferred } => match preferred {
                Some(p) => write!(
                    f,
                    "no mesh detail level <= {p} available for segment {segment}"
                ),
                None => {
                    write!(f, "no mesh detail levels available for segment {segment}")
                }
            },
            Self::MissingSegmentationBlock(header) => {
                write!(f, "payload has no {header} block")
            }
            Self::MissingGrid => {
                write!(f, "volume data must be present to decode a lattice segmentation")
            }
            Self::NoSegmentation => write!(f, "no segmentation loaded"),
            Self::Fetch(msg) => write!(f, "fetch error: {msg}"),
            Self::Decode(msg) => write!(f, "decode error: {msg}"),
            Self::Scene(msg) => write!(f, "scene error: {msg}"),
            Self::StaleLoad { ticket, current } => write!(
                f,
                "load generation {ticket} superseded by generation {current}"
            ),
            Self::Partial(failures) => {
                write!(f, "{} part(s) failed:", failures.len())?;
                for failure in failures {
                    write!(f, " [{}: {}]", failure.scope, failure.error)?;
                }
                Ok(())
            }
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::ThreadSpawn(e) => {
                write!(f, "failed to spawn thread: {e}")
            }
            Self::OptionsParse(msg) => {
                write!(f, "options parse error: {msg}")
            }
        }
    }
}

impl std::error::Error for VolsegError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) | Self::ThreadSpawn(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for VolsegError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for VolsegError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

impl VolsegError {
    /// Collapse a list of isolated failures: `None` when empty.
    #[must_use]
    pub fn from_failures(failures: Vec<PartialFailure>) -> Option<Self> {
        if failures.is_empty() {
            None
        } else {
            Some(Self::Partial(failures))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_lists_every_failure() {
        let err = VolsegError::Partial(vec![
            PartialFailure {
                scope: FailureScope::Segment(4),
                error: VolsegError::Fetch("timeout".to_owned()),
            },
            PartialFailure {
                scope: FailureScope::Volume,
                error: VolsegError::MissingGrid,
            },
        ]);
        let msg = err.to_string();
        assert!(msg.starts_with("2 part(s) failed"));
        assert!(msg.contains("segment 4: fetch error: timeout"));
        assert!(msg.contains("volume: volume data must be present"));
    }

    #[test]
    fn empty_failures_collapse_to_none() {
        assert!(VolsegError::from_failures(Vec::new()).is_none());
    }
}
