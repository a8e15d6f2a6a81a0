//! Error taxonomy for the snapshot engine.
//!
//! - Lookup: backing component missing and cannot be created (or root absent).
//! - Capture: export from a live component failed.
//! - Restore: apply to a live component or root failed.
//! - Configuration: operation attempted before required setup (no slots, no root).
//! - Busy: a transition entry point was re-entered.
//!
//! Lookup/Capture/Restore carry a `part` path. Every owning layer prefixes its
//! own name with [`SwapError::within`], so the top-level message names the
//! exact failing part ("slot 1 > Hair > Scalp hairsim1").

use thiserror::Error;

use crate::host::NodeId;
use crate::kind::ComponentKind;

pub type SwapResult<T> = std::result::Result<T, SwapError>;

#[derive(Debug, Error)]
pub enum SwapError {
    #[error("lookup failed{}: {kind} under node {root}: {reason}", part_label(.part))]
    Lookup {
        part: String,
        kind: ComponentKind,
        root: NodeId,
        reason: String,
    },
    #[error("capture failed{}: {cause:#}", part_label(.part))]
    Capture { part: String, cause: anyhow::Error },
    #[error("restore failed{}: {cause:#}", part_label(.part))]
    Restore { part: String, cause: anyhow::Error },
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("{0} rejected: another transition is in flight")]
    Busy(&'static str),
}

fn part_label(part: &str) -> String {
    if part.is_empty() {
        String::new()
    } else {
        format!(" [{}]", part)
    }
}

/// Failure kind, for callers that branch on the outcome instead of the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Lookup,
    Capture,
    Restore,
    Configuration,
    Busy,
}

impl SwapError {
    pub fn capture(part: impl Into<String>, cause: impl Into<anyhow::Error>) -> Self {
        SwapError::Capture {
            part: part.into(),
            cause: cause.into(),
        }
    }

    pub fn restore(part: impl Into<String>, cause: impl Into<anyhow::Error>) -> Self {
        SwapError::Restore {
            part: part.into(),
            cause: cause.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SwapError::Lookup { .. } => ErrorKind::Lookup,
            SwapError::Capture { .. } => ErrorKind::Capture,
            SwapError::Restore { .. } => ErrorKind::Restore,
            SwapError::Configuration(_) => ErrorKind::Configuration,
            SwapError::Busy(_) => ErrorKind::Busy,
        }
    }

    /// Path of the failing part, if this error names one.
    pub fn part(&self) -> Option<&str> {
        match self {
            SwapError::Lookup { part, .. }
            | SwapError::Capture { part, .. }
            | SwapError::Restore { part, .. } => Some(part.as_str()),
            _ => None,
        }
    }

    /// Prefix the part path with the name of the owning layer.
    pub fn within(self, owner: &str) -> Self {
        fn join(owner: &str, part: String) -> String {
            if part.is_empty() {
                owner.to_string()
            } else {
                format!("{} > {}", owner, part)
            }
        }
        match self {
            SwapError::Lookup {
                part,
                kind,
                root,
                reason,
            } => SwapError::Lookup {
                part: join(owner, part),
                kind,
                root,
                reason,
            },
            SwapError::Capture { part, cause } => SwapError::Capture {
                part: join(owner, part),
                cause,
            },
            SwapError::Restore { part, cause } => SwapError::Restore {
                part: join(owner, part),
                cause,
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn within_prefixes_part_path() {
        let e = SwapError::restore("Scalp hairsim1", anyhow!("boom"))
            .within("Hair")
            .within("slot 2");
        assert_eq!(e.kind(), ErrorKind::Restore);
        assert_eq!(e.part(), Some("slot 2 > Hair > Scalp hairsim1"));
        let msg = e.to_string();
        assert!(msg.contains("slot 2 > Hair > Scalp hairsim1"), "{msg}");
        assert!(msg.contains("boom"), "{msg}");
    }

    #[test]
    fn within_leaves_configuration_untouched() {
        let e = SwapError::Configuration("no slots".into()).within("slot 0");
        assert_eq!(e.part(), None);
        assert_eq!(e.to_string(), "configuration error: no slots");
    }
}
