use thiserror::Error;

/// Errors surfaced by the synchronization engine.
///
/// Policy branches (stale elapsed time, divergence snaps) are not errors;
/// they resolve silently to the last-known pose.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncError {
    #[error("only the owner may perform this operation")]
    NotOwner,
    #[error("synchronization is disabled for this entity")]
    Disabled,
    #[error("kinematic sample contains non-finite values")]
    InvalidSample,
}
