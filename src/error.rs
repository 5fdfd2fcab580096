use thiserror::Error;

/// The checked failure modes of this crate's fallible constructors.
#[derive(Debug, Error)]
pub enum HashMapError {
    #[error("bucket count overflow: requested {requested} buckets")]
    CapacityOverflow { requested: usize },
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: &'static str },
}
