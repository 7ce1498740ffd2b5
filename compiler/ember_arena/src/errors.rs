//! Arena error conditions.
//!
//! Every variant is fatal to the operation that raised it: callers propagate
//! it with `?` and the lock guards they hold release their records while the
//! stack unwinds.

/// Failure raised by the value arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ArenaError {
    /// Every record is in use.
    #[error("out of memory: all {capacity} value records are in use")]
    OutOfMemory {
        /// Total number of records in the arena.
        capacity: usize,
    },
    /// A record's lock count saturated; the record is now pinned for good.
    #[error("too many locks held on a value record")]
    LockOverflow,
    /// A record's reference count saturated; the record is now pinned for good.
    #[error("too many references to a value record")]
    RefOverflow,
    /// A string operation was applied to a non-string record.
    #[error("value is not a string")]
    NotAString,
    /// A child-list operation was applied to a record that has no children.
    #[error("value cannot hold named children")]
    NotAContainer,
    /// A name operation was applied to a record that is not a name.
    #[error("value is not a name")]
    NotAName,
}

/// Result type for arena operations.
pub type ArenaResult<T> = Result<T, ArenaError>;
