//! Stack headroom checks for deep recursion.
//!
//! The evaluator is a recursive-descent parser that executes while it parses,
//! so every nested expression, block and script-level call consumes native
//! stack. On the small devices Ember targets the stack cannot be grown, so
//! instead of growing it we refuse to recurse further once the remaining
//! stack drops below a red zone and report the condition as a fatal error.
//!
//! # Platform Support
//!
//! - **Native targets**: Uses `stacker::remaining_stack` to measure headroom.
//! - **WASM targets**: No measurement is available; only the depth limit applies.
//!
//! # Usage
//!
//! ```text
//! let probe = StackProbe::new(64 * 1024, 64);
//! probe.check(depth)?;   // before entering a nested call
//! ```

use std::fmt;

/// Default red zone: refuse to recurse with less than 64KB of stack left.
pub const DEFAULT_RED_ZONE: usize = 64 * 1024;

/// Default limit on nested script-level calls.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Why a stack check failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StackExhausted {
    /// The configured call depth limit was reached.
    DepthLimit {
        /// Depth at which the check failed.
        depth: usize,
    },
    /// Less than the red zone of native stack remains.
    RedZone {
        /// Bytes of stack still available.
        remaining: usize,
    },
}

impl fmt::Display for StackExhausted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DepthLimit { depth } => write!(f, "maximum call depth of {depth} exceeded"),
            Self::RedZone { remaining } => {
                write!(f, "native stack exhausted ({remaining} bytes left)")
            }
        }
    }
}

impl std::error::Error for StackExhausted {}

/// Returns the number of bytes of native stack still available, if known.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn remaining_stack() -> Option<usize> {
    stacker::remaining_stack()
}

/// WASM version - the remaining stack cannot be measured.
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn remaining_stack() -> Option<usize> {
    None
}

/// Returns `true` if at least `red_zone` bytes of stack remain.
///
/// When the remaining stack cannot be measured this optimistically returns
/// `true`; callers must pair it with a depth limit.
#[inline]
pub fn has_headroom(red_zone: usize) -> bool {
    remaining_stack().map_or(true, |left| left >= red_zone)
}

/// Combined depth and headroom check, configured once per runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StackProbe {
    red_zone: usize,
    max_depth: usize,
}

impl StackProbe {
    /// Create a probe. A `max_depth` of zero disables the depth limit.
    pub const fn new(red_zone: usize, max_depth: usize) -> Self {
        StackProbe {
            red_zone,
            max_depth,
        }
    }

    /// The configured red zone in bytes.
    pub fn red_zone(&self) -> usize {
        self.red_zone
    }

    /// The configured depth limit (zero means unlimited).
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Check whether it is safe to enter nesting level `depth`.
    #[inline]
    pub fn check(&self, depth: usize) -> Result<(), StackExhausted> {
        if self.max_depth != 0 && depth > self.max_depth {
            return Err(StackExhausted::DepthLimit { depth });
        }
        match remaining_stack() {
            Some(remaining) if remaining < self.red_zone => {
                Err(StackExhausted::RedZone { remaining })
            }
            _ => Ok(()),
        }
    }
}

impl Default for StackProbe {
    fn default() -> Self {
        Self::new(DEFAULT_RED_ZONE, DEFAULT_MAX_DEPTH)
    }
}
