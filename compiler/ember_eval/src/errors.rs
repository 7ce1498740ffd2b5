//! Fatal evaluation errors.
//!
//! These abort the current top-level evaluation. Script-level errors
//! (`TypeError`, `ReferenceError`, user `throw`) are not `EvalError`s: they
//! are thrown values that unwind through `try`/`catch` and only surface here
//! as [`EvalError::Uncaught`] when nothing catches them.

use ember_arena::ArenaError;

/// Result type for evaluator operations.
pub type EvalResult<T> = Result<T, EvalError>;

#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    /// Source that does not parse.
    #[error("syntax error at {line}:{column}: {message}")]
    Syntax {
        message: String,
        /// Byte offset in the evaluated source.
        offset: usize,
        line: usize,
        column: usize,
    },

    /// The value arena ran out of records or saturated a count.
    #[error(transparent)]
    Arena(#[from] ArenaError),

    /// Call nesting or native stack use went past the configured limits.
    #[error("stack exhausted at call depth {depth}")]
    StackExhausted { depth: usize },

    /// The host asked the evaluation to stop, or its time budget ran out.
    #[error("execution interrupted")]
    Interrupted,

    /// A single loop ran more iterations than allowed.
    #[error("loop exceeded {limit} iterations")]
    LoopLimit { limit: usize },

    /// A thrown value reached the top level.
    #[error("uncaught {message}")]
    Uncaught {
        message: String,
        /// One line per frame, innermost first.
        trace: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        let err = EvalError::Syntax {
            message: "expected ')', found ';'".into(),
            offset: 7,
            line: 2,
            column: 3,
        };
        assert_eq!(err.to_string(), "syntax error at 2:3: expected ')', found ';'");
        assert_eq!(
            EvalError::from(ArenaError::OutOfMemory { capacity: 16 }).to_string(),
            ArenaError::OutOfMemory { capacity: 16 }.to_string()
        );
        assert_eq!(
            EvalError::LoopLimit { limit: 10 }.to_string(),
            "loop exceeded 10 iterations"
        );
    }
}
