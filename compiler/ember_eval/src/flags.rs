//! Execution state threaded through the evaluator.

use bitflags::bitflags;
use ember_arena::Var;

bitflags! {
    /// What the evaluator is allowed to do at the current point of the parse.
    ///
    /// Without `EXECUTE` every production still consumes and checks its
    /// tokens but performs no side effects. The other bits record the
    /// syntactic context, which decides whether `break`, `continue` and
    /// `return` are legal.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ExecFlags: u8 {
        const EXECUTE = 1 << 0;
        const IN_LOOP = 1 << 1;
        const IN_SWITCH = 1 << 2;
        const IN_FUNCTION = 1 << 3;
    }
}

/// An abrupt completion waiting to be consumed by an enclosing construct.
///
/// While one is pending, statements are parsed but not executed, which is
/// how the rest of a block is skipped after `break` or `throw`.
#[derive(Debug)]
pub enum Completion<'a> {
    /// Consumed by the nearest loop or `switch`.
    Break,
    /// Consumed by the nearest loop.
    Continue,
    /// Consumed by the function call.
    Return(Option<Var<'a>>),
    /// Consumed by `catch`, or by the top level as an uncaught exception.
    Throw(Option<Var<'a>>),
}

impl Completion<'_> {
    pub fn is_throw(&self) -> bool {
        matches!(self, Completion::Throw(_))
    }
}
