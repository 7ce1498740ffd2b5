//! Ember Eval - the fused parser/evaluator of the Ember script runtime.
//!
//! Source is executed as it is parsed: there is no syntax tree and no
//! bytecode. All values live in the [`ember_arena::Arena`] owned by a
//! [`Runtime`]; the evaluator itself only holds lock guards on the stack.
//!
//! # Architecture
//!
//! - `exec`: the recursive-descent evaluator, one method per production
//! - `native`: the host function registry and the call view natives get
//! - `builtins`: core methods registered by default
//! - `host`: output sink, clock and interrupt flag supplied by the embedder
//! - `runtime`: the embedding API and its builder
//!
//! # Example
//!
//! ```
//! use ember_arena::{ArgSpec, ArgType};
//! use ember_eval::{buffer_sink, NativeCall, NativeValue, Runtime, EvalResult};
//!
//! fn double<'a>(call: &mut NativeCall<'a, '_>) -> EvalResult<NativeValue<'a>> {
//!     Ok(NativeValue::Int(call.int(0) * 2))
//! }
//!
//! let sink = buffer_sink();
//! let rt = Runtime::builder()
//!     .sink(sink.clone())
//!     .native("global", "double", ArgSpec::returns(ArgType::Int32).param(ArgType::Int32), double)
//!     .build()?;
//! let value = rt.eval("double(21)")?;
//! assert_eq!(value.map(|v| rt.arena().as_int(&v)), Some(42));
//! # Ok::<(), ember_eval::EvalError>(())
//! ```

mod builtins;
mod config;
mod errors;
mod exec;
mod flags;
mod host;
mod native;
mod runtime;

pub use builtins::register_core_methods;
pub use config::EvalConfig;
pub use errors::{EvalError, EvalResult};
pub use flags::{Completion, ExecFlags};
pub use host::{
    buffer_sink, silent_sink, stdio_sink, BufferSink, DiagnosticSink, HostClock, InterruptHandle,
    ManualClock, SharedSink,
};
pub use native::{NativeCall, NativeEntry, NativeFn, NativeRegistry, NativeValue, GLOBAL_OWNER};
pub use runtime::{Runtime, RuntimeBuilder};
