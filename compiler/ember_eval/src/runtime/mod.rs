//! The embedding surface: one arena, one global root, the host hooks and the
//! entry points that evaluate source against them.

mod builder;

pub use builder::RuntimeBuilder;

use ember_arena::{Arena, ArenaStats, ArgSpec, NativeId, Var, VarRef};
use tracing::debug;

use crate::config::EvalConfig;
use crate::errors::{EvalError, EvalResult};
use crate::exec::{hidden, Args, Exec};
use crate::host::{HostClock, InterruptHandle, SharedSink};
use crate::native::{NativeFn, NativeRegistry};

/// An Ember runtime.
///
/// Globals persist in the root across evaluations. Values returned to the
/// host are [`Var`] guards borrowing the runtime; they keep their records
/// alive until dropped.
///
/// # Example
///
/// ```
/// use ember_eval::Runtime;
///
/// let rt = Runtime::builder().build()?;
/// rt.eval("var total = 0; for (var i = 1; i <= 4; i++) total += i;")?;
/// let total = rt.get("total").map(|v| rt.arena().as_int(&v));
/// assert_eq!(total, Some(10));
/// # Ok::<(), ember_eval::EvalError>(())
/// ```
pub struct Runtime {
    arena: Arena,
    /// Kept alive by a structural reference taken at construction.
    root: VarRef,
    natives: NativeRegistry,
    config: EvalConfig,
    sink: SharedSink,
    clock: HostClock,
    interrupt: InterruptHandle,
}

impl Runtime {
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    /// The global scope.
    pub fn root(&self) -> Var<'_> {
        self.arena.lock(self.root)
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    pub fn natives(&self) -> &NativeRegistry {
        &self.natives
    }

    /// Register a host function; see [`NativeRegistry::register`].
    pub fn register_native(
        &mut self,
        owner: &str,
        name: &str,
        spec: ArgSpec,
        func: NativeFn,
    ) -> Option<NativeId> {
        self.natives.register(owner, name, spec, func)
    }

    pub fn sink(&self) -> &SharedSink {
        &self.sink
    }

    pub fn clock(&self) -> &HostClock {
        &self.clock
    }

    /// Handle that stops the running evaluation at its next safepoint. It
    /// can be cloned into another thread.
    pub fn interrupt_handle(&self) -> &InterruptHandle {
        &self.interrupt
    }

    pub fn stats(&self) -> ArenaStats {
        self.arena.stats()
    }

    /// The global variable `name`.
    pub fn get(&self, name: &str) -> Option<Var<'_>> {
        self.arena.get_child(&self.root(), name)
    }

    /// Create or overwrite the global variable `name`.
    pub fn set_global<'a>(&'a self, name: &str, value: Option<&Var<'a>>) -> EvalResult<()> {
        self.arena.set_child(&self.root(), name, value)?;
        Ok(())
    }

    // Entry points

    /// Evaluate a program. Returns the value of its last top-level
    /// expression statement.
    pub fn eval(&self, source: &str) -> EvalResult<Option<Var<'_>>> {
        self.eval_named("<eval>", source)
    }

    /// Evaluate a program, naming it `name` in diagnostics and traces.
    #[tracing::instrument(level = "debug", skip(self, source))]
    pub fn eval_named(&self, name: &str, source: &str) -> EvalResult<Option<Var<'_>>> {
        self.clear_fault();
        debug!(bytes = source.len(), "evaluating");
        let source = self.arena.new_string(source)?;
        let mut exec = Exec::new(self, source, name);
        let result = exec.run_program();
        self.finish(result)
    }

    /// Evaluate with `scope` as the innermost scope. Declarations land in
    /// `scope`; names not found there resolve globally.
    pub fn eval_in_scope<'a>(
        &'a self,
        scope: &Var<'a>,
        source: &str,
    ) -> EvalResult<Option<Var<'a>>> {
        self.clear_fault();
        let source = self.arena.new_string(source)?;
        let mut exec = Exec::new(self, source, "<eval>");
        exec.enter_scope(scope.clone());
        let result = exec.run_program();
        self.finish(result)
    }

    /// Call a script or host function from the host.
    pub fn call_function<'a>(
        &'a self,
        func: &Var<'a>,
        this: Option<&Var<'a>>,
        args: &[Option<Var<'a>>],
    ) -> EvalResult<Option<Var<'a>>> {
        self.clear_fault();
        let source = self.arena.new_string("")?;
        let mut exec = Exec::new(self, source, "<host>");
        let args: Args<'a> = args.iter().cloned().collect();
        let result = exec.call_from_host(func.clone(), this.cloned(), args);
        self.finish(result)
    }

    /// Take the exception that ended the last evaluation, clearing it and
    /// its trace.
    pub fn take_exception(&self) -> Option<Var<'_>> {
        let root = self.root();
        let value = self.arena.get_hidden(&root, hidden::EXCEPTION);
        self.arena.remove_hidden(&root, hidden::EXCEPTION);
        self.arena.remove_hidden(&root, hidden::TRACE);
        value
    }

    /// Trace of the pending uncaught exception, innermost frame first.
    pub fn exception_trace(&self) -> Vec<String> {
        let arena = &self.arena;
        let Some(trace) = arena.get_hidden(&self.root(), hidden::TRACE) else {
            return Vec::new();
        };
        (0..arena.array_len(&trace))
            .filter_map(|i| arena.array_get(&trace, i))
            .map(|line| arena.to_display_string(Some(&line)))
            .collect()
    }

    fn clear_fault(&self) {
        if let Some(fault) = self.arena.take_fault() {
            debug!(%fault, "clearing arena fault left by an earlier evaluation");
        }
    }

    /// Report a failed evaluation to the sink. Syntax errors were already
    /// reported as they were found.
    fn finish<'a>(&self, result: EvalResult<Option<Var<'a>>>) -> EvalResult<Option<Var<'a>>> {
        match &result {
            Ok(_) | Err(EvalError::Syntax { .. }) => {}
            Err(EvalError::Uncaught { message, trace }) => {
                self.sink.report(&format!("Uncaught {message}"));
                for line in trace {
                    self.sink.report(&format!("    {line}"));
                }
            }
            Err(err) => self.sink.report(&format!("error: {err}")),
        }
        result
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.arena.release(self.root);
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("arena", &self.arena)
            .field("natives", &self.natives.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
