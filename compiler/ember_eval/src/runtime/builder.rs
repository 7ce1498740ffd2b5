//! `RuntimeBuilder` for assembling a [`Runtime`] from its parts.

use ember_arena::{Arena, ArenaConfig, ArgSpec};
use tracing::debug;

use super::Runtime;
use crate::builtins::register_core_methods;
use crate::config::EvalConfig;
use crate::errors::EvalResult;
use crate::host::{stdio_sink, HostClock, InterruptHandle, SharedSink};
use crate::native::{NativeFn, NativeRegistry};

/// Builder for [`Runtime`].
///
/// Defaults: a 4096-record arena, [`EvalConfig::default`], the standard
/// streams as sink, the system clock, and the core methods (`bind`, `call`,
/// `push`, `pop`) registered.
pub struct RuntimeBuilder {
    arena: ArenaConfig,
    config: EvalConfig,
    sink: Option<SharedSink>,
    clock: HostClock,
    natives: NativeRegistry,
    core_methods: bool,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        RuntimeBuilder {
            arena: ArenaConfig::default(),
            config: EvalConfig::default(),
            sink: None,
            clock: HostClock::default(),
            natives: NativeRegistry::new(),
            core_methods: true,
        }
    }

    /// Number of value records.
    #[must_use]
    pub fn arena_capacity(mut self, capacity: usize) -> Self {
        self.arena = ArenaConfig::new(capacity);
        self
    }

    #[must_use]
    pub fn arena(mut self, config: ArenaConfig) -> Self {
        self.arena = config;
        self
    }

    /// Replace all evaluation limits.
    #[must_use]
    pub fn config(mut self, config: EvalConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn max_call_depth(mut self, depth: usize) -> Self {
        self.config.max_call_depth = depth;
        self
    }

    /// Iterations a single loop may run; zero means unlimited.
    #[must_use]
    pub fn max_loop_iterations(mut self, iterations: usize) -> Self {
        self.config.max_loop_iterations = iterations;
        self
    }

    #[must_use]
    pub fn time_budget_ms(mut self, budget: Option<u64>) -> Self {
        self.config.time_budget_ms = budget;
        self
    }

    /// Where program output and diagnostics go.
    #[must_use]
    pub fn sink(mut self, sink: SharedSink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Time source for the time budget.
    #[must_use]
    pub fn clock(mut self, clock: HostClock) -> Self {
        self.clock = clock;
        self
    }

    /// Register a host function.
    #[must_use]
    pub fn native(mut self, owner: &str, name: &str, spec: ArgSpec, func: NativeFn) -> Self {
        if self.natives.register(owner, name, spec, func).is_none() {
            debug!(owner, name, "native registry full; function dropped");
        }
        self
    }

    /// Start from an existing registry. Functions registered earlier on this
    /// builder are replaced.
    #[must_use]
    pub fn natives(mut self, registry: NativeRegistry) -> Self {
        self.natives = registry;
        self
    }

    /// Whether to register the core methods.
    #[must_use]
    pub fn core_methods(mut self, enabled: bool) -> Self {
        self.core_methods = enabled;
        self
    }

    pub fn build(mut self) -> EvalResult<Runtime> {
        if self.core_methods {
            register_core_methods(&mut self.natives);
        }
        let arena = Arena::new(self.arena);
        let root = {
            let root = arena.new_root()?;
            arena.add_ref(&root);
            root.var_ref()
        };
        debug!(
            capacity = self.arena.capacity,
            natives = self.natives.len(),
            "runtime ready"
        );
        Ok(Runtime {
            arena,
            root,
            natives: self.natives,
            config: self.config,
            sink: self.sink.unwrap_or_else(stdio_sink),
            clock: self.clock,
            interrupt: InterruptHandle::new(),
        })
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
