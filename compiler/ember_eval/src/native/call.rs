//! The view a host function gets of its call.

use ember_arena::{Arena, Var};
use smallvec::SmallVec;

use super::NativeValue;
use crate::errors::EvalResult;
use crate::exec::{Args, Exec};

/// Arguments and evaluator access for one host function invocation.
///
/// Arguments arrive already converted according to the function's
/// descriptor. Through the call a host function can build values, call back
/// into script functions, print, and throw script-level errors.
pub struct NativeCall<'a, 'e> {
    exec: &'e mut Exec<'a>,
    this: Option<Var<'a>>,
    args: SmallVec<[NativeValue<'a>; 4]>,
}

impl<'a, 'e> NativeCall<'a, 'e> {
    pub(crate) fn new(
        exec: &'e mut Exec<'a>,
        this: Option<Var<'a>>,
        args: SmallVec<[NativeValue<'a>; 4]>,
    ) -> Self {
        NativeCall { exec, this, args }
    }

    pub fn arena(&self) -> &'a Arena {
        self.exec.arena
    }

    /// The receiver, for functions registered with a `this` descriptor.
    pub fn this(&self) -> Option<&Var<'a>> {
        self.this.as_ref()
    }

    pub fn args(&self) -> &[NativeValue<'a>] {
        &self.args
    }

    pub fn arg(&self, index: usize) -> Option<&NativeValue<'a>> {
        self.args.get(index)
    }

    /// Argument `index` as a script value. Scalars are boxed into records.
    pub fn var(&self, index: usize) -> EvalResult<Option<Var<'a>>> {
        match self.args.get(index) {
            Some(v) => Ok(v.clone().into_var(self.exec.arena)?),
            None => Ok(None),
        }
    }

    pub fn int(&self, index: usize) -> i32 {
        self.args
            .get(index)
            .map_or(0, |v| v.to_int(self.exec.arena))
    }

    pub fn float(&self, index: usize) -> f64 {
        self.args
            .get(index)
            .map_or(f64::NAN, |v| v.to_float(self.exec.arena))
    }

    pub fn bool(&self, index: usize) -> bool {
        self.args
            .get(index)
            .is_some_and(|v| v.to_bool(self.exec.arena))
    }

    /// Display text of a value, as `print` shows it.
    pub fn display(&self, value: Option<&Var<'a>>) -> String {
        self.exec.arena.to_display_string(value)
    }

    /// Call a script or host function.
    pub fn call(
        &mut self,
        func: Option<Var<'a>>,
        this: Option<Var<'a>>,
        args: &[Option<Var<'a>>],
    ) -> EvalResult<Option<Var<'a>>> {
        let args: Args<'a> = args.iter().cloned().collect();
        self.exec.call_value(func, this, args)
    }

    /// Throw a script error object `{ name, message }`.
    pub fn throw_error(&mut self, name: &str, message: &str) -> EvalResult<NativeValue<'a>> {
        self.exec.throw_error(name, message)?;
        Ok(NativeValue::Undefined)
    }

    /// Whether a script exception is pending, for example one raised by a
    /// callback passed to [`NativeCall::call`].
    pub fn threw(&self) -> bool {
        self.exec.is_throwing()
    }

    /// Write a line of program output to the host sink.
    pub fn print_line(&self, text: &str) {
        self.exec.rt.sink().print_line(text);
    }
}
