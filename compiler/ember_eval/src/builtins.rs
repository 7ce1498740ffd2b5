//! Core methods every runtime gets unless the host opts out: `bind` and
//! `call` on functions, `push` and `pop` on arrays.

use ember_arena::{ArgSpec, ArgType, Var};

use crate::errors::EvalResult;
use crate::exec::{hidden, Args, TYPE_ERROR};
use crate::native::{NativeCall, NativeFn, NativeRegistry, NativeValue};

const THIS_AND_REST: ArgSpec = ArgSpec::returns(ArgType::Var)
    .param(ArgType::Var)
    .param(ArgType::ArgArray)
    .with_this();

/// Register the core methods. Entries the host already registered under the
/// same names are kept.
pub fn register_core_methods(registry: &mut NativeRegistry) {
    let methods: [(&str, &str, ArgSpec, NativeFn); 4] = [
        ("Function", "bind", THIS_AND_REST, function_bind),
        ("Function", "call", THIS_AND_REST, function_call),
        (
            "Array",
            "push",
            ArgSpec::returns(ArgType::Int32)
                .param(ArgType::ArgArray)
                .with_this(),
            array_push,
        ),
        (
            "Array",
            "pop",
            ArgSpec::returns(ArgType::Var).with_this(),
            array_pop,
        ),
    ];
    for (owner, name, spec, func) in methods {
        if registry.lookup(owner, name).is_none() {
            registry.register(owner, name, spec, func);
        }
    }
}

/// Elements of the rest-arguments array in slot `index`.
fn rest_args<'a>(call: &NativeCall<'a, '_>, index: usize) -> Args<'a> {
    let arena = call.arena();
    match call.arg(index).and_then(NativeValue::as_var) {
        Some(rest) => (0..arena.array_len(rest))
            .map(|i| arena.array_get(rest, i))
            .collect(),
        None => Args::new(),
    }
}

fn function_this<'a>(call: &NativeCall<'a, '_>) -> Option<Var<'a>> {
    call.this().filter(|f| f.kind().is_function()).cloned()
}

/// `f.bind(this, ...args)`: a copy of `f` with its receiver and leading
/// arguments fixed. Binding a bound function keeps the first receiver and
/// appends arguments.
fn function_bind<'a>(call: &mut NativeCall<'a, '_>) -> EvalResult<NativeValue<'a>> {
    let Some(func) = function_this(call) else {
        return call.throw_error(TYPE_ERROR, "bind called on a non-function");
    };
    let arena = call.arena();
    let bound = arena.copy(&func, false)?;
    if arena.find_hidden(&bound, hidden::THIS).is_none() {
        arena.set_hidden(&bound, hidden::THIS, call.var(0)?.as_ref())?;
    }
    let args = arena.new_array()?;
    if let Some(earlier) = arena.get_hidden(&func, hidden::ARGS) {
        for i in 0..arena.array_len(&earlier) {
            arena.array_push(&args, arena.array_get(&earlier, i).as_ref())?;
        }
    }
    for value in rest_args(call, 1) {
        arena.array_push(&args, value.as_ref())?;
    }
    arena.set_hidden(&bound, hidden::ARGS, Some(&args))?;
    Ok(NativeValue::Var(bound))
}

/// `f.call(this, ...args)`
fn function_call<'a>(call: &mut NativeCall<'a, '_>) -> EvalResult<NativeValue<'a>> {
    let Some(func) = function_this(call) else {
        return call.throw_error(TYPE_ERROR, "call called on a non-function");
    };
    let this = call.var(0)?;
    let args = rest_args(call, 1);
    let result = call.call(Some(func), this, &args)?;
    Ok(NativeValue::from_var(result))
}

fn array_this<'a>(call: &NativeCall<'a, '_>) -> Option<Var<'a>> {
    call.this()
        .filter(|a| a.kind() == ember_arena::VarKind::Array)
        .cloned()
}

/// `a.push(...values)`; returns the new length.
fn array_push<'a>(call: &mut NativeCall<'a, '_>) -> EvalResult<NativeValue<'a>> {
    let Some(array) = array_this(call) else {
        return call.throw_error(TYPE_ERROR, "push called on a non-array");
    };
    let arena = call.arena();
    let mut len = arena.array_len(&array);
    for value in rest_args(call, 0) {
        len = arena.array_push(&array, value.as_ref())?;
    }
    Ok(NativeValue::Int(len))
}

/// `a.pop()`; returns the removed last element.
fn array_pop<'a>(call: &mut NativeCall<'a, '_>) -> EvalResult<NativeValue<'a>> {
    let Some(array) = array_this(call) else {
        return call.throw_error(TYPE_ERROR, "pop called on a non-array");
    };
    let arena = call.arena();
    let len = arena.array_len(&array);
    if len == 0 {
        return Ok(NativeValue::Undefined);
    }
    let last = arena.array_get(&array, len - 1);
    arena.set_array_len(&array, len - 1);
    Ok(NativeValue::from_var(last))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::register_core_methods;
    use crate::native::NativeRegistry;

    #[test]
    fn registers_four_methods() {
        let mut registry = NativeRegistry::new();
        register_core_methods(&mut registry);
        assert_eq!(registry.len(), 4);
        assert!(registry.lookup("Function", "bind").is_some());
        assert!(registry.lookup("Array", "pop").is_some());
        assert!(registry.has_owner("Array"));
    }

    #[test]
    fn host_entries_win() {
        let mut registry = NativeRegistry::new();
        register_core_methods(&mut registry);
        let before = registry.lookup("Array", "push");
        register_core_methods(&mut registry);
        assert_eq!(registry.lookup("Array", "push"), before);
        assert_eq!(registry.len(), 4);
    }
}
