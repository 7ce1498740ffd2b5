//! The embedding surface: natives, output, limits and interruption.

#![allow(clippy::unwrap_used, reason = "tests")]

use std::thread;
use std::time::Duration;

use ember_arena::{ArgSpec, ArgType, MAX_CAPACITY};
use ember_eval::{
    buffer_sink, silent_sink, EvalError, EvalResult, HostClock, ManualClock, NativeCall,
    NativeValue, Runtime, RuntimeBuilder, GLOBAL_OWNER,
};
use pretty_assertions::assert_eq;

fn print<'a>(call: &mut NativeCall<'a, '_>) -> EvalResult<NativeValue<'a>> {
    let arena = call.arena();
    let mut line = String::new();
    if let Some(rest) = call.arg(0).and_then(NativeValue::as_var) {
        for i in 0..arena.array_len(rest) {
            if i > 0 {
                line.push(' ');
            }
            line.push_str(&arena.to_display_string(arena.array_get(rest, i).as_ref()));
        }
    }
    call.print_line(&line);
    Ok(NativeValue::Undefined)
}

fn add<'a>(call: &mut NativeCall<'a, '_>) -> EvalResult<NativeValue<'a>> {
    Ok(NativeValue::Int(call.int(0) + call.int(1)))
}

fn half<'a>(call: &mut NativeCall<'a, '_>) -> EvalResult<NativeValue<'a>> {
    Ok(NativeValue::Float(call.float(0) / 2.0))
}

fn not<'a>(call: &mut NativeCall<'a, '_>) -> EvalResult<NativeValue<'a>> {
    Ok(NativeValue::Bool(!call.bool(0)))
}

fn pin<'a>(call: &mut NativeCall<'a, '_>) -> EvalResult<NativeValue<'a>> {
    Ok(NativeValue::Int(call.int(0)))
}

fn checked_pin<'a>(call: &mut NativeCall<'a, '_>) -> EvalResult<NativeValue<'a>> {
    let pin = call.int(0);
    if pin < 0 {
        return call.throw_error("RangeError", &format!("no pin {pin}"));
    }
    Ok(NativeValue::Pin(pin))
}

fn apply<'a>(call: &mut NativeCall<'a, '_>) -> EvalResult<NativeValue<'a>> {
    let func = call.var(0)?;
    let arg = call.var(1)?;
    let result = call.call(func, None, &[arg])?;
    Ok(NativeValue::from_var(result))
}

fn shout<'a>(call: &mut NativeCall<'a, '_>) -> EvalResult<NativeValue<'a>> {
    let text = call
        .this()
        .map(|s| call.arena().string_to_string(s))
        .unwrap_or_default();
    let loud = call.arena().new_string(&format!("{}!", text.to_uppercase()))?;
    Ok(NativeValue::Var(loud))
}

fn max<'a>(call: &mut NativeCall<'a, '_>) -> EvalResult<NativeValue<'a>> {
    Ok(NativeValue::Float(call.float(0).max(call.float(1))))
}

fn host() -> RuntimeBuilder {
    Runtime::builder()
        .sink(silent_sink())
        .native(
            GLOBAL_OWNER,
            "add",
            ArgSpec::returns(ArgType::Int32)
                .param(ArgType::Int32)
                .param(ArgType::Int32),
            add,
        )
        .native(
            GLOBAL_OWNER,
            "half",
            ArgSpec::returns(ArgType::Float).param(ArgType::Float),
            half,
        )
        .native(
            GLOBAL_OWNER,
            "not",
            ArgSpec::returns(ArgType::Bool).param(ArgType::Bool),
            not,
        )
        .native(
            GLOBAL_OWNER,
            "pin",
            ArgSpec::returns(ArgType::Int32).param(ArgType::Pin),
            pin,
        )
        .native(
            GLOBAL_OWNER,
            "checkedPin",
            ArgSpec::returns(ArgType::Pin).param(ArgType::Int32),
            checked_pin,
        )
        .native(
            GLOBAL_OWNER,
            "apply",
            ArgSpec::returns(ArgType::Var)
                .param(ArgType::Var)
                .param(ArgType::Var),
            apply,
        )
        .native(
            "String",
            "shout",
            ArgSpec::returns(ArgType::Var).with_this(),
            shout,
        )
        .native(
            "Math",
            "max",
            ArgSpec::returns(ArgType::Float)
                .param(ArgType::Float)
                .param(ArgType::Float),
            max,
        )
}

fn eval_text(rt: &Runtime, src: &str) -> String {
    let value = rt.eval(src).unwrap();
    rt.arena().to_display_string(value.as_ref())
}

#[test]
fn arguments_are_converted_to_declared_types() {
    let rt = host().build().unwrap();
    assert_eq!(eval_text(&rt, "add(2.7, '3')"), "5");
    assert_eq!(eval_text(&rt, "add(1)"), "1");
    assert_eq!(eval_text(&rt, "half(3)"), "1.5");
    assert_eq!(eval_text(&rt, "not(0) + ',' + not('x')"), "true,false");
    assert_eq!(eval_text(&rt, "pin()"), "-1");
    assert_eq!(eval_text(&rt, "pin(13)"), "13");
    assert_eq!(eval_text(&rt, "typeof add"), "function");
}

#[test]
fn natives_can_throw_script_errors() {
    let rt = host().build().unwrap();
    let src = "var r; try { checkedPin(-2); r = 'no'; } catch (e) { r = e.name + ': ' + e.message; } r";
    assert_eq!(eval_text(&rt, src), "RangeError: no pin -2");
    assert_eq!(eval_text(&rt, "checkedPin(4)"), "4");
}

#[test]
fn natives_call_back_into_scripts() {
    let rt = host().build().unwrap();
    assert_eq!(eval_text(&rt, "apply(function (x) { return x * 3; }, 4)"), "12");
    assert_eq!(eval_text(&rt, "apply(x => x + '!', 'hey')"), "hey!");
}

#[test]
fn class_methods_and_namespaces() {
    let rt = host().build().unwrap();
    assert_eq!(eval_text(&rt, "'hi'.shout()"), "HI!");
    assert_eq!(eval_text(&rt, "Math.max(1, 4)"), "4");
    assert_eq!(eval_text(&rt, "var m = Math.max; m(7, 2)"), "7");
}

#[test]
fn scripts_shadow_natives() {
    let rt = host().build().unwrap();
    assert_eq!(eval_text(&rt, "function add(a, b) { return 'mine'; } add(1, 2)"), "mine");
}

#[test]
fn print_goes_to_the_sink() {
    let sink = buffer_sink();
    let rt = Runtime::builder()
        .sink(sink.clone())
        .native(
            GLOBAL_OWNER,
            "print",
            ArgSpec::returns(ArgType::Void).param(ArgType::ArgArray),
            print,
        )
        .build()
        .unwrap();
    rt.eval("print('sum', 1 + 2); print(); print([1, 2], { a: 1 }, null);")
        .unwrap();
    assert_eq!(sink.output(), "sum 3\n\n1,2 [object Object] null\n");
    assert_eq!(sink.diagnostics(), "");
}

#[test]
fn runaway_loop_hits_the_iteration_limit() {
    let rt = host().max_loop_iterations(100).build().unwrap();
    rt.eval("var n = 0; for (var i = 0; i < 50; i++) n++;").unwrap();
    let err = rt.eval("while (true) n++;").unwrap_err();
    assert!(matches!(err, EvalError::LoopLimit { limit: 100 }), "{err:?}");
}

#[test]
fn deep_recursion_is_stopped() {
    let rt = host().max_call_depth(20).build().unwrap();
    let err = rt
        .eval("function down(n) { return down(n + 1); } down(0)")
        .unwrap_err();
    assert!(matches!(err, EvalError::StackExhausted { .. }), "{err:?}");

    let value = rt.eval("function fine(n) { return n ? fine(n - 1) : 'ok'; } fine(10)");
    assert_eq!(rt.arena().to_display_string(value.unwrap().as_ref()), "ok");
}

/// Run `f` on a thread with a small, known stack.
fn on_small_stack<T: Send + 'static>(f: impl FnOnce() -> T + Send + 'static) -> T {
    thread::Builder::new()
        .stack_size(512 * 1024)
        .spawn(f)
        .unwrap()
        .join()
        .unwrap()
}

#[test]
fn deeply_nested_operators_are_stopped() {
    let sources = [
        format!("var x = 1; {}x", "++".repeat(20_000)),
        format!("var x; {}1", "x=".repeat(20_000)),
        format!("var y = {}1;", "typeof ".repeat(20_000)),
        format!("{}0", "void ".repeat(20_000)),
        format!("var o = {{}}; {}o.k", "delete ".repeat(20_000)),
    ];
    let (stopped, after) = on_small_stack(move || {
        let rt = host().arena_capacity(MAX_CAPACITY).build().unwrap();
        let stopped: Vec<bool> = sources
            .iter()
            .map(|src| matches!(rt.eval(src), Err(EvalError::StackExhausted { .. })))
            .collect();
        (stopped, eval_text(&rt, "1 + 1"))
    });
    assert_eq!(stopped, vec![true; 5]);
    assert_eq!(after, "2");
}

#[test]
fn pending_interrupt_stops_the_next_loop() {
    let rt = host().max_loop_iterations(0).build().unwrap();
    rt.interrupt_handle().interrupt();
    assert_eq!(eval_text(&rt, "1 + 1"), "2");
    let err = rt.eval("while (true) {}").unwrap_err();
    assert!(matches!(err, EvalError::Interrupted), "{err:?}");
    assert!(!rt.interrupt_handle().is_set());
    assert_eq!(eval_text(&rt, "var k = 0; while (k < 3) k++; k"), "3");
}

#[test]
fn interrupt_from_another_thread() {
    let rt = host().max_loop_iterations(0).build().unwrap();
    let handle = rt.interrupt_handle().clone();
    let watchdog = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        handle.interrupt();
    });
    let err = rt.eval("var spins = 0; while (true) { spins++; }").unwrap_err();
    watchdog.join().unwrap();
    assert!(matches!(err, EvalError::Interrupted), "{err:?}");
    assert!(rt.get("spins").is_some());
}

#[test]
fn time_budget_uses_the_host_clock() {
    let clock = ManualClock::new();
    let rt = host()
        .clock(HostClock::Manual(clock.clone()))
        .time_budget_ms(Some(50))
        .max_loop_iterations(0)
        .build()
        .unwrap();
    assert_eq!(eval_text(&rt, "var i = 0; while (i < 1000) i++; i"), "1000");

    let ticker = clock.clone();
    let advance = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        ticker.advance(100);
    });
    let err = rt.eval("while (true) {}").unwrap_err();
    advance.join().unwrap();
    assert!(matches!(err, EvalError::Interrupted), "{err:?}");

    // Budgets are measured from the start of each evaluation.
    assert_eq!(eval_text(&rt, "var j = 0; while (j < 10) j++; j"), "10");
}

#[test]
fn core_methods_can_be_left_out() {
    let rt = Runtime::builder()
        .sink(silent_sink())
        .core_methods(false)
        .build()
        .unwrap();
    assert!(rt.natives().is_empty());
    match rt.eval("[].push(1)") {
        Err(EvalError::Uncaught { message, .. }) => {
            assert_eq!(message, "TypeError: push is not a function");
        }
        other => panic!("{other:?}"),
    };
}
