//! End-to-end programs run through a fresh runtime.

#![allow(clippy::unwrap_used, reason = "tests")]

use ember_eval::{buffer_sink, silent_sink, EvalError, Runtime};
use pretty_assertions::assert_eq;

fn runtime() -> Runtime {
    Runtime::builder().sink(silent_sink()).build().unwrap()
}

fn global_int(rt: &Runtime, name: &str) -> Option<i32> {
    rt.get(name).map(|v| rt.arena().as_int(&v))
}

fn global_text(rt: &Runtime, name: &str) -> String {
    rt.arena().to_display_string(rt.get(name).as_ref())
}

#[test]
fn replayed_loop_sums() {
    let rt = runtime();
    rt.eval("var sum = 0; for (var i = 0; i < 5; i++) sum = sum + i;")
        .unwrap();
    assert_eq!(global_int(&rt, "sum"), Some(10));
    assert_eq!(global_int(&rt, "i"), Some(5));
}

#[test]
fn caught_exception_clears_state() {
    let rt = runtime();
    rt.eval("var result; try { throw 1; } catch (e) { result = e + 1; }")
        .unwrap();
    assert_eq!(global_int(&rt, "result"), Some(2));
    assert!(rt.take_exception().is_none());
}

#[test]
fn uncaught_exception_leaves_globals_usable() {
    let rt = runtime();
    rt.eval("var before = 1;").unwrap();
    match rt.eval("before = 2; throw 'x'; before = 3;") {
        Err(EvalError::Uncaught { message, .. }) => assert_eq!(message, "x"),
        other => panic!("{other:?}"),
    }
    let thrown = rt.take_exception().unwrap();
    assert_eq!(rt.arena().string_to_string(&thrown), "x");
    drop(thrown);

    assert_eq!(global_int(&rt, "before"), Some(2));
    rt.eval("var after = before * 10;").unwrap();
    assert_eq!(global_int(&rt, "after"), Some(20));
}

#[test]
fn closure_outlives_its_activation() {
    let rt = runtime();
    rt.eval("function make(n) { return function () { return n; }; } var f = make(7);")
        .unwrap();
    rt.eval("var junk = []; for (var i = 0; i < 20; i++) junk[i] = { i: i };")
        .unwrap();
    let value = rt.eval("f()").unwrap();
    assert_eq!(value.map(|v| rt.arena().as_int(&v)), Some(7));
}

#[test]
fn counters_keep_separate_state() {
    let rt = runtime();
    let src = "
        function counter(start) {
            var n = start;
            return { next: function () { n = n + 1; return n; } };
        }
        var a = counter(0), b = counter(100);
        a.next(); a.next(); b.next();
        var text = a.next() + ',' + b.next();
    ";
    rt.eval(src).unwrap();
    assert_eq!(global_text(&rt, "text"), "3,102");
}

#[test]
fn prototypes_are_shared_by_instances() {
    let rt = runtime();
    let src = "
        function Point(x, y) { this.x = x; this.y = y; }
        Point.prototype.sum = function () { return this.x + this.y; };
        var p = new Point(1, 2), q = new Point(10, 20);
        var total = p.sum() + q.sum();
        var isPoint = p instanceof Point;
        var inherited = 'sum' in p;
        var missing = 'z' in p;
    ";
    rt.eval(src).unwrap();
    assert_eq!(global_int(&rt, "total"), Some(33));
    assert_eq!(global_text(&rt, "isPoint"), "true");
    assert_eq!(global_text(&rt, "inherited"), "true");
    assert_eq!(global_text(&rt, "missing"), "false");
}

#[test]
fn arrays_grow_and_shrink() {
    let rt = runtime();
    let src = "
        var stack = [];
        for (var i = 0; i < 4; i++) stack.push(i * i);
        var top = stack.pop();
        var joined = '' + stack;
    ";
    rt.eval(src).unwrap();
    assert_eq!(global_int(&rt, "top"), Some(9));
    assert_eq!(global_text(&rt, "joined"), "0,1,4");
}

#[test]
fn iteration_forms_agree() {
    let rt = runtime();
    let src = "
        var data = [3, 1, 4, 1, 5];
        var a = 0, b = 0, c = 0, d = 0;
        for (var i = 0; i < data.length; i++) a += data[i];
        for (var k in data) b += data[k];
        for (var v of data) c += v;
        var j = 0;
        while (j < data.length) { d += data[j]; j++; }
    ";
    rt.eval(src).unwrap();
    for name in ["a", "b", "c", "d"] {
        assert_eq!(global_int(&rt, name), Some(14), "{name}");
    }
}

#[test]
fn switch_with_shared_cases() {
    let rt = runtime();
    let src = "
        function kind(c) {
            switch (c) {
                case 'a': case 'e': case 'i': case 'o': case 'u':
                    return 'vowel';
                case ' ':
                    return 'space';
                default:
                    return 'consonant';
            }
        }
        var out = [];
        for (var c of 'hi o') out.push(kind(c));
        var text = out + '';
    ";
    rt.eval(src).unwrap();
    assert_eq!(global_text(&rt, "text"), "consonant,vowel,space,vowel");
}

#[test]
fn syntax_errors_are_all_reported() {
    let sink = buffer_sink();
    let rt = Runtime::builder().sink(sink.clone()).build().unwrap();
    let err = rt.eval_named("bad.js", "var a = (1;\nvar b = 2;\nfunction () {}\n");
    assert!(matches!(err, Err(EvalError::Syntax { line: 1, .. })), "{err:?}");
    drop(err);

    let diagnostics = sink.diagnostics();
    assert_eq!(diagnostics.lines().count(), 2, "{diagnostics}");
    assert!(diagnostics.starts_with("bad.js:1:"), "{diagnostics}");
    assert!(rt.get("b").is_none());

    rt.eval("var fine = 1;").unwrap();
    assert_eq!(global_int(&rt, "fine"), Some(1));
}

#[test]
fn recursion_with_strings() {
    let rt = runtime();
    let src = "
        function rev(s, i) { return i < 0 ? '' : s[i] + rev(s, i - 1); }
        var word = 'a longer string than one chunk';
        var backwards = rev(word, word.length - 1);
    ";
    rt.eval(src).unwrap();
    assert_eq!(global_text(&rt, "backwards"), "knuhc eno naht gnirts regnol a");
}
