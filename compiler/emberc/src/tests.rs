use super::{parse_run_args, RunOptions};

fn parse(args: &[&str]) -> Result<(String, RunOptions), String> {
    let args: Vec<String> = args.iter().map(|&a| a.to_owned()).collect();
    parse_run_args(&args)
}

#[test]
fn options_take_separate_or_inline_values() {
    let (path, options) = parse(&["main.js", "--arena", "512", "--max-depth=8", "--stats"])
        .unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(path, "main.js");
    assert_eq!(options.arena, Some(512));
    assert_eq!(options.max_depth, Some(8));
    assert_eq!(options.max_iterations, None);
    assert!(options.stats);
}

#[test]
fn options_may_precede_the_path() {
    let (path, options) = parse(&["--time-budget", "250", "--max-iterations=0", "loop.js"])
        .unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(path, "loop.js");
    assert_eq!(options.time_budget, Some(250));
    assert_eq!(options.max_iterations, Some(0));
}

#[test]
fn bad_arguments_are_rejected() {
    let err = |args: &[&str]| parse(args).err().unwrap_or_default();
    assert_eq!(err(&[]), "missing file path");
    assert_eq!(err(&["a.js", "--arena"]), "--arena needs a value");
    assert_eq!(
        err(&["a.js", "--arena", "lots"]),
        "--arena expects a number, got 'lots'"
    );
    assert_eq!(err(&["a.js", "--arena=0"]), "--arena must be between 1 and 65535");
    assert_eq!(err(&["a.js", "--fast"]), "unknown option '--fast'");
    assert_eq!(err(&["a.js", "b.js"]), "unexpected argument 'b.js'");
}
