//! Ember command-line driver.
//!
//! Runs a script against a runtime wired to the standard streams, with a
//! global `print` function.

use ember_arena::{ArgSpec, ArgType, MAX_CAPACITY};
use ember_eval::{EvalResult, NativeCall, NativeValue, Runtime, GLOBAL_OWNER};

/// Limits and reporting chosen on the command line.
#[derive(Default)]
struct RunOptions {
    arena: Option<usize>,
    max_depth: Option<usize>,
    max_iterations: Option<usize>,
    time_budget: Option<u64>,
    stats: bool,
}

const PRINT: ArgSpec = ArgSpec::returns(ArgType::Void).param(ArgType::ArgArray);

/// `print(...values)`: display text of each value, space separated.
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

fn main() {
    init_tracing();
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    let command = &args[1];

    match command.as_str() {
        "run" => {
            let (path, options) = match parse_run_args(&args[2..]) {
                Ok(parsed) => parsed,
                Err(message) => {
                    eprintln!("error: {message}");
                    eprintln!("Usage: ember run <file.js> [options]");
                    std::process::exit(1);
                }
            };
            if !run_file(&path, &options) {
                std::process::exit(1);
            }
        }
        "help" | "--help" | "-h" => {
            print_usage();
        }
        "version" | "--version" | "-v" => {
            println!("Ember {}", env!("CARGO_PKG_VERSION"));
        }
        _ => {
            // If it looks like a script, run it
            if std::path::Path::new(command)
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("js"))
            {
                if !run_file(command, &RunOptions::default()) {
                    std::process::exit(1);
                }
            } else {
                eprintln!("Unknown command: {command}");
                eprintln!();
                print_usage();
                std::process::exit(1);
            }
        }
    }
}

/// Install a hierarchical subscriber when `EMBER_LOG` (or `RUST_LOG`) is set.
fn init_tracing() {
    use tracing_subscriber::{prelude::*, EnvFilter};

    let Some(directives) = ["EMBER_LOG", "RUST_LOG"]
        .into_iter()
        .find_map(|var| std::env::var(var).ok())
    else {
        return;
    };
    tracing_subscriber::registry()
        .with(EnvFilter::new(directives))
        .with(
            tracing_tree::HierarchicalLayer::new(2)
                .with_writer(std::io::stderr)
                .with_targets(true),
        )
        .init();
}

/// Parse `<file> [options]`. Options take their value as the next argument
/// or after `=`.
fn parse_run_args(args: &[String]) -> Result<(String, RunOptions), String> {
    let mut options = RunOptions::default();
    let mut path = None;
    let mut i = 0;
    while i < args.len() {
        let arg = args[i].as_str();
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => (flag, Some(value)),
            _ => (arg, None),
        };
        match flag {
            "--stats" => options.stats = true,
            "--arena" | "--max-depth" | "--max-iterations" | "--time-budget" => {
                let value = option_value(args, &mut i, inline, flag)?;
                match flag {
                    "--arena" => {
                        let records: usize = parse_number(flag, value)?;
                        if records == 0 || records > MAX_CAPACITY {
                            return Err(format!("--arena must be between 1 and {MAX_CAPACITY}"));
                        }
                        options.arena = Some(records);
                    }
                    "--max-depth" => options.max_depth = Some(parse_number(flag, value)?),
                    "--max-iterations" => options.max_iterations = Some(parse_number(flag, value)?),
                    _ => options.time_budget = Some(parse_number(flag, value)?),
                }
            }
            _ if flag.starts_with('-') => return Err(format!("unknown option '{arg}'")),
            _ if path.is_none() => path = Some(arg.to_owned()),
            _ => return Err(format!("unexpected argument '{arg}'")),
        }
        i += 1;
    }
    let path = path.ok_or_else(|| "missing file path".to_owned())?;
    Ok((path, options))
}

/// Value of the option at `args[*i]`: the inline `=` part, or the next
/// argument.
fn option_value<'a>(
    args: &'a [String],
    i: &mut usize,
    inline: Option<&'a str>,
    flag: &str,
) -> Result<&'a str, String> {
    if let Some(value) = inline {
        return Ok(value);
    }
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .ok_or_else(|| format!("{flag} needs a value"))
}

fn parse_number<T: std::str::FromStr>(flag: &str, text: &str) -> Result<T, String> {
    text.parse()
        .map_err(|_| format!("{flag} expects a number, got '{text}'"))
}

/// Run a script file. Errors are reported by the runtime's sink as they
/// happen; returns whether the run succeeded.
fn run_file(path: &str, options: &RunOptions) -> bool {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("error: cannot read '{path}': {e}");
            return false;
        }
    };

    let mut builder = Runtime::builder().native(GLOBAL_OWNER, "print", PRINT, print);
    if let Some(records) = options.arena {
        builder = builder.arena_capacity(records);
    }
    if let Some(depth) = options.max_depth {
        builder = builder.max_call_depth(depth);
    }
    if let Some(iterations) = options.max_iterations {
        builder = builder.max_loop_iterations(iterations);
    }
    if options.time_budget.is_some() {
        builder = builder.time_budget_ms(options.time_budget);
    }
    let rt = match builder.build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: {e}");
            return false;
        }
    };

    tracing::debug!(path, bytes = source.len(), "running script");
    let ok = rt.eval_named(path, &source).is_ok();
    if options.stats {
        eprintln!("arena: {}", rt.stats());
    }
    ok
}

fn print_usage() {
    println!("Ember - a small embeddable script runtime");
    println!();
    println!("Usage: ember <command> [options]");
    println!();
    println!("Commands:");
    println!("  run <file.js>        Run a script");
    println!("  help                 Show this help message");
    println!("  version              Show version information");
    println!();
    println!("Run options:");
    println!("  --arena <records>       Value records in the arena (default: 4096)");
    println!("  --max-depth <n>         Nested calls allowed (default: 64)");
    println!("  --max-iterations <n>    Iterations per loop, 0 for no limit (default: 8192)");
    println!("  --time-budget <ms>      Stop the script after this long");
    println!("  --stats                 Print arena usage when the script ends");
    println!();
    println!("Logging:");
    println!("  EMBER_LOG=debug ember run main.js");
    println!();
    println!("Examples:");
    println!("  ember run main.js");
    println!("  ember run main.js --arena 1024 --stats");
    println!("  ember main.js");
}

#[cfg(test)]
mod tests;
