//! nibtool - inspect and compare NIBArchive files.

use std::env;
use std::io::{self, Write};
use std::process::ExitCode;

use nibarchive::dump::{self, DumpOptions};
use nibarchive::nib::NibFile;
use nibarchive::{compare, lift, Result};
use tracing_subscriber::{prelude::*, EnvFilter};

/// Exit status when a comparison found differences.
const EXIT_DIFFERENT: u8 = 1;
/// Exit status for usage and archive errors.
const EXIT_ERROR: u8 = 2;

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();

    // Parse global flags
    let mut level = "warn";
    let mut filtered_args: Vec<&str> = Vec::new();
    for arg in &args[1..] {
        match arg.as_str() {
            "-v" | "--verbose" => level = "debug",
            "-vv" | "--trace" => level = "trace",
            "-q" | "--quiet" => level = "off",
            _ => filtered_args.push(arg),
        }
    }
    init_logging(level);

    if filtered_args.is_empty() {
        print_help();
        return ExitCode::SUCCESS;
    }

    let result = match filtered_args[0] {
        "dump" | "d" => match filtered_args.get(1) {
            Some(path) => cmd_dump(path, &filtered_args[2..]),
            None => usage("dump <file> [-e] [-t] [-s] [--json]"),
        },
        "info" | "i" => match filtered_args.get(1) {
            Some(path) => cmd_info(path),
            None => usage("info <file>"),
        },
        "compare" | "c" => match (filtered_args.get(1), filtered_args.get(2)) {
            (Some(original), Some(test)) => cmd_compare(original, test),
            _ => usage("compare <original> <test>"),
        },
        "help" | "h" | "-h" | "--help" => {
            print_help();
            Ok(ExitCode::SUCCESS)
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_help();
            Ok(ExitCode::from(EXIT_ERROR))
        }
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Log to stderr; `RUST_LOG` wins over the verbosity flags.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn usage(synopsis: &str) -> Result<ExitCode> {
    eprintln!("Error: missing arguments");
    eprintln!("Usage: nibtool {synopsis}");
    Ok(ExitCode::from(EXIT_ERROR))
}

fn print_help() {
    println!("nibtool - NIBArchive toolkit");
    println!();
    println!("USAGE:");
    println!("    nibtool [OPTIONS] <COMMAND> [ARGS]");
    println!();
    println!("COMMANDS:");
    println!("    d, dump    <file> [-e] [-t] [-s] [--json]   List decoded objects");
    println!("    i, info    <file>                           Show header and section table");
    println!("    c, compare <original> <test>                Report semantic differences");
    println!("    h, help                                     Show this help");
    println!();
    println!("DUMP FLAGS:");
    println!("    -e, --encoding   Show value type tags");
    println!("    -t, --tree       Expand references from the root object");
    println!("    -s, --sort       Sort values by key");
    println!("    -j, --json       Print decoded sections as JSON");
    println!();
    println!("OPTIONS:");
    println!("    -v, --verbose    Show debug output");
    println!("    -vv, --trace     Show trace output (very verbose)");
    println!("    -q, --quiet      Suppress all log output");
    println!();
    println!("NOTES:");
    println!("    - compare exits with 1 when any difference was found, 0 otherwise");
    println!("    - RUST_LOG overrides the verbosity flags");
}

fn cmd_dump(path: &str, flags: &[&str]) -> Result<ExitCode> {
    let file = NibFile::open(path)?;
    let sections = file.sections()?;
    let has = |short: &str, long: &str| flags.iter().any(|&f| f == short || f == long);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if has("-j", "--json") {
        dump::write_json(&mut out, &sections)?;
        return Ok(ExitCode::SUCCESS);
    }

    let opts = DumpOptions {
        show_encoding: has("-e", "--encoding"),
        sort_keys: has("-s", "--sort"),
    };
    writeln!(out, "Prefix: NIBArchive")?;
    if has("-t", "--tree") {
        dump::write_tree(&mut out, &sections, opts)?;
    } else {
        dump::write_flat(&mut out, &sections, opts)?;
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_info(path: &str) -> Result<ExitCode> {
    let file = NibFile::open(path)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "Archive: {path}")?;
    dump::write_info(&mut out, file.bytes())?;
    Ok(ExitCode::SUCCESS)
}

fn cmd_compare(original: &str, test: &str) -> Result<ExitCode> {
    let left = lift(&NibFile::open(original)?.sections()?)?;
    let right = lift(&NibFile::open(test)?.sections()?)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut found = false;
    for issue in compare(&left, &right) {
        found = true;
        writeln!(out, "{issue}")?;
    }
    Ok(if found {
        ExitCode::from(EXIT_DIFFERENT)
    } else {
        ExitCode::SUCCESS
    })
}
