//! il2c CLI: translate assembled CIL method bodies into C.
//!
//! Exit codes:
//! - 0: Success
//! - 1: Usage, input, decode or assembly error
//! - 2: Translation failure

mod commands;

use std::process;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let result = match args[1].as_str() {
        "translate" => commands::translate(&args[2..]),
        "listing" => commands::listing(&args[2..]),
        "disassemble" => commands::disassemble(&args[2..]),
        "--help" | "-h" | "help" => {
            print_usage();
            process::exit(0);
        }
        other => {
            eprintln!("error: unknown command '{other}'");
            eprintln!();
            print_usage();
            process::exit(1);
        }
    };

    if let Err(code) = result {
        process::exit(code);
    }
}

fn print_usage() {
    eprintln!("Usage: il2c <command> [args]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  translate <input.il> [options]   Translate every method to C");
    eprintln!("  listing <input.il>               Print the canonical assembly listing");
    eprintln!("  disassemble <body.bin>           Disassemble a raw method body");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --debug none|comment|full   Echo instructions as C comments");
    eprintln!("  --jobs N                    Worker threads for module translation");
    eprintln!("  --method NAME               Translate a single method");
    eprintln!("  --verbose                   Log translation progress to stderr");
}
