//! jitlab CLI
//!
//! Builds, verifies and JIT-executes the example programs.

use jitlab::commands::{
    add, add_chained, fallible, fallible_args, sum, CommandError, JitOptions,
};
use jitlab::logging::init_logging;
use jitlab_llvm::SymbolScope;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    let command = &args[1];
    let mut out = std::io::stdout().lock();

    let result = match command.as_str() {
        "add" | "add-chained" | "sum" => {
            let defaults = if command == "add-chained" {
                JitOptions::default().with_scope(SymbolScope::Process)
            } else {
                JitOptions::default()
            };
            match defaults.parse(&args[2..]) {
                Ok(options) => {
                    init_logging(options.verbose);
                    match command.as_str() {
                        "add" => add(&options, &mut out),
                        "add-chained" => add_chained(&options, &mut out),
                        _ => sum(&options, &mut out),
                    }
                }
                Err(e) => Err(e),
            }
        }
        "fallible" => match fallible_args(&args[2..]) {
            Ok((input, verbose)) => {
                init_logging(verbose);
                fallible(input, &mut out)
            }
            Err(e) => Err(e),
        },
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        "version" | "--version" => {
            println!("jitlab {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        _ => {
            eprintln!("Unknown command: {command}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        if matches!(e, CommandError::Usage(_)) {
            eprintln!("Run `jitlab help` for usage.");
        }
        std::process::exit(1);
    }
}

fn print_usage() {
    println!("jitlab - build, verify and JIT-execute small LLVM functions");
    println!();
    println!("Usage: jitlab <command> [options]");
    println!();
    println!("Commands:");
    println!("  add                  Build a + b, print f(1, 2) and f(2, 2)");
    println!("  add-chained          Same function, process symbol scope, print f(10, 11)");
    println!("  sum [VALUES...]      Sum doubles through a variadic function");
    println!("                       (default: 19.1 3.1 1.4 10.1 11.1)");
    println!("  fallible [-v] <INPUT> Fallible construction demo (0 fails)");
    println!("  help                 Show this help message");
    println!("  version              Show version information");
    println!();
    println!("Options (add, add-chained, sum):");
    println!("  --opt=<level>        MCJIT optimization: 0, 1, 2, 3");
    println!("  --scope=<scope>      Symbol scope: module, process");
    println!("  --no-ir              Do not print the verified IR");
    println!("  --debug-ir           Dump IR to stderr before JIT compilation");
    println!("  --echo               (sum) Print every value through a host callback");
    println!("  -v, --verbose        Hierarchical debug logging on stderr");
    println!();
    println!("Environment:");
    println!("  JITLAB_OPT_LEVEL, JITLAB_SYMBOLS, JITLAB_DEBUG_IR, RUST_LOG");
}
