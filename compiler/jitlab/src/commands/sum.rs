//! `jitlab sum`: the variadic summation example.

use std::io::Write;

use jitlab_llvm::programs::{self, SumOptions};
use jitlab_llvm::{Context, JitError, ModuleBuilder, SymbolScope};
use tracing::{debug, instrument};

use super::{compile, format_number, CommandError, JitOptions, FUNCTION_NAME, MODULE_NAME};

/// Values summed when none are given on the command line.
pub const DEFAULT_VALUES: [f64; 5] = [19.1, 3.1, 1.4, 10.1, 11.1];

/// Build `originalFunction(count, ...)` and print the sum of `options.values`
/// (or [`DEFAULT_VALUES`]).
///
/// `--echo` needs the host print callback, so it switches the engine to
/// process symbol scope.
#[instrument(skip_all, level = "debug")]
pub fn sum(options: &JitOptions, out: &mut impl Write) -> Result<(), CommandError> {
    let mut options = options.clone();
    if options.echo && options.config.scope != SymbolScope::Process {
        debug!("echo requested, resolving symbols in the process");
        options.config.scope = SymbolScope::Process;
    }
    let values: &[f64] = if options.values.is_empty() {
        &DEFAULT_VALUES
    } else {
        &options.values
    };

    let context = Context::create();
    let module = ModuleBuilder::new(&context, MODULE_NAME);
    programs::build_variadic_sum(&module, FUNCTION_NAME, SumOptions { echo: options.echo })?;

    let engine = compile(module, &options, out)?;
    let total = programs::sum_values(&engine, FUNCTION_NAME, values).map_err(JitError::from)?;

    writeln!(out, "Evaluated to {}", format_number(total))?;
    Ok(())
}
