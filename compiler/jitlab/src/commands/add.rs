//! `jitlab add` and `jitlab add-chained`: the two-argument addition example.

use std::io::Write;

use jitlab_llvm::{programs, Context, JitError, ModuleBuilder};
use tracing::instrument;

use super::{compile, format_number, CommandError, JitOptions, FUNCTION_NAME, MODULE_NAME};

type BinaryF64 = unsafe extern "C" fn(f64, f64) -> f64;

/// Build `originalFunction(a, b) = a + b`, then print `f(1, 2)` and `f(2, 2)`.
#[instrument(skip_all, level = "debug")]
pub fn add(options: &JitOptions, out: &mut impl Write) -> Result<(), CommandError> {
    let context = Context::create();
    let module = ModuleBuilder::new(&context, MODULE_NAME);
    programs::build_add(&module, FUNCTION_NAME)?;

    let engine = compile(module, options, out)?;
    let f = engine
        .function::<BinaryF64>(FUNCTION_NAME)
        .map_err(JitError::from)?;

    writeln!(out, "{}", format_number(f.call(1.0, 2.0)))?;
    writeln!(out, "{}", format_number(f.call(2.0, 2.0)))?;
    Ok(())
}

/// The process-chained variant: evaluate `f(10, 11)`.
#[instrument(skip_all, level = "debug")]
pub fn add_chained(options: &JitOptions, out: &mut impl Write) -> Result<(), CommandError> {
    let context = Context::create();
    let module = ModuleBuilder::new(&context, MODULE_NAME);
    programs::build_add(&module, FUNCTION_NAME)?;

    let engine = compile(module, options, out)?;
    let f = engine
        .function::<BinaryF64>(FUNCTION_NAME)
        .map_err(JitError::from)?;

    writeln!(out, "Evaluated to {}", format_number(f.call(10.0, 11.0)))?;
    Ok(())
}
