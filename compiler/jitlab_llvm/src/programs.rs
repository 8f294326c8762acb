//! Canonical example programs built with the pipeline.
//!
//! Each builder defines one function in a [`ModuleBuilder`] and runs the
//! per-function verification phase. The caller still verifies the module and
//! builds the engine.

use inkwell::{FloatPredicate, IntPredicate};
use tracing::instrument;

use crate::context::ModuleBuilder;
use crate::engine::JitEngine;
use crate::error::{InvokeError, JitError};
use crate::invoke::MAX_VARIADIC_ARGS;
use crate::runtime::host_function;
use crate::types::{ScalarType, Signature};

/// `double @name(double a, double b)` returning `a + b`.
#[instrument(skip(module), level = "debug")]
pub fn build_add(module: &ModuleBuilder<'_>, name: &str) -> Result<(), JitError> {
    let signature = Signature::new(
        name,
        vec![ScalarType::F64, ScalarType::F64],
        Some(ScalarType::F64),
    );
    let mut fb = module.define(signature, &["a", "b"])?;
    fb.begin_block("entry")?;
    fb.fadd("a", "b", "addtmp")?;
    fb.ret("addtmp")?;
    fb.finish()?;
    Ok(())
}

/// `double @name(double a, double b)` returning the larger operand.
#[instrument(skip(module), level = "debug")]
pub fn build_max(module: &ModuleBuilder<'_>, name: &str) -> Result<(), JitError> {
    let signature = Signature::new(
        name,
        vec![ScalarType::F64, ScalarType::F64],
        Some(ScalarType::F64),
    );
    let mut fb = module.define(signature, &["a", "b"])?;
    fb.begin_block("entry")?;
    fb.append_block("take_a")?;
    fb.append_block("take_b")?;

    fb.fcmp(FloatPredicate::OGT, "a", "b", "a_greater")?;
    fb.cond_br("a_greater", "take_a", "take_b")?;

    fb.position_at("take_a")?;
    fb.ret("a")?;
    fb.position_at("take_b")?;
    fb.ret("b")?;

    fb.finish()?;
    Ok(())
}

/// Options for [`build_variadic_sum`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SumOptions {
    /// Pass every fetched value to the host `jitlab_print_double` callback.
    /// The engine must then use process symbol scope.
    pub echo: bool,
}

const ECHO_CALLBACK: &str = "jitlab_print_double";

/// `double @name(i64 count, ...)` summing `count` variadic doubles.
///
/// ```text
/// entry:     va_start, count <- %count, summation <- 0.0
/// loop:      count > 0 ? body : afterloop
/// body:      value = va_arg double; summation += value; count -= 1
/// afterloop: va_end, return summation
/// ```
///
/// The guard runs before the first fetch, so exactly `count` values are
/// read and `count <= 0` reads none and returns `0.0`.
#[instrument(skip(module), level = "debug")]
pub fn build_variadic_sum(
    module: &ModuleBuilder<'_>,
    name: &str,
    options: SumOptions,
) -> Result<(), JitError> {
    if options.echo {
        if let Some(host) = host_function(ECHO_CALLBACK) {
            module.declare_extern(&host.signature());
        }
    }

    let signature = Signature::variadic(name, vec![ScalarType::I64], Some(ScalarType::F64));
    let mut fb = module.define(signature, &["n"])?;

    fb.begin_block("entry")?;
    fb.append_block("loop")?;
    fb.append_block("body")?;
    fb.append_block("afterloop")?;

    let args = fb.va_start("va_list")?;
    fb.alloca("count", ScalarType::I64)?;
    fb.alloca("summation", ScalarType::F64)?;
    fb.store("count", "n")?;
    fb.const_f64("zero", 0.0);
    fb.store("summation", "zero")?;
    fb.const_i64("none_left", 0);
    fb.const_i64("step", 1);
    fb.br("loop")?;

    fb.position_at("loop")?;
    fb.load("count", "current_count")?;
    fb.icmp(IntPredicate::SGT, "current_count", "none_left", "loop_flag")?;
    fb.cond_br("loop_flag", "body", "afterloop")?;

    fb.position_at("body")?;
    fb.va_arg(args, ScalarType::F64, "value")?;
    if options.echo {
        fb.call(ECHO_CALLBACK, &["value"], "")?;
    }
    fb.load("summation", "current_summation")?;
    fb.fadd("current_summation", "value", "updated_summation")?;
    fb.store("summation", "updated_summation")?;
    fb.sub("current_count", "step", "updated_count")?;
    fb.store("count", "updated_count")?;
    fb.br("loop")?;

    fb.position_at("afterloop")?;
    fb.va_end(args)?;
    fb.load("summation", "result")?;
    fb.ret("result")?;

    fb.finish()?;
    Ok(())
}

/// Call a function built by [`build_variadic_sum`] with `count = values.len()`.
pub fn sum_values(engine: &JitEngine<'_>, name: &str, values: &[f64]) -> Result<f64, InvokeError> {
    let too_many = || InvokeError::TooManyVariadicArgs {
        max: MAX_VARIADIC_ARGS,
        found: values.len(),
    };
    let count = i64::try_from(values.len()).map_err(|_| too_many())?;

    let sum = engine.variadic_function::<i64, f64>(name)?;
    // SAFETY: the sum program reads `count` doubles and `count` is the
    // length of `values`.
    unsafe { sum.call(count, values) }
}
