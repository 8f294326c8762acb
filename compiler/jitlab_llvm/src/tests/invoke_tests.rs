use inkwell::context::Context;
use pretty_assertions::assert_eq;

use super::helper::{jit, module};
use crate::engine::SymbolScope;
use crate::error::InvokeError;
use crate::invoke::MAX_VARIADIC_ARGS;
use crate::programs::{self, SumOptions};
use crate::types::{ScalarType, Signature};

type BinaryF64 = unsafe extern "C" fn(f64, f64) -> f64;

#[test]
fn test_add() {
    let context = Context::create();
    let module = module(&context, "originalModule");
    programs::build_add(&module, "originalFunction").unwrap();
    let engine = jit(module, SymbolScope::Module).unwrap();

    let add = engine.function::<BinaryF64>("originalFunction").unwrap();
    assert_eq!(add.name(), "originalFunction");
    assert_eq!(add.call(1.0, 2.0), 3.0);
    assert_eq!(add.call(2.0, 2.0), 4.0);
}

#[test]
fn test_max_branches() {
    let context = Context::create();
    let module = module(&context, "m");
    programs::build_max(&module, "max").unwrap();
    let engine = jit(module, SymbolScope::Module).unwrap();

    let max = engine.function::<BinaryF64>("max").unwrap();
    assert_eq!(max.call(3.0, 5.0), 5.0);
    assert_eq!(max.call(5.0, 3.0), 5.0);
    assert_eq!(max.call(-1.5, -2.5), -1.5);
}

#[test]
fn test_integer_functions() {
    let context = Context::create();
    let module = module(&context, "m");

    let sig = Signature::new("triple", vec![ScalarType::I64], Some(ScalarType::I64));
    let mut fb = module.define(sig, &["x"]).unwrap();
    fb.begin_block("entry").unwrap();
    fb.const_i64("three", 3);
    fb.mul("x", "three", "tripled").unwrap();
    fb.ret("tripled").unwrap();
    fb.finish().unwrap();

    let sig = Signature::new("to_double", vec![ScalarType::I32], Some(ScalarType::F64));
    let mut fb = module.define(sig, &["x"]).unwrap();
    fb.begin_block("entry").unwrap();
    fb.si_to_fp("x", "converted").unwrap();
    fb.ret("converted").unwrap();
    fb.finish().unwrap();

    let engine = jit(module, SymbolScope::Module).unwrap();
    let triple = engine
        .function::<unsafe extern "C" fn(i64) -> i64>("triple")
        .unwrap();
    assert_eq!(triple.call(7), 21);
    assert_eq!(triple.call(-4), -12);

    let to_double = engine
        .function::<unsafe extern "C" fn(i32) -> f64>("to_double")
        .unwrap();
    assert_eq!(to_double.call(-9), -9.0);
}

#[test]
fn test_signature_mismatch_detected_before_call() {
    let context = Context::create();
    let module = module(&context, "m");
    programs::build_add(&module, "add").unwrap();
    let engine = jit(module, SymbolScope::Module).unwrap();

    let err = engine
        .function::<unsafe extern "C" fn(i64, i64) -> i64>("add")
        .err();
    let Some(InvokeError::SignatureMismatch { name, built, .. }) = err else {
        panic!("i64 pointer type must not match a double function");
    };
    assert_eq!(name, "add");
    assert_eq!(built.to_string(), "double @add(double, double)");

    assert!(matches!(
        engine.function::<unsafe extern "C" fn(f64) -> f64>("add").err(),
        Some(InvokeError::SignatureMismatch { .. })
    ));
    assert!(matches!(
        engine.function::<unsafe extern "C" fn(f64, f64)>("add").err(),
        Some(InvokeError::SignatureMismatch { .. })
    ));
}

#[test]
fn test_unknown_function_not_found() {
    let context = Context::create();
    let module = module(&context, "m");
    programs::build_add(&module, "add").unwrap();
    let engine = jit(module, SymbolScope::Module).unwrap();

    assert_eq!(
        engine.function::<BinaryF64>("mul").err(),
        Some(InvokeError::SymbolNotFound("mul".to_string()))
    );
    assert_eq!(
        engine.variadic_function::<i64, f64>("mul").err(),
        Some(InvokeError::SymbolNotFound("mul".to_string()))
    );
}

#[test]
fn test_variadic_and_fixed_are_not_interchangeable() {
    let context = Context::create();
    let module = module(&context, "m");
    programs::build_add(&module, "add").unwrap();
    programs::build_variadic_sum(&module, "sum", SumOptions::default()).unwrap();
    let engine = jit(module, SymbolScope::Module).unwrap();

    assert!(matches!(
        engine
            .function::<unsafe extern "C" fn(i64) -> f64>("sum")
            .err(),
        Some(InvokeError::VariadicMismatch { ref name, .. }) if name == "sum"
    ));
    assert!(matches!(
        engine.variadic_function::<f64, f64>("add").err(),
        Some(InvokeError::VariadicMismatch { ref name, .. }) if name == "add"
    ));
    assert!(matches!(
        engine.variadic_function::<f64, f64>("sum").err(),
        Some(InvokeError::SignatureMismatch { .. })
    ));
}

#[test]
fn test_too_many_variadic_args() {
    let context = Context::create();
    let module = module(&context, "m");
    programs::build_variadic_sum(&module, "sum", SumOptions::default()).unwrap();
    let engine = jit(module, SymbolScope::Module).unwrap();

    let values = [1.0; MAX_VARIADIC_ARGS + 1];
    assert_eq!(
        programs::sum_values(&engine, "sum", &values),
        Err(InvokeError::TooManyVariadicArgs {
            max: MAX_VARIADIC_ARGS,
            found: MAX_VARIADIC_ARGS + 1,
        })
    );

    let values = [1.0; MAX_VARIADIC_ARGS];
    assert_eq!(programs::sum_values(&engine, "sum", &values), Ok(8.0));
}
