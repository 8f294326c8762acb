use inkwell::context::Context;
use pretty_assertions::assert_eq;

use super::helper::{assert_close, jit, module};
use crate::engine::SymbolScope;
use crate::error::{EngineError, JitError};
use crate::invoke::MAX_VARIADIC_ARGS;
use crate::programs::{self, SumOptions};
use crate::runtime::take_output;
use crate::variadic::va_list_type;

#[test]
fn test_sum_program_ir() {
    let context = Context::create();
    let module = module(&context, "originalModule");
    programs::build_variadic_sum(&module, "originalFunction", SumOptions::default()).unwrap();

    let ir = module.print_to_string();
    assert!(ir.contains("define double @originalFunction(i64 %n, ...)"));
    for label in ["entry:", "loop:", "body:", "afterloop:"] {
        assert!(ir.contains(label), "missing block {label}");
    }
    assert!(ir.contains("va_arg ptr %va_list, double"));
    assert!(ir.contains("call void @llvm.va_start(ptr %va_list)"));
    assert!(ir.contains("call void @llvm.va_end(ptr %va_list)"));
}

#[test]
fn test_sum_of_five() {
    let context = Context::create();
    let module = module(&context, "originalModule");
    programs::build_variadic_sum(&module, "originalFunction", SumOptions::default()).unwrap();
    let engine = jit(module, SymbolScope::Module).unwrap();

    let total =
        programs::sum_values(&engine, "originalFunction", &[19.1, 3.1, 1.4, 10.1, 11.1]).unwrap();
    assert_close(total, 44.8);
}

#[test]
fn test_zero_count_reads_nothing() {
    let context = Context::create();
    let module = module(&context, "m");
    programs::build_variadic_sum(&module, "sum", SumOptions::default()).unwrap();
    let engine = jit(module, SymbolScope::Module).unwrap();

    assert_eq!(programs::sum_values(&engine, "sum", &[]), Ok(0.0));

    let sum = engine.variadic_function::<i64, f64>("sum").unwrap();
    // SAFETY: a non-positive count reads no variadic values.
    unsafe {
        assert_eq!(sum.call(0, &[5.0]), Ok(0.0));
        assert_eq!(sum.call(-2, &[5.0, 6.0]), Ok(0.0));
    }
}

#[test]
fn test_reads_exactly_count_values() {
    let context = Context::create();
    let module = module(&context, "m");
    programs::build_variadic_sum(&module, "sum", SumOptions::default()).unwrap();
    let engine = jit(module, SymbolScope::Module).unwrap();

    let sum = engine.variadic_function::<i64, f64>("sum").unwrap();
    // SAFETY: every count is at most the number of values passed.
    unsafe {
        assert_eq!(sum.call(1, &[2.5, 100.0]), Ok(2.5));
        assert_eq!(sum.call(2, &[2.5, 100.0, 1000.0]), Ok(102.5));
    }
}

#[test]
fn test_sum_values_counts_the_slice() {
    let context = Context::create();
    let module = module(&context, "m");
    programs::build_variadic_sum(&module, "sum", SumOptions::default()).unwrap();
    let engine = jit(module, SymbolScope::Module).unwrap();

    let values = [1.0, 2.0, 4.0, 8.0, 16.0, 32.0, 64.0, 128.0];
    for len in 0..=MAX_VARIADIC_ARGS {
        let expected: f64 = values[..len].iter().sum();
        assert_eq!(
            programs::sum_values(&engine, "sum", &values[..len]),
            Ok(expected),
            "sum of the first {len} values"
        );
    }
}

#[test]
fn test_echo_prints_each_value() {
    take_output();
    let context = Context::create();
    let module = module(&context, "m");
    programs::build_variadic_sum(&module, "sum", SumOptions { echo: true }).unwrap();
    let engine = jit(module, SymbolScope::Process).unwrap();

    assert_eq!(programs::sum_values(&engine, "sum", &[1.5, 2.25]), Ok(3.75));
    assert_eq!(
        take_output(),
        vec!["1.500000".to_string(), "2.250000".to_string()]
    );
}

#[test]
fn test_echo_needs_process_scope() {
    let context = Context::create();
    let module = module(&context, "m");
    programs::build_variadic_sum(&module, "sum", SumOptions { echo: true }).unwrap();

    let Err(err) = jit(module, SymbolScope::Module) else {
        panic!("echo callback cannot resolve in module scope");
    };
    assert!(matches!(
        err,
        JitError::Engine(EngineError::UnresolvedSymbol { ref name, .. })
            if name == "jitlab_print_double"
    ));
}

#[test]
fn test_va_list_layout() {
    let context = Context::create();
    let ty = va_list_type(&context);
    if cfg!(all(target_arch = "x86_64", not(windows))) {
        let fields = ty.into_struct_type().count_fields();
        assert_eq!(fields, 4);
    } else if cfg!(all(target_arch = "aarch64", not(windows), not(target_vendor = "apple"))) {
        assert_eq!(ty.into_struct_type().count_fields(), 5);
    } else {
        assert!(ty.is_pointer_type());
    }
}
