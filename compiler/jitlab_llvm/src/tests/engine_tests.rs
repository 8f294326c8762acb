use inkwell::context::Context;
use pretty_assertions::assert_eq;

use super::helper::{jit, module};
use crate::engine::{EngineConfig, JitEngine, SymbolScope};
use crate::error::{EngineError, InvokeError, JitError};
use crate::programs;
use crate::runtime::take_output;
use crate::types::{ScalarType, Signature};

#[test]
fn test_module_scope_engine() {
    let context = Context::create();
    let module = module(&context, "originalModule");
    programs::build_add(&module, "originalFunction").unwrap();

    let engine = jit(module, SymbolScope::Module).unwrap();
    assert_eq!(engine.scope(), SymbolScope::Module);
    assert!(engine.address("originalFunction").is_ok());
    assert!(engine.print_to_string().contains("@originalFunction"));
}

#[test]
fn test_unknown_symbol_not_found() {
    let context = Context::create();
    let module = module(&context, "m");
    programs::build_add(&module, "add").unwrap();
    let engine = jit(module, SymbolScope::Module).unwrap();

    assert_eq!(
        engine.address("subtract"),
        Err(InvokeError::SymbolNotFound("subtract".to_string()))
    );
    // Lookups are repeatable after a miss.
    assert!(engine.address("add").is_ok());
}

#[test]
fn test_module_scope_rejects_host_declarations() {
    let context = Context::create();
    let module = module(&context, "m");
    module.declare_host_functions();
    programs::build_add(&module, "add").unwrap();

    let Err(err) = jit(module, SymbolScope::Module) else {
        panic!("module scope cannot resolve host callbacks");
    };
    assert!(matches!(
        err,
        JitError::Engine(EngineError::UnresolvedSymbol { ref name, scope: "module" })
            if name.starts_with("jitlab_print_")
    ));
}

/// `i64 @shout(i64 x)` printing `x` through the host and returning it.
fn build_shout(module: &crate::ModuleBuilder<'_>) {
    module.declare_host_functions();
    let sig = Signature::new("shout", vec![ScalarType::I64], Some(ScalarType::I64));
    let mut fb = module.define(sig, &["x"]).unwrap();
    fb.begin_block("entry").unwrap();
    fb.call("jitlab_print_int", &["x"], "").unwrap();
    fb.ret("x").unwrap();
    fb.finish().unwrap();
}

#[test]
fn test_process_scope_binds_host_callbacks() {
    take_output();
    let context = Context::create();
    let module = module(&context, "m");
    build_shout(&module);

    let engine = jit(module, SymbolScope::Process).unwrap();
    let shout = engine
        .function::<unsafe extern "C" fn(i64) -> i64>("shout")
        .unwrap();
    assert_eq!(shout.call(7), 7);
    assert_eq!(shout.call(-3), -3);
    assert_eq!(take_output(), vec!["7".to_string(), "-3".to_string()]);
}

#[test]
fn test_host_declarations_are_not_entry_points() {
    let context = Context::create();
    let module = module(&context, "m");
    build_shout(&module);
    let engine = jit(module, SymbolScope::Process).unwrap();

    assert_eq!(
        engine.address("jitlab_print_int"),
        Err(InvokeError::SymbolNotFound("jitlab_print_int".to_string()))
    );
}

#[test]
fn test_process_scope_rejects_unknown_externs() {
    let context = Context::create();
    let module = module(&context, "m");
    module.declare_extern(&Signature::new(
        "jitlab_no_such_symbol",
        vec![ScalarType::I64],
        None,
    ));

    let Err(err) = jit(module, SymbolScope::Process) else {
        panic!("an extern nothing provides must not resolve");
    };
    assert!(matches!(
        err,
        JitError::Engine(EngineError::UnresolvedSymbol { ref name, scope: "process" })
            if name == "jitlab_no_such_symbol"
    ));
}

#[test]
fn test_config_options_accepted() {
    let context = Context::create();
    let module = module(&context, "m");
    programs::build_add(&module, "add").unwrap();

    let config = EngineConfig {
        opt_level: crate::OptimizationLevel::Aggressive,
        scope: SymbolScope::Module,
        dump_ir: true,
    };
    let engine = JitEngine::new(module.verify().unwrap(), &config).unwrap();
    let add = engine
        .function::<unsafe extern "C" fn(f64, f64) -> f64>("add")
        .unwrap();
    assert_eq!(add.call(0.5, 0.25), 0.75);
}
