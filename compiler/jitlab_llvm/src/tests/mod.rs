//! Pipeline tests for the JIT builder and executor.

mod engine_tests;
mod invoke_tests;
mod variadic_tests;

pub mod helper {
    use inkwell::context::Context;

    use crate::engine::{EngineConfig, JitEngine, SymbolScope};
    use crate::error::JitError;
    use crate::context::ModuleBuilder;

    /// Verify `module` and JIT it with `scope`.
    ///
    /// Prints the IR first when `JITLAB_DEBUG_IR` is set.
    pub fn jit<'ctx>(
        module: ModuleBuilder<'ctx>,
        scope: SymbolScope,
    ) -> Result<JitEngine<'ctx>, JitError> {
        if std::env::var("JITLAB_DEBUG_IR").is_ok() {
            println!("Generated LLVM IR:\n{}", module.print_to_string());
        }
        let verified = module.verify()?;
        let config = EngineConfig::default().with_scope(scope);
        Ok(JitEngine::new(verified, &config)?)
    }

    /// A fresh module in `context`, named after the test.
    pub fn module<'ctx>(context: &'ctx Context, name: &str) -> ModuleBuilder<'ctx> {
        crate::init_tracing();
        ModuleBuilder::new(context, name)
    }

    /// Floating-point comparison for sums of decimal literals.
    pub fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }
}
