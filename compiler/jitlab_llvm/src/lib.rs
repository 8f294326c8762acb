//! Build, verify and JIT-execute small numeric functions with LLVM.
//!
//! The pipeline runs strictly top to bottom:
//!
//! 1. [`ModuleBuilder`] creates an empty module in a caller-owned context.
//! 2. [`Signature`] describes a function; [`ModuleBuilder::define`] adds it.
//! 3. [`FunctionBuilder`] emits named blocks and instructions.
//! 4. [`FunctionBuilder::finish`] and [`ModuleBuilder::verify`] verify.
//! 5. [`JitEngine::new`] consumes the [`VerifiedModule`] and compiles it.
//! 6. [`JitEngine::function`] / [`JitEngine::variadic_function`] hand back a
//!    callable whose Rust type was checked against the built signature.
//!
//! # Debug Environment Variables
//!
//! - `JITLAB_DEBUG_IR`: Print LLVM IR to stderr before JIT compilation.
//!   Any non-empty value enables this.
//!   Example: `JITLAB_DEBUG_IR=1 cargo test`
//!
//! - `JITLAB_OPT_LEVEL`, `JITLAB_SYMBOLS`: see [`EngineConfig::from_env`].
//!
//! - `RUST_LOG=jitlab_llvm=debug`: Enable debug-level tracing output.
//!
//! - `RUST_LOG=jitlab_llvm::builder=trace`: Trace every value binding.
//!
//! # Example
//!
//! ```ignore
//! use inkwell::context::Context;
//! use jitlab_llvm::{programs, EngineConfig, JitEngine, ModuleBuilder};
//!
//! let context = Context::create();
//! let module = ModuleBuilder::new(&context, "originalModule");
//! programs::build_add(&module, "originalFunction")?;
//! let engine = JitEngine::new(module.verify()?, &EngineConfig::default())?;
//!
//! let add = engine.function::<unsafe extern "C" fn(f64, f64) -> f64>("originalFunction")?;
//! assert_eq!(add.call(1.0, 2.0), 3.0);
//! ```

#![allow(
    // i64 counts and u64 LLVM constants are converted deliberately
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    // Most Result returns are for LLVM builder operations
    clippy::missing_errors_doc,
)]

pub mod builder;
pub mod context;
pub mod engine;
pub mod error;
pub mod invoke;
pub mod programs;
pub mod runtime;
pub mod types;
pub mod variadic;
pub mod verify;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests;

pub use builder::FunctionBuilder;
pub use context::ModuleBuilder;
pub use engine::{EngineConfig, JitEngine, SymbolScope};
pub use error::{BuildError, EngineError, InvokeError, JitError, VerifyError};
pub use invoke::{JitReturn, JitScalar, JitSignature, TypedFunction, VariadicFunction};
pub use types::{ScalarType, Signature};
pub use verify::VerifiedModule;

pub use inkwell::context::Context;
pub use inkwell::{FloatPredicate, IntPredicate, OptimizationLevel};

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Safe to call multiple times. Does nothing unless `RUST_LOG` is set.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}
