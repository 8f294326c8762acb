//! JIT execution engine and symbol resolution.
//!
//! [`JitEngine::new`] consumes a [`VerifiedModule`], lowers it to native code
//! with LLVM's MCJIT and keeps the module's signature records for the
//! invoker. Construction fails distinctly ([`EngineError`]) from a later
//! symbol lookup miss ([`InvokeError::SymbolNotFound`]).
//!
//! # Symbol scopes
//!
//! - [`SymbolScope::Module`]: resolution is anchored to the compiled module.
//!   A declaration without a body (other than an LLVM intrinsic) cannot be
//!   satisfied and fails construction.
//! - [`SymbolScope::Process`]: lookups chain into the host process. Host
//!   callbacks are bound into the engine and registered process-wide; any
//!   other symbol the process exports is searched for as well.
//!
//! Every external declaration is checked before code is generated, so an
//! unresolvable call is reported as an error rather than aborting inside
//! LLVM's linker.
//!
//! # Ownership
//!
//! The module moves into the engine and is never handed back:
//!
//! ```compile_fail,E0382
//! use jitlab_llvm::{Context, EngineConfig, JitEngine, ModuleBuilder};
//!
//! let context = Context::create();
//! let verified = ModuleBuilder::new(&context, "m").verify().unwrap();
//! let engine = JitEngine::new(verified, &EngineConfig::default()).unwrap();
//! // `verified` was moved into the engine.
//! println!("{}", verified.print_to_string());
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use inkwell::execution_engine::ExecutionEngine;
use inkwell::module::Module;
use inkwell::targets::{InitializationConfig, Target};
use inkwell::OptimizationLevel;
use rustc_hash::FxHashMap;
use tracing::{debug, instrument, warn};

use crate::error::{EngineError, InvokeError};
use crate::runtime::{host_function, register_process_symbols, search_process_symbol};
use crate::types::Signature;
use crate::verify::VerifiedModule;

/// Where symbols referenced by generated code are looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SymbolScope {
    /// Only functions defined in the compiled module.
    #[default]
    Module,
    /// The compiled module, then symbols exported by the host process.
    Process,
}

impl SymbolScope {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Module => "module",
            Self::Process => "process",
        }
    }
}

impl fmt::Display for SymbolScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SymbolScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "module" => Ok(Self::Module),
            "process" => Ok(Self::Process),
            other => Err(format!(
                "unknown symbol scope '{other}' (expected 'module' or 'process')"
            )),
        }
    }
}

/// Parse an optimization level `0`..`3`.
pub fn parse_opt_level(s: &str) -> Result<OptimizationLevel, String> {
    match s {
        "0" => Ok(OptimizationLevel::None),
        "1" => Ok(OptimizationLevel::Less),
        "2" => Ok(OptimizationLevel::Default),
        "3" => Ok(OptimizationLevel::Aggressive),
        other => Err(format!(
            "unknown optimization level '{other}' (expected 0, 1, 2 or 3)"
        )),
    }
}

/// Execution engine configuration.
///
/// Environment variables read by [`EngineConfig::from_env`]:
///
/// - `JITLAB_OPT_LEVEL`: `0`..`3`, MCJIT code generation level (default `0`).
/// - `JITLAB_SYMBOLS`: `module` or `process` (default `module`).
/// - `JITLAB_DEBUG_IR`: any non-empty value prints the module IR to stderr
///   before JIT compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub opt_level: OptimizationLevel,
    pub scope: SymbolScope,
    pub dump_ir: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            opt_level: OptimizationLevel::None,
            scope: SymbolScope::Module,
            dump_ir: false,
        }
    }
}

impl EngineConfig {
    /// Defaults, overridden by `JITLAB_*` environment variables.
    ///
    /// Invalid values are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `var`.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(level) = var("JITLAB_OPT_LEVEL") {
            match parse_opt_level(&level) {
                Ok(level) => config.opt_level = level,
                Err(e) => warn!("ignoring JITLAB_OPT_LEVEL: {e}"),
            }
        }
        if let Some(scope) = var("JITLAB_SYMBOLS") {
            match scope.parse() {
                Ok(scope) => config.scope = scope,
                Err(e) => warn!("ignoring JITLAB_SYMBOLS: {e}"),
            }
        }
        config.dump_ir = var("JITLAB_DEBUG_IR").is_some_and(|v| !v.is_empty());

        config
    }

    #[must_use]
    pub fn with_scope(mut self, scope: SymbolScope) -> Self {
        self.scope = scope;
        self
    }

    #[must_use]
    pub fn with_opt_level(mut self, opt_level: OptimizationLevel) -> Self {
        self.opt_level = opt_level;
        self
    }
}

static NATIVE_TARGET: OnceLock<Result<(), String>> = OnceLock::new();

/// Initialize the native LLVM target.
///
/// Safe to call multiple times; initialization happens once and every call
/// reports its outcome.
fn initialize_native_target() -> Result<(), EngineError> {
    NATIVE_TARGET
        .get_or_init(|| Target::initialize_native(&InitializationConfig::default()))
        .clone()
        .map_err(EngineError::Target)
}

/// A compiled module with resolvable entry points.
pub struct JitEngine<'ctx> {
    engine: ExecutionEngine<'ctx>,
    module: Module<'ctx>,
    signatures: FxHashMap<String, Signature>,
    scope: SymbolScope,
}

impl<'ctx> JitEngine<'ctx> {
    /// JIT-compile a verified module.
    #[instrument(skip_all, fields(module = %verified.name(), scope = %config.scope), level = "debug")]
    pub fn new(verified: VerifiedModule<'ctx>, config: &EngineConfig) -> Result<Self, EngineError> {
        initialize_native_target()?;

        let (module, signatures) = verified.into_parts();

        if config.dump_ir {
            let name = module.get_name().to_string_lossy();
            eprintln!("=== LLVM IR for {name} ===");
            eprintln!("{}", module.print_to_string().to_string());
            eprintln!("=== END IR ===");
        }

        let externals = external_declarations(&module);
        if config.scope == SymbolScope::Process {
            register_process_symbols()?;
        } else if let Some(name) = externals.first() {
            return Err(EngineError::UnresolvedSymbol {
                name: name.clone(),
                scope: SymbolScope::Module.as_str(),
            });
        }

        let engine = module
            .create_jit_execution_engine(config.opt_level)
            .map_err(|e| EngineError::Creation(e.to_string()))?;

        if config.scope == SymbolScope::Process {
            bind_process_symbols(&engine, &module, &externals)?;
        }

        debug!(functions = signatures.len(), "engine ready");
        Ok(Self {
            engine,
            module,
            signatures,
            scope: config.scope,
        })
    }

    /// The symbol scope this engine was built with.
    pub fn scope(&self) -> SymbolScope {
        self.scope
    }

    /// The recorded signature of a function in the compiled module.
    pub fn signature(&self, name: &str) -> Option<&Signature> {
        self.signatures.get(name)
    }

    /// Print the compiled module's IR. The module cannot be modified.
    pub fn print_to_string(&self) -> String {
        self.module.print_to_string().to_string()
    }

    /// Resolve a function defined in the module to its native address.
    pub fn address(&self, name: &str) -> Result<usize, InvokeError> {
        let defined = self
            .module
            .get_function(name)
            .is_some_and(|f| f.count_basic_blocks() > 0);
        if !defined {
            return Err(InvokeError::SymbolNotFound(name.to_string()));
        }

        match self.engine.get_function_address(name) {
            Ok(addr) if addr != 0 => Ok(addr),
            _ => Err(InvokeError::SymbolNotFound(name.to_string())),
        }
    }
}

/// Names of bodiless, non-intrinsic functions the module references.
fn external_declarations(module: &Module<'_>) -> Vec<String> {
    module
        .get_functions()
        .filter(|f| f.count_basic_blocks() == 0)
        .map(|f| f.get_name().to_string_lossy().into_owned())
        .filter(|name| !name.starts_with("llvm."))
        .collect()
}

/// Bind host callbacks into the engine and check everything else resolves
/// in the process.
fn bind_process_symbols<'ctx>(
    engine: &ExecutionEngine<'ctx>,
    module: &Module<'ctx>,
    externals: &[String],
) -> Result<(), EngineError> {
    for name in externals {
        let Some(func) = module.get_function(name) else {
            continue;
        };
        if let Some(host) = host_function(name) {
            engine.add_global_mapping(&func, host.address());
            debug!(symbol = %name, "bound host callback");
        } else if search_process_symbol(name).is_none() {
            return Err(EngineError::UnresolvedSymbol {
                name: name.clone(),
                scope: SymbolScope::Process.as_str(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn scope_parses_and_displays() {
        assert_eq!("module".parse::<SymbolScope>(), Ok(SymbolScope::Module));
        assert_eq!("process".parse::<SymbolScope>(), Ok(SymbolScope::Process));
        assert!("global".parse::<SymbolScope>().is_err());
        assert_eq!(SymbolScope::Process.to_string(), "process");
    }

    #[test]
    fn opt_level_parses_digits_only() {
        assert_eq!(parse_opt_level("0"), Ok(OptimizationLevel::None));
        assert_eq!(parse_opt_level("3"), Ok(OptimizationLevel::Aggressive));
        assert!(parse_opt_level("O2").is_err());
    }

    #[test]
    fn config_builders_override_defaults() {
        let config = EngineConfig::default()
            .with_scope(SymbolScope::Process)
            .with_opt_level(OptimizationLevel::Default);
        assert_eq!(config.scope, SymbolScope::Process);
        assert_eq!(config.opt_level, OptimizationLevel::Default);
        assert!(!config.dump_ir);
    }

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: FxHashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn env_vars_override_defaults() {
        let config = EngineConfig::from_vars(vars(&[
            ("JITLAB_OPT_LEVEL", "3"),
            ("JITLAB_SYMBOLS", "process"),
            ("JITLAB_DEBUG_IR", "1"),
        ]));
        assert_eq!(config.opt_level, OptimizationLevel::Aggressive);
        assert_eq!(config.scope, SymbolScope::Process);
        assert!(config.dump_ir);
    }

    #[test]
    fn invalid_env_vars_are_ignored() {
        let config = EngineConfig::from_vars(vars(&[
            ("JITLAB_OPT_LEVEL", "fast"),
            ("JITLAB_SYMBOLS", "global"),
            ("JITLAB_DEBUG_IR", ""),
        ]));
        assert_eq!(config, EngineConfig::default());
        assert_eq!(EngineConfig::from_vars(vars(&[])), EngineConfig::default());
    }

    #[test]
    fn native_target_outcome_is_cached() {
        let first = initialize_native_target();
        let cached = NATIVE_TARGET.get().cloned().unwrap();
        assert_eq!(first, cached.map_err(EngineError::Target));
        assert_eq!(initialize_native_target(), first);
    }
}
