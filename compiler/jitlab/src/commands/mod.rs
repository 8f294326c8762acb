//! Command handlers for the jitlab CLI.
//!
//! Each submodule implements one subcommand. Option parsing and the shared
//! verify-print-compile step live here in the module root.

use std::io::Write;

use jitlab_llvm::engine::parse_opt_level;
use jitlab_llvm::{EngineConfig, JitEngine, JitError, ModuleBuilder, SymbolScope};
use tracing::debug;

mod add;
mod fallible;
mod sum;

pub use add::{add, add_chained};
pub use fallible::{fallible, fallible_args};
pub use sum::{sum, DEFAULT_VALUES};

/// Module name used by every example program.
pub const MODULE_NAME: &str = "originalModule";

/// Function name used by every example program.
pub const FUNCTION_NAME: &str = "originalFunction";

/// A failed command. The binary reports it on stderr and exits with 1.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Bad command-line usage.
    #[error("{0}")]
    Usage(String),

    /// A pipeline stage failed.
    #[error(transparent)]
    Jit(#[from] JitError),

    /// The report could not be written.
    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),
}

/// Options shared by the JIT subcommands.
#[derive(Debug, Clone, PartialEq)]
pub struct JitOptions {
    /// Engine configuration: environment first, flags override.
    pub config: EngineConfig,
    /// Print the verified module's IR before running it.
    pub print_ir: bool,
    /// Echo every variadic value through the host print callback (`sum`).
    pub echo: bool,
    /// Hierarchical debug logging on stderr.
    pub verbose: bool,
    /// Positional numeric arguments (`sum`).
    pub values: Vec<f64>,
}

impl Default for JitOptions {
    fn default() -> Self {
        Self {
            config: EngineConfig::from_env(),
            print_ir: true,
            echo: false,
            verbose: false,
            values: Vec::new(),
        }
    }
}

impl JitOptions {
    /// Defaults with a different symbol scope.
    #[must_use]
    pub fn with_scope(mut self, scope: SymbolScope) -> Self {
        self.config.scope = scope;
        self
    }

    /// Parse command-line flags on top of `self`.
    pub fn parse(mut self, args: &[String]) -> Result<Self, CommandError> {
        let mut values = Vec::new();

        for arg in args {
            if let Some(level) = arg.strip_prefix("--opt=") {
                self.config.opt_level = parse_opt_level(level).map_err(CommandError::Usage)?;
            } else if let Some(scope) = arg.strip_prefix("--scope=") {
                self.config.scope = scope.parse::<SymbolScope>().map_err(CommandError::Usage)?;
            } else if arg == "--no-ir" {
                self.print_ir = false;
            } else if arg == "--debug-ir" {
                self.config.dump_ir = true;
            } else if arg == "--echo" {
                self.echo = true;
            } else if arg == "--verbose" || arg == "-v" {
                self.verbose = true;
            } else if arg.starts_with("--") {
                return Err(CommandError::Usage(format!("unknown option '{arg}'")));
            } else {
                let value = arg
                    .parse::<f64>()
                    .map_err(|_| CommandError::Usage(format!("'{arg}' is not a number")))?;
                values.push(value);
            }
        }

        if !values.is_empty() {
            self.values = values;
        }
        Ok(self)
    }
}

/// Verify `module`, optionally print its IR, and JIT it.
pub(crate) fn compile<'ctx>(
    module: ModuleBuilder<'ctx>,
    options: &JitOptions,
    out: &mut impl Write,
) -> Result<JitEngine<'ctx>, CommandError> {
    let verified = module.verify().map_err(JitError::from)?;
    if options.print_ir {
        write!(out, "{}", verified.print_to_string())?;
    }

    debug!(scope = %options.config.scope, "building engine");
    let engine = JitEngine::new(verified, &options.config).map_err(JitError::from)?;
    Ok(engine)
}

/// Format a result with at most six decimals and trailing zeros dropped,
/// so `3.0` prints as `3` and the default sum as `44.8`.
pub fn format_number(value: f64) -> String {
    let text = format!("{value:.6}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}
