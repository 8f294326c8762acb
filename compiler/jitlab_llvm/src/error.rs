//! Error types, one enum per pipeline stage.
//!
//! Every stage failure is terminal for the pipeline run that hit it:
//! nothing here is retried. [`JitError`] lets a driver compose the stages
//! with `?` and report whichever one failed.

use inkwell::builder::BuilderError;

use crate::types::{ScalarType, Signature};

/// Errors raised while declaring functions or emitting instructions.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// A function with this name already exists in the module.
    #[error("function '{0}' is already defined in this module")]
    DuplicateFunction(String),

    /// The parameter-name list does not match the fixed parameter count.
    #[error("function '{function}' has {expected} parameters but {found} names were supplied")]
    ParamNameCount {
        function: String,
        expected: usize,
        found: usize,
    },

    /// A value name was referenced before anything defined it.
    #[error("unknown value '{name}' in function '{function}'")]
    UnknownValue { function: String, name: String },

    /// A stack slot name was referenced before `alloca` created it.
    #[error("unknown stack slot '{name}' in function '{function}'")]
    UnknownSlot { function: String, name: String },

    /// A block name was referenced before `append_block` created it.
    #[error("unknown basic block '{name}' in function '{function}'")]
    UnknownBlock { function: String, name: String },

    /// A callee is neither defined nor declared in the module.
    #[error("call to undeclared function '{0}'")]
    UnknownFunction(String),

    /// An operand does not have the type the instruction needs.
    #[error("'{op}' expects {expected} but '{name}' is {found}")]
    TypeMismatch {
        op: &'static str,
        name: String,
        expected: &'static str,
        found: String,
    },

    /// A call passed the wrong number of fixed arguments.
    #[error("call to '{callee}' passes {found} arguments, signature is {signature}")]
    CallArity {
        callee: String,
        signature: Signature,
        found: usize,
    },

    /// Variadic-argument instructions used outside a variadic function.
    #[error("function '{0}' is not variadic")]
    NotVariadic(String),

    /// The value returned does not match the declared return type.
    #[error("function '{function}' returns {expected:?} but the returned value is {found:?}")]
    ReturnType {
        function: String,
        expected: Option<ScalarType>,
        found: Option<ScalarType>,
    },

    /// A block with this name already exists in the function.
    #[error("basic block '{name}' already exists in function '{function}'")]
    DuplicateBlock { function: String, name: String },

    /// inkwell rejected the instruction.
    #[error("LLVM builder error: {0}")]
    Llvm(#[from] BuilderError),
}

/// Errors raised by the two verification phases.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    /// Per-function structural verification failed.
    #[error("error constructing function '{name}': {detail}")]
    Function { name: String, detail: String },

    /// Whole-module verification failed.
    #[error("error in module '{module}': {detail}")]
    Module { module: String, detail: String },
}

/// Errors raised while constructing the execution engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// The native target could not be initialized.
    #[error("failed to initialize native target: {0}")]
    Target(String),

    /// LLVM could not create a JIT for this module (e.g. no usable backend).
    #[error("failed to create JIT execution engine: {0}")]
    Creation(String),

    /// A declared external function has no definition in the chosen scope.
    #[error("symbol '{name}' cannot be resolved with {scope} symbol scope")]
    UnresolvedSymbol { name: String, scope: &'static str },
}

/// Errors raised when resolving or calling compiled code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvokeError {
    /// No function of this name exists in the compiled module.
    #[error("function '{0}' not found in compiled module")]
    SymbolNotFound(String),

    /// The requested Rust signature does not match the built signature.
    #[error("signature mismatch for '{name}': built as {built}, requested {requested}")]
    SignatureMismatch {
        name: String,
        built: Signature,
        requested: String,
    },

    /// A variadic function was requested as fixed-arity or the reverse.
    #[error("'{name}' is built as {built}, which is not callable as requested")]
    VariadicMismatch { name: String, built: Signature },

    /// More variadic arguments than the invoker can marshal.
    #[error("{found} variadic arguments passed, at most {max} are supported")]
    TooManyVariadicArgs { max: usize, found: usize },
}

/// Any pipeline failure.
#[derive(Debug, thiserror::Error)]
pub enum JitError {
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Verify(#[from] VerifyError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Invoke(#[from] InvokeError),
}
