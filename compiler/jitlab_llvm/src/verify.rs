//! Two-phase verification.
//!
//! 1. **Function**: [`FunctionBuilder::finish`] checks the function it built.
//! 2. **Module**: [`ModuleBuilder::verify`] checks the whole module and, on
//!    success, turns it into a [`VerifiedModule`].
//!
//! `VerifiedModule` is the only input the execution engine accepts, so code
//! that failed either phase can never be JIT-compiled. A failure reflects a
//! defect in the emitted IR; callers report it and abort the pipeline.

use inkwell::module::Module;
use rustc_hash::FxHashMap;
use tracing::{debug, instrument};

use crate::builder::FunctionBuilder;
use crate::context::ModuleBuilder;
use crate::error::VerifyError;
use crate::types::Signature;

impl<'ctx> FunctionBuilder<'_, 'ctx> {
    /// Finish the function: drop the builder-local tables and verify it.
    #[instrument(skip(self), fields(function = %self.signature.name), level = "debug")]
    pub fn finish(self) -> Result<(), VerifyError> {
        if self.function.verify(false) {
            debug!("function verified");
            return Ok(());
        }

        // The function verifier only answers yes/no; the module verifier
        // carries the diagnostic text.
        let detail = match self.module.llmod().verify() {
            Err(msg) => msg.to_string(),
            Ok(()) => "function failed verification".to_string(),
        };
        Err(VerifyError::Function {
            name: self.signature.name.clone(),
            detail: detail.trim_end().to_string(),
        })
    }
}

impl<'ctx> ModuleBuilder<'ctx> {
    /// Verify the whole module, consuming the builder.
    #[instrument(skip(self), fields(module = %self.name()), level = "debug")]
    pub fn verify(self) -> Result<VerifiedModule<'ctx>, VerifyError> {
        if let Err(msg) = self.llmod().verify() {
            return Err(VerifyError::Module {
                module: self.name(),
                detail: msg.to_string().trim_end().to_string(),
            });
        }

        debug!("module verified");
        let (module, signatures) = self.into_parts();
        Ok(VerifiedModule { module, signatures })
    }
}

/// A module that passed verification, ready to hand to the JIT.
///
/// It can be printed but not modified.
pub struct VerifiedModule<'ctx> {
    module: Module<'ctx>,
    signatures: FxHashMap<String, Signature>,
}

impl<'ctx> VerifiedModule<'ctx> {
    /// The module identifier.
    pub fn name(&self) -> String {
        self.module.get_name().to_string_lossy().into_owned()
    }

    /// Print the module's textual IR.
    pub fn print_to_string(&self) -> String {
        self.module.print_to_string().to_string()
    }

    /// Look up the recorded signature of a function in the module.
    pub fn signature(&self, name: &str) -> Option<&Signature> {
        self.signatures.get(name)
    }

    pub(crate) fn into_parts(self) -> (Module<'ctx>, FxHashMap<String, Signature>) {
        (self.module, self.signatures)
    }
}
