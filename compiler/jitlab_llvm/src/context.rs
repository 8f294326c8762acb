//! Context/module initialization and function declaration.
//!
//! [`ModuleBuilder`] owns one LLVM module inside a caller-provided
//! [`Context`]. It follows the two-phase pattern:
//! 1. **Declare**: external host functions and intrinsics get declarations
//!    (no body) so generated code can call them by name.
//! 2. **Define**: [`ModuleBuilder::define`] adds a function with a body and
//!    hands back a [`FunctionBuilder`] positioned on nothing yet.
//!
//! Every declared or defined function has its [`Signature`] recorded. The
//! registry travels with the module into the execution engine, where the
//! invoker uses it to validate calls.
//!
//! # Borrowed context
//!
//! The context is borrowed (`&'ctx Context`), never owned. All types,
//! constants, modules and engines built from it carry `'ctx`, so the borrow
//! checker guarantees it outlives them.

use std::cell::RefCell;

use inkwell::context::Context;
use inkwell::module::{Linkage, Module};
use inkwell::types::FunctionType;
use inkwell::values::FunctionValue;
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::builder::FunctionBuilder;
use crate::error::BuildError;
use crate::runtime::HOST_FUNCTIONS;
use crate::types::Signature;

/// An LLVM module under construction, plus the signatures of everything in it.
pub struct ModuleBuilder<'ctx> {
    /// The LLVM context (owns all LLVM types and values).
    llcx: &'ctx Context,
    /// The LLVM module being built.
    llmod: Module<'ctx>,
    /// Signatures by function name, for call checking and invocation.
    signatures: RefCell<FxHashMap<String, Signature>>,
}

impl<'ctx> ModuleBuilder<'ctx> {
    /// Create an empty module named `module_name` in `context`.
    #[must_use]
    pub fn new(context: &'ctx Context, module_name: &str) -> Self {
        debug!(module = module_name, "creating module");
        Self {
            llcx: context,
            llmod: context.create_module(module_name),
            signatures: RefCell::new(FxHashMap::default()),
        }
    }

    /// The LLVM context this module lives in.
    #[inline]
    pub fn llcx(&self) -> &'ctx Context {
        self.llcx
    }

    /// The underlying LLVM module.
    #[inline]
    pub fn llmod(&self) -> &Module<'ctx> {
        &self.llmod
    }

    /// The module identifier.
    pub fn name(&self) -> String {
        self.llmod.get_name().to_string_lossy().into_owned()
    }

    /// Look up the recorded signature of a declared or defined function.
    pub fn signature(&self, name: &str) -> Option<Signature> {
        self.signatures.borrow().get(name).cloned()
    }

    /// Declare an external function, resolved when the engine is built.
    ///
    /// Returns the existing declaration if the name is already known.
    pub fn declare_extern(&self, signature: &Signature) -> FunctionValue<'ctx> {
        if let Some(func) = self.llmod.get_function(&signature.name) {
            return func;
        }

        trace!(%signature, "declaring external function");
        let fn_type = signature.fn_type(self.llcx);
        let func = self
            .llmod
            .add_function(&signature.name, fn_type, Some(Linkage::External));
        self.record(signature.clone());
        func
    }

    /// Declare every host callback from the runtime table.
    ///
    /// Generated code may then call e.g. `jitlab_print_double`. Whether the
    /// call can be resolved depends on the engine's symbol scope.
    pub fn declare_host_functions(&self) {
        for host in HOST_FUNCTIONS {
            self.declare_extern(&host.signature());
        }
    }

    /// Declare an LLVM intrinsic such as `llvm.va_start`.
    ///
    /// Intrinsics are not recorded as signatures; they are never invoked
    /// from the host.
    pub(crate) fn declare_intrinsic(
        &self,
        name: &str,
        fn_type: FunctionType<'ctx>,
    ) -> FunctionValue<'ctx> {
        self.llmod
            .get_function(name)
            .unwrap_or_else(|| self.llmod.add_function(name, fn_type, None))
    }

    /// Define a function with a body.
    ///
    /// `param_names` name the fixed parameters positionally and seed the
    /// builder's named value table. The list must have exactly one name per
    /// fixed parameter.
    pub fn define(
        &self,
        signature: Signature,
        param_names: &[&str],
    ) -> Result<FunctionBuilder<'_, 'ctx>, BuildError> {
        if param_names.len() != signature.params.len() {
            return Err(BuildError::ParamNameCount {
                function: signature.name,
                expected: signature.params.len(),
                found: param_names.len(),
            });
        }

        // A prior declaration with the same signature is a forward reference
        // and may be given a body; anything else is a redefinition.
        let function = match self.llmod.get_function(&signature.name) {
            Some(existing)
                if existing.count_basic_blocks() == 0
                    && self.signature(&signature.name).as_ref() == Some(&signature) =>
            {
                existing
            }
            Some(_) => return Err(BuildError::DuplicateFunction(signature.name)),
            None => {
                let fn_type = signature.fn_type(self.llcx);
                self.llmod
                    .add_function(&signature.name, fn_type, Some(Linkage::External))
            }
        };

        debug!(%signature, "defining function");
        self.record(signature.clone());
        Ok(FunctionBuilder::new(self, function, signature, param_names))
    }

    /// Print the module's textual IR.
    pub fn print_to_string(&self) -> String {
        self.llmod.print_to_string().to_string()
    }

    fn record(&self, signature: Signature) {
        self.signatures
            .borrow_mut()
            .insert(signature.name.clone(), signature);
    }

    /// Split into the module and its signature registry.
    pub(crate) fn into_parts(self) -> (Module<'ctx>, FxHashMap<String, Signature>) {
        (self.llmod, self.signatures.into_inner())
    }
}
