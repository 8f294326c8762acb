//! Variadic-argument emission: `va_start`, `va_arg`, `va_end`.
//!
//! The argument list lives in a stack-allocated `va_list` record whose
//! layout is platform-specific:
//!
//! | Platform | `va_list` |
//! |----------|-----------|
//! | x86-64 System V | `{ i32, i32, ptr, ptr }` |
//! | AArch64 AAPCS (Linux) | `{ ptr, ptr, ptr, i32, i32 }` |
//! | Windows, Apple AArch64, others | `ptr` |
//!
//! `llvm.va_start` / `llvm.va_end` take a pointer to that record, and the
//! `va_arg` instruction reads the next argument through it.

use inkwell::context::Context;
use inkwell::types::BasicTypeEnum;
use inkwell::values::PointerValue;
use inkwell::AddressSpace;
use tracing::trace;

use crate::builder::FunctionBuilder;
use crate::error::BuildError;
use crate::types::ScalarType;

/// Handle to an initialized variadic argument list.
#[derive(Debug, Clone, Copy)]
pub struct VaList<'ctx> {
    ptr: PointerValue<'ctx>,
}

/// The host's `va_list` record type.
pub fn va_list_type(context: &Context) -> BasicTypeEnum<'_> {
    let ptr = context.ptr_type(AddressSpace::default());
    let i32_ty = context.i32_type();

    if cfg!(all(target_arch = "x86_64", not(windows))) {
        context
            .struct_type(&[i32_ty.into(), i32_ty.into(), ptr.into(), ptr.into()], false)
            .into()
    } else if cfg!(all(target_arch = "aarch64", not(windows), not(target_vendor = "apple"))) {
        context
            .struct_type(
                &[ptr.into(), ptr.into(), ptr.into(), i32_ty.into(), i32_ty.into()],
                false,
            )
            .into()
    } else {
        ptr.into()
    }
}

impl<'ctx> FunctionBuilder<'_, 'ctx> {
    /// Allocate a `va_list` named `name` and start reading variadic arguments.
    ///
    /// Emit this in the entry block, before any branch.
    pub fn va_start(&mut self, name: &str) -> Result<VaList<'ctx>, BuildError> {
        self.require_variadic()?;

        let context = self.module.llcx();
        let ptr = self.builder.build_alloca(va_list_type(context), name)?;
        let va_start = self.va_intrinsic("llvm.va_start");
        self.builder.build_call(va_start, &[ptr.into()], "")?;
        trace!(function = %self.signature.name, "va_start");
        Ok(VaList { ptr })
    }

    /// Read the next variadic argument as `ty` and bind it to `name`.
    pub fn va_arg(&mut self, list: VaList<'ctx>, ty: ScalarType, name: &str) -> Result<(), BuildError> {
        self.require_variadic()?;
        let llvm_ty = ty.llvm_type(self.module.llcx());
        let v = self.builder.build_va_arg(list.ptr, llvm_ty, name)?;
        self.bind(name, v);
        Ok(())
    }

    /// Finish reading variadic arguments.
    pub fn va_end(&mut self, list: VaList<'ctx>) -> Result<(), BuildError> {
        self.require_variadic()?;
        let va_end = self.va_intrinsic("llvm.va_end");
        self.builder.build_call(va_end, &[list.ptr.into()], "")?;
        trace!(function = %self.signature.name, "va_end");
        Ok(())
    }

    fn require_variadic(&self) -> Result<(), BuildError> {
        if self.signature.variadic {
            Ok(())
        } else {
            Err(BuildError::NotVariadic(self.signature.name.clone()))
        }
    }

    fn va_intrinsic(&self, name: &str) -> inkwell::values::FunctionValue<'ctx> {
        let context = self.module.llcx();
        let fn_type = context
            .void_type()
            .fn_type(&[context.ptr_type(AddressSpace::default()).into()], false);
        self.module.declare_intrinsic(name, fn_type)
    }
}
