//! Instruction emission into a single function.
//!
//! [`FunctionBuilder`] wraps inkwell's `Builder` for one function and keeps
//! three builder-local tables, all keyed by the names the caller chose:
//!
//! | Table | Holds |
//! |-------|-------|
//! | values | SSA values: parameters, constants, instruction results |
//! | slots | stack slots from `alloca`, with their element type |
//! | blocks | basic blocks from `append_block` |
//!
//! Instructions take operand *names* and a result name; each result is
//! recorded in the value table so later instructions can refer to it.
//! Operand types are checked before anything reaches LLVM, so a mismatch
//! is a [`BuildError`], never a panic inside inkwell.
//!
//! The tables are dropped by [`FunctionBuilder::finish`], which also runs the
//! per-function verification phase.

use inkwell::basic_block::BasicBlock;
use inkwell::builder::Builder;
use inkwell::values::{
    BasicMetadataValueEnum, BasicValue, BasicValueEnum, FloatValue, FunctionValue, IntValue,
    PointerValue,
};
use inkwell::{FloatPredicate, IntPredicate};
use rustc_hash::FxHashMap;
use tracing::trace;

use crate::context::ModuleBuilder;
use crate::error::BuildError;
use crate::types::{ScalarType, Signature};

/// Emits instructions into one function of a [`ModuleBuilder`].
pub struct FunctionBuilder<'m, 'ctx> {
    pub(crate) module: &'m ModuleBuilder<'ctx>,
    pub(crate) builder: Builder<'ctx>,
    pub(crate) function: FunctionValue<'ctx>,
    pub(crate) signature: Signature,
    values: FxHashMap<String, BasicValueEnum<'ctx>>,
    slots: FxHashMap<String, (PointerValue<'ctx>, ScalarType)>,
    blocks: FxHashMap<String, BasicBlock<'ctx>>,
}

impl<'m, 'ctx> FunctionBuilder<'m, 'ctx> {
    /// Name the parameters and seed the value table with them.
    pub(crate) fn new(
        module: &'m ModuleBuilder<'ctx>,
        function: FunctionValue<'ctx>,
        signature: Signature,
        param_names: &[&str],
    ) -> Self {
        let mut values = FxHashMap::default();
        for (param, &name) in function.get_param_iter().zip(param_names) {
            param.set_name(name);
            values.insert(name.to_string(), param);
        }

        Self {
            module,
            builder: module.llcx().create_builder(),
            function,
            signature,
            values,
            slots: FxHashMap::default(),
            blocks: FxHashMap::default(),
        }
    }

    /// The signature this function was defined with.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// The LLVM function being built.
    pub fn function(&self) -> FunctionValue<'ctx> {
        self.function
    }

    // -----------------------------------------------------------------------
    // Blocks
    // -----------------------------------------------------------------------

    /// Append a new basic block named `name` to the function.
    pub fn append_block(&mut self, name: &str) -> Result<BasicBlock<'ctx>, BuildError> {
        if self.blocks.contains_key(name) {
            return Err(BuildError::DuplicateBlock {
                function: self.signature.name.clone(),
                name: name.to_string(),
            });
        }
        let block = self.module.llcx().append_basic_block(self.function, name);
        self.blocks.insert(name.to_string(), block);
        Ok(block)
    }

    /// Move the insertion point to the end of block `name`.
    pub fn position_at(&mut self, name: &str) -> Result<(), BuildError> {
        let block = self.block(name)?;
        self.builder.position_at_end(block);
        Ok(())
    }

    /// Append block `name` and start inserting into it.
    pub fn begin_block(&mut self, name: &str) -> Result<(), BuildError> {
        let block = self.append_block(name)?;
        self.builder.position_at_end(block);
        Ok(())
    }

    fn block(&self, name: &str) -> Result<BasicBlock<'ctx>, BuildError> {
        self.blocks
            .get(name)
            .copied()
            .ok_or_else(|| BuildError::UnknownBlock {
                function: self.signature.name.clone(),
                name: name.to_string(),
            })
    }

    // -----------------------------------------------------------------------
    // Named values
    // -----------------------------------------------------------------------

    /// Look up a named value.
    pub fn value(&self, name: &str) -> Result<BasicValueEnum<'ctx>, BuildError> {
        self.values
            .get(name)
            .copied()
            .ok_or_else(|| BuildError::UnknownValue {
                function: self.signature.name.clone(),
                name: name.to_string(),
            })
    }

    /// Whether `name` is bound in the value table.
    pub fn has_value(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Bind `name` to `value`, shadowing any earlier binding.
    pub(crate) fn bind(&mut self, name: &str, value: BasicValueEnum<'ctx>) {
        trace!(function = %self.signature.name, name, "bind value");
        self.values.insert(name.to_string(), value);
    }

    fn float(&self, op: &'static str, name: &str) -> Result<FloatValue<'ctx>, BuildError> {
        match self.value(name)? {
            BasicValueEnum::FloatValue(v) => Ok(v),
            other => Err(self.mismatch(op, name, "double", other)),
        }
    }

    fn int(&self, op: &'static str, name: &str) -> Result<IntValue<'ctx>, BuildError> {
        match self.value(name)? {
            BasicValueEnum::IntValue(v) => Ok(v),
            other => Err(self.mismatch(op, name, "integer", other)),
        }
    }

    fn same_int(
        &self,
        op: &'static str,
        lhs: &str,
        rhs: &str,
    ) -> Result<(IntValue<'ctx>, IntValue<'ctx>), BuildError> {
        let l = self.int(op, lhs)?;
        let r = self.int(op, rhs)?;
        if l.get_type() != r.get_type() {
            return Err(self.mismatch(op, rhs, "integer of the same width", r.into()));
        }
        Ok((l, r))
    }

    fn mismatch(
        &self,
        op: &'static str,
        name: &str,
        expected: &'static str,
        found: BasicValueEnum<'ctx>,
    ) -> BuildError {
        BuildError::TypeMismatch {
            op,
            name: name.to_string(),
            expected,
            found: found.get_type().print_to_string().to_string(),
        }
    }

    // -----------------------------------------------------------------------
    // Constants
    // -----------------------------------------------------------------------

    /// Bind `name` to a double constant.
    pub fn const_f64(&mut self, name: &str, value: f64) {
        let v = self.module.llcx().f64_type().const_float(value);
        self.bind(name, v.into());
    }

    /// Bind `name` to an i64 constant.
    pub fn const_i64(&mut self, name: &str, value: i64) {
        #[allow(clippy::cast_sign_loss)]
        let v = self
            .module
            .llcx()
            .i64_type()
            .const_int(value as u64, value < 0);
        self.bind(name, v.into());
    }

    // -----------------------------------------------------------------------
    // Arithmetic
    // -----------------------------------------------------------------------

    /// `name = lhs + rhs` (double).
    pub fn fadd(&mut self, lhs: &str, rhs: &str, name: &str) -> Result<(), BuildError> {
        let (l, r) = (self.float("fadd", lhs)?, self.float("fadd", rhs)?);
        let v = self.builder.build_float_add(l, r, name)?;
        self.bind(name, v.into());
        Ok(())
    }

    /// `name = lhs - rhs` (double).
    pub fn fsub(&mut self, lhs: &str, rhs: &str, name: &str) -> Result<(), BuildError> {
        let (l, r) = (self.float("fsub", lhs)?, self.float("fsub", rhs)?);
        let v = self.builder.build_float_sub(l, r, name)?;
        self.bind(name, v.into());
        Ok(())
    }

    /// `name = lhs * rhs` (double).
    pub fn fmul(&mut self, lhs: &str, rhs: &str, name: &str) -> Result<(), BuildError> {
        let (l, r) = (self.float("fmul", lhs)?, self.float("fmul", rhs)?);
        let v = self.builder.build_float_mul(l, r, name)?;
        self.bind(name, v.into());
        Ok(())
    }

    /// `name = lhs / rhs` (double).
    pub fn fdiv(&mut self, lhs: &str, rhs: &str, name: &str) -> Result<(), BuildError> {
        let (l, r) = (self.float("fdiv", lhs)?, self.float("fdiv", rhs)?);
        let v = self.builder.build_float_div(l, r, name)?;
        self.bind(name, v.into());
        Ok(())
    }

    /// `name = lhs + rhs` (integer).
    pub fn add(&mut self, lhs: &str, rhs: &str, name: &str) -> Result<(), BuildError> {
        let (l, r) = self.same_int("add", lhs, rhs)?;
        let v = self.builder.build_int_add(l, r, name)?;
        self.bind(name, v.into());
        Ok(())
    }

    /// `name = lhs - rhs` (integer).
    pub fn sub(&mut self, lhs: &str, rhs: &str, name: &str) -> Result<(), BuildError> {
        let (l, r) = self.same_int("sub", lhs, rhs)?;
        let v = self.builder.build_int_sub(l, r, name)?;
        self.bind(name, v.into());
        Ok(())
    }

    /// `name = lhs * rhs` (integer).
    pub fn mul(&mut self, lhs: &str, rhs: &str, name: &str) -> Result<(), BuildError> {
        let (l, r) = self.same_int("mul", lhs, rhs)?;
        let v = self.builder.build_int_mul(l, r, name)?;
        self.bind(name, v.into());
        Ok(())
    }

    /// `name = (double) value`, signed integer to double.
    pub fn si_to_fp(&mut self, value: &str, name: &str) -> Result<(), BuildError> {
        let v = self.int("sitofp", value)?;
        let f64_ty = self.module.llcx().f64_type();
        let result = self.builder.build_signed_int_to_float(v, f64_ty, name)?;
        self.bind(name, result.into());
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Comparisons
    // -----------------------------------------------------------------------

    /// `name = lhs <pred> rhs` on doubles, producing an `i1`.
    pub fn fcmp(
        &mut self,
        pred: FloatPredicate,
        lhs: &str,
        rhs: &str,
        name: &str,
    ) -> Result<(), BuildError> {
        let (l, r) = (self.float("fcmp", lhs)?, self.float("fcmp", rhs)?);
        let v = self.builder.build_float_compare(pred, l, r, name)?;
        self.bind(name, v.into());
        Ok(())
    }

    /// `name = lhs <pred> rhs` on integers, producing an `i1`.
    pub fn icmp(
        &mut self,
        pred: IntPredicate,
        lhs: &str,
        rhs: &str,
        name: &str,
    ) -> Result<(), BuildError> {
        let (l, r) = self.same_int("icmp", lhs, rhs)?;
        let v = self.builder.build_int_compare(pred, l, r, name)?;
        self.bind(name, v.into());
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Memory
    // -----------------------------------------------------------------------

    /// Allocate a stack slot named `name` holding one `ty`.
    pub fn alloca(&mut self, name: &str, ty: ScalarType) -> Result<(), BuildError> {
        let ptr = self
            .builder
            .build_alloca(ty.llvm_type(self.module.llcx()), name)?;
        self.slots.insert(name.to_string(), (ptr, ty));
        Ok(())
    }

    /// Store the value `value` into slot `slot`.
    pub fn store(&mut self, slot: &str, value: &str) -> Result<(), BuildError> {
        let (ptr, ty) = self.slot(slot)?;
        let v = self.value(value)?;
        if ScalarType::from_llvm(v.get_type()) != Some(ty) {
            return Err(BuildError::TypeMismatch {
                op: "store",
                name: value.to_string(),
                expected: type_name(ty),
                found: v.get_type().print_to_string().to_string(),
            });
        }
        self.builder.build_store(ptr, v)?;
        Ok(())
    }

    /// `name = *slot`.
    pub fn load(&mut self, slot: &str, name: &str) -> Result<(), BuildError> {
        let (ptr, ty) = self.slot(slot)?;
        let v = self
            .builder
            .build_load(ty.llvm_type(self.module.llcx()), ptr, name)?;
        self.bind(name, v);
        Ok(())
    }

    fn slot(&self, name: &str) -> Result<(PointerValue<'ctx>, ScalarType), BuildError> {
        self.slots
            .get(name)
            .copied()
            .ok_or_else(|| BuildError::UnknownSlot {
                function: self.signature.name.clone(),
                name: name.to_string(),
            })
    }

    // -----------------------------------------------------------------------
    // Control flow
    // -----------------------------------------------------------------------

    /// Unconditional branch to block `target`.
    pub fn br(&mut self, target: &str) -> Result<(), BuildError> {
        let block = self.block(target)?;
        self.builder.build_unconditional_branch(block)?;
        Ok(())
    }

    /// Branch to `then_block` if `cond` is true, else to `else_block`.
    pub fn cond_br(
        &mut self,
        cond: &str,
        then_block: &str,
        else_block: &str,
    ) -> Result<(), BuildError> {
        let c = self.int("br", cond)?;
        if c.get_type().get_bit_width() != 1 {
            return Err(self.mismatch("br", cond, "i1", c.into()));
        }
        let (t, e) = (self.block(then_block)?, self.block(else_block)?);
        self.builder.build_conditional_branch(c, t, e)?;
        Ok(())
    }

    /// Return the value `name`.
    pub fn ret(&mut self, name: &str) -> Result<(), BuildError> {
        let v = self.value(name)?;
        let found = ScalarType::from_llvm(v.get_type());
        if self.signature.ret.is_none() || found != self.signature.ret {
            return Err(BuildError::ReturnType {
                function: self.signature.name.clone(),
                expected: self.signature.ret,
                found,
            });
        }
        self.builder.build_return(Some(&v as &dyn BasicValue<'ctx>))?;
        Ok(())
    }

    /// Return from a `void` function.
    pub fn ret_void(&mut self) -> Result<(), BuildError> {
        if self.signature.ret.is_some() {
            return Err(BuildError::ReturnType {
                function: self.signature.name.clone(),
                expected: self.signature.ret,
                found: None,
            });
        }
        self.builder.build_return(None)?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Calls
    // -----------------------------------------------------------------------

    /// Call `callee` with the named `args`.
    ///
    /// The callee must already be declared or defined in the module. For a
    /// non-void callee the result is bound to `name`.
    pub fn call(&mut self, callee: &str, args: &[&str], name: &str) -> Result<(), BuildError> {
        let signature = self
            .module
            .signature(callee)
            .ok_or_else(|| BuildError::UnknownFunction(callee.to_string()))?;
        let function = self
            .module
            .llmod()
            .get_function(callee)
            .ok_or_else(|| BuildError::UnknownFunction(callee.to_string()))?;

        let arity_ok = if signature.variadic {
            args.len() >= signature.params.len()
        } else {
            args.len() == signature.params.len()
        };
        if !arity_ok {
            return Err(BuildError::CallArity {
                callee: callee.to_string(),
                signature,
                found: args.len(),
            });
        }

        let mut arg_vals: Vec<BasicMetadataValueEnum<'ctx>> = Vec::with_capacity(args.len());
        for (i, &arg) in args.iter().enumerate() {
            let v = self.value(arg)?;
            if let Some(&expected) = signature.params.get(i) {
                if ScalarType::from_llvm(v.get_type()) != Some(expected) {
                    return Err(BuildError::TypeMismatch {
                        op: "call",
                        name: arg.to_string(),
                        expected: type_name(expected),
                        found: v.get_type().print_to_string().to_string(),
                    });
                }
            }
            arg_vals.push(v.into());
        }

        let call_name = if signature.ret.is_some() { name } else { "" };
        let call = self.builder.build_call(function, &arg_vals, call_name)?;
        if let Some(v) = call.try_as_basic_value().basic() {
            self.bind(name, v);
        }
        Ok(())
    }
}

fn type_name(ty: ScalarType) -> &'static str {
    match ty {
        ScalarType::I32 => "i32",
        ScalarType::I64 => "i64",
        ScalarType::F64 => "double",
    }
}
