//! Function signatures and the scalar types they are built from.
//!
//! A [`Signature`] is recorded for every function the module declares or
//! defines. The execution engine keeps these records so the invoker can
//! check a requested Rust function-pointer type against what was actually
//! built, instead of reinterpreting an address blindly.

use std::fmt;

use inkwell::context::Context;
use inkwell::types::{BasicMetadataTypeEnum, BasicType, BasicTypeEnum, FunctionType};

/// Scalar types a generated function can take or return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    /// 32-bit signed integer (`i32`).
    I32,
    /// 64-bit signed integer (`i64`).
    I64,
    /// IEEE double (`double`).
    F64,
}

impl ScalarType {
    /// The LLVM type for this scalar in `context`.
    pub fn llvm_type<'ctx>(self, context: &'ctx Context) -> BasicTypeEnum<'ctx> {
        match self {
            Self::I32 => context.i32_type().into(),
            Self::I64 => context.i64_type().into(),
            Self::F64 => context.f64_type().into(),
        }
    }

    /// Whether values of this type live in LLVM float registers.
    pub fn is_float(self) -> bool {
        matches!(self, Self::F64)
    }

    /// Map an LLVM basic type back to a scalar, if it is one we support.
    pub fn from_llvm(ty: BasicTypeEnum<'_>) -> Option<Self> {
        match ty {
            // Only `double` is ever created for float values.
            BasicTypeEnum::FloatType(_) => Some(Self::F64),
            BasicTypeEnum::IntType(i) => match i.get_bit_width() {
                32 => Some(Self::I32),
                64 => Some(Self::I64),
                _ => None,
            },
            _ => None,
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::F64 => "double",
        })
    }
}

/// An immutable function signature: name, fixed parameters, return type and
/// variadic flag. `ret == None` means `void`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub params: Vec<ScalarType>,
    pub ret: Option<ScalarType>,
    pub variadic: bool,
}

impl Signature {
    /// A fixed-arity signature.
    pub fn new(name: impl Into<String>, params: Vec<ScalarType>, ret: Option<ScalarType>) -> Self {
        Self {
            name: name.into(),
            params,
            ret,
            variadic: false,
        }
    }

    /// A signature taking `params` followed by `...`.
    pub fn variadic(
        name: impl Into<String>,
        params: Vec<ScalarType>,
        ret: Option<ScalarType>,
    ) -> Self {
        Self {
            variadic: true,
            ..Self::new(name, params, ret)
        }
    }

    /// Build the LLVM function type for this signature.
    pub fn fn_type<'ctx>(&self, context: &'ctx Context) -> FunctionType<'ctx> {
        let params: Vec<BasicMetadataTypeEnum<'ctx>> = self
            .params
            .iter()
            .map(|p| p.llvm_type(context).into())
            .collect();

        match self.ret {
            Some(ret) => ret.llvm_type(context).fn_type(&params, self.variadic),
            None => context.void_type().fn_type(&params, self.variadic),
        }
    }

    /// Same shape, ignoring the name.
    pub fn same_shape(&self, params: &[ScalarType], ret: Option<ScalarType>) -> bool {
        self.params == params && self.ret == ret
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ret {
            Some(ret) => write!(f, "{ret} @{}(", self.name)?,
            None => write!(f, "void @{}(", self.name)?,
        }
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{param}")?;
        }
        if self.variadic {
            if self.params.is_empty() {
                f.write_str("...")?;
            } else {
                f.write_str(", ...")?;
            }
        }
        f.write_str(")")
    }
}
