//! Typed invocation of JIT-compiled functions.
//!
//! A native address is only turned into a callable Rust function pointer
//! after the requested pointer type has been checked against the
//! [`Signature`] recorded when the function was built. For fixed-arity
//! functions the check is the boundary between safe and unsafe: once it
//! passes, calling is safe.
//!
//! A variadic callee decides for itself how many trailing arguments it
//! reads, which no signature records, so [`VariadicFunction::call`] stays
//! `unsafe`. [`programs::sum_values`](crate::programs::sum_values) is the
//! safe entry point for the sum program.
//!
//! ```ignore
//! let add = engine.function::<unsafe extern "C" fn(f64, f64) -> f64>("add")?;
//! assert_eq!(add.call(1.0, 2.0), 3.0);
//!
//! let sum = engine.variadic_function::<i64, f64>("sum")?;
//! // SAFETY: the sum program reads exactly `count` doubles.
//! let total = unsafe { sum.call(3, &[1.0, 2.0, 3.0]) }?;
//! ```
//!
//! Fixed-arity functions of up to six scalar parameters are supported.
//! Variadic functions take one fixed scalar parameter followed by up to
//! [`MAX_VARIADIC_ARGS`] doubles.

#![allow(unsafe_code)]

use std::marker::PhantomData;

use tracing::trace;

use crate::engine::JitEngine;
use crate::error::InvokeError;
use crate::types::{ScalarType, Signature};

/// Most variadic arguments [`VariadicFunction::call`] can pass.
pub const MAX_VARIADIC_ARGS: usize = 8;

mod private {
    pub trait Sealed {}
}

/// A Rust scalar with a matching [`ScalarType`].
pub trait JitScalar: Copy + private::Sealed {
    const TYPE: ScalarType;
}

/// A Rust type a generated function may return. `()` is `void`.
pub trait JitReturn: private::Sealed {
    const TYPE: Option<ScalarType>;
}

macro_rules! impl_scalar {
    ($($ty:ty => $scalar:ident),* $(,)?) => {
        $(
            impl private::Sealed for $ty {}

            impl JitScalar for $ty {
                const TYPE: ScalarType = ScalarType::$scalar;
            }

            impl JitReturn for $ty {
                const TYPE: Option<ScalarType> = Some(ScalarType::$scalar);
            }
        )*
    };
}

impl_scalar!(i32 => I32, i64 => I64, f64 => F64);

impl private::Sealed for () {}

impl JitReturn for () {
    const TYPE: Option<ScalarType> = None;
}

/// An `unsafe extern "C" fn` pointer type a fixed-arity function can be
/// called through.
pub trait JitSignature: Copy + private::Sealed {
    /// Parameter types, in order.
    fn params() -> Vec<ScalarType>;

    /// Return type, `None` for `void`.
    fn ret() -> Option<ScalarType>;
}

/// A fixed-arity function whose signature has been checked.
///
/// Borrows the engine, so the code it points at cannot be freed while the
/// handle is alive.
#[derive(Clone, Copy)]
pub struct TypedFunction<'e, F> {
    name: &'e str,
    func: F,
    _engine: PhantomData<&'e ()>,
}

impl<F> TypedFunction<'_, F> {
    pub fn name(&self) -> &str {
        self.name
    }
}

macro_rules! impl_jit_signature {
    ($($arg:ident),*) => {
        impl<$($arg,)* R> private::Sealed for unsafe extern "C" fn($($arg),*) -> R {}

        impl<$($arg: JitScalar,)* R: JitReturn> JitSignature for unsafe extern "C" fn($($arg),*) -> R {
            fn params() -> Vec<ScalarType> {
                vec![$(<$arg as JitScalar>::TYPE),*]
            }

            fn ret() -> Option<ScalarType> {
                <R as JitReturn>::TYPE
            }
        }

        impl<'e, $($arg: JitScalar,)* R: JitReturn> TypedFunction<'e, unsafe extern "C" fn($($arg),*) -> R> {
            /// Call the compiled function.
            #[allow(non_snake_case)]
            #[inline]
            pub fn call(&self, $($arg: $arg),*) -> R {
                // SAFETY: the pointer type matched the built signature and the
                // engine owning the code outlives `self`.
                unsafe { (self.func)($($arg),*) }
            }
        }
    };
}

impl_jit_signature!();
impl_jit_signature!(A);
impl_jit_signature!(A, B);
impl_jit_signature!(A, B, C);
impl_jit_signature!(A, B, C, D);
impl_jit_signature!(A, B, C, D, E);
impl_jit_signature!(A, B, C, D, E, G);

/// A variadic function `R name(A, ...)` whose variadic arguments are doubles.
#[derive(Clone, Copy)]
pub struct VariadicFunction<'e, A, R> {
    name: &'e str,
    func: unsafe extern "C" fn(A, ...) -> R,
    _engine: PhantomData<&'e ()>,
}

impl<A: JitScalar, R: JitReturn> VariadicFunction<'_, A, R> {
    pub fn name(&self) -> &str {
        self.name
    }

    /// Call with fixed argument `fixed` and the variadic doubles `extras`.
    ///
    /// ```compile_fail,E0133
    /// use jitlab_llvm::VariadicFunction;
    ///
    /// fn total(sum: VariadicFunction<'_, i64, f64>) -> f64 {
    ///     sum.call(2, &[1.0, 2.0]).unwrap_or(0.0)
    /// }
    /// ```
    ///
    /// # Safety
    ///
    /// The callee must read no more variadic arguments than `extras` holds,
    /// and read each of them as a double. For a function built by
    /// [`build_variadic_sum`](crate::programs::build_variadic_sum) that means
    /// `fixed` must not exceed `extras.len()`.
    pub unsafe fn call(&self, fixed: A, extras: &[f64]) -> Result<R, InvokeError> {
        if extras.len() > MAX_VARIADIC_ARGS {
            return Err(InvokeError::TooManyVariadicArgs {
                max: MAX_VARIADIC_ARGS,
                found: extras.len(),
            });
        }
        trace!(function = self.name, extras = extras.len(), "variadic call");

        let f = self.func;
        // Fixed and return types were checked at lookup; the caller vouches
        // for the variadic tail.
        let result = match *extras {
            [] => f(fixed),
            [a] => f(fixed, a),
            [a, b] => f(fixed, a, b),
            [a, b, c] => f(fixed, a, b, c),
            [a, b, c, d] => f(fixed, a, b, c, d),
            [a, b, c, d, e] => f(fixed, a, b, c, d, e),
            [a, b, c, d, e, g] => f(fixed, a, b, c, d, e, g),
            [a, b, c, d, e, g, h] => f(fixed, a, b, c, d, e, g, h),
            [a, b, c, d, e, g, h, i] => f(fixed, a, b, c, d, e, g, h, i),
            _ => {
                return Err(InvokeError::TooManyVariadicArgs {
                    max: MAX_VARIADIC_ARGS,
                    found: extras.len(),
                })
            }
        };
        Ok(result)
    }
}

impl<'ctx> JitEngine<'ctx> {
    /// Look up a fixed-arity function and check it against the pointer type
    /// `F`.
    pub fn function<'e, F: JitSignature>(
        &'e self,
        name: &'e str,
    ) -> Result<TypedFunction<'e, F>, InvokeError> {
        let built = self.built_signature(name)?;
        if built.variadic {
            return Err(InvokeError::VariadicMismatch {
                name: name.to_string(),
                built: built.clone(),
            });
        }
        if !built.same_shape(&F::params(), F::ret()) {
            return Err(InvokeError::SignatureMismatch {
                name: name.to_string(),
                built: built.clone(),
                requested: std::any::type_name::<F>().to_string(),
            });
        }

        let addr = self.address(name)?;
        // SAFETY: `addr` is the entry point of a function built with exactly
        // the parameter and return types of `F`, and all `F` are fn pointers.
        let func = unsafe { std::mem::transmute_copy::<usize, F>(&addr) };
        Ok(TypedFunction {
            name,
            func,
            _engine: PhantomData,
        })
    }

    /// Look up a variadic function `R name(A, ...)`.
    pub fn variadic_function<'e, A: JitScalar, R: JitReturn>(
        &'e self,
        name: &'e str,
    ) -> Result<VariadicFunction<'e, A, R>, InvokeError> {
        let built = self.built_signature(name)?;
        if !built.variadic {
            return Err(InvokeError::VariadicMismatch {
                name: name.to_string(),
                built: built.clone(),
            });
        }
        if !built.same_shape(&[A::TYPE], R::TYPE) {
            return Err(InvokeError::SignatureMismatch {
                name: name.to_string(),
                built: built.clone(),
                requested: std::any::type_name::<unsafe extern "C" fn(A, ...) -> R>()
                    .to_string(),
            });
        }

        let addr = self.address(name)?;
        // SAFETY: as in `function`; the variadic tail is passed as doubles.
        let func = unsafe {
            std::mem::transmute_copy::<usize, unsafe extern "C" fn(A, ...) -> R>(&addr)
        };
        Ok(VariadicFunction {
            name,
            func,
            _engine: PhantomData,
        })
    }

    fn built_signature(&self, name: &str) -> Result<&Signature, InvokeError> {
        self.signature(name)
            .ok_or_else(|| InvokeError::SymbolNotFound(name.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn fn_pointer_types_report_their_shape() {
        type Add = unsafe extern "C" fn(f64, f64) -> f64;
        assert_eq!(<Add as JitSignature>::params(), vec![ScalarType::F64, ScalarType::F64]);
        assert_eq!(<Add as JitSignature>::ret(), Some(ScalarType::F64));

        type Print = unsafe extern "C" fn(i64);
        assert_eq!(<Print as JitSignature>::params(), vec![ScalarType::I64]);
        assert_eq!(<Print as JitSignature>::ret(), None);

        type Nullary = unsafe extern "C" fn() -> i32;
        assert!(<Nullary as JitSignature>::params().is_empty());
    }
}
