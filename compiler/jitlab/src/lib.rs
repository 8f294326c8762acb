//! Command-line driver for the jitlab examples.
//!
//! Each subcommand runs one example program through the
//! [`jitlab_llvm`] pipeline and writes its report to a caller-supplied
//! writer, so the binary and the integration tests share one code path.
//!
//! [`fallible`] holds the "expected"-style construction demo, which needs no
//! LLVM at all.

pub mod commands;
pub mod fallible;
pub mod logging;
