//! Host callbacks for JIT-compiled code.
//!
//! Generated functions can call these by symbol name once the module has
//! declared them ([`ModuleBuilder::declare_host_functions`]). They are
//! `extern "C"` with stable names so the JIT can bind them.
//!
//! Resolution happens in the execution engine. Under
//! [`SymbolScope::Process`](crate::engine::SymbolScope::Process) the table
//! below is bound into the engine and also registered process-wide, and the
//! host process itself is searchable for anything else it exports.
//!
//! [`ModuleBuilder::declare_host_functions`]: crate::context::ModuleBuilder::declare_host_functions

#![allow(unsafe_code)]

use std::cell::RefCell;
use std::ffi::{c_void, CString};
use std::sync::OnceLock;

use llvm_sys::support::{LLVMAddSymbol, LLVMLoadLibraryPermanently, LLVMSearchForAddressOfSymbol};
use tracing::{debug, warn};

use crate::error::EngineError;
use crate::types::{ScalarType, Signature};

// Thread-local record of everything the callbacks printed.
// JIT code runs on the calling thread, so each test sees only its own output.
thread_local! {
    static OUTPUT: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

/// Print an integer to stdout.
#[no_mangle]
pub extern "C" fn jitlab_print_int(i: i64) {
    let line = i.to_string();
    println!("{line}");
    OUTPUT.with(|out| out.borrow_mut().push(line));
}

/// Print a double to stdout with six decimals.
#[no_mangle]
pub extern "C" fn jitlab_print_double(d: f64) {
    let line = format!("{d:.6}");
    println!("{line}");
    OUTPUT.with(|out| out.borrow_mut().push(line));
}

/// Take the lines printed by host callbacks on this thread so far.
pub fn take_output() -> Vec<String> {
    OUTPUT.with(|out| std::mem::take(&mut *out.borrow_mut()))
}

#[derive(Clone, Copy)]
enum HostEntry {
    Int(extern "C" fn(i64)),
    Double(extern "C" fn(f64)),
}

/// A host callback: its symbol name, parameter type and entry point.
pub struct HostFunction {
    pub name: &'static str,
    entry: HostEntry,
}

impl HostFunction {
    /// The signature generated code must declare to call this callback.
    pub fn signature(&self) -> Signature {
        let param = match self.entry {
            HostEntry::Int(_) => ScalarType::I64,
            HostEntry::Double(_) => ScalarType::F64,
        };
        Signature::new(self.name, vec![param], None)
    }

    /// Native entry-point address.
    pub fn address(&self) -> usize {
        match self.entry {
            HostEntry::Int(f) => f as usize,
            HostEntry::Double(f) => f as usize,
        }
    }
}

/// Every host callback generated code may declare.
pub static HOST_FUNCTIONS: &[HostFunction] = &[
    HostFunction {
        name: "jitlab_print_int",
        entry: HostEntry::Int(jitlab_print_int),
    },
    HostFunction {
        name: "jitlab_print_double",
        entry: HostEntry::Double(jitlab_print_double),
    },
];

/// Find a host callback by symbol name.
pub fn host_function(name: &str) -> Option<&'static HostFunction> {
    HOST_FUNCTIONS.iter().find(|h| h.name == name)
}

static PROCESS_SYMBOLS: OnceLock<Result<(), String>> = OnceLock::new();

/// Make the host process searchable for symbols and register the callbacks
/// process-wide.
///
/// Safe to call multiple times; registration happens once and every call
/// reports its outcome.
pub(crate) fn register_process_symbols() -> Result<(), EngineError> {
    PROCESS_SYMBOLS
        .get_or_init(|| {
            // A null filename loads the running executable itself.
            // SAFETY: LLVM accepts a null path for this purpose.
            let failed = unsafe { LLVMLoadLibraryPermanently(std::ptr::null()) } != 0;
            if failed {
                warn!("could not load host process symbols; only host callbacks resolve");
            }

            for host in HOST_FUNCTIONS {
                let name = CString::new(host.name).map_err(|e| e.to_string())?;
                // SAFETY: LLVM copies the name; the address is a 'static fn.
                unsafe { LLVMAddSymbol(name.as_ptr(), host.address() as *mut c_void) };
                debug!(symbol = host.name, "registered host symbol");
            }
            Ok(())
        })
        .clone()
        .map_err(EngineError::Target)
}

/// Look a symbol up among process-wide symbols.
pub(crate) fn search_process_symbol(name: &str) -> Option<usize> {
    let name = CString::new(name).ok()?;
    // SAFETY: the name is a valid C string for the duration of the call.
    let addr = unsafe { LLVMSearchForAddressOfSymbol(name.as_ptr()) };
    if addr.is_null() {
        None
    } else {
        Some(addr as usize)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn callbacks_record_their_output() {
        take_output();
        jitlab_print_int(42);
        jitlab_print_double(1.5);
        assert_eq!(take_output(), vec!["42".to_string(), "1.500000".to_string()]);
        assert!(take_output().is_empty());
    }

    #[test]
    fn host_table_signatures() {
        let int = host_function("jitlab_print_int").unwrap();
        assert_eq!(int.signature().to_string(), "void @jitlab_print_int(i64)");
        let double = host_function("jitlab_print_double").unwrap();
        assert_eq!(
            double.signature().to_string(),
            "void @jitlab_print_double(double)"
        );
        assert!(host_function("print_string").is_none());
    }

    #[test]
    fn registered_symbols_are_searchable() {
        register_process_symbols().unwrap();
        assert_eq!(PROCESS_SYMBOLS.get(), Some(&Ok(())));
        register_process_symbols().unwrap();
        let addr = search_process_symbol("jitlab_print_double").unwrap();
        assert_eq!(addr, host_function("jitlab_print_double").unwrap().address());
    }
}
