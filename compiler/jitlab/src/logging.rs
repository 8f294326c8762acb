//! Logging setup for the CLI.

use tracing_subscriber::{prelude::*, EnvFilter};
use tracing_tree::HierarchicalLayer;

/// Install a subscriber.
///
/// With `verbose`, pipeline spans are printed as an indented tree on stderr
/// (`RUST_LOG` still narrows it when set). Otherwise logging stays off unless
/// `RUST_LOG` is set.
pub fn init_logging(verbose: bool) {
    if !verbose {
        jitlab_llvm::init_tracing();
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("jitlab=debug,jitlab_llvm=debug"));
    let tree = HierarchicalLayer::new(2)
        .with_targets(true)
        .with_bracketed_fields(true)
        .with_writer(std::io::stderr);

    // A subscriber may already be installed (tests); keep it.
    let _ = tracing_subscriber::registry().with(filter).with(tree).try_init();
}
