//! `jitlab fallible`: the "expected"-style construction demo.

use std::io::Write;

use crate::fallible::create;

use super::CommandError;

/// Construct a [`Tracked`](crate::fallible::Tracked) from `input` and report
/// either the value or the error. A construction error is handled here, so
/// the command itself still succeeds.
pub fn fallible(input: &str, out: &mut impl Write) -> Result<(), CommandError> {
    let input: i32 = input
        .parse()
        .map_err(|_| CommandError::Usage(format!("'{input}' is not an integer")))?;

    match create(input) {
        Ok(tracked) => writeln!(out, "print {}", tracked.describe())?,
        Err(e) => writeln!(out, "error: {e}")?,
    }
    Ok(())
}

/// Split `fallible` arguments into the input and the verbose flag.
///
/// Numbers such as `-3` are inputs, not flags.
pub fn fallible_args(args: &[String]) -> Result<(&str, bool), CommandError> {
    let mut input = None;
    let mut verbose = false;

    for arg in args {
        if arg == "--verbose" || arg == "-v" {
            verbose = true;
        } else if arg.starts_with("--") {
            return Err(CommandError::Usage(format!("unknown option '{arg}'")));
        } else if input.is_some() {
            return Err(CommandError::Usage(format!("unexpected argument '{arg}'")));
        } else {
            input = Some(arg.as_str());
        }
    }

    let input = input.ok_or_else(|| {
        CommandError::Usage("missing <INPUT> (example: jitlab fallible 0)".to_string())
    })?;
    Ok((input, verbose))
}
