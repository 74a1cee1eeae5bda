//! Argument parsing shared by the binaries

use clap::Parser;

/// Parse command-line arguments, exiting with status 1 on usage errors
///
/// `--help` and `--version` still print to stdout and exit 0.
pub fn parse_or_exit<C: Parser>() -> C {
    match C::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            std::process::exit(1);
        }
        Err(e) => e.exit(),
    }
}
