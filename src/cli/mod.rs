pub mod build;
pub mod check;

use std::path::Path;
use std::process;

/// Read a source file or exit with a diagnostic.
pub fn read_source(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("error: can't read '{}': {}", path.display(), e);
            process::exit(1);
        }
    }
}
