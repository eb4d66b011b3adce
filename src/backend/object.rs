//! Native object emission for the host target.
//!
//! The object writer hands the textual IR to the system `llc`, the
//! LLVM static compiler, which owns target selection and encoding.
//! A missing or failing tool surfaces as a backend error; nothing in
//! the core depends on it.

use std::path::Path;
use std::process::Command;

use crate::diagnostic::Diagnostic;

/// Write `ir_text` as a native object file for the host triple.
pub fn write_object(ir_text: &str, path: &Path) -> Result<(), Diagnostic> {
    let ir_path = std::env::temp_dir().join(format!("yolang-{}.ll", std::process::id()));
    std::fs::write(&ir_path, ir_text)
        .map_err(|e| Diagnostic::backend(format!("can't write '{}': {}", ir_path.display(), e)))?;

    let result = Command::new("llc")
        .arg("-filetype=obj")
        .arg("-o")
        .arg(path)
        .arg(&ir_path)
        .output();
    let _ = std::fs::remove_file(&ir_path);

    let output = result.map_err(|e| {
        Diagnostic::backend(format!(
            "can't run 'llc' to emit object code: {}",
            e
        ))
        .with_note("object emission needs the LLVM static compiler (llc) on PATH".to_string())
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Diagnostic::backend(format!(
            "llc rejected the generated IR: {}",
            stderr.trim()
        )));
    }

    Ok(())
}
