pub mod ast;
pub mod backend;
pub mod codegen;
pub mod diagnostic;
pub mod grammar;
pub mod parser;
pub mod span;
pub mod syntax;
pub mod types;

use std::path::Path;

use ast::Program;
use backend::Module;
use diagnostic::Diagnostic;

/// Parse a source string into a program.
pub fn parse_source(source: &str) -> Result<Program, Diagnostic> {
    let parser = parser::language_parser()?;
    parser.parse(source)
}

/// Run the full pipeline: lex, parse, and lower to a backend module.
pub fn compile(source: &str) -> Result<Module, Diagnostic> {
    let program = parse_source(source)?;
    codegen::generate(&program)
}

/// Compile and render the module as textual IR.
pub fn compile_to_ir_text(source: &str) -> Result<String, Diagnostic> {
    let module = compile(source)?;
    Ok(backend::print::print_module(&module))
}

/// Compile and write textual IR to a file.
pub fn save_ir_to_path(source: &str, path: &Path) -> Result<(), Diagnostic> {
    let text = compile_to_ir_text(source)?;
    std::fs::write(path, text)
        .map_err(|e| Diagnostic::backend(format!("can't write '{}': {}", path.display(), e)))
}

/// Compile and write a native object file for the host target.
pub fn save_object_to_path(source: &str, path: &Path) -> Result<(), Diagnostic> {
    let text = compile_to_ir_text(source)?;
    backend::object::write_object(&text, path)
}
