use std::path::PathBuf;
use std::process;

use clap::Args;

use super::read_source;

#[derive(Args)]
pub struct BuildArgs {
    /// Input source file (default: input.txt)
    #[arg(default_value = "input.txt")]
    pub input: PathBuf,
    /// Output .ll file (default: output.ll)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Also emit a native object file next to the IR
    #[arg(long)]
    pub object: bool,
}

impl Default for BuildArgs {
    fn default() -> Self {
        Self {
            input: PathBuf::from("input.txt"),
            output: None,
            object: false,
        }
    }
}

pub fn cmd_build(args: BuildArgs) {
    let BuildArgs {
        input,
        output,
        object,
    } = args;

    let source = read_source(&input);
    let filename = input.to_string_lossy().to_string();
    let out_path = output.unwrap_or_else(|| PathBuf::from("output.ll"));

    if let Err(diagnostic) = yolang::save_ir_to_path(&source, &out_path) {
        diagnostic.render(&filename, &source);
        process::exit(1);
    }
    eprintln!("Compiled -> {}", out_path.display());

    if object {
        let obj_path = out_path.with_extension("o");
        if let Err(diagnostic) = yolang::save_object_to_path(&source, &obj_path) {
            diagnostic.render(&filename, &source);
            process::exit(1);
        }
        eprintln!("Object -> {}", obj_path.display());
    }
}
