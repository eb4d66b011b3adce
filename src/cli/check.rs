use std::path::PathBuf;
use std::process;

use clap::Args;

use super::read_source;

#[derive(Args)]
pub struct CheckArgs {
    /// Input source file (default: input.txt)
    #[arg(default_value = "input.txt")]
    pub input: PathBuf,
}

pub fn cmd_check(args: CheckArgs) {
    let source = read_source(&args.input);
    let filename = args.input.to_string_lossy().to_string();

    match yolang::compile(&source) {
        Ok(_) => eprintln!("OK: {}", args.input.display()),
        Err(diagnostic) => {
            diagnostic.render(&filename, &source);
            process::exit(1);
        }
    }
}
