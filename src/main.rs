mod cli;

use clap::{Parser, Subcommand};

use cli::build::BuildArgs;
use cli::check::CheckArgs;

#[derive(Parser)]
#[command(name = "yolang", version, about = "The Yolang compiler")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a source file to textual IR (and optionally an object file)
    Build(BuildArgs),
    /// Run the pipeline without writing any output
    Check(CheckArgs),
}

fn main() {
    let cli = Cli::parse();

    // Bare invocation keeps the classic contract: input.txt -> output.ll.
    match cli.command.unwrap_or(Command::Build(BuildArgs::default())) {
        Command::Build(args) => cli::build::cmd_build(args),
        Command::Check(args) => cli::check::cmd_check(args),
    }
}
