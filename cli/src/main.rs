use std::io::IsTerminal;
use std::process::ExitCode;

use clap::Parser;
use todo_cli::render::Renderer;
use todo_cli::{commands, logging, Cli};

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    if !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    let out = Renderer::new(cli.json);
    match commands::run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if !std::io::stderr().is_terminal() {
                colored::control::set_override(false);
            }
            out.error(&err);
            ExitCode::FAILURE
        }
    }
}
