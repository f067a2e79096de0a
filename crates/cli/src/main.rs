use std::process::ExitCode;

fn main() -> ExitCode {
    recograph_cli::run()
}
