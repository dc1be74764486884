use std::process::ExitCode;

fn main() -> ExitCode {
    brrtvalidator::cli::run_cli()
}
