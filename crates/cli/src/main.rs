use std::process::ExitCode;

fn main() -> ExitCode {
    schemadoc_cli::run()
}
