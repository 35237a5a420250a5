use std::process::ExitCode;

fn main() -> ExitCode {
    promokit_cli::run()
}
