use std::process::ExitCode;

fn main() -> ExitCode {
    kubesmith_cli::run()
}
