use std::process::ExitCode;

use tracing::error;

fn main() -> ExitCode {
    match tetherd::run_daemon() {
        Ok(()) => ExitCode::SUCCESS,
        Err(launch_error) => {
            error!(error = %launch_error, "daemon terminated with an error");
            ExitCode::FAILURE
        }
    }
}
