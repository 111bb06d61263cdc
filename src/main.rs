use std::process::ExitCode;

use plumleaf::DatasetError;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match plumleaf::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", err);
            if let DatasetError::ManifestInconsistent { report, .. } = &err {
                eprint!("{}", report);
            }
            ExitCode::FAILURE
        }
    }
}
