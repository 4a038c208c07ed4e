// src/main.rs

use std::process::ExitCode;

use taskstream::{cli, exit_codes, logging, run};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = cli::parse();
    if let Err(err) = logging::init_logging(args.log_level) {
        eprintln!("taskstream: {err:?}");
        return ExitCode::from(exit_codes::CHILD_FAILURE as u8);
    }

    match run(args).await {
        Ok(code) => ExitCode::from(code as u8),
        Err(err) => {
            eprintln!("taskstream: {err}");
            ExitCode::from(err.exit_code() as u8)
        }
    }
}
