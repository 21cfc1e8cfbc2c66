use std::process::ExitCode;

use clap::Parser;
use shaderport_app::ExportArgs;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = ExportArgs::parse();
    match shaderport_app::run(&args) {
        Ok(report) if report.is_success() => ExitCode::SUCCESS,
        Ok(report) => {
            for (hash, err) in &report.failed {
                log::error!("{hash}: {err}");
            }
            ExitCode::FAILURE
        }
        Err(err) => {
            log::error!("Export aborted: {err}");
            ExitCode::FAILURE
        }
    }
}
