use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod run;
mod session;

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "artifetch=info",
        1 => "artifetch=debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let app = cli::App::parse();
    init_tracing(app.verbose);

    match run::run(app).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.downcast_ref::<artifetch::Error>().is_some_and(artifetch::Error::is_cancelled) => {
            tracing::warn!("cancelled");
            ExitCode::from(130)
        }
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
