use anyhow::Result;
use clap::Parser;
use ndt_report::cli;
use tracing::error;

fn main() -> Result<()> {
    let args = cli::Args::parse();
    if let Err(err) = cli::dispatch(args) {
        if err.downcast_ref::<cli::AlreadyReported>().is_none() {
            error!("{:#}", err);
        }
        std::process::exit(1);
    }
    Ok(())
}
