// src/main.rs

use playjobs::types::JobStatus;
use playjobs::{cli, logging, run};

#[tokio::main]
async fn main() {
    match run_main().await {
        Ok(JobStatus::Completed) => {}
        Ok(_) => std::process::exit(1),
        Err(err) => {
            eprintln!("playjobs error: {err:?}");
            std::process::exit(2);
        }
    }
}

async fn run_main() -> anyhow::Result<JobStatus> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    run(args).await
}
