use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let matches = omi_cli::command().get_matches();
    match omi_cli::execute(&matches).await {
        Ok(report) => {
            tracing::info!(
                "Done: {} emitters created, {} nodes skipped",
                report.migrated.len(),
                report.partial.len()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
