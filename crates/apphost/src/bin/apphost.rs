use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .try_init();

    if let Err(error) = apphost::cli::run_from_env().await {
        eprintln!("error: {error}");
        std::process::exit(error.exit_code());
    }
}
