use clap::Parser;

use lapio_cli::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let general = lapio_cli::resolve_logging(&cli).await;
    if let Err(e) = lapio_cli::logging::init_tracing(&general) {
        eprintln!("warning: {e}");
    }
    lapio_core::metrics::describe_all();

    tracing::debug!(config = %cli.config.display(), "lapio starting");

    let code = match lapio_cli::run(cli).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("error: {e}");
            e.exit_code()
        }
    };
    std::process::exit(code);
}
