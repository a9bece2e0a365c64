use anyhow::Result;
use clap::Parser;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = todocal::cli::Cli::parse();
    init_tracing(cli.log_filter.clone())?;

    let config = todocal::config::from_cli(&cli)?;
    tracing::debug!(data_dir = %config.data_dir().display(), "resolved data directory");
    let command = cli.command.unwrap_or(todocal::cli::CliCommand::List);
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    todocal::commands::execute(&config, command, &mut handle)
}

/// Logs go to stderr so command output stays pipeable.
fn init_tracing(filter: Option<String>) -> Result<()> {
    let filter = filter.unwrap_or_else(|| "warn".to_string());
    let directive: Directive = filter.parse()?;
    let env_filter = EnvFilter::builder()
        .with_default_directive(directive)
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
    Ok(())
}
