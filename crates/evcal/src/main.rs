mod responder;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use evcal_engine::config::ConfigLoader;
use evcal_engine::config::schema::{LogFormat, LoggingConfig};
use evcal_engine::pipeline::{Mode, Pipeline};
use evcal_h::ChromiumLauncher;
use responder::StdinResponder;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "evcal", version, about = "Collect VRChat event posts and publish them as calendars")]
struct Args {
    /// Stages to run
    #[arg(long, value_enum, default_value_t = ModeArg::All)]
    mode: ModeArg,

    /// Configuration file (defaults to ./evcal.yaml, then ~/.evcal/config.yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Launch the browser in visible mode (not headless)
    #[arg(long)]
    visible: bool,

    /// Log output format; overrides the config file
    #[arg(long, value_enum)]
    log_format: Option<LogFormatArg>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Collect,
    Process,
    Integrate,
    Publish,
    All,
}

impl From<ModeArg> for Mode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Collect => Mode::Collect,
            ModeArg::Process => Mode::Process,
            ModeArg::Integrate => Mode::Integrate,
            ModeArg::Publish => Mode::Publish,
            ModeArg::All => Mode::All,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatArg {
    Text,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(format: LogFormatArg) -> Self {
        match format {
            LogFormatArg::Text => LogFormat::Text,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

/// Logs go to stderr; `RUST_LOG` wins over the configured level.
fn init_logging(config: &LoggingConfig, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run(args: Args) -> anyhow::Result<bool> {
    let config = ConfigLoader::load(args.config.as_deref())
        .await
        .context("Failed to load configuration")?;
    let format = args.log_format.map(LogFormat::from).unwrap_or(config.logging.format);
    init_logging(&config.logging, format);

    let mut launcher = ChromiumLauncher::new(config.browser.clone());
    if args.visible {
        launcher = launcher.visible();
    }

    let mode = Mode::from(args.mode);
    let report = Pipeline::new(config, Box::new(launcher), Box::new(StdinResponder))
        .run(mode)
        .await;
    for stage in &report.stages {
        tracing::info!("{}: {:?}", stage.stage, stage.outcome);
    }
    Ok(!report.failed())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mode_and_flags() {
        let args = Args::parse_from([
            "evcal",
            "--mode",
            "integrate",
            "--config",
            "custom.yaml",
            "--visible",
            "--log-format",
            "json",
        ]);
        assert_eq!(Mode::from(args.mode), Mode::Integrate);
        assert_eq!(args.config, Some(PathBuf::from("custom.yaml")));
        assert!(args.visible);
        assert!(matches!(args.log_format, Some(LogFormatArg::Json)));
    }

    #[test]
    fn defaults_to_all_stages() {
        let args = Args::parse_from(["evcal"]);
        assert_eq!(Mode::from(args.mode), Mode::All);
        assert!(!args.visible);
        assert!(args.log_format.is_none());
    }

    #[test]
    fn rejects_unknown_mode() {
        assert!(Args::try_parse_from(["evcal", "--mode", "everything"]).is_err());
    }
}
