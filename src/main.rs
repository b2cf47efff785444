use clap::Parser;
use course_catalog::app::commands;
use course_catalog::utils::error::ErrorSeverity;
use course_catalog::utils::{logger, validation::Validate};
use course_catalog::{ApiSettings, CliConfig, HttpCatalogApi, TomlConfig};

async fn run(cli: &CliConfig, file_config: Option<&TomlConfig>) -> course_catalog::Result<()> {
    let settings = ApiSettings::resolve(
        file_config,
        cli.api_base_url.as_deref(),
        cli.timeout_seconds,
        cli.auth_token.as_deref(),
    )?;
    let api = HttpCatalogApi::from_config(&settings)?;
    let preset = file_config
        .map(TomlConfig::filter_preset)
        .unwrap_or_default();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    commands::run(api, &cli.command, preset, &mut out).await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let file_config = match &cli.config {
        Some(path) => match TomlConfig::from_file(path) {
            Ok(config) => Some(config),
            Err(e) => {
                eprintln!("❌ Failed to load config file '{}': {}", path.display(), e);
                eprintln!("💡 Make sure the file exists and is valid TOML format");
                std::process::exit(1);
            }
        },
        None => None,
    };

    let log_level = file_config.as_ref().and_then(|c| c.log_level());
    if cli.json_logs || file_config.as_ref().is_some_and(|c| c.json_logs()) {
        logger::init_json_logger(cli.verbose, log_level);
    } else {
        logger::init_cli_logger(cli.verbose, log_level);
    }

    tracing::info!("Starting course catalog CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    if let Some(config) = &file_config {
        if let Err(e) = config.validate() {
            tracing::error!("❌ Configuration validation failed: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    }

    let outcome = run(&cli, file_config.as_ref()).await;

    if let Err(e) = outcome {
        tracing::error!(
            "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    Ok(())
}
