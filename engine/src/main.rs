// Scout
// Main entry point for the scout binary

use clap::Parser;
use scout_engine::cli::{Cli, Command, ConfigAction};
use scout_engine::config::Config;
use scout_engine::handlers::{
    handle_compile, handle_config_show, handle_config_validate, handle_find, handle_list,
    handle_resolve, OutputFormat,
};
use scout_engine::platform;
use scout_engine::telemetry::{init_telemetry_with_format, LogFormat};

fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Determine output format; --json also makes log lines JSON
    let (format, log_format) = if cli.json {
        (OutputFormat::Json, LogFormat::Json)
    } else {
        (OutputFormat::Text, LogFormat::for_build())
    };

    // Validation reads the file itself, so a broken config can be reported
    if let Command::Config {
        action: ConfigAction::Validate,
    } = &cli.command
    {
        init_telemetry_with_format(cli.log.as_deref().unwrap_or("info"), log_format);
        return handle_config_validate(cli.config.as_deref(), format);
    }

    // Load configuration (or use custom path if provided)
    let config = if let Some(config_path) = &cli.config {
        Config::load_from_path(config_path)?
    } else {
        Config::load_or_create()?
    };

    // --log overrides the configured level; RUST_LOG overrides both
    init_telemetry_with_format(
        cli.log.as_deref().unwrap_or(&config.core.log_level),
        log_format,
    );

    let version = env!("CARGO_PKG_VERSION");
    let commit = env!("GIT_COMMIT_HASH");
    let timestamp = env!("BUILD_TIMESTAMP");
    tracing::debug!(
        "Scout v{} ({} - {}) on {}",
        version,
        commit,
        timestamp,
        platform::platform_name()
    );

    // Handle commands
    match cli.command {
        Command::List {
            roots,
            prefix,
            fallback,
            include_private,
        } => handle_list(roots, prefix, fallback, include_private, &config, format),

        Command::Find {
            roots,
            prefix,
            subclass_of,
            include_private,
            fallback,
        } => handle_find(
            roots,
            prefix,
            subclass_of,
            include_private,
            fallback,
            &config,
            format,
        ),

        Command::Resolve {
            spec,
            paths,
            aliases,
        } => handle_resolve(spec, paths, aliases, &config, format),

        Command::Compile { file } => handle_compile(file, format),

        Command::Config { action } => match action {
            ConfigAction::Show => handle_config_show(&config, format),
            ConfigAction::Validate => handle_config_validate(cli.config.as_deref(), format),
        },
    }
}
