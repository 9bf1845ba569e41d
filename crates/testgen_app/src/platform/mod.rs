mod app;
mod cli;
mod effects;
mod logging;
mod settings;
mod ui;

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use engine_logging::engine_warn;
use testgen_engine::BackendClient;

use cli::{Cli, Command, ConfigCommand};
use settings::Settings;

pub fn run() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let mut settings = Settings::load(cli.config.as_deref())?;
    settings.apply_env(|key| std::env::var(key).ok())?;
    settings.apply_overrides(&cli.overrides());
    if let Command::Generate(args) = &cli.command {
        settings.apply_generate_overrides(args);
    }
    let level = settings.level_filter();
    logging::initialize(
        settings.log_destination,
        level.unwrap_or(logging::DEFAULT_LEVEL),
    );
    if level.is_none() {
        engine_warn!("Unknown log level `{}`; using info", settings.log_level);
    }

    match cli.command {
        Command::Generate(args) => app::run_generate(&settings, args),
        Command::Health => {
            let reply = client(&settings)?.health()?;
            println!("{}", reply.status);
            if let Some(message) = reply.message {
                println!("{message}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Projects => {
            for project in client(&settings)?.list_projects()? {
                println!(
                    "{:>4}  {}  ({} test cases)",
                    project.id, project.name, project.test_case_count
                );
                if !project.description.is_empty() {
                    println!("      {}", project.description);
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Config(ConfigCommand::Show) => {
            let config = client(&settings)?.get_config()?;
            let pretty = ron::ser::PrettyConfig::new();
            let text = ron::ser::to_string_pretty(&config, pretty)
                .context("failed to format LLM configuration")?;
            println!("{text}");
            if let Err(err) = config.validate() {
                println!("warning: {err}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Config(ConfigCommand::Test) => {
            let reply = client(&settings)?.test_connection()?;
            println!(
                "{}: {}",
                reply.status,
                reply.message.as_deref().unwrap_or("no details")
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn client(settings: &Settings) -> anyhow::Result<BackendClient> {
    BackendClient::new(settings.api_settings()).context("failed to create backend client")
}
