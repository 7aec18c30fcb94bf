// src/main.rs

use anyhow::Result;
use clap::Parser;
use fleetpack::Config;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

/// Load the config file, then let `--db-path` win over everything
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(db_path) = &cli.db_path {
        config.database.path = db_path.clone();
    }
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    // RUST_LOG wins; otherwise use the configured filter
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Some(Commands::Init) => commands::cmd_init(&config),
        Some(Commands::Apply { file }) => commands::cmd_apply(&config, &file),
        Some(Commands::Get { what, output }) => commands::cmd_get(&config, &what, output),
        Some(Commands::DeletePack { name }) => commands::cmd_delete_pack(&config, &name),
        Some(Commands::DeleteLabel { name }) => commands::cmd_delete_label(&config, &name),
        Some(Commands::DeleteQuery { name }) => commands::cmd_delete_query(&config, &name),
        Some(Commands::DisablePack { name }) => {
            commands::cmd_set_pack_disabled(&config, &name, true)
        }
        Some(Commands::EnablePack { name }) => {
            commands::cmd_set_pack_disabled(&config, &name, false)
        }
        Some(Commands::HostsForPack { name, page }) => {
            commands::cmd_hosts_for_pack(&config, &name, &page, false)
        }
        Some(Commands::ExplicitHosts { name, page }) => {
            commands::cmd_hosts_for_pack(&config, &name, &page, true)
        }
        Some(Commands::PacksForHost { hostname }) => {
            commands::cmd_packs_for_host(&config, &hostname)
        }
        Some(Commands::LabelsForPack { name }) => commands::cmd_labels_for_pack(&config, &name),
        None => {
            // No command provided, show help
            println!("fleetpack v{}", env!("CARGO_PKG_VERSION"));
            println!("Run 'fleetpack --help' for usage information");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_db_path_flag_overrides_config() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("absent.toml");
        let cli = Cli::parse_from([
            "fleetpack",
            "--config",
            config_path.to_str().unwrap(),
            "--db-path",
            "/tmp/other.db",
            "init",
        ]);

        let config = load_config(&cli).unwrap();
        assert_eq!(config.db_path().unwrap(), "/tmp/other.db");
    }

    #[test]
    fn test_parse_hosts_for_pack_paging() {
        let cli = Cli::parse_from(["fleetpack", "hosts-for-pack", "base", "--per-page", "10"]);
        match cli.command {
            Some(Commands::HostsForPack { name, page }) => {
                assert_eq!(name, "base");
                assert_eq!(page.page, 0);
                assert_eq!(page.per_page, 10);
            }
            _ => panic!("expected hosts-for-pack"),
        }
    }

    #[test]
    fn test_parse_get_output_format() {
        let cli = Cli::parse_from(["fleetpack", "get", "--output", "json", "packs"]);
        match cli.command {
            Some(Commands::Get { what, output }) => {
                assert!(matches!(what, cli::GetCommands::Packs));
                assert_eq!(output, cli::OutputFormat::Json);
            }
            _ => panic!("expected get"),
        }
    }
}
