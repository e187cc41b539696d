//! MySQL Database Provider - host entry point.
//!
//! Loads a databases configuration, registers a provider for every `mysql`
//! entry, and runs one operation against the named provider. Results are
//! printed to stdout as JSON; logs go to stderr.

use clap::Parser;
use mysql_db_provider::config::{Config, DatabasesConfig};
use mysql_db_provider::registry::{DatabaseProvider, ProviderRegistry, spawn_registration};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();

    init_tracing(&config);

    if config.sql.is_none() && !config.show_schema && !config.verify {
        eprintln!("Error: nothing to do.");
        eprintln!();
        eprintln!("Usage: mysql-db-provider --config <FILE> --provider <NAME> --sql <SQL>");
        eprintln!("       mysql-db-provider --config <FILE> --provider <NAME> --show-schema");
        eprintln!("       mysql-db-provider --config <FILE> --provider <NAME> --verify");
        std::process::exit(1);
    }

    info!(
        config = %config.config.display(),
        "Starting MySQL provider host v{}",
        env!("CARGO_PKG_VERSION")
    );

    let databases = DatabasesConfig::load(&config.config)?;
    let registry = ProviderRegistry::new();

    let registered = spawn_registration(registry.clone(), databases).await?;
    info!(providers = ?registered, "Providers registered");

    let provider = registry.get(&config.provider).await?;

    if config.verify {
        let version = provider.verify_connectivity().await?;
        info!(provider = %config.provider, server_version = %version, "Connectivity verified");
        if config.sql.is_none() && !config.show_schema {
            println!("{}", serde_json::json!({ "server_version": version }));
        }
    }

    let output = if let Some(sql) = &config.sql {
        Some(serde_json::to_string_pretty(&provider.execute_sql(sql).await?)?)
    } else if config.show_schema {
        Some(serde_json::to_string_pretty(&provider.show_schema().await?)?)
    } else {
        None
    };

    if let Some(json) = output {
        println!("{}", json);
    }

    Ok(())
}
