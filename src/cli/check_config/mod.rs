//! Check-config command - load, validate and print the effective configuration

use anyhow::Context;
use clap::Args;

use crate::config::AppConfig;

#[derive(Debug, Args)]
pub struct CheckConfigArgs {
    /// Print the effective configuration as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: CheckConfigArgs) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;

    println!("{}", render(&config, args.json)?);

    Ok(())
}

/// API keys are masked in the output
fn render(config: &AppConfig, json: bool) -> anyhow::Result<String> {
    let mut config = config.clone();
    if config.embedding.api_key.is_some() {
        config.embedding.api_key = Some("****".to_string());
    }

    if json {
        return Ok(serde_json::to_string_pretty(&config)?);
    }

    Ok(format!(
        "configuration OK\n\
         server:       {}:{}\n\
         store:        {} (timeout {}ms)\n\
         embedding:    {:?} (timeout {}ms)\n\
         similarity:   {:?} (max {} entries)\n\
         prompt_cache: enabled={} threshold={} namespace={}\n\
         modification: threshold={} namespace={}\n\
         metrics:      enabled={}",
        config.server.host,
        config.server.port,
        config.store.backend,
        config.store.operation_timeout_ms,
        config.embedding.provider,
        config.embedding.timeout_ms,
        config.similarity.backend,
        config.similarity.max_entries,
        config.prompt_cache.enabled,
        config.prompt_cache.semantic_threshold,
        config.prompt_cache.namespace,
        config.modification.threshold,
        config.modification.namespace,
        config.metrics.enabled,
    ))
}
