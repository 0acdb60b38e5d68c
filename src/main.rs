use anyhow::{Context, bail};
use slack_aggregator::RelayEngine;
use slack_aggregator::bootstrap::ensure_aggregate_channels;
use slack_aggregator::config::{Settings, load_settings};
use slack_aggregator::correlation::{CorrelationLog, JsonlCorrelationLog, MemoryCorrelationLog};
use slack_aggregator::event::ChannelTypeCode;
use slack_aggregator::registry::WorkspaceRegistry;
use slack_aggregator::slack::{ChannelId, MessageTs, UserId};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: slack-aggregator [bootstrap | relay <workspace> <channel-id> <channel-name> <ts> [counterpart-user-id]]";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize rustls crypto provider
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("slack_aggregator=debug,slack_morphism=info")),
        )
        .with_target(true)
        .with_line_number(true)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    let settings = load_settings().context("failed to load settings")?;
    tracing::info!(sources = settings.from.len(), "Configuration loaded");

    let registry = Arc::new(WorkspaceRegistry::from_settings(&settings)?);

    match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        [] | ["bootstrap"] => bootstrap(&registry).await,
        ["relay", workspace, channel_id, channel_name, ts, rest @ ..] if rest.len() <= 1 => {
            let channel_id = ChannelId::new(*channel_id);
            let channel_type = ChannelTypeCode::from_channel_id(&channel_id)
                .with_context(|| format!("unrecognised channel id {}", channel_id.as_str()))?;
            let counterpart = rest.first().map(|id| UserId::new(*id));

            let engine = RelayEngine::new(registry, correlation_log(&settings).await?);
            let outcome = engine
                .relay_message_at(
                    workspace,
                    &channel_id,
                    channel_name,
                    channel_type,
                    counterpart,
                    &MessageTs::new(*ts),
                )
                .await?;
            tracing::info!(posts = outcome.posted.len(), "Relay finished");
            Ok(())
        }
        _ => bail!(USAGE),
    }
}

async fn bootstrap(registry: &WorkspaceRegistry) -> anyhow::Result<()> {
    let dest = registry.destination_client();
    let report = ensure_aggregate_channels(dest.as_ref(), registry.source_names()).await?;

    for (name, error) in &report.failed {
        tracing::warn!(channel = %name, error = %error, "Aggregate channel unavailable");
    }
    if !report.is_complete() {
        bail!("{} aggregate channel(s) could not be created", report.failed.len());
    }
    Ok(())
}

async fn correlation_log(settings: &Settings) -> anyhow::Result<Arc<dyn CorrelationLog>> {
    match &settings.log.path {
        Some(path) => {
            let log = JsonlCorrelationLog::new(path.clone());
            log.ensure_parent()
                .await
                .with_context(|| format!("failed to prepare log at {}", path.display()))?;
            tracing::info!(path = %path.display(), "Writing correlation log");
            Ok(Arc::new(log))
        }
        None => {
            tracing::warn!("No log.path configured, correlation records kept in memory only");
            Ok(Arc::new(MemoryCorrelationLog::new()))
        }
    }
}
