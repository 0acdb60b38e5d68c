//! Workspace name to API client mapping, built once at startup.

use crate::config::Settings;
use crate::error::{AggregatorError, Result};
use crate::slack::{MessagingApi, SlackClient, new_hyper_client};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Immutable set of workspace clients: one destination, any number of named sources.
///
/// Shared behind an `Arc`; there is no way to add or replace a client after
/// construction.
pub struct WorkspaceRegistry {
    destination: Arc<dyn MessagingApi>,
    sources: BTreeMap<String, Arc<dyn MessagingApi>>,
}

impl WorkspaceRegistry {
    pub fn new(
        destination: Arc<dyn MessagingApi>,
        sources: BTreeMap<String, Arc<dyn MessagingApi>>,
    ) -> Self {
        Self {
            destination,
            sources,
        }
    }

    /// Build Slack clients for every credential in `settings`, sharing one HTTP client.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let http = new_hyper_client()?;

        let destination: Arc<dyn MessagingApi> = Arc::new(SlackClient::with_client(
            http.clone(),
            &settings.destination_credential(),
        ));

        let sources = settings
            .source_credentials()
            .into_iter()
            .map(|credential| {
                let client: Arc<dyn MessagingApi> =
                    Arc::new(SlackClient::with_client(http.clone(), &credential));
                (credential.name, client)
            })
            .collect::<BTreeMap<_, _>>();

        tracing::info!(sources = sources.len(), "Workspace registry initialized");

        Ok(Self::new(destination, sources))
    }

    pub fn destination_client(&self) -> Arc<dyn MessagingApi> {
        self.destination.clone()
    }

    pub fn source_client(&self, name: &str) -> Result<Arc<dyn MessagingApi>> {
        self.sources.get(name).cloned().ok_or_else(|| {
            AggregatorError::Config(format!("no token registered for workspace: {}", name))
        })
    }

    /// Registered source workspace names, sorted.
    pub fn source_names(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }
}
