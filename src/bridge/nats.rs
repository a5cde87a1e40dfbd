//! NATS connection and the bridge's wildcard subscription.
//!
//! Reconnection is left to `async-nats`: the client keeps retrying in the
//! background and the subscription resumes on its own. Connection state
//! changes are only logged here.

use std::time::Duration;

use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use tracing::{debug, info, warn};

use super::BrokerMessage;
use crate::config::HubConfig;
use crate::error::HubError;

/// Broker settings taken from [`HubConfig`].
#[derive(Debug, Clone)]
pub struct NatsSettings {
    /// Server URL, e.g. `nats://localhost:4222`.
    pub url: String,
    /// Subject pattern for the single subscription, e.g. `tasks.>`.
    pub subject: String,
    /// Timeout for the initial connection.
    pub connect_timeout: Duration,
    /// Connection name reported to the server.
    pub client_name: String,
}

impl From<&HubConfig> for NatsSettings {
    fn from(config: &HubConfig) -> Self {
        Self {
            url: config.nats_url.clone(),
            subject: config.nats_subject.clone(),
            connect_timeout: Duration::from_secs(config.nats_connect_timeout_secs),
            client_name: config.nats_client_name.clone(),
        }
    }
}

/// Connects to the broker with unlimited reconnects.
///
/// # Errors
///
/// Returns [`HubError::BrokerConnect`] if the initial connection fails.
pub async fn connect(settings: &NatsSettings) -> Result<async_nats::Client, HubError> {
    info!(url = %settings.url, "connecting to NATS");
    let options = async_nats::ConnectOptions::new()
        .name(&settings.client_name)
        .connection_timeout(settings.connect_timeout)
        .max_reconnects(None::<usize>)
        .event_callback(|event| async move {
            match event {
                async_nats::Event::Disconnected => warn!("NATS disconnected"),
                async_nats::Event::Connected => info!("NATS connected"),
                other => debug!(event = %other, "NATS client event"),
            }
        });

    let client = async_nats::connect_with_options(settings.url.as_str(), options)
        .await
        .map_err(|e| HubError::BrokerConnect(e.to_string()))?;
    info!(url = %settings.url, "connected to NATS");
    Ok(client)
}

/// Opens the subscription on `subject` and adapts it into a stream of
/// [`BrokerMessage`]s for [`super::EventBridge::run`].
///
/// # Errors
///
/// Returns [`HubError::Subscribe`] if the server rejects the subscription.
pub async fn subscribe(
    client: &async_nats::Client,
    subject: &str,
) -> Result<BoxStream<'static, BrokerMessage>, HubError> {
    let subscriber = client
        .subscribe(subject.to_string())
        .await
        .map_err(|e| HubError::Subscribe {
            subject: subject.to_string(),
            reason: e.to_string(),
        })?;
    info!(subject, "subscribed to task events");

    Ok(subscriber
        .map(|message| BrokerMessage {
            subject: message.subject.to_string(),
            payload: message.payload,
        })
        .boxed())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_follow_config() {
        let config = HubConfig::default();
        let settings = NatsSettings::from(&config);
        assert_eq!(settings.url, "nats://localhost:4222");
        assert_eq!(settings.subject, "tasks.>");
        assert_eq!(settings.connect_timeout, Duration::from_secs(10));
        assert_eq!(settings.client_name, "taskboard-hub");
    }
}
