use chrono::NaiveDateTime;
use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};

use crate::backoff::{self, RetryPolicy};
use crate::entities::appointment;

#[derive(Debug, Clone, Serialize)]
pub struct IntegrationEvent {
    pub event: &'static str,
    pub tenant_id: i32,
    pub occurred_at: NaiveDateTime,
    pub data: serde_json::Value,
}

impl IntegrationEvent {
    pub fn appointment_created(model: &appointment::Model) -> Self {
        Self::for_appointment("appointment.created", model)
    }

    pub fn appointment_status_changed(model: &appointment::Model) -> Self {
        Self::for_appointment("appointment.status_changed", model)
    }

    fn for_appointment(event: &'static str, model: &appointment::Model) -> Self {
        Self {
            event,
            tenant_id: model.tenant_id,
            occurred_at: chrono::Utc::now().naive_utc(),
            data: serde_json::to_value(model).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("webhook responded with {0}")]
    Status(StatusCode),

    #[error("webhook request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl DeliveryError {
    /// Rate limits, server errors and connection failures are worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            DeliveryError::Status(status) => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            DeliveryError::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
        }
    }
}

/// Posts tenant events to the tenant's configured webhook URL.
#[derive(Clone)]
pub struct WebhookDispatcher {
    client: reqwest::Client,
    policy: RetryPolicy,
}

impl WebhookDispatcher {
    pub fn new(policy: RetryPolicy) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self { client, policy }
    }

    /// Fire-and-forget: delivery runs in its own task and never fails the caller.
    pub fn dispatch(&self, webhook_url: Option<&str>, event: IntegrationEvent) {
        let Some(url) = webhook_url.filter(|u| !u.trim().is_empty()) else {
            return;
        };
        let url = url.to_string();
        let dispatcher = self.clone();
        tokio::spawn(async move {
            match dispatcher.deliver(&url, &event).await {
                Ok(()) => {
                    info!("Delivered {} for tenant {}", event.event, event.tenant_id);
                    crate::metrics::increment_webhook_deliveries(event.event);
                }
                Err(e) => {
                    error!(
                        "Failed to deliver {} for tenant {}: {}",
                        event.event, event.tenant_id, e
                    );
                    crate::metrics::increment_webhook_failures(event.event);
                }
            }
        });
    }

    pub async fn deliver(&self, url: &str, event: &IntegrationEvent) -> Result<(), DeliveryError> {
        let client = &self.client;
        backoff::retry(
            &self.policy,
            || async move {
                let res = client.post(url).json(event).send().await?;
                if res.status().is_success() {
                    Ok(())
                } else {
                    Err(DeliveryError::Status(res.status()))
                }
            },
            DeliveryError::is_retryable,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_statuses() {
        assert!(DeliveryError::Status(StatusCode::TOO_MANY_REQUESTS).is_retryable());
        assert!(DeliveryError::Status(StatusCode::BAD_GATEWAY).is_retryable());
        assert!(!DeliveryError::Status(StatusCode::BAD_REQUEST).is_retryable());
        assert!(!DeliveryError::Status(StatusCode::NOT_FOUND).is_retryable());
    }

    #[tokio::test]
    async fn test_dispatch_without_url_is_noop() {
        let dispatcher = WebhookDispatcher::new(RetryPolicy::default());
        let event = IntegrationEvent {
            event: "appointment.created",
            tenant_id: 1,
            occurred_at: chrono::Utc::now().naive_utc(),
            data: serde_json::json!({}),
        };
        dispatcher.dispatch(None, event.clone());
        dispatcher.dispatch(Some("  "), event);
    }
}
