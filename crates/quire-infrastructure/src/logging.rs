//! Tracing subscriber setup and the session activity layer.
//!
//! [`init_logging`] installs the process-wide subscriber. [`ActivityLayer`]
//! can be stacked on it to stream registry events (anything carrying a
//! `session` field) to an adapter, e.g. to show a live operation log.

use quire_core::config::LoggingConfig;
use quire_core::error::{QuireError, Result};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// Installs the global subscriber: `EnvFilter` (from `RUST_LOG`, else
/// `config.filter`), a plain or JSON formatter on stderr, and optionally an
/// [`ActivityLayer`] feeding `activity`.
///
/// # Returns
///
/// - `Ok(true)`: Subscriber installed
/// - `Ok(false)`: A global subscriber was already set; nothing changed
/// - `Err(QuireError::Config)`: `config.filter` is not a valid directive
pub fn init_logging(
    config: &LoggingConfig,
    activity: Option<mpsc::UnboundedSender<ActivityEvent>>,
) -> Result<bool> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.filter).map_err(|err| {
            QuireError::config(format!("Invalid log filter '{}': {}", config.filter, err))
        })?,
    };

    let (plain, json) = if config.json {
        let layer = fmt::layer().json().with_writer(std::io::stderr);
        (None, Some(layer))
    } else {
        let layer = fmt::layer().with_writer(std::io::stderr);
        (Some(layer), None)
    };

    Ok(tracing_subscriber::registry()
        .with(filter)
        .with(plain)
        .with(json)
        .with(activity.map(ActivityLayer::new))
        .try_init()
        .is_ok())
}

/// A registry event forwarded to an adapter.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ActivityEvent {
    pub session: String,
    /// Log level (INFO, DEBUG, WARN, ERROR)
    pub level: String,
    pub message: String,
    /// Remaining structured fields (`command`, `evicted`, `error`, ...)
    pub fields: HashMap<String, Value>,
    pub timestamp: String,
}

/// Forwards events that carry a `session` field to a channel.
pub struct ActivityLayer {
    sender: mpsc::UnboundedSender<ActivityEvent>,
}

impl ActivityLayer {
    pub fn new(sender: mpsc::UnboundedSender<ActivityEvent>) -> Self {
        Self { sender }
    }
}

impl<S> Layer<S> for ActivityLayer
where
    S: Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = HashMap::new();
        event.record(&mut FieldVisitor(&mut fields));

        let Some(session) = fields.remove("session") else {
            return;
        };
        let session = match session {
            Value::String(name) => name,
            other => other.to_string(),
        };
        let message = match fields.remove("message") {
            Some(Value::String(text)) => text,
            Some(other) => other.to_string(),
            None => String::new(),
        };

        // Receiver gone means nobody is listening any more.
        let _ = self.sender.send(ActivityEvent {
            session,
            level: event.metadata().level().to_string(),
            message,
            fields,
            timestamp: chrono::Utc::now().to_rfc3339(),
        });
    }
}

struct FieldVisitor<'a>(&'a mut HashMap<String, Value>);

impl Visit for FieldVisitor<'_> {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.0
            .insert(field.name().to_string(), serde_json::json!(format!("{:?}", value)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activity_layer_forwards_session_events_only() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let subscriber = tracing_subscriber::registry().with(ActivityLayer::new(tx));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("startup");
            tracing::debug!(
                session = "analysis",
                command = "insert code at 0 (_0000abcd)",
                evicted = 0u64,
                "Applied"
            );
            tracing::warn!(session = "analysis", seconds = 1.5, "Execution timed out");
        });

        let applied = rx.try_recv().unwrap();
        assert_eq!(applied.session, "analysis");
        assert_eq!(applied.level, "DEBUG");
        assert_eq!(applied.message, "Applied");
        assert_eq!(applied.fields["command"], "insert code at 0 (_0000abcd)");
        assert_eq!(applied.fields["evicted"], 0);

        let timeout = rx.try_recv().unwrap();
        assert_eq!(timeout.level, "WARN");
        assert_eq!(timeout.fields["seconds"], 1.5);

        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_invalid_filter_is_config_error() {
        // Only meaningful when RUST_LOG does not take precedence.
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let config = LoggingConfig {
            filter: "quire=[".to_string(),
            json: false,
        };
        assert!(matches!(init_logging(&config, None), Err(QuireError::Config(_))));
    }
}
