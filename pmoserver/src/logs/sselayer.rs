//! Layer `tracing` qui alimente le [`LogState`]

use std::fmt::{self, Write as _};
use std::time::SystemTime;

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

use super::{LogEntry, LogState};

/// Recopie chaque évènement dans le buffer circulaire et le diffuse
pub struct SseLayer {
    state: LogState,
}

impl SseLayer {
    pub fn new(state: LogState) -> Self {
        Self { state }
    }
}

impl<S: Subscriber> Layer<S> for SseLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let meta = event.metadata();
        self.state.push(LogEntry {
            timestamp: SystemTime::now(),
            level: meta.level().as_str().to_string(),
            target: meta.target().to_string(),
            message: visitor.finish(),
        });
    }
}

/// Message principal suivi des champs `clé=valeur`
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn finish(self) -> String {
        if self.message.is_empty() {
            self.fields.trim_start().to_string()
        } else {
            self.message + &self.fields
        }
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{:?}", value);
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;
    use tracing_subscriber::{Registry, filter::LevelFilter, layer::SubscriberExt, reload};

    #[test]
    fn test_events_are_captured_with_fields() {
        let (_layer, handle) = reload::Layer::<LevelFilter, Registry>::new(LevelFilter::TRACE);
        let state = LogState::new(10, Level::TRACE, handle);
        let subscriber = Registry::default().with(SseLayer::new(state.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(section = "header_video", removed = 2, "Section cleared");
            tracing::warn!("plain message");
        });

        let entries = state.dump();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].level, "INFO");
        assert_eq!(
            entries[0].message,
            "Section cleared section=header_video removed=2"
        );
        assert_eq!(entries[1].level, "WARN");
        assert_eq!(entries[1].message, "plain message");
    }
}
