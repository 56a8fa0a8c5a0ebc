//! SSE pour notifier les écrans des modifications du catalogue.
//!
//! Route : `GET /api/signage/events`. Chaque évènement porte le nom
//! `media_updated` ou `settings_updated` ; le client relit alors
//! `/api/signage/media_with_settings`.

use async_stream::stream;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;

use crate::manager::SignageManager;

/// Payload JSON d'un évènement
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct EventPayload {
    /// `media_updated` ou `settings_updated`
    pub kind: String,
    /// Entité modifiée (matériau, groupe ou section), si connue
    pub subject: Option<String>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Handler SSE : diffuse les évènements de modification.
#[utoipa::path(
    get,
    path = "/api/signage/events",
    tag = "signage",
    responses(
        (status = 200, description = "Flux SSE des modifications (media_updated, settings_updated)", content_type = "text/event-stream")
    )
)]
pub async fn signage_events_sse(State(manager): State<SignageManager>) -> impl IntoResponse {
    let mut rx = manager.subscribe();

    let stream = stream! {
        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "SSE client lagging behind signage events");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            let payload = EventPayload {
                kind: event.kind.as_str().to_string(),
                subject: event.subject.clone(),
                timestamp: chrono::DateTime::<chrono::Utc>::from(event.timestamp),
            };

            if let Ok(json) = serde_json::to_string(&payload) {
                yield Ok::<_, axum::Error>(Event::default().event(event.kind.as_str()).data(json));
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Router prêt à être fusionné dans le router de l'API
pub fn signage_events_router() -> Router<SignageManager> {
    Router::new().route("/events", get(signage_events_sse))
}
