//! # pmoserver - Serveur web haut niveau basé sur Axum
//!
//! Cette crate fournit une abstraction simple pour exposer les API de
//! PMOSignage avec Axum.
//!
//! ## Fonctionnalités
//!
//! - 🚀 **API de haut niveau** : routes JSON, handlers avec état, redirections
//! - 📡 **Logs en temps réel** : buffer circulaire exposé en SSE (`/log-sse`)
//! - 📚 **Documentation OpenAPI** : Swagger UI par API montée
//! - ⚡ **Arrêt gracieux** : gestion propre de Ctrl+C
//!
//! ## Architecture
//!
//! - [`server`] : serveur principal et builder
//! - [`logs`] : système de logs (tracing) consultable via HTTP
//!
//! Les crates métier étendent [`Server`] par des traits d'extension
//! (`pmosignage::SignageServerExt`), sans que `pmoserver` les connaisse.
//!
//! ## Exemple d'utilisation
//!
//! ```rust,no_run
//! use pmoserver::{ServerBuilder, logs::LoggingOptions};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut server = ServerBuilder::new("MyServer", "localhost", 8080).build();
//!     server.init_logging(LoggingOptions::default()).await?;
//!
//!     server.add_route("/api/status", || async {
//!         serde_json::json!({"status": "ok"})
//!     }).await;
//!
//!     server.start().await?;
//!     server.wait().await;
//!     Ok(())
//! }
//! ```

pub mod logs;
pub mod server;

pub use logs::{LogState, LoggingOptions, SseLayer, log_dump, log_sse};
pub use server::{Server, ServerBuilder, ServerInfo};
