//! # Extension de pmoserver pour l'affichage dynamique
//!
//! Le trait [`SignageServerExt`] ajoute à `pmoserver::Server` l'API REST du
//! catalogue, le flux public et le flux SSE, sans que `pmoserver` connaisse
//! `pmosignage`.
//!
//! ```rust,no_run
//! use pmosignage::SignageServerExt;
//! use pmoserver::ServerBuilder;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let mut server = ServerBuilder::new_configured().build();
//! server.init_signage_api().await?;
//! server.start().await?;
//! # Ok(())
//! # }
//! ```

use crate::api::signage_api_router;
use crate::manager::SignageManager;
use crate::openapi::ApiDoc;
use anyhow::Result;
use pmoserver::Server;
use tracing::info;
use utoipa::OpenApi;

/// Extension trait pour monter l'API signage sur un serveur
#[async_trait::async_trait]
pub trait SignageServerExt {
    /// Monte l'API avec le gestionnaire global (initialisé depuis la configuration)
    ///
    /// Routes : `/api/signage/*`, Swagger UI : `/swagger-ui/signage`.
    async fn init_signage_api(&mut self) -> Result<SignageManager>;

    /// Monte l'API au-dessus d'un gestionnaire fourni
    async fn init_signage_api_with(&mut self, manager: SignageManager) -> Result<SignageManager>;
}

#[async_trait::async_trait]
impl SignageServerExt for Server {
    async fn init_signage_api(&mut self) -> Result<SignageManager> {
        let manager = SignageManager::get()?.clone();
        self.init_signage_api_with(manager).await
    }

    async fn init_signage_api_with(&mut self, manager: SignageManager) -> Result<SignageManager> {
        info!("Initializing signage API...");

        let router = signage_api_router(manager.clone());
        self.add_openapi(router, ApiDoc::openapi(), "signage").await;

        info!("✅ Signage API registered at /api/signage");
        info!("   Public feed at /api/signage/media_with_settings");
        info!("   Swagger UI available at /swagger-ui/signage");

        Ok(manager)
    }
}
