use pmoserver::{ServerBuilder, logs::LoggingOptions};
use pmosignage::SignageServerExt;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ========== PHASE 1 : Infrastructure ==========

    let mut server = ServerBuilder::new_configured().name("PMOSignage").build();
    server.init_logging(LoggingOptions::from_config()).await?;

    let config = pmoconfig::get_config();
    info!(config_dir = %config.directory(), "⚙️ Configuration loaded");

    server
        .add_route("/info", || async {
            serde_json::json!({
                "name": "PMOSignage",
                "version": env!("CARGO_PKG_VERSION"),
            })
        })
        .await;

    // ========== PHASE 2 : Catalogue d'affichage ==========

    info!("🖥️ Initializing signage catalog...");
    let manager = server.init_signage_api().await?;

    let sections = manager.sections().len();
    let assignments = manager.list_assignments()?.len();
    info!(sections, assignments, "✅ Signage catalog ready");

    server.add_redirect("/", "/swagger-ui/signage").await;

    // ========== PHASE 3 : Démarrage du serveur ==========

    info!("🌐 Starting HTTP server...");
    server.start().await?;

    info!("✅ PMOSignage is ready!");
    info!("Press Ctrl+C to stop...");
    server.wait().await;

    Ok(())
}
