//! # pmosignage - Moteur de résolution de contenu pour l'affichage dynamique
//!
//! Cette crate calcule, pour chaque section d'un écran d'affichage, la liste
//! ordonnée des médias à jouer à partir d'un catalogue administré :
//! - **matériaux** (images et vidéos) enregistrés par URL
//! - **groupes de carrousel** : listes ordonnées d'images
//! - **assignations** : une section reçoit soit un média unique, soit une
//!   référence de groupe avec un décalage de rotation
//!
//! # Architecture
//!
//! - [`resolve`] : fonction pure `catalogue -> playlists par section`
//! - [`CatalogStore`] : persistance SQLite du catalogue et des réglages
//! - [`SignageManager`] : façade d'administration, validation et évènements
//! - [`MediaFeed`] : charge utile `{ media, settings }` lue par les écrans
//! - avec la feature `pmoserver` : API REST, flux SSE et documentation OpenAPI
//!
//! # Exemple d'utilisation
//!
//! ```no_run
//! use pmosignage::{ContentSource, MaterialKind, MaterialOrigin, NewMaterial, SignageManager};
//!
//! # fn main() -> pmosignage::Result<()> {
//! let manager = SignageManager::in_memory()?;
//!
//! let logo = manager.create_material(NewMaterial {
//!     kind: MaterialKind::Image,
//!     filename: "logo.png".into(),
//!     locator: "/static/uploads/logo.png".into(),
//!     origin: MaterialOrigin::Global,
//! })?;
//!
//! manager.create_assignment(
//!     "carousel_top_left",
//!     ContentSource::SingleMedia { material_id: logo.id.clone() },
//! )?;
//!
//! let feed = manager.media_feed()?;
//! assert_eq!(feed.media.len(), 1);
//! # Ok(())
//! # }
//! ```

mod error;
mod feed;
mod manager;
mod model;
mod persistence;
pub mod resolve;
pub mod sections;

#[cfg(feature = "pmoconfig")]
mod config_ext;

#[cfg(feature = "pmoserver")]
pub mod api;
#[cfg(feature = "pmoserver")]
pub mod openapi;
#[cfg(feature = "pmoserver")]
mod pmoserver_ext;
#[cfg(feature = "pmoserver")]
pub mod sse;

// Réexports publics
pub use error::{Error, Result};
pub use feed::{FeedItem, MediaFeed};
pub use manager::{NewMaterial, SignageEvent, SignageEventKind, SignageManager};
pub use model::{
    Assignment, ContentSource, DisplaySettings, Group, Material, MaterialKind, MaterialOrigin,
    DEFAULT_CAROUSEL_INTERVAL, DEFAULT_FOOTER_INTERVAL, DEFAULT_HEADER_INTERVAL,
};
pub use persistence::CatalogStore;
pub use resolve::{resolve, CatalogSnapshot, PlaybackItem, SectionPlaylists};
pub use sections::{Section, SECTIONS};

#[cfg(feature = "pmoconfig")]
pub use config_ext::SignageConfigExt;

#[cfg(feature = "pmoserver")]
pub use pmoserver_ext::SignageServerExt;
