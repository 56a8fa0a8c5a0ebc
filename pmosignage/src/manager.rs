//! SignageManager : façade d'administration du catalogue et construction
//! du flux public

use crate::feed::MediaFeed;
use crate::model::{
    Assignment, ContentSource, DisplaySettings, Group, Material, MaterialKind, MaterialOrigin,
};
use crate::persistence::CatalogStore;
use crate::resolve::{Anomaly, CatalogSnapshot, SectionPlaylists};
use crate::sections::{self, Section};
use crate::{Error, Result};
use once_cell::sync::OnceCell;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Singleton SignageManager
static SIGNAGE_MANAGER: OnceCell<SignageManager> = OnceCell::new();

/// Variantes d'évènements émis après une écriture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignageEventKind {
    /// Le contenu résolu a pu changer (matériaux, groupes, assignations)
    MediaUpdated,
    /// Les intervalles de lecture ont changé
    SettingsUpdated,
}

impl SignageEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignageEventKind::MediaUpdated => "media_updated",
            SignageEventKind::SettingsUpdated => "settings_updated",
        }
    }
}

/// Évènement diffusé aux abonnés (clients d'affichage via SSE)
#[derive(Debug, Clone)]
pub struct SignageEvent {
    pub kind: SignageEventKind,
    /// Identifiant de l'entité modifiée, si pertinent
    pub subject: Option<String>,
    pub timestamp: SystemTime,
}

/// Description d'un matériau à enregistrer
#[derive(Debug, Clone)]
pub struct NewMaterial {
    pub kind: MaterialKind,
    pub filename: String,
    pub locator: String,
    pub origin: MaterialOrigin,
}

struct ManagerInner {
    store: CatalogStore,
    event_tx: broadcast::Sender<SignageEvent>,
}

/// Gestionnaire central du catalogue d'affichage
///
/// Clonable à moindre coût ; toutes les copies partagent le même store et
/// le même canal d'évènements.
#[derive(Clone)]
pub struct SignageManager {
    inner: Arc<ManagerInner>,
}

impl SignageManager {
    /// Construit un gestionnaire au-dessus d'un store existant
    pub fn with_store(store: CatalogStore) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                store,
                event_tx: broadcast::channel(256).0,
            }),
        }
    }

    /// Ouvre la base SQLite à `db_path`
    pub fn open(db_path: &Path) -> Result<Self> {
        info!(db = %db_path.display(), "Opening signage catalog");
        Ok(Self::with_store(CatalogStore::open(db_path)?))
    }

    /// Gestionnaire sur une base en mémoire
    pub fn in_memory() -> Result<Self> {
        Ok(Self::with_store(CatalogStore::open_in_memory()?))
    }

    /// Initialise avec la configuration de pmoconfig
    #[cfg(feature = "pmoconfig")]
    fn init_with_config() -> Result<Self> {
        use crate::config_ext::SignageConfigExt;

        let config = pmoconfig::get_config();
        let db_path = config.signage_db_path()?;
        Self::open(&db_path)
    }

    /// Retourne le singleton, initialisé depuis la configuration au premier appel
    #[cfg(feature = "pmoconfig")]
    pub fn get() -> Result<&'static SignageManager> {
        SIGNAGE_MANAGER.get_or_try_init(Self::init_with_config)
    }

    /// Retourne le singleton installé par [`SignageManager::install`]
    #[cfg(not(feature = "pmoconfig"))]
    pub fn get() -> Result<&'static SignageManager> {
        SIGNAGE_MANAGER.get().ok_or(Error::ManagerNotInitialized)
    }

    /// Installe explicitement le singleton ; sans effet s'il existe déjà
    pub fn install(manager: SignageManager) -> &'static SignageManager {
        SIGNAGE_MANAGER.get_or_init(|| manager)
    }

    /// Abonnement aux évènements de modification
    pub fn subscribe(&self) -> broadcast::Receiver<SignageEvent> {
        self.inner.event_tx.subscribe()
    }

    fn notify(&self, kind: SignageEventKind, subject: Option<&str>) {
        let event = SignageEvent {
            kind,
            subject: subject.map(str::to_string),
            timestamp: SystemTime::now(),
        };
        // Ignoré si aucun abonné
        let _ = self.inner.event_tx.send(event);
    }

    // ------------------------------------------------------------------
    // Lecture publique
    // ------------------------------------------------------------------

    pub fn snapshot(&self) -> Result<CatalogSnapshot> {
        self.inner.store.snapshot()
    }

    /// Résout les playlists de toutes les sections à partir d'un instantané frais
    pub fn resolve_playlists(&self) -> Result<SectionPlaylists> {
        let resolution = self.snapshot()?.resolve_with_anomalies();
        for anomaly in &resolution.anomalies {
            log_anomaly(anomaly);
        }
        Ok(resolution.playlists)
    }

    /// Flux `{ media, settings }` servi aux clients d'affichage
    pub fn media_feed(&self) -> Result<MediaFeed> {
        let playlists = self.resolve_playlists()?;
        let settings = self.settings()?;
        Ok(MediaFeed::from_playlists(&playlists, settings))
    }

    pub fn sections(&self) -> &'static [Section] {
        sections::SECTIONS
    }

    // ------------------------------------------------------------------
    // Matériaux
    // ------------------------------------------------------------------

    pub fn list_materials(&self) -> Result<Vec<Material>> {
        self.inner.store.list_materials()
    }

    pub fn get_material(&self, id: &str) -> Result<Material> {
        self.inner
            .store
            .get_material(id)?
            .ok_or_else(|| Error::MaterialNotFound(id.to_string()))
    }

    pub fn create_material(&self, new: NewMaterial) -> Result<Material> {
        require_non_empty("filename", &new.filename)?;
        require_non_empty("url", &new.locator)?;

        let material = Material {
            id: uuid::Uuid::new_v4().to_string(),
            kind: new.kind,
            filename: new.filename,
            locator: new.locator,
            origin: new.origin,
        };
        self.inner.store.insert_material(&material)?;

        info!(
            material_id = %material.id,
            kind = %material.kind,
            origin = material.origin.as_str(),
            "Material registered"
        );
        self.notify(SignageEventKind::MediaUpdated, Some(&material.id));
        Ok(material)
    }

    /// Supprime un matériau et tout ce qui le référence
    pub fn delete_material(&self, id: &str) -> Result<()> {
        if !self.inner.store.delete_material(id)? {
            return Err(Error::MaterialNotFound(id.to_string()));
        }
        info!(material_id = %id, "Material deleted");
        self.notify(SignageEventKind::MediaUpdated, Some(id));
        Ok(())
    }

    // ------------------------------------------------------------------
    // Groupes
    // ------------------------------------------------------------------

    pub fn list_groups(&self) -> Result<Vec<Group>> {
        self.inner.store.list_groups()
    }

    pub fn get_group(&self, id: &str) -> Result<Group> {
        self.inner
            .store
            .get_group(id)?
            .ok_or_else(|| Error::GroupNotFound(id.to_string()))
    }

    pub fn create_group(&self, name: &str, members: Vec<String>) -> Result<Group> {
        let name = name.trim();
        require_non_empty("name", name)?;
        self.require_materials(&members)?;

        let group = Group {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            members,
        };
        self.inner.store.insert_group(&group)?;

        info!(group_id = %group.id, name = %group.name, members = group.members.len(), "Group created");
        self.notify(SignageEventKind::MediaUpdated, Some(&group.id));
        Ok(group)
    }

    pub fn rename_group(&self, id: &str, name: &str) -> Result<Group> {
        let name = name.trim();
        require_non_empty("name", name)?;
        if !self.inner.store.rename_group(id, name)? {
            return Err(Error::GroupNotFound(id.to_string()));
        }
        info!(group_id = %id, name = %name, "Group renamed");
        self.get_group(id)
    }

    /// Remplace (ou réordonne) les membres d'un groupe
    pub fn set_group_members(&self, id: &str, members: Vec<String>) -> Result<Group> {
        self.require_materials(&members)?;
        if !self.inner.store.set_group_members(id, &members)? {
            return Err(Error::GroupNotFound(id.to_string()));
        }
        info!(group_id = %id, members = members.len(), "Group members updated");
        self.notify(SignageEventKind::MediaUpdated, Some(id));
        self.get_group(id)
    }

    /// Ajoute un matériau en fin de groupe
    pub fn add_group_member(&self, id: &str, material_id: &str) -> Result<Group> {
        self.get_material(material_id)?;
        if !self.inner.store.append_group_member(id, material_id)? {
            return Err(Error::GroupNotFound(id.to_string()));
        }
        info!(group_id = %id, material_id = %material_id, "Material added to group");
        self.notify(SignageEventKind::MediaUpdated, Some(id));
        self.get_group(id)
    }

    /// Supprime un groupe ; retourne les matériaux `group_owned` supprimés avec lui
    pub fn delete_group(&self, id: &str) -> Result<Vec<String>> {
        let purged = self
            .inner
            .store
            .delete_group(id)?
            .ok_or_else(|| Error::GroupNotFound(id.to_string()))?;
        info!(group_id = %id, purged_materials = purged.len(), "Group deleted");
        self.notify(SignageEventKind::MediaUpdated, Some(id));
        Ok(purged)
    }

    // ------------------------------------------------------------------
    // Assignations
    // ------------------------------------------------------------------

    pub fn list_assignments(&self) -> Result<Vec<Assignment>> {
        self.inner.store.list_assignments()
    }

    pub fn get_assignment(&self, id: &str) -> Result<Assignment> {
        self.inner
            .store
            .get_assignment(id)?
            .ok_or_else(|| Error::AssignmentNotFound(id.to_string()))
    }

    /// Lie une section à une source de contenu
    ///
    /// La section doit être connue, la cible doit exister et le décalage
    /// d'une référence de groupe doit être positif ou nul.
    pub fn create_assignment(&self, section_key: &str, source: ContentSource) -> Result<Assignment> {
        if !sections::is_known_section(section_key) {
            return Err(Error::UnknownSection(section_key.to_string()));
        }

        match &source {
            ContentSource::SingleMedia { material_id } => {
                self.get_material(material_id)?;
            }
            ContentSource::GroupReference { group_id, offset } => {
                require_offset(*offset)?;
                self.get_group(group_id)?;
            }
        }

        let assignment = Assignment {
            id: uuid::Uuid::new_v4().to_string(),
            section_key: section_key.to_string(),
            source,
        };
        self.inner.store.insert_assignment(&assignment)?;

        info!(
            assignment_id = %assignment.id,
            section = %assignment.section_key,
            source = assignment.source.type_name(),
            "Assignment created"
        );
        self.notify(SignageEventKind::MediaUpdated, Some(&assignment.section_key));
        Ok(assignment)
    }

    /// Modifie le décalage de rotation d'une référence de groupe
    pub fn set_assignment_offset(&self, id: &str, offset: i64) -> Result<Assignment> {
        require_offset(offset)?;
        let current = self.get_assignment(id)?;
        if let ContentSource::SingleMedia { .. } = current.source {
            return Err(Error::InvalidInput(format!(
                "assignment {} is not a group reference",
                id
            )));
        }

        if !self.inner.store.update_assignment_offset(id, offset)? {
            return Err(Error::AssignmentNotFound(id.to_string()));
        }
        info!(assignment_id = %id, offset, "Rotation offset updated");
        self.notify(SignageEventKind::MediaUpdated, Some(&current.section_key));
        self.get_assignment(id)
    }

    pub fn delete_assignment(&self, id: &str) -> Result<()> {
        let current = self.get_assignment(id)?;
        self.inner.store.delete_assignment(id)?;
        info!(assignment_id = %id, section = %current.section_key, "Assignment deleted");
        self.notify(SignageEventKind::MediaUpdated, Some(&current.section_key));
        Ok(())
    }

    /// Retire toutes les assignations d'une section
    pub fn clear_section(&self, section_key: &str) -> Result<usize> {
        if !sections::is_known_section(section_key) {
            return Err(Error::UnknownSection(section_key.to_string()));
        }
        let removed = self.inner.store.delete_section_assignments(section_key)?;
        info!(section = %section_key, removed, "Section cleared");
        if removed > 0 {
            self.notify(SignageEventKind::MediaUpdated, Some(section_key));
        }
        Ok(removed)
    }

    // ------------------------------------------------------------------
    // Réglages
    // ------------------------------------------------------------------

    pub fn settings(&self) -> Result<DisplaySettings> {
        self.inner.store.load_settings()
    }

    pub fn update_settings(&self, settings: DisplaySettings) -> Result<DisplaySettings> {
        settings.validate()?;
        self.inner.store.save_settings(&settings)?;
        info!(
            header = settings.header_interval,
            carousel = settings.carousel_interval,
            footer = settings.footer_interval,
            "Display settings updated"
        );
        self.notify(SignageEventKind::SettingsUpdated, None);
        Ok(settings)
    }

    fn require_materials(&self, ids: &[String]) -> Result<()> {
        for id in ids {
            self.get_material(id)?;
        }
        Ok(())
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidInput(format!("{} cannot be empty", field)));
    }
    Ok(())
}

fn require_offset(offset: i64) -> Result<()> {
    if offset < 0 {
        return Err(Error::InvalidInput(format!(
            "offset must be non-negative (got {})",
            offset
        )));
    }
    Ok(())
}

fn log_anomaly(anomaly: &Anomaly) {
    match anomaly {
        Anomaly::UnknownGroup {
            assignment_id,
            group_id,
        } => debug!(%assignment_id, %group_id, "Skipping assignment to unknown group"),
        Anomaly::DroppedMember {
            group_id,
            material_id,
            reason,
        } => debug!(%group_id, %material_id, ?reason, "Group member excluded from playback"),
        Anomaly::EmptyGroup {
            assignment_id,
            group_id,
        } => debug!(%assignment_id, %group_id, "Group has no playable image"),
        Anomaly::ReplacedGroupAssignment {
            section_key,
            assignment_id,
        } => debug!(section = %section_key, %assignment_id, "Later group assignment replaces earlier one"),
        Anomaly::ShadowedSingleMedia {
            section_key,
            assignment_id,
        } => debug!(section = %section_key, %assignment_id, "Single media hidden by group assignment"),
        Anomaly::UnknownMaterial {
            assignment_id,
            material_id,
        } => debug!(%assignment_id, %material_id, "Skipping assignment to unknown material"),
    }
}
