//! Persistance SQLite du catalogue (matériaux, groupes, assignations, réglages)
//!
//! Le store garantit l'intégrité référentielle à l'écriture : supprimer un
//! matériau ou un groupe supprime aussi les assignations et appartenances qui
//! le référencent. Le moteur de résolution tolère malgré tout les références
//! pendantes.

use crate::model::{
    Assignment, ContentSource, DisplaySettings, Group, Material, MaterialOrigin,
};
use crate::resolve::CatalogSnapshot;
use crate::Result;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS materials (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    kind TEXT NOT NULL,
    filename TEXT NOT NULL,
    locator TEXT NOT NULL,
    origin TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS carousel_groups (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS group_members (
    group_id TEXT NOT NULL,
    position INTEGER NOT NULL,
    material_id TEXT NOT NULL,
    PRIMARY KEY (group_id, position)
);

CREATE INDEX IF NOT EXISTS idx_group_members_material ON group_members(material_id);

CREATE TABLE IF NOT EXISTS assignments (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    section_key TEXT NOT NULL,
    source_type TEXT NOT NULL,
    material_id TEXT,
    group_id TEXT,
    rotation_offset INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_assignments_section ON assignments(section_key);

CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value INTEGER NOT NULL
);
";

const SINGLE_MEDIA: &str = "single_media";
const GROUP_REFERENCE: &str = "group_reference";

/// Store du catalogue (une base SQLite pour tout l'affichage)
#[derive(Clone)]
pub struct CatalogStore {
    conn: Arc<Mutex<Connection>>,
}

impl CatalogStore {
    /// Ouvre (ou crée) la base à `db_path`
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                crate::Error::PersistenceError(format!("Failed to create directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path).map_err(|e| {
            crate::Error::PersistenceError(format!("Failed to open database: {}", e))
        })?;

        Self::init(conn)
    }

    /// Base en mémoire, perdue à la fermeture
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            crate::Error::PersistenceError(format!("Failed to open database: {}", e))
        })?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA).map_err(|e| {
            crate::Error::PersistenceError(format!("Failed to create schema: {}", e))
        })?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| crate::Error::PersistenceError("Database lock poisoned".into()))
    }

    /// Lit les trois catalogues sous un même verrou
    pub fn snapshot(&self) -> Result<CatalogSnapshot> {
        let conn = self.lock()?;
        let materials = query_materials(&conn)?;
        let groups = query_groups(&conn)?;
        let assignments = query_assignments(&conn)?;
        Ok(CatalogSnapshot::new(materials, groups, assignments))
    }

    // ------------------------------------------------------------------
    // Matériaux
    // ------------------------------------------------------------------

    /// Liste les matériaux par ordre de création
    pub fn list_materials(&self) -> Result<Vec<Material>> {
        let conn = self.lock()?;
        query_materials(&conn)
    }

    pub fn get_material(&self, id: &str) -> Result<Option<Material>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT id, kind, filename, locator, origin FROM materials WHERE id = ?1",
                params![id],
                material_row,
            )
            .optional()?;
        row.map(material_from_row).transpose()
    }

    pub fn insert_material(&self, material: &Material) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO materials (id, kind, filename, locator, origin) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                material.id,
                material.kind.as_str(),
                material.filename,
                material.locator,
                material.origin.as_str(),
            ],
        )
        .map_err(|e| crate::Error::PersistenceError(format!("Failed to insert material: {}", e)))?;
        Ok(())
    }

    /// Supprime un matériau, ses assignations et ses appartenances aux groupes
    ///
    /// Retourne `false` si le matériau n'existait pas.
    pub fn delete_material(&self, id: &str) -> Result<bool> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let removed = purge_material(&tx, id)?;
        tx.commit()?;
        Ok(removed)
    }

    // ------------------------------------------------------------------
    // Groupes
    // ------------------------------------------------------------------

    pub fn list_groups(&self) -> Result<Vec<Group>> {
        let conn = self.lock()?;
        query_groups(&conn)
    }

    pub fn get_group(&self, id: &str) -> Result<Option<Group>> {
        let conn = self.lock()?;
        let name: Option<String> = conn
            .query_row(
                "SELECT name FROM carousel_groups WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;

        match name {
            Some(name) => Ok(Some(Group {
                id: id.to_string(),
                name,
                members: query_members(&conn, id)?,
            })),
            None => Ok(None),
        }
    }

    pub fn insert_group(&self, group: &Group) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO carousel_groups (id, name) VALUES (?1, ?2)",
            params![group.id, group.name],
        )
        .map_err(|e| crate::Error::PersistenceError(format!("Failed to insert group: {}", e)))?;
        write_members(&tx, &group.id, &group.members)?;
        tx.commit()?;
        Ok(())
    }

    pub fn rename_group(&self, id: &str, name: &str) -> Result<bool> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE carousel_groups SET name = ?2 WHERE id = ?1",
            params![id, name],
        )?;
        Ok(changed > 0)
    }

    /// Remplace la liste ordonnée des membres (réordonnancement compris)
    pub fn set_group_members(&self, id: &str, members: &[String]) -> Result<bool> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        if !group_exists(&tx, id)? {
            return Ok(false);
        }
        tx.execute("DELETE FROM group_members WHERE group_id = ?1", params![id])?;
        write_members(&tx, id, members)?;
        tx.commit()?;
        Ok(true)
    }

    /// Ajoute un membre en fin de groupe
    pub fn append_group_member(&self, id: &str, material_id: &str) -> Result<bool> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        if !group_exists(&tx, id)? {
            return Ok(false);
        }
        let next: i64 = tx.query_row(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM group_members WHERE group_id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        tx.execute(
            "INSERT INTO group_members (group_id, position, material_id) VALUES (?1, ?2, ?3)",
            params![id, next, material_id],
        )?;
        tx.commit()?;
        Ok(true)
    }

    /// Supprime un groupe, ses assignations et les matériaux `group_owned`
    /// qui ne sont plus membres d'aucun groupe
    ///
    /// Retourne `None` si le groupe n'existait pas, sinon les identifiants
    /// des matériaux supprimés avec lui.
    pub fn delete_group(&self, id: &str) -> Result<Option<Vec<String>>> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        if !group_exists(&tx, id)? {
            return Ok(None);
        }

        let owned: Vec<String> = {
            let mut stmt = tx.prepare(
                "SELECT DISTINCT gm.material_id FROM group_members gm
                 JOIN materials m ON m.id = gm.material_id
                 WHERE gm.group_id = ?1 AND m.origin = ?2",
            )?;
            let rows = stmt.query_map(params![id, MaterialOrigin::GroupOwned.as_str()], |row| {
                row.get::<_, String>(0)
            })?;
            rows.collect::<std::result::Result<_, _>>()?
        };

        tx.execute(
            "DELETE FROM assignments WHERE source_type = ?1 AND group_id = ?2",
            params![GROUP_REFERENCE, id],
        )?;
        tx.execute("DELETE FROM group_members WHERE group_id = ?1", params![id])?;
        tx.execute("DELETE FROM carousel_groups WHERE id = ?1", params![id])?;

        let mut purged = Vec::new();
        for material_id in owned {
            let still_member: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM group_members WHERE material_id = ?1)",
                params![material_id],
                |row| row.get(0),
            )?;
            if !still_member && purge_material(&tx, &material_id)? {
                purged.push(material_id);
            }
        }

        tx.commit()?;
        Ok(Some(purged))
    }

    // ------------------------------------------------------------------
    // Assignations
    // ------------------------------------------------------------------

    /// Liste les assignations dans leur ordre d'insertion
    pub fn list_assignments(&self) -> Result<Vec<Assignment>> {
        let conn = self.lock()?;
        query_assignments(&conn)
    }

    pub fn get_assignment(&self, id: &str) -> Result<Option<Assignment>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT id, section_key, source_type, material_id, group_id, rotation_offset
                 FROM assignments WHERE id = ?1",
                params![id],
                assignment_row,
            )
            .optional()?;
        row.map(assignment_from_row).transpose()
    }

    pub fn insert_assignment(&self, assignment: &Assignment) -> Result<()> {
        let (material_id, group_id, offset) = match &assignment.source {
            ContentSource::SingleMedia { material_id } => (Some(material_id.as_str()), None, 0),
            ContentSource::GroupReference { group_id, offset } => {
                (None, Some(group_id.as_str()), *offset)
            }
        };

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO assignments (id, section_key, source_type, material_id, group_id, rotation_offset)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                assignment.id,
                assignment.section_key,
                assignment.source.type_name(),
                material_id,
                group_id,
                offset,
            ],
        )
        .map_err(|e| {
            crate::Error::PersistenceError(format!("Failed to insert assignment: {}", e))
        })?;
        Ok(())
    }

    /// Modifie le décalage de rotation d'une référence de groupe
    ///
    /// Retourne `false` si aucune référence de groupe ne porte cet identifiant.
    pub fn update_assignment_offset(&self, id: &str, offset: i64) -> Result<bool> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE assignments SET rotation_offset = ?3 WHERE id = ?1 AND source_type = ?2",
            params![id, GROUP_REFERENCE, offset],
        )?;
        Ok(changed > 0)
    }

    pub fn delete_assignment(&self, id: &str) -> Result<bool> {
        let conn = self.lock()?;
        let changed = conn.execute("DELETE FROM assignments WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    /// Vide une section ; retourne le nombre d'assignations supprimées
    pub fn delete_section_assignments(&self, section_key: &str) -> Result<usize> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "DELETE FROM assignments WHERE section_key = ?1",
            params![section_key],
        )?;
        Ok(changed)
    }

    // ------------------------------------------------------------------
    // Réglages
    // ------------------------------------------------------------------

    /// Charge les réglages ; les valeurs absentes prennent leur défaut
    pub fn load_settings(&self) -> Result<DisplaySettings> {
        let conn = self.lock()?;
        let mut settings = DisplaySettings::default();

        let mut stmt = conn.prepare("SELECT key, value FROM settings")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            let Ok(value) = u32::try_from(value) else {
                tracing::warn!(key = %key, value, "Ignoring out of range setting");
                continue;
            };
            if value == 0 {
                continue;
            }
            match key.as_str() {
                "header_interval" => settings.header_interval = value,
                "carousel_interval" => settings.carousel_interval = value,
                "footer_interval" => settings.footer_interval = value,
                _ => {}
            }
        }

        Ok(settings)
    }

    pub fn save_settings(&self, settings: &DisplaySettings) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        for (key, value) in [
            ("header_interval", settings.header_interval),
            ("carousel_interval", settings.carousel_interval),
            ("footer_interval", settings.footer_interval),
        ] {
            tx.execute(
                "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
                params![key, value as i64],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

type MaterialRow = (String, String, String, String, String);
type AssignmentRow = (String, String, String, Option<String>, Option<String>, i64);

fn material_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MaterialRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn material_from_row((id, kind, filename, locator, origin): MaterialRow) -> Result<Material> {
    Ok(Material {
        id,
        kind: kind.parse()?,
        filename,
        locator,
        origin: origin.parse()?,
    })
}

fn assignment_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AssignmentRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn assignment_from_row(
    (id, section_key, source_type, material_id, group_id, offset): AssignmentRow,
) -> Result<Assignment> {
    let source = match (source_type.as_str(), material_id, group_id) {
        (SINGLE_MEDIA, Some(material_id), _) => ContentSource::SingleMedia { material_id },
        (GROUP_REFERENCE, _, Some(group_id)) => ContentSource::GroupReference { group_id, offset },
        (other, _, _) => {
            return Err(crate::Error::PersistenceError(format!(
                "Corrupted assignment {} (source type '{}')",
                id, other
            )))
        }
    };

    Ok(Assignment {
        id,
        section_key,
        source,
    })
}

fn query_materials(conn: &Connection) -> Result<Vec<Material>> {
    let mut stmt =
        conn.prepare("SELECT id, kind, filename, locator, origin FROM materials ORDER BY seq")?;
    let rows = stmt.query_map([], material_row)?;

    let mut materials = Vec::new();
    for row in rows {
        materials.push(material_from_row(row?)?);
    }
    Ok(materials)
}

fn query_members(conn: &Connection, group_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT material_id FROM group_members WHERE group_id = ?1 ORDER BY position",
    )?;
    let rows = stmt.query_map(params![group_id], |row| row.get::<_, String>(0))?;
    Ok(rows.collect::<std::result::Result<_, _>>()?)
}

fn query_groups(conn: &Connection) -> Result<Vec<Group>> {
    let heads: Vec<(String, String)> = {
        let mut stmt = conn.prepare("SELECT id, name FROM carousel_groups ORDER BY seq")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect::<std::result::Result<_, _>>()?
    };

    heads
        .into_iter()
        .map(|(id, name)| {
            let members = query_members(conn, &id)?;
            Ok(Group { id, name, members })
        })
        .collect()
}

fn query_assignments(conn: &Connection) -> Result<Vec<Assignment>> {
    let mut stmt = conn.prepare(
        "SELECT id, section_key, source_type, material_id, group_id, rotation_offset
         FROM assignments ORDER BY seq",
    )?;
    let rows = stmt.query_map([], assignment_row)?;

    let mut assignments = Vec::new();
    for row in rows {
        assignments.push(assignment_from_row(row?)?);
    }
    Ok(assignments)
}

fn group_exists(conn: &Connection, id: &str) -> Result<bool> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM carousel_groups WHERE id = ?1)",
        params![id],
        |row| row.get(0),
    )?)
}

fn write_members(conn: &Connection, group_id: &str, members: &[String]) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO group_members (group_id, position, material_id) VALUES (?1, ?2, ?3)",
    )?;
    for (position, material_id) in members.iter().enumerate() {
        stmt.execute(params![group_id, position as i64, material_id])?;
    }
    Ok(())
}

fn purge_material(conn: &Connection, id: &str) -> Result<bool> {
    conn.execute(
        "DELETE FROM assignments WHERE source_type = ?1 AND material_id = ?2",
        params![SINGLE_MEDIA, id],
    )?;
    conn.execute(
        "DELETE FROM group_members WHERE material_id = ?1",
        params![id],
    )?;
    let removed = conn.execute("DELETE FROM materials WHERE id = ?1", params![id])?;
    Ok(removed > 0)
}
