//! Entités du catalogue : matériaux, groupes de carrousel, assignations
//! et réglages d'affichage.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Nature d'un matériau
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialKind {
    Image,
    Video,
}

impl MaterialKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaterialKind::Image => "image",
            MaterialKind::Video => "video",
        }
    }
}

impl fmt::Display for MaterialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MaterialKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "image" => Ok(MaterialKind::Image),
            "video" => Ok(MaterialKind::Video),
            other => Err(crate::Error::InvalidInput(format!(
                "unknown material kind '{}'",
                other
            ))),
        }
    }
}

/// Provenance d'un matériau
///
/// Un matériau `GroupOwned` a été téléversé directement dans un groupe ; il
/// disparaît avec le dernier groupe qui le référence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialOrigin {
    #[default]
    Global,
    GroupOwned,
}

impl MaterialOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaterialOrigin::Global => "global",
            MaterialOrigin::GroupOwned => "group_owned",
        }
    }
}

impl FromStr for MaterialOrigin {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "global" => Ok(MaterialOrigin::Global),
            "group_owned" => Ok(MaterialOrigin::GroupOwned),
            other => Err(crate::Error::InvalidInput(format!(
                "unknown material origin '{}'",
                other
            ))),
        }
    }
}

/// Un média (image ou vidéo) adressable par son `locator`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Material {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MaterialKind,
    pub filename: String,
    #[serde(rename = "url")]
    pub locator: String,
    #[serde(default)]
    pub origin: MaterialOrigin,
}

impl Material {
    pub fn is_image(&self) -> bool {
        self.kind == MaterialKind::Image
    }
}

/// Groupe de carrousel : liste ordonnée d'identifiants de matériaux
///
/// L'ordre est celui choisi par l'administrateur ; les doublons sont
/// conservés tels quels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub members: Vec<String>,
}

/// Source de contenu d'une assignation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "content_source_type", rename_all = "snake_case")]
pub enum ContentSource {
    /// Un seul matériau
    SingleMedia {
        #[serde(rename = "media_id")]
        material_id: String,
    },
    /// Un groupe, tourné à gauche de `offset` positions
    GroupReference {
        group_id: String,
        #[serde(default)]
        offset: i64,
    },
}

impl ContentSource {
    pub fn type_name(&self) -> &'static str {
        match self {
            ContentSource::SingleMedia { .. } => "single_media",
            ContentSource::GroupReference { .. } => "group_reference",
        }
    }
}

/// Liaison d'une section d'affichage à une source de contenu
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: String,
    pub section_key: String,
    #[serde(flatten)]
    pub source: ContentSource,
}

pub const DEFAULT_HEADER_INTERVAL: u32 = 5;
pub const DEFAULT_CAROUSEL_INTERVAL: u32 = 6;
pub const DEFAULT_FOOTER_INTERVAL: u32 = 7;

/// Intervalles de lecture globaux (en secondes), transmis tels quels au client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "pmoserver", derive(utoipa::ToSchema))]
pub struct DisplaySettings {
    #[serde(default = "default_header_interval")]
    pub header_interval: u32,
    #[serde(default = "default_carousel_interval")]
    pub carousel_interval: u32,
    #[serde(default = "default_footer_interval")]
    pub footer_interval: u32,
}

fn default_header_interval() -> u32 {
    DEFAULT_HEADER_INTERVAL
}

fn default_carousel_interval() -> u32 {
    DEFAULT_CAROUSEL_INTERVAL
}

fn default_footer_interval() -> u32 {
    DEFAULT_FOOTER_INTERVAL
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            header_interval: DEFAULT_HEADER_INTERVAL,
            carousel_interval: DEFAULT_CAROUSEL_INTERVAL,
            footer_interval: DEFAULT_FOOTER_INTERVAL,
        }
    }
}

impl DisplaySettings {
    /// Vérifie que tous les intervalles sont strictement positifs
    pub fn validate(&self) -> crate::Result<()> {
        let fields = [
            ("header_interval", self.header_interval),
            ("carousel_interval", self.carousel_interval),
            ("footer_interval", self.footer_interval),
        ];
        for (name, value) in fields {
            if value == 0 {
                return Err(crate::Error::InvalidInput(format!(
                    "{} must be a positive number of seconds",
                    name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_assignment_wire_shape() {
        let single = Assignment {
            id: "a1".into(),
            section_key: "footer_content".into(),
            source: ContentSource::SingleMedia {
                material_id: "v1".into(),
            },
        };
        assert_eq!(
            serde_json::to_value(&single).unwrap(),
            json!({
                "id": "a1",
                "section_key": "footer_content",
                "content_source_type": "single_media",
                "media_id": "v1"
            })
        );

        let group: Assignment = serde_json::from_value(json!({
            "id": "a2",
            "section_key": "carousel_top_left",
            "content_source_type": "group_reference",
            "group_id": "g1"
        }))
        .unwrap();
        assert_eq!(
            group.source,
            ContentSource::GroupReference {
                group_id: "g1".into(),
                offset: 0
            }
        );
    }

    #[test]
    fn test_material_kind_parsing() {
        assert_eq!("Image".parse::<MaterialKind>().unwrap(), MaterialKind::Image);
        assert_eq!(" video ".parse::<MaterialKind>().unwrap(), MaterialKind::Video);
        assert!("carousel_group".parse::<MaterialKind>().is_err());
    }

    #[test]
    fn test_display_settings_defaults() {
        let settings: DisplaySettings = serde_json::from_value(json!({"carousel_interval": 10})).unwrap();
        assert_eq!(settings.header_interval, 5);
        assert_eq!(settings.carousel_interval, 10);
        assert_eq!(settings.footer_interval, 7);

        assert!(DisplaySettings::default().validate().is_ok());
        let zero = DisplaySettings {
            footer_interval: 0,
            ..DisplaySettings::default()
        };
        assert!(zero.validate().is_err());
    }
}
