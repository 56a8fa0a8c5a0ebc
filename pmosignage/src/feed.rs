//! Charge utile publique lue par les clients d'affichage

use serde::{Deserialize, Serialize};

use crate::model::{DisplaySettings, MaterialKind};
use crate::resolve::SectionPlaylists;

/// Élément de la liste `media` du flux
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "pmoserver", derive(utoipa::ToSchema))]
pub struct FeedItem {
    pub id: String,
    pub filename: String,
    #[serde(rename = "type")]
    #[cfg_attr(feature = "pmoserver", schema(value_type = String, example = "image"))]
    pub kind: MaterialKind,
    pub url: String,
    pub section_key: String,
}

/// `{ media, settings }` servi par l'endpoint public
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "pmoserver", derive(utoipa::ToSchema))]
pub struct MediaFeed {
    pub media: Vec<FeedItem>,
    pub settings: DisplaySettings,
}

impl MediaFeed {
    /// Aplatit les playlists, section par section, en conservant l'ordre
    /// interne de chaque section
    pub fn from_playlists(playlists: &SectionPlaylists, settings: DisplaySettings) -> Self {
        let media = playlists
            .values()
            .flatten()
            .map(|item| FeedItem {
                id: item.id.clone(),
                filename: item.filename.clone(),
                kind: item.kind,
                url: item.locator.clone(),
                section_key: item.section_key.clone(),
            })
            .collect();

        Self { media, settings }
    }

    /// Éléments d'une section, dans l'ordre de lecture
    pub fn section(&self, section_key: &str) -> impl Iterator<Item = &FeedItem> {
        let key = section_key.to_string();
        self.media.iter().filter(move |item| item.section_key == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::PlaybackItem;
    use serde_json::json;

    fn item(id: &str, kind: MaterialKind, section: &str) -> PlaybackItem {
        PlaybackItem {
            id: id.into(),
            kind,
            filename: format!("{}.bin", id),
            locator: format!("/static/uploads/{}.bin", id),
            section_key: section.into(),
        }
    }

    #[test]
    fn test_feed_is_flattened_per_section() {
        let mut playlists = SectionPlaylists::new();
        playlists.insert(
            "footer_content".into(),
            vec![
                item("v1", MaterialKind::Video, "footer_content"),
                item("v2", MaterialKind::Video, "footer_content"),
            ],
        );
        playlists.insert(
            "carousel_top_left".into(),
            vec![item("m2", MaterialKind::Image, "carousel_top_left")],
        );

        let feed = MediaFeed::from_playlists(&playlists, DisplaySettings::default());
        let order: Vec<&str> = feed.media.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(order, vec!["m2", "v1", "v2"]);

        let footer: Vec<&str> = feed.section("footer_content").map(|i| i.id.as_str()).collect();
        assert_eq!(footer, vec!["v1", "v2"]);
    }

    #[test]
    fn test_feed_wire_shape() {
        let mut playlists = SectionPlaylists::new();
        playlists.insert(
            "header_video".into(),
            vec![item("v1", MaterialKind::Video, "header_video")],
        );

        let feed = MediaFeed::from_playlists(&playlists, DisplaySettings::default());
        assert_eq!(
            serde_json::to_value(&feed).unwrap(),
            json!({
                "media": [{
                    "id": "v1",
                    "filename": "v1.bin",
                    "type": "video",
                    "url": "/static/uploads/v1.bin",
                    "section_key": "header_video"
                }],
                "settings": {
                    "header_interval": 5,
                    "carousel_interval": 6,
                    "footer_interval": 7
                }
            })
        );
    }
}
