//! Sections d'affichage connues de l'écran

use serde::Serialize;

/// Un emplacement nommé sur l'écran
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Section {
    pub key: &'static str,
    pub label: &'static str,
}

pub const HEADER_VIDEO: &str = "header_video";
pub const CAROUSEL_TOP_LEFT: &str = "carousel_top_left";
pub const CAROUSEL_TOP_RIGHT: &str = "carousel_top_right";
pub const CAROUSEL_BOTTOM_LEFT: &str = "carousel_bottom_left";
pub const CAROUSEL_BOTTOM_RIGHT: &str = "carousel_bottom_right";
pub const FOOTER_CONTENT: &str = "footer_content";

/// Sections disponibles, dans l'ordre de la mise en page
pub const SECTIONS: &[Section] = &[
    Section {
        key: HEADER_VIDEO,
        label: "Header video",
    },
    Section {
        key: CAROUSEL_TOP_LEFT,
        label: "Carousel, top left",
    },
    Section {
        key: CAROUSEL_TOP_RIGHT,
        label: "Carousel, top right",
    },
    Section {
        key: CAROUSEL_BOTTOM_LEFT,
        label: "Carousel, bottom left",
    },
    Section {
        key: CAROUSEL_BOTTOM_RIGHT,
        label: "Carousel, bottom right",
    },
    Section {
        key: FOOTER_CONTENT,
        label: "Footer content (video, image or carousel)",
    },
];

pub fn find_section(key: &str) -> Option<&'static Section> {
    SECTIONS.iter().find(|s| s.key == key)
}

pub fn is_known_section(key: &str) -> bool {
    find_section(key).is_some()
}
