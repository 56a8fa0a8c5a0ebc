//! Moteur de résolution : calcule la playlist ordonnée de chaque section
//! à partir d'un instantané du catalogue.
//!
//! La résolution est une fonction pure. Elle ne lève jamais d'erreur : une
//! référence pendante (matériau ou groupe supprimé) réduit simplement le
//! contenu produit. Les anomalies rencontrées sont rapportées à part par
//! [`resolve_with_anomalies`] pour que l'appelant puisse les journaliser.
//!
//! Règles :
//! 1. les assignations `GroupReference` sont traitées en premier ; une
//!    section ainsi couverte appartient au groupe, même si sa playlist est
//!    vide, et la dernière assignation de groupe d'une section l'emporte ;
//! 2. les assignations `SingleMedia` sont ensuite concaténées, dans l'ordre
//!    d'insertion, pour les seules sections qui n'appartiennent à aucun groupe.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;

use crate::model::{Assignment, ContentSource, Group, Material, MaterialKind};

/// Élément à lire par le client d'affichage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaybackItem {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MaterialKind,
    pub filename: String,
    #[serde(rename = "url")]
    pub locator: String,
    pub section_key: String,
}

impl PlaybackItem {
    fn from_material(material: &Material, section_key: &str) -> Self {
        Self {
            id: material.id.clone(),
            kind: material.kind,
            filename: material.filename.clone(),
            locator: material.locator.clone(),
            section_key: section_key.to_string(),
        }
    }
}

/// Playlists par clé de section, triées par clé
pub type SectionPlaylists = BTreeMap<String, Vec<PlaybackItem>>;

/// Raison de l'exclusion d'un membre de groupe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberDropReason {
    MissingMaterial,
    NotAnImage,
}

/// Anomalie absorbée pendant la résolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anomaly {
    UnknownGroup {
        assignment_id: String,
        group_id: String,
    },
    DroppedMember {
        group_id: String,
        material_id: String,
        reason: MemberDropReason,
    },
    EmptyGroup {
        assignment_id: String,
        group_id: String,
    },
    ReplacedGroupAssignment {
        section_key: String,
        assignment_id: String,
    },
    ShadowedSingleMedia {
        section_key: String,
        assignment_id: String,
    },
    UnknownMaterial {
        assignment_id: String,
        material_id: String,
    },
}

/// Résultat complet d'une résolution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub playlists: SectionPlaylists,
    pub anomalies: Vec<Anomaly>,
}

/// Vue cohérente des trois catalogues à un instant donné
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    pub materials: HashMap<String, Material>,
    pub groups: HashMap<String, Group>,
    pub assignments: Vec<Assignment>,
}

impl CatalogSnapshot {
    pub fn new(
        materials: impl IntoIterator<Item = Material>,
        groups: impl IntoIterator<Item = Group>,
        assignments: Vec<Assignment>,
    ) -> Self {
        Self {
            materials: materials.into_iter().map(|m| (m.id.clone(), m)).collect(),
            groups: groups.into_iter().map(|g| (g.id.clone(), g)).collect(),
            assignments,
        }
    }

    pub fn resolve(&self) -> SectionPlaylists {
        resolve(&self.materials, &self.groups, &self.assignments)
    }

    pub fn resolve_with_anomalies(&self) -> Resolution {
        resolve_with_anomalies(&self.materials, &self.groups, &self.assignments)
    }
}

/// Position de départ d'une rotation à gauche de `offset` sur `len` éléments
///
/// Modulo plancher : un offset négatif donne toujours un indice dans
/// `0..len`. `len` doit être non nul.
pub fn rotation_start(offset: i64, len: usize) -> usize {
    debug_assert!(len > 0);
    offset.rem_euclid(len as i64) as usize
}

/// Rotation à gauche : l'élément d'indice `offset mod len` passe en tête
pub fn rotate_left<T: Clone>(items: &[T], offset: i64) -> Vec<T> {
    if items.is_empty() {
        return Vec::new();
    }
    let start = rotation_start(offset, items.len());
    items[start..]
        .iter()
        .chain(items[..start].iter())
        .cloned()
        .collect()
}

/// Résout les playlists de toutes les sections
pub fn resolve(
    materials: &HashMap<String, Material>,
    groups: &HashMap<String, Group>,
    assignments: &[Assignment],
) -> SectionPlaylists {
    resolve_with_anomalies(materials, groups, assignments).playlists
}

/// Comme [`resolve`], en conservant la liste des anomalies absorbées
pub fn resolve_with_anomalies(
    materials: &HashMap<String, Material>,
    groups: &HashMap<String, Group>,
    assignments: &[Assignment],
) -> Resolution {
    let mut playlists = SectionPlaylists::new();
    let mut anomalies = Vec::new();
    let mut group_owned: HashSet<&str> = HashSet::new();

    // Passe 1 : références de groupe
    for assignment in assignments {
        let ContentSource::GroupReference { group_id, offset } = &assignment.source else {
            continue;
        };

        let Some(group) = groups.get(group_id) else {
            anomalies.push(Anomaly::UnknownGroup {
                assignment_id: assignment.id.clone(),
                group_id: group_id.clone(),
            });
            continue;
        };

        let members = playable_members(group, materials, &mut anomalies);
        if members.is_empty() {
            anomalies.push(Anomaly::EmptyGroup {
                assignment_id: assignment.id.clone(),
                group_id: group_id.clone(),
            });
        }

        let items: Vec<PlaybackItem> = rotate_left(&members, *offset)
            .into_iter()
            .map(|material| PlaybackItem::from_material(material, &assignment.section_key))
            .collect();

        let section = assignment.section_key.as_str();
        if !group_owned.insert(section) {
            anomalies.push(Anomaly::ReplacedGroupAssignment {
                section_key: section.to_string(),
                assignment_id: assignment.id.clone(),
            });
        }
        playlists.insert(section.to_string(), items);
    }

    // Passe 2 : médias uniques
    for assignment in assignments {
        let ContentSource::SingleMedia { material_id } = &assignment.source else {
            continue;
        };

        let section = assignment.section_key.as_str();
        if group_owned.contains(section) {
            anomalies.push(Anomaly::ShadowedSingleMedia {
                section_key: section.to_string(),
                assignment_id: assignment.id.clone(),
            });
            continue;
        }

        match materials.get(material_id) {
            Some(material) => playlists
                .entry(section.to_string())
                .or_default()
                .push(PlaybackItem::from_material(material, section)),
            None => anomalies.push(Anomaly::UnknownMaterial {
                assignment_id: assignment.id.clone(),
                material_id: material_id.clone(),
            }),
        }
    }

    playlists.retain(|_, items| !items.is_empty());

    Resolution {
        playlists,
        anomalies,
    }
}

/// Membres du groupe qui existent et sont des images, dans l'ordre du groupe
fn playable_members<'a>(
    group: &Group,
    materials: &'a HashMap<String, Material>,
    anomalies: &mut Vec<Anomaly>,
) -> Vec<&'a Material> {
    let mut members = Vec::with_capacity(group.members.len());
    for material_id in &group.members {
        let reason = match materials.get(material_id) {
            Some(material) if material.is_image() => {
                members.push(material);
                continue;
            }
            Some(_) => MemberDropReason::NotAnImage,
            None => MemberDropReason::MissingMaterial,
        };
        anomalies.push(Anomaly::DroppedMember {
            group_id: group.id.clone(),
            material_id: material_id.clone(),
            reason,
        });
    }
    members
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MaterialOrigin;

    fn image(id: &str) -> Material {
        Material {
            id: id.into(),
            kind: MaterialKind::Image,
            filename: format!("{}.jpg", id),
            locator: format!("/static/uploads/{}.jpg", id),
            origin: MaterialOrigin::Global,
        }
    }

    fn video(id: &str) -> Material {
        Material {
            id: id.into(),
            kind: MaterialKind::Video,
            filename: format!("{}.mp4", id),
            locator: format!("/static/uploads/{}.mp4", id),
            origin: MaterialOrigin::Global,
        }
    }

    fn group(id: &str, members: &[&str]) -> Group {
        Group {
            id: id.into(),
            name: id.to_uppercase(),
            members: members.iter().map(|m| m.to_string()).collect(),
        }
    }

    fn single(id: &str, section: &str, material: &str) -> Assignment {
        Assignment {
            id: id.into(),
            section_key: section.into(),
            source: ContentSource::SingleMedia {
                material_id: material.into(),
            },
        }
    }

    fn group_ref(id: &str, section: &str, group: &str, offset: i64) -> Assignment {
        Assignment {
            id: id.into(),
            section_key: section.into(),
            source: ContentSource::GroupReference {
                group_id: group.into(),
                offset,
            },
        }
    }

    fn ids(playlists: &SectionPlaylists, section: &str) -> Vec<String> {
        playlists
            .get(section)
            .map(|items| items.iter().map(|i| i.id.clone()).collect())
            .unwrap_or_default()
    }

    fn three_images() -> CatalogSnapshot {
        CatalogSnapshot::new(
            vec![image("m1"), image("m2"), image("m3")],
            vec![group("g1", &["m1", "m2", "m3"])],
            Vec::new(),
        )
    }

    #[test]
    fn test_rotate_left() {
        let items = [1, 2, 3, 4];
        assert_eq!(rotate_left(&items, 0), vec![1, 2, 3, 4]);
        assert_eq!(rotate_left(&items, 1), vec![2, 3, 4, 1]);
        assert_eq!(rotate_left(&items, 4), vec![1, 2, 3, 4]);
        assert_eq!(rotate_left(&items, 6), vec![3, 4, 1, 2]);
        assert!(rotate_left::<i32>(&[], 3).is_empty());
    }

    #[test]
    fn test_negative_offset_uses_floored_modulo() {
        assert_eq!(rotation_start(-1, 3), 2);
        assert_eq!(rotation_start(-4, 3), 2);
        assert_eq!(rotate_left(&['a', 'b', 'c'], -1), vec!['c', 'a', 'b']);
    }

    #[test]
    fn test_offset_zero_is_identity() {
        let mut snapshot = three_images();
        snapshot.assignments = vec![group_ref("a1", "carousel_top_left", "g1", 0)];

        let playlists = snapshot.resolve();
        assert_eq!(ids(&playlists, "carousel_top_left"), vec!["m1", "m2", "m3"]);
    }

    #[test]
    fn test_rotation_matches_slice_definition() {
        let members = ["m1", "m2", "m3", "m4", "m5"];
        let snapshot_base = CatalogSnapshot::new(
            members.iter().map(|m| image(m)),
            vec![group("g1", &members)],
            Vec::new(),
        );

        for k in 0..12_i64 {
            let mut snapshot = snapshot_base.clone();
            snapshot.assignments = vec![group_ref("a1", "carousel_top_right", "g1", k)];

            let start = (k as usize) % members.len();
            let expected: Vec<String> = members[start..]
                .iter()
                .chain(members[..start].iter())
                .map(|m| m.to_string())
                .collect();

            assert_eq!(ids(&snapshot.resolve(), "carousel_top_right"), expected, "offset {}", k);
        }
    }

    #[test]
    fn test_group_items_are_images_tagged_with_section() {
        let mut snapshot = three_images();
        snapshot.assignments = vec![group_ref("a1", "carousel_top_left", "g1", 2)];

        let playlists = snapshot.resolve();
        let items = &playlists["carousel_top_left"];
        assert_eq!(items[0].id, "m3");
        assert_eq!(items[0].locator, "/static/uploads/m3.jpg");
        assert!(items.iter().all(|i| i.kind == MaterialKind::Image));
        assert!(items.iter().all(|i| i.section_key == "carousel_top_left"));
    }

    #[test]
    fn test_scenario_a_offset_one() {
        let mut snapshot = three_images();
        snapshot.assignments = vec![group_ref("a1", "carousel_top_left", "g1", 1)];

        assert_eq!(
            ids(&snapshot.resolve(), "carousel_top_left"),
            vec!["m2", "m3", "m1"]
        );
    }

    #[test]
    fn test_scenario_b_rotation_uses_filtered_count() {
        let mut snapshot = three_images();
        snapshot.materials.remove("m2");
        snapshot.assignments = vec![group_ref("a1", "carousel_top_left", "g1", 1)];

        let resolution = snapshot.resolve_with_anomalies();
        assert_eq!(ids(&resolution.playlists, "carousel_top_left"), vec!["m3", "m1"]);
        assert!(resolution.anomalies.contains(&Anomaly::DroppedMember {
            group_id: "g1".into(),
            material_id: "m2".into(),
            reason: MemberDropReason::MissingMaterial,
        }));
    }

    #[test]
    fn test_non_image_members_are_filtered() {
        let snapshot = CatalogSnapshot::new(
            vec![image("m1"), video("v1"), image("m2")],
            vec![group("g1", &["m1", "v1", "m2"])],
            vec![group_ref("a1", "carousel_bottom_left", "g1", 1)],
        );

        let resolution = snapshot.resolve_with_anomalies();
        assert_eq!(ids(&resolution.playlists, "carousel_bottom_left"), vec!["m2", "m1"]);
        assert!(resolution.anomalies.contains(&Anomaly::DroppedMember {
            group_id: "g1".into(),
            material_id: "v1".into(),
            reason: MemberDropReason::NotAnImage,
        }));
    }

    #[test]
    fn test_duplicate_members_are_preserved() {
        let snapshot = CatalogSnapshot::new(
            vec![image("m1"), image("m2")],
            vec![group("g1", &["m1", "m2", "m1"])],
            vec![group_ref("a1", "carousel_top_left", "g1", 1)],
        );

        assert_eq!(
            ids(&snapshot.resolve(), "carousel_top_left"),
            vec!["m2", "m1", "m1"]
        );
    }

    #[test]
    fn test_scenario_c_single_media_accumulate_in_order() {
        let snapshot = CatalogSnapshot::new(
            vec![video("v1"), video("v2"), video("v3")],
            Vec::new(),
            vec![
                single("a1", "footer_content", "v1"),
                single("a2", "footer_content", "v2"),
                single("a3", "header_video", "v3"),
            ],
        );

        let playlists = snapshot.resolve();
        assert_eq!(ids(&playlists, "footer_content"), vec!["v1", "v2"]);
        assert_eq!(ids(&playlists, "header_video"), vec!["v3"]);
        assert_eq!(playlists["footer_content"][0].kind, MaterialKind::Video);
    }

    #[test]
    fn test_accumulation_keeps_insertion_order() {
        let snapshot = CatalogSnapshot::new(
            vec![image("m3"), video("v1"), image("m1")],
            Vec::new(),
            vec![
                single("a1", "footer_content", "m3"),
                single("a2", "footer_content", "v1"),
                single("a3", "footer_content", "m1"),
            ],
        );

        assert_eq!(
            ids(&snapshot.resolve(), "footer_content"),
            vec!["m3", "v1", "m1"]
        );
    }

    #[test]
    fn test_scenario_d_group_takes_precedence() {
        let snapshot = CatalogSnapshot::new(
            vec![video("v1"), image("m1"), image("m2")],
            vec![group("g2", &["m1", "m2"])],
            vec![
                single("a1", "header_video", "v1"),
                group_ref("a2", "header_video", "g2", 1),
                single("a3", "header_video", "v1"),
            ],
        );

        let resolution = snapshot.resolve_with_anomalies();
        assert_eq!(ids(&resolution.playlists, "header_video"), vec!["m2", "m1"]);
        let shadowed = resolution
            .anomalies
            .iter()
            .filter(|a| matches!(a, Anomaly::ShadowedSingleMedia { .. }))
            .count();
        assert_eq!(shadowed, 2);
    }

    #[test]
    fn test_empty_group_still_owns_section() {
        let snapshot = CatalogSnapshot::new(
            vec![video("v1"), video("v2")],
            vec![group("g1", &["v2", "gone"])],
            vec![
                group_ref("a1", "footer_content", "g1", 3),
                single("a2", "footer_content", "v1"),
            ],
        );

        let resolution = snapshot.resolve_with_anomalies();
        assert!(resolution.playlists.get("footer_content").is_none());
        assert!(resolution.anomalies.contains(&Anomaly::EmptyGroup {
            assignment_id: "a1".into(),
            group_id: "g1".into(),
        }));
    }

    #[test]
    fn test_scenario_e_unknown_group_is_absorbed() {
        let snapshot = CatalogSnapshot::new(
            vec![image("m1"), video("v1")],
            vec![group("g1", &["m1"])],
            vec![
                group_ref("a1", "carousel_top_left", "nonexistent", 0),
                group_ref("a2", "carousel_top_right", "g1", 0),
                single("a3", "header_video", "v1"),
            ],
        );

        let resolution = snapshot.resolve_with_anomalies();
        assert!(resolution.playlists.get("carousel_top_left").is_none());
        assert_eq!(ids(&resolution.playlists, "carousel_top_right"), vec!["m1"]);
        assert_eq!(ids(&resolution.playlists, "header_video"), vec!["v1"]);
        assert_eq!(
            resolution.anomalies,
            vec![Anomaly::UnknownGroup {
                assignment_id: "a1".into(),
                group_id: "nonexistent".into(),
            }]
        );
    }

    #[test]
    fn test_unknown_group_does_not_shadow_single_media() {
        let snapshot = CatalogSnapshot::new(
            vec![video("v1")],
            Vec::new(),
            vec![
                group_ref("a1", "footer_content", "nonexistent", 0),
                single("a2", "footer_content", "v1"),
            ],
        );

        assert_eq!(ids(&snapshot.resolve(), "footer_content"), vec!["v1"]);
    }

    #[test]
    fn test_dangling_single_media_is_skipped() {
        let snapshot = CatalogSnapshot::new(
            vec![video("v2")],
            Vec::new(),
            vec![
                single("a1", "footer_content", "v1"),
                single("a2", "footer_content", "v2"),
            ],
        );

        let resolution = snapshot.resolve_with_anomalies();
        assert_eq!(ids(&resolution.playlists, "footer_content"), vec!["v2"]);
        assert_eq!(
            resolution.anomalies,
            vec![Anomaly::UnknownMaterial {
                assignment_id: "a1".into(),
                material_id: "v1".into(),
            }]
        );
    }

    #[test]
    fn test_last_group_assignment_wins() {
        let snapshot = CatalogSnapshot::new(
            vec![image("m1"), image("m2"), image("m3")],
            vec![group("g1", &["m1", "m2"]), group("g2", &["m3"])],
            vec![
                group_ref("a1", "carousel_top_left", "g1", 0),
                group_ref("a2", "carousel_top_left", "g2", 0),
            ],
        );

        let resolution = snapshot.resolve_with_anomalies();
        assert_eq!(ids(&resolution.playlists, "carousel_top_left"), vec!["m3"]);
        assert!(resolution
            .anomalies
            .contains(&Anomaly::ReplacedGroupAssignment {
                section_key: "carousel_top_left".into(),
                assignment_id: "a2".into(),
            }));
    }

    #[test]
    fn test_later_empty_group_replaces_earlier_playlist() {
        let snapshot = CatalogSnapshot::new(
            vec![image("m1")],
            vec![group("g1", &["m1"]), group("g2", &[])],
            vec![
                group_ref("a1", "carousel_top_left", "g1", 0),
                group_ref("a2", "carousel_top_left", "g2", 0),
            ],
        );

        assert!(snapshot.resolve().get("carousel_top_left").is_none());
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let snapshot = CatalogSnapshot::new(
            vec![image("m1"), image("m2"), video("v1"), video("v2")],
            vec![group("g1", &["m1", "m2", "missing"])],
            vec![
                single("a1", "footer_content", "v1"),
                group_ref("a2", "carousel_top_left", "g1", 5),
                single("a3", "footer_content", "v2"),
                single("a4", "carousel_top_left", "v1"),
            ],
        );

        let first = snapshot.resolve_with_anomalies();
        let second = snapshot.resolve_with_anomalies();
        assert_eq!(first, second);
        assert_eq!(ids(&first.playlists, "carousel_top_left"), vec!["m2", "m1"]);
        assert_eq!(ids(&first.playlists, "footer_content"), vec!["v1", "v2"]);
    }

    #[test]
    fn test_empty_catalog_resolves_to_nothing() {
        let snapshot = CatalogSnapshot::default();
        assert!(snapshot.resolve().is_empty());
    }
}
