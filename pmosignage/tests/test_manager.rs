use pmosignage::{
    ContentSource, DisplaySettings, Error, MaterialKind, MaterialOrigin, NewMaterial,
    SignageEventKind, SignageManager,
};
use tempfile::TempDir;

fn create_test_manager() -> (TempDir, SignageManager) {
    let temp_dir = tempfile::tempdir().unwrap();
    let manager = SignageManager::open(&temp_dir.path().join("signage.db")).unwrap();
    (temp_dir, manager)
}

fn add_material(manager: &SignageManager, name: &str, kind: MaterialKind) -> String {
    manager
        .create_material(NewMaterial {
            kind,
            filename: name.into(),
            locator: format!("/static/uploads/{}", name),
            origin: MaterialOrigin::Global,
        })
        .unwrap()
        .id
}

fn feed_ids(manager: &SignageManager, section: &str) -> Vec<String> {
    manager
        .media_feed()
        .unwrap()
        .section(section)
        .map(|item| item.id.clone())
        .collect()
}

#[test]
fn test_create_material_validates_fields() {
    let (_temp_dir, manager) = create_test_manager();

    let err = manager
        .create_material(NewMaterial {
            kind: MaterialKind::Image,
            filename: "  ".into(),
            locator: "/static/uploads/a.png".into(),
            origin: MaterialOrigin::Global,
        })
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));

    let id = add_material(&manager, "a.png", MaterialKind::Image);
    let material = manager.get_material(&id).unwrap();
    assert_eq!(material.filename, "a.png");
    assert!(material.is_image());
}

#[test]
fn test_unknown_entities_are_reported() {
    let (_temp_dir, manager) = create_test_manager();

    assert!(matches!(
        manager.get_material("nope"),
        Err(Error::MaterialNotFound(_))
    ));
    assert!(matches!(
        manager.delete_group("nope"),
        Err(Error::GroupNotFound(_))
    ));
    assert!(matches!(
        manager.delete_assignment("nope"),
        Err(Error::AssignmentNotFound(_))
    ));
}

#[test]
fn test_group_requires_name_and_existing_members() {
    let (_temp_dir, manager) = create_test_manager();
    let m1 = add_material(&manager, "m1.png", MaterialKind::Image);

    assert!(matches!(
        manager.create_group(" ", vec![]),
        Err(Error::InvalidInput(_))
    ));
    assert!(matches!(
        manager.create_group("Promo", vec![m1.clone(), "ghost".into()]),
        Err(Error::MaterialNotFound(_))
    ));

    let group = manager.create_group("  Promo ", vec![m1.clone()]).unwrap();
    assert_eq!(group.name, "Promo");
    assert_eq!(group.members, vec![m1.clone()]);

    let renamed = manager.rename_group(&group.id, "Soldes").unwrap();
    assert_eq!(renamed.name, "Soldes");
    assert_eq!(renamed.members, vec![m1]);
}

#[test]
fn test_assignment_validation() {
    let (_temp_dir, manager) = create_test_manager();
    let m1 = add_material(&manager, "m1.png", MaterialKind::Image);
    let group = manager.create_group("G", vec![m1.clone()]).unwrap();

    assert!(matches!(
        manager.create_assignment(
            "sidebar",
            ContentSource::SingleMedia {
                material_id: m1.clone()
            }
        ),
        Err(Error::UnknownSection(_))
    ));
    assert!(matches!(
        manager.create_assignment(
            "carousel_top_left",
            ContentSource::SingleMedia {
                material_id: "ghost".into()
            }
        ),
        Err(Error::MaterialNotFound(_))
    ));
    assert!(matches!(
        manager.create_assignment(
            "carousel_top_left",
            ContentSource::GroupReference {
                group_id: group.id.clone(),
                offset: -1
            }
        ),
        Err(Error::InvalidInput(_))
    ));
    assert!(matches!(
        manager.create_assignment(
            "carousel_top_left",
            ContentSource::GroupReference {
                group_id: "ghost".into(),
                offset: 0
            }
        ),
        Err(Error::GroupNotFound(_))
    ));

    let single = manager
        .create_assignment(
            "carousel_top_right",
            ContentSource::SingleMedia { material_id: m1 },
        )
        .unwrap();
    assert!(matches!(
        manager.set_assignment_offset(&single.id, 1),
        Err(Error::InvalidInput(_))
    ));
}

#[test]
fn test_rotated_group_feed() {
    let (_temp_dir, manager) = create_test_manager();
    let i1 = add_material(&manager, "i1.png", MaterialKind::Image);
    let i2 = add_material(&manager, "i2.png", MaterialKind::Image);
    let i3 = add_material(&manager, "i3.png", MaterialKind::Image);
    let group = manager
        .create_group("G", vec![i1.clone(), i2.clone(), i3.clone()])
        .unwrap();

    let assignment = manager
        .create_assignment(
            "carousel_top_left",
            ContentSource::GroupReference {
                group_id: group.id.clone(),
                offset: 1,
            },
        )
        .unwrap();
    assert_eq!(
        feed_ids(&manager, "carousel_top_left"),
        vec![i2.clone(), i3.clone(), i1.clone()]
    );

    manager.set_assignment_offset(&assignment.id, 5).unwrap();
    assert_eq!(
        feed_ids(&manager, "carousel_top_left"),
        vec![i3.clone(), i1.clone(), i2.clone()]
    );

    manager
        .set_group_members(&group.id, vec![i3.clone(), i2.clone(), i1.clone()])
        .unwrap();
    assert_eq!(
        feed_ids(&manager, "carousel_top_left"),
        vec![i1, i3, i2]
    );
}

#[test]
fn test_group_section_hides_single_media_and_videos() {
    let (_temp_dir, manager) = create_test_manager();
    let image = add_material(&manager, "i.png", MaterialKind::Image);
    let video = add_material(&manager, "v.mp4", MaterialKind::Video);
    let group = manager
        .create_group("G", vec![video.clone(), image.clone()])
        .unwrap();

    manager
        .create_assignment(
            "carousel_top_left",
            ContentSource::SingleMedia {
                material_id: video.clone(),
            },
        )
        .unwrap();
    manager
        .create_assignment(
            "carousel_top_left",
            ContentSource::GroupReference {
                group_id: group.id,
                offset: 0,
            },
        )
        .unwrap();
    manager
        .create_assignment(
            "footer_content",
            ContentSource::SingleMedia {
                material_id: video.clone(),
            },
        )
        .unwrap();

    assert_eq!(feed_ids(&manager, "carousel_top_left"), vec![image]);
    assert_eq!(feed_ids(&manager, "footer_content"), vec![video]);
}

#[test]
fn test_delete_material_updates_feed() {
    let (_temp_dir, manager) = create_test_manager();
    let m1 = add_material(&manager, "m1.png", MaterialKind::Image);
    let m2 = add_material(&manager, "m2.png", MaterialKind::Image);
    let group = manager.create_group("G", vec![m1.clone(), m2.clone()]).unwrap();
    manager
        .create_assignment(
            "carousel_bottom_left",
            ContentSource::GroupReference {
                group_id: group.id.clone(),
                offset: 1,
            },
        )
        .unwrap();

    manager.delete_material(&m2).unwrap();
    assert_eq!(feed_ids(&manager, "carousel_bottom_left"), vec![m1.clone()]);

    // Groupe vidé : la section disparaît du flux
    manager.delete_material(&m1).unwrap();
    assert!(manager.media_feed().unwrap().media.is_empty());
    assert!(manager.get_group(&group.id).unwrap().members.is_empty());
}

#[test]
fn test_clear_section() {
    let (_temp_dir, manager) = create_test_manager();
    let v1 = add_material(&manager, "v1.mp4", MaterialKind::Video);
    for _ in 0..2 {
        manager
            .create_assignment(
                "header_video",
                ContentSource::SingleMedia {
                    material_id: v1.clone(),
                },
            )
            .unwrap();
    }
    assert_eq!(feed_ids(&manager, "header_video"), vec![v1.clone(), v1]);

    assert_eq!(manager.clear_section("header_video").unwrap(), 2);
    assert!(manager.media_feed().unwrap().media.is_empty());
    assert!(matches!(
        manager.clear_section("sidebar"),
        Err(Error::UnknownSection(_))
    ));
}

#[test]
fn test_settings_update_and_validation() {
    let (_temp_dir, manager) = create_test_manager();
    assert_eq!(manager.settings().unwrap(), DisplaySettings::default());

    let invalid = DisplaySettings {
        header_interval: 0,
        ..DisplaySettings::default()
    };
    assert!(matches!(
        manager.update_settings(invalid),
        Err(Error::InvalidInput(_))
    ));

    let custom = DisplaySettings {
        header_interval: 12,
        carousel_interval: 4,
        footer_interval: 9,
    };
    manager.update_settings(custom).unwrap();
    assert_eq!(manager.media_feed().unwrap().settings, custom);
}

#[tokio::test]
async fn test_mutations_emit_events() {
    let (_temp_dir, manager) = create_test_manager();
    let mut rx = manager.subscribe();

    let id = add_material(&manager, "a.png", MaterialKind::Image);
    let event = rx.recv().await.unwrap();
    assert_eq!(event.kind, SignageEventKind::MediaUpdated);
    assert_eq!(event.subject.as_deref(), Some(id.as_str()));

    manager.update_settings(DisplaySettings::default()).unwrap();
    let event = rx.recv().await.unwrap();
    assert_eq!(event.kind, SignageEventKind::SettingsUpdated);
    assert!(event.subject.is_none());

    // Une écriture refusée n'émet rien
    assert!(manager.create_group("", vec![]).is_err());
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_clones_share_state() {
    let (_temp_dir, manager) = create_test_manager();
    let other = manager.clone();

    let id = add_material(&manager, "a.png", MaterialKind::Image);
    assert_eq!(other.get_material(&id).unwrap().id, id);
}
