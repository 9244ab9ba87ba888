//! End-to-end resolution over synthetic survey workbooks.

mod common;

use common::{png, three_participants, SurveyBook};
use surveypix::render::{to_json, JsonFormat};
use surveypix::{
    resolve_file, Confidence, Error, ImageRole, ReferencePools, ResolverConfig,
    SpreadsheetArchive, Strategy, Warning,
};

fn media_names(path: &std::path::Path) -> Vec<String> {
    let archive = SpreadsheetArchive::open(path).unwrap();
    archive
        .media_files()
        .into_iter()
        .map(|p| p.rsplit('/').next().unwrap().to_string())
        .collect()
}

#[test]
fn test_three_rows_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = three_participants().write(dir.path(), "survey.xlsx");

    let resolution = resolve_file(&ResolverConfig::new(&path)).unwrap();

    assert_eq!(resolution.strategy, Strategy::Anchored);
    assert_eq!(resolution.participants.len(), 3);
    for (id, expected) in [
        ("A101", "image1.png"),
        ("A102", "image2.png"),
        ("A103", "image3.png"),
    ] {
        let mapping = resolution.participant(id).unwrap();
        assert_eq!(mapping.confidence, Some(Confidence::Anchored));
        assert_eq!(mapping.images.len(), 1);

        let face = mapping.get(ImageRole::FacePhoto).unwrap();
        assert_eq!(face.file, expected);
        assert_eq!(face.confidence, Confidence::Anchored);
        assert!(mapping.get(ImageRole::HairType).is_none());
        assert!(mapping.get(ImageRole::EyeColor).is_none());
        assert!(mapping.get(ImageRole::SkinBrightness).is_none());
    }
    assert_eq!(resolution.participant("A102").unwrap().name.as_deref(), Some("Lee Jiwoo"));
    assert_eq!(resolution.statistics.face_photo, 3);
    assert_eq!(resolution.statistics.anchors, 3);
    assert!(resolution.unmatched.is_empty());
    assert!(resolution.warnings.is_empty());
}

#[test]
fn test_zero_based_row_five_joins_physical_row_six() {
    let dir = tempfile::tempdir().unwrap();
    let mut book = SurveyBook::new();
    for n in 1..=6 {
        book = book.participant(&format!("A10{}", n), &format!("Person {}", n), &[]);
    }
    let path = book
        .media("image7.png", png(80, 80, 7))
        .anchor(1, 5, 27, "image7.png")
        .write(dir.path(), "survey.xlsx");

    let resolution = resolve_file(&ResolverConfig::new(&path)).unwrap();

    // A105 is the fifth participant, on physical row 6
    let a105 = resolution.participant("A105").unwrap();
    assert_eq!(a105.physical_row, 6);
    assert_eq!(a105.get(ImageRole::FacePhoto).unwrap().file, "image7.png");
    assert_eq!(resolution.statistics.participants_with_images, 1);
}

#[test]
fn test_anchored_files_exist_in_media_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = three_participants()
        .media("image4.png", png(10, 10, 40))
        .media("image5.png", png(12, 12, 50))
        .anchor(2, 1, 40, "image4.png")
        .anchor(2, 2, 21, "image5.png")
        .write(dir.path(), "survey.xlsx");

    let resolution = resolve_file(&ResolverConfig::new(&path)).unwrap();
    let media = media_names(&path);

    let images: Vec<_> = resolution
        .participants
        .values()
        .flat_map(|p| p.images.values())
        .collect();
    assert_eq!(images.len(), 5);
    for image in images {
        assert!(media.contains(&image.file), "{} not in media store", image.file);
        assert_eq!(image.confidence, Confidence::Anchored);
    }
    let a101 = resolution.participant("A101").unwrap();
    assert_eq!(a101.get(ImageRole::EyeColor).unwrap().file, "image4.png");
    let a102 = resolution.participant("A102").unwrap();
    assert_eq!(a102.get(ImageRole::SkinBrightness).unwrap().file, "image5.png");
}

#[test]
fn test_single_anchor_disables_heuristic() {
    let dir = tempfile::tempdir().unwrap();
    let path = SurveyBook::new()
        .participant("A101", "Kim", &[])
        .participant("A102", "Lee", &[])
        .media("image1.png", png(400, 400, 1))
        .media("image2.png", png(300, 300, 2))
        .media("image3.png", png(20, 20, 3))
        .anchor(1, 1, 27, "image3.png")
        .write(dir.path(), "survey.xlsx");

    let resolution = resolve_file(&ResolverConfig::new(&path)).unwrap();

    assert_eq!(resolution.strategy, Strategy::Anchored);
    assert_eq!(
        resolution
            .participant("A101")
            .unwrap()
            .get(ImageRole::FacePhoto)
            .unwrap()
            .file,
        "image3.png"
    );
    assert!(resolution.participant("A102").unwrap().is_empty());
    assert!(resolution
        .participants
        .values()
        .flat_map(|p| p.images.values())
        .all(|i| i.confidence == Confidence::Anchored));
}

#[test]
fn test_heuristic_only_without_anchors() {
    let dir = tempfile::tempdir().unwrap();
    let path = SurveyBook::new()
        .header("Skin")
        .participant("A101", "Kim", &["1"])
        .participant("A102", "Lee", &["2"])
        .media("image1.png", png(90, 90, 1))
        .media("image2.png", png(10, 10, 2))
        .media("image3.png", png(100, 100, 3))
        .media("image4.png", png(12, 12, 4))
        .write(dir.path(), "survey.xlsx");

    let config = ResolverConfig::new(&path)
        .with_answer_column(ImageRole::SkinBrightness, "Skin")
        .with_pools(ReferencePools {
            skin_brightness: 2,
            hair_type: 0,
            eye_color: 0,
        });
    let resolution = resolve_file(&config).unwrap();

    assert_eq!(resolution.strategy, Strategy::Heuristic);
    let a101 = resolution.participant("A101").unwrap();
    assert_eq!(a101.get(ImageRole::FacePhoto).unwrap().file, "image3.png");
    assert_eq!(a101.get(ImageRole::SkinBrightness).unwrap().file, "image2.png");
    let a102 = resolution.participant("A102").unwrap();
    assert_eq!(a102.get(ImageRole::FacePhoto).unwrap().file, "image1.png");
    assert_eq!(a102.get(ImageRole::SkinBrightness).unwrap().file, "image4.png");

    for mapping in resolution.participants.values() {
        assert_eq!(mapping.confidence, Some(Confidence::Heuristic));
        assert!(mapping
            .images
            .values()
            .all(|i| i.confidence == Confidence::Heuristic));
    }
    assert_eq!(resolution.statistics.anchors, 0);
    assert_eq!(resolution.statistics.media_files, 4);
}

#[test]
fn test_heuristic_selection_ignores_archive_order() {
    let dir = tempfile::tempdir().unwrap();
    let images = [
        ("image1.png", png(50, 50, 1)),
        ("image2.png", png(60, 40, 2)),
        ("image3.png", png(40, 60, 3)),
        ("image4.png", png(8, 8, 4)),
    ];

    let mut forward = SurveyBook::new()
        .participant("A101", "Kim", &[])
        .participant("A102", "Lee", &[]);
    let mut backward = SurveyBook::new()
        .participant("A101", "Kim", &[])
        .participant("A102", "Lee", &[]);
    for (name, data) in images.iter() {
        forward = forward.media(name, data.clone());
    }
    for (name, data) in images.iter().rev() {
        backward = backward.media(name, data.clone());
    }
    let a = forward.write(dir.path(), "forward.xlsx");
    let b = backward.write(dir.path(), "backward.xlsx");

    let first = resolve_file(&ResolverConfig::new(&a)).unwrap();
    let second = resolve_file(&ResolverConfig::new(&b)).unwrap();

    assert_eq!(first.participants, second.participants);
    // image2 and image3 tie on area; the filename decides
    let a101 = first.participant("A101").unwrap();
    assert_eq!(a101.get(ImageRole::FacePhoto).unwrap().file, "image1.png");
    let a102 = first.participant("A102").unwrap();
    assert_eq!(a102.get(ImageRole::FacePhoto).unwrap().file, "image2.png");
}

#[test]
fn test_repeated_runs_are_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let path = three_participants()
        .anchor(1, 9, 27, "image1.png")
        .write(dir.path(), "survey.xlsx");
    let out = dir.path().join("images");
    let config = ResolverConfig::new(&path)
        .with_output_dir(&out)
        .with_rename(true);

    let first = to_json(&resolve_file(&config).unwrap(), JsonFormat::Pretty).unwrap();
    let listing = |dir: &std::path::Path| {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    };
    let files = listing(&out);

    let second = to_json(&resolve_file(&config).unwrap(), JsonFormat::Pretty).unwrap();
    assert_eq!(first, second);
    assert_eq!(files, listing(&out));
    assert!(files.contains(&"A101_face_photo.png".to_string()));
    assert!(files.contains(&"image3.png".to_string()));
}

#[test]
fn test_renamed_copies_are_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let path = three_participants().write(dir.path(), "survey.xlsx");
    let out = dir.path().join("out");

    let resolution = resolve_file(
        &ResolverConfig::new(&path)
            .with_output_dir(&out)
            .with_rename(true),
    )
    .unwrap();

    let face = resolution
        .participant("A103")
        .unwrap()
        .get(ImageRole::FacePhoto)
        .unwrap();
    assert_eq!(face.exported_as.as_deref(), Some("A103_face_photo.png"));
    assert_eq!(
        std::fs::read(out.join("A103_face_photo.png")).unwrap(),
        std::fs::read(out.join("image3.png")).unwrap()
    );
}

#[test]
fn test_anchor_outside_participant_rows_is_unmatched() {
    let dir = tempfile::tempdir().unwrap();
    let path = three_participants()
        .media("logo.png", png(30, 10, 99))
        .anchor(1, 0, 0, "logo.png")
        .anchor(1, 9, 27, "logo.png")
        .write(dir.path(), "survey.xlsx");

    let resolution = resolve_file(&ResolverConfig::new(&path)).unwrap();

    assert_eq!(resolution.unmatched.len(), 2);
    assert_eq!(resolution.unmatched[0].cell_ref(), "A1");
    assert_eq!(resolution.unmatched[1].row, 10);
    assert_eq!(resolution.statistics.unmatched_anchors, 2);
    assert_eq!(resolution.statistics.face_photo, 3);
}

#[test]
fn test_custom_column_roles() {
    let dir = tempfile::tempdir().unwrap();
    let path = SurveyBook::new()
        .participant("P1", "Kim", &[])
        .media("image1.png", png(10, 10, 1))
        .anchor(1, 1, 2, "image1.png")
        .write(dir.path(), "survey.xlsx");

    let default = resolve_file(&ResolverConfig::new(&path)).unwrap();
    let p1 = default.participant("P1").unwrap();
    assert_eq!(p1.get(ImageRole::Unknown).unwrap().file, "image1.png");

    let mut config = ResolverConfig::new(&path);
    config.columns.apply_assignment("C=hair").unwrap();
    let custom = resolve_file(&config).unwrap();
    let p1 = custom.participant("P1").unwrap();
    assert_eq!(p1.get(ImageRole::HairType).unwrap().file, "image1.png");
    assert_eq!(custom.statistics.unknown, 0);
}

#[test]
fn test_duplicate_participant_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = SurveyBook::new()
        .participant("A101", "Kim", &[])
        .participant("A101", "Kim again", &[])
        .media("image1.png", png(10, 10, 1))
        .media("image2.png", png(10, 10, 2))
        .anchor(1, 1, 27, "image1.png")
        .anchor(1, 2, 27, "image2.png")
        .write(dir.path(), "survey.xlsx");

    let resolution = resolve_file(&ResolverConfig::new(&path)).unwrap();

    let a101 = resolution.participant("A101").unwrap();
    assert_eq!(a101.name.as_deref(), Some("Kim"));
    assert_eq!(a101.get(ImageRole::FacePhoto).unwrap().file, "image1.png");
    assert_eq!(resolution.unmatched.len(), 1);
    assert!(resolution.warnings.contains(&Warning::DuplicateParticipant {
        id: "A101".to_string(),
        physical_row: 3,
    }));
}

#[test]
fn test_malformed_drawing_is_skipped_with_warning() {
    let dir = tempfile::tempdir().unwrap();
    let path = three_participants()
        .part(
            "xl/drawings/drawing2.xml",
            r#"<xdr:wsDr xmlns:xdr="x"><xdr:twoCellAnchor></xdr:wsDr>"#,
        )
        .write(dir.path(), "survey.xlsx");

    let resolution = resolve_file(&ResolverConfig::new(&path)).unwrap();

    assert_eq!(resolution.strategy, Strategy::Anchored);
    assert_eq!(resolution.statistics.face_photo, 3);
    assert!(resolution.warnings.iter().any(|w| matches!(
        w,
        Warning::DrawingParse { part, .. } if part == "xl/drawings/drawing2.xml"
    )));
}

#[test]
fn test_anchor_row_past_sheet_limit_skips_drawing() {
    let dir = tempfile::tempdir().unwrap();
    let path = three_participants()
        .anchor(2, 4_294_967_295, 27, "image1.png")
        .write(dir.path(), "survey.xlsx");

    let resolution = resolve_file(&ResolverConfig::new(&path)).unwrap();

    assert_eq!(resolution.statistics.face_photo, 3);
    assert!(resolution.warnings.iter().any(|w| matches!(
        w,
        Warning::DrawingParse { part, .. } if part == "xl/drawings/drawing2.xml"
    )));
}

#[test]
fn test_heuristic_swatch_groups_in_pool_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut book = SurveyBook::new()
        .header("Skin")
        .header("Hair")
        .header("Eye")
        .participant("A101", "Kim", &["2", "3", "1"])
        .participant("A102", "Lee", &["", "1", "Brown"])
        .media("face_a.png", png(200, 200, 1))
        .media("face_b.png", png(150, 150, 2));
    // swatch1 is the smallest, swatch7 the largest
    for n in 1..=7u32 {
        book = book.media(&format!("swatch{}.png", n), png(3 + n, 3 + n, n as u8 * 10));
    }
    let path = book.write(dir.path(), "survey.xlsx");

    let config = ResolverConfig::new(&path)
        .with_answer_column(ImageRole::SkinBrightness, "Skin")
        .with_answer_column(ImageRole::HairType, "Hair")
        .with_answer_column(ImageRole::EyeColor, "Eye")
        .with_pools(ReferencePools {
            skin_brightness: 2,
            hair_type: 3,
            eye_color: 2,
        });
    let resolution = resolve_file(&config).unwrap();
    assert_eq!(resolution.strategy, Strategy::Heuristic);

    let file = |id: &str, role: ImageRole| {
        resolution
            .participant(id)
            .unwrap()
            .get(role)
            .map(|i| i.file.clone())
    };

    // skin: swatch1-2, hair: swatch3-5, eye: swatch6-7
    assert_eq!(file("A101", ImageRole::FacePhoto).as_deref(), Some("face_a.png"));
    assert_eq!(file("A101", ImageRole::SkinBrightness).as_deref(), Some("swatch2.png"));
    assert_eq!(file("A101", ImageRole::HairType).as_deref(), Some("swatch5.png"));
    assert_eq!(file("A101", ImageRole::EyeColor).as_deref(), Some("swatch6.png"));

    assert_eq!(file("A102", ImageRole::FacePhoto).as_deref(), Some("face_b.png"));
    assert_eq!(file("A102", ImageRole::SkinBrightness), None);
    assert_eq!(file("A102", ImageRole::HairType).as_deref(), Some("swatch3.png"));
    // "brown" hashes to the second eye swatch
    assert_eq!(surveypix::resolve::swatch_index("Brown", 2), Some(1));
    assert_eq!(file("A102", ImageRole::EyeColor).as_deref(), Some("swatch7.png"));
}

#[test]
fn test_unreadable_media_is_reported_on_export() {
    let dir = tempfile::tempdir().unwrap();
    let payload = b"media entry with a broken checksum".to_vec();
    let mut bytes = three_participants()
        .media("image9.png", payload.clone())
        .build();
    let at = bytes
        .windows(payload.len())
        .position(|w| w == payload.as_slice())
        .unwrap();
    bytes[at] ^= 0xFF;
    let path = dir.path().join("survey.xlsx");
    std::fs::write(&path, bytes).unwrap();
    let out = dir.path().join("out");

    let resolution = resolve_file(&ResolverConfig::new(&path).with_output_dir(&out)).unwrap();

    assert_eq!(resolution.statistics.media_files, 4);
    assert_eq!(resolution.statistics.exported_media, 3);
    assert!(!out.join("image9.png").exists());
    assert!(out.join("image1.png").exists());
    assert!(resolution.warnings.iter().any(|w| matches!(
        w,
        Warning::MediaUnreadable { file, .. } if file == "xl/media/image9.png"
    )));
}

#[test]
fn test_dangling_reference_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = three_participants()
        .anchor(2, 1, 40, "missing.png")
        .write(dir.path(), "survey.xlsx");

    let resolution = resolve_file(&ResolverConfig::new(&path)).unwrap();

    assert_eq!(resolution.statistics.eye_color, 0);
    assert!(resolution
        .warnings
        .iter()
        .any(|w| matches!(w, Warning::UnresolvedReference { rel_id, .. } if rel_id == "rId1")));
}

#[test]
fn test_unreadable_archive_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.xlsx");
    std::fs::write(&path, b"PK\x03\x04 truncated").unwrap();

    let result = resolve_file(&ResolverConfig::new(&path));
    assert!(matches!(result, Err(Error::ArchiveUnreadable(_))));
}
