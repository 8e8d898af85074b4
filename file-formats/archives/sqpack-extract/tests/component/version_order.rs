//! Version parsing, ordering and day grouping

use proptest::prelude::*;
use sqpack_extract::{PatchName, VersionId, group_by_day};

proptest! {
    #[test]
    fn test_format_inverts_parse(
        epoch in 0u32..10_000,
        major in 0u32..100,
        minor in 0u32..100,
        patch in 0u32..10_000,
        revision in 0u32..10_000,
    ) {
        let text = format!("{epoch:04}.{major:02}.{minor:02}.{patch:04}.{revision:04}");
        let version = VersionId::parse(&text).unwrap();
        prop_assert_eq!(version.to_string(), text);
        prop_assert_eq!(version, VersionId::new(epoch, major, minor, patch, revision));
    }

    #[test]
    fn test_revision_outranks_patch(
        patch_a in 0u32..10_000,
        patch_b in 0u32..10_000,
        revision in 0u32..9_999,
    ) {
        let older = VersionId::new(2024, 6, 1, patch_a, revision);
        let newer = VersionId::new(2024, 6, 1, patch_b, revision + 1);
        prop_assert!(older < newer);
    }

    #[test]
    fn test_arbitrary_text_never_panics(text in "\\PC*") {
        let _ = VersionId::parse(&text);
        let _ = PatchName::parse(&text);
    }
}

#[test]
fn test_patches_group_by_day() {
    let names = [
        "D2023.03.28.0000.0001.patch",
        "D2023.03.27.0000.0000.patch",
        "D2023.03.28.0001.0000.patch",
        "H2023.03.29.0000.0000a.patch",
    ];
    let patches: Vec<PatchName> = names.iter().map(|n| PatchName::parse(n).unwrap()).collect();

    let batches = group_by_day(patches, |p| p.version);
    let shape: Vec<Vec<String>> = batches
        .iter()
        .map(|batch| batch.iter().map(ToString::to_string).collect())
        .collect();

    assert_eq!(
        shape,
        vec![
            vec!["D2023.03.27.0000.0000".to_string()],
            vec![
                "D2023.03.28.0000.0001".to_string(),
                "D2023.03.28.0001.0000".to_string(),
            ],
            vec!["H2023.03.29.0000.0000".to_string()],
        ]
    );
    assert!(batches[2][0].is_history());
}
