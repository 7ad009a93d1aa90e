//! Tests for SectionService and PolicyService

mod common;

use rstest::rstest;

use common::{fixture, fixture_over, section_row, MANUAL};
use sectree::application::ErrorKind;
use sectree::config::Settings;
use sectree::domain::{ManualId, ManualSnapshot, NewSection, SectionId, SectionPatch, Violation};
use sectree::infrastructure::audit::RecordingAuditSink;
use sectree::infrastructure::memory::InMemoryStore;
use sectree::infrastructure::tables::StoreData;
use sectree::infrastructure::traits::DocumentStore;

#[test]
fn given_empty_manual_when_creating_sections_then_numbers_follow_creation_order() {
    // Arrange
    let f = fixture();

    // Act
    f.create(MANUAL, None, "Purpose");
    f.create(MANUAL, Some(1), "Audience");
    f.create(MANUAL, Some(1), "Terms");
    f.create(MANUAL, Some(3), "Abbreviations");
    f.create(MANUAL, None, "Responsibilities");

    // Assert
    assert_eq!(
        f.numbers(MANUAL, &[1, 2, 3, 4, 5]),
        ["1.0", "1.1", "1.2", "1.2.1", "2.0"]
    );
    let nested = f.section(MANUAL, 4);
    assert_eq!(nested.level, 2);
    assert_eq!(nested.created_by_id.as_ref().map(|u| u.as_str()), Some("alice"));
    assert!(f.container.sections.verify(MANUAL).unwrap().is_empty());
}

#[test]
fn given_created_section_when_recording_audit_then_create_event_is_emitted() {
    // Arrange
    let f = fixture();

    // Act
    f.create(MANUAL, None, "Purpose");

    // Assert
    let events = f.audit.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action, "create");
    assert_eq!(events[0].entity_type, "section");
    assert_eq!(events[0].details["section_number"], "1.0");
}

#[rstest]
#[case::blank_title(None, "   ", ErrorKind::ValidationError)]
#[case::missing_parent(Some(42), "Orphan", ErrorKind::NotFound)]
fn given_bad_input_when_creating_then_rejected(
    #[case] parent: Option<u64>,
    #[case] title: &str,
    #[case] expected: ErrorKind,
) {
    // Arrange
    let f = fixture();
    let new = NewSection {
        manual_id: MANUAL,
        parent_section_id: parent.map(SectionId),
        title: title.to_string(),
        description: None,
    };

    // Act
    let err = f
        .container
        .sections
        .create_section(&f.actor, new)
        .unwrap_err();

    // Assert
    assert_eq!(err.kind(), expected);
}

#[test]
fn given_parent_in_other_manual_when_creating_then_validation_error() {
    // Arrange
    let f = fixture();
    let foreign = f.create(ManualId(2), None, "Other");
    let new = NewSection {
        manual_id: MANUAL,
        parent_section_id: Some(foreign),
        title: "Child".into(),
        description: None,
    };

    // Act
    let err = f
        .container
        .sections
        .create_section(&f.actor, new)
        .unwrap_err();

    // Assert
    assert_eq!(err.kind(), ErrorKind::ValidationError);
    assert!(f.store.load(MANUAL).unwrap().sections.is_empty());
}

#[test]
fn given_patch_when_updating_then_only_given_fields_change() {
    // Arrange
    let f = fixture();
    let id = f.create(MANUAL, None, "Purpose");
    let before = f.section(MANUAL, id.get());
    let patch = SectionPatch {
        title: Some("  Purpose and scope ".into()),
        description: Some(Some("Why this manual exists".into())),
        is_collapsed: None,
    };

    // Act
    let updated = f
        .container
        .sections
        .update_section(&f.actor, id, patch)
        .unwrap();

    // Assert
    assert_eq!(updated.title, "Purpose and scope");
    assert_eq!(updated.description.as_deref(), Some("Why this manual exists"));
    assert_eq!(updated.section_number, before.section_number);
    assert_eq!(updated.order_index, before.order_index);
    assert_eq!(f.section(MANUAL, id.get()), updated);
}

#[test]
fn given_clear_description_when_updating_then_description_removed() {
    // Arrange
    let f = fixture();
    let id = f.create(MANUAL, None, "Purpose");
    let set = SectionPatch {
        description: Some(Some("draft".into())),
        ..Default::default()
    };
    f.container.sections.update_section(&f.actor, id, set).unwrap();

    // Act
    let clear = SectionPatch {
        description: Some(None),
        ..Default::default()
    };
    let updated = f
        .container
        .sections
        .update_section(&f.actor, id, clear)
        .unwrap();

    // Assert
    assert_eq!(updated.description, None);
}

#[rstest]
#[case::empty_patch(SectionPatch::default())]
#[case::blank_title(SectionPatch { title: Some(" ".into()), ..Default::default() })]
fn given_invalid_patch_when_updating_then_validation_error(#[case] patch: SectionPatch) {
    // Arrange
    let f = fixture();
    let id = f.create(MANUAL, None, "Purpose");

    // Act
    let err = f
        .container
        .sections
        .update_section(&f.actor, id, patch)
        .unwrap_err();

    // Assert
    assert_eq!(err.kind(), ErrorKind::ValidationError);
}

#[test]
fn given_patch_without_effect_when_updating_then_manual_version_unchanged() {
    // Arrange
    let f = fixture();
    let id = f.create(MANUAL, None, "Purpose");
    let version = f.version(MANUAL);
    let patch = SectionPatch {
        title: Some("Purpose".into()),
        ..Default::default()
    };

    // Act
    f.container
        .sections
        .update_section(&f.actor, id, patch)
        .unwrap();

    // Assert
    assert_eq!(f.version(MANUAL), version);
}

#[test]
fn given_sections_with_policies_when_reading_hierarchy_then_nested_in_sibling_order() {
    // Arrange
    let f = fixture();
    f.create(MANUAL, None, "Purpose");
    f.create(MANUAL, None, "Conduct");
    f.create(MANUAL, Some(2), "Gifts");
    let policy = f
        .container
        .policies
        .add_policy(&f.actor, SectionId(3), "Gift register")
        .unwrap();

    // Act
    let forest = f.container.sections.hierarchy(MANUAL).unwrap();

    // Assert
    assert_eq!(forest.len(), 2);
    assert_eq!(forest[0].section.id, SectionId(1));
    assert!(forest[0].children.is_empty());
    let gifts = &forest[1].children[0];
    assert_eq!(gifts.section.section_number, "2.1");
    assert_eq!(gifts.policies.len(), 1);
    assert_eq!(gifts.policies[0].id, policy.id);

    let json = serde_json::to_value(&forest).unwrap();
    assert_eq!(json[1]["children"][0]["title"], "Gifts");
    assert_eq!(json[1]["children"][0]["policies"][0]["title"], "Gift register");
}

#[test]
fn given_nested_sections_when_listing_then_ordered_by_level_then_order() {
    // Arrange
    let f = fixture();
    f.create(MANUAL, None, "A");
    f.create(MANUAL, Some(1), "A.1");
    f.create(MANUAL, None, "B");
    f.create(MANUAL, Some(3), "B.1");

    // Act
    let listing = f.container.sections.list_sections(MANUAL).unwrap();

    // Assert
    let numbers: Vec<&str> = listing
        .iter()
        .map(|l| l.section.section_number.as_str())
        .collect();
    assert_eq!(numbers, ["1.0", "2.0", "1.1", "2.1"]);
}

#[test]
fn given_unknown_manual_when_reading_then_empty() {
    // Arrange
    let f = fixture();

    // Act
    let forest = f.container.sections.hierarchy(ManualId(404)).unwrap();
    let listing = f.container.sections.list_sections(ManualId(404)).unwrap();

    // Assert
    assert!(forest.is_empty());
    assert!(listing.is_empty());
}

/// Rows written by an older tool: a gap in root order and stale numbers/levels.
fn drifted_store() -> InMemoryStore {
    let mut m = ManualSnapshot::empty(MANUAL);
    for s in [
        section_row(1, None, 0, "1.0", 0),
        section_row(2, None, 3, "4.0", 0),
        section_row(3, Some(2), 0, "4.1", 0),
    ] {
        m.sections.insert(s.id, s);
    }
    let mut data = StoreData {
        last_id: 3,
        ..Default::default()
    };
    data.install(m);
    InMemoryStore::with_data(data)
}

#[test]
fn given_drifted_manual_when_verifying_then_reports_each_problem() {
    // Arrange
    let f = fixture_over(drifted_store(), Settings::default(), RecordingAuditSink::new());

    // Act
    let violations = f.container.sections.verify(MANUAL).unwrap();

    // Assert
    assert!(violations.contains(&Violation::NonContiguousSiblings {
        parent: None,
        order_indices: vec![0, 3],
    }));
    assert!(violations.contains(&Violation::StaleNumber {
        section: SectionId(2),
        stored: "4.0".into(),
        expected: "2.0".into(),
    }));
    assert!(violations.contains(&Violation::StaleLevel {
        section: SectionId(3),
        stored: 0,
        expected: 1,
    }));
}

#[test]
fn given_drifted_manual_when_renumbering_then_consistent_and_idempotent() {
    // Arrange
    let f = fixture_over(drifted_store(), Settings::default(), RecordingAuditSink::new());

    // Act
    let changed = f.container.sections.renumber_all(&f.actor, MANUAL).unwrap();
    let again = f.container.sections.renumber_all(&f.actor, MANUAL).unwrap();

    // Assert
    assert_eq!(changed, 2);
    assert_eq!(again, 0);
    assert_eq!(f.numbers(MANUAL, &[1, 2, 3]), ["1.0", "2.0", "2.1"]);
    assert_eq!(f.section(MANUAL, 2).order_index, 1);
    assert!(f.container.sections.verify(MANUAL).unwrap().is_empty());
}

#[test]
fn given_policy_when_acknowledged_then_ack_points_at_current_version() {
    // Arrange
    let f = fixture();
    f.create(MANUAL, None, "Conduct");
    let policy = f
        .container
        .policies
        .add_policy(&f.actor, SectionId(1), "Code of conduct")
        .unwrap();

    // Act
    let ack = f.container.policies.acknowledge(&f.actor, policy.id).unwrap();

    // Assert
    assert_eq!(Some(ack.policy_version_id), policy.current_version_id);
    assert_eq!(ack.user_id, f.actor);
}

#[test]
fn given_blank_title_when_adding_policy_then_validation_error() {
    // Arrange
    let f = fixture();
    f.create(MANUAL, None, "Conduct");

    // Act
    let err = f
        .container
        .policies
        .add_policy(&f.actor, SectionId(1), "")
        .unwrap_err();

    // Assert
    assert_eq!(err.kind(), ErrorKind::ValidationError);
}
