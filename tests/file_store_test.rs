//! Tests for JsonFileStore and the container wiring over it

mod common;

use std::path::PathBuf;

use tempfile::TempDir;

use common::{section_row, MANUAL};
use sectree::config::Settings;
use sectree::domain::{ManualSnapshot, NewSection, SectionId, UserId, Write};
use sectree::infrastructure::di::ServiceContainer;
use sectree::infrastructure::file_store::JsonFileStore;
use sectree::infrastructure::traits::{DocumentStore, Transaction};
use sectree::infrastructure::StoreError;
use sectree::util::testing;

fn test_settings(dir: &TempDir) -> Settings {
    Settings {
        base_dir: dir.path().to_path_buf(),
        store_file: dir.path().join("data").join("store.json"),
        audit_log: Some(dir.path().join("audit.jsonl")),
        actor: "carol".into(),
        renumber_after_delete: false,
    }
}

fn create(container: &ServiceContainer, parent: Option<u64>, title: &str) -> SectionId {
    container
        .sections
        .create_section(
            &container.actor(),
            NewSection {
                manual_id: MANUAL,
                parent_section_id: parent.map(SectionId),
                title: title.into(),
                description: None,
            },
        )
        .unwrap()
        .id
}

#[test]
fn given_missing_file_when_opening_then_store_is_empty() {
    // Arrange
    testing::init_test_setup();
    let dir = TempDir::new().unwrap();

    // Act
    let store = JsonFileStore::open(&dir.path().join("nothing.json")).unwrap();

    // Assert
    assert!(store.manuals().unwrap().is_empty());
    assert_eq!(store.load(MANUAL).unwrap(), ManualSnapshot::empty(MANUAL));
}

#[test]
fn given_committed_sections_when_reopening_then_state_survives() {
    // Arrange
    testing::init_test_setup();
    let dir = TempDir::new().unwrap();
    let settings = test_settings(&dir);
    let store_file = settings.store_file.clone();
    {
        let container = ServiceContainer::new(settings).unwrap();
        create(&container, None, "Purpose");
        create(&container, Some(1), "Audience");
        container
            .reorder
            .move_section(&container.actor(), SectionId(2), None, 0)
            .unwrap();
    }

    // Act
    let reopened = JsonFileStore::open(&store_file).unwrap();

    // Assert
    let m = reopened.load(MANUAL).unwrap();
    assert_eq!(m.version, 3);
    assert_eq!(m.sections[&SectionId(2)].section_number, "1.0");
    assert_eq!(m.sections[&SectionId(1)].section_number, "2.0");
    assert_eq!(reopened.allocate_id().unwrap(), 3);
}

#[test]
fn given_audit_log_setting_when_changing_sections_then_events_appended_as_json_lines() {
    // Arrange
    testing::init_test_setup();
    let dir = TempDir::new().unwrap();
    let settings = test_settings(&dir);
    let audit_log: PathBuf = settings.audit_log.clone().unwrap();
    let container = ServiceContainer::new(settings).unwrap();

    // Act
    create(&container, None, "Purpose");
    container
        .cascade
        .delete_section(&container.actor(), SectionId(1))
        .unwrap();

    // Assert
    let content = std::fs::read_to_string(audit_log).unwrap();
    let events: Vec<serde_json::Value> = content
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["action"], "create");
    assert_eq!(events[1]["action"], "delete");
    assert_eq!(events[1]["actor_id"], "carol");
    assert_eq!(events[1]["severity"], "warning");
}

#[test]
fn given_write_set_breaking_a_rule_when_committing_then_nothing_is_applied_or_persisted() {
    // Arrange
    testing::init_test_setup();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("store.json");
    let store = JsonFileStore::open(&path).unwrap();
    let empty = store.load(MANUAL).unwrap();
    store
        .commit(Transaction::new(
            &empty,
            vec![
                Write::PutSection(section_row(1, None, 0, "1.0", 0)),
                Write::PutSection(section_row(2, Some(1), 0, "1.1", 1)),
            ],
        ))
        .unwrap();
    let before = store.load(MANUAL).unwrap();
    let on_disk = std::fs::read_to_string(&path).unwrap();

    // Act: retitle 2, then delete 1 which still has a child
    let mut renamed = before.sections[&SectionId(2)].clone();
    renamed.title = "changed".into();
    let err = store
        .commit(Transaction::new(
            &before,
            vec![Write::PutSection(renamed), Write::DeleteSection(SectionId(1))],
        ))
        .unwrap_err();

    // Assert
    assert!(matches!(err, StoreError::Constraint(_)), "{err}");
    assert_eq!(store.load(MANUAL).unwrap(), before);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), on_disk);
}

#[test]
fn given_stale_version_when_committing_then_version_conflict() {
    // Arrange
    testing::init_test_setup();
    let dir = TempDir::new().unwrap();
    let store = JsonFileStore::open(&dir.path().join("store.json")).unwrap();
    let stale = store.load(MANUAL).unwrap();
    store
        .commit(Transaction::new(
            &stale,
            vec![Write::PutSection(section_row(1, None, 0, "1.0", 0))],
        ))
        .unwrap();

    // Act
    let err = store
        .commit(Transaction::new(
            &stale,
            vec![Write::PutSection(section_row(2, None, 1, "2.0", 0))],
        ))
        .unwrap_err();

    // Assert
    assert!(matches!(
        err,
        StoreError::VersionConflict {
            expected: 0,
            actual: 1,
            ..
        }
    ));
    assert_eq!(store.load(MANUAL).unwrap().sections.len(), 1);
}

#[test]
fn given_actor_setting_when_creating_then_recorded_as_creator() {
    // Arrange
    testing::init_test_setup();
    let dir = TempDir::new().unwrap();
    let container = ServiceContainer::new(test_settings(&dir)).unwrap();

    // Act
    let id = create(&container, None, "Purpose");

    // Assert
    let section = &container.store.load(MANUAL).unwrap().sections[&id];
    assert_eq!(section.created_by_id, Some(UserId::new("carol")));
}
