//! Tests for ReorderService::move_section

mod common;

use std::sync::Arc;

use rstest::rstest;

use common::{fixture, Fixture, MANUAL};
use sectree::application::ErrorKind;
use sectree::config::Settings;
use sectree::domain::{ManualId, ManualSnapshot, PolicyId, SectionId, UserId};
use sectree::infrastructure::audit::RecordingAuditSink;
use sectree::infrastructure::di::ServiceContainer;
use sectree::infrastructure::memory::InMemoryStore;
use sectree::infrastructure::traits::{DocumentStore, Transaction};
use sectree::infrastructure::StoreResult;

/// 1.0 (id=1), 1.1 (id=2, parent=1), 2.0 (id=3)
fn reparent_fixture() -> Fixture {
    let f = fixture();
    f.create(MANUAL, None, "Purpose");
    f.create(MANUAL, Some(1), "Audience");
    f.create(MANUAL, None, "Definitions");
    assert_eq!(f.numbers(MANUAL, &[1, 2, 3]), ["1.0", "1.1", "2.0"]);
    f
}

#[test]
fn given_root_section_when_moved_under_other_root_then_renumbered_as_child() {
    // Arrange
    let f = reparent_fixture();

    // Act
    let plan = f
        .container
        .reorder
        .move_section(&f.actor, SectionId(3), Some(SectionId(1)), 1)
        .unwrap();

    // Assert
    assert_eq!(f.numbers(MANUAL, &[1, 2, 3]), ["1.0", "1.1", "1.2"]);
    let moved = f.section(MANUAL, 3);
    assert_eq!(moved.level, 1);
    assert_eq!(moved.parent_section_id, Some(SectionId(1)));
    assert_eq!(plan.old_number, "2.0");
    assert_eq!(plan.new_number, "1.2");
    assert_eq!(f.sibling_orders(MANUAL, None), [0]);
    assert_eq!(f.sibling_orders(MANUAL, Some(1)), [0, 1]);
}

#[test]
fn given_move_under_own_child_when_moving_then_invalid_move_and_tree_unchanged() {
    // Arrange
    let f = fixture();
    f.create(MANUAL, None, "Purpose");
    f.create(MANUAL, Some(1), "Audience");
    let before = f.store.load(MANUAL).unwrap();

    // Act
    let err = f
        .container
        .reorder
        .move_section(&f.actor, SectionId(1), Some(SectionId(2)), 0)
        .unwrap_err();

    // Assert
    assert_eq!(err.kind(), ErrorKind::InvalidMove);
    assert!(err.to_string().contains("own subsection"), "{err}");
    assert_eq!(f.store.load(MANUAL).unwrap(), before);
}

#[test]
fn given_move_under_itself_when_moving_then_invalid_move() {
    // Arrange
    let f = reparent_fixture();

    // Act
    let err = f
        .container
        .reorder
        .move_section(&f.actor, SectionId(1), Some(SectionId(1)), 0)
        .unwrap_err();

    // Assert
    assert_eq!(err.kind(), ErrorKind::InvalidMove);
    assert!(err.to_string().contains("own parent"), "{err}");
}

#[rstest]
#[case::missing_section(99, Some(1))]
#[case::missing_parent(3, Some(99))]
fn given_unknown_id_when_moving_then_not_found(#[case] section: u64, #[case] parent: Option<u64>) {
    // Arrange
    let f = reparent_fixture();
    let version = f.version(MANUAL);

    // Act
    let err = f
        .container
        .reorder
        .move_section(&f.actor, SectionId(section), parent.map(SectionId), 0)
        .unwrap_err();

    // Assert
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(f.version(MANUAL), version);
}

#[test]
fn given_parent_in_other_manual_when_moving_then_invalid_move() {
    // Arrange
    let f = reparent_fixture();
    let other = ManualId(2);
    let foreign = f.create(other, None, "Elsewhere");

    // Act
    let err = f
        .container
        .reorder
        .move_section(&f.actor, SectionId(3), Some(foreign), 0)
        .unwrap_err();

    // Assert
    assert_eq!(err.kind(), ErrorKind::InvalidMove);
    assert_eq!(f.section(MANUAL, 3).parent_section_id, None);
}

#[rstest]
#[case::to_front(0, [5, 2, 3, 4], "1.1")]
#[case::to_middle(2, [2, 3, 5, 4], "1.3")]
#[case::past_end_appends(17, [2, 3, 4, 5], "1.4")]
fn given_subtree_when_moved_to_slot_then_siblings_stay_contiguous(
    #[case] index: u32,
    #[case] expected_children: [u64; 4],
    #[case] expected_number: &str,
) {
    // Arrange: 1.0 (1) with 1.1..1.3 (2,3,4); 2.0 (5) with 2.1 (6)
    let f = fixture();
    f.create(MANUAL, None, "Governance");
    f.create(MANUAL, Some(1), "Board");
    f.create(MANUAL, Some(1), "Committees");
    f.create(MANUAL, Some(1), "Officers");
    f.create(MANUAL, None, "Conduct");
    f.create(MANUAL, Some(5), "Gifts");

    // Act
    let plan = f
        .container
        .reorder
        .move_section(&f.actor, SectionId(5), Some(SectionId(1)), index)
        .unwrap();

    // Assert
    let snapshot = f.store.load(MANUAL).unwrap();
    let children: Vec<u64> = snapshot
        .children_of(Some(SectionId(1)))
        .iter()
        .map(|s| s.id.get())
        .collect();
    assert_eq!(children, expected_children);
    assert_eq!(f.sibling_orders(MANUAL, Some(1)), [0, 1, 2, 3]);
    assert_eq!(f.sibling_orders(MANUAL, None), [0]);
    assert_eq!(plan.order_index, index.min(3));

    let moved = f.section(MANUAL, 5);
    let child = f.section(MANUAL, 6);
    assert_eq!(moved.section_number, expected_number);
    assert_eq!(moved.level, 1);
    assert_eq!(child.section_number, format!("{expected_number}.1"));
    assert_eq!(child.level, 2);
}

#[test]
fn given_section_already_in_place_when_moving_then_nothing_is_written() {
    // Arrange
    let f = reparent_fixture();
    let version = f.version(MANUAL);

    // Act
    let plan = f
        .container
        .reorder
        .move_section(&f.actor, SectionId(2), Some(SectionId(1)), 0)
        .unwrap();

    // Assert
    assert!(plan.writes.is_empty());
    assert_eq!(f.version(MANUAL), version);
}

/// Store that lets another writer commit right before the first commit it sees.
struct RacingStore {
    inner: InMemoryStore,
    raced: std::sync::Mutex<bool>,
}

impl DocumentStore for RacingStore {
    fn load(&self, manual_id: ManualId) -> StoreResult<ManualSnapshot> {
        self.inner.load(manual_id)
    }

    fn commit(&self, tx: Transaction) -> StoreResult<u64> {
        let mut raced = self.raced.lock().unwrap();
        if !*raced {
            *raced = true;
            let current = self.inner.load(tx.manual_id)?;
            let mut renamed = current.sections[&SectionId(1)].clone();
            renamed.title = "Renamed elsewhere".into();
            self.inner.commit(Transaction::new(
                &current,
                vec![sectree::domain::Write::PutSection(renamed)],
            ))?;
        }
        self.inner.commit(tx)
    }

    fn allocate_id(&self) -> StoreResult<u64> {
        self.inner.allocate_id()
    }

    fn locate_section(&self, id: SectionId) -> StoreResult<Option<ManualId>> {
        self.inner.locate_section(id)
    }

    fn locate_policy(&self, id: PolicyId) -> StoreResult<Option<ManualId>> {
        self.inner.locate_policy(id)
    }

    fn manuals(&self) -> StoreResult<Vec<ManualId>> {
        self.inner.manuals()
    }
}

#[test]
fn given_concurrent_commit_when_moving_then_conflict_and_move_not_applied() {
    // Arrange
    let seeded = reparent_fixture();
    let data = seeded.store.load(MANUAL).unwrap();
    let inner = InMemoryStore::new();
    inner.allocate_id().unwrap();
    inner.allocate_id().unwrap();
    inner.allocate_id().unwrap();
    inner
        .commit(Transaction::new(
            &ManualSnapshot::empty(MANUAL),
            data.sections
                .values()
                .cloned()
                .map(sectree::domain::Write::PutSection)
                .collect(),
        ))
        .unwrap();
    let store = Arc::new(RacingStore {
        inner,
        raced: std::sync::Mutex::new(false),
    });
    let container = ServiceContainer::with_deps(
        Settings::default(),
        store.clone(),
        Arc::new(RecordingAuditSink::new()),
    );

    // Act
    let err = container
        .reorder
        .move_section(&UserId::new("bob"), SectionId(3), Some(SectionId(1)), 1)
        .unwrap_err();

    // Assert
    assert_eq!(err.kind(), ErrorKind::ConflictError);
    let after = store.load(MANUAL).unwrap();
    assert_eq!(after.sections[&SectionId(1)].title, "Renamed elsewhere");
    assert_eq!(after.sections[&SectionId(3)].parent_section_id, None);
    assert_eq!(after.sections[&SectionId(3)].section_number, "2.0");
}
