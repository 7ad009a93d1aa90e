//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;

use sectree::config::Settings;
use sectree::domain::{ManualId, NewSection, Section, SectionId, UserId};
use sectree::infrastructure::audit::RecordingAuditSink;
use sectree::infrastructure::di::ServiceContainer;
use sectree::infrastructure::memory::InMemoryStore;
use sectree::infrastructure::traits::DocumentStore;
use sectree::util::testing;

pub const MANUAL: ManualId = ManualId(1);

pub struct Fixture {
    pub store: Arc<InMemoryStore>,
    pub audit: Arc<RecordingAuditSink>,
    pub container: ServiceContainer,
    pub actor: UserId,
}

pub fn fixture() -> Fixture {
    fixture_with(Settings::default(), RecordingAuditSink::new())
}

pub fn fixture_with(settings: Settings, audit: RecordingAuditSink) -> Fixture {
    fixture_over(InMemoryStore::new(), settings, audit)
}

pub fn fixture_over(store: InMemoryStore, settings: Settings, audit: RecordingAuditSink) -> Fixture {
    testing::init_test_setup();
    let store = Arc::new(store);
    let audit = Arc::new(audit);
    let container = ServiceContainer::with_deps(settings, store.clone(), audit.clone());
    Fixture {
        store,
        audit,
        container,
        actor: UserId::new("alice"),
    }
}

impl Fixture {
    /// Create a section through the service and return its id.
    pub fn create(&self, manual: ManualId, parent: Option<u64>, title: &str) -> SectionId {
        let new = NewSection {
            manual_id: manual,
            parent_section_id: parent.map(SectionId),
            title: title.to_string(),
            description: None,
        };
        self.container
            .sections
            .create_section(&self.actor, new)
            .unwrap()
            .id
    }

    pub fn section(&self, manual: ManualId, id: u64) -> Section {
        self.store.load(manual).unwrap().sections[&SectionId(id)].clone()
    }

    /// Section number of each id, in the order given.
    pub fn numbers(&self, manual: ManualId, ids: &[u64]) -> Vec<String> {
        let snapshot = self.store.load(manual).unwrap();
        ids.iter()
            .map(|id| snapshot.sections[&SectionId(*id)].section_number.clone())
            .collect()
    }

    /// `order_index` values of the children of `parent`, sorted.
    pub fn sibling_orders(&self, manual: ManualId, parent: Option<u64>) -> Vec<u32> {
        let snapshot = self.store.load(manual).unwrap();
        let mut orders: Vec<u32> = snapshot
            .children_of(parent.map(SectionId))
            .iter()
            .map(|s| s.order_index)
            .collect();
        orders.sort_unstable();
        orders
    }

    pub fn version(&self, manual: ManualId) -> u64 {
        self.store.load(manual).unwrap().version
    }
}

/// A stored section row with the given tree position.
pub fn section_row(id: u64, parent: Option<u64>, order_index: u32, number: &str, level: u32) -> Section {
    let now = Utc::now();
    Section {
        id: SectionId(id),
        manual_id: MANUAL,
        parent_section_id: parent.map(SectionId),
        level,
        section_number: number.to_string(),
        order_index,
        title: format!("section {id}"),
        description: None,
        is_collapsed: false,
        created_by_id: None,
        created_at: now,
        updated_at: now,
    }
}
