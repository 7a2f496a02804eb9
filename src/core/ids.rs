//! Namespaced entity id generation.
//!
//! Ids are minted through an [`IdGenerator`] value that callers own and thread into the
//! reducer and workflow operations, so tests can swap in [`SequentialIdGenerator`].

use crate::core::types::IdStrategy;
use rand::rngs::OsRng;
use rand::RngCore;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

static FALLBACK_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Entity namespaces that receive their own id prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Workflow,
    Step,
    Branch,
    Track,
    Action,
    Phase,
    CustomVariable,
}

impl EntityKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            EntityKind::Workflow => "workflow",
            EntityKind::Step => "step",
            EntityKind::Branch => "branch",
            EntityKind::Track => "track",
            EntityKind::Action => "action",
            EntityKind::Phase => "phase",
            EntityKind::CustomVariable => "var-custom",
        }
    }
}

/// Source of fresh entity ids.
pub trait IdGenerator {
    fn next_id(&mut self, kind: EntityKind) -> String;
}

/// Random ids backed by the OS entropy source, with a timestamp/counter composite when the
/// OS source is unavailable. Duplicates from the weak path are caught by the compiler's
/// id checks.
#[derive(Debug, Default)]
pub struct RandomIdGenerator;

impl RandomIdGenerator {
    pub fn new() -> Self {
        RandomIdGenerator
    }
}

impl IdGenerator for RandomIdGenerator {
    fn next_id(&mut self, kind: EntityKind) -> String {
        let mut bytes = [0u8; 16];
        match OsRng.try_fill_bytes(&mut bytes) {
            Ok(()) => {
                let uuid = uuid::Builder::from_random_bytes(bytes).into_uuid();
                format!("{}-{}", kind.prefix(), uuid.simple())
            }
            Err(err) => {
                tracing::warn!("entropy source unavailable, using composite id: {}", err);
                format!("{}-{}", kind.prefix(), composite_suffix())
            }
        }
    }
}

fn composite_suffix() -> String {
    let now = chrono::Utc::now();
    let counter = FALLBACK_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!(
        "{:x}{:x}-{:x}-{:x}",
        now.timestamp_millis(),
        now.timestamp_subsec_nanos(),
        std::process::id(),
        counter
    )
}

/// Deterministic ids of the form `<prefix>-<n>`, counted per namespace.
#[derive(Debug, Default, Clone)]
pub struct SequentialIdGenerator {
    counters: HashMap<EntityKind, u64>,
}

impl SequentialIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&mut self, kind: EntityKind) -> String {
        let counter = self.counters.entry(kind).or_insert(0);
        *counter += 1;
        format!("{}-{}", kind.prefix(), counter)
    }
}

/// Build the generator selected by configuration.
pub fn generator_for(strategy: IdStrategy) -> Box<dyn IdGenerator> {
    match strategy {
        IdStrategy::Random => Box::new(RandomIdGenerator::new()),
        IdStrategy::Sequential => Box::new(SequentialIdGenerator::new()),
    }
}
