//! Course Learning Outcome authoring core.
//!
//! Holds the data model behind the CLO studio and the rules that keep it
//! consistent while a single author edits it:
//!
//! - **Identifier allocation**: stable `CLO<n>` ids that are never reused
//! - **Entity store**: course, ordered CLOs, CLO→PLO mapping and evaluations,
//!   persisted to named string slots after every accepted mutation
//! - **Mapping engine**: toggle/query over the CLO→PLO relation
//! - **Aggregation**: dashboard statistics derived from a snapshot
//! - **Bulk load**: all-or-nothing replacement from a sample bundle
//! - **Report export**: paginated report built from a read-only snapshot
//!
//! # Key Components
//!
//! - [`CurriculumStore`]: the single mutation entry point
//! - [`SlotStorage`]: get/set/remove over named string slots
//! - [`Snapshot`]: the four persisted collections read together
//! - [`ReportDocument`]: export input for document renderers
//!
//! # Example
//!
//! ```ignore
//! use curriculum::{BloomLevel, CurriculumStore, MemoryStorage, SkillType};
//!
//! let mut store = CurriculumStore::open(MemoryStorage::new());
//! let clo = store.add_clo("Explain X", BloomLevel::Understanding, SkillType::TechnicalSkill)?;
//! store.toggle_mapping(&clo.id, &"PLO2".into())?;
//! let stats = curriculum::aggregate::dashboard(store.snapshot());
//! ```

pub mod aggregate;
pub mod allocator;
pub mod catalog;
pub mod evaluation;
pub mod mapping;
pub mod persistence;
pub mod report;
pub mod sample;
pub mod store;
pub mod types;

// Re-export main types
pub use aggregate::{AchievementPoint, DashboardStats, MappedRatio};
pub use allocator::IdAllocator;
pub use catalog::plo_catalog;
pub use evaluation::reconcile_evaluations;
pub use mapping::{MappingError, PloMapping};
pub use persistence::{MemoryStorage, PersistenceError, SlotStorage, Snapshot};
pub use report::{export_snapshot, DocumentExporter, ExportError, MarkdownExporter, ReportDocument};
pub use sample::SampleBundle;
pub use store::{CurriculumStore, StoreError, StoreEvent, SubscriptionId};
pub use types::*;
