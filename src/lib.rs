// ============================================================================
// Company Profile Sync Library
// ============================================================================
//
// Maintains one authoritative, versioned record per company from out-of-order
// deltas, and keeps parent/UK-establishment links consistent.

pub mod api;
pub mod config;
pub mod delta;
pub mod error;
pub mod etag;
pub mod model;
pub mod notify;
pub mod store;
pub mod sync;

pub use api::build_router;
pub use config::{AppConfig, SyncPolicy};
pub use delta::{DeltaAt, is_stale};
pub use error::{Result, SyncError, SyncErrorKind};
pub use model::{CompanyProfile, CompanyRecord, LinkType, Links, ProfileDelta};
pub use notify::{ChangeNotifier, HttpChangeNotifier, NoopNotifier, ResourceChanged};
pub use store::{InMemoryRecordStore, RecordStore, WriteOutcome};
pub use sync::CompanySyncService;
