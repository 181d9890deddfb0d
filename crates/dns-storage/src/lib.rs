//! Transactional zone storage
//!
//! This crate provides transactions over DNS zone data: argument
//! normalization, add/replace/delete semantics over a pluggable storage
//! backend, and a versioned in-memory zone as the reference backend.

pub mod args;
pub mod backend;
pub mod config;
pub mod memory;
pub mod transaction;
pub mod version_log;

pub use args::{
    normalize_delete_target, normalize_records, parse_delete_target, parse_records, DeleteScope, DeleteTarget,
    NameArg, Records, TxnArg,
};
pub use backend::{RdatasetIter, StoredRecordSet, TransactionManager, ZoneBackend};
pub use config::ZoneConfig;
pub use memory::{MemoryBackend, MemoryZone, ZoneVersion};
pub use transaction::{SetSerial, Transaction, TransactionState};
pub use version_log::{ChangeEntry, ChangeOperation, VersionLog, VersionLogStatistics, ZoneDelta};
