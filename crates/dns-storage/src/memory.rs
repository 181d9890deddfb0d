//! In-memory versioned zone storage
//!
//! [`MemoryZone`] keeps each published version of the zone as an immutable
//! snapshot behind an `Arc`. Readers take the current snapshot and never
//! wait. Writers are serialized by a zone-wide writer lock held for the
//! writer's whole lifetime, stage their changes in a private copy of the
//! snapshot, and publish a new version on commit.
//!
//! Owner names are stored relative to the zone origin.

use std::collections::BTreeMap;
use std::sync::Arc;

use dns_core::{DnsClass, DnsError, DnsResult, ImmutableRecordSet, Name, RecordSet, RecordType, Selector};
use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex, RwLock};
use tracing::{debug, info, warn};

use crate::backend::{RdatasetIter, StoredRecordSet, TransactionManager, ZoneBackend};
use crate::config::ZoneConfig;
use crate::transaction::Transaction;
use crate::version_log::{ChangeOperation, VersionLog, VersionLogStatistics, ZoneDelta};

type Node = BTreeMap<Selector, ImmutableRecordSet>;

/// One published version of a zone
#[derive(Debug, Default)]
pub struct ZoneVersion {
    id: u64,
    origin: Option<Name>,
    nodes: BTreeMap<Name, Node>,
}

impl ZoneVersion {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn origin(&self) -> Option<&Name> {
        self.origin.as_ref()
    }

    pub fn name_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn rdataset_count(&self) -> usize {
        self.nodes.values().map(BTreeMap::len).sum()
    }

    /// Look up a record set by origin-relative name
    pub fn get(&self, name: &Name, selector: &Selector) -> Option<&ImmutableRecordSet> {
        self.nodes.get(name).and_then(|node| node.get(selector))
    }
}

struct ZoneShared {
    class: DnsClass,
    validate_on_commit: bool,
    current: RwLock<Arc<ZoneVersion>>,
    writer_lock: Arc<Mutex<()>>,
    version_log: Mutex<VersionLog>,
}

/// A zone held in memory
#[derive(Clone)]
pub struct MemoryZone {
    shared: Arc<ZoneShared>,
}

impl MemoryZone {
    /// Create an empty zone with default settings
    pub fn new(origin: Option<Name>, class: DnsClass) -> DnsResult<Self> {
        let defaults = ZoneConfig::default();
        Self::with_settings(origin, class, defaults.validate_on_commit, defaults.max_journal_entries)
    }

    /// Create an empty zone from configuration
    pub fn from_config(config: &ZoneConfig) -> DnsResult<Self> {
        config.validate()?;
        Self::with_settings(
            config.origin_name()?,
            config.zone_class()?,
            config.validate_on_commit,
            config.max_journal_entries,
        )
    }

    fn with_settings(
        origin: Option<Name>,
        class: DnsClass,
        validate_on_commit: bool,
        max_journal_entries: usize,
    ) -> DnsResult<Self> {
        if let Some(origin) = &origin {
            if !origin.is_absolute() {
                return Err(DnsError::invalid_name(origin.to_string(), "zone origin must be absolute"));
            }
        }

        info!(
            origin = %origin.as_ref().map(Name::to_string).unwrap_or_default(),
            %class,
            validate_on_commit,
            "Created in-memory zone"
        );

        let initial = ZoneVersion { id: 0, origin, nodes: BTreeMap::new() };
        Ok(Self {
            shared: Arc::new(ZoneShared {
                class,
                validate_on_commit,
                current: RwLock::new(Arc::new(initial)),
                writer_lock: Arc::new(Mutex::new(())),
                version_log: Mutex::new(VersionLog::new(0, max_journal_entries)),
            }),
        })
    }

    pub fn class(&self) -> DnsClass {
        self.shared.class
    }

    pub fn origin(&self) -> Option<Name> {
        self.snapshot().origin.clone()
    }

    /// Id of the current version; 0 before the first commit
    pub fn version(&self) -> u64 {
        self.snapshot().id
    }

    /// The current published version
    pub fn snapshot(&self) -> Arc<ZoneVersion> {
        self.shared.current.read().clone()
    }

    /// Changes bringing `version` up to date, if still known
    pub fn changes_since(&self, version: u64) -> Option<ZoneDelta> {
        self.shared.version_log.lock().changes_since(version)
    }

    pub fn log_statistics(&self) -> VersionLogStatistics {
        self.shared.version_log.lock().statistics()
    }

    /// Retained version log entries as JSON
    pub fn export_log_json(&self) -> DnsResult<String> {
        self.shared.version_log.lock().export_json()
    }

    /// Begin a writer without waiting for the writer lock
    ///
    /// Fails with `ConcurrencyError` while another writer is open.
    pub fn try_writer(&self, replacement: bool) -> DnsResult<Transaction<MemoryBackend>> {
        let guard = self.shared.writer_lock.try_lock_arc().ok_or_else(|| DnsError::ConcurrencyError {
            message: "another writer is active on this zone".to_string(),
        })?;
        Ok(self.open_writer(guard, replacement))
    }

    fn open_writer(&self, guard: ArcMutexGuard<RawMutex, ()>, replacement: bool) -> Transaction<MemoryBackend> {
        let base = self.snapshot();
        let nodes = if replacement { BTreeMap::new() } else { base.nodes.clone() };
        debug!(base_version = base.id, replacement, "Opening zone writer");

        let write = WriteState {
            origin: base.origin.clone(),
            nodes,
            replacement,
            operations: Vec::new(),
            _guard: guard,
        };
        let backend = MemoryBackend {
            shared: self.shared.clone(),
            base,
            write: Some(write),
        };
        Transaction::new(backend, replacement, false)
    }
}

impl TransactionManager for MemoryZone {
    type Backend = MemoryBackend;

    fn reader(&self) -> DnsResult<Transaction<MemoryBackend>> {
        let backend = MemoryBackend {
            shared: self.shared.clone(),
            base: self.snapshot(),
            write: None,
        };
        Ok(Transaction::new(backend, false, true))
    }

    /// Blocks until no other writer is open
    fn writer(&self, replacement: bool) -> DnsResult<Transaction<MemoryBackend>> {
        let guard = self.shared.writer_lock.lock_arc();
        Ok(self.open_writer(guard, replacement))
    }
}

/// Staged state of an open writer
struct WriteState {
    origin: Option<Name>,
    nodes: BTreeMap<Name, Node>,
    replacement: bool,
    operations: Vec<ChangeOperation>,
    _guard: ArcMutexGuard<RawMutex, ()>,
}

/// Backend half of a [`MemoryZone`] transaction
pub struct MemoryBackend {
    shared: Arc<ZoneShared>,
    base: Arc<ZoneVersion>,
    write: Option<WriteState>,
}

impl MemoryBackend {
    /// Id of the version this transaction started from
    pub fn base_version(&self) -> u64 {
        self.base.id
    }

    fn nodes(&self) -> &BTreeMap<Name, Node> {
        match &self.write {
            Some(write) => &write.nodes,
            None => &self.base.nodes,
        }
    }

    fn origin(&self) -> Option<&Name> {
        match &self.write {
            Some(write) => write.origin.as_ref(),
            None => self.base.origin.as_ref(),
        }
    }

    fn write_state(&mut self) -> DnsResult<&mut WriteState> {
        self.write.as_mut().ok_or_else(|| DnsError::InvalidState {
            message: "write attempted on a zone reader".to_string(),
        })
    }

    /// Storage key for `name`: relative to the origin
    fn key(&self, name: &Name) -> DnsResult<Name> {
        if !name.is_absolute() {
            return Ok(name.clone());
        }
        match self.origin() {
            Some(origin) if name.is_subdomain(origin) => Ok(name.relativize(origin)),
            Some(origin) => Err(DnsError::invalid_name(
                name.to_string(),
                format!("not a subdomain of the zone origin {}", origin),
            )),
            None => Ok(name.clone()),
        }
    }

    fn validate(&self, write: &WriteState) -> DnsResult<()> {
        if write.origin.is_none() {
            return Err(DnsError::commit_failed("zone has no origin"));
        }
        let apex = write.nodes.get(&Name::empty());
        let has = |rtype: RecordType| {
            apex.map_or(false, |node| node.contains_key(&Selector::new(self.shared.class, rtype)))
        };
        if !has(RecordType::SOA) {
            return Err(DnsError::commit_failed("no SOA RR at the zone origin"));
        }
        if !has(RecordType::NS) {
            return Err(DnsError::commit_failed("no NS RRset at the zone origin"));
        }
        Ok(())
    }
}

impl ZoneBackend for MemoryBackend {
    fn get_rdataset(&self, name: &Name, selector: &Selector) -> DnsResult<Option<StoredRecordSet>> {
        let key = self.key(name)?;
        Ok(self
            .nodes()
            .get(&key)
            .and_then(|node| node.get(selector))
            .map(|rdataset| StoredRecordSet::Shared(rdataset.clone())))
    }

    fn put_rdataset(&mut self, name: &Name, rdataset: RecordSet) -> DnsResult<()> {
        if rdataset.class() != self.shared.class {
            return Err(DnsError::invalid_argument(format!(
                "record set class {} does not match zone class {}",
                rdataset.class(),
                self.shared.class
            )));
        }
        let key = self.key(name)?;
        let write = self.write_state()?;
        let stored = ImmutableRecordSet::new(rdataset);
        write
            .nodes
            .entry(key.clone())
            .or_default()
            .insert(stored.selector(), stored.clone());
        write.operations.push(ChangeOperation::PutRdataset {
            name: key,
            rdataset: stored.to_mutable(),
        });
        Ok(())
    }

    fn delete_name(&mut self, name: &Name) -> DnsResult<()> {
        let key = self.key(name)?;
        let write = self.write_state()?;
        if write.nodes.remove(&key).is_some() {
            write.operations.push(ChangeOperation::DeleteName { name: key });
        }
        Ok(())
    }

    fn delete_rdataset(&mut self, name: &Name, selector: &Selector) -> DnsResult<()> {
        let key = self.key(name)?;
        let write = self.write_state()?;
        let Some(node) = write.nodes.get_mut(&key) else {
            return Ok(());
        };
        if node.remove(selector).is_some() {
            if node.is_empty() {
                write.nodes.remove(&key);
            }
            write.operations.push(ChangeOperation::DeleteRdataset { name: key, selector: *selector });
        }
        Ok(())
    }

    fn name_exists(&self, name: &Name) -> DnsResult<bool> {
        let key = self.key(name)?;
        Ok(self.nodes().contains_key(&key))
    }

    fn end_transaction(&mut self, commit: bool) -> DnsResult<()> {
        let Some(write) = self.write.take() else {
            return Ok(());
        };
        if !commit {
            debug!(staged = write.operations.len(), "Discarding staged zone changes");
            return Ok(());
        }
        if !write.replacement && write.operations.is_empty() {
            debug!(version = self.base.id, "Writer made no changes");
            return Ok(());
        }
        if self.shared.validate_on_commit {
            if let Err(err) = self.validate(&write) {
                warn!(error = %err, "Zone failed validation, rolling back");
                return Err(err);
            }
        }

        let mut current = self.shared.current.write();
        let id = current.id + 1;
        *current = Arc::new(ZoneVersion {
            id,
            origin: write.origin,
            nodes: write.nodes,
        });
        drop(current);

        let operations = write.operations.len();
        self.shared
            .version_log
            .lock()
            .append(id, write.replacement, write.operations);

        info!(version = id, operations, replacement = write.replacement, "Published zone version");
        Ok(())
    }

    fn set_origin(&mut self, origin: &Name) -> DnsResult<()> {
        if !origin.is_absolute() {
            return Err(DnsError::invalid_name(origin.to_string(), "zone origin must be absolute"));
        }
        let write = self.write_state()?;
        match &write.origin {
            Some(existing) if existing != origin => Err(DnsError::InvalidState {
                message: format!("zone origin is already {}", existing),
            }),
            _ => {
                write.origin = Some(origin.clone());
                Ok(())
            }
        }
    }

    fn iter_rdatasets(&self) -> DnsResult<RdatasetIter<'_>> {
        let iter = self.nodes().iter().flat_map(|(name, node)| {
            node.values()
                .map(move |rdataset| (name.clone(), StoredRecordSet::Shared(rdataset.clone())))
        });
        Ok(Box::new(iter))
    }
}
