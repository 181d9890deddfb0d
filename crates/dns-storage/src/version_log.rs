//! Version log for incremental zone synchronization
//!
//! Every committed write transaction appends one [`ChangeEntry`] describing
//! the operations it applied. A consumer that knows an older version can ask
//! for the [`ZoneDelta`] bringing it up to date, as long as the log still
//! holds every entry since that version.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use dns_core::{DnsResult, Name, RecordSet, Selector};
use serde::{Deserialize, Serialize};

/// One storage operation applied by a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeOperation {
    PutRdataset { name: Name, rdataset: RecordSet },
    DeleteRdataset { name: Name, selector: Selector },
    DeleteName { name: Name },
}

/// The changes made by one committed transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEntry {
    /// Position in the log, starting at 1
    pub sequence: u64,
    pub from_version: u64,
    pub to_version: u64,
    pub timestamp: DateTime<Utc>,
    /// The transaction replaced the whole zone
    pub replacement: bool,
    pub operations: Vec<ChangeOperation>,
}

/// Operations leading from one version to a later one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneDelta {
    pub from_version: u64,
    pub to_version: u64,
    pub operations: Vec<ChangeOperation>,
}

/// Version log statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionLogStatistics {
    pub retained_entries: usize,
    pub retained_operations: usize,
    pub evicted_entries: u64,
    pub current_version: u64,
}

/// Bounded log of committed changes
#[derive(Debug)]
pub struct VersionLog {
    entries: VecDeque<ChangeEntry>,
    max_entries: usize,
    next_sequence: u64,
    evicted_entries: u64,
    current_version: u64,
}

impl VersionLog {
    /// Create an empty log for a zone currently at `current_version`
    pub fn new(current_version: u64, max_entries: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_entries: max_entries.max(1),
            next_sequence: 1,
            evicted_entries: 0,
            current_version,
        }
    }

    /// Record a committed transaction moving the zone to `to_version`
    pub fn append(&mut self, to_version: u64, replacement: bool, operations: Vec<ChangeOperation>) -> &ChangeEntry {
        let entry = ChangeEntry {
            sequence: self.next_sequence,
            from_version: self.current_version,
            to_version,
            timestamp: Utc::now(),
            replacement,
            operations,
        };
        self.next_sequence += 1;
        self.current_version = to_version;

        while self.entries.len() >= self.max_entries {
            self.entries.pop_front();
            self.evicted_entries += 1;
        }

        tracing::debug!(
            sequence = entry.sequence,
            from_version = entry.from_version,
            to_version,
            operations = entry.operations.len(),
            "Appended version log entry"
        );

        self.entries.push_back(entry);
        &self.entries[self.entries.len() - 1]
    }

    /// Changes needed to bring `version` up to the current version
    ///
    /// Returns `None` when the log no longer covers `version`, when
    /// `version` is newer than the zone, or when a whole-zone replacement
    /// happened in between. The caller then needs a full copy of the zone.
    pub fn changes_since(&self, version: u64) -> Option<ZoneDelta> {
        if version > self.current_version {
            return None;
        }
        if version == self.current_version {
            return Some(ZoneDelta {
                from_version: version,
                to_version: version,
                operations: Vec::new(),
            });
        }

        let start = self.entries.iter().position(|e| e.from_version == version)?;
        let mut operations = Vec::new();
        for entry in self.entries.iter().skip(start) {
            if entry.replacement {
                return None;
            }
            operations.extend(entry.operations.iter().cloned());
        }

        Some(ZoneDelta {
            from_version: version,
            to_version: self.current_version,
            operations,
        })
    }

    pub fn entries(&self) -> impl Iterator<Item = &ChangeEntry> {
        self.entries.iter()
    }

    pub fn current_version(&self) -> u64 {
        self.current_version
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize the retained entries as JSON
    pub fn export_json(&self) -> DnsResult<String> {
        let entries: Vec<&ChangeEntry> = self.entries.iter().collect();
        Ok(serde_json::to_string_pretty(&entries)?)
    }

    pub fn statistics(&self) -> VersionLogStatistics {
        VersionLogStatistics {
            retained_entries: self.entries.len(),
            retained_operations: self.entries.iter().map(|e| e.operations.len()).sum(),
            evicted_entries: self.evicted_entries,
            current_version: self.current_version,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dns_core::{DnsClass, RecordData, RecordType};

    fn delete_op(name: &str) -> ChangeOperation {
        ChangeOperation::DeleteName { name: name.parse().unwrap() }
    }

    #[test]
    fn test_append_tracks_versions() {
        let mut log = VersionLog::new(0, 10);
        let entry = log.append(1, false, vec![delete_op("a")]);
        assert_eq!(entry.sequence, 1);
        assert_eq!(entry.from_version, 0);
        assert_eq!(entry.to_version, 1);

        log.append(2, false, vec![delete_op("b")]);
        assert_eq!(log.current_version(), 2);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_changes_since_concatenates_in_order() {
        let mut log = VersionLog::new(0, 10);
        log.append(1, false, vec![delete_op("a")]);
        log.append(2, false, vec![delete_op("b"), delete_op("c")]);

        let delta = log.changes_since(0).unwrap();
        assert_eq!(delta.from_version, 0);
        assert_eq!(delta.to_version, 2);
        assert_eq!(delta.operations, vec![delete_op("a"), delete_op("b"), delete_op("c")]);

        let delta = log.changes_since(1).unwrap();
        assert_eq!(delta.operations, vec![delete_op("b"), delete_op("c")]);

        assert!(log.changes_since(2).unwrap().operations.is_empty());
        assert!(log.changes_since(3).is_none());
    }

    #[test]
    fn test_eviction_loses_old_history() {
        let mut log = VersionLog::new(0, 2);
        log.append(1, false, vec![delete_op("a")]);
        log.append(2, false, vec![delete_op("b")]);
        log.append(3, false, vec![delete_op("c")]);

        assert_eq!(log.len(), 2);
        assert!(log.changes_since(0).is_none());
        assert_eq!(log.changes_since(1).unwrap().operations.len(), 2);

        let stats = log.statistics();
        assert_eq!(stats.evicted_entries, 1);
        assert_eq!(stats.retained_operations, 2);
        assert_eq!(stats.current_version, 3);
    }

    #[test]
    fn test_replacement_requires_full_copy() {
        let mut log = VersionLog::new(0, 10);
        log.append(1, false, vec![delete_op("a")]);
        log.append(2, true, vec![delete_op("b")]);

        assert!(log.changes_since(0).is_none());
        assert!(log.changes_since(1).is_none());
        assert!(log.changes_since(2).is_some());
    }

    #[test]
    fn test_export_json() {
        let mut log = VersionLog::new(0, 10);
        let rdataset = dns_core::RecordSet::from_rdata(300, RecordData::A("192.0.2.1".parse().unwrap()));
        log.append(1, false, vec![
            ChangeOperation::PutRdataset { name: "www".parse().unwrap(), rdataset },
            ChangeOperation::DeleteRdataset {
                name: "old".parse().unwrap(),
                selector: dns_core::Selector::new(DnsClass::IN, RecordType::TXT),
            },
        ]);

        let json = log.export_json().unwrap();
        let parsed: Vec<ChangeEntry> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].operations.len(), 2);
        assert_eq!(parsed[0].to_version, 1);
    }
}
