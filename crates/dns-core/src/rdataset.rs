//! Record set values and the set algebra zone transactions are built on
//!
//! [`RecordSet`] is the mutable working value used for staging and for the
//! algebra. [`ImmutableRecordSet`] is what readers get back: it derefs to a
//! shared `&RecordSet` and has no mutating methods of its own, so caller
//! code cannot change a published value.
//!
//! ```compile_fail
//! use dns_core::{ImmutableRecordSet, RecordData, RecordSet};
//!
//! let published = ImmutableRecordSet::new(RecordSet::from_rdata(
//!     300,
//!     RecordData::A("192.0.2.1".parse().unwrap()),
//! ));
//! published.add(RecordData::A("192.0.2.2".parse().unwrap()), 300).unwrap();
//! ```

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{DnsError, DnsResult};
use crate::name::Name;
use crate::types::{DnsClass, RecordData, RecordType};

/// The (class, type, covers) triple naming a record set under a name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Selector {
    pub class: DnsClass,
    pub rtype: RecordType,
    pub covers: Option<RecordType>,
}

impl Selector {
    pub fn new(class: DnsClass, rtype: RecordType) -> Self {
        Self { class, rtype, covers: None }
    }

    /// Selector for a wrapping type such as RRSIG
    pub fn with_covers(class: DnsClass, rtype: RecordType, covers: RecordType) -> Self {
        Self { class, rtype, covers: Some(covers) }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.covers {
            Some(covers) => write!(f, "{} {}({})", self.class, self.rtype, covers),
            None => write!(f, "{} {}", self.class, self.rtype),
        }
    }
}

/// A set of record data sharing class, type, covers and TTL
///
/// Adding record data that is already present is a no-op apart from TTL
/// reconciliation, so the members always form a set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordSet {
    class: DnsClass,
    rtype: RecordType,
    covers: Option<RecordType>,
    ttl: u32,
    rdatas: Vec<RecordData>,
}

impl RecordSet {
    /// Create an empty record set
    pub fn new(class: DnsClass, rtype: RecordType, covers: Option<RecordType>, ttl: u32) -> Self {
        Self { class, rtype, covers, ttl, rdatas: Vec::new() }
    }

    /// Create a single-member IN record set
    pub fn from_rdata(ttl: u32, rdata: RecordData) -> Self {
        Self::from_rdata_in_class(DnsClass::IN, ttl, rdata)
    }

    /// Create a single-member record set in `class`
    pub fn from_rdata_in_class(class: DnsClass, ttl: u32, rdata: RecordData) -> Self {
        Self {
            class,
            rtype: rdata.record_type(),
            covers: rdata.covers(),
            ttl,
            rdatas: vec![rdata],
        }
    }

    pub fn class(&self) -> DnsClass {
        self.class
    }

    pub fn rtype(&self) -> RecordType {
        self.rtype
    }

    pub fn covers(&self) -> Option<RecordType> {
        self.covers
    }

    pub fn ttl(&self) -> u32 {
        self.ttl
    }

    pub fn selector(&self) -> Selector {
        Selector { class: self.class, rtype: self.rtype, covers: self.covers }
    }

    pub fn len(&self) -> usize {
        self.rdatas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rdatas.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RecordData> {
        self.rdatas.iter()
    }

    /// First member in insertion order
    pub fn first(&self) -> Option<&RecordData> {
        self.rdatas.first()
    }

    pub fn contains(&self, rdata: &RecordData) -> bool {
        self.rdatas.contains(rdata)
    }

    /// Lower the TTL to `ttl`, or set it outright on an empty set
    pub fn update_ttl(&mut self, ttl: u32) {
        if self.rdatas.is_empty() || ttl < self.ttl {
            self.ttl = ttl;
        }
    }

    /// Add record data with the given TTL
    pub fn add(&mut self, rdata: RecordData, ttl: u32) -> DnsResult<()> {
        if rdata.record_type() != self.rtype || rdata.covers() != self.covers {
            return Err(DnsError::invalid_argument(format!(
                "cannot add {} data to a {} record set",
                rdata.record_type(),
                self.selector()
            )));
        }
        self.update_ttl(ttl);
        if !self.rdatas.contains(&rdata) {
            self.rdatas.push(rdata);
        }
        Ok(())
    }

    /// Add every member of `other` using its TTL
    pub fn union_update(&mut self, other: &RecordSet) -> DnsResult<()> {
        if self.selector() != other.selector() {
            return Err(DnsError::invalid_argument(format!(
                "incompatible record sets: {} and {}",
                self.selector(),
                other.selector()
            )));
        }
        for rdata in &other.rdatas {
            self.add(rdata.clone(), other.ttl)?;
        }
        Ok(())
    }

    /// Members of either set; the TTL is the smaller of the two
    pub fn union(&self, other: &RecordSet) -> DnsResult<RecordSet> {
        let mut result = self.clone();
        result.union_update(other)?;
        Ok(result)
    }

    /// Members present in both sets, keeping this set's TTL
    pub fn intersection(&self, other: &RecordSet) -> RecordSet {
        self.retain_copy(|rdata| other.selector() == self.selector() && other.contains(rdata))
    }

    /// Members of this set absent from `other`, keeping this set's TTL
    pub fn difference(&self, other: &RecordSet) -> RecordSet {
        self.retain_copy(|rdata| other.selector() != self.selector() || !other.contains(rdata))
    }

    fn retain_copy<F>(&self, keep: F) -> RecordSet
    where
        F: Fn(&RecordData) -> bool,
    {
        RecordSet {
            class: self.class,
            rtype: self.rtype,
            covers: self.covers,
            ttl: self.ttl,
            rdatas: self.rdatas.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }
}

/// Set equality: same selector and the same members, in any order.
/// The TTL does not take part.
impl PartialEq for RecordSet {
    fn eq(&self, other: &Self) -> bool {
        self.selector() == other.selector()
            && self.rdatas.len() == other.rdatas.len()
            && self.rdatas.iter().all(|r| other.rdatas.contains(r))
    }
}

impl Eq for RecordSet {}

impl<'a> IntoIterator for &'a RecordSet {
    type Item = &'a RecordData;
    type IntoIter = std::slice::Iter<'a, RecordData>;

    fn into_iter(self) -> Self::IntoIter {
        self.rdatas.iter()
    }
}

/// A published, read-only record set
///
/// Cloning shares the underlying value. Use [`to_mutable`](Self::to_mutable)
/// to get a detached working copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImmutableRecordSet {
    inner: Arc<RecordSet>,
}

impl ImmutableRecordSet {
    pub fn new(rdataset: RecordSet) -> Self {
        Self { inner: Arc::new(rdataset) }
    }

    /// Detached mutable copy
    pub fn to_mutable(&self) -> RecordSet {
        self.inner.as_ref().clone()
    }

    /// True when both handles share the same stored value
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Deref for ImmutableRecordSet {
    type Target = RecordSet;

    fn deref(&self) -> &RecordSet {
        &self.inner
    }
}

impl From<RecordSet> for ImmutableRecordSet {
    fn from(rdataset: RecordSet) -> Self {
        Self::new(rdataset)
    }
}

impl PartialEq<RecordSet> for ImmutableRecordSet {
    fn eq(&self, other: &RecordSet) -> bool {
        self.inner.as_ref() == other
    }
}

/// A record set together with its owner name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RRset {
    pub name: Name,
    pub rdataset: RecordSet,
}

impl RRset {
    pub fn new(name: Name, rdataset: RecordSet) -> Self {
        Self { name, rdataset }
    }

    /// Single-member IN rrset
    pub fn from_rdata(name: Name, ttl: u32, rdata: RecordData) -> Self {
        Self::new(name, RecordSet::from_rdata(ttl, rdata))
    }
}
