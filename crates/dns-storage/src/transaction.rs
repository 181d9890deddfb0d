//! Zone transactions
//!
//! A [`Transaction`] gives uniform add/replace/delete semantics over any
//! [`ZoneBackend`]. Every mutating call normalizes its arguments, reads the
//! existing record set, applies the set algebra and writes the result back.
//! Nothing is written until all checks for the call have passed.
//!
//! A transaction ends exactly once: by [`commit`](Transaction::commit),
//! [`rollback`](Transaction::rollback), the scoped [`run`](Transaction::run),
//! or by being dropped while still open, which rolls it back.

use std::fmt;

use dns_core::{
    DnsClass, DnsError, DnsResult, ImmutableRecordSet, Name, RecordSet, RecordType, Selector,
    MAX_SERIAL,
};
use tracing::{debug, info, warn};

use crate::args::{normalize_delete_target, normalize_records, DeleteScope, DeleteTarget, NameArg, Records};
use crate::backend::ZoneBackend;

/// Transaction lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Accepting operations
    Open,
    /// Committed successfully
    Committed,
    /// Rolled back, or the commit was rejected
    RolledBack,
}

/// Parameters for [`Transaction::set_serial`]
#[derive(Debug, Clone)]
pub struct SetSerial {
    /// Added to the current serial when no explicit value is given
    pub increment: i64,
    /// Explicit new serial
    pub value: Option<i64>,
    /// Owner of the SOA record set; defaults to the zone apex
    pub name: NameArg,
    pub class: DnsClass,
}

impl Default for SetSerial {
    fn default() -> Self {
        Self {
            increment: 1,
            value: None,
            name: NameArg::Name(Name::empty()),
            class: DnsClass::IN,
        }
    }
}

impl SetSerial {
    pub fn increment(increment: i64) -> Self {
        Self { increment, ..Self::default() }
    }

    pub fn value(value: i64) -> Self {
        Self { value: Some(value), ..Self::default() }
    }

    pub fn at(mut self, name: impl Into<NameArg>) -> Self {
        self.name = name.into();
        self
    }

    pub fn in_class(mut self, class: DnsClass) -> Self {
        self.class = class;
        self
    }
}

/// A transaction over zone data held by a backend
pub struct Transaction<B: ZoneBackend> {
    backend: B,
    replacement: bool,
    read_only: bool,
    state: TransactionState,
}

impl<B: ZoneBackend> Transaction<B> {
    /// Open a transaction over `backend`
    pub fn new(backend: B, replacement: bool, read_only: bool) -> Self {
        Self {
            backend,
            replacement,
            read_only,
            state: TransactionState::Open,
        }
    }

    /// Do this transaction's writes replace the whole zone?
    pub fn replacement(&self) -> bool {
        self.replacement
    }

    pub fn read_only(&self) -> bool {
        self.read_only
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// The backend this transaction runs against
    pub fn backend(&self) -> &B {
        &self.backend
    }

    // ========== Reads ==========

    /// The record set at `name` for `selector`, or `None` if there is none
    ///
    /// The result is a read-only value detached from later writes.
    pub fn get(&self, name: impl Into<NameArg>, selector: Selector) -> DnsResult<Option<ImmutableRecordSet>> {
        let name = name.into().resolve()?;
        let stored = self.backend.get_rdataset(&name, &selector)?;
        Ok(stored.map(|rdataset| rdataset.into_immutable()))
    }

    /// Does any data exist at `name`?
    pub fn name_exists(&self, name: impl Into<NameArg>) -> DnsResult<bool> {
        let name = name.into().resolve()?;
        self.backend.name_exists(&name)
    }

    /// Iterate every `(name, record set)` visible to this transaction
    ///
    /// Fails with `NotSupported` when the backend cannot iterate.
    pub fn iter(&self) -> DnsResult<impl Iterator<Item = (Name, ImmutableRecordSet)> + '_> {
        let rdatasets = self.backend.iter_rdatasets()?;
        Ok(rdatasets.map(|(name, rdataset)| (name, rdataset.into_immutable())))
    }

    // ========== Writes ==========

    fn check_read_only(&self) -> DnsResult<()> {
        if self.read_only {
            return Err(DnsError::ReadOnly);
        }
        Ok(())
    }

    /// Add records, merging them into any existing record set
    pub fn add(&mut self, records: impl Into<Records>) -> DnsResult<()> {
        self.check_read_only()?;
        self.add_records(false, records.into())
    }

    /// Replace the record set at the records' selector
    ///
    /// Other record sets at the same name are left alone. To replace a whole
    /// name, delete it and then add or replace each record set.
    pub fn replace(&mut self, records: impl Into<Records>) -> DnsResult<()> {
        self.check_read_only()?;
        self.add_records(true, records.into())
    }

    /// Delete records; missing data is not an error
    pub fn delete(&mut self, target: impl Into<DeleteTarget>) -> DnsResult<()> {
        self.check_read_only()?;
        self.delete_target(false, target.into())
    }

    /// Delete records, failing with `DeleteNotExact` unless everything named
    /// by `target` exists
    pub fn delete_exact(&mut self, target: impl Into<DeleteTarget>) -> DnsResult<()> {
        self.check_read_only()?;
        self.delete_target(true, target.into())
    }

    /// Change the SOA serial and return the new value
    ///
    /// The new serial is `params.value` when given, otherwise the current
    /// serial plus `params.increment`. A result outside `1..=0xFFFFFFFF`
    /// becomes 1.
    pub fn set_serial(&mut self, params: SetSerial) -> DnsResult<u32> {
        self.check_read_only()?;

        let name = params.name.resolve()?;
        let selector = Selector::new(params.class, RecordType::SOA);
        let not_found = || DnsError::record_not_found(name.to_string(), RecordType::SOA.to_u16());

        let stored = self.backend.get_rdataset(&name, &selector)?.ok_or_else(not_found)?;
        let existing = stored.as_record_set();
        let soa = existing.first().ok_or_else(not_found)?;
        let current = soa.serial().ok_or_else(|| DnsError::InvalidState {
            message: format!("SOA record set at {} holds non-SOA data", name),
        })?;

        let computed = match params.value {
            Some(value) => value,
            None => i64::from(current).saturating_add(params.increment),
        };
        let serial = if (1..=i64::from(MAX_SERIAL)).contains(&computed) {
            computed as u32
        } else {
            1
        };

        let rdataset = RecordSet::from_rdata_in_class(params.class, existing.ttl(), soa.with_serial(serial)?);
        debug!(name = %name, old_serial = current, new_serial = serial, "Setting zone serial");
        self.replace(Records::rdataset(name, rdataset))?;
        Ok(serial)
    }

    /// Set the origin while loading relativized data
    pub fn set_origin(&mut self, origin: &Name) -> DnsResult<()> {
        self.check_read_only()?;
        self.backend.set_origin(origin)
    }

    fn add_records(&mut self, replace: bool, records: Records) -> DnsResult<()> {
        let method = if replace { "replace()" } else { "add()" };
        let (name, rdataset) = normalize_records(method, records)?;
        let selector = rdataset.selector();

        let rdataset = if replace {
            rdataset
        } else {
            match self.backend.get_rdataset(&name, &selector)? {
                Some(existing) => existing.as_record_set().union(&rdataset)?,
                None => rdataset,
            }
        };

        debug!(%name, %selector, count = rdataset.len(), method, "Writing record set");
        if rdataset.is_empty() {
            self.backend.delete_rdataset(&name, &selector)
        } else {
            self.backend.put_rdataset(&name, rdataset)
        }
    }

    fn delete_target(&mut self, exact: bool, target: DeleteTarget) -> DnsResult<()> {
        let method = if exact { "delete_exact()" } else { "delete()" };
        let (name, scope) = normalize_delete_target(target)?;

        match scope {
            DeleteScope::Selector(selector) => {
                if self.backend.get_rdataset(&name, &selector)?.is_none() {
                    if exact {
                        return Err(DnsError::delete_not_exact(format!("{}: missing rdataset", method)));
                    }
                    return Ok(());
                }
                debug!(%name, %selector, method, "Deleting record set");
                self.backend.delete_rdataset(&name, &selector)
            }
            DeleteScope::Records(rdataset) => {
                let selector = rdataset.selector();
                let existing = match self.backend.get_rdataset(&name, &selector)? {
                    Some(existing) => existing,
                    None if exact => {
                        return Err(DnsError::delete_not_exact(format!("{}: missing rdataset", method)))
                    }
                    None => return Ok(()),
                };
                let existing = existing.as_record_set();

                if exact && existing.intersection(&rdataset) != rdataset {
                    return Err(DnsError::delete_not_exact(format!("{}: missing rdatas", method)));
                }

                let remainder = existing.difference(&rdataset);
                if remainder.len() == existing.len() {
                    return Ok(());
                }
                debug!(%name, %selector, removed = existing.len() - remainder.len(), method, "Deleting records");
                if remainder.is_empty() {
                    self.backend.delete_rdataset(&name, &selector)
                } else {
                    self.backend.put_rdataset(&name, remainder)
                }
            }
            DeleteScope::Name => {
                if exact && !self.backend.name_exists(&name)? {
                    return Err(DnsError::delete_not_exact(format!("{}: name not known", method)));
                }
                debug!(%name, method, "Deleting name");
                self.backend.delete_name(&name)
            }
        }
    }

    // ========== Lifecycle ==========

    /// Commit the transaction
    ///
    /// If the backend rejects the commit the transaction counts as rolled
    /// back and the backend's error is returned.
    pub fn commit(mut self) -> DnsResult<()> {
        self.end(true)
    }

    /// Roll the transaction back
    pub fn rollback(mut self) -> DnsResult<()> {
        self.end(false)
    }

    /// Run `f` inside this transaction
    ///
    /// Commits when `f` returns `Ok` and rolls back when it returns `Err`.
    /// On rollback the error from `f` is returned, not any error from the
    /// rollback itself.
    pub fn run<T, F>(mut self, f: F) -> DnsResult<T>
    where
        F: FnOnce(&mut Self) -> DnsResult<T>,
    {
        match f(&mut self) {
            Ok(value) => {
                self.end(true)?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.end(false) {
                    warn!(error = %rollback_err, "Rollback failed after transaction error");
                }
                Err(err)
            }
        }
    }

    fn end(&mut self, commit: bool) -> DnsResult<()> {
        if self.state != TransactionState::Open {
            return Ok(());
        }

        let result = self.backend.end_transaction(commit);
        self.state = match (&result, commit) {
            (Ok(()), true) => TransactionState::Committed,
            _ => TransactionState::RolledBack,
        };

        match &result {
            Ok(()) if commit => info!(replacement = self.replacement, "Transaction committed"),
            Ok(()) => debug!(read_only = self.read_only, "Transaction rolled back"),
            Err(err) => warn!(error = %err, commit, "Transaction end failed"),
        }
        result
    }
}

impl<B: ZoneBackend> fmt::Debug for Transaction<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("replacement", &self.replacement)
            .field("read_only", &self.read_only)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<B: ZoneBackend> Drop for Transaction<B> {
    fn drop(&mut self) {
        if self.state == TransactionState::Open {
            if !self.read_only {
                warn!("Open transaction dropped, rolling back");
            }
            let _ = self.end(false);
        }
    }
}
