//! Storage backend contract for zone transactions
//!
//! A [`ZoneBackend`] owns the stored data and its consistency. The
//! [`Transaction`](crate::Transaction) layered on top only ever talks to
//! storage through these point operations.
//!
//! Backends must serialize concurrent transactions themselves: at most one
//! writer at a time, and readers are never blocked by a writer. Within one
//! transaction, reads must observe that transaction's own earlier writes.

use dns_core::{DnsError, DnsResult, ImmutableRecordSet, Name, RecordSet, Selector};

use crate::transaction::Transaction;

/// A record set as handed out by a backend
///
/// Backends that keep published values in shared immutable form return them
/// as `Shared`; backends that keep mutable values return an owned copy.
#[derive(Debug, Clone)]
pub enum StoredRecordSet {
    Shared(ImmutableRecordSet),
    Owned(RecordSet),
}

impl StoredRecordSet {
    pub fn as_record_set(&self) -> &RecordSet {
        match self {
            Self::Shared(rdataset) => &**rdataset,
            Self::Owned(rdataset) => rdataset,
        }
    }

    /// Wrap as a read-only value for a caller
    pub fn into_immutable(self) -> ImmutableRecordSet {
        match self {
            Self::Shared(rdataset) => rdataset,
            Self::Owned(rdataset) => ImmutableRecordSet::new(rdataset),
        }
    }
}

/// Iterator over the `(name, record set)` pairs visible to a transaction
pub type RdatasetIter<'a> = Box<dyn Iterator<Item = (Name, StoredRecordSet)> + 'a>;

/// Operations a storage implementation provides to a transaction
pub trait ZoneBackend {
    /// The record set stored at `name` for `selector`, if any
    fn get_rdataset(&self, name: &Name, selector: &Selector) -> DnsResult<Option<StoredRecordSet>>;

    /// Store `rdataset`, replacing whatever was at its selector
    fn put_rdataset(&mut self, name: &Name, rdataset: RecordSet) -> DnsResult<()>;

    /// Delete everything stored at `name`. Not an error if nothing is there.
    fn delete_name(&mut self, name: &Name) -> DnsResult<()>;

    /// Delete the record set at `name` for `selector`. Not an error if it
    /// does not exist.
    fn delete_rdataset(&mut self, name: &Name, selector: &Selector) -> DnsResult<()>;

    /// Does any data exist at `name`?
    fn name_exists(&self, name: &Name) -> DnsResult<bool>;

    /// Commit or roll back. Called exactly once per transaction.
    ///
    /// A commit that fails must leave storage as if the transaction had
    /// been rolled back.
    fn end_transaction(&mut self, commit: bool) -> DnsResult<()>;

    /// Set the origin while loading relativized data
    fn set_origin(&mut self, _origin: &Name) -> DnsResult<()> {
        Err(DnsError::not_supported("set_origin"))
    }

    /// Iterate the data visible to this transaction
    fn iter_rdatasets(&self) -> DnsResult<RdatasetIter<'_>> {
        Err(DnsError::not_supported("iteration"))
    }
}

/// Factory for transactions over one store
pub trait TransactionManager {
    type Backend: ZoneBackend;

    /// Begin a read-only transaction
    fn reader(&self) -> DnsResult<Transaction<Self::Backend>>;

    /// Begin a writable transaction
    ///
    /// When `replacement` is true, the content written by the transaction
    /// completely replaces any prior content instead of updating it.
    fn writer(&self, replacement: bool) -> DnsResult<Transaction<Self::Backend>>;

    /// Run `f` in a reader, ending it when `f` returns
    fn with_reader<T, F>(&self, f: F) -> DnsResult<T>
    where
        F: FnOnce(&mut Transaction<Self::Backend>) -> DnsResult<T>,
    {
        self.reader()?.run(f)
    }

    /// Run `f` in a writer, committing on `Ok` and rolling back on `Err`
    fn with_writer<T, F>(&self, replacement: bool, f: F) -> DnsResult<T>
    where
        F: FnOnce(&mut Transaction<Self::Backend>) -> DnsResult<T>,
    {
        self.writer(replacement)?.run(f)
    }
}
