//! Argument forms accepted by zone transaction operations
//!
//! Callers describe what to add or delete with [`Records`] and
//! [`DeleteTarget`]; the `normalize_*` functions turn those into a canonical
//! owner name plus record set or selector. [`parse_records`] and
//! [`parse_delete_target`] accept a loosely typed argument list for
//! front ends (update message handlers, zone file loaders) that see the
//! arguments one at a time.

use std::collections::VecDeque;

use dns_core::{
    DnsClass, DnsError, DnsResult, Name, RRset, RecordData, RecordSet, RecordType, Selector,
    MAX_TTL,
};

/// An owner name, either parsed or still text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameArg {
    Name(Name),
    Text(String),
}

impl NameArg {
    /// Resolve to a name; text is parsed without an origin
    pub fn resolve(self) -> DnsResult<Name> {
        match self {
            Self::Name(name) => Ok(name),
            Self::Text(text) => Name::from_text(&text, None),
        }
    }
}

impl From<Name> for NameArg {
    fn from(name: Name) -> Self {
        Self::Name(name)
    }
}

impl From<&Name> for NameArg {
    fn from(name: &Name) -> Self {
        Self::Name(name.clone())
    }
}

impl From<&str> for NameArg {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for NameArg {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

/// Data for `add` and `replace`
#[derive(Debug, Clone)]
pub enum Records {
    /// A complete rrset
    RRset(RRset),
    /// An owner name and a record set
    Rdataset { name: NameArg, rdataset: RecordSet },
    /// An owner name, a TTL and one record data value
    Rdata { name: NameArg, ttl: u32, rdata: RecordData },
}

impl Records {
    pub fn rdataset(name: impl Into<NameArg>, rdataset: RecordSet) -> Self {
        Self::Rdataset { name: name.into(), rdataset }
    }

    pub fn rdata(name: impl Into<NameArg>, ttl: u32, rdata: RecordData) -> Self {
        Self::Rdata { name: name.into(), ttl, rdata }
    }
}

impl From<RRset> for Records {
    fn from(rrset: RRset) -> Self {
        Self::RRset(rrset)
    }
}

/// What `delete` and `delete_exact` remove
#[derive(Debug, Clone)]
pub enum DeleteTarget {
    /// The members of an rrset
    RRset(RRset),
    /// The members of a record set at a name
    Rdataset { name: NameArg, rdataset: RecordSet },
    /// One record data value at a name
    Rdata { name: NameArg, rdata: RecordData },
    /// Whole record set at a name
    Selector { name: NameArg, selector: Selector },
    /// Everything at a name
    Name(NameArg),
}

impl DeleteTarget {
    pub fn rdataset(name: impl Into<NameArg>, rdataset: RecordSet) -> Self {
        Self::Rdataset { name: name.into(), rdataset }
    }

    pub fn rdata(name: impl Into<NameArg>, rdata: RecordData) -> Self {
        Self::Rdata { name: name.into(), rdata }
    }

    pub fn selector(name: impl Into<NameArg>, selector: Selector) -> Self {
        Self::Selector { name: name.into(), selector }
    }

    pub fn name(name: impl Into<NameArg>) -> Self {
        Self::Name(name.into())
    }
}

impl From<RRset> for DeleteTarget {
    fn from(rrset: RRset) -> Self {
        Self::RRset(rrset)
    }
}

/// Canonical form of a delete request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteScope {
    /// Remove these members from the matching record set
    Records(RecordSet),
    /// Remove the whole record set
    Selector(Selector),
    /// Remove every record set at the name
    Name,
}

/// Resolve an add/replace form to `(owner, record set)`
pub fn normalize_records(method: &str, records: Records) -> DnsResult<(Name, RecordSet)> {
    match records {
        Records::RRset(rrset) => Ok((rrset.name, rrset.rdataset)),
        Records::Rdataset { name, rdataset } => Ok((name.resolve()?, rdataset)),
        Records::Rdata { name, ttl, rdata } => {
            check_ttl(method, i64::from(ttl))?;
            Ok((name.resolve()?, RecordSet::from_rdata(ttl, rdata)))
        }
    }
}

/// Resolve a delete form to `(owner, what to delete)`
pub fn normalize_delete_target(target: DeleteTarget) -> DnsResult<(Name, DeleteScope)> {
    match target {
        DeleteTarget::RRset(rrset) => Ok((rrset.name, DeleteScope::Records(rrset.rdataset))),
        DeleteTarget::Rdataset { name, rdataset } => {
            Ok((name.resolve()?, DeleteScope::Records(rdataset)))
        }
        DeleteTarget::Rdata { name, rdata } => {
            Ok((name.resolve()?, DeleteScope::Records(RecordSet::from_rdata(0, rdata))))
        }
        DeleteTarget::Selector { name, selector } => {
            Ok((name.resolve()?, DeleteScope::Selector(selector)))
        }
        DeleteTarget::Name(name) => Ok((name.resolve()?, DeleteScope::Name)),
    }
}

fn check_ttl(method: &str, ttl: i64) -> DnsResult<u32> {
    if ttl < 0 {
        return Err(DnsError::invalid_argument(format!("{}: TTL value is negative", method)));
    }
    if ttl > i64::from(MAX_TTL) {
        return Err(DnsError::invalid_argument(format!("{}: TTL value too big", method)));
    }
    Ok(ttl as u32)
}

/// One loosely typed argument
#[derive(Debug, Clone)]
pub enum TxnArg {
    Name(Name),
    Text(String),
    RRset(RRset),
    Rdataset(RecordSet),
    Ttl(i64),
    Rdata(RecordData),
    Class(DnsClass),
    Type(RecordType),
}

impl TxnArg {
    fn kind(&self) -> &'static str {
        match self {
            Self::Name(_) | Self::Text(_) => "name",
            Self::RRset(_) => "rrset",
            Self::Rdataset(_) => "rdataset",
            Self::Ttl(_) => "TTL",
            Self::Rdata(_) => "rdata",
            Self::Class(_) => "class",
            Self::Type(_) => "type",
        }
    }
}

/// Parse `rrset` | `name, rdataset` | `name, ttl, rdata` for add/replace
pub fn parse_records(method: &str, args: Vec<TxnArg>) -> DnsResult<Records> {
    let mut args: VecDeque<TxnArg> = args.into();
    let first = args.pop_front().ok_or_else(|| {
        DnsError::invalid_argument(format!("not enough parameters to {}", method))
    })?;

    let records = match first {
        TxnArg::RRset(rrset) => Records::RRset(rrset),
        TxnArg::Name(name) => records_from_args(method, NameArg::Name(name), &mut args)?,
        TxnArg::Text(text) => records_from_args(method, NameArg::Text(text), &mut args)?,
        other => return Err(requires_name_or_rrset(method, &other)),
    };

    ensure_consumed(method, &args)?;
    Ok(records)
}

/// Parse the delete forms:
/// `rrset` | `name` | `name, class, type[, covers]` | `name, rdataset` | `name, rdata`
pub fn parse_delete_target(method: &str, args: Vec<TxnArg>) -> DnsResult<DeleteTarget> {
    let mut args: VecDeque<TxnArg> = args.into();
    let first = args.pop_front().ok_or_else(|| {
        DnsError::invalid_argument(format!("not enough parameters to {}", method))
    })?;

    let name = match first {
        TxnArg::RRset(rrset) => {
            ensure_consumed(method, &args)?;
            return Ok(DeleteTarget::RRset(rrset));
        }
        TxnArg::Name(name) => NameArg::Name(name),
        TxnArg::Text(text) => NameArg::Text(text),
        other => return Err(requires_name_or_rrset(method, &other)),
    };

    let target = match args.pop_front() {
        None => DeleteTarget::Name(name),
        Some(TxnArg::Class(class)) => {
            let rtype = match args.pop_front() {
                Some(TxnArg::Type(rtype)) => rtype,
                Some(other) => {
                    return Err(DnsError::invalid_argument(format!(
                        "{}: expected a type, got a {}",
                        method,
                        other.kind()
                    )))
                }
                None => return Err(expected_more(method)),
            };
            let covers = match args.front() {
                Some(TxnArg::Type(covers)) => {
                    let covers = *covers;
                    args.pop_front();
                    Some(covers)
                }
                _ => None,
            };
            DeleteTarget::Selector { name, selector: Selector { class, rtype, covers } }
        }
        Some(TxnArg::Rdataset(rdataset)) => DeleteTarget::Rdataset { name, rdataset },
        Some(TxnArg::Rdata(rdata)) => DeleteTarget::Rdata { name, rdata },
        Some(other) => {
            return Err(DnsError::invalid_argument(format!(
                "{}: expected an rdata, got a {}",
                method,
                other.kind()
            )))
        }
    };

    ensure_consumed(method, &args)?;
    Ok(target)
}

fn records_from_args(method: &str, name: NameArg, args: &mut VecDeque<TxnArg>) -> DnsResult<Records> {
    match args.pop_front() {
        Some(TxnArg::Rdataset(rdataset)) => Ok(Records::Rdataset { name, rdataset }),
        Some(TxnArg::Ttl(ttl)) => {
            let ttl = check_ttl(method, ttl)?;
            match args.pop_front() {
                Some(TxnArg::Rdata(rdata)) => Ok(Records::Rdata { name, ttl, rdata }),
                Some(other) => Err(DnsError::invalid_argument(format!(
                    "{}: expected an rdata, got a {}",
                    method,
                    other.kind()
                ))),
                None => Err(expected_more(method)),
            }
        }
        Some(other) => Err(DnsError::invalid_argument(format!(
            "{}: expected a TTL, got a {}",
            method,
            other.kind()
        ))),
        None => Err(expected_more(method)),
    }
}

fn ensure_consumed(method: &str, args: &VecDeque<TxnArg>) -> DnsResult<()> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(DnsError::invalid_argument(format!("extra parameters to {}", method)))
    }
}

fn expected_more(method: &str) -> DnsError {
    DnsError::invalid_argument(format!("{}: expected more arguments", method))
}

fn requires_name_or_rrset(method: &str, arg: &TxnArg) -> DnsError {
    DnsError::invalid_argument(format!(
        "{} requires a name or RRset as the first argument, got a {}",
        method,
        arg.kind()
    ))
}
