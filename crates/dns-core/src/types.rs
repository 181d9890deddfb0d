//! Core DNS types and constants

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{DnsError, DnsResult};

/// DNS record types as defined in RFCs
///
/// Types without a named variant are carried as `Unknown(code)`. Equality,
/// hashing and ordering go by the type code, so `Unknown(1)` is `A`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum RecordType {
    A,
    NS,
    CNAME,
    SOA,
    PTR,
    MX,
    TXT,
    AAAA,
    SRV,
    NAPTR,
    DS,
    RRSIG,
    NSEC,
    DNSKEY,
    NSEC3,
    NSEC3PARAM,
    TLSA,
    CDS,
    CDNSKEY,
    ZONEMD,
    SVCB,
    HTTPS,
    CAA,
    Unknown(u16),
}

impl RecordType {
    /// Convert from u16; every code has a representation
    pub fn from_u16(value: u16) -> Self {
        match value {
            1 => Self::A,
            2 => Self::NS,
            5 => Self::CNAME,
            6 => Self::SOA,
            12 => Self::PTR,
            15 => Self::MX,
            16 => Self::TXT,
            28 => Self::AAAA,
            33 => Self::SRV,
            35 => Self::NAPTR,
            43 => Self::DS,
            46 => Self::RRSIG,
            47 => Self::NSEC,
            48 => Self::DNSKEY,
            50 => Self::NSEC3,
            51 => Self::NSEC3PARAM,
            52 => Self::TLSA,
            59 => Self::CDS,
            60 => Self::CDNSKEY,
            63 => Self::ZONEMD,
            64 => Self::SVCB,
            65 => Self::HTTPS,
            257 => Self::CAA,
            other => Self::Unknown(other),
        }
    }

    /// Convert to u16
    pub fn to_u16(self) -> u16 {
        match self {
            Self::A => 1,
            Self::NS => 2,
            Self::CNAME => 5,
            Self::SOA => 6,
            Self::PTR => 12,
            Self::MX => 15,
            Self::TXT => 16,
            Self::AAAA => 28,
            Self::SRV => 33,
            Self::NAPTR => 35,
            Self::DS => 43,
            Self::RRSIG => 46,
            Self::NSEC => 47,
            Self::DNSKEY => 48,
            Self::NSEC3 => 50,
            Self::NSEC3PARAM => 51,
            Self::TLSA => 52,
            Self::CDS => 59,
            Self::CDNSKEY => 60,
            Self::ZONEMD => 63,
            Self::SVCB => 64,
            Self::HTTPS => 65,
            Self::CAA => 257,
            Self::Unknown(code) => code,
        }
    }
}

impl PartialEq for RecordType {
    fn eq(&self, other: &Self) -> bool {
        self.to_u16() == other.to_u16()
    }
}

impl Eq for RecordType {}

impl Hash for RecordType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_u16().hash(state);
    }
}

impl PartialOrd for RecordType {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RecordType {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_u16().cmp(&other.to_u16())
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match Self::from_u16(self.to_u16()) {
            Self::Unknown(code) => write!(f, "TYPE{}", code),
            known => fmt::Debug::fmt(&known, f),
        }
    }
}

/// DNS class (usually IN for Internet)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u16)]
pub enum DnsClass {
    IN = 1,    // Internet
    CS = 2,    // CSNET (obsolete)
    CH = 3,    // Chaos
    HS = 4,    // Hesiod
}

impl Default for DnsClass {
    fn default() -> Self {
        Self::IN
    }
}

impl fmt::Display for DnsClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl FromStr for DnsClass {
    type Err = DnsError;

    fn from_str(s: &str) -> DnsResult<Self> {
        match s.to_ascii_uppercase().as_str() {
            "IN" => Ok(Self::IN),
            "CS" => Ok(Self::CS),
            "CH" => Ok(Self::CH),
            "HS" => Ok(Self::HS),
            _ => Err(DnsError::invalid_argument(format!("unknown DNS class: {}", s))),
        }
    }
}

/// DNS record data variants
///
/// Equality is structural: two values are the same record data exactly
/// when every field matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordData {
    A(Ipv4Addr),
    AAAA(Ipv6Addr),
    CNAME(String),
    MX { priority: u16, exchange: String },
    NS(String),
    PTR(String),
    TXT(Vec<String>),
    SRV { priority: u16, weight: u16, port: u16, target: String },
    SOA {
        mname: String,
        rname: String,
        serial: u32,
        refresh: u32,
        retry: u32,
        expire: u32,
        minimum: u32,
    },
    // DNSSEC records
    DNSKEY { flags: u16, protocol: u8, algorithm: u8, public_key: Bytes },
    DS { key_tag: u16, algorithm: u8, digest_type: u8, digest: Bytes },
    RRSIG {
        type_covered: u16,
        algorithm: u8,
        labels: u8,
        original_ttl: u32,
        signature_expiration: u32,
        signature_inception: u32,
        key_tag: u16,
        signer_name: String,
        signature: Bytes,
    },
    CAA { flags: u8, tag: String, value: Bytes },
    // Opaque data for types without a structured form here
    Unknown { record_type: RecordType, data: Bytes },
}

impl RecordData {
    /// The record type this data belongs to
    pub fn record_type(&self) -> RecordType {
        match self {
            Self::A(_) => RecordType::A,
            Self::AAAA(_) => RecordType::AAAA,
            Self::CNAME(_) => RecordType::CNAME,
            Self::MX { .. } => RecordType::MX,
            Self::NS(_) => RecordType::NS,
            Self::PTR(_) => RecordType::PTR,
            Self::TXT(_) => RecordType::TXT,
            Self::SRV { .. } => RecordType::SRV,
            Self::SOA { .. } => RecordType::SOA,
            Self::DNSKEY { .. } => RecordType::DNSKEY,
            Self::DS { .. } => RecordType::DS,
            Self::RRSIG { .. } => RecordType::RRSIG,
            Self::CAA { .. } => RecordType::CAA,
            Self::Unknown { record_type, .. } => *record_type,
        }
    }

    /// The type wrapped by this data, for signature records
    pub fn covers(&self) -> Option<RecordType> {
        match self {
            Self::RRSIG { type_covered, .. } => Some(RecordType::from_u16(*type_covered)),
            _ => None,
        }
    }

    /// The SOA serial, if this is SOA data
    pub fn serial(&self) -> Option<u32> {
        match self {
            Self::SOA { serial, .. } => Some(*serial),
            _ => None,
        }
    }

    /// Copy of this SOA data with only the serial changed
    pub fn with_serial(&self, new_serial: u32) -> DnsResult<Self> {
        match self {
            Self::SOA { mname, rname, refresh, retry, expire, minimum, .. } => Ok(Self::SOA {
                mname: mname.clone(),
                rname: rname.clone(),
                serial: new_serial,
                refresh: *refresh,
                retry: *retry,
                expire: *expire,
                minimum: *minimum,
            }),
            other => Err(DnsError::invalid_argument(format!(
                "cannot set a serial on {} data",
                other.record_type()
            ))),
        }
    }
}

/// Constants
pub const MAX_DOMAIN_NAME_LENGTH: usize = 255;
pub const MAX_LABEL_LENGTH: usize = 63;
pub const MAX_TTL: u32 = 2147483647; // 2^31 - 1
pub const MAX_SERIAL: u32 = 0xFFFF_FFFF;
