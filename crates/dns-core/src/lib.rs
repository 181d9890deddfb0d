//! Core DNS types, record set algebra and error handling for zone storage
//!
//! This crate provides the foundational types shared by zone transactions and
//! the storage backends behind them.

pub mod error;
pub mod types;
pub mod name;
pub mod rdataset;
pub mod logging;


pub use error::{DnsError, DnsResult};
pub use types::*;
pub use name::Name;
pub use rdataset::{ImmutableRecordSet, RRset, RecordSet, Selector};
pub use logging::{init_logging, LogFormat, LoggingConfig};
