//! Integration tests for zone transactions over the in-memory zone

use dns_core::{init_logging, DnsClass, DnsError, LoggingConfig, Name, RecordData, RecordSet, RecordType, Selector};
use dns_storage::{
    parse_delete_target, parse_records, DeleteTarget, MemoryZone, Records, SetSerial, TransactionManager, TxnArg,
};

fn setup() {
    let _ = init_logging(&LoggingConfig::default());
}

fn name(text: &str) -> Name {
    Name::from_text(text, None).unwrap()
}

fn a(addr: &str) -> RecordData {
    RecordData::A(addr.parse().unwrap())
}

fn a_set(ttl: u32, addrs: &[&str]) -> RecordSet {
    let mut set = RecordSet::new(DnsClass::IN, RecordType::A, None, ttl);
    for addr in addrs {
        set.add(a(addr), ttl).unwrap();
    }
    set
}

fn a_selector() -> Selector {
    Selector::new(DnsClass::IN, RecordType::A)
}

fn soa_selector() -> Selector {
    Selector::new(DnsClass::IN, RecordType::SOA)
}

fn soa(serial: u32) -> RecordData {
    RecordData::SOA {
        mname: "ns1.example.com.".to_string(),
        rname: "hostmaster.example.com.".to_string(),
        serial,
        refresh: 7200,
        retry: 3600,
        expire: 1209600,
        minimum: 300,
    }
}

/// A zone with SOA and NS at the apex
fn seeded_zone(serial: u32) -> MemoryZone {
    setup();
    let zone = MemoryZone::new(Some(name("example.com.")), DnsClass::IN).unwrap();
    zone.with_writer(false, |txn| {
        txn.add(Records::rdata("@", 3600, soa(serial)))?;
        txn.add(Records::rdata("@", 3600, RecordData::NS("ns1.example.com.".to_string())))
    })
    .unwrap();
    zone
}

fn current_a(zone: &MemoryZone, owner: &str) -> Option<RecordSet> {
    zone.with_reader(|txn| Ok(txn.get(owner, a_selector())?.map(|found| found.to_mutable())))
        .unwrap()
}

#[test]
fn test_add_returns_union_of_existing_and_new() {
    let zone = seeded_zone(1);
    zone.with_writer(false, |txn| txn.add(Records::rdataset("www", a_set(300, &["192.0.2.1", "192.0.2.2"]))))
        .unwrap();
    assert_eq!(current_a(&zone, "www").unwrap(), a_set(0, &["192.0.2.1", "192.0.2.2"]));

    zone.with_writer(false, |txn| txn.add(Records::rdataset("www", a_set(300, &["192.0.2.2", "192.0.2.3"]))))
        .unwrap();
    assert_eq!(
        current_a(&zone, "www").unwrap(),
        a_set(0, &["192.0.2.1", "192.0.2.2", "192.0.2.3"])
    );
}

#[test]
fn test_delete_returns_difference() {
    let zone = seeded_zone(1);
    zone.with_writer(false, |txn| {
        txn.add(Records::rdataset("www", a_set(300, &["192.0.2.1", "192.0.2.2", "192.0.2.3"])))?;
        txn.delete(DeleteTarget::rdataset("www", a_set(0, &["192.0.2.2", "192.0.2.9"])))
    })
    .unwrap();
    assert_eq!(current_a(&zone, "www").unwrap(), a_set(0, &["192.0.2.1", "192.0.2.3"]));

    zone.with_writer(false, |txn| txn.delete(DeleteTarget::rdataset("www", a_set(0, &["192.0.2.1", "192.0.2.3"]))))
        .unwrap();
    assert!(current_a(&zone, "www").is_none());
    assert!(!zone.reader().unwrap().name_exists("www").unwrap());
}

#[test]
fn test_delete_exact_leaves_state_unchanged_on_failure() {
    let zone = seeded_zone(1);
    zone.with_writer(false, |txn| txn.add(Records::rdataset("www", a_set(300, &["192.0.2.1", "192.0.2.2"]))))
        .unwrap();
    let version = zone.version();

    let err = zone
        .with_writer(false, |txn| {
            txn.add(Records::rdata("mail", 300, a("192.0.2.25")))?;
            txn.delete_exact(DeleteTarget::rdataset("www", a_set(0, &["192.0.2.1", "192.0.2.7"])))
        })
        .unwrap_err();
    assert!(matches!(err, DnsError::DeleteNotExact { .. }));
    assert_eq!(zone.version(), version);
    assert_eq!(current_a(&zone, "www").unwrap(), a_set(0, &["192.0.2.1", "192.0.2.2"]));
    assert!(current_a(&zone, "mail").is_none());

    zone.with_writer(false, |txn| txn.delete_exact(DeleteTarget::rdataset("www", a_set(0, &["192.0.2.1"]))))
        .unwrap();
    assert_eq!(current_a(&zone, "www").unwrap(), a_set(0, &["192.0.2.2"]));
}

#[test]
fn test_replace_is_never_a_union() {
    let zone = seeded_zone(1);
    zone.with_writer(false, |txn| {
        txn.add(Records::rdataset("www", a_set(300, &["192.0.2.1", "192.0.2.2"])))?;
        txn.replace(Records::rdataset("www", a_set(60, &["192.0.2.3"])))
    })
    .unwrap();

    let found = current_a(&zone, "www").unwrap();
    assert_eq!(found, a_set(0, &["192.0.2.3"]));
    assert_eq!(found.ttl(), 60);
}

#[test]
fn test_delete_of_absent_data_is_idempotent() {
    let zone = seeded_zone(1);
    zone.with_writer(false, |txn| {
        txn.delete(DeleteTarget::selector("www", a_selector()))?;
        txn.delete(DeleteTarget::selector("www", a_selector()))
    })
    .unwrap();

    let err = zone
        .with_writer(false, |txn| txn.delete_exact(DeleteTarget::selector("www", a_selector())))
        .unwrap_err();
    assert_eq!(err, DnsError::delete_not_exact("delete_exact(): missing rdataset"));
}

#[test]
fn test_serial_wraps_and_explicit_value_wins() {
    let zone = seeded_zone(0xFFFF_FFFF);
    let serial = zone.with_writer(false, |txn| txn.set_serial(SetSerial::default())).unwrap();
    assert_eq!(serial, 1);

    let zone = seeded_zone(10);
    let serial = zone.with_writer(false, |txn| txn.set_serial(SetSerial::value(5))).unwrap();
    assert_eq!(serial, 5);

    let stored = zone
        .with_reader(|txn| txn.get(name("example.com."), soa_selector()))
        .unwrap()
        .unwrap();
    assert_eq!(stored.first().and_then(|rdata| rdata.serial()), Some(5));
    assert_eq!(stored.ttl(), 3600);
}

#[test]
fn test_reader_rejects_every_write() {
    let zone = seeded_zone(1);
    let mut reader = zone.reader().unwrap();
    assert!(reader.read_only());

    assert_eq!(reader.add(Records::rdata("www", 300, a("192.0.2.1"))).unwrap_err(), DnsError::ReadOnly);
    assert_eq!(reader.replace(Records::rdata("www", 300, a("192.0.2.1"))).unwrap_err(), DnsError::ReadOnly);
    assert_eq!(reader.delete(DeleteTarget::name("@")).unwrap_err(), DnsError::ReadOnly);
    assert_eq!(reader.delete_exact(DeleteTarget::name("@")).unwrap_err(), DnsError::ReadOnly);
    assert_eq!(reader.set_serial(SetSerial::default()).unwrap_err(), DnsError::ReadOnly);
    reader.commit().unwrap();

    assert_eq!(zone.version(), 1);
}

#[test]
fn test_scoped_error_rolls_back() {
    let zone = seeded_zone(1);
    let err = zone
        .with_writer(false, |txn| -> Result<(), DnsError> {
            txn.add(Records::rdata("www", 300, a("192.0.2.1")))?;
            Err(DnsError::invalid_argument("abort"))
        })
        .unwrap_err();
    assert_eq!(err, DnsError::invalid_argument("abort"));
    assert!(current_a(&zone, "www").is_none());

    // The writer lock was released by the rollback
    zone.try_writer(false).unwrap().rollback().unwrap();
}

#[test]
fn test_returned_values_are_detached() {
    let zone = seeded_zone(1);
    zone.with_writer(false, |txn| txn.add(Records::rdata("www", 300, a("192.0.2.1")))).unwrap();

    let mut writer = zone.writer(false).unwrap();
    let found = writer.get("www", a_selector()).unwrap().unwrap();
    let mut working = found.to_mutable();
    working.add(a("192.0.2.2"), 300).unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(writer.get("www", a_selector()).unwrap().unwrap().len(), 1);

    writer.replace(Records::rdataset("www", working)).unwrap();
    assert_eq!(found.len(), 1);
    writer.commit().unwrap();

    assert_eq!(current_a(&zone, "www").unwrap().len(), 2);
}

#[test]
fn test_parsed_arguments_drive_transactions() {
    let zone = seeded_zone(1);
    zone.with_writer(false, |txn| {
        let records = parse_records(
            "add()",
            vec![TxnArg::Text("www".to_string()), TxnArg::Ttl(300), TxnArg::Rdata(a("192.0.2.1"))],
        )?;
        txn.add(records)?;

        let target = parse_delete_target(
            "delete()",
            vec![TxnArg::Text("@".to_string()), TxnArg::Class(DnsClass::IN), TxnArg::Type(RecordType::MX)],
        )?;
        txn.delete(target)
    })
    .unwrap();

    assert_eq!(current_a(&zone, "www").unwrap(), a_set(0, &["192.0.2.1"]));

    let err = parse_records("add()", vec![TxnArg::Text("www".to_string()), TxnArg::Ttl(300)]).unwrap_err();
    assert_eq!(err, DnsError::invalid_argument("add(): expected more arguments"));
}

#[test]
fn test_incremental_changes_follow_commits() {
    let zone = seeded_zone(1);
    zone.with_writer(false, |txn| {
        txn.add(Records::rdata("www", 300, a("192.0.2.1")))?;
        txn.set_serial(SetSerial::default())
    })
    .unwrap();
    zone.with_writer(false, |txn| txn.delete(DeleteTarget::name("www"))).unwrap();

    let delta = zone.changes_since(1).unwrap();
    assert_eq!(delta.from_version, 1);
    assert_eq!(delta.to_version, 3);
    assert_eq!(delta.operations.len(), 3);

    let stats = zone.log_statistics();
    assert_eq!(stats.retained_entries, 3);
    assert_eq!(stats.current_version, 3);
}
