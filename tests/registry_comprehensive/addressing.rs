//! Hex parsing and reference resolution

use crate::TestSession;
use keystone::{Address, ContractInfo, Error};

fn padded(tail: &str) -> String {
    format!("0x{:0>40}", tail)
}

#[test]
fn test_parse_zero() {
    assert_eq!(Address::parse(&padded("")).unwrap(), Address::ZERO);
}

#[test]
fn test_parse_mixed_case() {
    assert_eq!(
        Address::parse(&padded("bEEF")).unwrap(),
        Address::from_low_u64(0xbeef)
    );
    assert_eq!(
        Address::parse(&padded("BEEF")).unwrap().to_string(),
        padded("beef")
    );
}

#[test]
fn test_parse_errors_by_cause() {
    assert!(matches!(
        Address::parse("0xBEEF"),
        Err(Error::InvalidAddressLength { length: 6, .. })
    ));
    let no_prefix = format!("00{}", "1".repeat(40));
    assert!(matches!(
        Address::parse(&no_prefix),
        Err(Error::MissingPrefix(_))
    ));
    let bad_digit = format!("0x{}g", "1".repeat(39));
    assert!(matches!(
        Address::parse(&bad_digit),
        Err(Error::InvalidHexCharacter { character: 'g', .. })
    ));
}

#[test]
fn test_set_then_get_address() {
    let mut t = TestSession::started();
    let a = Address::from_low_u64(0x1234);
    t.session.set_address("treasury", a).unwrap();
    assert_eq!(t.session.get_address("treasury").unwrap(), a);
}

#[test]
fn test_one_hop_resolution() {
    let mut t = TestSession::started();
    let x = Address::from_low_u64(0x77);
    t.session.set_address("treasury", x).unwrap();
    t.session.set_address_from_string("feeReceiver", "treasury").unwrap();

    assert_eq!(t.session.get_address("feeReceiver").unwrap(), x);
    assert_eq!(t.session.store().raw_address("feeReceiver").unwrap(), "treasury");
    assert_eq!(
        t.session.store().try_resolve_address_value("treasury"),
        Some(x)
    );
}

#[test]
fn test_unresolved_reference_cites_target() {
    let mut t = TestSession::started();
    t.session.set_address_from_string("feeReceiver", "treasury").unwrap();
    let err = t.session.get_address("feeReceiver").unwrap_err();
    assert!(matches!(&err, Error::ValueNotSet(k) if k == "treasury"));
    assert!(err.to_string().contains("treasury"));
    assert_eq!(t.session.store().try_resolve_address_value("treasury"), None);
}

#[test]
fn test_no_second_hop() {
    let mut t = TestSession::started();
    t.session.set_address_from_string("treasury", "minters").unwrap();
    t.session.set_address_from_string("feeReceiver", "treasury").unwrap();
    assert!(t.session.get_address("feeReceiver").is_err());
}

#[test]
fn test_reference_to_contract() {
    let mut t = TestSession::started();
    let minter = t
        .session
        .register_contract(
            "minter",
            Address::from_low_u64(0x99),
            ContractInfo::new("Minter", "src/Minter.sol", "core"),
        )
        .unwrap();
    t.session.set_address_from_string("treasury", "minter").unwrap();
    assert_eq!(t.session.get_address("treasury").unwrap(), minter);
}

#[test]
fn test_dependency_not_registered() {
    let t = TestSession::started();
    assert!(matches!(
        t.session.address_of("oracle"),
        Err(Error::ContractNotFound(k)) if k == "oracle"
    ));
    assert!(matches!(
        t.session.field("oracle", "address"),
        Err(Error::ContractNotFound(k)) if k == "oracle"
    ));
}
