//! Proxy registration and uniqueness

use crate::{final_owner, operator, TestSession};
use keystone::{
    Address, DeployKind, Error, OWNERSHIP_DEPLOYER_OWNED, OWNERSHIP_TRANSFERRED,
};

fn implementation(n: u64) -> Address {
    Address::from_low_u64(0x1000 + n)
}

#[test]
fn test_proxy_lands_at_predicted_address() {
    let mut t = TestSession::started();
    let predicted = t.session.predict("BTC.pegged", DeployKind::Proxy);
    let registration = t
        .session
        .register_proxy("BTC.pegged", implementation(1), b"init", "Pegged", "src/Pegged.sol", None)
        .unwrap();
    assert_eq!(registration.address(), predicted);
    assert_eq!(t.session.address_of("BTC.pegged").unwrap(), predicted);
}

#[test]
fn test_identical_proxy_reports_already_exists() {
    let mut t = TestSession::started();
    let first = t
        .session
        .register_proxy("BTC.pegged", implementation(1), &[], "Pegged", "src/Pegged.sol", None)
        .unwrap();
    let second = t
        .session
        .register_proxy("BTC.pegged", implementation(1), &[], "Pegged", "src/Pegged.sol", None)
        .unwrap();
    assert!(!first.already_existed());
    assert!(second.already_existed());
    assert_eq!(first.address(), second.address());
    assert_eq!(t.session.state().proxy_count(), 1);
}

#[test]
fn test_implementation_shared_across_proxies() {
    let mut t = TestSession::started();
    t.session
        .register_proxy("BTC.pegged", implementation(1), &[], "Pegged", "src/Pegged.sol", None)
        .unwrap();
    let err = t
        .session
        .register_proxy("ETH.pegged", implementation(1), &[], "Pegged", "src/Pegged.sol", None)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::DuplicateImplementation { address, proxy }
            if address == implementation(1) && proxy == "BTC::pegged"
    ));
}

#[test]
fn test_contract_key_cannot_become_proxy() {
    let mut t = TestSession::started();
    t.session
        .register_contract(
            "oracle",
            Address::from_low_u64(0x55),
            keystone::ContractInfo::new("Oracle", "src/Oracle.sol", "core"),
        )
        .unwrap();
    assert!(t
        .session
        .register_proxy("oracle", implementation(1), &[], "Oracle", "src/Oracle.sol", None)
        .is_err());
    assert_eq!(t.session.state().proxy_count(), 0);
}

#[test]
fn test_implementation_key_derivation() {
    let mut t = TestSession::started();
    t.session
        .register_proxy("BTC.stETH.minter", implementation(1), &[], "Minter", "src/Minter.sol", None)
        .unwrap();
    assert_eq!(
        t.session.field("BTC.stETH.minter", "implementation.key").unwrap(),
        "BTC::stETH::minter::Minter"
    );
    assert!(t.session.state().proxy("BTC::stETH::minter").is_some());
}

#[test]
fn test_explicit_owner_not_transferred() {
    let mut t = TestSession::started();
    let custodian = Address::from_low_u64(0xcc);
    t.session
        .register_proxy("BTC.pegged", implementation(1), &[], "Pegged", "p", Some(custodian))
        .unwrap();
    t.session
        .register_proxy("ETH.pegged", implementation(2), &[], "Pegged", "p", None)
        .unwrap();
    assert_eq!(
        t.session.field("ETH.pegged", "owner").unwrap(),
        operator().to_string()
    );

    t.session.finish().unwrap();
    assert_eq!(
        t.session.field("BTC.pegged", "owner").unwrap(),
        custodian.to_string()
    );
    assert_eq!(
        t.session.field("ETH.pegged", "owner").unwrap(),
        final_owner().to_string()
    );
    assert_eq!(
        t.session
            .field("ETH.pegged", "implementation.ownershipModel")
            .unwrap(),
        OWNERSHIP_TRANSFERRED
    );
}

#[test]
fn test_no_transfer_when_disabled() {
    let mut config = keystone::SessionConfig::for_deployer(operator());
    config.transfer_ownership = false;
    let mut t = TestSession::new(config);
    t.session.start(crate::params(), None).unwrap();
    t.session
        .register_proxy("BTC.pegged", implementation(1), &[], "Pegged", "p", None)
        .unwrap();
    t.session.finish().unwrap();
    assert_eq!(
        t.session
            .field("BTC.pegged", "implementation.ownershipModel")
            .unwrap(),
        OWNERSHIP_DEPLOYER_OWNED
    );
}

#[test]
fn test_state_document_sort_order() {
    let mut t = TestSession::started();
    for (n, key) in ["BTC.stETH.minter", "BTC.pegged", "BTC"].iter().enumerate() {
        t.session
            .register_proxy(key, implementation(n as u64), &[], "Pegged", "p", None)
            .unwrap();
    }
    let raw = t.session.render_state().unwrap();
    let proxies = &raw[raw.find("\"proxies\"").unwrap()..];
    let positions: Vec<usize> = ["\"BTC\": {", "\"BTC::pegged\": {", "\"BTC::stETH::minter\": {"]
        .iter()
        .map(|id| proxies.find(id).unwrap())
        .collect();
    assert!(positions[0] < positions[1] && positions[1] < positions[2]);
}
