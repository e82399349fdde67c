//! Multi-phase deployments across process restarts

use crate::{final_owner, operator, params, TestSession};
use keystone::{
    Address, ContractInfo, DataType, DeployKind, Error, FileStorage, InMemoryDeployer, JsonCodec,
    ManualClock, MemoryStorage, Session, SessionConfig, Storage, Timestamp,
    OWNERSHIP_DEPLOYER_OWNED, OWNERSHIP_TRANSFERRED,
};

fn oracle_info() -> ContractInfo<'static> {
    ContractInfo::new("Oracle", "src/Oracle.sol", "core")
}

#[test]
fn test_phase_two_continues_phase_one() {
    let mut phase1 = TestSession::started();
    let oracle = phase1
        .session
        .deploy_contract("oracle", b"oracle", 0, oracle_info())
        .unwrap();
    phase1.session.set_uint("fee", 30).unwrap();
    phase1.session.finish().unwrap();

    let storage = MemoryStorage::with_contents(phase1.persisted());
    let mut phase2 = TestSession::with_storage(SessionConfig::for_deployer(operator()), storage);
    phase2.clock.advance(86_400, 7_200);
    phase2.session.start_from_storage(params()).unwrap();

    assert_eq!(phase2.session.address_of("oracle").unwrap(), oracle);
    assert!(matches!(
        phase2.session.deploy_contract("oracle", b"oracle", 0, oracle_info()),
        Err(Error::ContractAlreadyExists(k)) if k == "oracle"
    ));

    phase2.session.set_address_from_string("treasury", "oracle").unwrap();
    phase2.session.finish().unwrap();

    let runs = phase2.session.runs();
    assert_eq!(runs.len(), 2);
    assert!(runs[1].start_timestamp > runs[0].finish_timestamp);
    assert_eq!(phase2.session.get_address("treasury").unwrap(), oracle);
}

#[test]
fn test_resume_rejects_other_salt() {
    let mut phase1 = TestSession::started();
    phase1.session.finish().unwrap();

    let mut phase2 = TestSession::new(SessionConfig::for_deployer(operator()));
    let mut p = params();
    p.salt_prefix = "bao-v2".to_string();
    assert!(matches!(
        phase2.session.start(p, Some(&phase1.persisted())),
        Err(Error::ResumeMismatch { field: "systemSaltString", .. })
    ));
}

#[test]
fn test_empty_storage_starts_fresh() {
    let mut t = TestSession::new(SessionConfig::for_deployer(operator()));
    t.session.start_from_storage(params()).unwrap();
    assert_eq!(t.session.runs().len(), 1);
}

#[test]
fn test_salt_prefix_alias_accepted() {
    let mut phase1 = TestSession::started();
    phase1.session.finish().unwrap();
    let legacy = phase1
        .persisted()
        .replacen("\"systemSaltString\": \"bao-v1\",\n  \"chainId\"", "\"saltPrefix\": \"bao-v1\",\n  \"chainId\"", 1);
    assert!(legacy.contains("\"saltPrefix\""));

    let mut phase2 = TestSession::new(SessionConfig::for_deployer(operator()));
    phase2.session.start(params(), Some(&legacy)).unwrap();
    assert_eq!(phase2.session.salt_prefix(), "bao-v1");
}

#[test]
fn test_file_backed_resume() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("deployments").join("mainnet").join("bao-v1.json");
    let clock = ManualClock::new(Timestamp::from_secs(1_700_000_000), 1);

    let build = |clock: &ManualClock| {
        Session::new(
            SessionConfig::for_deployer(operator()),
            crate::schema(),
            Box::new(clock.clone()),
            Box::new(InMemoryDeployer::new(crate::deployer_service(), operator())),
            Box::new(FileStorage::new(&path)),
        )
        .unwrap()
    };

    let mut first = build(&clock);
    first.start(params(), None).unwrap();
    let predicted = first.predict("oracle", DeployKind::Contract);
    first
        .deploy_contract("oracle", b"oracle", 0, oracle_info())
        .unwrap();
    first.finish().unwrap();

    let on_disk = FileStorage::new(&path).load().unwrap().unwrap();
    assert_eq!(on_disk, first.render().unwrap());

    clock.advance(60, 5);
    let mut second = build(&clock);
    second.start_from_storage(params()).unwrap();
    assert_eq!(second.address_of("oracle").unwrap(), predicted);
    assert_eq!(
        JsonCodec::new()
            .parse(&FileStorage::new(&path).load().unwrap().unwrap(), crate::schema())
            .unwrap()
            .runs
            .len(),
        2
    );
}

#[test]
fn test_state_document_reload_guards_duplicates() {
    let mut t = TestSession::started();
    t.session
        .register_proxy("BTC.pegged", Address::from_low_u64(0x1001), &[], "Pegged", "p", None)
        .unwrap();
    t.session.finish().unwrap();

    let mut next = TestSession::new(SessionConfig::for_deployer(operator()));
    next.session.start(params(), Some(&t.persisted())).unwrap();
    let again = next
        .session
        .register_proxy("BTC.pegged", Address::from_low_u64(0x1001), &[], "Pegged", "p", None)
        .unwrap();
    assert!(again.already_existed());
    assert!(matches!(
        next.session
            .register_proxy("ETH.pegged", Address::from_low_u64(0x1001), &[], "Pegged", "p", None),
        Err(Error::DuplicateImplementation { .. })
    ));
}

#[test]
fn test_finish_transfers_proxies_from_prior_phase() {
    let mut config = SessionConfig::for_deployer(operator());
    config.transfer_ownership = false;
    let mut phase1 = TestSession::new(config);
    phase1.session.start(params(), None).unwrap();
    phase1
        .session
        .register_proxy("BTC.pegged", Address::from_low_u64(0x1001), &[], "Pegged", "p", None)
        .unwrap();
    phase1.session.finish().unwrap();
    assert_eq!(
        phase1.session.get_address("BTC.pegged.owner").unwrap(),
        operator()
    );

    let mut phase2 = TestSession::new(SessionConfig::for_deployer(operator()));
    phase2.session.start(params(), Some(&phase1.persisted())).unwrap();
    assert_eq!(
        phase2.session.store().schema().lookup("BTC.pegged").unwrap(),
        DataType::Proxy
    );
    assert_eq!(
        phase2
            .session
            .get_string("BTC.pegged.implementation.ownershipModel")
            .unwrap(),
        OWNERSHIP_DEPLOYER_OWNED
    );

    phase2.session.finish().unwrap();
    assert_eq!(
        phase2.session.get_address("BTC.pegged.owner").unwrap(),
        final_owner()
    );
    assert_eq!(
        phase2
            .session
            .get_string("BTC.pegged.implementation.ownershipModel")
            .unwrap(),
        OWNERSHIP_TRANSFERRED
    );
}

#[test]
fn test_library_kind_survives_resume() {
    let mut phase1 = TestSession::started();
    phase1
        .session
        .deploy_library("math", b"math", ContractInfo::new("Math", "src/Math.sol", "library"))
        .unwrap();
    phase1.session.finish().unwrap();

    let mut phase2 = TestSession::new(SessionConfig::for_deployer(operator()));
    phase2.session.start(params(), Some(&phase1.persisted())).unwrap();
    assert_eq!(phase2.session.field("math", "kind").unwrap(), "library");
    assert!(matches!(
        phase2
            .session
            .deploy_library("math", b"math", ContractInfo::new("Math", "src/Math.sol", "library")),
        Err(Error::LibraryAlreadyExists(k)) if k == "math"
    ));
}

#[test]
fn test_control_characters_never_reach_the_document() {
    let mut t = TestSession::started();
    assert!(matches!(
        t.session.set_string("label", "line1\nline2"),
        Err(Error::InvalidJsonValue { key, .. }) if key == "label"
    ));
    t.session.set_string("label", "line1 line2").unwrap();
    t.session.finish().unwrap();

    let mut next = TestSession::new(SessionConfig::for_deployer(operator()));
    next.session.start(params(), Some(&t.persisted())).unwrap();
    assert_eq!(next.session.get_string("label").unwrap(), "line1 line2");
}
