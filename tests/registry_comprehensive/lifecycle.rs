//! Session lifecycle, parameters and persistence

use crate::{operator, params, TestSession};
use keystone::{Error, SessionConfig, SessionStatus};

#[test]
fn test_start_twice_fails() {
    let mut t = TestSession::started();
    assert!(matches!(
        t.session.start(params(), None),
        Err(Error::AlreadyInitialized)
    ));
}

#[test]
fn test_finish_not_before_start() {
    let mut t = TestSession::started();
    t.clock.advance(90, 7);
    t.session.finish().unwrap();

    let run = t.session.current_run().unwrap();
    assert!(run.finish_timestamp >= run.start_timestamp);
    assert!(run.finish_block >= run.start_block);
    assert_eq!(run.finish_block - run.start_block, 7);
    assert_eq!(t.session.status(), SessionStatus::Finished);
}

#[test]
fn test_finish_in_same_second_and_block() {
    let mut t = TestSession::started();
    t.session.finish().unwrap();
    let run = t.session.current_run().unwrap();
    assert_eq!(run.finish_timestamp, run.start_timestamp);
    assert!(run.is_finished());
}

#[test]
fn test_parameter_write_once() {
    let mut t = TestSession::started();
    t.session.set_uint("fee", 30).unwrap();
    assert!(matches!(
        t.session.set_uint("fee", 30),
        Err(Error::ParameterAlreadyExists(k)) if k == "fee"
    ));
}

#[test]
fn test_typed_reads() {
    let mut t = TestSession::started();
    t.session.set_uint("fee", 30).unwrap();
    t.session.set_int("offset", -2).unwrap();
    t.session.set_bool("paused", true).unwrap();
    t.session.set_string("label", "pegged BTC").unwrap();

    assert_eq!(t.session.get_uint("fee").unwrap(), 30);
    assert_eq!(t.session.get_int("offset").unwrap(), -2);
    assert!(t.session.get_bool("paused").unwrap());
    assert_eq!(t.session.get_string("label").unwrap(), "pegged BTC");

    assert!(matches!(
        t.session.get_int("fee"),
        Err(Error::ReadTypeMismatch { .. })
    ));
    assert!(matches!(
        t.session.get_address("treasury"),
        Err(Error::ValueNotSet(k)) if k == "treasury"
    ));
}

#[test]
fn test_has_reports_parents() {
    let mut t = TestSession::started();
    assert!(!t.session.store().has("networks"));
    t.session.set_string("networks.base.rpc", "https://base").unwrap();
    assert!(t.session.store().has("networks"));
    assert!(t.session.store().has("networks.base"));
    assert!(t.session.store().has("networks.base.rpc"));
    assert!(!t.session.store().has("networks.optimism"));
}

#[test]
fn test_keys_in_first_write_order() {
    let mut t = TestSession::started();
    t.session.set_uint("fee", 1).unwrap();
    t.session.set_string("label", "x").unwrap();
    t.session.set_uint("networks.base.chainId", 8453).unwrap();
    assert_eq!(
        t.session.store().keys(),
        &["fee", "label", "networks.base.chainId"]
    );
}

#[test]
fn test_failed_call_writes_nothing() {
    let mut t = TestSession::started();
    let saves = t.storage.save_count();
    assert!(t.session.set_string("fee", "thirty").is_err());
    assert!(t.session.set_uint("undeclared", 1).is_err());
    assert!(!t.session.store().has_value("fee"));
    assert_eq!(t.storage.save_count(), saves);

    t.session.set_uint("fee", 30).unwrap();
    assert_eq!(t.session.get_uint("fee").unwrap(), 30);
}

#[test]
fn test_every_mutation_persists_current_state() {
    let mut t = TestSession::started();
    t.session.set_uint("fee", 30).unwrap();
    assert_eq!(t.persisted(), t.session.render().unwrap());
}

#[test]
fn test_on_finish_persists_once() {
    let mut config = SessionConfig::for_deployer(operator());
    config.persist = "on-finish".to_string();
    let mut t = TestSession::new(config);
    t.session.start(params(), None).unwrap();
    t.session.set_uint("fee", 30).unwrap();
    t.session.set_string("label", "x").unwrap();
    assert!(t.storage.contents().is_none());

    t.session.finish().unwrap();
    assert_eq!(t.storage.save_count(), 1);
    assert!(t.persisted().contains("\"fee\": 30"));
}

#[test]
fn test_invalid_config_rejected_at_construction() {
    let mut config = SessionConfig::for_deployer(operator());
    config.persist = "weekly".to_string();
    let err = keystone::Session::new(
        config,
        crate::schema(),
        Box::new(keystone::SystemClock::new()),
        Box::new(keystone::InMemoryDeployer::new(
            crate::deployer_service(),
            operator(),
        )),
        Box::new(keystone::MemoryStorage::new()),
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)));
}
