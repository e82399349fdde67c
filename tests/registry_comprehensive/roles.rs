//! Role values, grantees and bitmap checks

use crate::TestSession;
use keystone::Error;

#[test]
fn test_expected_roles_union() {
    let mut t = TestSession::started();
    let s = &mut t.session;
    s.set_role("pegged", "MINTER_ROLE", 1).unwrap();
    s.set_role("pegged", "BURNER_ROLE", 2).unwrap();
    s.set_grantee("minter", "pegged", "MINTER_ROLE").unwrap();
    s.set_grantee("minter", "pegged", "BURNER_ROLE").unwrap();
    assert_eq!(s.compute_expected_roles("pegged", "minter"), 3);
}

#[test]
fn test_role_drift_detected() {
    let mut t = TestSession::started();
    t.session.set_role("pegged", "MINTER_ROLE", 1).unwrap();
    assert!(matches!(
        t.session.set_role("pegged", "MINTER_ROLE", 4),
        Err(Error::RoleValueMismatch { old: 1, new: 4, path })
            if path == "pegged.roles.MINTER_ROLE.value"
    ));
}

#[test]
fn test_role_not_in_schema() {
    let mut t = TestSession::started();
    assert!(matches!(
        t.session.set_role("pegged", "UPGRADER_ROLE", 8),
        Err(Error::KeyNotRegistered(k)) if k == "pegged.roles.UPGRADER_ROLE.value"
    ));
}

#[test]
fn test_mismatch_is_diagnostic() {
    let mut t = TestSession::started();
    t.session.set_role("pegged", "MINTER_ROLE", 1).unwrap();
    t.session.set_grantee("minter", "pegged", "MINTER_ROLE").unwrap();

    let check = t.session.expect_roles_of("pegged", "minter", 0);
    assert!(!check.is_match());
    assert_eq!(check.missing(), 1);

    // The session stays usable after a reported mismatch
    t.session.set_role("pegged", "BURNER_ROLE", 2).unwrap();
}

#[test]
fn test_roles_survive_resume() {
    let mut t = TestSession::started();
    t.session.set_role("pegged", "MINTER_ROLE", 1).unwrap();
    t.session.set_grantee("minter", "pegged", "MINTER_ROLE").unwrap();
    t.session.set_grantee("vault", "pegged", "MINTER_ROLE").unwrap();
    t.session.finish().unwrap();

    let mut next = TestSession::new(keystone::SessionConfig::for_deployer(crate::operator()));
    next.session
        .start(crate::params(), Some(&t.persisted()))
        .unwrap();
    assert_eq!(
        next.session.grantees_of("pegged", "MINTER_ROLE").unwrap(),
        &["minter", "vault"]
    );
    next.session.set_role("pegged", "MINTER_ROLE", 1).unwrap();
    assert!(matches!(
        next.session.set_grantee("vault", "pegged", "MINTER_ROLE"),
        Err(Error::DuplicateGrantee { .. })
    ));
}
