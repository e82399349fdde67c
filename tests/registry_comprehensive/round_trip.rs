//! Render/parse fidelity

use crate::{schema, TestSession};
use keystone::{Address, ContractInfo, Error, JsonCodec};
use serde_json::Value as Json;

fn populated() -> TestSession {
    let mut t = TestSession::started();
    let s = &mut t.session;
    s.set_uint("fee", 30).unwrap();
    s.set_int("offset", -7).unwrap();
    s.set_bool("paused", false).unwrap();
    s.set_string("label", "C:\\vaults \"main\"").unwrap();
    s.set_address("treasury", Address::from_low_u64(0x7e)).unwrap();
    s.set_address_from_string("feeReceiver", "treasury").unwrap();
    s.set_address_array("minters", &[Address::from_low_u64(2), Address::from_low_u64(1)])
        .unwrap();
    s.set_uint_array("tiers", &[10, 2, 300]).unwrap();
    s.set_string_array("symbols", &["wBTC", "stETH"]).unwrap();
    s.set_int_array("deltas", &[-1, 0, 1]).unwrap();
    s.set_bool_array("flags", &[]).unwrap();
    s.set_string("networks.base.rpc", "https://base.example").unwrap();
    s.set_uint("networks.base.chainId", 8453).unwrap();
    s.set_role("pegged", "MINTER_ROLE", 1).unwrap();
    s.set_grantee("minter", "pegged", "MINTER_ROLE").unwrap();
    s.deploy_contract("oracle", b"oracle-code", 0, ContractInfo::new("Oracle", "src/Oracle.sol", "core"))
        .unwrap();
    s.register_proxy("BTC.pegged", Address::from_low_u64(0x1001), b"", "Pegged", "src/Pegged.sol", None)
        .unwrap();
    t.clock.advance(30, 2);
    t.session.finish().unwrap();
    t
}

#[test]
fn test_rerender_is_byte_identical() {
    let t = populated();
    let codec = JsonCodec::new();
    let first = t.session.render().unwrap();
    let parsed = codec.parse(&first, schema()).unwrap();
    assert_eq!(codec.render(&parsed).unwrap(), first);
}

#[test]
fn test_every_value_survives() {
    let t = populated();
    let raw = t.session.render().unwrap();
    let parsed = JsonCodec::new().parse(&raw, schema()).unwrap();

    let before = t.session.store();
    let after = &parsed.store;
    assert_eq!(before.len(), after.len());
    for (key, value) in before.iter() {
        assert_eq!(after.get(key).unwrap(), value, "value of {}", key);
    }
    assert_eq!(after.get_uint_array("tiers").unwrap(), &[10, 2, 300]);
    assert_eq!(after.get_string("label").unwrap(), "C:\\vaults \"main\"");
    assert_eq!(parsed.state, *t.session.state());
    assert_eq!(parsed.runs, t.session.runs());
}

#[test]
fn test_pattern_keys_rediscovered() {
    let t = populated();
    let raw = t.session.render().unwrap();
    let fresh = schema();
    assert!(!fresh.is_registered("networks.base.rpc"));

    let parsed = JsonCodec::new().parse(&raw, fresh).unwrap();
    assert!(parsed.store.schema().is_registered("networks.base.rpc"));
    assert_eq!(parsed.store.get_uint("networks.base.chainId").unwrap(), 8453);
}

#[test]
fn test_document_shape() {
    let t = populated();
    let doc: Json = serde_json::from_str(&t.session.render().unwrap()).unwrap();

    assert_eq!(doc["schemaVersion"], 1);
    assert_eq!(doc["network"], "mainnet");
    assert_eq!(doc["systemSaltString"], "bao-v1");
    assert_eq!(doc["runs"].as_array().unwrap().len(), 1);
    assert_eq!(doc["runs"][0]["startTimestamp"], "2023-11-14T22:13:20Z");
    assert_eq!(doc["runs"][0]["finishTimestamp"], "2023-11-14T22:13:50Z");

    let deployment = &doc["deployment"];
    assert_eq!(deployment["fee"], 30);
    assert_eq!(deployment["feeReceiver"], "treasury");
    assert_eq!(deployment["pegged"]["roles"]["MINTER_ROLE"]["value"], 1);
    assert_eq!(deployment["pegged"]["roles"]["MINTER_ROLE"]["grantees"][0], "minter");
    assert_eq!(
        deployment["BTC"]["pegged"]["implementation"]["contractType"],
        "Pegged"
    );
    assert!(doc["proxies"]["BTC::pegged"]["salt"]
        .as_str()
        .unwrap()
        .starts_with("0x"));
}

#[test]
fn test_escaping_only_backslash_and_quote() {
    let t = populated();
    let raw = t.session.render().unwrap();
    assert!(raw.contains(r#""label": "C:\\vaults \"main\"""#));
}

#[test]
fn test_unknown_path_rejected() {
    let t = populated();
    let raw = t.session.render().unwrap();
    let mut narrow = keystone::KeySchema::new();
    narrow.register_key("fee", keystone::DataType::Uint).unwrap();
    assert!(matches!(
        JsonCodec::new().parse(&raw, narrow),
        Err(Error::KeyNotRegistered(_))
    ));
}

#[test]
fn test_state_document_round_trip() {
    let t = populated();
    let codec = JsonCodec::new();
    let raw = t.session.render_state().unwrap();
    let state = codec.parse_state(&raw).unwrap();
    assert_eq!(state, *t.session.state());
    assert_eq!(codec.render_state(&state).unwrap(), raw);
}

#[test]
fn test_schema_version_checked() {
    let t = populated();
    let raw = t.session.render().unwrap();
    let stripped = raw.replacen("\"schemaVersion\": 1,\n", "", 1);
    assert!(matches!(
        JsonCodec::new().parse(&stripped, schema()),
        Err(Error::SchemaMismatch { expected: 1, actual: 0 })
    ));
    assert!(matches!(
        JsonCodec::with_version(2).parse(&raw, schema()),
        Err(Error::SchemaMismatch { expected: 2, actual: 1 })
    ));
}
