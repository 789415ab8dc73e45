mod common;

use common::*;
use kvd_driver::{DriverError, Session, SetOptions};

#[test]
fn set_then_get_roundtrip() {
    let server = ScriptedServer::single(vec![pong(), reply(simple("OK")), reply(bulk("v"))]);

    let session = Session::open(&server.options()).expect("open");
    let kv = session.commands();
    assert!(kv.set("k", "v", &SetOptions::new()).expect("set"));
    assert_eq!(kv.get("k").expect("get").as_deref(), Some("v"));
    drop(session);

    let commands = server.finish().remove(0);
    assert_eq!(
        commands,
        vec![cmd(&["PING"]), cmd(&["SET", "k", "v"]), cmd(&["GET", "k"])]
    );
}

#[test]
fn getdel_removes_key() {
    let server = ScriptedServer::single(vec![pong(), reply(bulk("v")), reply(null())]);

    let session = Session::open(&server.options()).expect("open");
    let kv = session.commands();
    assert_eq!(kv.getdel("k").expect("getdel").as_deref(), Some("v"));
    assert_eq!(kv.get("k").expect("get"), None);
    drop(session);

    let commands = server.finish().remove(0);
    assert_eq!(commands[1], cmd(&["GETDEL", "k"]));
}

#[test]
fn getdel_on_missing_key_is_none() {
    let server = ScriptedServer::single(vec![pong(), reply(null())]);
    let session = Session::open(&server.options()).expect("open");
    assert_eq!(session.commands().getdel("ghost").expect("getdel"), None);
    drop(session);
    server.finish();
}

#[test]
fn set_sends_expiry_and_condition() {
    let server = ScriptedServer::single(vec![
        pong(),
        reply(simple("OK")),
        reply(null()),
        reply(simple("OK")),
    ]);

    let session = Session::open(&server.options()).expect("open");
    let kv = session.commands();
    assert!(kv.set("k", "v", &SetOptions::new().expire_in(10)).expect("ex"));
    // NX on an existing key: the store answers with a null bulk.
    assert!(!kv.set("k", "v", &SetOptions::new().only_if_absent()).expect("nx"));
    assert!(kv
        .set("k", "w", &SetOptions::new().expire_at(1_900_000_000).only_if_present())
        .expect("exat xx"));
    drop(session);

    let commands = server.finish().remove(0);
    assert_eq!(commands[1], cmd(&["SET", "k", "v", "EX", "10"]));
    assert_eq!(commands[2], cmd(&["SET", "k", "v", "NX"]));
    assert_eq!(commands[3], cmd(&["SET", "k", "w", "EXAT", "1900000000", "XX"]));
}

#[test]
fn append_reports_length() {
    let server = ScriptedServer::single(vec![pong(), reply(integer(5)), reply(integer(11))]);

    let session = Session::open(&server.options()).expect("open");
    let kv = session.commands();
    assert_eq!(kv.append("greeting", "hello").expect("append"), 5);
    assert_eq!(kv.append("greeting", " world").expect("append"), 11);
    drop(session);

    let commands = server.finish().remove(0);
    assert_eq!(commands[2], cmd(&["APPEND", "greeting", " world"]));
}

#[test]
fn mset_then_mget_keeps_missing_positions() {
    let server = ScriptedServer::single(vec![
        pong(),
        reply(simple("OK")),
        reply(array(&[bulk("1"), bulk("2"), null()])),
    ]);

    let session = Session::open(&server.options()).expect("open");
    let kv = session.commands();
    kv.mset(&[("a", "1"), ("b", "2")]).expect("mset");
    let values = kv.mget(&["a", "b", "c"]).expect("mget");
    assert_eq!(values, vec![Some("1".to_string()), Some("2".to_string()), None]);
    drop(session);

    let commands = server.finish().remove(0);
    assert_eq!(commands[1], cmd(&["MSET", "a", "1", "b", "2"]));
    assert_eq!(commands[2], cmd(&["MGET", "a", "b", "c"]));
}

#[test]
fn malformed_input_never_reaches_the_store() {
    let server = ScriptedServer::single(vec![pong(), reply(simple("OK"))]);

    let session = Session::open(&server.options()).expect("open");
    let kv = session.commands();
    let not_text: &[u8] = &[0xff, 0xfe, 0x00];

    let err = kv.set(not_text, "v", &SetOptions::new()).unwrap_err();
    assert!(matches!(err, DriverError::InvalidArgument(_)));
    assert!(kv.set("k", not_text, &SetOptions::new()).is_err());
    assert!(kv.get(not_text).is_err());
    assert!(kv.getdel(not_text).is_err());
    assert!(kv.append(not_text, "x").is_err());
    assert!(kv.set("k", "v", &SetOptions::new().expire_in(0)).is_err());

    let no_pairs: [(&str, &str); 0] = [];
    assert!(matches!(kv.mset(&no_pairs), Err(DriverError::InvalidArgument(_))));
    let no_keys: [&str; 0] = [];
    assert!(matches!(kv.mget(&no_keys), Err(DriverError::InvalidArgument(_))));
    assert!(kv.mget(&[b"ok".as_slice(), not_text]).is_err());

    session.close().expect("close");

    // Only the handshake and QUIT crossed the wire.
    let commands = server.finish().remove(0);
    assert_eq!(commands, vec![cmd(&["PING"]), cmd(&["QUIT"])]);
}

#[test]
fn server_error_is_surfaced() {
    let server = ScriptedServer::single(vec![
        pong(),
        reply(error("WRONGTYPE Operation against a key holding the wrong kind of value")),
    ]);

    let session = Session::open(&server.options()).expect("open");
    match session.commands().get("list-key") {
        Err(DriverError::Server { message }) => assert!(message.starts_with("WRONGTYPE")),
        other => panic!("unexpected: {:?}", other),
    }
    drop(session);
    server.finish();
}

#[test]
fn facades_fail_after_close() {
    let server = ScriptedServer::single(vec![pong(), reply(simple("OK"))]);

    let session = Session::open(&server.options()).expect("open");
    let kv = session.commands().clone();
    session.close().expect("close");

    assert!(matches!(kv.get("k"), Err(DriverError::NotConnected)));
    server.finish();
}
