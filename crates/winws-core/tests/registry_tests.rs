//! Integration tests for strategy loading and user edits

use serde_json::json;
use std::fs;
use std::path::Path;
use winws_core::strategy::{Label, StrategyArgs, StrategyRecord, StrategySource, ORCHESTRA_SET};
use winws_core::{Error, StrategyRegistry};

fn write(path: &Path, value: serde_json::Value) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, serde_json::to_string_pretty(&value).unwrap()).unwrap();
}

fn record(id: &str, args: &str) -> StrategyRecord {
    StrategyRecord {
        id: id.into(),
        name: format!("User {id}"),
        description: String::new(),
        author: "me".into(),
        version: String::new(),
        label: Label::Experimental,
        blobs: Vec::new(),
        args: StrategyArgs::Line(args.into()),
        enabled: true,
    }
}

#[test]
fn test_user_overrides_builtin() {
    let dir = tempfile::tempdir().unwrap();
    let builtin = dir.path().join("builtin");
    let user = dir.path().join("user");
    write(
        &builtin.join("tcp.json"),
        json!({"category": "tcp", "version": "1.0", "strategies": [
            {"id": "a", "name": "A", "args": "--dpi-desync=fake"},
            {"id": "b", "name": "B", "args": ["--dpi-desync=split2", "--dpi-desync-split-pos=1"]}
        ]}),
    );
    write(
        &user.join("tcp.json"),
        json!({"category": "tcp", "version": "1.0", "strategies": [
            {"id": "c", "name": "C", "args": "--dpi-desync=syndata"},
            {"id": "a", "name": "Mine", "args": "--dpi-desync=fakedsplit"},
            {"id": "bad-id", "name": "Bad", "args": ""}
        ]}),
    );

    let table = StrategyRegistry::new(&builtin, &user).load("tcp", None).unwrap();
    assert_eq!(table.ids(), vec!["a", "b", "c"]);

    let a = table.get("a").unwrap();
    assert_eq!(a.name, "Mine");
    assert_eq!(a.args, "--dpi-desync=fakedsplit");
    assert!(a.user_created);
    assert_eq!(a.source, StrategySource::User);

    let b = table.get("b").unwrap();
    assert_eq!(b.args, "--dpi-desync=split2 --dpi-desync-split-pos=1");
    assert!(!b.user_created);
}

#[test]
fn test_malformed_document_treated_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("udp.json"), "{ not json").unwrap();
    let table = StrategyRegistry::new(dir.path(), dir.path().join("user"))
        .load("udp", None)
        .unwrap();
    assert!(table.is_empty());
}

#[test]
fn test_save_and_delete_user_strategy() {
    let dir = tempfile::tempdir().unwrap();
    let registry = StrategyRegistry::new(dir.path().join("builtin"), dir.path().join("user"));

    registry.save("tcp", &record("mine", "--dpi-desync=fake")).unwrap();
    registry.save("tcp", &record("other", "--dpi-desync=split2")).unwrap();
    registry.save("tcp", &record("mine", "--dpi-desync=fake --dpi-desync-ttl=3")).unwrap();

    let table = registry.load("tcp", None).unwrap();
    assert_eq!(table.ids(), vec!["mine", "other"]);
    assert_eq!(table.get("mine").unwrap().args, "--dpi-desync=fake --dpi-desync-ttl=3");

    let doc: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(registry.user_path("tcp")).unwrap()).unwrap();
    assert_eq!(doc["category"], "tcp");
    assert_eq!(doc["strategies"].as_array().unwrap().len(), 2);

    registry.delete("tcp", "mine").unwrap();
    assert_eq!(registry.load("tcp", None).unwrap().ids(), vec!["other"]);

    let err = registry.delete("tcp", "mine").unwrap_err();
    assert!(matches!(err, Error::StrategyNotFound { .. }));
    assert!(err.to_string().contains("not found"));
}

#[test]
fn test_save_rejects_invalid() {
    let dir = tempfile::tempdir().unwrap();
    let registry = StrategyRegistry::new(dir.path().join("builtin"), dir.path().join("user"));
    let err = registry.save("tcp", &record("has space", "")).unwrap_err();
    assert!(matches!(err, Error::InvalidStrategy { .. }));
    assert!(!registry.user_path("tcp").exists());
}

#[test]
fn test_orchestra_set_numbers_lines() {
    let builtin = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../data/strategies/builtin");
    let user = tempfile::tempdir().unwrap();
    let registry = StrategyRegistry::new(&builtin, user.path());

    let table = registry.load("tcp", Some(ORCHESTRA_SET)).unwrap();
    let s = table.get("orchestra_tls").unwrap();
    assert_eq!(
        s.args,
        "--lua-init=@zapret-lib.lua --lua-init=@zapret-antidpi.lua \
         --lua-desync=circular:fails=3 \
         --lua-desync=fake:blob=fake_default_tls:tcp_md5:strategy=1 --lua-desync=multisplit:pos=1:strategy=1 \
         --lua-desync=fakedsplit:pos=midsld:strategy=2 \
         --payload=tls_client_hello --lua-desync=pass"
    );

    // Unknown set falls back to the base document without numbering
    let table = registry.load("tcp", Some("nonexistent")).unwrap();
    assert!(table.contains("other_seqovl"));
    assert!(!table.contains("orchestra_tls"));
}
