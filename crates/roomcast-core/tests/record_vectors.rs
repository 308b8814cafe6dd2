//! Snapshot record vector tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use roomcast_core::protocol::SessionRecord;


#[test]
fn record_vectors() {
    let files = [
        "record_anonymous.json",
        "record_with_uid.json",
        "record_key_mismatch.json",
        "record_empty_sid.json",
        "record_negative_ts.json",
    ];

    for f in files {
        let v = vector_loader::load(f);
        let key = v.key.as_deref().expect("record vectors need a key");
        let rec: SessionRecord = serde_json::from_value(v.input.clone()).unwrap();
        let res = rec.validate(key);

        if let Some(err) = v.expect_error {
            let e = res.expect_err("expected error");
            assert_eq!(e.client_code().as_str(), err.code, "vector={}", v.description);
            continue;
        }

        res.expect("expected valid record");
        let ex = v.expect.expect("missing expect block");
        assert_eq!(rec.sid, ex["sid"].as_str().unwrap(), "vector={}", v.description);
        assert_eq!(rec.is_alive, ex["is_alive"].as_bool().unwrap(), "vector={}", v.description);
        assert_eq!(rec.uid.as_deref(), ex["uid"].as_str(), "vector={}", v.description);
    }
}

#[test]
fn record_rejects_wrong_types() {
    let bad = serde_json::json!({ "sid": "s1", "last_active_ts": "yesterday", "is_alive": false, "uid": null });
    assert!(serde_json::from_value::<SessionRecord>(bad).is_err());
}

#[test]
fn record_serializes_null_uid() {
    let rec = SessionRecord { sid: "s2".into(), last_active_ts: 10.5, is_alive: false, uid: None };
    let v = serde_json::to_value(&rec).unwrap();
    assert!(v["uid"].is_null());
    assert_eq!(v["last_active_ts"], 10.5);
}
