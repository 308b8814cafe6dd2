//! Inbound envelope vector tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use roomcast_core::protocol::Envelope;


#[test]
fn envelope_vectors() {
    let files = [
        "envelope_min.json",
        "envelope_args.json",
        "envelope_missing_action.json",
        "envelope_empty_action.json",
    ];

    for f in files {
        let v = vector_loader::load(f);
        let res = Envelope::from_payload(&v.input);

        if let Some(err) = v.expect_error {
            let e = res.expect_err("expected error");
            assert_eq!(e.client_code().as_str(), err.code, "vector={}", v.description);
            continue;
        }

        let env = res.expect("expected ok envelope");
        let ex = v.expect.expect("missing expect block");
        assert_eq!(env.action, ex["action"].as_str().unwrap(), "vector={}", v.description);
        match ex.get("content").and_then(|c| c.as_str()) {
            Some(content) => assert_eq!(env.arg_str("content"), Some(content), "vector={}", v.description),
            None => assert!(env.arg_str("content").is_none(), "vector={}", v.description),
        }
    }
}

#[test]
fn outbound_shapes() {
    let err = roomcast_core::protocol::error_payload("boom");
    assert_eq!(err["error"], true);
    assert_eq!(err["message"], "boom");

    let msg = roomcast_core::protocol::message_payload("hi");
    assert_eq!(msg["message"], "hi");
    assert!(msg.get("error").is_none());
}
