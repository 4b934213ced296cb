//! End-to-end handshake tests.
//!
//! These tests drive a full recognizer task through the scripted transport
//! and check connection setup, fail-fast behavior and the reconnect bound.

mod support;

use iink::config::ProtocolVersion;
use iink::error::IinkError;
use iink::{compute_hmac, Model, Ready, Recognizer};
use serde_json::{json, Value};
use support::{config, v3_responder, v4_responder, MockServer};

/// Application key, challenge, answer, init
#[tokio::test]
async fn test_challenge_response_scenario() {
    let server = MockServer::new(v3_responder(vec!["i-1"]));
    let recognizer = Recognizer::spawn(config(ProtocolVersion::V3), server.transport()).unwrap();
    let model = Model::new().into_handle();

    let ready = recognizer.init(&model).await.unwrap();
    assert_eq!(ready, Ready::InitDone);
    assert_eq!(ready.to_string(), "Init done");

    let sent = server.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0], json!({ "type": "applicationKey", "applicationKey": "AK1" }));
    assert_eq!(
        sent[1],
        json!({
            "type": "hmac",
            "applicationKey": "AK1",
            "challenge": "abc",
            "hmac": compute_hmac("abc", "AK1", "HK1").unwrap()
        })
    );
    assert_eq!(
        server.urls(),
        vec!["ws://localhost:8897/api/v3.0/recognition/ws/math".to_string()]
    );
}

/// Any message other than the expected one rejects the setup
#[tokio::test]
async fn test_unexpected_message_rejects_setup() {
    let server = MockServer::new(|message: &Value| match message["type"].as_str() {
        Some("applicationKey") => vec![json!({ "type": "init" })],
        _ => Vec::new(),
    });
    let mut config = config(ProtocolVersion::V3);
    config.retry.max_reconnect_attempts = 0;
    let recognizer = Recognizer::spawn(config, server.transport()).unwrap();

    let err = recognizer
        .init(&Model::new().into_handle())
        .await
        .unwrap_err();
    assert!(matches!(err, IinkError::UnexpectedMessage(_)), "{err}");
    assert_eq!(server.connects(), 1);
    assert_eq!(server.sent_types(), vec!["applicationKey"]);
}

/// Server-reported errors during the handshake are surfaced as-is
#[tokio::test]
async fn test_refused_application_key() {
    let server = MockServer::new(|message: &Value| match message["type"].as_str() {
        Some("applicationKey") => vec![json!({
            "type": "error",
            "data": { "code": "access.not.granted", "message": "Invalid application key" }
        })],
        _ => Vec::new(),
    });
    let recognizer = Recognizer::spawn(config(ProtocolVersion::V3), server.transport()).unwrap();

    let err = recognizer
        .init(&Model::new().into_handle())
        .await
        .unwrap_err();
    match err {
        IinkError::Server { code, message } => {
            assert_eq!(code.as_deref(), Some("access.not.granted"));
            assert_eq!(message, "Invalid application key");
        },
        other => panic!("unexpected {other}"),
    }
    // not a transient failure: no reconnect
    assert_eq!(server.connects(), 1);
}

/// After M reconnects, the next handshake failure is surfaced
#[tokio::test]
async fn test_reconnect_bound() {
    let server = MockServer::new(|message: &Value| match message["type"].as_str() {
        Some("applicationKey") => vec![json!({ "type": "reset" })],
        _ => Vec::new(),
    });
    let mut config = config(ProtocolVersion::V3);
    config.retry.max_reconnect_attempts = 2;
    let recognizer = Recognizer::spawn(config, server.transport()).unwrap();

    let err = recognizer
        .init(&Model::new().into_handle())
        .await
        .unwrap_err();
    match err {
        IinkError::ReconnectExhausted { attempts, source } => {
            assert_eq!(attempts, 2);
            assert!(matches!(*source, IinkError::UnexpectedMessage(_)));
        },
        other => panic!("unexpected {other}"),
    }
    assert_eq!(server.connects(), 3);
}

/// An action after a server close reconnects at most M times, whatever the
/// send budget
#[tokio::test]
async fn test_action_reconnect_bound() {
    for max_reconnects in [0u32, 1, 2] {
        let server = MockServer::new(v4_responder());
        let mut config = config(ProtocolVersion::V4);
        config.retry.max_reconnect_attempts = max_reconnects;
        config.retry.max_send_attempts = 3;
        let recognizer = Recognizer::spawn(config, server.transport()).unwrap();
        let model = Model::new().into_handle();
        recognizer.init(&model).await.unwrap();

        server.close_connection();
        server.refuse_next_connects(100);
        let err = recognizer.undo(&model).await.unwrap_err();

        // one initial connection, then M + 1 handshake attempts
        assert_eq!(
            server.connects(),
            2 + max_reconnects as usize,
            "M={max_reconnects}: {err}"
        );
        match (max_reconnects, err) {
            (0, IinkError::Transport(_)) => {},
            (m, IinkError::ReconnectExhausted { attempts, source }) if m > 0 => {
                assert_eq!(attempts, m);
                assert!(matches!(*source, IinkError::Transport(_)));
            },
            (m, other) => panic!("M={m}: unexpected {other}"),
        }
        assert!(server.sent_of("undo").is_empty());
    }
}

/// A refused connection is retried within the budget
#[tokio::test]
async fn test_reconnect_recovers() {
    let server = MockServer::new(v3_responder(vec!["i-1"]));
    server.refuse_next_connects(1);
    let recognizer = Recognizer::spawn(config(ProtocolVersion::V3), server.transport()).unwrap();

    let ready = recognizer.init(&Model::new().into_handle()).await.unwrap();
    assert_eq!(ready, Ready::InitDone);
    assert_eq!(server.connects(), 2);
}

/// A silent server counts as a handshake failure
#[tokio::test]
async fn test_handshake_timeout() {
    let server = MockServer::new(|_: &Value| Vec::new());
    let mut config = config(ProtocolVersion::V3);
    config.retry.max_reconnect_attempts = 0;
    config.retry.handshake_timeout_ms = 50;
    let recognizer = Recognizer::spawn(config, server.transport()).unwrap();

    let err = recognizer
        .init(&Model::new().into_handle())
        .await
        .unwrap_err();
    assert!(matches!(err, IinkError::HandshakeTimeout(_)), "{err}");
}

/// Content package variant is ready once the session message is sent
#[tokio::test]
async fn test_content_package_session() {
    let server = MockServer::new(v4_responder());
    let mut config = config(ProtocolVersion::V4);
    config.view.width = 1024;
    config.view.height = 768;
    let recognizer = Recognizer::spawn(config, server.transport()).unwrap();

    let ready = recognizer.init(&Model::new().into_handle()).await.unwrap();
    assert_eq!(ready, Ready::SessionOpened);
    assert_eq!(
        server.sent(),
        vec![json!({
            "type": "newContentPackage",
            "applicationKey": "AK1",
            "xDpi": 96,
            "yDpi": 96,
            "viewSizeHeight": 768,
            "viewSizeWidth": 1024
        })]
    );
    assert_eq!(
        server.urls(),
        vec!["ws://localhost:8897/api/v4.0/iink/document".to_string()]
    );
}

/// A reconnect restores the session announced by the server
#[tokio::test]
async fn test_reconnect_restores_session() {
    let server = MockServer::new(v4_responder());
    let recognizer = Recognizer::spawn(config(ProtocolVersion::V4), server.transport()).unwrap();
    let model = Model::new().into_handle();

    recognizer.init(&model).await.unwrap();
    // resolved after the session description was dispatched
    recognizer.new_content_part(&model).await.unwrap();

    server.close_connection();
    recognizer.undo(&model).await.unwrap();

    let restores = server.sent_of("restoreIInkSession");
    assert_eq!(restores.len(), 1);
    assert_eq!(restores[0]["iinkSessionId"], "s-1");
    assert_eq!(restores[0]["applicationKey"], "AK1");
    assert_eq!(server.connects(), 2);
}

/// Invalid configurations are refused before any connection
#[tokio::test]
async fn test_spawn_validates_config() {
    let server = MockServer::default();
    let mut config = config(ProtocolVersion::V3);
    config.server.hmac_key = String::new();

    let err = Recognizer::spawn(config, server.transport()).unwrap_err();
    assert!(matches!(err, IinkError::Config(_)));
    assert_eq!(server.connects(), 0);
}
