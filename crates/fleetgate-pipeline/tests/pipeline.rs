//! Pipeline behavior against a scripted backend.

use std::sync::Arc;
use std::time::Duration;

use fleetgate_pipeline::{ApiClient, ApiError, SessionEvent, SessionSignal};
use fleetgate_protocol::Token;
use fleetgate_session::SessionStore;
use fleetgate_transport::{
    HttpRequest, Method, ScriptedTransport, TransportError, AUTHORIZATION,
};
use serde_json::Value;
use tokio::sync::broadcast::error::TryRecvError;

// =========================================================================
// Helpers
// =========================================================================

struct Harness {
    transport: Arc<ScriptedTransport>,
    store: Arc<SessionStore>,
    signal: SessionSignal,
    client: ApiClient<ScriptedTransport>,
}

fn harness(transport: ScriptedTransport, token: Option<&str>) -> Harness {
    let transport = Arc::new(transport);
    let store = Arc::new(SessionStore::in_memory());
    if let Some(t) = token {
        store.set(&Token::new(t)).unwrap();
    }
    let signal = SessionSignal::new("/login");
    let client =
        ApiClient::new(Arc::clone(&transport), Arc::clone(&store), signal.clone());
    Harness {
        transport,
        store,
        signal,
        client,
    }
}

// =========================================================================
// Bearer injection
// =========================================================================

#[tokio::test]
async fn test_request_with_token_sends_bearer_header() {
    let h = harness(ScriptedTransport::new(), Some("T"));
    h.transport.respond(Method::Get, "/buses/", 200, "[]");

    let buses: Vec<Value> = h.client.get_json("/buses/").await.unwrap();

    assert!(buses.is_empty());
    let sent = h.transport.requests_to("/buses/");
    assert_eq!(sent[0].header(AUTHORIZATION), Some("Bearer T"));
}

#[tokio::test]
async fn test_request_without_token_sends_no_header() {
    let h = harness(ScriptedTransport::new(), None);
    h.transport.respond(Method::Get, "/routes/", 200, "[]");

    let _: Vec<Value> = h.client.get_json("/routes/").await.unwrap();

    assert!(h.transport.requests()[0].header(AUTHORIZATION).is_none());
}

#[tokio::test]
async fn test_token_set_after_construction_is_picked_up() {
    let h = harness(ScriptedTransport::new(), None);
    h.transport.respond(Method::Get, "/users/me", 200, r#"{"id":1,"email":"a@b.com"}"#);

    h.store.set(&Token::new("fresh")).unwrap();
    let _: Value = h.client.get_json("/users/me").await.unwrap();

    assert_eq!(
        h.transport.requests()[0].header(AUTHORIZATION),
        Some("Bearer fresh")
    );
}

// =========================================================================
// 401 handling
// =========================================================================

#[tokio::test]
async fn test_401_clears_session_and_emits_once() {
    let h = harness(ScriptedTransport::new(), Some("T"));
    let mut events = h.signal.subscribe();
    h.transport.respond(Method::Get, "/buses/", 401, r#"{"detail":"Not authenticated"}"#);

    let result: Result<Value, _> = h.client.get_json("/buses/").await;

    assert!(matches!(result, Err(ApiError::SessionInvalidated)));
    assert_eq!(h.store.get().unwrap(), None);
    assert_eq!(
        events.try_recv().unwrap(),
        SessionEvent::Invalidated {
            login_path: "/login".into()
        }
    );
    assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_401s_produce_one_logout() {
    let transport = ScriptedTransport::new().with_latency(Duration::from_millis(50));
    let h = harness(transport, Some("T"));
    let mut events = h.signal.subscribe();
    h.transport.respond(Method::Get, "/buses/", 401, "");
    h.transport.respond(Method::Get, "/routes/", 401, "");

    let (a, b, c) = tokio::join!(
        h.client.get_json::<Value>("/buses/"),
        h.client.get_json::<Value>("/routes/"),
        h.client.get_json::<Value>("/buses/"),
    );

    for result in [a, b, c] {
        assert!(matches!(result, Err(ApiError::SessionInvalidated)));
    }
    for request in h.transport.requests() {
        assert_eq!(request.header(AUTHORIZATION), Some("Bearer T"));
    }
    assert!(events.try_recv().is_ok());
    assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
    assert_eq!(h.signal.invalidations(), 1);
    assert_eq!(h.store.get().unwrap(), None);
}

#[tokio::test(start_paused = true)]
async fn test_late_401_for_replaced_token_keeps_new_session() {
    let transport = ScriptedTransport::new().with_latency(Duration::from_millis(50));
    let h = harness(transport, Some("old"));
    h.transport.respond(Method::Get, "/buses/", 401, "");

    let call = h.client.get_json::<Value>("/buses/");
    let relogin = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        h.store.set(&Token::new("new")).unwrap();
    };
    let (result, ()) = tokio::join!(call, relogin);

    assert!(matches!(result, Err(ApiError::SessionInvalidated)));
    assert_eq!(h.store.get().unwrap(), Some(Token::new("new")));
    assert_eq!(h.signal.invalidations(), 0);
}

#[tokio::test]
async fn test_401_without_token_is_auth_rejected_without_event() {
    let h = harness(ScriptedTransport::new(), None);
    h.transport.respond(Method::Get, "/users/me", 401, r#"{"detail":"Not authenticated"}"#);

    let result: Result<Value, _> = h.client.get_json("/users/me").await;

    assert!(matches!(&result, Err(ApiError::AuthRejected(m)) if m == "Not authenticated"));
    assert_eq!(h.signal.invalidations(), 0);
}

#[tokio::test]
async fn test_raw_request_sends_no_bearer_and_keeps_session_on_401() {
    let h = harness(ScriptedTransport::new(), Some("T"));
    h.transport.respond(
        Method::Post,
        "/token",
        401,
        r#"{"detail":"Incorrect username or password"}"#,
    );

    let result: Result<Value, _> = h
        .client
        .request_raw(HttpRequest::post("/token"), "Login failed")
        .await;

    assert!(matches!(&result, Err(ApiError::AuthRejected(m)) if m == "Incorrect username or password"));
    assert!(h.transport.requests()[0].header(AUTHORIZATION).is_none());
    assert_eq!(h.store.get().unwrap(), Some(Token::new("T")));
    assert_eq!(h.signal.invalidations(), 0);
}

// =========================================================================
// Other failures
// =========================================================================

#[tokio::test]
async fn test_transport_error_does_not_log_out() {
    let h = harness(ScriptedTransport::new(), Some("T"));
    h.transport.fail(Method::Get, "/buses/", TransportError::Timeout);

    let result: Result<Value, _> = h.client.get_json("/buses/").await;

    assert!(matches!(result, Err(ApiError::Transport(TransportError::Timeout))));
    assert_eq!(h.store.get().unwrap(), Some(Token::new("T")));
    assert_eq!(h.signal.invalidations(), 0);
}

#[tokio::test]
async fn test_500_maps_to_unknown_and_keeps_session() {
    let h = harness(ScriptedTransport::new(), Some("T"));
    h.transport.respond(Method::Get, "/buses/", 500, "Internal Server Error");

    let result: Result<Value, _> = h.client.get_json("/buses/").await;

    assert!(matches!(
        &result,
        Err(ApiError::Unknown { status: 500, message }) if message == "Request failed"
    ));
    assert!(h.store.get().unwrap().is_some());
}

#[tokio::test]
async fn test_delete_204_resolves_to_unit() {
    let h = harness(ScriptedTransport::new(), Some("T"));
    h.transport.respond(Method::Delete, "/buses/7", 204, "");

    h.client.delete("/buses/7").await.unwrap();
}

#[tokio::test]
async fn test_post_json_sends_json_body() {
    let h = harness(ScriptedTransport::new(), Some("T"));
    h.transport.respond(Method::Post, "/buses/", 201, r#"{"id":3,"plate":"AB-12"}"#);

    let created: Value = h
        .client
        .post_json("/buses/", &serde_json::json!({"plate": "AB-12"}))
        .await
        .unwrap();

    assert_eq!(created["id"], 3);
    let sent = &h.transport.requests()[0];
    assert_eq!(sent.header("content-type"), Some("application/json"));
    assert_eq!(sent.body.as_deref(), Some(&br#"{"plate":"AB-12"}"#[..]));
}
