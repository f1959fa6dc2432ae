use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use axum::{
    extract::State,
    http::{header, HeaderMap, Method, StatusCode},
    response::IntoResponse,
    routing::any,
    Router,
};
use json_retry_http::{
    classify, Classification, HttpResponse, Outcome, Request, RequestError, ServerErrorPolicy,
    TransportError,
};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};

#[derive(Clone)]
struct MockResponse {
    status: StatusCode,
    body: String,
    delay: Duration,
}

impl MockResponse {
    fn json(status: StatusCode, body: JsonValue) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::from_millis(0),
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Clone, Debug)]
struct Received {
    method: Method,
    body: String,
    authorization: Option<String>,
    content_type: Option<String>,
}

#[derive(Clone)]
struct MockState {
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    received: Arc<Mutex<Vec<Received>>>,
    hits: Arc<AtomicUsize>,
}

async fn path_handler(
    State(state): State<MockState>,
    method: Method,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    state.hits.fetch_add(1, Ordering::SeqCst);

    let header_value = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
    };
    state
        .received
        .lock()
        .expect("received mutex must not be poisoned")
        .push(Received {
            method,
            body,
            authorization: header_value(header::AUTHORIZATION),
            content_type: header_value(header::CONTENT_TYPE),
        });

    let response = {
        let mut queue = state
            .responses
            .lock()
            .expect("response queue mutex must not be poisoned");
        queue.pop_front().unwrap_or_else(|| {
            MockResponse::json(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"error": "no mock response available"}),
            )
        })
    };

    if !response.delay.is_zero() {
        tokio::time::sleep(response.delay).await;
    }

    (
        response.status,
        [(header::CONTENT_TYPE, "application/json")],
        response.body,
    )
}

struct TestServer {
    base_url: String,
    hits: Arc<AtomicUsize>,
    received: Arc<Mutex<Vec<Received>>>,
    task: tokio::task::JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl TestServer {
    fn path_url(&self) -> String {
        format!("{}/v1/path", self.base_url)
    }

    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    fn received(&self) -> Vec<Received> {
        self.received
            .lock()
            .expect("received mutex must not be poisoned")
            .clone()
    }
}

async fn spawn_server(responses: Vec<MockResponse>) -> TestServer {
    let state = MockState {
        responses: Arc::new(Mutex::new(responses.into())),
        received: Arc::new(Mutex::new(Vec::new())),
        hits: Arc::new(AtomicUsize::new(0)),
    };

    let app = Router::new()
        .route("/v1/path", any(path_handler))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("must bind test listener");
    let address = listener.local_addr().expect("must have local addr");
    let task = tokio::spawn(async move {
        axum::serve(listener, app)
            .await
            .expect("mock server must run");
    });

    TestServer {
        base_url: format!("http://{address}"),
        hits: state.hits,
        received: state.received,
        task,
    }
}

fn fast_request() -> Request<reqwest::Client> {
    Request::new(reqwest::Client::new()).set_retry_interval(Duration::from_millis(1))
}

#[derive(Debug, Deserialize, PartialEq)]
struct Greeting {
    hello: String,
    world: u32,
}

#[derive(Debug, Deserialize, PartialEq)]
struct ApiError {
    error: String,
}

#[tokio::test]
async fn get_decodes_json_result() {
    let server = spawn_server(vec![MockResponse::json(
        StatusCode::OK,
        json!({"hello": "test", "world": 3}),
    )])
    .await;

    let response = fast_request()
        .set_result::<Greeting>()
        .get(&server.path_url())
        .await
        .expect("get must succeed");

    assert!(!response.is_error());
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.into_result().expect("body must decode"),
        Greeting {
            hello: "test".to_owned(),
            world: 3
        }
    );
    assert_eq!(server.hits(), 1);

    let received = server.received();
    assert_eq!(received[0].method, Method::GET);
    assert!(received[0].body.is_empty());
    assert_eq!(received[0].content_type.as_deref(), Some("application/json"));
}

#[tokio::test]
async fn get_bad_status_decodes_reason() {
    let server = spawn_server(vec![MockResponse::json(
        StatusCode::BAD_REQUEST,
        json!({"error": "myError"}),
    )])
    .await;

    let response = fast_request()
        .set_reason::<ApiError>()
        .get(&server.path_url())
        .await
        .expect("bad status is not a request error");

    assert!(response.is_error());
    assert_eq!(response.status(), 400);
    assert!(matches!(
        response.error(),
        Some(RequestError::BadStatus(err)) if err.code() == 400
    ));
    assert_eq!(
        response.reason(),
        Some(&ApiError {
            error: "myError".to_owned()
        })
    );
    assert_eq!(server.hits(), 1);
}

#[tokio::test]
async fn retries_server_error_then_decodes_second_response() {
    let server = spawn_server(vec![
        MockResponse::json(StatusCode::INTERNAL_SERVER_ERROR, json!({})),
        MockResponse::json(StatusCode::OK, json!({"hello": "test", "world": 3})),
    ])
    .await;

    let response = fast_request()
        .set_result::<Greeting>()
        .get(&server.path_url())
        .await
        .expect("get must succeed after retry");

    assert_eq!(response.result().map(|greeting| greeting.world), Some(3));
    assert_eq!(server.hits(), 2);
}

#[tokio::test]
async fn persistent_server_error_exhausts_retries() {
    let server = spawn_server(vec![
        MockResponse::json(StatusCode::INTERNAL_SERVER_ERROR, json!({})),
        MockResponse::json(StatusCode::INTERNAL_SERVER_ERROR, json!({})),
        MockResponse::json(StatusCode::INTERNAL_SERVER_ERROR, json!({})),
    ])
    .await;

    let err = fast_request()
        .get(&server.path_url())
        .await
        .expect_err("retries must be exhausted");

    assert!(matches!(err, RequestError::MaxRetriesExhausted));
    assert_eq!(err.to_string(), "max retries exhausted");
    assert_eq!(server.hits(), 3);
}

#[tokio::test]
async fn post_resends_same_body_on_retry() {
    let server = spawn_server(vec![
        MockResponse::json(StatusCode::SERVICE_UNAVAILABLE, json!({})),
        MockResponse::json(StatusCode::OK, json!({"yoohoo": true})),
    ])
    .await;

    let response = fast_request()
        .set_body("test")
        .post(&server.path_url())
        .await
        .expect("post must succeed after retry");

    assert_eq!(response.result(), Some(&json!({"yoohoo": true})));
    let received = server.received();
    assert_eq!(received.len(), 2);
    for request in received {
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.body, "\"test\"");
    }
}

#[tokio::test]
async fn post_sends_empty_object_and_basic_auth() {
    let server = spawn_server(vec![MockResponse::json(StatusCode::CREATED, json!({}))]).await;

    fast_request()
        .set_basic_auth("user", "pass")
        .post(&server.path_url())
        .await
        .expect("post must succeed");

    let received = server.received();
    assert_eq!(received[0].body, "{}");
    assert_eq!(
        received[0].authorization.as_deref(),
        Some("Basic dXNlcjpwYXNz")
    );
}

#[tokio::test]
async fn differently_cased_header_overrides_default_on_the_wire() {
    let server = spawn_server(vec![MockResponse::json(StatusCode::OK, json!({}))]).await;

    fast_request()
        .set_header("CONTENT-TYPE", "text/plain")
        .post(&server.path_url())
        .await
        .expect("post must succeed");

    let received = server.received();
    assert_eq!(received[0].content_type.as_deref(), Some("text/plain"));
}

#[tokio::test]
async fn request_timeout_surfaces_transport_error() {
    let server = spawn_server(vec![MockResponse::json(StatusCode::OK, json!({}))
        .with_delay(Duration::from_millis(150))])
    .await;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(20))
        .build()
        .expect("client must build");

    let err = Request::new(client)
        .get(&server.path_url())
        .await
        .expect_err("request must timeout");

    match err {
        RequestError::Transport(inner) => {
            let source = inner
                .downcast_ref::<reqwest::Error>()
                .expect("transport error must wrap reqwest error");
            assert!(source.is_timeout());
        }
        other => panic!("expected transport timeout error, got {other:?}"),
    }
    assert_eq!(server.hits(), 1);
}

#[test]
fn classify_is_usable_outside_the_executor() {
    let unavailable = HttpResponse::new(503, "");
    let created = HttpResponse::new(201, "{}");
    let refused = TransportError::new("connection refused");

    assert_eq!(
        classify(&ServerErrorPolicy, &Outcome::Response(&unavailable)),
        Classification::Retry
    );
    assert_eq!(
        classify(&ServerErrorPolicy, &Outcome::Response(&created)),
        Classification::Succeed
    );
    assert_eq!(
        classify(&ServerErrorPolicy, &Outcome::Transport(&refused)),
        Classification::Fail
    );
}
