//! Auth and post lifecycle against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives `SimplestClient`
//! over real HTTP using ureq as a blocking host. Validates that request
//! building and response classification agree with an actual backend,
//! including in-band errors and non-JSON failures.

use serde_json::{json, Value};
use simplest_core::{ApiError, HttpBody, HttpMethod, HttpRequest, HttpResponse, Request, SimplestClient};

/// Execute an `HttpRequest` using ureq and return an `HttpResponse`.
///
/// Disables ureq's automatic status-code-as-error behavior so 4xx/5xx
/// responses are returned as data rather than `Err`, letting the core
/// client handle status interpretation.
fn execute(req: HttpRequest) -> HttpResponse {
    let agent = ureq::Agent::config_builder()
        .http_status_as_error(false)
        .build()
        .new_agent();

    let mut response = match (req.method, req.body) {
        (HttpMethod::Get, _) => agent.get(&req.url).call(),
        (HttpMethod::Post, HttpBody::Json(body)) => agent
            .post(&req.url)
            .content_type("application/json")
            .send(body.as_bytes()),
        (HttpMethod::Post, HttpBody::Empty) => agent.post(&req.url).send_empty(),
        (HttpMethod::Post, HttpBody::Multipart(_)) => panic!("multipart goes through the async transport"),
    }
    .expect("HTTP transport error");

    let status = response.status().as_u16();
    let body = response.body_mut().read_to_string().unwrap_or_default();

    HttpResponse {
        status,
        headers: Vec::new(),
        body,
    }
}

fn start_server() -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    format!("http://{addr}{}", mock_server::ENDPOINT)
}

fn post(client: &SimplestClient, request: Request) -> Result<Value, ApiError> {
    let req = client.build_post(&request).unwrap();
    client.parse_post(execute(req))
}

#[test]
fn auth_and_post_lifecycle() {
    let client = SimplestClient::new(&start_server());

    // Step 1: register.
    let user = post(
        &client,
        Request::new("user.register")
            .field("email", "it@test.com")
            .field("password", "pw")
            .field("nickname", "tester"),
    )
    .unwrap();
    let session_id = user["session_id"].as_str().unwrap().to_string();
    assert_eq!(user["nickname"], "tester");

    // Step 2: registering again is an in-band backend error.
    let err = post(
        &client,
        Request::new("user.register")
            .field("email", "it@test.com")
            .field("password", "pw"),
    )
    .unwrap_err();
    assert!(err.is_backend());
    assert_eq!(err.code(), "email-exists");

    // Step 3: wrong password.
    let err = post(
        &client,
        Request::new("user.login")
            .field("email", "it@test.com")
            .field("password", "bad"),
    )
    .unwrap_err();
    assert_eq!(err.code(), "wrong-password");

    // Step 4: profile needs the session id.
    let err = post(&client, Request::new("user.profile")).unwrap_err();
    assert_eq!(err.code(), "invalid-session");
    let profile = post(&client, Request::new("user.profile").with_session_id(&session_id)).unwrap();
    assert_eq!(profile["idx"], user["idx"]);

    // Step 5: create and read back a post.
    let created = post(
        &client,
        Request::new("post.create")
            .with_session_id(&session_id)
            .field("title", "hello")
            .field("content", "world"),
    )
    .unwrap();
    assert_eq!(created["idx_user"], user["idx"]);
    let fetched = post(&client, Request::new("post.get").field("idx", created["idx"].clone())).unwrap();
    assert_eq!(fetched, created);

    // Step 6: the list is an object wrapping an array.
    let list = post(&client, Request::new("post.list")).unwrap();
    assert_eq!(list["posts"].as_array().unwrap().len(), 1);
}

#[test]
fn non_object_bodies_are_classified() {
    let client = SimplestClient::new(&start_server());

    // A bare number is neither an object nor an array.
    let err = post(&client, Request::new("test.number")).unwrap_err();
    assert!(matches!(err, ApiError::UnexpectedResponse(ref v) if *v == json!(42)));
    assert_eq!(err.code(), ApiError::UNEXPECTED_RESPONSE);

    // A 500 with an HTML body never reaches classification as JSON.
    let err = post(&client, Request::new("test.server-error")).unwrap_err();
    assert!(matches!(err, ApiError::NotServer { .. }));
    assert_eq!(err.message(), "Please check your Internet.");
}

#[test]
fn echo_shows_wire_shape() {
    let client = SimplestClient::new(&start_server());
    let echoed = post(
        &client,
        Request::new("test.echo").with_session_id("s-1").field("n", 3),
    )
    .unwrap();
    assert_eq!(echoed, json!({"run": "test.echo", "session_id": "s-1", "n": 3}));
}

#[test]
fn html_fragment() {
    let client = SimplestClient::new(&start_server());
    let req = client.build_html("header", "7").unwrap();
    let html = client.parse_html(execute(req)).unwrap();
    assert_eq!(html, r#"<div class="header" data-site="7"></div>"#);
}
