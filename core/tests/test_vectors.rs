//! Verify build/parse methods against JSON test vectors stored in `test-vectors/`.
//!
//! Each vector file describes inputs, simulated responses, and expected
//! results. Comparing parsed JSON (not raw strings) avoids false negatives
//! from field-ordering differences.

use serde_json::Value;
use simplest_core::{HttpBody, HttpMethod, HttpResponse, Request, SimplestClient};

const BACKEND_URL: &str = "http://localhost:3000/api.php";

fn client() -> SimplestClient {
    SimplestClient::new(BACKEND_URL)
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[test]
fn classify_test_vectors() {
    let raw = include_str!("../../test-vectors/classify.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let response = HttpResponse {
            status: case["response"]["status"].as_u64().unwrap() as u16,
            headers: Vec::new(),
            body: case["response"]["body"].as_str().unwrap().to_string(),
        };
        let expected = &case["expected"];

        match c.parse_post(response) {
            Ok(value) => {
                assert!(expected.get("ok").is_some(), "{name}: expected an error, got {value}");
                assert_eq!(value, expected["ok"], "{name}: value");
            }
            Err(err) => {
                assert!(expected.get("ok").is_none(), "{name}: unexpected error {err:?}");
                let object = err.to_error_object();
                assert_eq!(object.error_code, expected["error_code"].as_str().unwrap(), "{name}: code");
                assert_eq!(
                    object.error_message,
                    expected["error_message"].as_str().unwrap(),
                    "{name}: message"
                );
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Request building
// ---------------------------------------------------------------------------

#[test]
fn request_test_vectors() {
    let raw = include_str!("../../test-vectors/request.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let input = &case["input"];
        let request = Request::from_fields(
            input["run"].as_str().unwrap(),
            input["fields"].as_object().unwrap().clone(),
        );
        let current = case["current_session_id"].as_str().map(str::to_string);

        let req = c.build_post(&request.with_default_session(current)).unwrap();
        assert_eq!(req.method, HttpMethod::Post, "{name}: method");
        assert_eq!(req.url, BACKEND_URL, "{name}: url");
        assert_eq!(
            req.headers,
            vec![("content-type".to_string(), "application/json".to_string())],
            "{name}: headers"
        );

        let HttpBody::Json(body) = &req.body else {
            panic!("{name}: expected a JSON body");
        };
        let body: Value = serde_json::from_str(body).unwrap();
        assert_eq!(body, case["expected_body"], "{name}: body");
    }
}
