//! Verify build/parse methods against JSON test vectors stored in `test-vectors/`.
//!
//! Each vector file describes inputs, expected requests, simulated responses,
//! and expected parse results or error kinds. Comparing parsed JSON (not raw
//! strings) avoids false negatives from field-ordering differences.

use serde_json::Value;
use todo_core::{
    ApiError, HttpMethod, HttpRequest, HttpResponse, NewTodo, QueryFilter, TodoClient, TodoItem,
    TodoPatch,
};
use uuid::Uuid;

const BASE_URL: &str = "http://localhost:8000";

fn client_for(case: &Value) -> TodoClient {
    let client = TodoClient::new(BASE_URL);
    match case.get("api_key").and_then(Value::as_str) {
        Some(key) => client.with_api_key(key),
        None => client,
    }
}

/// Parse the method string from test vectors into `HttpMethod`.
fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PATCH" => HttpMethod::Patch,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

fn simulated(case: &Value) -> HttpResponse {
    let sim = &case["simulated_response"];
    HttpResponse::new(
        sim["status"].as_u64().unwrap() as u16,
        sim["body"].as_str().unwrap(),
    )
}

fn input_id(case: &Value) -> Uuid {
    case["input_id"].as_str().unwrap().parse().unwrap()
}

/// Check method, path, optional headers and optional body.
fn check_request(name: &str, req: &HttpRequest, expected: &Value) {
    assert_eq!(req.method, parse_method(expected["method"].as_str().unwrap()), "{name}: method");
    assert_eq!(req.url, format!("{BASE_URL}{}", expected["path"].as_str().unwrap()), "{name}: path");

    if let Some(headers) = expected.get("headers").and_then(Value::as_array) {
        let expected_headers: Vec<(String, String)> = headers
            .iter()
            .map(|h| {
                let arr = h.as_array().unwrap();
                (arr[0].as_str().unwrap().to_string(), arr[1].as_str().unwrap().to_string())
            })
            .collect();
        assert_eq!(req.headers, expected_headers, "{name}: headers");
    }

    match expected.get("body") {
        Some(body) => {
            let req_body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
            assert_eq!(&req_body, body, "{name}: body");
        }
        None => assert!(req.body.is_none(), "{name}: body should be None"),
    }
}

/// Compare a result against `expected_result` or `expected_error`.
fn check_outcome<T, F>(name: &str, case: &Value, result: Result<T, ApiError>, compare: F)
where
    T: std::fmt::Debug,
    F: FnOnce(T, &Value),
{
    match case.get("expected_error").and_then(Value::as_str) {
        Some(kind) => {
            let err = result.unwrap_err();
            assert_eq!(err.kind(), kind, "{name}: error kind ({err})");
        }
        None => compare(result.unwrap(), &case["expected_result"]),
    }
}

fn cases(raw: &str) -> Vec<Value> {
    let vectors: Value = serde_json::from_str(raw).unwrap();
    vectors["cases"].as_array().unwrap().clone()
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[test]
fn create_test_vectors() {
    for case in cases(include_str!("../../test-vectors/create.json")) {
        let name = case["name"].as_str().unwrap();
        let c = client_for(&case);
        let input: NewTodo = serde_json::from_value(case["input"].clone()).unwrap();

        let req = c.build_create_todo(&input).unwrap();
        check_request(name, &req, &case["expected_request"]);

        let result = c.parse_create_todo(simulated(&case));
        check_outcome(name, &case, result, |todo, expected| {
            let expected: TodoItem = serde_json::from_value(expected.clone()).unwrap();
            assert_eq!(todo, expected, "{name}: parsed result");
        });
    }
}

// ---------------------------------------------------------------------------
// List
// ---------------------------------------------------------------------------

fn filter_from(value: &Value) -> QueryFilter {
    QueryFilter {
        q: value.get("q").and_then(Value::as_str).map(str::to_string),
        tag: value.get("tag").and_then(Value::as_str).map(str::to_string),
        status: value
            .get("status")
            .and_then(Value::as_str)
            .map(|s| s.parse().unwrap()),
        limit: value.get("limit").and_then(Value::as_u64).map(|l| l as u32),
    }
}

#[test]
fn list_test_vectors() {
    for case in cases(include_str!("../../test-vectors/list.json")) {
        let name = case["name"].as_str().unwrap();
        let c = client_for(&case);

        let req = c.build_list_todos(&filter_from(&case["filter"])).unwrap();
        check_request(name, &req, &case["expected_request"]);

        let result = c.parse_list_todos(simulated(&case));
        check_outcome(name, &case, result, |todos, expected| {
            let expected: Vec<TodoItem> = serde_json::from_value(expected.clone()).unwrap();
            assert_eq!(todos, expected, "{name}: parsed result");
        });
    }
}

// ---------------------------------------------------------------------------
// Get
// ---------------------------------------------------------------------------

#[test]
fn get_test_vectors() {
    for case in cases(include_str!("../../test-vectors/get.json")) {
        let name = case["name"].as_str().unwrap();
        let c = client_for(&case);
        let id = input_id(&case);

        let req = c.build_get_todo(id);
        check_request(name, &req, &case["expected_request"]);

        let result = c.parse_get_todo(id, simulated(&case));
        check_outcome(name, &case, result, |todo, expected| {
            let expected: TodoItem = serde_json::from_value(expected.clone()).unwrap();
            assert_eq!(todo, expected, "{name}: parsed result");
        });
    }
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

#[test]
fn update_test_vectors() {
    for case in cases(include_str!("../../test-vectors/update.json")) {
        let name = case["name"].as_str().unwrap();
        let c = client_for(&case);
        let id = input_id(&case);
        let patch: TodoPatch = serde_json::from_value(case["input"].clone()).unwrap();

        let req = c.build_update_todo(id, &patch).unwrap();
        check_request(name, &req, &case["expected_request"]);

        let result = c.parse_update_todo(id, simulated(&case));
        check_outcome(name, &case, result, |todo, expected| {
            let expected: TodoItem = serde_json::from_value(expected.clone()).unwrap();
            assert_eq!(todo, expected, "{name}: parsed result");
        });
    }
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

#[test]
fn delete_test_vectors() {
    for case in cases(include_str!("../../test-vectors/delete.json")) {
        let name = case["name"].as_str().unwrap();
        let c = client_for(&case);
        let id = input_id(&case);

        let req = c.build_delete_todo(id);
        check_request(name, &req, &case["expected_request"]);

        let result = c.parse_delete_todo(id, simulated(&case));
        check_outcome(name, &case, result, |(), _| {});
    }
}
