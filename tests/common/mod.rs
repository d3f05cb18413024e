#![allow(dead_code)]

use lipages::client::{ApiRequest, ApiResponse};
use lipages::{Result, Transport};
use serde_json::{json, Value};
use std::cell::RefCell;

type Responder = Box<dyn Fn(&ApiRequest) -> ApiResponse>;

/// Transport answering by request path; unknown paths get a 404
pub struct MockTransport {
    routes: Vec<(String, Responder)>,
    requests: RefCell<Vec<ApiRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        MockTransport {
            routes: Vec::new(),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn route(mut self, path: &str, responder: impl Fn(&ApiRequest) -> ApiResponse + 'static) -> Self {
        self.routes.push((path.to_string(), Box::new(responder)));
        self
    }

    /// Always answer `path` with the same JSON body
    pub fn json(self, path: &str, body: Value) -> Self {
        self.route(path, move |_| ok(&body))
    }

    /// Serve `elements` page by page, honoring `start`/`count`
    pub fn collection(self, path: &str, elements: Vec<Value>, report_total: bool) -> Self {
        self.route(path, move |request| {
            let start: usize = request.param("start").unwrap_or("0").parse().unwrap();
            let count: usize = request.param("count").unwrap_or("10").parse().unwrap();
            let page: Vec<Value> = elements.iter().skip(start).take(count).cloned().collect();
            let paging = if report_total {
                json!({"start": start, "count": count, "total": elements.len()})
            } else {
                json!({"start": start, "count": count})
            };
            ok(&json!({"elements": page, "paging": paging}))
        })
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.borrow().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<ApiRequest> {
        self.requests
            .borrow()
            .iter()
            .filter(|request| request.path == path)
            .cloned()
            .collect()
    }
}

impl Transport for MockTransport {
    fn get(&self, request: &ApiRequest) -> Result<ApiResponse> {
        self.requests.borrow_mut().push(request.clone());
        let response = self
            .routes
            .iter()
            .find(|(path, _)| *path == request.path)
            .map(|(_, responder)| responder(request))
            .unwrap_or_else(|| ApiResponse {
                status: 404,
                body: format!("no route for {}", request.path),
            });
        Ok(response)
    }
}

pub fn ok(body: &Value) -> ApiResponse {
    ApiResponse {
        status: 200,
        body: body.to_string(),
    }
}

pub fn error(status: u16, message: &str) -> ApiResponse {
    ApiResponse {
        status,
        body: json!({"message": message, "status": status}).to_string(),
    }
}

/// `n` numbered elements `{"id": 0}`, `{"id": 1}`, ...
pub fn numbered(n: usize) -> Vec<Value> {
    (0..n).map(|i| json!({"id": i})).collect()
}
