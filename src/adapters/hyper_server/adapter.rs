use http_body_util::{combinators::BoxBody, BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::{HeaderValue, CONTENT_DISPOSITION, CONTENT_TYPE};
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};

use crate::domain::{PacError, PacTester, UpdateStats};

type Body = BoxBody<Bytes, hyper::Error>;
type BoxError = Box<dyn std::error::Error + Send + Sync>;

const PAC_MIME: &str = "application/x-ns-proxy-autoconfig";
const INDEX_TEMPLATE: &str = include_str!("index.html");

#[derive(Debug, Deserialize)]
struct TestRequest {
    #[serde(default)]
    url: String,
    proxy: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
}

/// HTTP front of the routing tester. All routes are read-only.
pub struct HyperTestAdapter {
    tester: Arc<PacTester>,
    stats: UpdateStats,
}

impl HyperTestAdapter {
    pub fn new(tester: Arc<PacTester>, stats: UpdateStats) -> Self {
        Self { tester, stats }
    }

    pub async fn handle<B>(&self, req: Request<B>) -> Response<Body>
    where
        B: hyper::body::Body,
        B::Error: Into<BoxError>,
    {
        debug!("{} {}", req.method(), req.uri());
        self.handle_internal(req).await.unwrap_or_else(|e| {
            error!("Tester error: {}", e);
            text_response(StatusCode::INTERNAL_SERVER_ERROR, "text/plain; charset=utf-8", e.to_string())
        })
    }

    async fn handle_internal<B>(&self, req: Request<B>) -> Result<Response<Body>, BoxError>
    where
        B: hyper::body::Body,
        B::Error: Into<BoxError>,
    {
        let proxy = query_param(&req, "proxy");
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        match (&method, path.as_str()) {
            (&Method::GET, "/") => Ok(self.index()),
            (&Method::POST, "/test") => {
                let body = req.into_body().collect().await.map_err(Into::<BoxError>::into)?.to_bytes();
                Ok(self.test_url(&body))
            }
            (&Method::GET, "/generate-pac") => Ok(self.pac(proxy.as_deref(), false)),
            (&Method::GET, "/download-pac") => Ok(self.pac(proxy.as_deref(), true)),
            (&Method::GET, "/api/stats") => json_response(StatusCode::OK, &self.tester.snapshot(&self.stats)),
            _ => Ok(text_response(StatusCode::NOT_FOUND, "text/plain; charset=utf-8", "Not Found")),
        }
    }

    fn index(&self) -> Response<Body> {
        let domains = self.tester.domains();
        let samples = if domains.is_empty() {
            vec!["No domains loaded".to_string()]
        } else {
            domains.first_n(10)
        };
        let items = samples
            .iter()
            .map(|d| format!("<li>{}</li>", escape_html(d)))
            .collect::<Vec<_>>()
            .join("\n");

        let page = INDEX_TEMPLATE
            .replace("{{DOMAIN_COUNT}}", &domains.len().to_string())
            .replace("{{SAMPLE_DOMAINS}}", &items)
            .replace("{{DEFAULT_PROXY}}", &escape_html(self.tester.default_proxy()));
        text_response(StatusCode::OK, "text/html; charset=utf-8", page)
    }

    fn test_url(&self, body: &[u8]) -> Response<Body> {
        let request: TestRequest = match serde_json::from_slice(body) {
            Ok(request) => request,
            Err(e) => return error_response(StatusCode::BAD_REQUEST, format!("invalid request body: {}", e), None),
        };

        match self.tester.test_url(&request.url, request.proxy.as_deref()) {
            Ok(report) => json_or_500(StatusCode::OK, &report),
            Err(e) => error_response(StatusCode::BAD_REQUEST, e.to_string(), Some(&request.url)),
        }
    }

    fn pac(&self, proxy: Option<&str>, attachment: bool) -> Response<Body> {
        match self.tester.generate_pac(proxy) {
            Ok(doc) => {
                if !attachment {
                    return text_response(StatusCode::OK, "text/plain; charset=utf-8", doc.into_string());
                }
                let mut response = text_response(StatusCode::OK, PAC_MIME, doc.into_string());
                response
                    .headers_mut()
                    .insert(CONTENT_DISPOSITION, HeaderValue::from_static("attachment; filename=\"proxy.pac\""));
                response
            }
            Err(e @ PacError::Validation(_)) => error_response(StatusCode::BAD_REQUEST, e.to_string(), None),
            Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string(), None),
        }
    }
}

fn query_param<B>(req: &Request<B>, name: &str) -> Option<String> {
    let query = req.uri().query()?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

fn full(body: impl Into<Bytes>) -> Body {
    Full::new(body.into()).map_err(|never| match never {}).boxed()
}

fn text_response(status: StatusCode, content_type: &'static str, body: impl Into<Bytes>) -> Response<Body> {
    let mut response = Response::new(full(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Result<Response<Body>, BoxError> {
    let body = serde_json::to_vec(value)?;
    Ok(text_response(status, "application/json", body))
}

fn json_or_500<T: Serialize>(status: StatusCode, value: &T) -> Response<Body> {
    json_response(status, value).unwrap_or_else(|e| {
        error!("Failed to encode response: {}", e);
        text_response(StatusCode::INTERNAL_SERVER_ERROR, "text/plain; charset=utf-8", "encoding error")
    })
}

fn error_response(status: StatusCode, error: String, url: Option<&str>) -> Response<Body> {
    json_or_500(status, &ErrorBody { error, url })
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
