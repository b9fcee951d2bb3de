//! Per-request context.
//!
//! A [`Ctx`] is created at request entry and discarded after the handler
//! chain returns. It carries the matched route id, extracted path parameters
//! (raw strings plus their declared types), a free-form key/value bag for
//! handler-to-handler communication, and the response state the transport
//! writes out at the end.
//!
//! `Ctx` is a cheap-clone handle over shared interior state, so it can be
//! passed by ownership into handlers that also receive injected dependencies.

use crate::ids::{RequestId, RouteId};
use crate::params::{coerce, try_coerce, CoerceError, ParamSpec, ParamValue};
use crate::websocket::WsConnection;
use http::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use smallvec::SmallVec;
use std::any::Any;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tracing::error;

/// Raw extracted path parameters, stack-allocated for the common case.
pub type RawParams = SmallVec<[(String, String); 4]>;

/// Immutable request data captured at entry.
#[derive(Debug, Clone)]
pub struct RequestParts {
    pub method: Method,
    pub path: String,
    /// Header names lowercased by the transport layer.
    pub headers: HashMap<String, String>,
    pub body: Option<Vec<u8>>,
    /// TCP peer address when the transport exposes one.
    pub peer_addr: Option<IpAddr>,
}

impl RequestParts {
    /// Build request parts with no headers, body, or peer address. Intended
    /// for tests and embedded callers; the server fills everything in.
    #[must_use]
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            headers: HashMap::new(),
            body: None,
            peer_addr: None,
        }
    }
}

/// Response body content type. The transport maps these to static header
/// lines, which is all `may_minihttp` accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Json,
    Text,
}

/// Accumulated response state, written to the wire after dispatch.
#[derive(Debug, Clone)]
pub struct ResponseParts {
    pub status: Option<u16>,
    pub content_type: ContentType,
    pub body: Option<Vec<u8>>,
}

impl Default for ResponseParts {
    fn default() -> Self {
        Self {
            status: None,
            content_type: ContentType::Json,
            body: None,
        }
    }
}

/// The request body was missing or not valid JSON.
#[derive(Debug, Error)]
pub enum BodyError {
    #[error("request has no body")]
    Empty,
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

struct RouteBinding {
    id: RouteId,
    specs: Arc<[ParamSpec]>,
    params: RawParams,
}

struct CtxInner {
    request_id: RequestId,
    request: RequestParts,
    route: Mutex<Option<RouteBinding>>,
    values: Mutex<HashMap<String, Arc<dyn Any + Send + Sync>>>,
    response: Mutex<ResponseParts>,
    websocket: Mutex<Option<WsConnection>>,
    aborted: AtomicBool,
}

/// Request context handle. Clones share state.
#[derive(Clone)]
pub struct Ctx {
    inner: Arc<CtxInner>,
}

impl Ctx {
    #[must_use]
    pub fn new(request: RequestParts) -> Self {
        Self {
            inner: Arc::new(CtxInner {
                request_id: RequestId::new(),
                request,
                route: Mutex::new(None),
                values: Mutex::new(HashMap::new()),
                response: Mutex::new(ResponseParts::default()),
                websocket: Mutex::new(None),
                aborted: AtomicBool::new(false),
            }),
        }
    }

    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.inner.request_id
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.inner.request.method
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.inner.request.path
    }

    /// Matched route id; `None` until the dispatcher binds a route.
    #[must_use]
    pub fn route_id(&self) -> Option<RouteId> {
        self.lock_route().as_ref().map(|r| r.id)
    }

    /// Read a request header (name lowercased).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<String> {
        self.inner.request.headers.get(&name.to_ascii_lowercase()).cloned()
    }

    /// Client identifier for rate limiting: the first `X-Forwarded-For` entry
    /// or `X-Real-IP` (the later header wins when both are present), falling
    /// back to the TCP peer address, then `"unknown"`.
    #[must_use]
    pub fn client_ip(&self) -> String {
        let mut ip = self
            .inner
            .request
            .peer_addr
            .map(|addr| addr.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        for name in ["x-forwarded-for", "x-real-ip"] {
            if let Some(value) = self.inner.request.headers.get(name) {
                if let Some(first) = value.split(',').next() {
                    let first = first.trim();
                    if !first.is_empty() {
                        ip = first.to_string();
                    }
                }
            }
        }
        ip
    }

    // --- path parameters ---

    /// Raw (uncoerced) path parameter as extracted by the matcher.
    #[must_use]
    pub fn raw_param(&self, name: &str) -> Option<String> {
        self.lock_route().as_ref().and_then(|r| {
            r.params
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
        })
    }

    /// Path parameter coerced to its declared type. Conversion failures
    /// silently degrade to the declared type's zero value; use [`try_param`]
    /// to observe them. Undeclared names come back as the raw string.
    ///
    /// [`try_param`]: Ctx::try_param
    #[must_use]
    pub fn param(&self, name: &str) -> ParamValue {
        let raw = self.raw_param(name).unwrap_or_default();
        match self.spec_for(name) {
            Some(spec) => coerce(&spec, &raw),
            None => ParamValue::Str(raw),
        }
    }

    /// Path parameter coerced to its declared type, with failures reported.
    pub fn try_param(&self, name: &str) -> Result<ParamValue, CoerceError> {
        let raw = self.raw_param(name).unwrap_or_default();
        match self.spec_for(name) {
            Some(spec) => try_coerce(&spec, &raw),
            None => Ok(ParamValue::Str(raw)),
        }
    }

    fn spec_for(&self, name: &str) -> Option<ParamSpec> {
        self.lock_route()
            .as_ref()
            .and_then(|r| r.specs.iter().find(|s| s.name == name).cloned())
    }

    // --- request-scoped value bag ---

    /// Store a value for later handlers or middleware in this request.
    pub fn set<T: Any + Send + Sync>(&self, key: &str, value: T) {
        let mut values = self
            .inner
            .values
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), Arc::new(value));
    }

    /// Fetch a value stored with [`set`], if present and of type `T`.
    ///
    /// [`set`]: Ctx::set
    #[must_use]
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        let values = self
            .inner
            .values
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        values
            .get(key)
            .cloned()
            .and_then(|v| v.downcast::<T>().ok())
    }

    // --- request body ---

    /// Decode the JSON request body into `T`.
    pub fn decode_body<T: DeserializeOwned>(&self) -> Result<T, BodyError> {
        match &self.inner.request.body {
            Some(bytes) if !bytes.is_empty() => Ok(serde_json::from_slice(bytes)?),
            _ => Err(BodyError::Empty),
        }
    }

    // --- response writing ---

    /// Set the response status code. Chainable: `ctx.status(201).body(&pet)`.
    pub fn status(&self, code: u16) -> &Self {
        self.lock_response().status = Some(code);
        self
    }

    pub fn ok(&self) -> &Self {
        self.status(200)
    }

    pub fn bad_request(&self) -> &Self {
        self.status(400)
    }

    pub fn forbidden(&self) -> &Self {
        self.status(403)
    }

    pub fn not_found(&self) -> &Self {
        self.status(404)
    }

    pub fn too_many_requests(&self) -> &Self {
        self.status(429)
    }

    pub fn internal_server_error(&self) -> &Self {
        self.status(500)
    }

    /// Write a serializable value as the JSON response body. Defaults the
    /// status to 200 when none was set.
    pub fn body<T: Serialize>(&self, value: &T) {
        match serde_json::to_vec(value) {
            Ok(bytes) => self.write_body(bytes, ContentType::Json),
            Err(err) => {
                error!(request_id = %self.request_id(), %err, "response encoding failed");
                self.status(500);
                self.write_body(
                    json!({ "error": "response encoding failed" }).to_string().into_bytes(),
                    ContentType::Json,
                );
            }
        }
    }

    /// Write a raw JSON value as the response body.
    pub fn json(&self, value: Value) {
        self.write_body(value.to_string().into_bytes(), ContentType::Json);
    }

    /// Write `{"message": text}` as the response body.
    pub fn message(&self, text: &str) {
        self.json(json!({ "message": text }));
    }

    /// Write a plain-text response body.
    pub fn text(&self, text: &str) {
        self.write_body(text.as_bytes().to_vec(), ContentType::Text);
    }

    /// Write `{"error": msg}` with the given status code.
    pub fn error(&self, msg: &str, code: u16) {
        self.status(code);
        self.json(json!({ "error": msg }));
    }

    fn write_body(&self, bytes: Vec<u8>, content_type: ContentType) {
        let mut response = self.lock_response();
        if response.status.is_none() {
            response.status = Some(200);
        }
        response.content_type = content_type;
        response.body = Some(bytes);
    }

    /// Status code written so far, if any.
    #[must_use]
    pub fn response_status(&self) -> Option<u16> {
        self.lock_response().status
    }

    /// Snapshot of the accumulated response state.
    #[must_use]
    pub fn response_parts(&self) -> ResponseParts {
        self.lock_response().clone()
    }

    // --- websocket ---

    /// Live WebSocket connection, when this request was upgraded. Handlers on
    /// WebSocket routes must check for `None`: a failed upgrade is logged and
    /// leaves the slot empty, but the handler still runs.
    #[must_use]
    pub fn websocket(&self) -> Option<WsConnection> {
        self.inner
            .websocket
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn attach_websocket(&self, conn: WsConnection) {
        let mut slot = self
            .inner
            .websocket
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = Some(conn);
    }

    // --- dispatcher plumbing ---

    pub(crate) fn bind_route(&self, id: RouteId, specs: Arc<[ParamSpec]>, params: RawParams) {
        let mut route = self.lock_route();
        *route = Some(RouteBinding { id, specs, params });
    }

    pub(crate) fn mark_aborted(&self) {
        self.inner.aborted.store(true, Ordering::Release);
    }

    pub(crate) fn aborted(&self) -> bool {
        self.inner.aborted.load(Ordering::Acquire)
    }

    fn lock_route(&self) -> std::sync::MutexGuard<'_, Option<RouteBinding>> {
        self.inner.route.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_response(&self) -> std::sync::MutexGuard<'_, ResponseParts> {
        self.inner
            .response
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
