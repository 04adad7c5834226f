//! Endpoint model and per-entry validation.
//!
//! # Responsibilities
//! - Define the declared shapes shared by the file document and the
//!   `StaticAPI` resource (`EndpointSpec`, `MethodSpec`)
//! - Validate a declared entry into an immutable `Endpoint`
//! - Produce the configured response for a request method
//!
//! # Design Decisions
//! - Status codes are decoded as plain integers so out-of-range values are
//!   reported as validation errors rather than decode failures
//! - Headers are converted to a typed `HeaderMap` once, at build time

use std::collections::BTreeMap;

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::Response;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::routing::matcher::{method_matches, SupportedMethods};

/// Declared endpoint: a path and the responses it serves per method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EndpointSpec {
    pub path: String,
    pub methods: Vec<MethodSpec>,
}

/// Declared response for one method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MethodSpec {
    pub method: String,

    /// Missing decodes as 0, which validation rejects.
    #[serde(default, alias = "status-code")]
    #[schemars(range(min = 100, max = 599))]
    pub status_code: i32,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub body: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

/// One item of a desired-state list, tagged with where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DesiredEndpoint {
    /// File position or resource name, used in logs.
    pub origin: String,
    pub spec: EndpointSpec,
}

impl DesiredEndpoint {
    pub fn new(origin: impl Into<String>, spec: EndpointSpec) -> Self {
        Self {
            origin: origin.into(),
            spec,
        }
    }
}

/// Reasons an entry is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing path")]
    MissingPath,

    #[error("invalid status-code {code} for method {method}")]
    InvalidStatusCode { method: String, code: i32 },

    #[error("invalid method name {0:?}")]
    InvalidMethod(String),

    #[error("invalid header {name:?} for method {method}")]
    InvalidHeader { method: String, name: String },
}

/// Validated response for a single method.
#[derive(Debug, Clone)]
pub struct MethodResponse {
    method: Method,
    status: StatusCode,
    body: Bytes,
    headers: HeaderMap,
}

impl MethodResponse {
    fn from_spec(spec: &MethodSpec) -> Result<Self, ValidationError> {
        let upper = spec.method.trim().to_ascii_uppercase();
        let method = Method::from_bytes(upper.as_bytes())
            .ok()
            .filter(|_| !upper.is_empty())
            .ok_or_else(|| ValidationError::InvalidMethod(spec.method.clone()))?;

        let status = u16::try_from(spec.status_code)
            .ok()
            .filter(|code| (100..=599).contains(code))
            .and_then(|code| StatusCode::from_u16(code).ok())
            .ok_or_else(|| ValidationError::InvalidStatusCode {
                method: upper.clone(),
                code: spec.status_code,
            })?;

        let mut headers = HeaderMap::with_capacity(spec.headers.len());
        for (name, value) in &spec.headers {
            let invalid = || ValidationError::InvalidHeader {
                method: upper.clone(),
                name: name.clone(),
            };
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
            let value = HeaderValue::from_str(value).map_err(|_| invalid())?;
            headers.insert(name, value);
        }

        Ok(Self {
            method,
            status,
            body: Bytes::from(spec.body.clone()),
            headers,
        })
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Configured headers, then status, then body.
    pub fn to_response(&self) -> Response {
        let mut response = Response::new(Body::from(self.body.clone()));
        *response.headers_mut() = self.headers.clone();
        *response.status_mut() = self.status;
        response
    }
}

/// A validated endpoint ready to be registered in a routing table.
#[derive(Debug, Clone)]
pub struct Endpoint {
    path: String,
    responders: Vec<MethodResponse>,
    supported: SupportedMethods,
}

impl Endpoint {
    /// Validate a declared entry.
    ///
    /// Fails if the path is empty or any method carries a status code
    /// outside 100-599, an unusable method name, or a malformed header.
    pub fn from_spec(spec: &EndpointSpec) -> Result<Self, ValidationError> {
        if spec.path.is_empty() {
            return Err(ValidationError::MissingPath);
        }

        let responders = spec
            .methods
            .iter()
            .map(MethodResponse::from_spec)
            .collect::<Result<Vec<_>, _>>()?;
        let supported = SupportedMethods::collect(responders.iter().map(|r| &r.method));

        Ok(Self {
            path: spec.path.clone(),
            responders,
            supported,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn supported(&self) -> &SupportedMethods {
        &self.supported
    }

    /// Case-insensitive lookup; the first declared match wins.
    pub fn method_from_request(&self, method: &Method) -> Option<&MethodResponse> {
        self.responders
            .iter()
            .find(|r| method_matches(&r.method, method))
    }

    /// Answer a request, or 405 when the method is not supported.
    pub fn respond(&self, method: &Method) -> Response {
        if !self.supported.contains(method) {
            return self.method_not_allowed();
        }
        match self.method_from_request(method) {
            Some(responder) => responder.to_response(),
            None => self.method_not_allowed(),
        }
    }

    fn method_not_allowed(&self) -> Response {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::METHOD_NOT_ALLOWED;
        if let Some(allow) = self.supported.allow_header() {
            response.headers_mut().insert(header::ALLOW, allow);
        }
        response
    }
}
