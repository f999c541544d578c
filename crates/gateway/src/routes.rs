//! Per-route request handler and error mapping.

use agentflow_core::{Error, WaitError};
use agentflow_resolver::{RequestDescriptor, Resolver, RouteTemplate};
use axum::{
    extract::{Query, Request, State},
    http::{Method, StatusCode, header},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

/// Everything a route's handler needs; one per configured route.
pub struct RouteState {
    pub template: RouteTemplate,
    /// Upper-case allowed methods
    pub methods: Vec<String>,
    /// Largest request body read into the descriptor
    pub body_limit: usize,
    pub resolver: Arc<Resolver>,
}

impl RouteState {
    pub fn allows(&self, method: &Method) -> bool {
        self.methods.iter().any(|m| m == method.as_str())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Internal failure answered for one request only.
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

/// HTTP status for a failed request.
pub fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::UnsupportedMethod { .. } | Error::RequestBody { .. } => StatusCode::BAD_REQUEST,
        Error::Render(_) => StatusCode::BAD_GATEWAY,
        Error::Wait(WaitError::Timeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        let message = self.0.to_string();
        match self.0 {
            Error::UnsupportedMethod { .. } => (status, message).into_response(),
            _ => (status, Json(ErrorResponse { error: message })).into_response(),
        }
    }
}

/// Handle one call to a configured route.
///
/// The method is checked before the body is read, so a disallowed method is
/// always a 400 whatever the body size.
pub async fn api_handler(
    State(route): State<Arc<RouteState>>,
    Query(params): Query<Vec<(String, String)>>,
    request: Request,
) -> Result<Response, ApiError> {
    let (parts, body) = request.into_parts();
    let (method, uri, headers) = (parts.method, parts.uri, parts.headers);
    if !route.allows(&method) {
        return Err(Error::UnsupportedMethod {
            method: method.to_string(),
        }
        .into());
    }

    let body = axum::body::to_bytes(body, route.body_limit)
        .await
        .map_err(|e| Error::RequestBody {
            reason: e.to_string(),
        })?;

    let descriptor = RequestDescriptor {
        url: uri.path().to_string(),
        method: method.to_string(),
        headers: headers
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).trim().to_string(),
                )
            })
            .collect(),
        body: String::from_utf8_lossy(&body).to_string(),
        params: params
            .into_iter()
            .map(|(name, value)| (name, value.trim().to_string()))
            .collect(),
    };

    let ctx = route.template.request();
    info!(
        request_id = %ctx.request_id,
        route = %route.template.route_path,
        method = %method,
        "Request received"
    );

    match route.resolver.resolve(&ctx, &descriptor).await {
        Ok(resolved) => Ok((
            StatusCode::OK,
            [(header::CONTENT_TYPE, resolved.content_type)],
            resolved.body,
        )
            .into_response()),
        Err(e) => {
            error!(
                request_id = %ctx.request_id,
                route = %route.template.route_path,
                error = %e,
                "Request failed"
            );
            Err(e.into())
        }
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
