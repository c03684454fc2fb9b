use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

/// Route label for requests that matched nothing.
const UNMATCHED_ROUTE: &str = "<unmatched>";

/// Middleware that logs one line per HTTP request.
///
/// Requests are labelled by their route template rather than the raw URI,
/// so usernames and ids from the query string stay out of the log. Server
/// errors are logged at WARN, everything else at INFO.
pub async fn request_logger(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let route = route_label(&request);

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let duration_ms = start.elapsed().as_millis() as u64;
    if response.status().is_server_error() {
        tracing::warn!(method = %method, route = %route, status, duration_ms, "HTTP request failed");
    } else {
        tracing::info!(method = %method, route = %route, status, duration_ms, "HTTP request");
    }

    response
}

fn route_label(request: &Request) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_string())
}
