use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::Response;

use crate::api::error_response;
use crate::auth::CurrentUser;
use crate::logging::TraceId;

/// Middleware that restricts a route group to `role = admin`.
///
/// Must run after [`crate::auth::jwt_auth_middleware`], which inserts the
/// [`CurrentUser`] extension. Editors receive 403.
pub async fn require_admin(req: Request<Body>, next: Next) -> Response {
    let trace_id = req
        .extensions()
        .get::<TraceId>()
        .map(|t| t.0.clone())
        .unwrap_or_default();

    let caller = req
        .extensions()
        .get::<CurrentUser>()
        .map(|u| (u.is_admin(), u.id.clone(), u.role));

    match caller {
        Some((true, _, _)) => next.run(req).await,
        Some((false, user_id, role)) => {
            tracing::warn!(
                trace_id = %trace_id,
                user_id = %user_id,
                role = %role,
                "Request rejected: admin role required"
            );
            error_response(
                StatusCode::FORBIDDEN,
                &trace_id,
                "forbidden",
                "admin role required",
            )
        }
        None => error_response(
            StatusCode::UNAUTHORIZED,
            &trace_id,
            "unauthorized",
            "missing authorization header",
        ),
    }
}
