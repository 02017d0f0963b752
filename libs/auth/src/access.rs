use axum::{extract::Request, http, middleware::Next, response::Response};

use crate::{
    claims::{Access, Claims},
    ANY_ID,
};

/// Operator routes need the execute bit; a scoped token may only touch
/// the capture of its own session.
pub async fn access_middleware(request: Request, next: Next) -> Response {
    let path = request.uri().path();
    let ok = match request.extensions().get::<Claims>() {
        Some(_) if api::path::is_public(path) => true,
        Some(claims) => {
            let access = Access::from(claims.mode);
            match (claims.id.as_str(), path) {
                (ANY_ID, _) => access.x,
                (id, path) if path == api::path::capture(id) => access.x,
                _ => false,
            }
        }
        None => false,
    };

    if !ok {
        return Response::builder()
            .status(http::StatusCode::FORBIDDEN)
            .body("Don't permission".into())
            .unwrap_or_default();
    }

    next.run(request).await
}
