//! Liveness check.
//!
//! Mounted at `/healthz`. Does not touch the metadata service.

use crate::{Request, Response};

/// Always `200 OK` with body `"ok"`.
pub async fn liveness(_req: Request) -> Response {
    Response::text("ok")
}
