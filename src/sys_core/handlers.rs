//! Server loop and router: static mounts, then the union, then 404.

use std::convert::Infallible;
use std::sync::Arc;

use hyper::header::CONTENT_TYPE;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use tracing::{debug, info};

use crate::sys_core::core::AppState;
use crate::sys_statichost::handlers::handler_static;
use crate::sys_unionfs::handlers::handler_unionfs;

pub async fn route(state: Arc<AppState>, req: Request<Body>) -> Result<Response<Body>, Infallible> {
    let uri = req.uri().path();

    if !matches!(*req.method(), Method::GET | Method::HEAD) {
        return Ok(handler_not_found(uri));
    }

    if let Some(resp) = handler_static(&state.mounts, uri).await {
        return Ok(resp);
    }
    if let Some(resp) = handler_unionfs(&state.roots, uri).await {
        return Ok(resp);
    }
    Ok(handler_not_found(uri))
}

/// Fallback for anything no layer claimed.
pub fn handler_not_found(uri: &str) -> Response<Body> {
    debug!(uri, "couldn't find file");
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Body::from("Not found"))
        .unwrap()
}

/// Serve until Ctrl-C.
pub async fn run_server(state: Arc<AppState>) -> Result<(), hyper::Error> {
    let addr = state.bind;
    let make_svc = make_service_fn(move |_conn| {
        let state = state.clone();
        async move { Ok::<_, Infallible>(service_fn(move |req| route(state.clone(), req))) }
    });

    let server = Server::try_bind(&addr)?.serve(make_svc);
    info!(address = %server.local_addr(), "listening");

    server.with_graceful_shutdown(shutdown_signal()).await
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
    }
}
