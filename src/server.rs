//! HTTP surface: image fetch route and a render endpoint

use crate::error::{TracMathError, TracMathResult};
use crate::fetch::{self, FetchedImage};
use crate::render::{Renderer, MACRO_NAME, ROUTE_PREFIX};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{
        header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE},
        HeaderValue, StatusCode,
    },
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tracing::{error, info};

/// Build the router serving `/tracmath/{name}` and `POST /tracmath`
pub fn router(renderer: Arc<Renderer>) -> Router {
    Router::new()
        .route(&format!("{ROUTE_PREFIX}/{{name}}"), get(serve_image))
        .route(ROUTE_PREFIX, post(render_formula))
        .with_state(renderer)
}

/// Bind and serve until the process is stopped
pub async fn serve(renderer: Arc<Renderer>, bind: &str) -> TracMathResult<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| TracMathError::io(format!("binding {}", bind), e))?;

    info!("Serving {} on http://{}", ROUTE_PREFIX, bind);

    axum::serve(listener, router(renderer))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| TracMathError::io("serving HTTP", e))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

async fn serve_image(State(renderer): State<Arc<Renderer>>, Path(name): Path<String>) -> Response {
    match fetch::fetch_name(renderer.store(), &name).await {
        Ok(image) => image_response(image),
        Err(TracMathError::NotFound(_) | TracMathError::InvalidName(_)) => {
            (StatusCode::NOT_FOUND, "Image not found").into_response()
        }
        Err(err) => {
            error!(name = %name, error = %err, "failed to read cached image");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to read image").into_response()
        }
    }
}

async fn render_formula(State(renderer): State<Arc<Renderer>>, body: String) -> Response {
    match renderer.render(MACRO_NAME, &body).await {
        Ok(image) => Html(renderer.image_html(&image)).into_response(),
        Err(err) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Html(renderer.error_html(&err)),
        )
            .into_response(),
    }
}

fn image_response(image: FetchedImage) -> Response {
    let len = image.bytes.len();
    let mut response = Response::new(Body::from(image.bytes));

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&image.content_type) {
        headers.insert(CONTENT_TYPE, value);
    }
    headers.insert(CONTENT_LENGTH, HeaderValue::from(len));
    // Names are content hashes
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000, immutable"),
    );

    response
}
