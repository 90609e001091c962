//! HTTP handlers for the landing page and its embedded assets.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{Response, StatusCode, header},
    response::{Html, IntoResponse},
};
use minijinja::{Environment, context};
use tracing::{debug, instrument};

use crate::AppState;
use crate::errors::{Error, Result};
use crate::static_assets::{Assets, Templates};

const INDEX_TEMPLATE: &str = "index.html";

/// Render the chat page.
#[instrument(skip_all, err)]
pub async fn index(State(state): State<AppState>) -> Result<Html<String>> {
    let source = Templates::get(INDEX_TEMPLATE).ok_or_else(|| anyhow::anyhow!("template {INDEX_TEMPLATE} is not embedded"))?;
    let source = String::from_utf8_lossy(&source.data);

    let mut env = Environment::new();
    env.add_template(INDEX_TEMPLATE, &source).map_err(anyhow::Error::from)?;
    let rendered = env
        .get_template(INDEX_TEMPLATE)
        .and_then(|template| {
            template.render(context! {
                model => state.completion.model(),
                speech_enabled => state.speech.is_enabled(),
                max_upload_bytes => state.config.limits.max_upload_bytes,
            })
        })
        .map_err(|e| Error::Other(anyhow::Error::from(e).context("rendering landing page")))?;

    Ok(Html(rendered))
}

/// Serve a file from the embedded `static/` folder.
#[instrument]
pub async fn static_asset(Path(path): Path<String>) -> impl IntoResponse {
    let Some(content) = Assets::get(&path) else {
        debug!("No embedded asset at {}", path);
        return StatusCode::NOT_FOUND.into_response();
    };

    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    Response::builder()
        .header(header::CONTENT_TYPE, mime.as_ref())
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from(content.data.into_owned()))
        .map(IntoResponse::into_response)
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
