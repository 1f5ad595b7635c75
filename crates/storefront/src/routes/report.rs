//! Operator report: every application table and its rows.
//!
//! Disabled unless `FRESHMART_REPORT_TOKEN` is set. Requests must present the
//! token in the `X-Report-Token` header; anything else, including a token in
//! the query string, gets the same 404 as a disabled report. Query strings
//! end up in access logs, headers do not.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
};
use secrecy::ExposeSecret;
use sha2::{Digest, Sha256};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::PageContext;
use crate::models::TableDump;
use crate::state::AppState;

/// Header carrying the report token.
pub const REPORT_TOKEN_HEADER: &str = "x-report-token";

/// Report page template.
#[derive(Template, WebTemplate)]
#[template(path = "report.html")]
pub struct ReportTemplate {
    pub page: PageContext,
    pub tables: Vec<TableDump>,
}

/// Dump every table.
#[instrument(skip_all)]
pub async fn report(
    State(state): State<AppState>,
    headers: HeaderMap,
    page: PageContext,
) -> Result<impl IntoResponse> {
    let Some(expected) = state.config().report_token.as_ref() else {
        return Err(AppError::NotFound("Page".to_string()));
    };

    let supplied = headers
        .get(REPORT_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok());

    if !supplied.is_some_and(|token| tokens_match(token, expected.expose_secret())) {
        tracing::warn!("Report requested without a valid token");
        return Err(AppError::NotFound("Page".to_string()));
    }

    let tables = state.store().dump_tables().await?;
    tracing::info!(tables = tables.len(), "Report served");
    Ok(ReportTemplate { page, tables })
}

/// Compare fixed-length digests so timing does not depend on the prefix.
fn tokens_match(supplied: &str, expected: &str) -> bool {
    Sha256::digest(supplied.as_bytes()) == Sha256::digest(expected.as_bytes())
}
