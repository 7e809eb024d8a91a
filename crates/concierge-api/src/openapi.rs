//! # OpenAPI Document
//!
//! Assembles the utoipa-documented case routes into a single OpenAPI 3.1
//! document served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI document for the case lifecycle API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Concierge Case Lifecycle API",
        version = "0.1.0",
        description = "Request guard for case and stage status changes.\n\nEvery status write is validated against the case and stage lifecycle graphs. A rejected change returns 403 with the message `Illegal <kind> transition: <current> -> <next>` and writes nothing.",
        license(name = "AGPL-3.0-or-later")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server"),
    ),
    paths(
        crate::routes::cases::create_case,
        crate::routes::cases::list_cases,
        crate::routes::cases::get_case,
        crate::routes::cases::update_case_status,
        crate::routes::cases::update_stage_status,
        crate::routes::cases::perform_action,
        crate::routes::cases::get_permissions,
    ),
    components(schemas(
        crate::state::CaseRecord,
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::cases::CreateCaseRequest,
        crate::routes::cases::StatusChangeRequest,
        crate::routes::cases::ActionRequest,
        crate::routes::cases::PermissionsResponse,
    )),
    tags(
        (name = "cases", description = "Case lifecycle: creation, status changes, workflow actions, permissions"),
    )
)]
pub struct ApiDoc;

/// Serves the OpenAPI JSON document at `/openapi.json`.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json — Return the generated OpenAPI document.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_generates() {
        let doc = ApiDoc::openapi();
        assert_eq!(doc.info.title, "Concierge Case Lifecycle API");
    }

    #[test]
    fn openapi_document_has_case_paths() {
        let doc = ApiDoc::openapi();
        for path in [
            "/v1/cases",
            "/v1/cases/{id}",
            "/v1/cases/{id}/status",
            "/v1/cases/{id}/stage/status",
            "/v1/cases/{id}/actions/{action}",
            "/v1/cases/{id}/permissions",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn openapi_document_serializes() {
        let json = serde_json::to_string(&ApiDoc::openapi()).unwrap();
        assert!(json.contains("CaseRecord"));
    }
}
