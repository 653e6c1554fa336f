use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
};
use serde::Serialize;
use uuid::Uuid;

use super::error::{ApiResult, bad_json};
use crate::delta::DeltaAt;
use crate::error::SyncError;
use crate::model::{CompanyProfile, LinkType, Links, ProfileDelta};
use crate::notify::http::REQUEST_ID_HEADER;
use crate::sync::{CompanySyncService, UkEstablishments};

pub const DELTA_AT_HEADER: &str = "x-delta-at";

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
}

pub async fn healthcheck() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
    })
}

pub async fn get_profile(
    State(service): State<CompanySyncService>,
    Path(company_number): Path<String>,
) -> ApiResult<Json<CompanyProfile>> {
    Ok(Json(service.get_profile(&company_number).await?))
}

pub async fn put_profile(
    State(service): State<CompanySyncService>,
    Path(company_number): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<ProfileDelta>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Json(delta) = payload.map_err(bad_json)?;
    service
        .put_profile(&company_number, delta, &context_id(&headers))
        .await?;
    Ok(StatusCode::OK)
}

pub async fn delete_profile(
    State(service): State<CompanySyncService>,
    Path(company_number): Path<String>,
    headers: HeaderMap,
) -> ApiResult<StatusCode> {
    let delta_at = headers
        .get(DELTA_AT_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| SyncError::bad_request("X-DELTA-AT header is required"))?;
    let delta_at = DeltaAt::parse(delta_at)?;

    service
        .delete_profile(&company_number, delta_at, &context_id(&headers))
        .await?;
    Ok(StatusCode::OK)
}

pub async fn get_links(
    State(service): State<CompanySyncService>,
    Path(company_number): Path<String>,
) -> ApiResult<Json<Links>> {
    Ok(Json(service.get_links(&company_number).await?))
}

pub async fn add_link(
    State(service): State<CompanySyncService>,
    Path((company_number, link_type)): Path<(String, String)>,
    headers: HeaderMap,
) -> ApiResult<StatusCode> {
    let link_type = link_type.parse::<LinkType>()?;
    service
        .add_link(&company_number, link_type, &context_id(&headers))
        .await?;
    Ok(StatusCode::OK)
}

pub async fn delete_link(
    State(service): State<CompanySyncService>,
    Path((company_number, link_type)): Path<(String, String)>,
    headers: HeaderMap,
) -> ApiResult<StatusCode> {
    let link_type = link_type.parse::<LinkType>()?;
    service
        .delete_link(&company_number, link_type, &context_id(&headers))
        .await?;
    Ok(StatusCode::OK)
}

pub async fn get_uk_establishments(
    State(service): State<CompanySyncService>,
    Path(company_number): Path<String>,
) -> ApiResult<Json<UkEstablishments>> {
    Ok(Json(service.get_uk_establishments(&company_number).await?))
}

/// Request id of the caller, or a fresh one when none was sent.
pub fn context_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn context_id_prefers_request_header() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("req-123"));
        assert_eq!(context_id(&headers), "req-123");
    }

    #[test]
    fn context_id_is_generated_when_missing() {
        let generated = context_id(&HeaderMap::new());
        assert!(Uuid::parse_str(&generated).is_ok());
    }
}
