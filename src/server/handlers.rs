use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use super::AppState;
use super::error::ApiError;
use crate::compare::compare;
use crate::csr::params::SubjectProfile;
use crate::csr::{build, validate};
use crate::key::KeySpec;
use crate::naming::suggest_domain_name;

pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Welcome to CSR Generator API" }))
}

pub async fn health() -> Json<Value> {
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();
    Json(json!({ "status": "healthy", "timestamp": timestamp }))
}

/// `key_size` arrives as a number from API clients and as a string from
/// HTML selects.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum KeySizeField {
    Bits(usize),
    Text(String),
}

impl KeySizeField {
    fn bits(&self) -> Result<usize, ApiError> {
        match self {
            KeySizeField::Bits(bits) => Ok(*bits),
            KeySizeField::Text(text) => text
                .trim()
                .parse()
                .map_err(|_| ApiError::bad_request(format!("key_size must be a number, got '{text}'"))),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub common_name: Option<String>,
    pub organization: Option<String>,
    pub country: Option<String>,
    pub organizational_unit: Option<String>,
    pub locality: Option<String>,
    pub state: Option<String>,
    pub email: Option<String>,
    pub key_size: Option<KeySizeField>,
    pub key_type: Option<String>,
    #[serde(default)]
    pub subject_alt_names: Vec<String>,
}

fn required(value: Option<String>, field: &str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request(format!("Missing required field: {field}")))
}

/// Forms submit untouched optional inputs as empty strings.
fn optional(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl GenerateRequest {
    fn into_parts(self) -> Result<(SubjectProfile, KeySpec), ApiError> {
        let key_size = self.key_size.as_ref().map(KeySizeField::bits).transpose()?;
        let key_spec = KeySpec::from_parts(self.key_type.as_deref(), key_size)?;

        let profile = SubjectProfile::builder()
            .common_name(required(self.common_name, "common_name")?)
            .organization(required(self.organization, "organization")?)
            .country(required(self.country, "country")?)
            .maybe_organizational_unit(optional(self.organizational_unit))
            .maybe_locality(optional(self.locality))
            .maybe_state(optional(self.state))
            .maybe_email(optional(self.email))
            .subject_alt_names(
                self.subject_alt_names
                    .into_iter()
                    .filter(|name| !name.trim().is_empty())
                    .collect(),
            )
            .build();
        Ok((profile, key_spec))
    }
}

#[derive(Serialize)]
struct GenerateResponse<'a> {
    csr: &'a str,
    private_key: &'a str,
}

pub async fn generate(payload: Result<Json<GenerateRequest>, JsonRejection>) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let (profile, key_spec) = request.into_parts()?;
    profile.validate()?;

    tracing::info!(common_name = %profile.common_name, ?key_spec, "generating CSR");
    let credential = tokio::task::spawn_blocking(move || build(&profile, &key_spec))
        .await
        .map_err(|e| ApiError::internal(format!("key generation task failed: {e}")))??;

    // Serialized here so the key text never outlives `credential`.
    Ok(Json(GenerateResponse {
        csr: &credential.csr,
        private_key: &credential.private_key,
    })
    .into_response())
}

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub csr_data: Option<String>,
    pub csr: Option<String>,
}

pub async fn validate_csr(
    State(state): State<AppState>,
    payload: Result<Json<ValidateRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let csr = request
        .csr_data
        .or(request.csr)
        .filter(|csr| !csr.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing CSR data"))?;

    match validate(csr.as_bytes(), &state.config.policy) {
        Ok(report) => {
            tracing::info!(
                signature_algorithm = %report.csr.signature_algorithm,
                key_size = report.csr.key_size_bits,
                overall_rating = %report.assessment.overall_rating,
                "validated CSR"
            );
            Ok(Json(report).into_response())
        }
        Err(e) => {
            tracing::info!(error = %e, "rejected CSR");
            Err(e.into())
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CompareRequest {
    pub csr1: String,
    pub csr2: String,
}

pub async fn compare_csrs(payload: Result<Json<CompareRequest>, JsonRejection>) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let comparison = compare(request.csr1.as_bytes(), request.csr2.as_bytes())?;
    Ok(Json(comparison).into_response())
}

#[derive(Debug, Deserialize)]
pub struct SuggestQuery {
    pub service: String,
    pub environment: String,
}

pub async fn suggest_domain(
    State(state): State<AppState>,
    query: Result<Query<SuggestQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::bad_request(e.body_text()))?;
    if query.service.trim().is_empty() || query.environment.trim().is_empty() {
        return Err(ApiError::bad_request("service and environment are required"));
    }
    let domain = suggest_domain_name(&query.service, &query.environment, &state.config.naming);
    Ok(Json(json!({ "domain": domain })))
}
