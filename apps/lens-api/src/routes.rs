use axum::{
	Json, Router,
	body::Body,
	extract::{Path, State, rejection::JsonRejection},
	http::{HeaderMap, Request, StatusCode, header::AUTHORIZATION},
	middleware::{self, Next},
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use lens_domain::entry::KnowledgeEntry;
use lens_service::{
	Error as ServiceError, IngestRequest, IngestResponse, QueryRequest, QueryResponse,
	RetrieveRequest, RetrieveResponse,
};

use crate::state::AppState;

/// Bearer token a router requires. `None` leaves the router open.
#[derive(Clone)]
struct RequiredToken(Option<String>);

pub fn router(state: AppState) -> Router {
	let token = RequiredToken(state.service.cfg.security.api_auth_token.clone());

	Router::new()
		.route("/v1/query", post(query))
		.route("/v1/retrieve", post(retrieve))
		.route("/v1/entries/{entry_id}", get(get_entry))
		.route_layer(middleware::from_fn_with_state(token, auth_middleware))
		.route("/health", get(health))
		.with_state(state)
}

pub fn admin_router(state: AppState) -> Router {
	let token = RequiredToken(state.service.cfg.security.admin_auth_token.clone());

	Router::new()
		.route("/v1/admin/ingest", post(ingest))
		.route_layer(middleware::from_fn_with_state(token, auth_middleware))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn query(
	State(state): State<AppState>,
	payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<QueryResponse>, ApiError> {
	let Json(body) = payload?;
	let request = QueryRequest::from_json(&body)?;
	let response = state.service.query(request).await?;

	Ok(Json(response))
}

async fn retrieve(
	State(state): State<AppState>,
	payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<RetrieveResponse>, ApiError> {
	let Json(body) = payload?;
	let request = RetrieveRequest::from_json(&body)?;
	let response = state.service.retrieve(request).await?;

	Ok(Json(response))
}

async fn get_entry(
	State(state): State<AppState>,
	Path(entry_id): Path<String>,
) -> Result<Json<KnowledgeEntry>, ApiError> {
	let entry_id = Uuid::parse_str(&entry_id).map_err(|_| {
		json_error(
			StatusCode::BAD_REQUEST,
			"INVALID_REQUEST",
			"entry_id must be a UUID.",
			Some(vec!["entry_id".to_string()]),
		)
	})?;
	let entry = state.service.get_entry(entry_id).await?;

	Ok(Json(entry))
}

async fn ingest(
	State(state): State<AppState>,
	payload: Result<Json<IngestRequest>, JsonRejection>,
) -> Result<Json<IngestResponse>, ApiError> {
	let Json(request) = payload?;
	let response = state.service.ingest(request).await?;

	Ok(Json(response))
}

async fn auth_middleware(
	State(token): State<RequiredToken>,
	req: Request<Body>,
	next: Next,
) -> Response {
	if !is_authorized(req.headers(), &token) {
		return json_error(
			StatusCode::UNAUTHORIZED,
			"UNAUTHORIZED",
			"A valid Bearer token is required.",
			None,
		)
		.into_response();
	}

	next.run(req).await
}

fn is_authorized(headers: &HeaderMap, token: &RequiredToken) -> bool {
	match &token.0 {
		None => true,
		Some(expected) => read_bearer_token(headers).is_some_and(|token| token == expected),
	}
}

fn read_bearer_token(headers: &HeaderMap) -> Option<&str> {
	let raw = headers.get(AUTHORIZATION)?;
	let value = raw.to_str().ok()?.trim();
	let token = value.strip_prefix("Bearer ")?.trim();

	if token.is_empty() { None } else { Some(token) }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}
impl ApiError {
	fn new(
		status: StatusCode,
		error_code: impl Into<String>,
		message: impl Into<String>,
		fields: Option<Vec<String>>,
	) -> Self {
		Self { status, error_code: error_code.into(), message: message.into(), fields }
	}
}

pub fn json_error(
	status: StatusCode,
	code: &str,
	message: impl Into<String>,
	fields: Option<Vec<String>>,
) -> ApiError {
	ApiError::new(status, code, message, fields)
}

impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		match err {
			ServiceError::InvalidRequest { message, field } => json_error(
				StatusCode::BAD_REQUEST,
				"INVALID_REQUEST",
				message,
				field.map(|field| vec![field]),
			),
			ServiceError::NotFound { message } =>
				json_error(StatusCode::NOT_FOUND, "NOT_FOUND", message, None),
			ServiceError::Conflict { message } =>
				json_error(StatusCode::CONFLICT, "CONFLICT", message, None),
			ServiceError::Provider { message } => {
				tracing::error!(error = message.as_str(), "Provider call failed.");

				json_error(StatusCode::BAD_GATEWAY, "PROVIDER_ERROR", message, None)
			},
			ServiceError::Storage { message } => {
				tracing::error!(error = message.as_str(), "Storage call failed.");

				json_error(
					StatusCode::INTERNAL_SERVER_ERROR,
					"STORAGE_ERROR",
					"Knowledge store is unavailable.",
					None,
				)
			},
		}
	}
}

impl From<JsonRejection> for ApiError {
	fn from(rejection: JsonRejection) -> Self {
		json_error(StatusCode::BAD_REQUEST, "INVALID_REQUEST", rejection.body_text(), None)
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body =
			ErrorBody { error_code: self.error_code, message: self.message, fields: self.fields };

		(self.status, Json(body)).into_response()
	}
}
