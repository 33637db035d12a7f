//! HTTP handlers for the Loi 96 API

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use std::sync::Arc;

use analysis_engine::{AnalysisStore, AnalyzeRequest, AnalyzeSource, QuotaStore, SignageRequest};

use crate::error::ApiError;
use crate::models::*;
use crate::state::AppState;

/// Health check endpoint
pub async fn health() -> &'static str {
    "OK"
}

/// The authenticated user id, as set by the upstream identity proxy.
fn require_user(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get("x-user-id")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or(ApiError::Unauthenticated)
}

/// Analyze a document for Loi 96 compliance
pub async fn analyze_document(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<AnalyzeApiRequest>,
) -> Result<Json<AnalyzeApiResponse>, ApiError> {
    let user_id = require_user(&headers)?;
    let caller = state.caller(&user_id).await?;

    // Exactly one analysis source.
    let source = match (req.text, req.file_base64) {
        (Some(_), Some(_)) => {
            return Err(ApiError::InvalidRequest(
                "Provide either text or a file, not both".into(),
            ))
        }
        (None, None) => {
            return Err(ApiError::InvalidRequest(
                "Provide either text or a file".into(),
            ))
        }
        (Some(text), None) => AnalyzeSource::Text(text),
        (None, Some(file_base64)) => {
            let declared_mime = req.mime_type.ok_or_else(|| {
                ApiError::InvalidRequest("mime_type is required with a file".into())
            })?;
            let bytes = BASE64
                .decode(&file_base64)
                .map_err(|e| ApiError::InvalidRequest(format!("Invalid file base64: {}", e)))?;
            AnalyzeSource::File {
                bytes,
                declared_mime,
            }
        }
    };

    let analysis = state
        .document_analyzer
        .analyze(
            &caller,
            AnalyzeRequest {
                document_name: req.document_name,
                source,
            },
        )
        .await?;

    tracing::info!(
        analysis_id = %analysis.id,
        score = analysis.compliance_score,
        "analysis completed"
    );

    Ok(Json(AnalyzeApiResponse {
        success: true,
        analysis,
    }))
}

/// Analyze a signage description for Loi 96 compliance
pub async fn analyze_signage(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<SignageApiRequest>,
) -> Result<Json<SignageApiResponse>, ApiError> {
    let user_id = require_user(&headers)?;
    let caller = state.caller(&user_id).await?;

    let report = state
        .signage_analyzer
        .analyze(
            &caller,
            SignageRequest {
                description: req.description,
            },
        )
        .await?;

    Ok(Json(SignageApiResponse {
        success: true,
        report,
    }))
}

/// List the caller's analyses, newest first
pub async fn list_analyses(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse>, ApiError> {
    let user_id = require_user(&headers)?;
    let page = params.page.max(1);
    let page_size = params.page_size.clamp(1, 100);

    let (items, total) = state
        .store
        .as_ref()
        .list_analyses(&user_id, page, page_size)
        .await?;

    Ok(Json(ListResponse {
        items,
        total,
        page,
        page_size,
    }))
}

/// Fetch a single analysis by id
pub async fn get_analysis(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<shared_types::Analysis>, ApiError> {
    let user_id = require_user(&headers)?;

    let analysis = state
        .store
        .as_ref()
        .get_analysis(&user_id, &id)
        .await?
        .ok_or_else(|| ApiError::AnalysisNotFound(id.clone()))?;

    Ok(Json(analysis))
}

/// Delete an analysis and its document
pub async fn delete_analysis(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let user_id = require_user(&headers)?;

    let deleted = state
        .store
        .as_ref()
        .delete_analysis_and_document(&user_id, &id)
        .await?;
    if !deleted {
        return Err(ApiError::AnalysisNotFound(id));
    }

    tracing::info!(analysis_id = %id, "analysis deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Current monthly usage for the caller
pub async fn get_usage(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<UsageResponse>, ApiError> {
    let user_id = require_user(&headers)?;
    let caller = state.caller(&user_id).await?;

    let summary = state.quota.get_usage(&user_id).await?;
    Ok(Json(UsageResponse::from_summary(
        summary,
        caller.is_unlimited(),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router;
    use crate::store::{SqliteAnalysisStore, SqliteQuotaStore};
    use analysis_engine::{DocumentAnalyzer, InferenceEngine, SignageAnalyzer};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use http_body_util::BodyExt;
    use pretty_assertions::assert_eq;
    use rate_limit::MemoryBackend;
    use serde_json::{json, Value};
    use sqlx::sqlite::SqlitePoolOptions;
    use tower::ServiceExt;

    struct CannedEngine {
        response: String,
    }

    #[async_trait]
    impl InferenceEngine for CannedEngine {
        async fn invoke(&self, _: &str, _: &str, _: u32, _: &str) -> anyhow::Result<String> {
            Ok(self.response.clone())
        }
    }

    const ANALYSIS_RESPONSE: &str = r#"{
        "isCompliant": false,
        "complianceScore": 58,
        "detectedLanguage": "bilingual",
        "frenchPercentage": 40,
        "issues": [],
        "suggestions": []
    }"#;

    async fn test_app(response: &str) -> Router {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        AppState::run_migrations(&pool).await.unwrap();

        let inference: Arc<dyn InferenceEngine> = Arc::new(CannedEngine {
            response: response.to_string(),
        });
        let counter = Arc::new(MemoryBackend::new());
        let quota = Arc::new(SqliteQuotaStore { db: pool.clone() });
        let store = Arc::new(SqliteAnalysisStore { db: pool.clone() });
        let document_analyzer = DocumentAnalyzer::new(
            inference.clone(),
            store.clone(),
            quota.clone(),
            counter.clone(),
            "claude-sonnet-4-test",
        );
        let signage_analyzer =
            SignageAnalyzer::new(inference, quota.clone(), counter.clone(), "claude-sonnet-4-test");

        router(Arc::new(AppState {
            db: pool,
            counter,
            quota,
            store,
            document_analyzer,
            signage_analyzer,
        }))
    }

    fn post_json(uri: &str, user: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(user) = user {
            builder = builder.header("x-user-id", user);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = test_app(ANALYSIS_RESPONSE).await;
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_analyze_without_user_header_is_unauthorized() {
        let app = test_app(ANALYSIS_RESPONSE).await;
        let response = app
            .oneshot(post_json(
                "/api/analyze",
                None,
                json!({"document_name": "Contrat", "text": "Un texte suffisamment long."}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_analyze_text_round_trip() {
        let app = test_app(ANALYSIS_RESPONSE).await;
        let response = app
            .clone()
            .oneshot(post_json(
                "/api/analyze",
                Some("user-1"),
                json!({"document_name": "Contrat", "text": "Ce contrat est partiellement anglais."}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["analysis"]["compliance_score"], json!(58));
        let id = body["analysis"]["id"].as_str().unwrap().to_string();

        // The persisted analysis is fetchable by its owner.
        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/api/analyses/{id}"))
                    .header("x-user-id", "user-1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_analyze_with_both_text_and_file_is_bad_request() {
        let app = test_app(ANALYSIS_RESPONSE).await;
        let response = app
            .oneshot(post_json(
                "/api/analyze",
                Some("user-1"),
                json!({
                    "document_name": "Contrat",
                    "text": "Un texte suffisamment long.",
                    "file_base64": "JVBERi0=",
                    "mime_type": "application/pdf"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_quota_exhaustion_maps_to_payment_required() {
        let app = test_app(ANALYSIS_RESPONSE).await;
        for _ in 0..3 {
            let response = app
                .clone()
                .oneshot(post_json(
                    "/api/analyze",
                    Some("user-1"),
                    json!({"document_name": "Contrat", "text": "Un texte suffisamment long."}),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
        let response = app
            .oneshot(post_json(
                "/api/analyze",
                Some("user-1"),
                json!({"document_name": "Contrat", "text": "Un texte suffisamment long."}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    }

    #[tokio::test]
    async fn test_usage_reflects_completed_analyses() {
        let app = test_app(ANALYSIS_RESPONSE).await;
        app.clone()
            .oneshot(post_json(
                "/api/analyze",
                Some("user-1"),
                json!({"document_name": "Contrat", "text": "Un texte suffisamment long."}),
            ))
            .await
            .unwrap();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/usage")
                    .header("x-user-id", "user-1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["used"], json!(1));
        assert_eq!(body["limit"], json!(3));
    }

    #[tokio::test]
    async fn test_signage_round_trip() {
        let app = test_app(
            r#"{"score": 35, "problems": ["English dominant"], "suggestions": [],
                "correctedDescription": "Enseigne conforme"}"#,
        )
        .await;
        let response = app
            .oneshot(post_json(
                "/api/analyze/signage",
                Some("user-1"),
                json!({"description": "Grande enseigne OPEN avec ouvert en petit."}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["report"]["score"], json!(35));
    }
}
