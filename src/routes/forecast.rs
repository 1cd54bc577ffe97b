// src/routes/forecast.rs
//! Pass-through to the fuel demand forecasting service.
//!
//! The service is a black box: it takes a `mode` and an optional PDF sales
//! report as `multipart/form-data` and answers with JSON. This module only
//! validates the request, forwards it to `ML_SERVICE_URL/forecast`, and
//! relays the JSON body unchanged. Any transport failure, non-success status
//! or non-JSON reply becomes `502 Bad Gateway`.

use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    routing::post,
    Json, Router,
};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use sqlx::PgPool;
use tracing::{debug, info};

use crate::{AppError, AppResult, Config, ForecastMode, ReportUpload};

// ---

/// Sales reports are scanned PDFs; allow more than axum's 2 MB default.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn router() -> Router<(PgPool, Config)> {
    // ---
    Router::new()
        .route("/forecast", post(handler))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

async fn handler(
    State((_pool, config)): State<(PgPool, Config)>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<Value>> {
    // ---
    let mut multipart = multipart?;
    let mut mode = None;
    let mut report = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "mode" => mode = Some(field.text().await?),
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content = field.bytes().await?;
                // An empty file input is sent as a nameless, zero-length part
                if !(file_name.is_empty() && content.is_empty()) {
                    report = Some(ReportUpload { file_name, content });
                }
            }
            other => debug!("POST /forecast - ignoring field {:?}", other),
        }
    }

    let mode = mode.as_deref().and_then(ForecastMode::parse).ok_or_else(|| {
        AppError::Validation("mode must be weekly, monthly, or annual".to_string())
    })?;

    if let Some(report) = &report {
        if !report.is_pdf() {
            return Err(AppError::Validation("Only PDF files are allowed".to_string()));
        }
    }

    info!(
        mode = mode.as_str(),
        report = report.as_ref().map(|r| r.file_name.as_str()),
        "Requesting forecast"
    );
    let forecast = request_forecast(&config.ml_service_url, mode, report).await?;
    Ok(Json(forecast))
}

// ---

/// POST the forecast request to the external service and return its JSON reply.
async fn request_forecast(
    base_url: &str,
    mode: ForecastMode,
    report: Option<ReportUpload>,
) -> AppResult<Value> {
    // ---
    let upstream = |e: reqwest::Error| AppError::Upstream(e.to_string());

    let mut form = Form::new().text("mode", mode.as_str());
    if let Some(report) = report {
        let part = Part::bytes(report.content.to_vec())
            .file_name(report.file_name)
            .mime_str("application/pdf")
            .map_err(upstream)?;
        form = form.part("file", part);
    }

    let url = format!("{}/forecast", base_url);
    debug!("Forwarding forecast request to {}", url);

    let client = reqwest::Client::new();
    let response = client
        .post(&url)
        .multipart(form)
        .send()
        .await
        .map_err(upstream)?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::Upstream(format!("{} answered {}: {}", url, status, body)));
    }

    response.json::<Value>().await.map_err(upstream)
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use axum::{
        body::{Body, Bytes},
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use crate::routes::tests::{json_body, test_app};

    const BOUNDARY: &str = "fuelwatch-form-boundary";

    /// Nothing listens on the discard port.
    const UNREACHABLE: &str = "http://127.0.0.1:9";

    enum FormPart<'a> {
        Text(&'a str, &'a str),
        File(&'a str, &'a str),
    }

    fn form_body(parts: &[FormPart<'_>]) -> Body {
        // ---
        let mut body = String::new();
        for part in parts {
            body.push_str(&format!("--{BOUNDARY}\r\n"));
            match part {
                FormPart::Text(name, value) => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )),
                FormPart::File(file_name, content) => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n{content}\r\n"
                )),
            }
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));
        Body::from(body)
    }

    async fn post_form(ml_service_url: &str, parts: &[FormPart<'_>]) -> (StatusCode, Value) {
        // ---
        let request = Request::builder()
            .method("POST")
            .uri("/forecast")
            .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(form_body(parts))
            .unwrap();
        let response = test_app(ml_service_url).oneshot(request).await.unwrap();
        let status = response.status();
        (status, json_body(response).await)
    }

    /// Stand-in forecasting service answering every `POST /forecast` the same way.
    async fn spawn_upstream(status: StatusCode, reply: &'static str) -> String {
        // ---
        let app: Router = Router::new().route(
            "/forecast",
            post(move |_form: Bytes| async move { (status, reply) }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_non_multipart_request_is_json_400() {
        // ---
        let request = Request::builder()
            .method("POST")
            .uri("/forecast")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"mode":"weekly"}"#))
            .unwrap();
        let response = test_app(UNREACHABLE).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn test_missing_mode_is_rejected() {
        // ---
        let (status, body) = post_form(UNREACHABLE, &[FormPart::Text("note", "x")]).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "mode must be weekly, monthly, or annual");
    }

    #[tokio::test]
    async fn test_unknown_mode_is_rejected() {
        // ---
        let (status, body) = post_form(UNREACHABLE, &[FormPart::Text("mode", "daily")]).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "mode must be weekly, monthly, or annual");
    }

    #[tokio::test]
    async fn test_non_pdf_report_is_rejected() {
        // ---
        let parts = [
            FormPart::Text("mode", "weekly"),
            FormPart::File("sales.csv", "date,litres\n2024-01-01,120\n"),
        ];
        let (status, body) = post_form(UNREACHABLE, &parts).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Only PDF files are allowed");
    }

    #[tokio::test]
    async fn test_unreachable_service_is_bad_gateway() {
        // ---
        let (status, body) = post_form(UNREACHABLE, &[FormPart::Text("mode", "monthly")]).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["message"], "Forecast service unavailable");
    }

    #[tokio::test]
    async fn test_failing_service_is_bad_gateway() {
        // ---
        let upstream = spawn_upstream(StatusCode::INTERNAL_SERVER_ERROR, "model crashed").await;
        let (status, _) = post_form(&upstream, &[FormPart::Text("mode", "annual")]).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);

        let upstream = spawn_upstream(StatusCode::OK, "not json").await;
        let (status, _) = post_form(&upstream, &[FormPart::Text("mode", "annual")]).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_forecast_is_relayed_unchanged() {
        // ---
        let reply = r#"{"mode":"weekly","forecast":[120.5,98.0,143.25]}"#;
        let upstream = spawn_upstream(StatusCode::OK, reply).await;
        let parts = [
            FormPart::Text("mode", "Weekly"),
            FormPart::File("sales-march.PDF", "%PDF-1.4 stub"),
        ];
        let (status, body) = post_form(&upstream, &parts).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::from_str::<Value>(reply).unwrap());
    }
}
