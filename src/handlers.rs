// src/handlers.rs
use crate::report::baumann_code;
use crate::services::SkinAnalyzer;
use crate::{AppState, errors::FondayError, models::*};
use actix_web::{HttpResponse, web};
use log::{info, warn};

pub async fn analyze_skin(
    body: web::Json<AnalysisRequest>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, FondayError> {
    let request = body.into_inner();

    info!(
        "analysis request received (survey attached: {})",
        request.survey_data.is_some()
    );

    let report = data.gemini.analyze(&request).await?;

    info!(
        "analysis complete (type {})",
        baumann_code(&report, request.survey_data.as_ref())
    );

    Ok(HttpResponse::Ok().json(report))
}

pub async fn join_waitlist(
    body: web::Json<WaitlistSignup>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, FondayError> {
    let signup = body.into_inner();

    if signup.email.trim().is_empty() {
        return Err(FondayError::Validation("email is required".to_string()));
    }

    let Some(url) = data.config.waitlist_url.as_deref() else {
        // No forwarder configured: accept and log so signups are not
        // silently dropped.
        info!("waitlist signup accepted locally: {}", signup.email);
        return Ok(HttpResponse::Ok().json(serde_json::json!({ "ok": true })));
    };

    let response = data
        .http_client
        .post(url)
        .json(&signup)
        .send()
        .await
        .map_err(|e| FondayError::ServiceUnavailable(format!("waitlist forward failed: {}", e)))?;

    if !response.status().is_success() {
        warn!("waitlist forward rejected with {}", response.status());
        return Err(FondayError::ServiceUnavailable(
            "waitlist forward rejected".to_string(),
        ));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({ "ok": true })))
}
