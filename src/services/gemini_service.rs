// src/services/gemini_service.rs
use crate::config::Config;
use crate::errors::FondayError;
use crate::models::*;
use crate::services::{ImageProcessor, SkinAnalyzer};
use async_trait::async_trait;
use log::{error, info};
use reqwest::Client;
use serde_json::json;
use std::collections::HashMap;

/// Gateway to the Gemini multimodal model. Stateless: one scan attempt is
/// one `generateContent` call, never retried here.
pub struct GeminiService {
    api_key: Option<String>,
    model: String,
    demo_mode: bool,
    client: Client,
    image_processor: ImageProcessor,
}

impl GeminiService {
    pub fn new(config: &Config) -> Result<Self, FondayError> {
        let client = Client::builder()
            .timeout(config.scan_timeout)
            .build()
            .map_err(|e| FondayError::ServiceUnavailable(format!("http client: {}", e)))?;

        Ok(Self {
            api_key: config.google_api_key.clone(),
            model: config.gemini_model.clone(),
            demo_mode: config.demo_mode,
            client,
            image_processor: ImageProcessor::new(),
        })
    }
}

#[async_trait]
impl SkinAnalyzer for GeminiService {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisReport, FondayError> {
        if request.image.trim().is_empty() {
            return Err(FondayError::MissingImage);
        }

        let base64_payload = strip_data_uri(&request.image);

        let Some(api_key) = self.api_key.as_deref() else {
            if self.demo_mode {
                info!("GOOGLE_API_KEY not set, demo mode answers with a simulated report");
                return Ok(simulated_report(request.survey_data.as_ref()));
            }
            return Err(FondayError::ServiceUnavailable(
                "GOOGLE_API_KEY is not configured".to_string(),
            ));
        };

        let (payload, mime_type) = self.image_processor.prepare_inline(base64_payload);
        let prompt = build_prompt(request.survey_data.as_ref());

        info!("starting skin analysis via {}", self.model);

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.model
        );
        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&json!({
                "contents": [{
                    "parts": [
                        { "text": prompt },
                        { "inline_data": { "mime_type": mime_type, "data": payload } }
                    ]
                }],
                "safetySettings": [
                    { "category": "HARM_CATEGORY_HARASSMENT", "threshold": "BLOCK_NONE" },
                    { "category": "HARM_CATEGORY_HATE_SPEECH", "threshold": "BLOCK_NONE" },
                    { "category": "HARM_CATEGORY_SEXUALLY_EXPLICIT", "threshold": "BLOCK_NONE" },
                    { "category": "HARM_CATEGORY_DANGEROUS_CONTENT", "threshold": "BLOCK_NONE" }
                ]
            }))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FondayError::ServiceUnavailable("model call timed out".to_string())
                } else {
                    FondayError::ServiceUnavailable(format!("model request failed: {}", e))
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let body = response.text().await.unwrap_or_default();
            error!("Gemini quota exhausted: {}", body);
            return Err(FondayError::UpstreamRejected("quota exhausted".to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Gemini error {}: {}", status, body);
            return Err(FondayError::ServiceUnavailable(format!(
                "model returned {}",
                status
            )));
        }

        let result: serde_json::Value = response.json().await.map_err(|e| {
            FondayError::MalformedResponse(format!("unreadable model response: {}", e))
        })?;

        if let Some(reason) = result["promptFeedback"]["blockReason"].as_str() {
            error!("Gemini blocked the request: {}", reason);
            return Err(FondayError::UpstreamRejected(format!("blocked: {}", reason)));
        }

        let candidate = &result["candidates"][0];
        if candidate["finishReason"].as_str() == Some("SAFETY") {
            error!("Gemini stopped on the safety filter");
            return Err(FondayError::UpstreamRejected("safety filter".to_string()));
        }

        let text = candidate["content"]["parts"][0]["text"]
            .as_str()
            .ok_or_else(|| {
                FondayError::MalformedResponse("no text in model response".to_string())
            })?;

        info!("model reply received ({} chars)", text.len());

        let json_str = extract_json_object(text).ok_or_else(|| {
            error!("no JSON object in model output: {}", text);
            FondayError::MalformedResponse("no JSON object in model output".to_string())
        })?;

        let value: serde_json::Value = serde_json::from_str(&json_str).map_err(|e| {
            error!("model output failed to parse ({}): {}", e, text);
            FondayError::MalformedResponse("model output is not valid JSON".to_string())
        })?;

        validate_report(&value).map_err(|e| {
            error!("model output failed validation ({}): {}", e, text);
            e
        })
    }
}

/// Strips a leading data-URI scheme from a base64 image string. Splits on
/// the first comma; a string without one is returned unchanged, which makes
/// the operation idempotent.
pub fn strip_data_uri(image: &str) -> &str {
    match image.split_once(',') {
        Some((_, payload)) => payload,
        None => image,
    }
}

/// Pulls the JSON object out of free-form model text: best-effort fence
/// cleanup, then the substring from the first `{` to the last `}` inclusive.
/// `None` when either brace is absent.
pub fn extract_json_object(text: &str) -> Option<String> {
    let cleaned = text.replace("```json", "").replace("```", "");
    let start = cleaned.find('{')?;
    let end = cleaned.rfind('}')?;
    if end < start {
        return None;
    }
    Some(cleaned[start..=end].to_string())
}

/// Checks the parsed model output against the report contract: exactly one
/// integer score in [0,100] per fixed label. Violations are rejected, never
/// coerced. Hotspots are parsed leniently and capped at 10, the comment
/// defaults to empty.
pub fn validate_report(value: &serde_json::Value) -> Result<AnalysisReport, FondayError> {
    let items = value["scores"]
        .as_array()
        .ok_or_else(|| FondayError::InvalidPayload("scores is missing or not a list".to_string()))?;
    if items.is_empty() {
        return Err(FondayError::InvalidPayload("scores is empty".to_string()));
    }

    let mut by_label: HashMap<ScoreLabel, u8> = HashMap::new();
    for item in items {
        let label: ScoreLabel = serde_json::from_value(item["label"].clone()).map_err(|_| {
            FondayError::InvalidPayload(format!("unknown score label: {}", item["label"]))
        })?;
        let score = integer_score(&item["score"]).ok_or_else(|| {
            FondayError::InvalidPayload(format!("score for {:?} is not an integer in 0..=100", label))
        })?;
        if by_label.insert(label, score).is_some() {
            return Err(FondayError::InvalidPayload(format!(
                "duplicate score label: {:?}",
                label
            )));
        }
    }

    let scores = ScoreLabel::ALL
        .iter()
        .map(|&label| {
            by_label
                .get(&label)
                .map(|&score| ScoreItem { label, score })
                .ok_or_else(|| {
                    FondayError::InvalidPayload(format!("missing score label: {:?}", label))
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(AnalysisReport {
        scores,
        hotspots: parse_hotspots(&value["hotspots"]),
        ai_comment: value["aiComment"].as_str().unwrap_or_default().to_string(),
    })
}

fn integer_score(value: &serde_json::Value) -> Option<u8> {
    let n = value
        .as_i64()
        .or_else(|| value.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))?;
    (0..=100).contains(&n).then_some(n as u8)
}

fn parse_hotspots(value: &serde_json::Value) -> Vec<Hotspot> {
    value
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|h| {
                    let x = h["x"].as_f64()? as f32;
                    let y = h["y"].as_f64()? as f32;
                    if !(0.0..=100.0).contains(&x) || !(0.0..=100.0).contains(&y) {
                        return None;
                    }
                    Some(Hotspot {
                        x,
                        y,
                        kind: h["type"].as_str().unwrap_or("트러블").to_string(),
                    })
                })
                .take(10)
                .collect()
        })
        .unwrap_or_default()
}

fn build_prompt(survey: Option<&SurveyData>) -> String {
    let survey_json = survey
        .and_then(|s| serde_json::to_string(s).ok())
        .unwrap_or_else(|| "null".to_string());

    format!(
        r#"당신은 전문 피부과 전문의이자 AI 피부 분석가입니다.
제공된 피부 사진과 설문 정보({survey_json})를 바탕으로 다음 8가지 항목을 0~100점 사이로 분석해 주세요.
또한, 사진에서 트러블, 잡티, 주름 등 개선이 필요한 주요 지점의 좌표(x, y)를 최대 10개까지 찾아주세요.
좌표는 이미지 왼쪽 상단을 (0,0), 오른쪽 하단을 (100,100)으로 하는 상대적 백분율 값이어야 합니다.
결과는 반드시 순수한 JSON 형식으로만 응답해 주세요. 다른 설명은 생략하세요.

항목:
1. 종합 컨디션, 2. 수분 밸런스, 3. 붉은기 수준, 4. 모공 상태, 5. 주름 및 탄력, 6. 잡티/색소침착, 7. 트러블 위험, 8. 다크서클

응답 JSON 구조 예시:
{{
  "scores": [{{"label": "종합 컨디션", "score": 85}}, ...],
  "hotspots": [{{"x": 45.2, "y": 30.5, "type": "트러블"}}],
  "aiComment": "분석 결과 요약"
}}"#
    )
}

/// Demo-mode stand-in: the score sheet the product shipped before the model
/// was wired up, derived from the survey answers alone. Deterministic, same
/// survey always gives the same report.
pub fn simulated_report(survey: Option<&SurveyData>) -> AnalysisReport {
    let has = |concern: Concern| survey.map(|s| s.has_concern(concern)).unwrap_or(false);
    let teens = survey.map(|s| s.age.is_teens()).unwrap_or(false);
    let aged = survey.map(|s| s.age.is_over_forty()).unwrap_or(false);

    let score = |label: ScoreLabel| -> u8 {
        match label {
            ScoreLabel::OverallCondition => 68,
            ScoreLabel::HydrationBalance => {
                if has(Concern::Dryness) { 35 } else { 58 }
            }
            ScoreLabel::Redness => {
                if has(Concern::TroubleSensitivity) { 78 } else { 42 }
            }
            ScoreLabel::PoreCondition => {
                if has(Concern::PoresSebum) { 45 } else { 65 }
            }
            ScoreLabel::WrinklesElasticity => {
                if aged || has(Concern::WrinklesElasticity) { 52 } else { 78 }
            }
            ScoreLabel::Pigmentation => {
                if has(Concern::Pigmentation) { 48 } else { 72 }
            }
            ScoreLabel::TroubleRisk => {
                if teens || has(Concern::TroubleSensitivity) { 72 } else { 28 }
            }
            ScoreLabel::DarkCircles => {
                if has(Concern::DarkCircles) { 42 } else { 68 }
            }
        }
    };

    AnalysisReport {
        scores: ScoreLabel::ALL
            .iter()
            .map(|&label| ScoreItem { label, score: score(label) })
            .collect(),
        hotspots: Vec::new(),
        ai_comment: "설문 정보를 기반으로 구성된 데모 리포트입니다.".to_string(),
    }
}
