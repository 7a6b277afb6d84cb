// src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "여성")]
    Female,
    #[serde(rename = "남성")]
    Male,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgeBand {
    #[serde(rename = "10대")]
    Teens,
    #[serde(rename = "20대 초반")]
    EarlyTwenties,
    #[serde(rename = "20대 후반")]
    LateTwenties,
    #[serde(rename = "30대 초반")]
    EarlyThirties,
    #[serde(rename = "30대 후반")]
    LateThirties,
    #[serde(rename = "40대 초반")]
    EarlyForties,
    #[serde(rename = "40대 후반")]
    LateForties,
    #[serde(rename = "50대+")]
    FiftyPlus,
}

impl AgeBand {
    pub fn is_teens(self) -> bool {
        self == AgeBand::Teens
    }

    pub fn is_over_forty(self) -> bool {
        matches!(
            self,
            AgeBand::EarlyForties | AgeBand::LateForties | AgeBand::FiftyPlus
        )
    }
}

/// Fixed six-tag vocabulary for the survey's multi-select concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Concern {
    #[serde(rename = "모공/피지")]
    PoresSebum,
    #[serde(rename = "주름/탄력")]
    WrinklesElasticity,
    #[serde(rename = "트러블/민감")]
    TroubleSensitivity,
    #[serde(rename = "기미/잡티")]
    Pigmentation,
    #[serde(rename = "다크서클")]
    DarkCircles,
    #[serde(rename = "건조함")]
    Dryness,
}

/// What was on the skin when the photo was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureCondition {
    #[serde(rename = "맨얼굴")]
    BareFace,
    #[serde(rename = "기초 케어")]
    BasicCare,
    #[serde(rename = "풀 메이크업")]
    FullMakeup,
}

/// Answers collected before the analysis. Constructed once at submission,
/// immutable afterwards. Absence of a survey is a valid state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyData {
    pub gender: Gender,
    pub age: AgeBand,
    pub skin_type: String,
    #[serde(default, deserialize_with = "dedup_concerns")]
    pub concerns: Vec<Concern>,
    pub condition: CaptureCondition,
}

impl SurveyData {
    pub fn has_concern(&self, concern: Concern) -> bool {
        self.concerns.contains(&concern)
    }
}

// Duplicate tags are dropped on intake, first occurrence wins.
fn dedup_concerns<'de, D>(deserializer: D) -> Result<Vec<Concern>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<Concern>::deserialize(deserializer)?;
    let mut concerns = Vec::with_capacity(raw.len());
    for concern in raw {
        if !concerns.contains(&concern) {
            concerns.push(concern);
        }
    }
    Ok(concerns)
}

/// One scan attempt's payload: the captured photo as base64 (an optional
/// data-URI prefix is stripped by the gateway) plus any survey answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub image: String,
    #[serde(default)]
    pub survey_data: Option<SurveyData>,
}

/// The eight scored categories, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScoreLabel {
    #[serde(rename = "종합 컨디션")]
    OverallCondition,
    #[serde(rename = "수분 밸런스")]
    HydrationBalance,
    #[serde(rename = "붉은기 수준")]
    Redness,
    #[serde(rename = "모공 상태")]
    PoreCondition,
    #[serde(rename = "주름 및 탄력")]
    WrinklesElasticity,
    #[serde(rename = "잡티/색소침착")]
    Pigmentation,
    #[serde(rename = "트러블 위험")]
    TroubleRisk,
    #[serde(rename = "다크서클")]
    DarkCircles,
}

impl ScoreLabel {
    pub const ALL: [ScoreLabel; 8] = [
        ScoreLabel::OverallCondition,
        ScoreLabel::HydrationBalance,
        ScoreLabel::Redness,
        ScoreLabel::PoreCondition,
        ScoreLabel::WrinklesElasticity,
        ScoreLabel::Pigmentation,
        ScoreLabel::TroubleRisk,
        ScoreLabel::DarkCircles,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreItem {
    pub label: ScoreLabel,
    pub score: u8,
}

/// Image-relative marker for a localized concern. Coordinates are
/// percentages with the origin at the top-left corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hotspot {
    pub x: f32,
    pub y: f32,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub scores: Vec<ScoreItem>,
    #[serde(default)]
    pub hotspots: Vec<Hotspot>,
    #[serde(default)]
    pub ai_comment: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthProvider {
    Google,
    Kakao,
}

impl OAuthProvider {
    pub fn tag(self) -> &'static str {
        match self {
            OAuthProvider::Google => "google",
            OAuthProvider::Kakao => "kakao",
        }
    }
}

/// Normalized profile fields fetched from the OAuth provider.
#[derive(Debug, Clone)]
pub struct OAuthProfile {
    pub id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub google_id: Option<String>,
    pub kakao_id: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitlistSignup {
    pub email: String,
    #[serde(default)]
    pub survey_data: Option<SurveyData>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn survey_round_trips_korean_vocabulary() {
        let survey: SurveyData = serde_json::from_value(json!({
            "gender": "여성",
            "age": "20대 후반",
            "skinType": "복합성",
            "concerns": ["건조함", "다크서클"],
            "condition": "맨얼굴"
        }))
        .unwrap();

        assert_eq!(survey.gender, Gender::Female);
        assert_eq!(survey.age, AgeBand::LateTwenties);
        assert_eq!(survey.concerns, vec![Concern::Dryness, Concern::DarkCircles]);

        let back = serde_json::to_value(&survey).unwrap();
        assert_eq!(back["age"], "20대 후반");
        assert_eq!(back["concerns"][0], "건조함");
    }

    #[test]
    fn duplicate_concerns_collapse_on_intake() {
        let survey: SurveyData = serde_json::from_value(json!({
            "gender": "남성",
            "age": "10대",
            "skinType": "지성",
            "concerns": ["모공/피지", "모공/피지", "건조함", "모공/피지"],
            "condition": "기초 케어"
        }))
        .unwrap();

        assert_eq!(survey.concerns, vec![Concern::PoresSebum, Concern::Dryness]);
    }

    #[test]
    fn unknown_concern_tag_is_rejected() {
        let result = serde_json::from_value::<SurveyData>(json!({
            "gender": "여성",
            "age": "10대",
            "skinType": "지성",
            "concerns": ["존재하지 않는 태그"],
            "condition": "맨얼굴"
        }));

        assert!(result.is_err());
    }

    #[test]
    fn report_defaults_optional_fields() {
        let report: AnalysisReport = serde_json::from_value(json!({
            "scores": [{"label": "종합 컨디션", "score": 80}]
        }))
        .unwrap();

        assert!(report.hotspots.is_empty());
        assert!(report.ai_comment.is_empty());
        assert_eq!(report.scores[0].label, ScoreLabel::OverallCondition);
        assert_eq!(report.scores[0].score, 80);
    }

    #[test]
    fn report_serializes_wire_field_names() {
        let report = AnalysisReport {
            scores: vec![ScoreItem {
                label: ScoreLabel::TroubleRisk,
                score: 28,
            }],
            hotspots: vec![Hotspot {
                x: 45.2,
                y: 30.5,
                kind: "트러블".to_string(),
            }],
            ai_comment: "요약".to_string(),
        };

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["scores"][0]["label"], "트러블 위험");
        assert_eq!(value["hotspots"][0]["type"], "트러블");
        assert_eq!(value["aiComment"], "요약");
    }

    #[test]
    fn age_band_buckets() {
        assert!(AgeBand::Teens.is_teens());
        assert!(!AgeBand::LateThirties.is_over_forty());
        assert!(AgeBand::EarlyForties.is_over_forty());
        assert!(AgeBand::FiftyPlus.is_over_forty());
    }
}
