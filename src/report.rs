// src/report.rs
use crate::models::{AnalysisReport, Concern, ScoreLabel, SurveyData};

/// Four-letter Baumann-style skin code derived from the score sheet and the
/// survey answers. Pure presentation: fixed thresholds, same inputs always
/// give the same code, gateway scores are read but never changed.
pub fn baumann_code(report: &AnalysisReport, survey: Option<&SurveyData>) -> String {
    let has = |concern: Concern| survey.map(|s| s.has_concern(concern)).unwrap_or(false);

    let oily = survey.map(|s| s.skin_type == "지성").unwrap_or(false)
        || has(Concern::PoresSebum);
    let sensitive = has(Concern::TroubleSensitivity);
    let pigmented = score_of(report, ScoreLabel::Pigmentation) < 60;
    let wrinkled = score_of(report, ScoreLabel::WrinklesElasticity) < 60;

    format!(
        "{}{}{}{}",
        if oily { 'O' } else { 'D' },
        if sensitive { 'S' } else { 'R' },
        if pigmented { 'P' } else { 'N' },
        if wrinkled { 'W' } else { 'T' },
    )
}

// Validated reports carry all eight labels; a missing one reads as healthy.
fn score_of(report: &AnalysisReport, label: ScoreLabel) -> u8 {
    report
        .scores
        .iter()
        .find(|item| item.label == label)
        .map(|item| item.score)
        .unwrap_or(100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::*;

    fn report_with(pigmentation: u8, wrinkles: u8) -> AnalysisReport {
        AnalysisReport {
            scores: ScoreLabel::ALL
                .iter()
                .map(|&label| ScoreItem {
                    label,
                    score: match label {
                        ScoreLabel::Pigmentation => pigmentation,
                        ScoreLabel::WrinklesElasticity => wrinkles,
                        _ => 70,
                    },
                })
                .collect(),
            hotspots: Vec::new(),
            ai_comment: String::new(),
        }
    }

    fn survey(skin_type: &str, concerns: Vec<Concern>) -> SurveyData {
        SurveyData {
            gender: Gender::Female,
            age: AgeBand::EarlyThirties,
            skin_type: skin_type.to_string(),
            concerns,
            condition: CaptureCondition::BasicCare,
        }
    }

    #[test]
    fn oily_sensitive_pigmented_wrinkled() {
        let survey = survey("지성", vec![Concern::TroubleSensitivity]);
        let code = baumann_code(&report_with(48, 52), Some(&survey));
        assert_eq!(code, "OSPW");
    }

    #[test]
    fn dry_resistant_clear_tight() {
        let survey = survey("건성", vec![]);
        let code = baumann_code(&report_with(72, 78), Some(&survey));
        assert_eq!(code, "DRNT");
    }

    #[test]
    fn pore_concern_alone_reads_as_oily() {
        let survey = survey("복합성", vec![Concern::PoresSebum]);
        let code = baumann_code(&report_with(72, 78), Some(&survey));
        assert!(code.starts_with('O'));
    }

    #[test]
    fn missing_survey_falls_back_to_score_letters_only() {
        let code = baumann_code(&report_with(59, 60), None);
        assert_eq!(code, "DRPT");
    }

    #[test]
    fn derivation_is_deterministic() {
        let survey = survey("지성", vec![Concern::PoresSebum]);
        let report = report_with(50, 50);
        assert_eq!(
            baumann_code(&report, Some(&survey)),
            baumann_code(&report, Some(&survey))
        );
    }
}
