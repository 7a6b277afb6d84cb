// src/flow.rs
use crate::errors::FondayError;
use crate::models::{AnalysisReport, AnalysisRequest, SurveyData};
use crate::services::SkinAnalyzer;
use log::warn;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Progress captions shown while scanning. Purely cosmetic: they advance on
/// their own fixed schedule and never decide when the scanning state ends.
pub const SCAN_CAPTIONS: [&str; 4] = [
    "데이터 보정 중...",
    "모공 및 질감 분석 중...",
    "수분 밸런스 측정 중...",
    "피부 톤 분석 중...",
];

pub const CAPTION_INTERVAL: Duration = Duration::from_millis(800);

pub fn caption_at(elapsed: Duration) -> &'static str {
    let idx = (elapsed.as_millis() / CAPTION_INTERVAL.as_millis()) as usize;
    SCAN_CAPTIONS[idx.min(SCAN_CAPTIONS.len() - 1)]
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScanState {
    Idle,
    Survey { image: String },
    Scanning { request: AnalysisRequest },
    Result { report: AnalysisReport },
}

impl ScanState {
    pub fn name(&self) -> &'static str {
        match self {
            ScanState::Idle => "idle",
            ScanState::Survey { .. } => "survey",
            ScanState::Scanning { .. } => "scanning",
            ScanState::Result { .. } => "result",
        }
    }
}

/// One user session's scan flow: `Idle -> [Survey] -> Scanning -> Result`,
/// with every gateway failure landing back in `Idle`. Owns at most one
/// in-flight analysis; the `&mut self` receiver on [`ScanFlow::scan`] keeps
/// a second one from starting.
pub struct ScanFlow<A: SkinAnalyzer> {
    analyzer: Arc<A>,
    survey_enabled: bool,
    min_scan_duration: Duration,
    state: ScanState,
}

impl<A: SkinAnalyzer> ScanFlow<A> {
    pub fn new(analyzer: Arc<A>, survey_enabled: bool, min_scan_duration: Duration) -> Self {
        Self {
            analyzer,
            survey_enabled,
            min_scan_duration,
            state: ScanState::Idle,
        }
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }

    pub fn report(&self) -> Option<&AnalysisReport> {
        match &self.state {
            ScanState::Result { report } => Some(report),
            _ => None,
        }
    }

    /// The user picked or took a photo. Only acted on from `Idle`; a capture
    /// while a scan is in flight is ignored, the running attempt keeps going.
    pub fn capture(&mut self, image: String) {
        match self.state {
            ScanState::Idle => {
                if self.survey_enabled {
                    self.state = ScanState::Survey { image };
                } else {
                    self.state = ScanState::Scanning {
                        request: AnalysisRequest {
                            image,
                            survey_data: None,
                        },
                    };
                }
            }
            _ => warn!("capture ignored in {} state", self.state.name()),
        }
    }

    /// Survey submission moves to scanning. The multi-select may be empty.
    pub fn submit_survey(&mut self, survey: SurveyData) {
        match std::mem::replace(&mut self.state, ScanState::Idle) {
            ScanState::Survey { image } => {
                self.state = ScanState::Scanning {
                    request: AnalysisRequest {
                        image,
                        survey_data: Some(survey),
                    },
                };
            }
            other => {
                warn!("survey submit ignored in {} state", other.name());
                self.state = other;
            }
        }
    }

    /// Runs the scan attempt entered via capture/survey: exactly one gateway
    /// call, and its completion (not the caption schedule) decides the next
    /// state. Success lands in `Result`, any failure discards the attempt
    /// and returns to `Idle` so the user can retry from capture.
    pub async fn scan(&mut self) -> Result<(), FondayError> {
        let request = match &self.state {
            ScanState::Scanning { request } => request.clone(),
            _ => return Err(FondayError::NotScanning),
        };

        let started = Instant::now();
        let outcome = self.analyzer.analyze(&request).await;

        if let Some(rest) = self.min_scan_duration.checked_sub(started.elapsed()) {
            if !rest.is_zero() {
                tokio::time::sleep(rest).await;
            }
        }

        match outcome {
            Ok(report) => {
                self.state = ScanState::Result { report };
                Ok(())
            }
            Err(e) => {
                warn!("scan attempt failed: {}", e);
                self.state = ScanState::Idle;
                Err(e)
            }
        }
    }

    /// Back out of the survey or clear a finished report. No effect while a
    /// scan is in flight, there is no cancel affordance.
    pub fn restart(&mut self) {
        match self.state {
            ScanState::Survey { .. } | ScanState::Result { .. } => {
                self.state = ScanState::Idle;
            }
            ScanState::Idle => {}
            ScanState::Scanning { .. } => {
                warn!("restart ignored while scanning");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedAnalyzer {
        calls: AtomicUsize,
        outcome: Result<AnalysisReport, FondayError>,
    }

    impl ScriptedAnalyzer {
        fn ok(report: AnalysisReport) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                outcome: Ok(report),
            }
        }

        fn failing(error: FondayError) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                outcome: Err(error),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SkinAnalyzer for ScriptedAnalyzer {
        async fn analyze(&self, _: &AnalysisRequest) -> Result<AnalysisReport, FondayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.outcome {
                Ok(report) => Ok(report.clone()),
                Err(FondayError::ServiceUnavailable(msg)) => {
                    Err(FondayError::ServiceUnavailable(msg.clone()))
                }
                Err(_) => Err(FondayError::MalformedResponse("scripted".to_string())),
            }
        }
    }

    fn report() -> AnalysisReport {
        AnalysisReport {
            scores: ScoreLabel::ALL
                .iter()
                .map(|&label| ScoreItem { label, score: 70 })
                .collect(),
            hotspots: Vec::new(),
            ai_comment: "전반적으로 양호합니다.".to_string(),
        }
    }

    fn survey() -> SurveyData {
        SurveyData {
            gender: Gender::Female,
            age: AgeBand::LateTwenties,
            skin_type: "복합성".to_string(),
            concerns: vec![Concern::Dryness],
            condition: CaptureCondition::BareFace,
        }
    }

    #[tokio::test]
    async fn capture_without_survey_goes_straight_to_result() {
        let analyzer = Arc::new(ScriptedAnalyzer::ok(report()));
        let mut flow = ScanFlow::new(analyzer.clone(), false, Duration::ZERO);

        flow.capture("AAAA".to_string());
        assert_eq!(flow.state().name(), "scanning");

        flow.scan().await.unwrap();

        assert_eq!(flow.state().name(), "result");
        assert_eq!(flow.report().unwrap(), &report());
        assert_eq!(analyzer.call_count(), 1);
    }

    #[tokio::test]
    async fn survey_path_carries_answers_and_keeps_gateway_scores() {
        let analyzer = Arc::new(ScriptedAnalyzer::ok(report()));
        let mut flow = ScanFlow::new(analyzer.clone(), true, Duration::ZERO);

        flow.capture("AAAA".to_string());
        assert_eq!(flow.state().name(), "survey");

        flow.submit_survey(survey());
        match flow.state() {
            ScanState::Scanning { request } => {
                assert_eq!(request.image, "AAAA");
                assert_eq!(request.survey_data, Some(survey()));
            }
            other => panic!("unexpected state {}", other.name()),
        }

        flow.scan().await.unwrap();

        // The stored report is exactly what the gateway returned.
        assert_eq!(flow.report().unwrap(), &report());
    }

    #[tokio::test]
    async fn failure_returns_to_idle_with_no_stale_report() {
        let analyzer = Arc::new(ScriptedAnalyzer::failing(FondayError::ServiceUnavailable(
            "down".to_string(),
        )));
        let mut flow = ScanFlow::new(analyzer.clone(), false, Duration::ZERO);

        flow.capture("AAAA".to_string());
        let result = flow.scan().await;

        assert!(matches!(result, Err(FondayError::ServiceUnavailable(_))));
        assert_eq!(flow.state().name(), "idle");
        assert!(flow.report().is_none());

        // A later capture retries cleanly from scratch.
        flow.capture("BBBB".to_string());
        assert_eq!(flow.state().name(), "scanning");
        assert_eq!(analyzer.call_count(), 1);
    }

    #[tokio::test]
    async fn capture_while_scanning_has_no_network_effect() {
        let analyzer = Arc::new(ScriptedAnalyzer::ok(report()));
        let mut flow = ScanFlow::new(analyzer.clone(), false, Duration::ZERO);

        flow.capture("AAAA".to_string());
        flow.capture("BBBB".to_string());

        match flow.state() {
            ScanState::Scanning { request } => assert_eq!(request.image, "AAAA"),
            other => panic!("unexpected state {}", other.name()),
        }

        flow.scan().await.unwrap();
        assert_eq!(analyzer.call_count(), 1);
    }

    #[tokio::test]
    async fn scan_outside_scanning_state_is_rejected() {
        let analyzer = Arc::new(ScriptedAnalyzer::ok(report()));
        let mut flow = ScanFlow::new(analyzer.clone(), false, Duration::ZERO);

        let result = flow.scan().await;

        assert!(matches!(result, Err(FondayError::NotScanning)));
        assert_eq!(analyzer.call_count(), 0);
    }

    #[tokio::test]
    async fn restart_clears_report_and_survey_context() {
        let analyzer = Arc::new(ScriptedAnalyzer::ok(report()));
        let mut flow = ScanFlow::new(analyzer, true, Duration::ZERO);

        flow.capture("AAAA".to_string());
        flow.submit_survey(survey());
        flow.scan().await.unwrap();
        assert_eq!(flow.state().name(), "result");

        flow.restart();
        assert_eq!(flow.state(), &ScanState::Idle);
        assert!(flow.report().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn minimum_scan_duration_is_honored_without_blocking_completion() {
        let analyzer = Arc::new(ScriptedAnalyzer::ok(report()));
        let mut flow = ScanFlow::new(analyzer, false, Duration::from_millis(3200));

        flow.capture("AAAA".to_string());
        let started = Instant::now();
        flow.scan().await.unwrap();

        assert!(started.elapsed() >= Duration::from_millis(3200));
        assert_eq!(flow.state().name(), "result");
    }

    #[test]
    fn captions_follow_the_fixed_schedule() {
        assert_eq!(caption_at(Duration::ZERO), SCAN_CAPTIONS[0]);
        assert_eq!(caption_at(Duration::from_millis(799)), SCAN_CAPTIONS[0]);
        assert_eq!(caption_at(Duration::from_millis(800)), SCAN_CAPTIONS[1]);
        assert_eq!(caption_at(Duration::from_millis(2400)), SCAN_CAPTIONS[3]);
        // The schedule saturates, it never signals completion.
        assert_eq!(caption_at(Duration::from_secs(60)), SCAN_CAPTIONS[3]);
    }
}
