// src/services/mod.rs
use crate::errors::FondayError;
use crate::models::{AnalysisReport, AnalysisRequest};
use async_trait::async_trait;

pub mod gemini_service;
pub mod image_processor;
pub mod user_store;

pub use gemini_service::GeminiService;
pub use image_processor::ImageProcessor;
pub use user_store::UserStore;

/// Capability seam between the scan flow and the model gateway. The flow
/// controller only sees this trait, so a scripted analyzer can stand in for
/// the real service in tests.
#[async_trait]
pub trait SkinAnalyzer: Send + Sync {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisReport, FondayError>;
}
