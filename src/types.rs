use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One row of the university catalog. Immutable after load; `label` is the
/// derived admission label, not a dataset column.
#[derive(Debug, Clone, PartialEq)]
pub struct UniversityRecord {
    pub name: String,
    pub location: String,
    pub strength_area: String,
    pub gre_required: f64,
    pub toefl_required: f64,
    pub ielts_required: f64,
    pub min_cgpa: f64,
    pub acceptance_rate: f64,
    pub rating: f64,
    pub label: u8,
}

impl UniversityRecord {
    /// Text used by the similarity index, one description per record.
    pub fn program_description(&self) -> String {
        format!(
            "{} | Program Area: {} | Location: {}",
            self.name, self.strength_area, self.location
        )
    }
}

/// Per-request student scores. Created and discarded per request.
#[derive(Debug, Clone, Copy)]
pub struct StudentProfile {
    pub gre: f64,
    pub toefl: f64,
    pub ielts: f64,
    pub cgpa: f64,
}

impl StudentProfile {
    pub fn is_valid(&self) -> bool {
        [self.gre, self.toefl, self.ielts, self.cgpa]
            .iter()
            .all(|v| v.is_finite() && *v > 0.0)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvaluateRequest {
    pub gre: f64,
    pub toefl: f64,
    pub ielts: f64,
    pub cgpa: f64,
    pub university: String,
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluateStatus {
    Found,
    NotFound,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluateResponse {
    pub status: EvaluateStatus,
    pub decision_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub university: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_probability_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_count: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl EvaluateResponse {
    pub fn not_found() -> Self {
        Self {
            status: EvaluateStatus::NotFound,
            decision_id: Uuid::new_v4(),
            university: None,
            final_probability_pct: None,
            match_count: None,
            difficulty_pct: None,
            message: Some(
                "University not found in dataset. Enter the exact university name as in the dataset."
                    .to_string(),
            ),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    pub interest: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    Results,
    NoMatches,
    Empty,
}

/// One ranked hit from the similarity index, carrying the catalog columns
/// shown to the student.
#[derive(Debug, Clone, Serialize)]
pub struct ProgramMatch {
    pub university: String,
    pub location: String,
    pub strength_area: String,
    pub gre_required: f64,
    pub min_cgpa: f64,
    pub acceptance_rate: f64,
    pub rating: f64,
    pub similarity: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub status: SearchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<ProgramMatch>>,
}

impl SearchResponse {
    pub fn empty() -> Self {
        Self {
            status: SearchStatus::Empty,
            message: Some(
                "Please enter at least one keyword describing your interests.".to_string(),
            ),
            results: None,
        }
    }

    pub fn no_matches() -> Self {
        Self {
            status: SearchStatus::NoMatches,
            message: Some("No universities matched your interest.".to_string()),
            results: None,
        }
    }

    pub fn results(results: Vec<ProgramMatch>) -> Self {
        Self {
            status: SearchStatus::Results,
            message: None,
            results: Some(results),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackRequest {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedbackResponse {
    pub success: bool,
    pub message: String,
}
