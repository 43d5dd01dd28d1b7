use crate::{
    catalog::Catalog,
    config::Config,
    difficulty::DifficultyModel,
    error::AppError,
    feedback::FeedbackLog,
    forest::ForestParams,
    scoring,
    similarity::SimilarityIndex,
    types::*,
};
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

/// Process-wide context: catalog, trained difficulty model and fitted
/// similarity index, built once at startup. Everything except the feedback
/// log is immutable, so any number of requests may read concurrently.
pub struct AdmitEngine {
    config: Config,
    catalog: Catalog,
    difficulty: DifficultyModel,
    similarity: SimilarityIndex,
    feedback: FeedbackLog,
}

impl AdmitEngine {
    /// Build phase, strictly sequential: catalog load, label derivation,
    /// model fit, similarity fit. Any failure here aborts startup.
    pub async fn new(config: Config) -> Result<Self, AppError> {
        info!("Initializing AdmitGuide engine...");

        let catalog = Catalog::load(Path::new(&config.dataset_path))?;

        let params = ForestParams {
            n_trees: config.forest_trees,
            seed: config.forest_seed,
            ..Default::default()
        };
        let difficulty = DifficultyModel::fit(&catalog, &params)?;
        let similarity = SimilarityIndex::fit(&catalog);
        let feedback = FeedbackLog::open(Path::new(&config.feedback_log_path)).await?;

        info!("AdmitGuide engine initialized successfully");
        Ok(Self {
            config,
            catalog,
            difficulty,
            similarity,
            feedback,
        })
    }

    /// Score one student profile against one university. Unknown names come
    /// back as a structured not-found result, never an error.
    pub async fn evaluate_admission(
        &self,
        request: EvaluateRequest,
    ) -> Result<EvaluateResponse, AppError> {
        let profile = StudentProfile {
            gre: request.gre,
            toefl: request.toefl,
            ielts: request.ielts,
            cgpa: request.cgpa,
        };
        if !profile.is_valid() {
            return Err(AppError::InvalidInput(
                "Student scores must be positive finite numbers".to_string(),
            ));
        }

        let Some(record) = self.catalog.find(&request.university) else {
            debug!("University not found: {}", request.university);
            return Ok(EvaluateResponse::not_found());
        };

        let match_count = scoring::match_count(&profile, record);
        let difficulty_probability = self.difficulty.predict_easier(record);
        let score = scoring::admission_score(
            match_count,
            difficulty_probability,
            self.config.match_weight,
            self.config.difficulty_weight,
        );

        // The original form lets students attach feedback to a prediction.
        if let Some(text) = &request.feedback {
            self.record_feedback(text).await?;
        }

        info!(
            "Evaluated {} -> {:.2}% (match {}/4, difficulty {:.2}%)",
            record.name, score.final_pct, score.match_count, score.difficulty_pct
        );

        Ok(EvaluateResponse {
            status: EvaluateStatus::Found,
            decision_id: Uuid::new_v4(),
            university: Some(record.name.clone()),
            final_probability_pct: Some(score.final_pct),
            match_count: Some(score.match_count),
            difficulty_pct: Some(score.difficulty_pct),
            message: None,
        })
    }

    /// Rank universities by interest text. Empty input and zero survivors
    /// each get their own explicit status instead of an empty success.
    pub fn search_programs(&self, interest: &str) -> SearchResponse {
        if interest.trim().is_empty() {
            return SearchResponse::empty();
        }

        let hits = self
            .similarity
            .search(interest, self.config.similarity_floor);
        if hits.is_empty() {
            return SearchResponse::no_matches();
        }

        let results = hits
            .into_iter()
            .map(|(row, similarity)| {
                let record = &self.catalog.records()[row];
                ProgramMatch {
                    university: record.name.clone(),
                    location: record.location.clone(),
                    strength_area: record.strength_area.clone(),
                    gre_required: record.gre_required,
                    min_cgpa: record.min_cgpa,
                    acceptance_rate: record.acceptance_rate,
                    rating: record.rating,
                    similarity: scoring::round2(similarity),
                }
            })
            .collect();
        SearchResponse::results(results)
    }

    /// Append feedback to the log; returns whether a line was written.
    pub async fn record_feedback(&self, text: &str) -> Result<bool, AppError> {
        let written = self.feedback.append(text).await?;
        if written {
            metrics::increment_counter!("admitguide_feedback_total");
        }
        Ok(written)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const HEADER: &str = "University,Location (State),Program Strength Area,Average GRE Required,Average TOEFL Required,Average IELTS Required,Minimum CGPA Required,Acceptance Rate (%),University Rating (1-5)";

    async fn fixture_engine() -> (TempDir, AdmitEngine) {
        let dir = TempDir::new().unwrap();
        let dataset_path = dir.path().join("universities.csv");
        let mut file = std::fs::File::create(&dataset_path).unwrap();
        writeln!(file, "{HEADER}").unwrap();
        for row in [
            "MIT,Massachusetts,Machine Learning,320,100,7,3.4,7,5",
            "State College,Ohio,Business Administration,300,85,6,3.0,70,2",
            "Tech Institute,California,Robotics,325,105,7.5,3.6,15,4",
            "Plains University,Kansas,Agriculture,295,80,6,2.8,80,2",
        ] {
            writeln!(file, "{row}").unwrap();
        }
        drop(file);

        let config = Config {
            port: 0,
            dataset_path: dataset_path.to_string_lossy().into_owned(),
            feedback_log_path: dir
                .path()
                .join("feedback_log.txt")
                .to_string_lossy()
                .into_owned(),
            similarity_floor: 0.05,
            match_weight: 0.7,
            difficulty_weight: 0.3,
            forest_trees: 50,
            forest_seed: 42,
        };
        let engine = AdmitEngine::new(config).await.unwrap();
        (dir, engine)
    }

    fn evaluate_request(university: &str) -> EvaluateRequest {
        EvaluateRequest {
            gre: 330.0,
            toefl: 110.0,
            ielts: 8.0,
            cgpa: 3.8,
            university: university.to_string(),
            feedback: None,
        }
    }

    #[tokio::test]
    async fn full_match_blends_seventy_with_difficulty_share() {
        let (_dir, engine) = fixture_engine().await;
        let response = engine
            .evaluate_admission(evaluate_request("MIT"))
            .await
            .unwrap();

        assert_eq!(response.status, EvaluateStatus::Found);
        assert_eq!(response.match_count, Some(4));
        let difficulty_pct = response.difficulty_pct.unwrap();
        let expected = scoring::round2(70.0 + 0.3 * difficulty_pct);
        // Sub-score is rounded independently, so allow for the rounding gap.
        assert!((response.final_probability_pct.unwrap() - expected).abs() <= 0.01);
    }

    #[tokio::test]
    async fn lookup_trims_and_ignores_case() {
        let (_dir, engine) = fixture_engine().await;
        let response = engine
            .evaluate_admission(evaluate_request(" Mit "))
            .await
            .unwrap();
        assert_eq!(response.status, EvaluateStatus::Found);
        assert_eq!(response.university.as_deref(), Some("MIT"));
    }

    #[tokio::test]
    async fn unknown_university_is_not_found() {
        let (_dir, engine) = fixture_engine().await;
        let response = engine
            .evaluate_admission(evaluate_request("Hogwarts"))
            .await
            .unwrap();
        assert_eq!(response.status, EvaluateStatus::NotFound);
        assert!(response.final_probability_pct.is_none());
        assert!(response.message.is_some());
    }

    #[tokio::test]
    async fn every_evaluation_carries_a_decision_id() {
        let (_dir, engine) = fixture_engine().await;
        let found = engine
            .evaluate_admission(evaluate_request("MIT"))
            .await
            .unwrap();
        let not_found = engine
            .evaluate_admission(evaluate_request("Hogwarts"))
            .await
            .unwrap();
        assert_ne!(found.decision_id, not_found.decision_id);
    }

    #[tokio::test]
    async fn invalid_scores_are_rejected_with_guidance() {
        let (_dir, engine) = fixture_engine().await;
        let mut request = evaluate_request("MIT");
        request.gre = f64::NAN;
        let err = engine.evaluate_admission(request).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn evaluate_can_attach_feedback() {
        let (dir, engine) = fixture_engine().await;
        let mut request = evaluate_request("MIT");
        request.feedback = Some("very helpful".to_string());
        engine.evaluate_admission(request).await.unwrap();

        let contents =
            std::fs::read_to_string(dir.path().join("feedback_log.txt")).unwrap();
        assert_eq!(contents, "very helpful\n");
    }

    #[tokio::test]
    async fn search_ranks_matching_program_first() {
        let (_dir, engine) = fixture_engine().await;
        let response = engine.search_programs("machine learning");

        assert_eq!(response.status, SearchStatus::Results);
        let results = response.results.unwrap();
        assert_eq!(results[0].university, "MIT");
    }

    #[tokio::test]
    async fn empty_search_gets_guidance() {
        let (_dir, engine) = fixture_engine().await;
        let response = engine.search_programs("   ");
        assert_eq!(response.status, SearchStatus::Empty);
        assert!(response.message.is_some());
    }

    #[tokio::test]
    async fn unmatched_search_reports_no_matches() {
        let (_dir, engine) = fixture_engine().await;
        let response = engine.search_programs("underwater basket weaving");
        assert_eq!(response.status, SearchStatus::NoMatches);
    }

    #[tokio::test]
    async fn feedback_endpoint_path_appends() {
        let (dir, engine) = fixture_engine().await;
        assert!(engine.record_feedback("more filters please").await.unwrap());
        assert!(!engine.record_feedback("   ").await.unwrap());

        let contents =
            std::fs::read_to_string(dir.path().join("feedback_log.txt")).unwrap();
        assert_eq!(contents, "more filters please\n");
    }
}
