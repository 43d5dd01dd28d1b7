use std::env;

/// Runtime configuration, read from the environment once at startup.
///
/// The similarity floor and the two blend weights are empirical constants
/// carried over from the original scoring rules; the defaults must stay
/// exactly as they are for compatibility.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub dataset_path: String,
    pub feedback_log_path: String,
    pub similarity_floor: f64,
    pub match_weight: f64,
    pub difficulty_weight: f64,
    pub forest_trees: usize,
    pub forest_seed: u64,
}

impl Config {
    pub fn load() -> Self {
        Config {
            port: env_parse("PORT", 7860),
            dataset_path: env::var("DATASET_PATH")
                .unwrap_or_else(|_| "university_admission_requirements.csv".to_string()),
            feedback_log_path: env::var("FEEDBACK_LOG_PATH")
                .unwrap_or_else(|_| "feedback_log.txt".to_string()),
            similarity_floor: env_parse("SIMILARITY_FLOOR", 0.05),
            match_weight: env_parse("MATCH_WEIGHT", 0.7),
            difficulty_weight: env_parse("DIFFICULTY_WEIGHT", 0.3),
            forest_trees: env_parse("FOREST_TREES", 200),
            forest_seed: env_parse("FOREST_SEED", 42),
        }
    }
}

fn env_parse<T: std::str::FromStr + Copy>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
