use crate::types::{StudentProfile, UniversityRecord};

/// Final percentage plus the explanatory sub-scores.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdmissionScore {
    pub match_count: u8,
    pub difficulty_pct: f64,
    pub final_pct: f64,
}

/// Count how many of the four published thresholds the student meets or
/// exceeds. Non-strict comparison, no partial credit.
pub fn match_count(profile: &StudentProfile, university: &UniversityRecord) -> u8 {
    let checks = [
        (profile.gre, university.gre_required),
        (profile.toefl, university.toefl_required),
        (profile.ielts, university.ielts_required),
        (profile.cgpa, university.min_cgpa),
    ];
    checks.iter().filter(|(student, required)| student >= required).count() as u8
}

/// Blend the requirement match (dominant signal) with the learned difficulty
/// probability: `((m / 4) * match_weight + d * difficulty_weight) * 100`,
/// rounded to two decimals.
pub fn admission_score(
    match_count: u8,
    difficulty_probability: f64,
    match_weight: f64,
    difficulty_weight: f64,
) -> AdmissionScore {
    let blended = (f64::from(match_count) / 4.0) * match_weight
        + difficulty_probability * difficulty_weight;
    AdmissionScore {
        match_count,
        difficulty_pct: round2(difficulty_probability * 100.0),
        final_pct: round2(blended * 100.0),
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
