use crate::types::UniversityRecord;

/// Derive the binary admission label for a catalog record.
///
/// The catalog has no ground-truth admission outcomes, so the training target
/// is manufactured from the published thresholds: one point each for a lenient
/// CGPA, GRE, TOEFL requirement and a modest rating, and the record counts as
/// "easier admission" (label 1) once it collects at least two points.
pub fn derive_label(record: &UniversityRecord) -> u8 {
    let mut points = 0u8;
    if record.min_cgpa <= 3.4 {
        points += 1;
    }
    if record.gre_required <= 320.0 {
        points += 1;
    }
    if record.toefl_required <= 100.0 {
        points += 1;
    }
    if record.rating <= 3.0 {
        points += 1;
    }
    u8::from(points >= 2)
}
