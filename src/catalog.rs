use crate::{error::AppError, label::derive_label, types::UniversityRecord};
use csv::{ReaderBuilder, StringRecord};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

/// Columns the dataset must provide. Startup fails if any are absent.
pub const REQUIRED_COLUMNS: &[&str] = &[
    "University",
    "Location (State)",
    "Program Strength Area",
    "Average GRE Required",
    "Average TOEFL Required",
    "Average IELTS Required",
    "Minimum CGPA Required",
    "Acceptance Rate (%)",
    "University Rating (1-5)",
];

/// The loaded university dataset. Read-only after construction; records keep
/// their file order, which the similarity index relies on for tie-breaking.
#[derive(Debug, Clone)]
pub struct Catalog {
    records: Vec<UniversityRecord>,
}

struct ColumnIndex {
    name: usize,
    location: usize,
    strength_area: usize,
    gre: usize,
    toefl: usize,
    ielts: usize,
    cgpa: usize,
    acceptance_rate: usize,
    rating: usize,
}

impl Catalog {
    pub fn load(path: &Path) -> Result<Self, AppError> {
        if !path.exists() {
            return Err(AppError::Dataset(format!(
                "Dataset not found at {}. Place the university admission requirements file there.",
                path.display()
            )));
        }

        let mut reader = ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;
        let headers = reader.headers()?.clone();

        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .filter(|col| !headers.iter().any(|h| h == **col))
            .copied()
            .collect();
        if !missing.is_empty() {
            return Err(AppError::Dataset(format!(
                "Missing required columns in dataset: {missing:?}"
            )));
        }

        let columns = ColumnIndex::resolve(&headers)?;
        let mut records = Vec::new();
        for (i, row) in reader.records().enumerate() {
            let row = row?;
            // Header is line 1, first data row is line 2.
            records.push(columns.parse_row(&row, i + 2)?);
        }

        let catalog = Self::from_records(records)?;
        info!("Loaded catalog with {} universities", catalog.len());
        Ok(catalog)
    }

    /// Validate a pre-parsed record set and derive the admission labels.
    pub fn from_records(mut records: Vec<UniversityRecord>) -> Result<Self, AppError> {
        if records.is_empty() {
            return Err(AppError::Dataset("Dataset contains no rows".to_string()));
        }

        let mut seen = HashSet::new();
        for record in &records {
            if !seen.insert(record.name.to_lowercase()) {
                return Err(AppError::Dataset(format!(
                    "Duplicate university name in dataset: {}",
                    record.name
                )));
            }
            let numerics = [
                record.gre_required,
                record.toefl_required,
                record.ielts_required,
                record.min_cgpa,
                record.acceptance_rate,
                record.rating,
            ];
            if numerics.iter().any(|v| !v.is_finite()) {
                return Err(AppError::Dataset(format!(
                    "Non-finite numeric field for university: {}",
                    record.name
                )));
            }
        }

        for record in &mut records {
            record.label = derive_label(record);
        }

        Ok(Self { records })
    }

    pub fn records(&self) -> &[UniversityRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Case-insensitive exact-name lookup, ignoring surrounding whitespace.
    pub fn find(&self, name: &str) -> Option<&UniversityRecord> {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        self.records.iter().find(|r| r.name.to_lowercase() == needle)
    }
}

impl ColumnIndex {
    fn resolve(headers: &StringRecord) -> Result<Self, AppError> {
        let position = |col: &str| {
            headers
                .iter()
                .position(|h| h == col)
                .ok_or_else(|| AppError::Dataset(format!("Missing required column: {col}")))
        };
        Ok(Self {
            name: position("University")?,
            location: position("Location (State)")?,
            strength_area: position("Program Strength Area")?,
            gre: position("Average GRE Required")?,
            toefl: position("Average TOEFL Required")?,
            ielts: position("Average IELTS Required")?,
            cgpa: position("Minimum CGPA Required")?,
            acceptance_rate: position("Acceptance Rate (%)")?,
            rating: position("University Rating (1-5)")?,
        })
    }

    fn parse_row(&self, row: &StringRecord, line: usize) -> Result<UniversityRecord, AppError> {
        let text = |idx: usize| {
            row.get(idx)
                .map(str::to_string)
                .ok_or_else(|| AppError::Dataset(format!("Line {line}: missing field")))
        };
        let number = |idx: usize| -> Result<f64, AppError> {
            let raw = row
                .get(idx)
                .ok_or_else(|| AppError::Dataset(format!("Line {line}: missing field")))?;
            raw.parse::<f64>().map_err(|_| {
                AppError::Dataset(format!("Line {line}: invalid number '{raw}'"))
            })
        };

        Ok(UniversityRecord {
            name: text(self.name)?,
            location: text(self.location)?,
            strength_area: text(self.strength_area)?,
            gre_required: number(self.gre)?,
            toefl_required: number(self.toefl)?,
            ielts_required: number(self.ielts)?,
            min_cgpa: number(self.cgpa)?,
            acceptance_rate: number(self.acceptance_rate)?,
            rating: number(self.rating)?,
            label: 0,
        })
    }
}
