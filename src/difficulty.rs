use crate::{
    catalog::Catalog,
    error::AppError,
    forest::{ForestParams, RandomForest},
    types::UniversityRecord,
};
use std::collections::{BTreeSet, HashMap};
use tracing::info;

/// Min-max normalization fitted on the full catalog. A constant feature maps
/// to 0 rather than dividing by zero.
#[derive(Debug, Clone)]
pub struct MinMaxScaler {
    mins: Vec<f64>,
    ranges: Vec<f64>,
}

impl MinMaxScaler {
    pub fn fit(rows: &[Vec<f64>]) -> Self {
        let n = rows.first().map_or(0, Vec::len);
        let mut mins = vec![f64::INFINITY; n];
        let mut maxs = vec![f64::NEG_INFINITY; n];
        for row in rows {
            for (i, &value) in row.iter().enumerate() {
                mins[i] = mins[i].min(value);
                maxs[i] = maxs[i].max(value);
            }
        }
        let ranges = mins.iter().zip(&maxs).map(|(lo, hi)| hi - lo).collect();
        Self { mins, ranges }
    }

    pub fn transform(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .enumerate()
            .map(|(i, &value)| {
                if self.ranges[i] > 0.0 {
                    (value - self.mins[i]) / self.ranges[i]
                } else {
                    0.0
                }
            })
            .collect()
    }
}

/// One-hot encoding over categorical columns. Categories unseen at fit time
/// transform to an all-zero block instead of erroring.
#[derive(Debug, Clone)]
pub struct OneHotEncoder {
    columns: Vec<HashMap<String, usize>>,
    width: usize,
}

impl OneHotEncoder {
    pub fn fit(rows: &[Vec<String>]) -> Self {
        let n_columns = rows.first().map_or(0, Vec::len);
        let mut columns = Vec::with_capacity(n_columns);
        let mut width = 0;
        for col in 0..n_columns {
            // Sorted for a stable category ordering across runs.
            let categories: BTreeSet<&String> = rows.iter().map(|row| &row[col]).collect();
            let mapping: HashMap<String, usize> = categories
                .into_iter()
                .enumerate()
                .map(|(i, cat)| (cat.clone(), i))
                .collect();
            width += mapping.len();
            columns.push(mapping);
        }
        Self { columns, width }
    }

    pub fn transform(&self, values: &[String]) -> Vec<f64> {
        let mut encoded = vec![0.0; self.width];
        let mut offset = 0;
        for (col, mapping) in self.columns.iter().enumerate() {
            if let Some(value) = values.get(col) {
                if let Some(&idx) = mapping.get(value) {
                    encoded[offset + idx] = 1.0;
                }
            }
            offset += mapping.len();
        }
        encoded
    }

    pub fn width(&self) -> usize {
        self.width
    }
}

/// The trained difficulty classifier: fitted scaler, fitted encoder and the
/// forest, built once at startup and read-only thereafter.
pub struct DifficultyModel {
    scaler: MinMaxScaler,
    encoder: OneHotEncoder,
    forest: RandomForest,
}

fn numeric_fields(record: &UniversityRecord) -> Vec<f64> {
    vec![
        record.gre_required,
        record.toefl_required,
        record.ielts_required,
        record.min_cgpa,
        record.acceptance_rate,
        record.rating,
    ]
}

fn categorical_fields(record: &UniversityRecord) -> Vec<String> {
    vec![
        record.name.clone(),
        record.location.clone(),
        record.strength_area.clone(),
    ]
}

impl DifficultyModel {
    /// Train once over the whole catalog against the derived labels.
    pub fn fit(catalog: &Catalog, params: &ForestParams) -> Result<Self, AppError> {
        let records = catalog.records();

        let numeric_rows: Vec<Vec<f64>> = records.iter().map(numeric_fields).collect();
        let categorical_rows: Vec<Vec<String>> = records.iter().map(categorical_fields).collect();

        let scaler = MinMaxScaler::fit(&numeric_rows);
        let encoder = OneHotEncoder::fit(&categorical_rows);

        let matrix: Vec<Vec<f64>> = numeric_rows
            .iter()
            .zip(&categorical_rows)
            .map(|(nums, cats)| {
                let mut row = scaler.transform(nums);
                row.extend(encoder.transform(cats));
                row
            })
            .collect();
        let labels: Vec<u8> = records.iter().map(|r| r.label).collect();

        let forest = RandomForest::fit(&matrix, &labels, params)?;

        let correct = matrix
            .iter()
            .zip(&labels)
            .filter(|(row, &label)| (forest.predict_proba(row) >= 0.5) == (label == 1))
            .count();
        info!(
            "Difficulty model trained: {} trees, {} features, {:.1}% train accuracy",
            forest.n_trees(),
            matrix[0].len(),
            100.0 * correct as f64 / labels.len() as f64
        );

        Ok(Self {
            scaler,
            encoder,
            forest,
        })
    }

    /// P(label = 1), the probability of the "easier admission" class.
    pub fn predict_easier(&self, record: &UniversityRecord) -> f64 {
        let mut row = self.scaler.transform(&numeric_fields(record));
        row.extend(self.encoder.transform(&categorical_fields(record)));
        self.forest.predict_proba(&row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaler_maps_min_to_zero_and_max_to_one() {
        let rows = vec![vec![10.0, 1.0], vec![20.0, 3.0], vec![15.0, 2.0]];
        let scaler = MinMaxScaler::fit(&rows);

        assert_eq!(scaler.transform(&[10.0, 1.0]), vec![0.0, 0.0]);
        assert_eq!(scaler.transform(&[20.0, 3.0]), vec![1.0, 1.0]);
        assert_eq!(scaler.transform(&[15.0, 2.0]), vec![0.5, 0.5]);
    }

    #[test]
    fn scaler_handles_constant_feature() {
        let rows = vec![vec![5.0], vec![5.0]];
        let scaler = MinMaxScaler::fit(&rows);
        assert_eq!(scaler.transform(&[5.0]), vec![0.0]);
    }

    #[test]
    fn encoder_round_trips_known_categories() {
        let rows = vec![
            vec!["MIT".to_string(), "MA".to_string()],
            vec!["Stanford".to_string(), "CA".to_string()],
        ];
        let encoder = OneHotEncoder::fit(&rows);
        assert_eq!(encoder.width(), 4);

        let encoded = encoder.transform(&["MIT".to_string(), "CA".to_string()]);
        assert_eq!(encoded.iter().filter(|&&v| v == 1.0).count(), 2);
    }

    #[test]
    fn encoder_maps_unseen_category_to_zero_block() {
        let rows = vec![vec!["MIT".to_string()], vec!["Stanford".to_string()]];
        let encoder = OneHotEncoder::fit(&rows);

        let encoded = encoder.transform(&["Unknown Tech".to_string()]);
        assert!(encoded.iter().all(|&v| v == 0.0));
    }

    fn fixture_catalog() -> Catalog {
        let mut records = Vec::new();
        for i in 0..8 {
            let lenient = i % 2 == 0;
            records.push(UniversityRecord {
                name: format!("University {i}"),
                location: if lenient { "Ohio" } else { "Massachusetts" }.to_string(),
                strength_area: "Computer Science".to_string(),
                gre_required: if lenient { 300.0 + i as f64 } else { 325.0 + i as f64 },
                toefl_required: if lenient { 90.0 } else { 108.0 },
                ielts_required: 7.0,
                min_cgpa: if lenient { 3.0 } else { 3.8 },
                acceptance_rate: if lenient { 60.0 } else { 8.0 },
                rating: if lenient { 2.0 } else { 5.0 },
                label: 0,
            });
        }
        Catalog::from_records(records).unwrap()
    }

    #[test]
    fn pipeline_predicts_probabilities_for_catalog_records() {
        let catalog = fixture_catalog();
        let params = ForestParams {
            n_trees: 50,
            ..Default::default()
        };
        let model = DifficultyModel::fit(&catalog, &params).unwrap();

        for record in catalog.records() {
            let prob = model.predict_easier(record);
            assert!((0.0..=1.0).contains(&prob));
        }
    }

    #[test]
    fn lenient_universities_score_easier_than_strict_ones() {
        let catalog = fixture_catalog();
        let params = ForestParams {
            n_trees: 50,
            ..Default::default()
        };
        let model = DifficultyModel::fit(&catalog, &params).unwrap();

        let lenient = model.predict_easier(&catalog.records()[0]);
        let strict = model.predict_easier(&catalog.records()[1]);
        assert!(lenient > strict);
    }

    #[test]
    fn unseen_university_still_gets_a_prediction() {
        let catalog = fixture_catalog();
        let params = ForestParams {
            n_trees: 20,
            ..Default::default()
        };
        let model = DifficultyModel::fit(&catalog, &params).unwrap();

        let unseen = UniversityRecord {
            name: "Brand New Institute".to_string(),
            location: "Texas".to_string(),
            strength_area: "Astrophysics".to_string(),
            gre_required: 315.0,
            toefl_required: 95.0,
            ielts_required: 6.5,
            min_cgpa: 3.2,
            acceptance_rate: 40.0,
            rating: 3.0,
            label: 0,
        };
        let prob = model.predict_easier(&unseen);
        assert!((0.0..=1.0).contains(&prob));
    }
}
