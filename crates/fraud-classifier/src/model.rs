//! RandomForest training, evaluation, and prediction.
//!
//! The split, accuracy, confusion matrix, and permutation importance are
//! computed by hand over plain row vectors; smartcore only fits and runs
//! the forest itself.

use crate::dataset::LabeledDataset;
use anyhow::{anyhow, bail, Result};
use fraudscan_core::features::FEATURE_NAMES;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use smartcore::ensemble::random_forest_classifier::{
    RandomForestClassifier, RandomForestClassifierParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use std::collections::HashSet;
use std::fmt;
use tracing::info;

pub const N_TREES: u16 = 100;
pub const TEST_FRACTION: f32 = 0.3;
pub const SEED: u64 = 42;

/// The smallest dataset worth splitting.
const MIN_ROWS: usize = 10;

type Forest = RandomForestClassifier<f64, u32, DenseMatrix<f64>, Vec<u32>>;

/// A fitted forest plus its held-out evaluation.
pub struct TrainedModel {
    forest: Forest,
    pub evaluation: Evaluation,
}

impl fmt::Debug for TrainedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrainedModel")
            .field("evaluation", &self.evaluation)
            .finish_non_exhaustive()
    }
}

/// Held-out test metrics.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub train_rows: usize,
    pub test_rows: usize,
    pub accuracy: f64,
    /// `confusion[actual][predicted]` in green/orange/red order.
    pub confusion: [[usize; 3]; 3],
    /// Accuracy drop per shuffled feature column, `FEATURE_NAMES` order.
    pub importance: Option<Vec<f64>>,
}

impl TrainedModel {
    /// Predict classes for feature rows in `FEATURE_NAMES` order.
    pub fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<u32>> {
        if features.is_empty() {
            return Ok(Vec::new());
        }
        let matrix = DenseMatrix::from_2d_vec(&features.to_vec());
        self.forest
            .predict(&matrix)
            .map_err(|e| anyhow!("prediction failed: {e}"))
    }
}

/// Fit a forest on a labeled dataset and evaluate it on a held-out
/// split. Rejects datasets a classifier cannot learn from.
pub fn train(dataset: &LabeledDataset, compute_importance: bool) -> Result<TrainedModel> {
    if dataset.len() < MIN_ROWS {
        bail!("dataset too small to split: {} rows", dataset.len());
    }
    if dataset.distinct_labels() < 2 {
        bail!("dataset labels are all one class; nothing to learn");
    }

    let (train_idx, test_idx) = split_indices(dataset.len(), TEST_FRACTION, SEED);

    let x_train: Vec<Vec<f64>> = train_idx.iter().map(|&i| dataset.features[i].clone()).collect();
    let y_train: Vec<u32> = train_idx.iter().map(|&i| dataset.labels[i]).collect();
    let x_test: Vec<Vec<f64>> = test_idx.iter().map(|&i| dataset.features[i].clone()).collect();
    let y_test: Vec<u32> = test_idx.iter().map(|&i| dataset.labels[i]).collect();

    let train_classes: HashSet<u32> = y_train.iter().copied().collect();
    if train_classes.len() < 2 {
        bail!("training split collapsed to one class; provide more data");
    }

    let params = RandomForestClassifierParameters::default()
        .with_n_trees(N_TREES)
        .with_seed(SEED);

    let forest = RandomForestClassifier::fit(&DenseMatrix::from_2d_vec(&x_train), &y_train, params)
        .map_err(|e| anyhow!("random forest training failed: {e}"))?;

    let y_pred = forest
        .predict(&DenseMatrix::from_2d_vec(&x_test))
        .map_err(|e| anyhow!("prediction failed: {e}"))?;

    let accuracy_score = accuracy(&y_test, &y_pred);
    let confusion = confusion_matrix(&y_test, &y_pred);

    let importance = if compute_importance {
        Some(permutation_importance(
            &forest,
            &x_test,
            &y_test,
            accuracy_score,
        )?)
    } else {
        None
    };

    info!(
        train_rows = x_train.len(),
        test_rows = x_test.len(),
        accuracy = accuracy_score,
        "forest trained"
    );

    Ok(TrainedModel {
        forest,
        evaluation: Evaluation {
            train_rows: x_train.len(),
            test_rows: x_test.len(),
            accuracy: accuracy_score,
            confusion,
            importance,
        },
    })
}

/// Deterministic shuffled split of row indices into (train, test).
fn split_indices(rows: usize, test_fraction: f32, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..rows).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let test_len = ((rows as f32) * test_fraction).round() as usize;
    let test_len = test_len.clamp(1, rows - 1);

    let (test, train) = indices.split_at(test_len);
    (train.to_vec(), test.to_vec())
}

fn accuracy(y_true: &[u32], y_pred: &[u32]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let correct = y_true
        .iter()
        .zip(y_pred)
        .filter(|(actual, predicted)| actual == predicted)
        .count();
    correct as f64 / y_true.len() as f64
}

fn confusion_matrix(y_true: &[u32], y_pred: &[u32]) -> [[usize; 3]; 3] {
    let mut matrix = [[0usize; 3]; 3];
    for (&actual, &predicted) in y_true.iter().zip(y_pred) {
        matrix[(actual as usize).min(2)][(predicted as usize).min(2)] += 1;
    }
    matrix
}

/// Shuffle one feature column at a time and measure how far accuracy
/// falls; informative features fall hardest.
fn permutation_importance(
    forest: &Forest,
    x_test: &[Vec<f64>],
    y_test: &[u32],
    baseline: f64,
) -> Result<Vec<f64>> {
    let mut rng = StdRng::seed_from_u64(SEED);
    let mut importance = Vec::with_capacity(FEATURE_NAMES.len());

    for feature in 0..FEATURE_NAMES.len() {
        let mut column: Vec<f64> = x_test.iter().map(|row| row[feature]).collect();
        column.shuffle(&mut rng);

        let mut shuffled = x_test.to_vec();
        for (row, value) in shuffled.iter_mut().zip(column) {
            row[feature] = value;
        }

        let y_pred = forest
            .predict(&DenseMatrix::from_2d_vec(&shuffled))
            .map_err(|e| anyhow!("prediction failed: {e}"))?;
        importance.push(baseline - accuracy(y_test, &y_pred));
    }

    Ok(importance)
}
