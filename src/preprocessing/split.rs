//! Train/test partitioning

use crate::data::WineDataset;
use crate::error::{Result, WineError};
use ndarray::Array1;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;

/// Row indices of a train/test partition
#[derive(Debug, Clone)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Stratified shuffle split of `y` into train/test indices.
///
/// Each class contributes `round(count * test_fraction)` rows to the test set,
/// so class proportions are preserved on both sides.
pub fn stratified_split_indices(y: &Array1<f64>, test_fraction: f64, seed: u64) -> Result<SplitIndices> {
    if !(0.0..1.0).contains(&test_fraction) || test_fraction == 0.0 {
        return Err(WineError::InvalidParameter {
            name: "test_fraction".to_string(),
            value: test_fraction.to_string(),
            reason: "must be in (0, 1)".to_string(),
        });
    }

    let mut by_class: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (idx, &val) in y.iter().enumerate() {
        by_class.entry(val.round() as i64).or_default().push(idx);
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(y.len());
    let mut test = Vec::new();

    for indices in by_class.values_mut() {
        indices.shuffle(&mut rng);
        let n_test = ((indices.len() as f64) * test_fraction).round() as usize;
        let n_test = n_test.min(indices.len());
        test.extend_from_slice(&indices[..n_test]);
        train.extend_from_slice(&indices[n_test..]);
    }

    if train.is_empty() || test.is_empty() {
        return Err(WineError::ValidationError(format!(
            "split of {} rows at test fraction {} leaves an empty side",
            y.len(),
            test_fraction
        )));
    }

    // Interleave classes again
    train.shuffle(&mut rng);
    test.shuffle(&mut rng);

    Ok(SplitIndices { train, test })
}

/// Stratified train/test split of a dataset
pub fn train_test_split(dataset: &WineDataset, test_fraction: f64, seed: u64) -> Result<(WineDataset, WineDataset)> {
    let split = stratified_split_indices(&dataset.labels, test_fraction, seed)?;
    Ok((dataset.select(&split.train), dataset.select(&split.test)))
}
