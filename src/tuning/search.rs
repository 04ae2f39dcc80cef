//! Exhaustive grid search with cross-validation

use super::grid::{format_params, ParameterGrid, TrialParams};
use crate::error::{Result, WineError};
use crate::evaluation::{roc_auc, ConfusionMatrix};
use crate::preprocessing::stratified_split_indices;
use crate::training::{CVResults, CVStrategy, Classifier, CrossValidator};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Metric maximized by the search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scoring {
    #[default]
    RocAuc,
    Accuracy,
    F1,
}

impl Scoring {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "roc_auc" | "auc" => Ok(Scoring::RocAuc),
            "accuracy" | "acc" => Ok(Scoring::Accuracy),
            "f1" => Ok(Scoring::F1),
            other => Err(WineError::InvalidParameter {
                name: "scoring".to_string(),
                value: other.to_string(),
                reason: "expected roc_auc, accuracy or f1".to_string(),
            }),
        }
    }

    /// Score positive-class probabilities against 0/1 labels.
    ///
    /// `None` when the metric is undefined on this fold.
    pub fn score(&self, y_true: &Array1<f64>, y_prob: &Array1<f64>) -> Option<f64> {
        let value = match self {
            Scoring::RocAuc => roc_auc(y_true, y_prob),
            Scoring::Accuracy | Scoring::F1 => {
                let y_pred = y_prob.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 });
                let cm = ConfusionMatrix::from_predictions(y_true, &y_pred).ok()?;
                if *self == Scoring::Accuracy {
                    cm.accuracy()
                } else {
                    cm.f1()
                }
            }
        };
        value.filter(|v| v.is_finite())
    }
}

impl fmt::Display for Scoring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Scoring::RocAuc => "roc_auc",
            Scoring::Accuracy => "accuracy",
            Scoring::F1 => "f1",
        };
        write!(f, "{}", s)
    }
}

/// Outcome of one parameter combination
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialResult {
    /// Position in grid order
    pub trial_id: usize,
    pub params: TrialParams,
    /// `None` when no fold could be scored
    pub cv: Option<CVResults>,
    /// First fit error, if any
    pub error: Option<String>,
    pub duration_secs: f64,
}

impl TrialResult {
    pub fn mean_score(&self) -> Option<f64> {
        self.cv.as_ref().map(|cv| cv.mean_score)
    }
}

/// Summary of a finished search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSummary {
    pub scoring: Scoring,
    pub n_folds: usize,
    /// Rows used for the search itself
    pub n_samples_searched: usize,
    pub trials: Vec<TrialResult>,
    pub best_trial_idx: usize,
    pub total_duration_secs: f64,
}

impl SearchSummary {
    pub fn best_trial(&self) -> &TrialResult {
        &self.trials[self.best_trial_idx]
    }

    pub fn best_params(&self) -> &TrialParams {
        &self.best_trial().params
    }

    pub fn best_cv(&self) -> Option<&CVResults> {
        self.best_trial().cv.as_ref()
    }

    pub fn n_failed(&self) -> usize {
        self.trials.iter().filter(|t| t.cv.is_none()).count()
    }
}

/// Best model refit on the full training set, with the search history
pub struct TunedModel {
    pub model: Box<dyn Classifier>,
    pub summary: SearchSummary,
    /// Time spent on the final refit
    pub refit_secs: f64,
}

/// Builds a fresh, unfitted model for a parameter combination
pub type ModelBuilder<'a> = dyn Fn(&TrialParams) -> Result<Box<dyn Classifier>> + 'a;

/// Grid search over a [`ParameterGrid`] scored by cross-validation
#[derive(Debug, Clone)]
pub struct GridSearchCV {
    cv: CrossValidator,
    scoring: Scoring,
    max_samples: Option<usize>,
    seed: u64,
}

impl GridSearchCV {
    /// Stratified 5-fold search scored by ROC-AUC
    pub fn new() -> Self {
        Self {
            cv: CrossValidator::new(CVStrategy::default()),
            scoring: Scoring::RocAuc,
            max_samples: None,
            seed: 42,
        }
    }

    pub fn with_cv(mut self, cv: CrossValidator) -> Self {
        self.cv = cv;
        self
    }

    pub fn with_scoring(mut self, scoring: Scoring) -> Self {
        self.scoring = scoring;
        self
    }

    /// Limit the rows used for the search. The refit still uses every row.
    pub fn with_max_samples(mut self, max_samples: Option<usize>) -> Self {
        self.max_samples = max_samples;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn scoring(&self) -> Scoring {
        self.scoring
    }

    /// Rows to search on: all of them, or a stratified subsample
    fn search_rows(&self, y: &Array1<f64>) -> Result<Option<Vec<usize>>> {
        match self.max_samples {
            Some(max) if max < y.len() => {
                let fraction = max as f64 / y.len() as f64;
                let split = stratified_split_indices(y, fraction, self.seed)?;
                Ok(Some(split.test))
            }
            _ => Ok(None),
        }
    }

    /// Cross-validate one combination
    fn evaluate(
        &self,
        build: &ModelBuilder<'_>,
        params: &TrialParams,
        x: &Array2<f64>,
        y: &Array1<f64>,
    ) -> (Option<CVResults>, Option<String>) {
        let splits = match self.cv.split(y) {
            Ok(splits) => splits,
            Err(e) => return (None, Some(e.to_string())),
        };

        let mut scores = Vec::with_capacity(splits.len());
        let mut skipped = 0;
        for split in &splits {
            let x_train = x.select(Axis(0), &split.train_indices);
            let y_train = y.select(Axis(0), &split.train_indices);
            let x_test = x.select(Axis(0), &split.test_indices);
            let y_test = y.select(Axis(0), &split.test_indices);

            let fold = build(params).and_then(|mut model| {
                model.fit(&x_train, &y_train)?;
                model.predict_proba(&x_test)
            });
            match fold {
                Ok(proba) => match self.scoring.score(&y_test, &proba) {
                    Some(score) => scores.push(score),
                    None => {
                        debug!(fold = split.fold_idx, "fold score undefined, skipping");
                        skipped += 1;
                    }
                },
                Err(e) => return (None, Some(e.to_string())),
            }
        }

        (CVResults::from_scores(scores).map(|cv| cv.with_skipped(skipped)), None)
    }

    /// Search every combination of `grid`, then refit the best on `x`/`y`
    pub fn fit(
        &self,
        grid: &ParameterGrid,
        build: &ModelBuilder<'_>,
        x: &Array2<f64>,
        y: &Array1<f64>,
    ) -> Result<TunedModel> {
        grid.validate()?;
        if x.nrows() != y.len() {
            return Err(WineError::length_mismatch(x.nrows(), y.len()));
        }

        let start = Instant::now();
        let subsample = self.search_rows(y)?;
        let (x_search, y_search) = match &subsample {
            Some(rows) => (x.select(Axis(0), rows), y.select(Axis(0), rows)),
            None => (x.clone(), y.clone()),
        };
        info!(
            combinations = grid.len(),
            rows = y_search.len(),
            scoring = %self.scoring,
            "grid search started"
        );

        let mut trials = Vec::with_capacity(grid.len());
        let mut best: Option<(usize, f64)> = None;
        for (trial_id, params) in grid.iter().enumerate() {
            let trial_start = Instant::now();
            let (cv, error) = self.evaluate(build, &params, &x_search, &y_search);
            let duration_secs = trial_start.elapsed().as_secs_f64();

            match (&cv, &error) {
                (Some(cv), _) => {
                    debug!(
                        trial_id,
                        params = %format_params(&params),
                        mean = cv.mean_score,
                        std = cv.std_score,
                        "trial scored"
                    );
                    if best.map_or(true, |(_, score)| cv.mean_score > score) {
                        best = Some((trial_id, cv.mean_score));
                    }
                }
                (None, Some(err)) => warn!(trial_id, params = %format_params(&params), error = %err, "trial failed"),
                (None, None) => warn!(trial_id, params = %format_params(&params), "no fold could be scored"),
            }

            trials.push(TrialResult {
                trial_id,
                params,
                cv,
                error,
                duration_secs,
            });
        }

        let (best_trial_idx, best_score) = best.ok_or_else(|| {
            WineError::TrainingError(format!("all {} parameter combinations failed", trials.len()))
        })?;
        let best_params = trials[best_trial_idx].params.clone();
        info!(params = %format_params(&best_params), score = best_score, "best combination");

        let refit_start = Instant::now();
        let mut model = build(&best_params)?;
        model.fit(x, y)?;
        let refit_secs = refit_start.elapsed().as_secs_f64();

        Ok(TunedModel {
            model,
            summary: SearchSummary {
                scoring: self.scoring,
                n_folds: self.cv.strategy().n_splits(),
                n_samples_searched: y_search.len(),
                trials,
                best_trial_idx,
                total_duration_secs: start.elapsed().as_secs_f64(),
            },
            refit_secs,
        })
    }
}

impl Default for GridSearchCV {
    fn default() -> Self {
        Self::new()
    }
}
