//! Model comparison workflow
//!
//! Splits the dataset, scales features on the training rows, tunes every
//! configured model with [`GridSearchCV`] and evaluates the refit models on
//! the held-out test split.

mod kind;

pub use kind::{ModelKind, DEFAULT_SVM_SEARCH_SAMPLES};

use crate::config::StudyConfig;
use crate::data::{Origin, WineDataset};
use crate::error::{Result, WineError};
use crate::evaluation::{roc_curve, ClassificationMetrics, RocCurve};
use crate::explore::{analyze, EdaReport};
use crate::preprocessing::{train_test_split, Scaler};
use crate::training::{CVResults, CVStrategy, CrossValidator};
use crate::tuning::{format_params, GridSearchCV, SearchSummary, TrialParams};
use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::time::Instant;
use tracing::{info, warn};

/// Importance of one input feature
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Everything recorded for one tuned and evaluated model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelReport {
    pub kind: ModelKind,
    pub name: String,
    pub best_params: TrialParams,
    /// Cross-validation results of the chosen combination
    pub cv: Option<CVResults>,
    pub search: SearchSummary,
    /// Metrics on the test split
    pub metrics: ClassificationMetrics,
    pub roc: Option<RocCurve>,
    /// Sorted by importance, largest first; tree models only
    pub feature_importances: Option<Vec<FeatureImportance>>,
    /// Seconds spent refitting the chosen combination
    pub fit_secs: f64,
    /// Seconds spent on the whole search
    pub tuning_secs: f64,
}

/// A model whose tuning or evaluation failed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedModel {
    pub kind: ModelKind,
    pub name: String,
    pub error: String,
}

/// One line of the comparison table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub kind: ModelKind,
    pub model: String,
    pub accuracy: Option<f64>,
    pub precision: Option<f64>,
    pub recall: Option<f64>,
    pub f1: Option<f64>,
    pub roc_auc: Option<f64>,
    pub cv_score: Option<f64>,
    pub fit_secs: f64,
}

impl From<&ModelReport> for ComparisonRow {
    fn from(report: &ModelReport) -> Self {
        Self {
            kind: report.kind,
            model: report.name.clone(),
            accuracy: report.metrics.accuracy,
            precision: report.metrics.precision,
            recall: report.metrics.recall,
            f1: report.metrics.f1_score,
            roc_auc: report.metrics.auc_roc,
            cv_score: report.cv.as_ref().map(|cv| cv.mean_score),
            fit_secs: report.fit_secs,
        }
    }
}

/// Test-set metrics of every model, best ROC-AUC first
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComparisonTable {
    pub rows: Vec<ComparisonRow>,
}

/// Descending, with undefined values last
fn cmp_desc(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl ComparisonTable {
    pub fn from_reports(reports: &[ModelReport]) -> Self {
        let mut rows: Vec<ComparisonRow> = reports.iter().map(ComparisonRow::from).collect();
        // stable: equal AUCs keep run order
        rows.sort_by(|a, b| cmp_desc(a.roc_auc, b.roc_auc));
        Self { rows }
    }

    /// Model with the highest test ROC-AUC
    pub fn best(&self) -> Option<&ComparisonRow> {
        self.rows.first().filter(|row| row.roc_auc.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Shape of the data the study ran on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub n_samples: usize,
    pub n_red: usize,
    pub n_white: usize,
    pub n_train: usize,
    pub n_test: usize,
    pub n_features: usize,
    pub feature_names: Vec<String>,
    pub label_threshold: f64,
    pub positives: usize,
    pub negatives: usize,
}

/// Complete result of a study
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyReport {
    pub generated_at: DateTime<Utc>,
    pub config: StudyConfig,
    pub dataset: DatasetSummary,
    pub eda: EdaReport,
    /// Successful models in run order
    pub models: Vec<ModelReport>,
    pub failures: Vec<FailedModel>,
    pub table: ComparisonTable,
}

impl StudyReport {
    pub fn best_model(&self) -> Option<&ModelReport> {
        let best = self.table.best()?;
        self.models.iter().find(|m| m.kind == best.kind)
    }
}

/// Runs the full comparison for a dataset and configuration
pub struct ModelComparison;

impl ModelComparison {
    /// Tune and evaluate every configured model.
    ///
    /// A model that fails is recorded in [`StudyReport::failures`] and the
    /// run moves on; the run errors only when every model fails.
    pub fn run(dataset: &WineDataset, config: &StudyConfig) -> Result<StudyReport> {
        config.validate()?;
        if dataset.is_empty() {
            return Err(WineError::DataError("dataset has no rows".to_string()));
        }

        let eda = analyze(dataset);
        let (train, test) = train_test_split(dataset, config.test_size, config.seed)?;
        info!(
            train = train.n_samples(),
            test = test.n_samples(),
            features = dataset.n_features(),
            "Split dataset"
        );

        let mut scaler = Scaler::new(config.scaler);
        let x_train = scaler.fit_transform(&train.features)?;
        let x_test = scaler.transform(&test.features)?;

        let mut models = Vec::with_capacity(config.models.len());
        let mut failures = Vec::new();
        for (i, &kind) in config.models.iter().enumerate() {
            info!(model = kind.key(), step = i + 1, of = config.models.len(), "Tuning {}", kind);
            match Self::evaluate_model(kind, config, &x_train, &train.labels, &x_test, &test.labels, &dataset.feature_names) {
                Ok(report) => {
                    info!(
                        model = kind.key(),
                        auc = ?report.metrics.auc_roc,
                        accuracy = ?report.metrics.accuracy,
                        params = %format_params(&report.best_params),
                        "Evaluated {}",
                        kind
                    );
                    models.push(report);
                }
                Err(e) => {
                    warn!(model = kind.key(), error = %e, "Model failed, continuing");
                    failures.push(FailedModel {
                        kind,
                        name: kind.display_name().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        if models.is_empty() {
            return Err(WineError::TrainingError(format!(
                "all {} models failed",
                failures.len()
            )));
        }

        let (negatives, positives) = dataset.class_balance();
        let dataset_summary = DatasetSummary {
            n_samples: dataset.n_samples(),
            n_red: dataset.origins.iter().filter(|&&o| o == Origin::Red).count(),
            n_white: dataset.origins.iter().filter(|&&o| o == Origin::White).count(),
            n_train: train.n_samples(),
            n_test: test.n_samples(),
            n_features: dataset.n_features(),
            feature_names: dataset.feature_names.clone(),
            label_threshold: dataset.label_threshold,
            positives,
            negatives,
        };

        let table = ComparisonTable::from_reports(&models);
        if let Some(best) = table.best() {
            info!(model = %best.model, auc = ?best.roc_auc, "Best model");
        }

        Ok(StudyReport {
            generated_at: Utc::now(),
            config: config.clone(),
            dataset: dataset_summary,
            eda,
            models,
            failures,
            table,
        })
    }

    /// Tune one model on the training split and score it on the test split
    pub fn evaluate_model(
        kind: ModelKind,
        config: &StudyConfig,
        x_train: &Array2<f64>,
        y_train: &Array1<f64>,
        x_test: &Array2<f64>,
        y_test: &Array1<f64>,
        feature_names: &[String],
    ) -> Result<ModelReport> {
        let start = Instant::now();
        let cv = CrossValidator::new(CVStrategy::StratifiedKFold {
            n_splits: config.cv_folds,
            shuffle: true,
        })
        .with_random_state(config.seed);
        let search = GridSearchCV::new()
            .with_cv(cv)
            .with_scoring(config.scoring)
            .with_max_samples(config.max_samples_for(kind))
            .with_seed(config.seed);

        let seed = config.seed;
        let build = move |params: &TrialParams| kind.build(params, seed);
        let tuned = search.fit(&config.grid_for(kind), &build, x_train, y_train)?;
        let tuning_secs = start.elapsed().as_secs_f64();

        let proba = tuned.model.predict_proba(x_test)?;
        let metrics = ClassificationMetrics::from_probabilities(y_test, &proba)?;
        let roc = roc_curve(y_test, &proba);

        let feature_importances = tuned.model.feature_importances().map(|imp| {
            let mut ranked: Vec<FeatureImportance> = feature_names
                .iter()
                .zip(imp.iter())
                .map(|(name, &importance)| FeatureImportance {
                    feature: name.clone(),
                    importance,
                })
                .collect();
            ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
            ranked
        });

        Ok(ModelReport {
            kind,
            name: kind.display_name().to_string(),
            best_params: tuned.summary.best_params().clone(),
            cv: tuned.summary.best_cv().cloned(),
            search: tuned.summary,
            metrics,
            roc,
            feature_importances,
            fit_secs: tuned.refit_secs,
            tuning_secs,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use super::fixtures::{fast_config, synthetic_dataset};
    use crate::tuning::ParameterGrid;

    #[test]
    fn test_table_sorted_by_auc() {
        let dataset = synthetic_dataset(240);
        let config = fast_config(vec![ModelKind::LogisticRegression, ModelKind::DecisionTree, ModelKind::RandomForest]);
        let report = ModelComparison::run(&dataset, &config).unwrap();

        assert_eq!(report.models.len(), 3);
        assert!(report.failures.is_empty());
        assert_eq!(report.dataset.n_train + report.dataset.n_test, 240);
        let aucs: Vec<f64> = report.table.rows.iter().filter_map(|r| r.roc_auc).collect();
        for pair in aucs.windows(2) {
            assert!(pair[0] >= pair[1]);
        }
        let best = report.best_model().unwrap();
        assert_eq!(best.metrics.auc_roc, report.table.rows[0].roc_auc);
        assert!(best.metrics.auc_roc.unwrap() > 0.8);
    }

    #[test]
    fn test_importances_only_for_trees() {
        let dataset = synthetic_dataset(200);
        let config = fast_config(vec![ModelKind::LogisticRegression, ModelKind::DecisionTree]);
        let report = ModelComparison::run(&dataset, &config).unwrap();

        let lr = &report.models[0];
        assert!(lr.feature_importances.is_none());
        let tree = &report.models[1];
        let imp = tree.feature_importances.as_ref().unwrap();
        assert_eq!(imp[0].feature, "alcohol");
    }

    #[test]
    fn test_failed_model_does_not_stop_run() {
        let dataset = synthetic_dataset(200);
        let bad_grid = ParameterGrid::new().strings("weights", &["closest"]);
        let config = fast_config(vec![ModelKind::Knn, ModelKind::LogisticRegression]).with_grid(ModelKind::Knn, bad_grid);
        let report = ModelComparison::run(&dataset, &config).unwrap();

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].kind, ModelKind::Knn);
        assert_eq!(report.models.len(), 1);
    }

    #[test]
    fn test_missing_auc_sorted_last() {
        let row = |kind, auc| ComparisonRow {
            kind,
            model: String::new(),
            accuracy: None,
            precision: None,
            recall: None,
            f1: None,
            roc_auc: auc,
            cv_score: None,
            fit_secs: 0.0,
        };
        let mut rows = vec![
            row(ModelKind::Knn, None),
            row(ModelKind::Svm, Some(0.7)),
            row(ModelKind::DecisionTree, Some(0.9)),
        ];
        rows.sort_by(|a, b| cmp_desc(a.roc_auc, b.roc_auc));
        let kinds: Vec<ModelKind> = rows.iter().map(|r| r.kind).collect();
        assert_eq!(kinds, vec![ModelKind::DecisionTree, ModelKind::Svm, ModelKind::Knn]);

        let table = ComparisonTable { rows: vec![row(ModelKind::Knn, None)] };
        assert!(table.best().is_none());
    }
}
