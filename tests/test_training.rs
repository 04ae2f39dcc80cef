//! Integration test: Classifiers and grid search end-to-end

use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use wine_quality::comparison::ModelKind;
use wine_quality::evaluation::{roc_auc, ClassificationMetrics};
use wine_quality::preprocessing::Scaler;
use wine_quality::training::{CVStrategy, Classifier, CrossValidator, DecisionTree};
use wine_quality::tuning::{GridSearchCV, ParameterGrid, Scoring, TrialParams};

/// Two noisy blobs in five dimensions, the first two informative
fn blobs(n: usize, seed: u64) -> (Array2<f64>, Array1<f64>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut x = Array2::zeros((n, 5));
    let mut y = Array1::zeros(n);
    for i in 0..n {
        let label = if i % 3 == 0 { 1.0 } else { 0.0 };
        let shift = if label > 0.5 { 1.5 } else { -0.5 };
        x[[i, 0]] = shift + rng.gen_range(-1.0..1.0);
        x[[i, 1]] = -shift * 10.0 + rng.gen_range(-10.0..10.0);
        for j in 2..5 {
            x[[i, j]] = rng.gen_range(-1.0..1.0) * 100.0;
        }
        y[i] = label;
    }
    (x, y)
}

/// Label is 1 when both coordinates share a sign
fn xor(n: usize, seed: u64) -> (Array2<f64>, Array1<f64>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let x = Array2::from_shape_fn((n, 2), |_| rng.gen_range(-1.0..1.0));
    let y = x
        .rows()
        .into_iter()
        .map(|r| if r[0] * r[1] > 0.0 { 1.0 } else { 0.0 })
        .collect();
    (x, y)
}

fn scaled(seed: u64) -> (Array2<f64>, Array1<f64>, Array2<f64>, Array1<f64>) {
    let (x_train, y_train) = blobs(240, seed);
    let (x_test, y_test) = blobs(120, seed + 100);
    let mut scaler = Scaler::standard();
    let x_train = scaler.fit_transform(&x_train).unwrap();
    let x_test = scaler.transform(&x_test).unwrap();
    (x_train, y_train, x_test, y_test)
}

#[test]
fn test_every_model_learns_blobs() {
    let (x_train, y_train, x_test, y_test) = scaled(7);

    for kind in ModelKind::all() {
        let mut model = kind.build(&TrialParams::new(), 42).unwrap();
        model.fit(&x_train, &y_train).unwrap();

        let proba = model.predict_proba(&x_test).unwrap();
        assert_eq!(proba.len(), y_test.len());
        assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)), "{} proba out of range", kind);

        let auc = roc_auc(&y_test, &proba).unwrap();
        assert!(auc > 0.8, "{} auc {}", kind, auc);

        let pred = model.predict(&x_test).unwrap();
        let metrics = ClassificationMetrics::compute(&y_test, &pred, &proba).unwrap();
        assert_eq!(metrics.confusion.total(), y_test.len());
        assert!(metrics.accuracy.unwrap() > 0.7, "{} accuracy {:?}", kind, metrics.accuracy);
    }
}

#[test]
fn test_tree_models_report_importances() {
    let (x_train, y_train, _, _) = scaled(11);

    for kind in ModelKind::all() {
        let mut model = kind.build(&TrialParams::new(), 42).unwrap();
        model.fit(&x_train, &y_train).unwrap();
        match model.feature_importances() {
            Some(importances) => {
                assert!(kind.is_tree_based(), "{} should not report importances", kind);
                assert!((importances.sum() - 1.0).abs() < 1e-6);
                // the first column carries most of the signal
                let top = importances
                    .iter()
                    .enumerate()
                    .max_by(|a, b| a.1.total_cmp(b.1))
                    .map(|(i, _)| i);
                assert!(matches!(top, Some(0) | Some(1)), "{} top feature {:?}", kind, top);
            }
            None => assert!(!kind.is_tree_based(), "{} is missing importances", kind),
        }
    }
}

#[test]
fn test_grid_search_prefers_deeper_tree() {
    // quadrant labels: no single split separates them
    let (x, y) = xor(300, 3);
    let grid = ParameterGrid::new().ints("max_depth", &[1, 8]);
    let search = GridSearchCV::new()
        .with_cv(CrossValidator::new(CVStrategy::StratifiedKFold { n_splits: 4, shuffle: true }))
        .with_scoring(Scoring::RocAuc);

    let tuned = search
        .fit(&grid, &|p| ModelKind::DecisionTree.build(p, 42), &x, &y)
        .unwrap();

    assert_eq!(tuned.summary.trials.len(), 2);
    assert_eq!(tuned.summary.best_params()["max_depth"].as_int(), Some(8));
    let stump = tuned.summary.trials[0].mean_score().unwrap();
    let deep = tuned.summary.trials[1].mean_score().unwrap();
    assert!(deep > stump + 0.2, "stump {} deep {}", stump, deep);
    let cv = tuned.summary.best_cv().unwrap();
    assert_eq!(cv.n_folds + cv.n_skipped, 4);

    // refit model is usable straight away
    let proba = tuned.model.predict_proba(&x).unwrap();
    assert!(roc_auc(&y, &proba).unwrap() > 0.85);
}

#[test]
fn test_grid_search_with_explicit_builder() {
    let (x, y) = blobs(150, 5);
    let grid = ParameterGrid::new().ints("min_samples_leaf", &[1, 10, 40]);
    let search = GridSearchCV::new().with_scoring(Scoring::Accuracy).with_seed(9);

    let build = |p: &TrialParams| -> wine_quality::Result<Box<dyn Classifier>> {
        let leaf = p["min_samples_leaf"].as_int().unwrap_or(1) as usize;
        Ok(Box::new(DecisionTree::new_classifier().with_max_depth(4).with_min_samples_leaf(leaf)))
    };
    let tuned = search.fit(&grid, &build, &x, &y).unwrap();

    assert_eq!(tuned.summary.scoring, Scoring::Accuracy);
    assert_eq!(tuned.summary.n_failed(), 0);
    assert_eq!(tuned.summary.n_samples_searched, 150);
    for trial in &tuned.summary.trials {
        let score = trial.mean_score().unwrap();
        assert!((0.0..=1.0).contains(&score));
        assert!(score <= tuned.summary.best_trial().mean_score().unwrap());
    }
}

#[test]
fn test_invalid_parameter_type_fails_build() {
    let mut params = TrialParams::new();
    params.insert("n_neighbors".to_string(), "many".into());
    assert!(ModelKind::Knn.build(&params, 42).is_err());

    let mut params = TrialParams::new();
    params.insert("criterion".to_string(), "mse".into());
    assert!(ModelKind::DecisionTree.build(&params, 42).is_err());
}
