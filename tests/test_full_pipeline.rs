//! Integration test: Full pipeline (files → dataset → comparison → report)

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::io::Write;
use std::path::{Path, PathBuf};
use wine_quality::comparison::{ModelComparison, ModelKind};
use wine_quality::config::StudyConfig;
use wine_quality::data::{load_wine_csv, load_wine_pair, Origin};
use wine_quality::explore::analyze;
use wine_quality::report;
use wine_quality::tuning::ParameterGrid;

const HEADER: &str = "\"fixed acidity\";\"volatile acidity\";\"citric acid\";\"residual sugar\";\"chlorides\";\"free sulfur dioxide\";\"total sulfur dioxide\";\"density\";\"pH\";\"sulphates\";\"alcohol\";\"quality\"";

/// Write a wine file whose quality rises with alcohol and falls with volatile acidity
fn write_wine_file(dir: &Path, name: &str, n: usize, red: bool, seed: u64) -> PathBuf {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "{}", HEADER).unwrap();

    for _ in 0..n {
        let alcohol: f64 = rng.gen_range(8.5..14.0);
        let volatile: f64 = if red { rng.gen_range(0.2..1.2) } else { rng.gen_range(0.1..0.7) };
        let noise: f64 = rng.gen_range(-0.6..0.6);
        let quality = (0.9 * (alcohol - 8.5) - 2.0 * volatile + 4.6 + noise).round().clamp(3.0, 9.0);
        writeln!(
            file,
            "{:.1};{:.2};{:.2};{:.1};{:.3};{:.0};{:.0};{:.4};{:.2};{:.2};{:.1};{}",
            if red { rng.gen_range(5.0..12.0) } else { rng.gen_range(4.5..9.0) },
            volatile,
            rng.gen_range(0.0..0.6),
            if red { rng.gen_range(1.2..4.0) } else { rng.gen_range(1.0..18.0) },
            rng.gen_range(0.02..0.12),
            rng.gen_range(5.0..60.0),
            if red { rng.gen_range(10.0..90.0) } else { rng.gen_range(80.0..220.0) },
            rng.gen_range(0.990..1.002),
            rng.gen_range(2.9..3.6),
            rng.gen_range(0.35..0.9),
            alcohol,
            quality as i64
        )
        .unwrap();
    }
    path
}

fn fixture(dir: &Path) -> (PathBuf, PathBuf) {
    (
        write_wine_file(dir, "winequality-red.csv", 140, true, 1),
        write_wine_file(dir, "winequality-white.csv", 180, false, 2),
    )
}

fn fast_config(red: &Path, white: &Path, out: &Path) -> StudyConfig {
    StudyConfig::new()
        .with_data(red, white)
        .with_output_dir(out)
        .with_cv_folds(3)
        .with_grid(ModelKind::LogisticRegression, ParameterGrid::new().floats("alpha", &[0.0, 0.01]))
        .with_grid(ModelKind::DecisionTree, ParameterGrid::new().ints("max_depth", &[3, 6]))
        .with_grid(
            ModelKind::RandomForest,
            ParameterGrid::new().ints("n_estimators", &[20]).ints("min_samples_leaf", &[1, 5]),
        )
        .with_grid(
            ModelKind::GradientBoosting,
            ParameterGrid::new().ints("n_estimators", &[30]).floats("learning_rate", &[0.1]),
        )
        .with_grid(
            ModelKind::NeuralNetwork,
            ParameterGrid::new().ints("hidden_units", &[10]).ints("max_epochs", &[40]),
        )
        .with_grid(ModelKind::Knn, ParameterGrid::new().ints("n_neighbors", &[5, 15]))
        .with_grid(ModelKind::Svm, ParameterGrid::new().floats("c", &[1.0]).floats("gamma", &[0.05, 0.1]))
        .with_max_samples(ModelKind::Svm, 150)
}

#[test]
fn test_load_pair_labels_and_origin() {
    let dir = tempfile::tempdir().unwrap();
    let (red, white) = fixture(dir.path());

    let dataset = load_wine_pair(&red, &white, &StudyConfig::default()).unwrap();
    assert_eq!(dataset.n_samples(), 320);
    assert_eq!(dataset.n_features(), 12);
    assert_eq!(dataset.origins.iter().filter(|&&o| o == Origin::Red).count(), 140);

    for (q, label) in dataset.quality.iter().zip(dataset.labels.iter()) {
        assert_eq!(*label, if *q >= 6.0 { 1.0 } else { 0.0 });
    }

    let single = load_wine_csv(&white, Origin::White).unwrap();
    assert_eq!(single.n_samples(), 180);
    assert_eq!(single.n_features(), 11);
}

#[test]
fn test_eda_by_origin() {
    let dir = tempfile::tempdir().unwrap();
    let (red, white) = fixture(dir.path());
    let dataset = load_wine_pair(&red, &white, &StudyConfig::default()).unwrap();

    let eda = analyze(&dataset);
    assert_eq!(eda.n_samples, 320);
    assert_eq!(eda.positives + eda.negatives, 320);
    assert_eq!(eda.by_origin.len(), 2);
    assert_eq!(eda.quality_counts.values().sum::<usize>(), 320);
    // alcohol drives quality in the fixture
    assert_eq!(eda.correlations[0].feature, "alcohol");
}

#[test]
fn test_full_comparison_writes_report() {
    let dir = tempfile::tempdir().unwrap();
    let (red, white) = fixture(dir.path());
    let out = dir.path().join("report");
    let config = fast_config(&red, &white, &out);

    let dataset = load_wine_pair(&red, &white, &config).unwrap();
    let study = ModelComparison::run(&dataset, &config).unwrap();

    assert_eq!(study.models.len() + study.failures.len(), 7);
    assert!(study.failures.is_empty(), "failures: {:?}", study.failures);
    assert_eq!(study.dataset.n_train + study.dataset.n_test, 320);
    // per-class rounding can shift the test size by one row either way
    assert!((63..=65).contains(&study.dataset.n_test));

    for model in &study.models {
        let m = &model.metrics;
        for value in [m.accuracy, m.precision, m.recall, m.f1_score, m.auc_roc].into_iter().flatten() {
            assert!((0.0..=1.0).contains(&value), "{} out of range: {}", model.name, value);
        }
        assert!(m.auc_roc.unwrap() > 0.6, "{} auc {:?}", model.name, m.auc_roc);
        let roc = model.roc.as_ref().unwrap();
        assert_eq!(roc.points.first().map(|p| (p.fpr, p.tpr)), Some((0.0, 0.0)));
        assert_eq!(roc.points.last().map(|p| (p.fpr, p.tpr)), Some((1.0, 1.0)));
    }

    let svm = study.models.iter().find(|m| m.kind == ModelKind::Svm).unwrap();
    assert!(svm.search.n_samples_searched <= 150);

    let files = report::write_all(&study, &config.output_dir).unwrap();
    assert!(files.csv.exists());
    assert!(files.json.exists());
    assert!(files.roc.as_ref().unwrap().exists());
    let md = std::fs::read_to_string(&files.markdown).unwrap();
    assert!(md.contains("Support Vector Machine"));
    assert!(md.contains(&format!("**{}**", study.table.best().unwrap().model)));
}

#[test]
fn test_runs_are_reproducible() {
    let dir = tempfile::tempdir().unwrap();
    let (red, white) = fixture(dir.path());
    let out = dir.path().join("report");
    let config = fast_config(&red, &white, &out).with_models(vec![ModelKind::RandomForest, ModelKind::Knn]);

    let dataset = load_wine_pair(&red, &white, &config).unwrap();
    let a = ModelComparison::run(&dataset, &config).unwrap();
    let b = ModelComparison::run(&dataset, &config).unwrap();

    for (x, y) in a.models.iter().zip(b.models.iter()) {
        assert_eq!(x.best_params, y.best_params);
        assert_eq!(x.metrics.auc_roc, y.metrics.auc_roc);
        assert_eq!(x.metrics.confusion, y.metrics.confusion);
    }
}

#[test]
fn test_missing_file_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let (red, _) = fixture(dir.path());
    let missing = dir.path().join("nope.csv");
    assert!(load_wine_pair(&red, &missing, &StudyConfig::default()).is_err());
}
