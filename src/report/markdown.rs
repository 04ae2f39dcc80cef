//! Markdown report document

use super::fmt_metric;
use crate::comparison::{ModelReport, StudyReport};
use crate::explore::FeatureSummary;
use crate::tuning::format_params;
use std::fmt::Write;

fn feature_table(out: &mut String, features: &[FeatureSummary]) {
    let _ = writeln!(out, "| feature | mean | std | min | median | max |");
    let _ = writeln!(out, "|---|---:|---:|---:|---:|---:|");
    for f in features {
        let _ = writeln!(
            out,
            "| {} | {:.3} | {} | {:.3} | {:.3} | {:.3} |",
            f.name,
            f.mean,
            f.std.map_or("—".to_string(), |s| format!("{:.3}", s)),
            f.min,
            f.median,
            f.max
        );
    }
}

fn model_section(out: &mut String, model: &ModelReport) {
    let _ = writeln!(out, "### {}\n", model.name);
    let params = format_params(&model.best_params);
    let _ = writeln!(
        out,
        "- Best parameters: `{}`",
        if params.is_empty() { "defaults" } else { params.as_str() }
    );
    if let Some(cv) = &model.cv {
        let _ = writeln!(
            out,
            "- Cross-validated {}: {:.4} ± {:.4} over {} folds",
            model.search.scoring, cv.mean_score, cv.std_score, cv.n_folds
        );
    }
    let _ = writeln!(
        out,
        "- Search: {} combinations on {} rows ({} failed), {:.1}s; refit {:.2}s",
        model.search.trials.len(),
        model.search.n_samples_searched,
        model.search.n_failed(),
        model.tuning_secs,
        model.fit_secs
    );

    let cm = &model.metrics.confusion;
    let _ = writeln!(out, "\n| | predicted not good | predicted good |");
    let _ = writeln!(out, "|---|---:|---:|");
    let _ = writeln!(out, "| actual not good | {} | {} |", cm.tn, cm.fp);
    let _ = writeln!(out, "| actual good | {} | {} |\n", cm.fn_, cm.tp);

    let m = &model.metrics;
    let _ = writeln!(
        out,
        "Accuracy {} · precision {} · recall {} · specificity {} · F1 {} · ROC AUC {} · log loss {} · Brier {}\n",
        fmt_metric(m.accuracy),
        fmt_metric(m.precision),
        fmt_metric(m.recall),
        fmt_metric(m.specificity),
        fmt_metric(m.f1_score),
        fmt_metric(m.auc_roc),
        fmt_metric(m.log_loss),
        fmt_metric(m.brier_score)
    );

    if let Some(importances) = &model.feature_importances {
        let _ = writeln!(out, "| feature | importance |");
        let _ = writeln!(out, "|---|---:|");
        for f in importances.iter().take(5) {
            let _ = writeln!(out, "| {} | {:.4} |", f.feature, f.importance);
        }
        let _ = writeln!(out);
    }
}

/// Render the study as a Markdown document. `roc_file` is linked as an image.
pub fn render_markdown(report: &StudyReport, roc_file: Option<&str>) -> String {
    let mut out = String::new();
    let ds = &report.dataset;
    let eda = &report.eda;

    let _ = writeln!(out, "# Wine quality classification\n");
    let _ = writeln!(
        out,
        "Generated {}.\n",
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );

    let _ = writeln!(out, "## Dataset\n");
    let _ = writeln!(out, "- Samples: {} ({} red, {} white)", ds.n_samples, ds.n_red, ds.n_white);
    let _ = writeln!(out, "- Features: {} ({})", ds.n_features, ds.feature_names.join(", "));
    let _ = writeln!(
        out,
        "- Label: quality >= {} ({} good, {} not good)",
        ds.label_threshold, ds.positives, ds.negatives
    );
    let _ = writeln!(
        out,
        "- Split: {} train / {} test, stratified, seed {}",
        ds.n_train, ds.n_test, report.config.seed
    );
    let _ = writeln!(
        out,
        "- Tuning: {}-fold stratified CV scored by {}\n",
        report.config.cv_folds, report.config.scoring
    );

    let _ = writeln!(out, "## Exploratory analysis\n");
    let _ = writeln!(out, "### Quality scores\n");
    let _ = writeln!(out, "| quality | count |");
    let _ = writeln!(out, "|---:|---:|");
    for (quality, count) in &eda.quality_counts {
        let _ = writeln!(out, "| {} | {} |", quality, count);
    }
    let _ = writeln!(out, "\n### Feature summary\n");
    feature_table(&mut out, &eda.features);
    for profile in &eda.by_origin {
        let _ = writeln!(
            out,
            "\n#### {} wine ({} samples, {} good)\n",
            profile.origin, profile.n_samples, profile.positives
        );
        feature_table(&mut out, &profile.features);
    }
    let _ = writeln!(out, "\n### Correlation with quality\n");
    let _ = writeln!(out, "| feature | pearson r |");
    let _ = writeln!(out, "|---|---:|");
    for corr in &eda.correlations {
        let _ = writeln!(out, "| {} | {} |", corr.feature, fmt_metric(corr.r));
    }

    let _ = writeln!(out, "\n## Models\n");
    for model in &report.models {
        model_section(&mut out, model);
    }
    for failure in &report.failures {
        let _ = writeln!(out, "### {}\n\nFailed: {}\n", failure.name, failure.error);
    }

    let _ = writeln!(out, "## Comparison\n");
    let _ = writeln!(out, "| model | accuracy | precision | recall | F1 | ROC AUC | CV score | fit (s) |");
    let _ = writeln!(out, "|---|---:|---:|---:|---:|---:|---:|---:|");
    for row in &report.table.rows {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} | {} | {} | {:.2} |",
            row.model,
            fmt_metric(row.accuracy),
            fmt_metric(row.precision),
            fmt_metric(row.recall),
            fmt_metric(row.f1),
            fmt_metric(row.roc_auc),
            fmt_metric(row.cv_score),
            row.fit_secs
        );
    }
    if let Some(best) = report.table.best() {
        let _ = writeln!(
            out,
            "\nBest model by test ROC AUC: **{}** ({}).",
            best.model,
            fmt_metric(best.roc_auc)
        );
    }
    if let Some(file) = roc_file {
        let _ = writeln!(out, "\n![ROC curves]({})", file);
    }
    out
}
