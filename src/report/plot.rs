//! ROC overlay rendered to SVG

use crate::comparison::ModelReport;
use crate::error::{Result, WineError};
use plotters::prelude::*;
use std::fmt::Display;
use std::path::Path;

const SIZE: (u32, u32) = (900, 700);

fn plot_err<E: Display>(err: E) -> WineError {
    WineError::PlotError(err.to_string())
}

/// Draw every model's ROC curve plus the chance diagonal into an SVG file.
///
/// Models without a curve are left out of the figure.
pub fn plot_roc_curves(models: &[ModelReport], path: &Path) -> Result<()> {
    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("ROC curves on the test split", ("sans-serif", 24))
        .margin(20)
        .x_label_area_size(45)
        .y_label_area_size(55)
        .build_cartesian_2d(0f64..1f64, 0f64..1f64)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc("False positive rate")
        .y_desc("True positive rate")
        .x_labels(6)
        .y_labels(6)
        .x_label_formatter(&|v| format!("{:.1}", v))
        .y_label_formatter(&|v| format!("{:.1}", v))
        .draw()
        .map_err(plot_err)?;

    let chance = BLACK.mix(0.4).stroke_width(1);
    chart
        .draw_series(LineSeries::new(vec![(0.0, 0.0), (1.0, 1.0)], chance))
        .map_err(plot_err)?
        .label("Chance (AUC 0.500)")
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], chance));

    for (i, model) in models.iter().enumerate() {
        let Some(curve) = &model.roc else { continue };
        let style = Palette99::pick(i).stroke_width(2);
        chart
            .draw_series(LineSeries::new(curve.xy(), style))
            .map_err(plot_err)?
            .label(format!("{} (AUC {:.3})", model.name, curve.auc))
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::LowerRight)
        .background_style(&WHITE.mix(0.85))
        .border_style(&BLACK)
        .draw()
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    Ok(())
}
