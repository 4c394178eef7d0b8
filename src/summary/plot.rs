//! SVG comparison plots for count distributions.

use crate::error::{Result, SamplingError};
use crate::summary::ecdf::EcdfComparison;
use crate::summary::proportions::CountTable;
use plotters::prelude::*;
use std::path::Path;

/// Plot an observed-vs-simulated cumulative distribution comparison.
///
/// Both curves are drawn as step functions over the merged count support.
pub fn plot_ecdf_comparison(cmp: &EcdfComparison, path: &Path, title: &str) -> Result<()> {
    let root = SVGBackend::new(path, (800, 600)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let max_count = cmp.rows.last().map(|r| r.count).unwrap_or(0);
    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .margin(20)
        .x_label_area_size(45)
        .y_label_area_size(55)
        .build_cartesian_2d(0f64..(max_count as f64 + 1.0), 0f64..1.05)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc("strains per sample")
        .y_desc("cumulative proportion")
        .draw()
        .map_err(plot_err)?;

    let empirical = step_points(cmp.rows.iter().map(|r| (r.count, r.empirical)));
    let simulated = step_points(cmp.rows.iter().map(|r| (r.count, r.simulated)));

    chart
        .draw_series(LineSeries::new(empirical, BLUE.stroke_width(2)))
        .map_err(plot_err)?
        .label("observed")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE.stroke_width(2)));
    chart
        .draw_series(LineSeries::new(simulated, RED.stroke_width(2)))
        .map_err(plot_err)?
        .label("simulated")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED.stroke_width(2)));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .position(SeriesLabelPosition::LowerRight)
        .draw()
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    Ok(())
}

/// Plot per-count observed proportions with their Wilson interval whiskers.
pub fn plot_count_table(table: &CountTable, path: &Path, title: &str) -> Result<()> {
    let root = SVGBackend::new(path, (800, 600)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let max_count = table.max_count();
    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .margin(20)
        .x_label_area_size(45)
        .y_label_area_size(55)
        .build_cartesian_2d(-0.5f64..(max_count as f64 + 0.5), 0f64..1.05)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc("strains per sample")
        .y_desc("proportion of samples")
        .draw()
        .map_err(plot_err)?;

    // CI whiskers
    chart
        .draw_series(table.categories.iter().map(|c| {
            PathElement::new(
                vec![
                    (c.count as f64, c.ci_lower),
                    (c.count as f64, c.ci_upper),
                ],
                BLACK.stroke_width(1),
            )
        }))
        .map_err(plot_err)?;

    // Point estimates
    chart
        .draw_series(
            table
                .categories
                .iter()
                .map(|c| Circle::new((c.count as f64, c.proportion), 4, BLUE.filled())),
        )
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    Ok(())
}

/// Expand (count, value) pairs into step-function vertices.
fn step_points<I: Iterator<Item = (u32, f64)>>(rows: I) -> Vec<(f64, f64)> {
    let mut points = Vec::new();
    for (count, value) in rows {
        points.push((count as f64, value));
        points.push((count as f64 + 1.0, value));
    }
    points
}

fn plot_err<E: std::fmt::Display>(e: E) -> SamplingError {
    SamplingError::Plot(e.to_string())
}
