//! Plotters-powered PNG chart for one wavelength's fitted curves.
//!
//! Chart content mirrors what researchers expect from a calibration sheet:
//!
//! - observed (concentration, average voltage) points as a black scatter
//! - the linear fit drawn through its predictions at the observed points
//! - the quadratic fit drawn over the dense synthetic range so it renders as
//!   a smooth curve
//! - both R² scores in the legend
//!
//! The chart is intentionally data-driven: all series and bounds are computed
//! before any drawing. This keeps the render call focused and makes the data
//! prep testable without a backend.

use std::path::Path;

use plotters::prelude::*;

use crate::domain::{ModelKind, WavelengthFit};
use crate::error::{AppError, EXIT_INTERNAL};

/// Render one wavelength's chart to a PNG file.
pub fn render_wavelength_chart(
    path: &Path,
    fit: &WavelengthFit,
    width: u32,
    height: u32,
) -> Result<(), AppError> {
    let observed: Vec<(f64, f64)> = fit
        .series
        .points
        .iter()
        .map(|p| (p.concentration, p.voltage))
        .collect();

    // Draw the linear fit through its predictions at the observed
    // concentrations, in ascending order so the polyline is monotone in x.
    let linear_line: Option<(Vec<(f64, f64)>, f64)> = fit.fit(ModelKind::Linear).map(|f| {
        let mut line: Vec<(f64, f64)> = fit
            .series
            .points
            .iter()
            .map(|p| p.concentration)
            .zip(f.fitted.iter().copied())
            .collect();
        line.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        (line, f.quality.r2)
    });

    let smooth_line: Option<(Vec<(f64, f64)>, f64)> =
        match (&fit.smooth, fit.fit(ModelKind::Quadratic)) {
            (Some(grid), Some(f)) => Some((
                grid.concentration
                    .iter()
                    .copied()
                    .zip(grid.voltage.iter().copied())
                    .collect(),
                f.quality.r2,
            )),
            _ => None,
        };

    let Some(([x0, x1], [y0, y1])) = chart_bounds(fit) else {
        return Err(AppError::new(
            EXIT_INTERNAL,
            format!("Nothing to draw for wavelength {} nm.", fit.series.label()),
        ));
    };

    let root = BitMapBackend::new(path, (width, height)).into_drawing_area();
    root.fill(&WHITE).map_err(|e| render_err(path, e))?;

    let caption = format!("Voltage vs Concentration at {} nm", fit.series.label());
    let mut chart = ChartBuilder::on(&root)
        .caption(caption, ("sans-serif", 24))
        .margin(10)
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 40)
        .build_cartesian_2d(x0..x1, y0..y1)
        .map_err(|e| render_err(path, e))?;

    chart
        .configure_mesh()
        .x_desc("Concentration (mg/dL)")
        .y_desc("Average Voltage (uV)")
        .draw()
        .map_err(|e| render_err(path, e))?;

    chart
        .draw_series(
            observed
                .iter()
                .map(|&(x, y)| Circle::new((x, y), 3, BLACK.filled())),
        )
        .map_err(|e| render_err(path, e))?
        .label("Data")
        .legend(|(x, y)| Circle::new((x + 10, y), 3, BLACK.filled()));

    if let Some((line, r2)) = &linear_line {
        chart
            .draw_series(LineSeries::new(line.iter().copied(), &BLUE))
            .map_err(|e| render_err(path, e))?
            .label(format!("Linear fit (R² = {r2:.2})"))
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));
    }

    if let Some((line, r2)) = &smooth_line {
        chart
            .draw_series(LineSeries::new(line.iter().copied(), &RED))
            .map_err(|e| render_err(path, e))?
            .label(format!("Quadratic fit (R² = {r2:.2})"))
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(|e| render_err(path, e))?;

    root.present().map_err(|e| render_err(path, e))?;
    Ok(())
}

/// Axis bounds covering the observed points, the fitted values, and the
/// smooth curve, padded by 5% per side.
///
/// Returns `None` when there is nothing finite to draw.
pub fn chart_bounds(fit: &WavelengthFit) -> Option<([f64; 2], [f64; 2])> {
    let mut x0 = f64::INFINITY;
    let mut x1 = f64::NEG_INFINITY;
    let mut y0 = f64::INFINITY;
    let mut y1 = f64::NEG_INFINITY;

    let mut cover = |x: f64, y: f64| {
        x0 = x0.min(x);
        x1 = x1.max(x);
        y0 = y0.min(y);
        y1 = y1.max(y);
    };

    for point in &fit.series.points {
        cover(point.concentration, point.voltage);
    }
    for result in &fit.fits {
        for (point, fitted) in fit.series.points.iter().zip(result.fitted.iter()) {
            cover(point.concentration, *fitted);
        }
    }
    if let Some(grid) = &fit.smooth {
        for (c, v) in grid.concentration.iter().zip(grid.voltage.iter()) {
            cover(*c, *v);
        }
    }

    if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite()) {
        return None;
    }

    let dx = pad((x1 - x0).abs());
    let dy = pad((y1 - y0).abs());
    Some(([x0 - dx, x1 + dx], [y0 - dy, y1 + dy]))
}

fn pad(span: f64) -> f64 {
    if span < 1e-9 { 1.0 } else { span * 0.05 }
}

fn render_err(path: &Path, e: impl std::fmt::Display) -> AppError {
    AppError::new(
        EXIT_INTERNAL,
        format!("Failed to render chart '{}': {e}", path.display()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CurveGrid, SeriesPoint, WavelengthSeries};

    fn bare_fit(points: Vec<SeriesPoint>, smooth: Option<CurveGrid>) -> WavelengthFit {
        WavelengthFit {
            series: WavelengthSeries {
                wavelength: 940.0,
                points,
            },
            fits: vec![],
            skipped: vec![],
            preferred: ModelKind::Linear,
            smooth,
        }
    }

    fn point(concentration: f64, voltage: f64) -> SeriesPoint {
        SeriesPoint {
            concentration,
            voltage,
            raw: 1,
            kept: 1,
        }
    }

    #[test]
    fn bounds_cover_points_with_padding() {
        let fit = bare_fit(vec![point(0.0, 10.0), point(100.0, 110.0)], None);
        let ([x0, x1], [y0, y1]) = chart_bounds(&fit).unwrap();

        assert!(x0 < 0.0 && x1 > 100.0);
        assert!(y0 < 10.0 && y1 > 110.0);
        assert!((x0 - (-5.0)).abs() < 1e-9);
        assert!((x1 - 105.0).abs() < 1e-9);
    }

    #[test]
    fn bounds_include_the_smooth_curve() {
        let smooth = CurveGrid {
            concentration: vec![0.0, 50.0, 100.0],
            voltage: vec![10.0, 500.0, 110.0],
        };
        let fit = bare_fit(vec![point(0.0, 10.0), point(100.0, 110.0)], Some(smooth));
        let (_, [_, y1]) = chart_bounds(&fit).unwrap();

        assert!(y1 > 500.0);
    }

    #[test]
    fn degenerate_span_gets_a_fixed_pad() {
        let fit = bare_fit(vec![point(10.0, 7.0)], None);
        let ([x0, x1], [y0, y1]) = chart_bounds(&fit).unwrap();

        assert!((x1 - x0 - 2.0).abs() < 1e-9);
        assert!((y1 - y0 - 2.0).abs() < 1e-9);
    }

    #[test]
    fn empty_fit_has_no_bounds() {
        assert!(chart_bounds(&bare_fit(vec![], None)).is_none());
    }
}
