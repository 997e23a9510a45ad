//! SVG forecast charts drawn with Plotters.
//!
//! One chart per entity: the point forecast as a marked line over a shaded
//! confidence band, years on the x axis.

use std::path::{Path, PathBuf};

use chrono::Datelike;
use plotters::prelude::*;

use crate::domain::{ForecastHorizon, ForecastPoint};
use crate::plot::{ArtifactSink, RenderError, artifact_file_name, ensure_dir};

const WIDTH: u32 = 960;
const HEIGHT: u32 = 540;

/// Writes `<output_dir>/<entity>_forecast.svg`.
#[derive(Debug, Clone)]
pub struct SvgChartRenderer {
    output_dir: PathBuf,
}

impl SvgChartRenderer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self, RenderError> {
        let output_dir = output_dir.into();
        ensure_dir(&output_dir)?;
        Ok(Self { output_dir })
    }
}

impl ArtifactSink for SvgChartRenderer {
    fn render(&self, entity_id: &str, horizon: &ForecastHorizon) -> Result<PathBuf, RenderError> {
        if horizon.is_empty() {
            return Err(RenderError::EmptyHorizon {
                entity: entity_id.to_string(),
            });
        }

        let path = self.output_dir.join(artifact_file_name(entity_id));
        draw_chart(&path, entity_id, horizon.points()).map_err(|reason| RenderError::Draw {
            entity: entity_id.to_string(),
            reason,
        })?;

        tracing::debug!(entity = entity_id, path = %path.display(), "chart written");
        Ok(path)
    }
}

/// Decimal year of a period, e.g. 2024-12-31 -> ~2024.997.
fn year_position(p: &ForecastPoint) -> f64 {
    p.period.year() as f64 + p.period.ordinal0() as f64 / 365.25
}

fn bounds(points: &[ForecastPoint]) -> ([f64; 2], [f64; 2]) {
    let xs = points.iter().map(year_position);
    let x0 = xs.clone().fold(f64::INFINITY, f64::min);
    let x1 = xs.fold(f64::NEG_INFINITY, f64::max);

    let y0 = points.iter().map(|p| p.lower_bound).fold(f64::INFINITY, f64::min);
    let y1 = points.iter().map(|p| p.upper_bound).fold(f64::NEG_INFINITY, f64::max);

    // Pad so single-point horizons and flat bands still get a usable range.
    let x_pad = ((x1 - x0) * 0.05).max(0.5);
    let y_pad = ((y1 - y0) * 0.1).max(0.25);
    ([x0 - x_pad, x1 + x_pad], [y0 - y_pad, y1 + y_pad])
}

fn draw_chart(path: &Path, entity_id: &str, points: &[ForecastPoint]) -> Result<(), String> {
    let ([x0, x1], [y0, y1]) = bounds(points);
    if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite()) {
        return Err("non-finite chart bounds".to_string());
    }

    let root = SVGBackend::new(path, (WIDTH, HEIGHT)).into_drawing_area();
    root.fill(&WHITE).map_err(|e| e.to_string())?;

    let title = format!("Groundwater Level Forecast - {entity_id}");
    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24).into_font())
        .margin(16)
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 48)
        .build_cartesian_2d(x0..x1, y0..y1)
        .map_err(|e| e.to_string())?;

    chart
        .configure_mesh()
        .x_desc("Year")
        .y_desc("Water Level (m bgl)")
        .x_labels(points.len().clamp(2, 12))
        .y_labels(8)
        .x_label_formatter(&|v| format!("{:.0}", v.floor()))
        .y_label_formatter(&|v| format!("{v:.2}"))
        .draw()
        .map_err(|e| e.to_string())?;

    // Confidence band: upper edge left-to-right, lower edge back.
    let band: Vec<(f64, f64)> = points
        .iter()
        .map(|p| (year_position(p), p.upper_bound))
        .chain(points.iter().rev().map(|p| (year_position(p), p.lower_bound)))
        .collect();
    chart
        .draw_series(std::iter::once(Polygon::new(band, BLUE.mix(0.2).filled())))
        .map_err(|e| e.to_string())?
        .label("Confidence Interval")
        .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], BLUE.mix(0.2).filled()));

    let line: Vec<(f64, f64)> = points.iter().map(|p| (year_position(p), p.point_estimate)).collect();
    chart
        .draw_series(LineSeries::new(line.iter().copied(), BLUE.stroke_width(2)))
        .map_err(|e| e.to_string())?
        .label("Forecast")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE.stroke_width(2)));
    chart
        .draw_series(line.iter().map(|&xy| Circle::new(xy, 4, BLUE.filled())))
        .map_err(|e| e.to_string())?;

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .map_err(|e| e.to_string())?;

    root.present().map_err(|e| e.to_string())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn horizon(levels: &[f64]) -> ForecastHorizon {
        ForecastHorizon::from_validated(
            levels
                .iter()
                .enumerate()
                .map(|(i, &v)| ForecastPoint {
                    period: NaiveDate::from_ymd_opt(2025 + i as i32, 12, 31).unwrap(),
                    point_estimate: v,
                    lower_bound: v - 0.8,
                    upper_bound: v + 0.8,
                })
                .collect(),
        )
    }

    #[test]
    fn writes_svg_named_after_entity() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = SvgChartRenderer::new(dir.path().join("charts")).unwrap();

        let path = renderer.render("Madhya Pradesh", &horizon(&[6.1, 5.7, 5.2, 4.9, 4.4])).unwrap();

        assert_eq!(path, dir.path().join("charts").join("Madhya_Pradesh_forecast.svg"));
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Groundwater Level Forecast - Madhya Pradesh"));
        assert!(svg.contains("Water Level (m bgl)"));
    }

    #[test]
    fn single_point_horizon_renders() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = SvgChartRenderer::new(dir.path()).unwrap();
        assert!(renderer.render("Goa", &horizon(&[3.3])).is_ok());
    }

    #[test]
    fn empty_horizon_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = SvgChartRenderer::new(dir.path()).unwrap();
        let err = renderer.render("Goa", &horizon(&[])).unwrap_err();
        assert!(matches!(err, RenderError::EmptyHorizon { .. }));
    }
}
