use std::path::Path;

use ndarray::Array2;
use plotters::prelude::*;
use tracing::info;

use crate::error::{PipelineError, Result};

/// Colour ramp, from white at zero to `full` at the matrix maximum.
#[derive(Debug, Clone, Copy)]
pub enum HeatPalette {
    Blues,
    Greens,
}

impl HeatPalette {
    fn full(&self) -> RGBColor {
        match self {
            HeatPalette::Blues => RGBColor(8, 48, 107),
            HeatPalette::Greens => RGBColor(0, 68, 27),
        }
    }

    fn shade(&self, t: f64) -> RGBColor {
        let t = t.clamp(0.0, 1.0);
        let RGBColor(r, g, b) = self.full();
        let mix = |c: u8| (255.0 + (f64::from(c) - 255.0) * t).round() as u8;
        RGBColor(mix(r), mix(g), mix(b))
    }
}

const COLOUR_STEPS: usize = 64;

/// Draws a square matrix as an annotated heatmap PNG with a colour bar.
///
/// Row 0 is drawn at the top; `labels` name both axes in matrix order.
/// `legend` titles the colour bar.
pub fn plot_heatmap(
    values: &Array2<f64>,
    labels: &[&str],
    title: &str,
    legend: &str,
    palette: HeatPalette,
    decimals: usize,
    output_path: &Path,
) -> Result<()> {
    let path = output_path.to_string_lossy().to_string();
    let err = |e: &dyn std::fmt::Display| PipelineError::render(&path, e);

    let n = labels.len();
    let max = values.iter().cloned().fold(0.0_f64, f64::max);

    let root = BitMapBackend::new(&path, (820, 600)).into_drawing_area();
    root.fill(&WHITE).map_err(|e| err(&e))?;
    let (plot_area, bar_area) = root.split_horizontally(700);

    let mut chart = ChartBuilder::on(&plot_area)
        .caption(title, ("sans-serif", 22))
        .margin(15)
        .x_label_area_size(70)
        .y_label_area_size(90)
        .build_cartesian_2d(-0.5..(n as f64 - 0.5), -0.5..(n as f64 - 0.5))
        .map_err(|e| err(&e))?;

    // y grows upwards, so row i sits at n - 1 - i
    let label_at = |v: f64, flip: bool| -> String {
        let idx = v.round();
        if (v - idx).abs() > 1e-6 || idx < 0.0 || idx as usize >= n {
            return String::new();
        }
        let idx = idx as usize;
        labels[if flip { n - 1 - idx } else { idx }].to_string()
    };

    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(n)
        .y_labels(n)
        .x_label_formatter(&|v: &f64| label_at(*v, false))
        .y_label_formatter(&|v: &f64| label_at(*v, true))
        .x_desc("Alternate residue class")
        .y_desc("Reference residue class")
        .label_style(("sans-serif", 15))
        .axis_desc_style(("sans-serif", 16))
        .draw()
        .map_err(|e| err(&e))?;

    for ((i, j), value) in values.indexed_iter() {
        let t = if max > 0.0 { value / max } else { 0.0 };
        let x = j as f64;
        let y = (n - 1 - i) as f64;

        chart
            .draw_series(std::iter::once(Rectangle::new(
                [(x - 0.5, y - 0.5), (x + 0.5, y + 0.5)],
                palette.shade(t).filled(),
            )))
            .map_err(|e| err(&e))?;

        let text_colour = if t > 0.6 { WHITE } else { BLACK };
        chart
            .draw_series(std::iter::once(Text::new(
                format!("{value:.decimals$}"),
                (x - 0.12, y),
                ("sans-serif", 16).into_font().color(&text_colour),
            )))
            .map_err(|e| err(&e))?;
    }

    let top = if max > 0.0 { max } else { 1.0 };
    let mut bar = ChartBuilder::on(&bar_area)
        .margin_top(55)
        .margin_bottom(85)
        .margin_right(15)
        .y_label_area_size(75)
        .build_cartesian_2d(0.0..1.0, 0.0..top)
        .map_err(|e| err(&e))?;

    bar.configure_mesh()
        .disable_mesh()
        .disable_x_axis()
        .y_labels(5)
        .y_label_formatter(&|v: &f64| format!("{v:.decimals$}"))
        .y_desc(legend)
        .label_style(("sans-serif", 13))
        .axis_desc_style(("sans-serif", 15))
        .draw()
        .map_err(|e| err(&e))?;

    let step = top / COLOUR_STEPS as f64;
    bar.draw_series((0..COLOUR_STEPS).map(|k| {
        let t = (k as f64 + 0.5) / COLOUR_STEPS as f64;
        Rectangle::new(
            [(0.0, k as f64 * step), (1.0, (k + 1) as f64 * step)],
            palette.shade(t).filled(),
        )
    }))
    .map_err(|e| err(&e))?;

    root.present().map_err(|e| err(&e))?;
    info!("Heatmap written to {}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shade_runs_from_white_to_full_colour() {
        assert_eq!(HeatPalette::Blues.shade(0.0), RGBColor(255, 255, 255));
        assert_eq!(HeatPalette::Blues.shade(1.0), RGBColor(8, 48, 107));
        assert_eq!(HeatPalette::Greens.shade(5.0), HeatPalette::Greens.shade(1.0));
    }

    #[test]
    fn renders_annotated_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counts.png");
        let values = Array2::from_shape_vec((2, 2), vec![3.0, 1.0, 0.0, 12.0]).unwrap();

        plot_heatmap(
            &values,
            &["Nonpolar", "Polar"],
            "Test Variant Transition Counts",
            "Count",
            HeatPalette::Blues,
            0,
            &path,
        )
        .unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"\x89PNG"));
    }

    #[test]
    fn all_zero_matrix_still_renders() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("percent.png");

        plot_heatmap(
            &Array2::zeros((4, 4)),
            &["Nonpolar", "Polar", "Negative", "Positive"],
            "Empty Variant Transition (Row %)",
            "Percentage",
            HeatPalette::Greens,
            1,
            &path,
        )
        .unwrap();

        assert!(path.is_file());
    }
}
