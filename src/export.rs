//! PNG export
//!
//! Draws each figure into an RGB buffer with plotters, saves it through
//! `image`, and writes an index.json describing the generated files.

use anyhow::{anyhow, Result};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::figure::{Colorbar, Figure, LegendMarker, LegendPosition, LineStyle};
use crate::palette::Rgb;

type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

const MARGIN: i32 = 10;
const CAPTION_FONT: i32 = 20;
/// Caption text plus the gap plotters leaves below it
const CAPTION_HEIGHT: i32 = CAPTION_FONT + 10;
const X_LABEL_AREA: i32 = 40;
const Y_LABEL_AREA: i32 = 60;
const LABEL_FONT: i32 = 12;
const DESC_FONT: i32 = 14;
const COLORBAR_WIDTH: u32 = 130;
const COLORBAR_MARGIN: i32 = 5;
/// Room right of the strip for tick labels and the rotated title
const COLORBAR_LABEL_AREA: i32 = 85;

/// Dotted line pattern, in pixels
const DOT_LEN: f64 = 2.0;
const DOT_GAP: f64 = 3.0;

/// Render every figure to `<output_dir>/<figure id>.png` plus index.json
pub fn render_all(
    figures: &[Figure],
    output_dir: &Path,
    dataset_name: &str,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)?;

    let mut written = Vec::new();
    let mut index_entries: Vec<serde_json::Value> = Vec::new();

    for figure in figures {
        let filename = format!("{}.png", figure.id);
        let out_path = output_dir.join(&filename);
        write_png(figure, &out_path)?;

        index_entries.push(serde_json::json!({
            "id": figure.id,
            "title": figure.title,
            "file": filename,
            "width": figure.size.0,
            "height": figure.size.1,
            "legend": {
                "entries": figure.legend.entries.len(),
                "columns": figure.legend.columns,
            },
        }));
        written.push(out_path);
    }

    let index = serde_json::json!({
        "generated": chrono::Local::now().to_rfc3339(),
        "dataset": dataset_name,
        "figures": index_entries,
    });
    let index_path = output_dir.join("index.json");
    std::fs::write(&index_path, serde_json::to_string_pretty(&index)?)?;
    info!("Wrote {}", index_path.display());

    Ok(written)
}

/// Render one figure and save it as PNG
pub fn write_png(figure: &Figure, path: &Path) -> Result<()> {
    let img = render_figure(figure)?;
    img.save(path)
        .map_err(|e| anyhow!("Failed to save {}: {}", path.display(), e))?;
    info!("Saved {}", path.display());
    Ok(())
}

/// Rasterize a figure
pub fn render_figure(figure: &Figure) -> Result<image::RgbImage> {
    let (width, height) = figure.size;
    let mut pixels = vec![0u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut pixels, (width, height)).into_drawing_area();
        root.fill(&WHITE)?;
        draw_figure(&root, figure)?;
        root.present()?;
    }

    image::RgbImage::from_raw(width, height, pixels)
        .ok_or_else(|| anyhow!("Pixel buffer does not match {}x{}", width, height))
}

fn draw_figure(root: &Area<'_>, figure: &Figure) -> Result<()> {
    let (width, _) = root.dim_in_pixel();
    let (plot_area, bar_area) = match &figure.colorbar {
        Some(_) if width > COLORBAR_WIDTH => {
            let (left, right) = root.split_horizontally((width - COLORBAR_WIDTH) as i32);
            (left, Some(right))
        }
        _ => (root.clone(), None),
    };

    let view = figure.content_bounds();
    let plot_area = if figure.equal_aspect {
        let (w, h) = plot_area.dim_in_pixel();
        let inner = (
            w as f64 - (2 * MARGIN + Y_LABEL_AREA) as f64,
            h as f64 - (2 * MARGIN + X_LABEL_AREA + CAPTION_HEIGHT) as f64,
        );
        let (extra_w, extra_h) = fit_equal_aspect(inner, (view.width(), view.height()));
        let (dx, dy) = ((extra_w / 2.0) as i32, (extra_h / 2.0) as i32);
        plot_area.margin(dy, dy, dx, dx)
    } else {
        plot_area
    };

    let mut chart = ChartBuilder::on(&plot_area)
        .caption(&figure.title, ("sans-serif", CAPTION_FONT))
        .margin(MARGIN)
        .x_label_area_size(X_LABEL_AREA)
        .y_label_area_size(Y_LABEL_AREA)
        .build_cartesian_2d(view.x.0..view.x.1, view.y.0..view.y.1)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .label_style(("sans-serif", LABEL_FONT))
        .axis_desc_style(("sans-serif", DESC_FONT))
        .x_desc(figure.x_label.as_str())
        .y_desc(figure.y_label.as_str())
        .draw()?;

    for disc in &figure.discs {
        let center = chart.backend_coord(&disc.center);
        let edge = chart.backend_coord(&(disc.center.0 + disc.radius, disc.center.1));
        let radius_px = (edge.0 - center.0).abs().max(1);
        let stroke_px = disc.stroke_width.ceil().max(1.0) as u32;

        root.draw(&Circle::new(center, radius_px, to_plotters(disc.fill).filled()))?;
        let stroke = to_plotters(disc.stroke).stroke_width(stroke_px);
        root.draw(&Circle::new(center, radius_px, stroke))?;

        let font_px = (radius_px as f64 * 0.9).clamp(6.0, 14.0);
        let style = ("sans-serif", font_px, FontStyle::Bold)
            .into_font()
            .color(&to_plotters(disc.label_color))
            .pos(Pos::new(HPos::Center, VPos::Center));
        root.draw(&Text::new(disc.label.clone(), center, style))?;
    }

    for trace in &figure.traces {
        let color = to_plotters(trace.color);
        let style = color.stroke_width(trace.width.round().max(1.0) as u32);
        debug!("Drawing group {} trace ({:?})", trace.group, trace.style);
        match trace.style {
            LineStyle::Solid => {
                chart.draw_series(LineSeries::new(trace.outline(), style))?;
            }
            LineStyle::Dotted => {
                let pixels: Vec<(i32, i32)> = trace
                    .outline()
                    .iter()
                    .map(|p| chart.backend_coord(p))
                    .collect();
                for segment in dash_segments(&pixels, DOT_LEN, DOT_GAP) {
                    root.draw(&PathElement::new(segment, style))?;
                }
            }
        }
    }

    if !figure.legend.is_empty() {
        for entry in &figure.legend.entries {
            let color = to_plotters(entry.color);
            let series = chart
                .draw_series(std::iter::empty::<Circle<(f64, f64), i32>>())?
                .label(entry.label.as_str());
            match entry.marker {
                LegendMarker::Patch => {
                    series.legend(move |(x, y)| {
                        Rectangle::new([(x, y - 5), (x + 12, y + 5)], color.filled())
                    });
                }
                LegendMarker::Line(LineStyle::Solid) => {
                    series.legend(move |(x, y)| {
                        PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
                    });
                }
                LegendMarker::Line(LineStyle::Dotted) => {
                    series.legend(move |(x, y)| {
                        EmptyElement::at((x, y))
                            + PathElement::new(vec![(0, 0), (3, 0)], color.stroke_width(2))
                            + PathElement::new(vec![(8, 0), (11, 0)], color.stroke_width(2))
                            + PathElement::new(vec![(16, 0), (19, 0)], color.stroke_width(2))
                    });
                }
            }
        }

        let position = match figure.legend.position {
            LegendPosition::UpperRight => SeriesLabelPosition::UpperRight,
            LegendPosition::UpperCenter => SeriesLabelPosition::UpperMiddle,
        };
        chart
            .configure_series_labels()
            .position(position)
            .label_font(("sans-serif", 11))
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }

    if let (Some(bar), Some(area)) = (&figure.colorbar, bar_area) {
        draw_colorbar(&area, bar)?;
    }

    Ok(())
}

fn draw_colorbar(area: &Area<'_>, bar: &Colorbar) -> Result<()> {
    let scale = bar.scale;
    let mut chart = ChartBuilder::on(area)
        .margin_top(MARGIN + CAPTION_HEIGHT)
        .margin_bottom(MARGIN + X_LABEL_AREA)
        .margin_left(COLORBAR_MARGIN)
        .margin_right(COLORBAR_MARGIN)
        .right_y_label_area_size(COLORBAR_LABEL_AREA)
        .build_cartesian_2d(0.0f64..1.0f64, scale.min..scale.max)?;

    let gradient = bar.gradient(128);
    chart.draw_series(gradient.windows(2).map(|w| {
        Rectangle::new([(0.0, w[0].0), (1.0, w[1].0)], to_plotters(w[0].1).filled())
    }))?;

    chart
        .configure_mesh()
        .disable_mesh()
        .disable_x_axis()
        .y_labels(8)
        .y_label_style(("sans-serif", LABEL_FONT))
        .axis_desc_style(("sans-serif", LABEL_FONT))
        .y_desc(bar.label.as_str())
        .draw()?;

    Ok(())
}

fn to_plotters(color: Rgb) -> RGBColor {
    RGBColor(color.r, color.g, color.b)
}

/// Pixels to trim from (width, height) so both axes share one scale
pub fn fit_equal_aspect(inner: (f64, f64), span: (f64, f64)) -> (f64, f64) {
    let (w, h) = inner;
    let (sx, sy) = span;
    if w <= 0.0 || h <= 0.0 || sx <= 0.0 || sy <= 0.0 {
        return (0.0, 0.0);
    }

    let ratio = sy / sx;
    if h / w > ratio {
        (0.0, h - w * ratio)
    } else {
        (w - h / ratio, 0.0)
    }
}

/// Split a pixel polyline into dashes of `dash` px separated by `gap` px
pub fn dash_segments(points: &[(i32, i32)], dash: f64, gap: f64) -> Vec<Vec<(i32, i32)>> {
    let mut segments = Vec::new();
    if dash <= 0.0 {
        return segments;
    }

    let mut current: Vec<(i32, i32)> = Vec::new();
    let mut drawing = true;
    let mut remaining = dash;

    for pair in points.windows(2) {
        let (x0, y0) = (pair[0].0 as f64, pair[0].1 as f64);
        let (x1, y1) = (pair[1].0 as f64, pair[1].1 as f64);
        let len = (x1 - x0).hypot(y1 - y0);
        if len == 0.0 {
            continue;
        }
        let at = |d: f64| {
            let t = d / len;
            ((x0 + (x1 - x0) * t).round() as i32, (y0 + (y1 - y0) * t).round() as i32)
        };

        let mut travelled = 0.0;
        while travelled < len {
            let step = remaining.min(len - travelled);
            if drawing {
                if current.is_empty() {
                    current.push(at(travelled));
                }
                current.push(at(travelled + step));
            }
            travelled += step;
            remaining -= step;

            if remaining <= 1e-9 {
                if drawing {
                    segments.push(std::mem::take(&mut current));
                }
                drawing = !drawing;
                remaining = if drawing { dash } else { gap.max(0.0) };
                if remaining <= 0.0 {
                    drawing = true;
                    remaining = dash;
                }
            }
        }
    }

    if current.len() >= 2 {
        segments.push(current);
    }
    segments
}
