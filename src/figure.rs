//! Figure model - backend-independent drawing primitives
//!
//! Encoders build a `Figure`; the PNG exporter and the GUI viewer draw it.

use crate::palette::{ColorScale, GroupId, Rgb};

/// Axis-aligned view rectangle in data units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewBounds {
    pub x: (f64, f64),
    pub y: (f64, f64),
}

impl ViewBounds {
    pub fn width(&self) -> f64 {
        self.x.1 - self.x.0
    }

    pub fn height(&self) -> f64 {
        self.y.1 - self.y.0
    }
}

/// Filled, outlined circle with a centered text label
#[derive(Debug, Clone, PartialEq)]
pub struct Disc {
    pub center: (f64, f64),
    pub radius: f64,
    pub fill: Rgb,
    pub stroke: Rgb,
    pub stroke_width: f64,
    pub label: String,
    pub label_color: Rgb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    Solid,
    Dotted,
}

/// Unfilled step outline of one histogram
#[derive(Debug, Clone, PartialEq)]
pub struct StepTrace {
    pub group: GroupId,
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
    pub color: Rgb,
    pub width: f64,
    pub style: LineStyle,
    pub label: String,
}

impl StepTrace {
    /// Step polyline: up from the first edge, across each bin, down at the last edge
    pub fn outline(&self) -> Vec<(f64, f64)> {
        if self.edges.len() < 2 {
            return Vec::new();
        }
        let mut points = Vec::with_capacity(2 * self.counts.len() + 2);
        points.push((self.edges[0], 0.0));
        for (i, &count) in self.counts.iter().enumerate() {
            points.push((self.edges[i], count as f64));
            points.push((self.edges[i + 1], count as f64));
        }
        points.push((self.edges[self.counts.len()], 0.0));
        points
    }

    pub fn max_count(&self) -> usize {
        self.counts.iter().copied().max().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegendMarker {
    Patch,
    Line(LineStyle),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub label: String,
    pub color: Rgb,
    pub marker: LegendMarker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegendPosition {
    UpperRight,
    UpperCenter,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Legend {
    pub position: LegendPosition,
    pub columns: usize,
    pub entries: Vec<LegendEntry>,
}

impl Legend {
    pub fn empty() -> Self {
        Self {
            position: LegendPosition::UpperRight,
            columns: 1,
            entries: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Gradient strip next to a continuous-color plot
#[derive(Debug, Clone, PartialEq)]
pub struct Colorbar {
    pub label: String,
    pub scale: ColorScale,
}

impl Colorbar {
    /// `steps` colors evenly spaced from the scale minimum to its maximum
    pub fn gradient(&self, steps: usize) -> Vec<(f64, Rgb)> {
        let steps = steps.max(2);
        let span = self.scale.max - self.scale.min;
        (0..steps)
            .map(|i| {
                let value = self.scale.min + span * i as f64 / (steps - 1) as f64;
                (value, self.scale.color_of(value))
            })
            .collect()
    }
}

/// One rendered plot
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub id: &'static str,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    /// Output size in pixels
    pub size: (u32, u32),
    /// Explicit view; `None` lets the backend fit the content
    pub view: Option<ViewBounds>,
    pub equal_aspect: bool,
    pub discs: Vec<Disc>,
    pub traces: Vec<StepTrace>,
    pub legend: Legend,
    pub colorbar: Option<Colorbar>,
}

impl Figure {
    /// Bounds covering all content: the explicit view if set, else traces with headroom
    pub fn content_bounds(&self) -> ViewBounds {
        if let Some(view) = self.view {
            return view;
        }

        let mut x = (f64::INFINITY, f64::NEG_INFINITY);
        for trace in &self.traces {
            if let (Some(&lo), Some(&hi)) = (trace.edges.first(), trace.edges.last()) {
                x = (x.0.min(lo), x.1.max(hi));
            }
        }
        if x.0 >= x.1 {
            x = (0.0, 1.0);
        }

        let y_max = self.traces.iter().map(StepTrace::max_count).max().unwrap_or(0);
        let y_max = (y_max as f64 * 1.05).max(1.0);

        ViewBounds { x, y: (0.0, y_max) }
    }
}

/// Polygon approximation of a disc, counter-clockwise, not closed
pub fn disc_outline(center: (f64, f64), radius: f64, segments: usize) -> Vec<[f64; 2]> {
    let segments = segments.max(3);
    (0..segments)
        .map(|i| {
            let angle = std::f64::consts::TAU * i as f64 / segments as f64;
            [center.0 + radius * angle.cos(), center.1 + radius * angle.sin()]
        })
        .collect()
}
