//! Encoders - dataset rows to figure primitives
//!
//! Three independent, stateless mappings:
//! - `group_scatter`: disc per fiber, colored by group
//! - `telecentricity_scatter`: disc per fiber, colored by non-telecentricity
//! - `telecentricity_histogram`: step histogram per group

use crate::dataset::{Dataset, Record};
use crate::figure::{
    Colorbar, Disc, Figure, Legend, LegendEntry, LegendMarker, LegendPosition, LineStyle,
    StepTrace, ViewBounds,
};
use crate::histogram::{bin_counts, BinSpec};
use crate::palette::{ColorScale, GroupId, GroupPalette, Rgb};

/// Margin around the fibers, in data units (mm)
const VIEW_MARGIN: f64 = 1.0;
const DISC_STROKE_WIDTH: f64 = 0.5;
const TRACE_WIDTH: f64 = 2.0;

const SCATTER_SIZE: (u32, u32) = (800, 800);
const HISTOGRAM_SIZE: (u32, u32) = (800, 600);

pub const GROUP_SCATTER_ID: &str = "group_scatter";
pub const TELE_SCATTER_ID: &str = "telecentricity_scatter";
pub const TELE_HISTOGRAM_ID: &str = "telecentricity_histogram";

/// Parameters shared by both scatter encoders
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScatterOptions {
    /// Disc radius in data units
    pub radius: f64,
}

impl Default for ScatterOptions {
    fn default() -> Self {
        Self { radius: 0.185 }
    }
}

/// Fiber positions colored by group, with a per-group count legend
pub fn group_scatter(data: &Dataset, palette: &GroupPalette, opts: &ScatterOptions) -> Figure {
    let discs = data
        .iter()
        .map(|r| fiber_disc(r, palette.color_of(r.group), opts.radius))
        .collect();

    // Every registered group appears, even with zero fibers; unregistered groups never do
    let entries = data
        .group_counts(palette)
        .into_iter()
        .map(|(id, count)| LegendEntry {
            label: group_label(id, count),
            color: palette.color_of(id),
            marker: LegendMarker::Patch,
        })
        .collect();

    let unlisted = data.unlisted_count(palette);
    if unlisted > 0 {
        tracing::warn!(
            "{} fibers have unregistered groups and are left out of the legend",
            unlisted
        );
    }
    tracing::debug!("Group scatter: {} discs", data.len());

    Figure {
        id: GROUP_SCATTER_ID,
        title: "Fiber positions colored by Group".to_string(),
        x_label: "X location (mm)".to_string(),
        y_label: "Y location (mm)".to_string(),
        size: SCATTER_SIZE,
        view: Some(view_bounds(data)),
        equal_aspect: true,
        discs,
        traces: Vec::new(),
        legend: Legend {
            position: LegendPosition::UpperRight,
            columns: 1,
            entries,
        },
        colorbar: None,
    }
}

/// Fiber positions shaded by non-telecentricity on a fixed scale
pub fn telecentricity_scatter(data: &Dataset, scale: &ColorScale, opts: &ScatterOptions) -> Figure {
    let discs = data
        .iter()
        .map(|r| fiber_disc(r, scale.color_of(r.non_telecentricity), opts.radius))
        .collect();

    tracing::debug!(
        "Telecentricity scatter: {} discs, scale [{}, {}]",
        data.len(),
        scale.min,
        scale.max
    );

    Figure {
        id: TELE_SCATTER_ID,
        title: "Fiber positions shaded by Non-telecentricity".to_string(),
        x_label: "X location (mm)".to_string(),
        y_label: "Y location (mm)".to_string(),
        size: SCATTER_SIZE,
        view: Some(view_bounds(data)),
        equal_aspect: true,
        discs,
        traces: Vec::new(),
        legend: Legend::empty(),
        colorbar: Some(Colorbar {
            label: "Non-telecentricity (degree)".to_string(),
            scale: *scale,
        }),
    }
}

/// Overlaid step histograms of non-telecentricity, one per populated group
pub fn telecentricity_histogram(data: &Dataset, palette: &GroupPalette, bins: &BinSpec) -> Figure {
    let edges = bins.edges(&data.all_tele_values());
    let ids: Vec<GroupId> = palette.ids().collect();

    let mut traces = Vec::new();
    let mut entries = Vec::new();
    for (i, &id) in ids.iter().enumerate() {
        let values = data.tele_values(id);
        if values.is_empty() {
            continue;
        }

        let style = half_split_style(i, ids.len());
        let color = palette.color_of(id);
        let label = group_label(id, values.len());

        entries.push(LegendEntry {
            label: label.clone(),
            color,
            marker: LegendMarker::Line(style),
        });
        traces.push(StepTrace {
            group: id,
            counts: bin_counts(&values, &edges),
            edges: edges.clone(),
            color,
            width: TRACE_WIDTH,
            style,
            label,
        });
    }

    tracing::debug!(
        "Histogram: {} traces over {} bins",
        traces.len(),
        edges.len().saturating_sub(1)
    );

    Figure {
        id: TELE_HISTOGRAM_ID,
        title: "Distribution of Non-telecentricity by Group".to_string(),
        x_label: "Δθ (degree)".to_string(),
        y_label: "N".to_string(),
        size: HISTOGRAM_SIZE,
        view: None,
        equal_aspect: false,
        discs: Vec::new(),
        traces,
        legend: Legend {
            position: LegendPosition::UpperCenter,
            columns: 4,
            entries,
        },
        colorbar: None,
    }
}

/// Solid for the first `len / 2` groups, dotted for the rest
pub fn half_split_style(index: usize, len: usize) -> LineStyle {
    if index < len / 2 {
        LineStyle::Solid
    } else {
        LineStyle::Dotted
    }
}

/// Data range padded by one unit on every side
pub fn view_bounds(data: &Dataset) -> ViewBounds {
    let pad = |range: Option<(f64, f64)>| {
        let (lo, hi) = range.unwrap_or((0.0, 0.0));
        (lo - VIEW_MARGIN, hi + VIEW_MARGIN)
    };
    ViewBounds {
        x: pad(data.x_range()),
        y: pad(data.y_range()),
    }
}

fn group_label(id: GroupId, count: usize) -> String {
    format!("Group {} (n={})", id, count)
}

fn fiber_disc(record: &Record, fill: Rgb, radius: f64) -> Disc {
    Disc {
        center: (record.x, record.y),
        radius,
        fill,
        stroke: Rgb::BLACK,
        stroke_width: DISC_STROKE_WIDTH,
        label: record.label(),
        label_color: Rgb::WHITE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: f64, x: f64, y: f64, group: GroupId, tele: f64) -> Record {
        Record {
            fiber_id: id,
            x,
            y,
            group,
            non_telecentricity: tele,
        }
    }

    fn grid(n: usize) -> Dataset {
        Dataset::new(
            (0..n)
                .map(|i| {
                    let group = (i % 8) as GroupId + 1;
                    record(i as f64, i as f64, -(i as f64), group, 0.01 * i as f64)
                })
                .collect(),
        )
    }

    #[test]
    fn test_one_disc_per_record() {
        let palette = GroupPalette::default();
        let scale = ColorScale::default();
        let opts = ScatterOptions::default();
        for n in [0, 1, 7, 50] {
            let data = grid(n);
            assert_eq!(group_scatter(&data, &palette, &opts).discs.len(), n);
            assert_eq!(telecentricity_scatter(&data, &scale, &opts).discs.len(), n);
        }
    }

    #[test]
    fn test_empty_dataset_legend() {
        let fig = group_scatter(
            &Dataset::default(),
            &GroupPalette::default(),
            &ScatterOptions::default(),
        );
        assert_eq!(fig.legend.entries.len(), 8);
        assert!(fig.legend.entries.iter().all(|e| e.label.ends_with("(n=0)")));
        assert_eq!(fig.view, Some(ViewBounds { x: (-1.0, 1.0), y: (-1.0, 1.0) }));
    }

    #[test]
    fn test_view_bounds_margin() {
        let data = Dataset::new(vec![
            record(1.0, 0.0, 2.0, 1, 0.0),
            record(2.0, 10.0, -3.0, 1, 0.0),
            record(3.0, 4.0, 0.5, 1, 0.0),
        ]);
        let view = view_bounds(&data);
        assert_eq!(view.x, (-1.0, 11.0));
        assert_eq!(view.y, (-4.0, 3.0));
    }

    #[test]
    fn test_legend_fixed_order_and_totals() {
        let data = Dataset::new(vec![
            record(1.0, 0.0, 0.0, 8, 0.1),
            record(2.0, 0.0, 0.0, 8, 0.1),
            record(3.0, 0.0, 0.0, 3, 0.1),
            record(4.0, 0.0, 0.0, 12, 0.1),
        ]);
        let palette = GroupPalette::default();
        let fig = group_scatter(&data, &palette, &ScatterOptions::default());
        let labels: Vec<_> = fig.legend.entries.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "Group 1 (n=0)",
                "Group 2 (n=0)",
                "Group 3 (n=1)",
                "Group 4 (n=0)",
                "Group 5 (n=0)",
                "Group 6 (n=0)",
                "Group 7 (n=0)",
                "Group 8 (n=2)",
            ]
        );
        let total: usize = data.group_counts(&palette).iter().map(|(_, n)| n).sum();
        assert_eq!(total + data.unlisted_count(&palette), data.len());
    }

    #[test]
    fn test_group_scatter_end_to_end() {
        let data = Dataset::new(vec![
            record(1.0, 0.0, 0.0, 1, 0.1),
            record(2.0, 1.0, 1.0, 9, 0.1),
        ]);
        let palette = GroupPalette::default();
        let fig = group_scatter(&data, &palette, &ScatterOptions { radius: 0.185 });

        assert_eq!(fig.discs[0].fill, Rgb::parse("#1f77b4").unwrap());
        assert_eq!(fig.discs[1].fill, Rgb::GRAY);
        assert_eq!(fig.discs[0].label, "1");
        assert_eq!(fig.discs[1].label, "2");
        assert_eq!(fig.discs[0].radius, 0.185);
        assert_eq!(fig.discs[0].stroke, Rgb::BLACK);

        assert!(fig.legend.entries.iter().any(|e| e.label == "Group 1 (n=1)"));
        assert!(!fig.legend.entries.iter().any(|e| e.label.starts_with("Group 9")));
    }

    #[test]
    fn test_tele_scatter_clamps_colors() {
        let data = Dataset::new(vec![
            record(1.0, 0.0, 0.0, 1, -1.0),
            record(2.0, 1.0, 0.0, 1, 5.0),
            record(3.0, 2.0, 0.0, 1, -0.05),
            record(4.0, 3.0, 0.0, 1, 0.30),
        ]);
        let scale = ColorScale::default();
        let fig = telecentricity_scatter(&data, &scale, &ScatterOptions::default());
        assert_eq!(fig.discs[0].fill, fig.discs[2].fill);
        assert_eq!(fig.discs[1].fill, fig.discs[3].fill);
        assert_ne!(fig.discs[0].fill, fig.discs[1].fill);

        let bar = fig.colorbar.expect("colorbar");
        assert_eq!(bar.scale, scale);
        assert!(fig.legend.is_empty());
    }

    #[test]
    fn test_half_split_even_and_odd() {
        let even: Vec<_> = (0..8).map(|i| half_split_style(i, 8)).collect();
        assert_eq!(even.iter().filter(|s| **s == LineStyle::Solid).count(), 4);
        assert!(even[..4].iter().all(|s| *s == LineStyle::Solid));
        assert!(even[4..].iter().all(|s| *s == LineStyle::Dotted));

        let odd: Vec<_> = (0..7).map(|i| half_split_style(i, 7)).collect();
        assert!(odd[..3].iter().all(|s| *s == LineStyle::Solid));
        assert!(odd[3..].iter().all(|s| *s == LineStyle::Dotted));
    }

    #[test]
    fn test_histogram_styles_follow_registry_index() {
        let palette = GroupPalette::from_hex(
            (1..=7).map(|id| (id, "#000000")),
            "gray",
        )
        .unwrap();
        let data = grid(14);
        let fig = telecentricity_histogram(&data, &palette, &BinSpec::default());
        let styles: Vec<_> = fig.traces.iter().map(|t| (t.group, t.style)).collect();
        assert_eq!(styles.len(), 7);
        assert_eq!(styles[2], (3, LineStyle::Solid));
        assert_eq!(styles[3], (4, LineStyle::Dotted));
    }

    #[test]
    fn test_histogram_skips_empty_groups() {
        let data = Dataset::new(
            [1, 2, 3, 4, 6, 7, 8]
                .iter()
                .enumerate()
                .map(|(i, &g)| record(i as f64, 0.0, 0.0, g, 0.05))
                .collect(),
        );
        let fig = telecentricity_histogram(&data, &GroupPalette::default(), &BinSpec::default());
        assert_eq!(fig.traces.len(), 7);
        assert!(fig.traces.iter().all(|t| t.group != 5));
        assert!(!fig.legend.entries.iter().any(|e| e.label.starts_with("Group 5")));
        // Group 6 keeps its registry position, so it is still dotted
        let six = fig.traces.iter().find(|t| t.group == 6).unwrap();
        assert_eq!(six.style, LineStyle::Dotted);
    }

    #[test]
    fn test_histogram_counts_and_labels() {
        let data = Dataset::new(vec![
            record(1.0, 0.0, 0.0, 2, 0.012),
            record(2.0, 0.0, 0.0, 2, 0.013),
            record(3.0, 0.0, 0.0, 2, 0.5),
            record(4.0, 0.0, 0.0, 4, 0.0),
        ]);
        let bins = BinSpec::Range { start: 0.0, stop: 0.401, step: 0.005 };
        let fig = telecentricity_histogram(&data, &GroupPalette::default(), &bins);

        assert_eq!(fig.traces.len(), 2);
        let two = &fig.traces[0];
        assert_eq!(two.label, "Group 2 (n=3)");
        assert_eq!(two.edges.len(), 81);
        assert_eq!(two.counts[2], 2);
        // 0.5 lies past the last edge
        assert_eq!(two.counts.iter().sum::<usize>(), 2);
        assert_eq!(fig.traces[1].counts[0], 1);
        assert_eq!(fig.legend.columns, 4);
    }

    #[test]
    fn test_histogram_default_bins_shared() {
        let data = grid(16);
        let fig = telecentricity_histogram(&data, &GroupPalette::default(), &BinSpec::default());
        assert_eq!(fig.traces.len(), 8);
        for t in &fig.traces {
            assert_eq!(t.edges.len(), 13);
            assert_eq!(t.edges, fig.traces[0].edges);
            assert_eq!(t.counts.iter().sum::<usize>(), 2);
        }
    }

    #[test]
    fn test_histogram_empty_dataset() {
        let fig = telecentricity_histogram(
            &Dataset::default(),
            &GroupPalette::default(),
            &BinSpec::default(),
        );
        assert!(fig.traces.is_empty());
        assert!(fig.legend.is_empty());
    }
}
