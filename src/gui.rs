//! Native figure viewer using egui
//!
//! One window, one tab per figure. Discs are drawn as plot polygons, step
//! traces as lines, and the colorbar as a painted strip beside the plot.

use eframe::egui;
use egui_plot::{Corner, Legend, Line, MarkerShape, Plot, PlotPoint, Points, Polygon, Text};
use tracing::info;

use crate::figure::{disc_outline, Colorbar, Figure, LegendMarker, LegendPosition, LineStyle};
use crate::palette::Rgb;

const DISC_SEGMENTS: usize = 32;
const COLORBAR_PANEL_WIDTH: f32 = 110.0;

/// Run the native viewer on already-encoded figures
pub fn run_viewer(figures: Vec<Figure>, dataset_name: String) -> anyhow::Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1100.0, 900.0])
            .with_title(format!("Fiber Plot - {}", dataset_name)),
        ..Default::default()
    };

    info!("Opening viewer with {} figures", figures.len());
    eframe::run_native(
        "Fiber Plot",
        options,
        Box::new(|cc| Ok(Box::new(FigureApp::new(cc, figures, dataset_name)))),
    )
    .map_err(|e| anyhow::anyhow!("GUI error: {}", e))
}

struct FigureApp {
    figures: Vec<Figure>,
    active: usize,
    dataset_name: String,
}

impl FigureApp {
    fn new(cc: &eframe::CreationContext<'_>, figures: Vec<Figure>, dataset_name: String) -> Self {
        cc.egui_ctx.set_visuals(egui::Visuals::light());
        Self {
            figures,
            active: 0,
            dataset_name,
        }
    }
}

impl eframe::App for FigureApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Left panel - figure selection
        egui::SidePanel::left("figures_panel").min_width(220.0).show(ctx, |ui| {
            ui.heading("Figures");
            ui.label(&self.dataset_name);
            ui.separator();
            for (i, figure) in self.figures.iter().enumerate() {
                ui.selectable_value(&mut self.active, i, &figure.title);
            }
        });

        let Some(figure) = self.figures.get(self.active) else {
            egui::CentralPanel::default().show(ctx, |ui| {
                ui.label("No figures");
            });
            return;
        };

        if let Some(bar) = &figure.colorbar {
            egui::SidePanel::right("colorbar_panel")
                .exact_width(COLORBAR_PANEL_WIDTH)
                .resizable(false)
                .show(ctx, |ui| colorbar_strip(ui, bar));
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| ui.heading(&figure.title));
            show_figure(ui, figure);
        });
    }
}

fn show_figure(ui: &mut egui::Ui, figure: &Figure) {
    let bounds = figure.content_bounds();
    let corner = match figure.legend.position {
        LegendPosition::UpperRight | LegendPosition::UpperCenter => Corner::RightTop,
    };

    let mut plot = Plot::new(figure.id)
        .legend(Legend::default().position(corner))
        .show_grid(false)
        .x_axis_label(figure.x_label.as_str())
        .y_axis_label(figure.y_label.as_str())
        .include_x(bounds.x.0)
        .include_x(bounds.x.1)
        .include_y(bounds.y.0)
        .include_y(bounds.y.1);
    if figure.equal_aspect {
        plot = plot.data_aspect(1.0);
    }

    plot.show(ui, |plot_ui| {
        for disc in &figure.discs {
            let outline = disc_outline(disc.center, disc.radius, DISC_SEGMENTS);
            plot_ui.polygon(
                Polygon::new(outline)
                    .fill_color(color32(disc.fill))
                    .stroke(egui::Stroke::new(disc.stroke_width as f32, color32(disc.stroke))),
            );
            plot_ui.text(
                Text::new(
                    PlotPoint::new(disc.center.0, disc.center.1),
                    egui::RichText::new(&disc.label).size(9.0).strong(),
                )
                .color(color32(disc.label_color))
                .anchor(egui::Align2::CENTER_CENTER),
            );
        }

        for trace in &figure.traces {
            let points: Vec<[f64; 2]> = trace.outline().into_iter().map(|(x, y)| [x, y]).collect();
            let style = match trace.style {
                LineStyle::Solid => egui_plot::LineStyle::Solid,
                LineStyle::Dotted => egui_plot::LineStyle::Dotted { spacing: 6.0 },
            };
            plot_ui.line(
                Line::new(points)
                    .color(color32(trace.color))
                    .width(trace.width as f32)
                    .style(style)
                    .name(&trace.label),
            );
        }

        // Line entries are covered by the named traces themselves
        for entry in &figure.legend.entries {
            if entry.marker == LegendMarker::Patch {
                plot_ui.points(
                    Points::new(Vec::<[f64; 2]>::new())
                        .shape(MarkerShape::Square)
                        .filled(true)
                        .radius(5.0)
                        .color(color32(entry.color))
                        .name(&entry.label),
                );
            }
        }
    });
}

/// Vertical gradient with min at the bottom, max at the top
fn colorbar_strip(ui: &mut egui::Ui, bar: &Colorbar) {
    const STEPS: usize = 128;
    const TICKS: usize = 8;

    let avail = ui.available_size();
    let (rect, _) = ui.allocate_exact_size(avail, egui::Sense::hover());
    let painter = ui.painter_at(rect);

    let strip = egui::Rect::from_min_max(
        egui::pos2(rect.left() + 8.0, rect.top() + 40.0),
        egui::pos2(rect.left() + 30.0, rect.bottom() - 40.0),
    );
    let gradient = bar.gradient(STEPS);
    let slice = strip.height() / (STEPS - 1) as f32;
    for (i, (_, color)) in gradient.iter().take(STEPS - 1).enumerate() {
        let bottom = strip.bottom() - i as f32 * slice;
        let cell = egui::Rect::from_min_max(
            egui::pos2(strip.left(), bottom - slice - 0.5),
            egui::pos2(strip.right(), bottom),
        );
        painter.rect_filled(cell, 0.0, color32(*color));
    }
    painter.rect_stroke(strip, 0.0, egui::Stroke::new(1.0, egui::Color32::BLACK));

    let text_color = ui.visuals().text_color();
    let span = bar.scale.max - bar.scale.min;
    for i in 0..=TICKS {
        let frac = i as f64 / TICKS as f64;
        let y = strip.bottom() - strip.height() * frac as f32;
        painter.line_segment(
            [egui::pos2(strip.right(), y), egui::pos2(strip.right() + 4.0, y)],
            egui::Stroke::new(1.0, text_color),
        );
        painter.text(
            egui::pos2(strip.right() + 6.0, y),
            egui::Align2::LEFT_CENTER,
            format!("{:.3}", bar.scale.min + span * frac),
            egui::FontId::proportional(11.0),
            text_color,
        );
    }

    painter.text(
        egui::pos2(rect.center().x, rect.top() + 20.0),
        egui::Align2::CENTER_CENTER,
        &bar.label,
        egui::FontId::proportional(11.0),
        text_color,
    );
}

fn color32(color: Rgb) -> egui::Color32 {
    egui::Color32::from_rgb(color.r, color.g, color.b)
}
