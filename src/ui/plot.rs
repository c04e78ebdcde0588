use eframe::egui::{Color32, RichText, Ui};
use egui_plot::{HLine, Legend, Line, LineStyle, Plot, PlotPoints};

use crate::state::ViewerState;

// ---------------------------------------------------------------------------
// DOS plots (central panel)
// ---------------------------------------------------------------------------

/// One panel per k-point, DOS on the horizontal axis and energy on the
/// vertical one, with the Fermi level marked at zero.
pub fn dos_plots(ui: &mut Ui, state: &ViewerState) {
    let curves = state.curves();
    if curves.is_empty() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Table has no rows  (File → Open…)");
        });
        return;
    }

    let index = state.current().map_or(state.row, |row| row.index);
    ui.label(RichText::new(state.title()).monospace());
    ui.separator();

    ui.columns(curves.len(), |columns| {
        for (k, (ui, curve)) in columns.iter_mut().zip(&curves).enumerate() {
            ui.strong(&curve.label);

            Plot::new(format!("dos_{}", curve.label))
                .legend(Legend::default())
                .x_axis_label("DOS")
                .y_axis_label(if k == 0 { "Energy" } else { "" })
                .allow_boxed_zoom(true)
                .allow_drag(true)
                .allow_scroll(true)
                .allow_zoom(true)
                .show(ui, |plot_ui| {
                    let points: PlotPoints = curve.points.iter().copied().collect();
                    plot_ui.line(
                        Line::new(points)
                            .name(format!("idx={index}"))
                            .color(state.colors.color_for(&curve.label))
                            .width(1.5),
                    );
                    plot_ui.hline(
                        HLine::new(0.0)
                            .color(Color32::GRAY)
                            .style(LineStyle::dashed_loose())
                            .name("Fermi level"),
                    );
                });
        }
    });
}
