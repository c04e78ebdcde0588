use eframe::egui::{self, Color32, RichText, Ui};
use egui_extras::{Column, TableBuilder};

use dosgen::PARAMETER_SCHEMA;

use crate::state::ViewerState;

// ---------------------------------------------------------------------------
// Left side panel – row selection and parameter table
// ---------------------------------------------------------------------------

/// Render the left panel.
pub fn side_panel(ui: &mut Ui, state: &mut ViewerState) {
    ui.heading("Row");
    ui.separator();

    if state.table.is_empty() {
        ui.label("No rows in this table.");
        return;
    }

    let last = state.table.len() - 1;
    let mut row = state.row;
    ui.horizontal(|ui: &mut Ui| {
        if ui.small_button("◀").clicked() {
            row = row.saturating_sub(1);
        }
        ui.add(egui::DragValue::new(&mut row).range(0..=last));
        if ui.small_button("▶").clicked() {
            row = (row + 1).min(last);
        }
        ui.label(format!("of {}", state.table.len()));
    });
    if row != state.row {
        state.set_row(row);
    }

    ui.add_space(8.0);
    ui.strong("Parameters");
    ui.separator();

    let Some(current) = state.current() else {
        return;
    };
    let values: Vec<f64> = std::iter::once(current.index as f64)
        .chain(current.params.values())
        .collect();

    TableBuilder::new(ui)
        .striped(true)
        .column(Column::auto().at_least(60.0))
        .column(Column::remainder())
        .header(18.0, |mut header| {
            header.col(|ui| {
                ui.strong("Name");
            });
            header.col(|ui| {
                ui.strong("Value");
            });
        })
        .body(|mut body| {
            for (name, value) in PARAMETER_SCHEMA.iter().zip(&values) {
                body.row(18.0, |mut table_row| {
                    table_row.col(|ui| {
                        ui.label(*name);
                    });
                    table_row.col(|ui| {
                        ui.monospace(format!("{value:.4}"));
                    });
                });
            }
        });

    ui.add_space(8.0);
    ui.strong("K-points");
    ui.separator();
    for kpoint in &state.descriptor.kpoints {
        ui.label(
            RichText::new(format!("{}  (band row {})", kpoint.label, kpoint.row))
                .color(state.colors.color_for(&kpoint.label)),
        );
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut ViewerState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        ui.label(format!(
            "{}  ·  {} rows  ·  {} k-points × {} points",
            state.table_path.display(),
            state.table.len(),
            state.table.labels.len(),
            state.table.n_energy
        ));

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut ViewerState) {
    let mut dialog = rfd::FileDialog::new()
        .set_title("Open DOS table")
        .add_filter("CSV", &["csv"]);
    if let Some(dir) = state.table_path.parent() {
        dialog = dialog.set_directory(dir);
    }

    if let Some(path) = dialog.pick_file() {
        state.open_table(&path);
    }
}
