use std::path::PathBuf;

use eframe::egui;

use dosgen::{AssembledTable, Descriptor, EnergyGrid, Settings};

use crate::state::ViewerState;
use crate::ui::{panels, plot};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct DosViewerApp {
    pub state: ViewerState,
}

impl DosViewerApp {
    pub fn new(
        settings: Settings,
        table_path: PathBuf,
        descriptor: Descriptor,
        table: AssembledTable,
        grid: EnergyGrid,
        row: usize,
    ) -> Self {
        Self {
            state: ViewerState::new(settings, table_path, descriptor, table, grid, row),
        }
    }
}

impl eframe::App for DosViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: row selection and parameters ----
        egui::SidePanel::left("row_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: one plot per k-point ----
        egui::CentralPanel::default().show(ctx, |ui| {
            plot::dos_plots(ui, &self.state);
        });
    }
}
