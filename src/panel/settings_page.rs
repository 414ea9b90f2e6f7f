use eframe::egui::{self, RichText, Ui};

use super::{theme, PanelAction, SettingsPanel};

pub fn draw(panel: &mut SettingsPanel, ctx: &egui::Context) -> Vec<PanelAction> {
    let mut actions = Vec::new();

    egui::CentralPanel::default()
        .frame(egui::Frame::none())
        .show(ctx, |ui| {
            let background = ui.interact(
                ui.max_rect(),
                ui.id().with("settings_drag"),
                egui::Sense::drag(),
            );
            if background.drag_started() {
                ctx.send_viewport_cmd(egui::ViewportCommand::StartDrag);
            }

            theme::panel_frame().show(ui, |ui| {
                ui.set_min_size(ui.available_size());
                if panel.restart_notice {
                    draw_restart_notice(ui, &mut actions);
                } else {
                    draw_controls(panel, ui, &mut actions);
                }
            });
        });

    if ctx.input(|i| i.viewport().close_requested()) {
        actions.push(PanelAction::Close);
    }
    actions
}

fn draw_controls(panel: &mut SettingsPanel, ui: &mut Ui, actions: &mut Vec<PanelAction>) {
    ui.horizontal(|ui| {
        ui.label(RichText::new("Settings").size(18.0).strong());
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if theme::close_button(ui).clicked() {
                actions.push(PanelAction::Close);
            }
        });
    });
    theme::status_line(ui, &panel.model_path);

    if theme::wide_button(ui, "Change Model").clicked() {
        actions.push(PanelAction::ChangeModel);
    }
    if theme::wide_button(ui, "Open Task Manager").clicked() {
        actions.push(PanelAction::OpenTaskManager);
    }
    if theme::wide_button(ui, "Open Desktop Folder").clicked() {
        actions.push(PanelAction::OpenDesktop);
    }

    ui.horizontal(|ui| {
        let input_w = (ui.available_width() - 68.0).max(120.0);
        ui.add_sized(
            [input_w, 36.0],
            egui::TextEdit::singleline(&mut panel.custom_path_input)
                .hint_text("Custom launch path"),
        );
        if ui
            .add_sized([60.0, 36.0], egui::Button::new(RichText::new("Start").strong()))
            .clicked()
        {
            actions.push(PanelAction::StartCustom(panel.custom_path_input.clone()));
        }
    });

    if theme::wide_button(ui, panel.mute_label()).clicked() {
        actions.push(PanelAction::ToggleMute);
    }
    if theme::wide_button(ui, "Close").clicked() {
        actions.push(PanelAction::QuitApp);
    }
    if theme::wide_button(ui, panel.auto_movement_label()).clicked() {
        actions.push(PanelAction::ToggleAutoMovement);
    }

    if let Some(status) = panel.status.as_deref() {
        theme::status_line(ui, status);
    }
}

fn draw_restart_notice(ui: &mut Ui, actions: &mut Vec<PanelAction>) {
    ui.add_space(40.0);
    ui.vertical_centered(|ui| {
        ui.label(RichText::new("Settings saved").size(18.0).strong());
        ui.label("Settings saved, restarting...");
        ui.add_space(20.0);
        if ui
            .add_sized([120.0, 36.0], egui::Button::new(RichText::new("OK").strong()))
            .clicked()
        {
            actions.push(PanelAction::ConfirmRestart);
        }
    });
}
