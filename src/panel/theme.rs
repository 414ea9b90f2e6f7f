use eframe::egui::{self, Color32, Context, Frame, RichText, Rounding, Style, Ui, Visuals};

pub const COLOR_BG: Color32 = Color32::WHITE;
pub const COLOR_ACCENT: Color32 = Color32::from_rgb(0, 123, 255); // #007bff
pub const COLOR_ACCENT_HOVER: Color32 = Color32::from_rgb(0, 105, 217);
pub const COLOR_ACCENT_PRESSED: Color32 = Color32::from_rgb(0, 86, 179);
pub const COLOR_TEXT: Color32 = Color32::from_rgb(33, 37, 41);
pub const COLOR_MUTED: Color32 = Color32::from_rgb(108, 117, 125);
pub const COLOR_BORDER: Color32 = Color32::from_rgb(222, 226, 230);
pub const COLOR_RED: Color32 = Color32::from_rgb(220, 53, 69);

pub fn apply_theme(ctx: &Context) {
    let mut style = Style::default();
    let mut visuals = Visuals::light();

    visuals.window_fill = COLOR_BG;
    visuals.panel_fill = COLOR_BG;
    visuals.override_text_color = Some(COLOR_TEXT);

    // Buttons
    visuals.widgets.inactive.bg_fill = COLOR_ACCENT;
    visuals.widgets.inactive.weak_bg_fill = COLOR_ACCENT;
    visuals.widgets.inactive.fg_stroke = egui::Stroke::new(1.0, Color32::WHITE);
    visuals.widgets.inactive.bg_stroke = egui::Stroke::NONE;
    visuals.widgets.inactive.rounding = Rounding::same(5.0);

    visuals.widgets.hovered.bg_fill = COLOR_ACCENT_HOVER;
    visuals.widgets.hovered.weak_bg_fill = COLOR_ACCENT_HOVER;
    visuals.widgets.hovered.fg_stroke = egui::Stroke::new(1.0, Color32::WHITE);
    visuals.widgets.hovered.bg_stroke = egui::Stroke::NONE;
    visuals.widgets.hovered.rounding = Rounding::same(5.0);
    visuals.widgets.hovered.expansion = 0.0;

    visuals.widgets.active.bg_fill = COLOR_ACCENT_PRESSED;
    visuals.widgets.active.weak_bg_fill = COLOR_ACCENT_PRESSED;
    visuals.widgets.active.fg_stroke = egui::Stroke::new(1.0, Color32::WHITE);
    visuals.widgets.active.rounding = Rounding::same(5.0);

    visuals.extreme_bg_color = Color32::from_rgb(248, 249, 250);
    visuals.selection.bg_fill = COLOR_ACCENT.linear_multiply(0.3);
    visuals.selection.stroke = egui::Stroke::new(1.0, COLOR_ACCENT);
    visuals.widgets.noninteractive.bg_stroke = egui::Stroke::new(1.0, COLOR_BORDER);

    style.visuals = visuals;
    style.spacing.item_spacing = egui::vec2(8.0, 10.0);
    style.spacing.button_padding = egui::vec2(10.0, 5.0);
    style.spacing.interact_size.y = 30.0;

    ctx.set_style(style);
}

/// Rounded white card the settings panel is drawn on.
pub fn panel_frame() -> Frame {
    Frame::none()
        .fill(COLOR_BG)
        .stroke(egui::Stroke::new(1.0, COLOR_BORDER))
        .rounding(Rounding::same(20.0))
        .inner_margin(egui::Margin::same(20.0))
}

pub fn wide_button(ui: &mut Ui, text: &str) -> egui::Response {
    ui.add_sized(
        [ui.available_width(), 40.0],
        egui::Button::new(RichText::new(text).strong()),
    )
}

pub fn close_button(ui: &mut Ui) -> egui::Response {
    ui.scope(|ui| {
        let visuals = &mut ui.style_mut().visuals;
        visuals.widgets.inactive.weak_bg_fill = COLOR_RED;
        visuals.widgets.hovered.weak_bg_fill = Color32::from_rgb(200, 35, 51);
        visuals.widgets.active.weak_bg_fill = Color32::from_rgb(189, 33, 48);
        ui.add_sized([24.0, 24.0], egui::Button::new(RichText::new("X").strong()))
    })
    .inner
}

pub fn status_line(ui: &mut Ui, text: &str) {
    ui.label(RichText::new(text).small().color(COLOR_MUTED));
}
