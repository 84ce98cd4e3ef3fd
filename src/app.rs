use std::fs;

use eframe::{
    egui::{
        self, Align2, Color32, FontFamily, FontId, Key, KeyboardShortcut, Modifiers, Pos2, Rect,
        RichText, Sense, Stroke, TextureHandle, Ui,
    },
    epaint::Shadow,
    App, CreationContext, Frame,
};
use rfd::FileDialog;
use strum::IntoEnumIterator;

use crate::{
    backdrop::{self, BackdropLoader},
    calibration::{CalibrationMode, CalibrationState},
    config::Settings,
    editor::Editor,
    export::{self, EXPORT_FILE_NAME},
    geometry::Point,
    glyphs,
    model::{ElementKind, IconId, IconParams, ICON_EXTENT, LineId},
    telemetry::{HttpTelemetry, TelemetryEvent, TelemetrySink},
    zoom::Zoom,
};

/// Screen distance within which a click counts as hitting a line.
const LINE_HIT_TOLERANCE: f32 = 6.0;
const VERTEX_RADIUS: f32 = 5.0;
const GRID_STEP: f32 = 36.0;
const CALIBRATION_RED: Color32 = Color32::from_rgb(220, 40, 40);

fn pos(p: Point) -> Pos2 {
    egui::pos2(p.x, p.y)
}

fn point(p: Pos2) -> Point {
    Point::new(p.x, p.y)
}

fn offset(v: egui::Vec2) -> Point {
    Point::new(v.x, v.y)
}

struct PaletteDrag {
    kind: ElementKind,
    /// Screen offset of the pointer from the glyph's top-left corner.
    grab_offset: Point,
}

struct ParamForm {
    icon: IconId,
    kind: ElementKind,
    params: IconParams,
}

pub struct SchemaApp {
    settings: Settings,
    editor: Editor,
    telemetry: HttpTelemetry,
    loader: BackdropLoader,
    backdrop_texture: Option<TextureHandle>,
    backdrop_name: Option<String>,
    backdrop_size: Point,
    palette_drag: Option<PaletteDrag>,
    param_form: Option<ParamForm>,
    scale_input: String,
    scale_error: Option<String>,
    report: Option<String>,
    alert: Option<String>,
    show_params: bool,
    canvas_rect: Option<Rect>,
    export_requested: bool,
    status: String,
}

impl SchemaApp {
    pub fn new(cc: &CreationContext<'_>, settings: Settings) -> Self {
        Self::with_context(&cc.egui_ctx, settings)
    }

    fn with_context(ctx: &egui::Context, settings: Settings) -> Self {
        ctx.set_visuals(egui::Visuals::dark());
        ctx.set_zoom_factor(settings.ui_scale.clamp(0.5, 3.0));
        // Ctrl +/- drive the canvas zoom instead.
        ctx.options_mut(|o| o.zoom_with_keyboard = false);

        let mut editor = Editor::new(settings.history_depth);
        editor.viewport.zoom = Zoom::from_factor(settings.default_zoom);
        tracing::info!(
            telemetry = settings.telemetry_url.is_some(),
            zoom = editor.zoom().percent(),
            "editor ready"
        );

        Self {
            telemetry: HttpTelemetry::new(settings.telemetry_url.clone()),
            settings,
            editor,
            loader: BackdropLoader::default(),
            backdrop_texture: None,
            backdrop_name: None,
            backdrop_size: Point::ZERO,
            palette_drag: None,
            param_form: None,
            scale_input: String::new(),
            scale_error: None,
            report: None,
            alert: None,
            show_params: false,
            canvas_rect: None,
            export_requested: false,
            status: "Ready".to_string(),
        }
    }

    fn surface_panel() -> egui::Frame {
        egui::Frame::default()
            .fill(Color32::from_rgba_unmultiplied(18, 23, 34, 240))
            .stroke(Stroke::new(1.0, Color32::from_rgba_unmultiplied(255, 255, 255, 20)))
            .inner_margin(egui::Margin::same(10.0))
            .shadow(Shadow {
                offset: egui::vec2(0.0, 4.0),
                blur: 16.0,
                spread: 0.0,
                color: Color32::from_rgba_unmultiplied(0, 0, 0, 110),
            })
    }

    fn modal_open(&self) -> bool {
        self.param_form.is_some()
            || self.editor.calibrator.awaiting_distance()
            || self.report.is_some()
            || self.alert.is_some()
    }

    fn fail(&mut self, context: &str, err: impl std::fmt::Display) {
        tracing::warn!(%err, "{context}");
        self.alert = Some(format!("{context}: {err}"));
    }

    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        if self.modal_open() {
            return;
        }
        let (redo, undo, zoom_in, zoom_out, escape) = ctx.input_mut(|i| {
            // Redo first: the undo shortcut also matches with shift held.
            let redo = i.consume_shortcut(&KeyboardShortcut::new(
                Modifiers::COMMAND | Modifiers::SHIFT,
                Key::Z,
            ));
            let undo = i.consume_shortcut(&KeyboardShortcut::new(Modifiers::COMMAND, Key::Z));
            let zoom_in = i.consume_shortcut(&KeyboardShortcut::new(Modifiers::COMMAND, Key::Plus))
                || i.consume_shortcut(&KeyboardShortcut::new(Modifiers::COMMAND, Key::Equals));
            let zoom_out =
                i.consume_shortcut(&KeyboardShortcut::new(Modifiers::COMMAND, Key::Minus));
            let escape = i.consume_key(Modifiers::NONE, Key::Escape);
            (redo, undo, zoom_in, zoom_out, escape)
        });
        if redo {
            self.redo();
        } else if undo {
            self.undo();
        }
        if zoom_in {
            self.editor.zoom_in();
        }
        if zoom_out {
            self.editor.zoom_out();
        }
        if escape {
            self.editor.clear_selection();
            if self.editor.calibrator.is_enabled() {
                self.editor.calibrator.toggle();
                self.status = "Calibration cancelled".to_string();
            }
        }
    }

    /// History moves are refused while a form refers to the current state.
    fn undo(&mut self) {
        if self.modal_open() {
            return;
        }
        if self.editor.undo() {
            self.status = "Undid last change".to_string();
        }
    }

    fn redo(&mut self) {
        if self.modal_open() {
            return;
        }
        if self.editor.redo() {
            self.status = "Redid change".to_string();
        }
    }

    fn poll_backdrop(&mut self, ctx: &egui::Context) {
        let Some(result) = self.loader.poll() else {
            if self.loader.is_busy() {
                ctx.request_repaint();
            }
            return;
        };
        match result {
            Ok(backdrop) => {
                let max_side = ctx.input(|i| i.max_texture_side);
                if let Err(err) = backdrop::check_texture_fit(&backdrop.image, max_side) {
                    self.status = "Schema upload failed".to_string();
                    self.fail("Unable to show the schema", err);
                    return;
                }
                let size = [
                    backdrop.image.width() as usize,
                    backdrop.image.height() as usize,
                ];
                let color = egui::ColorImage::from_rgba_unmultiplied(size, backdrop.image.as_raw());
                self.backdrop_texture =
                    Some(ctx.load_texture("schema_backdrop", color, egui::TextureOptions::LINEAR));
                self.backdrop_size = backdrop.logical_size();
                self.status = format!("Loaded {}", backdrop.name);
                tracing::info!(name = %backdrop.name, width = size[0], height = size[1], "backdrop ready");
                self.backdrop_name = Some(backdrop.name);
            }
            Err(err) => {
                self.status = "Schema upload failed".to_string();
                self.fail("Unable to render the schema", err);
            }
        }
    }

    fn upload_schema(&mut self, ctx: &egui::Context) {
        let Some(path) = FileDialog::new().add_filter("PDF", &["pdf"]).pick_file() else {
            return;
        };
        match fs::read(&path) {
            Ok(bytes) => {
                let name = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("schema.pdf")
                    .to_string();
                self.status = format!("Rendering {name}...");
                self.loader.request_pdf(
                    name,
                    bytes,
                    self.settings.pdfium_library.clone(),
                    self.settings.render_scale(),
                    ctx.input(|i| i.max_texture_side),
                );
            }
            Err(err) => self.fail(&format!("Unable to read {}", path.display()), err),
        }
    }

    fn compute_cable_lengths(&mut self) {
        let report = self.editor.cable_report();
        for group in &report.groups {
            tracing::debug!(
                group = %group.group,
                pixels = group.pixels,
                drops = group.drop_allowance,
                total = %group.total,
                "group length"
            );
        }
        tracing::info!(
            groups = report.groups.len(),
            calibrated = report.is_calibrated(),
            "cable lengths computed"
        );
        for event in TelemetryEvent::cable_lengths(&report) {
            self.telemetry.publish(event);
        }
        self.report = Some(report.to_string());
    }

    fn request_export(&mut self, ctx: &egui::Context) {
        if self.canvas_rect.is_none() {
            self.alert = Some("Nothing to export yet.".to_string());
            return;
        }
        self.export_requested = true;
        ctx.send_viewport_cmd(egui::ViewportCommand::Screenshot);
    }

    fn handle_screenshot(&mut self, ctx: &egui::Context) {
        if !self.export_requested {
            return;
        }
        let shot = ctx.input(|i| {
            i.events.iter().find_map(|event| match event {
                egui::Event::Screenshot { image, .. } => Some(image.clone()),
                _ => None,
            })
        });
        let Some(shot) = shot else {
            return;
        };
        self.export_requested = false;
        let Some(rect) = self.canvas_rect else {
            return;
        };
        let region = shot.region(&rect, Some(ctx.pixels_per_point()));
        let Some(path) = FileDialog::new()
            .add_filter("PNG", &["png"])
            .set_file_name(EXPORT_FILE_NAME)
            .save_file()
        else {
            return;
        };
        match export::save_png(&region, &path) {
            Ok(()) => self.status = format!("Saved {}", path.display()),
            Err(err) => self.fail("Unable to export the schema", err),
        }
    }

    fn toolbar(&mut self, ui: &mut Ui) {
        ui.horizontal_wrapped(|ui| {
            ui.heading("Schema Planner");
            ui.separator();

            let zoom = self.editor.zoom();
            if ui
                .add_enabled(zoom.factor() < Zoom::MAX, egui::Button::new("Zoom in"))
                .clicked()
            {
                self.editor.zoom_in();
            }
            if ui
                .add_enabled(zoom.factor() > Zoom::MIN, egui::Button::new("Zoom out"))
                .clicked()
            {
                self.editor.zoom_out();
            }
            ui.label(format!("{}%", zoom.percent()));
            if ui
                .button("Reset view")
                .on_hover_text("Drag empty space or scroll to move around the plan")
                .clicked()
            {
                self.editor.reset_view();
            }
            ui.separator();

            let params_label = if self.show_params {
                "Hide params"
            } else {
                "Show params"
            };
            if ui.button(params_label).clicked() {
                self.show_params = !self.show_params;
            }
            if ui.button("Cable length").clicked() {
                self.compute_cable_lengths();
            }
            ui.separator();

            let uploading = self.loader.is_busy();
            if ui
                .add_enabled(!uploading, egui::Button::new("Upload schema"))
                .clicked()
            {
                self.upload_schema(ui.ctx());
            }
            if uploading {
                ui.spinner();
            }

            let calibrating = self.editor.calibrator.is_enabled();
            let scale_label = if calibrating { "Cancel scale" } else { "Set scale" };
            if ui.button(scale_label).clicked() {
                self.editor.calibrator.toggle();
                self.scale_error = None;
            }
            ui.add_enabled_ui(!calibrating, |ui| {
                let mode = &mut self.editor.calibrator.mode;
                egui::ComboBox::from_id_source("calibration_mode")
                    .selected_text(mode.label())
                    .show_ui(ui, |ui| {
                        for option in [CalibrationMode::ClickPair, CalibrationMode::Drag] {
                            ui.selectable_value(mode, option, option.label());
                        }
                    });
            });
            if ui.button("Download schema").clicked() {
                self.request_export(ui.ctx());
            }
            ui.separator();

            if ui
                .add_enabled(self.editor.can_undo(), egui::Button::new("↶ Undo"))
                .clicked()
            {
                self.undo();
            }
            if ui
                .add_enabled(self.editor.can_redo(), egui::Button::new("↷ Redo"))
                .clicked()
            {
                self.redo();
            }
        });
    }

    fn status_bar(&self, ui: &mut Ui) {
        ui.horizontal(|ui| {
            ui.label(&self.status);
            ui.separator();
            let diagram = self.editor.diagram();
            ui.label(format!(
                "{} elements, {} lines",
                diagram.icons().len(),
                diagram.lines().len()
            ));
            ui.separator();
            match self.editor.calibrator.scale() {
                Some(scale) => ui.label(format!("Scale {:.2} px/m", scale.pixels_per_meter)),
                None => ui.label(RichText::new("Not calibrated").color(Color32::from_rgb(224, 182, 86))),
            };
            if let Some(name) = &self.backdrop_name {
                ui.separator();
                ui.label(name);
            }
            let hint = match self.editor.calibrator.state() {
                _ if !self.editor.calibrator.is_enabled() => None,
                CalibrationState::Idle => Some("Mark the first end of a known distance"),
                CalibrationState::FirstPointArmed { .. } => Some("Mark the second end"),
                CalibrationState::Dragging { .. } => Some("Release to finish the reference"),
                CalibrationState::AwaitingDistance { .. } => Some("Enter the reference length"),
            };
            if let Some(hint) = hint {
                ui.separator();
                ui.label(RichText::new(hint).color(CALIBRATION_RED));
            }
        });
    }

    fn palette(&mut self, ui: &mut Ui) {
        ui.label(RichText::new("Elements").strong());
        ui.add_space(6.0);
        for kind in ElementKind::iter() {
            ui.vertical_centered(|ui| {
                let (rect, resp) =
                    ui.allocate_exact_size(egui::vec2(ICON_EXTENT, ICON_EXTENT), Sense::drag());
                ui.painter().rect_filled(rect, 4.0, Color32::WHITE);
                glyphs::paint(ui.painter(), kind, rect, resp.hovered());
                ui.label(kind.label());
                if resp.drag_started() {
                    let press = ui
                        .input(|i| i.pointer.press_origin())
                        .or(resp.interact_pointer_pos());
                    if let Some(press) = press {
                        let grab = press - rect.min;
                        self.palette_drag = Some(PaletteDrag {
                            kind,
                            grab_offset: Point::new(grab.x, grab.y),
                        });
                    }
                }
                resp.on_hover_text("Drag onto the plan");
            });
            ui.add_space(8.0);
        }
    }

    /// Ghost while a palette glyph is carried, drop on release over the canvas.
    fn finish_palette_drag(&mut self, ctx: &egui::Context) {
        let Some(drag) = &self.palette_drag else {
            return;
        };
        let (pointer, released) = ctx.input(|i| (i.pointer.latest_pos(), i.pointer.any_released()));
        let (kind, grab) = (drag.kind, drag.grab_offset);

        if let Some(pointer) = pointer {
            let painter = ctx.layer_painter(egui::LayerId::new(
                egui::Order::Tooltip,
                egui::Id::new("palette_ghost"),
            ));
            let side = self.editor.viewport.scale(ICON_EXTENT);
            let ghost = Rect::from_min_size(pointer - egui::vec2(grab.x, grab.y), egui::vec2(side, side));
            glyphs::paint(&painter, kind, ghost, true);
        }
        if !released {
            return;
        }
        self.palette_drag = None;

        let over_canvas = pointer
            .zip(self.canvas_rect)
            .is_some_and(|(p, rect)| rect.contains(p));
        if !over_canvas || self.editor.calibrator.is_enabled() || self.modal_open() {
            return;
        }
        if let Some(pointer) = pointer {
            let icon = self.editor.drop_icon(kind, point(pointer), grab);
            tracing::debug!(%icon, "opening parameter form");
            self.status = format!("Placed {}", kind.label());
            self.param_form = Some(ParamForm {
                icon,
                kind,
                params: IconParams::default(),
            });
        }
    }

    fn paint_grid(&self, painter: &egui::Painter, rect: Rect) {
        let step = GRID_STEP * self.editor.zoom().factor();
        let stroke = Stroke::new(1.0, Color32::from_rgba_unmultiplied(0, 0, 0, 18));
        // Lines stay fixed to the plan while panning.
        let anchor = self.editor.viewport.canvas_origin();
        let mut x = rect.left() + (anchor.x - rect.left()).rem_euclid(step);
        while x < rect.right() {
            painter.line_segment([egui::pos2(x, rect.top()), egui::pos2(x, rect.bottom())], stroke);
            x += step;
        }
        let mut y = rect.top() + (anchor.y - rect.top()).rem_euclid(step);
        while y < rect.bottom() {
            painter.line_segment([egui::pos2(rect.left(), y), egui::pos2(rect.right(), y)], stroke);
            y += step;
        }
    }

    fn canvas(&mut self, ui: &mut Ui) {
        let (resp, painter) = ui.allocate_painter(ui.available_size(), Sense::click_and_drag());
        let rect = resp.rect;
        self.canvas_rect = Some(rect);
        self.editor.set_canvas_origin(point(rect.min));
        let zoom = self.editor.zoom().factor();
        let calibrating = self.editor.calibrator.is_enabled();

        painter.rect_filled(rect, 0.0, Color32::WHITE);
        if let Some(texture) = &self.backdrop_texture {
            let size = self.backdrop_size * zoom;
            painter.image(
                texture.id(),
                Rect::from_min_size(
                    pos(self.editor.viewport.canvas_origin()),
                    egui::vec2(size.x, size.y),
                ),
                Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                Color32::WHITE,
            );
        }
        if self.settings.show_grid {
            self.paint_grid(&painter, rect);
        }

        let line_stroke = Stroke::new(2.0, glyphs::INK);
        for line in self.editor.diagram().lines() {
            if let Some(points) = self.editor.screen_polyline(line) {
                painter.add(egui::Shape::line(points.into_iter().map(pos).collect(), line_stroke));
            }
        }

        // Icons, then vertex handles on top.
        let pending = self.editor.diagram().pending_selection().to_vec();
        let icons: Vec<(IconId, ElementKind, Point, f32)> = self
            .editor
            .diagram()
            .icons()
            .iter()
            .map(|icon| {
                let (min, side) = self.editor.icon_screen_bounds(icon);
                (icon.id.clone(), icon.kind, min, side)
            })
            .collect();
        for (id, kind, min, side) in icons {
            let icon_rect = Rect::from_min_size(pos(min), egui::vec2(side, side));
            glyphs::paint(&painter, kind, icon_rect, pending.contains(&id));
            if calibrating {
                continue;
            }
            let icon_resp = ui.interact(icon_rect, ui.id().with(("icon", id.as_str())), Sense::click_and_drag());
            self.handle_icon(ui, &id, &icon_resp);
        }

        let handles: Vec<(LineId, usize, Point)> = self
            .editor
            .diagram()
            .lines()
            .iter()
            .flat_map(|line| {
                line.vertices
                    .iter()
                    .enumerate()
                    .map(move |(index, vertex)| (line.id, index, *vertex))
            })
            .collect();
        for (line, index, vertex) in handles {
            let center = pos(self.editor.viewport.to_screen(vertex));
            painter.circle(center, VERTEX_RADIUS, Color32::WHITE, line_stroke);
            if calibrating {
                continue;
            }
            let hit = Rect::from_center_size(center, egui::vec2(VERTEX_RADIUS * 3.0, VERTEX_RADIUS * 3.0));
            let vertex_resp = ui.interact(hit, ui.id().with(("vertex", line, index)), Sense::click_and_drag());
            self.handle_vertex(ui, line, index, &vertex_resp);
        }

        if self.show_params {
            self.paint_params(&painter);
        }
        self.paint_calibration(&painter);

        if resp.dragged_by(egui::PointerButton::Middle) {
            self.editor.pan_by(offset(resp.drag_delta()));
        }
        if resp.hovered() {
            let scroll = ui.input(|i| i.smooth_scroll_delta);
            if scroll != egui::Vec2::ZERO {
                self.editor.pan_by(offset(scroll));
            }
        }

        if calibrating {
            ui.ctx().set_cursor_icon(egui::CursorIcon::Crosshair);
            if let Some(hover) = resp.hover_pos().or(resp.interact_pointer_pos()) {
                if let Err(err) = self.editor.pointer_moved(point(hover)) {
                    tracing::warn!(%err, "calibration preview skipped");
                }
            }
            if resp.drag_started() || resp.clicked() || resp.drag_stopped() {
                let at = if resp.drag_started() {
                    ui.input(|i| i.pointer.press_origin())
                } else {
                    resp.interact_pointer_pos()
                        .or_else(|| ui.input(|i| i.pointer.latest_pos()))
                };
                // In click-pair mode a drag only marks its start point.
                let counts = !resp.drag_stopped()
                    || self.editor.calibrator.mode == CalibrationMode::Drag;
                if let (Some(at), true) = (at, counts) {
                    if self.editor.calibration_click(point(at)) {
                        self.scale_input.clear();
                        self.scale_error = None;
                    }
                }
            }
            return;
        }

        if self.editor.is_dragging() {
            ui.ctx().set_cursor_icon(egui::CursorIcon::Grabbing);
        } else if resp.dragged_by(egui::PointerButton::Primary) {
            self.editor.pan_by(offset(resp.drag_delta()));
            ui.ctx().set_cursor_icon(egui::CursorIcon::Grabbing);
        }
        if resp.double_clicked() {
            if let Some(at) = resp.interact_pointer_pos() {
                if let Some(line) = self.editor.line_at(point(at), LINE_HIT_TOLERANCE) {
                    match self.editor.insert_vertex_at(line, point(at)) {
                        Ok(_) => self.status = "Added a bend".to_string(),
                        Err(err) => self.fail("Unable to bend the line", err),
                    }
                }
            }
        }
        if resp.secondary_clicked() {
            if let Some(at) = resp.interact_pointer_pos() {
                if let Some(line) = self.editor.line_at(point(at), LINE_HIT_TOLERANCE) {
                    match self.editor.remove_line(line) {
                        Ok(()) => self.status = "Removed line".to_string(),
                        Err(err) => self.fail("Unable to remove the line", err),
                    }
                }
            }
        }
    }

    fn handle_icon(&mut self, ui: &Ui, id: &IconId, resp: &egui::Response) {
        if resp.drag_started() {
            let press = ui
                .input(|i| i.pointer.press_origin())
                .or(resp.interact_pointer_pos());
            if let Some(press) = press {
                if let Err(err) = self.editor.press_icon(id, point(press)) {
                    tracing::warn!(%err, "icon press ignored");
                }
            }
        }
        if resp.dragged() {
            if let Some(pointer) = resp.interact_pointer_pos() {
                if let Err(err) = self.editor.pointer_moved(point(pointer)) {
                    tracing::warn!(%err, "icon drag ignored");
                }
            }
        }
        if resp.drag_stopped() && self.editor.release() {
            self.status = format!("Moved {id}");
        }
        if resp.clicked() {
            match self.editor.click_icon(id) {
                Ok(Some(line)) => {
                    tracing::debug!(%line, "connected");
                    self.status = "Connected".to_string();
                }
                Ok(None) => {}
                Err(err) => self.fail("Unable to connect", err),
            }
        }
        if resp.secondary_clicked() {
            match self.editor.delete_icon(id) {
                Ok(()) => self.status = format!("Deleted {id}"),
                Err(err) => self.fail("Unable to delete", err),
            }
        }
    }

    fn handle_vertex(&mut self, ui: &Ui, line: LineId, index: usize, resp: &egui::Response) {
        if resp.drag_started() {
            let press = ui
                .input(|i| i.pointer.press_origin())
                .or(resp.interact_pointer_pos());
            if let Some(press) = press {
                if let Err(err) = self.editor.press_vertex(line, index, point(press)) {
                    tracing::warn!(%err, "vertex press ignored");
                }
            }
        }
        if resp.dragged() {
            if let Some(pointer) = resp.interact_pointer_pos() {
                if let Err(err) = self.editor.pointer_moved(point(pointer)) {
                    tracing::warn!(%err, "vertex drag ignored");
                }
            }
        }
        if resp.drag_stopped() {
            self.editor.release();
        }
        if resp.secondary_clicked() {
            match self.editor.delete_vertex(line, index) {
                Ok(()) => self.status = "Removed bend".to_string(),
                Err(err) => self.fail("Unable to remove the bend", err),
            }
        }
    }

    fn paint_params(&self, painter: &egui::Painter) {
        let font = FontId::new(11.0, FontFamily::Proportional);
        for icon in self.editor.diagram().icons() {
            let Some(params) = &icon.params else {
                continue;
            };
            let text = params
                .entries()
                .into_iter()
                .map(|(label, value)| format!("{label}: {value}"))
                .collect::<Vec<_>>()
                .join("\n");
            if text.is_empty() {
                continue;
            }
            let (min, side) = self.editor.icon_screen_bounds(icon);
            let anchor = pos(min) + egui::vec2(side + 6.0, 0.0);
            let galley = painter.layout_no_wrap(text, font.clone(), glyphs::INK);
            let background = Rect::from_min_size(anchor, galley.size()).expand(3.0);
            painter.rect(
                background,
                3.0,
                Color32::from_rgba_unmultiplied(255, 255, 255, 220),
                Stroke::new(1.0, Color32::from_gray(190)),
            );
            painter.galley(anchor, galley, glyphs::INK);
        }
    }

    fn paint_calibration(&self, painter: &egui::Painter) {
        let viewport = &self.editor.viewport;
        if let Some(scale) = self.editor.calibrator.scale() {
            let faint = Stroke::new(1.0, Color32::from_rgba_unmultiplied(220, 40, 40, 70));
            painter.line_segment(
                [pos(viewport.to_screen(scale.start)), pos(viewport.to_screen(scale.end))],
                faint,
            );
        }
        let stroke = Stroke::new(2.0, CALIBRATION_RED);
        if let CalibrationState::FirstPointArmed { start } = self.editor.calibrator.state() {
            painter.circle_stroke(pos(viewport.to_screen(start)), 4.0, stroke);
        }
        if let Some((start, end)) = self.editor.calibrator.preview() {
            let (a, b) = (pos(viewport.to_screen(start)), pos(viewport.to_screen(end)));
            painter.line_segment([a, b], stroke);
            painter.circle_filled(a, 3.0, CALIBRATION_RED);
            painter.circle_filled(b, 3.0, CALIBRATION_RED);
        }
    }

    fn dialogs(&mut self, ctx: &egui::Context) {
        self.parameter_dialog(ctx);
        self.scale_dialog(ctx);

        if let Some(report) = &self.report {
            let mut close = false;
            egui::Window::new("Cable lengths")
                .collapsible(false)
                .resizable(false)
                .anchor(Align2::CENTER_CENTER, [0.0, 0.0])
                .show(ctx, |ui| {
                    ui.label(RichText::new(report).monospace());
                    ui.separator();
                    close = ui.button("OK").clicked();
                });
            if close {
                self.report = None;
            }
        }

        if let Some(alert) = &self.alert {
            let mut close = false;
            egui::Window::new("Error")
                .collapsible(false)
                .resizable(false)
                .anchor(Align2::CENTER_CENTER, [0.0, 0.0])
                .show(ctx, |ui| {
                    ui.label(RichText::new(alert).color(Color32::from_rgb(221, 113, 113)));
                    close = ui.button("OK").clicked();
                });
            if close {
                self.alert = None;
            }
        }
    }

    fn parameter_dialog(&mut self, ctx: &egui::Context) {
        let Some(form) = &mut self.param_form else {
            return;
        };
        let mut open = true;
        let mut save = None;
        egui::Window::new(format!("{} parameters", form.kind.label()))
            .id(egui::Id::new("parameter_form"))
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                egui::Grid::new("parameter_grid").num_columns(2).show(ui, |ui| {
                    let params = &mut form.params;
                    for (label, value) in [
                        ("Group", &mut params.group),
                        ("Name", &mut params.name),
                        ("Voltage", &mut params.voltage),
                        ("Type", &mut params.kind),
                        ("Power", &mut params.power),
                        ("Interface", &mut params.interface),
                        ("Cable drop (m)", &mut params.cable),
                    ] {
                        ui.label(label);
                        ui.text_edit_singleline(value);
                        ui.end_row();
                    }
                });
                ui.separator();
                ui.horizontal(|ui| {
                    if ui.button("Save").clicked() {
                        save = Some(true);
                    }
                    if ui.button("Skip").clicked() {
                        save = Some(false);
                    }
                });
            });
        if !open {
            save = Some(false);
        }
        let Some(save) = save else {
            return;
        };
        let Some(form) = self.param_form.take() else {
            return;
        };
        if !save {
            return;
        }
        match self.editor.set_params(&form.icon, form.params.clone()) {
            Ok(()) => {
                self.status = format!("Saved parameters for {}", form.icon);
                match TelemetryEvent::parameters(form.kind, &form.params) {
                    Some(event) => self.telemetry.publish(event),
                    None => tracing::debug!(kind = %form.kind, "parameters kept local"),
                }
            }
            Err(err) => self.fail("Unable to save parameters", err),
        }
    }

    fn scale_dialog(&mut self, ctx: &egui::Context) {
        if !self.editor.calibrator.awaiting_distance() {
            return;
        }
        let mut open = true;
        let mut submit = false;
        let mut cancel = false;
        egui::Window::new("Reference distance")
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label("Real length of the red segment, in meters:");
                let input = ui.text_edit_singleline(&mut self.scale_input);
                if input.lost_focus() && ui.input(|i| i.key_pressed(Key::Enter)) {
                    submit = true;
                }
                input.request_focus();
                if let Some(error) = &self.scale_error {
                    ui.label(RichText::new(error).color(Color32::from_rgb(221, 113, 113)));
                }
                ui.horizontal(|ui| {
                    submit |= ui.button("OK").clicked();
                    cancel = ui.button("Cancel").clicked();
                });
            });

        if cancel || !open {
            self.editor.calibrator.cancel();
            self.scale_error = None;
            return;
        }
        if !submit {
            return;
        }
        match self.editor.confirm_calibration(&self.scale_input) {
            Ok(scale) => {
                self.status = format!("Scale set: {:.2} px/m", scale.pixels_per_meter);
                self.scale_input.clear();
                self.scale_error = None;
            }
            Err(err) if self.editor.calibrator.awaiting_distance() => {
                self.scale_error = Some(err.to_string());
            }
            Err(err) => {
                self.scale_error = None;
                self.fail("Calibration failed", err);
            }
        }
    }
}

impl App for SchemaApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        self.show(ctx);
    }
}

impl SchemaApp {
    fn show(&mut self, ctx: &egui::Context) {
        self.poll_backdrop(ctx);
        self.handle_shortcuts(ctx);
        self.handle_screenshot(ctx);

        // Forms and alerts own the input until they are closed.
        let enabled = !self.modal_open();
        egui::TopBottomPanel::top("toolbar")
            .frame(Self::surface_panel())
            .show(ctx, |ui| {
                ui.add_enabled_ui(enabled, |ui| self.toolbar(ui));
            });
        egui::TopBottomPanel::bottom("status_bar")
            .frame(Self::surface_panel())
            .show(ctx, |ui| self.status_bar(ui));
        egui::SidePanel::left("palette")
            .resizable(false)
            .exact_width(110.0)
            .frame(Self::surface_panel())
            .show(ctx, |ui| {
                ui.add_enabled_ui(enabled, |ui| self.palette(ui));
            });

        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                ui.add_enabled_ui(enabled, |ui| self.canvas(ui));
            });

        self.finish_palette_drag(ctx);
        self.dialogs(ctx);
    }
}
