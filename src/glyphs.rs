//! Schematic symbols for the four element kinds.

use eframe::egui::{self, Color32, Painter, Rect, Stroke};

use crate::model::ElementKind;

pub const INK: Color32 = Color32::from_rgb(24, 28, 36);

/// Paints the symbol for `kind` filling `rect`.
pub fn paint(painter: &Painter, kind: ElementKind, rect: Rect, highlighted: bool) {
    let side = rect.width().min(rect.height());
    let stroke = Stroke::new((side / 20.0).max(1.0), INK);
    let fill = if highlighted {
        Color32::from_rgb(255, 236, 170)
    } else {
        Color32::WHITE
    };
    let c = rect.center();
    let r = side * 0.42;

    match kind {
        ElementKind::Bulb => {
            // Lamp: crossed circle.
            painter.circle(c, r, fill, stroke);
            let d = r * std::f32::consts::FRAC_1_SQRT_2;
            painter.line_segment([c + egui::vec2(-d, -d), c + egui::vec2(d, d)], stroke);
            painter.line_segment([c + egui::vec2(-d, d), c + egui::vec2(d, -d)], stroke);
        }
        ElementKind::Sensor => {
            painter.circle(c, r, fill, stroke);
            painter.circle_filled(c, r * 0.25, INK);
            for k in [-1.0, 1.0] {
                painter.line_segment(
                    [c + egui::vec2(k * r * 0.45, -r * 0.45), c + egui::vec2(k * r * 0.75, -r * 0.75)],
                    stroke,
                );
            }
        }
        ElementKind::Switch => {
            painter.circle(c, r * 0.35, fill, stroke);
            let tip = c + egui::vec2(r * 0.8, -r * 0.8);
            painter.line_segment([c + egui::vec2(r * 0.25, -r * 0.25), tip], stroke);
            painter.line_segment([tip, tip + egui::vec2(r * 0.3, r * 0.3)], stroke);
        }
        ElementKind::MainPanel => {
            let body = Rect::from_center_size(c, egui::vec2(r * 2.0, r * 1.4));
            painter.rect(body, 2.0, fill, stroke);
            painter.add(egui::Shape::convex_polygon(
                vec![body.left_top(), body.right_top(), body.left_bottom()],
                INK,
                Stroke::NONE,
            ));
        }
    }
}
