/// Semicircular angle gauge: 0° on the left, 90° straight up, 180° on the right.

use egui::{Align2, Color32, FontId, Pos2, Sense, Shape, Stroke};

pub const GAUGE_WIDTH: f32 = 220.0;
pub const GAUGE_HEIGHT: f32 = 170.0;
const RADIUS: f32 = 74.0;
const ARC_SEGMENTS: usize = 48;

/// Point at `radius` from `center` for a gauge angle in degrees.
pub fn polar(center: Pos2, radius: f32, angle_deg: f32) -> Pos2 {
    let theta = (180.0 - angle_deg).to_radians();
    egui::pos2(center.x + radius * theta.cos(), center.y - radius * theta.sin())
}

pub fn draw(ui: &mut egui::Ui, angle: i32) {
    let (response, painter) = ui.allocate_painter(egui::vec2(GAUGE_WIDTH, GAUGE_HEIGHT), Sense::hover());
    let rect = response.rect;
    let center = egui::pos2(rect.center().x, rect.bottom() - 16.0);
    let ink = ui.visuals().text_color();

    let arc: Vec<Pos2> = (0..=ARC_SEGMENTS)
        .map(|i| polar(center, RADIUS, 180.0 * i as f32 / ARC_SEGMENTS as f32))
        .collect();
    painter.add(Shape::line(arc, Stroke::new(3.0, ink)));

    for tick in [0.0, 90.0, 180.0] {
        painter.line_segment(
            [polar(center, RADIUS - 10.0, tick), polar(center, RADIUS, tick)],
            Stroke::new(2.0, ink),
        );
        painter.text(
            polar(center, RADIUS + 12.0, tick),
            Align2::CENTER_CENTER,
            format!("{}", tick as i32),
            FontId::proportional(11.0),
            ink,
        );
    }

    let needle = polar(center, RADIUS - 6.0, angle.clamp(0, 180) as f32);
    painter.line_segment([center, needle], Stroke::new(4.0, Color32::from_rgb(0, 120, 215)));
    painter.text(
        egui::pos2(center.x, center.y + 4.0),
        Align2::CENTER_TOP,
        format!("{}°", angle),
        FontId::proportional(12.0),
        ink,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Pos2, b: Pos2) -> bool {
        (a - b).length() < 1e-3
    }

    #[test]
    fn test_polar_landmarks() {
        let c = egui::pos2(110.0, 154.0);
        assert!(close(polar(c, 10.0, 0.0), egui::pos2(100.0, 154.0)));
        assert!(close(polar(c, 10.0, 90.0), egui::pos2(110.0, 144.0)));
        assert!(close(polar(c, 10.0, 180.0), egui::pos2(120.0, 154.0)));
    }
}
