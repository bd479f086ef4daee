use kurbo::Point;

use crate::model::Geometry;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    pub const FULL_HD: Canvas = Canvas {
        width: 1920,
        height: 1080,
    };
}

impl Default for Canvas {
    fn default() -> Self {
        Self::FULL_HD
    }
}

/// Element center in render space: the canvas-centered coordinate system
/// used for all on-screen placement. This is the only conversion formula in
/// the crate; every consumer of an element's center must go through it.
pub fn to_render_space(g: &Geometry, canvas: Canvas) -> Point {
    Point::new(
        g.x + g.width / 2.0 - f64::from(canvas.width) / 2.0,
        g.y + g.height / 2.0 - f64::from(canvas.height) / 2.0,
    )
}

/// Reverse of [`to_render_space`] given known width/height.
pub fn from_render_space(center: Point, width: f64, height: f64, canvas: Canvas) -> Geometry {
    Geometry {
        x: center.x - width / 2.0 + f64::from(canvas.width) / 2.0,
        y: center.y - height / 2.0 + f64::from(canvas.height) / 2.0,
        width,
        height,
    }
}

/// Anchor for typed text: the element's left interior (left edge plus `pad`,
/// vertically centered), so typed text lands inside the field rather than
/// above it. Derived from [`to_render_space`].
pub fn type_anchor(g: &Geometry, canvas: Canvas, pad: f64) -> Point {
    let center = to_render_space(g, canvas);
    Point::new(center.x - g.width / 2.0 + pad, center.y)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CANVAS: Canvas = Canvas::FULL_HD;

    #[test]
    fn center_of_canvas_maps_to_origin() {
        let g = Geometry {
            x: 860.0,
            y: 440.0,
            width: 200.0,
            height: 200.0,
        };
        assert_eq!(to_render_space(&g, CANVAS), Point::new(0.0, 0.0));
    }

    #[test]
    fn known_element_maps_to_expected_center() {
        // 600x40 input at (745, 390) on a 1920x1080 canvas.
        let g = Geometry {
            x: 745.0,
            y: 390.0,
            width: 600.0,
            height: 40.0,
        };
        assert_eq!(to_render_space(&g, CANVAS), Point::new(85.0, -130.0));
    }

    #[test]
    fn round_trip_recovers_geometry_exactly() {
        let g = Geometry {
            x: 12.5,
            y: 987.25,
            width: 33.0,
            height: 71.5,
        };
        let c = to_render_space(&g, CANVAS);
        let back = from_render_space(c, g.width, g.height, CANVAS);
        assert!((back.x - g.x).abs() < 1e-9);
        assert!((back.y - g.y).abs() < 1e-9);
        assert_eq!(back.width, g.width);
        assert_eq!(back.height, g.height);
    }

    #[test]
    fn type_anchor_sits_inside_left_edge() {
        let g = Geometry {
            x: 745.0,
            y: 390.0,
            width: 600.0,
            height: 40.0,
        };
        let a = type_anchor(&g, CANVAS, 12.0);
        assert_eq!(a, Point::new(85.0 - 300.0 + 12.0, -130.0));
    }
}
