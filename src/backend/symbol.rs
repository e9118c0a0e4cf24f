//! Drawing symbols produced by a formula pass.
//!
//! A `Symbol` is one drawable primitive plus its colour. Geometry is stored in
//! formula units except for `Number` and `Text`, whose position is shifted down
//! by half the requested scale (baseline centering) and whose scale is
//! converted to text units by [`TEXT_SCALE`].

/// Conversion factor from formula units to text units
pub const TEXT_SCALE: f64 = 1.0 / 6.0;

/// Number of packed payload words carried by a `Text` symbol
pub const TEXT_WORDS: usize = 2;

/// Linear RGBA colour
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Colour {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Colour {
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque colour from formula components
    pub fn opaque(r: f64, g: f64, b: f64) -> Self {
        Self::new(r as f32, g as f32, b as f32, 1.0)
    }
}

/// 2D point
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned box given by two corners
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RectArea {
    pub p0: Point,
    pub p1: Point,
}

impl RectArea {
    /// Build a box of `size` placed so that `pos` sits at fraction `off` of it.
    ///
    /// An offset of (0, 0) puts `pos` at `p0`, (0.5, 0.5) centres the box on it.
    pub fn from_offset(pos: Point, size: Point, off: Point) -> Self {
        let p0 = Point::new(pos.x - size.x * off.x, pos.y - size.y * off.y);
        let p1 = Point::new(p0.x + size.x, p0.y + size.y);
        Self { p0, p1 }
    }

    pub fn width(&self) -> f64 {
        self.p1.x - self.p0.x
    }

    pub fn height(&self) -> f64 {
        self.p1.y - self.p0.y
    }
}

/// One drawable primitive
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Symbol {
    Line {
        colour: Colour,
        p0: Point,
        p1: Point,
        blur: f64,
    },
    Rect {
        colour: Colour,
        rect: RectArea,
    },
    Quad {
        colour: Colour,
        points: [Point; 4],
        blur: f64,
    },
    Circle {
        colour: Colour,
        centre: Point,
        radius: f64,
    },
    Number {
        colour: Colour,
        pos: Point,
        scale: f64,
        value: f64,
        precision: i8,
        alignment: i8,
    },
    Text {
        colour: Colour,
        pos: Point,
        scale: f64,
        alignment: i8,
        payload: [u64; TEXT_WORDS],
    },
}

impl Symbol {
    /// Colour carried by every variant
    pub fn colour(&self) -> Colour {
        match self {
            Symbol::Line { colour, .. }
            | Symbol::Rect { colour, .. }
            | Symbol::Quad { colour, .. }
            | Symbol::Circle { colour, .. }
            | Symbol::Number { colour, .. }
            | Symbol::Text { colour, .. } => *colour,
        }
    }

    /// Short lowercase variant name, matching the host function that emits it
    pub fn kind_name(&self) -> &'static str {
        match self {
            Symbol::Line { .. } => "line",
            Symbol::Rect { .. } => "rect",
            Symbol::Quad { .. } => "quad",
            Symbol::Circle { .. } => "circle",
            Symbol::Number { .. } => "number",
            Symbol::Text { .. } => "text",
        }
    }
}

/// Position of a text-like symbol: baseline centred by half the formula scale
#[inline]
pub(crate) fn text_position(x: f64, y: f64, scale: f64) -> Point {
    Point::new(x, y - 0.5 * scale)
}

/// Saturating conversion of a formula number to a small integer field
#[inline]
pub(crate) fn to_i8(v: f64) -> i8 {
    v as i8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_from_offset() {
        let r = RectArea::from_offset(Point::new(1.0, 2.0), Point::new(4.0, 2.0), Point::new(0.5, 0.0));
        assert_eq!(r.p0, Point::new(-1.0, 2.0));
        assert_eq!(r.p1, Point::new(3.0, 4.0));
        assert_eq!(r.width(), 4.0);
        assert_eq!(r.height(), 2.0);
    }

    #[test]
    fn test_colour_accessor() {
        let c = Colour::opaque(0.25, 0.5, 1.0);
        let s = Symbol::Circle {
            colour: c,
            centre: Point::default(),
            radius: 1.0,
        };
        assert_eq!(s.colour(), c);
        assert_eq!(s.kind_name(), "circle");
    }

    #[test]
    fn test_saturating_fields() {
        assert_eq!(to_i8(3.9), 3);
        assert_eq!(to_i8(1000.0), i8::MAX);
        assert_eq!(to_i8(f64::NAN), 0);
    }
}
