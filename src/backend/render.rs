//! Renderer contract
//!
//! Implement [`SymbolRenderer`] to draw a published buffer on some target.
//! [`render`] walks the symbols in order and dispatches each one to the
//! matching method, decoding text payloads on the way.
//!
//! [`ListingRenderer`] is a plain-text target, one line per symbol; the CLI
//! prints it.

use std::fmt::Write as _;

use super::symbol::{Colour, Point, RectArea, Symbol};
use super::text_codec::unpack_text;

/// Target for drawing directives
pub trait SymbolRenderer {
    fn line(&mut self, colour: Colour, p0: Point, p1: Point, blur: f64);

    fn rect(&mut self, colour: Colour, rect: RectArea);

    fn quad(&mut self, colour: Colour, points: &[Point; 4], blur: f64);

    fn circle(&mut self, colour: Colour, centre: Point, radius: f64);

    /// `precision` is a significant-digit count, `alignment` is passed through
    fn number(
        &mut self,
        colour: Colour,
        pos: Point,
        scale: f64,
        value: f64,
        precision: i8,
        alignment: i8,
    );

    /// Text with its payload already decoded
    fn text(&mut self, colour: Colour, pos: Point, scale: f64, alignment: i8, text: &str);
}

/// Render `symbols` in order
pub fn render<R: SymbolRenderer + ?Sized>(symbols: &[Symbol], renderer: &mut R) {
    for symbol in symbols {
        match *symbol {
            Symbol::Line {
                colour,
                p0,
                p1,
                blur,
            } => renderer.line(colour, p0, p1, blur),
            Symbol::Rect { colour, rect } => renderer.rect(colour, rect),
            Symbol::Quad {
                colour,
                ref points,
                blur,
            } => renderer.quad(colour, points, blur),
            Symbol::Circle {
                colour,
                centre,
                radius,
            } => renderer.circle(colour, centre, radius),
            Symbol::Number {
                colour,
                pos,
                scale,
                value,
                precision,
                alignment,
            } => renderer.number(colour, pos, scale, value, precision, alignment),
            Symbol::Text {
                colour,
                pos,
                scale,
                alignment,
                ref payload,
            } => renderer.text(colour, pos, scale, alignment, &unpack_text(payload)),
        }
    }
}

/// Format `value` the way C's `%.*g` does.
///
/// Negative precision means the default of 6; zero means 1.
pub fn format_number(value: f64, precision: i8) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let p: i32 = if precision < 0 { 6 } else { i32::from(precision).max(1) };
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    // Exponent after rounding to p significant digits
    let sci = format!("{:.*e}", (p - 1) as usize, value);
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return sci;
    };
    let x: i32 = exp.parse().unwrap_or(0);

    if x < -4 || x >= p {
        let sign = if x < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", strip_fraction_zeros(mantissa), sign, x.abs())
    } else {
        let decimals = (p - 1 - x).max(0) as usize;
        strip_fraction_zeros(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn strip_fraction_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

fn colour_str(c: Colour) -> String {
    format!("rgba({}, {}, {}, {})", c.r, c.g, c.b, c.a)
}

fn point_str(p: Point) -> String {
    format!("({}, {})", p.x, p.y)
}

/// Text listing of drawing directives
#[derive(Debug, Default)]
pub struct ListingRenderer {
    out: String,
}

impl ListingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.out
    }

    pub fn into_string(self) -> String {
        self.out
    }

    fn push(&mut self, args: std::fmt::Arguments<'_>) {
        let _ = self.out.write_fmt(args);
        self.out.push('\n');
    }
}

impl SymbolRenderer for ListingRenderer {
    fn line(&mut self, colour: Colour, p0: Point, p1: Point, blur: f64) {
        self.push(format_args!(
            "line {} {} blur {} {}",
            point_str(p0),
            point_str(p1),
            blur,
            colour_str(colour)
        ));
    }

    fn rect(&mut self, colour: Colour, rect: RectArea) {
        self.push(format_args!(
            "rect {} {} {}",
            point_str(rect.p0),
            point_str(rect.p1),
            colour_str(colour)
        ));
    }

    fn quad(&mut self, colour: Colour, points: &[Point; 4], blur: f64) {
        self.push(format_args!(
            "quad {} {} {} {} blur {} {}",
            point_str(points[0]),
            point_str(points[1]),
            point_str(points[2]),
            point_str(points[3]),
            blur,
            colour_str(colour)
        ));
    }

    fn circle(&mut self, colour: Colour, centre: Point, radius: f64) {
        self.push(format_args!(
            "circle {} r {} {}",
            point_str(centre),
            radius,
            colour_str(colour)
        ));
    }

    fn number(
        &mut self,
        colour: Colour,
        pos: Point,
        scale: f64,
        value: f64,
        precision: i8,
        alignment: i8,
    ) {
        self.push(format_args!(
            "number {} at {} scale {} align {} {}",
            format_number(value, precision),
            point_str(pos),
            scale,
            alignment,
            colour_str(colour)
        ));
    }

    fn text(&mut self, colour: Colour, pos: Point, scale: f64, alignment: i8, text: &str) {
        self.push(format_args!(
            "text {:?} at {} scale {} align {} {}",
            text,
            point_str(pos),
            scale,
            alignment,
            colour_str(colour)
        ));
    }
}
