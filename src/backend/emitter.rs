//! Typed symbol emitters
//!
//! One method per host drawing function. Each allocates a scratch element
//! through the cap guard, copies the colour register and stores the geometry
//! as given by the formula. `number` and `text` also apply the baseline
//! offset and the text-unit rescale.

use super::symbol::{text_position, to_i8, Colour, Point, RectArea, Symbol, TEXT_SCALE};
use super::symbol_buffer::{ElementCapExceeded, ScratchBuffer};
use super::text_codec::word_from_f64;

/// Result of an emission; the index of the new element
pub type EmitResult = Result<usize, ElementCapExceeded>;

impl ScratchBuffer {
    /// `colour(r, g, b)`: set the colour register, alpha 1
    pub fn set_rgb(&mut self, r: f64, g: f64, b: f64) {
        self.set_colour(Colour::opaque(r, g, b));
    }

    pub fn line(&mut self, x0: f64, y0: f64, x1: f64, y1: f64, blur: f64) -> EmitResult {
        let symbol = self.line_symbol(x0, y0, x1, y1, blur);
        self.emit(symbol)
    }

    pub fn rect(
        &mut self,
        pos_x: f64,
        pos_y: f64,
        size_x: f64,
        size_y: f64,
        off_x: f64,
        off_y: f64,
    ) -> EmitResult {
        let symbol = Symbol::Rect {
            colour: self.colour,
            rect: RectArea::from_offset(
                Point::new(pos_x, pos_y),
                Point::new(size_x, size_y),
                Point::new(off_x, off_y),
            ),
        };
        self.emit(symbol)
    }

    pub fn quad(&mut self, points: [Point; 4], blur: f64) -> EmitResult {
        let symbol = Symbol::Quad {
            colour: self.colour,
            points,
            blur,
        };
        self.emit(symbol)
    }

    pub fn circle(&mut self, x: f64, y: f64, radius: f64) -> EmitResult {
        let symbol = Symbol::Circle {
            colour: self.colour,
            centre: Point::new(x, y),
            radius,
        };
        self.emit(symbol)
    }

    pub fn number(
        &mut self,
        x: f64,
        y: f64,
        scale: f64,
        value: f64,
        precision: f64,
        alignment: f64,
    ) -> EmitResult {
        let symbol = Symbol::Number {
            colour: self.colour,
            pos: text_position(x, y, scale),
            scale: scale * TEXT_SCALE,
            value,
            precision: to_i8(precision),
            alignment: to_i8(alignment),
        };
        self.emit(symbol)
    }

    pub fn text(
        &mut self,
        x: f64,
        y: f64,
        scale: f64,
        alignment: f64,
        v0: f64,
        v1: f64,
    ) -> EmitResult {
        let symbol = self.text_symbol(x, y, scale, alignment, [word_from_f64(v0), word_from_f64(v1)]);
        self.emit(symbol)
    }

    pub(crate) fn line_symbol(&self, x0: f64, y0: f64, x1: f64, y1: f64, blur: f64) -> Symbol {
        Symbol::Line {
            colour: self.colour,
            p0: Point::new(x0, y0),
            p1: Point::new(x1, y1),
            blur,
        }
    }

    pub(crate) fn text_symbol(
        &self,
        x: f64,
        y: f64,
        scale: f64,
        alignment: f64,
        payload: [u64; 2],
    ) -> Symbol {
        Symbol::Text {
            colour: self.colour,
            pos: text_position(x, y, scale),
            scale: scale * TEXT_SCALE,
            alignment: to_i8(alignment),
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::run_state::RunFlag;
    use crate::backend::symbol_buffer::PASS_START_COLOUR;

    fn buffer() -> ScratchBuffer {
        let run = RunFlag::new();
        run.start();
        ScratchBuffer::new(1024, 1.4, run)
    }

    #[test]
    fn test_colour_register_copied() {
        let mut buf = buffer();
        buf.circle(0.0, 0.0, 1.0).unwrap();
        buf.set_rgb(0.5, 0.25, 1.0);
        buf.line(0.0, 0.0, 1.0, 1.0, 0.0).unwrap();

        assert_eq!(buf.symbols()[0].colour(), PASS_START_COLOUR);
        assert_eq!(buf.symbols()[1].colour(), Colour::new(0.5, 0.25, 1.0, 1.0));
    }

    #[test]
    fn test_rect_offset() {
        let mut buf = buffer();
        buf.rect(10.0, 10.0, 4.0, 2.0, 0.5, 0.5).unwrap();
        match buf.symbols()[0] {
            Symbol::Rect { rect, .. } => {
                assert_eq!(rect.p0, Point::new(8.0, 9.0));
                assert_eq!(rect.p1, Point::new(12.0, 11.0));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_number_is_baseline_centred_and_rescaled() {
        let mut buf = buffer();
        buf.number(1.0, 2.0, 6.0, 3.25, 4.0, -1.0).unwrap();
        match buf.symbols()[0] {
            Symbol::Number {
                pos,
                scale,
                value,
                precision,
                alignment,
                ..
            } => {
                assert_eq!(pos, Point::new(1.0, -1.0));
                assert_eq!(scale, 1.0);
                assert_eq!(value, 3.25);
                assert_eq!(precision, 4);
                assert_eq!(alignment, -1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_text_payload_conversion() {
        let mut buf = buffer();
        buf.text(0.0, 3.0, 6.0, 0.0, 12.0, -5.0).unwrap();
        match buf.symbols()[0] {
            Symbol::Text {
                pos, scale, payload, ..
            } => {
                assert_eq!(pos, Point::new(0.0, 0.0));
                assert_eq!(scale, 1.0);
                assert_eq!(payload, [12, 0]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_quad_points() {
        let mut buf = buffer();
        let pts = [
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 1.0),
        ];
        buf.quad(pts, 0.25).unwrap();
        assert_eq!(
            buf.symbols()[0],
            Symbol::Quad {
                colour: PASS_START_COLOUR,
                points: pts,
                blur: 0.25
            }
        );
    }
}
