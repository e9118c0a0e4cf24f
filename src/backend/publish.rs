//! Published symbol buffer
//!
//! The consumer-visible half of the double buffer. The worker replaces the
//! whole content at the end of a pass; the consumer reads whenever it likes.
//! Both sides hold the lock only for the O(n) copy or read, never across
//! compilation or emission work, so a reader sees either the complete
//! previous publish or the complete next one.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use super::symbol::Symbol;

/// Consumer-facing symbol buffer
#[derive(Debug, Default)]
pub struct PublishedBuffer {
    symbols: Mutex<Vec<Symbol>>,
    generation: AtomicU64,
}

impl PublishedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the content with `scratch`, resized to exact fit
    pub fn publish(&self, scratch: &[Symbol]) {
        let mut symbols = self.symbols.lock();
        symbols.clear();
        symbols.extend_from_slice(scratch);
        symbols.shrink_to_fit();
        self.generation.fetch_add(1, Ordering::Release);
    }

    /// Run `f` over the current content while holding the lock
    pub fn with_published<R>(&self, f: impl FnOnce(&[Symbol]) -> R) -> R {
        let symbols = self.symbols.lock();
        f(&symbols)
    }

    /// Copy of the current content
    pub fn snapshot(&self) -> Vec<Symbol> {
        self.with_published(|s| s.to_vec())
    }

    pub fn len(&self) -> usize {
        self.symbols.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of publishes so far
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::symbol::{Colour, Point};

    fn dots(n: usize) -> Vec<Symbol> {
        (0..n)
            .map(|i| Symbol::Circle {
                colour: Colour::new(1.0, 1.0, 1.0, 1.0),
                centre: Point::new(i as f64, 0.0),
                radius: n as f64,
            })
            .collect()
    }

    #[test]
    fn test_publish_replaces_whole_buffer() {
        let buf = PublishedBuffer::new();
        assert!(buf.is_empty());
        assert_eq!(buf.generation(), 0);

        buf.publish(&dots(5));
        assert_eq!(buf.len(), 5);

        let smaller = dots(2);
        buf.publish(&smaller);
        assert_eq!(buf.snapshot(), smaller);
        assert_eq!(buf.generation(), 2);
    }

    #[test]
    fn test_publish_exact_fit() {
        let buf = PublishedBuffer::new();
        buf.publish(&dots(100));
        buf.publish(&dots(3));
        buf.with_published(|s| assert_eq!(s.len(), 3));
        assert!(buf.symbols.lock().capacity() >= 3);
    }

    #[test]
    fn test_publish_empty() {
        let buf = PublishedBuffer::new();
        buf.publish(&dots(4));
        buf.publish(&[]);
        assert!(buf.is_empty());
    }
}
