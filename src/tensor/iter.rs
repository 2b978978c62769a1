//! Multi-index iteration.

use super::Dims;
use smallvec::SmallVec;

/// Odometer-style iterator over every multi-index of a length vector, last
/// axis fastest.
///
/// Drives the elementwise vector primitives and the reference paths in tests.
/// Yields nothing when any length is zero; yields the single empty index for
/// rank zero.
pub struct IndexIter {
    lens: Dims,
    next: Option<Dims>,
}

impl IndexIter {
    pub fn new(lens: &[usize]) -> Self {
        let next = if lens.contains(&0) {
            None
        } else {
            Some(SmallVec::from_elem(0, lens.len()))
        };
        Self {
            lens: SmallVec::from_slice(lens),
            next,
        }
    }
}

impl Iterator for IndexIter {
    type Item = Dims;

    fn next(&mut self) -> Option<Dims> {
        let current = self.next.take()?;
        let mut succ = current.clone();
        let mut advanced = false;
        for axis in (0..self.lens.len()).rev() {
            succ[axis] += 1;
            if succ[axis] < self.lens[axis] {
                advanced = true;
                break;
            }
            succ[axis] = 0;
        }
        if advanced {
            self.next = Some(succ);
        }
        Some(current)
    }
}
