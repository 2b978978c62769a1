//! Rounding and range helpers shared by blocking, packing, and the loop nest.

/// `n / d`, rounded up.
#[inline]
pub(crate) fn ceil_div(n: usize, d: usize) -> usize {
    n.div_ceil(d)
}

/// `n` rounded up to a multiple of `b`.
#[inline]
pub(crate) fn round_up(n: usize, b: usize) -> usize {
    ceil_div(n, b) * b
}

/// Iterator over `[0, n)` in chunks of `chunk`, yielding the chunk index and
/// the chunk's actual length (the last one may be short).
pub(crate) fn range_chunk(n: usize, chunk: usize) -> impl Iterator<Item = (usize, usize)> {
    debug_assert!(chunk > 0);
    (0..ceil_div(n, chunk)).map(move |i| (i, chunk.min(n - i * chunk)))
}
