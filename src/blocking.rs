//! Cache-blocking policy.
//!
//! Chooses the KC/MC/NC cache blocks and the static thread decomposition for
//! one contraction. MR and NR are fixed per numeric kind by the selected
//! microkernel; this module sizes the outer blocks so that
//!
//! - one MR×KC A-micropanel plus one KC×NR B-micropanel fit in L1,
//! - an MC×KC packed A block fits in L2,
//! - a KC×NC packed B block fits in the L3 budget,
//!
//! then clamps each block to the problem and applies `TBLIS_BLOCK_*`
//! overrides. The policy is deterministic given its inputs.

use crate::config::Config;
use crate::util::{ceil_div, round_up};

// Per-core capacity targets. L3 is a configured upper bound on the packed B
// panel rather than a measured cache size.
const L1_BYTES: usize = 32 * 1024;
const L2_BYTES: usize = 256 * 1024;
const L3_BYTES: usize = 4 * 1024 * 1024;

/// Blocking parameters and thread decomposition for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Blocking {
    /// Microkernel rows, fixed per kind.
    pub mr: usize,
    /// Microkernel columns, fixed per kind.
    pub nr: usize,
    /// M cache block, a multiple of `mr`.
    pub mc: usize,
    /// N cache block, a multiple of `nr`.
    pub nc: usize,
    /// K cache block.
    pub kc: usize,
    /// Sub-teams over the JC loop.
    pub jc_ways: usize,
    /// Sub-teams per JC sub-team over the IC loop.
    pub ic_ways: usize,
}

impl Blocking {
    /// Chooses blocks for a fused m×n×k problem of `elem_size`-byte elements
    /// and a team of `num_threads`.
    pub fn choose(
        mr: usize,
        nr: usize,
        elem_size: usize,
        m: usize,
        n: usize,
        k: usize,
        num_threads: usize,
        config: &Config,
    ) -> Blocking {
        // KC from L1: an MR×KC and a KC×NR micropanel, both resident.
        let mut kc = (L1_BYTES / ((mr + nr) * elem_size)).max(8) & !7;
        if let Some(over) = config.block_kc {
            kc = over;
        }
        kc = kc.min(k.max(1));

        // MC from L2, rounded down to a multiple of MR.
        let mut mc = ((L2_BYTES / (kc * elem_size)) / mr).max(1) * mr;
        if let Some(over) = config.block_mc {
            mc = round_up(over, mr);
        }
        mc = mc.min(round_up(m.max(1), mr));

        // NC from the L3 budget, rounded down to a multiple of NR.
        let mut nc = ((L3_BYTES / (kc * elem_size)) / nr).max(1) * nr;
        if let Some(over) = config.block_nc {
            nc = round_up(over, nr);
        }
        nc = nc.min(round_up(n.max(1), nr));

        let (jc_ways, ic_ways) = decompose_threads(num_threads, m, n, mc, nc);

        Blocking {
            mr,
            nr,
            mc,
            nc,
            kc,
            jc_ways,
            ic_ways,
        }
    }

    /// Leaf team size under the JC×IC split.
    pub fn inner_threads(&self, num_threads: usize) -> usize {
        num_threads / (self.jc_ways * self.ic_ways)
    }
}

/// Splits the team across the JC and IC loops.
///
/// Both factors divide the team size, so every sub-team is the same size and
/// the leaf teams that share a packed panel are uniform. Preference order:
/// use as much of the team as possible at the gang levels (any remainder
/// lands on the JR loop inside the leaf teams), then balance per-sub-team N
/// work against per-sub-team M work. A factor is never larger than the
/// number of cache blocks in its loop.
fn decompose_threads(
    num_threads: usize,
    m: usize,
    n: usize,
    mc: usize,
    nc: usize,
) -> (usize, usize) {
    let jc_blocks = ceil_div(n.max(1), nc);
    let ic_blocks = ceil_div(m.max(1), mc);

    let mut best = (1, 1);
    let mut best_used = 0;
    let mut best_score = f64::INFINITY;
    for jc_ways in divisors(num_threads) {
        if jc_ways > jc_blocks {
            continue;
        }
        for ic_ways in divisors(num_threads / jc_ways) {
            if ic_ways > ic_blocks {
                continue;
            }
            let used = jc_ways * ic_ways;
            let n_share = n.max(1) as f64 / jc_ways as f64;
            let m_share = m.max(1) as f64 / ic_ways as f64;
            let score = (n_share - m_share).abs();
            if used > best_used || (used == best_used && score < best_score) {
                best_used = used;
                best_score = score;
                best = (jc_ways, ic_ways);
            }
        }
    }
    best
}

fn divisors(n: usize) -> impl Iterator<Item = usize> {
    (1..=n).filter(move |d| n % d == 0)
}
