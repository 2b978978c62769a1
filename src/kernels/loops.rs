//! The five-loop macrokernel.
//!
//! Loop order, outermost first: JC over N in NC blocks, PC over K in KC
//! blocks, IC over M in MC blocks, JR over NR tiles, IR over MR tiles. The
//! batched group wraps the whole nest. β is applied on the first PC iteration
//! of each tile and folds to one afterwards; that carry is the only
//! correctness subtlety in the nest.
//!
//! Thread decomposition is static: JC blocks are split across jc sub-teams,
//! IC blocks across ic sub-teams within each, and the JR tiles of a block
//! across the leaf team's threads. Each packed panel is written cooperatively
//! by its owning (sub-)team between two barriers and read by the whole team
//! until the next pack.

use crate::blocking::Blocking;
use crate::comm::{Communicator, split_range};
use crate::util::{ceil_div, range_chunk};

use super::microkernel::GemmKernel;
use super::pack::{PackBuffer, pack_panels};

/// Everything a worker thread needs: operand bases, fused offset tables, the
/// blocking, and the per-team packing scratch.
///
/// Offset tables map each fused index to its element offset in the owning
/// operand; the batch tables do the same for the batched group.
pub(crate) struct NestContext<'a, T: GemmKernel> {
    pub alpha: T,
    pub beta: T,
    pub a: *const T,
    pub b: *const T,
    pub c: *mut T,
    pub off_am: &'a [isize],
    pub off_ak: &'a [isize],
    pub off_bk: &'a [isize],
    pub off_bn: &'a [isize],
    pub off_cm: &'a [isize],
    pub off_cn: &'a [isize],
    pub batch_a: &'a [isize],
    pub batch_b: &'a [isize],
    pub batch_c: &'a [isize],
    pub blocking: Blocking,
    /// One A panel per (jc, ic) leaf team, indexed `jc * ic_ways + ic`.
    pub a_panels: &'a [PackBuffer<T>],
    /// One B panel per jc sub-team.
    pub b_panels: &'a [PackBuffer<T>],
}

// A and B are read-only; every C tile is written by exactly one thread per PC
// iteration; panel access is bracketed by team barriers.
unsafe impl<T: GemmKernel> Sync for NestContext<'_, T> {}

/// SPMD body run by every thread of the team.
pub(crate) fn thread_main<T: GemmKernel>(ctx: &NestContext<'_, T>, comm: &Communicator) {
    let bl = &ctx.blocking;
    let m = ctx.off_am.len();
    let n = ctx.off_bn.len();
    let k = ctx.off_ak.len();

    let jc_gang = comm.gang_id(bl.jc_ways);
    let jc_comm = comm.gang_split(bl.jc_ways);
    let ic_gang = jc_comm.gang_id(bl.ic_ways);
    let ic_comm = jc_comm.gang_split(bl.ic_ways);

    let bp = ctx.b_panels[jc_gang].ptr();
    let ap = ctx.a_panels[jc_gang * bl.ic_ways + ic_gang].ptr();

    // Scratch for edge and scattered C tiles.
    let mut tile = vec![T::zero(); T::MR * T::NR];

    let (jc_lo, jc_hi) = split_range(ceil_div(n, bl.nc), bl.jc_ways, jc_gang);
    let (ic_lo, ic_hi) = split_range(ceil_div(m, bl.mc), bl.ic_ways, ic_gang);

    for batch in 0..ctx.batch_c.len() {
        let a_base = unsafe { ctx.a.offset(ctx.batch_a[batch]) };
        let b_base = unsafe { ctx.b.offset(ctx.batch_b[batch]) };
        let c_base = unsafe { ctx.c.offset(ctx.batch_c[batch]) };

        for jc in jc_lo..jc_hi {
            let nc_len = bl.nc.min(n - jc * bl.nc);
            let off_bn = &ctx.off_bn[jc * bl.nc..jc * bl.nc + nc_len];
            let off_cn = &ctx.off_cn[jc * bl.nc..jc * bl.nc + nc_len];
            let nr_tiles = ceil_div(nc_len, bl.nr);

            for (pc, kc_len) in range_chunk(k, bl.kc) {
                let off_ak = &ctx.off_ak[pc * bl.kc..pc * bl.kc + kc_len];
                let off_bk = &ctx.off_bk[pc * bl.kc..pc * bl.kc + kc_len];

                // The previous panel must be fully consumed before repacking.
                jc_comm.barrier();
                let (p_lo, p_hi, _) = jc_comm.distribute_over_threads(nr_tiles);
                unsafe {
                    pack_panels(bp, b_base, off_bn, off_bk, bl.nr, false, p_lo..p_hi);
                }
                jc_comm.barrier();

                let beta_eff = if pc == 0 { ctx.beta } else { T::one() };

                for ic in ic_lo..ic_hi {
                    let mc_len = bl.mc.min(m - ic * bl.mc);
                    let off_am = &ctx.off_am[ic * bl.mc..ic * bl.mc + mc_len];
                    let off_cm = &ctx.off_cm[ic * bl.mc..ic * bl.mc + mc_len];

                    ic_comm.barrier();
                    let mr_panels = ceil_div(mc_len, bl.mr);
                    let (p_lo, p_hi, _) = ic_comm.distribute_over_threads(mr_panels);
                    unsafe {
                        pack_panels(ap, a_base, off_am, off_ak, bl.mr, false, p_lo..p_hi);
                    }
                    ic_comm.barrier();

                    let (jr_lo, jr_hi, _) = ic_comm.distribute_over_threads(nr_tiles);
                    for jr in jr_lo..jr_hi {
                        let nr_len = bl.nr.min(nc_len - jr * bl.nr);
                        let cols = &off_cn[jr * bl.nr..jr * bl.nr + nr_len];
                        let bp_panel = unsafe { bp.add(jr * bl.nr * kc_len) };

                        for (ir, mr_len) in range_chunk(mc_len, bl.mr) {
                            let rows = &off_cm[ir * bl.mr..ir * bl.mr + mr_len];
                            let ap_panel = unsafe { ap.add(ir * bl.mr * kc_len) };
                            unsafe {
                                update_tile::<T>(
                                    kc_len, ctx.alpha, ap_panel, bp_panel, beta_eff, c_base,
                                    rows, cols, &mut tile,
                                );
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Applies one microkernel call to the C tile addressed by `rows` × `cols`.
///
/// A full tile whose row and column offsets are affine goes straight to the
/// kernel. Edge tiles and scattered tiles are computed into `tile` with
/// α = 1, β = 0 and merged under a mask, so the kernel itself never writes
/// out of bounds.
unsafe fn update_tile<T: GemmKernel>(
    kc: usize,
    alpha: T,
    ap: *const T,
    bp: *const T,
    beta: T,
    c: *mut T,
    rows: &[isize],
    cols: &[isize],
    tile: &mut [T],
) {
    if rows.len() == T::MR && cols.len() == T::NR {
        if let (Some(rsc), Some(csc)) = (uniform_stride(rows), uniform_stride(cols)) {
            unsafe {
                T::kernel(kc, alpha, ap, bp, beta, c.offset(rows[0] + cols[0]), rsc, csc);
            }
            return;
        }
    }

    unsafe {
        T::kernel(
            kc,
            T::one(),
            ap,
            bp,
            T::zero(),
            tile.as_mut_ptr(),
            T::NR as isize,
            1,
        );
    }
    for (i, &row_off) in rows.iter().enumerate() {
        for (j, &col_off) in cols.iter().enumerate() {
            let value = alpha * tile[i * T::NR + j];
            unsafe {
                let cptr = c.offset(row_off + col_off);
                if beta.is_zero() {
                    *cptr = value;
                } else {
                    *cptr = beta * *cptr + value;
                }
            }
        }
    }
}

fn uniform_stride(offsets: &[isize]) -> Option<isize> {
    let step = offsets.get(1).map_or(0, |&o| o - offsets[0]);
    offsets
        .windows(2)
        .all(|w| w[1] - w[0] == step)
        .then_some(step)
}
