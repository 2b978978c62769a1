//! Top-level contraction driver.
//!
//! `contract` computes
//!
//!     C[idx_C] := α · Σ A[idx_A] · B[idx_B] + β · C[idx_C]
//!
//! summing over the labels that appear in A and B but not C; labels shared by
//! all three operands are batched. All validation happens here, before any
//! write to C, so a failed call leaves C untouched. The driver owns the
//! packing scratch: it is acquired before the team spawns and released after
//! the join, on this thread, which keeps panel lifetime panic-safe.

use log::{debug, warn};

use crate::blocking::Blocking;
use crate::comm::parallelize;
use crate::config::{Backend, Config};
use crate::error::{ContractError, ContractResult};
use crate::index::{IndexString, analyze};
use crate::kernels::{GemmKernel, NestContext, PackBuffer, group_offsets, thread_main};
use crate::tensor::{IndexIter, TensorView, TensorViewMut};
use crate::types::Scalar;
use crate::util::ceil_div;

/// Contracts `A` and `B` into `C` with configuration from the environment.
///
/// See [`contract_with`] for the full contract; this entry reads
/// `TBLIS_NUM_THREADS`, `TBLIS_BLOCK_{MC,NC,KC}`, and `TBLIS_IMPL` first and
/// fails with `ConfigError` on an invalid override.
pub fn contract<T: GemmKernel>(
    alpha: T,
    a: &TensorView<'_, T>,
    idx_a: &str,
    b: &TensorView<'_, T>,
    idx_b: &str,
    beta: T,
    c: &mut TensorViewMut<'_, T>,
    idx_c: &str,
) -> ContractResult<()> {
    let config = Config::from_env()?;
    contract_with(&config, alpha, a, idx_a, b, idx_b, beta, c, idx_c)
}

/// Contracts `A` and `B` into `C` under an explicit [`Config`].
///
/// Errors are detected in order: malformed index strings, rank mismatches,
/// label classification failures, storage aliasing. If any fused dimension is
/// empty the call reduces to β-scaling C (zeroing it when β = 0) and returns.
#[allow(clippy::too_many_arguments)]
pub fn contract_with<T: GemmKernel>(
    config: &Config,
    alpha: T,
    a: &TensorView<'_, T>,
    idx_a: &str,
    b: &TensorView<'_, T>,
    idx_b: &str,
    beta: T,
    c: &mut TensorViewMut<'_, T>,
    idx_c: &str,
) -> ContractResult<()> {
    let idx_a = IndexString::parse(idx_a)?;
    let idx_b = IndexString::parse(idx_b)?;
    let idx_c = IndexString::parse(idx_c)?;

    check_rank(&idx_a, a.rank())?;
    check_rank(&idx_b, b.rank())?;
    check_rank(&idx_c, c.rank())?;

    let plan = analyze(&idx_a, a.lens(), &idx_b, b.lens(), &idx_c, c.lens())?;

    check_alias(&c.view(), a, 'A')?;
    check_alias(&c.view(), b, 'B')?;

    if plan.is_degenerate() {
        scale_output(beta, c);
        return Ok(());
    }

    if config.backend == Backend::Blas {
        warn!("TBLIS_IMPL=blas requested but no external GEMM is linked; using the native kernel");
    }

    let (m, n, k, batch) = (
        plan.m_size(),
        plan.n_size(),
        plan.k_size(),
        plan.batch_size(),
    );

    // Never field more threads than there are microkernel tiles.
    let tiles = ceil_div(m, T::MR) * ceil_div(n, T::NR);
    let threads = config.num_threads.min(tiles).max(1);

    let blocking = Blocking::choose(T::MR, T::NR, size_of::<T>(), m, n, k, threads, config);
    debug!(
        "contract m={m} n={n} k={k} batch={batch} threads={threads} \
         mc={} nc={} kc={} jc_ways={} ic_ways={}",
        blocking.mc, blocking.nc, blocking.kc, blocking.jc_ways, blocking.ic_ways
    );

    // Fused-index offset tables, shared read-only by the team.
    let off_am = group_offsets(&plan.m, a.strides(), |x| x.axis_a);
    let off_ak = group_offsets(&plan.k, a.strides(), |x| x.axis_a);
    let off_bk = group_offsets(&plan.k, b.strides(), |x| x.axis_b);
    let off_bn = group_offsets(&plan.n, b.strides(), |x| x.axis_b);
    let off_cm = group_offsets(&plan.m, c.strides(), |x| x.axis_c);
    let off_cn = group_offsets(&plan.n, c.strides(), |x| x.axis_c);
    let batch_a = group_offsets(&plan.batch, a.strides(), |x| x.axis_a);
    let batch_b = group_offsets(&plan.batch, b.strides(), |x| x.axis_b);
    let batch_c = group_offsets(&plan.batch, c.strides(), |x| x.axis_c);

    // Scratch panels: one B panel per jc sub-team, one A panel per leaf team.
    let a_panel_len = blocking.mc * blocking.kc;
    let b_panel_len = blocking.nc * blocking.kc;
    let a_panels = (0..blocking.jc_ways * blocking.ic_ways)
        .map(|_| PackBuffer::<T>::new(a_panel_len))
        .collect::<ContractResult<Vec<_>>>()?;
    let b_panels = (0..blocking.jc_ways)
        .map(|_| PackBuffer::<T>::new(b_panel_len))
        .collect::<ContractResult<Vec<_>>>()?;

    let ctx = NestContext {
        alpha,
        beta,
        a: a.as_ptr(),
        b: b.as_ptr(),
        c: c.as_mut_ptr(),
        off_am: &off_am,
        off_ak: &off_ak,
        off_bk: &off_bk,
        off_bn: &off_bn,
        off_cm: &off_cm,
        off_cn: &off_cn,
        batch_a: &batch_a,
        batch_b: &batch_b,
        batch_c: &batch_c,
        blocking,
        a_panels: &a_panels,
        b_panels: &b_panels,
    };

    parallelize(threads, |comm| thread_main(&ctx, comm));
    Ok(())
}

fn check_rank(idx: &IndexString, rank: usize) -> ContractResult<()> {
    if idx.len() != rank {
        return Err(ContractError::shape(&idx.to_string(), idx.len(), rank));
    }
    Ok(())
}

fn check_alias<T: Scalar>(
    c: &TensorView<'_, T>,
    operand: &TensorView<'_, T>,
    name: char,
) -> ContractResult<()> {
    if let (Some((c_lo, c_hi)), Some((o_lo, o_hi))) = (c.address_span(), operand.address_span()) {
        if c_lo < o_hi && o_lo < c_hi {
            return Err(ContractError::AliasError { operand: name });
        }
    }
    Ok(())
}

/// β-scales C elementwise; β = 0 zeroes it without reading prior contents.
fn scale_output<T: Scalar>(beta: T, c: &mut TensorViewMut<'_, T>) {
    let lens: Vec<usize> = c.lens().to_vec();
    for idx in IndexIter::new(&lens) {
        if beta.is_zero() {
            c.set(&idx, T::zero());
        } else {
            let v = c.get(&idx);
            c.set(&idx, beta * v);
        }
    }
}
