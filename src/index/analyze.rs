//! Label classification.
//!
//! Partitions the labels of one contraction into four disjoint classes and
//! fuses each class into one logical GEMM dimension:
//!
//! - batch: in A, B, and C (outer product over C, never summed)
//! - M: in A and C only
//! - N: in B and C only
//! - K: in A and B only (the summation axes)
//!
//! A label in exactly one operand is rejected; there is no implicit reduction
//! or broadcast.

use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::error::{ContractError, ContractResult};

use super::labels::IndexString;

/// One label bound to its axes and length.
///
/// An axis slot is `None` for the operands that do not carry the label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundIndex {
    pub label: char,
    pub axis_a: Option<usize>,
    pub axis_b: Option<usize>,
    pub axis_c: Option<usize>,
    pub len: usize,
}

/// One label group, ordered for locality.
pub type IndexGroup = SmallVec<[BoundIndex; 4]>;

/// The logical GEMM plan produced by label classification.
///
/// Group ordering follows first appearance in A (for M and K), in B (for N),
/// and in C (for batch); the fused linear index of each group runs over the
/// listed labels with the last one fastest.
#[derive(Debug, Clone)]
pub struct ContractionPlan {
    pub batch: IndexGroup,
    pub m: IndexGroup,
    pub n: IndexGroup,
    pub k: IndexGroup,
}

impl ContractionPlan {
    /// Fused M dimension, `product` of the M-group lengths.
    pub fn m_size(&self) -> usize {
        self.m.iter().map(|b| b.len).product()
    }

    /// Fused N dimension.
    pub fn n_size(&self) -> usize {
        self.n.iter().map(|b| b.len).product()
    }

    /// Fused K (summation) dimension.
    pub fn k_size(&self) -> usize {
        self.k.iter().map(|b| b.len).product()
    }

    /// Number of batched slices.
    pub fn batch_size(&self) -> usize {
        self.batch.iter().map(|b| b.len).product()
    }

    /// True when any fused dimension is zero and the contraction reduces to
    /// β-scaling C.
    pub fn is_degenerate(&self) -> bool {
        self.m_size() == 0 || self.n_size() == 0 || self.k_size() == 0 || self.batch_size() == 0
    }
}

#[derive(Default, Clone, Copy)]
struct Occurrence {
    axis_a: Option<usize>,
    axis_b: Option<usize>,
    axis_c: Option<usize>,
    len: usize,
}

/// Classifies the labels of a contraction and validates length agreement.
///
/// The caller has already checked that each length slice matches the rank of
/// its index string.
pub fn analyze(
    idx_a: &IndexString,
    lens_a: &[usize],
    idx_b: &IndexString,
    lens_b: &[usize],
    idx_c: &IndexString,
    lens_c: &[usize],
) -> ContractResult<ContractionPlan> {
    debug_assert_eq!(idx_a.len(), lens_a.len());
    debug_assert_eq!(idx_b.len(), lens_b.len());
    debug_assert_eq!(idx_c.len(), lens_c.len());

    let mut seen: HashMap<char, Occurrence> = HashMap::with_capacity(idx_a.len() + idx_b.len());

    for (axis, (&label, &len)) in idx_a.labels().iter().zip(lens_a).enumerate() {
        let occ = seen.entry(label).or_default();
        occ.axis_a = Some(axis);
        occ.len = len;
    }
    for (axis, (&label, &len)) in idx_b.labels().iter().zip(lens_b).enumerate() {
        let occ = seen.entry(label).or_default();
        if occ.axis_a.is_some() && occ.len != len {
            return Err(ContractError::LengthMismatch {
                label,
                expected: occ.len,
                got: len,
            });
        }
        occ.axis_b = Some(axis);
        occ.len = len;
    }
    for (axis, (&label, &len)) in idx_c.labels().iter().zip(lens_c).enumerate() {
        let occ = seen.entry(label).or_default();
        if (occ.axis_a.is_some() || occ.axis_b.is_some()) && occ.len != len {
            return Err(ContractError::LengthMismatch {
                label,
                expected: occ.len,
                got: len,
            });
        }
        occ.axis_c = Some(axis);
        occ.len = len;
    }

    // Reject labels confined to a single operand, scanning A, B, C in order
    // so the reported label is deterministic.
    for &label in idx_a
        .labels()
        .iter()
        .chain(idx_b.labels())
        .chain(idx_c.labels())
    {
        let occ = &seen[&label];
        let members = occ.axis_a.is_some() as u8
            + occ.axis_b.is_some() as u8
            + occ.axis_c.is_some() as u8;
        if members == 1 {
            return Err(ContractError::UnmatchedIndex { label });
        }
    }

    let bound = |occ: &Occurrence, label: char| BoundIndex {
        label,
        axis_a: occ.axis_a,
        axis_b: occ.axis_b,
        axis_c: occ.axis_c,
        len: occ.len,
    };

    let mut m: IndexGroup = SmallVec::new();
    let mut k: IndexGroup = SmallVec::new();
    for &label in idx_a.labels() {
        let occ = &seen[&label];
        match (occ.axis_b.is_some(), occ.axis_c.is_some()) {
            (false, true) => m.push(bound(occ, label)),
            (true, false) => k.push(bound(occ, label)),
            _ => {}
        }
    }

    let mut n: IndexGroup = SmallVec::new();
    for &label in idx_b.labels() {
        let occ = &seen[&label];
        if occ.axis_a.is_none() && occ.axis_c.is_some() {
            n.push(bound(occ, label));
        }
    }

    let mut batch: IndexGroup = SmallVec::new();
    for &label in idx_c.labels() {
        let occ = &seen[&label];
        if occ.axis_a.is_some() && occ.axis_b.is_some() {
            batch.push(bound(occ, label));
        }
    }

    Ok(ContractionPlan { batch, m, n, k })
}
