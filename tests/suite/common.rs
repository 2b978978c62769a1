//! Shared helpers: deterministic random inputs and a naive reference
//! contraction to check the engine against.

use std::collections::HashMap;

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use tblis::tensor::IndexIter;
use tblis::types::{C32, C64, Scalar};
use tblis::{TensorView, TensorViewMut};

/// Seeded generator so every test is reproducible; the RNG is always passed
/// in explicitly.
pub fn rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Kinds the test harness can draw uniformly from (-1, 1) per component.
pub trait RandomScalar: Scalar {
    fn random<R: Rng>(rng: &mut R) -> Self;
}

impl RandomScalar for f32 {
    fn random<R: Rng>(rng: &mut R) -> Self {
        rng.gen_range(-1.0..1.0)
    }
}

impl RandomScalar for f64 {
    fn random<R: Rng>(rng: &mut R) -> Self {
        rng.gen_range(-1.0..1.0)
    }
}

impl RandomScalar for C32 {
    fn random<R: Rng>(rng: &mut R) -> Self {
        C32::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0))
    }
}

impl RandomScalar for C64 {
    fn random<R: Rng>(rng: &mut R) -> Self {
        C64::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0))
    }
}

/// A vector of random elements for a tensor of the given lengths.
pub fn random_data<T: RandomScalar, R: Rng>(rng: &mut R, lens: &[usize]) -> Vec<T> {
    let count = lens.iter().product();
    (0..count).map(|_| T::random(rng)).collect()
}

/// Direct triple-loop implementation of the contraction formula.
///
/// For every output index, sums `A[idx_A] * B[idx_B]` over the labels that
/// appear in A and B but not C, then applies α and β. Quadratic and slow, but
/// obviously correct.
pub fn naive_contract<T: Scalar>(
    alpha: T,
    a: &TensorView<'_, T>,
    idx_a: &str,
    b: &TensorView<'_, T>,
    idx_b: &str,
    beta: T,
    c: &mut TensorViewMut<'_, T>,
    idx_c: &str,
) {
    let labels_a: Vec<char> = idx_a.chars().collect();
    let labels_b: Vec<char> = idx_b.chars().collect();
    let labels_c: Vec<char> = idx_c.chars().collect();

    // Summed labels and their lengths, taken from A then B.
    let mut sum_labels: Vec<(char, usize)> = Vec::new();
    for (axis, &label) in labels_a.iter().enumerate() {
        if !labels_c.contains(&label) {
            sum_labels.push((label, a.len(axis)));
        }
    }
    for (axis, &label) in labels_b.iter().enumerate() {
        if !labels_c.contains(&label) && !sum_labels.iter().any(|&(l, _)| l == label) {
            sum_labels.push((label, b.len(axis)));
        }
    }
    let sum_lens: Vec<usize> = sum_labels.iter().map(|&(_, len)| len).collect();

    let c_lens: Vec<usize> = c.lens().to_vec();
    for c_idx in IndexIter::new(&c_lens) {
        let mut assignment: HashMap<char, usize> = labels_c
            .iter()
            .zip(&c_idx)
            .map(|(&l, &i)| (l, i))
            .collect();

        let mut total = T::zero();
        for k_idx in IndexIter::new(&sum_lens) {
            for (&(label, _), &i) in sum_labels.iter().zip(&k_idx) {
                assignment.insert(label, i);
            }
            let a_idx: Vec<usize> = labels_a.iter().map(|l| assignment[l]).collect();
            let b_idx: Vec<usize> = labels_b.iter().map(|l| assignment[l]).collect();
            total += a.get(&a_idx) * b.get(&b_idx);
        }

        let value = if beta.is_zero() {
            alpha * total
        } else {
            alpha * total + beta * c.get(&c_idx)
        };
        c.set(&c_idx, value);
    }
}

/// Asserts elementwise closeness with a relative-plus-absolute tolerance.
pub fn assert_close<T: Scalar>(got: &[T], want: &[T], tol: f64)
where
    T::Real: OrdKeyF64,
{
    assert_eq!(got.len(), want.len());
    for (i, (&g, &w)) in got.iter().zip(want).enumerate() {
        let diff = f64::sqrt((g - w).abs2().ord_key_f64());
        let scale = 1.0 + f64::sqrt(w.abs2().ord_key_f64());
        assert!(
            diff <= tol * scale,
            "element {i}: got {g:?}, want {w:?} (diff {diff:e})"
        );
    }
}

/// Widens any real kind to f64 for tolerance arithmetic.
pub trait OrdKeyF64 {
    fn ord_key_f64(self) -> f64;
}

impl OrdKeyF64 for f32 {
    fn ord_key_f64(self) -> f64 {
        self as f64
    }
}

impl OrdKeyF64 for f64 {
    fn ord_key_f64(self) -> f64 {
        self
    }
}
