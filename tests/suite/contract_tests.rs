//! End-to-end contraction tests: literal scenarios plus randomized checks
//! against the naive reference.

use pretty_assertions::assert_eq;

use tblis::types::C64;
use tblis::{Config, TensorView, TensorViewMut, contract_with};

use crate::common::{assert_close, naive_contract, random_data, rng};

fn config() -> Config {
    Config::default().with_num_threads(2)
}

#[test]
fn test_identity_matmul() {
    // A = B = I3; C must come out as I3 regardless of its prior contents.
    let eye = [1.0f64, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];
    let a = TensorView::from_slice(&eye, &[3, 3]);
    let b = TensorView::from_slice(&eye, &[3, 3]);
    let mut c_data = [9.0f64; 9];
    let mut c = TensorViewMut::from_slice(&mut c_data, &[3, 3]);

    contract_with(&config(), 1.0, &a, "ij", &b, "jk", 0.0, &mut c, "ik").unwrap();
    assert_eq!(c_data, eye);
}

#[test]
fn test_dot_product_as_contraction() {
    let v = [1.0f64, 2.0, 3.0, 4.0];
    let a = TensorView::from_slice(&v, &[4]);
    let b = TensorView::from_slice(&v, &[4]);
    let mut c_data = [0.0f64];
    let mut c = TensorViewMut::from_slice(&mut c_data, &[]);

    contract_with(&config(), 1.0, &a, "i", &b, "i", 0.0, &mut c, "").unwrap();
    assert_eq!(c_data[0], 30.0);
}

#[test]
fn test_outer_product() {
    let a_data = [1.0f64, 2.0];
    let b_data = [10.0f64, 20.0, 30.0];
    let a = TensorView::from_slice(&a_data, &[2]);
    let b = TensorView::from_slice(&b_data, &[3]);
    let mut c_data = [0.0f64; 6];
    let mut c = TensorViewMut::from_slice(&mut c_data, &[2, 3]);

    contract_with(&config(), 1.0, &a, "i", &b, "j", 0.0, &mut c, "ij").unwrap();
    assert_eq!(c_data, [10.0, 20.0, 30.0, 20.0, 40.0, 60.0]);
}

#[test]
fn test_batched_gemm_matches_per_slice() {
    let mut rng = rng(41);
    let a_data: Vec<f64> = random_data(&mut rng, &[2, 3, 4]);
    let b_data: Vec<f64> = random_data(&mut rng, &[2, 4, 5]);
    let a = TensorView::from_slice(&a_data, &[2, 3, 4]);
    let b = TensorView::from_slice(&b_data, &[2, 4, 5]);

    let mut c_data = vec![0.0f64; 2 * 3 * 5];
    let mut c = TensorViewMut::from_slice(&mut c_data, &[2, 3, 5]);
    contract_with(&config(), 1.0, &a, "bij", &b, "bjk", 0.0, &mut c, "bik").unwrap();

    // Each batch is an independent GEMM over the corresponding slices.
    for batch in 0..2 {
        let a_slice = TensorView::from_slice(&a_data[batch * 12..(batch + 1) * 12], &[3, 4]);
        let b_slice = TensorView::from_slice(&b_data[batch * 20..(batch + 1) * 20], &[4, 5]);
        let mut want = vec![0.0f64; 15];
        let mut want_view = TensorViewMut::from_slice(&mut want, &[3, 5]);
        contract_with(
            &config(),
            1.0,
            &a_slice,
            "ij",
            &b_slice,
            "jk",
            0.0,
            &mut want_view,
            "ik",
        )
        .unwrap();
        assert_close(&c_data[batch * 15..(batch + 1) * 15], &want, 1e-13);
    }
}

#[test]
fn test_permuted_output_is_transpose() {
    let mut rng = rng(42);
    let a_data: Vec<f64> = random_data(&mut rng, &[3, 4]);
    let b_data: Vec<f64> = random_data(&mut rng, &[4, 5]);
    let a = TensorView::from_slice(&a_data, &[3, 4]);
    let b = TensorView::from_slice(&b_data, &[4, 5]);

    let mut ik = vec![0.0f64; 15];
    let mut ik_view = TensorViewMut::from_slice(&mut ik, &[3, 5]);
    contract_with(&config(), 1.0, &a, "ij", &b, "jk", 0.0, &mut ik_view, "ik").unwrap();

    let mut ki = vec![0.0f64; 15];
    let mut ki_view = TensorViewMut::from_slice(&mut ki, &[5, 3]);
    contract_with(&config(), 1.0, &a, "ij", &b, "jk", 0.0, &mut ki_view, "ki").unwrap();

    for i in 0..3 {
        for k in 0..5 {
            assert_eq!(ki[k * 3 + i], ik[i * 5 + k]);
        }
    }
}

#[test]
fn test_alpha_beta_against_naive() {
    let mut rng = rng(43);
    let a_data: Vec<f64> = random_data(&mut rng, &[17, 23]);
    let b_data: Vec<f64> = random_data(&mut rng, &[23, 11]);
    let c_init: Vec<f64> = random_data(&mut rng, &[17, 11]);

    let a = TensorView::from_slice(&a_data, &[17, 23]);
    let b = TensorView::from_slice(&b_data, &[23, 11]);

    let mut got = c_init.clone();
    let mut got_view = TensorViewMut::from_slice(&mut got, &[17, 11]);
    contract_with(&config(), 2.0, &a, "ij", &b, "jk", -1.0, &mut got_view, "ik").unwrap();

    let mut want = c_init.clone();
    let mut want_view = TensorViewMut::from_slice(&mut want, &[17, 11]);
    naive_contract(2.0, &a, "ij", &b, "jk", -1.0, &mut want_view, "ik");

    assert_close(&got, &want, 1e-10);
}

#[test]
fn test_beta_zero_ignores_nan_and_inf() {
    let a_data = [1.0f64, 2.0, 3.0, 4.0];
    let a = TensorView::from_slice(&a_data, &[2, 2]);
    let b = TensorView::from_slice(&a_data, &[2, 2]);
    let mut c_data = [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, f64::NAN];
    let mut c = TensorViewMut::from_slice(&mut c_data, &[2, 2]);

    contract_with(&config(), 1.0, &a, "ij", &b, "jk", 0.0, &mut c, "ik").unwrap();
    assert!(c_data.iter().all(|v| v.is_finite()));
    // [1 2; 3 4]^2 = [7 10; 15 22]
    assert_eq!(c_data, [7.0, 10.0, 15.0, 22.0]);
}

#[test]
fn test_output_permutation_invariance() {
    // Transposing C's view and permuting its index string must not change
    // the result.
    let mut rng = rng(44);
    let a_data: Vec<f64> = random_data(&mut rng, &[6, 7]);
    let b_data: Vec<f64> = random_data(&mut rng, &[7, 8]);
    let a = TensorView::from_slice(&a_data, &[6, 7]);
    let b = TensorView::from_slice(&b_data, &[7, 8]);

    let mut plain = vec![0.0f64; 48];
    let mut plain_view = TensorViewMut::from_slice(&mut plain, &[6, 8]);
    contract_with(&config(), 1.0, &a, "ij", &b, "jk", 0.0, &mut plain_view, "ik").unwrap();

    let mut permuted = vec![0.0f64; 48];
    let permuted_view = TensorViewMut::from_slice(&mut permuted, &[6, 8]);
    let mut transposed = permuted_view.permuted(&[1, 0]);
    contract_with(&config(), 1.0, &a, "ij", &b, "jk", 0.0, &mut transposed, "ki").unwrap();

    assert_eq!(plain, permuted);
}

#[test]
fn test_pure_batch_is_per_slice_product() {
    // No K group at all: every batch entry is an independent scalar product.
    let a_data = [2.0f64, 3.0];
    let b_data = [10.0f64, 100.0];
    let a = TensorView::from_slice(&a_data, &[2]);
    let b = TensorView::from_slice(&b_data, &[2]);
    let mut c_data = [0.0f64; 2];
    let mut c = TensorViewMut::from_slice(&mut c_data, &[2]);

    contract_with(&config(), 1.0, &a, "b", &b, "b", 0.0, &mut c, "b").unwrap();
    assert_eq!(c_data, [20.0, 300.0]);
}

#[test]
fn test_fused_groups_against_naive() {
    // Two labels in every group: M = (a, i), K = (j, b), N = (k,).
    let mut rng = rng(45);
    let lens_a = [2, 3, 4, 2]; // a i j b
    let lens_b = [2, 4, 5]; // b j k
    let lens_c = [2, 3, 5]; // a i k
    let a_data: Vec<f64> = random_data(&mut rng, &lens_a);
    let b_data: Vec<f64> = random_data(&mut rng, &lens_b);

    let a = TensorView::from_slice(&a_data, &lens_a);
    let b = TensorView::from_slice(&b_data, &lens_b);

    let mut got = vec![0.0f64; 30];
    let mut got_view = TensorViewMut::from_slice(&mut got, &lens_c);
    contract_with(&config(), 1.0, &a, "aijb", &b, "bjk", 0.0, &mut got_view, "aik").unwrap();

    let mut want = vec![0.0f64; 30];
    let mut want_view = TensorViewMut::from_slice(&mut want, &lens_c);
    naive_contract(1.0, &a, "aijb", &b, "bjk", 0.0, &mut want_view, "aik");

    assert_close(&got, &want, 1e-12);
}

#[test]
fn test_transposed_inputs_against_naive() {
    let mut rng = rng(46);
    let a_data: Vec<f64> = random_data(&mut rng, &[13, 9]);
    let b_data: Vec<f64> = random_data(&mut rng, &[9, 12]);

    // A is stored (i, j) and handed to the engine through a transposed view
    // labelled "ji"; the result must match the plain layout.
    let a_stored = TensorView::from_slice(&a_data, &[13, 9]);
    let a = a_stored.permuted(&[1, 0]);
    let b = TensorView::from_slice(&b_data, &[9, 12]);

    let mut got = vec![0.0f64; 13 * 12];
    let mut got_view = TensorViewMut::from_slice(&mut got, &[13, 12]);
    contract_with(&config(), 1.0, &a, "ji", &b, "jk", 0.0, &mut got_view, "ik").unwrap();

    let mut want = vec![0.0f64; 13 * 12];
    let mut want_view = TensorViewMut::from_slice(&mut want, &[13, 12]);
    naive_contract(1.0, &a_stored, "ij", &b, "jk", 0.0, &mut want_view, "ik");

    assert_close(&got, &want, 1e-12);
}

#[test]
fn test_complex_contraction_against_naive() {
    let mut rng = rng(47);
    let a_data: Vec<C64> = random_data(&mut rng, &[7, 8]);
    let b_data: Vec<C64> = random_data(&mut rng, &[8, 6]);
    let c_init: Vec<C64> = random_data(&mut rng, &[7, 6]);

    let a = TensorView::from_slice(&a_data, &[7, 8]);
    let b = TensorView::from_slice(&b_data, &[8, 6]);
    let alpha = C64::new(0.5, -1.5);
    let beta = C64::new(-1.0, 0.25);

    let mut got = c_init.clone();
    let mut got_view = TensorViewMut::from_slice(&mut got, &[7, 6]);
    contract_with(&config(), alpha, &a, "ij", &b, "jk", beta, &mut got_view, "ik").unwrap();

    let mut want = c_init.clone();
    let mut want_view = TensorViewMut::from_slice(&mut want, &[7, 6]);
    naive_contract(alpha, &a, "ij", &b, "jk", beta, &mut want_view, "ik");

    assert_close(&got, &want, 1e-12);
}

#[test]
fn test_multiple_cache_blocks_against_naive() {
    // Small block overrides force several JC/PC/IC iterations, exercising the
    // beta -> 1 carry across PC.
    let mut rng = rng(48);
    let config = Config::default()
        .with_num_threads(4)
        .with_blocks(Some(16), Some(12), Some(8));

    let a_data: Vec<f64> = random_data(&mut rng, &[37, 29]);
    let b_data: Vec<f64> = random_data(&mut rng, &[29, 31]);
    let c_init: Vec<f64> = random_data(&mut rng, &[37, 31]);

    let a = TensorView::from_slice(&a_data, &[37, 29]);
    let b = TensorView::from_slice(&b_data, &[29, 31]);

    let mut got = c_init.clone();
    let mut got_view = TensorViewMut::from_slice(&mut got, &[37, 31]);
    contract_with(&config, 1.5, &a, "ij", &b, "jk", 0.5, &mut got_view, "ik").unwrap();

    let mut want = c_init.clone();
    let mut want_view = TensorViewMut::from_slice(&mut want, &[37, 31]);
    naive_contract(1.5, &a, "ij", &b, "jk", 0.5, &mut want_view, "ik");

    assert_close(&got, &want, 1e-11);
}

#[test]
fn test_f32_matches_naive_within_kind_epsilon() {
    let mut rng = rng(49);
    let a_data: Vec<f32> = random_data(&mut rng, &[20, 30]);
    let b_data: Vec<f32> = random_data(&mut rng, &[30, 10]);

    let a = TensorView::from_slice(&a_data, &[20, 30]);
    let b = TensorView::from_slice(&b_data, &[30, 10]);

    let mut got = vec![0.0f32; 200];
    let mut got_view = TensorViewMut::from_slice(&mut got, &[20, 10]);
    contract_with(&config(), 1.0f32, &a, "ij", &b, "jk", 0.0, &mut got_view, "ik").unwrap();

    let mut want = vec![0.0f32; 200];
    let mut want_view = TensorViewMut::from_slice(&mut want, &[20, 10]);
    naive_contract(1.0f32, &a, "ij", &b, "jk", 0.0, &mut want_view, "ik");

    // epsilon scaled by the K extent
    assert_close(&got, &want, 10.0 * 31.0 * f32::EPSILON as f64);
}
