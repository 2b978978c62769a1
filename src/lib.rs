//! # tblis
//!
//! BLIS-style tensor contraction for CPU: a cache-blocked, thread-parallel
//! matrix-multiplication machine generalised so the logical matrix axes are
//! compositions of tensor indices strided arbitrarily through memory.
//!
//! ## Features
//!
//! - Einstein-style labelled contraction `C := α·A·B + β·C` over two dense
//!   strided operands, with batched (shared) labels
//! - Four numeric kinds: `f32`, `f64`, `Complex<f32>`, `Complex<f64>`
//! - Five-loop blocked kernel with packing, register microkernels, and a
//!   hierarchical thread communicator
//! - Thin elementwise primitives: norm, scale, copy, add, reduce
//!
//! ## Example
//!
//! ```
//! use tblis::{TensorView, TensorViewMut, contract};
//!
//! // Matrix multiplication: C[ik] = sum_j A[ij] * B[jk]
//! let a_data: Vec<f64> = (0..6).map(|i| i as f64).collect();
//! let b_data: Vec<f64> = (0..12).map(|i| i as f64).collect();
//! let mut c_data = vec![0.0f64; 8];
//!
//! let a = TensorView::from_slice(&a_data, &[2, 3]);
//! let b = TensorView::from_slice(&b_data, &[3, 4]);
//! let mut c = TensorViewMut::from_slice(&mut c_data, &[2, 4]);
//!
//! contract(1.0, &a, "ij", &b, "jk", 0.0, &mut c, "ik").unwrap();
//! ```

pub mod blocking;
pub mod comm;
pub mod config;
pub mod contract;
pub mod error;
pub mod index;
pub mod kernels;
pub mod tensor;
pub mod types;
pub mod vector;

mod util;

pub use config::{Backend, Config};
pub use contract::{contract, contract_with};
pub use error::{ContractError, ContractResult};
pub use index::{ContractionPlan, IndexString};
pub use kernels::GemmKernel;
pub use tensor::{TensorView, TensorViewMut};
pub use types::{C32, C64, Scalar};
pub use vector::{ReduceOp, add, copy, norm, reduce, scale};
