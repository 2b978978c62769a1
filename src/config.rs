//! Configuration for contraction execution.
//!
//! Read from the environment at driver entry; every variable is optional and
//! every invalid value is a [`ConfigError`](crate::ContractError::ConfigError)
//! surfaced before any work starts.

use std::env;

use crate::error::{ContractError, ContractResult};

/// `TBLIS_NUM_THREADS` — positive integer, overrides team size detection.
pub const ENV_NUM_THREADS: &str = "TBLIS_NUM_THREADS";
/// `TBLIS_BLOCK_MC` — positive integer, overrides the MC cache block.
pub const ENV_BLOCK_MC: &str = "TBLIS_BLOCK_MC";
/// `TBLIS_BLOCK_NC` — positive integer, overrides the NC cache block.
pub const ENV_BLOCK_NC: &str = "TBLIS_BLOCK_NC";
/// `TBLIS_BLOCK_KC` — positive integer, overrides the KC cache block.
pub const ENV_BLOCK_KC: &str = "TBLIS_BLOCK_KC";
/// `TBLIS_IMPL` — `blis` (native core) or `blas` (external-GEMM fallback).
pub const ENV_IMPL: &str = "TBLIS_IMPL";

/// Which contraction engine backs the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// The native BLIS-style blocked kernel.
    Blis,
    /// Delegate to an external GEMM after explicit reshape.
    ///
    /// This build carries no external BLAS, so selecting `blas` is accepted
    /// and routed through the native core; the substitution is logged once
    /// per call.
    Blas,
}

/// Execution options for one contraction call.
#[derive(Debug, Clone)]
pub struct Config {
    /// Team size; defaults to the detected core count.
    pub num_threads: usize,
    /// MC override in elements, `None` for the blocking policy's choice.
    pub block_mc: Option<usize>,
    /// NC override.
    pub block_nc: Option<usize>,
    /// KC override.
    pub block_kc: Option<usize>,
    /// Selected backend.
    pub backend: Backend,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            num_threads: num_cpus::get(),
            block_mc: None,
            block_nc: None,
            block_kc: None,
            backend: Backend::Blis,
        }
    }
}

impl Config {
    /// Builds a config from the environment, falling back to defaults for
    /// unset variables.
    pub fn from_env() -> ContractResult<Self> {
        let mut config = Self::default();
        if let Some(threads) = positive_var(ENV_NUM_THREADS)? {
            config.num_threads = threads;
        }
        config.block_mc = positive_var(ENV_BLOCK_MC)?;
        config.block_nc = positive_var(ENV_BLOCK_NC)?;
        config.block_kc = positive_var(ENV_BLOCK_KC)?;
        if let Ok(value) = env::var(ENV_IMPL) {
            config.backend = match value.as_str() {
                "blis" => Backend::Blis,
                "blas" => Backend::Blas,
                _ => return Err(ContractError::config(ENV_IMPL, value)),
            };
        }
        Ok(config)
    }

    /// Sets the team size.
    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads.max(1);
        self
    }

    /// Overrides the cache block sizes; `None` keeps the policy's choice.
    pub fn with_blocks(
        mut self,
        mc: Option<usize>,
        nc: Option<usize>,
        kc: Option<usize>,
    ) -> Self {
        self.block_mc = mc;
        self.block_nc = nc;
        self.block_kc = kc;
        self
    }

    /// Selects the backend.
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }
}

fn positive_var(variable: &str) -> ContractResult<Option<usize>> {
    match env::var(variable) {
        Ok(value) => match value.trim().parse::<usize>() {
            Ok(parsed) if parsed > 0 => Ok(Some(parsed)),
            _ => Err(ContractError::config(variable, value)),
        },
        Err(_) => Ok(None),
    }
}
