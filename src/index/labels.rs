//! Index strings.
//!
//! An index string labels the axes of one tensor, one character per axis,
//! e.g. `"ij"` for a matrix. The alphabet is whatever the caller agrees on
//! (single letters by convention); the only structural rule is that a label
//! may not repeat within one string.

use core::fmt;

use smallvec::SmallVec;

use crate::error::{ContractError, ContractResult};

/// The parsed index labels of one tensor, in axis order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexString {
    labels: SmallVec<[char; 8]>,
}

impl IndexString {
    /// Parses an index string.
    ///
    /// Whitespace is ignored; every other character is taken as a label.
    /// Fails with [`ContractError::MalformedIndex`] on a repeated label.
    pub fn parse(s: &str) -> ContractResult<Self> {
        let mut labels: SmallVec<[char; 8]> = SmallVec::new();
        for c in s.chars() {
            if c.is_whitespace() {
                continue;
            }
            if labels.contains(&c) {
                return Err(ContractError::malformed(c, s));
            }
            labels.push(c);
        }
        Ok(Self { labels })
    }

    /// Number of labelled axes.
    #[inline]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Labels in axis order.
    #[inline]
    pub fn labels(&self) -> &[char] {
        &self.labels
    }

    pub fn contains(&self, c: char) -> bool {
        self.labels.contains(&c)
    }

    /// Axis carrying the given label.
    pub fn position(&self, c: char) -> Option<usize> {
        self.labels.iter().position(|&l| l == c)
    }
}

impl fmt::Display for IndexString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in &self.labels {
            write!(f, "{c}")?;
        }
        Ok(())
    }
}
