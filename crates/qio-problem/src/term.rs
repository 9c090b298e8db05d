//! A single weighted term of a cost function.

use std::fmt;

use serde::Serialize;

use crate::coefficient::Coefficient;
use crate::error::{ProblemError, ProblemResult};

/// One term of a cost function: a coefficient and the variables it couples.
///
/// Terms are immutable once built. The indices are kept exactly as given,
/// including the difference between "not given" (`None`, serialized as
/// `null`) and an empty list.
///
/// Serializes as `{"c": <number>, "ids": [<int>, ...] | null}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Term {
    c: Coefficient,
    ids: Option<Vec<u32>>,
}

impl Term {
    /// Build a term from a coefficient and the variables it couples.
    pub fn new(c: impl Into<Coefficient>, indices: Vec<u32>) -> ProblemResult<Self> {
        Self::try_new(Some(indices), None, Some(c.into()))
    }

    /// Build a term from the legacy weight parameter `w`.
    pub fn with_weight(w: impl Into<Coefficient>, indices: Vec<u32>) -> ProblemResult<Self> {
        Self::try_new(Some(indices), Some(w.into()), None)
    }

    /// Build a term from either the legacy `w` or the canonical `c`.
    ///
    /// Exactly one of the two must be supplied and it must be finite.
    pub fn try_new(
        indices: Option<Vec<u32>>,
        w: Option<Coefficient>,
        c: Option<Coefficient>,
    ) -> ProblemResult<Self> {
        let c = match (w, c) {
            (None, None) => {
                return Err(ProblemError::Validation(
                    "Cost should be provided for each term".to_string(),
                ));
            }
            (Some(_), Some(_)) => {
                return Err(ProblemError::Validation(
                    "Cost has been specified multiple times; do not specify 'w' if using 'c'"
                        .to_string(),
                ));
            }
            (Some(w), None) => w,
            (None, Some(c)) => c,
        };

        if !c.is_finite() {
            return Err(ProblemError::Validation(format!(
                "Cost must be a finite number, got {c}"
            )));
        }

        Ok(Self { c, ids: indices })
    }

    /// Coefficient of the term.
    pub fn coefficient(&self) -> Coefficient {
        self.c
    }

    /// Variables coupled by the term, as given at construction.
    pub fn variable_indices(&self) -> Option<&[u32]> {
        self.ids.as_deref()
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{c: {}, ids: ", self.c)?;
        match &self.ids {
            Some(ids) => write!(f, "{ids:?}}}"),
            None => write!(f, "None}}"),
        }
    }
}
