//! Decision-variable declarations, chromosome layout and decoding.

use std::ops::Range;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::devices::DeviceId;
use crate::ea::solution::Chromosome;
use crate::error::{EvaluationError, ProblemError};

/// How decision variables are represented in the chromosome.
///
/// One encoding applies to the whole problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableEncoding {
    #[default]
    Binary,
    Real,
}

#[derive(Debug, Clone, PartialEq)]
enum VariableKind {
    None,
    Bits(usize),
    Reals { bounds: Vec<(f64, f64)>, integral: bool },
}

/// Number and kind of variables a device contributes to the chromosome.
///
/// Constructors normalize a zero-length declaration to "no variables", so
/// [`needs_no_variables`](Self::needs_no_variables) is the single check
/// callers rely on.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedVariableInformation {
    kind: VariableKind,
}

impl EncodedVariableInformation {
    pub fn none() -> Self {
        Self {
            kind: VariableKind::None,
        }
    }

    pub fn binary(bits: usize) -> Self {
        if bits == 0 {
            return Self::none();
        }
        Self {
            kind: VariableKind::Bits(bits),
        }
    }

    /// Real variables, one per bounds pair. `integral` variables decode to
    /// integers.
    pub fn real(bounds: Vec<(f64, f64)>, integral: bool) -> Self {
        if bounds.is_empty() {
            return Self::none();
        }
        Self {
            kind: VariableKind::Reals { bounds, integral },
        }
    }

    pub fn needs_no_variables(&self) -> bool {
        matches!(self.kind, VariableKind::None)
    }

    /// Genes this declaration occupies.
    pub fn len(&self) -> usize {
        match &self.kind {
            VariableKind::None => 0,
            VariableKind::Bits(n) => *n,
            VariableKind::Reals { bounds, .. } => bounds.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn encoding(&self) -> Option<VariableEncoding> {
        match self.kind {
            VariableKind::None => None,
            VariableKind::Bits(_) => Some(VariableEncoding::Binary),
            VariableKind::Reals { .. } => Some(VariableEncoding::Real),
        }
    }

    pub fn bounds(&self) -> &[(f64, f64)] {
        match &self.kind {
            VariableKind::Reals { bounds, .. } => bounds,
            _ => &[],
        }
    }

    pub fn is_integral(&self) -> bool {
        matches!(self.kind, VariableKind::Reals { integral: true, .. })
    }

    fn validate(&self, device: &DeviceId, expected: VariableEncoding) -> Result<(), ProblemError> {
        if let Some(found) = self.encoding().filter(|found| *found != expected) {
            return Err(ProblemError::EncodingMismatch {
                device: device.clone(),
                expected,
                found,
            });
        }
        for (index, &(min, max)) in self.bounds().iter().enumerate() {
            if !(min.is_finite() && max.is_finite() && min <= max) {
                return Err(ProblemError::InvalidBounds {
                    device: device.clone(),
                    index,
                    min,
                    max,
                });
            }
        }
        Ok(())
    }
}

/// Decoded chromosome fragment handed to one controllable device.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedSolutionWrapper {
    Booleans(Vec<bool>),
    Integers(Vec<i64>),
    Reals(Vec<f64>),
}

impl DecodedSolutionWrapper {
    pub fn len(&self) -> usize {
        match self {
            Self::Booleans(v) => v.len(),
            Self::Integers(v) => v.len(),
            Self::Reals(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_booleans(&self) -> Option<&[bool]> {
        match self {
            Self::Booleans(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_integers(&self) -> Option<&[i64]> {
        match self {
            Self::Integers(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_reals(&self) -> Option<&[f64]> {
        match self {
            Self::Reals(v) => Some(v),
            _ => None,
        }
    }
}

/// Reads `bits` as an unsigned integer, most significant bit first.
///
/// Only the trailing 64 bits contribute.
pub fn bits_to_u64(bits: &[bool]) -> u64 {
    bits.iter().fold(0_u64, |acc, &b| (acc << 1) | u64::from(b))
}

/// Bits needed to represent every value in `0..=max_value`.
pub fn bits_for(max_value: u64) -> usize {
    (u64::BITS - max_value.leading_zeros()) as usize
}

/// Maps problem parts onto disjoint, contiguous chromosome ranges.
///
/// Ranges follow part order. Parts without variables get no range.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableLayout {
    encoding: VariableEncoding,
    slots: Vec<Option<Range<usize>>>,
    integral: Vec<bool>,
    bounds: Vec<(f64, f64)>,
    len: usize,
}

impl VariableLayout {
    /// Builds the layout, rejecting declarations that do not fit `encoding`.
    pub fn new<'a>(
        encoding: VariableEncoding,
        parts: impl IntoIterator<Item = (&'a DeviceId, &'a EncodedVariableInformation)>,
    ) -> Result<Self, ProblemError> {
        let mut slots = Vec::new();
        let mut integral = Vec::new();
        let mut bounds = Vec::new();
        let mut len = 0;
        for (device, info) in parts {
            info.validate(device, encoding)?;
            integral.push(info.is_integral());
            if info.needs_no_variables() {
                slots.push(None);
                continue;
            }
            slots.push(Some(len..len + info.len()));
            bounds.extend_from_slice(info.bounds());
            len += info.len();
        }
        Ok(Self {
            encoding,
            slots,
            integral,
            bounds,
            len,
        })
    }

    pub fn encoding(&self) -> VariableEncoding {
        self.encoding
    }

    /// Total chromosome length.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn part_count(&self) -> usize {
        self.slots.len()
    }

    /// Chromosome range owned by part `index`.
    pub fn slot(&self, index: usize) -> Option<Range<usize>> {
        self.slots.get(index).cloned().flatten()
    }

    /// Per-gene bounds of a real-encoded layout. Empty for binary layouts.
    pub fn bounds(&self) -> &[(f64, f64)] {
        &self.bounds
    }

    /// Slices `chromosome` into one decoded fragment per part.
    pub fn decode(
        &self,
        chromosome: &Chromosome,
    ) -> Result<Vec<Option<DecodedSolutionWrapper>>, EvaluationError> {
        if chromosome.encoding() != self.encoding {
            return Err(EvaluationError::EncodingMismatch {
                expected: self.encoding,
                found: chromosome.encoding(),
            });
        }
        if chromosome.len() != self.len {
            return Err(EvaluationError::ChromosomeLength {
                expected: self.len,
                actual: chromosome.len(),
            });
        }
        let decoded = self
            .slots
            .iter()
            .zip(&self.integral)
            .map(|(slot, &integral)| {
                let range = slot.clone()?;
                Some(match chromosome {
                    Chromosome::Binary(bits) => DecodedSolutionWrapper::Booleans(bits[range].to_vec()),
                    Chromosome::Real(genes) => {
                        let bounds = &self.bounds[range.clone()];
                        let clamped = genes[range].iter().zip(bounds).map(|(g, (lo, hi))| g.clamp(*lo, *hi));
                        if integral {
                            DecodedSolutionWrapper::Integers(clamped.map(|g| g.round() as i64).collect())
                        } else {
                            DecodedSolutionWrapper::Reals(clamped.collect())
                        }
                    }
                })
            })
            .collect();
        Ok(decoded)
    }

    /// Uniformly random chromosome within the layout.
    pub fn random_chromosome<R: Rng + ?Sized>(&self, rng: &mut R) -> Chromosome {
        match self.encoding {
            VariableEncoding::Binary => Chromosome::Binary((0..self.len).map(|_| rng.random_bool(0.5)).collect()),
            VariableEncoding::Real => Chromosome::Real(
                self.bounds
                    .iter()
                    .map(|&(lo, hi)| if lo < hi { rng.random_range(lo..=hi) } else { lo })
                    .collect(),
            ),
        }
    }
}
