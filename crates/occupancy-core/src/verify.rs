//! Correctness check for constant-filled matrix products.

/// Maximum accepted relative error, normalized by dot-product length.
pub const RELATIVE_TOLERANCE: f64 = 1e-6;

/// One output element outside tolerance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mismatch {
    pub index: usize,
    pub value: f32,
    pub expected: f64,
}

/// Outcome of checking one output buffer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VerifyReport {
    /// Number of elements compared.
    pub checked: usize,
    /// Elements outside tolerance, in index order.
    pub mismatches: Vec<Mismatch>,
}

impl VerifyReport {
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty()
    }

    /// Fold another buffer's report into this one.
    pub fn merge(&mut self, other: VerifyReport) {
        self.checked += other.checked;
        self.mismatches.extend(other.mismatches);
    }
}

/// Compare every element of `c` against `expected`.
///
/// When `A` is filled with `a` and `B` with `b`, every element of `C = A * B`
/// equals `dot_length * a * b`. The relative error
/// `|c - expected| / |c| / dot_length` must not exceed
/// [`RELATIVE_TOLERANCE`]. Non-finite outputs always fail.
pub fn verify_constant_product(c: &[f32], dot_length: usize, expected: f64) -> VerifyReport {
    let dot_length = dot_length.max(1) as f64;
    let mismatches = c
        .iter()
        .enumerate()
        .filter_map(|(index, &value)| {
            let v = value as f64;
            let abs_err = (v - expected).abs();
            let ok = v.is_finite() && (abs_err == 0.0 || abs_err / v.abs() / dot_length <= RELATIVE_TOLERANCE);
            (!ok).then_some(Mismatch {
                index,
                value,
                expected,
            })
        })
        .collect::<Vec<_>>();

    if !mismatches.is_empty() {
        tracing::warn!(
            checked = c.len(),
            failed = mismatches.len(),
            "output outside tolerance"
        );
    }

    VerifyReport {
        checked: c.len(),
        mismatches,
    }
}
