// specpress
// Copyright (c) 2026 The specpress Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The cubic least-squares predictor: fits `y ≈ d + c·x + b·x² + a·x³` to a set of `(x, y)`
//! observations via the normal equations, solved by Gauss-Jordan elimination with
//! first-nonzero-row pivoting.
//!
//! Used in three shapes across the family codecs: fitting profile m/z against sample index
//! (Bruker1), fitting inter-peak gap against `log10(m/z)` (AB SCIEX), and fitting the
//! zero-restoration step size against m/z (Waters1).

/// The four coefficients of a fitted cubic, in `(d, c, b, a)` order: `y = d + c·x + b·x² + a·x³`.
pub type Coefficients = (f64, f64, f64, f64);

/// Accumulates `(x, y)` observations and fits a least-squares cubic.
///
/// Points are folded into running power sums as they arrive, and `fit` solves the resulting 4x4
/// normal-equations system once at the end. Degenerate inputs (fewer than two points, or every
/// `x` identical) return the `(0, 1, 0, 0)` identity-like vector that callers treat as "not a
/// real fit".
#[derive(Debug, Default)]
pub struct CubicPredictor {
    count: u64,
    // x_pow[k] holds Σxi^(k+1) for k = 0..=5, i.e. Σx through Σx^6.
    x_pow: [f64; 6],
    // xy_pow[k] holds Σ(xi^k · yi) for k = 0..=3.
    xy_pow: [f64; 4],
    first_x: Option<f64>,
    all_x_equal: bool,
}

impl CubicPredictor {
    pub fn new() -> Self {
        CubicPredictor::default()
    }

    pub fn add_point(&mut self, x: f64, y: f64) {
        self.count += 1;
        match self.first_x {
            None => self.first_x = Some(x),
            Some(first) => {
                if x != first {
                    self.all_x_equal = false;
                }
            }
        }
        let mut xp = 1.0;
        for k in 0..6 {
            xp *= x;
            self.x_pow[k] += xp;
        }
        let mut xyp = y;
        for k in 0..4 {
            self.xy_pow[k] += xyp;
            xyp *= x;
        }
    }

    /// Fits the accumulated points, returning `(0, 1, 0, 0)` if fewer than two distinct x values
    /// were observed.
    pub fn fit(&self) -> Coefficients {
        if self.count < 2 || self.all_x_equal {
            return (0.0, 1.0, 0.0, 0.0);
        }

        // augmented[i][j] for j < 4 is Σx^(i+j) (with Σx^0 = count); augmented[i][4] is Σ(x^i·y).
        let mut power_sum = [0.0f64; 7];
        power_sum[0] = self.count as f64;
        power_sum[1..].copy_from_slice(&self.x_pow);

        let mut augmented = [[0.0f64; 5]; 4];
        for (i, row) in augmented.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().take(4).enumerate() {
                *cell = power_sum[i + j];
            }
            row[4] = self.xy_pow[i];
        }

        gauss_jordan(&mut augmented);
        (augmented[0][4], augmented[1][4], augmented[2][4], augmented[3][4])
    }
}

/// In-place Gauss-Jordan elimination with first-nonzero-row pivoting: for each column, find the
/// first row at or below the current pivot row with a nonzero entry, swap it into place,
/// normalize it to a leading 1, then eliminate that column from every other row (not just the
/// rows below).
fn gauss_jordan(mat: &mut [[f64; 5]; 4]) {
    let rows = mat.len();
    let cols = mat[0].len();
    let mut i = 0;
    let mut j = 0;
    while i < rows && j < cols {
        let mut k = i;
        while k < rows && mat[k][j] == 0.0 {
            k += 1;
        }
        if k < rows {
            if k != i {
                mat.swap(i, k);
            }
            if mat[i][j] != 1.0 {
                let pivot = mat[i][j] + 1e-12;
                for c in (j + 1)..cols {
                    mat[i][c] /= pivot;
                }
                mat[i][j] = 1.0;
            }
            for r in 0..rows {
                if r != i && mat[r][j] != 0.0 {
                    let factor = mat[r][j];
                    for c in (j + 1)..cols {
                        mat[r][c] -= factor * mat[i][c];
                    }
                    mat[r][j] = 0.0;
                }
            }
            i += 1;
        }
        j += 1;
    }
}

/// Evaluates a fitted cubic at `x`.
pub fn eval(coeffs: Coefficients, x: f64) -> f64 {
    let (d, c, b, a) = coeffs;
    d + c * x + b * x * x + a * x * x * x
}

/// The old-style "not a real fit" heuristic: a fit only counts as real when all four
/// coefficients are non-negligible in magnitude *and* the specific linear combination
/// `d + 100c + 10000b + 10^6a` lands inside `(1e-6, 100)`. Anything else — including the
/// `(0, 1, 0, 0)` degenerate sentinel, which zeroes three of the four coefficients — is treated
/// as old-style and not a real fit. Reproduced exactly as observed rather than simplified, since
/// it gates a behavioral fallback in Waters1 zero-restoration.
pub fn looks_like_identity_fit(coeffs: Coefficients) -> bool {
    let (d, c, b, a) = coeffs;
    let combined = d + 100.0 * c + 10_000.0 * b + 1_000_000.0 * a;
    let is_real_fit = d.abs() > 1e-30
        && c.abs() > 1e-30
        && b.abs() > 1e-30
        && a.abs() > 1e-30
        && combined.abs() > 1e-6
        && combined.abs() < 100.0;
    !is_real_fit
}
