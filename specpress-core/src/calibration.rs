// specpress
// Copyright (c) 2026 The specpress Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The m/z segment codec: maps a 32-bit raw instrument value to a physical m/z `f64`
//! through eleven piecewise-linear segments, each valid over its own contiguous range of raw
//! values, then optionally applies a primary calibration polynomial and a secondary
//! "modification" polynomial.
//!
//! The segments are *not* joined continuously in the m/z domain: decoding the raw value just
//! below a breakpoint and decoding the raw value at the breakpoint can both land in the same
//! m/z neighbourhood, so two different raw ranges legitimately decode to overlapping m/z. This
//! is reproduced as observed rather than smoothed over; [`encode_segment`] resolves the
//! resulting ambiguity by picking the segment whose own raw range the inverted value actually
//! falls back into.

/// Segments as `(raw_lower_bound_inclusive, raw_upper_bound_exclusive, divisor, offset)`.
/// Within a segment, `mz = raw / divisor - offset`.
const SEGMENTS: [(u32, u32, f64, f64); 10] = [
    (0x3400_0000, 0x3C00_0000, 2_097_152.0, 384.0),
    (0x3C00_0000, 0x4400_0000, 1_048_576.0, 896.0),
    (0x4400_0000, 0x4C00_0000, 524_288.0, 2048.0),
    (0x4C00_0000, 0x5400_0000, 262_144.0, 4608.0),
    (0x5400_0000, 0x5C00_0000, 131_072.0, 10_240.0),
    (0x5C00_0000, 0x6400_0000, 65_536.0, 22_528.0),
    (0x6400_0000, 0x6C00_0000, 32_768.0, 49_152.0),
    (0x6C00_0000, 0x7400_0000, 16_384.0, 106_496.0),
    (0x7400_0000, 0x7C00_0000, 8_192.0, 229_375.0),
    (0x7C00_0000, 0x8400_0000, 4_096.0, 491_520.0),
];

const LOWER_BOUND_RAW: u32 = 0x3400_0000;
const UPPER_BOUND_RAW: u32 = 0x8400_0000;
const LOWER_BOUND_MZ: f64 = 32.0;
const UPPER_BOUND_MZ: f64 = 32768.0;

/// Decodes a raw instrument value into an uncalibrated m/z, clamping out-of-range input to the
/// table's endpoints. `0` always decodes to `0.0` (the sentinel for "no peak here").
pub fn decode_segment(raw: u32) -> f64 {
    if raw == 0 {
        return 0.0;
    }
    if raw < LOWER_BOUND_RAW {
        return LOWER_BOUND_MZ;
    }
    for &(_, upper, divisor, offset) in &SEGMENTS {
        if raw < upper {
            return raw as f64 / divisor - offset;
        }
    }
    UPPER_BOUND_MZ
}

/// Encodes an m/z value back into its raw segment representation.
///
/// Tries each segment's algebraic inverse in raw order and accepts the first candidate raw
/// value that actually falls within that segment's own raw range, which is the defining
/// criterion (segments are windows over raw, not over m/z). Needed by the Waters1 profile
/// encoder and by zero-restoration, which both work forward from a physical m/z to the
/// instrument's native integer domain.
pub fn encode_segment(mz: f64) -> u32 {
    if mz <= 0.0 {
        return 0;
    }
    if mz <= LOWER_BOUND_MZ {
        return LOWER_BOUND_RAW;
    }
    if mz >= UPPER_BOUND_MZ {
        return UPPER_BOUND_RAW;
    }
    for &(lower, upper, divisor, offset) in &SEGMENTS {
        let candidate = ((mz + offset) * divisor).round();
        if candidate >= lower as f64 && candidate < upper as f64 {
            return candidate as u32;
        }
    }
    // No segment's own raw range reclaims the candidate (possible in the ambiguous overlap
    // bands between segments); fall back to the segment whose raw range contains the nearest
    // candidate clamped to its bounds.
    let mut best = (UPPER_BOUND_RAW, f64::INFINITY);
    for &(lower, upper, divisor, offset) in &SEGMENTS {
        let candidate = ((mz + offset) * divisor).round();
        let clamped = candidate.clamp(lower as f64, (upper - 1) as f64) as u32;
        let err = (decode_segment(clamped) - mz).abs();
        if err < best.1 {
            best = (clamped, err);
        }
    }
    best.0
}

/// Which monomial basis a calibration polynomial's coefficients are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoefficientsType {
    #[default]
    None,
    /// Coefficients multiply successive powers of m/z.
    T0,
    /// Coefficients multiply successive powers of `sqrt(m/z)`; the result is squared at the end.
    T1,
}

/// A parsed calibration polynomial: at most 6 coefficients plus the basis they're expressed in.
///
/// Used for the per-function "calibration modification" polynomial. The *primary* calibration
/// polynomial applied by [`apply_primary`] is untyped on purpose: it dispatches on the sign of
/// its second coefficient rather than a parsed type tag, reproducing an instrument-specific
/// quirk rather than the generic T0/T1 distinction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalibrationPolynomial {
    pub kind: CoefficientsType,
    pub coefficients: Vec<f64>,
}

impl CalibrationPolynomial {
    pub fn is_present(&self) -> bool {
        self.kind != CoefficientsType::None && !self.coefficients.is_empty()
    }
}

fn coeff(coeffs: &[f64], index: usize) -> f64 {
    coeffs.get(index).copied().unwrap_or(0.0)
}

/// Applies the primary calibration polynomial to an uncalibrated m/z.
///
/// When `coeffs[1] < 0` (observed on SQD-family instruments), the formula flips the sign of
/// the linear term: `c0 - c1·mz + c2·mz² + c3·mz³ + c4·mz⁴` (this branch never uses a `c5` term;
/// that asymmetry is preserved rather than "fixed"). Otherwise the formula is expressed in
/// `sqrt(mz)` and squared at the end:
/// `(c0 + c1·√mz + c2·mz + c3·√mz·mz + c4·mz² + c5·mz²·√mz)²`.
pub fn apply_primary(val: f64, coeffs: &[f64]) -> f64 {
    if coeffs.is_empty() {
        return val;
    }
    let (c0, c1, c2, c3, c4, c5) = (
        coeff(coeffs, 0),
        coeff(coeffs, 1),
        coeff(coeffs, 2),
        coeff(coeffs, 3),
        coeff(coeffs, 4),
        coeff(coeffs, 5),
    );
    if c1 < 0.0 {
        let val2 = val * val;
        c0 - c1 * val + c2 * val2 + c3 * val2 * val + c4 * val2 * val2
    } else {
        let vsq = val.sqrt();
        let val2 = val * val;
        let oval = c0 + c1 * vsq + c2 * val + c3 * vsq * val + c4 * val2 + c5 * val2 * vsq;
        oval * oval
    }
}

/// Applies an optional calibration modification polynomial on top of an already-calibrated m/z.
///
/// Unlike [`apply_primary`], this dispatches on the polynomial's parsed [`CoefficientsType`]
/// and sums an arbitrary number of coefficients (up to 6) as a plain monomial series, squaring
/// the result for `T1`.
pub fn apply_modification(oval: f64, modification: &CalibrationPolynomial) -> f64 {
    match modification.kind {
        CoefficientsType::None => oval,
        CoefficientsType::T0 => {
            let mut sum = 0.0;
            let mut power = 1.0;
            for &c in &modification.coefficients {
                sum += c * power;
                power *= oval;
            }
            sum
        }
        CoefficientsType::T1 => {
            let vsq = oval.sqrt();
            let mut sum = 0.0;
            let mut power = 1.0;
            for &c in &modification.coefficients {
                sum += c * power;
                power *= vsq;
            }
            sum * sum
        }
    }
}

/// Full decode pipeline: segment decode, then primary calibration, then modification, in that
/// fixed order.
pub fn decode_and_calibrate(
    raw: u32,
    primary: Option<&[f64]>,
    modification: Option<&CalibrationPolynomial>,
) -> f64 {
    if raw == 0 {
        return 0.0;
    }
    let mut val = decode_segment(raw);
    if let Some(coeffs) = primary {
        val = apply_primary(val, coeffs);
    }
    if let Some(modif) = modification {
        if modif.is_present() {
            val = apply_modification(val, modif);
        }
    }
    val
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_round_trips_without_calibration() {
        for raw in (LOWER_BOUND_RAW..UPPER_BOUND_RAW).step_by(997) {
            let mz = decode_segment(raw);
            let back = encode_segment(mz);
            let mz_again = decode_segment(back);
            assert!(
                (mz_again - mz).abs() < 1e-6,
                "raw={raw:#x} mz={mz} back={back:#x} mz_again={mz_again}"
            );
        }
    }

    #[test]
    fn zero_raw_decodes_to_zero() {
        assert_eq!(decode_segment(0), 0.0);
        assert_eq!(decode_and_calibrate(0, Some(&[1.0, 2.0]), None), 0.0);
    }

    #[test]
    fn below_lower_bound_clamps() {
        assert_eq!(decode_segment(1), LOWER_BOUND_MZ);
        assert_eq!(decode_segment(u32::MAX), UPPER_BOUND_MZ);
    }

    #[test]
    fn primary_calibration_difference_is_linear_in_coefficient() {
        let raw = 0x5000_0000u32;
        let base = decode_and_calibrate(raw, Some(&[0.0, 1.0, 0.0, 0.0, 0.0, 0.0]), None);
        let shifted =
            decode_and_calibrate(raw, Some(&[0.0, 1.0001, 0.0, 0.0, 0.0, 0.0]), None);
        let mz = decode_segment(raw);
        assert!((shifted - base - 0.0001 * mz).abs() < 1e-9);
    }

    #[test]
    fn negative_c1_uses_sign_inverted_formula() {
        let val = 500.0;
        let coeffs = [1.0, -0.5, 0.0, 0.0, 0.0, 0.0];
        let got = apply_primary(val, &coeffs);
        let expected = 1.0 - (-0.5) * val;
        assert!((got - expected).abs() < 1e-9);
    }
}
