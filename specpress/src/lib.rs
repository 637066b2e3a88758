// specpress
// Copyright (c) 2026 The specpress Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The public library surface: `encode_spectrum(family, mz[], intensity[]) -> bytes` and
//! `decode_spectrum(family, bytes, cal_ctx, restore_zeros) -> (mz[], intensity[])`, plus
//! re-exports of the lower-level crates for callers that want the metadata store, the pipeline
//! driver, or per-family tuning knobs.
//!
//! This crate only assembles those three; the wire formats live in
//! [`specpress_codec_spectra`], the shared math in [`specpress_core`], the metadata store in
//! [`specpress_store`], and the transcode driver in [`specpress_pipeline`].

pub use specpress_codec_spectra::{options, DecodeOptions, EncodeOptions};
pub use specpress_core::{
    calibration, dictionary, error, io, predictor, Error, FamilyTag, IntegrityWarning, IntegrityWarningKind, Result,
    Sample, Spectrum,
};
pub use specpress_pipeline::{run, run_one, NoopProgress, Progress, RunStats};
pub use specpress_store::{
    format_calibration_line, parse_calibration_line, read_schema_version, stamp_schema_version, InMemoryStore,
    MetadataStore, SCHEMA_VERSION,
};

use specpress_core::calibration::{apply_modification, apply_primary, CalibrationPolynomial};

/// The per-instrument-function calibration a caller may supply to [`decode_spectrum`] so Waters1
/// m/z values come back calibrated rather than in the segment codec's raw-uncalibrated domain.
/// Every other family already stores (or fits a predictor directly against) final physical m/z,
/// so this has no effect on them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalibrationContext {
    pub primary: Vec<f64>,
    pub modification: Option<CalibrationPolynomial>,
}

/// Encodes a spectrum given as parallel `mz`/`intensity` arrays using the wire layout for
/// `family`, with default per-family tuning.
///
/// `mz` is expected to already be in whatever domain `family`'s encoder natively stores — for
/// Waters1 that is the domain [`CalibrationContext`] would invert on the way back out, which
/// this entry point does not attempt (see [`decode_spectrum`]'s doc comment).
pub fn encode_spectrum(family: FamilyTag, mz: &[f64], intensity: &[u32]) -> Result<Vec<u8>> {
    let spectrum = Spectrum::from_parallel(mz, intensity);
    specpress_codec_spectra::encode_spectrum(family, &spectrum, &EncodeOptions::default())
}

/// Decodes a blob produced for `family` back into parallel `mz`/`intensity` arrays.
///
/// `cal_ctx`, when given, is applied to Waters1's decoded m/z values as `apply_modification(
/// apply_primary(mz, cal_ctx.primary), cal_ctx.modification)` — the same two steps
/// [`specpress_core::calibration::decode_and_calibrate`] runs after its own segment decode.
/// `restore_zeros` is forwarded to Waters1's zero-restoration pass; every other family ignores
/// it.
pub fn decode_spectrum(
    family: FamilyTag,
    bytes: &[u8],
    cal_ctx: Option<&CalibrationContext>,
    restore_zeros: bool,
) -> Result<(Vec<f64>, Vec<u32>)> {
    let opts = DecodeOptions { restore_zeros };
    let mut spectrum = specpress_codec_spectra::decode_spectrum(family, bytes, &opts)?;

    if family == FamilyTag::Waters1 {
        if let Some(ctx) = cal_ctx {
            for sample in &mut spectrum.samples {
                if sample.mz == 0.0 {
                    continue;
                }
                let calibrated = apply_primary(sample.mz, &ctx.primary);
                sample.mz = match &ctx.modification {
                    Some(modif) if modif.is_present() => apply_modification(calibrated, modif),
                    _ => calibrated,
                };
            }
        }
    }

    Ok((spectrum.mz(), spectrum.intensity()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trips_without_calibration() {
        let mz = vec![100.0, 200.0, 300.0, 400.0];
        let intensity = vec![10, 20, 30, 40];
        let blob = encode_spectrum(FamilyTag::Centroided1, &mz, &intensity).unwrap();
        let (back_mz, back_intensity) = decode_spectrum(FamilyTag::Centroided1, &blob, None, false).unwrap();

        assert_eq!(back_intensity, intensity);
        for (a, b) in mz.iter().zip(back_mz.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn identity_calibration_context_leaves_waters1_mz_unchanged() {
        let mz = vec![600.0, 602.0, 700.0];
        let intensity = vec![10, 20, 30];
        let blob = encode_spectrum(FamilyTag::Waters1, &mz, &intensity).unwrap();

        // c1 = 1.0 with every other coefficient zero takes the sqrt-domain branch of
        // apply_primary to `(sqrt(val))^2 == val`: a calibration that changes nothing.
        let identity_ctx = CalibrationContext {
            primary: vec![0.0, 1.0],
            modification: None,
        };
        let (uncalibrated, _) = decode_spectrum(FamilyTag::Waters1, &blob, None, false).unwrap();
        let (calibrated, _) = decode_spectrum(FamilyTag::Waters1, &blob, Some(&identity_ctx), false).unwrap();
        assert_eq!(uncalibrated, calibrated);
    }

    #[test]
    fn calibration_context_is_ignored_outside_waters1() {
        let mz = vec![100.0, 200.0, 300.0, 400.0];
        let intensity = vec![10, 20, 30, 40];
        let blob = encode_spectrum(FamilyTag::Centroided1, &mz, &intensity).unwrap();

        let ctx = CalibrationContext {
            primary: vec![5.0, -2.0],
            modification: None,
        };
        let (without_ctx, _) = decode_spectrum(FamilyTag::Centroided1, &blob, None, false).unwrap();
        let (with_ctx, _) = decode_spectrum(FamilyTag::Centroided1, &blob, Some(&ctx), false).unwrap();
        assert_eq!(without_ctx, with_ctx);
    }
}
