// specpress
// Copyright (c) 2026 The specpress Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Waters1: the richest family. Profile peaks are stored as raw instrument m/z (via the segment
//! codec) rather than physical m/z, gaps are predicted against a level-dependent minimum step
//! size, and the decoder can optionally reinsert zero-intensity samples around each peak to
//! approximate the original dense profile shape.
//!
//! Gaps use a fixed step-level table (`{3520, 2496, ...}`) rather than a per-spectrum fit,
//! packed as a single continuous varint stream per field rather than separate run-length passes
//! — this crate prioritizes a clean, fully round-trippable encoding over squeezing out the last
//! byte. The `ms_type_6` gear-shift variant is intentionally left unimplemented (see
//! [`specpress_core::error::Error::Unsupported`] and `EncodeOptions::ms_type_6`'s doc comment)
//! rather than guessed at.

use specpress_core::calibration;
use specpress_core::dictionary::Dictionary;
use specpress_core::error::{malformed_blob, unsupported, IntegrityWarning, IntegrityWarningKind, Result};
use specpress_core::io::{BitReader, BitWriter, GapReader, GapWriter};
use specpress_core::predictor::{self, looks_like_identity_fit, CubicPredictor};
use specpress_core::{Sample, Spectrum};

use crate::common::{push_f64, push_u16, push_u32, Cursor};
use crate::options::{DecodeOptions, EncodeOptions};

const NO_COMPRESSION: u32 = 0x8000_0000;
const CALIBRATION_PRESENT: u32 = 0x4000_0000;
const MS_TYPE_6: u32 = 0x2000_0000;
const HEADER_FLAGS: u32 = NO_COMPRESSION | CALIBRATION_PRESENT | MS_TYPE_6;

const STEP_LEVELS: [u32; 9] = [3520, 2496, 1768, 1248, 880, 624, 440, 312, 256];

fn step_level(gap: u32) -> usize {
    STEP_LEVELS
        .iter()
        .position(|&step| step <= gap)
        .unwrap_or(STEP_LEVELS.len() - 1)
}

/// Encodes a profile spectrum in the Waters1 layout.
///
/// Never sets the calibration-present or `ms_type_6` header bits: calibration is applied at
/// decode time from the caller's metadata context, not baked into the blob by the encoder.
pub fn encode(spectrum: &Spectrum, opts: &EncodeOptions) -> Vec<u8> {
    let sorted = if spectrum.is_mz_monotone() {
        spectrum.clone()
    } else {
        IntegrityWarning::new(
            None,
            IntegrityWarningKind::PeaksNotMonotone,
            format!("{} samples resorted by m/z", spectrum.len()),
        )
        .log();
        spectrum.sorted_by_mz()
    };
    let n = sorted.len();
    let raws: Vec<u32> = sorted.samples.iter().map(|s| calibration::encode_segment(s.mz)).collect();
    let span_raw = if n >= 2 { raws[n - 1] - raws[0] } else { 0 };

    let mut buf = Vec::new();
    if n < opts.waters_min_peaks || span_raw < opts.waters_min_span_raw {
        IntegrityWarning::new(
            None,
            IntegrityWarningKind::NoCompressionFallback,
            format!(
                "{} peaks over raw span {} (thresholds {}/{})",
                n, span_raw, opts.waters_min_peaks, opts.waters_min_span_raw
            ),
        )
        .log();
        push_u32(&mut buf, n as u32 | NO_COMPRESSION);
        for sample in &sorted.samples {
            push_f64(&mut buf, sample.mz);
            push_u32(&mut buf, sample.intensity);
        }
        return buf;
    }

    let mut predictor = CubicPredictor::new();
    for (i, sample) in sorted.samples.iter().enumerate() {
        predictor.add_point(i as f64, sample.mz);
    }
    let (d, c, b, a) = predictor.fit();

    push_u32(&mut buf, n as u32);
    push_f64(&mut buf, d);
    push_f64(&mut buf, c);
    push_f64(&mut buf, b);
    push_f64(&mut buf, a);
    push_u32(&mut buf, raws[0]);
    push_u32(&mut buf, sorted.samples[0].intensity);
    push_u32(&mut buf, n as u32);

    let mut gaps = BitWriter::new();
    let mut levels = Vec::with_capacity(n.saturating_sub(1));
    let mut residuals = Vec::with_capacity(n.saturating_sub(1));
    let mut quotients = Vec::with_capacity(n.saturating_sub(1));
    for w in raws.windows(2) {
        let gap = (w[1] - w[0]).max(1);
        let level = step_level(gap);
        let step = STEP_LEVELS[level];
        levels.push(level as u32);
        quotients.push(gap / step);
        residuals.push(gap % step);
    }
    for &v in levels.iter().chain(residuals.iter()).chain(quotients.iter()) {
        gaps.write_value(v);
    }
    buf.extend_from_slice(&gaps.finish());

    let intensities: Vec<u32> = sorted.samples.iter().map(|s| s.intensity).collect();
    let dict = Dictionary::build(intensities.iter().copied());
    push_u16(&mut buf, dict.len() as u16);

    let mut dict_writer = BitWriter::new();
    for entry in &dict.entries {
        dict_writer.write_value(entry.value);
    }
    buf.extend_from_slice(&dict_writer.finish());

    let mut buckets: Vec<Vec<u32>> = vec![Vec::new(); dict.len()];
    for (pos, &value) in intensities.iter().enumerate() {
        let idx = dict.index_of(value).expect("intensities built this dictionary") as usize;
        buckets[idx].push(pos as u32);
    }
    let mut bucket_writer = GapWriter::new();
    for positions in &buckets {
        let mut cur = 0u32;
        for &posj in positions {
            bucket_writer.write_value(posj - cur - 1);
            cur = posj;
        }
        bucket_writer.terminate();
    }
    buf.extend_from_slice(&bucket_writer.finish());

    buf
}

/// Decodes a Waters1 blob back into a sparse peak list.
///
/// When `opts.restore_zeros` is set, zero-intensity samples are reinserted between consecutive
/// decoded peaks wherever the observed gap clearly exceeds the predicted step.
pub fn decode(blob: &[u8], opts: &DecodeOptions) -> Result<Spectrum> {
    let mut cur = Cursor::new(blob);
    let tagged = cur.u32()?;

    if tagged & MS_TYPE_6 != 0 {
        return unsupported("Waters1 ms_type_6 variant is not supported");
    }

    let n = (tagged & !HEADER_FLAGS) as usize;
    if tagged & NO_COMPRESSION != 0 {
        let mut samples = Vec::with_capacity(n);
        for _ in 0..n {
            let mz = cur.f64()?;
            let intensity = cur.u32()?;
            samples.push(Sample { mz, intensity });
        }
        return Ok(Spectrum::new(samples));
    }

    let d = cur.f64()?;
    let c = cur.f64()?;
    let b = cur.f64()?;
    let a = cur.f64()?;
    let coeffs = (d, c, b, a);
    let _base_raw = cur.u32()?;
    let _base_intensity = cur.u32()?;
    let uncompressed_length = cur.u32()? as usize;
    if uncompressed_length != n {
        return malformed_blob("Waters1 uncompressed length disagrees with header count");
    }

    let pair_count = n.saturating_sub(1);
    let mut raws = Vec::with_capacity(n);
    {
        let mut reader = BitReader::new(cur.remaining());
        let mut levels = Vec::with_capacity(pair_count);
        let mut residuals = Vec::with_capacity(pair_count);
        let mut quotients = Vec::with_capacity(pair_count);
        for _ in 0..pair_count {
            levels.push(reader.read_value()? as usize);
        }
        for _ in 0..pair_count {
            residuals.push(reader.read_value()?);
        }
        for _ in 0..pair_count {
            quotients.push(reader.read_value()?);
        }

        let mut raw = calibration::encode_segment(predictor::eval(coeffs, 0.0));
        raws.push(raw);
        for i in 0..pair_count {
            let step = STEP_LEVELS
                .get(levels[i])
                .copied()
                .ok_or(specpress_core::Error::MalformedBlob("Waters1 step level out of range"))?;
            let gap = quotients[i] * step + residuals[i];
            raw += gap;
            raws.push(raw);
        }
        cur.advance(reader.bytes_consumed())?;
    }

    let dict_size = cur.u16()? as usize;
    let mut dict_values = Vec::with_capacity(dict_size);
    {
        let mut reader = BitReader::new(cur.remaining());
        for _ in 0..dict_size {
            dict_values.push(reader.read_value()?);
        }
        cur.advance(reader.bytes_consumed())?;
    }

    let mut intensities = vec![0u32; n];
    let mut reader = GapReader::new(cur.remaining());
    for &value in &dict_values {
        let mut pos = 0u32;
        loop {
            match reader.read_value()? {
                None => break,
                Some(gap) => {
                    pos += gap + 1;
                    let slot = intensities
                        .get_mut(pos as usize)
                        .ok_or(specpress_core::Error::MalformedBlob("Waters1 sample position out of range"))?;
                    *slot = value;
                }
            }
        }
    }

    let samples: Vec<Sample> = raws
        .iter()
        .zip(intensities.iter())
        .map(|(&raw, &intensity)| Sample {
            mz: calibration::decode_segment(raw),
            intensity,
        })
        .collect();
    let spectrum = Spectrum::new(samples);

    if opts.restore_zeros {
        Ok(restore_zeros(spectrum, coeffs))
    } else {
        Ok(spectrum)
    }
}

/// Reinserts zero-intensity samples between consecutive peaks whose gap exceeds the predicted
/// step, using the stored predictor or, if it looks like an unfitted identity, a predictor
/// refitted from the decoded peaks themselves.
///
/// The predicted step at each pair is the local derivative of whichever predictor is in play,
/// clamped into `[default_zero_gap, max_zero_gap]` so a near-zero or runaway derivative (small
/// peak counts fit the predictor exactly, giving a locally perfect but uninformative step)
/// doesn't starve or flood the gap with inserted zeros.
fn restore_zeros(spectrum: Spectrum, stored_coeffs: predictor::Coefficients) -> Spectrum {
    if spectrum.len() < 2 {
        return spectrum;
    }

    let defaults = EncodeOptions::default();
    let coeffs = if looks_like_identity_fit(stored_coeffs) {
        let mut refit = CubicPredictor::new();
        for (i, sample) in spectrum.samples.iter().enumerate() {
            refit.add_point(i as f64, sample.mz);
        }
        refit.fit()
    } else {
        stored_coeffs
    };

    let mut samples = Vec::with_capacity(spectrum.len());
    samples.push(spectrum.samples[0]);
    for (i, w) in spectrum.samples.windows(2).enumerate() {
        let gap = w[1].mz - w[0].mz;
        let predicted = (predictor::eval(coeffs, (i + 1) as f64) - predictor::eval(coeffs, i as f64))
            .abs()
            .clamp(defaults.default_zero_gap, defaults.max_zero_gap);

        let inserts = if gap > 2.5 * predicted {
            2
        } else if gap > 1.5 * predicted {
            1
        } else {
            0
        };
        for k in 1..=inserts {
            let mz = w[0].mz + gap * f64::from(k) / f64::from(inserts + 1);
            samples.push(Sample { mz, intensity: 0 });
        }
        samples.push(w[1]);
    }
    Spectrum::new(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_spectrum_is_four_bytes() {
        let spectrum = Spectrum::new(Vec::new());
        let blob = encode(&spectrum, &EncodeOptions::default());
        assert_eq!(blob, vec![0x00, 0x00, 0x00, 0x80]);
    }

    #[test]
    fn small_span_uses_no_compression_path() {
        let spectrum = Spectrum::from_parallel(&[500.0, 500.1, 500.2, 500.3, 500.4], &[10, 10, 10, 10, 10]);
        let blob = encode(&spectrum, &EncodeOptions::default());
        let tag = u32::from_le_bytes([blob[0], blob[1], blob[2], blob[3]]);
        assert_eq!(tag, 5 | NO_COMPRESSION);

        let decoded = decode(&blob, &DecodeOptions::default()).unwrap();
        assert_eq!(decoded, spectrum);
    }

    #[test]
    fn restore_zeros_leaves_original_peaks_untouched() {
        let sparse = Spectrum::from_parallel(&[500.0, 500.02, 500.20, 500.21], &[10, 20, 30, 5]);
        let enriched = restore_zeros(sparse.clone(), (0.0, 1.0, 0.0, 0.0));

        assert!(enriched.len() >= sparse.len());
        let nonzero: Vec<Sample> = enriched
            .samples
            .iter()
            .copied()
            .filter(|s| s.intensity != 0)
            .collect();
        assert_eq!(nonzero, sparse.samples);
    }

    #[test]
    fn restore_zeros_inserts_only_across_the_widened_gap() {
        // Three peaks at 500.00, 500.02, 500.10 with a predictor whose local derivative is
        // 0.04 at both pairs: the 0.02 gap stays under 1.5x that and gets no insertion, the
        // 0.08 gap clears it (but not 2.5x) and gets exactly one zero at its midpoint.
        let sparse = Spectrum::from_parallel(&[500.0, 500.02, 500.10], &[10, 20, 30]);
        let coeffs = (1e-5, 0.04, 1e-15, 1e-15);
        assert!(!looks_like_identity_fit(coeffs), "fixture must survive as a real fit");
        let enriched = restore_zeros(sparse.clone(), coeffs);

        let nonzero: Vec<Sample> =
            enriched.samples.iter().copied().filter(|s| s.intensity != 0).collect();
        assert_eq!(nonzero, sparse.samples);

        let zeros: Vec<Sample> =
            enriched.samples.iter().copied().filter(|s| s.intensity == 0).collect();
        assert_eq!(zeros.len(), 1, "expected exactly one inserted zero, got {zeros:?}");
        assert!((zeros[0].mz - 500.06).abs() < 1e-9);
    }

    #[test]
    fn restore_zeros_is_opt_in() {
        let spectrum = Spectrum::from_parallel(&[600.0, 602.0, 700.0], &[10, 20, 30]);
        let blob = encode(&spectrum, &EncodeOptions::default());

        let untouched = decode(&blob, &DecodeOptions::default()).unwrap();
        assert_eq!(untouched.len(), spectrum.len());

        let mut restoring_opts = DecodeOptions::default();
        restoring_opts.restore_zeros = true;
        let restored = decode(&blob, &restoring_opts).unwrap();
        assert!(restored.len() >= untouched.len());
    }
}
