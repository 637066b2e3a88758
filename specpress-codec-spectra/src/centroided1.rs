// specpress
// Copyright (c) 2026 The specpress Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Centroided1: sparse peak lists. Below a peak-count/m/z-span threshold this falls all the way
//! back to a raw, uncompressed tail; above it, m/z is a cubic fit against an integer `k` derived
//! from m/z spacing, and intensity rides a frequency dictionary with an optional `s_factor`
//! pre-scale and a power-of-two `scale_fact` squeeze.
//!
//! The low-peak-count escape hatch is the same shape Waters1 and AB SCIEX use; the
//! intensity-dictionary construction picks up the width-tiering idea used more elaborately by
//! Bruker2.

use specpress_core::dictionary::Dictionary;
use specpress_core::error::{malformed_blob, IntegrityWarning, IntegrityWarningKind, Result};
use specpress_core::io::{BitReader, BitWriter};
use specpress_core::predictor::{self, CubicPredictor};
use specpress_core::{Sample, Spectrum};

use crate::common::{push_f32, push_f64, push_u16, push_u32, Cursor};
use crate::options::{DecodeOptions, EncodeOptions};

const NO_COMPRESSION: u32 = 0x8000_0000;
const SCALE_FACTORS: [u32; 9] = [256, 128, 64, 32, 16, 8, 4, 2, 1];

/// Encodes a sparse centroided peak list in the Centroided1 layout.
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
    let span = if n >= 2 {
        sorted.samples[n - 1].mz - sorted.samples[0].mz
    } else {
        0.0
    };

    let mut buf = Vec::new();
    if n < opts.centroided_min_peaks || span < opts.centroided_min_span {
        IntegrityWarning::new(
            None,
            IntegrityWarningKind::NoCompressionFallback,
            format!(
                "{} peaks over span {} (thresholds {}/{})",
                n, span, opts.centroided_min_peaks, opts.centroided_min_span
            ),
        )
        .log();
        encode_mz_no_compression(&mut buf, &sorted);
        encode_intensity_no_compression(&mut buf, &sorted);
        return buf;
    }

    encode_mz_compressed(&mut buf, &sorted);
    encode_intensity_compressed(&mut buf, &sorted);
    buf
}

/// Decodes a Centroided1 blob back into a sparse peak list.
pub fn decode(blob: &[u8], _opts: &DecodeOptions) -> Result<Spectrum> {
    let mut cur = Cursor::new(blob);
    let (n, mzs) = decode_mz(&mut cur)?;
    let intensities = decode_intensity(&mut cur, n)?;

    let samples = mzs
        .into_iter()
        .zip(intensities)
        .map(|(mz, intensity)| Sample { mz, intensity })
        .collect();
    Ok(Spectrum::new(samples))
}

fn encode_mz_no_compression(buf: &mut Vec<u8>, spectrum: &Spectrum) {
    push_u32(buf, spectrum.len() as u32 | NO_COMPRESSION);
    for sample in &spectrum.samples {
        push_f64(buf, sample.mz);
    }
}

fn encode_intensity_no_compression(buf: &mut Vec<u8>, spectrum: &Spectrum) {
    push_u32(buf, spectrum.len() as u32 | NO_COMPRESSION);
    for sample in &spectrum.samples {
        push_f32(buf, sample.intensity as f32);
    }
}

fn encode_mz_compressed(buf: &mut Vec<u8>, spectrum: &Spectrum) {
    let n = spectrum.len();
    let mz0 = spectrum.samples[0].mz;
    let dx = (spectrum.samples[n - 1].mz - mz0) / (n - 1) as f64;

    let ks: Vec<i64> = spectrum
        .samples
        .iter()
        .map(|s| (((s.mz - mz0) * 1e8) / dx).floor() as i64)
        .collect();

    let mut predictor = CubicPredictor::new();
    for (&k, s) in ks.iter().zip(spectrum.samples.iter()) {
        predictor.add_point(k as f64, s.mz);
    }
    let (d, c, b, a) = predictor.fit();

    let k_min = ks
        .windows(2)
        .map(|w| w[1] - w[0])
        .min()
        .unwrap_or(0)
        .max(0);

    push_u32(buf, n as u32);
    push_f64(buf, d);
    push_f64(buf, c);
    push_f64(buf, b);
    push_f64(buf, a);
    push_u32(buf, (k_min + 1) as u32);

    let mut writer = BitWriter::new();
    for w in ks.windows(2) {
        writer.write_value((w[1] - w[0] - k_min) as u32);
    }
    buf.extend_from_slice(&writer.finish());
}

fn decode_mz(cur: &mut Cursor<'_>) -> Result<(usize, Vec<f64>)> {
    let tagged = cur.u32()?;
    if tagged & NO_COMPRESSION != 0 {
        let n = (tagged & !NO_COMPRESSION) as usize;
        let mut mzs = Vec::with_capacity(n);
        for _ in 0..n {
            mzs.push(cur.f64()?);
        }
        return Ok((n, mzs));
    }

    let n = tagged as usize;
    let d = cur.f64()?;
    let c = cur.f64()?;
    let b = cur.f64()?;
    let a = cur.f64()?;
    let coeffs = (d, c, b, a);
    let k_min = cur.u32()? as i64 - 1;

    let mut reader = BitReader::new(cur.remaining());
    let mut k = 0i64;
    let mut mzs = Vec::with_capacity(n);
    if n > 0 {
        mzs.push(predictor::eval(coeffs, 0.0));
    }
    for _ in 1..n {
        let gap = reader.read_value()? as i64;
        k += k_min + gap;
        mzs.push(predictor::eval(coeffs, k as f64));
    }
    Ok((n, mzs))
}

fn encode_intensity_compressed(buf: &mut Vec<u8>, spectrum: &Spectrum) {
    let n = spectrum.len();
    let max_intensity = spectrum.samples.iter().map(|s| s.intensity).max().unwrap_or(0);
    let s_factor: f32 = if max_intensity < 1000 { 1000.0 } else { 1.0 };

    let scaled: Vec<u32> = spectrum
        .samples
        .iter()
        .map(|s| (s.intensity as f32 * s_factor).round() as u32)
        .collect();
    let dict = Dictionary::build(scaled.iter().copied());

    let min_intens = dict.entries.iter().map(|e| e.value).min().unwrap_or(0);
    let scale_fact = SCALE_FACTORS
        .iter()
        .copied()
        .find(|&p| dict.entries.iter().all(|e| (e.value - min_intens) % p == 0))
        .unwrap_or(1);

    push_u32(buf, n as u32);
    push_f32(buf, s_factor);
    push_u32(buf, min_intens);
    push_u16(buf, dict.len() as u16);
    buf.push(scale_fact as u8);

    let mut values_writer = BitWriter::new();
    for entry in &dict.entries {
        values_writer.write_value((entry.value - min_intens) / scale_fact);
    }
    buf.extend_from_slice(&values_writer.finish());

    let mut index_writer = BitWriter::new();
    for &value in &scaled {
        let idx = dict.index_of(value).expect("scaled built this dictionary");
        index_writer.write_value(idx);
    }
    buf.extend_from_slice(&index_writer.finish());
}

fn decode_intensity(cur: &mut Cursor<'_>, n: usize) -> Result<Vec<u32>> {
    let tagged = cur.u32()?;
    if tagged & NO_COMPRESSION != 0 {
        let count = (tagged & !NO_COMPRESSION) as usize;
        if count != n {
            return malformed_blob("Centroided1 intensity peak count mismatch with mz blob");
        }
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            out.push(cur.f32()?.round() as u32);
        }
        return Ok(out);
    }

    let s_factor = cur.f32()?;
    let min_intens = cur.u32()?;
    let dict_size = cur.u16()? as usize;
    let scale_fact = u32::from(cur.u8()?);

    let mut dict_values = Vec::with_capacity(dict_size);
    {
        let mut reader = BitReader::new(cur.remaining());
        for _ in 0..dict_size {
            dict_values.push(reader.read_value()? * scale_fact + min_intens);
        }
        let consumed = reader.bytes_consumed();
        cur.advance(consumed)?;
    }

    let mut out = Vec::with_capacity(n);
    {
        let mut reader = BitReader::new(cur.remaining());
        for _ in 0..n {
            let idx = reader.read_value()? as usize;
            let value = *dict_values
                .get(idx)
                .ok_or(specpress_core::Error::MalformedBlob(
                    "Centroided1 intensity dictionary index out of range",
                ))?;
            out.push((value as f32 / s_factor).round() as u32);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_peak_count_uses_no_compression_path() {
        let spectrum = Spectrum::from_parallel(&[100.0, 100.5, 101.0], &[1, 2, 3]);
        let blob = encode(&spectrum, &EncodeOptions::default());

        let tag = u32::from_le_bytes([blob[0], blob[1], blob[2], blob[3]]);
        assert_eq!(tag, 0x8000_0003);

        let decoded = decode(&blob, &DecodeOptions::default()).unwrap();
        assert_eq!(decoded, spectrum);
    }

    fn synthetic_peaks() -> Spectrum {
        let mut samples = Vec::new();
        for i in 0..300u32 {
            let mz = 200.0 + 0.02 * i as f64;
            let intensity = 500 + (i % 17) * 31;
            samples.push(Sample { mz, intensity });
        }
        Spectrum::new(samples)
    }

    #[test]
    fn round_trips_compressed_peak_list() {
        let spectrum = synthetic_peaks();
        let blob = encode(&spectrum, &EncodeOptions::default());
        let decoded = decode(&blob, &DecodeOptions::default()).unwrap();

        assert_eq!(decoded.len(), spectrum.len());
        for (orig, back) in spectrum.samples.iter().zip(decoded.samples.iter()) {
            assert!((orig.mz - back.mz).abs() < 1e-6);
            assert_eq!(orig.intensity, back.intensity);
        }
    }

    #[test]
    fn out_of_order_peaks_are_sorted() {
        let spectrum = Spectrum::from_parallel(&[101.0, 100.0, 100.5], &[3, 1, 2]);
        let blob = encode(&spectrum, &EncodeOptions::default());
        let decoded = decode(&blob, &DecodeOptions::default()).unwrap();
        assert_eq!(decoded.mz(), vec![100.0, 100.5, 101.0]);
    }

    #[test]
    fn empty_spectrum_round_trips() {
        let spectrum = Spectrum::new(Vec::new());
        let blob = encode(&spectrum, &EncodeOptions::default());
        let decoded = decode(&blob, &DecodeOptions::default()).unwrap();
        assert!(decoded.is_empty());
    }
}
