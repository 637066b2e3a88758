// specpress
// Copyright (c) 2026 The specpress Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! AbSciex1: dense profiles dominated by long runs of exact-zero intensity. Only the nonzero
//! ("real") samples are stored; everything between them is reconstructed at decode time by
//! iterating a cubic predictor fit in log₁₀(m/z) space, one dense sample at a time, from the
//! leading anchor.
//!
//! Reuses Bruker2's width-bucketed intensity dictionary, keyed here by occurrence among the
//! real peaks rather than among all dense positions.

use specpress_core::dictionary::Dictionary;
use specpress_core::error::{malformed_blob, IntegrityWarning, IntegrityWarningKind, Result};
use specpress_core::io::{BitReader, BitWriter};
use specpress_core::predictor::{self, CubicPredictor};
use specpress_core::{Sample, Spectrum};

use crate::common::{push_f64, push_u16, push_u32, Cursor};
use crate::options::{DecodeOptions, EncodeOptions};

/// Encodes a dense profile spectrum with long zero runs in the AbSciex1 layout.
pub fn encode(spectrum: &Spectrum, _opts: &EncodeOptions) -> Vec<u8> {
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

    let real_idxs: Vec<usize> = sorted
        .samples
        .iter()
        .enumerate()
        .filter(|(_, s)| s.intensity != 0)
        .map(|(i, _)| i)
        .collect();

    let mz0 = sorted.samples.first().map(|s| s.mz).unwrap_or(0.0);
    let mzn = sorted.samples.last().map(|s| s.mz).unwrap_or(0.0);

    let mut predictor = CubicPredictor::new();
    for w in real_idxs.windows(2) {
        let (i0, i1) = (w[0], w[1]);
        let steps = (i1 - i0) as f64;
        let log0 = sorted.samples[i0].mz.log10();
        let log1 = sorted.samples[i1].mz.log10();
        predictor.add_point(log0, (log1 - log0) / steps);
    }
    let coeffs = predictor.fit();

    let mut buf = Vec::new();
    push_f64(&mut buf, mz0);
    push_f64(&mut buf, mzn);
    push_f64(&mut buf, coeffs.0);
    push_f64(&mut buf, coeffs.1);
    push_f64(&mut buf, coeffs.2);
    push_f64(&mut buf, coeffs.3);
    push_u32(&mut buf, real_idxs.len() as u32);

    let intensities: Vec<u32> = real_idxs.iter().map(|&i| sorted.samples[i].intensity).collect();
    let dict = Dictionary::build(intensities.iter().copied());
    push_u16(&mut buf, dict.len() as u16);
    push_u32(&mut buf, n as u32);

    let mut skip_writer = BitWriter::new();
    let mut cur = 0usize;
    for &idx in &real_idxs {
        skip_writer.write_value((idx - cur) as u32);
        cur = idx;
    }
    buf.extend_from_slice(&skip_writer.finish());

    let mut buckets: Vec<Vec<u32>> = vec![Vec::new(); dict.len()];
    for (pos, &value) in intensities.iter().enumerate() {
        let idx = dict.index_of(value).expect("intensities built this dictionary") as usize;
        buckets[idx].push(pos as u32);
    }
    for (entry, positions) in dict.entries.iter().zip(buckets.iter()) {
        let mut level_writer = BitWriter::new();
        level_writer.write_value(entry.value);
        let mut prev: i64 = -1;
        for &posj in positions {
            let gap = posj as i64 - prev - 1;
            level_writer.write_value((gap + 1) as u32);
            prev = posj as i64;
        }
        level_writer.write_value(0);
        buf.extend_from_slice(&level_writer.finish());
    }

    buf
}

/// Decodes an AbSciex1 blob back into a dense profile spectrum.
pub fn decode(blob: &[u8], _opts: &DecodeOptions) -> Result<Spectrum> {
    let mut cur = Cursor::new(blob);
    let mz0 = cur.f64()?;
    let _mzn = cur.f64()?;
    let d = cur.f64()?;
    let c = cur.f64()?;
    let b = cur.f64()?;
    let a = cur.f64()?;
    let coeffs = (d, c, b, a);
    let pack_size = cur.u32()? as usize;
    let level_count = cur.u16()? as usize;
    let n = cur.u32()? as usize;

    let mut real_idxs = Vec::with_capacity(pack_size);
    {
        let mut reader = BitReader::new(cur.remaining());
        let mut pos = 0usize;
        for _ in 0..pack_size {
            pos += reader.read_value()? as usize;
            real_idxs.push(pos);
        }
        cur.advance(reader.bytes_consumed())?;
    }
    if real_idxs.iter().any(|&idx| idx >= n) {
        return malformed_blob("AbSciex1 real-peak position out of range");
    }

    let mut intensities = vec![0u32; pack_size];
    for _ in 0..level_count {
        let mut reader = BitReader::new(cur.remaining());
        let value = reader.read_value()?;
        let mut prev: i64 = -1;
        loop {
            let delta = reader.read_value()?;
            if delta == 0 {
                break;
            }
            let pos = prev + (delta - 1) as i64 + 1;
            let slot = intensities
                .get_mut(pos as usize)
                .ok_or(specpress_core::Error::MalformedBlob("AbSciex1 level position out of range"))?;
            *slot = value;
            prev = pos;
        }
        cur.advance(reader.bytes_consumed())?;
    }

    let mut dense_intensity = vec![0u32; n];
    for (&idx, &value) in real_idxs.iter().zip(intensities.iter()) {
        dense_intensity[idx] = value;
    }

    // Fewer than two real peaks means the predictor never saw a gap to fit, and its `(0, 1, 0, 0)`
    // "not a real fit" sentinel would otherwise be read as a geometric step and blow up under
    // repeated iteration — in that case every dense sample just holds `mz0` flat.
    let has_fit = pack_size >= 2;

    let mut samples = Vec::with_capacity(n);
    let mut log_mz = mz0.log10();
    if n > 0 {
        samples.push(Sample {
            mz: 10f64.powf(log_mz),
            intensity: dense_intensity[0],
        });
    }
    for i in 1..n {
        if has_fit {
            log_mz += predictor::eval(coeffs, log_mz);
        }
        samples.push(Sample {
            mz: 10f64.powf(log_mz),
            intensity: dense_intensity[i],
        });
    }

    Ok(Spectrum::new(samples))
}
