// specpress
// Copyright (c) 2026 The specpress Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bruker2: the same dense cubic-fit profile as Bruker1, but without a separate hop dictionary.
//! Instead the per-position gaps for each distinct intensity value are written directly as a
//! terminated run, and the intensity dictionary itself is split into four width tiers so common
//! small values never pay for the full 24-bit range.
//!
//! The two middle tiers are packed as tightly as their own bit width allows rather than stored
//! at a uniform 32 bits, since nothing downstream depends on an unpacked layout and only the
//! tight byte budgets matter.

use std::collections::HashMap;

use specpress_core::error::{malformed_blob, Result};
use specpress_core::io::{GapReader, GapWriter};
use specpress_core::predictor::{self, CubicPredictor};
use specpress_core::{Sample, Spectrum};

use crate::common::{push_f64, push_u16, push_u32, Cursor};
use crate::options::{DecodeOptions, EncodeOptions};

const GROUP0_MAX: u32 = 4095; // 12 bits
const GROUP1_MAX: u32 = 65535; // 16 bits
const GROUP2_MAX: u32 = 1_048_575; // 20 bits

struct ValueEntry {
    value: u32,
    count: u32,
}

/// Partitions a frequency-sorted distinct-value list into the four width tiers, preserving each
/// tier's internal (descending-count) order.
fn tiered_groups(mut entries: Vec<ValueEntry>) -> [Vec<ValueEntry>; 4] {
    let mut groups: [Vec<ValueEntry>; 4] = [Vec::new(), Vec::new(), Vec::new(), Vec::new()];
    for entry in entries.drain(..) {
        let group = if entry.value <= GROUP0_MAX {
            0
        } else if entry.value <= GROUP1_MAX {
            1
        } else if entry.value <= GROUP2_MAX {
            2
        } else {
            3
        };
        groups[group].push(entry);
    }
    groups
}

fn pack_group0(buf: &mut Vec<u8>, values: &[u32]) {
    let mut pairs = values.chunks_exact(2);
    for pair in &mut pairs {
        let (v0, v1) = (pair[0], pair[1]);
        buf.push((v0 >> 4) as u8);
        buf.push((((v0 & 0xF) << 4) | ((v1 >> 8) & 0xF)) as u8);
        buf.push((v1 & 0xFF) as u8);
    }
    if let [v0] = pairs.remainder() {
        buf.push((v0 >> 4) as u8);
        buf.push(((v0 & 0xF) << 4) as u8);
    }
}

fn unpack_group0(cursor: &mut Cursor<'_>, count: usize) -> Result<Vec<u32>> {
    let mut out = Vec::with_capacity(count);
    let mut pairs_remaining = count;
    while pairs_remaining >= 2 {
        let b0 = u32::from(cursor.u8()?);
        let b1 = u32::from(cursor.u8()?);
        let b2 = u32::from(cursor.u8()?);
        out.push((b0 << 4) | (b1 >> 4));
        out.push(((b1 & 0xF) << 8) | b2);
        pairs_remaining -= 2;
    }
    if pairs_remaining == 1 {
        let b0 = u32::from(cursor.u8()?);
        let b1 = u32::from(cursor.u8()?);
        out.push((b0 << 4) | (b1 >> 4));
    }
    Ok(out)
}

fn pack_group2(buf: &mut Vec<u8>, values: &[u32]) {
    let mut pairs = values.chunks_exact(2);
    for pair in &mut pairs {
        let (v0, v1) = (pair[0], pair[1]);
        push_u16(buf, (v0 >> 4) as u16);
        buf.push((((v0 & 0xF) << 4) | ((v1 >> 16) & 0xF)) as u8);
        push_u16(buf, (v1 & 0xFFFF) as u16);
    }
    if let [v0] = pairs.remainder() {
        push_u16(buf, (v0 >> 4) as u16);
        buf.push(((v0 & 0xF) << 4) as u8);
    }
}

fn unpack_group2(cursor: &mut Cursor<'_>, count: usize) -> Result<Vec<u32>> {
    let mut out = Vec::with_capacity(count);
    let mut pairs_remaining = count;
    while pairs_remaining >= 2 {
        let b0 = u32::from(cursor.u16()?);
        let b1 = u32::from(cursor.u8()?);
        let b2 = u32::from(cursor.u16()?);
        out.push((b0 << 4) | (b1 >> 4));
        out.push(((b1 & 0xF) << 16) | b2);
        pairs_remaining -= 2;
    }
    if pairs_remaining == 1 {
        let b0 = u32::from(cursor.u16()?);
        let b1 = u32::from(cursor.u8()?);
        out.push((b0 << 4) | (b1 >> 4));
    }
    Ok(out)
}

/// Encodes a dense profile spectrum in the Bruker2 layout.
pub fn encode(spectrum: &Spectrum, opts: &EncodeOptions) -> Vec<u8> {
    let mz_len = spectrum.len() as u32;

    let mut predictor = CubicPredictor::new();
    for (i, sample) in spectrum.samples.iter().enumerate() {
        predictor.add_point(i as f64, sample.mz);
    }
    let (d, c, b, a) = predictor.fit();

    let quantized: Vec<u32> = spectrum
        .samples
        .iter()
        .map(|s| s.intensity / opts.lsb_factor)
        .collect();

    let mut counts: HashMap<u32, u32> = HashMap::new();
    for &q in &quantized {
        if q != 0 {
            *counts.entry(q).or_insert(0) += 1;
        }
    }
    let mut by_frequency: Vec<ValueEntry> = counts
        .into_iter()
        .map(|(value, count)| ValueEntry { value, count })
        .collect();
    by_frequency.sort_by(|x, y| y.count.cmp(&x.count).then(x.value.cmp(&y.value)));

    let groups = tiered_groups(by_frequency);
    let mut order: Vec<u32> = Vec::new();
    let mut index_of: HashMap<u32, u32> = HashMap::new();
    for group in &groups {
        for entry in group {
            index_of.insert(entry.value, order.len() as u32);
            order.push(entry.value);
        }
    }

    let mut buf = Vec::new();
    push_u32(&mut buf, mz_len);
    push_f64(&mut buf, d);
    push_f64(&mut buf, c);
    push_f64(&mut buf, b);
    push_f64(&mut buf, a);
    buf.push(opts.lsb_factor as u8);

    push_u32(&mut buf, groups[0].len() as u32);
    push_u32(&mut buf, groups[1].len() as u32);
    push_u32(&mut buf, groups[2].len() as u32);
    push_u32(&mut buf, order.len() as u32);

    let g0: Vec<u32> = groups[0].iter().map(|e| e.value).collect();
    pack_group0(&mut buf, &g0);
    for entry in &groups[1] {
        push_u16(&mut buf, entry.value as u16);
    }
    let g2: Vec<u32> = groups[2].iter().map(|e| e.value).collect();
    pack_group2(&mut buf, &g2);
    for entry in &groups[3] {
        push_u16(&mut buf, (entry.value >> 16) as u16);
        push_u32(&mut buf, entry.value & 0xFFFF);
    }

    // per-bucket position gap streams, bucket order == `order`.
    let mut bucket_positions: Vec<Vec<u32>> = vec![Vec::new(); order.len()];
    for (pos, &q) in quantized.iter().enumerate() {
        if q != 0 {
            bucket_positions[index_of[&q] as usize].push(pos as u32);
        }
    }

    let mut gaps = GapWriter::new();
    for positions in &bucket_positions {
        let mut cur = 0u32;
        for &posj in positions {
            gaps.write_value(posj - cur - 1);
            cur = posj;
        }
        gaps.terminate();
    }
    buf.extend_from_slice(&gaps.finish());

    buf
}

/// Decodes a Bruker2 blob back into a dense profile spectrum.
pub fn decode(blob: &[u8], _opts: &DecodeOptions) -> Result<Spectrum> {
    let mut cur = Cursor::new(blob);
    let mz_len = cur.u32()? as usize;
    let d = cur.f64()?;
    let c = cur.f64()?;
    let b = cur.f64()?;
    let a = cur.f64()?;
    let coeffs = (d, c, b, a);
    let lsb_factor = u32::from(cur.u8()?);

    let g0_count = cur.u32()? as usize;
    let g1_count = cur.u32()? as usize;
    let g2_count = cur.u32()? as usize;
    let total = cur.u32()? as usize;
    if g0_count + g1_count + g2_count > total {
        return malformed_blob("Bruker2 intensity dictionary group counts exceed total");
    }
    let g3_count = total - g0_count - g1_count - g2_count;

    let mut values = unpack_group0(&mut cur, g0_count)?;
    for _ in 0..g1_count {
        values.push(u32::from(cur.u16()?));
    }
    values.extend(unpack_group2(&mut cur, g2_count)?);
    for _ in 0..g3_count {
        let hi = u32::from(cur.u16()?);
        let lo = cur.u32()?;
        values.push((hi << 16) | lo);
    }

    let mut intensities = vec![0u32; mz_len];
    let mut reader = GapReader::new(cur.remaining());
    for &value in &values {
        let mut pos = 0u32;
        loop {
            match reader.read_value()? {
                None => break,
                Some(gap) => {
                    pos += gap + 1;
                    let slot = intensities
                        .get_mut(pos as usize)
                        .ok_or(specpress_core::Error::MalformedBlob(
                            "Bruker2 sample position out of range",
                        ))?;
                    *slot = value * lsb_factor;
                }
            }
        }
    }

    let samples = (0..mz_len)
        .map(|i| Sample {
            mz: predictor::eval(coeffs, i as f64),
            intensity: intensities[i],
        })
        .collect();
    Ok(Spectrum::new(samples))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic_profile() -> Spectrum {
        let mut samples = Vec::new();
        for i in 0..3000u32 {
            let mz = 300.0 + 0.005 * i as f64;
            let intensity = match i % 211 {
                0 => 5000,
                1 => 70_000,
                2 => 1_200_000,
                _ => 0,
            };
            samples.push(Sample { mz, intensity });
        }
        Spectrum::new(samples)
    }

    #[test]
    fn round_trips_multi_tier_profile() {
        let spectrum = synthetic_profile();
        let opts = EncodeOptions::default();
        let blob = encode(&spectrum, &opts);
        let decoded = decode(&blob, &DecodeOptions::default()).unwrap();

        assert_eq!(decoded.len(), spectrum.len());
        for (orig, back) in spectrum.samples.iter().zip(decoded.samples.iter()) {
            assert!((orig.mz - back.mz).abs() < 1e-6);
            let quantized_orig = (orig.intensity / opts.lsb_factor) * opts.lsb_factor;
            assert_eq!(back.intensity, quantized_orig);
        }
    }

    #[test]
    fn empty_spectrum_round_trips() {
        let spectrum = Spectrum::new(Vec::new());
        let blob = encode(&spectrum, &EncodeOptions::default());
        let decoded = decode(&blob, &DecodeOptions::default()).unwrap();
        assert!(decoded.is_empty());
    }
}
