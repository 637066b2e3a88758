// specpress
// Copyright (c) 2026 The specpress Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bruker1: a dense profile spectrum whose m/z ladder is a cubic fit against sample index, and
//! whose sparse nonzero intensities are stored as two frequency dictionaries (hop gaps between
//! nonzero positions, and the quantized intensity values themselves) plus a plain byte-aligned
//! per-sample index stream.

use specpress_core::dictionary::Dictionary;
use specpress_core::error::{malformed_blob, Result};
use specpress_core::io::{SimpleReader, SimpleWriter};
use specpress_core::predictor::{self, CubicPredictor};
use specpress_core::{Sample, Spectrum};

use crate::common::{push_f64, push_tiered_intensity, push_u16, push_u32, read_tiered_intensity, Cursor};
use crate::options::{DecodeOptions, EncodeOptions};

/// Encodes a dense profile spectrum in the Bruker1 layout.
///
/// `spectrum.samples` is the full, index-addressable profile: every sample's m/z is recovered
/// from its position via the fitted cubic, and a sample with `intensity == 0` costs nothing
/// beyond its place in the hop-gap sequence.
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

    let mut positions = Vec::new();
    for (i, &q) in quantized.iter().enumerate() {
        if q != 0 {
            positions.push(i as u32);
        }
    }

    let mut hop_dels = Vec::with_capacity(positions.len());
    let mut prev = 0u32;
    for &p in &positions {
        hop_dels.push(p - prev);
        prev = p;
    }

    let hop_dict = Dictionary::build(hop_dels.iter().copied());
    let intens_values: Vec<u32> = positions.iter().map(|&p| quantized[p as usize]).collect();
    let intens_dict = Dictionary::build(intens_values.iter().copied());

    let mut buf = Vec::new();
    push_u32(&mut buf, mz_len);
    push_f64(&mut buf, d);
    push_f64(&mut buf, c);
    push_f64(&mut buf, b);
    push_f64(&mut buf, a);

    push_u16(&mut buf, hop_dict.len() as u16);
    for (idx, entry) in hop_dict.entries.iter().enumerate() {
        push_u16(&mut buf, idx as u16);
        push_u16(&mut buf, entry.value as u16);
    }

    buf.push(opts.lsb_factor as u8);
    push_u32(&mut buf, intens_dict.len() as u32);
    for (idx, entry) in intens_dict.entries.iter().enumerate() {
        push_u16(&mut buf, idx as u16);
        push_tiered_intensity(&mut buf, entry.value);
    }

    push_u32(&mut buf, hop_dels.len() as u32);
    let mut indices = SimpleWriter::new();
    for (&del, &value) in hop_dels.iter().zip(intens_values.iter()) {
        let hop_idx = hop_dict.index_of(del).expect("hop_dels built this dictionary");
        let intens_idx = intens_dict
            .index_of(value)
            .expect("intens_values built this dictionary");
        indices.write_value(hop_idx);
        indices.write_value(intens_idx);
    }
    buf.extend_from_slice(&indices.finish());

    buf
}

/// Decodes a Bruker1 blob back into a dense profile spectrum.
pub fn decode(blob: &[u8], _opts: &DecodeOptions) -> Result<Spectrum> {
    let mut cur = Cursor::new(blob);
    let mz_len = cur.u32()? as usize;
    let d = cur.f64()?;
    let c = cur.f64()?;
    let b = cur.f64()?;
    let a = cur.f64()?;
    let coeffs = (d, c, b, a);

    let hop_count = cur.u16()? as usize;
    let mut hop_values = vec![0u32; hop_count];
    for _ in 0..hop_count {
        let idx = cur.u16()? as usize;
        let value = cur.u16()? as u32;
        match hop_values.get_mut(idx) {
            Some(slot) => *slot = value,
            None => return malformed_blob("Bruker1 hop dictionary index out of range"),
        }
    }

    let lsb_factor = u32::from(cur.u8()?);
    let intens_count = cur.u32()? as usize;
    let mut intens_values = vec![0u32; intens_count];
    for _ in 0..intens_count {
        let idx = cur.u16()? as usize;
        let value = read_tiered_intensity(&mut cur)?;
        if idx >= intens_values.len() {
            return malformed_blob("Bruker1 intensity dictionary index out of range");
        }
        intens_values[idx] = value;
    }

    let sample_count = cur.u32()? as usize;
    let mut reader = SimpleReader::new(cur.remaining());
    let mut intensities = vec![0u32; mz_len];
    let mut pos = 0u32;
    for _ in 0..sample_count {
        let hop_idx = reader.read_value()? as usize;
        let intens_idx = reader.read_value()? as usize;
        let del = *hop_values
            .get(hop_idx)
            .ok_or(specpress_core::Error::MalformedBlob("Bruker1 hop index out of range"))?;
        let quantized = *intens_values
            .get(intens_idx)
            .ok_or(specpress_core::Error::MalformedBlob("Bruker1 intensity index out of range"))?;
        pos += del;
        let slot = intensities
            .get_mut(pos as usize)
            .ok_or(specpress_core::Error::MalformedBlob("Bruker1 sample position out of range"))?;
        *slot = quantized * lsb_factor;
    }

    let samples = (0..mz_len)
        .map(|i| Sample {
            mz: predictor::eval(coeffs, i as f64),
            intensity: intensities[i],
        })
        .collect();
    Ok(Spectrum::new(samples))
}
