// specpress
// Copyright (c) 2026 The specpress Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cross-family round-trip behaviour exercised through the public `encode_spectrum`/
//! `decode_spectrum` entry points: every family on a dense profile and an empty spectrum, the
//! no-compression fallback path, Waters1's exact header size and non-restoring decode, and
//! truncated-blob error handling. The zero-restoration midpoint-insertion scenario is covered in
//! `waters1`'s own unit tests, which call `restore_zeros` directly.

use specpress_codec_spectra::{decode_spectrum, encode_spectrum, DecodeOptions, EncodeOptions};
use specpress_core::{FamilyTag, Spectrum};

const FAMILIES: [FamilyTag; 5] = [
    FamilyTag::Bruker1,
    FamilyTag::Bruker2,
    FamilyTag::Centroided1,
    FamilyTag::Waters1,
    FamilyTag::AbSciex1,
];

fn dense_profile(n: u32) -> Spectrum {
    let mut samples = Vec::new();
    for i in 0..n {
        let mz = 200.0 + 0.01 * i as f64;
        let intensity = if i % 19 == 0 { 1000 + (i % 11) * 37 } else { 0 };
        samples.push(specpress_core::Sample { mz, intensity });
    }
    Spectrum::new(samples)
}

#[test]
fn every_family_round_trips_a_dense_profile() {
    let spectrum = dense_profile(500);
    let encode_opts = EncodeOptions::default();
    let decode_opts = DecodeOptions::default();

    for family in FAMILIES {
        let blob = encode_spectrum(family, &spectrum, &encode_opts).expect("encode");
        let decoded = decode_spectrum(family, &blob, &decode_opts).expect("decode");
        assert_eq!(decoded.len(), spectrum.len(), "{family:?} changed sample count");

        for (orig, back) in spectrum.samples.iter().zip(decoded.samples.iter()) {
            // Bruker1/Bruker2 quantize intensity by `lsb_factor` before storing it.
            let expected_intensity = match family {
                FamilyTag::Bruker1 | FamilyTag::Bruker2 => {
                    (orig.intensity / encode_opts.lsb_factor) * encode_opts.lsb_factor
                }
                _ => orig.intensity,
            };
            assert_eq!(back.intensity, expected_intensity, "{family:?} changed an intensity");

            // AbSciex1 only reconstructs exact mz for nonzero-intensity ("real") peaks; the mz of
            // a restored zero-intensity gap is a predictor approximation, not a stored value.
            if family == FamilyTag::AbSciex1 && orig.intensity == 0 {
                continue;
            }
            assert!(
                back.mz.is_finite() && (orig.mz - back.mz).abs() / orig.mz.max(1.0) < 1e-3,
                "{family:?}: mz drifted too far: {} vs {}",
                orig.mz,
                back.mz
            );
        }
    }
}

#[test]
fn empty_spectrum_round_trips_for_every_family() {
    let spectrum = Spectrum::new(Vec::new());
    let encode_opts = EncodeOptions::default();
    let decode_opts = DecodeOptions::default();

    for family in FAMILIES {
        let blob = encode_spectrum(family, &spectrum, &encode_opts).expect("encode");
        let decoded = decode_spectrum(family, &blob, &decode_opts).expect("decode");
        assert!(decoded.is_empty(), "{family:?} did not round-trip an empty spectrum");
    }
}

#[test]
fn waters1_empty_spectrum_is_exactly_four_bytes() {
    let spectrum = Spectrum::new(Vec::new());
    let blob = encode_spectrum(FamilyTag::Waters1, &spectrum, &EncodeOptions::default()).unwrap();
    assert_eq!(blob, vec![0x00, 0x00, 0x00, 0x80]);
}

#[test]
fn single_peak_spectrum_takes_the_no_compression_path_where_documented() {
    let spectrum = Spectrum::from_parallel(&[123.456], &[42]);
    let encode_opts = EncodeOptions::default();

    let centroided_blob = encode_spectrum(FamilyTag::Centroided1, &spectrum, &encode_opts).unwrap();
    let tag = u32::from_le_bytes([centroided_blob[0], centroided_blob[1], centroided_blob[2], centroided_blob[3]]);
    assert_eq!(tag & 0x8000_0000, 0x8000_0000);

    let waters_blob = encode_spectrum(FamilyTag::Waters1, &spectrum, &encode_opts).unwrap();
    let tag = u32::from_le_bytes([waters_blob[0], waters_blob[1], waters_blob[2], waters_blob[3]]);
    assert_eq!(tag & 0x8000_0000, 0x8000_0000);
}

#[test]
fn waters1_without_restore_zeros_preserves_exact_nonzero_pairs() {
    let spectrum = Spectrum::from_parallel(&[600.0, 602.0, 603.5, 700.25, 701.0], &[10, 20, 30, 5, 7]);
    let blob = encode_spectrum(FamilyTag::Waters1, &spectrum, &EncodeOptions::default()).unwrap();
    let decoded = decode_spectrum(FamilyTag::Waters1, &blob, &DecodeOptions::default()).unwrap();

    assert_eq!(decoded.len(), spectrum.len());
    for (orig, back) in spectrum.samples.iter().zip(decoded.samples.iter()) {
        assert_eq!(orig.intensity, back.intensity);
        assert!((orig.mz - back.mz).abs() < 1e-6);
    }
}

#[test]
fn malformed_blob_is_reported_not_panicked_for_every_family() {
    let spectrum = dense_profile(200);
    let encode_opts = EncodeOptions::default();
    let decode_opts = DecodeOptions::default();

    for family in FAMILIES {
        let blob = encode_spectrum(family, &spectrum, &encode_opts).unwrap();
        let truncated = &blob[..blob.len() / 2];
        let result = decode_spectrum(family, truncated, &decode_opts);
        assert!(result.is_err(), "{family:?} did not reject a truncated blob");
    }
}
