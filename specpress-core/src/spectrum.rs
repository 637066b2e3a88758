// specpress
// Copyright (c) 2026 The specpress Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The data model shared by every family codec: a spectrum's samples and the family tag that
//! selects which wire format encodes them.

/// One (m/z, intensity) sample pair.
///
/// Invariant on input: across a [`Spectrum`], `mz` is expected to be non-decreasing. A few
/// family codecs tolerate and auto-correct a handful of out-of-order neighbours (see
/// [`crate::error::IntegrityWarningKind::PeaksNotMonotone`]); none accept wildly shuffled input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub mz: f64,
    pub intensity: u32,
}

/// An ordered sequence of samples making up one scan.
///
/// `Spectrum` owns its samples; the encoder takes a `&Spectrum` and returns an owned byte
/// buffer, the decoder takes a byte slice and returns an owned `Spectrum`. Scratch state used
/// while encoding or decoding one spectrum (dictionaries, hop arrays, predictor vectors) is
/// never retained on this type or anywhere else between spectra.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Spectrum {
    pub samples: Vec<Sample>,
}

impl Spectrum {
    pub fn new(samples: Vec<Sample>) -> Self {
        Spectrum { samples }
    }

    pub fn from_parallel(mz: &[f64], intensity: &[u32]) -> Self {
        assert_eq!(mz.len(), intensity.len(), "mz/intensity length mismatch");
        let samples = mz
            .iter()
            .zip(intensity.iter())
            .map(|(&mz, &intensity)| Sample { mz, intensity })
            .collect();
        Spectrum { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn mz(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.mz).collect()
    }

    pub fn intensity(&self) -> Vec<u32> {
        self.samples.iter().map(|s| s.intensity).collect()
    }

    /// The sum of all sample intensities, as stored in the companion `TIC` row.
    pub fn intensity_sum(&self) -> u64 {
        self.samples.iter().map(|s| u64::from(s.intensity)).sum()
    }

    /// True if `mz` is non-decreasing across every consecutive pair of samples.
    pub fn is_mz_monotone(&self) -> bool {
        self.samples.windows(2).all(|w| w[0].mz <= w[1].mz)
    }

    /// Returns a copy sorted by ascending m/z, stable on ties so that the relative order of
    /// peaks at the same m/z (a vendor-centroider artifact) is preserved.
    pub fn sorted_by_mz(&self) -> Spectrum {
        let mut samples = self.samples.clone();
        samples.sort_by(|a, b| a.mz.partial_cmp(&b.mz).expect("mz must not be NaN"));
        Spectrum { samples }
    }
}

/// The five supported compression families.
///
/// The persistent identifier codes are fixed integers written into metadata rows; they must
/// never be reassigned, since existing archives carry them on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FamilyTag {
    Bruker1,
    Bruker2,
    Waters1,
    Centroided1,
    AbSciex1,
}

impl FamilyTag {
    /// The persistent identifier code written into the `CompressionInfo` metadata row.
    pub const fn code(self) -> i32 {
        match self {
            FamilyTag::Bruker1 => 1,
            FamilyTag::Bruker2 => 101,
            FamilyTag::Centroided1 => 2,
            FamilyTag::AbSciex1 => 3,
            FamilyTag::Waters1 => 102,
        }
    }

    /// Recovers a [`FamilyTag`] from a persistent identifier code, or `None` if the code is not
    /// one of the five fixed values on the wire.
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(FamilyTag::Bruker1),
            101 => Some(FamilyTag::Bruker2),
            2 => Some(FamilyTag::Centroided1),
            3 => Some(FamilyTag::AbSciex1),
            102 => Some(FamilyTag::Waters1),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_tag_codes_round_trip() {
        for tag in [
            FamilyTag::Bruker1,
            FamilyTag::Bruker2,
            FamilyTag::Waters1,
            FamilyTag::Centroided1,
            FamilyTag::AbSciex1,
        ] {
            assert_eq!(FamilyTag::from_code(tag.code()), Some(tag));
        }
    }

    #[test]
    fn family_tag_codes_are_fixed() {
        assert_eq!(FamilyTag::Bruker1.code(), 1);
        assert_eq!(FamilyTag::Bruker2.code(), 101);
        assert_eq!(FamilyTag::Centroided1.code(), 2);
        assert_eq!(FamilyTag::AbSciex1.code(), 3);
        assert_eq!(FamilyTag::Waters1.code(), 102);
    }

    #[test]
    fn monotone_check() {
        let s = Spectrum::from_parallel(&[1.0, 2.0, 3.0], &[1, 2, 3]);
        assert!(s.is_mz_monotone());
        let s = Spectrum::from_parallel(&[1.0, 3.0, 2.0], &[1, 2, 3]);
        assert!(!s.is_mz_monotone());
    }
}
