// specpress
// Copyright (c) 2026 The specpress Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The five family codecs that turn a [`specpress_core::Spectrum`] into bytes and back.
//!
//! Each family module (`bruker1`, `bruker2`, `centroided1`, `waters1`, `absciex1`) owns one
//! wire layout; this crate's job is picking the right one and giving callers a single pair of
//! entry points to call.

pub mod absciex1;
pub mod bruker1;
pub mod bruker2;
pub mod centroided1;
mod common;
pub mod options;
pub mod waters1;

pub use options::{DecodeOptions, EncodeOptions};

use specpress_core::{FamilyTag, Result, Spectrum};

/// Encodes `spectrum` using the wire layout for `family`.
pub fn encode_spectrum(family: FamilyTag, spectrum: &Spectrum, opts: &EncodeOptions) -> Result<Vec<u8>> {
    match family {
        FamilyTag::Bruker1 => Ok(bruker1::encode(spectrum, opts)),
        FamilyTag::Bruker2 => Ok(bruker2::encode(spectrum, opts)),
        FamilyTag::Centroided1 => Ok(centroided1::encode(spectrum, opts)),
        FamilyTag::Waters1 => Ok(waters1::encode(spectrum, opts)),
        FamilyTag::AbSciex1 => Ok(absciex1::encode(spectrum, opts)),
    }
}

/// Decodes a blob produced for `family` back into a [`Spectrum`].
pub fn decode_spectrum(family: FamilyTag, blob: &[u8], opts: &DecodeOptions) -> Result<Spectrum> {
    match family {
        FamilyTag::Bruker1 => bruker1::decode(blob, opts),
        FamilyTag::Bruker2 => bruker2::decode(blob, opts),
        FamilyTag::Centroided1 => centroided1::decode(blob, opts),
        FamilyTag::Waters1 => waters1::decode(blob, opts),
        FamilyTag::AbSciex1 => absciex1::decode(blob, opts),
    }
}
