// specpress
// Copyright (c) 2026 The specpress Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tunables that were historically baked in as magic numbers. Every value here defaults to the
//! number the original archives were written with; callers writing fresh blobs may override
//! them, but changing a default does not change how *existing* blobs decode.

/// Options controlling how a spectrum is encoded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodeOptions {
    /// Bruker1/Bruker2 intensity LSB quantization factor; raw intensity is divided by this
    /// before dictionary construction and multiplied back on decode.
    pub lsb_factor: u32,
    /// Centroided1 falls back to no-compression below this peak count.
    pub centroided_min_peaks: usize,
    /// Centroided1 falls back to no-compression below this m/z span.
    pub centroided_min_span: f64,
    /// Waters1 falls back to no-compression below this peak count.
    pub waters_min_peaks: usize,
    /// Waters1 falls back to no-compression below this raw (integer-domain) m/z span.
    pub waters_min_span_raw: u32,
    /// Initial minimum-gap seed used when fitting AB SCIEX's log-domain gap predictor.
    pub dmin_seed: f64,
    /// Zero-restoration default gap size.
    pub default_zero_gap: f64,
    /// Zero-restoration maximum gap size.
    pub max_zero_gap: f64,
    /// Selects the Waters1 `ms_type_6` gear-shift variant. Historically this aborted with
    /// "not yet supported" whenever it was set; we keep that behavior rather than silently
    /// changing it, so encoding never sets this flag and decoding treats a blob with the bit set
    /// as [`specpress_core::Error::Unsupported`].
    pub ms_type_6: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        EncodeOptions {
            lsb_factor: 4,
            centroided_min_peaks: 10,
            centroided_min_span: 2.0,
            waters_min_peaks: 10,
            waters_min_span_raw: 10_000_000,
            dmin_seed: 0.09,
            default_zero_gap: 0.01,
            max_zero_gap: 0.11,
            ms_type_6: false,
        }
    }
}

/// Options controlling how a spectrum is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodeOptions {
    /// Waters1 only: reinsert zero-intensity samples around decoded peaks.
    pub restore_zeros: bool,
}
