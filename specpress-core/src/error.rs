// specpress
// Copyright (c) 2026 The specpress Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `error` module defines the common error and warning types shared across the codec.

use std::fmt;

/// `Error` enumerates every way the codec refuses to produce or consume a spectrum.
///
/// `IntegrityWarning` conditions (non-monotone m/z, odd intensity gaps, a fallback to the
/// no-compression path) are *not* represented here: they are recoverable, do not abort the
/// current operation, and are reported through [`IntegrityWarning`] instead.
#[derive(Debug)]
pub enum Error {
    /// The blob is truncated, has a dictionary index out of range, or a predictor state that
    /// fails to invert.
    MalformedBlob(&'static str),
    /// A family tag, calibration shape, or intensity value outside the codec's supported range.
    Unsupported(&'static str),
    /// Surfaced verbatim from a [`crate::store`]-like metadata backing.
    Store(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MalformedBlob(msg) => write!(f, "malformed blob: {}", msg),
            Error::Unsupported(feature) => write!(f, "unsupported: {}", feature),
            Error::Store(err) => write!(f, "metadata store error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Store(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Convenience function to create a malformed-blob error.
pub fn malformed_blob<T>(desc: &'static str) -> Result<T> {
    Err(Error::MalformedBlob(desc))
}

/// Convenience function to create an unsupported-feature error.
pub fn unsupported<T>(feature: &'static str) -> Result<T> {
    Err(Error::Unsupported(feature))
}

/// Convenience function to wrap a metadata store error.
pub fn store_error<T>(err: impl std::error::Error + Send + Sync + 'static) -> Result<T> {
    Err(Error::Store(Box::new(err)))
}

/// The kind of recoverable anomaly an [`IntegrityWarning`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityWarningKind {
    /// Centroided peaks were not monotone non-decreasing in m/z; the encoder sorted them.
    PeaksNotMonotone,
    /// A Waters1 intensity run's gap was not a multiple of 8; encoded anyway.
    NonAlignedIntensityGap,
    /// The encoder fell back to the family's no-compression path.
    NoCompressionFallback,
}

impl IntegrityWarningKind {
    fn as_str(&self) -> &'static str {
        match self {
            IntegrityWarningKind::PeaksNotMonotone => "centroided peaks were not monotone in m/z",
            IntegrityWarningKind::NonAlignedIntensityGap => {
                "intensity gap was not a multiple of 8"
            }
            IntegrityWarningKind::NoCompressionFallback => "fell back to no-compression encoding",
        }
    }
}

/// A recoverable anomaly observed while encoding or decoding one spectrum.
///
/// Warnings never abort the operation that produced them; callers that care accumulate them
/// (see [`crate::error::IntegrityWarning::log`]) and a pipeline run counts them.
#[derive(Debug, Clone)]
pub struct IntegrityWarning {
    pub scan_id: Option<u64>,
    pub kind: IntegrityWarningKind,
    /// Free-form, per-instance context: the offending gap value, the number of peaks resorted,
    /// or similar. Empty when the kind itself is the whole story.
    pub detail: String,
}

impl IntegrityWarning {
    pub fn new(scan_id: Option<u64>, kind: IntegrityWarningKind, detail: impl Into<String>) -> Self {
        IntegrityWarning { scan_id, kind, detail: detail.into() }
    }

    /// Emits this warning through the `log` facade at `warn` level.
    pub fn log(&self) {
        log::warn!("{}", self);
    }
}

impl fmt::Display for IntegrityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scan_id {
            Some(id) => write!(f, "scan {}: {}", id, self.kind.as_str())?,
            None => write!(f, "{}", self.kind.as_str())?,
        }
        if !self.detail.is_empty() {
            write!(f, " ({})", self.detail)?;
        }
        Ok(())
    }
}
