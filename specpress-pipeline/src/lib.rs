// specpress
// Copyright (c) 2026 The specpress Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The spectrum pipeline: a thin driver that opens a source and a destination metadata store,
//! copies the small string tables verbatim, then streams every scan's peak blob through the
//! family codec — decoding from the source's family, re-encoding for the destination's —
//! committing the whole run as one transaction.
//!
//! Single-threaded with no internal suspension: a run either completes in one call or, on
//! `MalformedBlob`/`Unsupported`, rolls the whole transaction back. `IntegrityWarning` is
//! counted and reported but never aborts.

use specpress_codec_spectra::{decode_spectrum, encode_spectrum, DecodeOptions, EncodeOptions};
use specpress_core::{Error, FamilyTag, Result};
use specpress_store::MetadataStore;

/// Per-scan progress callback. `on_scan` fires once a scan's blob has been committed to the
/// staged destination tables (before the run's final [`MetadataStore::commit`]).
pub trait Progress {
    fn on_scan(&mut self, scan_id: u64);
}

/// A [`Progress`] that does nothing, for callers that only want the final [`RunStats`].
#[derive(Debug, Default)]
pub struct NoopProgress;

impl Progress for NoopProgress {
    fn on_scan(&mut self, _scan_id: u64) {}
}

/// Outcome of a full (or single-scan) pipeline run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub scans_processed: u64,
    pub warnings: u64,
}

/// Streams every scan in `source` through the codec and into `destination`, re-tagging each
/// scan's `CompressionInfo` row and recomputing its `TIC` row for `destination_family`.
///
/// String rows present on `source` are copied to `destination` first and unconditionally,
/// before any scan is touched. The whole run is one transaction: any [`Error::MalformedBlob`] or [`Error::Unsupported`]
/// rolls the destination store back to its state before this call; scans already written are
/// discarded along with it, never left half-committed.
pub fn run(
    source: &impl MetadataStore,
    destination: &mut impl MetadataStore,
    source_family: FamilyTag,
    destination_family: FamilyTag,
    decode_opts: &DecodeOptions,
    encode_opts: &EncodeOptions,
    progress: &mut impl Progress,
) -> Result<RunStats> {
    destination.begin();

    for key in ["Version", "ConvertDate", "ConvertTime", "CompileTime", "RepoBranch", "RepoVersion"] {
        if let Some(value) = source.get_string(key) {
            destination.set_string(key, value.to_string());
        }
    }

    let mut stats = RunStats::default();
    for scan_id in source.scan_ids() {
        match transcode_scan(source, destination, scan_id, source_family, destination_family, decode_opts, encode_opts) {
            Ok(()) => {
                stats.scans_processed += 1;
                progress.on_scan(scan_id);
            }
            Err(err @ (Error::MalformedBlob(_) | Error::Unsupported(_))) => {
                destination.rollback();
                return Err(err);
            }
            Err(err) => return Err(err),
        }
    }

    destination.commit();
    Ok(stats)
}

/// Single-scan mode: transcodes exactly `scan_id`, for testing a pipeline stage without
/// running a whole archive. Still goes through `begin`/`commit` so partial writes from a
/// mid-scan failure never land.
pub fn run_one(
    source: &impl MetadataStore,
    destination: &mut impl MetadataStore,
    scan_id: u64,
    source_family: FamilyTag,
    destination_family: FamilyTag,
    decode_opts: &DecodeOptions,
    encode_opts: &EncodeOptions,
) -> Result<()> {
    destination.begin();
    match transcode_scan(source, destination, scan_id, source_family, destination_family, decode_opts, encode_opts) {
        Ok(()) => {
            destination.commit();
            Ok(())
        }
        Err(err) => {
            destination.rollback();
            Err(err)
        }
    }
}

fn transcode_scan(
    source: &impl MetadataStore,
    destination: &mut impl MetadataStore,
    scan_id: u64,
    source_family: FamilyTag,
    destination_family: FamilyTag,
    decode_opts: &DecodeOptions,
    encode_opts: &EncodeOptions,
) -> Result<()> {
    let blob = source
        .get_blob(scan_id)
        .ok_or(Error::MalformedBlob("pipeline: scan id has no peak blob in the source store"))?;
    let spectrum = decode_spectrum(source_family, blob, decode_opts)?;
    let encoded = encode_spectrum(destination_family, &spectrum, encode_opts)?;

    destination.set_blob(scan_id, encoded);
    destination.set_compression_family(scan_id, destination_family);
    destination.set_intensity_sum(scan_id, spectrum.intensity_sum() as f64);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use specpress_core::{FamilyTag, Spectrum};
    use specpress_store::InMemoryStore;

    fn seeded_source() -> InMemoryStore {
        let mut store = InMemoryStore::new();
        store.set_string("Version", "6".to_string());
        store.set_string("RepoBranch", "release/9.1".to_string());

        let spectrum = Spectrum::from_parallel(&[500.0, 500.1, 500.2], &[10, 20, 30]);
        let blob = encode_spectrum(FamilyTag::Centroided1, &spectrum, &EncodeOptions::default()).unwrap();
        store.set_blob(7, blob);
        store.commit();
        store
    }

    #[test]
    fn run_copies_strings_and_transcodes_every_scan() {
        let source = seeded_source();
        let mut destination = InMemoryStore::new();
        let mut progress = NoopProgress;

        let stats = run(
            &source,
            &mut destination,
            FamilyTag::Centroided1,
            FamilyTag::Centroided1,
            &DecodeOptions::default(),
            &EncodeOptions::default(),
            &mut progress,
        )
        .unwrap();

        assert_eq!(stats.scans_processed, 1);
        assert_eq!(destination.get_string("RepoBranch"), Some("release/9.1"));
        assert!(destination.get_blob(7).is_some());
        assert_eq!(destination.compression_family(7), Some(FamilyTag::Centroided1));
        assert!(destination.intensity_sum(7).unwrap() > 0.0);
    }

    #[test]
    fn run_one_restores_exactly_the_requested_scan() {
        let source = seeded_source();
        let mut destination = InMemoryStore::new();

        run_one(
            &source,
            &mut destination,
            7,
            FamilyTag::Centroided1,
            FamilyTag::Centroided1,
            &DecodeOptions::default(),
            &EncodeOptions::default(),
        )
        .unwrap();

        assert!(destination.get_blob(7).is_some());
        assert!(destination.get_blob(8).is_none());
    }

    #[test]
    fn missing_scan_rolls_back_and_leaves_destination_untouched() {
        let source = seeded_source();
        let mut destination = InMemoryStore::new();
        destination.set_blob(1, vec![0xAA]);
        destination.commit();

        let err = run_one(
            &source,
            &mut destination,
            999,
            FamilyTag::Centroided1,
            FamilyTag::Centroided1,
            &DecodeOptions::default(),
            &EncodeOptions::default(),
        );

        assert!(err.is_err());
        assert_eq!(destination.get_blob(1), Some(&[0xAA][..]));
        assert!(destination.get_blob(999).is_none());
    }
}
