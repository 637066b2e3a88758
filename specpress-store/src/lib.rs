// specpress
// Copyright (c) 2026 The specpress Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The metadata companion store: a small key/value and per-scan row layer that sits next to a
//! spectrum archive. The core only needs two operations from whatever database backs it —
//! atomic per-row read and write — so [`MetadataStore`] exposes exactly that, plus the ordered
//! scan iteration the pipeline needs to drive a full conversion.
//!
//! Errors from a concrete backing store are boxed into `specpress-core::error`'s `Store`
//! variant. The row shapes are: a scalar `Version` row, free-form string rows stamped at encode
//! time, a per-function calibration line pair, a per-scan compression-family tag, and a per-scan
//! intensity sum.

use std::collections::BTreeMap;

use specpress_core::calibration::{CalibrationPolynomial, CoefficientsType};
use specpress_core::error::malformed_blob;
use specpress_core::{FamilyTag, Result};

/// The schema version this crate reads and writes into the `Version` row.
pub const SCHEMA_VERSION: u32 = 6;

/// Read/write access to the metadata companion store.
///
/// Implementors only need to guarantee that a single `set_*` call is atomic; the pipeline is
/// responsible for grouping a whole run's writes into one [`MetadataStore::commit`].
pub trait MetadataStore {
    /// Reads a free-form string row (`Version`, `ConvertDate`, `RepoBranch`, a calibration line,
    /// ...) by key.
    fn get_string(&self, key: &str) -> Option<&str>;
    /// Writes a free-form string row.
    fn set_string(&mut self, key: &str, value: String);

    /// Scan ids with a stored peak blob, in ascending order.
    fn scan_ids(&self) -> Vec<u64>;
    /// Reads a scan's encoded peak blob.
    fn get_blob(&self, scan_id: u64) -> Option<&[u8]>;
    /// Writes a scan's encoded peak blob.
    fn set_blob(&mut self, scan_id: u64, blob: Vec<u8>);

    /// Reads the `CompressionInfo` tag recorded for a scan.
    fn compression_family(&self, scan_id: u64) -> Option<FamilyTag>;
    /// Writes the `CompressionInfo` tag for a scan.
    fn set_compression_family(&mut self, scan_id: u64, family: FamilyTag);

    /// Reads the `TIC` row recorded for a scan.
    fn intensity_sum(&self, scan_id: u64) -> Option<f64>;
    /// Writes the `TIC` row for a scan.
    fn set_intensity_sum(&mut self, scan_id: u64, sum: f64);

    /// Starts a transaction: writes made after this call are visible to reads on the same
    /// handle, but are discarded as a unit by [`MetadataStore::rollback`] instead of
    /// [`MetadataStore::commit`].
    fn begin(&mut self);
    /// Makes every write since the last [`MetadataStore::begin`] permanent.
    fn commit(&mut self);
    /// Discards every write since the last [`MetadataStore::begin`].
    fn rollback(&mut self);
}

#[derive(Debug, Clone, Default)]
struct ScanRow {
    blob: Option<Vec<u8>>,
    compression_family: Option<FamilyTag>,
    intensity_sum: Option<f64>,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    strings: BTreeMap<String, String>,
    scans: BTreeMap<u64, ScanRow>,
}

/// A `BTreeMap`-backed [`MetadataStore`], for tests and single-process conversions that don't
/// need a real database. A staged copy of the tables holds every write between `begin` and
/// `commit`/`rollback`; outside a transaction, writes land directly (auto-commit).
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    committed: Tables,
    staged: Option<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        InMemoryStore::default()
    }

    fn read(&self) -> &Tables {
        self.staged.as_ref().unwrap_or(&self.committed)
    }

    fn write(&mut self) -> &mut Tables {
        if self.staged.is_none() {
            self.staged = Some(self.committed.clone());
        }
        self.staged.as_mut().expect("just set")
    }
}

impl MetadataStore for InMemoryStore {
    fn get_string(&self, key: &str) -> Option<&str> {
        self.read().strings.get(key).map(String::as_str)
    }

    fn set_string(&mut self, key: &str, value: String) {
        self.write().strings.insert(key.to_string(), value);
    }

    fn scan_ids(&self) -> Vec<u64> {
        self.read().scans.keys().copied().collect()
    }

    fn get_blob(&self, scan_id: u64) -> Option<&[u8]> {
        self.read().scans.get(&scan_id)?.blob.as_deref()
    }

    fn set_blob(&mut self, scan_id: u64, blob: Vec<u8>) {
        self.write().scans.entry(scan_id).or_default().blob = Some(blob);
    }

    fn compression_family(&self, scan_id: u64) -> Option<FamilyTag> {
        self.read().scans.get(&scan_id)?.compression_family
    }

    fn set_compression_family(&mut self, scan_id: u64, family: FamilyTag) {
        self.write().scans.entry(scan_id).or_default().compression_family = Some(family);
    }

    fn intensity_sum(&self, scan_id: u64) -> Option<f64> {
        self.read().scans.get(&scan_id)?.intensity_sum
    }

    fn set_intensity_sum(&mut self, scan_id: u64, sum: f64) {
        self.write().scans.entry(scan_id).or_default().intensity_sum = Some(sum);
    }

    fn begin(&mut self) {
        if self.staged.is_none() {
            self.staged = Some(self.committed.clone());
        }
    }

    fn commit(&mut self) {
        if let Some(staged) = self.staged.take() {
            self.committed = staged;
        }
    }

    fn rollback(&mut self) {
        self.staged = None;
    }
}

/// Writes `SCHEMA_VERSION` into the `Version` row.
pub fn stamp_schema_version(store: &mut impl MetadataStore) {
    store.set_string("Version", SCHEMA_VERSION.to_string());
}

/// Reads and parses the `Version` row, if present.
pub fn read_schema_version(store: &impl MetadataStore) -> Option<u32> {
    store.get_string("Version")?.parse().ok()
}

/// Formats a `Cal Function N` / `Cal Modification N` row: coefficients joined by commas,
/// followed by a trailing `Tx0`/`Tx1` tag naming the polynomial's basis. A polynomial with no
/// declared basis (`CoefficientsType::None`) is written as `Tx0`, matching the `T0`
/// monomial-series evaluator's behavior on an all-zero-padded coefficient list.
pub fn format_calibration_line(poly: &CalibrationPolynomial) -> String {
    let mut line = poly
        .coefficients
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(",");
    if !line.is_empty() {
        line.push(',');
    }
    line.push_str(match poly.kind {
        CoefficientsType::T1 => "Tx1",
        CoefficientsType::T0 | CoefficientsType::None => "Tx0",
    });
    line
}

/// Parses a `Cal Function N` / `Cal Modification N` row back into a [`CalibrationPolynomial`].
pub fn parse_calibration_line(line: &str) -> Result<CalibrationPolynomial> {
    let mut parts: Vec<&str> = line.split(',').collect();
    let tag = parts
        .pop()
        .ok_or(specpress_core::Error::MalformedBlob("calibration line is empty"))?;
    let kind = match tag {
        "Tx0" => CoefficientsType::T0,
        "Tx1" => CoefficientsType::T1,
        _ => return malformed_blob("calibration line has an unrecognised polynomial-type tag"),
    };
    let mut coefficients = Vec::with_capacity(parts.len());
    for part in parts {
        let value: f64 = part
            .trim()
            .parse()
            .map_err(|_| specpress_core::Error::MalformedBlob("calibration line has a non-numeric coefficient"))?;
        coefficients.push(value);
    }
    Ok(CalibrationPolynomial { kind, coefficients })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calibration_line_round_trips() {
        let poly = CalibrationPolynomial {
            kind: CoefficientsType::T1,
            coefficients: vec![1.0, 0.5, 0.0],
        };
        let line = format_calibration_line(&poly);
        assert_eq!(line, "1,0.5,0,Tx1");
        let back = parse_calibration_line(&line).unwrap();
        assert_eq!(back, poly);
    }

    #[test]
    fn rejects_unrecognised_tag() {
        assert!(parse_calibration_line("1.0,2.0,Tx9").is_err());
    }

    #[test]
    fn in_memory_store_round_trips_rows() {
        let mut store = InMemoryStore::new();
        stamp_schema_version(&mut store);
        store.set_blob(3, vec![1, 2, 3]);
        store.set_compression_family(3, FamilyTag::Bruker1);
        store.set_intensity_sum(3, 42.5);

        assert_eq!(read_schema_version(&store), Some(SCHEMA_VERSION));
        assert_eq!(store.get_blob(3), Some(&[1, 2, 3][..]));
        assert_eq!(store.compression_family(3), Some(FamilyTag::Bruker1));
        assert_eq!(store.intensity_sum(3), Some(42.5));
        assert_eq!(store.scan_ids(), vec![3]);
    }

    #[test]
    fn rollback_discards_staged_writes() {
        let mut store = InMemoryStore::new();
        store.set_blob(1, vec![9]);
        store.commit();

        store.begin();
        store.set_blob(1, vec![0, 0]);
        store.set_blob(2, vec![7]);
        store.rollback();

        assert_eq!(store.get_blob(1), Some(&[9][..]));
        assert_eq!(store.get_blob(2), None);
    }

    #[test]
    fn commit_makes_staged_writes_permanent() {
        let mut store = InMemoryStore::new();
        store.begin();
        store.set_blob(1, vec![5, 5]);
        store.commit();

        assert_eq!(store.get_blob(1), Some(&[5, 5][..]));
    }
}
