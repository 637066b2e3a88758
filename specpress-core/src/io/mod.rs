// specpress
// Copyright (c) 2026 The specpress Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bit-level I/O: the half-byte-carry varint scheme shared by every family codec.

mod bitpack;

pub use bitpack::{BitReader, BitWriter, GapReader, GapWriter, SimpleReader, SimpleWriter};
