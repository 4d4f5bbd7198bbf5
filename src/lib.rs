// Warren -- Compact ordered map for byte string and integer keys
// Copyright 2026 The Warren Authors

// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// A copy of the License has been included in the root of the repository.

//! An ordered associative map that maps byte string or fixed-width
//! integer keys to one machine word per key, tuned for memory density.
//!
//! Why not a BTreeMap? A B-tree's lookup cost is proportional to the
//! log of the population, and every comparison is a full key compare
//! behind a pointer. For large populations of short keys that is a lot
//! of cache misses that carry no information: most comparisons agree
//! on a long prefix. A trie spends its misses proportionally to the
//! key length instead, and never stores a shared prefix twice. The
//! classic problem with tries is the opposite one: a 256-ary node is
//! two cache lines of mostly-empty slots when only three children
//! exist. So this map changes node shape with local population:
//!
//! * Sorted linear nodes of 1 to 32 entries hold sparse branch points;
//!   an insert into a full node promotes it to the next size.
//! * A full largest linear node splits into a pair of 16-entry nibble
//!   tables (a radix pair) discriminating one byte.
//! * Runs of keys with no branch at all are stored verbatim in span
//!   nodes, three words of key bytes per node.
//!
//! Every child reference is a single tagged word, so "absent" is a
//! zero word and a node reference carries its shape in the low bits
//! for free. All node storage comes from 64 KiB segments owned by the
//! map, recycled through per-size free lists and never returned to
//! the host before the map drops.

mod arena;
mod map;
mod node;
mod path;
mod slot;

use std::fmt;

pub use crate::map::{CellRef, DataRef, Warren};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Error {
    /// The host refused a new 64 KiB segment. The map is unchanged;
    /// the operation that needed the segment did nothing.
    OutOfMemory,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::OutOfMemory => write!(f, "out of memory"),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
