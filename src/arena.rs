// Warren -- Compact ordered map for byte string and integer keys
// Copyright 2026 The Warren Authors

// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// A copy of the License has been included in the root of the repository.

//! Segmented block storage for trie nodes and caller payload.
//!
//! All node memory comes out of 64 KiB segments. A segment is bump
//! allocated downward from its end, so the remaining space is a single
//! contiguous run and a block never straddles two segments. Freed
//! blocks do not return to the bump cursor; they go on a free list per
//! block size, where the first word of a free block links to the next.
//! A request served from a larger free block splits it into one block
//! of every intermediate size (the sizes double, so the pieces tile the
//! larger block exactly). Nothing is ever returned to the host until
//! the whole map is dropped.
//!
//! A block reference is a global byte offset: segment index in the high
//! bits, offset within the segment in the low 16. The first cache line
//! of every segment is kept out of circulation so that a live reference
//! is never zero, which lets the trie use the zero word for "absent".
//!
//! Byte addressing is big-endian within each storage word. That makes
//! byte streams host-independent and makes a key fragment, read as a
//! right-aligned integer, compare in byte-lexicographic order with a
//! plain integer comparison. There is no host-endianness branch
//! anywhere in the crate.

use crate::slot::Shape;
use crate::{Error, Result};

/// Segment size in bytes. Also the alignment of the reference packing,
/// so this must stay a power of two and equal to 1 << 16.
pub const SEGMENT_BYTES: usize = 64 * 1024;

const SEGMENT_WORDS: usize = SEGMENT_BYTES / 8;

/// Block alignment in bytes. May be raised to a real cache line size
/// (64); the allocator then manufactures sibling blocks out of the
/// carve remainder so no sub-cache-line fragment is wasted.
pub const CACHE_LINE: usize = 8;

#[derive(Clone)]
struct Segment {
    words: Box<[u64]>,
    /// Downward high-water mark, as a byte offset. Allocations carve
    /// from here toward the segment base.
    next: usize,
}

impl Segment {
    fn new() -> Result<Segment> {
        // Going through try_reserve keeps out-of-memory an error value
        // instead of an abort; the trie reports it from cell() and
        // data() without mutating anything.
        let mut words: Vec<u64> = Vec::new();
        words
            .try_reserve_exact(SEGMENT_WORDS)
            .map_err(|_| Error::OutOfMemory)?;
        words.resize(SEGMENT_WORDS, 0);
        Ok(Segment {
            words: words.into_boxed_slice(),
            next: SEGMENT_BYTES,
        })
    }
}

#[derive(Clone)]
pub struct Arena {
    segments: Vec<Segment>,
    /// Free list heads, indexed by shape tag. Only linear tags are
    /// used: shapes whose blocks are the same size share the list of
    /// their size class (radix with Lin8, span with Lin2).
    reuse: [u64; 8],
}

impl Arena {
    pub fn new() -> Arena {
        Arena {
            segments: Vec::new(),
            reuse: [0; 8],
        }
    }

    #[inline]
    fn locate(&self, bref: u64) -> (usize, usize) {
        ((bref >> 16) as usize, (bref & 0xffff) as usize)
    }

    #[inline]
    pub fn word(&self, bref: u64) -> u64 {
        debug_assert!(bref & 7 == 0, "Word access must be word-aligned.");
        let (seg, off) = self.locate(bref);
        self.segments[seg].words[off / 8]
    }

    #[inline]
    pub fn set_word(&mut self, bref: u64, value: u64) {
        debug_assert!(bref & 7 == 0, "Word access must be word-aligned.");
        let (seg, off) = self.locate(bref);
        self.segments[seg].words[off / 8] = value;
    }

    #[inline]
    pub fn byte(&self, bref: u64) -> u8 {
        let (seg, off) = self.locate(bref);
        let word = self.segments[seg].words[off / 8];
        word.to_be_bytes()[off % 8]
    }

    #[inline]
    pub fn set_byte(&mut self, bref: u64, value: u8) {
        let (seg, off) = self.locate(bref);
        let word = &mut self.segments[seg].words[off / 8];
        let mut bytes = word.to_be_bytes();
        bytes[off % 8] = value;
        *word = u64::from_be_bytes(bytes);
    }

    /// Read `len` bytes (at most one key word) as a right-aligned
    /// big-endian integer. Fragment comparison is integer comparison.
    pub fn read_frag(&self, bref: u64, len: usize) -> u64 {
        debug_assert!(len <= 8);
        let mut value = 0;
        for i in 0..len {
            value = value << 8 | self.byte(bref + i as u64) as u64;
        }
        value
    }

    /// Inverse of `read_frag`.
    pub fn write_frag(&mut self, bref: u64, len: usize, value: u64) {
        debug_assert!(len <= 8);
        for i in 0..len {
            let shift = 8 * (len - 1 - i);
            self.set_byte(bref + i as u64, (value >> shift) as u8);
        }
    }

    /// Copy with memmove semantics; the ranges may overlap.
    pub fn move_bytes(&mut self, dst: u64, src: u64, len: usize) {
        if dst == src || len == 0 {
            return;
        }
        if dst < src {
            for i in 0..len as u64 {
                let b = self.byte(src + i);
                self.set_byte(dst + i, b);
            }
        } else {
            for i in (0..len as u64).rev() {
                let b = self.byte(src + i);
                self.set_byte(dst + i, b);
            }
        }
    }

    pub fn zero_bytes(&mut self, bref: u64, len: usize) {
        if bref & 7 == 0 && len % 8 == 0 {
            for i in 0..(len / 8) as u64 {
                self.set_word(bref + 8 * i, 0);
            }
        } else {
            for i in 0..len as u64 {
                self.set_byte(bref + i, 0);
            }
        }
    }

    fn pop(&mut self, class: Shape) -> Option<u64> {
        let head = self.reuse[class.tag() as usize];
        if head == 0 {
            return None;
        }
        self.reuse[class.tag() as usize] = self.word(head);
        Some(head)
    }

    fn push(&mut self, class: Shape, base: u64) {
        let old = self.reuse[class.tag() as usize];
        self.set_word(base, old);
        self.reuse[class.tag() as usize] = base;
    }

    /// Return a block to its size class. The block is not zeroed here;
    /// allocation zeroes on the way out.
    pub fn free(&mut self, shape: Shape, base: u64) {
        self.push(shape.size_class(), base);
    }

    /// Carve raw bytes from the current segment, opening a new segment
    /// if the current one cannot fit the request.
    fn carve(&mut self, amt: usize) -> Result<u64> {
        debug_assert!(amt % CACHE_LINE == 0);
        // The first cache line of a segment stays reserved, so a live
        // reference can never be the zero word.
        let need_new = match self.segments.last() {
            None => true,
            Some(seg) => seg.next < amt + CACHE_LINE,
        };
        if need_new {
            let seg = Segment::new()?;
            self.segments.push(seg);
        }
        let idx = self.segments.len() - 1;
        let seg = &mut self.segments[idx];
        seg.next -= amt;
        Ok((idx as u64) << 16 | seg.next as u64)
    }

    /// Allocate a zeroed block for a node of the given shape.
    pub fn alloc(&mut self, shape: Shape) -> Result<u64> {
        let class = shape.size_class();
        let size = class.bytes();

        if let Some(base) = self.pop(class) {
            self.zero_bytes(base, size);
            return Ok(base);
        }

        // Break a larger free block down into one block of each
        // intermediate size, keeping the low-addressed piece.
        let mut larger = class.next_larger();
        while let Some(bigger) = larger {
            if let Some(base) = self.pop(bigger) {
                let mut piece = class;
                let mut off = size as u64;
                while (off as usize) < bigger.bytes() {
                    self.push(piece, base + off);
                    off += piece.bytes() as u64;
                    piece = piece.next_larger().unwrap();
                }
                self.zero_bytes(base, size);
                return Ok(base);
            }
            larger = bigger.next_larger();
        }

        let amt = size.max(CACHE_LINE);
        let base = self.carve(amt)?;
        // If alignment forced a larger carve, the excess tiles into
        // power-of-two siblings; push them so nothing is wasted.
        let mut piece = size as u64;
        while (piece as usize) < amt {
            self.push(Shape::linear_of_size(piece as usize), base + piece);
            piece <<= 1;
        }
        // Carved memory is fresh: the cursor only moves down and the
        // segment started zeroed.
        Ok(base)
    }

    /// Bump-allocate caller payload. Payload is never freed before the
    /// map is dropped, and never larger than what one segment can hold.
    pub fn data(&mut self, len: usize) -> Result<u64> {
        let amt = (len.max(1) + CACHE_LINE - 1) / CACHE_LINE * CACHE_LINE;
        if amt > SEGMENT_BYTES - 2 * CACHE_LINE {
            return Err(Error::OutOfMemory);
        }
        self.carve(amt)
    }

    pub fn read_data(&self, bref: u64, buf: &mut [u8]) {
        for (i, b) in buf.iter_mut().enumerate() {
            *b = self.byte(bref + i as u64);
        }
    }

    pub fn write_data(&mut self, bref: u64, bytes: &[u8]) {
        for (i, b) in bytes.iter().enumerate() {
            self.set_byte(bref + i as u64, *b);
        }
    }
}
