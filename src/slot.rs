// Warren -- Compact ordered map for byte string and integer keys
// Copyright 2026 The Warren Authors

// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// A copy of the License has been included in the root of the repository.

//! The tagged slot word, and the node shapes it can reference.

/// Bytes per key word. Fragments in linear nodes never exceed this.
pub const KEY_WORD: usize = 8;

/// Bytes per child slot. One machine word.
pub const SLOT_BYTES: usize = 8;

/// Verbatim key bytes held by a span node: three whole key words, so a
/// span decomposes into word-sized linear fragments when it has to be
/// split open.
pub const SPAN_BYTES: usize = 24;

/// The node shapes, in tag order. The tag occupies the low 3 bits of a
/// slot word; the remaining bits are the block reference.
///
/// Linear shapes are ordered by block size, each double the previous,
/// which is what allows a freed larger block to be split into one block
/// of every smaller linear size.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum Shape {
    Radix = 0,
    Lin1 = 1,
    Lin2 = 2,
    Lin4 = 3,
    Lin8 = 4,
    Lin16 = 5,
    Lin32 = 6,
    Span = 7,
}

impl Shape {
    pub fn from_tag(tag: u64) -> Shape {
        match tag & 7 {
            0 => Shape::Radix,
            1 => Shape::Lin1,
            2 => Shape::Lin2,
            3 => Shape::Lin4,
            4 => Shape::Lin8,
            5 => Shape::Lin16,
            6 => Shape::Lin32,
            _ => Shape::Span,
        }
    }

    pub fn tag(self) -> u64 {
        self as u64
    }

    /// Block size in bytes. A radix table is 16 slot words; a linear
    /// node is its nominal entry count times (slot + key word); a span
    /// is its verbatim bytes plus the trailing slot.
    pub fn bytes(self) -> usize {
        match self {
            Shape::Radix => 16 * SLOT_BYTES,
            Shape::Lin1 => SLOT_BYTES + KEY_WORD,
            Shape::Lin2 => 2 * (SLOT_BYTES + KEY_WORD),
            Shape::Lin4 => 4 * (SLOT_BYTES + KEY_WORD),
            Shape::Lin8 => 8 * (SLOT_BYTES + KEY_WORD),
            Shape::Lin16 => 16 * (SLOT_BYTES + KEY_WORD),
            Shape::Lin32 => 32 * (SLOT_BYTES + KEY_WORD),
            Shape::Span => SPAN_BYTES + SLOT_BYTES,
        }
    }

    /// The next larger linear shape, if any. Promotion target.
    pub fn next_larger(self) -> Option<Shape> {
        match self {
            Shape::Lin1 => Some(Shape::Lin2),
            Shape::Lin2 => Some(Shape::Lin4),
            Shape::Lin4 => Some(Shape::Lin8),
            Shape::Lin8 => Some(Shape::Lin16),
            Shape::Lin16 => Some(Shape::Lin32),
            _ => None,
        }
    }

    /// The linear shape whose block is the same size as this one's, for
    /// shapes that recycle through a shared free list: a radix table is
    /// the size of a Lin8 block, a span the size of a Lin2 block.
    pub fn size_class(self) -> Shape {
        match self {
            Shape::Radix => Shape::Lin8,
            Shape::Span => Shape::Lin2,
            lin => lin,
        }
    }

    /// The linear shape with the given block size. Used when the
    /// allocator manufactures sibling blocks out of a carve remainder.
    pub fn linear_of_size(bytes: usize) -> Shape {
        match bytes {
            16 => Shape::Lin1,
            32 => Shape::Lin2,
            64 => Shape::Lin4,
            128 => Shape::Lin8,
            256 => Shape::Lin16,
            _ => Shape::Lin32,
        }
    }
}

/// A tagged slot word: low 3 bits are the shape, the upper bits the
/// arena block reference. The all-zero word means "absent". A slot
/// position that the descent logic knows is terminal holds the caller's
/// value cell instead, which is why absent and zero-valued coincide.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Slot(u64);

impl Slot {
    pub fn new(base: u64, shape: Shape) -> Slot {
        debug_assert!(base != 0, "A live block reference is never zero.");
        debug_assert!(base & 7 == 0, "Block references are word-aligned.");
        Slot(base | shape.tag())
    }

    pub fn from_word(word: u64) -> Slot {
        Slot(word)
    }

    pub fn word(self) -> u64 {
        self.0
    }

    pub fn shape(self) -> Shape {
        Shape::from_tag(self.0)
    }

    /// The referenced block's base, as a global arena byte offset.
    pub fn base(self) -> u64 {
        self.0 & !7
    }
}

#[cfg(test)]
mod test {
    use super::{Shape, Slot};

    #[test]
    fn tag_round_trips() {
        for tag in 0..8 {
            assert_eq!(Shape::from_tag(tag).tag(), tag);
        }
    }

    #[test]
    fn linear_sizes_double() {
        let mut shape = Shape::Lin1;
        while let Some(next) = shape.next_larger() {
            assert_eq!(next.bytes(), 2 * shape.bytes());
            shape = next;
        }
        assert_eq!(shape, Shape::Lin32);
    }

    #[test]
    fn size_classes_match_block_sizes() {
        assert_eq!(Shape::Radix.bytes(), Shape::Radix.size_class().bytes());
        assert_eq!(Shape::Span.bytes(), Shape::Span.size_class().bytes());
    }

    #[test]
    fn slot_packs_base_and_shape() {
        let slot = Slot::new(0x1f0, Shape::Span);
        assert_eq!(slot.base(), 0x1f0);
        assert_eq!(slot.shape(), Shape::Span);
        assert!(slot.word() != 0);
    }
}
