// Warren -- Compact ordered map for byte string and integer keys
// Copyright 2026 The Warren Authors

// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// A copy of the License has been included in the root of the repository.

//! Node layouts over raw arena blocks.
//!
//! A linear node is a block with key fragment columns packed at the
//! front and child slot words addressed from the back: fragment i
//! starts at byte `i * width`, child i is the word at
//! `end - (i + 1) * 8`. The fragment width is however many bytes of
//! the current key word are still unresolved at this depth, so a
//! node's capacity is not fixed by its shape: a 64-byte block holds
//! four entries when fragments are full words, but five when three
//! bytes of the word have already been resolved higher up. Entries are
//! sorted ascending by fragment value; unused entries (child slot
//! zero, fragment zero) sit at the low indices.
//!
//! A radix node is a plain 16-slot table. An outer table discriminates
//! the high nibble of one key byte and points at inner tables, which
//! discriminate the low nibble. For the byte that completes a key, the
//! inner slot holds the value cell itself.
//!
//! A span node holds `SPAN_BYTES` verbatim key bytes followed by one
//! trailing slot. In string mode a span containing a 0x00 byte is a
//! leaf and the trailing slot is the value cell; a span of all nonzero
//! bytes continues the chain. Spans only exist in string mode.

use crate::slot::{SLOT_BYTES, SPAN_BYTES};

/// Entries a linear block can hold at the given fragment width.
#[inline]
pub fn lin_capacity(block_bytes: usize, width: usize) -> usize {
    block_bytes / (SLOT_BYTES + width)
}

/// Byte reference of fragment column `i`.
#[inline]
pub fn lin_frag(base: u64, width: usize, i: usize) -> u64 {
    base + (i * width) as u64
}

/// Word reference of child slot `i`, addressed from the block end.
#[inline]
pub fn lin_child(base: u64, block_bytes: usize, i: usize) -> u64 {
    base + (block_bytes - (i + 1) * SLOT_BYTES) as u64
}

/// Word reference of entry `i` in a radix table.
#[inline]
pub fn radix_entry(base: u64, i: usize) -> u64 {
    base + (i * SLOT_BYTES) as u64
}

/// Word reference of a span node's trailing slot.
#[inline]
pub fn span_slot(base: u64) -> u64 {
    base + SPAN_BYTES as u64
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::slot::Shape;

    #[test]
    fn capacity_grows_as_fragments_narrow() {
        let bytes = Shape::Lin4.bytes();
        assert_eq!(lin_capacity(bytes, 8), 4);
        assert_eq!(lin_capacity(bytes, 5), 4);
        assert_eq!(lin_capacity(bytes, 4), 5);
        assert_eq!(lin_capacity(bytes, 1), 7);
    }

    #[test]
    fn columns_do_not_collide() {
        // At any width, the highest fragment column must end below the
        // lowest child slot.
        for &shape in &[
            Shape::Lin1,
            Shape::Lin2,
            Shape::Lin4,
            Shape::Lin8,
            Shape::Lin16,
            Shape::Lin32,
        ] {
            let bytes = shape.bytes();
            for width in 1..9 {
                let cnt = lin_capacity(bytes, width);
                let frag_end = lin_frag(0, width, cnt - 1) + width as u64;
                let child_low = lin_child(0, bytes, cnt - 1);
                assert!(
                    frag_end <= child_low,
                    "{:?} width {}: fragments overlap slots",
                    shape,
                    width
                );
            }
        }
    }

    #[test]
    fn span_slot_is_word_aligned() {
        assert_eq!(span_slot(0) % 8, 0);
        assert_eq!(span_slot(0) as usize + SLOT_BYTES, Shape::Span.bytes());
    }
}
