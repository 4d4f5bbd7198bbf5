// Warren -- Compact ordered map for byte string and integer keys
// Copyright 2026 The Warren Authors

// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// A copy of the License has been included in the root of the repository.

//! The path stack: one frame per node visited by the most recent
//! descent. The cursor operations (next, prev, delete, key
//! reconstruction) all work off this record instead of re-walking from
//! the root.

use crate::slot::Shape;

/// One level of the most recent descent.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Frame {
    /// Tagged slot word of the node entered at this level.
    pub node: u64,
    /// Key byte offset on entry.
    pub off: u32,
    /// Slot index chosen within the node. -1 means the descent stopped
    /// before the first entry; traversal treats that as "advance into
    /// index 0 next".
    pub slot: i32,
}

const EMPTY: Frame = Frame {
    node: 0,
    off: 0,
    slot: 0,
};

/// A bounded stack of frames. The capacity is sized for the declared
/// maximum key length; radix pairs burn two frames per byte, so a
/// degenerate all-radix descent can want more. Pushing past capacity
/// overwrites the deepest frame instead of failing, which keeps the
/// structure valid at the cost of cursor precision on such inputs.
#[derive(Clone)]
pub struct PathStack {
    frames: Vec<Frame>,
    level: usize,
}

impl PathStack {
    pub fn new(max_key_bytes: usize) -> PathStack {
        PathStack {
            frames: vec![EMPTY; max_key_bytes + 1],
            level: 0,
        }
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn clear(&mut self) {
        self.level = 0;
    }

    pub fn push(&mut self, frame: Frame) {
        let cap = self.frames.len();
        if self.level < cap {
            self.frames[self.level] = frame;
            self.level += 1;
        } else {
            self.frames[cap - 1] = frame;
        }
    }

    pub fn pop(&mut self) {
        debug_assert!(self.level > 0);
        self.level -= 1;
    }

    pub fn frame(&self, level: usize) -> Frame {
        self.frames[level]
    }

    pub fn frame_mut(&mut self, level: usize) -> &mut Frame {
        &mut self.frames[level]
    }

    /// Whether the frame at `level` is the inner half of a radix pair.
    /// The two halves are consecutive and enter at the same key byte
    /// offset; no other consecutive radix frames can share an offset,
    /// because a radix pair always consumes its byte.
    pub fn is_radix_inner(&self, level: usize) -> bool {
        if level == 0 {
            return false;
        }
        let this = self.frames[level];
        let prev = self.frames[level - 1];
        Shape::from_tag(this.node) == Shape::Radix
            && Shape::from_tag(prev.node) == Shape::Radix
            && this.off == prev.off
    }
}

#[cfg(test)]
mod test {
    use super::{Frame, PathStack};
    use crate::slot::{Shape, Slot};

    fn frame(node: u64, off: u32, slot: i32) -> Frame {
        Frame { node, off, slot }
    }

    #[test]
    fn push_clamps_at_capacity() {
        let mut path = PathStack::new(2);
        for i in 0..5 {
            path.push(frame(8, i, 0));
        }
        // Capacity is max + 1 = 3; the deepest frame keeps getting
        // replaced once the stack is full.
        assert_eq!(path.level(), 3);
        assert_eq!(path.frame(2).off, 4);
    }

    #[test]
    fn radix_pairing_by_equal_offset() {
        let outer = Slot::new(0x100, Shape::Radix).word();
        let inner = Slot::new(0x180, Shape::Radix).word();
        let lin = Slot::new(0x200, Shape::Lin1).word();

        let mut path = PathStack::new(8);
        path.push(frame(outer, 0, 3));
        path.push(frame(inner, 0, 7));
        path.push(frame(lin, 1, 0));
        // A second radix pair one byte deeper.
        path.push(frame(outer, 9, 1));
        path.push(frame(inner, 9, 2));

        assert!(!path.is_radix_inner(0));
        assert!(path.is_radix_inner(1));
        assert!(!path.is_radix_inner(2));
        assert!(!path.is_radix_inner(3));
        assert!(path.is_radix_inner(4));
    }
}
