// Warren -- Compact ordered map for byte string and integer keys
// Copyright 2026 The Warren Authors

// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// A copy of the License has been included in the root of the repository.

//! The trie engine: descent, node growth, ordered traversal, delete.

use crate::arena::Arena;
use crate::node::{lin_capacity, lin_child, lin_frag, radix_entry, span_slot};
use crate::path::{Frame, PathStack};
use crate::slot::{Shape, Slot, KEY_WORD, SPAN_BYTES};
use crate::Result;

/// A value cell: one machine word owned by the caller. The address is
/// stable for the lifetime of the key, so two lookups of the same key
/// return the same reference. A cell left at zero counts as absent.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CellRef(u64);

/// A caller payload allocation inside the map's segments. Converts to
/// a nonzero word so it can be stored in a cell.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DataRef(u64);

impl DataRef {
    pub fn to_word(self) -> u64 {
        self.0
    }

    pub fn from_word(word: u64) -> DataRef {
        DataRef(word)
    }
}

/// An ordered map from byte string or fixed-width integer keys to one
/// machine word per key.
///
/// The map is a trie over key bytes. Interior nodes come in six
/// shapes — sorted linear nodes of four sizes of fragment count, radix
/// nibble-pair tables, and spans of verbatim key bytes — and an insert
/// promotes or splits nodes so the shape tracks the local population.
/// Lookups, ordered traversal and key reconstruction are all linear in
/// the key length.
///
/// The map keeps a cursor: the path of the most recent operation.
/// `nxt`, `prv`, `key` and `del` act on that cursor, so interleaving
/// unrelated lookups with a traversal moves it. Clone the map to keep
/// an independent cursor; a clone is a full copy and may be mutated
/// freely.
///
/// String mode (`depth == 0`) orders keys byte-lexicographically and
/// terminates them with an implicit 0x00, so keys must not contain a
/// zero byte. Integer mode (`depth > 0`) takes keys of exactly
/// `depth` big-endian words and orders them numerically.
#[derive(Clone)]
pub struct Warren {
    arena: Arena,
    root: u64,
    path: PathStack,
    /// Maximum key bytes tracked internally: the declared maximum plus
    /// the terminator in string mode, `depth * 8` in integer mode.
    max: usize,
    /// Words per key; zero selects string mode.
    depth: usize,
}

#[inline]
fn byte_at(key: &[u8], i: usize) -> u8 {
    if i < key.len() {
        key[i]
    } else {
        0
    }
}

/// Pack `width` key bytes starting at `off` into a right-aligned
/// big-endian integer, zero padded past the end of the key.
#[inline]
fn pack(key: &[u8], off: usize, width: usize) -> u64 {
    let mut value = 0;
    for i in 0..width {
        value = value << 8 | byte_at(key, off + i) as u64;
    }
    value
}

impl Warren {
    /// Create an empty map. `max` is the longest key, in bytes, the
    /// map will ever be given; `depth == 0` selects string mode, and a
    /// nonzero `depth` selects integer mode with keys of exactly
    /// `depth` words (`max` is then ignored).
    pub fn open(max: usize, depth: usize) -> Warren {
        let max_bytes = if depth > 0 { depth * KEY_WORD } else { max + 1 };
        Warren {
            arena: Arena::new(),
            root: 0,
            path: PathStack::new(max_bytes),
            max: max_bytes,
            depth,
        }
    }

    pub fn get(&self, cell: CellRef) -> u64 {
        self.arena.word(cell.0)
    }

    /// Store the caller's value. The value must be nonzero for the key
    /// to count as present; storing zero makes the key invisible to
    /// lookups and traversal again.
    pub fn set(&mut self, cell: CellRef, value: u64) {
        self.arena.set_word(cell.0, value);
    }

    /// Bump-allocate caller payload inside the map's segments. Payload
    /// is released only when the map is dropped.
    pub fn data(&mut self, len: usize) -> Result<DataRef> {
        self.arena.data(len).map(DataRef)
    }

    pub fn read_data(&self, data: DataRef, buf: &mut [u8]) {
        self.arena.read_data(data.0, buf)
    }

    pub fn write_data(&mut self, data: DataRef, bytes: &[u8]) {
        self.arena.write_data(data.0, bytes)
    }

    fn check_key(&self, key: &[u8]) {
        if self.depth > 0 {
            assert!(
                key.len() == self.max,
                "Integer mode takes exactly depth * 8 key bytes."
            );
        } else {
            assert!(
                key.len() < self.max,
                "Key exceeds the maximum declared at open()."
            );
            debug_assert!(
                !key.contains(&0),
                "String keys must not contain the 0x00 terminator."
            );
        }
    }

    /// String mode: the byte that completes a key is its terminator.
    /// Integer mode: the key completes when all words are consumed.
    #[inline]
    fn terminal_byte(&self, b: u8, off: usize) -> bool {
        if self.depth == 0 {
            b == 0
        } else {
            off + 1 == self.max
        }
    }

    /// Leaf test for a linear fragment that ends at `off_after`.
    #[inline]
    fn is_leaf_value(&self, value: u64, off_after: usize) -> bool {
        if self.depth == 0 {
            value & 0xff == 0
        } else {
            off_after == self.max
        }
    }

    /// Whether a span contains a terminator and is therefore a leaf.
    /// A span of all nonzero bytes continues the chain.
    fn span_is_leaf(&self, base: u64) -> bool {
        if self.depth != 0 {
            return false;
        }
        (0..SPAN_BYTES).any(|i| self.arena.byte(base + i as u64) == 0)
    }

    /// The slot a descent came through: the root, or a word in a node.
    #[inline]
    fn load_slot(&self, loc: Option<u64>) -> u64 {
        match loc {
            None => self.root,
            Some(r) => self.arena.word(r),
        }
    }

    #[inline]
    fn store_slot(&mut self, loc: Option<u64>, word: u64) {
        match loc {
            None => self.root = word,
            Some(r) => self.arena.set_word(r, word),
        }
    }

    /// Reverse scan for the highest index whose fragment is at most
    /// `value`. Returns -1 when every fragment is greater. Unused
    /// entries carry a zero fragment, so a non-full node always stops
    /// the scan.
    fn lin_scan(&self, base: u64, ks: usize, cnt: usize, value: u64) -> (i32, u64) {
        let mut p = cnt as i32;
        let mut frag = 0;
        loop {
            p -= 1;
            if p < 0 {
                break;
            }
            frag = self.arena.read_frag(lin_frag(base, ks, p as usize), ks);
            if frag <= value {
                break;
            }
        }
        (p, frag)
    }

    /// Exact lookup. Returns the key's cell if the key is present with
    /// a nonzero value. Leaves the cursor on the boundary position, so
    /// a following `nxt` yields the lowest key greater than `key`.
    pub fn slot(&mut self, key: &[u8]) -> Option<CellRef> {
        self.check_key(key);
        self.path.clear();
        let mut next = self.root;
        let mut off = 0;

        while next != 0 {
            let slot = Slot::from_word(next);
            let base = slot.base();
            match slot.shape() {
                Shape::Radix => {
                    let b = byte_at(key, off);
                    let onib = (b >> 4) as usize;
                    let inib = (b & 15) as usize;
                    self.path.push(Frame {
                        node: next,
                        off: off as u32,
                        slot: onib as i32,
                    });
                    let ow = self.arena.word(radix_entry(base, onib));
                    if ow == 0 {
                        return None;
                    }
                    let inner = Slot::from_word(ow).base();
                    self.path.push(Frame {
                        node: ow,
                        off: off as u32,
                        slot: inib as i32,
                    });
                    let iref = radix_entry(inner, inib);
                    if self.terminal_byte(b, off) {
                        return self.live_cell(iref);
                    }
                    next = self.arena.word(iref);
                    off += 1;
                }
                Shape::Span => {
                    let mut frame = Frame {
                        node: next,
                        off: off as u32,
                        slot: 0,
                    };
                    for i in 0..SPAN_BYTES {
                        let sb = self.arena.byte(base + i as u64);
                        let kb = byte_at(key, off + i);
                        if sb != kb {
                            // Record which side of the probe the span
                            // falls on, for start_at resumption.
                            frame.slot = if sb > kb { -1 } else { 1 };
                            self.path.push(frame);
                            return None;
                        }
                        if sb == 0 && self.depth == 0 {
                            self.path.push(frame);
                            return self.live_cell(span_slot(base));
                        }
                    }
                    self.path.push(frame);
                    next = self.arena.word(span_slot(base));
                    off += SPAN_BYTES;
                }
                shape => {
                    let ks = KEY_WORD - (off & 7);
                    let bytes = shape.bytes();
                    let cnt = lin_capacity(bytes, ks);
                    let value = pack(key, off, ks);
                    let (p, frag) = self.lin_scan(base, ks, cnt, value);
                    self.path.push(Frame {
                        node: next,
                        off: off as u32,
                        slot: p,
                    });
                    if p < 0 || frag != value {
                        return None;
                    }
                    let cref = lin_child(base, bytes, p as usize);
                    if self.is_leaf_value(value, off + ks) {
                        return self.live_cell(cref);
                    }
                    next = self.arena.word(cref);
                    off += ks;
                }
            }
        }
        None
    }

    fn live_cell(&self, cref: u64) -> Option<CellRef> {
        if self.arena.word(cref) != 0 {
            Some(CellRef(cref))
        } else {
            None
        }
    }

    /// Insert-or-locate. Returns the key's cell, creating the key with
    /// a zeroed cell if it was absent; the caller must store a nonzero
    /// value for the key to become visible. Repeated calls for the
    /// same key return the same cell and change nothing.
    ///
    /// On out-of-memory the map is left exactly as it was: every
    /// growth step allocates its new blocks before installing any of
    /// them or freeing the old ones.
    pub fn cell(&mut self, key: &[u8]) -> Result<CellRef> {
        self.check_key(key);
        self.path.clear();
        let mut parent: Option<u64> = None;
        let mut off = 0;

        loop {
            let next = self.load_slot(parent);
            if next == 0 {
                return self.extend(parent, key, off);
            }
            let slot = Slot::from_word(next);
            let base = slot.base();
            match slot.shape() {
                Shape::Radix => {
                    let b = byte_at(key, off);
                    let onib = (b >> 4) as usize;
                    let inib = (b & 15) as usize;
                    self.path.push(Frame {
                        node: next,
                        off: off as u32,
                        slot: onib as i32,
                    });
                    let oref = radix_entry(base, onib);
                    let mut ow = self.arena.word(oref);
                    if ow == 0 {
                        let inner = self.arena.alloc(Shape::Radix)?;
                        ow = Slot::new(inner, Shape::Radix).word();
                        self.arena.set_word(oref, ow);
                    }
                    let inner = Slot::from_word(ow).base();
                    self.path.push(Frame {
                        node: ow,
                        off: off as u32,
                        slot: inib as i32,
                    });
                    let iref = radix_entry(inner, inib);
                    if self.terminal_byte(b, off) {
                        return Ok(CellRef(iref));
                    }
                    parent = Some(iref);
                    off += 1;
                }
                Shape::Span => {
                    let mut matched = true;
                    for i in 0..SPAN_BYTES {
                        let sb = self.arena.byte(base + i as u64);
                        let kb = byte_at(key, off + i);
                        if sb != kb {
                            matched = false;
                            break;
                        }
                        if sb == 0 && self.depth == 0 {
                            self.path.push(Frame {
                                node: next,
                                off: off as u32,
                                slot: 0,
                            });
                            return Ok(CellRef(span_slot(base)));
                        }
                    }
                    if matched {
                        self.path.push(Frame {
                            node: next,
                            off: off as u32,
                            slot: 0,
                        });
                        parent = Some(span_slot(base));
                        off += SPAN_BYTES;
                    } else {
                        // Unzip the span into per-word linear nodes,
                        // then retry this level against them.
                        self.split_span(parent, base)?;
                    }
                }
                shape => {
                    let ks = KEY_WORD - (off & 7);
                    let bytes = shape.bytes();
                    let cnt = lin_capacity(bytes, ks);
                    let value = pack(key, off, ks);
                    let (p, frag) = self.lin_scan(base, ks, cnt, value);
                    self.path.push(Frame {
                        node: next,
                        off: off as u32,
                        slot: p,
                    });

                    if p >= 0 && frag == value {
                        let cref = lin_child(base, bytes, p as usize);
                        if self.is_leaf_value(value, off + ks) {
                            return Ok(CellRef(cref));
                        }
                        parent = Some(cref);
                        off += ks;
                        continue;
                    }

                    if self.arena.word(lin_child(base, bytes, 0)) == 0 {
                        // Room left: shift the smaller entries down one
                        // index and splice the fragment in sorted
                        // position.
                        debug_assert!(p >= 0, "A non-full node stops the scan.");
                        let d = p as usize;
                        self.arena
                            .move_bytes(lin_frag(base, ks, 0), lin_frag(base, ks, 1), d * ks);
                        if d > 0 {
                            self.arena.move_bytes(
                                lin_child(base, bytes, d - 1),
                                lin_child(base, bytes, d),
                                d * 8,
                            );
                        }
                        self.arena.write_frag(lin_frag(base, ks, d), ks, value);
                        let cref = lin_child(base, bytes, d);
                        self.arena.set_word(cref, 0);
                        if self.is_leaf_value(value, off + ks) {
                            return Ok(CellRef(cref));
                        }
                        parent = Some(cref);
                        off += ks;
                        continue;
                    }

                    if let Some(bigger) = shape.next_larger() {
                        let (nbase, di) = self.promote_linear(base, shape, bigger, ks, value, p)?;
                        let word = Slot::new(nbase, bigger).word();
                        self.store_slot(parent, word);
                        self.arena.free(shape, base);
                        let frame = self.path.frame_mut(self.path.level() - 1);
                        frame.node = word;
                        frame.slot = di as i32;
                        let cref = lin_child(nbase, bigger.bytes(), di);
                        if self.is_leaf_value(value, off + ks) {
                            return Ok(CellRef(cref));
                        }
                        parent = Some(cref);
                        off += ks;
                    } else {
                        // The largest linear shape is full: split it
                        // into a radix pair keyed on the leading
                        // fragment byte, then retry this level.
                        self.split_linear(parent, base, ks)?;
                        self.path.pop();
                    }
                }
            }
        }
    }

    /// Copy a full linear node into the next larger shape, splicing
    /// `value` in after index `p`. One coordinated pass over fragment
    /// bytes and child slots. Returns the new base and splice index.
    fn promote_linear(
        &mut self,
        base: u64,
        shape: Shape,
        bigger: Shape,
        ks: usize,
        value: u64,
        p: i32,
    ) -> Result<(u64, usize)> {
        let nbase = self.arena.alloc(bigger)?;
        let obytes = shape.bytes();
        let nbytes = bigger.bytes();
        let cnt = lin_capacity(obytes, ks);
        let ncnt = lin_capacity(nbytes, ks);
        let spare = ncnt - cnt - 1;
        let low = (p + 1) as usize;
        let high = cnt - low;
        let di = spare + low;

        self.arena.move_bytes(
            lin_frag(nbase, ks, spare),
            lin_frag(base, ks, 0),
            low * ks,
        );
        self.arena.write_frag(lin_frag(nbase, ks, di), ks, value);
        self.arena.move_bytes(
            lin_frag(nbase, ks, di + 1),
            lin_frag(base, ks, low),
            high * ks,
        );
        if low > 0 {
            self.arena.move_bytes(
                lin_child(nbase, nbytes, spare + low - 1),
                lin_child(base, obytes, low - 1),
                low * 8,
            );
        }
        if high > 0 {
            self.arena.move_bytes(
                lin_child(nbase, nbytes, di + high),
                lin_child(base, obytes, cnt - 1),
                high * 8,
            );
        }
        Ok((nbase, di))
    }

    fn unwind(&mut self, built: &[(Shape, u64)]) {
        for &(shape, base) in built {
            self.arena.free(shape, base);
        }
    }

    /// Split a full largest-shape linear node into a radix pair.
    /// Entries are grouped by leading fragment byte; each group
    /// becomes a linear node of one-byte-shorter fragments under the
    /// byte's nibble pair, or goes directly into the inner slot when
    /// the fragments are single bytes. The whole replacement subtree
    /// is built before the old node is unlinked.
    fn split_linear(&mut self, parent: Option<u64>, base: u64, ks: usize) -> Result<()> {
        let bytes = Shape::Lin32.bytes();
        let cnt = lin_capacity(bytes, ks);
        let mut built: Vec<(Shape, u64)> = Vec::new();

        let outer = self.arena.alloc(Shape::Radix)?;
        built.push((Shape::Radix, outer));

        let mut i = 0;
        while i < cnt {
            if self.arena.word(lin_child(base, bytes, i)) == 0 {
                i += 1;
                continue;
            }
            let frag = self.arena.read_frag(lin_frag(base, ks, i), ks);
            let lead = (frag >> (8 * (ks - 1))) as u8;
            let mut j = i + 1;
            while j < cnt {
                let f2 = self.arena.read_frag(lin_frag(base, ks, j), ks);
                if (f2 >> (8 * (ks - 1))) as u8 != lead {
                    break;
                }
                j += 1;
            }
            let run = j - i;

            let entry_word = if ks == 1 {
                // Single-byte fragments have no tail; the child hangs
                // directly off the radix pair.
                debug_assert_eq!(run, 1);
                self.arena.word(lin_child(base, bytes, i))
            } else {
                let ks2 = ks - 1;
                let mut sh = Shape::Lin1;
                while lin_capacity(sh.bytes(), ks2) < run {
                    sh = sh.next_larger().unwrap();
                }
                let nb = match self.arena.alloc(sh) {
                    Ok(b) => b,
                    Err(e) => {
                        self.unwind(&built);
                        return Err(e);
                    }
                };
                built.push((sh, nb));
                let spare = lin_capacity(sh.bytes(), ks2) - run;
                let mask = (1u64 << (8 * ks2)) - 1;
                for r in 0..run {
                    let f2 = self.arena.read_frag(lin_frag(base, ks, i + r), ks);
                    self.arena
                        .write_frag(lin_frag(nb, ks2, spare + r), ks2, f2 & mask);
                    let child = self.arena.word(lin_child(base, bytes, i + r));
                    self.arena
                        .set_word(lin_child(nb, sh.bytes(), spare + r), child);
                }
                Slot::new(nb, sh).word()
            };

            let oref = radix_entry(outer, (lead >> 4) as usize);
            let mut ow = self.arena.word(oref);
            if ow == 0 {
                let inner = match self.arena.alloc(Shape::Radix) {
                    Ok(b) => b,
                    Err(e) => {
                        self.unwind(&built);
                        return Err(e);
                    }
                };
                built.push((Shape::Radix, inner));
                ow = Slot::new(inner, Shape::Radix).word();
                self.arena.set_word(oref, ow);
            }
            let inner = Slot::from_word(ow).base();
            self.arena
                .set_word(radix_entry(inner, (lead & 15) as usize), entry_word);
            i = j;
        }

        self.store_slot(parent, Slot::new(outer, Shape::Radix).word());
        self.arena.free(Shape::Lin32, base);
        Ok(())
    }

    /// Unzip a span into a chain of single-entry linear nodes, one per
    /// key word, ending at the span's former trailing slot. The chain
    /// is built complete before the span is unlinked.
    fn split_span(&mut self, parent: Option<u64>, base: u64) -> Result<()> {
        debug_assert_eq!(self.depth, 0, "Spans only exist in string mode.");
        let old_child = self.arena.word(span_slot(base));
        let mut built: Vec<(Shape, u64)> = Vec::new();

        for w in 0..SPAN_BYTES / KEY_WORD {
            let frag = self.arena.read_frag(base + (w * KEY_WORD) as u64, KEY_WORD);
            let nb = match self.arena.alloc(Shape::Lin1) {
                Ok(b) => b,
                Err(e) => {
                    self.unwind(&built);
                    return Err(e);
                }
            };
            self.arena.write_frag(lin_frag(nb, KEY_WORD, 0), KEY_WORD, frag);
            built.push((Shape::Lin1, nb));
            if frag & 0xff == 0 {
                // The terminator is inside this word; the rest of the
                // span is padding.
                break;
            }
        }

        for k in 0..built.len() {
            let cref = lin_child(built[k].1, Shape::Lin1.bytes(), 0);
            let down = if k + 1 < built.len() {
                Slot::new(built[k + 1].1, Shape::Lin1).word()
            } else {
                old_child
            };
            self.arena.set_word(cref, down);
        }

        self.store_slot(parent, Slot::new(built[0].1, Shape::Lin1).word());
        self.arena.free(Shape::Span, base);
        Ok(())
    }

    /// Lay down the unconsumed remainder of a key below an empty slot.
    /// String mode emits a linear-1 fragment to reach a word boundary
    /// when needed, then spans; the final span holds the terminator and
    /// its trailing slot is the cell. Integer mode emits linear-1 nodes
    /// until all words are placed. The chain is linked into the trie
    /// only once it is complete.
    fn extend(&mut self, parent: Option<u64>, key: &[u8], start_off: usize) -> Result<CellRef> {
        let entry_level = self.path.level();
        let mut built: Vec<(Shape, u64)> = Vec::new();
        let mut head = 0;
        let mut pending: Option<u64> = None;
        let mut off = start_off;

        let cell = loop {
            debug_assert!(off < self.max);
            let string = self.depth == 0;
            let aligned = off & 7 == 0;

            let (shape, tagged, down, done) = if string && aligned {
                let nb = match self.arena.alloc(Shape::Span) {
                    Ok(b) => b,
                    Err(e) => {
                        self.unwind(&built);
                        while self.path.level() > entry_level {
                            self.path.pop();
                        }
                        return Err(e);
                    }
                };
                let used = (key.len() + 1 - off).min(SPAN_BYTES);
                for i in 0..used {
                    self.arena.set_byte(nb + i as u64, byte_at(key, off + i));
                }
                let leaf = key.len() + 1 - off <= SPAN_BYTES;
                (
                    Shape::Span,
                    Slot::new(nb, Shape::Span).word(),
                    span_slot(nb),
                    leaf,
                )
            } else {
                let ks = KEY_WORD - (off & 7);
                let nb = match self.arena.alloc(Shape::Lin1) {
                    Ok(b) => b,
                    Err(e) => {
                        self.unwind(&built);
                        while self.path.level() > entry_level {
                            self.path.pop();
                        }
                        return Err(e);
                    }
                };
                let value = pack(key, off, ks);
                self.arena.write_frag(lin_frag(nb, ks, 0), ks, value);
                let leaf = self.is_leaf_value(value, off + ks);
                (
                    Shape::Lin1,
                    Slot::new(nb, Shape::Lin1).word(),
                    lin_child(nb, Shape::Lin1.bytes(), 0),
                    leaf,
                )
            };

            built.push((shape, Slot::from_word(tagged).base()));
            match pending {
                None => head = tagged,
                Some(p) => self.arena.set_word(p, tagged),
            }
            self.path.push(Frame {
                node: tagged,
                off: off as u32,
                slot: 0,
            });
            if done {
                break down;
            }
            pending = Some(down);
            off += if shape == Shape::Span {
                SPAN_BYTES
            } else {
                KEY_WORD - (off & 7)
            };
        };

        self.store_slot(parent, head);
        Ok(CellRef(cell))
    }

    /// Lowest key at or above `key`: an exact hit, or the cursor
    /// advanced off the lookup's boundary position.
    pub fn start_at(&mut self, key: &[u8]) -> Option<CellRef> {
        match self.slot(key) {
            Some(cell) => Some(cell),
            None => self.nxt(),
        }
    }

    /// Position the cursor on the lowest key.
    pub fn first(&mut self) -> Option<CellRef> {
        self.path.clear();
        if self.root == 0 {
            return None;
        }
        self.first_from(self.root, 0)
    }

    /// Position the cursor on the highest key.
    pub fn end(&mut self) -> Option<CellRef> {
        self.path.clear();
        if self.root == 0 {
            return None;
        }
        self.last_from(self.root, 0)
    }

    /// Descend to the minimum of the subtree at `next`, recording
    /// frames as the descent goes.
    fn first_from(&mut self, mut next: u64, mut off: usize) -> Option<CellRef> {
        while next != 0 {
            let slot = Slot::from_word(next);
            let base = slot.base();
            match slot.shape() {
                Shape::Radix => {
                    let mut found = None;
                    'outer: for onib in 0..16 {
                        let ow = self.arena.word(radix_entry(base, onib));
                        if ow == 0 {
                            continue;
                        }
                        let inner = Slot::from_word(ow).base();
                        for inib in 0..16 {
                            if self.arena.word(radix_entry(inner, inib)) != 0 {
                                found = Some((onib, inib, ow));
                                break 'outer;
                            }
                        }
                    }
                    let (onib, inib, ow) = found?;
                    self.path.push(Frame {
                        node: next,
                        off: off as u32,
                        slot: onib as i32,
                    });
                    self.path.push(Frame {
                        node: ow,
                        off: off as u32,
                        slot: inib as i32,
                    });
                    let iref = radix_entry(Slot::from_word(ow).base(), inib);
                    let b = ((onib << 4) | inib) as u8;
                    if self.terminal_byte(b, off) {
                        return Some(CellRef(iref));
                    }
                    next = self.arena.word(iref);
                    off += 1;
                }
                Shape::Span => {
                    self.path.push(Frame {
                        node: next,
                        off: off as u32,
                        slot: 0,
                    });
                    if self.span_is_leaf(base) {
                        // A leaf whose cell was never written holds no
                        // live key.
                        return self.live_cell(span_slot(base));
                    }
                    next = self.arena.word(span_slot(base));
                    off += SPAN_BYTES;
                }
                shape => {
                    let ks = KEY_WORD - (off & 7);
                    let bytes = shape.bytes();
                    let cnt = lin_capacity(bytes, ks);
                    let mut found = None;
                    for i in 0..cnt {
                        let child = self.arena.word(lin_child(base, bytes, i));
                        if child != 0 {
                            found = Some((i, child));
                            break;
                        }
                    }
                    let (i, child) = found?;
                    self.path.push(Frame {
                        node: next,
                        off: off as u32,
                        slot: i as i32,
                    });
                    let frag = self.arena.read_frag(lin_frag(base, ks, i), ks);
                    if self.is_leaf_value(frag, off + ks) {
                        return Some(CellRef(lin_child(base, bytes, i)));
                    }
                    next = child;
                    off += ks;
                }
            }
        }
        None
    }

    /// Mirror of `first_from`: descend to the subtree maximum.
    fn last_from(&mut self, mut next: u64, mut off: usize) -> Option<CellRef> {
        while next != 0 {
            let slot = Slot::from_word(next);
            let base = slot.base();
            match slot.shape() {
                Shape::Radix => {
                    let mut found = None;
                    'outer: for onib in (0..16).rev() {
                        let ow = self.arena.word(radix_entry(base, onib));
                        if ow == 0 {
                            continue;
                        }
                        let inner = Slot::from_word(ow).base();
                        for inib in (0..16).rev() {
                            if self.arena.word(radix_entry(inner, inib)) != 0 {
                                found = Some((onib, inib, ow));
                                break 'outer;
                            }
                        }
                    }
                    let (onib, inib, ow) = found?;
                    self.path.push(Frame {
                        node: next,
                        off: off as u32,
                        slot: onib as i32,
                    });
                    self.path.push(Frame {
                        node: ow,
                        off: off as u32,
                        slot: inib as i32,
                    });
                    let iref = radix_entry(Slot::from_word(ow).base(), inib);
                    let b = ((onib << 4) | inib) as u8;
                    if self.terminal_byte(b, off) {
                        return Some(CellRef(iref));
                    }
                    next = self.arena.word(iref);
                    off += 1;
                }
                Shape::Span => {
                    self.path.push(Frame {
                        node: next,
                        off: off as u32,
                        slot: 0,
                    });
                    if self.span_is_leaf(base) {
                        return self.live_cell(span_slot(base));
                    }
                    next = self.arena.word(span_slot(base));
                    off += SPAN_BYTES;
                }
                shape => {
                    let ks = KEY_WORD - (off & 7);
                    let bytes = shape.bytes();
                    let cnt = lin_capacity(bytes, ks);
                    let mut found = None;
                    for i in (0..cnt).rev() {
                        let child = self.arena.word(lin_child(base, bytes, i));
                        if child != 0 {
                            found = Some((i, child));
                            break;
                        }
                    }
                    let (i, child) = found?;
                    self.path.push(Frame {
                        node: next,
                        off: off as u32,
                        slot: i as i32,
                    });
                    let frag = self.arena.read_frag(lin_frag(base, ks, i), ks);
                    if self.is_leaf_value(frag, off + ks) {
                        return Some(CellRef(lin_child(base, bytes, i)));
                    }
                    next = child;
                    off += ks;
                }
            }
        }
        None
    }

    /// Advance the cursor to the next key in order. Pops to the
    /// deepest level with a following sibling, then takes the minimum
    /// of that sibling's subtree.
    pub fn nxt(&mut self) -> Option<CellRef> {
        while self.path.level() > 0 {
            let lvl = self.path.level() - 1;
            let f = self.path.frame(lvl);
            let slot = Slot::from_word(f.node);
            let base = slot.base();
            let off = f.off as usize;
            match slot.shape() {
                Shape::Radix => {
                    if self.path.is_radix_inner(lvl) {
                        let onib = self.path.frame(lvl - 1).slot as usize;
                        let mut inib = f.slot + 1;
                        while inib < 16 {
                            let iref = radix_entry(base, inib as usize);
                            let iw = self.arena.word(iref);
                            if iw != 0 {
                                self.path.frame_mut(lvl).slot = inib;
                                let b = ((onib << 4) | inib as usize) as u8;
                                if self.terminal_byte(b, off) {
                                    return Some(CellRef(iref));
                                }
                                return self.first_from(iw, off + 1);
                            }
                            inib += 1;
                        }
                        self.path.pop();
                    } else {
                        let mut onib = f.slot + 1;
                        while onib < 16 {
                            let ow = self.arena.word(radix_entry(base, onib as usize));
                            if ow != 0 {
                                let inner = Slot::from_word(ow).base();
                                for inib in 0..16 {
                                    let iref = radix_entry(inner, inib);
                                    let iw = self.arena.word(iref);
                                    if iw == 0 {
                                        continue;
                                    }
                                    self.path.frame_mut(lvl).slot = onib;
                                    self.path.push(Frame {
                                        node: ow,
                                        off: f.off,
                                        slot: inib as i32,
                                    });
                                    let b = (((onib as usize) << 4) | inib) as u8;
                                    if self.terminal_byte(b, off) {
                                        return Some(CellRef(iref));
                                    }
                                    return self.first_from(iw, off + 1);
                                }
                            }
                            onib += 1;
                        }
                        self.path.pop();
                    }
                }
                Shape::Span => {
                    if f.slot < 0 {
                        self.path.frame_mut(lvl).slot = 0;
                        if self.span_is_leaf(base) {
                            match self.live_cell(span_slot(base)) {
                                Some(cell) => return Some(cell),
                                None => continue,
                            }
                        }
                        return self.first_from(self.arena.word(span_slot(base)), off + SPAN_BYTES);
                    }
                    self.path.pop();
                }
                shape => {
                    let ks = KEY_WORD - (off & 7);
                    let bytes = shape.bytes();
                    let cnt = lin_capacity(bytes, ks);
                    let mut i = f.slot + 1;
                    while (i as usize) < cnt {
                        let cref = lin_child(base, bytes, i as usize);
                        let child = self.arena.word(cref);
                        if child != 0 {
                            self.path.frame_mut(lvl).slot = i;
                            let frag = self.arena.read_frag(lin_frag(base, ks, i as usize), ks);
                            if self.is_leaf_value(frag, off + ks) {
                                return Some(CellRef(cref));
                            }
                            return self.first_from(child, off + ks);
                        }
                        i += 1;
                    }
                    self.path.pop();
                }
            }
        }
        None
    }

    /// Retreat the cursor to the previous key in order.
    pub fn prv(&mut self) -> Option<CellRef> {
        while self.path.level() > 0 {
            let lvl = self.path.level() - 1;
            let f = self.path.frame(lvl);
            let slot = Slot::from_word(f.node);
            let base = slot.base();
            let off = f.off as usize;
            match slot.shape() {
                Shape::Radix => {
                    if self.path.is_radix_inner(lvl) {
                        let onib = self.path.frame(lvl - 1).slot as usize;
                        let mut inib = f.slot - 1;
                        while inib >= 0 {
                            let iref = radix_entry(base, inib as usize);
                            let iw = self.arena.word(iref);
                            if iw != 0 {
                                self.path.frame_mut(lvl).slot = inib;
                                let b = ((onib << 4) | inib as usize) as u8;
                                if self.terminal_byte(b, off) {
                                    return Some(CellRef(iref));
                                }
                                return self.last_from(iw, off + 1);
                            }
                            inib -= 1;
                        }
                        self.path.pop();
                    } else {
                        let mut onib = f.slot - 1;
                        while onib >= 0 {
                            let ow = self.arena.word(radix_entry(base, onib as usize));
                            if ow != 0 {
                                let inner = Slot::from_word(ow).base();
                                for inib in (0..16).rev() {
                                    let iref = radix_entry(inner, inib);
                                    let iw = self.arena.word(iref);
                                    if iw == 0 {
                                        continue;
                                    }
                                    self.path.frame_mut(lvl).slot = onib;
                                    self.path.push(Frame {
                                        node: ow,
                                        off: f.off,
                                        slot: inib as i32,
                                    });
                                    let b = (((onib as usize) << 4) | inib) as u8;
                                    if self.terminal_byte(b, off) {
                                        return Some(CellRef(iref));
                                    }
                                    return self.last_from(iw, off + 1);
                                }
                            }
                            onib -= 1;
                        }
                        self.path.pop();
                    }
                }
                Shape::Span => {
                    if f.slot > 0 {
                        self.path.frame_mut(lvl).slot = 0;
                        if self.span_is_leaf(base) {
                            match self.live_cell(span_slot(base)) {
                                Some(cell) => return Some(cell),
                                None => continue,
                            }
                        }
                        return self.last_from(self.arena.word(span_slot(base)), off + SPAN_BYTES);
                    }
                    self.path.pop();
                }
                shape => {
                    let ks = KEY_WORD - (off & 7);
                    let bytes = shape.bytes();
                    let mut i = f.slot - 1;
                    while i >= 0 {
                        let cref = lin_child(base, bytes, i as usize);
                        let child = self.arena.word(cref);
                        if child != 0 {
                            self.path.frame_mut(lvl).slot = i;
                            let frag = self.arena.read_frag(lin_frag(base, ks, i as usize), ks);
                            if self.is_leaf_value(frag, off + ks) {
                                return Some(CellRef(cref));
                            }
                            return self.last_from(child, off + ks);
                        }
                        i -= 1;
                    }
                    self.path.pop();
                }
            }
        }
        None
    }

    /// Reconstruct the cursor's current key into `buf`. Returns the
    /// key length in bytes; bytes past the buffer are counted but not
    /// written. With no current position the length is zero. Integer
    /// mode reconstructs all `depth * 8` big-endian bytes.
    pub fn key(&self, buf: &mut [u8]) -> usize {
        let mut n = 0;
        let mut put = |b: u8, n: &mut usize| {
            if *n < buf.len() {
                buf[*n] = b;
            }
            *n += 1;
        };

        for lvl in 0..self.path.level() {
            let f = self.path.frame(lvl);
            if f.slot < 0 {
                break;
            }
            let slot = Slot::from_word(f.node);
            let base = slot.base();
            let off = f.off as usize;
            match slot.shape() {
                Shape::Radix => {
                    if !self.path.is_radix_inner(lvl) {
                        // The outer nibble is emitted with its inner
                        // partner one level down.
                        continue;
                    }
                    let onib = self.path.frame(lvl - 1).slot as usize;
                    let b = ((onib << 4) | f.slot as usize) as u8;
                    if b == 0 && self.depth == 0 {
                        return n;
                    }
                    put(b, &mut n);
                }
                Shape::Span => {
                    for i in 0..SPAN_BYTES {
                        let b = self.arena.byte(base + i as u64);
                        if b == 0 && self.depth == 0 {
                            return n;
                        }
                        put(b, &mut n);
                    }
                }
                _ => {
                    let ks = KEY_WORD - (off & 7);
                    let frag = self.arena.read_frag(lin_frag(base, ks, f.slot as usize), ks);
                    for i in 0..ks {
                        let b = (frag >> (8 * (ks - 1 - i))) as u8;
                        if b == 0 && self.depth == 0 {
                            return n;
                        }
                        put(b, &mut n);
                    }
                }
            }
        }
        n
    }

    /// Delete the cursor's current key. Compacts the leaf's node,
    /// releases nodes that become empty, and leaves the cursor on the
    /// previous key, whose cell is returned.
    pub fn del(&mut self) -> Option<CellRef> {
        if self.path.level() == 0 {
            return None;
        }
        while self.path.level() > 0 {
            let lvl = self.path.level() - 1;
            let f = self.path.frame(lvl);
            let slot = Slot::from_word(f.node);
            let base = slot.base();
            let off = f.off as usize;
            match slot.shape() {
                Shape::Radix => {
                    // Inner and outer halves of the pair both land
                    // here; each zeroes its own entry and frees its
                    // table when the table empties.
                    debug_assert!(f.slot >= 0);
                    self.arena.set_word(radix_entry(base, f.slot as usize), 0);
                    let live = (0..16).any(|i| self.arena.word(radix_entry(base, i)) != 0);
                    if live {
                        return self.prv();
                    }
                    self.arena.free(Shape::Radix, base);
                    self.path.pop();
                }
                Shape::Span => {
                    self.arena.free(Shape::Span, base);
                    self.path.pop();
                }
                shape => {
                    let ks = KEY_WORD - (off & 7);
                    let bytes = shape.bytes();
                    let cnt = lin_capacity(bytes, ks);
                    debug_assert!(f.slot >= 0);
                    let d = f.slot as usize;
                    // Compact: the entries below the deleted one move
                    // up an index, and index 0 becomes the spare.
                    self.arena
                        .move_bytes(lin_frag(base, ks, 1), lin_frag(base, ks, 0), d * ks);
                    if d > 0 {
                        self.arena.move_bytes(
                            lin_child(base, bytes, d),
                            lin_child(base, bytes, d - 1),
                            d * 8,
                        );
                    }
                    self.arena.zero_bytes(lin_frag(base, ks, 0), ks);
                    self.arena.set_word(lin_child(base, bytes, 0), 0);
                    if self.arena.word(lin_child(base, bytes, cnt - 1)) != 0 {
                        self.path.frame_mut(lvl).slot += 1;
                        return self.prv();
                    }
                    self.arena.free(shape, base);
                    self.path.pop();
                }
            }
        }
        self.root = 0;
        None
    }
}

#[cfg(test)]
mod test {
    use super::{CellRef, Warren};
    use std::collections::BTreeMap;

    use rand_chacha::rand_core::{RngCore, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn insert(map: &mut Warren, key: &[u8], value: u64) -> CellRef {
        let cell = map.cell(key).unwrap();
        map.set(cell, value);
        cell
    }

    /// Walk the map front to back, reconstructing every key.
    fn collect(map: &mut Warren) -> Vec<Vec<u8>> {
        let mut keys = Vec::new();
        let mut cur = map.first();
        while cur.is_some() {
            let mut buf = [0_u8; 80];
            let n = map.key(&mut buf);
            keys.push(buf[..n].to_vec());
            cur = map.nxt();
        }
        keys
    }

    fn int_key(words: &[u64]) -> Vec<u8> {
        let mut key = Vec::with_capacity(words.len() * 8);
        for w in words {
            key.extend_from_slice(&w.to_be_bytes());
        }
        key
    }

    #[test]
    fn three_fruit_iterate_in_order() {
        let mut map = Warren::open(32, 0);
        insert(&mut map, b"apple", 1);
        insert(&mut map, b"apricot", 2);
        insert(&mut map, b"banana", 3);

        let first = map.first().unwrap();
        assert_eq!(map.get(first), 1);
        let mut buf = [0_u8; 32];
        assert_eq!(map.key(&mut buf), 5);
        assert_eq!(&buf[..5], b"apple");

        let second = map.nxt().unwrap();
        assert_eq!(map.get(second), 2);
        let third = map.nxt().unwrap();
        assert_eq!(map.get(third), 3);
        assert_eq!(map.nxt(), None);
    }

    #[test]
    fn thirty_three_keys_split_the_root_into_a_radix() {
        // 32 distinct single-byte keys fill the largest linear node;
        // the 33rd forces the radix split. Order must survive.
        let mut map = Warren::open(32, 0);
        let bytes: Vec<u8> = (0x21..0x21 + 33).collect();
        // Insert in a scrambled order so growth sees splices, not
        // just appends.
        for (i, &b) in bytes.iter().enumerate().rev() {
            insert(&mut map, &[b], i as u64 + 1);
        }
        let keys = collect(&mut map);
        assert_eq!(keys.len(), 33);
        for (i, &b) in bytes.iter().enumerate() {
            assert_eq!(keys[i], vec![b]);
        }
        // Every key still resolves to its cell.
        for (i, &b) in bytes.iter().enumerate() {
            let cell = map.slot(&[b]).unwrap();
            assert_eq!(map.get(cell), i as u64 + 1);
        }
    }

    #[test]
    fn long_keys_span_and_split() {
        let mut map = Warren::open(40, 0);
        let a = b"hello_world_this_is_a_long_key_xxx";
        let b = b"hello_world_this_is_a_long_key_yyy";
        insert(&mut map, a, 10);
        insert(&mut map, b, 20);

        let cell_a = map.slot(a).unwrap();
        assert_eq!(map.get(cell_a), 10);
        let cell_b = map.slot(b).unwrap();
        assert_eq!(map.get(cell_b), 20);
        assert_eq!(collect(&mut map), vec![a.to_vec(), b.to_vec()]);

        // A probe that shares the long prefix but is absent.
        assert_eq!(map.slot(b"hello_world_this_is_a_long_key_yyz"), None);
    }

    #[test]
    fn delete_repositions_to_the_previous_key() {
        let mut map = Warren::open(32, 0);
        insert(&mut map, b"apple", 1);
        insert(&mut map, b"apricot", 2);
        insert(&mut map, b"banana", 3);

        map.slot(b"apricot").unwrap();
        let prev = map.del().unwrap();
        assert_eq!(map.get(prev), 1);

        let mut buf = [0_u8; 32];
        assert_eq!(map.key(&mut buf), 5);
        assert_eq!(&buf[..5], b"apple");

        let third = map.nxt().unwrap();
        assert_eq!(map.get(third), 3);
        assert_eq!(map.slot(b"apricot"), None);
        assert_eq!(collect(&mut map), vec![b"apple".to_vec(), b"banana".to_vec()]);
    }

    #[test]
    fn integer_pairs_iterate_numerically() {
        let mut map = Warren::open(0, 2);
        insert(&mut map, &int_key(&[1, 1]), 11);
        insert(&mut map, &int_key(&[2, 0]), 20);
        insert(&mut map, &int_key(&[1, 2]), 12);

        let keys = collect(&mut map);
        assert_eq!(keys[0], int_key(&[1, 1]));
        assert_eq!(keys[1], int_key(&[1, 2]));
        assert_eq!(keys[2], int_key(&[2, 0]));

        let cell = map.start_at(&int_key(&[1, 5])).unwrap();
        assert_eq!(map.get(cell), 20);
    }

    #[test]
    fn random_integer_churn_matches_a_btree() {
        let mut rng = ChaCha8Rng::seed_from_u64(0x5eed);
        let mut map = Warren::open(0, 2);
        let mut oracle = BTreeMap::new();

        while oracle.len() < 10_000 {
            let key = int_key(&[rng.next_u64(), rng.next_u64()]);
            let value = oracle.len() as u64 + 1;
            if oracle.insert(key.clone(), value).is_none() {
                insert(&mut map, &key, value);
            }
        }

        let keys: Vec<Vec<u8>> = oracle.keys().cloned().collect();
        assert_eq!(collect(&mut map), keys);

        // Delete in a random order; spot-check the full iteration as
        // the population shrinks, and the deleted key every time.
        let mut order: Vec<usize> = (0..keys.len()).collect();
        for i in (1..order.len()).rev() {
            order.swap(i, rng.next_u64() as usize % (i + 1));
        }
        for (step, &i) in order.iter().enumerate() {
            let key = &keys[i];
            map.slot(key).unwrap();
            let prev = map.del();
            let expect_prev = oracle.range::<Vec<u8>, _>(..key.clone()).next_back();
            match (prev, expect_prev) {
                (Some(cell), Some((_, &v))) => assert_eq!(map.get(cell), v),
                (None, None) => {}
                (got, want) => panic!("step {}: prev {:?} vs {:?}", step, got, want.map(|kv| kv.1)),
            }
            oracle.remove(key);
            assert_eq!(map.slot(key), None);
            if step % 1000 == 0 || oracle.len() < 4 {
                let survivors: Vec<Vec<u8>> = oracle.keys().cloned().collect();
                assert_eq!(collect(&mut map), survivors);
            }
        }
        assert_eq!(map.first(), None);
    }

    #[test]
    fn empty_key_is_a_leaf_under_the_root() {
        let mut map = Warren::open(32, 0);
        insert(&mut map, b"", 7);
        insert(&mut map, b"a", 8);

        let first = map.first().unwrap();
        assert_eq!(map.get(first), 7);
        let mut buf = [0_u8; 8];
        assert_eq!(map.key(&mut buf), 0);

        let second = map.nxt().unwrap();
        assert_eq!(map.get(second), 8);
        let cell = map.slot(b"").unwrap();
        assert_eq!(map.get(cell), 7);
    }

    #[test]
    fn cell_is_idempotent_and_stable() {
        let mut map = Warren::open(32, 0);
        let a = map.cell(b"stable").unwrap();
        map.set(a, 42);
        let b = map.cell(b"stable").unwrap();
        assert_eq!(a, b);
        assert_eq!(map.get(b), 42);
        // Lookup observes the same cell.
        assert_eq!(map.slot(b"stable").unwrap(), a);
    }

    #[test]
    fn unwritten_cells_are_invisible() {
        let mut map = Warren::open(32, 0);
        let cell = map.cell(b"ghost").unwrap();
        assert_eq!(map.slot(b"ghost"), None);
        assert_eq!(map.first(), None);
        map.set(cell, 1);
        assert!(map.slot(b"ghost").is_some());
        assert!(map.first().is_some());
    }

    #[test]
    fn shared_prefix_keys_narrow_the_fragments() {
        // All keys agree on the first seven bytes, so the root splits
        // into a radix with a single occupied entry and the branch
        // moves to narrower fragments; a second wave of splits happens
        // below that.
        let mut map = Warren::open(32, 0);
        let mut keys = Vec::new();
        for i in 0..40_u8 {
            let mut key = b"aaaaaaa".to_vec();
            key.push(b'A' + i);
            keys.push(key);
        }
        for (i, key) in keys.iter().enumerate().rev() {
            insert(&mut map, key, i as u64 + 1);
        }
        assert_eq!(collect(&mut map), keys);
        for (i, key) in keys.iter().enumerate() {
            let cell = map.slot(key).unwrap();
            assert_eq!(map.get(cell), i as u64 + 1);
        }
    }

    #[test]
    fn maximum_length_keys_round_trip() {
        let mut map = Warren::open(32, 0);
        let long_a = [b'x'; 32];
        let mut long_b = long_a;
        long_b[31] = b'y';
        insert(&mut map, &long_a, 1);
        insert(&mut map, &long_b, 2);
        assert_eq!(collect(&mut map), vec![long_a.to_vec(), long_b.to_vec()]);
    }

    #[test]
    fn start_at_finds_the_lowest_key_not_below() {
        let mut map = Warren::open(32, 0);
        insert(&mut map, b"apple", 1);
        insert(&mut map, b"banana", 2);

        let cell = map.start_at(b"aaa").unwrap();
        assert_eq!(map.get(cell), 1);
        let cell = map.start_at(b"apple").unwrap();
        assert_eq!(map.get(cell), 1);
        let cell = map.start_at(b"az").unwrap();
        assert_eq!(map.get(cell), 2);
        assert_eq!(map.start_at(b"c"), None);
    }

    #[test]
    fn reverse_traversal_mirrors_forward() {
        let mut map = Warren::open(32, 0);
        let words: Vec<&[u8]> = vec![
            b"ant", b"bee", b"cricket", b"dragonfly", b"earwig", b"firefly",
        ];
        for (i, w) in words.iter().enumerate() {
            insert(&mut map, w, i as u64 + 1);
        }
        let mut got = Vec::new();
        let mut cur = map.end();
        while let Some(cell) = cur {
            got.push(map.get(cell));
            cur = map.prv();
        }
        assert_eq!(got, vec![6, 5, 4, 3, 2, 1]);
    }

    #[test]
    fn delete_of_the_first_key_returns_none() {
        let mut map = Warren::open(32, 0);
        insert(&mut map, b"alpha", 1);
        insert(&mut map, b"beta", 2);
        map.slot(b"alpha").unwrap();
        assert_eq!(map.del(), None);
        assert_eq!(collect(&mut map), vec![b"beta".to_vec()]);
    }

    #[test]
    fn deleting_everything_empties_the_map() {
        let mut map = Warren::open(64, 0);
        let key = [b'q'; 60];
        insert(&mut map, &key, 9);
        map.slot(&key).unwrap();
        assert_eq!(map.del(), None);
        assert_eq!(map.first(), None);
        assert_eq!(map.slot(&key), None);
        // The map is still usable after going empty.
        insert(&mut map, b"again", 1);
        assert_eq!(collect(&mut map), vec![b"again".to_vec()]);
    }

    #[test]
    fn clone_is_independent_and_keeps_the_cursor() {
        let mut map = Warren::open(32, 0);
        insert(&mut map, b"one", 1);
        insert(&mut map, b"two", 2);
        map.first().unwrap();

        let mut snap = map.clone();
        insert(&mut map, b"three", 3);

        // The clone continues from the snapshotted cursor and does not
        // see the later insert.
        let cell = snap.nxt().unwrap();
        assert_eq!(snap.get(cell), 2);
        assert_eq!(snap.nxt(), None);
        assert_eq!(snap.slot(b"three"), None);
        assert!(map.slot(b"three").is_some());
    }

    #[test]
    fn data_allocations_live_in_the_map() {
        let mut map = Warren::open(32, 0);
        let payload = map.data(11).unwrap();
        map.write_data(payload, b"hello there");
        let cell = insert(&mut map, b"key", payload.to_word());
        let mut buf = [0_u8; 11];
        map.read_data(super::DataRef::from_word(map.get(cell)), &mut buf);
        assert_eq!(&buf, b"hello there");
    }

    #[test]
    fn integer_keys_with_zero_words_work() {
        let mut map = Warren::open(0, 2);
        insert(&mut map, &int_key(&[0, 0]), 1);
        insert(&mut map, &int_key(&[0, 1]), 2);
        insert(&mut map, &int_key(&[1, 0]), 3);
        let keys = collect(&mut map);
        assert_eq!(keys[0], int_key(&[0, 0]));
        assert_eq!(keys[1], int_key(&[0, 1]));
        assert_eq!(keys[2], int_key(&[1, 0]));
    }

    #[test]
    fn integer_radix_split_keeps_numeric_order() {
        let mut map = Warren::open(0, 1);
        let keys: Vec<Vec<u8>> = (0..40_u64).map(|i| int_key(&[i << 56 | i])).collect();
        for (i, key) in keys.iter().enumerate().rev() {
            insert(&mut map, key, i as u64 + 1);
        }
        assert_eq!(collect(&mut map), keys);
    }

    #[test]
    fn string_words_against_a_btree_oracle() {
        // A few hundred distinct words inserted in scrambled order;
        // iteration must match the byte-lexicographic oracle exactly.
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        let mut map = Warren::open(24, 0);
        let mut oracle = BTreeMap::new();
        for _ in 0..400 {
            let len = 1 + (rng.next_u64() % 9) as usize;
            let word: Vec<u8> = (0..len)
                .map(|_| b'a' + (rng.next_u64() % 26) as u8)
                .collect();
            let value = rng.next_u64() | 1;
            if oracle.insert(word.clone(), value).is_none() {
                insert(&mut map, &word, value);
            } else {
                let cell = map.cell(&word).unwrap();
                map.set(cell, value);
            }
        }
        let keys: Vec<Vec<u8>> = oracle.keys().cloned().collect();
        assert_eq!(collect(&mut map), keys);
        for (key, &value) in oracle.iter() {
            let cell = map.slot(key).unwrap();
            assert_eq!(map.get(cell), value);
        }
    }
}
