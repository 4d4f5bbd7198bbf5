#![no_main]

use std::collections::BTreeMap;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use warren::Warren;

const MAX_KEY: usize = 16;

#[derive(Arbitrary, Debug)]
enum Op {
    Insert { key: Vec<u8>, value: u64 },
    Delete { key: Vec<u8> },
    Lookup { key: Vec<u8> },
    Iterate,
}

/// Clamp an arbitrary byte string to a valid string-mode key: no
/// terminator bytes, bounded length.
fn clamp(key: Vec<u8>) -> Vec<u8> {
    key.into_iter().filter(|&b| b != 0).take(MAX_KEY).collect()
}

fuzz_target!(|ops: Vec<Op>| {
    let mut map = Warren::open(MAX_KEY, 0);
    let mut oracle: BTreeMap<Vec<u8>, u64> = BTreeMap::new();

    for op in ops {
        match op {
            Op::Insert { key, value } => {
                let key = clamp(key);
                let value = value | 1;
                let cell = map.cell(&key).unwrap();
                map.set(cell, value);
                oracle.insert(key, value);
            }
            Op::Delete { key } => {
                let key = clamp(key);
                if oracle.remove(&key).is_some() {
                    map.slot(&key).expect("key in oracle must be in the map");
                    map.del();
                }
                assert!(map.slot(&key).is_none());
            }
            Op::Lookup { key } => {
                let key = clamp(key);
                match (map.slot(&key), oracle.get(&key)) {
                    (Some(cell), Some(&value)) => assert_eq!(map.get(cell), value),
                    (None, None) => {}
                    (found, expected) => {
                        panic!("lookup mismatch: {:?} vs {:?}", found, expected)
                    }
                }
            }
            Op::Iterate => {
                let mut keys = Vec::new();
                let mut cur = map.first();
                while cur.is_some() {
                    let mut buf = [0_u8; MAX_KEY];
                    let n = map.key(&mut buf);
                    keys.push(buf[..n].to_vec());
                    cur = map.nxt();
                }
                let expected: Vec<Vec<u8>> = oracle.keys().cloned().collect();
                assert_eq!(keys, expected);
            }
        }
    }
});
