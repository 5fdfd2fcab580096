//! Oracle-based property tests: replay a sequence of inserts/removes against both `scalemap` and
//! `std::collections::HashMap`, and require them to agree at every step.

use std::collections::HashMap as StdMap;

use proptest::collection::vec;
use proptest::prelude::*;
use scalemap::HashMap;

#[derive(Clone, Debug)]
enum Op {
    Insert(u16, i32),
    Remove(u16),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (any::<u16>(), any::<i32>()).prop_map(|(k, v)| Op::Insert(k, v)),
        any::<u16>().prop_map(Op::Remove),
    ]
}

proptest! {
    /// After replaying the same sequence of inserts/removes, the map agrees with a
    /// `std::collections::HashMap` oracle on every key's value and on the overall length.
    #[test]
    fn matches_std_hashmap_oracle(ops in vec(op_strategy(), 0..500)) {
        let map: HashMap<u16, i32> = HashMap::with_capacity(16);
        let mut oracle: StdMap<u16, i32> = StdMap::new();

        for op in ops {
            match op {
                Op::Insert(k, v) => {
                    let expected_prev = oracle.insert(k, v);
                    prop_assert_eq!(map.insert(k, v), expected_prev);
                }
                Op::Remove(k) => {
                    let expected = oracle.remove(&k);
                    prop_assert_eq!(map.remove(&k), expected);
                }
            }
        }

        prop_assert_eq!(map.len() as usize, oracle.len());
        for (k, v) in &oracle {
            prop_assert_eq!(map.get(k), Some(*v));
        }
    }

    /// Re-inserting the same key never changes `len`, and the last value written always wins.
    #[test]
    fn repeated_insert_same_key_is_idempotent_on_len(key in any::<u16>(), values in vec(any::<i32>(), 1..20)) {
        let map: HashMap<u16, i32> = HashMap::with_capacity(16);
        for &v in &values {
            map.insert(key, v);
            prop_assert_eq!(map.len(), 1);
        }
        prop_assert_eq!(map.get(&key), values.last().copied());
    }

    /// Inserting n distinct keys past the resize threshold, then reading every one back, never
    /// loses or corrupts an entry.
    #[test]
    fn resize_preserves_every_distinct_key(n in 60u32..400) {
        let map: HashMap<u32, u32> = HashMap::with_capacity(50);
        for k in 0..n {
            map.insert(k, k * 7);
        }
        prop_assert_eq!(map.len() as u32, n);
        for k in 0..n {
            prop_assert_eq!(map.get(&k), Some(k * 7));
        }
    }

    /// `clear` always brings the map back to empty, regardless of whether a resize was mid-flight.
    #[test]
    fn clear_always_empties(n in 0u32..300) {
        let map: HashMap<u32, u32> = HashMap::with_capacity(50);
        for k in 0..n {
            map.insert(k, k);
        }
        map.clear();
        prop_assert!(map.is_empty());
        prop_assert_eq!(map.len(), 0);
        for k in 0..n {
            prop_assert_eq!(map.get(&k), None);
        }
    }
}
