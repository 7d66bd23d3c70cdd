use std::collections::BTreeMap;

use proptest::prelude::*;
use proptest_derive::Arbitrary;

use crate::{Config, Trie};

fn byte_key(item: &(Vec<u8>, u64)) -> &[u8] {
    &item.0
}

type ByteTrie = Trie<(Vec<u8>, u64), fn(&(Vec<u8>, u64)) -> &[u8]>;

/// Model implementation using BTreeMap for comparison. Bytewise order equals
/// nibble order (high nibble first), so the model's iteration order is also
/// the trie's.
#[derive(Default)]
struct Model {
    map: BTreeMap<Vec<u8>, u64>,
}

impl Model {
    /// First occupant of a key wins, matching the trie's insert.
    fn insert(&mut self, key: Vec<u8>, value: u64) -> u64 {
        *self.map.entry(key).or_insert(value)
    }

    fn get(&self, key: &[u8]) -> Option<u64> {
        self.map.get(key).copied()
    }

    fn remove(&mut self, key: &[u8]) -> Option<u64> {
        self.map.remove(key)
    }

    fn len(&self) -> usize {
        self.map.len()
    }
}

/// Actions to test against both implementations
#[derive(Arbitrary, Debug, Clone)]
enum Action {
    Insert(KeyValue),
    InsertAtLowerBound(KeyValue),
    Find(Key),
    Erase(Key),
}

/// Wrapper for key generation with custom strategy
#[derive(Debug, Clone)]
struct Key(Vec<u8>);

/// Wrapper for key-value pair
#[derive(Debug, Clone)]
struct KeyValue {
    key: Key,
    value: u64,
}

impl Arbitrary for Key {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        prop_oneof![
            // Empty key
            Just(Key(vec![])),
            // Short keys over a 4-value alphabet: heavy prefix sharing and
            // frequent mid-byte divergence
            prop::collection::vec(prop_oneof![Just(0x11u8), Just(0x12), Just(0x21), Just(0x22)], 1..4)
                .prop_map(Key),
            // Arbitrary short keys
            prop::collection::vec(any::<u8>(), 1..6).prop_map(Key),
            // Keys extending a fixed stem, so one key is often a prefix of
            // another
            prop::collection::vec(any::<u8>(), 0..3).prop_map(|tail| {
                let mut key = vec![0x10, 0x12];
                key.extend(tail);
                Key(key)
            }),
        ]
        .boxed()
    }
}

impl Arbitrary for KeyValue {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (any::<Key>(), any::<u64>())
            .prop_map(|(key, value)| KeyValue { key, value })
            .boxed()
    }
}

/// Test harness that executes actions on both the trie and the model
struct Test {
    trie: ByteTrie,
    model: Model,
}

impl Test {
    fn new(sloppy: bool) -> Self {
        Self {
            trie: Trie::with_config(
                byte_key,
                Config {
                    sloppy_lookup: sloppy,
                },
            ),
            model: Model::default(),
        }
    }

    fn execute(&mut self, action: Action) {
        match action {
            Action::Insert(kv) => {
                let key = kv.key.0;
                let cursor = self.trie.insert((key.clone(), kv.value));
                let model_value = self.model.insert(key.clone(), kv.value);
                let (trie_key, trie_item) = self.trie.get(cursor).expect("insert returns a live cursor");
                assert_eq!(trie_key, &key[..], "insert cursor key mismatch");
                assert_eq!(trie_item.1, model_value, "insert value mismatch: key={key:?}");
            }
            Action::InsertAtLowerBound(kv) => {
                let key = kv.key.0;
                let pos = self.trie.lower_bound(&key);
                let result = self.trie.insert_at((key.clone(), kv.value), pos);
                let existed = self.model.get(&key).is_some();
                assert_eq!(
                    result.is_err(),
                    existed,
                    "insert_at duplicate detection mismatch: key={key:?}"
                );
                self.model.insert(key, kv.value);
            }
            Action::Find(key) => {
                let trie_result = self.trie.get(self.trie.find(&key.0)).map(|(_, item)| item.1);
                let model_result = self.model.get(&key.0);
                assert_eq!(
                    trie_result, model_result,
                    "find mismatch: key={:?}",
                    key.0
                );
            }
            Action::Erase(key) => {
                let cursor = self.trie.find(&key.0);
                let model_result = self.model.remove(&key.0);
                if cursor.is_end() {
                    assert_eq!(model_result, None, "erase mismatch: key={:?}", key.0);
                } else {
                    self.trie.erase(cursor).expect("live cursor erases cleanly");
                    assert!(model_result.is_some(), "erase mismatch: key={:?}", key.0);
                }
            }
        }

        assert_eq!(
            self.trie.len(),
            self.model.len(),
            "length mismatch after action"
        );

        let issues = self.trie.verify_integrity();
        assert!(issues.is_empty(), "integrity violations: {issues:?}");
    }

    fn assert_same_entries(&self) {
        let trie_entries: Vec<(Vec<u8>, u64)> = self
            .trie
            .iter()
            .map(|(key, item)| (key.to_vec(), item.1))
            .collect();
        let model_entries: Vec<(Vec<u8>, u64)> = self
            .model
            .map
            .iter()
            .map(|(key, &value)| (key.clone(), value))
            .collect();
        assert_eq!(trie_entries, model_entries, "ordered traversal mismatch");
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn proptest_vs_btreemap(actions in prop::collection::vec(any::<Action>(), 1..64)) {
        let mut test = Test::new(false);
        for action in actions {
            test.execute(action);
        }
        test.assert_same_entries();
    }

    #[test]
    fn proptest_drain_leaves_an_empty_tree(kvs in prop::collection::vec(any::<KeyValue>(), 1..32)) {
        let mut test = Test::new(false);
        for kv in &kvs {
            test.execute(Action::Insert(kv.clone()));
        }
        for kv in &kvs {
            test.execute(Action::Erase(kv.key.clone()));
        }
        prop_assert_eq!(test.trie.len(), 0);
        prop_assert!(test.trie.begin().is_end());
        prop_assert!(test.trie.verify_integrity().is_empty());
    }

    #[test]
    fn proptest_erase_reinsert_is_idempotent(kvs in prop::collection::vec(any::<KeyValue>(), 1..24), probe in any::<KeyValue>()) {
        // A pre-existing probe key would make the comparison about
        // first-occupant-wins rather than erase/re-insert.
        prop_assume!(kvs.iter().all(|kv| kv.key.0 != probe.key.0));

        let mut test = Test::new(false);
        for kv in &kvs {
            test.execute(Action::Insert(kv.clone()));
        }

        let mut reference: Vec<(Vec<u8>, u64)> = Vec::new();
        {
            let mut once = Test::new(false);
            for kv in &kvs {
                once.execute(Action::Insert(kv.clone()));
            }
            once.execute(Action::Insert(probe.clone()));
            reference.extend(once.trie.iter().map(|(k, item)| (k.to_vec(), item.1)));
        }

        test.execute(Action::Insert(probe.clone()));
        test.execute(Action::Erase(probe.key.clone()));
        test.execute(Action::Insert(probe.clone()));

        let replay: Vec<(Vec<u8>, u64)> = test.trie.iter().map(|(k, item)| (k.to_vec(), item.1)).collect();
        prop_assert_eq!(replay, reference);
    }
}
