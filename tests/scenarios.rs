//! End-to-end scenarios over the public surface: edge splitting at every
//! nibble boundary, erase re-condensation, ordered traversal and the
//! serialised dump formats.

use std::fmt;

use qtrie::{string_key, Config, StringTrie, Trie, TrieError};

struct Item {
    key: Vec<u8>,
    val: i32,
}

impl Item {
    fn new(key: &[u8], val: i32) -> Self {
        Self {
            key: key.to_vec(),
            val,
        }
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.val)
    }
}

fn item_key(item: &Item) -> &[u8] {
    &item.key
}

type ByteTrie = Trie<Item, fn(&Item) -> &[u8]>;

fn byte_trie() -> ByteTrie {
    Trie::new(item_key)
}

fn paths(trie: &ByteTrie) -> String {
    let mut out = Vec::new();
    trie.serialise_paths(&mut out).expect("write to a Vec");
    String::from_utf8(out).expect("dump is ASCII")
}

fn value_at(trie: &ByteTrie, key: &[u8]) -> Option<i32> {
    trie.get(trie.find(key)).map(|(_, item)| item.val)
}

fn assert_sound(trie: &ByteTrie) {
    let issues = trie.verify_integrity();
    assert!(issues.is_empty(), "integrity violations: {issues:?}");
}

#[test]
fn split_mid_byte() {
    let mut trie = byte_trie();
    trie.insert(Item::new(b"\x01\x02\x03", 1));
    trie.insert(Item::new(b"\x01\x12\x03", 2));
    assert_sound(&trie);

    // Both keys hang beneath an interim at two nibbles depth.
    assert_eq!(paths(&trie), "[]01[]0203[1]\n[]01[]1203[2]\n");

    assert_eq!(value_at(&trie, b"\x01\x02\x03"), Some(1));
    assert_eq!(value_at(&trie, b"\x01\x12\x03"), Some(2));
    assert!(trie.find(b"\x01\x22\x03").is_end());
}

#[test]
fn short_key_splits_edge() {
    let mut trie = byte_trie();
    trie.insert(Item::new(b"\x10\x12\x03", 1));
    trie.insert(Item::new(b"\x10\x12", 2));
    assert_sound(&trie);

    // The short key's node is an interim carrying the item, with the
    // original leaf hanging beneath it.
    assert_eq!(paths(&trie), "[]1012[2]03[1]\n");

    assert_eq!(value_at(&trie, b"\x10\x12"), Some(2));
    assert_eq!(value_at(&trie, b"\x10\x12\x03"), Some(1));
}

#[test]
fn forward_branch_reports_the_miss_above_the_interim() {
    let mut trie = byte_trie();
    trie.insert(Item::new(b"\x01\x02\x03", 1));
    trie.insert(Item::new(b"\x01\x12\x03", 2));

    // Diverges within byte 0, above the mid-byte interim: the split lands
    // at one nibble depth, not inside the interim.
    trie.insert(Item::new(b"\x02\x12\x03", 3));
    assert_sound(&trie);

    assert_eq!(
        paths(&trie),
        "[]0[]1[]0203[1]\n[]0[]1[]1203[2]\n[]0[]21203[3]\n"
    );

    assert_eq!(value_at(&trie, b"\x01\x02\x03"), Some(1));
    assert_eq!(value_at(&trie, b"\x01\x12\x03"), Some(2));
    assert_eq!(value_at(&trie, b"\x02\x12\x03"), Some(3));
    assert!(trie.find(b"\x03\x12\x03").is_end());
}

#[test]
fn traversal_is_nibble_ordered() {
    let mut trie: StringTrie<i32> = Trie::new(string_key);
    for (key, val) in [
        ("abc", 13),
        ("aBCDE", 25),
        ("acde", 34),
        ("abd", 43),
        ("ab", 52),
        ("abda", 64),
    ] {
        trie.insert((key.to_string(), val));
    }

    // Nibble-lexicographic, not character order: 'B' (0x42) sorts before
    // 'b' (0x62).
    let entries: Vec<(&str, i32)> = trie
        .iter()
        .map(|(key, item)| (std::str::from_utf8(key).unwrap(), item.1))
        .collect();
    assert_eq!(
        entries,
        [
            ("aBCDE", 25),
            ("ab", 52),
            ("abc", 13),
            ("abd", 43),
            ("abda", 64),
            ("acde", 34),
        ]
    );
}

#[test]
fn erase_collapses_the_interim() {
    let mut trie = byte_trie();
    trie.insert(Item::new(b"\x10\x12\x03", 1));
    trie.insert(Item::new(b"\x10\x12", 2));

    let next = trie.erase(trie.find(b"\x10\x12")).expect("live cursor");
    assert_sound(&trie);

    // The interim is spliced out; a single leaf remains and its label is
    // intact after the erased item's bytes are gone.
    assert_eq!(paths(&trie), "[]101203[1]\n");
    assert_eq!(trie.get(next).map(|(_, item)| item.val), Some(1));
    assert_eq!(value_at(&trie, b"\x10\x12\x03"), Some(1));
    assert!(trie.find(b"\x10\x12").is_end());
}

#[test]
fn erase_rehomes_borrowed_labels() {
    // The first key inserted donates its bytes to every interim label on
    // its path; erasing it must leave no node borrowing from it.
    let mut trie = byte_trie();
    trie.insert(Item::new(b"\x10\x12\x03\x44", 1));
    trie.insert(Item::new(b"\x10\x12\x03\x55", 2));
    trie.insert(Item::new(b"\x10\x12\x88", 3));

    trie.erase(trie.find(b"\x10\x12\x03\x44")).expect("live cursor");
    assert_sound(&trie);
    assert_eq!(value_at(&trie, b"\x10\x12\x03\x55"), Some(2));
    assert_eq!(value_at(&trie, b"\x10\x12\x88"), Some(3));

    trie.erase(trie.find(b"\x10\x12\x03\x55")).expect("live cursor");
    assert_sound(&trie);
    assert_eq!(value_at(&trie, b"\x10\x12\x88"), Some(3));
    assert_eq!(paths(&trie), "[]101288[3]\n");
}

#[test]
fn erase_rehomes_labels_above_a_filled_interim() {
    // The first key donates its bytes to interim labels at two levels; the
    // lower interim is then filled in place by a short key, so the upper
    // one still borrows from the donor when the donor is erased. The walk
    // must re-home it even though an item-bearing node sits in between.
    let mut trie = byte_trie();
    trie.insert(Item::new(b"\x11\x11", 1));
    trie.insert(Item::new(b"\x11\x22", 2));
    trie.insert(Item::new(b"\x12", 3));
    trie.insert(Item::new(b"\x11", 4));
    assert_sound(&trie);

    trie.erase(trie.find(b"\x11\x11")).expect("live cursor");
    assert_sound(&trie);

    assert_eq!(value_at(&trie, b"\x11\x22"), Some(2));
    assert_eq!(value_at(&trie, b"\x12"), Some(3));
    assert_eq!(value_at(&trie, b"\x11"), Some(4));
    assert!(trie.find(b"\x11\x11").is_end());
    assert_eq!(paths(&trie), "[]1[]1[4]22[2]\n[]1[]2[3]\n");
}

#[test]
fn sloppy_lookup_agrees_with_strict_on_unique_prefixes() {
    let make_key = |i: u8| {
        let mut key = vec![i, i ^ 0x5a, 0xc3, i.wrapping_mul(7)];
        key.extend(std::iter::repeat(0xee).take(28));
        key
    };

    let mut strict = byte_trie();
    let mut sloppy: ByteTrie = Trie::with_config(item_key, Config { sloppy_lookup: true });
    for i in 0..16u8 {
        strict.insert(Item::new(&make_key(i), i as i32));
        sloppy.insert(Item::new(&make_key(i), i as i32));
    }

    // The 4-byte prefix uniquely determines the 32-byte key, so both modes
    // agree on every stored key.
    for i in 0..16u8 {
        let key = make_key(i);
        assert_eq!(value_at(&strict, &key), Some(i as i32));
        assert_eq!(value_at(&sloppy, &key), Some(i as i32));
    }

    // A probe differing only beyond the traced prefix: the sloppy mode
    // accepts the leaf without reading the suffix, the strict mode reads it
    // all and rejects.
    let mut probe = make_key(9);
    probe[31] = 0;
    assert!(strict.find(&probe).is_end());
    assert_eq!(value_at(&sloppy, &probe), Some(9));
}

#[test]
fn draining_restores_the_empty_tree() {
    let keys: [&[u8]; 6] = [
        b"\x01\x02\x03",
        b"\x01\x12\x03",
        b"\x02\x12\x03",
        b"\x10\x12\x03",
        b"\x10\x12",
        b"\x10\x13\x11",
    ];

    let mut trie = byte_trie();
    for (i, key) in keys.iter().enumerate() {
        trie.insert(Item::new(key, i as i32));
        assert_sound(&trie);
    }
    assert_eq!(trie.len(), keys.len());

    for key in keys {
        let cursor = trie.find(key);
        trie.erase(cursor).expect("live cursor");
        assert_sound(&trie);
        assert!(trie.find(key).is_end());
    }

    assert_eq!(trie.len(), 0);
    assert!(trie.begin().is_end());
    assert_eq!(paths(&trie), "[]\n");
}

#[test]
fn erase_then_reinsert_restores_the_dump() {
    let mut trie = byte_trie();
    trie.insert(Item::new(b"\x01\x02\x03", 1));
    trie.insert(Item::new(b"\x01\x12\x03", 2));
    let reference = paths(&trie);

    trie.erase(trie.find(b"\x01\x12\x03")).expect("live cursor");
    trie.insert(Item::new(b"\x01\x12\x03", 2));

    assert_eq!(paths(&trie), reference);
    assert_sound(&trie);
}

#[test]
fn lower_bound_positions_drive_insert_at() {
    let mut trie = byte_trie();
    trie.insert(Item::new(b"\x10\x12\x03", 1));

    // Key ending partway along the compressed edge: the grown interim
    // carries the item itself.
    let pos = trie.lower_bound(b"\x10\x12");
    assert!(!pos.is_match());
    assert_eq!(pos.qlen(), 4);
    trie.insert_at(Item::new(b"\x10\x12", 2), pos).expect("vacant position");
    assert_sound(&trie);
    assert_eq!(paths(&trie), "[]1012[2]03[1]\n");

    // Occupied position is refused.
    let pos = trie.lower_bound(b"\x10\x12");
    assert!(pos.is_match());
    assert!(trie.cursor(pos) == trie.find(b"\x10\x12"));
    assert_eq!(
        trie.insert_at(Item::new(b"\x10\x12", 9), pos),
        Err(TrieError::DuplicateKey)
    );
    assert_eq!(value_at(&trie, b"\x10\x12"), Some(2));
}

#[test]
fn tree_dump_shape() {
    let mut trie = byte_trie();
    trie.insert(Item::new(b"\x01\x02\x03", 1));
    trie.insert(Item::new(b"\x01\x12\x03", 2));

    let mut out = Vec::new();
    trie.serialise(&mut out).expect("write to a Vec");
    let dump = String::from_utf8(out).expect("dump is ASCII");

    assert!(dump.starts_with("Node 0 @0:\n  Parent: -\n"));
    assert!(dump.contains("Key: 01\n"));
    assert!(dump.contains("Key: 010203"));
    assert!(dump.contains("Key: 011203"));
    assert!(dump.contains("Item\n"));
    assert!(!dump.contains("FAULTY BRANCH"));
    assert_eq!(dump.matches("NodeEnd").count(), 4);
}
