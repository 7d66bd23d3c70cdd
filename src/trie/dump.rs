//! Diagnostic serialisation and structural self-checks.

use std::fmt::Display;
use std::io::{self, Write};

use crate::arena::Handle;
use crate::trie::{nibble_at, Trie, FANOUT};

/// Appends `key[from..to)` (nibble positions) as hex digits.
fn push_nibbles(out: &mut String, key: &[u8], mut from: usize, to: usize) {
    use std::fmt::Write as _;

    if from < to && from % 2 == 1 {
        let _ = write!(out, "{:x}", key[from / 2] & 0x0f);
        from += 1;
    }
    for i in from / 2..to / 2 {
        let _ = write!(out, "{:02x}", key[i]);
    }
    if to % 2 == 1 && from <= to - 1 {
        let _ = write!(out, "{:x}", key[to / 2] >> 4);
    }
}

impl<T, F> Trie<T, F>
where
    F: Fn(&T) -> &[u8],
{
    /// Human-readable dump of the whole tree: one block per node with its
    /// arena index, depth, parent, branch attributes, hex key prefix, item
    /// and children. A populated slot outside the branch window is flagged
    /// as `FAULTY BRANCH`.
    pub fn serialise<W: Write>(&self, out: &mut W) -> io::Result<()>
    where
        T: Display,
    {
        self.serialise_node(out, self.root, "")
    }

    fn serialise_node<W: Write>(&self, out: &mut W, nod: Handle, indent: &str) -> io::Result<()>
    where
        T: Display,
    {
        let node = self.nodes.get(nod);

        writeln!(out, "{}Node {} @{}:", indent, nod.to_index(), node.qlen)?;
        match node.parent {
            Some(parent) => writeln!(out, "{}  Parent: {}", indent, parent.to_index())?,
            None => writeln!(out, "{}  Parent: -", indent)?,
        }
        writeln!(out, "{}  Self     @{}", indent, node.br_own)?;
        writeln!(out, "{}  1st  son @{}", indent, node.br_1st)?;
        writeln!(out, "{}  Last son @{}", indent, node.br_last)?;

        let mut key_hex = String::new();
        if node.qlen > 0 {
            push_nibbles(&mut key_hex, self.node_key(nod), 0, node.qlen as usize);
        }
        writeln!(out, "{}  Key: {}", indent, key_hex)?;

        if let Some(item) = node.item {
            writeln!(out, "{}  Item", indent)?;
            writeln!(out, "{}    {}", indent, self.items.get(item))?;
            writeln!(out, "{}  ItemEnd", indent)?;
        }

        for (ix, slot) in node.branches.iter().enumerate() {
            let Some(child) = *slot else { continue };
            let in_window = node.br_1st as usize <= ix && ix <= node.br_last as usize;
            let label = if in_window { "Branch" } else { "FAULTY BRANCH" };
            writeln!(out, "{}  {} {:x}:", indent, label, ix)?;
            self.serialise_node(out, child, &format!("{}    ", indent))?;
        }

        writeln!(out, "{}NodeEnd", indent)
    }

    /// One line per leaf: the condensed nibbles of each edge followed by
    /// `[item]` at every node on the path (empty brackets where a node
    /// carries no item).
    pub fn serialise_paths<W: Write>(&self, out: &mut W) -> io::Result<()>
    where
        T: Display,
    {
        self.serialise_paths_node(out, self.root, 0, "")
    }

    fn serialise_paths_node<W: Write>(
        &self,
        out: &mut W,
        nod: Handle,
        qlen: usize,
        prefix: &str,
    ) -> io::Result<()>
    where
        T: Display,
    {
        let node = self.nodes.get(nod);
        let mut line = prefix.to_string();

        if (node.qlen as usize) > qlen {
            push_nibbles(&mut line, self.node_key(nod), qlen, node.qlen as usize);
        }

        line.push('[');
        if let Some(item) = node.item {
            use std::fmt::Write as _;
            let _ = write!(line, "{}", self.items.get(item));
        }
        line.push(']');

        let mut leaf = true;
        for slot in node.branches.iter() {
            let Some(child) = *slot else { continue };
            leaf = false;
            self.serialise_paths_node(out, child, node.qlen as usize, &line)?;
        }

        if leaf {
            writeln!(out, "{}", line)?;
        }
        Ok(())
    }

    /// Walks the whole tree checking its structural invariants; returns one
    /// message per violation, so an empty result means the tree is sound.
    pub fn verify_integrity(&self) -> Vec<String> {
        let mut issues = Vec::new();
        let mut visited = 0usize;
        let mut items_seen = 0usize;

        let root = self.nodes.get(self.root);
        if root.qlen != 0 {
            issues.push(format!("root has qlen {}", root.qlen));
        }
        if root.parent.is_some() {
            issues.push("root has a parent".into());
        }

        self.verify_node(self.root, &mut Vec::new(), &mut visited, &mut items_seen, &mut issues);

        if visited != self.nodes.len() {
            issues.push(format!(
                "{} nodes reachable from the root but {} allocated",
                visited,
                self.nodes.len()
            ));
        }
        if items_seen != self.items.len() {
            issues.push(format!(
                "{} items bound to nodes but {} stored",
                items_seen,
                self.items.len()
            ));
        }

        issues
    }

    fn verify_node(
        &self,
        nod: Handle,
        path: &mut Vec<u8>,
        visited: &mut usize,
        items_seen: &mut usize,
        issues: &mut Vec<String>,
    ) {
        let node = self.nodes.get(nod);
        let ix = nod.to_index();
        *visited += 1;

        if node.qlen as usize != path.len() {
            issues.push(format!(
                "node {} at depth {} has qlen {}",
                ix,
                path.len(),
                node.qlen
            ));
        }

        if let Some(item) = node.item {
            *items_seen += 1;
            if !self.items.contains(item) {
                issues.push(format!("node {} holds a stale item handle", ix));
            } else if node.key_item != Some(item) {
                issues.push(format!("node {} does not borrow its own item's key", ix));
            }
        }

        match node.key_item {
            None => {
                if node.qlen > 0 {
                    issues.push(format!("node {} has no key", ix));
                }
            }
            Some(key_item) => {
                if !self.items.contains(key_item) {
                    issues.push(format!("node {} borrows an erased item's key", ix));
                } else {
                    let key = self.node_key(nod);
                    if key.len() * 2 < node.qlen as usize {
                        issues.push(format!("node {} key is shorter than its depth", ix));
                    } else {
                        for (j, &expect) in path.iter().enumerate() {
                            if nibble_at(key, j) != expect {
                                issues.push(format!(
                                    "node {} key diverges from its path at nibble {}",
                                    ix, j
                                ));
                                break;
                            }
                        }
                    }
                }
            }
        }

        let populated: Vec<usize> = (0..FANOUT).filter(|&i| node.branches[i].is_some()).collect();

        if node.is_leaf() {
            if !populated.is_empty() {
                issues.push(format!("leaf-windowed node {} has children", ix));
            }
            if node.item.is_none() && node.parent.is_some() {
                issues.push(format!("leaf {} carries no item", ix));
            }
        } else {
            let first = node.br_1st as usize;
            let last = node.br_last as usize;
            if node.branches[first].is_none() || node.branches[last].is_none() {
                issues.push(format!("node {} branch window endpoints are empty", ix));
            }
            if populated.iter().any(|&i| i < first || i > last) {
                issues.push(format!("node {} has children outside its window", ix));
            }
            if node.item.is_none() && node.parent.is_some() && populated.len() < 2 {
                issues.push(format!("item-less interior node {} has a single child", ix));
            }
        }

        for &i in &populated {
            let child = node.branches[i].expect("slot checked populated");
            let child_node = self.nodes.get(child);
            if child_node.parent != Some(nod) {
                issues.push(format!("child {} does not point back at {}", child.to_index(), ix));
            }
            if child_node.br_own as usize != i {
                issues.push(format!(
                    "child {} sits in slot {} but records {}",
                    child.to_index(),
                    i,
                    child_node.br_own
                ));
            }
            if child_node.qlen <= node.qlen {
                issues.push(format!(
                    "child {} is not deeper than its parent {}",
                    child.to_index(),
                    ix
                ));
            }

            path.push(i as u8);
            // Edge nibbles between the branch and the child's depth come
            // from the child's own label.
            let label_live = child_node
                .key_item
                .is_some_and(|item| self.items.contains(item));
            if child_node.qlen as usize > path.len() && label_live {
                let key = self.node_key(child);
                if key.len() * 2 >= child_node.qlen as usize {
                    for j in path.len()..child_node.qlen as usize {
                        path.push(nibble_at(key, j));
                    }
                }
            }
            if path.len() == child_node.qlen as usize {
                self.verify_node(child, path, visited, items_seen, issues);
            } else {
                issues.push(format!(
                    "child {} unreachable for verification (broken label)",
                    child.to_index()
                ));
                *visited += 1; // count it so the reachability tally stays meaningful
            }
            path.truncate(node.qlen as usize);
        }
    }
}
