//! Merkle tree implementation for transaction aggregation
//!
//! Leaves are the hashes of each item's canonical text. Parents hash the
//! concatenation of their children's hex strings. An odd node at the end of
//! a level is paired with itself.

use super::hash::sha256_hex;

/// Sentinel hashed as the root of an empty item list
pub const EMPTY_ROOT_SENTINEL: &[u8] = b"EMPTY";

/// Hash two hex digests into their parent
fn combine(left: &str, right: &str) -> String {
    let mut data = String::with_capacity(left.len() + right.len());
    data.push_str(left);
    data.push_str(right);
    sha256_hex(data.as_bytes())
}

/// Reduce one level of the tree, duplicating the last hash if the level is odd
fn next_level(level: &[String]) -> Vec<String> {
    level
        .chunks(2)
        .map(|pair| match pair {
            [left, right] => combine(left, right),
            [single] => combine(single, single),
            _ => unreachable!("chunks(2) yields one or two items"),
        })
        .collect()
}

/// Hash every item's text into a leaf, preserving order
pub fn leaf_hashes<S: AsRef<str>>(items: &[S]) -> Vec<String> {
    items
        .iter()
        .map(|item| sha256_hex(item.as_ref().as_bytes()))
        .collect()
}

/// Calculate the merkle root of an ordered list of canonical item strings
pub fn calculate_merkle_root<S: AsRef<str>>(items: &[S]) -> String {
    if items.is_empty() {
        return sha256_hex(EMPTY_ROOT_SENTINEL);
    }
    calculate_merkle_root_from_hashes(leaf_hashes(items))
}

/// Calculate the merkle root from already-hashed leaves
pub fn calculate_merkle_root_from_hashes(mut hashes: Vec<String>) -> String {
    if hashes.is_empty() {
        return sha256_hex(EMPTY_ROOT_SENTINEL);
    }

    while hashes.len() > 1 {
        hashes = next_level(&hashes);
    }

    hashes.swap_remove(0)
}

/// Merkle proof for verifying that an item is included under a root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleProof {
    /// Position of the proven leaf
    pub index: usize,
    /// Sibling hashes from leaf to root, with whether the sibling sits on the left
    pub siblings: Vec<(String, bool)>,
}

impl MerkleProof {
    /// Build an inclusion proof for `items[index]`
    pub fn build<S: AsRef<str>>(items: &[S], index: usize) -> Option<Self> {
        if index >= items.len() {
            return None;
        }

        let mut level = leaf_hashes(items);
        let mut position = index;
        let mut siblings = Vec::new();

        while level.len() > 1 {
            let sibling = if position % 2 == 0 {
                // Last odd node is its own sibling
                let right = level.get(position + 1).unwrap_or(&level[position]);
                (right.clone(), false)
            } else {
                (level[position - 1].clone(), true)
            };
            siblings.push(sibling);

            level = next_level(&level);
            position /= 2;
        }

        Some(Self { index, siblings })
    }

    /// Verify the proof for an item's canonical text against a root hash
    pub fn verify(&self, item: &str, root: &str) -> bool {
        let mut current = sha256_hex(item.as_bytes());

        for (sibling, is_left) in &self.siblings {
            current = if *is_left {
                combine(sibling, &current)
            } else {
                combine(&current, sibling)
            };
        }

        current == root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(s: &str) -> String {
        sha256_hex(s.as_bytes())
    }

    #[test]
    fn test_empty_merkle_root() {
        let items: Vec<String> = vec![];
        assert_eq!(calculate_merkle_root(&items), sha256_hex(b"EMPTY"));
    }

    #[test]
    fn test_merkle_root_single() {
        assert_eq!(calculate_merkle_root(&["A->B:1"]), h("A->B:1"));
    }

    #[test]
    fn test_merkle_root_two() {
        let root = calculate_merkle_root(&["tx1", "tx2"]);
        assert_eq!(root, h(&format!("{}{}", h("tx1"), h("tx2"))));
    }

    #[test]
    fn test_merkle_root_odd_duplicates_last() {
        let root = calculate_merkle_root(&["A", "B", "C"]);
        let ab = h(&format!("{}{}", h("A"), h("B")));
        let cc = h(&format!("{}{}", h("C"), h("C")));
        assert_eq!(root, h(&format!("{}{}", ab, cc)));
    }

    #[test]
    fn test_merkle_root_odd_across_levels() {
        // 5 leaves -> 3 -> 2 -> 1, duplicating at the first two levels
        let items = ["1", "2", "3", "4", "5"];
        let l1 = [
            h(&format!("{}{}", h("1"), h("2"))),
            h(&format!("{}{}", h("3"), h("4"))),
            h(&format!("{}{}", h("5"), h("5"))),
        ];
        let l2 = [
            h(&format!("{}{}", l1[0], l1[1])),
            h(&format!("{}{}", l1[2], l1[2])),
        ];
        let expected = h(&format!("{}{}", l2[0], l2[1]));
        assert_eq!(calculate_merkle_root(&items), expected);
    }

    #[test]
    fn test_merkle_root_order_sensitive() {
        assert_ne!(
            calculate_merkle_root(&["A->B:1", "C->D:2"]),
            calculate_merkle_root(&["C->D:2", "A->B:1"])
        );
    }

    #[test]
    fn test_merkle_proof() {
        let items = ["a", "b", "c", "d", "e", "f", "g"];
        let root = calculate_merkle_root(&items);

        for (i, item) in items.iter().enumerate() {
            let proof = MerkleProof::build(&items, i).unwrap();
            assert!(proof.verify(item, &root), "leaf {}", i);
            assert!(!proof.verify("z", &root));
        }

        assert!(MerkleProof::build(&items, items.len()).is_none());
    }

    #[test]
    fn test_merkle_proof_single_leaf() {
        let proof = MerkleProof::build(&["only"], 0).unwrap();
        assert!(proof.siblings.is_empty());
        assert!(proof.verify("only", &calculate_merkle_root(&["only"])));
    }
}
