//! Verifiable map: a Merkle binary search tree over a content-addressed
//! object store. Nodes are stored under the hash of their encoding, so a
//! root hash commits to the entire map and any root-to-leaf path doubles as
//! an inclusion (or non-inclusion) proof.

use crate::crypto::{Hash, hash_data};
use crate::storage::{ObjectStore, StorageError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A node of the map. Branches route by byte-wise comparison: keys less than
/// or equal to the pivot descend left. Leaves bind a lookup key to the
/// content address of its blob.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TreeNode {
    Branch {
        pivot: Vec<u8>,
        left: Hash,
        right: Hash,
    },
    Leaf {
        key: Vec<u8>,
        item: Hash,
    },
}

impl TreeNode {
    /// Identity of the node in the object store.
    pub fn hid(&self) -> Result<Hash, StorageError> {
        Ok(hash_data(self)?)
    }
}

#[derive(Clone)]
pub struct Tree {
    store: Arc<dyn ObjectStore>,
    root_hash: Option<Hash>,
}

impl Tree {
    pub fn new(store: Arc<dyn ObjectStore>, root_hash: Option<Hash>) -> Self {
        Tree { store, root_hash }
    }

    pub fn root_hash(&self) -> Option<Hash> {
        self.root_hash
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Insert every entry of the mapping. Iteration over the BTreeMap is
    /// ordered, so a given set of entries always produces the same root.
    pub fn update(&mut self, entries: &BTreeMap<Vec<u8>, Vec<u8>>) -> Result<(), StorageError> {
        for (key, blob) in entries {
            self.insert(key, blob)?;
        }
        Ok(())
    }

    /// Insert one entry; an existing entry under the same key is replaced.
    pub fn insert(&mut self, key: &[u8], blob: &[u8]) -> Result<(), StorageError> {
        let item = self.store.add(blob)?;
        let leaf = TreeNode::Leaf {
            key: key.to_vec(),
            item,
        };
        let new_root = match self.root_hash {
            None => self.store_node(&leaf)?,
            Some(root) => self.insert_below(&root, key, &leaf)?,
        };
        self.root_hash = Some(new_root);
        Ok(())
    }

    fn insert_below(
        &self,
        node_hash: &Hash,
        key: &[u8],
        leaf: &TreeNode,
    ) -> Result<Hash, StorageError> {
        match self.load_node(node_hash)? {
            TreeNode::Branch { pivot, left, right } => {
                let node = if key <= pivot.as_slice() {
                    TreeNode::Branch {
                        left: self.insert_below(&left, key, leaf)?,
                        pivot,
                        right,
                    }
                } else {
                    TreeNode::Branch {
                        right: self.insert_below(&right, key, leaf)?,
                        pivot,
                        left,
                    }
                };
                self.store_node(&node)
            }
            TreeNode::Leaf {
                key: existing_key, ..
            } => {
                let leaf_hash = self.store_node(leaf)?;
                if existing_key.as_slice() == key {
                    return Ok(leaf_hash);
                }
                let branch = if existing_key.as_slice() <= key {
                    TreeNode::Branch {
                        pivot: existing_key,
                        left: *node_hash,
                        right: leaf_hash,
                    }
                } else {
                    TreeNode::Branch {
                        pivot: key.to_vec(),
                        left: leaf_hash,
                        right: *node_hash,
                    }
                };
                self.store_node(&branch)
            }
        }
    }

    /// Root-to-leaf path for a key: a Merkle proof of presence when the
    /// final leaf carries the key exactly, of absence otherwise.
    pub fn evidence(&self, key: &[u8]) -> Result<(Option<Hash>, Vec<TreeNode>), StorageError> {
        let Some(root) = self.root_hash else {
            return Ok((None, Vec::new()));
        };
        let mut path = Vec::new();
        let mut cursor = root;
        loop {
            let node = self.load_node(&cursor)?;
            match &node {
                TreeNode::Branch { pivot, left, right } => {
                    cursor = if key <= pivot.as_slice() { *left } else { *right };
                    path.push(node);
                }
                TreeNode::Leaf { .. } => {
                    path.push(node);
                    break;
                }
            }
        }
        Ok((Some(root), path))
    }

    /// Fetch the blob stored under a key; `Ok(None)` when the map has no
    /// entry for it.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        let (_, path) = self.evidence(key)?;
        match path.last() {
            Some(TreeNode::Leaf {
                key: leaf_key,
                item,
            }) if leaf_key.as_slice() == key => {
                let blob = self
                    .store
                    .get_raw(item)?
                    .ok_or(StorageError::MissingObject(*item))?;
                Ok(Some(blob))
            }
            _ => Ok(None),
        }
    }

    fn load_node(&self, hash: &Hash) -> Result<TreeNode, StorageError> {
        let blob = self
            .store
            .get_raw(hash)?
            .ok_or(StorageError::MissingObject(*hash))?;
        Ok(bincode::deserialize(&blob)?)
    }

    fn store_node(&self, node: &TreeNode) -> Result<Hash, StorageError> {
        self.store.add(&bincode::serialize(node)?)
    }
}

/// Verify a Merkle path against a claimed root, independently of any store.
/// Accepts both presence and absence proofs; the caller decides which one it
/// got by inspecting the final leaf's key.
pub fn check_evidence(root_hash: &Hash, path: &[TreeNode], key: &[u8]) -> bool {
    let mut expected = *root_hash;
    let mut nodes = path.iter().peekable();
    while let Some(node) = nodes.next() {
        match node.hid() {
            Ok(hid) if hid == expected => {}
            _ => return false,
        }
        match node {
            TreeNode::Branch { pivot, left, right } => {
                expected = if key <= pivot.as_slice() { *left } else { *right };
                if nodes.peek().is_none() {
                    // path must terminate in a leaf
                    return false;
                }
            }
            TreeNode::Leaf { .. } => return nodes.peek().is_none(),
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemStore;

    fn mem_tree() -> Tree {
        Tree::new(Arc::new(MemStore::new()), None)
    }

    #[test]
    fn test_insert_and_get() {
        let mut tree = mem_tree();
        tree.insert(b"label", b"test").unwrap();
        assert_eq!(tree.get(b"label").unwrap().unwrap(), b"test");
        assert!(tree.get(b"other").unwrap().is_none());
    }

    #[test]
    fn test_replace_same_key() {
        let mut tree = mem_tree();
        tree.insert(b"label", b"one").unwrap();
        tree.insert(b"label", b"two").unwrap();
        assert_eq!(tree.get(b"label").unwrap().unwrap(), b"two");
    }

    #[test]
    fn test_same_entry_set_same_root() {
        let mut first = BTreeMap::new();
        first.insert(b"a".to_vec(), b"1".to_vec());
        first.insert(b"b".to_vec(), b"2".to_vec());
        first.insert(b"c".to_vec(), b"3".to_vec());

        // accumulate in a different order; the map normalizes it
        let mut second = BTreeMap::new();
        second.insert(b"c".to_vec(), b"3".to_vec());
        second.insert(b"a".to_vec(), b"1".to_vec());
        second.insert(b"b".to_vec(), b"2".to_vec());

        let mut tree1 = mem_tree();
        tree1.update(&first).unwrap();
        let mut tree2 = mem_tree();
        tree2.update(&second).unwrap();
        assert_eq!(tree1.root_hash(), tree2.root_hash());
    }

    #[test]
    fn test_reopen_from_root() {
        let store: Arc<dyn ObjectStore> = Arc::new(MemStore::new());
        let mut tree = Tree::new(Arc::clone(&store), None);
        tree.insert(b"label", b"test").unwrap();

        let reopened = Tree::new(store, tree.root_hash());
        assert_eq!(reopened.get(b"label").unwrap().unwrap(), b"test");
    }

    #[test]
    fn test_evidence_of_presence() {
        let mut tree = mem_tree();
        let mut entries = BTreeMap::new();
        for i in 0..8u8 {
            entries.insert(vec![i], vec![i, i]);
        }
        tree.update(&entries).unwrap();

        let (root, path) = tree.evidence(&[3u8]).unwrap();
        let root = root.unwrap();
        assert!(check_evidence(&root, &path, &[3u8]));
        match path.last().unwrap() {
            TreeNode::Leaf { key, .. } => assert_eq!(key, &vec![3u8]),
            _ => panic!("evidence must end in a leaf"),
        }
    }

    #[test]
    fn test_evidence_of_absence() {
        let mut tree = mem_tree();
        tree.insert(b"aa", b"1").unwrap();
        tree.insert(b"cc", b"2").unwrap();

        let (root, path) = tree.evidence(b"bb").unwrap();
        assert!(check_evidence(&root.unwrap(), &path, b"bb"));
        match path.last().unwrap() {
            TreeNode::Leaf { key, .. } => assert_ne!(key, &b"bb".to_vec()),
            _ => panic!("evidence must end in a leaf"),
        }
    }

    #[test]
    fn test_check_evidence_rejects_forged_path() {
        let mut tree = mem_tree();
        tree.insert(b"aa", b"1").unwrap();
        tree.insert(b"cc", b"2").unwrap();

        let (root, mut path) = tree.evidence(b"aa").unwrap();
        let root = root.unwrap();
        if let Some(TreeNode::Leaf { key, .. }) = path.last_mut() {
            key[0] ^= 1;
        }
        assert!(!check_evidence(&root, &path, b"aa"));
    }

    #[test]
    fn test_empty_tree_has_no_root() {
        let tree = mem_tree();
        assert!(tree.root_hash().is_none());
        let (root, path) = tree.evidence(b"anything").unwrap();
        assert!(root.is_none());
        assert!(path.is_empty());
    }
}
