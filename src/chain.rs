//! Append-only hash chain. Each block carries its payload items, skip-list
//! fingers to earlier blocks, and an aux field holding the owner's signature.
//! Blocks are content-addressed in the same object store as everything else,
//! so a block's fingerprint is the address it is stored under.

use crate::crypto::{Hash, hash_data};
use crate::error::Error;
use crate::storage::{ObjectStore, StorageError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    /// (index, fingerprint) back-links to blocks at power-of-two distances.
    pub fingers: Vec<(u64, Hash)>,
    pub items: Vec<Vec<u8>>,
    /// Signature slot. Cleared when computing the hash that gets signed.
    pub aux: Option<Vec<u8>>,
}

impl Block {
    /// Deterministic fingerprint over index, fingers, items and aux.
    pub fn hash(&self) -> Result<Hash, Error> {
        Ok(hash_data(self)?)
    }
}

pub struct Chain {
    store: Arc<dyn ObjectStore>,
    fingerprints: Vec<Hash>,
}

impl Chain {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Chain {
            store,
            fingerprints: Vec::new(),
        }
    }

    /// Reopen a chain from its head fingerprint by walking the back-links.
    pub fn load(store: Arc<dyn ObjectStore>, head: Hash) -> Result<Self, Error> {
        let mut fingerprints = Vec::new();
        let mut cursor = head;
        loop {
            let block = read_block(&store, &cursor)?;
            fingerprints.push(cursor);
            if block.index == 0 {
                break;
            }
            let (_, previous) = block
                .fingers
                .iter()
                .find(|(index, _)| *index == block.index - 1)
                .ok_or_else(|| Error::InvalidArgument("block is missing its back-link".into()))?;
            cursor = *previous;
        }
        fingerprints.reverse();
        Ok(Chain {
            store,
            fingerprints,
        })
    }

    pub fn head(&self) -> Option<Hash> {
        self.fingerprints.last().copied()
    }

    pub fn len(&self) -> usize {
        self.fingerprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    pub fn get_block(&self, fingerprint: &Hash) -> Result<Option<Block>, Error> {
        match self.store.get_raw(fingerprint)? {
            Some(blob) => Ok(Some(bincode::deserialize(&blob)?)),
            None => Ok(None),
        }
    }

    /// Append a block carrying the given items. `pre_commit` runs exactly
    /// once before the block is written and may fill in `aux`.
    pub fn multi_add<F>(&mut self, items: Vec<Vec<u8>>, pre_commit: F) -> Result<Hash, Error>
    where
        F: FnOnce(&mut Block) -> Result<(), Error>,
    {
        let mut block = Block {
            index: self.fingerprints.len() as u64,
            fingers: self.skip_fingers(),
            items,
            aux: None,
        };
        pre_commit(&mut block)?;

        let blob = bincode::serialize(&block)?;
        let fingerprint = self.store.add(&blob)?;
        self.fingerprints.push(fingerprint);
        Ok(fingerprint)
    }

    /// Fingers to the blocks at distance 1, 2, 4, ... behind the next index.
    fn skip_fingers(&self) -> Vec<(u64, Hash)> {
        let next = self.fingerprints.len() as u64;
        let mut fingers = Vec::new();
        let mut back = 1u64;
        while back <= next {
            let index = next - back;
            fingers.push((index, self.fingerprints[index as usize]));
            back *= 2;
        }
        fingers
    }
}

fn read_block(store: &Arc<dyn ObjectStore>, fingerprint: &Hash) -> Result<Block, Error> {
    let blob = store
        .get_raw(fingerprint)?
        .ok_or(StorageError::MissingObject(*fingerprint))?;
    Ok(bincode::deserialize(&blob)?)
}
