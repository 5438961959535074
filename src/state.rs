//! Owner-side committed state: buffered claims and reader grants, turned
//! into a signed block over a verifiable map on commit.

use crate::chain::Chain;
use crate::core::{claim_lookup_key, encode_capability, encode_claim, get_capability_lookup_key};
use crate::crypto::{Hash, point_bytes, point_from_bytes};
use crate::error::Error;
use crate::params::LocalParams;
use crate::sign::sign;
use crate::storage::ObjectStore;
use crate::tree::{Tree, TreeNode};
use k256::ProjectivePoint;
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

pub const PROTOCOL_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// ASCII export of the owner's public keys.
    pub params: BTreeMap<String, String>,
    pub identity_info: Option<Vec<u8>>,
}

/// The sole item of every block: commits to the map root, the per-commit
/// nonce, the owner's public metadata, a timestamp and a version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    /// Root of the verifiable map; None when the commit carried no entries.
    pub mtr_hash: Option<Hash>,
    pub metadata: Metadata,
    pub nonce: [u8; 16],
    pub timestamp: u64,
    pub version: u32,
}

impl Payload {
    pub fn build(
        owner: &LocalParams,
        tree: &Tree,
        nonce: [u8; 16],
        identity_info: Option<Vec<u8>>,
    ) -> Payload {
        Payload {
            mtr_hash: tree.root_hash(),
            metadata: Metadata {
                params: owner.public_export(),
                identity_info,
            },
            nonce,
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
            version: PROTOCOL_VERSION,
        }
    }
}

struct CommitCache {
    payload: Payload,
    tree: Tree,
    enc_items_map: BTreeMap<Vec<u8>, Vec<u8>>,
    vrf_value_by_label: BTreeMap<Vec<u8>, Vec<u8>>,
    nonce: [u8; 16],
}

/// Mutable buffer of claims and capability grants for one owner. `commit`
/// materializes the buffers into a new tree and signed block; the buffers
/// stay intact so the next commit republishes them.
#[derive(Default)]
pub struct State {
    pub identity_info: Option<Vec<u8>>,
    claim_content_by_label: BTreeMap<Vec<u8>, Vec<u8>>,
    caps_by_reader_pk: BTreeMap<Vec<u8>, BTreeSet<Vec<u8>>>,
    commit_cache: Option<CommitCache>,
}

impl State {
    pub fn new(identity_info: Option<Vec<u8>>) -> Self {
        State {
            identity_info,
            ..State::default()
        }
    }

    /// Queue a claim; a previous claim under the same label is overwritten.
    pub fn set_claim(&mut self, label: impl Into<Vec<u8>>, content: impl Into<Vec<u8>>) {
        self.claim_content_by_label
            .insert(label.into(), content.into());
    }

    pub fn get_claim(&self, label: &[u8]) -> Option<&[u8]> {
        self.claim_content_by_label
            .get(label)
            .map(|content| content.as_slice())
    }

    /// Grant a reader access to the listed labels in future commits.
    pub fn grant_access<I, L>(&mut self, reader_dh_pk: &ProjectivePoint, labels: I)
    where
        I: IntoIterator<Item = L>,
        L: Into<Vec<u8>>,
    {
        let caps = self
            .caps_by_reader_pk
            .entry(point_bytes(reader_dh_pk))
            .or_default();
        for label in labels {
            caps.insert(label.into());
        }
    }

    /// Stop granting the listed labels to a reader. Takes effect from the
    /// next commit on; blocks the reader has already seen stay readable.
    pub fn revoke_access<I, L>(&mut self, reader_dh_pk: &ProjectivePoint, labels: I)
    where
        I: IntoIterator<Item = L>,
        L: Into<Vec<u8>>,
    {
        if let Some(caps) = self.caps_by_reader_pk.get_mut(&point_bytes(reader_dh_pk)) {
            for label in labels {
                caps.remove(&label.into());
            }
        }
    }

    pub fn get_capabilities(&self, reader_dh_pk: &ProjectivePoint) -> Vec<Vec<u8>> {
        self.caps_by_reader_pk
            .get(&point_bytes(reader_dh_pk))
            .map(|caps| caps.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Materialize the buffers into a new verifiable map and append a signed
    /// block to the chain. Either the head and the commit cache both advance
    /// or neither does.
    pub fn commit(
        &mut self,
        owner: &LocalParams,
        chain: &mut Chain,
        tree_store: Option<Arc<dyn ObjectStore>>,
        nonce: Option<[u8; 16]>,
    ) -> Result<Hash, Error> {
        let nonce = nonce.unwrap_or_else(|| {
            let mut fresh = [0u8; 16];
            OsRng.fill_bytes(&mut fresh);
            fresh
        });
        let tree_store = tree_store.unwrap_or_else(|| Arc::clone(chain.store()));

        // Encode claims
        let mut enc_items_map = BTreeMap::new();
        let mut vrf_value_by_label = BTreeMap::new();
        for (label, content) in &self.claim_content_by_label {
            let (vrf_value, lookup_key, enc_claim) = encode_claim(owner, &nonce, label, content)?;
            enc_items_map.insert(lookup_key, enc_claim);
            vrf_value_by_label.insert(label.clone(), vrf_value);
        }

        // Encode capabilities
        for (reader_pk_bytes, labels) in &self.caps_by_reader_pk {
            let reader_dh_pk = point_from_bytes(reader_pk_bytes)?;
            for label in labels {
                let Some(vrf_value) = vrf_value_by_label.get(label) else {
                    log::warn!(
                        "no claim queued for label {:?}; skipping capability",
                        String::from_utf8_lossy(label)
                    );
                    continue;
                };
                let (lookup_key, enc_cap) =
                    encode_capability(owner, &reader_dh_pk, &nonce, label, vrf_value)?;
                enc_items_map.insert(lookup_key, enc_cap);
            }
        }

        // Put all the encrypted entries in a new tree
        let mut tree = Tree::new(tree_store, None);
        tree.update(&enc_items_map)?;
        log::debug!(
            "committing {} entries, map root {:?}",
            enc_items_map.len(),
            tree.root_hash()
        );

        let payload = Payload::build(owner, &tree, nonce, self.identity_info.clone());
        let items = vec![bincode::serialize(&payload)?];
        let head = chain.multi_add(items, |block| {
            let sig = sign(owner, &block.hash()?.0)?;
            block.aux = Some(sig.to_bytes().to_vec());
            Ok(())
        })?;

        self.commit_cache = Some(CommitCache {
            payload,
            tree,
            enc_items_map,
            vrf_value_by_label,
            nonce,
        });
        Ok(head)
    }

    pub fn tree(&self) -> Result<&Tree, Error> {
        Ok(&self.cache()?.tree)
    }

    pub fn payload(&self) -> Result<&Payload, Error> {
        Ok(&self.cache()?.payload)
    }

    /// Encrypted entries of the latest commit, keyed by tree lookup key.
    pub fn enc_items(&self) -> Result<&BTreeMap<Vec<u8>, Vec<u8>>, Error> {
        Ok(&self.cache()?.enc_items_map)
    }

    /// Object-store keys sufficient for a reader to resolve a label against
    /// the latest commit: the Merkle paths of the capability and claim
    /// entries plus the two encoded entry blobs. Empty when no claim for the
    /// label was committed.
    pub fn compute_evidence_keys(
        &self,
        owner: &LocalParams,
        reader_dh_pk: &ProjectivePoint,
        label: &[u8],
    ) -> Result<BTreeSet<Hash>, Error> {
        let cache = self.cache()?;
        let Some(vrf_value) = cache.vrf_value_by_label.get(label) else {
            return Ok(BTreeSet::new());
        };

        let cap_key = get_capability_lookup_key(owner, reader_dh_pk, &cache.nonce, label)?;
        let (_, cap_path) = cache.tree.evidence(&cap_key)?;
        let claim_key = claim_lookup_key(vrf_value);
        let (_, claim_path) = cache.tree.evidence(&claim_key)?;

        let mut keys = BTreeSet::new();
        for node in cap_path.iter().chain(claim_path.iter()) {
            keys.insert(node.hid()?);
        }
        if let Some(TreeNode::Leaf { item, .. }) = cap_path.last() {
            keys.insert(*item);
        }
        if let Some(TreeNode::Leaf { item, .. }) = claim_path.last() {
            keys.insert(*item);
        }
        Ok(keys)
    }

    /// Reset buffers and the commit cache.
    pub fn clear(&mut self) {
        self.claim_content_by_label.clear();
        self.caps_by_reader_pk.clear();
        self.commit_cache = None;
    }

    fn cache(&self) -> Result<&CommitCache, Error> {
        self.commit_cache
            .as_ref()
            .ok_or_else(|| Error::InvalidArgument("state has not been committed yet".into()))
    }
}
