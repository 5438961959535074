//! Reader-side view of a chain head: parse the latest payload, verify the
//! block signature, and resolve labels through the capability path (or
//! directly when the viewer is the owner).

use crate::chain::{Block, Chain};
use crate::core::{
    claim_lookup_key, decode_capability, decode_claim, get_capability_lookup_key, salt_label,
};
use crate::crypto::Hash;
use crate::error::Error;
use crate::params::LocalParams;
use crate::sign::verify_signature;
use crate::state::Payload;
use crate::storage::StorageError;
use crate::tree::Tree;
use crate::vrf::compute_vrf;
use k256::ecdsa::Signature;
use std::sync::Arc;

pub struct View<'a> {
    viewer: &'a LocalParams,
    head: Hash,
    block: Block,
    payload: Payload,
    owner: LocalParams,
    tree: Option<Tree>,
}

impl<'a> View<'a> {
    /// Build a view of the chain's latest block. A caller that already holds
    /// the committed tree may pass it in; its root must match the payload.
    pub fn new(
        viewer: &'a LocalParams,
        chain: &Chain,
        source_tree: Option<Tree>,
    ) -> Result<Self, Error> {
        let head = chain
            .head()
            .ok_or_else(|| Error::InvalidArgument("chain has no blocks".into()))?;
        let block = chain
            .get_block(&head)?
            .ok_or(StorageError::MissingObject(head))?;
        let raw_payload = block
            .items
            .first()
            .ok_or_else(|| Error::InvalidArgument("head block carries no payload".into()))?;
        let payload: Payload = bincode::deserialize(raw_payload)?;
        let owner = LocalParams::from_dict(&payload.metadata.params)?;

        let tree = match payload.mtr_hash {
            None => None,
            Some(root) => Some(match source_tree {
                None => Tree::new(Arc::clone(chain.store()), Some(root)),
                Some(tree) => {
                    if tree.root_hash() != Some(root) {
                        return Err(Error::InvalidArgument(
                            "supplied tree does not match the committed map root".into(),
                        ));
                    }
                    tree
                }
            }),
        };

        Ok(View {
            viewer,
            head,
            block,
            payload,
            owner,
            tree,
        })
    }

    pub fn head(&self) -> Hash {
        self.head
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// The owner's public parameters as published in the block metadata.
    pub fn owner_params(&self) -> &LocalParams {
        &self.owner
    }

    /// Check the block signature against the owner's published signing key.
    /// The fingerprint is recomputed with the signature slot cleared.
    pub fn validate(&self) -> Result<(), Error> {
        let sig_pk = self.owner.require_sig()?.pk;
        let raw_sig = self.block.aux.as_ref().ok_or(Error::InvalidSignature)?;
        let signature = Signature::from_slice(raw_sig).map_err(|_| Error::InvalidSignature)?;

        let mut unsigned = self.block.clone();
        unsigned.aux = None;
        if !verify_signature(&sig_pk, &signature, &unsigned.hash()?.0) {
            return Err(Error::InvalidSignature);
        }
        Ok(())
    }

    /// Resolve a label to its claim content. Errors distinguish "absent or
    /// not granted" from "granted but the claim entry is gone"; a claim that
    /// decrypts but fails VRF verification is an equivocation attempt and
    /// always surfaces.
    pub fn lookup(&self, label: &[u8]) -> Result<Vec<u8>, Error> {
        if self.viewer_is_owner() {
            // the owner can recompute the VRF locally and skip the capability
            let salted = salt_label(&self.payload.nonce, label);
            let vrf = compute_vrf(self.viewer, &salted)?;
            let claim_key = claim_lookup_key(&vrf.value);
            self.lookup_claim(label, &vrf.value, &claim_key)
        } else {
            let (vrf_value, claim_key) = self.lookup_capability(label)?;
            self.lookup_claim(label, &vrf_value, &claim_key)
        }
    }

    /// Like `lookup`, but absence and missing authorization read as None.
    pub fn get(&self, label: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        match self.lookup(label) {
            Ok(content) => Ok(Some(content)),
            Err(Error::NotFoundOrUnauthorized) | Err(Error::NoClaimMap) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn viewer_is_owner(&self) -> bool {
        match (&self.viewer.vrf, &self.owner.vrf) {
            (Some(mine), Some(theirs)) => mine.pk == theirs.pk,
            _ => false,
        }
    }

    fn lookup_capability(&self, label: &[u8]) -> Result<(Vec<u8>, Vec<u8>), Error> {
        let tree = self.tree.as_ref().ok_or(Error::NoClaimMap)?;
        let owner_dh_pk = self.owner.require_dh()?.pk;
        let cap_key =
            get_capability_lookup_key(self.viewer, &owner_dh_pk, &self.payload.nonce, label)?;

        let encrypted_cap = match tree.get(&cap_key) {
            Ok(Some(blob)) => blob,
            Ok(None) | Err(StorageError::MissingObject(_)) => {
                return Err(Error::NotFoundOrUnauthorized);
            }
            Err(e) => return Err(e.into()),
        };
        decode_capability(
            self.viewer,
            &owner_dh_pk,
            &self.payload.nonce,
            label,
            &encrypted_cap,
        )
    }

    fn lookup_claim(
        &self,
        label: &[u8],
        vrf_value: &[u8],
        claim_key: &[u8],
    ) -> Result<Vec<u8>, Error> {
        let tree = self.tree.as_ref().ok_or(Error::NoClaimMap)?;
        let encrypted_claim = match tree.get(claim_key) {
            Ok(Some(blob)) => blob,
            Ok(None) | Err(StorageError::MissingObject(_)) => {
                // for a reader the capability already resolved, so the
                // claim entry should have been there
                return Err(if self.viewer_is_owner() {
                    Error::NotFoundOrUnauthorized
                } else {
                    Error::ClaimMissing
                });
            }
            Err(e) => return Err(e.into()),
        };
        decode_claim(
            &self.owner.require_vrf()?.pk,
            &self.payload.nonce,
            label,
            vrf_value,
            &encrypted_claim,
        )
    }
}
