//! Claim and capability codec.
//!
//! Claims are encrypted under keys derived from their (deterministic) VRF
//! value; capabilities are encrypted under keys derived from the ECDH shared
//! secret between owner and reader. Both land in the verifiable map under
//! short lookup keys derived with explicit domain-separation prefixes.

use crate::crypto::{aead_decrypt, aead_encrypt, point_bytes};
use crate::encodings::{pack_pair, unpack_pair};
use crate::error::Error;
use crate::params::{LocalParams, PublicParams};
use crate::vrf::{VrfContainer, compute_vrf, verify_vrf};
use k256::{ProjectivePoint, Scalar};
use sha2::{Digest, Sha256};

const CLAIM_LOOKUP_PREFIX: &[u8] = b"clm_lookup|";
const CLAIM_ENC_PREFIX: &[u8] = b"clm_enc|";
const CAP_LOOKUP_PREFIX: &[u8] = b"cap_lookup|";
const CAP_ENC_PREFIX: &[u8] = b"cap_enc|";
const LABEL_SALT_PREFIX: &[u8] = b"lab_";

// Safe only because every derived AEAD key is single-use per entry.
const ZERO_IV: [u8; 16] = [0u8; 16];

/// Salt a claim label with the commit nonce before it enters the VRF.
pub fn salt_label(nonce: &[u8], label: &[u8]) -> Vec<u8> {
    let mut salted = Vec::with_capacity(LABEL_SALT_PREFIX.len() + nonce.len() + 1 + label.len());
    salted.extend_from_slice(LABEL_SALT_PREFIX);
    salted.extend_from_slice(nonce);
    salted.push(b'.');
    salted.extend_from_slice(label);
    salted
}

/// Tree address of a claim entry, derived from its VRF value.
pub fn claim_lookup_key(vrf_value: &[u8]) -> Vec<u8> {
    let pp = PublicParams::get_default();
    let mut hasher = Sha256::new();
    hasher.update(CLAIM_LOOKUP_PREFIX);
    hasher.update(vrf_value);
    hasher.finalize()[..pp.lookup_key_size].to_vec()
}

fn claim_enc_key(vrf_value: &[u8]) -> Vec<u8> {
    let pp = PublicParams::get_default();
    let mut hasher = Sha256::new();
    hasher.update(CLAIM_ENC_PREFIX);
    hasher.update(vrf_value);
    hasher.finalize()[..pp.enc_key_size].to_vec()
}

/// Encrypt a claim for the tree. Returns the VRF value, the tree lookup key
/// and the encrypted entry. The lookup key is deterministic in (owner VRF
/// key, nonce, label); the ciphertext is not, because the proof inside is
/// randomized.
pub fn encode_claim(
    params: &LocalParams,
    nonce: &[u8],
    label: &[u8],
    content: &[u8],
) -> Result<(Vec<u8>, Vec<u8>, Vec<u8>), Error> {
    let salted = salt_label(nonce, label);
    let vrf = compute_vrf(params, &salted)?;

    let lookup_key = claim_lookup_key(&vrf.value);
    let enc_key = claim_enc_key(&vrf.value);

    let plaintext = pack_pair(&vrf.proof, content)?;
    let (body, tag) = aead_encrypt(&enc_key, &ZERO_IV, &plaintext)?;
    let encrypted_claim = pack_pair(&body, &tag)?;

    Ok((vrf.value, lookup_key, encrypted_claim))
}

/// Decrypt a claim entry and verify its VRF proof against the label.
pub fn decode_claim(
    owner_vrf_pk: &ProjectivePoint,
    nonce: &[u8],
    label: &[u8],
    vrf_value: &[u8],
    encrypted_claim: &[u8],
) -> Result<Vec<u8>, Error> {
    let enc_key = claim_enc_key(vrf_value);
    let (body, tag) = unpack_pair(encrypted_claim)?;
    let plaintext = aead_decrypt(&enc_key, &ZERO_IV, &body, &tag)?;
    let (proof, content) = unpack_pair(&plaintext)?;

    let salted = salt_label(nonce, label);
    let vrf = VrfContainer {
        value: vrf_value.to_vec(),
        proof,
    };
    if !verify_vrf(owner_vrf_pk, &vrf, &salted) {
        return Err(Error::WrongVrfValue);
    }
    Ok(content)
}

/// Hash of the canonical encoding of the ECDH shared point. Commutativity of
/// the exchange makes this identical on both ends.
fn shared_secret_key(own_dh_sk: &Scalar, other_dh_pk: &ProjectivePoint) -> [u8; 32] {
    let shared = *other_dh_pk * own_dh_sk;
    Sha256::digest(point_bytes(&shared)).into()
}

fn cap_derive(prefix: &[u8], secret: &[u8; 32], nonce: &[u8], label: &[u8], size: usize) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(prefix);
    hasher.update(nonce);
    hasher.update(secret);
    hasher.update(label);
    hasher.finalize()[..size].to_vec()
}

/// Encrypt a capability granting `reader_dh_pk` the VRF value for a label.
pub fn encode_capability(
    params: &LocalParams,
    reader_dh_pk: &ProjectivePoint,
    nonce: &[u8],
    label: &[u8],
    vrf_value: &[u8],
) -> Result<(Vec<u8>, Vec<u8>), Error> {
    let pp = PublicParams::get_default();
    let secret = shared_secret_key(params.require_dh()?.sk()?, reader_dh_pk);

    let lookup_key = cap_derive(CAP_LOOKUP_PREFIX, &secret, nonce, label, pp.lookup_key_size);
    let enc_key = cap_derive(CAP_ENC_PREFIX, &secret, nonce, label, pp.enc_key_size);

    let (body, tag) = aead_encrypt(&enc_key, &ZERO_IV, vrf_value)?;
    let encrypted_capability = pack_pair(&body, &tag)?;
    Ok((lookup_key, encrypted_capability))
}

/// Decrypt a capability as the reader. Returns the VRF value and the lookup
/// key of the claim entry it unlocks.
pub fn decode_capability(
    params: &LocalParams,
    owner_dh_pk: &ProjectivePoint,
    nonce: &[u8],
    label: &[u8],
    encrypted_capability: &[u8],
) -> Result<(Vec<u8>, Vec<u8>), Error> {
    let pp = PublicParams::get_default();
    let secret = shared_secret_key(params.require_dh()?.sk()?, owner_dh_pk);

    let enc_key = cap_derive(CAP_ENC_PREFIX, &secret, nonce, label, pp.enc_key_size);
    let (body, tag) = unpack_pair(encrypted_capability)?;
    // a wrong shared secret surfaces here as a tag mismatch
    let vrf_value = aead_decrypt(&enc_key, &ZERO_IV, &body, &tag)?;

    let claim_key = claim_lookup_key(&vrf_value);
    Ok((vrf_value, claim_key))
}

/// Where a reader should look for their capability entry, computable without
/// possessing the capability itself.
pub fn get_capability_lookup_key(
    params: &LocalParams,
    owner_dh_pk: &ProjectivePoint,
    nonce: &[u8],
    label: &[u8],
) -> Result<Vec<u8>, Error> {
    let pp = PublicParams::get_default();
    let secret = shared_secret_key(params.require_dh()?.sk()?, owner_dh_pk);
    Ok(cap_derive(
        CAP_LOOKUP_PREFIX,
        &secret,
        nonce,
        label,
        pp.lookup_key_size,
    ))
}
