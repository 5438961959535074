//! Claim-content commitment proofs.
//!
//! Alongside the VRF value for a salted label, an owner can publish a
//! Pedersen-style commitment to the claim body together with a proof that
//! both were formed correctly: one Fiat-Shamir challenge covers the VRF
//! relation (the value matches the owner's VRF key) and the commitment
//! opening. A verifier holding the label and a candidate body can check the
//! pair without learning anything else.

use crate::core::salt_label;
use crate::crypto::{
    CryptoError, hash_to_point, hash_to_scalar, point_bytes, point_from_bytes, random_scalar,
    scalar_bytes, scalar_from_bytes,
};
use crate::encodings::{pack_list, unpack_list};
use crate::error::Error;
use crate::params::LocalParams;
use k256::{ProjectivePoint, Scalar};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimProof {
    /// Serialized VRF value for the salted label; matches the value the
    /// claim codec derives for the same (nonce, label).
    pub vrf_value: Vec<u8>,
    /// Serialized commitment to the claim body.
    pub commitment: Vec<u8>,
    /// Random key separating otherwise identical transcripts.
    pub proof_key: [u8; 16],
    /// Packed (c, s_sk, s_alpha).
    pub proof: Vec<u8>,
}

fn binding_base() -> ProjectivePoint {
    hash_to_point(b"zk_bind_base")
}

fn blinding_base() -> ProjectivePoint {
    hash_to_point(b"zk_blind_base")
}

#[allow(clippy::too_many_arguments)]
fn challenge(
    v: &ProjectivePoint,
    pk: &ProjectivePoint,
    h: &ProjectivePoint,
    com: &ProjectivePoint,
    bind: &ProjectivePoint,
    r_pk: &ProjectivePoint,
    r_h: &ProjectivePoint,
    r_com: &ProjectivePoint,
    proof_key: &[u8; 16],
) -> Result<Scalar, Error> {
    let transcript = pack_list(&[
        point_bytes(&ProjectivePoint::GENERATOR),
        point_bytes(v),
        point_bytes(&binding_base()),
        point_bytes(&blinding_base()),
        point_bytes(pk),
        point_bytes(h),
        point_bytes(com),
        point_bytes(bind),
        point_bytes(r_pk),
        point_bytes(r_h),
        point_bytes(r_com),
        proof_key.to_vec(),
    ])?;
    Ok(hash_to_scalar(&transcript))
}

/// Prove that the VRF value for (nonce, label) and a commitment to `body`
/// were both formed with the owner's VRF secret.
pub fn compute_claim_proof(
    params: &LocalParams,
    nonce: &[u8],
    label: &[u8],
    body: &[u8],
) -> Result<ClaimProof, Error> {
    let keypair = params.require_vrf()?;
    let sk = keypair.sk()?;

    let g = ProjectivePoint::GENERATOR;
    let a = binding_base();
    let b = blinding_base();
    let v = hash_to_point(&salt_label(nonce, label));
    let h = v * sk;

    let alpha = random_scalar();
    let bind = a * hash_to_scalar(body);
    let com = b * alpha + bind;

    let r_sk = random_scalar();
    let r_alpha = random_scalar();
    let mut proof_key = [0u8; 16];
    OsRng.fill_bytes(&mut proof_key);

    let r_pk = g * r_sk;
    let r_h = v * r_sk;
    let r_com = b * r_alpha;

    let c = challenge(&v, &keypair.pk, &h, &com, &bind, &r_pk, &r_h, &r_com, &proof_key)?;
    let s_sk = r_sk - c * sk;
    let s_alpha = r_alpha - c * alpha;

    let proof = pack_list(&[
        scalar_bytes(&c).to_vec(),
        scalar_bytes(&s_sk).to_vec(),
        scalar_bytes(&s_alpha).to_vec(),
    ])?;
    Ok(ClaimProof {
        vrf_value: point_bytes(&h),
        commitment: point_bytes(&com),
        proof_key,
        proof,
    })
}

/// Verify a claim proof against the owner's VRF public key, a label and a
/// candidate body. Returns false on any malformed input.
pub fn verify_claim_proof(
    owner_vrf_pk: &ProjectivePoint,
    nonce: &[u8],
    claim_proof: &ClaimProof,
    label: &[u8],
    body: &[u8],
) -> bool {
    check_claim_proof(owner_vrf_pk, nonce, claim_proof, label, body).unwrap_or(false)
}

fn check_claim_proof(
    owner_vrf_pk: &ProjectivePoint,
    nonce: &[u8],
    claim_proof: &ClaimProof,
    label: &[u8],
    body: &[u8],
) -> Result<bool, Error> {
    let scalars = unpack_list(&claim_proof.proof)?;
    let [c_bytes, s_sk_bytes, s_alpha_bytes] = scalars.as_slice() else {
        return Err(CryptoError::InvalidScalar.into());
    };
    let c = scalar_from_bytes(c_bytes)?;
    let s_sk = scalar_from_bytes(s_sk_bytes)?;
    let s_alpha = scalar_from_bytes(s_alpha_bytes)?;

    let h = point_from_bytes(&claim_proof.vrf_value)?;
    let com = point_from_bytes(&claim_proof.commitment)?;

    let g = ProjectivePoint::GENERATOR;
    let a = binding_base();
    let b = blinding_base();
    let v = hash_to_point(&salt_label(nonce, label));
    let bind = a * hash_to_scalar(body);

    let r_pk = g * s_sk + *owner_vrf_pk * c;
    let r_h = v * s_sk + h * c;
    let r_com = b * s_alpha + (com - bind) * c;

    let expected = challenge(
        &v,
        owner_vrf_pk,
        &h,
        &com,
        &bind,
        &r_pk,
        &r_h,
        &r_com,
        &claim_proof.proof_key,
    )?;
    Ok(expected == c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::encode_claim;

    const NONCE: &[u8] = b"0123456789abcdef";

    #[test]
    fn test_proof_correct() {
        let params = LocalParams::generate();
        let proof = compute_claim_proof(&params, b"42", b"test@test.com", b"hi there").unwrap();
        assert!(verify_claim_proof(
            &params.require_vrf().unwrap().pk,
            b"42",
            &proof,
            b"test@test.com",
            b"hi there"
        ));
    }

    #[test]
    fn test_proof_wrong_body_fails() {
        let params = LocalParams::generate();
        let proof = compute_claim_proof(&params, b"42", b"test@test.com", b"hi there").unwrap();
        assert!(!verify_claim_proof(
            &params.require_vrf().unwrap().pk,
            b"42",
            &proof,
            b"test@test.com",
            b"bye there"
        ));
    }

    #[test]
    fn test_proof_wrong_pubkey_fails() {
        let params = LocalParams::generate();
        let other_params = LocalParams::generate();
        let proof = compute_claim_proof(&params, b"42", b"test@test.com", b"hi there").unwrap();
        assert!(!verify_claim_proof(
            &other_params.require_vrf().unwrap().pk,
            b"42",
            &proof,
            b"test@test.com",
            b"hi there"
        ));
    }

    #[test]
    fn test_proof_value_matches_claim_codec() {
        let params = LocalParams::generate();
        let proof = compute_claim_proof(&params, NONCE, b"marios", b"test").unwrap();
        let (vrf_value, _, _) = encode_claim(&params, NONCE, b"marios", b"test").unwrap();
        assert_eq!(proof.vrf_value, vrf_value);
    }
}
