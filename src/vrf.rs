use crate::crypto::{
    CryptoError, hash_to_point, hash_to_scalar, point_bytes, point_from_bytes, random_scalar,
    scalar_bytes, scalar_from_bytes,
};
use crate::encodings::{pack_list, pack_pair, unpack_pair};
use crate::params::LocalParams;
use k256::{ProjectivePoint, Scalar};
use serde::{Deserialize, Serialize};

/// A VRF output. The value commits the owner to a single response per
/// message; the proof shows the value matches the owner's VRF public key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VrfContainer {
    /// Serialized group element h = sk * hash_to_point(message).
    pub value: Vec<u8>,
    /// Packed Chaum-Pedersen proof (c, s).
    pub proof: Vec<u8>,
}

fn challenge(
    base: &ProjectivePoint,
    z: &ProjectivePoint,
    pk: &ProjectivePoint,
    h: &ProjectivePoint,
    r_g: &ProjectivePoint,
    r_z: &ProjectivePoint,
) -> Result<Scalar, CryptoError> {
    let transcript = pack_list(&[
        point_bytes(base),
        point_bytes(z),
        point_bytes(pk),
        point_bytes(h),
        point_bytes(r_g),
        point_bytes(r_z),
    ])
    .map_err(|_| CryptoError::InvalidEncoding)?;
    Ok(hash_to_scalar(&transcript))
}

/// Compute the VRF value for a message along with a proof of discrete-log
/// equality binding it to the owner's VRF public key. The value is
/// deterministic in (sk, message); the proof is randomized.
pub fn compute_vrf(params: &LocalParams, message: &[u8]) -> Result<VrfContainer, CryptoError> {
    let keypair = params.require_vrf()?;
    let sk = keypair.sk()?;

    let g = ProjectivePoint::GENERATOR;
    let z = hash_to_point(message);
    let h = z * sk;

    let r = random_scalar();
    let r_g = g * r;
    let r_z = z * r;

    let c = challenge(&g, &z, &keypair.pk, &h, &r_g, &r_z)?;
    let s = r - c * sk;

    let proof = pack_pair(&scalar_bytes(&c), &scalar_bytes(&s))
        .map_err(|_| CryptoError::InvalidEncoding)?;
    Ok(VrfContainer {
        value: point_bytes(&h),
        proof,
    })
}

/// Verify a VRF output against a public key and message. Returns false on
/// any malformed input rather than failing.
pub fn verify_vrf(vrf_pk: &ProjectivePoint, vrf: &VrfContainer, message: &[u8]) -> bool {
    check_vrf(vrf_pk, vrf, message).unwrap_or(false)
}

fn check_vrf(
    vrf_pk: &ProjectivePoint,
    vrf: &VrfContainer,
    message: &[u8],
) -> Result<bool, CryptoError> {
    let z = hash_to_point(message);
    let h = point_from_bytes(&vrf.value)?;
    let (c_bytes, s_bytes) = unpack_pair(&vrf.proof).map_err(|_| CryptoError::InvalidEncoding)?;
    let c = scalar_from_bytes(&c_bytes)?;
    let s = scalar_from_bytes(&s_bytes)?;

    let g = ProjectivePoint::GENERATOR;
    let r_g = g * s + *vrf_pk * c;
    let r_z = z * s + h * c;

    let expected = challenge(&g, &z, vrf_pk, &h, &r_g, &r_z)?;
    Ok(expected == c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vrf_correct() {
        let params = LocalParams::generate();
        let vrf = compute_vrf(&params, b"test@test.com").unwrap();
        assert!(verify_vrf(
            &params.require_vrf().unwrap().pk,
            &vrf,
            b"test@test.com"
        ));
    }

    #[test]
    fn test_vrf_incorrect_message() {
        let params = LocalParams::generate();
        let vrf = compute_vrf(&params, b"test@test.com").unwrap();
        assert!(!verify_vrf(
            &params.require_vrf().unwrap().pk,
            &vrf,
            b"other@test.com"
        ));
    }

    #[test]
    fn test_vrf_incorrect_pubkey() {
        let params = LocalParams::generate();
        let other_params = LocalParams::generate();
        let vrf = compute_vrf(&params, b"test@test.com").unwrap();
        assert!(!verify_vrf(
            &other_params.require_vrf().unwrap().pk,
            &vrf,
            b"test@test.com"
        ));
    }

    #[test]
    fn test_vrf_deterministic_value() {
        let params = LocalParams::generate();
        let vrf1 = compute_vrf(&params, b"test@test.com").unwrap();
        let vrf2 = compute_vrf(&params, b"test@test.com").unwrap();
        assert_eq!(vrf1.value, vrf2.value);
    }

    #[test]
    fn test_vrf_mutated_value_or_proof_fails() {
        let params = LocalParams::generate();
        let pk = params.require_vrf().unwrap().pk;
        let vrf = compute_vrf(&params, b"test@test.com").unwrap();

        let mut mutated = vrf.clone();
        mutated.value[1] ^= 1;
        assert!(!verify_vrf(&pk, &mutated, b"test@test.com"));

        let mut mutated = vrf.clone();
        let last = mutated.proof.len() - 1;
        mutated.proof[last] ^= 1;
        assert!(!verify_vrf(&pk, &mutated, b"test@test.com"));
    }

    #[test]
    fn test_vrf_garbage_inputs_do_not_panic() {
        let params = LocalParams::generate();
        let pk = params.require_vrf().unwrap().pk;
        let garbage = VrfContainer {
            value: b"junk".to_vec(),
            proof: b"more junk".to_vec(),
        };
        assert!(!verify_vrf(&pk, &garbage, b"test@test.com"));
    }
}
