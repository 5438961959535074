use crate::crypto::CryptoError;
use crate::params::LocalParams;
use k256::ProjectivePoint;
use k256::ecdsa::signature::{Signer, Verifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};

/// ECDSA-sign a message (hashed internally) with the owner's signing key.
/// The signature is low-S normalized so its (r, s) encoding is canonical.
pub fn sign(params: &LocalParams, message: &[u8]) -> Result<Signature, CryptoError> {
    let keypair = params.require_sig()?;
    let sk = keypair.sk()?;
    let signing_key =
        SigningKey::from_bytes(&sk.to_bytes()).map_err(|e| CryptoError::Signing(e.to_string()))?;
    let signature: Signature = signing_key.sign(message);
    Ok(signature.normalize_s().unwrap_or(signature))
}

/// Verify an ECDSA signature against a signing public key.
pub fn verify_signature(sig_pk: &ProjectivePoint, signature: &Signature, message: &[u8]) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_affine(sig_pk.to_affine()) else {
        return false;
    };
    verifying_key.verify(message, signature).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_correct() {
        let params = LocalParams::generate();
        let sig = sign(&params, b"test@test.com").unwrap();
        assert!(verify_signature(
            &params.require_sig().unwrap().pk,
            &sig,
            b"test@test.com"
        ));
    }

    #[test]
    fn test_sign_incorrect_message() {
        let params = LocalParams::generate();
        let sig = sign(&params, b"test@test.com").unwrap();
        assert!(!verify_signature(
            &params.require_sig().unwrap().pk,
            &sig,
            b"other@test.com"
        ));
    }

    #[test]
    fn test_sign_incorrect_pubkey() {
        let params = LocalParams::generate();
        let other_params = LocalParams::generate();
        let sig = sign(&params, b"test@test.com").unwrap();
        assert!(!verify_signature(
            &other_params.require_sig().unwrap().pk,
            &sig,
            b"test@test.com"
        ));
    }

    #[test]
    fn test_mutated_signature_fails() {
        let params = LocalParams::generate();
        let sig = sign(&params, b"test@test.com").unwrap();
        let mut raw = sig.to_bytes().to_vec();
        raw[10] ^= 1;
        match Signature::from_slice(&raw) {
            Ok(mutated) => assert!(!verify_signature(
                &params.require_sig().unwrap().pk,
                &mutated,
                b"test@test.com"
            )),
            // flipping a byte may push r or s out of range, which is also a failure
            Err(_) => {}
        }
    }

    #[test]
    fn test_signature_wire_roundtrip() {
        let params = LocalParams::generate();
        let sig = sign(&params, b"block fingerprint").unwrap();
        let raw = sig.to_bytes().to_vec();
        assert_eq!(raw.len(), 64);
        let parsed = Signature::from_slice(&raw).unwrap();
        assert_eq!(parsed, sig);
    }
}
