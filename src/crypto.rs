use aes_gcm::aead::consts::U16;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aes::Aes128;
use aes_gcm::{AeadInPlace, AesGcm, KeyInit};
use k256::elliptic_curve::ops::Reduce;
use k256::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use k256::elliptic_curve::{Field, PrimeField};
use k256::{AffinePoint, EncodedPoint, FieldBytes, ProjectivePoint, Scalar, U256};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};
use thiserror::Error;

/// Error type for low-level cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid group element encoding")]
    InvalidPoint,
    #[error("invalid scalar encoding")]
    InvalidScalar,
    #[error("invalid ascii encoding")]
    InvalidEncoding,
    #[error("missing {0} key material")]
    MissingKey(&'static str),
    #[error("authenticated encryption failed")]
    Aead,
    #[error("signing failed: {0}")]
    Signing(String),
}

/// 256-bit content hash (SHA-256).
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Hash(pub [u8; 32]);

impl std::fmt::Debug for Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Hash({})", hex::encode(&self.0[..8]))
    }
}

impl std::fmt::Display for Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Hash raw bytes.
pub fn hash_bytes(data: &[u8]) -> Hash {
    Hash(Sha256::digest(data).into())
}

/// Hash any serializable value through its canonical binary encoding.
pub fn hash_data<T: Serialize>(value: &T) -> Result<Hash, bincode::Error> {
    Ok(hash_bytes(&bincode::serialize(value)?))
}

/// Canonical (compressed SEC1) serialization of a group element.
pub fn point_bytes(point: &ProjectivePoint) -> Vec<u8> {
    point.to_affine().to_encoded_point(true).as_bytes().to_vec()
}

pub fn point_from_bytes(bytes: &[u8]) -> Result<ProjectivePoint, CryptoError> {
    let encoded = EncodedPoint::from_bytes(bytes).map_err(|_| CryptoError::InvalidPoint)?;
    let affine = Option::<AffinePoint>::from(AffinePoint::from_encoded_point(&encoded))
        .ok_or(CryptoError::InvalidPoint)?;
    Ok(ProjectivePoint::from(affine))
}

/// Big-endian fixed-width serialization of a scalar.
pub fn scalar_bytes(scalar: &Scalar) -> [u8; 32] {
    scalar.to_bytes().into()
}

pub fn scalar_from_bytes(bytes: &[u8]) -> Result<Scalar, CryptoError> {
    let array: [u8; 32] = bytes.try_into().map_err(|_| CryptoError::InvalidScalar)?;
    Option::<Scalar>::from(Scalar::from_repr(array.into())).ok_or(CryptoError::InvalidScalar)
}

pub fn random_scalar() -> Scalar {
    Scalar::random(&mut OsRng)
}

/// Map arbitrary bytes to a group element by hashing candidate x-coordinates
/// until one lands on the curve. Deterministic in the message.
pub fn hash_to_point(message: &[u8]) -> ProjectivePoint {
    let mut counter: u32 = 0;
    loop {
        let mut hasher = Sha256::new();
        hasher.update(b"pt|");
        hasher.update(counter.to_be_bytes());
        hasher.update(message);
        let digest = hasher.finalize();

        let mut candidate = [0u8; 33];
        candidate[0] = 0x02;
        candidate[1..].copy_from_slice(&digest);
        if let Ok(encoded) = EncodedPoint::from_bytes(candidate.as_slice()) {
            if let Some(affine) =
                Option::<AffinePoint>::from(AffinePoint::from_encoded_point(&encoded))
            {
                return ProjectivePoint::from(affine);
            }
        }
        counter += 1;
    }
}

/// Reduce a 512-bit digest of the message modulo the group order.
pub fn hash_to_scalar(message: &[u8]) -> Scalar {
    let digest = Sha512::digest(message);
    let hi = <Scalar as Reduce<U256>>::reduce_bytes(FieldBytes::from_slice(&digest[..32]));
    let lo = <Scalar as Reduce<U256>>::reduce_bytes(FieldBytes::from_slice(&digest[32..]));
    // 2^256 mod q, computed as (2^256 - 1) + 1
    let shift = <Scalar as Reduce<U256>>::reduce(U256::MAX) + Scalar::ONE;
    hi * shift + lo
}

// -----------------------------------------------------------------------------
// AEAD
// -----------------------------------------------------------------------------

// AES-128-GCM with the protocol's 16-byte IV. Every key is derived from
// single-use per-entry material, which is what makes the fixed IV acceptable.
type EntryCipher = AesGcm<Aes128, U16>;

/// Encrypt, returning ciphertext body and tag separately.
pub fn aead_encrypt(
    key: &[u8],
    iv: &[u8; 16],
    plaintext: &[u8],
) -> Result<(Vec<u8>, Vec<u8>), CryptoError> {
    let cipher = EntryCipher::new_from_slice(key).map_err(|_| CryptoError::Aead)?;
    let mut body = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(GenericArray::from_slice(iv), b"", &mut body)
        .map_err(|_| CryptoError::Aead)?;
    Ok((body, tag.to_vec()))
}

/// Decrypt and authenticate a detached (body, tag) pair.
pub fn aead_decrypt(
    key: &[u8],
    iv: &[u8; 16],
    body: &[u8],
    tag: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    if tag.len() != 16 {
        return Err(CryptoError::Aead);
    }
    let cipher = EntryCipher::new_from_slice(key).map_err(|_| CryptoError::Aead)?;
    let mut plaintext = body.to_vec();
    cipher
        .decrypt_in_place_detached(
            GenericArray::from_slice(iv),
            b"",
            &mut plaintext,
            GenericArray::from_slice(tag),
        )
        .map_err(|_| CryptoError::Aead)?;
    Ok(plaintext)
}
