use crate::crypto::{
    CryptoError, point_bytes, point_from_bytes, random_scalar, scalar_bytes, scalar_from_bytes,
};
use crate::encodings::{ascii2bytes, bytes2ascii, pack_bytes, unpack_bytes};
use k256::{ProjectivePoint, Scalar};
use std::collections::BTreeMap;

/// Process-wide cryptographic configuration. Immutable after initialization;
/// every size is in bytes.
#[derive(Clone, Debug)]
pub struct PublicParams {
    pub enc_key_size: usize,
    pub lookup_key_size: usize,
    pub nonce_size: usize,
}

static DEFAULT_PARAMS: PublicParams = PublicParams {
    enc_key_size: 16,
    lookup_key_size: 8,
    nonce_size: 16,
};

impl PublicParams {
    pub fn get_default() -> &'static PublicParams {
        &DEFAULT_PARAMS
    }
}

impl Default for PublicParams {
    fn default() -> Self {
        DEFAULT_PARAMS.clone()
    }
}

/// A keypair on the active group. Views of other users hold only the public
/// half.
#[derive(Clone, Debug, PartialEq)]
pub struct Keypair {
    pub pk: ProjectivePoint,
    pub sk: Option<Scalar>,
}

impl Keypair {
    pub fn generate() -> Self {
        let sk = random_scalar();
        Keypair {
            pk: ProjectivePoint::GENERATOR * sk,
            sk: Some(sk),
        }
    }

    pub fn public_only(pk: ProjectivePoint) -> Self {
        Keypair { pk, sk: None }
    }

    pub fn sk(&self) -> Result<&Scalar, CryptoError> {
        self.sk.as_ref().ok_or(CryptoError::MissingKey("secret"))
    }
}

/// Per-owner key bundle. Core operations take the acting party's LocalParams
/// explicitly; there is no ambient default beyond PublicParams.
#[derive(Clone, Debug, Default)]
pub struct LocalParams {
    pub vrf: Option<Keypair>,
    pub sig: Option<Keypair>,
    pub dh: Option<Keypair>,
    pub rescue: Option<Keypair>,
    pub prf: Option<Vec<u8>>,
}

impl LocalParams {
    /// Generate a fresh owner bundle.
    pub fn generate() -> Self {
        LocalParams {
            vrf: Some(Keypair::generate()),
            sig: Some(Keypair::generate()),
            dh: Some(Keypair::generate()),
            rescue: Some(Keypair::generate()),
            prf: None,
        }
    }

    pub fn require_vrf(&self) -> Result<&Keypair, CryptoError> {
        self.vrf.as_ref().ok_or(CryptoError::MissingKey("vrf"))
    }

    pub fn require_sig(&self) -> Result<&Keypair, CryptoError> {
        self.sig.as_ref().ok_or(CryptoError::MissingKey("sig"))
    }

    pub fn require_dh(&self) -> Result<&Keypair, CryptoError> {
        self.dh.as_ref().ok_or(CryptoError::MissingKey("dh"))
    }

    /// ASCII-safe export of the public keys, keyed by "<slot>_pk".
    pub fn public_export(&self) -> BTreeMap<String, String> {
        let mut exported = BTreeMap::new();
        for (name, slot) in self.slots() {
            if let Some(keypair) = slot {
                exported.insert(format!("{name}_pk"), point2ascii(&keypair.pk));
            }
        }
        exported
    }

    /// Public export plus "<slot>_sk" entries for every present secret.
    pub fn private_export(&self) -> BTreeMap<String, String> {
        let mut exported = self.public_export();
        for (name, slot) in self.slots() {
            if let Some(keypair) = slot {
                if let Some(sk) = &keypair.sk {
                    exported.insert(format!("{name}_sk"), scalar2ascii(sk));
                }
            }
        }
        if let Some(prf) = &self.prf {
            exported.insert("prf_sk".to_string(), bytes2ascii(prf));
        }
        exported
    }

    /// Rebuild a LocalParams from an exported dictionary. Absent slots stay
    /// absent; a secret without its public half has the public key derived.
    pub fn from_dict(exported: &BTreeMap<String, String>) -> Result<Self, CryptoError> {
        Ok(LocalParams {
            vrf: load_keypair(exported, "vrf")?,
            sig: load_keypair(exported, "sig")?,
            dh: load_keypair(exported, "dh")?,
            rescue: load_keypair(exported, "rescue")?,
            prf: exported
                .get("prf_sk")
                .map(|s| ascii2bytes(s).map_err(|_| CryptoError::InvalidEncoding))
                .transpose()?,
        })
    }

    fn slots(&self) -> [(&'static str, &Option<Keypair>); 4] {
        [
            ("vrf", &self.vrf),
            ("sig", &self.sig),
            ("dh", &self.dh),
            ("rescue", &self.rescue),
        ]
    }
}

fn load_keypair(
    exported: &BTreeMap<String, String>,
    prefix: &str,
) -> Result<Option<Keypair>, CryptoError> {
    let pk = exported
        .get(&format!("{prefix}_pk"))
        .map(|s| ascii2point(s))
        .transpose()?;
    let sk = exported
        .get(&format!("{prefix}_sk"))
        .map(|s| ascii2scalar(s))
        .transpose()?;
    Ok(match (pk, sk) {
        (Some(pk), sk) => Some(Keypair { pk, sk }),
        (None, Some(sk)) => Some(Keypair {
            pk: ProjectivePoint::GENERATOR * sk,
            sk: Some(sk),
        }),
        (None, None) => None,
    })
}

fn point2ascii(point: &ProjectivePoint) -> String {
    // pack_bytes of a fixed-width encoding cannot fail
    bytes2ascii(&pack_bytes(&point_bytes(point)).unwrap_or_default())
}

fn ascii2point(s: &str) -> Result<ProjectivePoint, CryptoError> {
    let packed = ascii2bytes(s).map_err(|_| CryptoError::InvalidEncoding)?;
    let raw = unpack_bytes(&packed).map_err(|_| CryptoError::InvalidEncoding)?;
    point_from_bytes(&raw)
}

fn scalar2ascii(scalar: &Scalar) -> String {
    bytes2ascii(&pack_bytes(&scalar_bytes(scalar)).unwrap_or_default())
}

fn ascii2scalar(s: &str) -> Result<Scalar, CryptoError> {
    let packed = ascii2bytes(s).map_err(|_| CryptoError::InvalidEncoding)?;
    let raw = unpack_bytes(&packed).map_err(|_| CryptoError::InvalidEncoding)?;
    scalar_from_bytes(&raw)
}
