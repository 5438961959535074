use thiserror::Error;

#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("invalid base58 string")]
    Base58,
    #[error("malformed packed value: {0}")]
    Packing(#[from] bincode::Error),
}

/// Encode bytes as an ASCII-safe base58 string.
pub fn bytes2ascii(data: &[u8]) -> String {
    bs58::encode(data).into_string()
}

/// Decode a base58 ASCII string back to bytes.
pub fn ascii2bytes(s: &str) -> Result<Vec<u8>, EncodingError> {
    bs58::decode(s).into_vec().map_err(|_| EncodingError::Base58)
}

// Canonical binary packing. bincode with its default configuration is
// deterministic for a fixed shape, which is all the wire format needs:
// every packed value here is a byte string, a pair, or a list of byte strings.

pub fn pack_bytes(data: &[u8]) -> Result<Vec<u8>, EncodingError> {
    Ok(bincode::serialize(&data)?)
}

pub fn unpack_bytes(packed: &[u8]) -> Result<Vec<u8>, EncodingError> {
    Ok(bincode::deserialize(packed)?)
}

pub fn pack_pair(first: &[u8], second: &[u8]) -> Result<Vec<u8>, EncodingError> {
    Ok(bincode::serialize(&(first, second))?)
}

pub fn unpack_pair(packed: &[u8]) -> Result<(Vec<u8>, Vec<u8>), EncodingError> {
    Ok(bincode::deserialize(packed)?)
}

pub fn pack_list(items: &[Vec<u8>]) -> Result<Vec<u8>, EncodingError> {
    Ok(bincode::serialize(&items)?)
}

pub fn unpack_list(packed: &[u8]) -> Result<Vec<Vec<u8>>, EncodingError> {
    Ok(bincode::deserialize(packed)?)
}
