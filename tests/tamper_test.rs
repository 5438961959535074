use claimchain::core::encode_claim;
use claimchain::crypto::hash_bytes;
use claimchain::error::Error;
use claimchain::{Chain, LocalParams, MemStore, State, View};
use std::sync::Arc;

const ZERO_NONCE: [u8; 16] = [0u8; 16];

#[test]
fn test_tampered_claim_body_is_detected() {
    let _ = env_logger::builder().is_test(true).try_init();
    let owner = LocalParams::generate();
    let reader = LocalParams::generate();

    let mut state = State::new(None);
    state.set_claim(b"x", b"y");
    state.grant_access(&reader.require_dh().unwrap().pk, [b"x".as_slice()]);

    let mem = MemStore::new();
    let mut chain = Chain::new(Arc::new(mem.clone()));
    state
        .commit(&owner, &mut chain, None, Some(ZERO_NONCE))
        .unwrap();

    // the claim lookup key is deterministic, so the owner can recompute it
    // and find the encrypted entry in the store
    let (_, claim_key, _) = encode_claim(&owner, &ZERO_NONCE, b"x", b"y").unwrap();
    let blob = state.enc_items().unwrap().get(&claim_key).unwrap().clone();

    // flip one byte inside the ciphertext body (past the length prefix)
    let mut tampered = blob.clone();
    tampered[10] ^= 1;
    mem.corrupt(&hash_bytes(&blob), tampered);

    let view = View::new(&reader, &chain, None).unwrap();
    match view.lookup(b"x") {
        Err(Error::Crypto(_)) | Err(Error::WrongVrfValue) => {}
        other => panic!("tampering must not go unnoticed, got {other:?}"),
    }
}

#[test]
fn test_tampered_tag_is_detected() {
    let _ = env_logger::builder().is_test(true).try_init();
    let owner = LocalParams::generate();
    let reader = LocalParams::generate();

    let mut state = State::new(None);
    state.set_claim(b"x", b"y");
    state.grant_access(&reader.require_dh().unwrap().pk, [b"x".as_slice()]);

    let mem = MemStore::new();
    let mut chain = Chain::new(Arc::new(mem.clone()));
    state
        .commit(&owner, &mut chain, None, Some(ZERO_NONCE))
        .unwrap();

    let (_, claim_key, _) = encode_claim(&owner, &ZERO_NONCE, b"x", b"y").unwrap();
    let blob = state.enc_items().unwrap().get(&claim_key).unwrap().clone();

    // flip the last byte, which sits in the authentication tag
    let mut tampered = blob.clone();
    let last = tampered.len() - 1;
    tampered[last] ^= 1;
    mem.corrupt(&hash_bytes(&blob), tampered);

    let view = View::new(&reader, &chain, None).unwrap();
    match view.lookup(b"x") {
        Err(Error::Crypto(_)) | Err(Error::WrongVrfValue) => {}
        other => panic!("tampering must not go unnoticed, got {other:?}"),
    }
}
