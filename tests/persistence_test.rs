use claimchain::{Chain, LocalParams, ObjectStore, RedbStore, State, View};
use std::fs;
use std::sync::Arc;

#[test]
fn test_redb_persistence() {
    let _ = env_logger::builder().is_test(true).try_init();
    let db_path = "./target/test_db_persistence.redb";
    let _ = fs::remove_file(db_path);

    let owner = LocalParams::generate();
    let exported_keys = serde_json::to_string(&owner.private_export()).unwrap();

    // 1. First run: commit a claim into a fresh database
    let head;
    {
        let store: Arc<dyn ObjectStore> = Arc::new(RedbStore::open(db_path).unwrap());
        let mut chain = Chain::new(store);
        let mut state = State::new(None);
        state.set_claim(b"marios", b"test");
        head = state.commit(&owner, &mut chain, None, None).unwrap();
    } // store dropped, DB closed

    // 2. Second run: reopen, reload keys, walk the chain back from the head
    {
        let restored: std::collections::BTreeMap<String, String> =
            serde_json::from_str(&exported_keys).unwrap();
        let owner = LocalParams::from_dict(&restored).unwrap();

        let store: Arc<dyn ObjectStore> = Arc::new(RedbStore::open(db_path).unwrap());
        let chain = Chain::load(store, head).unwrap();
        assert_eq!(chain.head(), Some(head));

        let view = View::new(&owner, &chain, None).unwrap();
        view.validate().unwrap();
        assert_eq!(view.lookup(b"marios").unwrap(), b"test");
    }

    let _ = fs::remove_file(db_path);
}
