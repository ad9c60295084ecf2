#![no_main]
use balsa::node_allocator::NodeAllocatorMap;
use balsa::red_black_tree::RedBlackTree;
use lib_balsa_fuzz::{assert_sorted, MapAction};
use libfuzzer_sys::fuzz_target;

const MAX_SIZE: usize = 1001;

fuzz_target!(|actions: Vec<MapAction>| {
    let mut tree = RedBlackTree::<u64, u64, MAX_SIZE>::new();
    for action in actions {
        match action {
            MapAction::Insert { key, value } => {
                tree.insert(key, value);
            }
            MapAction::Remove { key } => {
                tree.remove(&key);
            }
            MapAction::Replace { key, value } => {
                if let Some(slot) = tree.get_mut(&key) {
                    *slot = value;
                }
            }
            MapAction::Get { key } => {
                let _ = tree.get(&key);
            }
            MapAction::Iterate => {
                let keys: Vec<u64> = tree.iter().map(|(k, _)| *k).collect();
                assert_sorted(&keys);
            }
        }
        assert!(tree.is_valid_red_black_tree());
    }
});
