#![no_main]
use balsa::node_allocator::NodeAllocatorMap;
use balsa::treap::Treap;
use lib_balsa_fuzz::{assert_sorted, MapAction};
use libfuzzer_sys::fuzz_target;

const MAX_SIZE: usize = 1001;

fuzz_target!(|actions: Vec<MapAction>| {
    let mut treap = Treap::<u64, u64, MAX_SIZE>::new();
    for action in actions {
        match action {
            MapAction::Insert { key, value } => {
                treap.insert(key, value);
            }
            MapAction::Remove { key } => {
                treap.remove(&key);
            }
            MapAction::Replace { key, value } => {
                if let Some(slot) = treap.get_mut(&key) {
                    *slot = value;
                }
            }
            MapAction::Get { key } => {
                let _ = treap.get(&key);
            }
            MapAction::Iterate => {
                let keys: Vec<u64> = treap.iter().map(|(k, _)| *k).collect();
                assert_sorted(&keys);
            }
        }
        assert!(treap.is_heap_ordered());
    }
});
