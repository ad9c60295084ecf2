use balsa::node_allocator::{NodeAllocatorMap, SENTINEL};
use balsa::treap::Treap;
use rand::seq::SliceRandom;
use rand::thread_rng;

#[test]
fn fixed_key_set_keeps_both_orders() {
    let mut treap = Treap::<u64, u64, 16>::new();
    for key in [50, 30, 70, 20, 40, 60, 80u64] {
        treap.insert(key, key);
        assert!(treap.is_heap_ordered());
    }
    let inorder = treap.inorder_traversal();
    assert_eq!(
        inorder.iter().map(|(k, _)| *k).collect::<Vec<u64>>(),
        vec![20, 30, 40, 50, 60, 70, 80]
    );
}

#[test]
fn same_seed_same_shape() {
    let mut a = Treap::<u64, u64, 512>::new_with_seed(42);
    let mut b = Treap::<u64, u64, 512>::new_with_seed(42);
    for key in 0..300u64 {
        a.insert(key, key);
        b.insert(key, key);
    }
    assert_eq!(a.height(), b.height());
    for key in 0..300u64 {
        let (i, j) = (a.get_addr(&key), b.get_addr(&key));
        assert_eq!(a.get_priority(i), b.get_priority(j));
    }
}

#[test]
fn different_seeds_diverge() {
    let mut a = Treap::<u64, u64, 512>::new_with_seed(1);
    let mut b = Treap::<u64, u64, 512>::new_with_seed(2);
    for key in 0..300u64 {
        a.insert(key, key);
        b.insert(key, key);
    }
    let diverged = (0..300u64)
        .any(|key| a.get_priority(a.get_addr(&key)) != b.get_priority(b.get_addr(&key)));
    assert!(diverged);
    assert!(a.is_heap_ordered() && b.is_heap_ordered());
}

#[test]
fn height_stays_within_expected_bound() {
    // 4 * log2(1000) is about 39.9; the default seed lands well under it.
    let mut treap = Treap::<u64, u64, 1024>::new();
    for key in 0..1000u64 {
        treap.insert(key, key);
    }
    assert_eq!(treap.len(), 1000);
    assert!(treap.height() < 40);
    assert!(treap.is_heap_ordered());
    let inorder = treap.inorder_traversal();
    assert!(inorder.windows(2).all(|w| w[0].0 < w[1].0));
}

#[test]
fn equal_priorities_degrade_to_a_plain_bst() {
    // With every priority tied, no rotation ever fires and the ascending
    // feed builds a right-leaning chain. Both orders still hold.
    let mut treap = Treap::<u64, u64, 64>::new();
    for key in 0..50u64 {
        treap.insert_with_priority(key, key, 7);
    }
    assert_eq!(treap.height(), 50);
    assert!(treap.is_heap_ordered());
    let inorder = treap.inorder_traversal();
    assert!(inorder.windows(2).all(|w| w[0].0 < w[1].0));
}

#[test]
fn removal_rotates_without_breaking_either_order() {
    let mut treap = Treap::<u64, u64, 1024>::new_with_seed(9);
    let mut rng = thread_rng();
    let mut keys: Vec<u64> = (0..1000).collect();
    keys.shuffle(&mut rng);
    for &key in keys.iter() {
        treap.insert(key, key);
    }
    keys.shuffle(&mut rng);
    for key in keys.drain(..500) {
        assert_eq!(treap.remove(&key), Some(key));
        assert!(treap.is_heap_ordered());
    }
    assert_eq!(treap.len(), 500);
    let inorder = treap.inorder_traversal();
    assert!(inorder.windows(2).all(|w| w[0].0 < w[1].0));
}

#[test]
fn duplicate_insert_leaves_value_untouched() {
    let mut treap = Treap::<u64, u64, 8>::new();
    let first = treap.insert(5, 1).unwrap();
    let second = treap.insert(5, 2).unwrap();
    assert_eq!(first, second);
    assert_eq!(treap.len(), 1);
    assert_eq!(treap.get(&5), Some(&1));
}

#[test]
fn remove_missing_key_is_a_no_op() {
    let mut treap = Treap::<u64, u64, 8>::new();
    assert_eq!(treap.remove(&7), None);
    treap.insert(7, 7);
    assert_eq!(treap.remove(&7), Some(7));
    assert_eq!(treap.remove(&7), None);
    assert_eq!(treap.len(), 0);
    assert_eq!(treap.root as u32, SENTINEL);
}

#[test]
fn rejects_inserts_past_capacity() {
    let mut treap = Treap::<u64, u64, 4>::new();
    assert_eq!(treap.capacity(), 3);
    for key in 0..3u64 {
        assert!(treap.insert(key, key).is_some());
    }
    assert!(treap.insert(3, 3).is_none());
    assert!(treap.is_heap_ordered());
}

#[test]
fn iterator_and_indexing() {
    let mut treap = Treap::<u64, u64, 64>::new();
    for key in [5, 2, 8, 1, 3, 7, 9u64] {
        treap.insert(key, key);
    }
    let forward: Vec<u64> = treap.iter().map(|(k, _)| *k).collect();
    assert_eq!(forward, vec![1, 2, 3, 5, 7, 8, 9]);

    for (_, value) in treap.iter_mut() {
        *value += 100;
    }
    assert_eq!(treap[&5], 105);
}
