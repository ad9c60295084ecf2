use balsa::avl_tree::AvlTree;
use balsa::node_allocator::{NodeAllocatorMap, OrderedNodeAllocatorMap, SENTINEL};
use rand::seq::SliceRandom;
use rand::thread_rng;

#[test]
fn single_rotation_on_ascending_insert() {
    // 30, 20, 10 leans left twice; one right rotation recenters it.
    let mut tree = AvlTree::<u64, u64, 8>::new();
    for key in [30, 20, 10] {
        tree.insert(key, key);
    }
    let root = tree.root as u32;
    assert_eq!(tree.get_node(root).key, 20);
    assert_eq!(tree.get_node(tree.get_left(root)).key, 10);
    assert_eq!(tree.get_node(tree.get_right(root)).key, 30);
    assert!(tree.is_balanced());
}

#[test]
fn double_rotation_on_zigzag_insert() {
    // 10, 30, 20 needs the two-step rotation to surface the middle key.
    let mut tree = AvlTree::<u64, u64, 8>::new();
    for key in [10, 30, 20] {
        tree.insert(key, key);
    }
    let root = tree.root as u32;
    assert_eq!(tree.get_node(root).key, 20);
    assert_eq!(tree.get_node(tree.get_left(root)).key, 10);
    assert_eq!(tree.get_node(tree.get_right(root)).key, 30);
    assert!(tree.is_balanced());
}

#[test]
fn traversal_orders() {
    let mut tree = AvlTree::<u64, u64, 8>::new();
    for key in [30, 20, 10] {
        tree.insert(key, key * 10);
    }
    assert_eq!(tree.inorder(), vec![(10, 100), (20, 200), (30, 300)]);
    assert_eq!(tree.preorder(), vec![(20, 200), (10, 100), (30, 300)]);
    assert_eq!(tree.postorder(), vec![(10, 100), (30, 300), (20, 200)]);
}

#[test]
fn height_stays_within_avl_bound() {
    // 1.44 * log2(1000 + 2) is about 14.35.
    let mut tree = AvlTree::<u64, u64, 1024>::new();
    for key in 0..1000u64 {
        tree.insert(key, key);
        assert!(tree.is_balanced());
    }
    assert_eq!(tree.len(), 1000);
    assert!(tree.height() <= 14);

    let inorder = tree.inorder();
    assert_eq!(inorder.len(), 1000);
    assert!(inorder.windows(2).all(|w| w[0].0 < w[1].0));
}

#[test]
fn stays_balanced_under_random_churn() {
    let mut tree = AvlTree::<u64, u64, 1024>::new();
    let mut rng = thread_rng();
    let mut keys: Vec<u64> = (0..1000).collect();
    keys.shuffle(&mut rng);
    for &key in keys.iter() {
        tree.insert(key, key);
    }
    keys.shuffle(&mut rng);
    for key in keys.drain(..500) {
        assert_eq!(tree.remove(&key), Some(key));
        assert!(tree.is_balanced());
    }
    assert_eq!(tree.len(), 500);
    let inorder = tree.inorder();
    assert!(inorder.windows(2).all(|w| w[0].0 < w[1].0));
}

#[test]
fn duplicate_insert_overwrites_value() {
    let mut tree = AvlTree::<u64, u64, 8>::new();
    let first = tree.insert(5, 1).unwrap();
    let second = tree.insert(5, 2).unwrap();
    assert_eq!(first, second);
    assert_eq!(tree.len(), 1);
    assert_eq!(tree.get(&5), Some(&2));
}

#[test]
fn remove_missing_key_is_a_no_op() {
    let mut tree = AvlTree::<u64, u64, 8>::new();
    assert_eq!(tree.remove(&7), None);
    tree.insert(7, 7);
    assert_eq!(tree.remove(&7), Some(7));
    assert_eq!(tree.remove(&7), None);
    assert_eq!(tree.len(), 0);
    assert_eq!(tree.root as u32, SENTINEL);
}

#[test]
fn rejects_inserts_past_capacity() {
    let mut tree = AvlTree::<u64, u64, 4>::new();
    assert_eq!(tree.capacity(), 3);
    for key in 0..3u64 {
        assert!(tree.insert(key, key).is_some());
    }
    assert!(tree.insert(3, 3).is_none());
    // Overwriting an existing key still works at capacity.
    assert!(tree.insert(1, 100).is_some());
    assert_eq!(tree.get(&1), Some(&100));
}

#[test]
fn min_max_and_indexing() {
    let mut tree = AvlTree::<u64, u64, 64>::new();
    for key in [8, 3, 11, 1, 6, 9, 14u64] {
        tree.insert(key, key * 2);
    }
    assert_eq!(tree.find_min(), Some(&2));
    assert_eq!(tree.find_max(), Some(&28));
    assert_eq!(tree.get_min(), Some((1, 2)));
    assert_eq!(tree.get_max(), Some((14, 28)));
    assert_eq!(tree[&6], 12);
    tree[&6] = 13;
    assert_eq!(tree[&6], 13);
}

#[test]
fn iterator_walks_both_directions() {
    let mut tree = AvlTree::<u64, u64, 64>::new();
    for key in [5, 2, 8, 1, 3, 7, 9u64] {
        tree.insert(key, key);
    }
    let forward: Vec<u64> = tree.iter().map(|(k, _)| *k).collect();
    assert_eq!(forward, vec![1, 2, 3, 5, 7, 8, 9]);
    let backward: Vec<u64> = (&tree).into_iter().rev().map(|(k, _)| *k).collect();
    assert_eq!(backward, vec![9, 8, 7, 5, 3, 2, 1]);

    for (_, value) in tree.iter_mut() {
        *value += 1;
    }
    assert_eq!(tree.get(&5), Some(&6));
}
