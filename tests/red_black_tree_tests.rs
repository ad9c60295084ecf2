use balsa::node_allocator::{FromSlice, NodeAllocatorMap, SENTINEL};
use balsa::red_black_tree::{Color, RedBlackTree};
use rand::seq::SliceRandom;
use rand::thread_rng;

#[test]
fn ascending_inserts_stay_valid() {
    // A sorted feed is the worst case for a plain BST; the color rules must
    // keep bending it back toward the middle.
    let mut tree = RedBlackTree::<u64, u64, 64>::new();
    for key in 1..=20u64 {
        tree.insert(key, key);
        assert!(tree.is_valid_red_black_tree());
    }
    assert_eq!(tree.get_color(tree.root as u32), Color::Black);
    assert!(tree.validate_black_height() > 0);

    let inorder = tree.inorder_traversal();
    assert_eq!(inorder.len(), 20);
    assert!(inorder.windows(2).all(|w| w[0].0 < w[1].0));
}

#[test]
fn height_stays_within_red_black_bound() {
    // 2 * log2(10000 + 1) is about 26.6.
    type Tree = RedBlackTree<u64, u64, 16384>;
    let mut buf = vec![0u8; std::mem::size_of::<Tree>()];
    let tree = Tree::new_from_slice(&mut buf);
    let mut keys: Vec<u64> = (0..10000).collect();
    keys.shuffle(&mut thread_rng());
    for &key in keys.iter() {
        tree.insert(key, key);
    }
    assert_eq!(tree.len(), 10000);
    assert!(tree.height() <= 26);
    assert!(tree.is_valid_red_black_tree());
}

#[test]
fn stays_valid_under_random_churn() {
    let mut tree = RedBlackTree::<u64, u64, 2048>::new();
    let mut rng = thread_rng();
    let mut keys: Vec<u64> = (0..1000).collect();
    keys.shuffle(&mut rng);
    for &key in keys.iter() {
        tree.insert(key, key);
    }
    keys.shuffle(&mut rng);
    for key in keys.drain(..500) {
        assert_eq!(tree.remove(&key), Some(key));
        assert!(tree.is_valid_red_black_tree());
    }
    assert_eq!(tree.len(), 500);
    let inorder = tree.inorder_traversal();
    assert!(inorder.windows(2).all(|w| w[0].0 < w[1].0));
}

#[test]
fn duplicate_insert_leaves_value_untouched() {
    let mut tree = RedBlackTree::<u64, u64, 8>::new();
    let first = tree.insert(5, 1).unwrap();
    let second = tree.insert(5, 2).unwrap();
    assert_eq!(first, second);
    assert_eq!(tree.len(), 1);
    assert_eq!(tree.get(&5), Some(&1));
}

#[test]
fn remove_missing_key_is_a_no_op() {
    let mut tree = RedBlackTree::<u64, u64, 8>::new();
    assert_eq!(tree.remove(&7), None);
    tree.insert(7, 7);
    assert_eq!(tree.remove(&7), Some(7));
    assert_eq!(tree.remove(&7), None);
    assert_eq!(tree.len(), 0);
    assert_eq!(tree.root as u32, SENTINEL);
    assert!(tree.is_valid_red_black_tree());
}

#[test]
fn removing_the_root_repeatedly_stays_valid() {
    let mut tree = RedBlackTree::<u64, u64, 64>::new();
    for key in [13, 8, 17, 1, 11, 15, 25, 6, 22, 27u64] {
        tree.insert(key, key);
    }
    while tree.len() > 0 {
        let root_key = tree.get_node(tree.root as u32).key;
        assert_eq!(tree.remove(&root_key), Some(root_key));
        assert!(tree.is_valid_red_black_tree());
    }
    assert_eq!(tree.root as u32, SENTINEL);
}

#[test]
fn rejects_inserts_past_capacity() {
    let mut tree = RedBlackTree::<u64, u64, 4>::new();
    assert_eq!(tree.capacity(), 3);
    for key in 0..3u64 {
        assert!(tree.insert(key, key).is_some());
    }
    assert!(tree.insert(3, 3).is_none());
    assert!(tree.is_valid_red_black_tree());
}

#[test]
fn iterator_walks_both_directions() {
    let mut tree = RedBlackTree::<u64, u64, 64>::new();
    for key in [5, 2, 8, 1, 3, 7, 9u64] {
        tree.insert(key, key);
    }
    let forward: Vec<u64> = tree.iter().map(|(k, _)| *k).collect();
    assert_eq!(forward, vec![1, 2, 3, 5, 7, 8, 9]);
    let backward: Vec<u64> = (&tree).into_iter().rev().map(|(k, _)| *k).collect();
    assert_eq!(backward, vec![9, 8, 7, 5, 3, 2, 1]);

    for (_, value) in tree.iter_mut() {
        *value *= 10;
    }
    assert_eq!(tree[&5], 50);
}
