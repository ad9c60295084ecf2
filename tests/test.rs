use balsa::avl_tree::AvlTree;
use balsa::error::TreeError;
use balsa::node_allocator::{FromSlice, NodeAllocatorMap, ZeroCopy};
use balsa::red_black_tree::RedBlackTree;
use balsa::treap::Treap;
use bytemuck::{Pod, Zeroable};
use itertools::Itertools;
use rand::seq::SliceRandom;
use rand::{thread_rng, Rng};
use std::collections::BTreeMap;

const MAX_SIZE: usize = 20001;

#[repr(C)]
#[derive(Default, Copy, Clone, PartialEq, Eq, Debug)]
struct Widget {
    a: u64,
    b: u64,
    size: u64,
}

unsafe impl Zeroable for Widget {}
unsafe impl Pod for Widget {}

impl Widget {
    fn new_random(rng: &mut impl Rng) -> Self {
        Self {
            a: rng.gen::<u64>(),
            b: rng.gen::<u64>(),
            size: rng.gen::<u64>(),
        }
    }
}

fn fresh_key(rng: &mut impl Rng, oracle: &BTreeMap<u64, Widget>) -> u64 {
    loop {
        let key = rng.gen::<u64>();
        if !oracle.contains_key(&key) {
            return key;
        }
    }
}

// Runs a long randomized session against BTreeMap as the oracle: fill to
// capacity, a mixed workload of inserts, removals and in-place updates, then
// a full drain. Value replacement goes through get_mut because the
// duplicate-insert policy differs between the containers.
fn simulate<T>()
where
    T: FromSlice + ZeroCopy + NodeAllocatorMap<u64, Widget>,
{
    let mut buf = vec![0u8; std::mem::size_of::<T>()];
    let tree = T::new_from_slice(&mut buf);
    let mut oracle = BTreeMap::new();
    let mut rng = thread_rng();
    let mut keys = vec![];

    for _ in 0..tree.capacity() {
        let key = fresh_key(&mut rng, &oracle);
        let widget = Widget::new_random(&mut rng);
        assert!(tree.insert(key, widget).is_some());
        oracle.insert(key, widget);
        keys.push(key);
    }
    assert_eq!(tree.len(), tree.capacity());

    let overflow_key = fresh_key(&mut rng, &oracle);
    assert!(tree.insert(overflow_key, Widget::default()).is_none());
    assert!(!tree.contains(&overflow_key));

    for _ in 0..100_000 {
        let sample = rng.gen::<f64>();
        if sample < 0.33 {
            if keys.is_empty() {
                continue;
            }
            let j = rng.gen_range(0, keys.len());
            let key = keys.swap_remove(j);
            assert_eq!(tree.remove(&key).unwrap(), oracle.remove(&key).unwrap());
            assert_eq!(tree.remove(&key), None);
        } else if sample < 0.66 {
            if keys.is_empty() {
                continue;
            }
            let j = rng.gen_range(0, keys.len());
            let key = keys[j];
            let widget = Widget::new_random(&mut rng);
            *tree.get_mut(&key).unwrap() = widget;
            oracle.insert(key, widget);
        } else {
            if tree.len() == tree.capacity() {
                continue;
            }
            let key = fresh_key(&mut rng, &oracle);
            let widget = Widget::new_random(&mut rng);
            assert!(tree.insert(key, widget).is_some());
            oracle.insert(key, widget);
            keys.push(key);
        }
    }

    assert_eq!(tree.len(), oracle.len());
    for (key, widget) in oracle.iter() {
        assert_eq!(tree.get(key).unwrap(), widget);
    }
    for ((k1, _), (k2, _)) in tree.iter().tuple_windows() {
        assert!(k1 < k2);
    }
    for ((k1, v1), (k2, v2)) in tree.iter().zip(oracle.iter()) {
        assert_eq!(k1, k2);
        assert_eq!(v1, v2);
    }

    keys.shuffle(&mut rng);
    for key in keys.drain(..) {
        assert_eq!(tree.remove(&key).unwrap(), oracle.remove(&key).unwrap());
    }
    assert_eq!(tree.len(), 0);
    assert!(tree.iter().next().is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn simulate_avl_tree() {
    simulate::<AvlTree<u64, Widget, MAX_SIZE>>()
}

#[tokio::test(flavor = "multi_thread")]
async fn simulate_red_black_tree() {
    simulate::<RedBlackTree<u64, Widget, MAX_SIZE>>()
}

#[tokio::test(flavor = "multi_thread")]
async fn simulate_treap() {
    simulate::<Treap<u64, Widget, MAX_SIZE>>()
}

#[test]
fn from_slice_rejects_short_buffer() {
    type Tree = RedBlackTree<u64, Widget, 128>;
    let mut buf = vec![0u8; 64];
    match Tree::try_new_from_slice(&mut buf) {
        Err(TreeError::BufferTooSmall { actual, expected }) => {
            assert_eq!(actual, 64);
            assert_eq!(expected, std::mem::size_of::<Tree>());
        }
        other => panic!("unexpected result: {:?}", other.map(|_| ())),
    }
}
