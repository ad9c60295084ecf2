use bytemuck::{Pod, Zeroable};
use std::cmp::max;
use std::ops::{Index, IndexMut};

use crate::error::TreeError;
use crate::node_allocator::{
    FromSlice, NodeAllocator, NodeAllocatorMap, ZeroCopy, SENTINEL,
};

// The number of registers (the last register is currently not in use).
const REGISTERS: usize = 4;

// Per-node registers:
// 0 - left child
// 1 - right child
// 2 - heap priority
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Field {
    Left = 0,
    Right = 1,
    Priority = 2,
}

/// Seed used when none is supplied. Any fixed nonzero constant works; this
/// one is the 64-bit golden ratio.
const DEFAULT_SEED: u64 = 0x9E37_79B9_7F4A_7C15;

#[repr(C)]
#[derive(Default, Copy, Clone)]
pub struct TreapNode<
    K: PartialOrd + Copy + Clone + Default + Pod + Zeroable,
    V: Default + Copy + Clone + Pod + Zeroable,
> {
    pub key: K,
    pub value: V,
}

unsafe impl<
        K: PartialOrd + Copy + Clone + Default + Pod + Zeroable,
        V: Default + Copy + Clone + Pod + Zeroable,
    > Zeroable for TreapNode<K, V>
{
}
unsafe impl<
        K: PartialOrd + Copy + Clone + Default + Pod + Zeroable,
        V: Default + Copy + Clone + Pod + Zeroable,
    > Pod for TreapNode<K, V>
{
}

impl<
        K: PartialOrd + Copy + Clone + Default + Pod + Zeroable,
        V: Default + Copy + Clone + Pod + Zeroable,
    > TreapNode<K, V>
{
    pub fn new(key: K, value: V) -> Self {
        Self { key, value }
    }
}

/// Randomized search tree. Keys obey the BST order while priorities, drawn
/// from a tree-owned xorshift64* generator, obey the max-heap order; together
/// they keep the expected height logarithmic without any explicit balance
/// bookkeeping. Rotations are the only restructuring primitive, for insert
/// and delete alike.
#[repr(C)]
#[derive(Copy, Clone)]
pub struct Treap<
    K: PartialOrd + Copy + Clone + Default + Pod + Zeroable,
    V: Default + Copy + Clone + Pod + Zeroable,
    const MAX_SIZE: usize,
> {
    pub root: u64,
    rng_state: u64,
    allocator: NodeAllocator<TreapNode<K, V>, MAX_SIZE, REGISTERS>,
}

unsafe impl<
        K: PartialOrd + Copy + Clone + Default + Pod + Zeroable,
        V: Default + Copy + Clone + Pod + Zeroable,
        const MAX_SIZE: usize,
    > Zeroable for Treap<K, V, MAX_SIZE>
{
}
unsafe impl<
        K: PartialOrd + Copy + Clone + Default + Pod + Zeroable,
        V: Default + Copy + Clone + Pod + Zeroable,
        const MAX_SIZE: usize,
    > Pod for Treap<K, V, MAX_SIZE>
{
}
impl<
        K: PartialOrd + Copy + Clone + Default + Pod + Zeroable,
        V: Default + Copy + Clone + Pod + Zeroable,
        const MAX_SIZE: usize,
    > ZeroCopy for Treap<K, V, MAX_SIZE>
{
}

impl<
        K: PartialOrd + Copy + Clone + Default + Pod + Zeroable,
        V: Default + Copy + Clone + Pod + Zeroable,
        const MAX_SIZE: usize,
    > Default for Treap<K, V, MAX_SIZE>
{
    fn default() -> Self {
        Treap {
            root: SENTINEL as u64,
            rng_state: DEFAULT_SEED,
            allocator: NodeAllocator::<TreapNode<K, V>, MAX_SIZE, REGISTERS>::default(),
        }
    }
}

impl<
        K: PartialOrd + Copy + Clone + Default + Pod + Zeroable,
        V: Default + Copy + Clone + Pod + Zeroable,
        const MAX_SIZE: usize,
    > FromSlice for Treap<K, V, MAX_SIZE>
{
    fn try_new_from_slice(slice: &mut [u8]) -> Result<&mut Self, TreeError> {
        let tree = Self::try_load_mut_bytes(slice)?;
        tree.initialize();
        Ok(tree)
    }
}

impl<
        K: PartialOrd + Copy + Clone + Default + Pod + Zeroable,
        V: Default + Copy + Clone + Pod + Zeroable,
        const MAX_SIZE: usize,
    > NodeAllocatorMap<K, V> for Treap<K, V, MAX_SIZE>
{
    fn insert(&mut self, key: K, value: V) -> Option<u32> {
        let priority = self.next_priority();
        self.insert_internal(key, value, priority)
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        self._remove(key)
    }

    fn contains(&self, key: &K) -> bool {
        self.get_addr(key) != SENTINEL
    }

    fn get(&self, key: &K) -> Option<&V> {
        match self.get_addr(key) {
            SENTINEL => None,
            i => Some(&self.get_node(i).value),
        }
    }

    fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        match self.get_addr(key) {
            SENTINEL => None,
            i => Some(&mut self.get_node_mut(i).value),
        }
    }

    fn size(&self) -> usize {
        self.allocator.size as usize
    }

    fn len(&self) -> usize {
        self.allocator.size as usize
    }

    fn capacity(&self) -> usize {
        MAX_SIZE - 1
    }

    fn iter(&self) -> Box<dyn Iterator<Item = (&K, &V)> + '_> {
        Box::new(self._iter())
    }

    fn iter_mut(&mut self) -> Box<dyn Iterator<Item = (&K, &mut V)> + '_> {
        Box::new(self._iter_mut())
    }
}

impl<
        K: PartialOrd + Copy + Clone + Default + Pod + Zeroable,
        V: Default + Copy + Clone + Pod + Zeroable,
        const MAX_SIZE: usize,
    > Treap<K, V, MAX_SIZE>
{
    pub fn new() -> Self {
        Self::default()
    }

    /// A treap built from the same seed and the same operation sequence has
    /// the same shape; different seeds almost surely diverge.
    pub fn new_with_seed(seed: u64) -> Self {
        let mut treap = Self::default();
        treap.rng_state = if seed == 0 { DEFAULT_SEED } else { seed };
        treap
    }

    pub fn initialize(&mut self) {
        self.allocator.initialize();
        // A zeroed buffer carries no seed; xorshift cannot leave state 0.
        if self.rng_state == 0 {
            self.rng_state = DEFAULT_SEED;
        }
    }

    // xorshift64*
    fn next_priority(&mut self) -> u32 {
        let mut x = self.rng_state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.rng_state = x;
        (x.wrapping_mul(0x2545_F491_4F6C_DD1D) >> 32) as u32
    }

    pub fn get_node(&self, node: u32) -> &TreapNode<K, V> {
        self.allocator.get(node).get_value()
    }

    pub fn get_node_mut(&mut self, node: u32) -> &mut TreapNode<K, V> {
        self.allocator.get_mut(node).get_value_mut()
    }

    #[inline(always)]
    pub fn get_left(&self, node: u32) -> u32 {
        self.get_field(node, Field::Left)
    }

    #[inline(always)]
    pub fn get_right(&self, node: u32) -> u32 {
        self.get_field(node, Field::Right)
    }

    #[inline(always)]
    pub fn get_priority(&self, node: u32) -> u32 {
        self.get_field(node, Field::Priority)
    }

    #[inline(always)]
    fn get_field(&self, node: u32, register: Field) -> u32 {
        self.allocator.get_register(node, register as u32)
    }

    #[inline(always)]
    fn set_field(&mut self, node: u32, register: Field, value: u32) {
        self.allocator.set_register(node, value, register as u32);
    }

    pub fn get_addr(&self, key: &K) -> u32 {
        let mut cursor = self.root as u32;
        while cursor != SENTINEL {
            let cursor_key = self.get_node(cursor).key;
            cursor = if *key < cursor_key {
                self.get_left(cursor)
            } else if *key > cursor_key {
                self.get_right(cursor)
            } else {
                return cursor;
            };
        }
        SENTINEL
    }

    fn left_rotate(&mut self, index: u32) -> u32 {
        let pivot = self.get_right(index);
        self.set_field(index, Field::Right, self.get_left(pivot));
        self.set_field(pivot, Field::Left, index);
        pivot
    }

    fn right_rotate(&mut self, index: u32) -> u32 {
        let pivot = self.get_left(index);
        self.set_field(index, Field::Left, self.get_right(pivot));
        self.set_field(pivot, Field::Right, index);
        pivot
    }

    /// Inserts with an explicit priority instead of a drawn one. Useful for
    /// deterministic shapes; equal priorities everywhere degrade to a plain
    /// unbalanced BST without violating either ordering rule.
    pub fn insert_with_priority(&mut self, key: K, value: V, priority: u32) -> Option<u32> {
        self.insert_internal(key, value, priority)
    }

    fn insert_internal(&mut self, key: K, value: V, priority: u32) -> Option<u32> {
        let mut cursor = self.root as u32;
        if cursor == SENTINEL {
            let node = self.allocator.add_node(TreapNode::new(key, value));
            self.set_field(node, Field::Priority, priority);
            self.root = node as u64;
            return Some(node);
        }

        let mut path: Vec<(u32, Field)> = vec![];
        let node = loop {
            let cursor_key = self.get_node(cursor).key;
            let branch = if key < cursor_key {
                Field::Left
            } else if key > cursor_key {
                Field::Right
            } else {
                // Duplicate key: the existing node is left untouched.
                return Some(cursor);
            };
            let next = self.get_field(cursor, branch);
            path.push((cursor, branch));
            if next == SENTINEL {
                if self.len() >= self.capacity() {
                    return None;
                }
                let node = self.allocator.add_node(TreapNode::new(key, value));
                self.set_field(node, Field::Priority, priority);
                self.set_field(cursor, branch, node);
                break node;
            }
            cursor = next;
        };

        // Bubble the new node up while it outranks its parent. A strict
        // comparison keeps equal-priority inserts where the BST descent put
        // them.
        while let Some((parent, branch)) = path.pop() {
            if priority <= self.get_priority(parent) {
                break;
            }
            let risen = match branch {
                Field::Left => self.right_rotate(parent),
                _ => self.left_rotate(parent),
            };
            match path.last() {
                Some(&(grandparent, grandparent_branch)) => {
                    self.set_field(grandparent, grandparent_branch, risen)
                }
                None => self.root = risen as u64,
            }
        }
        Some(node)
    }

    fn _remove(&mut self, key: &K) -> Option<V> {
        let mut parent = SENTINEL;
        let mut branch = Field::Left;
        let mut target = self.root as u32;
        while target != SENTINEL {
            let target_key = self.get_node(target).key;
            if *key < target_key {
                parent = target;
                branch = Field::Left;
                target = self.get_left(target);
            } else if *key > target_key {
                parent = target;
                branch = Field::Right;
                target = self.get_right(target);
            } else {
                break;
            }
        }
        if target == SENTINEL {
            return None;
        }
        let value = self.get_node(target).value;

        // Rotate the target down, always raising the higher-priority child
        // so the heap rule holds above it, until at most one child remains.
        loop {
            let left = self.get_left(target);
            let right = self.get_right(target);
            if left != SENTINEL && right != SENTINEL {
                let (risen, next_branch) =
                    if self.get_priority(left) >= self.get_priority(right) {
                        (self.right_rotate(target), Field::Right)
                    } else {
                        (self.left_rotate(target), Field::Left)
                    };
                if parent == SENTINEL {
                    self.root = risen as u64;
                } else {
                    self.set_field(parent, branch, risen);
                }
                parent = risen;
                branch = next_branch;
            } else {
                let child = if left != SENTINEL { left } else { right };
                if parent == SENTINEL {
                    self.root = child as u64;
                } else {
                    self.set_field(parent, branch, child);
                }
                self.free_node(target);
                return Some(value);
            }
        }
    }

    fn free_node(&mut self, node: u32) {
        self.allocator.clear_register(node, Field::Left as u32);
        self.allocator.clear_register(node, Field::Right as u32);
        self.allocator.clear_register(node, Field::Priority as u32);
        self.allocator.remove_node(node);
    }

    /// Checks the max-heap rule over priorities. External validator; the
    /// operations themselves never call this.
    pub fn is_heap_ordered(&self) -> bool {
        self.heap_ordered_from(self.root as u32)
    }

    fn heap_ordered_from(&self, node: u32) -> bool {
        if node == SENTINEL {
            return true;
        }
        let priority = self.get_priority(node);
        for child in [self.get_left(node), self.get_right(node)] {
            if child != SENTINEL
                && (self.get_priority(child) > priority || !self.heap_ordered_from(child))
            {
                return false;
            }
        }
        true
    }

    /// Height of the tree counted in nodes; 0 for an empty tree.
    pub fn height(&self) -> u32 {
        self.subtree_height(self.root as u32)
    }

    fn subtree_height(&self, node: u32) -> u32 {
        if node == SENTINEL {
            return 0;
        }
        1 + max(
            self.subtree_height(self.get_left(node)),
            self.subtree_height(self.get_right(node)),
        )
    }

    /// In-order traversal, eagerly materialized in ascending key order.
    pub fn inorder_traversal(&self) -> Vec<(K, V)> {
        let mut stack = vec![];
        let mut cursor = self.root as u32;
        let mut nodes = vec![];
        while !stack.is_empty() || cursor != SENTINEL {
            if cursor != SENTINEL {
                stack.push(cursor);
                cursor = self.get_left(cursor);
            } else {
                cursor = stack.pop().unwrap();
                let node = self.get_node(cursor);
                nodes.push((node.key, node.value));
                cursor = self.get_right(cursor);
            }
        }
        nodes
    }

    fn _iter(&self) -> TreapIterator<'_, K, V, MAX_SIZE> {
        TreapIterator::<K, V, MAX_SIZE> {
            treap: self,
            stack: vec![],
            ptr: self.root as u32,
        }
    }

    fn _iter_mut(&mut self) -> TreapIteratorMut<'_, K, V, MAX_SIZE> {
        let node = self.root as u32;
        TreapIteratorMut::<K, V, MAX_SIZE> {
            treap: self,
            stack: vec![],
            ptr: node,
        }
    }
}

impl<
        'a,
        K: PartialOrd + Copy + Clone + Default + Pod + Zeroable,
        V: Default + Copy + Clone + Pod + Zeroable,
        const MAX_SIZE: usize,
    > IntoIterator for &'a Treap<K, V, MAX_SIZE>
{
    type Item = (&'a K, &'a V);
    type IntoIter = TreapIterator<'a, K, V, MAX_SIZE>;
    fn into_iter(self) -> Self::IntoIter {
        self._iter()
    }
}

impl<
        'a,
        K: PartialOrd + Copy + Clone + Default + Pod + Zeroable,
        V: Default + Copy + Clone + Pod + Zeroable,
        const MAX_SIZE: usize,
    > IntoIterator for &'a mut Treap<K, V, MAX_SIZE>
{
    type Item = (&'a K, &'a mut V);
    type IntoIter = TreapIteratorMut<'a, K, V, MAX_SIZE>;
    fn into_iter(self) -> Self::IntoIter {
        self._iter_mut()
    }
}

pub struct TreapIterator<
    'a,
    K: PartialOrd + Copy + Clone + Default + Pod + Zeroable,
    V: Default + Copy + Clone + Pod + Zeroable,
    const MAX_SIZE: usize,
> {
    treap: &'a Treap<K, V, MAX_SIZE>,
    stack: Vec<u32>,
    ptr: u32,
}

impl<
        'a,
        K: PartialOrd + Copy + Clone + Default + Pod + Zeroable,
        V: Default + Copy + Clone + Pod + Zeroable,
        const MAX_SIZE: usize,
    > Iterator for TreapIterator<'a, K, V, MAX_SIZE>
{
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        while !self.stack.is_empty() || self.ptr != SENTINEL {
            if self.ptr != SENTINEL {
                self.stack.push(self.ptr);
                self.ptr = self.treap.get_left(self.ptr);
            } else {
                let index = self.stack.pop()?;
                let node = self.treap.get_node(index);
                self.ptr = self.treap.get_right(index);
                return Some((&node.key, &node.value));
            }
        }
        None
    }
}

pub struct TreapIteratorMut<
    'a,
    K: PartialOrd + Copy + Clone + Default + Pod + Zeroable,
    V: Default + Copy + Clone + Pod + Zeroable,
    const MAX_SIZE: usize,
> {
    treap: &'a mut Treap<K, V, MAX_SIZE>,
    stack: Vec<u32>,
    ptr: u32,
}

impl<
        'a,
        K: PartialOrd + Copy + Clone + Default + Pod + Zeroable,
        V: Default + Copy + Clone + Pod + Zeroable,
        const MAX_SIZE: usize,
    > Iterator for TreapIteratorMut<'a, K, V, MAX_SIZE>
{
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        while !self.stack.is_empty() || self.ptr != SENTINEL {
            if self.ptr != SENTINEL {
                self.stack.push(self.ptr);
                self.ptr = self.treap.get_left(self.ptr);
            } else {
                let index = self.stack.pop()?;
                self.ptr = self.treap.get_right(index);
                // The iterator holds the only live reference into the tree;
                // disjoint items are handed out one at a time.
                unsafe {
                    let node = (*self
                        .treap
                        .allocator
                        .nodes
                        .as_mut_ptr()
                        .add(index as usize))
                    .get_value_mut();
                    return Some((&node.key, &mut node.value));
                }
            }
        }
        None
    }
}

impl<
        K: PartialOrd + Copy + Clone + Default + Pod + Zeroable,
        V: Default + Copy + Clone + Pod + Zeroable,
        const MAX_SIZE: usize,
    > Index<&K> for Treap<K, V, MAX_SIZE>
{
    type Output = V;

    fn index(&self, index: &K) -> &Self::Output {
        self.get(index).unwrap()
    }
}

impl<
        K: PartialOrd + Copy + Clone + Default + Pod + Zeroable,
        V: Default + Copy + Clone + Pod + Zeroable,
        const MAX_SIZE: usize,
    > IndexMut<&K> for Treap<K, V, MAX_SIZE>
{
    fn index_mut(&mut self, index: &K) -> &mut Self::Output {
        self.get_mut(index).unwrap()
    }
}
