use bytemuck::{Pod, Zeroable};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use std::cmp::max;
use std::ops::{Index, IndexMut};

use crate::error::TreeError;
use crate::node_allocator::{
    FromSlice, NodeAllocator, NodeAllocatorMap, OrderedNodeAllocatorMap, TreeField, ZeroCopy,
    SENTINEL,
};

const REGISTERS: usize = 4;

const LEFT: u32 = TreeField::Left as u32;
const RIGHT: u32 = TreeField::Right as u32;
const PARENT: u32 = TreeField::Parent as u32;
// The metadata register stores the node color.
const COLOR: u32 = TreeField::Value as u32;

/// Black is the zero variant so that zeroed memory (including the sentinel
/// slot, whose color register is never written) reads as a black node.
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive)]
pub enum Color {
    Black = 0,
    Red = 1,
}

#[inline(always)]
fn opposite(dir: u32) -> u32 {
    1 - dir
}

#[repr(C)]
#[derive(Default, Copy, Clone)]
pub struct RBNode<
    K: PartialOrd + Copy + Clone + Default + Pod + Zeroable,
    V: Default + Copy + Clone + Pod + Zeroable,
> {
    pub key: K,
    pub value: V,
}

unsafe impl<
        K: PartialOrd + Copy + Clone + Default + Pod + Zeroable,
        V: Default + Copy + Clone + Pod + Zeroable,
    > Zeroable for RBNode<K, V>
{
}
unsafe impl<
        K: PartialOrd + Copy + Clone + Default + Pod + Zeroable,
        V: Default + Copy + Clone + Pod + Zeroable,
    > Pod for RBNode<K, V>
{
}

impl<
        K: PartialOrd + Copy + Clone + Default + Pod + Zeroable,
        V: Default + Copy + Clone + Pod + Zeroable,
    > RBNode<K, V>
{
    pub fn new(key: K, value: V) -> Self {
        Self { key, value }
    }
}

/// Red-black search tree. Every node is red or black, the root and the
/// sentinel leaf are black, a red node never has a red child, and every
/// root-to-leaf path crosses the same number of black nodes. The color rules
/// bound the height by 2*log2(n+1).
///
/// Nodes carry a parent register, so the insert and delete fix-up loops walk
/// the tree without any auxiliary stack.
#[repr(C)]
#[derive(Copy, Clone)]
pub struct RedBlackTree<
    K: PartialOrd + Copy + Clone + Default + Pod + Zeroable,
    V: Default + Copy + Clone + Pod + Zeroable,
    const MAX_SIZE: usize,
> {
    pub root: u64,
    allocator: NodeAllocator<RBNode<K, V>, MAX_SIZE, REGISTERS>,
}

unsafe impl<
        K: PartialOrd + Copy + Clone + Default + Pod + Zeroable,
        V: Default + Copy + Clone + Pod + Zeroable,
        const MAX_SIZE: usize,
    > Zeroable for RedBlackTree<K, V, MAX_SIZE>
{
}
unsafe impl<
        K: PartialOrd + Copy + Clone + Default + Pod + Zeroable,
        V: Default + Copy + Clone + Pod + Zeroable,
        const MAX_SIZE: usize,
    > Pod for RedBlackTree<K, V, MAX_SIZE>
{
}
impl<
        K: PartialOrd + Copy + Clone + Default + Pod + Zeroable,
        V: Default + Copy + Clone + Pod + Zeroable,
        const MAX_SIZE: usize,
    > ZeroCopy for RedBlackTree<K, V, MAX_SIZE>
{
}

impl<
        K: PartialOrd + Copy + Clone + Default + Pod + Zeroable,
        V: Default + Copy + Clone + Pod + Zeroable,
        const MAX_SIZE: usize,
    > Default for RedBlackTree<K, V, MAX_SIZE>
{
    fn default() -> Self {
        RedBlackTree {
            root: SENTINEL as u64,
            allocator: NodeAllocator::<RBNode<K, V>, MAX_SIZE, REGISTERS>::default(),
        }
    }
}

impl<
        K: PartialOrd + Copy + Clone + Default + Pod + Zeroable,
        V: Default + Copy + Clone + Pod + Zeroable,
        const MAX_SIZE: usize,
    > FromSlice for RedBlackTree<K, V, MAX_SIZE>
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
    > NodeAllocatorMap<K, V> for RedBlackTree<K, V, MAX_SIZE>
{
    fn insert(&mut self, key: K, value: V) -> Option<u32> {
        self._insert(key, value)
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
    > OrderedNodeAllocatorMap<K, V> for RedBlackTree<K, V, MAX_SIZE>
{
    fn get_min_index(&mut self) -> u32 {
        self.find_min_index(self.root as u32)
    }

    fn get_max_index(&mut self) -> u32 {
        self.find_max_index(self.root as u32)
    }

    fn get_min(&mut self) -> Option<(K, V)> {
        match self.get_min_index() {
            SENTINEL => None,
            i => {
                let node = self.get_node(i);
                Some((node.key, node.value))
            }
        }
    }

    fn get_max(&mut self) -> Option<(K, V)> {
        match self.get_max_index() {
            SENTINEL => None,
            i => {
                let node = self.get_node(i);
                Some((node.key, node.value))
            }
        }
    }
}

impl<
        K: PartialOrd + Copy + Clone + Default + Pod + Zeroable,
        V: Default + Copy + Clone + Pod + Zeroable,
        const MAX_SIZE: usize,
    > RedBlackTree<K, V, MAX_SIZE>
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initialize(&mut self) {
        self.allocator.initialize()
    }

    pub fn get_node(&self, node: u32) -> &RBNode<K, V> {
        self.allocator.get(node).get_value()
    }

    pub fn get_node_mut(&mut self, node: u32) -> &mut RBNode<K, V> {
        self.allocator.get_mut(node).get_value_mut()
    }

    pub fn get_color(&self, node: u32) -> Color {
        Color::from_u32(self.allocator.get_register(node, COLOR)).unwrap()
    }

    #[inline(always)]
    pub fn get_left(&self, node: u32) -> u32 {
        self.allocator.get_register(node, LEFT)
    }

    #[inline(always)]
    pub fn get_right(&self, node: u32) -> u32 {
        self.allocator.get_register(node, RIGHT)
    }

    #[inline(always)]
    pub fn get_parent(&self, node: u32) -> u32 {
        self.allocator.get_register(node, PARENT)
    }

    #[inline(always)]
    fn get_child(&self, node: u32, dir: u32) -> u32 {
        self.allocator.get_register(node, dir)
    }

    #[inline(always)]
    fn is_red(&self, node: u32) -> bool {
        self.get_color(node) == Color::Red
    }

    #[inline(always)]
    fn is_black(&self, node: u32) -> bool {
        self.get_color(node) == Color::Black
    }

    #[inline(always)]
    fn color_red(&mut self, node: u32) {
        // The guard in set_register keeps the sentinel black.
        self.allocator.set_register(node, Color::Red as u32, COLOR);
    }

    #[inline(always)]
    fn color_black(&mut self, node: u32) {
        self.allocator.set_register(node, Color::Black as u32, COLOR);
    }

    #[inline(always)]
    fn set_color(&mut self, node: u32, color: Color) {
        self.allocator.set_register(node, color as u32, COLOR);
    }

    /// Which child slot of `parent` holds `node`.
    #[inline(always)]
    fn child_dir(&self, parent: u32, node: u32) -> u32 {
        if self.get_left(parent) == node {
            LEFT
        } else {
            RIGHT
        }
    }

    /// Links `child` into the `dir` slot of `parent` and sets the back
    /// reference, skipping the sentinel on either side.
    #[inline(always)]
    fn connect(&mut self, parent: u32, child: u32, dir: u32) {
        self.allocator.connect(parent, child, dir, PARENT);
    }

    pub fn get_addr(&self, key: &K) -> u32 {
        let mut reference = self.root as u32;
        while reference != SENTINEL {
            let ref_key = self.get_node(reference).key;
            reference = if *key < ref_key {
                self.get_left(reference)
            } else if *key > ref_key {
                self.get_right(reference)
            } else {
                return reference;
            };
        }
        SENTINEL
    }

    /// Rotates `index` down into the `dir` slot of its `opposite(dir)`-side
    /// child, which rises into `index`'s place. Returns the risen node.
    fn rotate_dir(&mut self, index: u32, dir: u32) -> u32 {
        let pivot = self.get_child(index, opposite(dir));
        let parent = self.get_parent(index);
        let transfer = self.get_child(pivot, dir);

        self.connect(pivot, index, dir);
        self.connect(index, transfer, opposite(dir));
        if transfer == SENTINEL {
            self.allocator.clear_register(index, opposite(dir));
        }

        if parent == SENTINEL {
            self.root = pivot as u64;
            self.allocator.clear_register(pivot, PARENT);
        } else {
            let branch = self.child_dir(parent, index);
            self.connect(parent, pivot, branch);
        }
        pivot
    }

    fn _insert(&mut self, key: K, value: V) -> Option<u32> {
        let mut reference = self.root as u32;
        if reference == SENTINEL {
            let node = self.allocator.add_node(RBNode::new(key, value));
            self.color_black(node);
            self.root = node as u64;
            return Some(node);
        }
        loop {
            let ref_key = self.get_node(reference).key;
            let dir = if key < ref_key {
                LEFT
            } else if key > ref_key {
                RIGHT
            } else {
                // Duplicate key: the existing node is left untouched.
                return Some(reference);
            };
            let target = self.get_child(reference, dir);
            if target == SENTINEL {
                if self.len() >= self.capacity() {
                    return None;
                }
                let node = self.allocator.add_node(RBNode::new(key, value));
                self.color_red(node);
                self.connect(reference, node, dir);
                self.fix_insert(node);
                return Some(node);
            }
            reference = target;
        }
    }

    /// Restores the color rules after hanging a red `node` under its parent.
    /// A red uncle recolors and pushes the violation two levels up; a black
    /// uncle aligns the node with its parent's branch and rotates the
    /// grandparent.
    fn fix_insert(&mut self, mut node: u32) {
        while self.is_red(self.get_parent(node)) {
            let parent = self.get_parent(node);
            let grandparent = self.get_parent(parent);
            if grandparent == SENTINEL {
                break;
            }
            let branch = self.child_dir(grandparent, parent);
            let uncle = self.get_child(grandparent, opposite(branch));
            if self.is_red(uncle) {
                self.color_black(parent);
                self.color_black(uncle);
                self.color_red(grandparent);
                node = grandparent;
            } else {
                if self.child_dir(parent, node) == opposite(branch) {
                    node = parent;
                    self.rotate_dir(node, branch);
                }
                let parent = self.get_parent(node);
                let grandparent = self.get_parent(parent);
                self.color_black(parent);
                self.color_red(grandparent);
                self.rotate_dir(grandparent, opposite(branch));
            }
        }
        self.color_black(self.root as u32);
    }

    /// Replaces the subtree rooted at `target` with the one rooted at
    /// `source` in `target`'s parent (or at the root).
    fn transplant(&mut self, target: u32, source: u32) {
        let parent = self.get_parent(target);
        if parent == SENTINEL {
            self.root = source as u64;
            if source != SENTINEL {
                self.allocator.clear_register(source, PARENT);
            }
        } else {
            let branch = self.child_dir(parent, target);
            self.connect(parent, source, branch);
            if source == SENTINEL {
                self.allocator.clear_register(parent, branch);
            }
        }
    }

    fn _remove(&mut self, key: &K) -> Option<V> {
        let target = self.get_addr(key);
        if target == SENTINEL {
            return None;
        }
        let value = self.get_node(target).value;
        let left = self.get_left(target);
        let right = self.get_right(target);

        // The pivot is the node that ends up occupying the unlinked
        // position; `removed_color` is the color drained from the tree.
        let mut removed_color = self.get_color(target);
        let (pivot, pivot_parent) = if left == SENTINEL {
            let parent = self.get_parent(target);
            self.transplant(target, right);
            (right, parent)
        } else if right == SENTINEL {
            let parent = self.get_parent(target);
            self.transplant(target, left);
            (left, parent)
        } else {
            // Two children: splice in the in-order successor, which keeps
            // the target's color so only the successor's old color leaves
            // the tree.
            let successor = self.find_min_index(right);
            removed_color = self.get_color(successor);
            let pivot = self.get_right(successor);
            let pivot_parent = if self.get_parent(successor) == target {
                successor
            } else {
                let parent = self.get_parent(successor);
                self.transplant(successor, pivot);
                self.connect(successor, right, RIGHT);
                parent
            };
            let target_color = self.get_color(target);
            self.transplant(target, successor);
            self.connect(successor, left, LEFT);
            self.set_color(successor, target_color);
            (pivot, pivot_parent)
        };

        self.allocator.clear_register(target, LEFT);
        self.allocator.clear_register(target, RIGHT);
        self.allocator.clear_register(target, PARENT);
        self.allocator.clear_register(target, COLOR);
        self.allocator.remove_node(target);

        if removed_color == Color::Black && pivot_parent != SENTINEL {
            if pivot == SENTINEL {
                // The fix-up may run on the sentinel leaf; lend it a parent
                // link for the duration.
                self.allocator
                    .get_mut(SENTINEL)
                    .set_register(PARENT as usize, pivot_parent);
                self.fix_remove(SENTINEL);
                self.allocator
                    .get_mut(SENTINEL)
                    .set_register(PARENT as usize, SENTINEL);
            } else {
                self.fix_remove(pivot);
            }
        } else if removed_color == Color::Black {
            // Black root removed with at most one child; the pivot becomes
            // the (black) root or the tree is now empty.
            self.color_black(pivot);
        }

        Some(value)
    }

    /// Restores the black-height rule after a black node left the tree.
    /// `node` carries the "doubly black" deficit; the loop resolves it
    /// through the symmetric sibling cases, direction-generic over which
    /// side of its parent `node` is on.
    fn fix_remove(&mut self, mut node: u32) {
        while node != self.root as u32 && self.is_black(node) {
            let parent = self.get_parent(node);
            let dir = self.child_dir(parent, node);
            let mut sibling = self.get_child(parent, opposite(dir));
            if self.is_red(sibling) {
                self.color_black(sibling);
                self.color_red(parent);
                self.rotate_dir(parent, dir);
                sibling = self.get_child(parent, opposite(dir));
            }
            if self.is_black(self.get_child(sibling, LEFT))
                && self.is_black(self.get_child(sibling, RIGHT))
            {
                self.color_red(sibling);
                node = parent;
            } else {
                if self.is_black(self.get_child(sibling, opposite(dir))) {
                    self.color_black(self.get_child(sibling, dir));
                    self.color_red(sibling);
                    self.rotate_dir(sibling, opposite(dir));
                    sibling = self.get_child(parent, opposite(dir));
                }
                let parent_color = self.get_color(parent);
                self.set_color(sibling, parent_color);
                self.color_black(parent);
                self.color_black(self.get_child(sibling, opposite(dir)));
                self.rotate_dir(parent, dir);
                node = self.root as u32;
            }
        }
        self.color_black(node);
    }

    pub fn find_min_index(&self, mut node: u32) -> u32 {
        if node == SENTINEL {
            return SENTINEL;
        }
        while self.get_left(node) != SENTINEL {
            node = self.get_left(node);
        }
        node
    }

    pub fn find_max_index(&self, mut node: u32) -> u32 {
        if node == SENTINEL {
            return SENTINEL;
        }
        while self.get_right(node) != SENTINEL {
            node = self.get_right(node);
        }
        node
    }

    pub fn find_min(&self) -> Option<&V> {
        match self.find_min_index(self.root as u32) {
            SENTINEL => None,
            node => Some(&self.get_node(node).value),
        }
    }

    pub fn find_max(&self) -> Option<&V> {
        match self.find_max_index(self.root as u32) {
            SENTINEL => None,
            node => Some(&self.get_node(node).value),
        }
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

    /// Black-height of the tree counting the sentinel leaf, or 0 when some
    /// pair of root-to-leaf paths disagree. External validator.
    pub fn validate_black_height(&self) -> u32 {
        self.black_height(self.root as u32)
    }

    fn black_height(&self, node: u32) -> u32 {
        if node == SENTINEL {
            return 1;
        }
        let left = self.black_height(self.get_left(node));
        let right = self.black_height(self.get_right(node));
        if left == 0 || left != right {
            return 0;
        }
        left + self.is_black(node) as u32
    }

    /// Full structural check: black root, no red node with a red child, and
    /// a consistent black-height.
    pub fn is_valid_red_black_tree(&self) -> bool {
        let root = self.root as u32;
        if root == SENTINEL {
            return true;
        }
        if self.is_red(root) {
            return false;
        }
        self.no_red_red(root) && self.validate_black_height() != 0
    }

    fn no_red_red(&self, node: u32) -> bool {
        if node == SENTINEL {
            return true;
        }
        let left = self.get_left(node);
        let right = self.get_right(node);
        if self.is_red(node) && (self.is_red(left) || self.is_red(right)) {
            return false;
        }
        self.no_red_red(left) && self.no_red_red(right)
    }

    /// In-order traversal, eagerly materialized in ascending key order.
    pub fn inorder_traversal(&self) -> Vec<(K, V)> {
        let mut stack = vec![];
        let mut reference = self.root as u32;
        let mut nodes = vec![];
        while !stack.is_empty() || reference != SENTINEL {
            if reference != SENTINEL {
                stack.push(reference);
                reference = self.get_left(reference);
            } else {
                reference = stack.pop().unwrap();
                let node = self.get_node(reference);
                nodes.push((node.key, node.value));
                reference = self.get_right(reference);
            }
        }
        nodes
    }

    fn _iter(&self) -> RedBlackTreeIterator<'_, K, V, MAX_SIZE> {
        RedBlackTreeIterator::<K, V, MAX_SIZE> {
            tree: self,
            fwd_stack: vec![],
            fwd_ptr: self.root as u32,
            fwd_node: None,
            rev_stack: vec![],
            rev_ptr: self.root as u32,
            rev_node: None,
            terminated: false,
        }
    }

    fn _iter_mut(&mut self) -> RedBlackTreeIteratorMut<'_, K, V, MAX_SIZE> {
        let node = self.root as u32;
        RedBlackTreeIteratorMut::<K, V, MAX_SIZE> {
            tree: self,
            fwd_stack: vec![],
            fwd_ptr: node,
            fwd_node: None,
            rev_stack: vec![],
            rev_ptr: node,
            rev_node: None,
            terminated: false,
        }
    }
}

impl<
        'a,
        K: PartialOrd + Copy + Clone + Default + Pod + Zeroable,
        V: Default + Copy + Clone + Pod + Zeroable,
        const MAX_SIZE: usize,
    > IntoIterator for &'a RedBlackTree<K, V, MAX_SIZE>
{
    type Item = (&'a K, &'a V);
    type IntoIter = RedBlackTreeIterator<'a, K, V, MAX_SIZE>;
    fn into_iter(self) -> Self::IntoIter {
        self._iter()
    }
}

impl<
        'a,
        K: PartialOrd + Copy + Clone + Default + Pod + Zeroable,
        V: Default + Copy + Clone + Pod + Zeroable,
        const MAX_SIZE: usize,
    > IntoIterator for &'a mut RedBlackTree<K, V, MAX_SIZE>
{
    type Item = (&'a K, &'a mut V);
    type IntoIter = RedBlackTreeIteratorMut<'a, K, V, MAX_SIZE>;
    fn into_iter(self) -> Self::IntoIter {
        self._iter_mut()
    }
}

pub struct RedBlackTreeIterator<
    'a,
    K: PartialOrd + Copy + Clone + Default + Pod + Zeroable,
    V: Default + Copy + Clone + Pod + Zeroable,
    const MAX_SIZE: usize,
> {
    tree: &'a RedBlackTree<K, V, MAX_SIZE>,
    fwd_stack: Vec<u32>,
    fwd_ptr: u32,
    fwd_node: Option<u32>,
    rev_stack: Vec<u32>,
    rev_ptr: u32,
    rev_node: Option<u32>,
    terminated: bool,
}

impl<
        'a,
        K: PartialOrd + Copy + Clone + Default + Pod + Zeroable,
        V: Default + Copy + Clone + Pod + Zeroable,
        const MAX_SIZE: usize,
    > Iterator for RedBlackTreeIterator<'a, K, V, MAX_SIZE>
{
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        while !self.terminated && (!self.fwd_stack.is_empty() || self.fwd_ptr != SENTINEL) {
            if self.fwd_ptr != SENTINEL {
                self.fwd_stack.push(self.fwd_ptr);
                self.fwd_ptr = self.tree.get_left(self.fwd_ptr);
            } else {
                let current = self.fwd_stack.pop();
                if current == self.rev_node {
                    self.terminated = true;
                    return None;
                }
                self.fwd_node = current;
                let index = current.unwrap();
                let node = self.tree.get_node(index);
                self.fwd_ptr = self.tree.get_right(index);
                return Some((&node.key, &node.value));
            }
        }
        None
    }
}

impl<
        'a,
        K: PartialOrd + Copy + Clone + Default + Pod + Zeroable,
        V: Default + Copy + Clone + Pod + Zeroable,
        const MAX_SIZE: usize,
    > DoubleEndedIterator for RedBlackTreeIterator<'a, K, V, MAX_SIZE>
{
    fn next_back(&mut self) -> Option<Self::Item> {
        while !self.terminated && (!self.rev_stack.is_empty() || self.rev_ptr != SENTINEL) {
            if self.rev_ptr != SENTINEL {
                self.rev_stack.push(self.rev_ptr);
                self.rev_ptr = self.tree.get_right(self.rev_ptr);
            } else {
                let current = self.rev_stack.pop();
                if current == self.fwd_node {
                    self.terminated = true;
                    return None;
                }
                self.rev_node = current;
                let index = current.unwrap();
                let node = self.tree.get_node(index);
                self.rev_ptr = self.tree.get_left(index);
                return Some((&node.key, &node.value));
            }
        }
        None
    }
}

pub struct RedBlackTreeIteratorMut<
    'a,
    K: PartialOrd + Copy + Clone + Default + Pod + Zeroable,
    V: Default + Copy + Clone + Pod + Zeroable,
    const MAX_SIZE: usize,
> {
    tree: &'a mut RedBlackTree<K, V, MAX_SIZE>,
    fwd_stack: Vec<u32>,
    fwd_ptr: u32,
    fwd_node: Option<u32>,
    rev_stack: Vec<u32>,
    rev_ptr: u32,
    rev_node: Option<u32>,
    terminated: bool,
}

impl<
        'a,
        K: PartialOrd + Copy + Clone + Default + Pod + Zeroable,
        V: Default + Copy + Clone + Pod + Zeroable,
        const MAX_SIZE: usize,
    > Iterator for RedBlackTreeIteratorMut<'a, K, V, MAX_SIZE>
{
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        while !self.terminated && (!self.fwd_stack.is_empty() || self.fwd_ptr != SENTINEL) {
            if self.fwd_ptr != SENTINEL {
                self.fwd_stack.push(self.fwd_ptr);
                self.fwd_ptr = self.tree.get_left(self.fwd_ptr);
            } else {
                let current = self.fwd_stack.pop();
                if current == self.rev_node {
                    self.terminated = true;
                    return None;
                }
                self.fwd_node = current;
                let index = current.unwrap();
                self.fwd_ptr = self.tree.get_right(index);
                // The iterator holds the only live reference into the tree;
                // disjoint items are handed out one at a time.
                unsafe {
                    let node = (*self
                        .tree
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
        'a,
        K: PartialOrd + Copy + Clone + Default + Pod + Zeroable,
        V: Default + Copy + Clone + Pod + Zeroable,
        const MAX_SIZE: usize,
    > DoubleEndedIterator for RedBlackTreeIteratorMut<'a, K, V, MAX_SIZE>
{
    fn next_back(&mut self) -> Option<Self::Item> {
        while !self.terminated && (!self.rev_stack.is_empty() || self.rev_ptr != SENTINEL) {
            if self.rev_ptr != SENTINEL {
                self.rev_stack.push(self.rev_ptr);
                self.rev_ptr = self.tree.get_right(self.rev_ptr);
            } else {
                let current = self.rev_stack.pop();
                if current == self.fwd_node {
                    self.terminated = true;
                    return None;
                }
                self.rev_node = current;
                let index = current.unwrap();
                self.rev_ptr = self.tree.get_left(index);
                unsafe {
                    let node = (*self
                        .tree
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
    > Index<&K> for RedBlackTree<K, V, MAX_SIZE>
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
    > IndexMut<&K> for RedBlackTree<K, V, MAX_SIZE>
{
    fn index_mut(&mut self, index: &K) -> &mut Self::Output {
        self.get_mut(index).unwrap()
    }
}
