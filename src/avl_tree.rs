use bytemuck::{Pod, Zeroable};
use std::cmp::max;
use std::ops::{Index, IndexMut};

use crate::error::TreeError;
use crate::node_allocator::{
    FromSlice, NodeAllocator, NodeAllocatorMap, OrderedNodeAllocatorMap, ZeroCopy, SENTINEL,
};

// The number of registers (the last register is currently not in use).
const REGISTERS: usize = 4;

// Per-node registers:
// 0 - left child
// 1 - right child
// 2 - height of the subtree rooted at the node (0 for a leaf)
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Field {
    Left = 0,
    Right = 1,
    Height = 2,
}

// One entry of the root-to-node path recorded while descending:
// (parent, branch taken at the parent, child).
type Ancestor = (Option<u32>, Option<Field>, u32);

#[repr(C)]
#[derive(Default, Copy, Clone)]
pub struct AvlNode<
    K: PartialOrd + Copy + Clone + Default + Pod + Zeroable,
    V: Default + Copy + Clone + Pod + Zeroable,
> {
    pub key: K,
    pub value: V,
}

unsafe impl<
        K: PartialOrd + Copy + Clone + Default + Pod + Zeroable,
        V: Default + Copy + Clone + Pod + Zeroable,
    > Zeroable for AvlNode<K, V>
{
}
unsafe impl<
        K: PartialOrd + Copy + Clone + Default + Pod + Zeroable,
        V: Default + Copy + Clone + Pod + Zeroable,
    > Pod for AvlNode<K, V>
{
}

impl<
        K: PartialOrd + Copy + Clone + Default + Pod + Zeroable,
        V: Default + Copy + Clone + Pod + Zeroable,
    > AvlNode<K, V>
{
    pub fn new(key: K, value: V) -> Self {
        Self { key, value }
    }
}

/// Height-balanced search tree. Every node's balance factor (left height
/// minus right height) stays in {-1, 0, 1}; insert and delete restore the
/// bound by walking an explicit path vector back toward the root and
/// applying the standard four-case rotations.
#[repr(C)]
#[derive(Copy, Clone)]
pub struct AvlTree<
    K: PartialOrd + Copy + Clone + Default + Pod + Zeroable,
    V: Default + Copy + Clone + Pod + Zeroable,
    const MAX_SIZE: usize,
> {
    pub root: u64,
    allocator: NodeAllocator<AvlNode<K, V>, MAX_SIZE, REGISTERS>,
}

unsafe impl<
        K: PartialOrd + Copy + Clone + Default + Pod + Zeroable,
        V: Default + Copy + Clone + Pod + Zeroable,
        const MAX_SIZE: usize,
    > Zeroable for AvlTree<K, V, MAX_SIZE>
{
}
unsafe impl<
        K: PartialOrd + Copy + Clone + Default + Pod + Zeroable,
        V: Default + Copy + Clone + Pod + Zeroable,
        const MAX_SIZE: usize,
    > Pod for AvlTree<K, V, MAX_SIZE>
{
}
impl<
        K: PartialOrd + Copy + Clone + Default + Pod + Zeroable,
        V: Default + Copy + Clone + Pod + Zeroable,
        const MAX_SIZE: usize,
    > ZeroCopy for AvlTree<K, V, MAX_SIZE>
{
}

impl<
        K: PartialOrd + Copy + Clone + Default + Pod + Zeroable,
        V: Default + Copy + Clone + Pod + Zeroable,
        const MAX_SIZE: usize,
    > Default for AvlTree<K, V, MAX_SIZE>
{
    fn default() -> Self {
        AvlTree {
            root: SENTINEL as u64,
            allocator: NodeAllocator::<AvlNode<K, V>, MAX_SIZE, REGISTERS>::default(),
        }
    }
}

impl<
        K: PartialOrd + Copy + Clone + Default + Pod + Zeroable,
        V: Default + Copy + Clone + Pod + Zeroable,
        const MAX_SIZE: usize,
    > FromSlice for AvlTree<K, V, MAX_SIZE>
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
    > NodeAllocatorMap<K, V> for AvlTree<K, V, MAX_SIZE>
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
    > OrderedNodeAllocatorMap<K, V> for AvlTree<K, V, MAX_SIZE>
{
    fn get_min_index(&mut self) -> u32 {
        self.find_min_index()
    }

    fn get_max_index(&mut self) -> u32 {
        self.find_max_index()
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
    > AvlTree<K, V, MAX_SIZE>
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initialize(&mut self) {
        self.allocator.initialize()
    }

    pub fn get_node(&self, node: u32) -> &AvlNode<K, V> {
        self.allocator.get(node).get_value()
    }

    pub fn get_node_mut(&mut self, node: u32) -> &mut AvlNode<K, V> {
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

    /// Height of the whole tree counted in nodes (0 for an empty tree, 1
    /// for a single node).
    pub fn height(&self) -> u32 {
        match self.root as u32 {
            SENTINEL => 0,
            root => self.get_field(root, Field::Height) + 1,
        }
    }

    #[inline(always)]
    fn get_field(&self, node: u32, register: Field) -> u32 {
        self.allocator.get_register(node, register as u32)
    }

    // Child links and the cached height are kept in lockstep: writing a
    // child register recomputes the height register of `node`.
    #[inline(always)]
    fn set_field(&mut self, node: u32, register: Field, value: u32) {
        if node != SENTINEL {
            self.allocator.set_register(node, value, register as u32);
            if register == Field::Left || register == Field::Right {
                self.update_height(node);
            }
        }
    }

    /// Index of the node holding `key`, or `SENTINEL`.
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

    fn _insert(&mut self, key: K, value: V) -> Option<u32> {
        let mut cursor = self.root as u32;
        let new_node = AvlNode::<K, V>::new(key, value);
        if cursor == SENTINEL {
            self.root = self.allocator.add_node(new_node) as u64;
            return Some(self.root as u32);
        }

        let mut path: Vec<Ancestor> = Vec::with_capacity(self.height() as usize + 1);
        path.push((None, None, cursor));

        loop {
            let cursor_key = self.get_node(cursor).key;
            let parent = cursor;

            let branch = if key < cursor_key {
                cursor = self.get_left(parent);
                Field::Left
            } else if key > cursor_key {
                cursor = self.get_right(parent);
                Field::Right
            } else {
                // Duplicate key: overwrite the value in place.
                self.get_node_mut(cursor).value = value;
                return Some(cursor);
            };

            if cursor == SENTINEL {
                if self.len() >= self.capacity() {
                    return None;
                }
                cursor = self.allocator.add_node(new_node);
                self.set_field(parent, branch, cursor);
                break;
            }
            path.push((Some(parent), Some(branch), cursor));
        }

        self.rebalance(path);
        Some(cursor)
    }

    fn _remove(&mut self, key: &K) -> Option<V> {
        let mut target = self.root as u32;
        if target == SENTINEL {
            return None;
        }

        let mut path: Vec<Ancestor> = Vec::with_capacity(self.height() as usize + 1);
        path.push((None, None, target));

        while target != SENTINEL {
            let target_key = self.get_node(target).key;
            let parent = target;

            let branch = if *key < target_key {
                target = self.get_left(parent);
                Field::Left
            } else if *key > target_key {
                target = self.get_right(parent);
                Field::Right
            } else {
                break;
            };

            path.push((Some(parent), Some(branch), target));
        }
        // Fell off the tree without matching: the key is absent and the
        // delete is a no-op.
        if target == SENTINEL {
            return None;
        }

        let value = self.get_node(target).value;
        let left = self.get_left(target);
        let right = self.get_right(target);

        let replacement = if left != SENTINEL && right != SENTINEL {
            // Two children: splice the in-order successor (the leftmost node
            // of the right subtree) into the target's position. The
            // successor node moves; no key/value is copied.
            let mut leftmost = right;
            let mut leftmost_parent = SENTINEL;
            let mut successor_path: Vec<Ancestor> =
                Vec::with_capacity(self.height() as usize + 1);

            while self.get_left(leftmost) != SENTINEL {
                leftmost_parent = leftmost;
                leftmost = self.get_left(leftmost);
                successor_path.push((Some(leftmost_parent), Some(Field::Left), leftmost));
            }
            if leftmost_parent != SENTINEL {
                self.set_field(leftmost_parent, Field::Left, self.get_right(leftmost));
            }

            self.set_field(leftmost, Field::Left, left);
            if right != leftmost {
                self.set_field(leftmost, Field::Right, right);
            }

            let (parent, branch, _) = path.pop().unwrap();
            if let Some(parent) = parent {
                self.set_field(parent, branch.unwrap(), leftmost);
            }

            path.push((parent, branch, leftmost));
            if right != leftmost {
                path.push((Some(leftmost), Some(Field::Right), right));
            }
            // The last successor-path entry names the spliced-out node;
            // everything above it still needs rebalancing.
            if !successor_path.is_empty() {
                successor_path.pop();
            }
            path.extend(successor_path);

            leftmost
        } else {
            let child = if left != SENTINEL { left } else { right };

            let (parent, branch, _) = path.pop().unwrap();
            if let Some(parent) = parent {
                self.set_field(parent, branch.unwrap(), child);
                if child != SENTINEL {
                    path.push((Some(parent), branch, child));
                }
            }

            child
        };

        if target == self.root as u32 {
            self.root = replacement as u64;
        }

        self.free_node(target);
        self.rebalance(path);

        Some(value)
    }

    fn balance_factor(&self, left: u32, right: u32) -> i32 {
        // Heights fit in an i32 comfortably: they are bounded by
        // log2(capacity).
        let left_height = if left != SENTINEL {
            self.get_field(left, Field::Height) as i32 + 1
        } else {
            0
        };
        let right_height = if right != SENTINEL {
            self.get_field(right, Field::Height) as i32 + 1
        } else {
            0
        };
        left_height - right_height
    }

    fn left_rotate(&mut self, index: u32) -> u32 {
        let right = self.get_right(index);
        let right_left = self.get_left(right);

        self.set_field(index, Field::Right, right_left);
        self.set_field(right, Field::Left, index);

        right
    }

    fn right_rotate(&mut self, index: u32) -> u32 {
        let left = self.get_left(index);
        let left_right = self.get_right(left);

        self.set_field(index, Field::Left, left_right);
        self.set_field(left, Field::Right, index);

        left
    }

    fn update_height(&mut self, index: u32) {
        let left = self.get_left(index);
        let right = self.get_right(index);

        let height = if left == SENTINEL && right == SENTINEL {
            0
        } else {
            let left_height = if left != SENTINEL {
                self.get_field(left, Field::Height)
            } else {
                0
            };
            let right_height = if right != SENTINEL {
                self.get_field(right, Field::Height)
            } else {
                0
            };
            max(left_height, right_height) + 1
        };

        self.allocator
            .set_register(index, height, Field::Height as u32);
    }

    fn free_node(&mut self, node: u32) {
        self.allocator.clear_register(node, Field::Left as u32);
        self.allocator.clear_register(node, Field::Right as u32);
        self.allocator.clear_register(node, Field::Height as u32);
        self.allocator.remove_node(node);
    }

    /// Walks the recorded path bottom-up, recomputing heights and applying
    /// the four-case rotation logic wherever a balance factor leaves
    /// {-1, 0, 1}. Insertion trips at most one case; deletion may trip one
    /// per ancestor.
    fn rebalance(&mut self, path: Vec<Ancestor>) {
        for (parent, branch, child) in path.iter().rev() {
            let left = self.get_left(*child);
            let right = self.get_right(*child);
            let balance_factor = self.balance_factor(left, right);

            let subtree_root = if balance_factor > 1 {
                // Left-heavy; a right-heavy left child needs the extra
                // left rotation first (Left-Right case).
                let left_balance =
                    self.balance_factor(self.get_left(left), self.get_right(left));
                if left_balance < 0 {
                    let rotated = self.left_rotate(left);
                    self.set_field(*child, Field::Left, rotated);
                }
                Some(self.right_rotate(*child))
            } else if balance_factor < -1 {
                let right_balance =
                    self.balance_factor(self.get_left(right), self.get_right(right));
                if right_balance > 0 {
                    let rotated = self.right_rotate(right);
                    self.set_field(*child, Field::Right, rotated);
                }
                Some(self.left_rotate(*child))
            } else {
                self.update_height(*child);
                None
            };

            if let Some(subtree_root) = subtree_root {
                if let Some(parent) = parent {
                    self.set_field(*parent, (*branch).unwrap(), subtree_root);
                } else {
                    self.root = subtree_root as u64;
                    self.update_height(subtree_root);
                }
            }
        }
    }

    /// Recomputes every subtree height from scratch and checks the AVL
    /// balance bound. External validator; the operations themselves never
    /// call this.
    pub fn is_balanced(&self) -> bool {
        self.checked_height(self.root as u32).is_some()
    }

    fn checked_height(&self, node: u32) -> Option<i32> {
        if node == SENTINEL {
            return Some(-1);
        }
        let left = self.checked_height(self.get_left(node))?;
        let right = self.checked_height(self.get_right(node))?;
        if (left - right).abs() > 1 {
            return None;
        }
        Some(max(left, right) + 1)
    }

    /// In-order traversal, eagerly materialized. The key sequence is
    /// strictly increasing.
    pub fn inorder(&self) -> Vec<(K, V)> {
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

    /// Pre-order traversal (node, left subtree, right subtree).
    pub fn preorder(&self) -> Vec<(K, V)> {
        let mut stack = vec![];
        let mut nodes = vec![];
        if self.root as u32 != SENTINEL {
            stack.push(self.root as u32);
        }
        while let Some(cursor) = stack.pop() {
            let node = self.get_node(cursor);
            nodes.push((node.key, node.value));
            let right = self.get_right(cursor);
            let left = self.get_left(cursor);
            if right != SENTINEL {
                stack.push(right);
            }
            if left != SENTINEL {
                stack.push(left);
            }
        }
        nodes
    }

    /// Post-order traversal (left subtree, right subtree, node).
    pub fn postorder(&self) -> Vec<(K, V)> {
        let mut nodes = vec![];
        self.walk_postorder(self.root as u32, &mut nodes);
        nodes
    }

    fn walk_postorder(&self, node: u32, out: &mut Vec<(K, V)>) {
        if node == SENTINEL {
            return;
        }
        self.walk_postorder(self.get_left(node), out);
        self.walk_postorder(self.get_right(node), out);
        let node = self.get_node(node);
        out.push((node.key, node.value));
    }

    pub fn find_min_index(&self) -> u32 {
        let mut node = self.root as u32;
        if node == SENTINEL {
            return SENTINEL;
        }
        while self.get_left(node) != SENTINEL {
            node = self.get_left(node);
        }
        node
    }

    pub fn find_max_index(&self) -> u32 {
        let mut node = self.root as u32;
        if node == SENTINEL {
            return SENTINEL;
        }
        while self.get_right(node) != SENTINEL {
            node = self.get_right(node);
        }
        node
    }

    pub fn find_min(&self) -> Option<&V> {
        match self.find_min_index() {
            SENTINEL => None,
            node => Some(&self.get_node(node).value),
        }
    }

    pub fn find_max(&self) -> Option<&V> {
        match self.find_max_index() {
            SENTINEL => None,
            node => Some(&self.get_node(node).value),
        }
    }

    fn _iter(&self) -> AvlTreeIterator<'_, K, V, MAX_SIZE> {
        AvlTreeIterator::<K, V, MAX_SIZE> {
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

    fn _iter_mut(&mut self) -> AvlTreeIteratorMut<'_, K, V, MAX_SIZE> {
        let node = self.root as u32;
        AvlTreeIteratorMut::<K, V, MAX_SIZE> {
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
    > IntoIterator for &'a AvlTree<K, V, MAX_SIZE>
{
    type Item = (&'a K, &'a V);
    type IntoIter = AvlTreeIterator<'a, K, V, MAX_SIZE>;
    fn into_iter(self) -> Self::IntoIter {
        self._iter()
    }
}

impl<
        'a,
        K: PartialOrd + Copy + Clone + Default + Pod + Zeroable,
        V: Default + Copy + Clone + Pod + Zeroable,
        const MAX_SIZE: usize,
    > IntoIterator for &'a mut AvlTree<K, V, MAX_SIZE>
{
    type Item = (&'a K, &'a mut V);
    type IntoIter = AvlTreeIteratorMut<'a, K, V, MAX_SIZE>;
    fn into_iter(self) -> Self::IntoIter {
        self._iter_mut()
    }
}

pub struct AvlTreeIterator<
    'a,
    K: PartialOrd + Copy + Clone + Default + Pod + Zeroable,
    V: Default + Copy + Clone + Pod + Zeroable,
    const MAX_SIZE: usize,
> {
    tree: &'a AvlTree<K, V, MAX_SIZE>,
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
    > Iterator for AvlTreeIterator<'a, K, V, MAX_SIZE>
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
    > DoubleEndedIterator for AvlTreeIterator<'a, K, V, MAX_SIZE>
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

pub struct AvlTreeIteratorMut<
    'a,
    K: PartialOrd + Copy + Clone + Default + Pod + Zeroable,
    V: Default + Copy + Clone + Pod + Zeroable,
    const MAX_SIZE: usize,
> {
    tree: &'a mut AvlTree<K, V, MAX_SIZE>,
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
    > Iterator for AvlTreeIteratorMut<'a, K, V, MAX_SIZE>
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
    > DoubleEndedIterator for AvlTreeIteratorMut<'a, K, V, MAX_SIZE>
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
    > Index<&K> for AvlTree<K, V, MAX_SIZE>
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
    > IndexMut<&K> for AvlTree<K, V, MAX_SIZE>
{
    fn index_mut(&mut self, index: &K) -> &mut Self::Output {
        self.get_mut(index).unwrap()
    }
}
