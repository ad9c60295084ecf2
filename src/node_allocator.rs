use bytemuck::{Pod, Zeroable};
use num_derive::FromPrimitive;
use std::mem::{align_of, size_of};

use crate::error::TreeError;

// Register layout shared by the parent-linked trees:
// 0 - left child
// 1 - right child
// 2 - parent
// 3 - per-node metadata (color for the red-black tree)
#[derive(Debug, Copy, Clone, PartialEq, FromPrimitive)]
pub enum TreeField {
    Left = 0,
    Right = 1,
    Parent = 2,
    Value = 3,
}

/// Builds a tree in place over a caller-provided byte buffer.
pub trait FromSlice: Sized {
    fn try_new_from_slice(data: &mut [u8]) -> Result<&mut Self, TreeError>;

    /// Panicking convenience wrapper for buffers of known-good size and
    /// alignment.
    fn new_from_slice(data: &mut [u8]) -> &mut Self {
        Self::try_new_from_slice(data).unwrap()
    }
}

/// Common map surface of the allocator-backed trees.
///
/// The duplicate-insert policy is per container: the AVL tree overwrites the
/// stored value, the red-black tree and the treap leave the existing node
/// untouched. In every case `insert` returns the index of the node holding
/// the key, or `None` when a fresh key does not fit in the remaining
/// capacity.
pub trait NodeAllocatorMap<K, V> {
    fn insert(&mut self, key: K, value: V) -> Option<u32>;
    fn remove(&mut self, key: &K) -> Option<V>;
    fn contains(&self, key: &K) -> bool;
    fn get(&self, key: &K) -> Option<&V>;
    fn get_mut(&mut self, key: &K) -> Option<&mut V>;
    fn size(&self) -> usize;
    fn len(&self) -> usize;
    fn capacity(&self) -> usize;
    fn iter(&self) -> Box<dyn Iterator<Item = (&K, &V)> + '_>;
    fn iter_mut(&mut self) -> Box<dyn Iterator<Item = (&K, &mut V)> + '_>;
}

/// Extremum access for trees that keep their keys in sorted order.
pub trait OrderedNodeAllocatorMap<K, V>: NodeAllocatorMap<K, V> {
    fn get_min_index(&mut self) -> u32;
    fn get_max_index(&mut self) -> u32;
    fn get_min(&mut self) -> Option<(K, V)>;
    fn get_max(&mut self) -> Option<(K, V)>;
}

pub trait ZeroCopy: Pod {
    fn try_load_mut_bytes(data: &mut [u8]) -> Result<&mut Self, TreeError> {
        let size = size_of::<Self>();
        if data.len() < size {
            return Err(TreeError::BufferTooSmall {
                actual: data.len(),
                expected: size,
            });
        }
        bytemuck::try_from_bytes_mut(&mut data[..size]).map_err(|_| TreeError::BufferMisaligned)
    }

    fn load_mut_bytes(data: &mut [u8]) -> Option<&mut Self> {
        Self::try_load_mut_bytes(data).ok()
    }

    fn load_bytes(data: &[u8]) -> Option<&Self> {
        let size = size_of::<Self>();
        bytemuck::try_from_bytes(data.get(..size)?).ok()
    }
}

/// Index of the shared "no node" slot. Slot 0 is never handed out by the
/// allocator, so trees can use it both as a null link and as the black
/// sentinel leaf.
pub const SENTINEL: u32 = 0;

#[repr(C)]
#[derive(Copy, Clone)]
pub struct Node<T: Copy + Clone + Pod + Zeroable + Default, const NUM_REGISTERS: usize> {
    /// Link registers. Register 0 doubles as the free-list link while the
    /// slot is unallocated.
    registers: [u32; NUM_REGISTERS],
    value: T,
}

impl<T: Copy + Clone + Pod + Zeroable + Default, const NUM_REGISTERS: usize> Default
    for Node<T, NUM_REGISTERS>
{
    fn default() -> Self {
        assert!(NUM_REGISTERS >= 1);
        Self {
            registers: [SENTINEL; NUM_REGISTERS],
            value: T::default(),
        }
    }
}

impl<T: Copy + Clone + Pod + Zeroable + Default, const NUM_REGISTERS: usize>
    Node<T, NUM_REGISTERS>
{
    #[inline(always)]
    pub(crate) fn get_free_list_register(&self) -> u32 {
        self.registers[0]
    }

    #[inline(always)]
    pub(crate) fn set_free_list_register(&mut self, v: u32) {
        self.registers[0] = v;
    }

    #[inline(always)]
    pub fn get_register(&self, r: usize) -> u32 {
        self.registers[r]
    }

    #[inline(always)]
    pub fn set_register(&mut self, r: usize, v: u32) {
        self.registers[r] = v;
    }

    #[inline(always)]
    pub fn set_value(&mut self, v: T) {
        self.value = v;
    }

    #[inline(always)]
    pub fn get_value(&self) -> &T {
        &self.value
    }

    #[inline(always)]
    pub fn get_value_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

/// Fixed-capacity slot allocator backing every tree in this crate. Slots are
/// recycled through an intrusive free list threaded through register 0.
#[repr(C)]
#[derive(Copy, Clone)]
pub struct NodeAllocator<
    T: Default + Copy + Clone + Pod + Zeroable,
    const MAX_SIZE: usize,
    const NUM_REGISTERS: usize,
> {
    /// Number of live nodes. At most `MAX_SIZE - 1` because slot 0 is the
    /// sentinel.
    pub size: u64,
    /// High-water mark of slots that have been handed out at least once.
    bump_index: u32,
    /// Head of the free-list stack of recycled slots.
    free_list_head: u32,
    pub nodes: [Node<T, NUM_REGISTERS>; MAX_SIZE],
}

unsafe impl<
        T: Default + Copy + Clone + Pod + Zeroable,
        const MAX_SIZE: usize,
        const NUM_REGISTERS: usize,
    > Zeroable for NodeAllocator<T, MAX_SIZE, NUM_REGISTERS>
{
}
unsafe impl<
        T: Default + Copy + Clone + Pod + Zeroable,
        const MAX_SIZE: usize,
        const NUM_REGISTERS: usize,
    > Pod for NodeAllocator<T, MAX_SIZE, NUM_REGISTERS>
{
}
impl<
        T: Default + Copy + Clone + Pod + Zeroable,
        const MAX_SIZE: usize,
        const NUM_REGISTERS: usize,
    > ZeroCopy for NodeAllocator<T, MAX_SIZE, NUM_REGISTERS>
{
}

impl<
        T: Default + Copy + Clone + Pod + Zeroable,
        const MAX_SIZE: usize,
        const NUM_REGISTERS: usize,
    > Default for NodeAllocator<T, MAX_SIZE, NUM_REGISTERS>
{
    fn default() -> Self {
        assert!(NUM_REGISTERS >= 1);
        let allocator = NodeAllocator {
            size: 0,
            bump_index: 1,
            free_list_head: 1,
            nodes: [Node::<T, NUM_REGISTERS>::default(); MAX_SIZE],
        };
        allocator.assert_proper_alignment();
        allocator
    }
}

impl<
        T: Default + Copy + Clone + Pod + Zeroable,
        const MAX_SIZE: usize,
        const NUM_REGISTERS: usize,
    > NodeAllocator<T, MAX_SIZE, NUM_REGISTERS>
{
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    fn assert_proper_alignment(&self) {
        let reg_size = size_of::<u32>() * NUM_REGISTERS;
        let self_ptr = std::slice::from_ref(self).as_ptr() as usize;
        let node_ptr = std::slice::from_ref(&self.nodes).as_ptr() as usize;
        let t_index = node_ptr + reg_size;
        let t_align = align_of::<T>();
        let t_size = size_of::<T>();
        assert!(
            self_ptr % align_of::<Self>() == 0,
            "NodeAllocator address {} is not a multiple of the struct alignment ({})",
            self_ptr,
            align_of::<Self>(),
        );
        assert!(
            t_size % t_align == 0,
            "Size of T ({}) is not a multiple of the alignment of T ({})",
            t_size,
            t_align,
        );
        assert!(node_ptr == self_ptr + 16, "Nodes are misaligned");
        assert!(t_index % t_align == 0, "First index of T is misaligned");
        assert!(
            (t_index + t_size + reg_size) % t_align == 0,
            "Subsequent indices of T are misaligned"
        );
    }

    /// Prepares a zeroed buffer (or a freshly constructed value) for use.
    pub fn initialize(&mut self) {
        assert!(NUM_REGISTERS >= 1);
        self.assert_proper_alignment();
        if self.size == 0 && self.bump_index == 0 && self.free_list_head == 0 {
            self.bump_index = 1;
            self.free_list_head = 1;
        } else if self.bump_index == 0 || self.free_list_head == 0 {
            panic!("Cannot reinitialize NodeAllocator");
        }
    }

    #[inline(always)]
    pub fn get(&self, i: u32) -> &Node<T, NUM_REGISTERS> {
        &self.nodes[i as usize]
    }

    #[inline(always)]
    pub fn get_mut(&mut self, i: u32) -> &mut Node<T, NUM_REGISTERS> {
        &mut self.nodes[i as usize]
    }

    /// Claims a slot (from the free list when available, otherwise by
    /// bumping) and stores `node` in it. Callers must check capacity first;
    /// a full allocator panics.
    pub fn add_node(&mut self, node: T) -> u32 {
        let i = self.free_list_head;
        if self.free_list_head == self.bump_index {
            if self.bump_index == MAX_SIZE as u32 {
                panic!("Buffer is full, size {}", self.size);
            }
            self.bump_index += 1;
            self.free_list_head = self.bump_index;
        } else {
            self.free_list_head = self.get(i).get_free_list_register();
            self.get_mut(i).set_free_list_register(SENTINEL);
        }
        self.get_mut(i).set_value(node);
        self.size += 1;
        i
    }

    /// Returns slot `i` to the free list. All registers of `i` must be
    /// cleared before calling this.
    pub fn remove_node(&mut self, i: u32) -> Option<&T> {
        if i == SENTINEL {
            return None;
        }
        let free_list_head = self.free_list_head;
        self.get_mut(i).set_free_list_register(free_list_head);
        self.free_list_head = i;
        self.size -= 1;
        Some(self.get(i).get_value())
    }

    /// Sets `j` as the `r_i` link of `i` and `i` as the `r_j` link of `j`,
    /// skipping the sentinel on either side.
    #[inline(always)]
    pub fn connect(&mut self, i: u32, j: u32, r_i: u32, r_j: u32) {
        if i != SENTINEL {
            self.get_mut(i).set_register(r_i as usize, j);
        }
        if j != SENTINEL {
            self.get_mut(j).set_register(r_j as usize, i);
        }
    }

    #[inline(always)]
    pub fn clear_register(&mut self, i: u32, r_i: u32) {
        self.get_mut(i).set_register(r_i as usize, SENTINEL);
    }

    #[inline(always)]
    pub fn set_register(&mut self, i: u32, value: u32, r_i: u32) {
        if i != SENTINEL {
            self.get_mut(i).set_register(r_i as usize, value);
        }
    }

    #[inline(always)]
    pub fn get_register(&self, i: u32, r_i: u32) -> u32 {
        self.get(i).get_register(r_i as usize)
    }
}
