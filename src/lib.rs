//! Balsa packs self-balancing ordered maps into contiguous, `Pod`-safe byte
//! arrays. Each container embeds a fixed-capacity node allocator and links
//! nodes through `u32` index registers, so a whole tree can live on the
//! stack, in a `Vec<u8>`, or inside a memory-mapped buffer.
//!
//! Three balancing disciplines are provided:
//! - [`AvlTree`]: height-balanced, rebalanced along an explicit path vector.
//! - [`RedBlackTree`]: color-balanced, fixed up through parent registers.
//! - [`Treap`]: randomized, balanced in expectation by heap-ordered
//!   priorities.

pub mod avl_tree;
pub mod error;
pub mod node_allocator;
pub mod red_black_tree;
pub mod treap;

pub use avl_tree::*;
pub use error::*;
pub use node_allocator::*;
pub use red_black_tree::*;
pub use treap::*;
