//! Allocator-aware doubly-linked list, and a stack arena to back it.
//!
//! `List` takes every node from a `TypedAlloc`. `HeapAlloc` is the default; `StackAlloc`
//! carves nodes out of a fixed `StackStorage` buffer shared by every view rebound from it.
//!
//! ```
//! use stacklist::{List, StackAlloc, StackStorage};
//!
//! let storage = StackStorage::<1024>::new();
//! let mut list = List::new_in(StackAlloc::new(&storage));
//! list.push_back(10).unwrap();
//! list.push_front(11).unwrap();
//! assert_eq!(vec![11, 10], list.iter().copied().collect::<Vec<i32>>());
//! assert!(storage.used() > 0);
//! ```

#[macro_use]
mod logging;
mod error;
mod traits;
mod heap;
mod arena;
mod list;
mod iter;

pub use error::AllocError;
pub use traits::{TypedAlloc, CollectList};
pub use heap::HeapAlloc;
pub use arena::{StackStorage, StackAlloc};
pub use list::{List, Cursor, CursorMut, RevCursor};
pub use iter::{Iter, IterMut, IntoIter};

#[cfg(test)]
pub mod dropflag;
