//! This module is for testing only

use crate::{AllocError, HeapAlloc, TypedAlloc};
use std::cell::{Cell, RefCell};
use std::marker::PhantomData;
use std::ptr::NonNull;
use std::rc::Rc;

pub type DropFlag<T> = Rc<RefCell<T>>;

/// Payload that counts how many times it was dropped.
#[derive(Debug)]
pub struct Counted {
    pub value: i32,
    pub drops: DropFlag<i32>,
}

impl Drop for Counted {
    fn drop(&mut self) {
        *self.drops.borrow_mut() += 1;
    }
}

/// Payload whose `Clone` panics once the shared budget of clones runs out.
pub struct Fragile {
    pub value: i32,
    pub clones_left: DropFlag<usize>,
}

impl Clone for Fragile {
    fn clone(&self) -> Self {
        let mut left = self.clones_left.borrow_mut();
        if *left == 0 {
            drop(left);
            panic!("clone budget exhausted at {}", self.value);
        }
        *left -= 1;
        Fragile { value: self.value, clones_left: self.clones_left.clone() }
    }
}

struct Ledger {
    live: Cell<isize>,
    budget: Cell<usize>,
    next_id: Rc<Cell<u32>>,
}

/// Heap allocator that counts live allocations and can be told to start failing.
///
/// Copies and rebinds share the counters and compare equal. `PROPAGATE` sets the
/// copy-assignment policy, `FRESH_ON_COPY` makes `select_on_copy` hand out an allocator
/// with a new identity (and its own counters).
pub struct TestAlloc<T, const PROPAGATE: bool = false, const FRESH_ON_COPY: bool = false> {
    id: u32,
    ledger: Rc<Ledger>,
    _marker: PhantomData<fn() -> T>,
}

thread_local! {
    static NEXT_ID: Rc<Cell<u32>> = Rc::new(Cell::new(1));
}

impl<T, const P: bool, const F: bool> TestAlloc<T, P, F> {
    pub fn new() -> Self {
        let next_id = NEXT_ID.with(|ids| ids.clone());
        let id = next_id.get();
        next_id.set(id + 1);
        TestAlloc {
            id,
            ledger: Rc::new(Ledger {
                live: Cell::new(0),
                budget: Cell::new(usize::MAX),
                next_id,
            }),
            _marker: PhantomData,
        }
    }

    /// Allocations currently handed out and not released, across all rebinds.
    pub fn live(&self) -> isize {
        self.ledger.live.get()
    }

    /// Number of further allocations that will succeed.
    pub fn set_budget(&self, allocations: usize) {
        self.ledger.budget.set(allocations);
    }
}

impl<T, const P: bool, const F: bool> Clone for TestAlloc<T, P, F> {
    fn clone(&self) -> Self {
        TestAlloc { id: self.id, ledger: self.ledger.clone(), _marker: PhantomData }
    }
}

impl<T, const P: bool, const F: bool> PartialEq for TestAlloc<T, P, F> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T, const P: bool, const F: bool> std::fmt::Debug for TestAlloc<T, P, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TestAlloc#{}(live {})", self.id, self.live())
    }
}

impl<T, const P: bool, const F: bool> TypedAlloc for TestAlloc<T, P, F> {
    type Value = T;
    type Rebind<U> = TestAlloc<U, P, F>;

    const PROPAGATE_ON_COPY_ASSIGNMENT: bool = P;

    fn allocate(&self, count: usize) -> Result<NonNull<T>, AllocError> {
        let budget = self.ledger.budget.get();
        if budget == 0 {
            return Err(AllocError::Exhausted {
                requested: count * std::mem::size_of::<T>(),
                align: std::mem::align_of::<T>(),
            });
        }
        let ptr = HeapAlloc::<T>::new().allocate(count)?;
        self.ledger.budget.set(budget - 1);
        self.ledger.live.set(self.ledger.live.get() + 1);
        Ok(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<T>, count: usize) {
        self.ledger.live.set(self.ledger.live.get() - 1);
        HeapAlloc::<T>::new().deallocate(ptr, count);
    }

    fn rebind<U>(&self) -> TestAlloc<U, P, F> {
        TestAlloc { id: self.id, ledger: self.ledger.clone(), _marker: PhantomData }
    }

    fn select_on_copy(&self) -> Self {
        if F {
            let id = self.ledger.next_id.get();
            self.ledger.next_id.set(id + 1);
            TestAlloc {
                id,
                ledger: Rc::new(Ledger {
                    live: Cell::new(0),
                    budget: Cell::new(usize::MAX),
                    next_id: self.ledger.next_id.clone(),
                }),
                _marker: PhantomData,
            }
        } else {
            self.clone()
        }
    }
}

#[test]
fn dropflag() {
    let flag = DropFlag::new(RefCell::new(0));
    let counted = Counted { value: 1, drops: flag.clone() };
    assert_eq!(0, *flag.borrow());
    std::mem::drop(counted);
    assert_eq!(1, *flag.borrow());
}

#[test]
fn test_alloc_tracks_rebinds_and_identity() {
    let alloc = TestAlloc::<u32>::new();
    let rebound: TestAlloc<u64> = alloc.rebind();
    let ptr = rebound.allocate(2).unwrap();
    assert_eq!(1, alloc.live());
    unsafe { rebound.deallocate(ptr, 2) };
    assert_eq!(0, alloc.live());

    assert!(alloc == alloc.select_on_copy());
    let fresh = TestAlloc::<u32, false, true>::new();
    assert!(fresh != fresh.select_on_copy());

    alloc.set_budget(0);
    assert!(alloc.allocate(1).is_err());
}
