use crate::{AllocError, TypedAlloc};
use allocator_api2::alloc::{Allocator, Global};
use std::alloc::Layout;
use std::fmt::{self, Debug};
use std::marker::PhantomData;
use std::ptr::NonNull;

/// General-purpose allocator backed by the global heap.
///
/// Stateless: every instance is equal to every other, and released nodes are really freed.
/// This is the allocator a `List` uses when none is given.
pub struct HeapAlloc<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> HeapAlloc<T> {
    #[inline(always)]
    pub const fn new() -> HeapAlloc<T> {
        HeapAlloc { _marker: PhantomData }
    }
}

impl<T> Default for HeapAlloc<T> {
    fn default() -> Self {
        HeapAlloc::new()
    }
}

impl<T> Clone for HeapAlloc<T> {
    fn clone(&self) -> Self {
        HeapAlloc::new()
    }
}

impl<T> Copy for HeapAlloc<T> {}

impl<T, U> PartialEq<HeapAlloc<U>> for HeapAlloc<T> {
    fn eq(&self, _other: &HeapAlloc<U>) -> bool {
        true
    }
}

impl<T> Eq for HeapAlloc<T> {}

impl<T> Debug for HeapAlloc<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HeapAlloc<{}>", std::any::type_name::<T>())
    }
}

impl<T> TypedAlloc for HeapAlloc<T> {
    type Value = T;
    type Rebind<U> = HeapAlloc<U>;

    fn allocate(&self, count: usize) -> Result<NonNull<T>, AllocError> {
        let layout = Layout::array::<T>(count).map_err(|_| AllocError::CapacityOverflow)?;
        Global.allocate(layout)
            .map(|block| block.cast::<T>())
            .map_err(|_| AllocError::Exhausted { requested: layout.size(), align: layout.align() })
    }

    unsafe fn deallocate(&self, ptr: NonNull<T>, count: usize) {
        let layout = match Layout::array::<T>(count) {
            Ok(layout) => layout,
            Err(_) => {
                // `allocate` rejects such counts, so `ptr` can not have come from it.
                debug_assert!(false, "deallocate of {} values that were never allocated", count);
                return;
            }
        };
        Global.deallocate(ptr.cast(), layout);
    }

    #[inline(always)]
    fn rebind<U>(&self) -> HeapAlloc<U> {
        HeapAlloc::new()
    }
}
