use crate::{AllocError, TypedAlloc};
use allocator_api2::alloc::Allocator;
use std::alloc::Layout;
use std::cell::{Cell, UnsafeCell};
use std::fmt::{self, Debug};
use std::marker::PhantomData;
use std::mem::MaybeUninit;
use std::ptr::NonNull;

/// Fixed-size byte buffer that allocator views carve memory from.
///
/// The storage owns the bytes and the cursor marking how far they have been handed out.
/// The cursor only moves forward: carved ranges are never given back, the whole buffer is
/// released at once when the storage goes out of scope. Every `StackAlloc` borrows the
/// storage, so the storage can not be moved or dropped while any view (or any list using
/// one) is still alive.
///
/// The buffer lives inline, so `StackStorage<N>` put in a local variable takes `N` bytes of
/// stack.
pub struct StackStorage<const N: usize> {
    buffer: UnsafeCell<[MaybeUninit<u8>; N]>,
    cursor: Cell<usize>,
}

impl<const N: usize> StackStorage<N> {
    pub const fn new() -> StackStorage<N> {
        StackStorage {
            buffer: UnsafeCell::new([MaybeUninit::uninit(); N]),
            cursor: Cell::new(0),
        }
    }

    /// Total size of the buffer in bytes.
    #[inline(always)]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Bytes consumed so far, alignment padding included.
    #[inline(always)]
    pub fn used(&self) -> usize {
        self.cursor.get()
    }

    /// Bytes not yet handed out. A request may still fail below this amount if it needs
    /// alignment padding.
    #[inline(always)]
    pub fn remaining(&self) -> usize {
        N - self.cursor.get()
    }

    /// Reserves `size` bytes aligned to `align` (a power of two) and returns their start.
    pub fn carve(&self, size: usize, align: usize) -> Result<NonNull<u8>, AllocError> {
        self.handle().carve(size, align)
    }

    #[inline(always)]
    fn handle(&self) -> ArenaHandle<'_> {
        ArenaHandle {
            // SAFETY: pointer to a field of a live reference is never null.
            start: unsafe { NonNull::new_unchecked(self.buffer.get().cast::<u8>()) },
            capacity: N,
            cursor: &self.cursor,
        }
    }
}

impl<const N: usize> Default for StackStorage<N> {
    fn default() -> Self {
        StackStorage::new()
    }
}

impl<const N: usize> Debug for StackStorage<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackStorage")
            .field("capacity", &N)
            .field("used", &self.used())
            .finish()
    }
}

/// Shared state of one storage: where the bytes are and how far they are consumed.
/// Copies of the handle all point at the same cursor.
#[derive(Clone, Copy)]
struct ArenaHandle<'a> {
    start: NonNull<u8>,
    capacity: usize,
    cursor: &'a Cell<usize>,
}

impl<'a> ArenaHandle<'a> {
    fn carve(&self, size: usize, align: usize) -> Result<NonNull<u8>, AllocError> {
        debug_assert!(align.is_power_of_two(), "alignment must be a power of two");

        if size == 0 {
            // SAFETY: alignment is never zero.
            return Ok(unsafe { NonNull::new_unchecked(align as *mut u8) });
        }

        let offset = self.cursor.get();
        let remaining = self.capacity - offset;
        let address = self.start.as_ptr() as usize + offset;
        let padding = (align - (address % align)) % align;

        match padding.checked_add(size) {
            Some(needed) if needed <= remaining => {
                let aligned = offset + padding;
                self.cursor.set(aligned + size);
                trace!(arena, "carve {} bytes at offset {} (align {}, padding {})", size, aligned, align, padding);
                // SAFETY: aligned + size <= capacity, so the range is inside the buffer.
                Ok(unsafe { NonNull::new_unchecked(self.start.as_ptr().add(aligned)) })
            }
            _ => {
                debug!(arena, "carve of {} bytes (align {}) failed, {} of {} bytes remain", size, align, remaining, self.capacity);
                Err(AllocError::OutOfMemory { requested: size, align, remaining })
            }
        }
    }

    #[inline(always)]
    fn same_storage(&self, other: &ArenaHandle<'_>) -> bool {
        std::ptr::eq(self.cursor, other.cursor)
    }
}

/// Typed view of a `StackStorage` that hands out memory for values of `T`.
///
/// Views are cheap to copy. All views created from one storage, directly or through
/// `rebind`, share the storage cursor: carving through any of them consumes the same pool,
/// whatever their element type. Two views are equal when they draw from the same storage.
///
/// Deallocation is a no-op. Memory comes back only when the storage itself is dropped.
pub struct StackAlloc<'a, T> {
    arena: ArenaHandle<'a>,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T> StackAlloc<'a, T> {
    pub fn new<const N: usize>(storage: &'a StackStorage<N>) -> StackAlloc<'a, T> {
        StackAlloc {
            arena: storage.handle(),
            _marker: PhantomData,
        }
    }

    /// Creates a view for `T` that shares the storage of a view for another type.
    pub fn from_view<U>(other: &StackAlloc<'a, U>) -> StackAlloc<'a, T> {
        StackAlloc {
            arena: other.arena,
            _marker: PhantomData,
        }
    }

    /// Size of the underlying storage in bytes.
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.arena.capacity
    }

    /// Bytes of the underlying storage not yet handed out, by any view.
    #[inline(always)]
    pub fn remaining(&self) -> usize {
        self.arena.capacity - self.arena.cursor.get()
    }
}

impl<'a, T> Clone for StackAlloc<'a, T> {
    fn clone(&self) -> Self {
        StackAlloc::from_view(self)
    }
}

impl<'a, T> Copy for StackAlloc<'a, T> {}

impl<'a, T, U> PartialEq<StackAlloc<'a, U>> for StackAlloc<'a, T> {
    fn eq(&self, other: &StackAlloc<'a, U>) -> bool {
        self.arena.same_storage(&other.arena)
    }
}

impl<'a, T> Eq for StackAlloc<'a, T> {}

impl<'a, T> Debug for StackAlloc<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackAlloc")
            .field("storage", &self.arena.cursor.as_ptr())
            .field("capacity", &self.arena.capacity)
            .field("remaining", &self.remaining())
            .finish()
    }
}

impl<'a, T> TypedAlloc for StackAlloc<'a, T> {
    type Value = T;
    type Rebind<U> = StackAlloc<'a, U>;

    fn allocate(&self, count: usize) -> Result<NonNull<T>, AllocError> {
        let size = count
            .checked_mul(std::mem::size_of::<T>())
            .ok_or(AllocError::CapacityOverflow)?;
        if size == 0 {
            return Ok(NonNull::dangling());
        }
        self.arena
            .carve(size, std::mem::align_of::<T>())
            .map(|ptr| ptr.cast::<T>())
    }

    #[inline(always)]
    unsafe fn deallocate(&self, _ptr: NonNull<T>, _count: usize) {}

    #[inline(always)]
    fn rebind<U>(&self) -> StackAlloc<'a, U> {
        StackAlloc::from_view(self)
    }
}

// Lets `allocator_api2` collections carve from the same storage. Only a borrow of the
// storage is an allocator: the buffer is inline, so an owned storage would move the blocks
// it handed out along with itself.
unsafe impl<'s, const N: usize> Allocator for &'s StackStorage<N> {
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, allocator_api2::alloc::AllocError> {
        let ptr = self
            .carve(layout.size(), layout.align())
            .map_err(|_| allocator_api2::alloc::AllocError)?;
        Ok(NonNull::slice_from_raw_parts(ptr, layout.size()))
    }

    #[inline(always)]
    unsafe fn deallocate(&self, _ptr: NonNull<u8>, _layout: Layout) {}
}
