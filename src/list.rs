use crate::iter::{IntoIter, Iter, IterMut};
use crate::{AllocError, HeapAlloc, TypedAlloc};
use std::fmt;
use std::marker::PhantomData;
use std::ptr::{self, NonNull};

/// Link to a neighbour in the ring. `None` refers to the list's sentinel.
pub(crate) type Link<T> = Option<NonNull<Node<T>>>;

pub(crate) struct Links<T> {
    pub(crate) next: Link<T>,
    pub(crate) prev: Link<T>,
}

impl<T> Links<T> {
    /// Links of a sentinel with no nodes, or of a node not yet spliced in.
    #[inline(always)]
    const fn closed() -> Links<T> {
        Links { next: None, prev: None }
    }
}

impl<T> Clone for Links<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Links<T> {}

pub(crate) struct Node<T> {
    pub(crate) links: Links<T>,
    pub(crate) value: T,
}

/// Releases a carved node whose value was never written, if the value constructor unwinds.
struct ReleaseOnUnwind<'r, N: TypedAlloc> {
    alloc: &'r N,
    ptr: NonNull<N::Value>,
}

impl<'r, N: TypedAlloc> Drop for ReleaseOnUnwind<'r, N> {
    fn drop(&mut self) {
        trace!(list, "releasing unconstructed node at {:?}", self.ptr);
        unsafe { self.alloc.deallocate(self.ptr, 1) };
    }
}

/// Doubly-linked list whose nodes all come from the allocator `A`.
///
/// The nodes form a ring closed by a sentinel kept inside the `List` value itself. The
/// sentinel's `next` is the first element and its `prev` the last; a node link of `None`
/// points back at the sentinel. The sentinel is therefore never allocated and the list can
/// be moved freely.
///
/// Every operation that creates a node carves it first, then builds the value, then
/// splices the node in. If carving fails the error is returned and nothing changes; if
/// building the value panics the node memory is released before the panic continues.
///
/// Popping from an empty list returns `None` rather than being a caller error.
pub struct List<T, A: TypedAlloc<Value=T> = HeapAlloc<T>> {
    sentinel: Links<T>,
    len: usize,
    alloc: A,
    _marker: PhantomData<Box<Node<T>>>,
}

impl<T> List<T> {
    /// Creates an empty list on the global heap. Lists over another `Default` allocator
    /// are created with `List::default()`.
    pub fn new() -> List<T> {
        List::new_in(HeapAlloc::new())
    }
}

impl<T, A: TypedAlloc<Value=T>> List<T, A> {
    /// Creates an empty list that will take its nodes from `alloc`.
    pub fn new_in(alloc: A) -> List<T, A> {
        List {
            sentinel: Links::closed(),
            len: 0,
            alloc,
            _marker: PhantomData,
        }
    }

    /// Creates a list of `count` clones of `value`.
    pub fn from_elem_in(count: usize, value: &T, alloc: A) -> Result<List<T, A>, AllocError>
        where T: Clone
    {
        let mut list = List::new_in(alloc);
        for _ in 0..count {
            list.emplace_back_with(|| value.clone())?;
        }
        Ok(list)
    }

    /// Creates a list holding the items of `iter` in order.
    pub fn try_from_iter_in<I>(iter: I, alloc: A) -> Result<List<T, A>, AllocError>
        where I: IntoIterator<Item=T>
    {
        let mut list = List::new_in(alloc);
        for item in iter {
            list.push_back(item)?;
        }
        Ok(list)
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns a copy of the allocator this list uses.
    pub fn allocator(&self) -> A {
        self.alloc.clone()
    }

    pub fn front(&self) -> Option<&T> {
        self.sentinel.next.map(|node| unsafe { &(*node.as_ptr()).value })
    }

    pub fn front_mut(&mut self) -> Option<&mut T> {
        self.sentinel.next.map(|node| unsafe { &mut (*node.as_ptr()).value })
    }

    pub fn back(&self) -> Option<&T> {
        self.sentinel.prev.map(|node| unsafe { &(*node.as_ptr()).value })
    }

    pub fn back_mut(&mut self) -> Option<&mut T> {
        self.sentinel.prev.map(|node| unsafe { &mut (*node.as_ptr()).value })
    }

    pub fn contains(&self, value: &T) -> bool
        where T: PartialEq
    {
        self.iter().any(|item| item == value)
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            head: self.sentinel.next,
            tail: self.sentinel.prev,
            len: self.len,
            _marker: PhantomData,
        }
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        IterMut {
            head: self.sentinel.next,
            tail: self.sentinel.prev,
            len: self.len,
            _marker: PhantomData,
        }
    }

    /// Appends `value` after the last element.
    pub fn push_back(&mut self, value: T) -> Result<(), AllocError> {
        self.emplace_back_with(|| value).map(|_| ())
    }

    /// Prepends `value` before the first element.
    pub fn push_front(&mut self, value: T) -> Result<(), AllocError> {
        self.emplace_front_with(|| value).map(|_| ())
    }

    /// Carves a node, builds its value with `make` and appends it.
    pub fn emplace_back_with<F>(&mut self, make: F) -> Result<&mut T, AllocError>
        where F: FnOnce() -> T
    {
        let node = self.carve_node(make)?;
        unsafe {
            self.link_before(node, None);
            Ok(&mut (*node.as_ptr()).value)
        }
    }

    /// Carves a node, builds its value with `make` and prepends it.
    pub fn emplace_front_with<F>(&mut self, make: F) -> Result<&mut T, AllocError>
        where F: FnOnce() -> T
    {
        let node = self.carve_node(make)?;
        unsafe {
            self.link_before(node, self.sentinel.next);
            Ok(&mut (*node.as_ptr()).value)
        }
    }

    /// Removes the last element, or returns `None` if the list is empty.
    pub fn pop_back(&mut self) -> Option<T> {
        self.sentinel.prev.map(|node| unsafe { self.unlink(node).0 })
    }

    /// Removes the first element, or returns `None` if the list is empty.
    pub fn pop_front(&mut self) -> Option<T> {
        self.sentinel.next.map(|node| unsafe { self.unlink(node).0 })
    }

    /// Drops every element and releases its node, front to back.
    pub fn clear(&mut self) {
        while let Some(node) = self.sentinel.next {
            let (value, _) = unsafe { self.unlink(node) };
            drop(value);
        }
    }

    /// Reverses the order of the elements in place by swapping the links of every node and
    /// of the sentinel.
    pub fn reverse(&mut self) {
        let mut at = self.sentinel.next;
        while let Some(node) = at {
            unsafe {
                let links = &mut (*node.as_ptr()).links;
                std::mem::swap(&mut links.next, &mut links.prev);
                at = links.prev;
            }
        }
        std::mem::swap(&mut self.sentinel.next, &mut self.sentinel.prev);
    }

    /// Copies every element into a new list that uses `alloc`.
    ///
    /// If cloning an element panics, the nodes built so far are released before the panic
    /// continues.
    pub fn try_clone_in(&self, alloc: A) -> Result<List<T, A>, AllocError>
        where T: Clone
    {
        let mut copy = List::new_in(alloc);
        for item in self.iter() {
            copy.emplace_back_with(|| item.clone())?;
        }
        Ok(copy)
    }

    /// Copies the list, with the allocator chosen by `TypedAlloc::select_on_copy`.
    pub fn try_clone(&self) -> Result<List<T, A>, AllocError>
        where T: Clone
    {
        self.try_clone_in(self.alloc.select_on_copy())
    }

    /// Replaces the contents of this list with copies of the elements of `source`.
    ///
    /// A complete copy is built first and then swapped in, so on failure this list is left
    /// as it was. The copy uses the source's allocator when the allocator type propagates on
    /// assignment, and this list's allocator otherwise. The old elements are released
    /// through the allocator they were carved from.
    pub fn assign_from(&mut self, source: &List<T, A>) -> Result<(), AllocError>
        where T: Clone
    {
        let alloc = if A::PROPAGATE_ON_COPY_ASSIGNMENT {
            debug!(list, "copy assignment takes over the source allocator");
            source.alloc.clone()
        } else {
            self.alloc.clone()
        };

        let mut replacement = source.try_clone_in(alloc)?;
        std::mem::swap(&mut self.sentinel, &mut replacement.sentinel);
        std::mem::swap(&mut self.len, &mut replacement.len);
        if A::PROPAGATE_ON_COPY_ASSIGNMENT {
            std::mem::swap(&mut self.alloc, &mut replacement.alloc);
        }
        Ok(())
    }

    /// Cursor on the first element, or on the end marker if the list is empty.
    pub fn cursor_front(&self) -> Cursor<'_, T, A> {
        Cursor { current: self.sentinel.next, list: self }
    }

    /// Cursor on the last element, or on the end marker if the list is empty.
    pub fn cursor_back(&self) -> Cursor<'_, T, A> {
        Cursor { current: self.sentinel.prev, list: self }
    }

    /// Cursor on the end marker.
    pub fn cursor_end(&self) -> Cursor<'_, T, A> {
        Cursor { current: None, list: self }
    }

    pub fn cursor_front_mut(&mut self) -> CursorMut<'_, T, A> {
        CursorMut { current: self.sentinel.next, list: self }
    }

    pub fn cursor_back_mut(&mut self) -> CursorMut<'_, T, A> {
        CursorMut { current: self.sentinel.prev, list: self }
    }

    pub fn cursor_end_mut(&mut self) -> CursorMut<'_, T, A> {
        CursorMut { current: None, list: self }
    }

    #[inline(always)]
    fn links(&self, at: Link<T>) -> Links<T> {
        match at {
            None => self.sentinel,
            Some(node) => unsafe { (*node.as_ptr()).links },
        }
    }

    /// `at` must be `None` or a node of this list.
    #[inline(always)]
    unsafe fn links_mut(&mut self, at: Link<T>) -> &mut Links<T> {
        match at {
            None => &mut self.sentinel,
            Some(node) => &mut (*node.as_ptr()).links,
        }
    }

    fn carve_node<F>(&self, make: F) -> Result<NonNull<Node<T>>, AllocError>
        where F: FnOnce() -> T
    {
        let node_alloc = self.alloc.rebind::<Node<T>>();
        let ptr = node_alloc.allocate(1)?;
        trace!(list, "carved node at {:?}", ptr);

        let guard = ReleaseOnUnwind { alloc: &node_alloc, ptr };
        let value = make();
        std::mem::forget(guard);

        unsafe { ptr.as_ptr().write(Node { links: Links::closed(), value }) };
        Ok(ptr)
    }

    /// Splices a detached `node` in front of `at`.
    unsafe fn link_before(&mut self, node: NonNull<Node<T>>, at: Link<T>) {
        let prev = self.links(at).prev;
        (*node.as_ptr()).links = Links { next: at, prev };
        self.links_mut(prev).next = Some(node);
        self.links_mut(at).prev = Some(node);
        self.len += 1;
    }

    /// Takes `node` out of the ring, moves its value out and releases the node.
    /// Returns the value and the link that followed the node.
    unsafe fn unlink(&mut self, node: NonNull<Node<T>>) -> (T, Link<T>) {
        let Links { next, prev } = (*node.as_ptr()).links;
        self.links_mut(prev).next = next;
        self.links_mut(next).prev = prev;
        self.len -= 1;

        let Node { value, .. } = ptr::read(node.as_ptr());
        trace!(list, "releasing node at {:?}", node);
        self.alloc.rebind::<Node<T>>().deallocate(node, 1);
        (value, next)
    }
}

impl<T, A: TypedAlloc<Value=T>> Drop for List<T, A> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T, A: TypedAlloc<Value=T> + Default> Default for List<T, A> {
    fn default() -> Self {
        List::new_in(A::default())
    }
}

impl<T: Clone, A: TypedAlloc<Value=T>> Clone for List<T, A> {
    /// Panics if the allocator can not provide the nodes.
    fn clone(&self) -> Self {
        match self.try_clone() {
            Ok(list) => list,
            Err(e) => panic!("{}", e),
        }
    }

    /// Panics if the allocator can not provide the nodes, leaving `self` unchanged.
    fn clone_from(&mut self, source: &Self) {
        if let Err(e) = self.assign_from(source) {
            panic!("{}", e);
        }
    }
}

impl<T, A: TypedAlloc<Value=T> + Default> std::iter::FromIterator<T> for List<T, A> {
    /// Panics if the allocator can not provide the nodes.
    fn from_iter<I: IntoIterator<Item=T>>(iter: I) -> Self {
        match List::try_from_iter_in(iter, A::default()) {
            Ok(list) => list,
            Err(e) => panic!("{}", e),
        }
    }
}

impl<T: fmt::Debug, A: TypedAlloc<Value=T>> fmt::Debug for List<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for i in self.iter() {
            list.entry(i);
        }
        list.finish()
    }
}

impl<T, A, B> PartialEq<List<T, B>> for List<T, A>
    where
        T: PartialEq,
        A: TypedAlloc<Value=T>,
        B: TypedAlloc<Value=T>,
{
    fn eq(&self, other: &List<T, B>) -> bool {
        self.len == other.len() && self.iter().eq(other.iter())
    }
}

impl<T: Eq, A: TypedAlloc<Value=T>> Eq for List<T, A> {}

impl<T, A: TypedAlloc<Value=T>> IntoIterator for List<T, A> {
    type Item = T;
    type IntoIter = IntoIter<T, A>;

    fn into_iter(self) -> IntoIter<T, A> {
        IntoIter { list: self }
    }
}

impl<'a, T, A: TypedAlloc<Value=T>> IntoIterator for &'a List<T, A> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

impl<'a, T, A: TypedAlloc<Value=T>> IntoIterator for &'a mut List<T, A> {
    type Item = &'a mut T;
    type IntoIter = IterMut<'a, T>;

    fn into_iter(self) -> IterMut<'a, T> {
        self.iter_mut()
    }
}

/// Read-only position in a list: an element or the end marker.
///
/// Moving past the last element lands on the end marker, and moving once more wraps to
/// the first element, following the ring. The same holds backwards.
pub struct Cursor<'a, T, A: TypedAlloc<Value=T> = HeapAlloc<T>> {
    current: Link<T>,
    list: &'a List<T, A>,
}

impl<'a, T, A: TypedAlloc<Value=T>> Cursor<'a, T, A> {
    /// The element under the cursor, `None` on the end marker.
    pub fn current(&self) -> Option<&'a T> {
        self.current.map(|node| unsafe { &(*node.as_ptr()).value })
    }

    #[inline(always)]
    pub fn is_end(&self) -> bool {
        self.current.is_none()
    }

    pub fn move_next(&mut self) {
        self.current = self.list.links(self.current).next;
    }

    pub fn move_prev(&mut self) {
        self.current = self.list.links(self.current).prev;
    }

    /// The element a `move_next` would land on.
    pub fn peek_next(&self) -> Option<&'a T> {
        self.list.links(self.current).next.map(|node| unsafe { &(*node.as_ptr()).value })
    }

    /// The element a `move_prev` would land on.
    pub fn peek_prev(&self) -> Option<&'a T> {
        self.list.links(self.current).prev.map(|node| unsafe { &(*node.as_ptr()).value })
    }

    /// Reverse view anchored at this position.
    pub fn reversed(self) -> RevCursor<'a, T, A> {
        RevCursor { base: self }
    }
}

impl<'a, T, A: TypedAlloc<Value=T>> Clone for Cursor<'a, T, A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, T, A: TypedAlloc<Value=T>> Copy for Cursor<'a, T, A> {}

impl<'a, T, A: TypedAlloc<Value=T>> PartialEq for Cursor<'a, T, A> {
    fn eq(&self, other: &Self) -> bool {
        self.current == other.current && ptr::eq(self.list, other.list)
    }
}

impl<'a, T, A: TypedAlloc<Value=T>> Eq for Cursor<'a, T, A> {}

impl<'a, T: fmt::Debug, A: TypedAlloc<Value=T>> fmt::Debug for Cursor<'a, T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Cursor").field(&self.current()).finish()
    }
}

/// Reverse view of a `Cursor`.
///
/// The reverse position stands on the element just before its `base` forward position, so
/// a reverse view anchored at the end marker starts on the last element, and one anchored
/// at the first element stands on the end marker.
pub struct RevCursor<'a, T, A: TypedAlloc<Value=T> = HeapAlloc<T>> {
    base: Cursor<'a, T, A>,
}

impl<'a, T, A: TypedAlloc<Value=T>> RevCursor<'a, T, A> {
    pub fn current(&self) -> Option<&'a T> {
        self.base.peek_prev()
    }

    /// Steps towards the front of the list.
    pub fn move_next(&mut self) {
        self.base.move_prev();
    }

    /// Steps towards the back of the list.
    pub fn move_prev(&mut self) {
        self.base.move_next();
    }

    /// The forward position this view is anchored at.
    pub fn base(&self) -> Cursor<'a, T, A> {
        self.base
    }
}

impl<'a, T, A: TypedAlloc<Value=T>> Clone for RevCursor<'a, T, A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, T, A: TypedAlloc<Value=T>> Copy for RevCursor<'a, T, A> {}

impl<'a, T, A: TypedAlloc<Value=T>> PartialEq for RevCursor<'a, T, A> {
    fn eq(&self, other: &Self) -> bool {
        self.base == other.base
    }
}

impl<'a, T, A: TypedAlloc<Value=T>> Eq for RevCursor<'a, T, A> {}

impl<'a, T: fmt::Debug, A: TypedAlloc<Value=T>> fmt::Debug for RevCursor<'a, T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RevCursor").field(&self.current()).finish()
    }
}

/// Position in a list that can insert and remove elements.
pub struct CursorMut<'a, T, A: TypedAlloc<Value=T> = HeapAlloc<T>> {
    current: Link<T>,
    list: &'a mut List<T, A>,
}

impl<'a, T, A: TypedAlloc<Value=T>> CursorMut<'a, T, A> {
    pub fn current(&mut self) -> Option<&mut T> {
        self.current.map(|node| unsafe { &mut (*node.as_ptr()).value })
    }

    #[inline(always)]
    pub fn is_end(&self) -> bool {
        self.current.is_none()
    }

    pub fn move_next(&mut self) {
        self.current = self.list.links(self.current).next;
    }

    pub fn move_prev(&mut self) {
        self.current = self.list.links(self.current).prev;
    }

    /// Inserts `value` before the cursor and moves the cursor onto it.
    /// On the end marker this appends.
    pub fn insert_before(&mut self, value: T) -> Result<(), AllocError> {
        self.emplace_before_with(|| value)
    }

    /// Carves a node, builds its value with `make`, inserts it before the cursor and moves
    /// the cursor onto it.
    pub fn emplace_before_with<F>(&mut self, make: F) -> Result<(), AllocError>
        where F: FnOnce() -> T
    {
        let node = self.list.carve_node(make)?;
        unsafe { self.list.link_before(node, self.current) };
        self.current = Some(node);
        Ok(())
    }

    /// Removes the element under the cursor and moves the cursor to the element that
    /// followed it. On the end marker nothing happens and `None` is returned.
    pub fn remove_current(&mut self) -> Option<T> {
        let node = self.current?;
        let (value, next) = unsafe { self.list.unlink(node) };
        self.current = next;
        Some(value)
    }

    /// Read-only cursor at the same position, borrowing this one.
    pub fn as_cursor(&self) -> Cursor<'_, T, A> {
        Cursor { current: self.current, list: &*self.list }
    }
}

impl<'a, T, A: TypedAlloc<Value=T>> From<CursorMut<'a, T, A>> for Cursor<'a, T, A> {
    fn from(cursor: CursorMut<'a, T, A>) -> Self {
        Cursor { current: cursor.current, list: cursor.list }
    }
}
