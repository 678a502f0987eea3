use crate::list::Node;
use crate::{List, TypedAlloc};
use std::fmt;
use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::ptr::NonNull;

/// Borrowing iterator over list elements, front to back. Reversible with `rev`.
pub struct Iter<'a, T> {
    pub(crate) head: Option<NonNull<Node<T>>>,
    pub(crate) tail: Option<NonNull<Node<T>>>,
    pub(crate) len: usize,
    pub(crate) _marker: PhantomData<&'a Node<T>>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if self.len == 0 {
            return None;
        }
        self.head.map(|node| unsafe {
            let node = &*node.as_ptr();
            self.len -= 1;
            self.head = node.links.next;
            &node.value
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<'a, T> DoubleEndedIterator for Iter<'a, T> {
    fn next_back(&mut self) -> Option<&'a T> {
        if self.len == 0 {
            return None;
        }
        self.tail.map(|node| unsafe {
            let node = &*node.as_ptr();
            self.len -= 1;
            self.tail = node.links.prev;
            &node.value
        })
    }
}

impl<'a, T> ExactSizeIterator for Iter<'a, T> {}

impl<'a, T> FusedIterator for Iter<'a, T> {}

impl<'a, T> Clone for Iter<'a, T> {
    fn clone(&self) -> Self {
        Iter { ..*self }
    }
}

impl<'a, T: fmt::Debug> fmt::Debug for Iter<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Iter").field(&self.len).finish()
    }
}

/// Mutably borrowing iterator over list elements.
pub struct IterMut<'a, T> {
    pub(crate) head: Option<NonNull<Node<T>>>,
    pub(crate) tail: Option<NonNull<Node<T>>>,
    pub(crate) len: usize,
    pub(crate) _marker: PhantomData<&'a mut Node<T>>,
}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = &'a mut T;

    fn next(&mut self) -> Option<&'a mut T> {
        if self.len == 0 {
            return None;
        }
        self.head.map(|node| unsafe {
            let node = &mut *node.as_ptr();
            self.len -= 1;
            self.head = node.links.next;
            &mut node.value
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<'a, T> DoubleEndedIterator for IterMut<'a, T> {
    fn next_back(&mut self) -> Option<&'a mut T> {
        if self.len == 0 {
            return None;
        }
        self.tail.map(|node| unsafe {
            let node = &mut *node.as_ptr();
            self.len -= 1;
            self.tail = node.links.prev;
            &mut node.value
        })
    }
}

impl<'a, T> ExactSizeIterator for IterMut<'a, T> {}

impl<'a, T> FusedIterator for IterMut<'a, T> {}

impl<'a, T: fmt::Debug> fmt::Debug for IterMut<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IterMut").field(&self.len).finish()
    }
}

/// Owning iterator, pops elements off the list it consumed.
pub struct IntoIter<T, A: TypedAlloc<Value=T>> {
    pub(crate) list: List<T, A>,
}

impl<T, A: TypedAlloc<Value=T>> IntoIter<T, A> {
    /// Returns the elements not yet yielded as a list.
    pub fn into_list(self) -> List<T, A> {
        self.list
    }
}

impl<T, A: TypedAlloc<Value=T>> Iterator for IntoIter<T, A> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<T> {
        self.list.pop_front()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.list.len(), Some(self.list.len()))
    }
}

impl<T, A: TypedAlloc<Value=T>> DoubleEndedIterator for IntoIter<T, A> {
    #[inline]
    fn next_back(&mut self) -> Option<T> {
        self.list.pop_back()
    }
}

impl<T, A: TypedAlloc<Value=T>> ExactSizeIterator for IntoIter<T, A> {}

impl<T, A: TypedAlloc<Value=T>> FusedIterator for IntoIter<T, A> {}

impl<T: fmt::Debug, A: TypedAlloc<Value=T>> fmt::Debug for IntoIter<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IntoIter").field(&self.list).finish()
    }
}
