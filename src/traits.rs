use crate::{AllocError, List};
use std::ptr::NonNull;

/// Allocator capability used by `List` for every node it creates.
///
/// An allocator hands out memory for `count` values of `Self::Value` and can be rebound to
/// a different value type. A rebound allocator must draw from the same backing resource, so
/// that memory carved through any instance is accounted for by all of them.
///
/// Allocation takes `&self`: instances that share a resource do it through interior
/// mutability, the way `StackAlloc` shares its cursor.
pub trait TypedAlloc: Clone + PartialEq {
    /// The element type this instance allocates for.
    type Value;

    /// The same allocator, allocating for `U` instead.
    type Rebind<U>: TypedAlloc<Value = U>;

    /// Whether assigning one list to another also moves the source's allocator over.
    const PROPAGATE_ON_COPY_ASSIGNMENT: bool = false;

    /// Returns memory for `count` values, aligned for `Self::Value`.
    fn allocate(&self, count: usize) -> Result<NonNull<Self::Value>, AllocError>;

    /// Gives back memory obtained from `allocate`.
    ///
    /// # Safety
    ///
    /// `ptr` must come from `allocate(count)` on this allocator or one equal to it, and must
    /// not be used afterwards.
    unsafe fn deallocate(&self, ptr: NonNull<Self::Value>, count: usize);

    /// Produces an allocator for `U` backed by the same resource.
    fn rebind<U>(&self) -> Self::Rebind<U>;

    /// Picks the allocator a copied list should use.
    fn select_on_copy(&self) -> Self {
        self.clone()
    }
}

/// Implements collect to lists backed by any `TypedAlloc`.
pub trait CollectList: Iterator {
    fn try_collect_list_in<A>(self, alloc: A) -> Result<List<Self::Item, A>, AllocError>
        where
            A: TypedAlloc<Value=Self::Item>;

    fn try_collect_result_list_in<I, E, A>(self, alloc: A) -> Result<List<I, A>, E>
        where
            Self: Iterator<Item=Result<I, E>>,
            A: TypedAlloc<Value=I>,
            E: From<AllocError>;
}

impl<Q: Iterator> CollectList for Q {
    fn try_collect_list_in<A>(self, alloc: A) -> Result<List<Self::Item, A>, AllocError>
        where
            A: TypedAlloc<Value=Self::Item>
    {
        List::try_from_iter_in(self, alloc)
    }

    fn try_collect_result_list_in<I, E, A>(self, alloc: A) -> Result<List<I, A>, E>
        where
            Self: Iterator<Item=Result<I, E>>,
            A: TypedAlloc<Value=I>,
            E: From<AllocError>
    {
        let mut list = List::new_in(alloc);
        for mi in self {
            let i = mi?;
            list.push_back(i)?;
        }
        Ok(list)
    }
}

#[cfg(test)]
mod collect_tests {
    use crate::{CollectList, HeapAlloc, StackAlloc, StackStorage, AllocError};

    #[derive(Debug, PartialEq)]
    enum ParseFailure {
        NotANumber,
        Alloc(AllocError),
    }

    impl From<AllocError> for ParseFailure {
        fn from(e: AllocError) -> Self {
            ParseFailure::Alloc(e)
        }
    }

    #[test]
    fn test_collect() {
        let storage = StackStorage::<1024>::new();
        let list = (0..12)
            .map(|v| v as i16)
            .try_collect_list_in(StackAlloc::new(&storage))
            .unwrap();

        for (i, (item, expected)) in list.iter().zip((0..12).map(|v| v as i16)).enumerate() {
            assert_eq!(*item, expected, "at index {}", i);
        }
        assert_eq!(12, list.len());
    }

    #[test]
    fn collect_result_stops_at_first_error() {
        let parsed = ["1", "2", "x", "4"]
            .iter()
            .map(|s| s.parse::<i32>().map_err(|_| ParseFailure::NotANumber))
            .try_collect_result_list_in(HeapAlloc::new());
        assert_eq!(Err(ParseFailure::NotANumber), parsed.map(|l| l.len()));

        let parsed = ["1", "2", "3"]
            .iter()
            .map(|s| s.parse::<i32>().map_err(|_| ParseFailure::NotANumber))
            .try_collect_result_list_in(HeapAlloc::new())
            .unwrap();
        assert_eq!(vec![1, 2, 3], parsed.iter().copied().collect::<Vec<_>>());
    }

    #[test]
    fn collect_reports_arena_exhaustion() {
        let storage = StackStorage::<64>::new();
        let result = (0..100u64).try_collect_list_in(StackAlloc::new(&storage));
        assert!(matches!(result, Err(AllocError::OutOfMemory { .. })));
    }
}
