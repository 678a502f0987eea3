use std::fmt::{self, Display};

/// Failure to obtain memory for a carve request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// The arena can not fit `requested` bytes at alignment `align`, only `remaining`
    /// bytes are left before alignment padding.
    OutOfMemory { requested: usize, align: usize, remaining: usize },
    /// The byte size of the request does not fit in `usize`.
    CapacityOverflow,
    /// The general-purpose allocator returned no memory.
    Exhausted { requested: usize, align: usize },
}

impl Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocError::OutOfMemory { requested, align, remaining } => write!(
                f,
                "Arena out of memory: requested {} bytes aligned to {}, but only {} bytes remain",
                requested, align, remaining
            ),
            AllocError::CapacityOverflow => Display::fmt("Requested allocation size overflows usize", f),
            AllocError::Exhausted { requested, align } => write!(
                f,
                "Allocator failed to provide {} bytes aligned to {}",
                requested, align
            ),
        }
    }
}

impl std::error::Error for AllocError {}
