//! Error types for fallible reservations.

use core::alloc::Layout;

/// The error returned by `try_reserve` and the other fallible growth paths.
///
/// A table that reports this error is left exactly as it was before the
/// call.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum TryReserveError {
    /// The requested capacity does not fit in `usize`, or its allocation
    /// would exceed `isize::MAX` bytes.
    #[error("capacity overflow")]
    CapacityOverflow,

    /// The allocator refused the request.
    #[error("memory allocation of {} bytes failed", layout.size())]
    AllocError {
        /// Layout of the refused allocation.
        layout: Layout,
    },
}

impl TryReserveError {
    /// Diverges the way the infallible APIs do: capacity overflow panics and
    /// allocation failure goes to [`handle_alloc_error`].
    ///
    /// [`handle_alloc_error`]: alloc::alloc::handle_alloc_error
    #[cold]
    #[inline(never)]
    pub(crate) fn abort(self) -> ! {
        match self {
            TryReserveError::CapacityOverflow => panic!("capacity overflow"),
            TryReserveError::AllocError { layout } => alloc::alloc::handle_alloc_error(layout),
        }
    }
}
