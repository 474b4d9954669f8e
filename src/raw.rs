use std::alloc::{self, Layout};
use std::fmt::{self, Display};
use std::mem;
use std::ptr::{self, NonNull};

/// Failure to obtain storage for a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// The global allocator returned null for a layout of this size and alignment.
    OutOfMemory { size: usize, align: usize },
    /// `count` elements do not fit in `isize::MAX` bytes.
    CapacityOverflow { count: usize },
}

impl Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocError::OutOfMemory { size, align } => write!(f, "Allocator could not provide {} bytes aligned to {}", size, align),
            AllocError::CapacityOverflow { count } => write!(f, "Array of {} elements exceeds the maximum allocation size", count),
        }
    }
}

impl std::error::Error for AllocError {}

impl AllocError {
    /// Diverges the way `Box` and `Vec` do for the infallible constructors.
    pub(crate) fn raise(self) -> ! {
        if let AllocError::OutOfMemory { size, align } = self {
            if let Ok(layout) = Layout::from_size_align(size, align) {
                alloc::handle_alloc_error(layout);
            }
        }
        panic!("{}", self)
    }
}

pub(crate) fn array_layout<T>(count: usize) -> Result<Layout, AllocError> {
    Layout::array::<T>(count).map_err(|_| AllocError::CapacityOverflow { count })
}

/// Zero-sized layouts never reach the allocator and get a dangling, aligned address,
/// the same one `Box` would use, so the result can always be released through `Box`.
fn allocate(layout: Layout) -> Result<NonNull<u8>, AllocError> {
    if layout.size() == 0 {
        return Ok(unsafe { NonNull::new_unchecked(layout.align() as *mut u8) });
    }
    let ptr = unsafe { alloc::alloc(layout) };
    NonNull::new(ptr).ok_or(AllocError::OutOfMemory { size: layout.size(), align: layout.align() })
}

unsafe fn deallocate(ptr: NonNull<u8>, layout: Layout) {
    if layout.size() != 0 {
        alloc::dealloc(ptr.as_ptr(), layout);
    }
}

/// Storage that is being filled. If construction unwinds, the elements written so far
/// are dropped and the storage is returned to the allocator.
struct PartialBlock<T> {
    block: NonNull<T>,
    layout: Layout,
    initialized: usize,
}

impl<T> Drop for PartialBlock<T> {
    fn drop(&mut self) {
        trace!("unwinding partial block of {} initialized items", self.initialized);
        unsafe {
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(self.block.as_ptr(), self.initialized));
            deallocate(self.block.cast(), self.layout);
        }
    }
}

/// Allocates a `Box<T>`-compatible slot and moves the result of `init` into it.
/// `init` is not called if allocation fails.
pub(crate) fn try_new_value<T>(init: impl FnOnce() -> T) -> Result<NonNull<T>, AllocError> {
    let layout = Layout::new::<T>();
    let slot = allocate(layout)?.cast::<T>();
    let guard = PartialBlock { block: slot, layout, initialized: 0 };
    let value = init();
    mem::forget(guard);
    unsafe { slot.as_ptr().write(value) };
    Ok(slot)
}

/// Allocates a `Box<[T]>`-compatible block of `count` elements, element `i` set to `init(i)`.
pub(crate) fn try_new_block<T>(count: usize, mut init: impl FnMut(usize) -> T) -> Result<NonNull<T>, AllocError> {
    let layout = array_layout::<T>(count)?;
    let block = allocate(layout)?.cast::<T>();
    let mut guard = PartialBlock { block, layout, initialized: 0 };
    while guard.initialized < count {
        let item = init(guard.initialized);
        unsafe { block.as_ptr().add(guard.initialized).write(item) };
        guard.initialized += 1;
    }
    mem::forget(guard);
    Ok(block)
}
