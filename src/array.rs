use crate::raw::{self, AllocError};
use std::any::type_name;
use std::fmt::{self, Debug};
use std::ops::{Index, IndexMut};
use std::ptr::{self, null_mut};

/// Heap block of `len` contiguous `T` that is only ever freed by an explicit `release`.
///
/// The array counterpart of `DumbPtr`. The block has the same layout as `Box<[T]>`, and
/// it is released as a whole block, never element by element.
///
/// Indexing an empty cell or reading past `len` panics. The `unsafe` unchecked accessors
/// skip both checks.
///
/// ```
/// use dumbptr::DumbArray;
///
/// let mut items = DumbArray::<i32>::make(5);
/// assert!(items.as_slice().unwrap().iter().all(|&item| item == 0));
/// items[2] = 7;
/// assert_eq!(7, items[2]);
/// items.release();
/// assert!(!items.is_owning());
/// ```
pub struct DumbArray<T> {
    ptr: *mut T,
    len: usize,
}

impl<T> DumbArray<T> {
    /// Returns an empty cell with length zero.
    #[inline(always)]
    pub const fn null() -> DumbArray<T> {
        DumbArray { ptr: null_mut(), len: 0 }
    }

    /// Takes over an existing block of `len` elements. A null `ptr` produces an empty cell
    /// and `len` is ignored.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or the data pointer of a `Box<[T]>` of exactly `len` elements
    /// (for example from `Box::into_raw`), and nothing else may release it while this cell
    /// owns it.
    pub unsafe fn from_raw_parts(ptr: *mut T, len: usize) -> DumbArray<T> {
        if ptr.is_null() {
            DumbArray::null()
        } else {
            DumbArray { ptr, len }
        }
    }

    /// Allocates `len` default elements.
    pub fn make(len: usize) -> DumbArray<T> where T: Default {
        DumbArray::make_with(len, |_| T::default())
    }

    /// Allocates `len` elements, element `i` set to `init(i)`. If `init` panics, the
    /// elements built so far are dropped and the block is freed.
    pub fn make_with(len: usize, init: impl FnMut(usize) -> T) -> DumbArray<T> {
        match DumbArray::try_make_with(len, init) {
            Ok(array) => array,
            Err(e) => e.raise(),
        }
    }

    pub fn try_make(len: usize) -> Result<DumbArray<T>, AllocError> where T: Default {
        DumbArray::try_make_with(len, |_| T::default())
    }

    pub fn try_make_with(len: usize, init: impl FnMut(usize) -> T) -> Result<DumbArray<T>, AllocError> {
        let block = raw::try_new_block(len, init)?;
        trace!("make [{}; {}] at {:?}", type_name::<T>(), len, block);
        Ok(DumbArray { ptr: block.as_ptr(), len })
    }

    /// Allocates `len` default elements and installs them, replacing the length.
    /// A block held before is dropped from tracking without being released.
    pub fn alloc(&mut self, len: usize) where T: Default {
        self.alloc_with(len, |_| T::default())
    }

    pub fn alloc_with(&mut self, len: usize, init: impl FnMut(usize) -> T) {
        if let Err(e) = self.try_alloc_with(len, init) {
            e.raise();
        }
    }

    /// Like `alloc`, but on failure the cell is left unchanged.
    pub fn try_alloc(&mut self, len: usize) -> Result<(), AllocError> where T: Default {
        self.try_alloc_with(len, |_| T::default())
    }

    pub fn try_alloc_with(&mut self, len: usize, init: impl FnMut(usize) -> T) -> Result<(), AllocError> {
        let block = raw::try_new_block(len, init)?;
        if !self.ptr.is_null() {
            debug!("alloc over owned [{}; {}] at {:?}, previous allocation leaked", type_name::<T>(), self.len, self.ptr);
        }
        trace!("alloc [{}; {}] at {:?}", type_name::<T>(), len, block);
        self.ptr = block.as_ptr();
        self.len = len;
        Ok(())
    }

    /// Stops owning the block without releasing it. Returns the address and length that
    /// were held, `(null, 0)` for an empty cell.
    pub fn forget(&mut self) -> (*mut T, usize) {
        let ptr = std::mem::replace(&mut self.ptr, null_mut());
        let len = std::mem::replace(&mut self.len, 0);
        if !ptr.is_null() {
            trace!("forget [{}; {}] at {:?}", type_name::<T>(), len, ptr);
        }
        (ptr, len)
    }

    /// Drops every element, frees the block and empties the cell.
    /// Does nothing if the cell is empty.
    pub fn release(&mut self) {
        let (ptr, len) = self.forget();
        if ptr.is_null() {
            return;
        }
        trace!("release [{}; {}] at {:?}", type_name::<T>(), len, ptr);
        drop(unsafe { Box::from_raw(ptr::slice_from_raw_parts_mut(ptr, len)) });
    }

    /// Moves ownership into a new cell, leaving this one empty.
    pub fn take(&mut self) -> DumbArray<T> {
        let ptr = std::mem::replace(&mut self.ptr, null_mut());
        let len = std::mem::replace(&mut self.len, 0);
        DumbArray { ptr, len }
    }

    /// Converts the cell into automatic ownership. Returns `None` for an empty cell.
    pub fn into_boxed_slice(mut self) -> Option<Box<[T]>> {
        let (ptr, len) = self.forget();
        if ptr.is_null() {
            return None;
        }
        Some(unsafe { Box::from_raw(ptr::slice_from_raw_parts_mut(ptr, len)) })
    }

    #[inline(always)]
    pub fn is_owning(&self) -> bool {
        !self.ptr.is_null()
    }

    /// True when the cell owns nothing. An owned block of zero elements is not empty.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.ptr.is_null()
    }

    /// Number of owned elements, zero when empty.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    pub fn as_ptr(&self) -> *mut T {
        self.ptr
    }

    pub fn as_slice(&self) -> Option<&[T]> {
        if self.ptr.is_null() {
            None
        } else {
            Some(unsafe { std::slice::from_raw_parts(self.ptr, self.len) })
        }
    }

    pub fn as_mut_slice(&mut self) -> Option<&mut [T]> {
        if self.ptr.is_null() {
            None
        } else {
            Some(unsafe { std::slice::from_raw_parts_mut(self.ptr, self.len) })
        }
    }

    /// # Safety
    ///
    /// The cell must be owning and `index < self.len()`.
    #[inline(always)]
    pub unsafe fn get_unchecked(&self, index: usize) -> &T {
        &*self.ptr.add(index)
    }

    /// # Safety
    ///
    /// The cell must be owning and `index < self.len()`.
    #[inline(always)]
    pub unsafe fn get_unchecked_mut(&mut self, index: usize) -> &mut T {
        &mut *self.ptr.add(index)
    }
}

impl<T> Default for DumbArray<T> {
    fn default() -> Self {
        DumbArray::null()
    }
}

impl<T> From<Box<[T]>> for DumbArray<T> {
    fn from(items: Box<[T]>) -> Self {
        let len = items.len();
        let ptr = Box::into_raw(items) as *mut T;
        DumbArray { ptr, len }
    }
}

impl<T> From<Vec<T>> for DumbArray<T> {
    fn from(items: Vec<T>) -> Self {
        DumbArray::from(items.into_boxed_slice())
    }
}

fn empty_index<T>(index: usize) -> ! {
    panic!("indexed an empty DumbArray<{}> at {}", type_name::<T>(), index)
}

impl<T> Index<usize> for DumbArray<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        match self.as_slice() {
            Some(items) => &items[index],
            None => empty_index::<T>(index),
        }
    }
}

impl<T> IndexMut<usize> for DumbArray<T> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        match self.as_mut_slice() {
            Some(items) => &mut items[index],
            None => empty_index::<T>(index),
        }
    }
}

impl<T> Debug for DumbArray<T> where T: Debug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_slice() {
            Some(items) => f.debug_tuple("DumbArray").field(&items).finish(),
            None => f.write_str("DumbArray(null)"),
        }
    }
}

impl<T> Drop for DumbArray<T> {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            debug!("DumbArray<{}> of {} dropped while owning {:?}, allocation leaked", type_name::<T>(), self.len, self.ptr);
        }
    }
}
