use crate::raw::{self, AllocError};
use std::any::type_name;
use std::fmt::{self, Debug};
use std::ops::{Deref, DerefMut};
use std::ptr::{null_mut, NonNull};

/// Heap cell for a single `T` that is only ever freed by an explicit `release`.
///
/// A `DumbPtr` holds at most one address. It never frees memory on its own: dropping a
/// cell that still owns a value leaks it. Code that used to pair `Box::into_raw` with a
/// later `Box::from_raw` can hold the address in a `DumbPtr` instead, so that every place
/// that allocates, releases or gives up ownership is spelled out.
///
/// Allocating into a cell that already owns a value does not release the old value;
/// the old allocation is leaked. Call `release` first if the value must be dropped.
///
/// The cell can not be cloned and can not be sent between threads.
///
/// ```
/// use dumbptr::DumbPtr;
///
/// let mut answer = DumbPtr::make(42);
/// assert_eq!(42, *answer);
/// answer.release();
/// assert!(!answer.is_owning());
/// ```
pub struct DumbPtr<T> {
    ptr: *mut T,
}

impl<T> DumbPtr<T> {
    /// Returns an empty cell.
    #[inline(always)]
    pub const fn null() -> DumbPtr<T> {
        DumbPtr { ptr: null_mut() }
    }

    /// Takes over an existing address. A null `ptr` produces an empty cell.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or come from `Box::<T>::into_raw` (or the equivalent global
    /// allocator layout for `T`), and nothing else may release it while this cell owns it.
    #[inline(always)]
    pub unsafe fn from_raw(ptr: *mut T) -> DumbPtr<T> {
        DumbPtr { ptr }
    }

    /// Allocates `value` and returns a cell that owns it.
    pub fn make(value: T) -> DumbPtr<T> {
        let ptr = Box::into_raw(Box::new(value));
        trace!("make {} at {:?}", type_name::<T>(), ptr);
        DumbPtr { ptr }
    }

    /// Allocates the value returned by `init`.
    pub fn make_with(init: impl FnOnce() -> T) -> DumbPtr<T> {
        DumbPtr::make(init())
    }

    /// Like `make`, but reports allocator failure instead of aborting.
    /// `value` is dropped if no storage could be obtained.
    pub fn try_make(value: T) -> Result<DumbPtr<T>, AllocError> {
        DumbPtr::try_make_with(|| value)
    }

    /// Allocates storage first and calls `init` only if that succeeded.
    pub fn try_make_with(init: impl FnOnce() -> T) -> Result<DumbPtr<T>, AllocError> {
        let slot = raw::try_new_value(init)?;
        trace!("make {} at {:?}", type_name::<T>(), slot);
        Ok(DumbPtr { ptr: slot.as_ptr() })
    }

    /// Allocates `value` and installs it. An address held before is dropped from tracking
    /// without being released.
    pub fn alloc(&mut self, value: T) {
        let ptr = Box::into_raw(Box::new(value));
        self.install(ptr);
    }

    /// Allocates the value returned by `init` and installs it. If `init` panics, the cell
    /// keeps the address it had.
    pub fn alloc_with(&mut self, init: impl FnOnce() -> T) {
        self.alloc(init());
    }

    /// Like `alloc`, but on allocator failure the cell is left unchanged.
    pub fn try_alloc(&mut self, value: T) -> Result<(), AllocError> {
        self.try_alloc_with(|| value)
    }

    pub fn try_alloc_with(&mut self, init: impl FnOnce() -> T) -> Result<(), AllocError> {
        let slot = raw::try_new_value(init)?;
        self.install(slot.as_ptr());
        Ok(())
    }

    fn install(&mut self, ptr: *mut T) {
        if !self.ptr.is_null() {
            debug!("alloc over owned {} at {:?}, previous allocation leaked", type_name::<T>(), self.ptr);
        }
        trace!("alloc {} at {:?}", type_name::<T>(), ptr);
        self.ptr = ptr;
    }

    /// Stops owning the value without releasing it and returns the address that was held
    /// (null if the cell was empty).
    pub fn forget(&mut self) -> *mut T {
        let ptr = std::mem::replace(&mut self.ptr, null_mut());
        if !ptr.is_null() {
            trace!("forget {} at {:?}", type_name::<T>(), ptr);
        }
        ptr
    }

    /// Drops the owned value, frees its storage and empties the cell.
    /// Does nothing if the cell is empty, so releasing twice is fine.
    pub fn release(&mut self) {
        let ptr = self.forget();
        if ptr.is_null() {
            return;
        }
        trace!("release {} at {:?}", type_name::<T>(), ptr);
        drop(unsafe { Box::from_raw(ptr) });
    }

    /// Moves ownership into a new cell, leaving this one empty.
    #[inline(always)]
    pub fn take(&mut self) -> DumbPtr<T> {
        DumbPtr { ptr: std::mem::replace(&mut self.ptr, null_mut()) }
    }

    /// Converts the cell into automatic ownership. Returns `None` for an empty cell.
    pub fn into_box(mut self) -> Option<Box<T>> {
        NonNull::new(self.forget()).map(|ptr| unsafe { Box::from_raw(ptr.as_ptr()) })
    }

    #[inline(always)]
    pub fn is_owning(&self) -> bool {
        !self.ptr.is_null()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.ptr.is_null()
    }

    /// The owned address, or null. Ownership stays with the cell.
    #[inline(always)]
    pub fn as_ptr(&self) -> *mut T {
        self.ptr
    }

    /// The owned value, or `None` for an empty cell.
    pub fn get(&self) -> Option<&T> {
        unsafe { self.ptr.as_ref() }
    }

    pub fn get_mut(&mut self) -> Option<&mut T> {
        unsafe { self.ptr.as_mut() }
    }

    /// # Safety
    ///
    /// The cell must be owning.
    #[inline(always)]
    pub unsafe fn get_unchecked(&self) -> &T {
        &*self.ptr
    }

    /// # Safety
    ///
    /// The cell must be owning.
    #[inline(always)]
    pub unsafe fn get_unchecked_mut(&mut self) -> &mut T {
        &mut *self.ptr
    }
}

impl<T> Default for DumbPtr<T> {
    fn default() -> Self {
        DumbPtr::null()
    }
}

impl<T> From<Box<T>> for DumbPtr<T> {
    fn from(value: Box<T>) -> Self {
        DumbPtr { ptr: Box::into_raw(value) }
    }
}

fn empty_access<T>() -> ! {
    panic!("accessed an empty DumbPtr<{}>", type_name::<T>())
}

impl<T> Deref for DumbPtr<T> {
    type Target = T;

    fn deref(&self) -> &T {
        match self.get() {
            Some(value) => value,
            None => empty_access::<T>(),
        }
    }
}

impl<T> DerefMut for DumbPtr<T> {
    fn deref_mut(&mut self) -> &mut T {
        match self.get_mut() {
            Some(value) => value,
            None => empty_access::<T>(),
        }
    }
}

impl<T> Debug for DumbPtr<T> where T: Debug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(value) => f.debug_tuple("DumbPtr").field(value).finish(),
            None => f.write_str("DumbPtr(null)"),
        }
    }
}

impl<T> Drop for DumbPtr<T> {
    fn drop(&mut self) {
        // never frees, see type docs
        if !self.ptr.is_null() {
            debug!("DumbPtr<{}> dropped while owning {:?}, allocation leaked", type_name::<T>(), self.ptr);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::DumbPtr;
    use crate::dropflag::{DropFlag, Tracked};

    #[test]
    fn make_then_release() {
        let mut cell = DumbPtr::make(42);
        assert!(cell.is_owning());
        assert_eq!(42, *cell);
        cell.release();
        assert!(!cell.is_owning());
        assert!(cell.is_empty());
    }

    #[test]
    fn make_matches_direct_construction() {
        let cell = DumbPtr::make(String::from("quest"));
        assert_eq!(String::from("quest"), *cell);
        assert_eq!(5, cell.len());
        cell.into_box();
    }

    #[test]
    fn default_is_empty() {
        let cell: DumbPtr<u8> = Default::default();
        assert!(!cell.is_owning());
        assert!(cell.as_ptr().is_null());
        assert!(cell.get().is_none());
    }

    #[test]
    fn release_drops_value_once() {
        let flag = DropFlag::default();
        let mut cell = DumbPtr::make(Tracked::new(1, &flag));
        cell.release();
        assert_eq!(1, *flag.borrow());
        cell.release();
        assert_eq!(1, *flag.borrow());
        assert!(!cell.is_owning());
    }

    #[test]
    fn release_on_empty_is_noop() {
        let mut cell = DumbPtr::<i32>::null();
        cell.release();
        cell.release();
        assert!(cell.is_empty());
    }

    #[test]
    fn forget_keeps_value_alive() {
        let flag = DropFlag::default();
        let original = Box::into_raw(Box::new(Tracked::new(7, &flag)));
        let mut cell = unsafe { DumbPtr::from_raw(original) };
        assert!(cell.is_owning());

        let returned = cell.forget();
        assert_eq!(original, returned);
        assert!(!cell.is_owning());
        assert_eq!(0, *flag.borrow());
        assert_eq!(7, unsafe { (*original).value });

        drop(unsafe { Box::from_raw(original) });
        assert_eq!(1, *flag.borrow());
    }

    #[test]
    fn from_raw_null_is_empty() {
        let cell = unsafe { DumbPtr::<u32>::from_raw(std::ptr::null_mut()) };
        assert!(cell.is_empty());
    }

    #[test]
    fn alloc_over_owned_value_leaks_it() {
        let flag = DropFlag::default();
        let mut cell = DumbPtr::make(Tracked::new(1, &flag));
        let first = cell.as_ptr();

        cell.alloc(Tracked::new(2, &flag));
        assert_eq!(0, *flag.borrow());
        assert_eq!(2, cell.value);

        cell.release();
        assert_eq!(1, *flag.borrow());

        // reclaim the leaked one so the test itself does not leak
        drop(unsafe { Box::from_raw(first) });
        assert_eq!(2, *flag.borrow());
    }

    #[test]
    fn alloc_cycles_between_states() {
        let mut cell = DumbPtr::<i32>::null();
        for i in 0..3 {
            cell.alloc_with(|| i * 2);
            assert_eq!(i * 2, *cell);
            cell.release();
            assert!(cell.is_empty());
        }
    }

    #[test]
    fn panicking_init_keeps_previous_address() {
        let mut cell = DumbPtr::make(5);
        let before = cell.as_ptr();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            cell.alloc_with(|| -> i32 { panic!("constructor failed") });
        }));
        assert!(result.is_err());
        assert_eq!(before, cell.as_ptr());
        assert_eq!(5, *cell);
        cell.release();
    }

    #[test]
    fn deref_mut_writes_through() {
        let mut cell = DumbPtr::make(vec![1, 2]);
        cell.push(3);
        assert_eq!(&[1, 2, 3], cell.as_slice());
        unsafe { cell.get_unchecked_mut().push(4) };
        assert_eq!(4, unsafe { cell.get_unchecked() }.len());
        cell.release();
    }

    #[test]
    #[should_panic(expected = "accessed an empty DumbPtr")]
    fn deref_of_empty_panics() {
        let cell = DumbPtr::<i32>::null();
        let value: i32 = *cell;
        assert_eq!(0, value);
    }

    #[test]
    fn take_moves_ownership() {
        let mut source = DumbPtr::make(9);
        let address = source.as_ptr();
        let mut target = source.take();
        assert!(source.is_empty());
        assert_eq!(address, target.as_ptr());
        assert_eq!(9, *target);
        target.release();
    }

    #[test]
    fn try_make_and_try_alloc() {
        let mut cell = DumbPtr::try_make(11u64).unwrap();
        assert_eq!(11, *cell);
        cell.release();
        cell.try_alloc(12).unwrap();
        assert_eq!(12, *cell);
        cell.release();

        let mut unit = DumbPtr::try_make_with(|| ()).unwrap();
        assert!(unit.is_owning());
        unit.release();
    }

    #[test]
    fn box_round_trip() {
        let cell = DumbPtr::from(Box::new(3));
        assert_eq!(Some(Box::new(3)), cell.into_box());
        assert_eq!(None, DumbPtr::<i32>::null().into_box());
    }

    #[test]
    fn option_accessors() {
        let mut cell = DumbPtr::make(4);
        if let Some(value) = cell.get_mut() {
            *value += 1;
        }
        assert_eq!(Some(&5), cell.get());
        cell.release();
        assert_eq!(None, cell.get_mut());
    }

    #[test]
    fn zero_sized_value() {
        let mut cell = DumbPtr::make(());
        assert!(cell.is_owning());
        assert!(!cell.as_ptr().is_null());
        cell.release();
        cell.alloc(());
        assert_eq!((), *cell);
        cell.release();
        assert!(cell.is_empty());
    }

    #[test]
    fn panicking_try_make_with_drops_nothing_and_keeps_cell() {
        let flag = DropFlag::default();
        let mut cell = DumbPtr::make(Tracked::new(1, &flag));
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            cell.try_alloc_with(|| -> Tracked { panic!("constructor failed") })
        }));
        assert!(result.is_err());
        assert_eq!(1, cell.value);
        assert_eq!(0, *flag.borrow());

        let address = cell.forget();
        let mut adopted = unsafe { DumbPtr::from_raw(address) };
        adopted.release();
        assert_eq!(1, *flag.borrow());
    }

    #[test]
    fn debug_format() {
        let mut cell = DumbPtr::make(1);
        assert_eq!("DumbPtr(1)", format!("{:?}", cell));
        cell.release();
        assert_eq!("DumbPtr(null)", format!("{:?}", cell));
    }
}
