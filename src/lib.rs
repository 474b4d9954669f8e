/*!

Heap cells with explicit, manual lifetime control.

`DumbPtr<T>` owns at most one heap `T` and `DumbArray<T>` owns at most one heap block of
`T`. Neither frees anything when dropped: memory goes away only through `release`, and
`forget` gives up ownership without freeing. They are meant for code that still pairs
allocations and deallocations by hand, and should be replaced by `Box` once every
`release` has a clear owner.

Enable the `logging` feature to get `trace` records for every allocation and `debug`
records for every leak the cells can see.

*/

#[macro_use]
mod logging;
mod raw;
mod ptr;
mod array;

pub use raw::AllocError;
pub use ptr::DumbPtr;
pub use array::DumbArray;

#[cfg(test)]
pub mod dropflag;
