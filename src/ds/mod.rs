//! Data structures backing the simulators.

pub mod lazy_max_heap;

pub use lazy_max_heap::LazyMaxHeap;
