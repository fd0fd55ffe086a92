use crate::error::ParallelError;
use nix::errno::Errno;
use nix::sys::mman::{MapFlags, ProtFlags, mmap_anonymous, munmap};
use std::mem::{ManuallyDrop, size_of};
use std::num::NonZeroUsize;
use std::ops::Range;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, AtomicUsize};

/// Element types that may live in a [`SharedRegion`].
///
/// # Safety
///
/// The all-zero bit pattern must be a valid value and the type must not own
/// pointers or other process-local resources.
pub unsafe trait Zeroable: Sized {}

unsafe impl Zeroable for i32 {}
unsafe impl Zeroable for AtomicU64 {}
unsafe impl Zeroable for AtomicUsize {}

/// An anonymous `MAP_SHARED` mapping holding `len` zeroed values of `T`.
///
/// The mapping survives `fork`, so parent and workers see the same memory; it is
/// the only channel the parallel commands use between processes. Workers leave
/// with `_exit` and never run this type's destructor, so only the creating process
/// unmaps the region, after every worker has been joined.
pub struct SharedRegion<T: Zeroable> {
    ptr: NonNull<T>,
    len: usize,
    bytes: NonZeroUsize,
}

impl<T: Zeroable> SharedRegion<T> {
    /// Map a fresh region for `len` elements.
    pub fn create(len: usize) -> Result<Self, ParallelError> {
        let bytes = len
            .checked_mul(size_of::<T>())
            .ok_or(ParallelError::SharedMemory(Errno::ENOMEM))?;
        let bytes = NonZeroUsize::new(bytes).unwrap_or(NonZeroUsize::MIN);

        // SAFETY: a new anonymous mapping aliases no existing memory.
        let ptr = unsafe {
            mmap_anonymous(
                None,
                bytes,
                ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
                MapFlags::MAP_SHARED,
            )
        }
        .map_err(ParallelError::SharedMemory)?;

        tracing::debug!(len, bytes = bytes.get(), "mapped shared region");
        Ok(Self {
            ptr: ptr.cast(),
            len,
            bytes,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Read access to the whole region.
    ///
    /// For plain integers this is only meaningful while no worker can still write,
    /// i.e. before the fan-out or after the final join.
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: the mapping is page aligned, zero-initialized and `len` elements long.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// Write access to the whole region for the process that owns it.
    pub fn map_for_write(&mut self) -> &mut [T] {
        // SAFETY: as for `as_slice`; `&mut self` rules out other views in this process.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    /// Write access to one span of the region.
    ///
    /// # Safety
    ///
    /// While the returned slice is alive, no other reference to `range` may exist
    /// in this process and no other process may access `range`.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn slice_mut(&self, range: Range<usize>) -> &mut [T] {
        assert!(range.start <= range.end && range.end <= self.len);
        // SAFETY: bounds checked above; exclusivity is the caller's contract.
        unsafe {
            std::slice::from_raw_parts_mut(self.ptr.as_ptr().add(range.start), range.len())
        }
    }

    /// Unmap the region, reporting failure instead of ignoring it.
    pub fn release(self) -> Result<(), ParallelError> {
        let region = ManuallyDrop::new(self);
        // SAFETY: the pointer and size come from the matching mmap call.
        unsafe { munmap(region.ptr.cast(), region.bytes.get()) }.map_err(ParallelError::SharedMemory)
    }
}

impl<T: Zeroable> Drop for SharedRegion<T> {
    fn drop(&mut self) {
        // SAFETY: the pointer and size come from the matching mmap call.
        if let Err(e) = unsafe { munmap(self.ptr.cast(), self.bytes.get()) } {
            tracing::warn!(error = %e, "failed to unmap shared region");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::lock_process_state;
    use nix::sys::wait::{WaitStatus, waitpid};
    use nix::unistd::{ForkResult, fork};
    use std::sync::atomic::Ordering;

    #[test]
    fn new_region_is_zeroed() {
        let region = SharedRegion::<i32>::create(16).unwrap();
        assert_eq!(region.len(), 16);
        assert!(region.as_slice().iter().all(|&v| v == 0));
        region.release().unwrap();
    }

    #[test]
    fn empty_region_is_allowed() {
        let mut region = SharedRegion::<i32>::create(0).unwrap();
        assert!(region.is_empty());
        assert!(region.map_for_write().is_empty());
    }

    #[test]
    fn oversized_region_is_rejected() {
        assert!(matches!(
            SharedRegion::<AtomicU64>::create(usize::MAX),
            Err(ParallelError::SharedMemory(Errno::ENOMEM))
        ));
    }

    #[test]
    fn writes_in_a_child_are_visible_after_join() {
        let _lock = lock_process_state();
        let mut region = SharedRegion::<i32>::create(4).unwrap();
        region.map_for_write().copy_from_slice(&[1, 2, 3, 4]);
        let counter = SharedRegion::<AtomicU64>::create(1).unwrap();

        match unsafe { fork() }.unwrap() {
            ForkResult::Child => {
                unsafe { region.slice_mut(2..4) }.copy_from_slice(&[30, 40]);
                counter.as_slice()[0].fetch_add(5, Ordering::SeqCst);
                unsafe { nix::libc::_exit(0) };
            }
            ForkResult::Parent { child } => {
                assert!(matches!(waitpid(child, None).unwrap(), WaitStatus::Exited(_, 0)));
            }
        }

        assert_eq!(region.as_slice(), &[1, 2, 30, 40]);
        assert_eq!(counter.as_slice()[0].load(Ordering::SeqCst), 5);
    }
}
