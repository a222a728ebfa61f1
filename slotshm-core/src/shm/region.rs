//! SharedRegion - POSIX shared memory wrapper.
//!
//! Provides safe abstraction over mmap and shm_open for the single message slot.
//! All unsafe operations are encapsulated with length checks at the call sites.

use std::os::fd::{AsRawFd, OwnedFd};
use std::ptr::NonNull;

use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::mman::{shm_open, shm_unlink};
use nix::sys::stat::Mode;

use crate::error::{InitOperation, TransportInitError};
use crate::types::{ChannelName, PayloadSize};

/// How the region is mapped into this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadWrite,
    ReadOnly,
}

/// Represents a mapped shared memory region.
///
/// This struct owns the mapping and the descriptor and releases both on drop.
/// It never unlinks the name; the Writer owns that step.
pub struct SharedRegion {
    /// Channel the region belongs to.
    name: ChannelName,
    /// Pointer to the mapped memory.
    ptr: NonNull<u8>,
    /// Size of the mapped region in bytes.
    size: usize,
    /// Descriptor of the shared memory object, closed on drop.
    fd: OwnedFd,
    access: Access,
    /// True when `create` made the object rather than reusing one.
    created: bool,
}

// SAFETY: SharedRegion owns its mapping; the pointer stays valid for the
// lifetime of the value regardless of the thread it is used on.
unsafe impl Send for SharedRegion {}

// SAFETY: Concurrent access to the bytes is serialized by the channel's
// named mutex semaphore.
unsafe impl Sync for SharedRegion {}

impl SharedRegion {
    /// Create (or reuse) the shared memory object, size it and map it read-write.
    ///
    /// # Errors
    /// Returns TransportInitError naming the failed call. Nothing is left
    /// mapped or open on failure, and an object created by this call is
    /// unlinked again.
    pub fn create(name: &ChannelName, size: PayloadSize) -> Result<Self, TransportInitError> {
        let object = name.shm_name();

        let (fd, created) = open_for_write(object)
            .map_err(|e| TransportInitError::new(InitOperation::ShmOpen, object, e))?;

        let ptr = match size_and_map(&fd, size.bytes()) {
            Ok(ptr) => ptr,
            Err((operation, e)) => {
                if created {
                    discard_object(name);
                }
                return Err(TransportInitError::new(operation, object, e));
            }
        };

        tracing::debug!(
            name = %name,
            size = size.bytes(),
            created = created,
            "Created shared memory region"
        );

        Ok(Self {
            name: name.clone(),
            ptr,
            size: size.bytes(),
            fd,
            access: Access::ReadWrite,
            created,
        })
    }

    /// Open an existing shared memory object and map it read-only.
    ///
    /// Fails with `ENOENT` if the writer has not created it yet, and with a
    /// size check error if the object is smaller than `size` (mapping past
    /// its end would fault on first access).
    pub fn open_read_only(
        name: &ChannelName,
        size: PayloadSize,
    ) -> Result<Self, TransportInitError> {
        let object = name.shm_name();

        let fd = shm_open(object, OFlag::O_RDONLY, Mode::empty())
            .map_err(|e| TransportInitError::new(InitOperation::ShmOpen, object, e))?;

        // SAFETY: stat is plain data; fstat fills it on success
        let mut stat: libc::stat = unsafe { std::mem::zeroed() };
        let result = unsafe { libc::fstat(fd.as_raw_fd(), &mut stat) };
        if result < 0 {
            return Err(TransportInitError::new(
                InitOperation::Fstat,
                object,
                Errno::last(),
            ));
        }

        let actual = stat.st_size as u64;
        if actual < size.bytes() as u64 {
            tracing::debug!(
                name = %name,
                expected = size.bytes(),
                actual = actual,
                "Shared memory object smaller than payload size"
            );
            return Err(TransportInitError::new(
                InitOperation::SizeCheck,
                object,
                Errno::EINVAL,
            ));
        }

        let ptr = map(&fd, size.bytes(), Access::ReadOnly)
            .map_err(|e| TransportInitError::new(InitOperation::Mmap, object, e))?;

        tracing::debug!(name = %name, size = size.bytes(), "Opened shared memory region");

        Ok(Self {
            name: name.clone(),
            ptr,
            size: size.bytes(),
            fd,
            access: Access::ReadOnly,
            created: false,
        })
    }

    /// Remove the shared memory object from the OS namespace.
    /// Existing mappings stay valid until dropped.
    pub fn unlink(name: &ChannelName) -> Result<(), Errno> {
        shm_unlink(name.shm_name())
    }

    /// Get the channel name of this region.
    pub fn name(&self) -> &ChannelName {
        &self.name
    }

    /// Get the size of this region.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn access(&self) -> Access {
        self.access
    }

    /// Whether this handle created the OS object.
    pub(crate) fn created(&self) -> bool {
        self.created
    }

    /// Copy `data` over the start of the region.
    ///
    /// # Safety
    /// Caller must hold the channel mutex. The region must be mapped
    /// read-write and `data.len()` must not exceed the region size.
    pub(crate) unsafe fn copy_in(&self, data: &[u8]) {
        debug_assert_eq!(self.access, Access::ReadWrite);
        debug_assert!(data.len() <= self.size);
        std::ptr::copy_nonoverlapping(data.as_ptr(), self.ptr.as_ptr(), data.len());
    }

    /// Copy the start of the region into `buf`.
    ///
    /// # Safety
    /// Caller must hold the channel mutex and `buf.len()` must not exceed
    /// the region size.
    pub(crate) unsafe fn copy_out(&self, buf: &mut [u8]) {
        debug_assert!(buf.len() <= self.size);
        std::ptr::copy_nonoverlapping(self.ptr.as_ptr(), buf.as_mut_ptr(), buf.len());
    }
}

/// Open `object` read-write, reporting whether this call created it.
fn open_for_write(object: &str) -> Result<(OwnedFd, bool), Errno> {
    let mode = Mode::S_IRWXU;
    match shm_open(object, OFlag::O_CREAT | OFlag::O_EXCL | OFlag::O_RDWR, mode) {
        Ok(fd) => Ok((fd, true)),
        Err(Errno::EEXIST) => {
            // Reuse the existing object; O_CREAT covers an unlink in between
            let fd = shm_open(object, OFlag::O_CREAT | OFlag::O_RDWR, mode)?;
            Ok((fd, false))
        }
        Err(e) => Err(e),
    }
}

/// Resize the object behind `fd` and map it read-write.
fn size_and_map(fd: &OwnedFd, size: usize) -> Result<NonNull<u8>, (InitOperation, Errno)> {
    // SAFETY: fd is a valid open descriptor
    let result = unsafe { libc::ftruncate(fd.as_raw_fd(), size as libc::off_t) };
    if result < 0 {
        return Err((InitOperation::Ftruncate, Errno::last()));
    }
    map(fd, size, Access::ReadWrite).map_err(|e| (InitOperation::Mmap, e))
}

/// Unlink an object after a failed create, logging anything but success.
pub(crate) fn discard_object(name: &ChannelName) {
    if let Err(e) = SharedRegion::unlink(name) {
        tracing::warn!(name = %name, error = %e, "Failed to remove shared memory object");
    }
}

/// Map `size` bytes of `fd` shared between processes.
fn map(fd: &OwnedFd, size: usize, access: Access) -> Result<NonNull<u8>, Errno> {
    let prot = match access {
        Access::ReadWrite => libc::PROT_READ | libc::PROT_WRITE,
        Access::ReadOnly => libc::PROT_READ,
    };

    // SAFETY: fd is valid, size is non-zero, offset 0 is valid
    let ptr = unsafe {
        libc::mmap(
            std::ptr::null_mut(),
            size,
            prot,
            libc::MAP_SHARED,
            fd.as_raw_fd(),
            0,
        )
    };

    if ptr == libc::MAP_FAILED {
        return Err(Errno::last());
    }

    NonNull::new(ptr as *mut u8).ok_or(Errno::EFAULT)
}

impl Drop for SharedRegion {
    fn drop(&mut self) {
        // SAFETY: ptr and size were set during creation
        let result = unsafe { libc::munmap(self.ptr.as_ptr() as *mut libc::c_void, self.size) };
        if result < 0 {
            tracing::error!(
                name = %self.name,
                error = %Errno::last(),
                "Failed to unmap shared memory"
            );
        }
        tracing::trace!(name = %self.name, fd = self.fd.as_raw_fd(), "Released shared memory mapping");
        // fd is closed when the OwnedFd drops
    }
}
