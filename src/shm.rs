//! Anonymous POSIX shared memory for `wl_shm` pools
//!
//! A region is created under a random `/wl_shm-XXXXXX` name in exclusive mode
//! and unlinked straight away, so the returned file handle is the only way to
//! reach it. The compositor gets a duplicate of that handle when the pool is
//! created.

use log::{debug, trace};
use std::ffi::{CStr, CString};
use std::fs::File;
use std::io;
use std::os::fd::{FromRawFd, OwnedFd};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Total number of names tried before giving up
pub const MAX_NAME_ATTEMPTS: u32 = 100;

const NAME_PREFIX: &str = "/wl_shm-";
const NAME_SUFFIX_LEN: usize = 6;

/// Errors raised while creating a shared memory region
#[derive(Debug, Error)]
pub enum ShmError {
    #[error("no free shared memory name after {attempts} attempts")]
    NamesExhausted { attempts: u32 },

    #[error("failed to create shared memory object: {0}")]
    Create(#[source] io::Error),

    #[error("failed to resize shared memory object to {size} bytes: {source}")]
    Resize {
        size: u64,
        #[source]
        source: io::Error,
    },
}

/// Create an anonymous shared memory region of exactly `size` bytes.
///
/// The caller owns the returned handle and should drop it once the region has
/// been mapped and handed to the compositor.
pub fn allocate(size: u64) -> Result<File, ShmError> {
    let file = create_with(open_exclusive)?;

    loop {
        match file.set_len(size) {
            Ok(()) => break,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            // `file` is dropped here, closing the descriptor
            Err(source) => return Err(ShmError::Resize { size, source }),
        }
    }

    debug!("Allocated {} byte shared memory region", size);
    Ok(file)
}

/// Run the naming/retry policy on top of `open`.
///
/// `open` is called with a fresh name each attempt. An `AlreadyExists` error
/// triggers another attempt; any other error aborts.
pub(crate) fn create_with<F>(mut open: F) -> Result<File, ShmError>
where
    F: FnMut(&CStr) -> io::Result<File>,
{
    for attempt in 1..=MAX_NAME_ATTEMPTS {
        let name = random_name();
        match open(&name) {
            Ok(file) => return Ok(file),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                trace!("shm name {:?} taken (attempt {})", name, attempt);
            }
            Err(e) => return Err(ShmError::Create(e)),
        }
    }

    Err(ShmError::NamesExhausted {
        attempts: MAX_NAME_ATTEMPTS,
    })
}

/// `shm_open` with `O_EXCL`, then unlink the name right away.
fn open_exclusive(name: &CStr) -> io::Result<File> {
    let fd = unsafe {
        libc::shm_open(
            name.as_ptr(),
            libc::O_RDWR | libc::O_CREAT | libc::O_EXCL,
            0o600 as libc::mode_t,
        )
    };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }

    // SAFETY: `fd` was just returned by shm_open and is owned by nobody else.
    let owned = unsafe { OwnedFd::from_raw_fd(fd) };
    unsafe {
        libc::shm_unlink(name.as_ptr());
    }

    Ok(File::from(owned))
}

fn random_name() -> CString {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or_default();

    let mut name = String::with_capacity(NAME_PREFIX.len() + NAME_SUFFIX_LEN);
    name.push_str(NAME_PREFIX);
    name.extend(name_suffix(nanos as u64));

    // Only ASCII letters and the prefix go in, so there is never an interior NUL
    CString::new(name).unwrap_or_default()
}

/// Six letters from 5-bit chunks of `seed`, each in `A..=P` or `a..=p`.
fn name_suffix(mut seed: u64) -> impl Iterator<Item = char> {
    (0..NAME_SUFFIX_LEN).map(move |_| {
        let c = b'A' + (seed & 15) as u8 + ((seed & 16) * 2) as u8;
        seed >>= 5;
        c as char
    })
}
