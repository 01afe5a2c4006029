use std::ffi::{CString, OsString};
use std::os::fd::{AsRawFd, FromRawFd, IntoRawFd, OwnedFd, RawFd};
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use lazy_static::lazy_static;

use crate::errors::{IoError, Result};
use crate::traits::{
    read_one, ByteReader, Closer, Reader, Seeker, Whence, Writer,
};

/// Permission bits used when a constructor is not given any.
pub const DEFAULT_MODE: libc::mode_t = 0o644;

/// Name prefix of files created by [`File::temporary`].
pub const TEMP_PREFIX: &str = "ark-io.";

/// Open flags, passed through verbatim to `open(2)`.
pub mod flags {
    pub const READ_ONLY: libc::c_int = libc::O_RDONLY;
    pub const WRITE_ONLY: libc::c_int = libc::O_WRONLY;
    pub const READ_WRITE: libc::c_int = libc::O_RDWR;
    pub const CREATE: libc::c_int = libc::O_CREAT;
    pub const TRUNCATE: libc::c_int = libc::O_TRUNC;
    pub const APPEND: libc::c_int = libc::O_APPEND;
    pub const EXCLUSIVE: libc::c_int = libc::O_EXCL;
}

lazy_static! {
    static ref STDIN: File = File::standard(0, "<stdin>");
    static ref STDOUT: File = File::standard(1, "<stdout>");
    static ref STDERR: File = File::standard(2, "<stderr>");
}

/// Process-wide handle on descriptor 0. Never closed by this crate.
pub fn stdin() -> &'static File {
    &STDIN
}

/// Process-wide handle on descriptor 1. Never closed by this crate.
pub fn stdout() -> &'static File {
    &STDOUT
}

/// Process-wide handle on descriptor 2. Never closed by this crate.
pub fn stderr() -> &'static File {
    &STDERR
}

/// Thread-safe owner of one native file descriptor.
///
/// Every operation holds the file's lock for the duration of the native
/// call, so calls on one `File` are serialized while distinct `File`s never
/// block each other. The descriptor is released exactly once: by
/// [`close`](File::close), or on drop if it was never closed explicitly.
#[derive(Debug)]
pub struct File {
    name: Option<String>,
    fd: Mutex<Option<OwnedFd>>,
}

impl File {
    /// Open an existing path with the given `open(2)` flags.
    pub fn open(path: impl AsRef<Path>, flags: libc::c_int) -> Result<Self> {
        Self::open_with_mode(path, flags, DEFAULT_MODE)
    }

    pub fn open_with_mode(
        path: impl AsRef<Path>,
        flags: libc::c_int,
        mode: libc::mode_t,
    ) -> Result<Self> {
        let path = path.as_ref();
        let c_path = to_cstring(path)?;
        // SAFETY: `c_path` is a valid NUL-terminated string.
        let fd = unsafe {
            libc::open(c_path.as_ptr(), flags, libc::c_uint::from(mode))
        };
        if fd < 0 {
            let err = std::io::Error::last_os_error();
            log::debug!("Failed to open {}: {}", path.display(), err);
            return Err(IoError::read_failure(err));
        }
        log::debug!("Opened {} as descriptor {}", path.display(), fd);

        // SAFETY: `fd` was just returned by open(2) and nothing else owns it.
        let fd = unsafe { OwnedFd::from_raw_fd(fd) };
        Ok(Self::from_owned_fd(fd, Some(path.display().to_string())))
    }

    /// Create (or truncate) a file for writing.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Self::create_with_mode(path, DEFAULT_MODE)
    }

    pub fn create_with_mode(
        path: impl AsRef<Path>,
        mode: libc::mode_t,
    ) -> Result<Self> {
        Self::open_with_mode(
            path,
            flags::WRITE_ONLY | flags::CREATE | flags::TRUNCATE,
            mode,
        )
    }

    /// Atomically create a uniquely named file in the platform temporary
    /// directory. The generated path is available through [`name`](File::name).
    pub fn temporary() -> Result<Self> {
        Self::temporary_with_mode(DEFAULT_MODE)
    }

    pub fn temporary_with_mode(mode: libc::mode_t) -> Result<Self> {
        let template = std::env::temp_dir().join(format!("{TEMP_PREFIX}XXXXXX"));
        let mut template = to_cstring(&template)?.into_bytes_with_nul();

        // SAFETY: `template` is a writable NUL-terminated buffer ending in
        // the six `X` characters mkstemp(3) replaces in place.
        let fd = unsafe { libc::mkstemp(template.as_mut_ptr().cast()) };
        if fd < 0 {
            return Err(IoError::read_failure(std::io::Error::last_os_error()));
        }
        // SAFETY: `fd` was just returned by mkstemp(3).
        let fd = unsafe { OwnedFd::from_raw_fd(fd) };
        template.pop();
        let path = PathBuf::from(OsString::from_vec(template));

        // SAFETY: `fd` is a valid open descriptor.
        if unsafe { libc::fchmod(fd.as_raw_fd(), mode) } < 0 {
            let err = std::io::Error::last_os_error();
            let _ = std::fs::remove_file(&path);
            return Err(IoError::os(err));
        }
        log::debug!("Created temporary file {}", path.display());

        Ok(Self::from_owned_fd(fd, Some(path.display().to_string())))
    }

    /// Take ownership of an open descriptor.
    pub fn from_owned_fd(fd: OwnedFd, name: Option<String>) -> Self {
        Self {
            name,
            fd: Mutex::new(Some(fd)),
        }
    }

    /// Take ownership of a raw descriptor.
    ///
    /// # Safety
    ///
    /// `fd` must be open and must not be owned by anything else: the
    /// returned `File` closes it.
    pub unsafe fn from_raw_fd(fd: RawFd, name: Option<String>) -> Self {
        Self::from_owned_fd(OwnedFd::from_raw_fd(fd), name)
    }

    fn standard(fd: RawFd, name: &str) -> Self {
        // SAFETY: descriptors 0-2 are opened by the OS before `main` and
        // these handles live in statics that are never dropped.
        unsafe { Self::from_raw_fd(fd, Some(name.to_owned())) }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The underlying descriptor, or `None` once the file is closed.
    pub fn descriptor(&self) -> Option<RawFd> {
        self.lock().as_ref().map(AsRawFd::as_raw_fd)
    }

    pub fn is_closed(&self) -> bool {
        self.lock().is_none()
    }

    /// Close the descriptor. Later calls (and every other operation) report
    /// [`IoError::AlreadyClosed`] without touching the OS.
    pub fn close(&self) -> Result<()> {
        let fd = self.lock().take().ok_or(IoError::AlreadyClosed)?;
        log::debug!("Closing {}", self.display_name());
        release(fd)
    }

    fn lock(&self) -> MutexGuard<'_, Option<OwnedFd>> {
        self.fd.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }

    /// Run `op` on the raw descriptor while holding the lock.
    fn with_fd<T>(&self, op: impl FnOnce(RawFd) -> Result<T>) -> Result<T> {
        let guard = self.lock();
        let fd = guard.as_ref().ok_or(IoError::AlreadyClosed)?;
        op(fd.as_raw_fd())
    }
}

impl From<std::fs::File> for File {
    fn from(file: std::fs::File) -> Self {
        Self::from_owned_fd(OwnedFd::from(file), None)
    }
}

impl Drop for File {
    fn drop(&mut self) {
        let fd = self
            .fd
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(fd) = fd {
            if let Err(err) = release(fd) {
                log::warn!(
                    "Failed to close {} on drop: {}",
                    self.display_name(),
                    err
                );
            }
        }
    }
}

impl Reader for &File {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.with_fd(|fd| {
            // SAFETY: `buf` is valid for `buf.len()` bytes of writes.
            let n = unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) };
            match n {
                0 => Err(IoError::Eof),
                n if n < 0 => Err(IoError::read_failure(
                    std::io::Error::last_os_error(),
                )),
                n => Ok(n as usize),
            }
        })
    }
}

impl Writer for &File {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.with_fd(|fd| {
            // SAFETY: `buf` is valid for `buf.len()` bytes of reads.
            let n = unsafe { libc::write(fd, buf.as_ptr().cast(), buf.len()) };
            if n < 0 {
                return Err(IoError::read_failure(
                    std::io::Error::last_os_error(),
                ));
            }
            let written = n as usize;
            if written < buf.len() {
                return Err(IoError::short_write(written, buf.len(), None));
            }
            Ok(written)
        })
    }
}

impl Seeker for &File {
    fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64> {
        if whence == Whence::Start && offset < 0 {
            return Err(IoError::InvalidSeekOffset(offset));
        }
        let native_whence = match whence {
            Whence::Start => libc::SEEK_SET,
            Whence::Current => libc::SEEK_CUR,
            Whence::End => libc::SEEK_END,
        };
        self.with_fd(|fd| {
            let native_offset = libc::off_t::try_from(offset).map_err(|_| {
                IoError::InvalidSeekOffset(attempted_position(fd, offset, whence))
            })?;
            // SAFETY: lseek(2) has no memory-safety preconditions.
            let position =
                unsafe { libc::lseek(fd, native_offset, native_whence) };
            if position < 0 {
                let err = std::io::Error::last_os_error();
                return Err(match err.raw_os_error() {
                    Some(libc::EINVAL) => IoError::InvalidSeekOffset(
                        attempted_position(fd, offset, whence),
                    ),
                    _ => IoError::os(err),
                });
            }
            Ok(position as u64)
        })
    }
}

impl Closer for &File {
    fn close(&mut self) -> Result<()> {
        File::close(self)
    }
}

impl ByteReader for &File {
    fn read_byte(&mut self) -> Result<u8> {
        read_one(self)
    }
}

impl Reader for File {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (&*self).read(buf)
    }
}

impl Writer for File {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        (&*self).write(buf)
    }
}

impl Seeker for File {
    fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64> {
        (&*self).seek(offset, whence)
    }
}

impl Closer for File {
    fn close(&mut self) -> Result<()> {
        File::close(self)
    }
}

impl ByteReader for File {
    fn read_byte(&mut self) -> Result<u8> {
        (&*self).read_byte()
    }
}

fn release(fd: OwnedFd) -> Result<()> {
    let raw = fd.into_raw_fd();
    // SAFETY: `raw` came out of an `OwnedFd`, so it is open and ours alone;
    // ownership ends here whatever close(2) returns.
    if unsafe { libc::close(raw) } < 0 {
        return Err(IoError::os(std::io::Error::last_os_error()));
    }
    Ok(())
}

/// Absolute position a rejected seek aimed at. Falls back to the raw
/// offset when the base position cannot be queried.
fn attempted_position(fd: RawFd, offset: i64, whence: Whence) -> i64 {
    let base = match whence {
        Whence::Start => Some(0),
        Whence::Current => {
            // SAFETY: a zero-offset SEEK_CUR only reports the position.
            let current = unsafe { libc::lseek(fd, 0, libc::SEEK_CUR) };
            (current >= 0).then(|| i64::from(current))
        }
        Whence::End => {
            let mut stat = std::mem::MaybeUninit::<libc::stat>::uninit();
            // SAFETY: `stat` is valid for writes and fstat(2) fills it
            // completely on success.
            if unsafe { libc::fstat(fd, stat.as_mut_ptr()) } == 0 {
                // SAFETY: initialized by the successful fstat(2) above.
                Some(i64::from(unsafe { stat.assume_init() }.st_size))
            } else {
                None
            }
        }
    };
    base.map_or(offset, |base| base.saturating_add(offset))
}

fn to_cstring(path: &Path) -> Result<CString> {
    CString::new(path.as_os_str().as_bytes()).map_err(|_| {
        IoError::custom(format!(
            "path contains an interior NUL byte: {}",
            path.display()
        ))
    })
}
