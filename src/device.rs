//! Character device holding the ambient mode and brightness strings.
//!
//! The driver keeps a NUL-terminated mode string (32 bytes) and brightness
//! string (16 bytes) and exposes four ioctls on magic `'L'`. Every request is
//! declared with a `char *` argument, so the size field encodes a pointer.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

pub const MODE_LEN: usize = 32;
pub const BRIGHTNESS_LEN: usize = 16;

#[cfg(target_os = "linux")]
mod ioctl {
    use nix::{ioctl_read_bad, ioctl_write_ptr_bad, request_code_read, request_code_write};

    const MAGIC: u8 = b'L';
    const ARG_SIZE: usize = std::mem::size_of::<*mut u8>();

    ioctl_write_ptr_bad!(set_mode, request_code_write!(MAGIC, 1, ARG_SIZE), u8);
    ioctl_read_bad!(get_mode, request_code_read!(MAGIC, 2, ARG_SIZE), u8);
    ioctl_write_ptr_bad!(set_brightness, request_code_write!(MAGIC, 3, ARG_SIZE), u8);
    ioctl_read_bad!(get_brightness, request_code_read!(MAGIC, 4, ARG_SIZE), u8);
}

/// Get/set access to a kernel-held mode and brightness.
pub trait StateHandle: Send {
    fn describe(&self) -> String;

    fn read_mode(&mut self) -> io::Result<String>;

    fn read_brightness(&mut self) -> io::Result<String>;
}

/// `/dev/ambient_dev` or a compatible node.
pub struct AmbientDevice {
    path: PathBuf,
    #[cfg_attr(not(target_os = "linux"), allow(dead_code))]
    file: File,
}

impl AmbientDevice {
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(AmbientDevice {
            path: path.to_path_buf(),
            file,
        })
    }

    #[cfg(target_os = "linux")]
    pub fn set_mode(&mut self, mode: &str) -> io::Result<()> {
        use std::os::unix::io::AsRawFd;

        let buf = to_c_string::<MODE_LEN>(mode);
        // SAFETY: the driver copies exactly MODE_LEN bytes from a buffer that long.
        unsafe { ioctl::set_mode(self.file.as_raw_fd(), buf.as_ptr()) }?;
        Ok(())
    }

    #[cfg(target_os = "linux")]
    pub fn set_brightness(&mut self, brightness: &str) -> io::Result<()> {
        use std::os::unix::io::AsRawFd;

        let buf = to_c_string::<BRIGHTNESS_LEN>(brightness);
        // SAFETY: the driver copies exactly BRIGHTNESS_LEN bytes from a buffer that long.
        unsafe { ioctl::set_brightness(self.file.as_raw_fd(), buf.as_ptr()) }?;
        Ok(())
    }

    #[cfg(not(target_os = "linux"))]
    pub fn set_mode(&mut self, _mode: &str) -> io::Result<()> {
        Err(unsupported())
    }

    #[cfg(not(target_os = "linux"))]
    pub fn set_brightness(&mut self, _brightness: &str) -> io::Result<()> {
        Err(unsupported())
    }
}

impl StateHandle for AmbientDevice {
    fn describe(&self) -> String {
        format!("device {}", self.path.display())
    }

    #[cfg(target_os = "linux")]
    fn read_mode(&mut self) -> io::Result<String> {
        use std::os::unix::io::AsRawFd;

        // One spare byte: the driver may copy a full string plus its NUL.
        let mut buf = [0u8; MODE_LEN + 1];
        // SAFETY: the driver writes at most MODE_LEN + 1 bytes.
        unsafe { ioctl::get_mode(self.file.as_raw_fd(), buf.as_mut_ptr()) }?;
        Ok(from_c_string(&buf))
    }

    #[cfg(target_os = "linux")]
    fn read_brightness(&mut self) -> io::Result<String> {
        use std::os::unix::io::AsRawFd;

        let mut buf = [0u8; BRIGHTNESS_LEN + 1];
        // SAFETY: the driver writes at most BRIGHTNESS_LEN + 1 bytes.
        unsafe { ioctl::get_brightness(self.file.as_raw_fd(), buf.as_mut_ptr()) }?;
        Ok(from_c_string(&buf))
    }

    #[cfg(not(target_os = "linux"))]
    fn read_mode(&mut self) -> io::Result<String> {
        Err(unsupported())
    }

    #[cfg(not(target_os = "linux"))]
    fn read_brightness(&mut self) -> io::Result<String> {
        Err(unsupported())
    }
}

#[cfg(not(target_os = "linux"))]
fn unsupported() -> io::Error {
    io::Error::new(io::ErrorKind::Unsupported, "ambient device ioctls are Linux only")
}

/// Zero-padded and always NUL-terminated; longer values are truncated.
pub fn to_c_string<const N: usize>(value: &str) -> [u8; N] {
    let mut buf = [0u8; N];
    let len = value.len().min(N.saturating_sub(1));
    buf[..len].copy_from_slice(&value.as_bytes()[..len]);
    buf
}

/// Text up to the first NUL, without surrounding whitespace.
pub fn from_c_string(buf: &[u8]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).trim().to_string()
}
