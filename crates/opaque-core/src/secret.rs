//! Locked, zeroize-on-drop storage for scalars, derived keys, and key
//! bundles that must not outlive their owning handshake step.

use std::ops::{Deref, DerefMut};

use curve25519_dalek::scalar::Scalar;
use zeroize::Zeroize;

use crate::error::{OpaqueError, Result};

/// Tells `Locked<T>` which bytes of `T` are the actual secret material to
/// mlock/VirtualLock, as opposed to `size_of::<T>()`: a `Vec<u8>`'s secret
/// bytes live on the heap, not in the 24-byte pointer/len/cap triple that
/// sits in `T` itself, so a naive `&self as *const T` lock would protect the
/// wrong memory.
pub trait SecretRegion {
    fn region(&self) -> (*const u8, usize);
}

impl<const N: usize> SecretRegion for [u8; N] {
    fn region(&self) -> (*const u8, usize) {
        (self.as_ptr(), N)
    }
}

impl SecretRegion for Vec<u8> {
    fn region(&self) -> (*const u8, usize) {
        (self.as_ptr(), self.len())
    }
}

impl SecretRegion for Scalar {
    fn region(&self) -> (*const u8, usize) {
        (self as *const Scalar as *const u8, std::mem::size_of::<Scalar>())
    }
}

/// Wraps a secret value in best-effort OS-locked memory and guarantees it is
/// zeroized on every exit path, success or failure.
pub struct Locked<T: Zeroize + SecretRegion> {
    inner: T,
}

impl<T: Zeroize + SecretRegion> Locked<T> {
    pub fn new(inner: T) -> Result<Self> {
        let locked = Self { inner };
        locked.lock()?;
        Ok(locked)
    }

    #[cfg(unix)]
    fn lock(&self) -> Result<()> {
        let (ptr, len) = self.inner.region();
        if len == 0 {
            return Ok(());
        }
        let rc = unsafe { libc::mlock(ptr as *const libc::c_void, len) };
        if rc != 0 {
            return Err(OpaqueError::LockFailure);
        }
        Ok(())
    }

    #[cfg(windows)]
    fn lock(&self) -> Result<()> {
        use windows_sys::Win32::System::Memory::VirtualLock;
        let (ptr, len) = self.inner.region();
        if len == 0 {
            return Ok(());
        }
        let ok = unsafe { VirtualLock(ptr as *mut std::ffi::c_void, len) };
        if ok == 0 {
            return Err(OpaqueError::LockFailure);
        }
        Ok(())
    }

    #[cfg(not(any(unix, windows)))]
    fn lock(&self) -> Result<()> {
        Ok(())
    }

    #[cfg(unix)]
    fn unlock(&self) {
        let (ptr, len) = self.inner.region();
        if len != 0 {
            unsafe {
                libc::munlock(ptr as *const libc::c_void, len);
            }
        }
    }

    #[cfg(windows)]
    fn unlock(&self) {
        use windows_sys::Win32::System::Memory::VirtualUnlock;
        let (ptr, len) = self.inner.region();
        if len != 0 {
            unsafe {
                VirtualUnlock(ptr as *mut std::ffi::c_void, len);
            }
        }
    }

    #[cfg(not(any(unix, windows)))]
    fn unlock(&self) {}
}

impl<T: Zeroize + SecretRegion> Deref for Locked<T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T: Zeroize + SecretRegion> DerefMut for Locked<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.inner
    }
}

impl<T: Zeroize + SecretRegion> Drop for Locked<T> {
    fn drop(&mut self) {
        self.unlock();
        self.inner.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locked_value_is_readable_and_zeroed_on_drop() {
        let secret = Locked::new([1u8, 2, 3, 4]).unwrap();
        assert_eq!(*secret, [1, 2, 3, 4]);
        drop(secret);
    }

    #[test]
    fn locked_vec_locks_the_heap_allocation_not_the_handle() {
        let secret = Locked::new(vec![9u8; 64]).unwrap();
        assert_eq!(secret.len(), 64);
        assert!(secret.iter().all(|b| *b == 9));
    }

    #[test]
    fn locked_scalar_roundtrips() {
        let scalar = Scalar::from_bytes_mod_order([3u8; 32]);
        let locked = Locked::new(scalar).unwrap();
        assert_eq!(*locked, scalar);
    }
}
