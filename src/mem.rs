//! Hardened memory for Curve25519 secret keys.
//!
//! This module wraps Sodium's [secure memory management
//! functions](https://doc.libsodium.org/memory_management). Memory allocated here is placed at the
//! end of a page boundary, directly before a guard page, with a canary placed before it. It is
//! locked so it will not be swapped to disk or included in core dumps, and it is securely zeroed
//! when freed. These measures make Sodium's allocator much more expensive than the system
//! allocator, so it is only used for the fixed-size Edwards and Montgomery secret keys in
//! [`keys::edwards`](crate::keys::edwards).
//!
//! Prime-field secret keys are stored by the RustCrypto curve crates, which zeroize their memory on
//! drop but do not lock it.

use crate::{require_init, UnicurveError};
use libsodium_sys as sodium;
use std::alloc::Layout;
use std::ptr::NonNull;

/// Creates a hardened buffer type, for storing secret key material.
///
/// `hardened_buffer!(Name(Size))` will create a new type `Name` that provides access to `Size`
/// bytes of contiguous hardened memory. The new type implements `AsRef`/`AsMut` for
/// `[u8; Size]`, `Deref`/`DerefMut`, `TryFrom<&[u8]>`, a `Debug` implementation which does not
/// reveal the contents, and a constant-time `PartialEq`. It also provides `new_empty` (a zeroed
/// instance), `zero`, `try_clone` and the constant `LENGTH`.
macro_rules! hardened_buffer {
    ( $( $(#[$metadata:meta])* $name:ident($size:expr)$(;)? )* ) => {
        $(
            $(#[$metadata])*
            pub struct $name(std::ptr::NonNull<[u8; $size]>);

            impl $name {
                pub const LENGTH: usize = $size as usize;

                /// Create a new instance of this type, filled with all zeroes.
                pub fn new_empty() -> Result<Self, $crate::UnicurveError> {
                    let mut buf = unsafe {
                        // SAFETY: This call to malloc() will allocate the memory required for a
                        // [u8; $size] type, outside of Rust's memory management. The associated
                        // memory is always freed in the corresponding `drop` call, and nowhere
                        // else, so a double-free is not possible. We never give out a pointer to
                        // the allocated memory directly, only references. A u8 array has an
                        // alignment of 1 byte.
                        Self($crate::mem::malloc()?)
                    };
                    buf.zero()?;
                    Ok(buf)
                }

                /// Safely zero the contents of the buffer, in such a way that the compiler will
                /// not optimise away the operation.
                pub fn zero(&mut self) -> Result<(), $crate::UnicurveError> {
                    $crate::mem::clear(&mut self[..])
                }

                /// Create a new instance of the same type, copying the contents of this buffer.
                ///
                /// This operation may fail, as Sodium's allocator is more likely to encounter
                /// issues than the standard system allocator.
                pub fn try_clone(&self) -> Result<Self, $crate::UnicurveError> {
                    let mut new_buf = Self::new_empty()?;
                    new_buf.copy_from_slice(&self[..]);
                    Ok(new_buf)
                }
            }

            impl Drop for $name {
                fn drop(&mut self) {
                    unsafe {
                        // SAFETY: We only free in `drop`, which is called exactly once when the
                        // value is dropped, so a double-free or use-after-free is not possible in
                        // safe code. `try_clone` allocates fresh memory rather than sharing it.
                        $crate::mem::free(self.0);
                    }
                }
            }

            // SAFETY: The buffer is uniquely owned by this value, in the same way a `Box<[u8; N]>`
            // is, and no interior mutability is exposed through a shared reference.
            unsafe impl Send for $name {}
            unsafe impl Sync for $name {}

            impl TryFrom<&[u8]> for $name {
                type Error = $crate::UnicurveError;

                fn try_from(buf: &[u8]) -> Result<Self, Self::Error> {
                    if buf.len() != $size {
                        return Err(Self::Error::IncorrectSliceLength($size as usize, buf.len()));
                    }

                    let mut new = Self::new_empty()?;
                    new.copy_from_slice(buf);
                    Ok(new)
                }
            }

            impl AsRef<[u8; $size]> for $name {
                fn as_ref(&self) -> &[u8; $size] {
                    self
                }
            }

            impl AsMut<[u8; $size]> for $name {
                fn as_mut(&mut self) -> &mut [u8; $size] {
                    self
                }
            }

            impl std::fmt::Debug for $name {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    write!(f, "{}([u8; {}])", stringify!($name), $size)
                }
            }

            impl std::ops::Deref for $name {
                type Target = [u8; $size];

                fn deref(&self) -> &Self::Target {
                    unsafe {
                        // SAFETY: The memory backing this buffer is valid for the lifetime of the
                        // struct, and the returned reference cannot outlive it. Any region of
                        // memory of length $size is a valid representation of a [u8; $size].
                        self.0.as_ref()
                    }
                }
            }

            impl std::ops::DerefMut for $name {
                fn deref_mut(&mut self) -> &mut Self::Target {
                    unsafe {
                        // SAFETY: As for `deref`, and we hold a unique borrow of `self`.
                        self.0.as_mut()
                    }
                }
            }

            impl PartialEq<Self> for $name {
                fn eq(&self, other: &Self) -> bool {
                    $crate::mem::eq(&self[..], &other[..]).unwrap_or(false)
                }
            }

            impl Eq for $name {}
        )*
    };
}

pub(crate) use hardened_buffer;

/// Allocate sufficient hardened memory to store a value of type `T`, returning a pointer to the
/// start of the allocated memory.
///
/// # Safety
/// This function returns a pointer to uninitialised memory, allocated outside of Rust's memory
/// management. Memory must be initialised before use, it must be freed exactly once using
/// [`free`], and not used after having been freed.
pub unsafe fn malloc<T>() -> Result<NonNull<T>, UnicurveError> {
    require_init()?;

    // Padding the size to a multiple of the alignment guarantees correct alignment, as the region
    // is placed at the end of a page boundary.
    let layout = Layout::new::<T>().pad_to_align();
    let ptr = sodium::sodium_malloc(layout.size()) as *mut T;

    NonNull::new(ptr).ok_or(UnicurveError::MemoryManagement)
}

/// Free the memory pointed to by `ptr`, previously allocated using [`malloc`].
///
/// # Safety
/// This function must be called exactly once for each region allocated with [`malloc`], and the
/// region must not be used again afterwards. The program will exit if Sodium detects that the
/// canary next to the region has been overwritten.
pub unsafe fn free<T>(ptr: NonNull<T>) {
    sodium::sodium_free(ptr.as_ptr() as *mut libc::c_void)
}

/// Constant time test for equality of two slices.
///
/// For the same input size, the time taken to compare the slices is always identical. Always
/// returns false if the slices are not of the same length.
pub fn eq(a: &[u8], b: &[u8]) -> Result<bool, UnicurveError> {
    require_init()?;

    if a.len() != b.len() {
        return Ok(false);
    }

    let comparison_result = unsafe {
        // SAFETY: This function expects two pointers to regions of memory of the same length,
        // specified by the third parameter. We check above that a and b are of the same length,
        // and use a.len() to specify the length. Neither slice is modified.
        sodium::sodium_memcmp(
            a.as_ptr() as *const libc::c_void,
            b.as_ptr() as *const libc::c_void,
            a.len(),
        )
    };

    Ok(comparison_result == 0)
}

/// Zero the contents of `buf` in such a way that the compiler will not remove the operation.
pub fn clear(buf: &mut [u8]) -> Result<(), UnicurveError> {
    require_init()?;

    unsafe {
        // SAFETY: This function expects a pointer to a region of memory, and a number of bytes to
        // clear starting at that pointer. We specify `buf.len()` bytes, the size of `buf`. All
        // zeroes is a valid representation of a u8 slice.
        sodium::sodium_memzero(buf.as_mut_ptr() as *mut libc::c_void, buf.len());
    }

    Ok(())
}
