//! The process-wide random source.
//!
//! This module is a wrapper around the [`randombytes`
//! API](https://doc.libsodium.org/generating_random_data) from Sodium, which sources random data
//! from the platform's secure RNG API (e.g: `getrandom`, `/dev/urandom`). It is thread-safe once
//! Sodium has been initialised.
//!
//! Everything in unicurve which consumes randomness draws it from here: prime-field key generation
//! (through [`SodiumRng`]), the hedging entropy mixed into every ECDSA nonce, envelope nonces, and
//! ephemeral keys for [`seal`](crate::SealedEnvelope::seal). Curve25519 key generation happens
//! inside Sodium, which uses the same source.
//!
//! # Examples
//! ```rust
//! use rand_core::RngCore;
//! use unicurve::random::{self, SodiumRng};
//!
//! let mut hedge = [0u8; 32];
//! random::fill_random(&mut hedge).unwrap();
//!
//! let mut rng = SodiumRng;
//! let x = rng.next_u64();
//! # let _ = x;
//! ```

use crate::{require_init, unexpected_err, UnicurveError};
use libsodium_sys as sodium;
use rand_core::{impls, CryptoRng, Error as RandError, RngCore};

/// [rand](https://rust-random.github.io/book)-compatible CSPRNG backed by Sodium.
///
/// The RustCrypto curve crates take any `RngCore + CryptoRng` for key generation, so this is how
/// prime-field private keys are drawn from the same source as everything else.
#[derive(Clone, Copy, Debug, Default)]
pub struct SodiumRng;

impl RngCore for SodiumRng {
    fn next_u32(&mut self) -> u32 {
        random_u32().unwrap_or_else(|_| unexpected_err!("randombytes_random"))
    }

    fn next_u64(&mut self) -> u64 {
        impls::next_u64_via_u32(self)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        if self.try_fill_bytes(dest).is_err() {
            unexpected_err!("randombytes_buf");
        }
    }

    #[cfg(feature = "std")]
    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), RandError> {
        fill_random(dest).map_err(RandError::new)
    }

    #[cfg(not(feature = "std"))]
    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), RandError> {
        fill_random(dest).map_err(|_| {
            core::num::NonZeroU32::new(RandError::CUSTOM_START)
                .unwrap_or_else(|| unexpected_err!("rand_core::Error::CUSTOM_START"))
                .into()
        })
    }
}

impl CryptoRng for SodiumRng {}

/// Returns a random 32-bit integer.
pub fn random_u32() -> Result<u32, UnicurveError> {
    require_init()?;

    unsafe {
        // SAFETY: This function is safe as long as Sodium has been initialised, which we ensure
        // with the call to `require_init` above.
        Ok(sodium::randombytes_random())
    }
}

/// Fill `buf` with random data suitable for cryptographic use.
///
/// Returns an error if Sodium could not be correctly initialised.
pub fn fill_random(buf: &mut [u8]) -> Result<(), UnicurveError> {
    require_init()?;

    unsafe {
        // SAFETY: The first argument to this function should be a pointer to which random data will
        // be written, and the second argument should be the number of bytes to write, starting at
        // the pointer. We use `buf.len()` to specify the number of bytes to write, so `buf` is
        // clearly valid for writes of the required length.
        sodium::randombytes_buf(buf.as_mut_ptr() as *mut libc::c_void, buf.len());
    }

    Ok(())
}
