//! A curve-agnostic facade over elliptic-curve signatures, Diffie-Hellman key exchange, and sealed
//! envelope encryption.
//!
//! Three families of curves are supported behind one API:
//! * The NIST prime-field curves P-256, P-384 and P-521.
//! * The Koblitz curve secp256k1 (`K256`).
//! * Curve25519, used in its Edwards form (Ed25519) for signatures and in its Montgomery form
//!   (X25519) for key exchange. Curve25519 operations are provided by
//!   [Sodium](https://libsodium.org); the prime-field curves are provided by the RustCrypto curve
//!   crates.
//!
//! Signatures on the prime-field curves are ECDSA signatures whose per-signature nonce is derived
//! with a *hedged* variant of [RFC 6979](https://www.rfc-editor.org/rfc/rfc6979): the nonce is
//! deterministic in the private key and message, but fresh randomness is also mixed in. See the
//! [`nonce`] module for details.
//!
//! # Which API Should I Use?
//! Most users only need the [`Ecc`] facade, which is configured with a single curve, and the
//! [`SealedEnvelope`] built on top of it.
//!
//! I want to...
//! * Produce a signature for a message, so that anyone can verify I sent it
//!     * Use [`Ecc::sign`] and [`Ecc::verify`]
//! * Establish a secret key with another party over an insecure channel
//!     * Use [`Ecc::key_exchange`]
//! * Encrypt a message so that only the holder of a specific private key can read it
//!     * Use [`SealedEnvelope::seal`]
//! * Store or transmit a key
//!     * Use [`PublicKey::encode`], [`PublicKey::to_pem`] or [`PrivateKey::to_pem`]
//!
//! # Examples
//! ```rust
//! use unicurve::{CurveId, Ecc, SignatureFormat};
//!
//! let ecc = Ecc::new(CurveId::K256);
//! let private_key = ecc.generate_private_key().unwrap();
//! let public_key = private_key.public_key().unwrap();
//!
//! let message = b"this is a test message";
//! let signature = ecc
//!     .sign(message, &private_key, SignatureFormat::FixedWidth)
//!     .unwrap();
//! assert_eq!(signature.len(), 64);
//! assert!(ecc
//!     .verify(message, &public_key, &signature, SignatureFormat::FixedWidth)
//!     .unwrap());
//! ```
//!
//! # Hardened Buffer Types
//! Curve25519 secret keys are stored using a custom allocator from Sodium. These types are stored
//! in memory locked regions, which won't be swapped to disk, and will be securely zeroed on drop.
//! Guard pages and canaries are used to detect buffer overflows. Prime-field secret keys use the
//! RustCrypto secret key types, which are zeroized on drop.

use libsodium_sys as sodium;
use thiserror::Error;

pub mod curve;
pub mod ecc;
pub mod ecdsa;
pub mod encode;
pub mod envelope;
pub mod hash;
pub mod keys;
mod mem;
pub mod nonce;
pub mod random;
pub mod signature;

pub use curve::{CurveDescriptor, CurveId};
pub use ecc::{Ecc, Role};
pub use envelope::{SealedEnvelope, SymmetricCipher, XChaCha20Poly1305};
pub use hash::HashAlgorithm;
pub use keys::{PrivateKey, PublicKey};
pub use signature::{Signature, SignatureFormat};

/// General error type used in unicurve.
///
/// This type is returned by functions which can possibly fail throughout unicurve.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum UnicurveError {
    /// Failed to initialise Sodium.
    ///
    /// This corresponds to a call to `sodium_init` returning -1, indicating initialisation
    /// failure. In such a case, Sodium is unsafe to use.
    #[error("failed to initialise libsodium")]
    SodiumInitFailed,

    /// Memory management error.
    ///
    /// This could indicate a number of possible issues. In the worst case, it indicates a buffer
    /// overflow or similar error occurred and was detected by Sodium, but it could also indicate
    /// any other reason secure memory allocation may fail.
    #[error("memory management error")]
    MemoryManagement,

    /// Tried to create a hardened buffer from an incorrectly sized slice.
    ///
    /// The 0th item is the expected length, the 1st item is the actual length of the slice.
    #[error("incorrect slice length: expected {0}, found {1}")]
    IncorrectSliceLength(usize, usize),

    /// The curve name or identifier is not one unicurve knows about.
    #[error("unsupported curve")]
    UnsupportedCurve,

    /// The hash algorithm name is not one unicurve knows about.
    #[error("unsupported hash algorithm")]
    UnsupportedHash,

    /// Encoded key material had the wrong length for the curve it was decoded against.
    ///
    /// The 0th item is the expected length, the 1st item is the actual length.
    #[error("invalid key length: expected {0}, found {1}")]
    InvalidKeyLength(usize, usize),

    /// Encoded public key bytes do not describe a point on the curve.
    #[error("malformed curve point")]
    MalformedPoint,

    /// The keys passed to an operation belong to different curves, or to a different curve than
    /// the one the [`Ecc`] instance was configured with.
    #[error("incompatible key family")]
    IncompatibleKeyFamily,

    /// A fixed-width signature had an odd number of bytes, so cannot be split into (r, s).
    #[error("fixed-width signature has odd length")]
    OddLengthSignature,

    /// A sealed envelope was shorter than the ephemeral public key it should start with.
    #[error("sealed envelope is truncated")]
    TruncatedEnvelope,

    /// The nonce generator rejected every candidate it produced.
    ///
    /// The probability of this happening for a correctly functioning HMAC is negligible, so this
    /// indicates a broken environment rather than bad input.
    #[error("nonce generation exhausted its attempts")]
    NonceGenerationExhausted,

    /// The operation only makes sense for another family of keys (e.g: extracting a raw scalar
    /// from an Edwards key, or signing with a Montgomery key).
    #[error("operation not supported for this key family")]
    UnsupportedOperationForFamily,

    /// An error occurred in the [`signature`] module.
    #[error("signature error")]
    SignatureError(#[from] signature::SignatureError),

    /// An error occurred serialising or deserialising a key in the [`keys`] module.
    #[error("key encoding error")]
    KeyError(#[from] keys::KeyError),

    /// An error occurred in a Curve25519 key exchange.
    #[error("key exchange error")]
    KeyExchangeError(#[from] keys::edwards::KeyExchangeError),

    /// An error occurred in the [`envelope`] module.
    #[error("envelope error")]
    EnvelopeError(#[from] envelope::EnvelopeError),
}

/// Creates a module-scoped error enum which converts into [`UnicurveError`].
///
/// Every variant displays as its own name.
macro_rules! error_type {
    (
        $(#[$metadata:meta])*
        $name:ident {
            $(
                $(#[$variant_metadata:meta])*
                $variant:ident,
            )*
        }
    ) => {
        $(#[$metadata])*
        #[derive(Clone, Copy, Debug, Eq, PartialEq)]
        pub enum $name {
            $(
                $(#[$variant_metadata])*
                $variant,
            )*
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $( Self::$variant => f.write_str(stringify!($variant)), )*
                }
            }
        }

        impl std::error::Error for $name {}
    };
}

pub(crate) use error_type;

/// Panics with a bug-report message.
///
/// Used where a collaborator documents that a call cannot fail, so a failure means unicurve itself
/// is broken.
macro_rules! unexpected_err {
    ($source:expr) => {
        panic!(
            "An unexpected error occurred in {}. Please report this bug to the unicurve developers.",
            $source
        )
    };
}

pub(crate) use unexpected_err;

/// Panics via [`unexpected_err!`] if a Sodium call documented to always return 0 did not.
macro_rules! assert_not_err {
    ($result:expr, $source:expr) => {
        if $result != 0 {
            $crate::unexpected_err!($source);
        }
    };
}

pub(crate) use assert_not_err;

/// Attempt to initialise Sodium.
///
/// n.b: Crates making use of unicurve do not have to call this function, it is only used
/// internally wherever initialisation may be necessary.
///
/// Returns `Ok(0)` if Sodium was initialised successfully, `Ok(1)` if Sodium has already been
/// initialised, or [`UnicurveError::SodiumInitFailed`] if the initialisation was unsuccessful.
fn require_init() -> Result<libc::c_int, UnicurveError> {
    let init_status = unsafe {
        // SAFETY: This function can safely be called multiple times from multiple threads. Once it
        // has been called, all other Sodium functions are also thread-safe.
        sodium::sodium_init()
    };

    // sodium_init() returns -1 on init failure, 0 on success, or 1 if Sodium is already
    // initialised
    if init_status < 0 {
        return Err(UnicurveError::SodiumInitFailed);
    }

    Ok(init_status)
}
