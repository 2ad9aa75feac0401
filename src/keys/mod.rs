//! Curve-agnostic private and public keys.
//!
//! [`PrivateKey`] and [`PublicKey`] are sum types over the three key families unicurve supports:
//!
//! | Variant      | Curves                      | Used for                       |
//! |--------------|-----------------------------|--------------------------------|
//! | `Scalar`     | P-256, P-384, P-521, K256   | ECDSA, hashed ECDH             |
//! | `Edwards`    | Edwards25519                | Ed25519, X25519 (via converting) |
//! | `Montgomery` | Edwards25519                | X25519 only                    |
//!
//! Operations which only make sense for some families (e.g: DER serialisation, or extracting the
//! raw private scalar) return [`UnicurveError::UnsupportedOperationForFamily`] for the others, so
//! callers should match on the variant where it matters.
//!
//! # Examples
//! ```rust
//! use unicurve::{CurveId, PrivateKey, PublicKey};
//!
//! let private_key = PrivateKey::generate(CurveId::P384).unwrap();
//! let public_key = private_key.public_key().unwrap();
//!
//! let encoded = public_key.encode();
//! assert_eq!(encoded.len(), 49);
//! assert_eq!(PublicKey::decode(&encoded, CurveId::P384).unwrap(), public_key);
//! ```

pub mod edwards;
pub mod prime;

use crate::curve::CurveId;
use crate::encode::{hex_decode, hex_encode};
use crate::{error_type, UnicurveError};
use edwards::{EdwardsPublicKey, EdwardsSecretKey, MontgomeryPublicKey, MontgomerySecretKey};
use prime::{PointKey, ScalarKey};
use zeroize::Zeroizing;

error_type! {
    /// Error type returned if a key could not be serialised or deserialised.
    KeyError {
        /// The key could not be written in the requested format.
        EncodingFailed,

        /// The input was not a valid encoding of a key (bad hex, bad PEM, or a scalar out of
        /// range).
        DecodingFailed,
    }
}

/// A private key on any supported curve.
#[derive(Debug)]
pub enum PrivateKey {
    /// A prime-field private scalar.
    Scalar(ScalarKey),
    /// An Ed25519 secret key.
    Edwards(EdwardsSecretKey),
    /// An X25519 secret scalar.
    Montgomery(MontgomerySecretKey),
}

/// A public key on any supported curve.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PublicKey {
    /// A prime-field public point.
    Point(PointKey),
    /// An Ed25519 public key.
    Edwards(EdwardsPublicKey),
    /// An X25519 public key.
    Montgomery(MontgomeryPublicKey),
}

impl PrivateKey {
    /// Generate a new random private key on `curve`.
    ///
    /// For [`CurveId::Edwards25519`] this produces an Ed25519 key, which can be converted for key
    /// exchange with [`PrivateKey::convert_family`].
    pub fn generate(curve: CurveId) -> Result<Self, UnicurveError> {
        match curve {
            CurveId::Edwards25519 => EdwardsSecretKey::generate().map(Self::Edwards),
            _ => ScalarKey::generate(curve).map(Self::Scalar),
        }
    }

    pub fn curve(&self) -> CurveId {
        match self {
            Self::Scalar(key) => key.curve(),
            Self::Edwards(_) | Self::Montgomery(_) => CurveId::Edwards25519,
        }
    }

    /// Derive the matching public key, in the same family.
    pub fn public_key(&self) -> Result<PublicKey, UnicurveError> {
        match self {
            Self::Scalar(key) => Ok(PublicKey::Point(key.public_key())),
            Self::Edwards(key) => key.public_key().map(PublicKey::Edwards),
            Self::Montgomery(key) => key.public_key().map(PublicKey::Montgomery),
        }
    }

    /// The raw private scalar, big-endian for prime-field keys and little-endian for X25519.
    ///
    /// An Ed25519 secret key is not a scalar (the scalar is derived by hashing the seed), so this
    /// fails with [`UnicurveError::UnsupportedOperationForFamily`] for Edwards keys.
    pub fn scalar_bytes(&self) -> Result<Zeroizing<Vec<u8>>, UnicurveError> {
        match self {
            Self::Scalar(key) => Ok(key.to_bytes()),
            Self::Montgomery(key) => Ok(Zeroizing::new(key.to_vec())),
            Self::Edwards(_) => Err(UnicurveError::UnsupportedOperationForFamily),
        }
    }

    /// Map an Edwards key to the Montgomery form of the curve, for use in key exchange.
    ///
    /// The map cannot be reversed, so keep the Edwards key if it will be needed for signing.
    pub fn convert_family(&self) -> Result<Self, UnicurveError> {
        match self {
            Self::Edwards(key) => key.to_montgomery().map(Self::Montgomery),
            _ => Err(UnicurveError::UnsupportedOperationForFamily),
        }
    }

    /// Serialise a prime-field key as a PEM-armoured SEC1 `EC PRIVATE KEY` document.
    pub fn to_pem(&self) -> Result<Zeroizing<String>, UnicurveError> {
        match self {
            Self::Scalar(key) => key.to_pem(),
            _ => Err(UnicurveError::UnsupportedOperationForFamily),
        }
    }

    /// Parse a PEM-armoured SEC1 `EC PRIVATE KEY` document.
    pub fn from_pem(pem: &str) -> Result<Self, UnicurveError> {
        ScalarKey::from_pem(pem).map(Self::Scalar)
    }
}

impl PublicKey {
    /// Parse the encoding produced by [`PublicKey::encode`] for a key on `curve`.
    ///
    /// Fails with [`UnicurveError::InvalidKeyLength`] if the length is wrong for the curve, and
    /// with [`UnicurveError::MalformedPoint`] if the bytes do not describe a point on the curve.
    pub fn decode(bytes: &[u8], curve: CurveId) -> Result<Self, UnicurveError> {
        match curve {
            CurveId::Edwards25519 => EdwardsPublicKey::from_bytes(bytes).map(Self::Edwards),
            _ => PointKey::decode(bytes, curve).map(Self::Point),
        }
    }

    /// Encode this key: a compressed SEC1 point for prime-field keys, or the raw 32 bytes for
    /// Curve25519 keys.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Point(key) => key.encode(),
            Self::Edwards(key) => key.0.to_vec(),
            Self::Montgomery(key) => key.0.to_vec(),
        }
    }

    pub fn curve(&self) -> CurveId {
        match self {
            Self::Point(key) => key.curve(),
            Self::Edwards(_) | Self::Montgomery(_) => CurveId::Edwards25519,
        }
    }

    /// Map an Edwards key to the Montgomery form of the curve.
    pub fn convert_family(&self) -> Result<Self, UnicurveError> {
        match self {
            Self::Edwards(key) => key.to_montgomery().map(Self::Montgomery),
            _ => Err(UnicurveError::UnsupportedOperationForFamily),
        }
    }

    /// Serialise a prime-field key as a DER `SubjectPublicKeyInfo`.
    pub fn to_der(&self) -> Result<Vec<u8>, UnicurveError> {
        match self {
            Self::Point(key) => key.to_der(),
            _ => Err(UnicurveError::UnsupportedOperationForFamily),
        }
    }

    /// Serialise a prime-field key as a PEM-armoured `PUBLIC KEY` document.
    pub fn to_pem(&self) -> Result<String, UnicurveError> {
        match self {
            Self::Point(key) => key.to_pem(),
            _ => Err(UnicurveError::UnsupportedOperationForFamily),
        }
    }

    /// Parse a PEM-armoured `PUBLIC KEY` document.
    pub fn from_pem(pem: &str) -> Result<Self, UnicurveError> {
        PointKey::from_pem(pem).map(Self::Point)
    }

    /// Hex-encode the output of [`PublicKey::encode`].
    pub fn to_hex(&self) -> Result<String, UnicurveError> {
        hex_encode(&self.encode())
    }

    /// Parse the output of [`PublicKey::to_hex`] for a key on `curve`.
    pub fn from_hex(hex: &str, curve: CurveId) -> Result<Self, UnicurveError> {
        Self::decode(&hex_decode(hex)?, curve)
    }
}
