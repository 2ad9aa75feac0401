//! Keys on the short Weierstrass curves P-256, P-384, P-521 and secp256k1.
//!
//! The curve arithmetic and the key serialisation formats come from the RustCrypto curve crates.
//! [`ScalarKey`] and [`PointKey`] tag each key with its curve, so a key can never be used with the
//! arithmetic of another curve by accident: any operation combining keys from two curves fails
//! with [`UnicurveError::IncompatibleKeyFamily`].
//!
//! # Encodings
//! * Public keys are stored and transmitted as compressed SEC1 points (`0x02`/`0x03 || x`).
//! * [`PointKey::to_der`] produces a DER `SubjectPublicKeyInfo` holding the uncompressed point, and
//!   [`PointKey::to_pem`] its PEM armouring.
//! * [`ScalarKey::to_pem`] produces a SEC1 `EC PRIVATE KEY` document, which embeds the public key.

use crate::curve::CurveId;
use crate::keys::KeyError;
use crate::random::SodiumRng;
use crate::UnicurveError;
use elliptic_curve::ecdh;
use elliptic_curve::pkcs8::{DecodePublicKey, EncodePublicKey, LineEnding};
use elliptic_curve::sec1::ToEncodedPoint;
use elliptic_curve::{CurveArithmetic, PublicKey, SecretKey};
use zeroize::Zeroizing;

/// Apply `$body` to the curve-specific key inside `$value`, whatever its curve.
macro_rules! with_key {
    ($value:expr, $inner:ident => $body:expr) => {
        match $value {
            Self::P256($inner) => $body,
            Self::P384($inner) => $body,
            Self::P521($inner) => $body,
            Self::K256($inner) => $body,
        }
    };
}

/// Apply `$body` to the curve-specific key inside `$value`, wrapping the result in the variant of
/// `$target` for the same curve.
macro_rules! map_key {
    ($value:expr, $target:ident, $inner:ident => $body:expr) => {
        match $value {
            Self::P256($inner) => $target::P256($body),
            Self::P384($inner) => $target::P384($body),
            Self::P521($inner) => $target::P521($body),
            Self::K256($inner) => $target::K256($body),
        }
    };
}

/// A private scalar on one of the prime-field curves.
///
/// The scalar is zeroized when the key is dropped. The `Debug` implementation does not reveal it.
#[derive(Clone, Debug)]
pub enum ScalarKey {
    P256(p256::SecretKey),
    P384(p384::SecretKey),
    P521(p521::SecretKey),
    K256(k256::SecretKey),
}

/// A public point on one of the prime-field curves.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PointKey {
    P256(p256::PublicKey),
    P384(p384::PublicKey),
    P521(p521::PublicKey),
    K256(k256::PublicKey),
}

impl ScalarKey {
    /// Generate a new random private key on `curve`, using the Sodium CSPRNG.
    pub fn generate(curve: CurveId) -> Result<Self, UnicurveError> {
        let mut rng = SodiumRng;

        match curve {
            CurveId::P256 => Ok(Self::P256(p256::SecretKey::random(&mut rng))),
            CurveId::P384 => Ok(Self::P384(p384::SecretKey::random(&mut rng))),
            CurveId::P521 => Ok(Self::P521(p521::SecretKey::random(&mut rng))),
            CurveId::K256 => Ok(Self::K256(k256::SecretKey::random(&mut rng))),
            CurveId::Edwards25519 => Err(UnicurveError::UnsupportedOperationForFamily),
        }
    }

    /// Import a private key on `curve` from the big-endian encoding of its scalar.
    ///
    /// `bytes` must be exactly the curve's order length, and encode a value in `[1, order)`.
    pub fn from_bytes(bytes: &[u8], curve: CurveId) -> Result<Self, UnicurveError> {
        let expected = curve.descriptor().order_length();
        if bytes.len() != expected {
            return Err(UnicurveError::InvalidKeyLength(expected, bytes.len()));
        }

        let key = match curve {
            CurveId::P256 => p256::SecretKey::from_slice(bytes).map(Self::P256),
            CurveId::P384 => p384::SecretKey::from_slice(bytes).map(Self::P384),
            CurveId::P521 => p521::SecretKey::from_slice(bytes).map(Self::P521),
            CurveId::K256 => k256::SecretKey::from_slice(bytes).map(Self::K256),
            CurveId::Edwards25519 => return Err(UnicurveError::UnsupportedOperationForFamily),
        };

        key.map_err(|_| KeyError::DecodingFailed.into())
    }

    pub fn curve(&self) -> CurveId {
        match self {
            Self::P256(_) => CurveId::P256,
            Self::P384(_) => CurveId::P384,
            Self::P521(_) => CurveId::P521,
            Self::K256(_) => CurveId::K256,
        }
    }

    /// Derive the public key, `d·G`.
    pub fn public_key(&self) -> PointKey {
        map_key!(self, PointKey, key => key.public_key())
    }

    /// The big-endian encoding of the private scalar, padded to the order length.
    pub fn to_bytes(&self) -> Zeroizing<Vec<u8>> {
        with_key!(self, key => Zeroizing::new(key.to_bytes().to_vec()))
    }

    /// Serialise as a PEM-armoured SEC1 `EC PRIVATE KEY` document.
    pub fn to_pem(&self) -> Result<Zeroizing<String>, UnicurveError> {
        with_key!(self, key => key.to_sec1_pem(LineEnding::LF))
            .map_err(|_| KeyError::EncodingFailed.into())
    }

    /// Parse a PEM-armoured SEC1 `EC PRIVATE KEY` document, detecting its curve.
    ///
    /// The embedded public key must match the private scalar, which rules out parsing a key from
    /// one curve as a key on another.
    pub fn from_pem(pem: &str) -> Result<Self, UnicurveError> {
        p256::SecretKey::from_sec1_pem(pem)
            .map(Self::P256)
            .or_else(|_| k256::SecretKey::from_sec1_pem(pem).map(Self::K256))
            .or_else(|_| p384::SecretKey::from_sec1_pem(pem).map(Self::P384))
            .or_else(|_| p521::SecretKey::from_sec1_pem(pem).map(Self::P521))
            .map_err(|_| KeyError::DecodingFailed.into())
    }

    /// Compute the x-coordinate of `d·Q` for the peer's point `Q`.
    ///
    /// The result is big-endian, padded to the order length.
    pub fn shared_x(&self, peer: &PointKey) -> Result<Zeroizing<Vec<u8>>, UnicurveError> {
        match (self, peer) {
            (Self::P256(sk), PointKey::P256(pk)) => Ok(raw_shared_x(sk, pk)),
            (Self::P384(sk), PointKey::P384(pk)) => Ok(raw_shared_x(sk, pk)),
            (Self::P521(sk), PointKey::P521(pk)) => Ok(raw_shared_x(sk, pk)),
            (Self::K256(sk), PointKey::K256(pk)) => Ok(raw_shared_x(sk, pk)),
            _ => Err(UnicurveError::IncompatibleKeyFamily),
        }
    }
}

fn raw_shared_x<C: CurveArithmetic>(
    secret_key: &SecretKey<C>,
    public_key: &PublicKey<C>,
) -> Zeroizing<Vec<u8>> {
    let shared = ecdh::diffie_hellman(secret_key.to_nonzero_scalar(), public_key.as_affine());
    Zeroizing::new(shared.raw_secret_bytes().to_vec())
}

impl PointKey {
    /// Parse a compressed SEC1 point on `curve`.
    ///
    /// Fails with [`UnicurveError::InvalidKeyLength`] if `bytes` is not the curve's encoded public
    /// key size, or with [`UnicurveError::MalformedPoint`] if it does not decompress to a point on
    /// the curve.
    pub fn decode(bytes: &[u8], curve: CurveId) -> Result<Self, UnicurveError> {
        if curve == CurveId::Edwards25519 {
            return Err(UnicurveError::UnsupportedOperationForFamily);
        }

        let expected = curve.descriptor().encoded_public_key_size();
        if bytes.len() != expected {
            return Err(UnicurveError::InvalidKeyLength(expected, bytes.len()));
        }

        // The SEC1 parser also takes the compact (0x05) tag, which has the same length. Only the
        // compressed encoding is canonical.
        if !matches!(bytes[0], 0x02 | 0x03) {
            return Err(UnicurveError::MalformedPoint);
        }

        let key = match curve {
            CurveId::P256 => p256::PublicKey::from_sec1_bytes(bytes).map(Self::P256),
            CurveId::P384 => p384::PublicKey::from_sec1_bytes(bytes).map(Self::P384),
            CurveId::P521 => p521::PublicKey::from_sec1_bytes(bytes).map(Self::P521),
            CurveId::K256 => k256::PublicKey::from_sec1_bytes(bytes).map(Self::K256),
            CurveId::Edwards25519 => return Err(UnicurveError::UnsupportedOperationForFamily),
        };

        key.map_err(|_| UnicurveError::MalformedPoint)
    }

    pub fn curve(&self) -> CurveId {
        match self {
            Self::P256(_) => CurveId::P256,
            Self::P384(_) => CurveId::P384,
            Self::P521(_) => CurveId::P521,
            Self::K256(_) => CurveId::K256,
        }
    }

    /// The compressed SEC1 encoding of this point.
    pub fn encode(&self) -> Vec<u8> {
        with_key!(self, key => key.to_encoded_point(true).as_bytes().to_vec())
    }

    /// Serialise as a DER `SubjectPublicKeyInfo`, with the point uncompressed.
    pub fn to_der(&self) -> Result<Vec<u8>, UnicurveError> {
        with_key!(self, key => key.to_public_key_der())
            .map(|document| document.as_bytes().to_vec())
            .map_err(|_| KeyError::EncodingFailed.into())
    }

    /// Serialise as a PEM-armoured `PUBLIC KEY` document.
    pub fn to_pem(&self) -> Result<String, UnicurveError> {
        with_key!(self, key => key.to_public_key_pem(LineEnding::LF))
            .map_err(|_| KeyError::EncodingFailed.into())
    }

    /// Parse a PEM-armoured `PUBLIC KEY` document, detecting its curve from the algorithm OID.
    pub fn from_pem(pem: &str) -> Result<Self, UnicurveError> {
        p256::PublicKey::from_public_key_pem(pem)
            .map(Self::P256)
            .or_else(|_| k256::PublicKey::from_public_key_pem(pem).map(Self::K256))
            .or_else(|_| p384::PublicKey::from_public_key_pem(pem).map(Self::P384))
            .or_else(|_| p521::PublicKey::from_public_key_pem(pem).map(Self::P521))
            .map_err(|_| KeyError::DecodingFailed.into())
    }
}
