//! The curve-agnostic facade.
//!
//! An [`Ecc`] is configured with one curve, and dispatches signing, verification and key exchange
//! to the implementation for that curve's family: ECDSA with hedged nonces and hashed ECDH on the
//! prime-field curves, and Ed25519 / X25519 (via Sodium) on Curve25519.
//!
//! # Algorithm Details
//! Key exchange differs by family, but in both cases the two parties must take opposite
//! [`Role`]s to agree on a secret.
//!
//! * On the prime-field curves, the raw shared x-coordinate is hashed together with the DER
//!   `SubjectPublicKeyInfo` encodings of both public keys. The client hashes
//!   `shared || own key || peer key`, and the server hashes `shared || peer key || own key`, so
//!   both hash the client's key first.
//! * On Curve25519, Edwards keys are converted to Montgomery form, and the
//!   [`crypto_kx`](https://doc.libsodium.org/key_exchange) session key derivation is used. The
//!   client's receive key is returned in the client role, and the server's transmit key in the
//!   server role.
//!
//! Two exchanges in the *same* role over the same pair of keys produce different secrets.
//!
//! # Examples
//! ```rust
//! use unicurve::{CurveId, Ecc, Role};
//!
//! let ecc = Ecc::new(CurveId::P256);
//! let alice = ecc.generate_private_key().unwrap();
//! let bob = ecc.generate_private_key().unwrap();
//!
//! let alice_secret = ecc
//!     .key_exchange(&alice, &bob.public_key().unwrap(), Role::Client)
//!     .unwrap();
//! let bob_secret = ecc
//!     .key_exchange(&bob, &alice.public_key().unwrap(), Role::Server)
//!     .unwrap();
//! assert_eq!(alice_secret, bob_secret);
//! ```
//!
//! # Security Considerations
//! The prime-field key exchange performs no authentication: it establishes a secret with whoever
//! holds the peer's private key. Authenticate the peer's public key by other means.

use crate::curve::{CurveDescriptor, CurveId};
use crate::ecdsa;
use crate::hash::HashAlgorithm;
use crate::keys::edwards::MontgomeryPublicKey;
use crate::keys::{PrivateKey, PublicKey};
use crate::signature::{Signature, SignatureFormat};
use crate::UnicurveError;
use tracing::{debug, warn};
use zeroize::Zeroizing;

/// Which side of a key exchange the caller is on.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "use-serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Role {
    /// The initiating party.
    Client,
    /// The responding party.
    Server,
}

/// Signing, verification and key exchange on a single curve.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Ecc {
    curve: CurveId,
}

impl Ecc {
    pub fn new(curve: CurveId) -> Self {
        Self { curve }
    }

    pub fn curve(&self) -> CurveId {
        self.curve
    }

    pub fn descriptor(&self) -> &'static CurveDescriptor {
        self.curve.descriptor()
    }

    /// Generate a new random private key on this curve.
    pub fn generate_private_key(&self) -> Result<PrivateKey, UnicurveError> {
        debug!(curve = self.curve.name(), "generating private key");
        PrivateKey::generate(self.curve)
    }

    /// The length of an encoded public key on this curve, in bytes.
    pub fn public_key_length(&self) -> usize {
        self.descriptor().encoded_public_key_size()
    }

    /// Raw Diffie-Hellman: the x-coordinate of `sk·PK`, or the X25519 output on Curve25519.
    ///
    /// The output is not uniformly random, and should be passed through a KDF before use as a
    /// key. [`Ecc::key_exchange`] does this.
    pub fn scalar_mult(
        &self,
        private_key: &PrivateKey,
        public_key: &PublicKey,
    ) -> Result<Zeroizing<Vec<u8>>, UnicurveError> {
        self.check_curve(private_key.curve())?;
        self.check_curve(public_key.curve())?;

        match private_key {
            PrivateKey::Scalar(sk) => match public_key {
                PublicKey::Point(pk) => sk.shared_x(pk),
                _ => Err(UnicurveError::IncompatibleKeyFamily),
            },
            PrivateKey::Edwards(sk) => sk.to_montgomery()?.scalar_mult(&montgomery_public(public_key)?),
            PrivateKey::Montgomery(sk) => sk.scalar_mult(&montgomery_public(public_key)?),
        }
    }

    /// Derive a shared secret with the holder of `public_key`, using this curve's hash.
    pub fn key_exchange(
        &self,
        private_key: &PrivateKey,
        public_key: &PublicKey,
        role: Role,
    ) -> Result<Zeroizing<Vec<u8>>, UnicurveError> {
        self.key_exchange_with_hash(private_key, public_key, role, self.descriptor().hash())
    }

    /// Derive a shared secret with the holder of `public_key`, using `hash` on the prime-field
    /// curves.
    ///
    /// The output is the raw digest. On Curve25519 `hash` is ignored, and the output is the
    /// 32-byte `crypto_kx` session key.
    pub fn key_exchange_with_hash(
        &self,
        private_key: &PrivateKey,
        public_key: &PublicKey,
        role: Role,
        hash: HashAlgorithm,
    ) -> Result<Zeroizing<Vec<u8>>, UnicurveError> {
        debug!(curve = self.curve.name(), ?role, %hash, "key exchange");
        self.check_curve(private_key.curve())?;
        self.check_curve(public_key.curve())?;

        match (private_key, public_key) {
            (PrivateKey::Scalar(sk), PublicKey::Point(pk)) => {
                let shared = sk.shared_x(pk)?;
                let own = sk.public_key().to_der()?;
                let peer = pk.to_der()?;

                let (first, second) = match role {
                    Role::Client => (&own, &peer),
                    Role::Server => (&peer, &own),
                };

                Ok(Zeroizing::new(hash.digest_parts(&[
                    shared.as_slice(),
                    first.as_slice(),
                    second.as_slice(),
                ])))
            }
            (PrivateKey::Edwards(sk), _) => {
                let peer = montgomery_public(public_key)?;
                sk.to_montgomery()?.session_key(&peer, role)
            }
            (PrivateKey::Montgomery(sk), _) => {
                let peer = montgomery_public(public_key)?;
                sk.session_key(&peer, role)
            }
            _ => Err(UnicurveError::IncompatibleKeyFamily),
        }
    }

    /// Sign `message`.
    ///
    /// On the prime-field curves the signature is encoded in `format`, with fixed-width signatures
    /// always [`encoded_signature_size`](CurveDescriptor::encoded_signature_size) bytes long.
    /// Ed25519 signatures are always the native 64 bytes, whatever `format` is.
    pub fn sign(
        &self,
        message: &[u8],
        private_key: &PrivateKey,
        format: SignatureFormat,
    ) -> Result<Vec<u8>, UnicurveError> {
        debug!(curve = self.curve.name(), ?format, length = message.len(), "signing");
        self.check_curve(private_key.curve())?;

        match private_key {
            PrivateKey::Scalar(sk) => {
                ecdsa::sign(sk, message)?.encode(format, self.descriptor().signature_half_width())
            }
            PrivateKey::Edwards(sk) => sk.sign_detached(message).map(|sig| sig.to_vec()),
            PrivateKey::Montgomery(_) => Err(UnicurveError::UnsupportedOperationForFamily),
        }
    }

    /// Verify `signature` over `message`.
    ///
    /// Returns `Ok(false)` if the signature does not match. Returns an error if the signature could
    /// not be decoded in `format`, or if the key is not on this curve.
    pub fn verify(
        &self,
        message: &[u8],
        public_key: &PublicKey,
        signature: &[u8],
        format: SignatureFormat,
    ) -> Result<bool, UnicurveError> {
        debug!(curve = self.curve.name(), ?format, length = message.len(), "verifying");
        self.check_curve(public_key.curve())?;

        match public_key {
            PublicKey::Point(pk) => ecdsa::verify(pk, message, &Signature::decode(signature, format)?),
            PublicKey::Edwards(pk) => pk.verify_detached(message, signature),
            PublicKey::Montgomery(_) => {
                warn!("asked to verify a signature with an X25519 key");
                Err(UnicurveError::UnsupportedOperationForFamily)
            }
        }
    }

    fn check_curve(&self, curve: CurveId) -> Result<(), UnicurveError> {
        if curve == self.curve {
            Ok(())
        } else {
            warn!(expected = self.curve.name(), found = curve.name(), "key on the wrong curve");
            Err(UnicurveError::IncompatibleKeyFamily)
        }
    }
}

fn montgomery_public(public_key: &PublicKey) -> Result<MontgomeryPublicKey, UnicurveError> {
    match public_key {
        PublicKey::Edwards(pk) => pk.to_montgomery(),
        PublicKey::Montgomery(pk) => Ok(*pk),
        PublicKey::Point(_) => Err(UnicurveError::IncompatibleKeyFamily),
    }
}
