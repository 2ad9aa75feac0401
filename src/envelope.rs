//! Sealed envelopes: public-key encryption over any supported curve.
//!
//! # Algorithm Details
//! To seal a message for a recipient, a fresh ephemeral key pair is generated on the recipient's
//! curve, and a key exchange is performed in the [`Client`](Role::Client) role against the
//! recipient's public key. The resulting secret keys a [`SymmetricCipher`], which encrypts the
//! message. The envelope is the encoded ephemeral public key followed by the ciphertext:
//!
//! ```text
//! envelope = encode(ephemeral public key) || ciphertext
//! ```
//!
//! The recipient splits off the public key (whose length is fixed for each curve), performs the
//! key exchange in the [`Server`](Role::Server) role, and decrypts.
//!
//! On the prime-field curves the cipher key is the SHA-256 key exchange output. On Curve25519 it is
//! the `crypto_kx` session key. Both are 32 bytes.
//!
//! The default cipher, [`XChaCha20Poly1305`], uses a random 24-byte nonce for every message, and
//! outputs `nonce || ciphertext || tag`, so an envelope is always
//! `public_key_length + message.len() + 40` bytes long.
//!
//! # Security Considerations
//! A sealed envelope is anonymous: the recipient learns nothing about who sent it. To authenticate
//! the sender, use [`SealedEnvelope::asymmetric_encrypt`], which uses the sender's static key in
//! place of the ephemeral one, or sign the message separately.
//!
//! The length of the plaintext is not hidden.
//!
//! # Examples
//! ```rust
//! use unicurve::{CurveId, Ecc, SealedEnvelope};
//!
//! let ecc = Ecc::new(CurveId::P256);
//! let recipient = ecc.generate_private_key().unwrap();
//!
//! let envelope = SealedEnvelope::new(ecc);
//! let sealed = envelope
//!     .seal(b"meet at dawn", &recipient.public_key().unwrap())
//!     .unwrap();
//! assert_eq!(sealed.len(), 33 + 12 + 40);
//!
//! let opened = envelope.unseal(&sealed, &recipient).unwrap();
//! assert_eq!(opened, b"meet at dawn");
//! ```

use crate::ecc::{Ecc, Role};
use crate::hash::HashAlgorithm;
use crate::keys::{PrivateKey, PublicKey};
use crate::{error_type, random, require_init, UnicurveError};
use libsodium_sys as sodium;
use std::ptr;
use tracing::debug;
use zeroize::Zeroizing;

error_type! {
    /// Error type returned if something went wrong in the `envelope` module.
    EnvelopeError {
        /// The ciphertext could not be authenticated.
        ///
        /// It was modified, truncated, or encrypted with a different key.
        DecryptionFailed,

        /// The message is too long to encrypt with this cipher.
        MessageTooLong,
    }
}

/// A symmetric authenticated cipher, used to encrypt the body of an envelope.
pub trait SymmetricCipher {
    /// Encrypt `message` with `key`.
    ///
    /// The output must contain everything needed for decryption other than the key (e.g: the
    /// nonce).
    fn encrypt(&self, message: &[u8], key: &[u8]) -> Result<Vec<u8>, UnicurveError>;

    /// Decrypt and authenticate the output of [`SymmetricCipher::encrypt`].
    fn decrypt(&self, ciphertext: &[u8], key: &[u8]) -> Result<Vec<u8>, UnicurveError>;

    /// The number of bytes by which the ciphertext is longer than the message.
    fn overhead(&self) -> usize;
}

/// XChaCha20-Poly1305, as provided by Sodium's
/// [`crypto_aead_xchacha20poly1305_ietf`](https://doc.libsodium.org/secret-key_cryptography/aead/chacha20-poly1305/xchacha20-poly1305_construction)
/// API.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct XChaCha20Poly1305;

impl XChaCha20Poly1305 {
    /// The length of a key, in bytes.
    pub const KEY_LENGTH: usize = sodium::crypto_aead_xchacha20poly1305_ietf_KEYBYTES as usize;

    /// The length of the authentication tag, in bytes.
    pub const MAC_LENGTH: usize = sodium::crypto_aead_xchacha20poly1305_ietf_ABYTES as usize;

    /// The length of a nonce, in bytes.
    pub const NONCE_LENGTH: usize = sodium::crypto_aead_xchacha20poly1305_ietf_NPUBBYTES as usize;

    fn check_key(key: &[u8]) -> Result<(), UnicurveError> {
        if key.len() == Self::KEY_LENGTH {
            Ok(())
        } else {
            Err(UnicurveError::InvalidKeyLength(Self::KEY_LENGTH, key.len()))
        }
    }
}

lazy_static::lazy_static! {
    static ref MESSAGE_LENGTH_MAX: usize = unsafe {
        // SAFETY: This function just returns a constant value, and should always be safe to call.
        sodium::crypto_aead_xchacha20poly1305_ietf_messagebytes_max()
    };
}

impl SymmetricCipher for XChaCha20Poly1305 {
    fn encrypt(&self, message: &[u8], key: &[u8]) -> Result<Vec<u8>, UnicurveError> {
        require_init()?;
        Self::check_key(key)?;

        if message.len() > *MESSAGE_LENGTH_MAX {
            return Err(EnvelopeError::MessageTooLong.into());
        }

        let mut output = vec![0u8; Self::NONCE_LENGTH + message.len() + Self::MAC_LENGTH];
        let (nonce, ciphertext) = output.split_at_mut(Self::NONCE_LENGTH);
        random::fill_random(nonce)?;

        let encrypt_result = unsafe {
            // SAFETY: The first argument is the destination for the combined ciphertext and MAC,
            // which is `message.len() + crypto_aead_xchacha20poly1305_ietf_ABYTES` bytes, the
            // length of `ciphertext`. The next argument is where the output length would be
            // written, which Sodium documents may be NULL. The next two arguments specify the
            // message and its length. The next two specify the additional data, which we don't
            // use, so we pass a NULL pointer and a length of zero. The next argument is the
            // secret nonce, which this algorithm doesn't use, and must be NULL. The final two
            // arguments are the public nonce and the key, and we checked above that both are of
            // the required length.
            sodium::crypto_aead_xchacha20poly1305_ietf_encrypt(
                ciphertext.as_mut_ptr(),
                ptr::null_mut(),
                message.as_ptr(),
                message.len() as libc::c_ulonglong,
                ptr::null(),
                0,
                ptr::null(),
                nonce.as_ptr(),
                key.as_ptr(),
            )
        };
        crate::assert_not_err!(encrypt_result, "crypto_aead_xchacha20poly1305_ietf_encrypt");

        Ok(output)
    }

    fn decrypt(&self, ciphertext: &[u8], key: &[u8]) -> Result<Vec<u8>, UnicurveError> {
        require_init()?;
        Self::check_key(key)?;

        if ciphertext.len() < self.overhead() {
            return Err(EnvelopeError::DecryptionFailed.into());
        }

        let (nonce, ciphertext) = ciphertext.split_at(Self::NONCE_LENGTH);
        let mut output = vec![0u8; ciphertext.len() - Self::MAC_LENGTH];

        let decrypt_result = unsafe {
            // SAFETY: The first argument is the destination for the plaintext, which is
            // `crypto_aead_xchacha20poly1305_ietf_ABYTES` shorter than the combined ciphertext and
            // MAC. The next argument is where the output length would be written, which may be
            // NULL. The next argument is the secret nonce, which must be NULL. The next two
            // arguments specify the combined ciphertext and MAC, and its length. We checked above
            // that it is at least as long as a MAC. The next two arguments specify the additional
            // data, which is unused. The final two arguments are the public nonce, split off above
            // so it is `crypto_aead_xchacha20poly1305_ietf_NPUBBYTES` long, and the key, which we
            // checked is of the required length.
            sodium::crypto_aead_xchacha20poly1305_ietf_decrypt(
                output.as_mut_ptr(),
                ptr::null_mut(),
                ptr::null_mut(),
                ciphertext.as_ptr(),
                ciphertext.len() as libc::c_ulonglong,
                ptr::null(),
                0,
                nonce.as_ptr(),
                key.as_ptr(),
            )
        };

        if decrypt_result == 0 {
            Ok(output)
        } else {
            Err(EnvelopeError::DecryptionFailed.into())
        }
    }

    fn overhead(&self) -> usize {
        Self::NONCE_LENGTH + Self::MAC_LENGTH
    }
}

/// Public-key encryption on the curve of an [`Ecc`].
#[derive(Clone, Copy, Debug)]
pub struct SealedEnvelope<S = XChaCha20Poly1305> {
    ecc: Ecc,
    cipher: S,
}

impl SealedEnvelope<XChaCha20Poly1305> {
    /// Create an envelope on the curve of `ecc`, using [`XChaCha20Poly1305`].
    pub fn new(ecc: Ecc) -> Self {
        Self::with_cipher(ecc, XChaCha20Poly1305)
    }
}

impl<S: SymmetricCipher> SealedEnvelope<S> {
    /// Create an envelope on the curve of `ecc`, encrypting with `cipher`.
    ///
    /// `cipher` must accept 32-byte keys.
    pub fn with_cipher(ecc: Ecc, cipher: S) -> Self {
        Self { ecc, cipher }
    }

    /// Encrypt `message` so that only the holder of the private key for `recipient` can read it.
    pub fn seal(&self, message: &[u8], recipient: &PublicKey) -> Result<Vec<u8>, UnicurveError> {
        debug!(curve = self.ecc.curve().name(), length = message.len(), "sealing envelope");

        let ephemeral = self.ecc.generate_private_key()?;
        let key = self.derive_key(&ephemeral, recipient, Role::Client)?;

        let mut sealed = ephemeral.public_key()?.encode();
        sealed.extend_from_slice(&self.cipher.encrypt(message, &key)?);
        Ok(sealed)
    }

    /// Decrypt the output of [`SealedEnvelope::seal`] with the recipient's private key.
    ///
    /// Fails with [`UnicurveError::TruncatedEnvelope`] if `sealed` is too short to contain a public
    /// key, or with [`EnvelopeError::DecryptionFailed`] if the envelope was not sealed for this
    /// key or has been modified.
    pub fn unseal(&self, sealed: &[u8], recipient: &PrivateKey) -> Result<Vec<u8>, UnicurveError> {
        debug!(curve = self.ecc.curve().name(), length = sealed.len(), "unsealing envelope");

        let public_key_length = self.ecc.public_key_length();
        if sealed.len() < public_key_length {
            return Err(UnicurveError::TruncatedEnvelope);
        }

        let (ephemeral, ciphertext) = sealed.split_at(public_key_length);
        let ephemeral = PublicKey::decode(ephemeral, self.ecc.curve())?;
        let key = self.derive_key(recipient, &ephemeral, Role::Server)?;

        self.cipher.decrypt(ciphertext, &key)
    }

    /// Encrypt `message` for the holder of the private key for `peer`, with the sender's static
    /// key in place of an ephemeral one.
    ///
    /// The recipient decrypts with [`SealedEnvelope::asymmetric_decrypt`], passing the sender's
    /// public key, which authenticates the sender.
    pub fn asymmetric_encrypt(
        &self,
        message: &[u8],
        private_key: &PrivateKey,
        peer: &PublicKey,
    ) -> Result<Vec<u8>, UnicurveError> {
        let key = self.derive_key(private_key, peer, Role::Client)?;
        self.cipher.encrypt(message, &key)
    }

    /// Decrypt the output of [`SealedEnvelope::asymmetric_encrypt`] sent by the holder of the
    /// private key for `peer`.
    pub fn asymmetric_decrypt(
        &self,
        ciphertext: &[u8],
        private_key: &PrivateKey,
        peer: &PublicKey,
    ) -> Result<Vec<u8>, UnicurveError> {
        let key = self.derive_key(private_key, peer, Role::Server)?;
        self.cipher.decrypt(ciphertext, &key)
    }

    fn derive_key(
        &self,
        private_key: &PrivateKey,
        public_key: &PublicKey,
        role: Role,
    ) -> Result<Zeroizing<Vec<u8>>, UnicurveError> {
        self.ecc
            .key_exchange_with_hash(private_key, public_key, role, HashAlgorithm::Sha256)
    }
}

#[cfg(test)]
mod tests {
    use super::{EnvelopeError, SealedEnvelope, SymmetricCipher, XChaCha20Poly1305};
    use crate::{CurveId, Ecc, UnicurveError};
    use rand::{Rng, RngCore};

    #[test]
    fn seal_unseal_every_curve() -> Result<(), UnicurveError> {
        let mut rng = rand::thread_rng();

        for curve in CurveId::ALL {
            let ecc = Ecc::new(curve);
            let envelope = SealedEnvelope::new(ecc);
            let recipient = ecc.generate_private_key()?;

            for _ in 0..4 {
                let mut message = vec![0u8; rng.gen_range(0..1024)];
                rng.fill_bytes(&mut message);

                let sealed = envelope.seal(&message, &recipient.public_key()?)?;
                assert_eq!(
                    sealed.len(),
                    ecc.public_key_length() + message.len() + XChaCha20Poly1305.overhead()
                );
                assert_eq!(envelope.unseal(&sealed, &recipient)?, message);
            }
        }

        Ok(())
    }

    #[test]
    fn unseal_failures() -> Result<(), UnicurveError> {
        let ecc = Ecc::new(CurveId::K256);
        let envelope = SealedEnvelope::new(ecc);
        let recipient = ecc.generate_private_key()?;
        let other = ecc.generate_private_key()?;

        let mut sealed = envelope.seal(b"attack at dawn", &recipient.public_key()?)?;

        assert_eq!(
            envelope.unseal(&sealed[..32], &recipient),
            Err(UnicurveError::TruncatedEnvelope)
        );
        assert_eq!(
            envelope.unseal(&sealed[..33], &recipient),
            Err(UnicurveError::EnvelopeError(EnvelopeError::DecryptionFailed))
        );
        assert_eq!(
            envelope.unseal(&sealed, &other),
            Err(UnicurveError::EnvelopeError(EnvelopeError::DecryptionFailed))
        );

        let last = sealed.len() - 1;
        sealed[last] ^= 1;
        assert_eq!(
            envelope.unseal(&sealed, &recipient),
            Err(UnicurveError::EnvelopeError(EnvelopeError::DecryptionFailed))
        );

        Ok(())
    }

    #[test]
    fn retagged_ephemeral_key_is_rejected() -> Result<(), UnicurveError> {
        let ecc = Ecc::new(CurveId::P256);
        let envelope = SealedEnvelope::new(ecc);
        let recipient = ecc.generate_private_key()?;

        for _ in 0..16 {
            let sealed = envelope.seal(b"attack at dawn", &recipient.public_key()?)?;

            for tag in [0x04, 0x05] {
                let mut retagged = sealed.clone();
                retagged[0] = tag;
                assert_eq!(
                    envelope.unseal(&retagged, &recipient),
                    Err(UnicurveError::MalformedPoint)
                );
            }

            let mut negated = sealed.clone();
            negated[0] ^= 0x01;
            assert_eq!(
                envelope.unseal(&negated, &recipient),
                Err(UnicurveError::EnvelopeError(EnvelopeError::DecryptionFailed))
            );
        }

        Ok(())
    }

    #[test]
    fn asymmetric_round_trip() -> Result<(), UnicurveError> {
        for curve in CurveId::ALL {
            let ecc = Ecc::new(curve);
            let envelope = SealedEnvelope::new(ecc);
            let alice = ecc.generate_private_key()?;
            let bob = ecc.generate_private_key()?;
            let eve = ecc.generate_private_key()?;

            let ciphertext =
                envelope.asymmetric_encrypt(b"hello bob", &alice, &bob.public_key()?)?;
            assert_eq!(ciphertext.len(), 9 + 40);
            assert_eq!(
                envelope.asymmetric_decrypt(&ciphertext, &bob, &alice.public_key()?)?,
                b"hello bob"
            );
            assert_eq!(
                envelope.asymmetric_decrypt(&ciphertext, &bob, &eve.public_key()?),
                Err(UnicurveError::EnvelopeError(EnvelopeError::DecryptionFailed))
            );
        }

        Ok(())
    }

    #[test]
    fn cipher_checks_key_length() -> Result<(), UnicurveError> {
        let cipher = XChaCha20Poly1305;
        assert_eq!(
            cipher.encrypt(b"message", &[0u8; 16]),
            Err(UnicurveError::InvalidKeyLength(32, 16))
        );

        let key = [0x24u8; 32];
        let ciphertext = cipher.encrypt(b"message", &key)?;
        assert_eq!(cipher.decrypt(&ciphertext, &key)?, b"message");
        assert_ne!(cipher.encrypt(b"message", &key)?, ciphertext);

        Ok(())
    }

    #[test]
    fn wrong_curve_recipient() -> Result<(), UnicurveError> {
        let envelope = SealedEnvelope::new(Ecc::new(CurveId::P384));
        let recipient = Ecc::new(CurveId::P256).generate_private_key()?;

        assert_eq!(
            envelope.seal(b"message", &recipient.public_key()?),
            Err(UnicurveError::IncompatibleKeyFamily)
        );

        Ok(())
    }
}
