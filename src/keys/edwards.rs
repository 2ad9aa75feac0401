//! Curve25519 keys: Ed25519 for signatures, X25519 for key exchange.
//!
//! This module corresponds to the [`crypto_sign_ed25519`](https://doc.libsodium.org/public-key_cryptography/public-key_signatures),
//! [`crypto_kx`](https://doc.libsodium.org/key_exchange) and
//! [Ed25519 to Curve25519](https://doc.libsodium.org/advanced/ed25519-curve25519) APIs from
//! Sodium.
//!
//! # Algorithm Details
//! An Ed25519 key is a point on the twisted Edwards form of Curve25519. For key exchange it is
//! mapped to the birationally equivalent Montgomery curve, and X25519 is used to compute a shared
//! point `P`. Session keys are then derived with BLAKE2b, where `||` denotes concatenation:
//!
//! ```text
//! rx || tx = BLAKE2B-512(P || Client Public Key || Server Public Key)
//! ```
//!
//! The client uses `rx` and the server uses `tx`, so a client-role exchange and a server-role
//! exchange between the same two parties agree, while two exchanges in the same role do not.
//!
//! # Security Considerations
//! The Edwards to Montgomery map discards the sign of the x-coordinate, so it cannot be inverted
//! losslessly. Keep the Edwards key if you will need to sign with it.

use crate::mem::hardened_buffer;
use crate::signature::SignatureError;
use crate::{assert_not_err, require_init, Role, UnicurveError};
use libsodium_sys as sodium;
use std::ptr;
use zeroize::Zeroizing;

/// The length of an Ed25519 public key, in bytes.
pub const PUBLIC_KEY_LENGTH: usize = sodium::crypto_sign_ed25519_PUBLICKEYBYTES as usize;

/// The length of an Ed25519 secret key as Sodium stores it (seed || public key), in bytes.
pub const SECRET_KEY_LENGTH: usize = sodium::crypto_sign_ed25519_SECRETKEYBYTES as usize;

/// The length of an Ed25519 seed, in bytes.
pub const SEED_LENGTH: usize = sodium::crypto_sign_ed25519_SEEDBYTES as usize;

/// The length of a secret key followed by its public key, in bytes.
pub const KEYPAIR_LENGTH: usize = SECRET_KEY_LENGTH + PUBLIC_KEY_LENGTH;

/// The length of an Ed25519 signature, in bytes.
pub const SIGNATURE_LENGTH: usize = sodium::crypto_sign_ed25519_BYTES as usize;

/// The length of an X25519 secret scalar or public point, in bytes.
pub const MONTGOMERY_KEY_LENGTH: usize = sodium::crypto_scalarmult_curve25519_BYTES as usize;

/// The length of a session key derived from a Curve25519 key exchange, in bytes.
pub const SESSION_KEY_LENGTH: usize = sodium::crypto_kx_SESSIONKEYBYTES as usize;

crate::error_type! {
    /// Error type returned if a Curve25519 key exchange failed.
    KeyExchangeError {
        /// The peer's public key is weak (likely of low order), and should not be used for
        /// cryptographic purposes.
        PublicKeyInsecure,
    }
}

hardened_buffer! {
    /// An Ed25519 secret key, as Sodium stores it (seed || public key).
    ///
    /// This is a hardened buffer type, and will be zeroed on drop.
    EdwardsSecretKey(SECRET_KEY_LENGTH);

    /// An X25519 secret scalar, usually obtained from an [`EdwardsSecretKey`].
    ///
    /// This is a hardened buffer type, and will be zeroed on drop.
    MontgomerySecretKey(MONTGOMERY_KEY_LENGTH);
}

/// An Ed25519 public key.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "use-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EdwardsPublicKey(pub [u8; PUBLIC_KEY_LENGTH]);

/// An X25519 public key.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "use-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MontgomeryPublicKey(pub [u8; MONTGOMERY_KEY_LENGTH]);

impl EdwardsSecretKey {
    /// Generate a new random Ed25519 secret key.
    pub fn generate() -> Result<Self, UnicurveError> {
        require_init()?;

        let mut secret_key = Self::new_empty()?;
        let mut public_key = [0u8; PUBLIC_KEY_LENGTH];

        let keypair_result = unsafe {
            // SAFETY: This function expects a pointer to a region of memory sufficient to store a
            // public key, and a pointer to a region of memory sufficient to store a secret key.
            // `public_key` is `crypto_sign_ed25519_PUBLICKEYBYTES` long, and `EdwardsSecretKey` is
            // defined to be `crypto_sign_ed25519_SECRETKEYBYTES` long, so both are valid for
            // writes of the required length.
            sodium::crypto_sign_ed25519_keypair(public_key.as_mut_ptr(), secret_key.as_mut_ptr())
        };
        assert_not_err!(keypair_result, "crypto_sign_ed25519_keypair");

        Ok(secret_key)
    }

    /// Deterministically derive an Ed25519 secret key from a 32-byte seed.
    pub fn from_seed(seed: &[u8; SEED_LENGTH]) -> Result<Self, UnicurveError> {
        require_init()?;

        let mut secret_key = Self::new_empty()?;
        let mut public_key = [0u8; PUBLIC_KEY_LENGTH];

        let keypair_result = unsafe {
            // SAFETY: As for `generate`, with the final argument being a pointer to the seed,
            // which is `crypto_sign_ed25519_SEEDBYTES` long by its type.
            sodium::crypto_sign_ed25519_seed_keypair(
                public_key.as_mut_ptr(),
                secret_key.as_mut_ptr(),
                seed.as_ptr(),
            )
        };
        assert_not_err!(keypair_result, "crypto_sign_ed25519_seed_keypair");

        Ok(secret_key)
    }

    /// Import an Ed25519 secret key from any of its common representations.
    ///
    /// `key_material` may be a 96-byte keypair (secret key || public key), a 64-byte secret key,
    /// or a 32-byte seed. Any other length fails with [`UnicurveError::InvalidKeyLength`].
    pub fn from_key_material(key_material: &[u8]) -> Result<Self, UnicurveError> {
        match key_material.len() {
            KEYPAIR_LENGTH => Self::try_from(&key_material[..SECRET_KEY_LENGTH]),
            SECRET_KEY_LENGTH => Self::try_from(key_material),
            SEED_LENGTH => {
                let mut seed = Zeroizing::new([0u8; SEED_LENGTH]);
                seed.copy_from_slice(key_material);
                Self::from_seed(&seed)
            }
            actual => Err(UnicurveError::InvalidKeyLength(SECRET_KEY_LENGTH, actual)),
        }
    }

    /// Derive the public key corresponding to this secret key.
    pub fn public_key(&self) -> Result<EdwardsPublicKey, UnicurveError> {
        require_init()?;

        let mut public_key = [0u8; PUBLIC_KEY_LENGTH];
        let derive_result = unsafe {
            // SAFETY: The first argument is the destination for the public key, which is
            // `crypto_sign_ed25519_PUBLICKEYBYTES` long. The second is the secret key, which is
            // `crypto_sign_ed25519_SECRETKEYBYTES` long by its type.
            sodium::crypto_sign_ed25519_sk_to_pk(public_key.as_mut_ptr(), self.as_ptr())
        };
        assert_not_err!(derive_result, "crypto_sign_ed25519_sk_to_pk");

        Ok(EdwardsPublicKey(public_key))
    }

    /// Convert this signing key to an X25519 secret scalar.
    pub fn to_montgomery(&self) -> Result<MontgomerySecretKey, UnicurveError> {
        require_init()?;

        let mut scalar = MontgomerySecretKey::new_empty()?;
        let conversion_result = unsafe {
            // SAFETY: The first argument is the destination for the Curve25519 scalar, which is
            // `crypto_scalarmult_curve25519_BYTES` long by its type. The second argument is the
            // Ed25519 secret key, of which Sodium reads the first `crypto_sign_ed25519_SEEDBYTES`.
            sodium::crypto_sign_ed25519_sk_to_curve25519(scalar.as_mut_ptr(), self.as_ptr())
        };
        assert_not_err!(conversion_result, "crypto_sign_ed25519_sk_to_curve25519");

        Ok(scalar)
    }

    /// Sign `message`, returning the detached 64-byte signature.
    pub fn sign_detached(&self, message: &[u8]) -> Result<[u8; SIGNATURE_LENGTH], UnicurveError> {
        require_init()?;

        let mut signature = [0u8; SIGNATURE_LENGTH];
        let sign_result = unsafe {
            // SAFETY: The first argument is the destination for the signature, which is
            // `crypto_sign_ed25519_BYTES` long. The second is where the signature length would be
            // written, which Sodium documents may be NULL. The next two arguments specify the
            // message and its length, for which we use `message.len()`. The final argument is the
            // secret key, which is `crypto_sign_ed25519_SECRETKEYBYTES` long by its type.
            sodium::crypto_sign_ed25519_detached(
                signature.as_mut_ptr(),
                ptr::null_mut(),
                message.as_ptr(),
                message.len() as libc::c_ulonglong,
                self.as_ptr(),
            )
        };
        assert_not_err!(sign_result, "crypto_sign_ed25519_detached");

        Ok(signature)
    }
}

impl EdwardsPublicKey {
    /// Parse a raw 32-byte Ed25519 public key.
    ///
    /// Fails with [`UnicurveError::MalformedPoint`] if the bytes are not the encoding of a point
    /// on the curve which can be used for key exchange.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, UnicurveError> {
        let key: [u8; PUBLIC_KEY_LENGTH] = bytes
            .try_into()
            .map_err(|_| UnicurveError::InvalidKeyLength(PUBLIC_KEY_LENGTH, bytes.len()))?;

        let key = Self(key);
        key.to_montgomery()?;
        Ok(key)
    }

    /// Map this key to the Montgomery form of the curve, for use in X25519.
    pub fn to_montgomery(&self) -> Result<MontgomeryPublicKey, UnicurveError> {
        require_init()?;

        let mut point = [0u8; MONTGOMERY_KEY_LENGTH];
        let conversion_result = unsafe {
            // SAFETY: The first argument is the destination for the Curve25519 point, which is
            // `crypto_scalarmult_curve25519_BYTES` long. The second is the Ed25519 public key,
            // which is `crypto_sign_ed25519_PUBLICKEYBYTES` long.
            sodium::crypto_sign_ed25519_pk_to_curve25519(point.as_mut_ptr(), self.0.as_ptr())
        };

        if conversion_result == 0 {
            Ok(MontgomeryPublicKey(point))
        } else {
            Err(UnicurveError::MalformedPoint)
        }
    }

    /// Verify a detached Ed25519 signature over `message`.
    ///
    /// Returns `Ok(false)` if the signature does not verify, or an error if `signature` is not
    /// [`SIGNATURE_LENGTH`] bytes long.
    pub fn verify_detached(&self, message: &[u8], signature: &[u8]) -> Result<bool, UnicurveError> {
        require_init()?;

        if signature.len() != SIGNATURE_LENGTH {
            return Err(SignatureError::MalformedSignature.into());
        }

        let verification_result = unsafe {
            // SAFETY: The first argument is the signature, which we checked above is
            // `crypto_sign_ed25519_BYTES` long. The next two arguments specify the message and its
            // length, for which we use `message.len()`. The final argument is the public key,
            // which is `crypto_sign_ed25519_PUBLICKEYBYTES` long.
            sodium::crypto_sign_ed25519_verify_detached(
                signature.as_ptr(),
                message.as_ptr(),
                message.len() as libc::c_ulonglong,
                self.0.as_ptr(),
            )
        };

        Ok(verification_result == 0)
    }
}

impl MontgomerySecretKey {
    /// Derive the X25519 public key for this scalar.
    pub fn public_key(&self) -> Result<MontgomeryPublicKey, UnicurveError> {
        require_init()?;

        let mut public_key = [0u8; MONTGOMERY_KEY_LENGTH];
        let derive_result = unsafe {
            // SAFETY: The first argument is the destination for the point, and the second is the
            // scalar. Both are `crypto_scalarmult_curve25519_BYTES` long.
            sodium::crypto_scalarmult_curve25519_base(public_key.as_mut_ptr(), self.as_ptr())
        };
        assert_not_err!(derive_result, "crypto_scalarmult_curve25519_base");

        Ok(MontgomeryPublicKey(public_key))
    }

    /// Raw X25519: multiply `peer` by this scalar.
    ///
    /// Fails with [`KeyExchangeError::PublicKeyInsecure`] if the result is the identity, which
    /// happens when `peer` has low order.
    pub fn scalar_mult(
        &self,
        peer: &MontgomeryPublicKey,
    ) -> Result<Zeroizing<Vec<u8>>, UnicurveError> {
        require_init()?;

        let mut shared = Zeroizing::new(vec![0u8; MONTGOMERY_KEY_LENGTH]);
        let mult_result = unsafe {
            // SAFETY: The first argument is the destination for the shared point, the second is
            // the scalar, and the third is the peer's point. All three are
            // `crypto_scalarmult_curve25519_BYTES` long.
            sodium::crypto_scalarmult_curve25519(shared.as_mut_ptr(), self.as_ptr(), peer.0.as_ptr())
        };

        if mult_result == 0 {
            Ok(shared)
        } else {
            Err(KeyExchangeError::PublicKeyInsecure.into())
        }
    }

    /// Derive the session key for an exchange with `peer` in the given role.
    ///
    /// A client-role call returns the client's receive key; a server-role call returns the
    /// server's transmit key. These are equal when the two parties take opposite roles.
    pub fn session_key(
        &self,
        peer: &MontgomeryPublicKey,
        role: Role,
    ) -> Result<Zeroizing<Vec<u8>>, UnicurveError> {
        require_init()?;

        let own = self.public_key()?;
        let mut rx = Zeroizing::new([0u8; SESSION_KEY_LENGTH]);
        let mut tx = Zeroizing::new([0u8; SESSION_KEY_LENGTH]);

        let kx_result = unsafe {
            // SAFETY: These functions expect a pointer to which the receive key will be written, a
            // pointer to which the transmit key will be written, a pointer to our public key, a
            // pointer to our secret key, and a pointer to the peer's public key. Both session key
            // buffers are `crypto_kx_SESSIONKEYBYTES` long. The keys are
            // `crypto_scalarmult_curve25519_BYTES` long, which is equal to
            // `crypto_kx_PUBLICKEYBYTES` and `crypto_kx_SECRETKEYBYTES`.
            match role {
                Role::Client => sodium::crypto_kx_client_session_keys(
                    rx.as_mut_ptr(),
                    tx.as_mut_ptr(),
                    own.0.as_ptr(),
                    self.as_ptr(),
                    peer.0.as_ptr(),
                ),
                Role::Server => sodium::crypto_kx_server_session_keys(
                    rx.as_mut_ptr(),
                    tx.as_mut_ptr(),
                    own.0.as_ptr(),
                    self.as_ptr(),
                    peer.0.as_ptr(),
                ),
            }
        };

        if kx_result != 0 {
            return Err(KeyExchangeError::PublicKeyInsecure.into());
        }

        let key = match role {
            Role::Client => &rx[..],
            Role::Server => &tx[..],
        };
        Ok(Zeroizing::new(key.to_vec()))
    }
}

impl MontgomeryPublicKey {
    /// Parse a raw 32-byte X25519 public key.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, UnicurveError> {
        bytes
            .try_into()
            .map(Self)
            .map_err(|_| UnicurveError::InvalidKeyLength(MONTGOMERY_KEY_LENGTH, bytes.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::{
        EdwardsPublicKey, EdwardsSecretKey, KeyExchangeError, MontgomeryPublicKey,
        MontgomerySecretKey, KEYPAIR_LENGTH,
    };
    use crate::{random, Role, UnicurveError};
    use hex_literal::hex;

    const WEAK_POINT: [u8; 32] =
        hex!("e0eb7a7c3b41b8ae1656e3faf19fc46ada098deb9c32b1fd866205165f49b800");

    #[test]
    fn rfc8032_test_1() -> Result<(), UnicurveError> {
        let seed = hex!("9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60");
        let secret_key = EdwardsSecretKey::from_seed(&seed)?;
        let public_key = secret_key.public_key()?;

        assert_eq!(
            public_key.0,
            hex!("d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a")
        );

        let signature = secret_key.sign_detached(b"")?;
        assert_eq!(
            signature,
            hex!(
                "e5564300c360ac729086e2cc806e828a84877f1eb8e5d974d873e065224901555fb8821590a33bac"
                "c61e39701cf9b46bd25bf5f0595bbe24655141438e7a100b"
            )
        );
        assert!(public_key.verify_detached(b"", &signature)?);
        assert!(!public_key.verify_detached(b"x", &signature)?);

        Ok(())
    }

    #[test]
    fn key_material_lengths() -> Result<(), UnicurveError> {
        let mut seed = [0u8; 32];
        random::fill_random(&mut seed)?;

        let from_seed = EdwardsSecretKey::from_key_material(&seed)?;
        let from_secret = EdwardsSecretKey::from_key_material(&from_seed[..])?;

        let mut keypair = [0u8; KEYPAIR_LENGTH];
        keypair[..64].copy_from_slice(&from_seed[..]);
        keypair[64..].copy_from_slice(&from_seed.public_key()?.0);
        let from_keypair = EdwardsSecretKey::from_key_material(&keypair)?;

        assert_eq!(from_seed, from_secret);
        assert_eq!(from_seed, from_keypair);
        assert_eq!(
            EdwardsSecretKey::from_key_material(&[0u8; 48]).err(),
            Some(UnicurveError::InvalidKeyLength(64, 48))
        );

        Ok(())
    }

    #[test]
    fn signatures_detect_tampering() -> Result<(), UnicurveError> {
        let secret_key = EdwardsSecretKey::generate()?;
        let public_key = secret_key.public_key()?;
        let signature = secret_key.sign_detached(b"this is a test message")?;

        assert!(public_key.verify_detached(b"this is a test message", &signature)?);
        assert!(!public_key.verify_detached(b"this is a test message!", &signature)?);
        assert!(public_key
            .verify_detached(b"this is a test message", &signature[..63])
            .is_err());

        Ok(())
    }

    #[test]
    fn conversion_commutes_with_derivation() -> Result<(), UnicurveError> {
        for _ in 0..16 {
            let secret_key = EdwardsSecretKey::generate()?;
            assert_eq!(
                secret_key.to_montgomery()?.public_key()?,
                secret_key.public_key()?.to_montgomery()?
            );
        }

        Ok(())
    }

    #[test]
    fn public_key_parsing() -> Result<(), UnicurveError> {
        let public_key = EdwardsSecretKey::generate()?.public_key()?;
        assert_eq!(EdwardsPublicKey::from_bytes(&public_key.0)?, public_key);
        assert_eq!(
            EdwardsPublicKey::from_bytes(&public_key.0[..31]),
            Err(UnicurveError::InvalidKeyLength(32, 31))
        );
        assert_eq!(
            MontgomeryPublicKey::from_bytes(&[0u8; 33]),
            Err(UnicurveError::InvalidKeyLength(32, 33))
        );

        Ok(())
    }

    #[test]
    fn session_keys_depend_on_role() -> Result<(), UnicurveError> {
        let alice = EdwardsSecretKey::generate()?.to_montgomery()?;
        let bob = EdwardsSecretKey::generate()?.to_montgomery()?;
        let alice_pk = alice.public_key()?;
        let bob_pk = bob.public_key()?;

        let alice_client = alice.session_key(&bob_pk, Role::Client)?;
        let alice_server = alice.session_key(&bob_pk, Role::Server)?;
        let bob_client = bob.session_key(&alice_pk, Role::Client)?;
        let bob_server = bob.session_key(&alice_pk, Role::Server)?;

        assert_eq!(alice_client, bob_server);
        assert_eq!(alice_server, bob_client);
        assert_ne!(alice_client, alice_server);

        assert_eq!(alice.scalar_mult(&bob_pk)?, bob.scalar_mult(&alice_pk)?);

        Ok(())
    }

    #[test]
    fn reject_weak_key() -> Result<(), UnicurveError> {
        let secret_key = MontgomerySecretKey::try_from(&[0x42u8; 32][..])?;
        let weak = MontgomeryPublicKey(WEAK_POINT);
        let insecure = Err(UnicurveError::KeyExchangeError(
            KeyExchangeError::PublicKeyInsecure,
        ));

        assert_eq!(secret_key.scalar_mult(&weak), insecure);
        assert_eq!(secret_key.session_key(&weak, Role::Client), insecure);
        assert_eq!(secret_key.session_key(&weak, Role::Server), insecure);

        Ok(())
    }
}
