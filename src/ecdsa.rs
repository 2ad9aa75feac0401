//! ECDSA on the prime-field curves, with hedged nonces.
//!
//! # Algorithm Details
//! Signing a message `m` with private scalar `d` on a curve with generator `G` and order `n`:
//!
//! 1. `e = bits2int(H(m))`, where `H` is the curve's designated hash, and `z = e mod n`.
//! 2. `k` is drawn from the hedged nonce generator (see [`nonce`](crate::nonce)), seeded with `d`,
//!    `z`, and fresh randomness.
//! 3. `r = x(k·G) mod n`, and `s = k⁻¹(z + r·d) mod n`.
//!
//! Verification computes `w = s⁻¹`, `X = (z·w)·G + (r·w)·Q`, and accepts if `x(X) mod n = r`.
//!
//! Signing uses the constant-time scalar and point arithmetic of the RustCrypto curve crates, since
//! `k` and `d` are secret. Verification only handles public values.
//!
//! # Security Considerations
//! Signatures here are malleable: if `(r, s)` is valid then so is `(r, n - s)`. Don't use a
//! signature as a unique identifier for a message.

use crate::curve::CurveDescriptor;
use crate::keys::prime::{PointKey, ScalarKey};
use crate::nonce::{self, bits2int, fit_octets};
use crate::signature::{Signature, SignatureError};
use crate::UnicurveError;
use elliptic_curve::ff::{Field, PrimeField};
use elliptic_curve::group::{Curve as _, Group};
use elliptic_curve::ops::Reduce;
use elliptic_curve::point::AffineCoordinates;
use elliptic_curve::{CurveArithmetic, FieldBytes, NonZeroScalar, PublicKey, Scalar, SecretKey};
use num_bigint::BigUint;
use tracing::debug;
use zeroize::Zeroizing;

/// Sign `message` with a prime-field private key.
pub fn sign(key: &ScalarKey, message: &[u8]) -> Result<Signature, UnicurveError> {
    sign_hedged(key, message, None)
}

/// Verify a signature over `message` with a prime-field public key.
///
/// Returns `Ok(false)` if the signature does not match. Fails with
/// [`SignatureError::MalformedSignature`] if r or s is outside `[1, order)`.
pub fn verify(key: &PointKey, message: &[u8], signature: &Signature) -> Result<bool, UnicurveError> {
    let descriptor = key.curve().descriptor();
    debug!(curve = descriptor.name(), "verifying ECDSA signature");

    match key {
        PointKey::P256(pk) => verify_with(pk, descriptor, message, signature),
        PointKey::P384(pk) => verify_with(pk, descriptor, message, signature),
        PointKey::P521(pk) => verify_with(pk, descriptor, message, signature),
        PointKey::K256(pk) => verify_with(pk, descriptor, message, signature),
    }
}

/// Sign with the given hedging entropy, or fresh randomness if `entropy` is `None`.
pub(crate) fn sign_hedged(
    key: &ScalarKey,
    message: &[u8],
    entropy: Option<&[u8]>,
) -> Result<Signature, UnicurveError> {
    let descriptor = key.curve().descriptor();
    debug!(curve = descriptor.name(), "producing ECDSA signature");

    match key {
        ScalarKey::P256(sk) => sign_with(sk, descriptor, message, entropy),
        ScalarKey::P384(sk) => sign_with(sk, descriptor, message, entropy),
        ScalarKey::P521(sk) => sign_with(sk, descriptor, message, entropy),
        ScalarKey::K256(sk) => sign_with(sk, descriptor, message, entropy),
    }
}

/// `bits2int(H(m)) mod n`.
fn message_representative(descriptor: &CurveDescriptor, message: &[u8]) -> BigUint {
    let e = bits2int(&descriptor.hash().digest(message), descriptor.order_bits());
    e % descriptor.order()
}

fn to_field_bytes<C: CurveArithmetic>(n: &BigUint) -> FieldBytes<C> {
    let mut bytes = FieldBytes::<C>::default();
    let length = bytes.len();
    bytes.copy_from_slice(&fit_octets(&n.to_bytes_be(), length));
    bytes
}

fn to_scalar<C: CurveArithmetic>(n: &BigUint) -> Option<Scalar<C>> {
    Option::from(Scalar::<C>::from_repr(to_field_bytes::<C>(n)))
}

fn to_biguint<C: CurveArithmetic>(scalar: &Scalar<C>) -> BigUint {
    BigUint::from_bytes_be(&scalar.to_repr())
}

/// `x(point) mod n`, or `None` for the identity.
fn reduced_x<C: CurveArithmetic>(point: &C::ProjectivePoint) -> Option<Scalar<C>> {
    if bool::from(point.is_identity()) {
        return None;
    }

    let x = point.to_affine().x();
    Some(<Scalar<C> as Reduce<C::Uint>>::reduce_bytes(&x))
}

fn sign_with<C: CurveArithmetic>(
    secret_key: &SecretKey<C>,
    descriptor: &CurveDescriptor,
    message: &[u8],
    entropy: Option<&[u8]>,
) -> Result<Signature, UnicurveError> {
    let z_int = message_representative(descriptor, message);
    let d_bytes = Zeroizing::new(secret_key.to_bytes().to_vec());

    let k_bytes = match entropy {
        Some(entropy) => nonce::generate_with_entropy(
            descriptor.order(),
            &d_bytes,
            &z_int,
            descriptor.hash(),
            entropy,
        )?,
        None => nonce::generate(descriptor.order(), &d_bytes, &z_int, descriptor.hash())?,
    };

    let k = NonZeroScalar::<C>::try_from(k_bytes.as_slice())
        .map_err(|_| SignatureError::DegenerateSignature)?;
    let d = *secret_key.to_nonzero_scalar();
    let z = to_scalar::<C>(&z_int).ok_or(SignatureError::DegenerateSignature)?;

    let big_r = C::ProjectivePoint::generator() * *k;
    let r = reduced_x::<C>(&big_r).ok_or(SignatureError::DegenerateSignature)?;

    let k_inv: Scalar<C> =
        Option::from(Field::invert(&*k)).ok_or(SignatureError::DegenerateSignature)?;
    let s = k_inv * (z + r * d);

    if bool::from(r.is_zero()) || bool::from(s.is_zero()) {
        return Err(SignatureError::DegenerateSignature.into());
    }

    Ok(Signature::new(to_biguint::<C>(&r), to_biguint::<C>(&s)))
}

fn verify_with<C: CurveArithmetic>(
    public_key: &PublicKey<C>,
    descriptor: &CurveDescriptor,
    message: &[u8],
    signature: &Signature,
) -> Result<bool, UnicurveError> {
    signature.check_range(descriptor.order())?;

    let r = to_scalar::<C>(signature.r()).ok_or(SignatureError::MalformedSignature)?;
    let s = to_scalar::<C>(signature.s()).ok_or(SignatureError::MalformedSignature)?;
    let z = to_scalar::<C>(&message_representative(descriptor, message))
        .ok_or(SignatureError::MalformedSignature)?;

    let w: Scalar<C> = Option::from(Field::invert(&s)).ok_or(SignatureError::MalformedSignature)?;
    let u1 = z * w;
    let u2 = r * w;

    let x = C::ProjectivePoint::generator() * u1 + public_key.to_projective() * u2;

    Ok(reduced_x::<C>(&x).map_or(false, |x| x == r))
}

#[cfg(test)]
mod tests {
    use super::{sign, sign_hedged, verify};
    use crate::keys::prime::ScalarKey;
    use crate::signature::SignatureError;
    use crate::{CurveId, Signature, UnicurveError};
    use hex_literal::hex;
    use num_bigint::BigUint;

    const PRIME_CURVES: [CurveId; 4] = [CurveId::P256, CurveId::P384, CurveId::P521, CurveId::K256];

    #[test]
    fn unhedged_matches_rfc6979_p256_sha256() -> Result<(), UnicurveError> {
        // RFC 6979, appendix A.2.5, message "sample".
        let key = ScalarKey::from_bytes(
            &hex!("c9afa9d845ba75166b5c215767b1d6934e50c3db36e89b127b8a622b120f6721"),
            CurveId::P256,
        )?;

        let signature = sign_hedged(&key, b"sample", Some(&[]))?;

        assert_eq!(
            signature.r(),
            &BigUint::from_bytes_be(&hex!(
                "efd48b2aacb6a8fd1140dd9cd45e81d69d2c877b56aaf991c34d0ea84eaf3716"
            ))
        );
        assert_eq!(
            signature.s(),
            &BigUint::from_bytes_be(&hex!(
                "f7cb1c942d657c41d436c7a1b6e29f65f3e900dbb9aff4064dc4ab2f843acda8"
            ))
        );
        assert!(verify(&key.public_key(), b"sample", &signature)?);

        Ok(())
    }

    #[test]
    fn sign_verify_all_curves() -> Result<(), UnicurveError> {
        for curve in PRIME_CURVES {
            let key = ScalarKey::generate(curve)?;
            let public_key = key.public_key();
            let signature = sign(&key, b"this is a test message")?;

            signature.check_range(curve.descriptor().order())?;

            let hex = signature.to_hex(curve.descriptor().signature_half_width())?;
            assert_eq!(hex.len(), 2 * curve.descriptor().encoded_signature_size());
            assert_eq!(Signature::from_hex(&hex)?, signature);
            assert!(verify(&public_key, b"this is a test message", &signature)?);
            assert!(!verify(&public_key, b"this is a test messagf", &signature)?);

            let other = ScalarKey::generate(curve)?.public_key();
            assert!(!verify(&other, b"this is a test message", &signature)?);
        }

        Ok(())
    }

    #[test]
    fn hedging_varies_signatures() -> Result<(), UnicurveError> {
        let key = ScalarKey::generate(CurveId::K256)?;
        let a = sign(&key, b"message")?;
        let b = sign(&key, b"message")?;
        assert_ne!(a, b);

        let c = sign_hedged(&key, b"message", Some(&[7u8; 32]))?;
        let d = sign_hedged(&key, b"message", Some(&[7u8; 32]))?;
        assert_eq!(c, d);

        Ok(())
    }

    #[test]
    fn out_of_range_signature_is_an_error() -> Result<(), UnicurveError> {
        let key = ScalarKey::generate(CurveId::P384)?;
        let order = CurveId::P384.descriptor().order().clone();
        let signature = Signature::new(order, BigUint::from(1u32));

        assert_eq!(
            verify(&key.public_key(), b"message", &signature),
            Err(UnicurveError::SignatureError(
                SignatureError::MalformedSignature
            ))
        );

        Ok(())
    }

    #[test]
    fn tampered_signature_does_not_verify() -> Result<(), UnicurveError> {
        let key = ScalarKey::generate(CurveId::P521)?;
        let signature = sign(&key, b"message")?;
        let tampered = Signature::new(signature.r().clone(), signature.s() - 1u32);

        assert!(!verify(&key.public_key(), b"message", &tampered)?);

        Ok(())
    }
}
