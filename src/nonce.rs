//! Hedged deterministic nonce generation for ECDSA.
//!
//! An ECDSA signature is only as secure as its per-signature nonce `k`: reusing `k` for two
//! messages, or leaking a few bits of it across many signatures, reveals the private key. This
//! module derives `k` with the HMAC-DRBG of [RFC 6979](https://www.rfc-editor.org/rfc/rfc6979),
//! seeded with the private scalar and the message digest *plus* 32 bytes of fresh randomness.
//!
//! The deterministic inputs mean a broken or backdoored RNG cannot cause nonce reuse across
//! different messages. The random input means an attacker who can induce faults cannot get two
//! signatures computed with the same `k` by replaying a message. This combination is usually called
//! *hedged* signing.
//!
//! # Algorithm Details
//! For a group of order `q` with bit length `qlen`, `rlen = ceil(qlen / 8)`, and an HMAC over the
//! curve's designated hash with output length `hlen`:
//!
//! ```text
//! bx = int2octets(x, rlen) || int2octets(h, rlen) || hedge
//! V  = 0x01 * hlen
//! K  = 0x00 * hlen
//! K  = HMAC(K, V || 0x00 || bx);  V = HMAC(K, V)
//! K  = HMAC(K, V || 0x01 || bx);  V = HMAC(K, V)
//! repeat at most 1024 times:
//!     T = empty
//!     while len(T) < rlen: V = HMAC(K, V); T = T || V
//!     k = bits2int(T[..rlen], qlen)
//!     if 0 < k < q: return int2octets(k, rlen)
//!     K = HMAC(K, V || 0x00);  V = HMAC(K, V)
//! ```
//!
//! The nonce is returned as its fixed-length big-endian encoding, and candidates are shifted and
//! range-checked as `rlen`-byte strings, so no step depends on the length of `k`.
//!
//! With an empty `hedge` this is exactly RFC 6979, section 3.2, which
//! [`generate_with_entropy`] exposes for known-answer testing.
//!
//! # Security Considerations
//! The DRBG state, every candidate and the returned nonce are all held in [`Zeroizing`] buffers. The
//! only shared resource is the process random source, which is thread-safe.
//!
//! Exhausting all 1024 attempts has negligible probability for any group in the
//! [registry](crate::curve) and indicates a broken environment, not bad input.

use crate::{random, unexpected_err, HashAlgorithm, UnicurveError};
use hmac::digest::core_api::BlockSizeUser;
use hmac::digest::KeyInit;
use hmac::{Mac, SimpleHmac};
use num_bigint::BigUint;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};
use std::marker::PhantomData;
use tracing::{error, trace};
use zeroize::Zeroizing;

/// The maximum number of candidates drawn before giving up.
pub const MAX_ATTEMPTS: usize = 1024;

/// The number of fresh random bytes mixed into the seed of every [`generate`] call.
pub const HEDGE_LENGTH: usize = 32;

/// Generate a nonce `k` with `0 < k < max_exclusive`, encoded big-endian in `rlen` bytes (the
/// byte length of `max_exclusive`).
///
/// `private_scalar` is the big-endian encoding of the signer's private scalar, `digest` the
/// message digest already converted with [`bits2int`], and `hash` the hash driving the HMAC.
/// [`HEDGE_LENGTH`] bytes are drawn from the process random source on every call, so two calls
/// with identical arguments return different nonces with overwhelming probability.
pub fn generate(
    max_exclusive: &BigUint,
    private_scalar: &[u8],
    digest: &BigUint,
    hash: HashAlgorithm,
) -> Result<Zeroizing<Vec<u8>>, UnicurveError> {
    let mut hedge = Zeroizing::new([0u8; HEDGE_LENGTH]);
    random::fill_random(&mut hedge[..])?;

    generate_with_entropy(max_exclusive, private_scalar, digest, hash, &hedge[..])
}

/// Generate a nonce as in [`generate`], using `entropy` as the hedging input.
///
/// The output is a deterministic function of the arguments. Signing code should use [`generate`];
/// this exists so the derivation can be checked against known answers.
pub fn generate_with_entropy(
    max_exclusive: &BigUint,
    private_scalar: &[u8],
    digest: &BigUint,
    hash: HashAlgorithm,
    entropy: &[u8],
) -> Result<Zeroizing<Vec<u8>>, UnicurveError> {
    let qlen = max_exclusive.bits();
    let rlen = ((qlen + 7) >> 3) as usize;

    let mut seed = Zeroizing::new(Vec::with_capacity(2 * rlen + entropy.len()));
    seed.extend_from_slice(&Zeroizing::new(fit_octets(private_scalar, rlen)));
    seed.extend_from_slice(&int2octets(digest, rlen));
    seed.extend_from_slice(entropy);

    match hash {
        HashAlgorithm::Sha224 => sample::<Sha224>(max_exclusive, &seed, qlen, rlen),
        HashAlgorithm::Sha256 => sample::<Sha256>(max_exclusive, &seed, qlen, rlen),
        HashAlgorithm::Sha384 => sample::<Sha384>(max_exclusive, &seed, qlen, rlen),
        HashAlgorithm::Sha512 => sample::<Sha512>(max_exclusive, &seed, qlen, rlen),
    }
}

/// Big-endian encode `n` into exactly `length` bytes.
///
/// Shorter encodings are padded with leading zeroes. Longer encodings are left-truncated: the most
/// significant bytes are dropped and the low-order `length` bytes kept, which is `n mod 2^(8·length)`.
/// Every caller in this crate passes a value that already fits.
pub fn int2octets(n: &BigUint, length: usize) -> Vec<u8> {
    fit_octets(&n.to_bytes_be(), length)
}

/// Interpret `bytes` as a big-endian integer, keeping only its leftmost `qlen` bits.
///
/// If `bytes` is longer than `qlen` bits, the integer is shifted right by the excess.
pub fn bits2int(bytes: &[u8], qlen: u64) -> BigUint {
    let value = BigUint::from_bytes_be(bytes);
    let blen = bytes.len() as u64 * 8;

    if blen > qlen {
        value >> (blen - qlen)
    } else {
        value
    }
}

/// Left-pad or left-truncate a big-endian byte string to exactly `length` bytes.
pub(crate) fn fit_octets(bytes: &[u8], length: usize) -> Vec<u8> {
    if bytes.len() >= length {
        bytes[bytes.len() - length..].to_vec()
    } else {
        let mut out = vec![0u8; length - bytes.len()];
        out.extend_from_slice(bytes);
        out
    }
}

/// `bits2int` on an `rlen`-byte string, in place: shift right by `shift < 8` bits, keeping the
/// length.
fn shift_right(bytes: &mut [u8], shift: u32) {
    if shift == 0 {
        return;
    }

    for i in (0..bytes.len()).rev() {
        let high = if i == 0 { 0 } else { bytes[i - 1] };
        bytes[i] = ((u16::from(high) << 8 | u16::from(bytes[i])) >> shift) as u8;
    }
}

fn is_zero(bytes: &[u8]) -> bool {
    bytes.iter().fold(0u8, |acc, b| acc | b) == 0
}

/// Whether big-endian `a < b`, for equal-length strings, without branching on the contents.
fn less_than(a: &[u8], b: &[u8]) -> bool {
    let mut borrow = 0u16;
    for (x, y) in a.iter().rev().zip(b.iter().rev()) {
        borrow = (u16::from(*x).wrapping_sub(u16::from(*y)).wrapping_sub(borrow) >> 8) & 1;
    }

    borrow == 1
}

fn sample<D>(
    max_exclusive: &BigUint,
    seed: &[u8],
    qlen: u64,
    rlen: usize,
) -> Result<Zeroizing<Vec<u8>>, UnicurveError>
where
    D: Digest + BlockSizeUser + Clone,
{
    let bound = int2octets(max_exclusive, rlen);
    let shift = (8 * rlen as u64 - qlen) as u32;
    let mut drbg = HmacDrbg::<D>::new(seed);

    for attempt in 0..MAX_ATTEMPTS {
        let mut candidate = drbg.generate(rlen);
        shift_right(&mut candidate, shift);

        if !is_zero(&candidate) && less_than(&candidate, &bound) {
            return Ok(candidate);
        }

        trace!(attempt, "nonce candidate out of range, reseeding");
        drbg.reseed();
    }

    error!(attempts = MAX_ATTEMPTS, qlen, "nonce generation exhausted");
    Err(UnicurveError::NonceGenerationExhausted)
}

/// The running (K, V) state of one nonce derivation.
struct HmacDrbg<D> {
    k: Zeroizing<Vec<u8>>,
    v: Zeroizing<Vec<u8>>,
    digest: PhantomData<D>,
}

impl<D> HmacDrbg<D>
where
    D: Digest + BlockSizeUser + Clone,
{
    fn new(seed: &[u8]) -> Self {
        let hlen = <D as Digest>::output_size();
        let mut drbg = Self {
            k: Zeroizing::new(vec![0x00; hlen]),
            v: Zeroizing::new(vec![0x01; hlen]),
            digest: PhantomData,
        };

        drbg.update(0x00, seed);
        drbg.update(0x01, seed);
        drbg
    }

    /// `K = HMAC(K, V || marker || data); V = HMAC(K, V)`
    fn update(&mut self, marker: u8, data: &[u8]) {
        let k = self.hmac(&[self.v.as_slice(), &[marker], data]);
        self.k = k;
        self.v = self.hmac(&[self.v.as_slice()]);
    }

    fn reseed(&mut self) {
        self.update(0x00, &[]);
    }

    /// Produce `length` bytes of output, starting from an empty buffer.
    fn generate(&mut self, length: usize) -> Zeroizing<Vec<u8>> {
        let mut t = Zeroizing::new(Vec::with_capacity(length + self.v.len()));

        while t.len() < length {
            self.v = self.hmac(&[self.v.as_slice()]);
            t.extend_from_slice(&self.v);
        }

        t.truncate(length);
        t
    }

    fn hmac(&self, parts: &[&[u8]]) -> Zeroizing<Vec<u8>> {
        // HMAC accepts keys of any length, so this cannot fail.
        let mut mac = <SimpleHmac<D> as KeyInit>::new_from_slice(&self.k)
            .unwrap_or_else(|_| unexpected_err!("SimpleHmac::new_from_slice"));

        for part in parts {
            mac.update(part);
        }

        Zeroizing::new(mac.finalize().into_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::{
        bits2int, generate, generate_with_entropy, int2octets, less_than, shift_right,
        HEDGE_LENGTH,
    };
    use crate::{CurveId, HashAlgorithm, UnicurveError};
    use hex_literal::hex;
    use num_bigint::BigUint;
    use proptest::prelude::*;

    #[test]
    fn unhedged_matches_rfc6979_p256_sha256() -> Result<(), UnicurveError> {
        // RFC 6979, appendix A.2.5, message "sample".
        let descriptor = CurveId::P256.descriptor();
        let x = hex!("c9afa9d845ba75166b5c215767b1d6934e50c3db36e89b127b8a622b120f6721");
        let h = bits2int(
            &HashAlgorithm::Sha256.digest(b"sample"),
            descriptor.order_bits(),
        );

        let k = generate_with_entropy(descriptor.order(), &x, &h, HashAlgorithm::Sha256, &[])?;

        assert_eq!(
            k.as_slice(),
            hex!("a6e3c57dd01abe90086538398355dd4c3b17aa873382b0f24d6129493d8aad60")
        );

        Ok(())
    }

    #[test]
    fn same_entropy_same_nonce() -> Result<(), UnicurveError> {
        let descriptor = CurveId::K256.descriptor();
        let x = [0x42u8; 32];
        let h = BigUint::from_bytes_be(&HashAlgorithm::Sha256.digest(b"message"));
        let entropy = [0x17u8; HEDGE_LENGTH];

        let a = generate_with_entropy(descriptor.order(), &x, &h, descriptor.hash(), &entropy)?;
        let b = generate_with_entropy(descriptor.order(), &x, &h, descriptor.hash(), &entropy)?;
        let c = generate_with_entropy(descriptor.order(), &x, &h, descriptor.hash(), &[0x18; 32])?;

        assert_eq!(a, b);
        assert_ne!(a, c);

        Ok(())
    }

    #[test]
    fn hedging_is_active() -> Result<(), UnicurveError> {
        for curve in [CurveId::P256, CurveId::P384, CurveId::P521, CurveId::K256] {
            let descriptor = curve.descriptor();
            let x = vec![0x5au8; descriptor.order_length()];
            let h = bits2int(
                &descriptor.hash().digest(b"hedge me"),
                descriptor.order_bits(),
            );

            let a = generate(descriptor.order(), &x, &h, descriptor.hash())?;
            let b = generate(descriptor.order(), &x, &h, descriptor.hash())?;
            assert_ne!(a, b);
        }

        Ok(())
    }

    #[test]
    fn nonces_are_in_range() -> Result<(), UnicurveError> {
        for curve in [CurveId::P256, CurveId::P384, CurveId::P521, CurveId::K256] {
            let descriptor = curve.descriptor();
            let zero = BigUint::from(0u32);

            for i in 0u8..32 {
                let x = vec![i; descriptor.order_length()];
                let h = BigUint::from(i);
                let k = generate(descriptor.order(), &x, &h, descriptor.hash())?;
                assert_eq!(k.len(), descriptor.order_length());

                let k = BigUint::from_bytes_be(&k);
                assert!(k > zero && &k < descriptor.order());
            }
        }

        Ok(())
    }

    #[test]
    fn rejection_sampling_with_small_order() -> Result<(), UnicurveError> {
        // With a 9-bit bound just above 256, roughly half of all candidates are rejected.
        let max = BigUint::from(257u32);
        for i in 0u8..64 {
            let k = generate(&max, &[i], &BigUint::from(i), HashAlgorithm::Sha256)?;
            assert_eq!(k.len(), 2);

            let k = BigUint::from_bytes_be(&k);
            assert!(k > BigUint::from(0u32) && k < max);
        }

        Ok(())
    }

    #[test]
    fn exhaustion_is_reported() {
        // No integer lies strictly between 0 and 1.
        let max = BigUint::from(1u32);
        assert_eq!(
            generate(&max, &[1], &BigUint::from(1u32), HashAlgorithm::Sha256),
            Err(UnicurveError::NonceGenerationExhausted)
        );
    }

    #[test]
    fn int2octets_pads_and_truncates() {
        let n = BigUint::from(0x0102_0304u32);
        assert_eq!(int2octets(&n, 6), [0, 0, 1, 2, 3, 4]);
        assert_eq!(int2octets(&n, 4), [1, 2, 3, 4]);
        assert_eq!(int2octets(&n, 2), [3, 4]);
        assert_eq!(int2octets(&BigUint::from(0u32), 3), [0, 0, 0]);
    }

    #[test]
    fn bits2int_keeps_leftmost_bits() {
        assert_eq!(bits2int(&[0xff, 0x00], 16), BigUint::from(0xff00u32));
        assert_eq!(bits2int(&[0xff, 0x00], 12), BigUint::from(0xff0u32));
        assert_eq!(bits2int(&[0x80], 1), BigUint::from(1u32));
        assert_eq!(bits2int(&[0xab], 521), BigUint::from(0xabu32));
    }

    #[test]
    fn fixed_length_helpers() {
        let mut bytes = [0x01, 0xff, 0x80];
        shift_right(&mut bytes, 7);
        assert_eq!(bytes, [0x00, 0x03, 0xff]);

        assert!(less_than(&[0x00, 0xff], &[0x01, 0x00]));
        assert!(!less_than(&[0x01, 0x00], &[0x01, 0x00]));
        assert!(!less_than(&[0x01, 0x01], &[0x01, 0x00]));
    }

    proptest! {
        #[test]
        fn shift_right_matches_bits2int(bytes in proptest::collection::vec(any::<u8>(), 1..67), shift in 0u32..8) {
            let qlen = 8 * bytes.len() as u64 - u64::from(shift);
            let mut shifted = bytes.clone();
            shift_right(&mut shifted, shift);
            prop_assert_eq!(shifted.len(), bytes.len());
            prop_assert_eq!(BigUint::from_bytes_be(&shifted), bits2int(&bytes, qlen));
        }

        #[test]
        fn less_than_matches_integers(a in proptest::collection::vec(any::<u8>(), 0..40), b in proptest::collection::vec(any::<u8>(), 0..40)) {
            let length = a.len().max(b.len());
            let (a, b) = (int2octets(&BigUint::from_bytes_be(&a), length), int2octets(&BigUint::from_bytes_be(&b), length));
            prop_assert_eq!(less_than(&a, &b), BigUint::from_bytes_be(&a) < BigUint::from_bytes_be(&b));
        }

        #[test]
        fn bits2int_fits_in_qlen(bytes in proptest::collection::vec(any::<u8>(), 0..80), qlen in 1u64..600) {
            prop_assert!(bits2int(&bytes, qlen).bits() <= qlen);
        }

        #[test]
        fn int2octets_inverts_for_fitting_values(bytes in proptest::collection::vec(any::<u8>(), 0..66), extra in 0usize..8) {
            let n = BigUint::from_bytes_be(&bytes);
            let length = bytes.len() + extra;
            let encoded = int2octets(&n, length);
            prop_assert_eq!(encoded.len(), length);
            prop_assert_eq!(BigUint::from_bytes_be(&encoded), n);
        }
    }
}
