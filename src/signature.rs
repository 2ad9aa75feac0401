//! Signature encodings.
//!
//! An ECDSA signature is a pair of integers (r, s), each in `[1, order)`. Two wire encodings are
//! supported:
//!
//! * [`SignatureFormat::Der`]: the ASN.1 structure `SEQUENCE { r INTEGER, s INTEGER }` from
//!   [RFC 3279](https://www.rfc-editor.org/rfc/rfc3279#section-2.2.3), as produced by OpenSSL.
//!   Each integer is length-prefixed, so the overall length varies.
//! * [`SignatureFormat::FixedWidth`]: the IEEE P1363 encoding, `r || s` with both integers
//!   big-endian and zero-padded to the same width. For a given curve this is always
//!   [`encoded_signature_size`](crate::CurveDescriptor::encoded_signature_size) bytes.
//!
//! Ed25519 signatures have a single native 64-byte encoding, and do not pass through this module.
//!
//! # Examples
//! ```rust
//! use num_bigint::BigUint;
//! use unicurve::Signature;
//!
//! let signature = Signature::new(BigUint::from(0x1234u32), BigUint::from(0x56u32));
//! let fixed = signature.to_fixed_width(4);
//! assert_eq!(fixed, [0x00, 0x00, 0x12, 0x34, 0x00, 0x00, 0x00, 0x56]);
//! assert_eq!(Signature::from_fixed_width(&fixed).unwrap(), signature);
//!
//! let der = signature.to_der().unwrap();
//! assert_eq!(Signature::from_der(&der).unwrap(), signature);
//! ```

use crate::encode::{hex_decode, hex_encode};
use crate::nonce::fit_octets;
use crate::{error_type, UnicurveError};
use der::asn1::UintRef;
use der::{Decode, Encode, Sequence};
use num_bigint::BigUint;
use num_traits::Zero;

error_type! {
    /// Error type returned if a signature could not be decoded or produced.
    SignatureError {
        /// The signature could not be parsed, or one of r and s was zero or not less than the
        /// curve order.
        MalformedSignature,

        /// Signing produced r = 0 or s = 0.
        ///
        /// This has negligible probability, and indicates a fault rather than bad input.
        DegenerateSignature,
    }
}

/// The wire encoding of a prime-field signature.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "use-serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SignatureFormat {
    /// ASN.1 DER `SEQUENCE { r INTEGER, s INTEGER }`.
    #[default]
    Der,
    /// IEEE P1363 `r || s`.
    FixedWidth,
}

/// An ECDSA signature (r, s).
///
/// A signature is not bound to a curve: the caller tracks which curve produced it, and should call
/// [`Signature::check_range`] with that curve's order after decoding untrusted input.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Signature {
    r: BigUint,
    s: BigUint,
}

#[derive(Sequence)]
struct EcdsaSigValue<'a> {
    r: UintRef<'a>,
    s: UintRef<'a>,
}

impl Signature {
    pub fn new(r: BigUint, s: BigUint) -> Self {
        Self { r, s }
    }

    pub fn r(&self) -> &BigUint {
        &self.r
    }

    pub fn s(&self) -> &BigUint {
        &self.s
    }

    /// Encode as `r || s`, each big-endian and zero-padded to the same length.
    ///
    /// The length of each half is the largest of `width`, the length of `r`, and the length of
    /// `s`, so the encoding never loses information even if `width` is too small.
    pub fn to_fixed_width(&self, width: usize) -> Vec<u8> {
        let r = self.r.to_bytes_be();
        let s = self.s.to_bytes_be();
        let half = width.max(r.len()).max(s.len());

        let mut out = fit_octets(&r, half);
        out.extend_from_slice(&fit_octets(&s, half));
        out
    }

    /// Decode `r || s`, splitting `bytes` at its midpoint.
    pub fn from_fixed_width(bytes: &[u8]) -> Result<Self, UnicurveError> {
        if bytes.len() % 2 != 0 {
            return Err(UnicurveError::OddLengthSignature);
        }

        let (r, s) = bytes.split_at(bytes.len() / 2);
        Ok(Self::new(
            BigUint::from_bytes_be(r),
            BigUint::from_bytes_be(s),
        ))
    }

    /// Hex-encode [`Signature::to_fixed_width`].
    pub fn to_hex(&self, width: usize) -> Result<String, UnicurveError> {
        hex_encode(&self.to_fixed_width(width))
    }

    /// Parse the output of [`Signature::to_hex`].
    ///
    /// Text that is not valid hex fails with [`SignatureError::MalformedSignature`].
    pub fn from_hex(hex: &str) -> Result<Self, UnicurveError> {
        let bytes = hex_decode(hex).map_err(|_| SignatureError::MalformedSignature)?;
        Self::from_fixed_width(&bytes)
    }

    /// Encode as an ASN.1 DER `SEQUENCE { r INTEGER, s INTEGER }`.
    pub fn to_der(&self) -> Result<Vec<u8>, UnicurveError> {
        let r = self.r.to_bytes_be();
        let s = self.s.to_bytes_be();

        EcdsaSigValue {
            r: UintRef::new(&r).map_err(|_| SignatureError::MalformedSignature)?,
            s: UintRef::new(&s).map_err(|_| SignatureError::MalformedSignature)?,
        }
        .to_der()
        .map_err(|_| SignatureError::MalformedSignature.into())
    }

    /// Decode an ASN.1 DER `SEQUENCE { r INTEGER, s INTEGER }`.
    ///
    /// Trailing data, negative integers, and non-minimal encodings are rejected.
    pub fn from_der(bytes: &[u8]) -> Result<Self, UnicurveError> {
        let value =
            EcdsaSigValue::from_der(bytes).map_err(|_| SignatureError::MalformedSignature)?;

        Ok(Self::new(
            BigUint::from_bytes_be(value.r.as_bytes()),
            BigUint::from_bytes_be(value.s.as_bytes()),
        ))
    }

    /// Encode in `format`, using `width` bytes per integer for [`SignatureFormat::FixedWidth`].
    pub fn encode(&self, format: SignatureFormat, width: usize) -> Result<Vec<u8>, UnicurveError> {
        match format {
            SignatureFormat::Der => self.to_der(),
            SignatureFormat::FixedWidth => Ok(self.to_fixed_width(width)),
        }
    }

    /// Decode from `format`.
    pub fn decode(bytes: &[u8], format: SignatureFormat) -> Result<Self, UnicurveError> {
        match format {
            SignatureFormat::Der => Self::from_der(bytes),
            SignatureFormat::FixedWidth => Self::from_fixed_width(bytes),
        }
    }

    /// Check that `0 < r < order` and `0 < s < order`.
    pub fn check_range(&self, order: &BigUint) -> Result<(), UnicurveError> {
        let in_range = |n: &BigUint| !n.is_zero() && n < order;

        if in_range(&self.r) && in_range(&self.s) {
            Ok(())
        } else {
            Err(SignatureError::MalformedSignature.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Signature, SignatureError, SignatureFormat};
    use crate::{CurveId, UnicurveError};
    use hex_literal::hex;
    use num_bigint::BigUint;
    use proptest::prelude::*;

    fn sig(r: u32, s: u32) -> Signature {
        Signature::new(BigUint::from(r), BigUint::from(s))
    }

    #[test]
    fn fixed_width_pads_to_widest() {
        assert_eq!(sig(1, 2).to_fixed_width(2), [0, 1, 0, 2]);
        assert_eq!(sig(0x0102_03, 4).to_fixed_width(2), [1, 2, 3, 0, 0, 4]);
        assert_eq!(sig(5, 0x0607).to_fixed_width(0), [0, 5, 6, 7]);
    }

    #[test]
    fn fixed_width_rejects_odd_length() {
        assert_eq!(
            Signature::from_fixed_width(&[1, 2, 3]),
            Err(UnicurveError::OddLengthSignature)
        );
    }

    #[test]
    fn hex_text_form() -> Result<(), UnicurveError> {
        let signature = sig(0x1234, 0xab);
        assert_eq!(signature.to_hex(3)?, "0012340000ab");
        assert_eq!(Signature::from_hex("0012340000ab")?, signature);
        assert_eq!(Signature::from_hex("0012340000AB")?, signature);

        assert_eq!(
            Signature::from_hex("001234zz00ab"),
            Err(UnicurveError::SignatureError(
                SignatureError::MalformedSignature
            ))
        );
        assert_eq!(
            Signature::from_hex("01234500ab"),
            Err(UnicurveError::OddLengthSignature)
        );

        Ok(())
    }

    #[test]
    fn der_known_encodings() -> Result<(), UnicurveError> {
        assert_eq!(sig(1, 2).to_der()?, hex!("3006020101020102"));
        // The high bit of 0x80 would make it negative without a leading zero.
        assert_eq!(sig(0x80, 0x7f).to_der()?, hex!("30070202008002017f"));
        assert_eq!(Signature::from_der(&hex!("30070202008002017f"))?, sig(0x80, 0x7f));
        Ok(())
    }

    #[test]
    fn der_rejects_garbage() {
        let malformed = Err(UnicurveError::SignatureError(
            SignatureError::MalformedSignature,
        ));

        assert_eq!(Signature::from_der(&[]), malformed);
        assert_eq!(Signature::from_der(&hex!("3006020101020102ff")), malformed);
        assert_eq!(Signature::from_der(&hex!("30060201ff020102")), malformed);
        assert_eq!(Signature::from_der(&hex!("3003020101")), malformed);
    }

    #[test]
    fn range_check() {
        let order = CurveId::P256.descriptor().order();
        let malformed = Err(UnicurveError::SignatureError(
            SignatureError::MalformedSignature,
        ));

        assert_eq!(sig(1, 1).check_range(order), Ok(()));
        assert_eq!(sig(0, 1).check_range(order), malformed);
        assert_eq!(sig(1, 0).check_range(order), malformed);
        assert_eq!(
            Signature::new(order.clone(), BigUint::from(1u32)).check_range(order),
            malformed
        );
        assert_eq!(
            Signature::new(BigUint::from(1u32), order - 1u32).check_range(order),
            Ok(())
        );
    }

    #[test]
    fn format_dispatch() -> Result<(), UnicurveError> {
        let signature = sig(0xdead, 0xbeef);
        for format in [SignatureFormat::Der, SignatureFormat::FixedWidth] {
            let encoded = signature.encode(format, 32)?;
            assert_eq!(Signature::decode(&encoded, format)?, signature);
        }
        assert_eq!(signature.encode(SignatureFormat::FixedWidth, 32)?.len(), 64);
        assert_eq!(SignatureFormat::default(), SignatureFormat::Der);
        Ok(())
    }

    proptest! {
        #[test]
        fn fixed_width_round_trips(
            r in proptest::collection::vec(any::<u8>(), 1..67),
            s in proptest::collection::vec(any::<u8>(), 1..67),
            width in 0usize..70,
        ) {
            let signature = Signature::new(BigUint::from_bytes_be(&r), BigUint::from_bytes_be(&s));
            let encoded = signature.to_fixed_width(width);
            prop_assert_eq!(encoded.len() % 2, 0);
            prop_assert!(encoded.len() >= 2 * width);
            prop_assert_eq!(Signature::from_fixed_width(&encoded).unwrap(), signature);
        }

        #[test]
        fn der_round_trips(
            r in proptest::collection::vec(any::<u8>(), 1..67),
            s in proptest::collection::vec(any::<u8>(), 1..67),
        ) {
            let signature = Signature::new(BigUint::from_bytes_be(&r), BigUint::from_bytes_be(&s));
            prop_assert_eq!(Signature::from_der(&signature.to_der().unwrap()).unwrap(), signature);
        }
    }
}
