//! The curve registry.
//!
//! Every operation in unicurve is parameterised by a [`CurveId`]. The registry maps each identifier
//! to a [`CurveDescriptor`]: the order of the curve's prime-order group, the hash designated for
//! the curve, and the sizes of its encoded public keys and fixed-width signatures. The table is
//! built once per process and is read-only afterwards, so it can be shared between threads freely.
//!
//! | Curve          | Name       | Hash    | Public key | Signature |
//! |----------------|------------|---------|------------|-----------|
//! | P-256          | `"P256"`   | SHA-256 | 33         | 64        |
//! | P-384          | `"P384"`   | SHA-384 | 49         | 96        |
//! | P-521          | `"P521"`   | SHA-512 | 67         | 132       |
//! | secp256k1      | `"K256"`   | SHA-256 | 33         | 64        |
//! | Edwards25519   | `"sodium"` | SHA-512 | 32         | 64        |
//!
//! Prime-field public keys are encoded as compressed SEC1 points. Edwards25519 public keys are the
//! raw 32-byte Ed25519 encoding.
//!
//! # Examples
//! ```rust
//! use unicurve::{CurveId, HashAlgorithm};
//!
//! let curve: CurveId = "P384".parse().unwrap();
//! let descriptor = curve.descriptor();
//! assert_eq!(descriptor.hash(), HashAlgorithm::Sha384);
//! assert_eq!(descriptor.encoded_public_key_size(), 49);
//! assert!("P192".parse::<CurveId>().is_err());
//! ```

use crate::{HashAlgorithm, UnicurveError};
use hex_literal::hex;
use lazy_static::lazy_static;
use num_bigint::BigUint;
use std::fmt;
use std::str::FromStr;

/// Identifies one of the supported curves.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "use-serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CurveId {
    P256,
    P384,
    P521,
    K256,
    /// Curve25519, in Edwards form for signing and Montgomery form for key exchange.
    #[default]
    Edwards25519,
}

/// The implementation family a curve belongs to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum CurveFamily {
    /// Short Weierstrass curves over a prime field, using ECDSA and hashed ECDH.
    PrimeField,
    /// Curve25519, using Ed25519 and the X25519 key exchange.
    Curve25519,
}

impl CurveId {
    /// Every supported curve.
    pub const ALL: [CurveId; 5] = [
        CurveId::P256,
        CurveId::P384,
        CurveId::P521,
        CurveId::K256,
        CurveId::Edwards25519,
    ];

    /// Look up the registry entry for this curve.
    pub fn descriptor(self) -> &'static CurveDescriptor {
        let index = match self {
            Self::P256 => 0,
            Self::P384 => 1,
            Self::P521 => 2,
            Self::K256 => 3,
            Self::Edwards25519 => 4,
        };
        &REGISTRY[index]
    }

    /// The canonical name of this curve, as accepted by [`FromStr`].
    pub const fn name(self) -> &'static str {
        match self {
            Self::P256 => "P256",
            Self::P384 => "P384",
            Self::P521 => "P521",
            Self::K256 => "K256",
            Self::Edwards25519 => "sodium",
        }
    }

    pub const fn family(self) -> CurveFamily {
        match self {
            Self::Edwards25519 => CurveFamily::Curve25519,
            _ => CurveFamily::PrimeField,
        }
    }
}

impl fmt::Display for CurveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CurveId {
    type Err = UnicurveError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "sodium" | "ed25519" | "Ed25519" => Ok(Self::Edwards25519),
            "P256" | "P-256" | "secp256r1" => Ok(Self::P256),
            "P384" | "P-384" | "secp384r1" => Ok(Self::P384),
            "P521" | "P-521" | "secp521r1" => Ok(Self::P521),
            "K256" | "secp256k1" => Ok(Self::K256),
            _ => Err(UnicurveError::UnsupportedCurve),
        }
    }
}

/// Static parameters of a curve.
#[derive(Debug)]
pub struct CurveDescriptor {
    id: CurveId,
    order: BigUint,
    hash: HashAlgorithm,
    encoded_public_key_size: usize,
    encoded_signature_size: usize,
}

impl CurveDescriptor {
    fn new(
        id: CurveId,
        order: &[u8],
        hash: HashAlgorithm,
        encoded_public_key_size: usize,
        encoded_signature_size: usize,
    ) -> Self {
        Self {
            id,
            order: BigUint::from_bytes_be(order),
            hash,
            encoded_public_key_size,
            encoded_signature_size,
        }
    }

    pub fn id(&self) -> CurveId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.id.name()
    }

    /// The order of the curve's prime-order subgroup.
    ///
    /// Private scalars, nonces, and the (r, s) components of signatures all lie in `[1, order)`.
    pub fn order(&self) -> &BigUint {
        &self.order
    }

    /// The bit length of the group order, `qlen` in RFC 6979 terms.
    pub fn order_bits(&self) -> u64 {
        self.order.bits()
    }

    /// The number of bytes needed to hold an integer modulo the group order.
    pub fn order_length(&self) -> usize {
        ((self.order_bits() + 7) >> 3) as usize
    }

    /// The hash designated for signing with, and deriving shared secrets on, this curve.
    pub fn hash(&self) -> HashAlgorithm {
        self.hash
    }

    /// The length of an encoded public key on this curve, in bytes.
    pub fn encoded_public_key_size(&self) -> usize {
        self.encoded_public_key_size
    }

    /// The length of a fixed-width signature on this curve, in bytes.
    pub fn encoded_signature_size(&self) -> usize {
        self.encoded_signature_size
    }

    /// The width of each of r and s in a fixed-width signature on this curve, in bytes.
    pub fn signature_half_width(&self) -> usize {
        self.encoded_signature_size / 2
    }

    pub fn family(&self) -> CurveFamily {
        self.id.family()
    }
}

lazy_static! {
    static ref REGISTRY: [CurveDescriptor; 5] = [
        CurveDescriptor::new(
            CurveId::P256,
            &hex!("ffffffff00000000ffffffffffffffffbce6faada7179e84f3b9cac2fc632551"),
            HashAlgorithm::Sha256,
            33,
            64,
        ),
        CurveDescriptor::new(
            CurveId::P384,
            &hex!(
                "ffffffffffffffffffffffffffffffffffffffffffffffffc7634d81f4372ddf"
                "581a0db248b0a77aecec196accc52973"
            ),
            HashAlgorithm::Sha384,
            49,
            96,
        ),
        CurveDescriptor::new(
            CurveId::P521,
            &hex!(
                "01ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff"
                "fffa51868783bf2f966b7fcc0148f709a5d03bb5c9b8899c47aebb6fb71e9138"
                "6409"
            ),
            HashAlgorithm::Sha512,
            67,
            132,
        ),
        CurveDescriptor::new(
            CurveId::K256,
            &hex!("fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141"),
            HashAlgorithm::Sha256,
            33,
            64,
        ),
        CurveDescriptor::new(
            CurveId::Edwards25519,
            &hex!("1000000000000000000000000000000014def9dea2f79cd65812631a5cf5d3ed"),
            HashAlgorithm::Sha512,
            32,
            64,
        ),
    ];
}

#[cfg(test)]
mod tests {
    use super::{CurveFamily, CurveId};
    use crate::{HashAlgorithm, UnicurveError};
    use elliptic_curve::ff::PrimeField;
    use num_bigint::BigUint;

    fn order_from_scalar_field<F: PrimeField>() -> BigUint {
        // The field is Z/nZ, so n - 1 = -1.
        BigUint::from_bytes_be((-F::ONE).to_repr().as_ref()) + 1u32
    }

    #[test]
    fn orders_match_curve_arithmetic() {
        assert_eq!(
            CurveId::P256.descriptor().order(),
            &order_from_scalar_field::<p256::Scalar>()
        );
        assert_eq!(
            CurveId::P384.descriptor().order(),
            &order_from_scalar_field::<p384::Scalar>()
        );
        assert_eq!(
            CurveId::P521.descriptor().order(),
            &order_from_scalar_field::<p521::Scalar>()
        );
        assert_eq!(
            CurveId::K256.descriptor().order(),
            &order_from_scalar_field::<k256::Scalar>()
        );
    }

    #[test]
    fn order_lengths() {
        assert_eq!(CurveId::P256.descriptor().order_length(), 32);
        assert_eq!(CurveId::P384.descriptor().order_length(), 48);
        assert_eq!(CurveId::P521.descriptor().order_bits(), 521);
        assert_eq!(CurveId::P521.descriptor().order_length(), 66);
        assert_eq!(CurveId::K256.descriptor().order_length(), 32);
        assert_eq!(CurveId::Edwards25519.descriptor().order_bits(), 253);
    }

    #[test]
    fn descriptors_are_indexed_by_id() {
        for curve in CurveId::ALL {
            let descriptor = curve.descriptor();
            assert_eq!(descriptor.id(), curve);
            assert_eq!(
                descriptor.signature_half_width() * 2,
                descriptor.encoded_signature_size()
            );
        }

        assert_eq!(CurveId::P521.descriptor().hash(), HashAlgorithm::Sha512);
        assert_eq!(CurveId::K256.descriptor().signature_half_width(), 32);
        assert_eq!(CurveId::P521.descriptor().signature_half_width(), 66);
    }

    #[test]
    fn names() -> Result<(), UnicurveError> {
        for curve in CurveId::ALL {
            assert_eq!(curve.to_string().parse::<CurveId>()?, curve);
        }

        assert_eq!(CurveId::default(), CurveId::Edwards25519);
        assert_eq!("secp256k1".parse::<CurveId>()?, CurveId::K256);
        assert_eq!("P-256".parse::<CurveId>()?, CurveId::P256);
        assert_eq!(
            "brainpoolP256r1".parse::<CurveId>(),
            Err(UnicurveError::UnsupportedCurve)
        );

        assert_eq!(CurveId::Edwards25519.family(), CurveFamily::Curve25519);
        assert_eq!(CurveId::K256.family(), CurveFamily::PrimeField);

        Ok(())
    }
}
