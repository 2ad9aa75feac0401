//! Hexadecimal text encoding of key material.
//!
//! Public keys are often exchanged as text (configuration files, web forms), and the compressed
//! point encoding is conventionally written in hex. These functions wrap Sodium's constant-time
//! [hex codec](https://doc.libsodium.org/helpers#hexadecimal-encoding-decoding), so the same code
//! path can be used for secret material without leaking it through timing.

use crate::keys::KeyError;
use crate::{require_init, UnicurveError};
use libsodium_sys as sodium;
use std::ptr;

/// Encode the contents of `buf` as a lowercase hex string.
///
/// This encoding runs in constant-time for a given length of `buf`.
pub fn hex_encode(buf: &[u8]) -> Result<String, UnicurveError> {
    require_init()?;

    let hex_len = buf.len() * 2;
    let mut out = vec![0u8; hex_len + 1];

    unsafe {
        // SAFETY: The first argument to this function is the destination pointer to which the
        // C-formatted string will be written. Each byte of input corresponds to two hex
        // characters, plus a null byte at the end of the string, so `out` is sufficient to store
        // the hex string. The second argument specifies the maximum number of bytes which can be
        // written to this pointer, for which we use `out.len()`. The next two arguments specify
        // the buffer to encode, and its length, for which we use `buf.len()`.
        sodium::sodium_bin2hex(
            out.as_mut_ptr() as *mut libc::c_char,
            out.len(),
            buf.as_ptr(),
            buf.len(),
        );
    }

    out.truncate(hex_len);
    String::from_utf8(out).map_err(|_| KeyError::EncodingFailed.into())
}

/// Decode the hex string `hex` to raw bytes.
///
/// Returns [`KeyError::DecodingFailed`] if `hex` has an odd length or contains characters other
/// than `[0-9a-fA-F]`.
///
/// This decoding runs in constant-time for a given length of hex string.
pub fn hex_decode(hex: &str) -> Result<Vec<u8>, UnicurveError> {
    require_init()?;

    if hex.len() % 2 != 0 {
        return Err(KeyError::DecodingFailed.into());
    }

    let mut output = vec![0u8; hex.len() / 2];
    let mut written = 0;

    let decode_result = unsafe {
        // SAFETY: The first argument to this function is the destination to which the decoded
        // bytes will be written, and the second is the maximum number of bytes which can be
        // written to it, for which we use `output.len()`. The next two arguments specify the hex
        // string to decode and its length. As the length is given explicitly, the string does not
        // need to be null-terminated. The next argument is a string of characters to ignore,
        // which Sodium documents may be NULL. The next argument is where the decoded length is
        // written, and the final argument may be NULL, in which case Sodium requires the whole
        // input to be parsed.
        sodium::sodium_hex2bin(
            output.as_mut_ptr(),
            output.len(),
            hex.as_ptr() as *const libc::c_char,
            hex.len(),
            ptr::null(),
            &mut written,
            ptr::null_mut::<*const libc::c_char>(),
        )
    };

    if decode_result != 0 || written != output.len() {
        return Err(KeyError::DecodingFailed.into());
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::{hex_decode, hex_encode};
    use crate::{keys::KeyError, UnicurveError};

    #[test]
    fn encoding() -> Result<(), UnicurveError> {
        assert_eq!(&hex_encode(b"")?, "");
        assert_eq!(&hex_encode(b"f")?, "66");
        assert_eq!(&hex_encode(b"foobar")?, "666f6f626172");
        assert_eq!(&hex_encode(&[0x02, 0xff, 0x00])?, "02ff00");

        Ok(())
    }

    #[test]
    fn decoding() -> Result<(), UnicurveError> {
        assert_eq!(hex_decode("")?, b"");
        assert_eq!(hex_decode("666f6f626172")?, b"foobar");
        assert_eq!(hex_decode("02FFab")?, [0x02, 0xff, 0xab]);

        assert_eq!(
            hex_decode("666"),
            Err(UnicurveError::KeyError(KeyError::DecodingFailed))
        );
        assert!(hex_decode("66:6f").is_err());
        assert!(hex_decode("zz").is_err());

        Ok(())
    }
}
