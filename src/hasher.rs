//! SHA-256 digests of raw frame bytes.
//!
//! Only the pixel bytes are hashed; dimensions and layout are not mixed in.

use crate::frame::FrameBuffer;
use sha2::{Digest as _, Sha256};

pub const DIGEST_LEN: usize = 32;

/// 256-bit content hash of a frame
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest([u8; DIGEST_LEN]);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HashError {
    #[error("cannot hash an empty buffer")]
    EmptyInput,
    #[error("invalid digest rendering: {0}")]
    InvalidHex(String),
}

impl Digest {
    pub fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse a 64-character hex rendering
    pub fn from_hex(text: &str) -> Result<Self, HashError> {
        let mut bytes = [0u8; DIGEST_LEN];
        hex::decode_to_slice(text.trim(), &mut bytes)
            .map_err(|err| HashError::InvalidHex(err.to_string()))?;
        Ok(Self(bytes))
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Lowercase hex, 64 characters
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Display for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::fmt::Debug for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

/// Hash the raw pixel bytes of `frame`
pub fn hash(frame: &FrameBuffer) -> Result<Digest, HashError> {
    hash_bytes(frame.bytes())
}

pub fn hash_bytes(bytes: &[u8]) -> Result<Digest, HashError> {
    if bytes.is_empty() {
        return Err(HashError::EmptyInput);
    }
    Ok(Digest(Sha256::digest(bytes).into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::PixelFormat;

    const TWELVE_BYTES_SHA256: &str =
        "fff3a9bcdd37363d703c1c4f9512533686157868f0d4f16a0f02d0f1da24f9a2";

    #[test]
    fn known_vector() {
        let bytes: Vec<u8> = (0u8..12).collect();
        let digest = hash_bytes(&bytes).unwrap();
        assert_eq!(digest.to_hex(), TWELVE_BYTES_SHA256);
        assert_eq!(digest.to_string().len(), 64);
    }

    #[test]
    fn deterministic() {
        let bytes = b"the same pixels twice";
        assert_eq!(hash_bytes(bytes).unwrap(), hash_bytes(bytes).unwrap());
    }

    #[test]
    fn layout_is_not_hashed() {
        let bytes: Vec<u8> = (0u8..12).collect();
        let bgra = FrameBuffer::new(3, 1, PixelFormat::Bgra, bytes.clone()).unwrap();
        let rgb = FrameBuffer::new(2, 2, PixelFormat::Rgb, bytes).unwrap();
        assert_eq!(hash(&bgra).unwrap(), hash(&rgb).unwrap());
    }

    #[test]
    fn distinct_frames_differ() {
        assert_ne!(hash_bytes(&[0, 1, 2]).unwrap(), hash_bytes(&[0, 1, 3]).unwrap());
    }

    #[test]
    fn empty_input_fails() {
        assert_eq!(hash_bytes(&[]), Err(HashError::EmptyInput));
        let frame = FrameBuffer::new(0, 4, PixelFormat::Bgra, Vec::new()).unwrap();
        assert_eq!(hash(&frame), Err(HashError::EmptyInput));
    }

    #[test]
    fn hex_parses_back() {
        let digest = Digest::from_hex(TWELVE_BYTES_SHA256).unwrap();
        assert_eq!(digest.as_bytes()[0], 0xff);
        assert_eq!(digest.to_hex(), TWELVE_BYTES_SHA256);
        assert!(matches!(Digest::from_hex("abcd"), Err(HashError::InvalidHex(_))));
    }
}
