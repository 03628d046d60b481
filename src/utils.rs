use ripemd::Ripemd160;
use rustc_hex::{FromHex, FromHexError};
use sha2::{Digest, Sha256};

pub fn sha256<S: AsRef<[u8]>>(bytes: &[S]) -> [u8; 32] {
    //! Compute SHA-256 hash.
    //!
    //! Builds a hash iteratively by updating with every element
    //! of the input sequence.
    let mut hasher = Sha256::new();
    bytes.iter().for_each(|b| hasher.update(b));
    hasher.finalize().into()
}

pub fn ripemd160<S: AsRef<[u8]>>(bytes: S) -> [u8; 20] {
    //! Compute RIPEMD-160 hash.
    let mut hasher = Ripemd160::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

pub(crate) fn decode_hex(hex: &str) -> Result<Vec<u8>, FromHexError> {
    let hex = hex.trim();
    hex.strip_prefix("0x").unwrap_or(hex).from_hex()
}
