//! Random codes and tokens.
//!
//! Invite codes are short and human-typable; parent connect tokens are long
//! and only ever travel inside a magic link. Only the SHA-256 digest of a
//! connect token is persisted.

use rand_core::{OsRng, RngCore as _};
use sha2::{Digest as _, Sha256};

/// Alphabet without lookalike characters (no I/L/O/0/1).
const INVITE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

/// A 6-character world invite code, e.g. `K7QM2X`.
pub fn invite_code() -> String {
  let mut bytes = [0u8; 6];
  OsRng.fill_bytes(&mut bytes);
  bytes
    .iter()
    .map(|b| INVITE_ALPHABET[*b as usize % INVITE_ALPHABET.len()] as char)
    .collect()
}

/// A 256-bit parent connect token, hex encoded.
pub fn connect_token() -> String {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  hex::encode(bytes)
}

/// Hex SHA-256 digest of a token, as stored in the database.
pub fn digest(token: &str) -> String {
  hex::encode(Sha256::digest(token.as_bytes()))
}
