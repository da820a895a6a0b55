//! Cryptography used by the store. Only one-way hashing lives here; the store
//! file itself is not encrypted.

pub mod passwords;
