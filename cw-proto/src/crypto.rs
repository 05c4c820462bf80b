//! AES-256-CBC content encryption in OpenSSL salted format.
//!
//! Message text and file payloads are protected with a shared passphrase.
//! Key and IV are derived with OpenSSL's EVP_BytesToKey (MD5) and a random
//! 8-byte salt, so any OpenSSL-compatible peer can decrypt.
//!
//! Layout of encrypted data (before Base64 for the text path):
//! ```text
//! "Salted__" (8 bytes) + salt (8 bytes) + ciphertext
//! ```
//!
//! Two paths exist: a text path (`encrypt`/`decrypt`, Base64 strings, used
//! for `message` content) and a byte path (`encrypt_bytes`/`decrypt_bytes`,
//! raw buffers, used for file payloads which are Base64-encoded separately
//! by the sender).

use aes::Aes256;
use base64::Engine;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use cbc::{Decryptor, Encryptor};
use md5::{Digest, Md5};

use cw_core::error::{ChatError, ChatResult};

type Aes256CbcEnc = Encryptor<Aes256>;
type Aes256CbcDec = Decryptor<Aes256>;

const SALT_PREFIX: &[u8; 8] = b"Salted__";

/// AES-256-CBC encryption/decryption with OpenSSL-style key derivation.
pub struct AesCipher;

impl AesCipher {
    /// Encrypt plaintext, returning a Base64 string in the salted format.
    pub fn encrypt(password: &str, plaintext: &str) -> ChatResult<String> {
        let raw = Self::encrypt_bytes(password, plaintext.as_bytes())?;
        Ok(base64::engine::general_purpose::STANDARD.encode(raw))
    }

    /// Decrypt a Base64 ciphertext produced by [`AesCipher::encrypt`].
    pub fn decrypt(password: &str, base64_ciphertext: &str) -> ChatResult<String> {
        let raw = base64::engine::general_purpose::STANDARD
            .decode(base64_ciphertext)
            .map_err(|e| ChatError::Crypto(format!("base64 decode failed: {e}")))?;

        let decrypted = Self::decrypt_bytes(password, &raw)?;
        String::from_utf8(decrypted)
            .map_err(|e| ChatError::Crypto(format!("utf8 decode failed: {e}")))
    }

    /// Encrypt a raw byte buffer (file payload path).
    ///
    /// Returns `"Salted__" + salt + ciphertext`.
    pub fn encrypt_bytes(password: &str, data: &[u8]) -> ChatResult<Vec<u8>> {
        use rand::RngCore;

        let mut salt = [0u8; 8];
        rand::thread_rng().fill_bytes(&mut salt);

        let (key, iv) = Self::evp_bytes_to_key(password.as_bytes(), &salt);

        let encryptor = Aes256CbcEnc::new_from_slices(&key, &iv)
            .map_err(|e| ChatError::Crypto(format!("cipher init failed: {e}")))?;

        // Space for PKCS7 padding (up to one extra block)
        let mut buf = vec![0u8; data.len() + 16];
        buf[..data.len()].copy_from_slice(data);

        let encrypted = encryptor
            .encrypt_padded_mut::<Pkcs7>(&mut buf, data.len())
            .map_err(|e| ChatError::Crypto(format!("encryption failed: {e}")))?;

        let mut output = Vec::with_capacity(16 + encrypted.len());
        output.extend_from_slice(SALT_PREFIX);
        output.extend_from_slice(&salt);
        output.extend_from_slice(encrypted);
        Ok(output)
    }

    /// Decrypt a raw salted buffer produced by [`AesCipher::encrypt_bytes`].
    pub fn decrypt_bytes(password: &str, data: &[u8]) -> ChatResult<Vec<u8>> {
        if data.len() < 16 {
            return Err(ChatError::Crypto("ciphertext too short".into()));
        }
        if &data[..8] != SALT_PREFIX {
            return Err(ChatError::Crypto("missing Salted__ prefix".into()));
        }

        let salt = &data[8..16];
        let ciphertext = &data[16..];

        let (key, iv) = Self::evp_bytes_to_key(password.as_bytes(), salt);

        let mut buf = ciphertext.to_vec();
        let decryptor = Aes256CbcDec::new_from_slices(&key, &iv)
            .map_err(|e| ChatError::Crypto(format!("cipher init failed: {e}")))?;

        let decrypted = decryptor
            .decrypt_padded_mut::<Pkcs7>(&mut buf)
            .map_err(|e| ChatError::Crypto(format!("decryption failed: {e}")))?;

        Ok(decrypted.to_vec())
    }

    /// OpenSSL EVP_BytesToKey implementation using MD5.
    ///
    /// Derives a 32-byte key and 16-byte IV from password and salt.
    fn evp_bytes_to_key(password: &[u8], salt: &[u8]) -> ([u8; 32], [u8; 16]) {
        let mut key = [0u8; 32];
        let mut iv = [0u8; 16];

        // 48 bytes total (32 key + 16 IV), 16 per MD5 round
        let mut derived = Vec::with_capacity(48);

        let mut prev_hash = Vec::new();
        while derived.len() < 48 {
            let mut hasher = Md5::new();
            if !prev_hash.is_empty() {
                hasher.update(&prev_hash);
            }
            hasher.update(password);
            hasher.update(salt);
            prev_hash = hasher.finalize().to_vec();
            derived.extend_from_slice(&prev_hash);
        }

        key.copy_from_slice(&derived[..32]);
        iv.copy_from_slice(&derived[32..48]);

        (key, iv)
    }
}
