// Key material setters for KeyConfig: hex, raw and passphrase-derived keys.

use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use rand::rngs::OsRng;
use sha1::Sha1;
use tracing::debug;
use zeroize::Zeroizing;

use super::KeyConfig;
use crate::constants::*;
use crate::error::KeyError;

fn decode_hex_exact(hexkey: &str, bytes: usize) -> Result<Zeroizing<Vec<u8>>, KeyError> {
    if hexkey.len() != bytes * 2 {
        return Err(KeyError::InvalidArgument(format!(
            "key must be exactly {} hex characters, got {}",
            bytes * 2,
            hexkey.len()
        )));
    }
    Ok(Zeroizing::new(hex::decode(hexkey)?))
}

/// PBKDF2-HMAC-SHA1 with the slot-key round count, filling all of `out`.
pub(crate) fn derive_passphrase_key(passphrase: &[u8], salt: &[u8], out: &mut [u8]) {
    pbkdf2_hmac::<Sha1>(passphrase, salt, PASSPHRASE_ROUNDS, out);
}

impl KeyConfig {
    /// 128-bit AES key from exactly 32 hex characters.
    pub fn set_aes_key_hex(&mut self, hexkey: &str) -> Result<(), KeyError> {
        let key = decode_hex_exact(hexkey, KEY_SIZE)?;
        self.set_aes_key_raw(&key)
    }

    /// First 16 bytes of `key` become the AES key.
    pub fn set_aes_key_raw(&mut self, key: &[u8]) -> Result<(), KeyError> {
        if key.len() < KEY_SIZE {
            return Err(KeyError::InvalidArgument(format!(
                "AES key needs {KEY_SIZE} bytes, got {}",
                key.len()
            )));
        }
        self.block_mut().key.copy_from_slice(&key[..KEY_SIZE]);
        Ok(())
    }

    /// 160-bit HMAC key from exactly 40 hex characters.
    pub fn set_hmac_key_hex(&mut self, hexkey: &str) -> Result<(), KeyError> {
        let key = decode_hex_exact(hexkey, KEY_SIZE_OATH)?;
        self.set_hmac_key_raw(&key)
    }

    /// 20-byte HMAC key: 16 bytes into `key`, the remaining 4 into `uid[0..4]`.
    ///
    /// `uid[4..6]` (the OATH moving factor) is left alone.
    pub fn set_hmac_key_raw(&mut self, key: &[u8]) -> Result<(), KeyError> {
        if key.len() < KEY_SIZE_OATH {
            return Err(KeyError::InvalidArgument(format!(
                "HMAC key needs {KEY_SIZE_OATH} bytes, got {}",
                key.len()
            )));
        }
        let block = self.block_mut();
        block.key.copy_from_slice(&key[..KEY_SIZE]);
        block.uid[..KEY_EXTENSION_SIZE].copy_from_slice(&key[KEY_SIZE..KEY_SIZE_OATH]);
        Ok(())
    }

    /// Derive the slot key from a passphrase with PBKDF2-HMAC-SHA1 (1024 rounds).
    ///
    /// At most 8 bytes of `salt` are used; without a salt 8 random bytes are
    /// drawn from the OS. The key length follows [`KeyConfig::supported_key_length`].
    pub fn set_key_from_passphrase(&mut self, passphrase: &[u8], salt: Option<&[u8]>) -> Result<(), KeyError> {
        let mut salt_buf = Zeroizing::new([0u8; PASSPHRASE_SALT_SIZE]);
        let salt_len = match salt {
            Some(s) if !s.is_empty() => {
                let n = s.len().min(PASSPHRASE_SALT_SIZE);
                salt_buf[..n].copy_from_slice(&s[..n]);
                n
            }
            _ => {
                OsRng.try_fill_bytes(&mut salt_buf[..]).map_err(|_| KeyError::NoRandom)?;
                PASSPHRASE_SALT_SIZE
            }
        };

        let key_bytes = self.supported_key_length();
        let mut derived = Zeroizing::new([0u8; KEY_SIZE_OATH]);
        derive_passphrase_key(passphrase, &salt_buf[..salt_len], &mut derived[..key_bytes]);
        debug!(key_bytes, salt_len, "Derived key from passphrase");

        let block = self.block_mut();
        block.key.copy_from_slice(&derived[..KEY_SIZE]);
        if key_bytes == KEY_SIZE_OATH {
            block.uid[..KEY_EXTENSION_SIZE].copy_from_slice(&derived[KEY_SIZE..KEY_SIZE_OATH]);
        }
        Ok(())
    }
}
