//! Machine-derived encryption-at-rest for the credential file.
//!
//! Each value is sealed with a random data key (DEK). The DEK itself is
//! wrapped by a key-encryption key derived from machine identity plus a
//! per-file salt, so a copied file does not decrypt on another host.

use aes_gcm_siv::aead::{Aead, KeyInit};
use aes_gcm_siv::{Aes256GcmSiv, Nonce};
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use rand::RngCore;
use scrypt::{scrypt, Params as ScryptParams};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::error::StoreError;

pub(crate) const STORE_FILE_VERSION: u32 = 1;
pub(crate) const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
pub(crate) const KEY_LEN: usize = 32;
const MACHINE_KEY_CONTEXT: &str = "kwsession-store-machine-kek-v1";

/// On-disk shape of the credential file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct EncryptedStoreFile {
    #[serde(default)]
    pub(crate) version: u32,
    #[serde(default)]
    pub(crate) encryption: KeyEnvelope,
    #[serde(default)]
    pub(crate) entries: BTreeMap<String, SealedValue>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct KeyEnvelope {
    #[serde(default)]
    pub(crate) salt: String,
    #[serde(default)]
    pub(crate) wrapped_dek_nonce: String,
    #[serde(default)]
    pub(crate) wrapped_dek_ciphertext: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct SealedValue {
    #[serde(default)]
    pub(crate) nonce: String,
    #[serde(default)]
    pub(crate) ciphertext: String,
}

/// Key-encryption key bound to one salt.
///
/// Deriving it is deliberately expensive, so the file backend caches it.
#[derive(Clone)]
pub(crate) struct MachineKey {
    pub(crate) salt: [u8; SALT_LEN],
    key: [u8; KEY_LEN],
}

impl std::fmt::Debug for MachineKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MachineKey").finish_non_exhaustive()
    }
}

impl MachineKey {
    /// Derive a key for a freshly generated salt.
    pub(crate) fn generate(params: &ScryptParams) -> Result<Self, StoreError> {
        let mut salt = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);
        Self::derive(salt, params)
    }

    pub(crate) fn derive(salt: [u8; SALT_LEN], params: &ScryptParams) -> Result<Self, StoreError> {
        let mut material = machine_secret_material();
        material.extend_from_slice(&salt);

        let mut hashed = Sha256::new();
        hashed.update(MACHINE_KEY_CONTEXT.as_bytes());
        hashed.update(&material);
        let seed = hashed.finalize();

        let mut key = [0u8; KEY_LEN];
        scrypt(&seed, &salt, params, &mut key)
            .map_err(|err| StoreError::Invalid(format!("failed to derive machine key: {err}")))?;
        Ok(Self { salt, key })
    }
}

/// Read the salt recorded in an encrypted file.
pub(crate) fn file_salt(file: &EncryptedStoreFile) -> Result<[u8; SALT_LEN], StoreError> {
    decode_fixed::<SALT_LEN>(&file.encryption.salt, "salt")
}

pub(crate) fn seal_entries(
    kek: &MachineKey,
    entries: &BTreeMap<String, String>,
) -> Result<EncryptedStoreFile, StoreError> {
    let mut dek = [0u8; KEY_LEN];
    rand::thread_rng().fill_bytes(&mut dek);
    let (wrapped_dek_nonce, wrapped_dek_ciphertext) = encrypt_blob(&kek.key, &dek)?;

    let mut sealed = BTreeMap::new();
    for (key, value) in entries {
        let (nonce, ciphertext) = encrypt_blob(&dek, value.as_bytes())?;
        sealed.insert(
            key.clone(),
            SealedValue {
                nonce: B64.encode(nonce),
                ciphertext: B64.encode(ciphertext),
            },
        );
    }

    Ok(EncryptedStoreFile {
        version: STORE_FILE_VERSION,
        encryption: KeyEnvelope {
            salt: B64.encode(kek.salt),
            wrapped_dek_nonce: B64.encode(wrapped_dek_nonce),
            wrapped_dek_ciphertext: B64.encode(wrapped_dek_ciphertext),
        },
        entries: sealed,
    })
}

pub(crate) fn open_entries(
    kek: &MachineKey,
    file: &EncryptedStoreFile,
) -> Result<BTreeMap<String, String>, StoreError> {
    let wrapped_nonce =
        decode_fixed::<NONCE_LEN>(&file.encryption.wrapped_dek_nonce, "wrapped_dek_nonce")?;
    let wrapped_dek = decode_bytes(
        &file.encryption.wrapped_dek_ciphertext,
        "wrapped_dek_ciphertext",
    )?;
    let dek_raw = decrypt_blob(&kek.key, &wrapped_nonce, &wrapped_dek).map_err(|_| {
        StoreError::Invalid(
            "failed to decrypt credential store (machine identity may have changed)".to_string(),
        )
    })?;
    if dek_raw.len() != KEY_LEN {
        return Err(StoreError::Invalid(
            "invalid data key material in credential store".to_string(),
        ));
    }
    let mut dek = [0u8; KEY_LEN];
    dek.copy_from_slice(&dek_raw);

    let mut entries = BTreeMap::new();
    for (key, sealed) in &file.entries {
        let nonce = decode_fixed::<NONCE_LEN>(&sealed.nonce, "nonce")?;
        let ciphertext = decode_bytes(&sealed.ciphertext, "ciphertext")?;
        let plain = decrypt_blob(&dek, &nonce, &ciphertext)
            .map_err(|_| StoreError::Invalid(format!("failed to decrypt entry `{key}`")))?;
        let text = String::from_utf8(plain)
            .map_err(|_| StoreError::Invalid(format!("entry `{key}` is not valid UTF-8")))?;
        entries.insert(key.clone(), text);
    }
    Ok(entries)
}

fn machine_secret_material() -> Vec<u8> {
    let hostname = hostname::get()
        .map(|value| value.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown-host".to_string());
    let username = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown-user".to_string());
    let home = dirs::home_dir()
        .map(|path| path.display().to_string())
        .unwrap_or_default();
    let machine_id = read_machine_id().unwrap_or_default();
    format!(
        "os={}|host={}|user={}|home={}|machine_id={}",
        std::env::consts::OS,
        hostname,
        username,
        home,
        machine_id
    )
    .into_bytes()
}

fn read_machine_id() -> Option<String> {
    for path in ["/etc/machine-id", "/var/lib/dbus/machine-id", "/etc/hostid"] {
        if let Ok(value) = std::fs::read_to_string(path) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}

fn encrypt_blob(key: &[u8; KEY_LEN], plaintext: &[u8]) -> Result<(Vec<u8>, Vec<u8>), StoreError> {
    let cipher = Aes256GcmSiv::new_from_slice(key)
        .map_err(|_| StoreError::Invalid("invalid encryption key length".to_string()))?;
    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|_| StoreError::Invalid("failed to encrypt credential data".to_string()))?;
    Ok((nonce.to_vec(), ciphertext))
}

fn decrypt_blob(
    key: &[u8; KEY_LEN],
    nonce: &[u8; NONCE_LEN],
    ciphertext: &[u8],
) -> Result<Vec<u8>, StoreError> {
    let cipher = Aes256GcmSiv::new_from_slice(key)
        .map_err(|_| StoreError::Invalid("invalid encryption key length".to_string()))?;
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| StoreError::Invalid("failed to decrypt credential data".to_string()))
}

fn decode_bytes(value: &str, field: &str) -> Result<Vec<u8>, StoreError> {
    B64.decode(value)
        .map_err(|err| StoreError::Invalid(format!("failed to decode store field `{field}`: {err}")))
}

fn decode_fixed<const N: usize>(value: &str, field: &str) -> Result<[u8; N], StoreError> {
    let bytes = decode_bytes(value, field)?;
    if bytes.len() != N {
        return Err(StoreError::Invalid(format!(
            "invalid store field `{field}` length: expected {N}, got {}",
            bytes.len()
        )));
    }
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes);
    Ok(out)
}
