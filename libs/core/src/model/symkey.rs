use aead::generic_array::GenericArray;
use aead::{Aead, NewAead};
use aes_gcm::Aes256Gcm;
use hmac::Hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::Sha256;

use crate::model::crypto::{AESEncrypted, AESKey};
use crate::model::errors::{CoreError, LbResult};

pub type HmacSha256 = Hmac<Sha256>;

pub fn generate_key() -> AESKey {
    let mut random_bytes = [0u8; 32];
    OsRng.fill_bytes(&mut random_bytes);
    random_bytes
}

pub fn encrypt<T: Serialize + DeserializeOwned>(
    key: &AESKey, to_encrypt: &T,
) -> LbResult<AESEncrypted<T>> {
    let serialized =
        bincode::serialize(to_encrypt).map_err(|err| CoreError::Serialization(err.to_string()))?;
    let nonce = &generate_nonce();
    let encrypted = convert_key(key)
        .encrypt(GenericArray::from_slice(nonce), aead::Payload { msg: &serialized, aad: &[] })
        .map_err(CoreError::Encryption)?;
    Ok(AESEncrypted::new(encrypted, nonce.to_vec()))
}

pub fn decrypt<T: DeserializeOwned>(key: &AESKey, to_decrypt: &AESEncrypted<T>) -> LbResult<T> {
    let nonce = GenericArray::from_slice(&to_decrypt.nonce);
    let decrypted = convert_key(key)
        .decrypt(nonce, aead::Payload { msg: &to_decrypt.value, aad: &[] })
        .map_err(CoreError::Decryption)?;
    let deserialized =
        bincode::deserialize(&decrypted).map_err(|err| CoreError::Serialization(err.to_string()))?;
    Ok(deserialized)
}

pub fn convert_key(to_convert: &AESKey) -> Aes256Gcm {
    Aes256Gcm::new(&GenericArray::clone_from_slice(to_convert))
}

pub fn generate_nonce() -> [u8; 12] {
    let mut result = [0u8; 12];
    OsRng.fill_bytes(&mut result);
    result
}
