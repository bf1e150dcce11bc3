use libsecp256k1::{Message, PublicKey, SecretKey, SharedSecret, Signature};
use rand::rngs::OsRng;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::model::clock::Timestamp;
use crate::model::crypto::{AESKey, ECSigned, Timestamped};
use crate::model::errors::{CoreError, LbResult};

pub fn generate_key() -> SecretKey {
    SecretKey::random(&mut OsRng)
}

pub fn sign<T: Serialize>(
    private_key: &SecretKey, to_sign: T, time_getter: fn() -> Timestamp,
) -> LbResult<ECSigned<T>> {
    let timestamped = timestamp(to_sign, time_getter);
    let serialized = bincode::serialize(&timestamped)
        .map_err(|err| CoreError::Serialization(err.to_string()))?;
    let digest = Sha256::digest(&serialized);
    let message = Message::parse_slice(&digest).map_err(CoreError::ParseError)?;
    let (signature, _) = libsecp256k1::sign(&message, private_key);
    Ok(ECSigned {
        timestamped_value: timestamped,
        signature: signature.serialize().to_vec(),
        public_key: PublicKey::from_secret_key(private_key),
    })
}

pub fn verify<T: Serialize>(
    public_key: &PublicKey, signed: &ECSigned<T>, max_delay_ms: u64, max_skew_ms: u64,
    time_getter: fn() -> Timestamp,
) -> LbResult<()> {
    if public_key != &signed.public_key {
        return Err(CoreError::SignatureInvalid.into());
    }

    let serialized = bincode::serialize(&signed.timestamped_value)
        .map_err(|err| CoreError::Serialization(err.to_string()))?;
    let digest = Sha256::digest(&serialized);
    let message = Message::parse_slice(&digest).map_err(CoreError::ParseError)?;
    let signature =
        Signature::parse_standard_slice(&signed.signature).map_err(CoreError::ParseError)?;
    if !libsecp256k1::verify(&message, &signature, public_key) {
        return Err(CoreError::SignatureInvalid.into());
    }

    let auth_time = signed.timestamped_value.timestamp;
    let current_time = time_getter().0;
    let max_delay_ms = max_delay_ms as i64;
    let max_skew_ms = max_skew_ms as i64;
    if auth_time < current_time - max_delay_ms {
        return Err(CoreError::SignatureExpired((current_time - max_delay_ms) as u64).into());
    }
    if auth_time > current_time + max_skew_ms {
        return Err(CoreError::SignatureInTheFuture(
            (auth_time - (current_time + max_skew_ms)) as u64,
        )
        .into());
    }

    Ok(())
}

pub fn get_aes_key(private_key: &SecretKey, public_key: &PublicKey) -> LbResult<AESKey> {
    let shared_secret =
        SharedSecret::<Sha256>::new(public_key, private_key).map_err(CoreError::SharedSecret)?;
    let key: AESKey = shared_secret
        .as_ref()
        .try_into()
        .map_err(|_| CoreError::SharedSecretUnexpectedSize)?;
    Ok(key)
}

fn timestamp<T>(value: T, time_getter: fn() -> Timestamp) -> Timestamped<T> {
    Timestamped { value, timestamp: time_getter().0 }
}

#[cfg(test)]
mod unit_tests {
    use libsecp256k1::PublicKey;

    use crate::model::clock::get_time;
    use crate::model::pubkey::{generate_key, get_aes_key, sign, verify};

    #[test]
    fn test_sign_verify() {
        let key = generate_key();
        let value = String::from("to be signed");
        let signed = sign(&key, value, get_time).unwrap();
        verify(&PublicKey::from_secret_key(&key), &signed, 3000, 3000, get_time).unwrap();
    }

    #[test]
    fn test_sign_verify_wrong_public_key() {
        let key = generate_key();
        let other_key = generate_key();
        let signed = sign(&key, String::from("to be signed"), get_time).unwrap();
        let result = verify(&PublicKey::from_secret_key(&other_key), &signed, 3000, 3000, get_time);
        assert!(result.is_err());
    }

    #[test]
    fn test_ecdh_agreement() {
        let alice = generate_key();
        let bob = generate_key();
        let alice_shared = get_aes_key(&alice, &PublicKey::from_secret_key(&bob)).unwrap();
        let bob_shared = get_aes_key(&bob, &PublicKey::from_secret_key(&alice)).unwrap();
        assert_eq!(alice_shared, bob_shared);
    }
}
