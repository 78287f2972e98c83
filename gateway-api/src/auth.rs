//! Password hashing and access-token issuance.
//!
//! Password hashing is Argon2id (15 MB memory cost, 16 iterations, one
//! lane), with the params built fresh per call rather than held in a
//! `lazy_static` global — `Params::new` is cheap and `AppState` is where
//! shared state lives. JWTs are self-issued HS256; the gateway is its own
//! issuer rather than delegating to a third-party OIDC/JWKS flow.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const PASSWORD_HASH_SIZE: usize = 32;

fn password_algorithm() -> Argon2<'static> {
    let params = Params::new(15 * 1000, 16, 1, Some(PASSWORD_HASH_SIZE))
        .expect("fixed Argon2 params are always valid");
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
}

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    let hash = password_algorithm().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, hashed: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hashed) else {
        return false;
    };
    password_algorithm().verify_password(password.as_bytes(), &parsed).is_ok()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
}

pub fn create_access_token(user_id: Uuid, secret: &str, expire_minutes: i64) -> String {
    let exp = (Utc::now() + Duration::minutes(expire_minutes)).timestamp();
    let claims = Claims { sub: user_id.to_string(), exp };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .expect("HS256 encoding of a fixed-shape claims struct never fails")
}

pub fn decode_access_token(token: &str, secret: &str) -> Option<Claims> {
    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &Validation::default())
        .ok()
        .map(|data| data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_round_trips() {
        let hash = hash_password("correct horse battery staple").unwrap();
        assert!(verify_password("correct horse battery staple", &hash));
        assert!(!verify_password("wrong password", &hash));
    }

    #[test]
    fn token_round_trips_and_carries_subject() {
        let user_id = Uuid::new_v4();
        let token = create_access_token(user_id, "secret", 30);
        let claims = decode_access_token(&token, "secret").expect("token decodes");
        assert_eq!(claims.sub, user_id.to_string());
    }

    #[test]
    fn token_rejected_with_wrong_secret() {
        let token = create_access_token(Uuid::new_v4(), "secret-a", 30);
        assert!(decode_access_token(&token, "secret-b").is_none());
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = create_access_token(Uuid::new_v4(), "secret", -1);
        assert!(decode_access_token(&token, "secret").is_none());
    }
}
