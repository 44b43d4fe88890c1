//! Signed, time-limited bearer tokens.
//!
//! A token is `base64url(claims) "." base64url(signature)` where the claims
//! are a small JSON object and the signature is Ed25519 over the raw claim
//! bytes. The server holds the only signing key, so verification needs no
//! session state.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use crate::error::TokenError;
use crate::types::UserId;

/// Claims embedded in every bearer token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenClaims {
    /// The authenticated user.
    pub sub: UserId,
    /// Issued-at, unix seconds.
    pub iat: i64,
    /// Expiry, unix seconds.
    pub exp: i64,
}

/// Issues and verifies bearer tokens with a single Ed25519 key.
#[derive(Clone)]
pub struct TokenSigner {
    signing_key: SigningKey,
    ttl: Duration,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenSigner {
    /// Restore a signer from a 32-byte secret.
    pub fn new(secret: &[u8; 32], ttl: Duration) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(secret),
            ttl,
        }
    }

    /// Signer with a fresh random key. Tokens it issues die with the process.
    pub fn generate(ttl: Duration) -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
            ttl,
        }
    }

    pub fn issue(&self, user: UserId) -> Result<String, TokenError> {
        self.issue_at(user, Utc::now())
    }

    pub fn issue_at(&self, user: UserId, issued_at: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = TokenClaims {
            sub: user,
            iat: issued_at.timestamp(),
            exp: (issued_at + self.ttl).timestamp(),
        };
        let payload = serde_json::to_vec(&claims).map_err(|_| TokenError::Encoding)?;
        let signature = self.signing_key.sign(&payload);

        Ok(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&payload),
            URL_SAFE_NO_PAD.encode(signature.to_bytes())
        ))
    }

    pub fn verify(&self, token: &str) -> Result<TokenClaims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError> {
        let (payload_b64, signature_b64) =
            token.trim().split_once('.').ok_or(TokenError::Malformed)?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| TokenError::Malformed)?;
        let signature_bytes = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| TokenError::Malformed)?;
        let signature =
            Signature::from_slice(&signature_bytes).map_err(|_| TokenError::Malformed)?;

        // signature first: never trust claims we did not sign
        self.signing_key
            .verifying_key()
            .verify(&payload, &signature)
            .map_err(|_| TokenError::BadSignature)?;

        let claims: TokenClaims =
            serde_json::from_slice(&payload).map_err(|_| TokenError::Malformed)?;

        if now.timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}
