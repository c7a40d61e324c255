use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use thiserror::Error;

use easel_types::api::Claims;
use easel_types::models::Identity;

/// Why a handshake token was turned away. Every variant terminates the
/// handshake; none of them leaves a partially-registered connection.
#[derive(Debug, Error)]
pub enum AuthRejected {
    #[error("token rejected: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),
    #[error("token missing required claim: {0}")]
    MissingClaim(&'static str),
}

/// Verify a bearer token and produce the Identity it carries.
///
/// Signature and expiry (when the claim is present) are checked by
/// jsonwebtoken; on top of that both `user_id` and `sub` (email) must
/// be present. The display-name claim is optional.
pub fn verify(token: &str, secret: &str) -> Result<Identity, AuthRejected> {
    let mut validation = Validation::new(Algorithm::HS256);
    // exp is validated when present but tokens without it are accepted
    validation.required_spec_claims.clear();

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;

    let user_id = data
        .claims
        .user_id
        .ok_or(AuthRejected::MissingClaim("user_id"))?;
    let email = data.claims.sub.ok_or(AuthRejected::MissingClaim("sub"))?;

    Ok(Identity {
        user_id,
        email,
        full_name: data.claims.full_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};

    const SECRET: &str = "test-secret";

    fn token(claims: &Claims) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn future_exp() -> usize {
        (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as usize
    }

    #[test]
    fn valid_token_yields_full_identity() {
        let t = token(&Claims {
            sub: Some("alice@x.com".into()),
            user_id: Some(7),
            full_name: Some("Alice".into()),
            exp: Some(future_exp()),
        });
        let identity = verify(&t, SECRET).unwrap();
        assert_eq!(identity.user_id, 7);
        assert_eq!(identity.email, "alice@x.com");
        assert_eq!(identity.full_name.as_deref(), Some("Alice"));
    }

    #[test]
    fn name_claim_is_optional() {
        let t = token(&Claims {
            sub: Some("bob@x.com".into()),
            user_id: Some(2),
            full_name: None,
            exp: Some(future_exp()),
        });
        let identity = verify(&t, SECRET).unwrap();
        assert!(identity.full_name.is_none());
    }

    #[test]
    fn token_without_expiry_is_accepted() {
        let t = token(&Claims {
            sub: Some("bob@x.com".into()),
            user_id: Some(2),
            full_name: None,
            exp: None,
        });
        assert!(verify(&t, SECRET).is_ok());
    }

    #[test]
    fn expired_token_is_rejected() {
        let t = token(&Claims {
            sub: Some("bob@x.com".into()),
            user_id: Some(2),
            full_name: None,
            exp: Some(
                (chrono::Utc::now() - chrono::Duration::hours(1)).timestamp() as usize,
            ),
        });
        assert!(matches!(verify(&t, SECRET), Err(AuthRejected::Invalid(_))));
    }

    #[test]
    fn missing_user_id_is_rejected() {
        let t = token(&Claims {
            sub: Some("bob@x.com".into()),
            user_id: None,
            full_name: None,
            exp: Some(future_exp()),
        });
        assert!(matches!(
            verify(&t, SECRET),
            Err(AuthRejected::MissingClaim("user_id"))
        ));
    }

    #[test]
    fn missing_email_is_rejected() {
        let t = token(&Claims {
            sub: None,
            user_id: Some(2),
            full_name: None,
            exp: Some(future_exp()),
        });
        assert!(matches!(
            verify(&t, SECRET),
            Err(AuthRejected::MissingClaim("sub"))
        ));
    }

    #[test]
    fn wrong_signature_is_rejected() {
        let t = token(&Claims {
            sub: Some("bob@x.com".into()),
            user_id: Some(2),
            full_name: None,
            exp: Some(future_exp()),
        });
        assert!(matches!(
            verify(&t, "other-secret"),
            Err(AuthRejected::Invalid(_))
        ));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            verify("not-a-jwt", SECRET),
            Err(AuthRejected::Invalid(_))
        ));
    }
}
