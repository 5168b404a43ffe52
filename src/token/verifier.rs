use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};

use crate::core::config::Args;
use crate::core::error::Error;
use crate::token::claims::AccessClaims;

/// Answers whether a presented bearer token may access protected routes.
/// Implementations fail closed.
pub(crate) trait Verifier {
    async fn verify(&self, presented: &str) -> bool;
}

#[derive(Clone)]
pub(crate) struct AccessTokenDecoder {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl AccessTokenDecoder {
    pub(crate) fn new(args: &Args) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            decoding_key: DecodingKey::from_secret(args.access_secret.as_bytes()),
            validation,
        }
    }

    /// Checks signature and expiry. Store membership is the caller's concern.
    pub(crate) fn decode(&self, token: &str) -> Result<AccessClaims, Error> {
        let claims =
            match jsonwebtoken::decode::<AccessClaims>(token, &self.decoding_key, &self.validation)
            {
                Ok(token_data) => token_data.claims,
                Err(e) => match e.kind() {
                    ErrorKind::ExpiredSignature => return Err(Error::ExpiredToken),
                    _ => return Err(Error::InvalidToken(e)),
                },
            };

        if !claims.authorized {
            return Err(Error::Unauthorized);
        }

        Ok(claims)
    }
}
