use chrono::Duration;
use chrono::Local;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::constants::SESSION_LIFETIME_HOURS;
use crate::error::Error;
use crate::schema::{Id, UserRole};

use super::permissions::ActionType;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: Id,
    pub role: UserRole,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(user_id: Id, role: UserRole) -> Self {
        let now = Local::now();
        let iat = now.timestamp();
        let exp = (now + Duration::hours(SESSION_LIFETIME_HOURS)).timestamp();

        Self {
            user_id,
            role,
            iat,
            exp,
        }
    }
}

/// Identity of the caller, handed explicitly to every operation that depends on it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SessionData {
    pub user_id: Id,
    pub role: UserRole,
}

impl SessionData {
    pub fn authenticate(&self, action: ActionType) -> Result<(), Error> {
        if !action.authenticate(self) {
            return Err(Error::Forbidden);
        }
        Ok(())
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

impl From<JwtSessionData> for SessionData {
    fn from(value: JwtSessionData) -> Self {
        SessionData {
            user_id: value.user_id,
            role: value.role,
        }
    }
}

fn signing_key(secret: &str) -> Result<Hmac<Sha256>, Error> {
    Hmac::new_from_slice(secret.as_bytes()).map_err(|_| Error::Unauthorized)
}

pub fn sign_jwt_session(claims: &JwtSessionData, secret: &str) -> Result<String, Error> {
    let key = signing_key(secret)?;

    claims
        .sign_with_key(&key)
        .map_err(|e| Error::InvalidRequest(format!("Could not sign session: {e}")))
}

pub fn generate_jwt_session(user_id: Id, role: UserRole, secret: &str) -> Result<String, Error> {
    sign_jwt_session(&JwtSessionData::new(user_id, role), secret)
}

pub fn verify_jwt_session(token: &str, secret: &str) -> Result<JwtSessionData, Error> {
    let key = signing_key(secret)?;

    let session: JwtSessionData = token.verify_with_key(&key).map_err(|_| {
        log::trace!("> Rejected session token");
        Error::Unauthorized
    })?;

    let now = Local::now().timestamp();
    if (session.exp - now).is_negative() {
        log::trace!("> Expired session for user {}", session.user_id);
        return Err(Error::Unauthorized);
    }

    Ok(session)
}
