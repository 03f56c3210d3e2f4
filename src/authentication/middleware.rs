use std::sync::Arc;

use warp::{reject::Rejection, Filter};

use crate::{constants::SESSION_COOKIE, error::Error};

use super::jwt::{verify_jwt_session, SessionData};

/// Bearer token from the `Authorization` header, falling back to the session cookie.
fn session_token() -> impl Filter<Extract = (Option<String>,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and(warp::cookie::optional::<String>(SESSION_COOKIE))
        .map(|header: Option<String>, cookie: Option<String>| {
            header
                .and_then(|value| value.strip_prefix("Bearer ").map(|t| t.trim().to_owned()))
                .or(cookie)
        })
}

pub fn with_session(
    secret: Arc<str>,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    session_token().and_then(move |token: Option<String>| {
        let secret = secret.clone();
        async move {
            let token = token.ok_or_else(|| warp::reject::custom(Error::Unauthorized))?;
            verify_jwt_session(&token, &secret)
                .map(SessionData::from)
                .map_err(warp::reject::custom)
        }
    })
}

pub fn with_possible_session(
    secret: Arc<str>,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Rejection> + Clone {
    session_token().map(move |token: Option<String>| {
        token.and_then(|token| {
            verify_jwt_session(&token, &secret)
                .ok()
                .map(SessionData::from)
        })
    })
}
