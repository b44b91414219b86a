use anyhow::Result;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::{
    cookie::{Cookie, Key, SameSite},
    PrivateCookieJar,
};
use cookie::time::Duration;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

/// Name of the private cookie holding the serialized session.
pub const SESSION_COOKIE: &str = "session";

const SESSION_LIFETIME_DAYS: i64 = 7;

/// The signed in user, along with the budget they are currently viewing.
///
/// Sessions are stored in an encrypted cookie so they survive client
/// restarts without any server side storage.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Session {
    id: Uuid,
    user_id: Uuid,
    username: String,
    active_budget_id: Option<i64>,
}

impl Session {
    /// Create a new session for a specific user.
    ///
    /// # Example
    ///
    /// ```
    /// # use uuid::Uuid;
    /// # use budget_buddy_api::authentication::domain::session::Session;
    ///
    /// let user_id = Uuid::new_v4();
    /// let session = Session::new_for_user(user_id, "ann");
    ///
    /// assert_eq!(user_id, session.user_id());
    /// assert_eq!(None, session.active_budget_id());
    /// ```
    pub fn new_for_user(user_id: Uuid, username: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            username: username.to_owned(),
            active_budget_id: None,
        }
    }

    pub fn serialized(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn active_budget_id(&self) -> Option<i64> {
        self.active_budget_id
    }

    pub fn set_active_budget(&mut self, budget_id: Option<i64>) {
        self.active_budget_id = budget_id;
    }

    /// Write the session to the cookie jar, replacing any existing session.
    pub fn store(&self, cookies: PrivateCookieJar) -> Result<PrivateCookieJar> {
        let session_cookie = Cookie::build(SESSION_COOKIE, self.serialized()?)
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .max_age(Duration::days(SESSION_LIFETIME_DAYS))
            .finish();

        Ok(cookies.add(session_cookie))
    }

    /// Remove any session from the cookie jar.
    pub fn clear(cookies: PrivateCookieJar) -> PrivateCookieJar {
        cookies.remove(Cookie::build(SESSION_COOKIE, "").path("/").finish())
    }
}

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for Session
where
    Key: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = SessionError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let cookies = match PrivateCookieJar::<Key>::from_request_parts(parts, state).await {
            Ok(cookies) => cookies,
            Err(never) => match never {},
        };

        let session_cookie = cookies.get(SESSION_COOKIE).ok_or_else(|| {
            debug!("Request has no session cookie.");

            SessionError
        })?;

        match serde_json::from_str::<Session>(session_cookie.value()) {
            Ok(session) => {
                debug!(user_id = %session.user_id(), session_id = %session.id(), "Parsed cookie session.");

                Ok(session)
            }
            Err(error) => {
                warn!(?error, "Received malformed session value.");

                Err(SessionError)
            }
        }
    }
}

/// Rejection for requests without a valid session.
#[derive(Debug)]
pub struct SessionError;

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "message": "Authentication required.",
        }));

        (StatusCode::UNAUTHORIZED, body).into_response()
    }
}

#[cfg(test)]
mod test {
    use axum::http::{header, Request};

    use super::*;

    #[derive(Clone)]
    struct TestState {
        key: Key,
    }

    impl FromRef<TestState> for Key {
        fn from_ref(state: &TestState) -> Self {
            state.key.clone()
        }
    }

    /// Turn the `Set-Cookie` header of a stored session into the `Cookie`
    /// header a browser would send back.
    fn cookie_header(state: &TestState, session: &Session) -> String {
        let jar = session
            .store(PrivateCookieJar::new(state.key.clone()))
            .expect("session should store");
        let response = (jar, StatusCode::OK).into_response();

        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .expect("cookie should be set")
            .to_str()
            .expect("cookie should be ASCII");

        set_cookie
            .split(';')
            .next()
            .expect("cookie should have a value")
            .to_owned()
    }

    async fn extract(state: &TestState, cookie: Option<String>) -> Result<Session, SessionError> {
        let mut builder = Request::builder();
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();

        Session::from_request_parts(&mut parts, state).await
    }

    #[tokio::test]
    async fn stored_session_round_trips() {
        let state = TestState {
            key: Key::generate(),
        };
        let mut session = Session::new_for_user(Uuid::new_v4(), "ann");
        session.set_active_budget(Some(4));

        let extracted = extract(&state, Some(cookie_header(&state, &session)))
            .await
            .expect("session should be extracted");

        assert_eq!(session, extracted);
    }

    #[tokio::test]
    async fn missing_cookie_is_rejected() {
        let state = TestState {
            key: Key::generate(),
        };

        assert!(extract(&state, None).await.is_err());
    }

    #[tokio::test]
    async fn cookie_from_other_key_is_rejected() {
        let state = TestState {
            key: Key::generate(),
        };
        let other_state = TestState {
            key: Key::generate(),
        };
        let session = Session::new_for_user(Uuid::new_v4(), "ann");

        let result = extract(&state, Some(cookie_header(&other_state, &session))).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn plaintext_cookie_is_rejected() {
        let state = TestState {
            key: Key::generate(),
        };
        let session = Session::new_for_user(Uuid::new_v4(), "ann");
        let forged = format!(
            "{}={}",
            SESSION_COOKIE,
            session.serialized().expect("serialize")
        );

        assert!(extract(&state, Some(forged)).await.is_err());
    }
}
