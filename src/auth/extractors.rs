use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::warn;

use super::jwt::{clear_cookie, SessionKeys, SESSION_COOKIE};

/// The signed-in user for the current request. Inserted into request
/// extensions by [`require_session`]; handlers take `Extension<Session>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: i64,
    pub email: String,
}

/// Session carried by the jar, if it verifies.
pub fn current_session(keys: &SessionKeys, jar: &CookieJar) -> Option<Session> {
    let token = jar.get(SESSION_COOKIE)?;
    match keys.verify(token.value()) {
        Ok(claims) => Some(Session {
            user_id: claims.sub,
            email: claims.email,
        }),
        Err(e) => {
            warn!(error = %e, "invalid or expired session");
            None
        }
    }
}

/// Gate for every signed-in route: no valid session means a trip to `/login`.
pub async fn require_session(
    State(keys): State<SessionKeys>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    match current_session(&keys, &jar) {
        Some(session) => {
            req.extensions_mut().insert(session);
            next.run(req).await
        }
        None if jar.get(SESSION_COOKIE).is_some() => {
            (jar.remove(clear_cookie()), Redirect::to("/login")).into_response()
        }
        None => Redirect::to("/login").into_response(),
    }
}
