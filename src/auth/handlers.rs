use axum::{
    extract::{FromRef, Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{CredentialsForm, OAuthCallback},
        extractors::current_session,
        jwt::{clear_cookie, SessionKeys},
        oauth::{new_state, STATE_COOKIE},
        repo_types::User,
        services,
    },
    dashboard::dto::Tab,
    error::AppError,
    state::AppState,
    web::{
        flash::{self, Level},
        pages,
    },
};

const GOOGLE_FAILED: &str = "Google login failed. Try again.";

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_page).post(login))
        .route("/signup", get(signup_page).post(signup))
        .route("/logout", get(logout))
        .route("/auth/google", get(google_login))
        .route("/auth/google/callback", get(google_callback))
}

fn bounce(jar: CookieJar, message: impl Into<String>, to: &str) -> Response {
    (flash::push(jar, Level::Error, message), Redirect::to(to)).into_response()
}

/// Issues the session cookie and lands on the dashboard.
fn start_session(state: &AppState, jar: CookieJar, user: &User) -> Response {
    let keys = SessionKeys::from_ref(state);
    match keys.cookie(user.id, &user.email) {
        Ok(cookie) => (jar.add(cookie), Redirect::to(&Tab::Upload.location())).into_response(),
        Err(e) => {
            error!(error = %e, user_id = user.id, "session sign failed");
            bounce(jar, AppError::Internal(e).public_message(), "/login")
        }
    }
}

#[instrument(skip_all)]
pub async fn login_page(State(state): State<AppState>, jar: CookieJar) -> Response {
    let keys = SessionKeys::from_ref(&state);
    if current_session(&keys, &jar).is_some() {
        return Redirect::to(&Tab::Upload.location()).into_response();
    }
    let (jar, flashes) = flash::take(jar);
    (jar, pages::login(&flashes, state.identity.is_some())).into_response()
}

#[instrument(skip(state, jar, form))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<CredentialsForm>,
) -> Response {
    match services::authenticate(&state.db, &form.email, &form.password).await {
        Ok(user) => start_session(&state, jar, &user),
        Err(e) => bounce(jar, e.public_message(), "/login"),
    }
}

#[instrument(skip_all)]
pub async fn signup_page(State(state): State<AppState>, jar: CookieJar) -> Response {
    let (jar, flashes) = flash::take(jar);
    (jar, pages::signup(&flashes, state.identity.is_some())).into_response()
}

#[instrument(skip(state, jar, form))]
pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<CredentialsForm>,
) -> Response {
    match services::register(&state.db, &form.email, &form.password).await {
        Ok(_) => (
            flash::push(jar, Level::Success, "Account created! Please login."),
            Redirect::to("/login"),
        )
            .into_response(),
        Err(e @ AppError::DuplicateEmail) => bounce(jar, e.public_message(), "/login"),
        Err(e) => bounce(jar, e.public_message(), "/signup"),
    }
}

pub async fn logout(jar: CookieJar) -> (CookieJar, Redirect) {
    (jar.remove(clear_cookie()), Redirect::to("/"))
}

#[instrument(skip_all)]
pub async fn google_login(State(state): State<AppState>, jar: CookieJar) -> Response {
    let Some(identity) = state.identity.clone() else {
        return bounce(jar, "Google sign-in is not configured.", "/login");
    };
    let csrf = new_state();
    let url = match identity.authorize_url(&csrf) {
        Ok(url) => url,
        Err(e) => {
            error!(error = %e, "build authorize url failed");
            return bounce(jar, GOOGLE_FAILED, "/login");
        }
    };
    let cookie = Cookie::build((STATE_COOKIE, csrf))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::minutes(10))
        .build();
    (jar.add(cookie), Redirect::to(url.as_str())).into_response()
}

#[instrument(skip_all)]
pub async fn google_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(cb): Query<OAuthCallback>,
) -> Response {
    let Some(identity) = state.identity.clone() else {
        return bounce(jar, "Google sign-in is not configured.", "/login");
    };
    let expected = jar.get(STATE_COOKIE).map(|c| c.value().to_string());
    let jar = jar.remove(Cookie::build(STATE_COOKIE).path("/"));

    if let Some(err) = cb.error.as_deref() {
        warn!(error = %err, "google returned an error");
        return bounce(jar, GOOGLE_FAILED, "/login");
    }
    let (Some(code), Some(returned)) = (cb.code.as_deref(), cb.state.as_deref()) else {
        return bounce(jar, GOOGLE_FAILED, "/login");
    };
    if expected.as_deref() != Some(returned) {
        warn!("oauth state mismatch");
        return bounce(jar, GOOGLE_FAILED, "/login");
    }

    let verified = match identity.exchange(code).await {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "google code exchange failed");
            let message = if e.to_string().contains("email not found") {
                "Google login failed: email not found"
            } else {
                GOOGLE_FAILED
            };
            return bounce(jar, message, "/login");
        }
    };

    match services::sign_in_verified(&state.db, &verified).await {
        Ok(user) => {
            info!(user_id = user.id, email = %user.email, "google sign-in");
            start_session(&state, jar, &user)
        }
        Err(e) => bounce(jar, e.public_message(), "/login"),
    }
}
