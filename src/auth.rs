// src/auth.rs
use crate::config::OAuthClient;
use crate::models::{OAuthProfile, OAuthProvider};
use crate::{AppState, errors::FondayError};
use actix_web::cookie::{Cookie, SameSite, time::Duration as CookieDuration};
use actix_web::{HttpRequest, HttpResponse, web};
use log::{info, warn};
use serde::Deserialize;
use uuid::Uuid;

const SESSION_COOKIE: &str = "fonday_session";

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

pub async fn google_login(data: web::Data<AppState>) -> Result<HttpResponse, FondayError> {
    let Some(oauth) = data.config.google_oauth.clone() else {
        return Err(FondayError::OAuth("Google login is not configured".to_string()));
    };

    let state = Uuid::new_v4().to_string();
    data.users.put_oauth_state(&state).await?;

    let url = reqwest::Url::parse_with_params(
        "https://accounts.google.com/o/oauth2/v2/auth",
        &[
            ("client_id", oauth.client_id.as_str()),
            ("redirect_uri", callback_url(&data, OAuthProvider::Google).as_str()),
            ("response_type", "code"),
            ("scope", "profile email"),
            ("state", state.as_str()),
        ],
    )
    .map_err(|e| FondayError::OAuth(e.to_string()))?;

    Ok(redirect(url.as_str()))
}

pub async fn kakao_login(data: web::Data<AppState>) -> Result<HttpResponse, FondayError> {
    let Some(oauth) = data.config.kakao_oauth.clone() else {
        return Err(FondayError::OAuth("Kakao login is not configured".to_string()));
    };

    let state = Uuid::new_v4().to_string();
    data.users.put_oauth_state(&state).await?;

    let url = reqwest::Url::parse_with_params(
        "https://kauth.kakao.com/oauth/authorize",
        &[
            ("client_id", oauth.client_id.as_str()),
            ("redirect_uri", callback_url(&data, OAuthProvider::Kakao).as_str()),
            ("response_type", "code"),
            ("state", state.as_str()),
        ],
    )
    .map_err(|e| FondayError::OAuth(e.to_string()))?;

    Ok(redirect(url.as_str()))
}

pub async fn google_callback(
    query: web::Query<CallbackQuery>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, FondayError> {
    finish_login(OAuthProvider::Google, query.into_inner(), &data).await
}

pub async fn kakao_callback(
    query: web::Query<CallbackQuery>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, FondayError> {
    finish_login(OAuthProvider::Kakao, query.into_inner(), &data).await
}

pub async fn current_user(
    req: HttpRequest,
    data: web::Data<AppState>,
) -> Result<HttpResponse, FondayError> {
    if let Some(cookie) = req.cookie(SESSION_COOKIE) {
        if let Some(user) = data.users.session_user(cookie.value()).await? {
            return Ok(HttpResponse::Ok().json(user));
        }
    }

    Ok(HttpResponse::Unauthorized().body("Not authenticated"))
}

pub async fn logout(
    req: HttpRequest,
    data: web::Data<AppState>,
) -> Result<HttpResponse, FondayError> {
    if let Some(cookie) = req.cookie(SESSION_COOKIE) {
        data.users.delete_session(cookie.value()).await?;
    }

    let expired = Cookie::build(SESSION_COOKIE, "")
        .path("/")
        .max_age(CookieDuration::ZERO)
        .finish();

    Ok(HttpResponse::Ok().cookie(expired).finish())
}

async fn finish_login(
    provider: OAuthProvider,
    query: CallbackQuery,
    data: &web::Data<AppState>,
) -> Result<HttpResponse, FondayError> {
    if let Some(error) = query.error {
        warn!("{} login denied: {}", provider.tag(), error);
        return Ok(redirect("/login"));
    }

    let (Some(code), Some(state)) = (query.code, query.state) else {
        warn!("{} callback missing code or state", provider.tag());
        return Ok(redirect("/login"));
    };

    if !data.users.take_oauth_state(&state).await? {
        warn!("{} callback with unknown state token", provider.tag());
        return Ok(redirect("/login"));
    }

    let oauth = match provider {
        OAuthProvider::Google => data.config.google_oauth.clone(),
        OAuthProvider::Kakao => data.config.kakao_oauth.clone(),
    }
    .ok_or_else(|| FondayError::OAuth(format!("{} login is not configured", provider.tag())))?;

    let access_token = exchange_code(provider, &oauth, &callback_url(data, provider), &code, data).await?;
    let profile = fetch_profile(provider, &access_token, data).await?;

    let user = data.users.lookup_or_create_user(provider, &profile).await?;
    info!("{} login for user {}", provider.tag(), user.username);

    let session_id = data.users.create_session(&user.id).await?;
    let cookie = Cookie::build(SESSION_COOKIE, session_id)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::days(1))
        .finish();

    Ok(HttpResponse::Found()
        .append_header(("Location", "/"))
        .cookie(cookie)
        .finish())
}

async fn exchange_code(
    provider: OAuthProvider,
    oauth: &OAuthClient,
    redirect_uri: &str,
    code: &str,
    data: &web::Data<AppState>,
) -> Result<String, FondayError> {
    let token_url = match provider {
        OAuthProvider::Google => "https://oauth2.googleapis.com/token",
        OAuthProvider::Kakao => "https://kauth.kakao.com/oauth/token",
    };

    let mut form = vec![
        ("grant_type", "authorization_code"),
        ("client_id", oauth.client_id.as_str()),
        ("redirect_uri", redirect_uri),
        ("code", code),
    ];
    // Kakao apps may run without a client secret.
    if !oauth.client_secret.is_empty() {
        form.push(("client_secret", oauth.client_secret.as_str()));
    }

    let response = data
        .http_client
        .post(token_url)
        .form(&form)
        .send()
        .await
        .map_err(|e| FondayError::OAuth(format!("token exchange failed: {}", e)))?;

    if !response.status().is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!("{} token exchange rejected: {}", provider.tag(), body);
        return Err(FondayError::OAuth("token exchange rejected".to_string()));
    }

    let value: serde_json::Value = response
        .json()
        .await
        .map_err(|e| FondayError::OAuth(format!("unreadable token response: {}", e)))?;

    value["access_token"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| FondayError::OAuth("no access token in response".to_string()))
}

async fn fetch_profile(
    provider: OAuthProvider,
    access_token: &str,
    data: &web::Data<AppState>,
) -> Result<OAuthProfile, FondayError> {
    let profile_url = match provider {
        OAuthProvider::Google => "https://www.googleapis.com/oauth2/v2/userinfo",
        OAuthProvider::Kakao => "https://kapi.kakao.com/v2/user/me",
    };

    let response = data
        .http_client
        .get(profile_url)
        .bearer_auth(access_token)
        .send()
        .await
        .map_err(|e| FondayError::OAuth(format!("profile fetch failed: {}", e)))?;

    if !response.status().is_success() {
        return Err(FondayError::OAuth(format!(
            "profile fetch rejected with {}",
            response.status()
        )));
    }

    let value: serde_json::Value = response
        .json()
        .await
        .map_err(|e| FondayError::OAuth(format!("unreadable profile response: {}", e)))?;

    let profile = match provider {
        OAuthProvider::Google => OAuthProfile {
            id: value["id"]
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| FondayError::OAuth("no id in Google profile".to_string()))?,
            display_name: value["name"].as_str().map(str::to_string),
            email: value["email"].as_str().map(str::to_string),
            avatar: value["picture"].as_str().map(str::to_string),
        },
        OAuthProvider::Kakao => OAuthProfile {
            id: value["id"]
                .as_i64()
                .map(|id| id.to_string())
                .ok_or_else(|| FondayError::OAuth("no id in Kakao profile".to_string()))?,
            display_name: value["properties"]["nickname"].as_str().map(str::to_string),
            email: value["kakao_account"]["email"].as_str().map(str::to_string),
            avatar: value["properties"]["profile_image"].as_str().map(str::to_string),
        },
    };

    Ok(profile)
}

fn callback_url(data: &web::Data<AppState>, provider: OAuthProvider) -> String {
    format!(
        "{}/auth/{}/callback",
        data.config.base_url.trim_end_matches('/'),
        provider.tag()
    )
}

fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .append_header(("Location", location.to_string()))
        .finish()
}
