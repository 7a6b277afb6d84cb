// src/main.rs
use actix_web::{App, HttpResponse, HttpServer, middleware, web};
use log::info;
use std::sync::Arc;

mod auth;
mod config;
mod errors;
mod flow;
mod handlers;
mod models;
mod report;
mod services;

use crate::auth::{current_user, google_callback, google_login, kakao_callback, kakao_login, logout};
use crate::config::Config;
use crate::handlers::{analyze_skin, join_waitlist};
use crate::services::{GeminiService, UserStore};

#[derive(Clone)]
pub struct AppState {
    config: Config,
    users: Arc<UserStore>,
    gemini: Arc<GeminiService>,
    http_client: reqwest::Client,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    info!("Starting Fonday service...");

    let config = Config::from_env();

    // Initialize services
    let users = Arc::new(UserStore::new(&config.redis_url).await?);
    let gemini = Arc::new(GeminiService::new(&config)?);
    let http_client = reqwest::Client::new();

    let bind_addr = config.bind_addr.clone();
    let public_dir = config.public_dir.clone();

    let app_state = AppState {
        config,
        users,
        gemini,
        http_client,
    };

    info!("Starting HTTP server on {}", bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(middleware::Logger::default())
            .service(
                web::scope("/api")
                    .route("/analyze-skin", web::post().to(analyze_skin))
                    .route("/waitlist", web::post().to(join_waitlist))
                    .route("/user", web::get().to(current_user))
                    .route("/logout", web::post().to(logout)),
            )
            .service(
                web::scope("/auth")
                    .route("/google", web::get().to(google_login))
                    .route("/google/callback", web::get().to(google_callback))
                    .route("/kakao", web::get().to(kakao_login))
                    .route("/kakao/callback", web::get().to(kakao_callback)),
            )
            .route("/health", web::get().to(health_check))
            .service(actix_files::Files::new("/", public_dir.clone()).index_file("index.html"))
    })
    .bind(bind_addr)?
    .run()
    .await?;

    Ok(())
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "fonday",
        "version": "0.1.0"
    }))
}
