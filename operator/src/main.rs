use clap::Parser;
pub use controller::*;
use tracing_subscriber::{prelude::*, EnvFilter};

use actix_web::{
    get, middleware,
    web::Data,
    App, HttpRequest, HttpResponse, HttpServer, Responder,
};

#[get("/metrics")]
async fn metrics(c: Data<Manager>, _req: HttpRequest) -> impl Responder {
    let metrics = c.metrics();
    HttpResponse::Ok()
        .content_type("application/openmetrics-text; version=1.0.0; charset=utf-8")
        .body(metrics)
}

#[get("/health")]
async fn health(_: HttpRequest) -> impl Responder {
    HttpResponse::Ok().json("healthy")
}

#[get("/")]
async fn index(c: Data<Manager>, _req: HttpRequest) -> impl Responder {
    let d = c.diagnostics().await;
    HttpResponse::Ok().json(&d)
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let config = Config::parse();

    // Setup tracing layers
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (json, text) = if config.log_json {
        (Some(tracing_subscriber::fmt::layer().json()), None)
    } else {
        (None, Some(tracing_subscriber::fmt::layer()))
    };
    tracing_subscriber::registry()
        .with(env_filter)
        .with(json)
        .with(text)
        .init();

    // Start kubernetes controllers
    let (manager, controllers) = Manager::new(&config, Registry::standard()).await;

    // Start web server
    let server = HttpServer::new(move || {
        App::new()
            .app_data(Data::new(manager.clone()))
            .wrap(middleware::Logger::default().exclude("/health"))
            .service(index)
            .service(health)
            .service(metrics)
    })
    .bind(&config.metrics_addr)?
    .shutdown_timeout(5);

    tokio::select! {
        _ = futures::future::select_all(controllers) => tracing::warn!("a controller exited"),
        res = server.run() => {
            tracing::info!("actix exited");
            res?;
        },
    }
    Ok(())
}
