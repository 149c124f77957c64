use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use jmc::{config::Config, Repository};

mod api;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    jmc::logging::init("info");
    let config = Config::from_env();

    let repo = Repository::new(&config.data_path);
    // fail early instead of on the first request
    repo.load_all()
        .await
        .with_context(|| format!("fail to open {}", config.data_path.display()))?;

    let state = web::Data::new(api::ApiState::new(repo));
    tracing::info!(bind = %config.bind, data = %config.data_path.display(), "starting api server");

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(
                Cors::default()
                    .allowed_origin("http://localhost:3000")
                    .allow_any_method()
                    .allow_any_header(),
            )
            .app_data(state.clone())
            .configure(api::routes)
    })
    .bind(&config.bind)
    .with_context(|| format!("fail to bind {}", config.bind))?
    .run()
    .await?;
    Ok(())
}
