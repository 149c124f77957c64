use actix_web::{error::InternalError, http::StatusCode, web, HttpResponse};
use jmc::{
    validate::{validate_restaurant, ValidationError},
    Repository, RepositoryError, Restaurant, SaveRequest, Service,
};
use tokio::sync::Mutex;

pub(super) struct ApiState {
    service: Service,
    // every write is a full load-and-save, so only one may run at a time
    write_lock: Mutex<()>,
}

impl ApiState {
    pub(super) fn new(repo: Repository) -> Self {
        Self {
            service: Service::new(repo),
            write_lock: Mutex::new(()),
        }
    }
}

#[derive(serde::Serialize)]
struct ErrJsonResp {
    message: String,
}

fn err_resp(status: StatusCode, message: impl ToString) -> HttpResponse {
    HttpResponse::build(status).json(ErrJsonResp {
        message: message.to_string(),
    })
}

fn repo_err(err: RepositoryError) -> HttpResponse {
    let status = match &err {
        RepositoryError::NotFound(_) => StatusCode::NOT_FOUND,
        RepositoryError::Invalid(_) => StatusCode::BAD_REQUEST,
        RepositoryError::Io { .. }
        | RepositoryError::Parse { .. }
        | RepositoryError::Serialize(_) => {
            tracing::error!("storage failure: {err}");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    err_resp(status, err)
}

fn invalid(err: ValidationError) -> HttpResponse {
    err_resp(StatusCode::BAD_REQUEST, err)
}

fn validate_batch(req: &SaveRequest) -> Result<(), String> {
    for (kind, items) in [("new", &req.new), ("update", &req.update)] {
        for (index, item) in items.iter().enumerate() {
            validate_restaurant(item).map_err(|e| format!("{kind}[{index}]: {e}"))?;
        }
    }
    Ok(())
}

#[actix_web::get("/api/restaurants")]
pub(super) async fn restaurants(data: web::Data<ApiState>) -> HttpResponse {
    match data.service.get_all().await {
        Ok(doc) => HttpResponse::Ok().json(doc),
        Err(err) => repo_err(err),
    }
}

#[actix_web::get("/api/restaurants/recommend")]
pub(super) async fn recommend(data: web::Data<ApiState>) -> HttpResponse {
    match data.service.recommend().await {
        Ok(picked) => HttpResponse::Ok().json(picked),
        Err(err) => repo_err(err),
    }
}

#[actix_web::post("/api/restaurants")]
pub(super) async fn create(
    data: web::Data<ApiState>,
    item: web::Json<Restaurant>,
) -> HttpResponse {
    let item = item.into_inner();
    if let Err(err) = validate_restaurant(&item) {
        return invalid(err);
    }

    let _guard = data.write_lock.lock().await;
    match data.service.create(item.clone()).await {
        Ok(()) => HttpResponse::Created().json(item),
        Err(err) => repo_err(err),
    }
}

#[derive(serde::Deserialize)]
pub(super) struct RestaurantPath {
    name: String,
}

#[actix_web::put("/api/restaurants/{name}")]
pub(super) async fn update(
    data: web::Data<ApiState>,
    path: web::Path<RestaurantPath>,
    item: web::Json<Restaurant>,
) -> HttpResponse {
    let item = item.into_inner();
    if let Err(err) = validate_restaurant(&item) {
        return invalid(err);
    }

    let _guard = data.write_lock.lock().await;
    match data.service.update(&path.name, item.clone()).await {
        Ok(()) => HttpResponse::Ok().json(item),
        Err(err) => repo_err(err),
    }
}

#[actix_web::delete("/api/restaurants/{name}")]
pub(super) async fn delete(
    data: web::Data<ApiState>,
    path: web::Path<RestaurantPath>,
) -> HttpResponse {
    let _guard = data.write_lock.lock().await;
    match data.service.delete(&path.name).await {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(err) => repo_err(err),
    }
}

#[actix_web::post("/api/restaurants/save")]
pub(super) async fn save(
    data: web::Data<ApiState>,
    req: web::Json<SaveRequest>,
) -> HttpResponse {
    let req = req.into_inner();
    if let Err(message) = validate_batch(&req) {
        return err_resp(StatusCode::BAD_REQUEST, message);
    }

    let _guard = data.write_lock.lock().await;
    match data.service.save_batch(req).await {
        Ok(doc) => HttpResponse::Ok().json(doc),
        Err(err) => repo_err(err),
    }
}

pub(super) fn routes(cfg: &mut web::ServiceConfig) {
    // bodies that fail to parse get the same error shape as everything else
    let json_cfg = web::JsonConfig::default().error_handler(|err, _req| {
        let resp = err_resp(StatusCode::BAD_REQUEST, &err);
        InternalError::from_response(err, resp).into()
    });

    // literal paths before the `{name}` ones
    cfg.app_data(json_cfg)
        .service(recommend)
        .service(save)
        .service(restaurants)
        .service(create)
        .service(update)
        .service(delete);
}
