use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use sqlx::PgPool;
use tower_http::cors::CorsLayer;

use mealplan_core::catalog::{Catalog, PgCatalog};
use mealplan_core::plan::{
    MealPlanWithDetails, PlanError, SavePlanRequest, delete_meal_plan, get_meal_plan,
    list_meal_plans, save_meal_plan,
};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.into(),
        }
    }
}

impl From<PlanError> for AppError {
    fn from(err: PlanError) -> Self {
        match err {
            PlanError::NotFound(_) => Self::not_found(err.to_string()),
            PlanError::Invalid(_) => Self::bad_request(err.to_string()),
            PlanError::Storage { .. } => Self::internal(err.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct MealPlanListResponse {
    pub meal_plans: Vec<MealPlanWithDetails>,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub catalog: Arc<dyn Catalog>,
}

pub fn build_router(pool: PgPool) -> Router {
    let catalog: Arc<dyn Catalog> = Arc::new(PgCatalog::new(pool.clone()));
    build_router_with_catalog(pool, catalog)
}

pub fn build_router_with_catalog(pool: PgPool, catalog: Arc<dyn Catalog>) -> Router {
    Router::new()
        .route("/api/meal-plans", get(list_plans).post(save_plan))
        .route("/api/meal-plans/{id}", get(get_plan).delete(delete_plan))
        .layer(CorsLayer::permissive())
        .with_state(AppState { pool, catalog })
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(pool: PgPool, bind: &str, port: u16) -> Result<()> {
    let app = build_router(pool);
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    tracing::info!("mealplan serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("mealplan serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for Ctrl+C; shutting down");
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn save_plan(
    State(state): State<AppState>,
    body: Result<Json<SavePlanRequest>, JsonRejection>,
) -> Result<axum::response::Response, AppError> {
    let Json(request) = body.map_err(|e| AppError::bad_request(e.body_text()))?;
    let outcome = save_meal_plan(&state.pool, &request).await?;
    Ok(Json(outcome).into_response())
}

async fn list_plans(State(state): State<AppState>) -> Result<axum::response::Response, AppError> {
    let meal_plans = list_meal_plans(&state.pool, state.catalog.as_ref()).await?;
    Ok(Json(MealPlanListResponse { meal_plans }).into_response())
}

/// Plan id from the path; a non-integer id is a 400 with a JSON body.
fn plan_id(path: Result<Path<i32>, PathRejection>) -> Result<i32, AppError> {
    path.map(|Path(id)| id)
        .map_err(|e| AppError::bad_request(e.body_text()))
}

async fn get_plan(
    State(state): State<AppState>,
    path: Result<Path<i32>, PathRejection>,
) -> Result<axum::response::Response, AppError> {
    let id = plan_id(path)?;
    let view = get_meal_plan(&state.pool, state.catalog.as_ref(), id).await?;
    Ok(Json(view).into_response())
}

async fn delete_plan(
    State(state): State<AppState>,
    path: Result<Path<i32>, PathRejection>,
) -> Result<axum::response::Response, AppError> {
    let id = plan_id(path)?;
    delete_meal_plan(&state.pool, id).await?;
    Ok(Json(OkResponse { ok: true }).into_response())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use sqlx::PgPool;
    use tower::ServiceExt;

    use mealplan_db::models::FoodItem;
    use mealplan_test_utils::{create_test_db, drop_test_db, seed_food};

    // -----------------------------------------------------------------------
    // HTTP helpers
    // -----------------------------------------------------------------------

    async fn send_request(
        pool: PgPool,
        method: Method,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> axum::response::Response {
        let app = super::build_router(pool);
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        app.oneshot(request).await.unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 1_048_576)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn plan_body(food: &FoodItem, quantity: i32) -> serde_json::Value {
        serde_json::json!({
            "range_start": "2024-06-03",
            "range_end": "2024-06-09",
            "people_count": 2,
            "children_count": 1,
            "total_cost": 100000.0,
            "meals": [
                {"meal_time": "breakfast", "day_of_week": "monday", "food_id": food.id, "quantity": quantity}
            ]
        })
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_list_plans_empty() {
        let (pool, db_name) = create_test_db().await;

        let resp = send_request(pool.clone(), Method::GET, "/api/meal-plans", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json, serde_json::json!({ "meal_plans": [] }));

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_save_then_get_plan() {
        let (pool, db_name) = create_test_db().await;
        let food = seed_food(&pool, "pho bo", 45_000.0, 420.0).await;

        let resp = send_request(
            pool.clone(),
            Method::POST,
            "/api/meal-plans",
            Some(plan_body(&food, 2)),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let saved = body_json(resp).await;
        let id = saved["meal_plan_id"].as_i64().expect("should return an id");
        assert_eq!(saved["created"], true);

        let resp = send_request(pool.clone(), Method::GET, &format!("/api/meal-plans/{id}"), None)
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["id"], id);
        assert_eq!(json["people_count"], 2);
        let details = json["details"].as_array().expect("should have details array");
        assert_eq!(details.len(), 1);
        assert_eq!(details[0]["food_name"], "pho bo");
        assert_eq!(details[0]["day_of_week"], "monday");
        assert_eq!(json["total_price"], 90_000.0);
        assert_eq!(json["total_calories"], 840.0);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_update_returns_ok_and_list_shows_details() {
        let (pool, db_name) = create_test_db().await;
        let food = seed_food(&pool, "com tam", 40_000.0, 700.0).await;

        let resp = send_request(
            pool.clone(),
            Method::POST,
            "/api/meal-plans",
            Some(plan_body(&food, 1)),
        )
        .await;
        let id = body_json(resp).await["meal_plan_id"].as_i64().unwrap();

        let mut update = plan_body(&food, 3);
        update["meal_plan_id"] = serde_json::json!(id);
        let resp = send_request(pool.clone(), Method::POST, "/api/meal-plans", Some(update)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["created"], false);

        let resp = send_request(pool.clone(), Method::GET, "/api/meal-plans", None).await;
        let json = body_json(resp).await;
        let plans = json["meal_plans"].as_array().expect("should have meal_plans");
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0]["details"][0]["quantity"], 3);
        assert_eq!(plans[0]["details"][0]["food_name"], "com tam");

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_invalid_plan_is_bad_request() {
        let (pool, db_name) = create_test_db().await;
        let food = seed_food(&pool, "xoi", 15_000.0, 350.0).await;

        let resp = send_request(
            pool.clone(),
            Method::POST,
            "/api/meal-plans",
            Some(plan_body(&food, 0)),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert!(
            json["error"].as_str().unwrap().contains("quantity must be positive"),
            "unexpected error body: {json}"
        );

        let resp = send_request(
            pool.clone(),
            Method::POST,
            "/api/meal-plans",
            Some(serde_json::json!({ "range_start": "not a date" })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_get_plan_not_found() {
        let (pool, db_name) = create_test_db().await;

        let resp = send_request(pool.clone(), Method::GET, "/api/meal-plans/4242", None).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_non_numeric_id_is_json_bad_request() {
        let (pool, db_name) = create_test_db().await;

        for method in [Method::GET, Method::DELETE] {
            let resp = send_request(pool.clone(), method, "/api/meal-plans/abc", None).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            let json = body_json(resp).await;
            assert!(
                json["error"].as_str().is_some_and(|m| !m.is_empty()),
                "expected a JSON error body, got: {json}"
            );
        }

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_delete_plan() {
        let (pool, db_name) = create_test_db().await;
        let food = seed_food(&pool, "banh mi", 25_000.0, 400.0).await;

        let resp = send_request(
            pool.clone(),
            Method::POST,
            "/api/meal-plans",
            Some(plan_body(&food, 1)),
        )
        .await;
        let id = body_json(resp).await["meal_plan_id"].as_i64().unwrap();

        let uri = format!("/api/meal-plans/{id}");
        let resp = send_request(pool.clone(), Method::DELETE, &uri, None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await, serde_json::json!({ "ok": true }));

        let resp = send_request(pool.clone(), Method::DELETE, &uri, None).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        pool.close().await;
        drop_test_db(&db_name).await;
    }
}
