use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{auth::AuthUser, state::AppState, vision};

use super::dto::{
    AnalyzeRequest, CaptureDto, DataEnvelope, FoodHistory, FoodItemDto, ImageDto, TargetsDto,
    TargetsRequest, UpdateMacrosRequest,
};
use super::repo::{self, FoodItemRow, User};

// Clients ship the photo as a base64 data URL in a JSON body.
const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

pub fn read_routes() -> Router<AppState> {
    Router::new().route("/user-food-history", get(user_food_history))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/analyze", post(analyze))
        .route("/update-targets", post(update_targets))
        .route("/update-macros", post(update_macros))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}

fn item_dto(row: FoodItemRow) -> FoodItemDto {
    FoodItemDto {
        id: row.id,
        name: row.name,
        calories: row.calories,
        carbs: row.carbs,
        fat: row.fat,
        protein: row.protein,
        created_at: row.created_at,
    }
}

/// POST /analyze: run the photo through the vision service and persist
/// whatever it found. An empty or null item list is a no-op that answers
/// with `data: null`.
#[instrument(skip(state, body))]
pub async fn analyze(
    State(state): State<AppState>,
    AuthUser(external_id): AuthUser,
    Json(body): Json<AnalyzeRequest>,
) -> Result<Json<DataEnvelope<Option<CaptureDto>>>, (StatusCode, String)> {
    if body.image.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "No image data received".into()));
    }
    if let Err(e) = vision::split_data_url(&body.image) {
        warn!(error = %e, "rejected analyze request");
        return Err((StatusCode::BAD_REQUEST, e.to_string()));
    }

    let scan = match state.vision.analyze_image(&body.image).await {
        Ok(scan) => scan,
        Err(e) => {
            error!(error = %e, "vision analysis failed");
            return Err((StatusCode::BAD_GATEWAY, "Vision analysis failed".into()));
        }
    };

    if scan.items().is_empty() {
        info!("no food items detected; skipping save");
        return Ok(Json(DataEnvelope { data: None }));
    }

    let user = User::upsert_by_external_id(&state.db, &external_id)
        .await
        .map_err(internal)?;

    let ai_raw = serde_json::to_value(&scan).map_err(internal)?;
    let (capture_id, created_at, rows) =
        repo::insert_capture(&state.db, user.id, None, &ai_raw, scan.items())
            .await
            .map_err(internal)?;

    info!(user_id = %user.id, capture_id = %capture_id, items = rows.len(), "capture saved");
    Ok(Json(DataEnvelope {
        data: Some(CaptureDto {
            id: capture_id,
            created_at,
            food_items: rows.into_iter().map(item_dto).collect(),
        }),
    }))
}

/// GET /user-food-history: the four targets plus every capture, newest
/// first. A user who never saved anything gets null targets and no images.
#[instrument(skip(state))]
pub async fn user_food_history(
    State(state): State<AppState>,
    AuthUser(external_id): AuthUser,
) -> Result<Json<DataEnvelope<FoodHistory>>, (StatusCode, String)> {
    let user = User::find_by_external_id(&state.db, &external_id)
        .await
        .map_err(internal)?;

    let Some(user) = user else {
        return Ok(Json(DataEnvelope {
            data: FoodHistory::default(),
        }));
    };

    let captures = repo::list_captures_with_items(&state.db, user.id)
        .await
        .map_err(internal)?;

    let images = captures
        .into_iter()
        .map(|(_, rows)| ImageDto {
            food_items: rows.into_iter().map(item_dto).collect(),
        })
        .collect();

    Ok(Json(DataEnvelope {
        data: FoodHistory {
            calorie_target: user.calorie_target,
            protein_target: user.protein_target,
            carb_target: user.carb_target,
            fat_target: user.fat_target,
            images,
        },
    }))
}

/// POST /update-targets: store the four daily goals.
#[instrument(skip(state, body))]
pub async fn update_targets(
    State(state): State<AppState>,
    AuthUser(external_id): AuthUser,
    Json(body): Json<TargetsRequest>,
) -> Result<Json<DataEnvelope<TargetsDto>>, (StatusCode, String)> {
    let values = [body.calories, body.protein, body.carbs, body.fat];
    if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
        warn!("rejected targets update with negative or non-finite values");
        return Err((
            StatusCode::BAD_REQUEST,
            "Targets must be non-negative numbers".into(),
        ));
    }

    let user = User::upsert_targets(
        &state.db,
        &external_id,
        body.calories,
        body.protein,
        body.carbs,
        body.fat,
    )
    .await
    .map_err(internal)?;

    info!(user_id = %user.id, "targets updated");
    Ok(Json(DataEnvelope {
        data: TargetsDto {
            calorie_target: user.calorie_target,
            protein_target: user.protein_target,
            carb_target: user.carb_target,
            fat_target: user.fat_target,
        },
    }))
}

/// POST /update-macros: apply a user correction to one logged item.
#[instrument(skip(state, body))]
pub async fn update_macros(
    State(state): State<AppState>,
    AuthUser(external_id): AuthUser,
    Json(body): Json<UpdateMacrosRequest>,
) -> Result<Json<DataEnvelope<FoodItemDto>>, (StatusCode, String)> {
    let values = [body.calories, body.carbs, body.fat, body.protein];
    if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
        warn!(item_id = %body.id, "rejected macro update with negative or non-finite values");
        return Err((
            StatusCode::BAD_REQUEST,
            "Macros must be non-negative numbers".into(),
        ));
    }

    let row = repo::update_item_macros(
        &state.db,
        &external_id,
        body.id,
        body.calories,
        body.carbs,
        body.fat,
        body.protein,
    )
    .await
    .map_err(internal)?;

    let Some(row) = row else {
        warn!(item_id = %body.id, "macro update for unknown or foreign item");
        return Err((StatusCode::NOT_FOUND, "Food item not found".into()));
    };

    info!(item_id = %row.id, "macros updated");
    Ok(Json(DataEnvelope {
        data: item_dto(row),
    }))
}

fn internal<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}
