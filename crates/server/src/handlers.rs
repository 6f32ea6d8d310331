use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, State};
use axum::response::Html;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};
use splitbill_core::{normalize_name, Item, Money};
use tracing::info;
use uuid::Uuid;

use crate::error::ApiError;
use crate::AppState;

type ApiResult = Result<Json<Value>, ApiError>;

const INDEX_HTML: &str = include_str!("../static/index.html");

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

// ── Scan ──────────────────────────────────────────────────────────────────────

pub async fn scan_bill(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult {
    let mut multipart = multipart?;
    let mut image = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("image") {
            image = Some(field.bytes().await?);
            break;
        }
    }
    let image = image.ok_or(ApiError::MissingImage)?;
    info!(bytes = image.len(), "scanning bill");

    let outcome = state.pipeline.scan(image.to_vec()).await?;
    drop(image);

    let mut bill = state.bill.lock().await;
    bill.replace_items(outcome.items);
    let body = json!({ "items": bill.items() });
    Ok(Json(body))
}

pub async fn save_bill(payload: Result<Json<Value>, JsonRejection>) -> ApiResult {
    let Json(data) = payload?;
    let bill_id = Uuid::new_v4().to_string();
    info!(%bill_id, "bill saved (not persisted)");
    Ok(Json(json!({
        "status": "success",
        "bill_id": bill_id,
        "saved_at": Utc::now().to_rfc3339(),
        "data": data,
    })))
}

// ── People ────────────────────────────────────────────────────────────────────

pub async fn add_person(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult {
    let Json(body) = payload?;
    let name = string_field(&body, "name", "Name is required")?;

    let mut bill = state.bill.lock().await;
    let body = json!({ "persons": bill.add_person(name) });
    Ok(Json(body))
}

pub async fn get_persons(State(state): State<AppState>) -> Json<Value> {
    let bill = state.bill.lock().await;
    let body = json!({ "persons": bill.persons() });
    Json(body)
}

pub async fn remove_person(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult {
    let Json(body) = payload?;
    let name = string_field(&body, "name", "Name is required")?;

    let mut bill = state.bill.lock().await;
    let body = json!({ "persons": bill.remove_person(&name) });
    Ok(Json(body))
}

// ── Items ─────────────────────────────────────────────────────────────────────

pub async fn get_items(State(state): State<AppState>) -> Json<Value> {
    let bill = state.bill.lock().await;
    let body = json!({ "items": bill.items() });
    Json(body)
}

pub async fn add_item(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult {
    let Json(body) = payload?;
    let name = normalize_name(&string_field(&body, "name", "Name is required")?);
    let price = price_field(&body)?;
    let quantity = match body.get("quantity") {
        None | Some(Value::Null) => 1,
        Some(v) => v
            .as_u64()
            .and_then(|q| u32::try_from(q).ok())
            .ok_or_else(|| ApiError::Input("Quantity must be a positive integer".into()))?,
    };

    let item = Item::new(name, price, quantity)?;
    let mut bill = state.bill.lock().await;
    let body = json!({ "items": bill.push_item(item) });
    Ok(Json(body))
}

pub async fn remove_item(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult {
    let Json(body) = payload?;
    let index = index_field(&body)?;

    let mut bill = state.bill.lock().await;
    bill.remove_item(index)?;
    let body = json!({ "items": bill.items() });
    Ok(Json(body))
}

pub async fn assign_item(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult {
    let Json(body) = payload?;
    if body.get("itemIndex").is_none() || body.get("selectedPersons").is_none() {
        return Err(ApiError::Input("Missing required fields".into()));
    }
    let index = index_field(&body)?;
    let selected = body
        .get("selectedPersons")
        .and_then(Value::as_array)
        .and_then(|persons| {
            persons
                .iter()
                .map(|p| p.as_str().map(str::to_string))
                .collect::<Option<Vec<String>>>()
        })
        .ok_or_else(|| ApiError::Input("selectedPersons must be a list of names".into()))?;

    let mut bill = state.bill.lock().await;
    let item = bill.assign_item(index, selected)?;
    let body = json!({ "status": "success", "item": item });
    Ok(Json(body))
}

pub async fn split_summary(State(state): State<AppState>) -> ApiResult {
    let bill = state.bill.lock().await;
    let body = json!({ "shares": bill.split_summary()? });
    Ok(Json(body))
}

// ── Field helpers ─────────────────────────────────────────────────────────────

fn string_field(body: &Value, field: &str, missing: &str) -> Result<String, ApiError> {
    match body.get(field) {
        None | Some(Value::Null) => Err(ApiError::Input(missing.to_string())),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(ApiError::Input(format!("{field} must be a string"))),
    }
}

fn price_field(body: &Value) -> Result<Money, ApiError> {
    let raw = match body.get("price") {
        None | Some(Value::Null) => return Err(ApiError::Input("Price is required".into())),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(_) => return Err(ApiError::Input("price must be a number or string".into())),
    };
    Money::parse(&raw).ok_or_else(|| ApiError::Input(format!("Invalid price '{raw}'")))
}

fn index_field(body: &Value) -> Result<i64, ApiError> {
    match body.get("itemIndex") {
        None | Some(Value::Null) => Err(ApiError::Input("Missing required fields".into())),
        Some(v) => v
            .as_i64()
            .ok_or_else(|| ApiError::Input("itemIndex must be an integer".into())),
    }
}
