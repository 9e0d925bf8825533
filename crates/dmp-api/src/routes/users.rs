//! # Users API
//!
//! Account creation and password authentication. Passwords are stored as
//! salted SHA-256 digests and never returned.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use dmp_core::payload::strip_whitespace_from_data;
use dmp_core::{AuditType, SupplierId, Timestamp, UserId, UserRole};
use dmp_schema::SchemaName;
use serde::Serialize;
use serde_json::{json, Map, Value};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::{check_format, extract_object, object_field};
use crate::password::PasswordHash;
use crate::routes::parse_id;
use crate::state::{AppState, UserRecord};

/// A user account as returned to clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: i64,
    pub email_address: String,
    pub name: String,
    pub role: String,
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplier: Option<UserSupplier>,
    pub created_at: String,
    pub updated_at: String,
    pub password_changed_at: String,
    pub logged_in_at: Option<String>,
}

/// The supplier a supplier-role account belongs to.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserSupplier {
    pub supplier_id: i64,
    pub name: Option<String>,
}

/// `{"users": {...}}`.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub users: UserView,
}

fn user_view(state: &AppState, user: &UserRecord) -> UserView {
    UserView {
        id: user.id.get(),
        email_address: user.email_address.clone(),
        name: user.name.clone(),
        role: user.role.as_str().to_string(),
        active: user.active,
        supplier: user.supplier_id.map(|id| UserSupplier {
            supplier_id: id.get(),
            name: state.suppliers.get(&id).map(|s| s.name),
        }),
        created_at: user.created_at.to_wire(),
        updated_at: user.updated_at.to_wire(),
        password_changed_at: user.password_changed_at.to_wire(),
        logged_in_at: user.logged_in_at.map(|t| t.to_wire()),
    }
}

/// Build the users router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", post(create_user))
        .route("/users/{id}", get(get_user))
        .route("/users/auth", post(auth_user))
}

fn string_field(data: &Map<String, Value>, key: &str) -> Result<String, AppError> {
    data.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| AppError::BadRequest(format!("'{key}' must be a string")))
}

/// POST /users — Create an account.
///
/// Email addresses are stored lower-cased and must be unique. A supplier
/// account must name an existing supplier; other roles have no supplier.
#[utoipa::path(
    post,
    path = "/users",
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Invalid user", body = crate::error::ErrorBody),
        (status = 409, description = "Email already registered", body = crate::error::ErrorBody),
    ),
    tag = "users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let body = extract_object(body)?;
    let mut data = object_field(&body, "users")?;
    strip_whitespace_from_data(&mut data);
    check_format(&state.registry, SchemaName::Users, &data)?;

    let email = string_field(&data, "emailAddress")?.to_lowercase();
    let role: UserRole = string_field(&data, "role")?.parse()?;
    let supplier_id = match role {
        UserRole::Supplier => {
            let id = data
                .get("supplierId")
                .and_then(Value::as_i64)
                .map(SupplierId)
                .ok_or_else(|| {
                    AppError::BadRequest("No supplier id provided for supplier user".to_string())
                })?;
            if !state.suppliers.contains(&id) {
                return Err(AppError::BadRequest(format!("Invalid supplier id: {id}")));
            }
            Some(id)
        }
        _ => None,
    };

    if state.users.find(|u| u.email_address == email).is_some() {
        return Err(AppError::Conflict(format!("Username already exists: {email}")));
    }

    let now = Timestamp::now();
    let user = UserRecord {
        id: UserId(state.user_ids.next_id()),
        email_address: email,
        name: string_field(&data, "name")?,
        role,
        supplier_id,
        password: PasswordHash::new(&string_field(&data, "password")?),
        active: true,
        created_at: now,
        updated_at: now,
        password_changed_at: now,
        logged_in_at: None,
    };
    state.users.insert(user.id, user.clone());

    state
        .record_audit(
            AuditType::CreateUser,
            &user.email_address,
            json!({"user": {"emailAddress": user.email_address, "role": role}}),
            Some((UserId::LABEL, user.id.to_string())),
        )
        .await;
    tracing::info!(user_id = %user.id, role = %role, "user created");

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            users: user_view(&state, &user),
        }),
    ))
}

/// GET /users/{id}
#[utoipa::path(
    get,
    path = "/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = UserResponse),
        (status = 404, description = "Unknown user", body = crate::error::ErrorBody),
    ),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    let id: UserId = parse_id(&raw_id, "user")?;
    let user = state
        .users
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("user {id} not found")))?;
    Ok(Json(UserResponse {
        users: user_view(&state, &user),
    }))
}

/// POST /users/auth — Check an email address and password.
///
/// A successful check records the login time.
#[utoipa::path(
    post,
    path = "/users/auth",
    responses(
        (status = 200, description = "Authenticated user", body = UserResponse),
        (status = 403, description = "Wrong password or inactive account", body = crate::error::ErrorBody),
        (status = 404, description = "Unknown user", body = crate::error::ErrorBody),
    ),
    tag = "users"
)]
pub async fn auth_user(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<UserResponse>, AppError> {
    let body = extract_object(body)?;
    let data = object_field(&body, "authUsers")?;
    check_format(&state.registry, SchemaName::UsersAuth, &data)?;

    let email = string_field(&data, "emailAddress")?.to_lowercase();
    let password = string_field(&data, "password")?;
    let user = state
        .users
        .find(|u| u.email_address == email)
        .ok_or_else(|| AppError::NotFound("user not found".to_string()))?;

    if !user.active || !user.password.verify(&password) {
        tracing::warn!(user_id = %user.id, "failed login");
        return Err(AppError::Forbidden("invalid email address or password".to_string()));
    }

    let user = state
        .users
        .update(&user.id, |u| u.logged_in_at = Some(Timestamp::now()))
        .ok_or_else(|| AppError::NotFound("user not found".to_string()))?;

    Ok(Json(UserResponse {
        users: user_view(&state, &user),
    }))
}
