//! Request handlers for the `/student` resource.
//!
//! Each handler parses its input, runs the store call on the blocking pool
//! and maps failures through [`ApiError`]. Every failure is logged with the
//! route that produced it.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use tracing::{error, info};

use super::error::ApiError;
use crate::error::{Error, Result, ValidationError};
use crate::storage::Storage;
use crate::student::{NewStudent, Student, StudentId, StudentPatch};

type ApiResult<T> = std::result::Result<T, ApiError>;

/// Run a store call on the blocking thread pool.
async fn blocking<T, F>(storage: &Storage, f: F) -> Result<T>
where
    F: FnOnce(&Storage) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let storage = storage.clone();
    tokio::task::spawn_blocking(move || f(&storage))
        .await
        .map_err(|e| Error::internal(format!("task join error: {e}")))?
}

/// Log a failure and convert it to its wire form.
fn reject(route: &str, err: Error) -> ApiError {
    error!(route, error = %err, "request failed");
    ApiError::from(err)
}

type IdPath = std::result::Result<Path<String>, PathRejection>;

/// Resolve the path id, reporting undecodable segments as `invalid_id`.
fn parse_id(method: &str, path: IdPath) -> ApiResult<(String, StudentId)> {
    match path {
        Ok(Path(raw)) => {
            let route = format!("{method} /student/{raw}");
            let id = StudentId::parse(&raw).map_err(|e| reject(&route, e))?;
            Ok((route, id))
        }
        Err(rejection) => Err(reject(
            &format!("{method} /student/:id"),
            Error::InvalidId(rejection.body_text()),
        )),
    }
}

/// Unwrap a JSON body, reporting malformed input as a validation error.
fn body<T>(route: &str, payload: std::result::Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| reject(route, ValidationError::body(rejection.body_text()).into()))
}

/// `GET /student`: list all students, newest first.
pub async fn list_students(State(storage): State<Storage>) -> ApiResult<Json<Vec<Student>>> {
    let students = blocking(&storage, Storage::list)
        .await
        .map_err(|e| reject("GET /student", e))?;
    Ok(Json(students))
}

/// `GET /student/:id`: fetch a single student.
pub async fn get_student(
    State(storage): State<Storage>,
    path: IdPath,
) -> ApiResult<Json<Student>> {
    let (route, id) = parse_id("GET", path)?;

    blocking(&storage, move |s| s.get(&id))
        .await
        .and_then(|found| found.ok_or_else(|| Error::not_found(id)))
        .map(Json)
        .map_err(|e| reject(&route, e))
}

/// `POST /student`: create a student.
pub async fn create_student(
    State(storage): State<Storage>,
    payload: std::result::Result<Json<NewStudent>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Student>)> {
    let route = "POST /student";
    let fields = body(route, payload)?
        .validate()
        .map_err(|e| reject(route, e.into()))?;

    let created = blocking(&storage, move |s| s.insert(fields))
        .await
        .map_err(|e| reject(route, e))?;

    info!(id = %created.id, "created student");
    Ok((StatusCode::CREATED, Json(created)))
}

/// `PATCH /student/:id`: update the supplied fields of a student.
pub async fn update_student(
    State(storage): State<Storage>,
    path: IdPath,
    payload: std::result::Result<Json<StudentPatch>, JsonRejection>,
) -> ApiResult<Json<Student>> {
    let (route, id) = parse_id("PATCH", path)?;
    let patch = body(&route, payload)?
        .validate()
        .map_err(|e| reject(&route, e.into()))?;

    let updated = blocking(&storage, move |s| s.update(&id, &patch))
        .await
        .and_then(|found| found.ok_or_else(|| Error::not_found(id)))
        .map_err(|e| reject(&route, e))?;

    info!(id = %updated.id, "updated student");
    Ok(Json(updated))
}

/// `DELETE /student/:id`: hard-delete a student.
pub async fn delete_student(
    State(storage): State<Storage>,
    path: IdPath,
) -> ApiResult<Json<Value>> {
    let (route, id) = parse_id("DELETE", path)?;

    let deleted = blocking(&storage, move |s| s.delete(&id))
        .await
        .map_err(|e| reject(&route, e))?;
    if !deleted {
        return Err(reject(&route, Error::not_found(id)));
    }

    info!(%id, "deleted student");
    Ok(Json(json!({ "ok": true })))
}

/// `GET /health`: report whether the store answers.
pub async fn health(State(storage): State<Storage>) -> ApiResult<Json<Value>> {
    blocking(&storage, Storage::ping)
        .await
        .map_err(|e| reject("GET /health", e))?;
    Ok(Json(json!({ "ok": true })))
}
