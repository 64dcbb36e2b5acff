use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        DefaultBodyLimit, Multipart, Path, Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::instrument;
use uuid::Uuid;

use super::services::{self, FilePart, UploadForm, UploadedImage};
use super::{repo, ClinicImage};
use crate::{
    auth::extractors::AuthUser,
    clinics,
    error::{AppError, AppResult},
    pagination::Data,
    state::AppState,
};

pub fn image_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/clinics/:id/images",
            get(list_images).post(upload_image).delete(delete_image),
        )
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024)) // 20MB
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteImageQuery {
    #[serde(default, deserialize_with = "crate::validation::blank_as_none")]
    pub image_id: Option<Uuid>,
}

#[instrument(skip(state))]
pub async fn list_images(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Json<Data<Vec<ClinicImage>>>> {
    let clinic_id = clinics::clinic_id(path)?;
    if clinics::repo::activity(&state.db, clinic_id).await?.is_none() {
        return Err(AppError::not_found("Clinic not found"));
    }
    let data = repo::list_for_clinic(&state.db, clinic_id).await?;
    Ok(Json(Data { data }))
}

/// POST /clinics/:id/images (multipart: file, type, order)
#[instrument(skip(state, mp))]
pub async fn upload_image(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
    mp: Multipart,
) -> AppResult<(StatusCode, Json<Data<UploadedImage>>)> {
    let media = state
        .media
        .clone()
        .ok_or_else(|| AppError::Upstream("media host is not configured".into()))?;
    let clinic_id = clinics::clinic_id(path)?;
    if clinics::repo::activity(&state.db, clinic_id).await?.is_none() {
        return Err(AppError::not_found("Clinic not found"));
    }

    let item = services::validate_upload(read_form(mp).await?)?;
    let uploaded = services::upload_and_link_image(&state.db, media.as_ref(), clinic_id, item).await?;
    tracing::debug!(%user_id, image_id = %uploaded.image.id, "upload accepted");
    Ok((StatusCode::CREATED, Json(Data { data: uploaded })))
}

async fn read_form(mut mp: Multipart) -> AppResult<UploadForm> {
    let mut form = UploadForm::default();
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| AppError::validation(e.body_text()))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let content_type = field
                    .content_type()
                    .map(str::to_string)
                    .unwrap_or_else(|| "application/octet-stream".into());
                let body = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::validation(e.body_text()))?;
                form.file = Some(FilePart { body, content_type });
            }
            Some("type") => {
                form.kind = Some(field.text().await.map_err(|e| AppError::validation(e.body_text()))?)
            }
            Some("order") => {
                form.order = Some(field.text().await.map_err(|e| AppError::validation(e.body_text()))?)
            }
            _ => {}
        }
    }
    Ok(form)
}

/// DELETE /clinics/:id/images?imageId=
#[instrument(skip(state))]
pub async fn delete_image(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
    query: Result<Query<DeleteImageQuery>, QueryRejection>,
) -> AppResult<Json<Value>> {
    let clinic_id = clinics::clinic_id(path)?;
    let Query(q) = query?;
    let image_id = q
        .image_id
        .ok_or_else(|| AppError::validation("imageId is required"))?;
    services::delete_clinic_image(&state.db, state.media.as_deref(), clinic_id, image_id).await?;
    Ok(Json(json!({ "message": "Image deleted successfully" })))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request};
    use tower::ServiceExt;

    use super::*;
    use crate::auth::repo::create_session;
    use crate::storage::MediaHost;
    use crate::testing::{PgTestContext, RecordingMedia, FAKE_MEDIA_BASE};

    const BOUNDARY: &str = "----clinic-test-boundary";

    fn multipart_body(content_type: &str, size: usize, kind: &str, order: &str) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"a\"\r\n\
                 Content-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend(std::iter::repeat(0u8).take(size));
        body.extend_from_slice(
            format!(
                "\r\n--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"type\"\r\n\r\n{kind}\r\n\
                 --{BOUNDARY}\r\nContent-Disposition: form-data; name=\"order\"\r\n\r\n{order}\r\n\
                 --{BOUNDARY}--\r\n"
            )
            .as_bytes(),
        );
        body
    }

    fn upload_request(clinic: Uuid, token: &str, body: Vec<u8>) -> Request<Body> {
        Request::post(format!("/clinics/{clinic}/images"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_json(res: axum::response::Response) -> Value {
        let bytes = http_body_util::BodyExt::collect(res.into_body())
            .await
            .unwrap()
            .to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn upload_requires_session() {
        let res = image_routes()
            .with_state(AppState::fake())
            .oneshot(
                Request::post(format!("/clinics/{}/images", Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn upload_validation_and_delete_flow() {
        let Some(ctx) = PgTestContext::new().await else {
            return;
        };
        let db = ctx.db.clone();
        let user: Uuid =
            sqlx::query_scalar("INSERT INTO users (email) VALUES ('admin@test.local') RETURNING id")
                .fetch_one(&db)
                .await
                .unwrap();
        let clinic: Uuid = sqlx::query_scalar(
            "INSERT INTO clinics (name, address, region) VALUES ('A', 'Seoul', 'gangnam') RETURNING id",
        )
        .fetch_one(&db)
        .await
        .unwrap();
        let other_clinic: Uuid = sqlx::query_scalar(
            "INSERT INTO clinics (name, address, region) VALUES ('B', 'Seoul', 'sinsa') RETURNING id",
        )
        .fetch_one(&db)
        .await
        .unwrap();
        let token = create_session(&db, user, time::Duration::days(1))
            .await
            .unwrap()
            .session_token;

        let media = Arc::new(RecordingMedia::default());
        let app = image_routes().with_state(AppState::with_db(
            db.clone(),
            Some(media.clone() as Arc<dyn MediaHost>),
        ));

        let res = app
            .clone()
            .oneshot(upload_request(clinic, &token, multipart_body("image/png", 12 * 1024 * 1024, "main", "0")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(media.upload_count(), 0);

        let res = app
            .clone()
            .oneshot(upload_request(clinic, &token, multipart_body("image/gif", 1024, "main", "0")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(media.upload_count(), 0);

        let res = app
            .clone()
            .oneshot(upload_request(clinic, &token, multipart_body("image/png", 2 * 1024 * 1024, "interior", "4")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        assert_eq!(media.upload_count(), 1);
        let created = body_json(res).await;
        assert_eq!(created["data"]["order"], 4);
        assert_eq!(created["data"]["type"], "interior");
        assert_eq!(created["data"]["format"], "png");
        let image_id: Uuid = created["data"]["id"].as_str().unwrap().parse().unwrap();
        let stored_order: i32 = sqlx::query_scalar(r#"SELECT "order" FROM clinic_images WHERE id = $1"#)
            .bind(image_id)
            .fetch_one(&db)
            .await
            .unwrap();
        assert_eq!(stored_order, 4);

        let delete = |clinic: Uuid, query: String| {
            Request::delete(format!("/clinics/{clinic}/images{query}"))
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap()
        };

        let res = app.clone().oneshot(delete(clinic, String::new())).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = app
            .clone()
            .oneshot(delete(clinic, format!("?imageId={}", Uuid::new_v4())))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let res = app
            .clone()
            .oneshot(delete(other_clinic, format!("?imageId={image_id}")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        media
            .fail_deletes
            .store(true, std::sync::atomic::Ordering::SeqCst);
        let res = app
            .clone()
            .oneshot(delete(clinic, format!("?imageId={image_id}")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let deletes = media.deletes.lock().unwrap().clone();
        assert_eq!(deletes.len(), 1);
        assert!(created["data"]["url"]
            .as_str()
            .unwrap()
            .starts_with(FAKE_MEDIA_BASE));

        let remaining = repo::list_for_clinic(&db, clinic).await.unwrap();
        assert!(remaining.is_empty());

        ctx.cleanup().await;
    }

    #[tokio::test]
    async fn non_uuid_clinic_is_404() {
        let res = image_routes()
            .with_state(AppState::fake())
            .oneshot(Request::get("/clinics/not-a-uuid/images").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(res).await["error"], "Clinic not found");
    }
}
