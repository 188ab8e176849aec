//! API route handlers

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use super::server::SharedState;
use crate::auth::middleware::{clear_remember_cookie, remember_cookie};
use crate::auth::{CurrentUser, MaybeUser};
use crate::error::{Error, ErrorKind};
use crate::models::{Gallery, Image, User};

/// Login failures never say whether the email or the password was wrong
pub const INVALID_LOGIN: &str = "Invalid email or password";

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotForm {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetForm {
    pub token: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct GalleryForm {
    pub title: String,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ImageView {
    pub filename: String,
    pub url: String,
}

impl From<Image> for ImageView {
    fn from(image: Image) -> Self {
        Self {
            url: image.url_path(),
            filename: image.filename,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GalleryView {
    #[serde(flatten)]
    pub gallery: Gallery,
    pub images: Vec<ImageView>,
    /// Whether the requesting user owns the gallery
    pub editable: bool,
}

#[derive(Debug, Serialize)]
pub struct ResetInitiated {
    pub message: String,
    /// Only filled in outside production, where no mail is sent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match (&self, self.kind()) {
            (Error::Forbidden, _) => StatusCode::FORBIDDEN,
            (_, ErrorKind::Validation) => StatusCode::BAD_REQUEST,
            (_, ErrorKind::Authentication) => StatusCode::UNAUTHORIZED,
            (_, ErrorKind::NotFound) => StatusCode::NOT_FOUND,
            (_, ErrorKind::Storage | ErrorKind::Internal) => {
                tracing::error!("Request failed: {}", self);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(ApiResponse::<()>::err(self.public_message()))).into_response()
    }
}

async fn gallery_view(
    state: &SharedState,
    gallery: Gallery,
    viewer: Option<&User>,
) -> Result<GalleryView, Error> {
    let images = state.services.image.by_gallery_id(gallery.id).await?;
    let editable = viewer.is_some_and(|user| user.id == gallery.user_id);
    Ok(GalleryView {
        gallery,
        images: images.into_iter().map(ImageView::from).collect(),
        editable,
    })
}

/// The gallery with `id`, provided `user` owns it
async fn owned_gallery(state: &SharedState, id: i64, user: &User) -> Result<Gallery, Error> {
    let gallery = state.services.gallery.by_id(id).await?;
    if gallery.user_id != user.id {
        tracing::warn!(gallery_id = id, user_id = user.id, "Gallery access denied");
        return Err(Error::Forbidden);
    }
    Ok(gallery)
}

fn signed_in(status: StatusCode, remember: &str, user: User) -> Response {
    (
        status,
        [(header::SET_COOKIE, remember_cookie(remember))],
        Json(ApiResponse::ok(user)),
    )
        .into_response()
}

// Health check

pub async fn health() -> impl IntoResponse {
    Json(ApiResponse::ok("healthy"))
}

// Account routes

pub async fn signup(
    State(state): State<SharedState>,
    Json(form): Json<SignupForm>,
) -> Result<Response, Error> {
    let mut user = User::new(form.name, form.email, form.password);
    let remember = state.services.user.create(&mut user).await?;
    Ok(signed_in(StatusCode::CREATED, &remember, user))
}

pub async fn login(
    State(state): State<SharedState>,
    Json(form): Json<LoginForm>,
) -> Result<Response, Error> {
    let users = &state.services.user;
    let mut user = match users.authenticate(&form.email, &form.password).await {
        Ok(user) => user,
        Err(Error::NotFound | Error::PasswordIncorrect) => {
            return Ok((
                StatusCode::UNAUTHORIZED,
                Json(ApiResponse::<()>::err(INVALID_LOGIN)),
            )
                .into_response());
        }
        Err(e) => return Err(e),
    };

    let remember = users.issue_remember_token(&mut user).await?;
    tracing::info!(user_id = user.id, "User logged in");
    Ok(signed_in(StatusCode::OK, &remember, user))
}

pub async fn logout(
    State(state): State<SharedState>,
    CurrentUser(mut user): CurrentUser,
) -> Result<Response, Error> {
    // Rotating the token invalidates the cookie on every device
    state.services.user.issue_remember_token(&mut user).await?;
    tracing::info!(user_id = user.id, "User logged out");
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, clear_remember_cookie())],
        Json(ApiResponse::ok("logged out")),
    )
        .into_response())
}

pub async fn me(CurrentUser(user): CurrentUser) -> impl IntoResponse {
    Json(ApiResponse::ok(user))
}

pub async fn forgot_password(
    State(state): State<SharedState>,
    Json(form): Json<ForgotForm>,
) -> Result<Response, Error> {
    let token = match state.services.user.initiate_reset(&form.email).await {
        Ok(token) => Some(token),
        // Same answer for unknown addresses
        Err(Error::NotFound) => None,
        Err(e) => return Err(e),
    };

    let body = ResetInitiated {
        message: "Instructions for resetting your password have been sent".to_string(),
        token: token.filter(|_| !state.config.server.is_prod()),
    };
    Ok((StatusCode::ACCEPTED, Json(ApiResponse::ok(body))).into_response())
}

pub async fn reset_password(
    State(state): State<SharedState>,
    Json(form): Json<ResetForm>,
) -> Result<Response, Error> {
    let users = &state.services.user;
    let mut user = users.complete_reset(&form.token, &form.password).await?;
    let remember = users.issue_remember_token(&mut user).await?;
    Ok(signed_in(StatusCode::OK, &remember, user))
}

// Gallery routes

pub async fn list_galleries(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
) -> Result<Response, Error> {
    let galleries = state.services.gallery.by_user_id(user.id).await?;
    let mut views = Vec::with_capacity(galleries.len());
    for gallery in galleries {
        views.push(gallery_view(&state, gallery, Some(&user)).await?);
    }
    Ok((StatusCode::OK, Json(ApiResponse::ok(views))).into_response())
}

pub async fn create_gallery(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Json(form): Json<GalleryForm>,
) -> Result<Response, Error> {
    let mut gallery = Gallery::new(user.id, form.title);
    state.services.gallery.create(&mut gallery).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(gallery))).into_response())
}

pub async fn show_gallery(
    State(state): State<SharedState>,
    MaybeUser(viewer): MaybeUser,
    Path(id): Path<i64>,
) -> Result<Response, Error> {
    let gallery = state.services.gallery.by_id(id).await?;
    let view = gallery_view(&state, gallery, viewer.as_ref()).await?;
    Ok((StatusCode::OK, Json(ApiResponse::ok(view))).into_response())
}

pub async fn update_gallery(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(form): Json<GalleryForm>,
) -> Result<Response, Error> {
    let mut gallery = owned_gallery(&state, id, &user).await?;
    gallery.title = form.title;
    state.services.gallery.update(&mut gallery).await?;
    Ok((StatusCode::OK, Json(ApiResponse::ok(gallery))).into_response())
}

pub async fn delete_gallery(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Response, Error> {
    let gallery = owned_gallery(&state, id, &user).await?;
    state.services.gallery.delete(gallery.id).await?;
    state.services.image.delete_all(gallery.id).await?;
    Ok((StatusCode::OK, Json(ApiResponse::ok("deleted"))).into_response())
}

// Image routes

pub async fn upload_image(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path((id, filename)): Path<(i64, String)>,
    body: Bytes,
) -> Result<Response, Error> {
    let gallery = owned_gallery(&state, id, &user).await?;
    let image = state
        .services
        .image
        .create(gallery.id, &body[..], &filename)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(ImageView::from(image)))).into_response())
}

pub async fn delete_image(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path((id, filename)): Path<(i64, String)>,
) -> Result<Response, Error> {
    let gallery = owned_gallery(&state, id, &user).await?;
    let image = Image {
        gallery_id: gallery.id,
        filename,
    };
    state.services.image.delete(&image).await?;
    Ok((StatusCode::OK, Json(ApiResponse::ok("deleted"))).into_response())
}
