//! Blog handlers.
//!
//! Management routes need `blog:manage` and see drafts. The public routes
//! need no token and only ever return published posts.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use cafe_core::validation::{validate_slug, validate_text};
use cafe_core::{Permission, PostStatus, ValidationError, ValidationErrors};
use cafe_db::{NewPost, PostUpdate};
use serde::Deserialize;
use tracing::info;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::response::{created, done, ok, with_message, ApiJson, ApiQuery};
use crate::routes::non_blank;
use crate::AppState;

const MAX_TAGS: usize = 20;
const MAX_CONTENT_CHARS: usize = 50_000;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/blog", get(list_all).post(create))
        .route(
            "/api/blog/{id}",
            get(get_by_id).put(update).delete(delete),
        )
        .route("/api/blog/{id}/publish", post(publish))
        .route("/api/blog/{id}/unpublish", post(unpublish))
        .route("/api/public/blog", get(list_published))
        .route("/api/public/blog/{slug}", get(get_published))
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub status: PostStatus,
}

impl CreatePostRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(validate_text("title", &self.title, 1, 200));
        if let Some(slug) = self.slug.as_deref().filter(|s| !s.trim().is_empty()) {
            errors.check(validate_slug(slug.trim()));
        }
        validate_body(
            self.excerpt.as_deref(),
            Some(&self.content),
            Some(&self.tags),
            &mut errors,
        );
        errors.into_result()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl UpdatePostRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(title) = &self.title {
            errors.check(validate_text("title", title, 1, 200));
        }
        if let Some(slug) = &self.slug {
            errors.check(validate_slug(slug.trim()));
        }
        validate_body(
            self.excerpt.as_deref(),
            self.content.as_deref(),
            self.tags.as_deref(),
            &mut errors,
        );
        errors.into_result()
    }
}

fn validate_body(
    excerpt: Option<&str>,
    content: Option<&str>,
    tags: Option<&[String]>,
    errors: &mut ValidationErrors,
) {
    if let Some(excerpt) = excerpt {
        errors.check(validate_text("excerpt", excerpt, 0, 500));
    }
    if let Some(content) = content {
        errors.check(validate_text("content", content, 1, MAX_CONTENT_CHARS));
    }
    if let Some(tags) = tags {
        if tags.len() > MAX_TAGS {
            errors.push(ValidationError::OutOfRange {
                field: "tags".to_string(),
                min: 0,
                max: MAX_TAGS as i64,
            });
        }
        for (i, tag) in tags.iter().enumerate() {
            if let Err(err) = validate_text("tag", tag, 1, 50) {
                errors.push(err.within(&format!("tags[{}]", i)));
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TagQuery {
    pub tag: Option<String>,
}

// =============================================================================
// Management
// =============================================================================

/// POST /api/blog
async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(req): ApiJson<CreatePostRequest>,
) -> ApiResult<impl IntoResponse> {
    user.require(Permission::BlogManage)?;
    req.validate()?;

    let post = state
        .db
        .blog()
        .insert(
            &user.id,
            NewPost {
                title: req.title,
                slug: non_blank(req.slug),
                excerpt: non_blank(req.excerpt),
                content: req.content,
                tags: req.tags,
                status: req.status,
            },
        )
        .await?;

    info!(post_id = %post.id, slug = %post.slug, "Created blog post");
    Ok(created("Post created", post))
}

/// GET /api/blog - drafts included
async fn list_all(State(state): State<AppState>, user: CurrentUser) -> ApiResult<impl IntoResponse> {
    user.require(Permission::BlogManage)?;
    let posts = state.db.blog().list_all().await?;
    Ok(ok(posts))
}

/// GET /api/blog/{id}
async fn get_by_id(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    user.require(Permission::BlogManage)?;
    let post = state.db.blog().find(&id).await?;
    Ok(ok(post))
}

/// PUT /api/blog/{id}
async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdatePostRequest>,
) -> ApiResult<impl IntoResponse> {
    user.require(Permission::BlogManage)?;
    req.validate()?;

    let post = state
        .db
        .blog()
        .update(
            &id,
            PostUpdate {
                title: req.title,
                slug: req.slug,
                excerpt: req.excerpt,
                content: req.content,
                tags: req.tags,
            },
        )
        .await?;

    Ok(with_message("Post updated", post))
}

/// DELETE /api/blog/{id}
async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    user.require(Permission::BlogManage)?;
    state.db.blog().delete(&id).await?;

    info!(post_id = %id, "Deleted blog post");
    Ok(done("Post deleted"))
}

/// POST /api/blog/{id}/publish
async fn publish(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    user.require(Permission::BlogManage)?;
    let post = state
        .db
        .blog()
        .set_status(&id, PostStatus::Published)
        .await?;

    info!(post_id = %id, "Published blog post");
    Ok(with_message("Post published", post))
}

/// POST /api/blog/{id}/unpublish
async fn unpublish(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    user.require(Permission::BlogManage)?;
    let post = state.db.blog().set_status(&id, PostStatus::Draft).await?;
    Ok(with_message("Post unpublished", post))
}

// =============================================================================
// Public
// =============================================================================

/// GET /api/public/blog?tag=
async fn list_published(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<TagQuery>,
) -> ApiResult<impl IntoResponse> {
    let tag = non_blank(query.tag);
    let posts = state.db.blog().list_published(tag.as_deref()).await?;
    Ok(ok(posts))
}

/// GET /api/public/blog/{slug}
async fn get_published(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let post = state.db.blog().find_published(&slug).await?;
    Ok(ok(post))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_validation() {
        let req = CreatePostRequest {
            title: "Opening hours".to_string(),
            slug: Some("Bad Slug".to_string()),
            excerpt: None,
            content: "We open at 7".to_string(),
            tags: vec!["news".to_string(), String::new()],
            status: PostStatus::Draft,
        };
        let errors = req.validate().unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field().to_string()).collect();
        assert_eq!(fields, vec!["slug", "tags[1].tag"]);
    }

    #[test]
    fn test_blank_slug_is_derived() {
        let req: CreatePostRequest =
            serde_json::from_str(r#"{"title": "Hello", "slug": "  ", "content": "Hi"}"#).unwrap();
        assert!(req.validate().is_ok());
        assert_eq!(req.status, PostStatus::Draft);
    }
}
