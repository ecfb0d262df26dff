//! # Blog Repository
//!
//! Blog posts are site content, not cafe data: they carry an author but are
//! not scoped by owner, and slugs are unique across the whole table.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{from_json, generate_id, to_json};
use cafe_core::types::slugify;
use cafe_core::{BlogPost, PostStatus};

const POST_COLUMNS: &str = "id, author_id, title, slug, excerpt, content, tags, status, \
     published_at, created_at, updated_at";

#[derive(Debug, FromRow)]
struct PostRow {
    id: String,
    author_id: String,
    title: String,
    slug: String,
    excerpt: Option<String>,
    content: String,
    tags: String,
    status: PostStatus,
    published_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PostRow> for BlogPost {
    type Error = DbError;

    fn try_from(row: PostRow) -> DbResult<Self> {
        Ok(BlogPost {
            id: row.id,
            author_id: row.author_id,
            title: row.title,
            slug: row.slug,
            excerpt: row.excerpt,
            content: row.content,
            tags: from_json(&row.tags)?,
            status: row.status,
            published_at: row.published_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Fields for a new post. The slug is derived from the title when absent.
#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub title: String,
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub content: String,
    pub tags: Vec<String>,
    pub status: PostStatus,
}

/// Partial update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct PostUpdate {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Repository for blog posts.
#[derive(Debug, Clone)]
pub struct BlogRepository {
    pool: SqlitePool,
}

impl BlogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        BlogRepository { pool }
    }

    /// Creates a post.
    ///
    /// ## Errors
    /// `UniqueViolation` on `slug` when another post already uses it.
    pub async fn insert(&self, author_id: &str, new: NewPost) -> DbResult<BlogPost> {
        let now = Utc::now();
        let slug = match new.slug {
            Some(slug) if !slug.trim().is_empty() => slug.trim().to_string(),
            _ => slugify(&new.title),
        };
        let published_at = (new.status == PostStatus::Published).then_some(now);

        let post = BlogPost {
            id: generate_id(),
            author_id: author_id.to_string(),
            title: new.title.trim().to_string(),
            slug,
            excerpt: new.excerpt,
            content: new.content,
            tags: normalize_tags(new.tags),
            status: new.status,
            published_at,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %post.id, slug = %post.slug, "Inserting blog post");

        sqlx::query(
            r#"
            INSERT INTO blog_posts (
                id, author_id, title, slug, excerpt, content, tags, status,
                published_at, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&post.id)
        .bind(&post.author_id)
        .bind(&post.title)
        .bind(&post.slug)
        .bind(&post.excerpt)
        .bind(&post.content)
        .bind(to_json(&post.tags)?)
        .bind(post.status)
        .bind(post.published_at)
        .bind(post.created_at)
        .bind(post.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from(e).with_duplicate_value(&post.slug))?;

        Ok(post)
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<BlogPost>> {
        let sql = format!("SELECT {} FROM blog_posts WHERE id = ?1", POST_COLUMNS);
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(BlogPost::try_from).transpose()
    }

    pub async fn find(&self, id: &str) -> DbResult<BlogPost> {
        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("BlogPost", id))
    }

    /// A published post by slug. Drafts are invisible here.
    pub async fn find_published(&self, slug: &str) -> DbResult<BlogPost> {
        let sql = format!(
            "SELECT {} FROM blog_posts WHERE slug = ?1 AND status = 'published'",
            POST_COLUMNS
        );
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

        row.map(BlogPost::try_from)
            .transpose()?
            .ok_or_else(|| DbError::not_found("BlogPost", slug))
    }

    /// Every post, drafts included, most recently edited first.
    pub async fn list_all(&self) -> DbResult<Vec<BlogPost>> {
        let sql = format!(
            "SELECT {} FROM blog_posts ORDER BY updated_at DESC",
            POST_COLUMNS
        );
        let rows = sqlx::query_as::<_, PostRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(BlogPost::try_from).collect()
    }

    /// Published posts, newest first, optionally carrying a tag.
    pub async fn list_published(&self, tag: Option<&str>) -> DbResult<Vec<BlogPost>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM blog_posts
            WHERE status = 'published'
              AND (?1 IS NULL OR EXISTS (
                    SELECT 1 FROM json_each(blog_posts.tags) WHERE json_each.value = ?1
                  ))
            ORDER BY published_at DESC
            "#,
            POST_COLUMNS
        );
        let tag = tag.map(|t| t.trim().to_lowercase());
        let rows = sqlx::query_as::<_, PostRow>(&sql)
            .bind(tag)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(BlogPost::try_from).collect()
    }

    /// Applies a partial update.
    pub async fn update(&self, id: &str, changes: PostUpdate) -> DbResult<BlogPost> {
        let mut post = self.find(id).await?;

        if let Some(title) = changes.title {
            post.title = title.trim().to_string();
        }
        if let Some(slug) = changes.slug {
            post.slug = slug.trim().to_string();
        }
        if let Some(excerpt) = changes.excerpt {
            post.excerpt = Some(excerpt);
        }
        if let Some(content) = changes.content {
            post.content = content;
        }
        if let Some(tags) = changes.tags {
            post.tags = normalize_tags(tags);
        }
        post.updated_at = Utc::now();

        sqlx::query(
            r#"
            UPDATE blog_posts SET
                title = ?2, slug = ?3, excerpt = ?4, content = ?5, tags = ?6, updated_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(&post.id)
        .bind(&post.title)
        .bind(&post.slug)
        .bind(&post.excerpt)
        .bind(&post.content)
        .bind(to_json(&post.tags)?)
        .bind(post.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from(e).with_duplicate_value(&post.slug))?;

        debug!(id, "Updated blog post");
        Ok(post)
    }

    /// Publishes or unpublishes a post.
    ///
    /// Publishing stamps `published_at`; unpublishing clears it.
    pub async fn set_status(&self, id: &str, status: PostStatus) -> DbResult<BlogPost> {
        let mut post = self.find(id).await?;
        let now = Utc::now();

        post.published_at = match status {
            PostStatus::Published => post.published_at.or(Some(now)),
            PostStatus::Draft => None,
        };
        post.status = status;
        post.updated_at = now;

        sqlx::query(
            "UPDATE blog_posts SET status = ?2, published_at = ?3, updated_at = ?4 WHERE id = ?1",
        )
        .bind(&post.id)
        .bind(post.status)
        .bind(post.published_at)
        .bind(post.updated_at)
        .execute(&self.pool)
        .await?;

        debug!(id, status = ?post.status, "Changed blog post status");
        Ok(post)
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM blog_posts WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("BlogPost", id));
        }
        Ok(())
    }
}

/// Lowercased, trimmed, deduplicated, empties dropped.
fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}
