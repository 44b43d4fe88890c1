//! Blog service and `/api/blogs` routes.

use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, Query, State},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use folio_shared::content::{BlogDraft, BlogPatch};
use folio_shared::markdown::MarkdownRenderer;
use folio_shared::pagination::{PageRequest, Pagination};
use folio_store::{Blog, BlogQuery, BlogSummary};

use crate::api::{lock_db, parse_id, AppState, SharedDatabase};
use crate::auth::Principal;
use crate::error::ApiError;
use crate::response::{ApiJson, ApiResponse};
use crate::upload_store::read_file_field;

const BLOG_NOT_FOUND: &str = "Blog not found";

/// A blog as served on its detail route, with the Markdown rendered.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogView {
    #[serde(flatten)]
    pub blog: Blog,
    pub content_html: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct BlogListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub search: Option<String>,
    pub tag: Option<String>,
}

impl BlogListParams {
    fn into_query(self, published_only: bool) -> BlogQuery {
        BlogQuery {
            published_only,
            page: PageRequest::parse(self.page.as_deref(), self.limit.as_deref()),
            search: self.search,
            tag: self.tag,
        }
    }
}

#[derive(Clone)]
pub struct BlogService {
    db: SharedDatabase,
    renderer: Arc<dyn MarkdownRenderer>,
}

impl BlogService {
    pub fn new(db: SharedDatabase, renderer: Arc<dyn MarkdownRenderer>) -> Self {
        Self { db, renderer }
    }

    fn list(&self, query: &BlogQuery) -> Result<(Vec<Blog>, Pagination), ApiError> {
        let (blogs, total) = lock_db(&self.db)?.list_blogs(query)?;
        Ok((blogs, query.page.summarize(total)))
    }

    /// Published blogs without their bodies.
    pub fn list_published(
        &self,
        params: BlogListParams,
    ) -> Result<(Vec<BlogSummary>, Pagination), ApiError> {
        let (blogs, pagination) = self.list(&params.into_query(true))?;
        Ok((blogs.into_iter().map(BlogSummary::from).collect(), pagination))
    }

    /// Every blog, drafts included, with bodies.
    pub fn list_all(&self, params: BlogListParams) -> Result<(Vec<Blog>, Pagination), ApiError> {
        self.list(&params.into_query(false))
    }

    /// Fetch by slug and count the view. Drafts are visible to
    /// authenticated callers only.
    pub fn read(&self, slug: &str, include_drafts: bool) -> Result<BlogView, ApiError> {
        let blog = lock_db(&self.db)?
            .record_blog_view(slug, include_drafts)
            .map_err(|e| ApiError::from_store(e, BLOG_NOT_FOUND))?;
        let content_html = self.renderer.render(&blog.content);
        Ok(BlogView { blog, content_html })
    }

    pub fn create(&self, draft: BlogDraft, author: &Principal) -> Result<Blog, ApiError> {
        draft.validate()?;
        let blog = Blog::from_draft(&draft, Some(author.user_id));

        let db = lock_db(&self.db)?;
        db.insert_blog(&blog)?;
        let stored = db.get_blog(blog.id)?;

        info!(id = %stored.id, slug = %stored.slug, "Created blog");
        Ok(stored)
    }

    pub fn update(&self, id: &str, patch: BlogPatch) -> Result<Blog, ApiError> {
        let id = parse_id(id, BLOG_NOT_FOUND)?;
        patch.validate()?;

        let db = lock_db(&self.db)?;
        let mut blog = db
            .get_blog(id)
            .map_err(|e| ApiError::from_store(e, BLOG_NOT_FOUND))?;
        blog.apply(&patch);
        if !db.update_blog(&blog)? {
            return Err(ApiError::NotFound(BLOG_NOT_FOUND.into()));
        }

        info!(id = %blog.id, slug = %blog.slug, "Updated blog");
        Ok(db.get_blog(id)?)
    }

    pub fn delete(&self, id: &str) -> Result<(), ApiError> {
        let id = parse_id(id, BLOG_NOT_FOUND)?;
        if !lock_db(&self.db)?.delete_blog(id)? {
            return Err(ApiError::NotFound(BLOG_NOT_FOUND.into()));
        }
        info!(id = %id, "Deleted blog");
        Ok(())
    }

    /// The id of an existing blog.
    pub fn existing(&self, id: &str) -> Result<Uuid, ApiError> {
        let id = parse_id(id, BLOG_NOT_FOUND)?;
        lock_db(&self.db)?
            .get_blog(id)
            .map_err(|e| ApiError::from_store(e, BLOG_NOT_FOUND))?;
        Ok(id)
    }

    pub fn set_cover(&self, id: Uuid, cover_image: String) -> Result<Blog, ApiError> {
        self.update(
            &id.to_string(),
            BlogPatch {
                cover_image: Some(cover_image),
                ..Default::default()
            },
        )
    }
}

// ─── Handlers ───

async fn list_blogs(
    State(state): State<AppState>,
    Query(params): Query<BlogListParams>,
) -> Result<ApiResponse<Vec<BlogSummary>>, ApiError> {
    let (blogs, pagination) = state.blogs.list_published(params)?;
    Ok(ApiResponse::ok(blogs).with_pagination(pagination))
}

async fn list_all_blogs(
    State(state): State<AppState>,
    _principal: Principal,
    Query(params): Query<BlogListParams>,
) -> Result<ApiResponse<Vec<Blog>>, ApiError> {
    let (blogs, pagination) = state.blogs.list_all(params)?;
    Ok(ApiResponse::ok(blogs).with_pagination(pagination))
}

async fn get_blog(
    State(state): State<AppState>,
    principal: Option<Principal>,
    Path(slug): Path<String>,
) -> Result<ApiResponse<BlogView>, ApiError> {
    let view = state.blogs.read(&slug, principal.is_some())?;
    Ok(ApiResponse::ok(view))
}

async fn create_blog(
    State(state): State<AppState>,
    principal: Principal,
    ApiJson(draft): ApiJson<BlogDraft>,
) -> Result<ApiResponse<Blog>, ApiError> {
    let blog = state.blogs.create(draft, &principal)?;
    Ok(ApiResponse::created(blog).with_message("Blog created successfully"))
}

async fn update_blog(
    State(state): State<AppState>,
    _principal: Principal,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<BlogPatch>,
) -> Result<ApiResponse<Blog>, ApiError> {
    let blog = state.blogs.update(&id, patch)?;
    Ok(ApiResponse::ok(blog).with_message("Blog updated successfully"))
}

async fn delete_blog(
    State(state): State<AppState>,
    _principal: Principal,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>, ApiError> {
    state.blogs.delete(&id)?;
    Ok(ApiResponse::message("Blog deleted successfully"))
}

async fn upload_cover(
    State(state): State<AppState>,
    _principal: Principal,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<ApiResponse<Blog>, ApiError> {
    let mut multipart = multipart?;
    let file = read_file_field(&mut multipart, "cover")
        .await?
        .ok_or_else(|| ApiError::Validation("No file uploaded".into()))?;
    state.uploads.check_image(&file)?;

    let id = state.blogs.existing(&id)?;
    let path = state.uploads.store_image("cover", &file).await?;

    let blog = state.blogs.set_cover(id, path)?;
    Ok(ApiResponse::ok(blog).with_message("Cover image uploaded successfully"))
}

/// `/api/blogs` routes. `/:id` is a slug on GET and a UUID otherwise.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_blogs).post(create_blog))
        .route("/admin/all", get(list_all_blogs))
        .route("/:id", get(get_blog).put(update_blog).delete(delete_blog))
        .route("/:id/cover", post(upload_cover))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use folio_shared::markdown::CommonMarkRenderer;
    use folio_shared::UserId;
    use folio_store::Database;

    fn service() -> (BlogService, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("blogs.db")).unwrap();
        (
            BlogService::new(Arc::new(Mutex::new(db)), Arc::new(CommonMarkRenderer)),
            dir,
        )
    }

    fn author() -> Principal {
        Principal {
            user_id: UserId::new(),
        }
    }

    fn draft(title: &str, published: bool) -> BlogDraft {
        BlogDraft {
            title: title.into(),
            content: "# Heading\n\nSome *text*".into(),
            published,
            ..Default::default()
        }
    }

    #[test]
    fn test_create_and_read_renders_markdown() {
        let (blogs, _dir) = service();
        let created = blogs.create(draft("Hello World", true), &author()).unwrap();
        assert_eq!(created.slug, "hello-world");

        let view = blogs.read("hello-world", false).unwrap();
        assert_eq!(view.blog.views, 1);
        assert!(view.content_html.contains("<h1>Heading</h1>"));
        assert!(view.content_html.contains("<em>text</em>"));

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["slug"], "hello-world");
        assert!(json["contentHtml"].is_string());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_reads_count_every_view() {
        let (blogs, _dir) = service();
        blogs.create(draft("Popular", true), &author()).unwrap();

        let readers: Vec<_> = (0..32)
            .map(|_| {
                let blogs = blogs.clone();
                tokio::spawn(async move { blogs.read("popular", false).map(|v| v.blog.views) })
            })
            .collect();

        let mut seen = Vec::new();
        for reader in readers {
            seen.push(reader.await.unwrap().unwrap());
        }
        seen.sort_unstable();
        assert_eq!(seen, (1..=32i64).collect::<Vec<_>>());

        let db = blogs.db.lock().unwrap();
        assert_eq!(db.get_blog_by_slug("popular").unwrap().views, 32);
    }

    #[test]
    fn test_drafts_hidden_from_anonymous_readers() {
        let (blogs, _dir) = service();
        blogs.create(draft("Secret", false), &author()).unwrap();

        assert!(matches!(
            blogs.read("secret", false),
            Err(ApiError::NotFound(ref m)) if m == BLOG_NOT_FOUND
        ));
        assert!(blogs.read("secret", true).is_ok());

        let (public, pagination) = blogs.list_published(BlogListParams::default()).unwrap();
        assert!(public.is_empty());
        assert_eq!(pagination.total, 0);

        let (all, _) = blogs.list_all(BlogListParams::default()).unwrap();
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn test_invalid_draft() {
        let (blogs, _dir) = service();
        let mut bad = draft("!!!", true);
        assert!(matches!(
            blogs.create(bad.clone(), &author()),
            Err(ApiError::Validation(_))
        ));
        bad.title = "Fine".into();
        bad.content.clear();
        assert!(matches!(
            blogs.create(bad, &author()),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn test_update_regenerates_slug_on_title_change() {
        let (blogs, _dir) = service();
        let created = blogs.create(draft("First Title", true), &author()).unwrap();

        let updated = blogs
            .update(
                &created.id.to_string(),
                BlogPatch {
                    title: Some("Second Title".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.slug, "second-title");
        assert!(blogs.read("first-title", true).is_err());
    }

    #[test]
    fn test_malformed_and_missing_ids_are_not_found() {
        let (blogs, _dir) = service();
        for id in ["not-a-uuid".to_string(), Uuid::new_v4().to_string()] {
            assert!(matches!(
                blogs.update(&id, BlogPatch::default()),
                Err(ApiError::NotFound(_))
            ));
            assert!(matches!(blogs.delete(&id), Err(ApiError::NotFound(_))));
            assert!(matches!(blogs.existing(&id), Err(ApiError::NotFound(_))));
        }
    }

    #[test]
    fn test_duplicate_title_conflicts() {
        let (blogs, _dir) = service();
        blogs.create(draft("Same", true), &author()).unwrap();
        assert!(matches!(
            blogs.create(draft("same", false), &author()),
            Err(ApiError::Conflict(_))
        ));
    }
}
