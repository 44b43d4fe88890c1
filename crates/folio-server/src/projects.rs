//! Project service and `/api/projects` routes.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, Query, State},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use folio_shared::content::{ProjectDraft, ProjectPatch};
use folio_shared::pagination::{PageRequest, Pagination};
use folio_store::{Project, ProjectQuery};

use crate::api::{lock_db, parse_id, AppState, SharedDatabase};
use crate::auth::Principal;
use crate::error::ApiError;
use crate::response::{ApiJson, ApiResponse};
use crate::upload_store::read_file_field;

const PROJECT_NOT_FOUND: &str = "Project not found";

#[derive(Debug, Default, Deserialize)]
pub struct ProjectListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    /// `"true"` keeps featured projects, any other non-empty value keeps the
    /// rest. An empty value applies no filter.
    pub featured: Option<String>,
}

#[derive(Clone)]
pub struct ProjectService {
    db: SharedDatabase,
}

impl ProjectService {
    pub fn new(db: SharedDatabase) -> Self {
        Self { db }
    }

    pub fn list(&self, params: ProjectListParams) -> Result<(Vec<Project>, Pagination), ApiError> {
        let page = PageRequest::parse(params.page.as_deref(), params.limit.as_deref());
        let query = ProjectQuery {
            featured: params
                .featured
                .filter(|v| !v.is_empty())
                .map(|v| v == "true"),
            page: Some(page),
        };
        let (projects, total) = lock_db(&self.db)?.list_projects(&query)?;
        Ok((projects, page.summarize(total)))
    }

    /// Every featured project, unpaginated.
    pub fn featured(&self) -> Result<Vec<Project>, ApiError> {
        let query = ProjectQuery {
            featured: Some(true),
            page: None,
        };
        let (projects, _) = lock_db(&self.db)?.list_projects(&query)?;
        Ok(projects)
    }

    pub fn get(&self, id: &str) -> Result<Project, ApiError> {
        let id = parse_id(id, PROJECT_NOT_FOUND)?;
        lock_db(&self.db)?
            .get_project(id)
            .map_err(|e| ApiError::from_store(e, PROJECT_NOT_FOUND))
    }

    pub fn create(&self, draft: ProjectDraft) -> Result<Project, ApiError> {
        draft.validate()?;
        let project = Project::from_draft(&draft);
        lock_db(&self.db)?.insert_project(&project)?;

        info!(id = %project.id, "Created project");
        Ok(project)
    }

    pub fn update(&self, id: &str, patch: ProjectPatch) -> Result<Project, ApiError> {
        let id = parse_id(id, PROJECT_NOT_FOUND)?;
        patch.validate()?;

        let db = lock_db(&self.db)?;
        let mut project = db
            .get_project(id)
            .map_err(|e| ApiError::from_store(e, PROJECT_NOT_FOUND))?;
        project.apply(&patch);
        if !db.update_project(&project)? {
            return Err(ApiError::NotFound(PROJECT_NOT_FOUND.into()));
        }

        info!(id = %project.id, "Updated project");
        Ok(project)
    }

    pub fn delete(&self, id: &str) -> Result<(), ApiError> {
        let id = parse_id(id, PROJECT_NOT_FOUND)?;
        if !lock_db(&self.db)?.delete_project(id)? {
            return Err(ApiError::NotFound(PROJECT_NOT_FOUND.into()));
        }
        info!(id = %id, "Deleted project");
        Ok(())
    }

    pub fn set_thumbnail(&self, id: Uuid, thumbnail: String) -> Result<Project, ApiError> {
        self.update(
            &id.to_string(),
            ProjectPatch {
                thumbnail: Some(thumbnail),
                ..Default::default()
            },
        )
    }
}

// ─── Handlers ───

async fn list_projects(
    State(state): State<AppState>,
    Query(params): Query<ProjectListParams>,
) -> Result<ApiResponse<Vec<Project>>, ApiError> {
    let (projects, pagination) = state.projects.list(params)?;
    Ok(ApiResponse::ok(projects).with_pagination(pagination))
}

async fn featured_projects(
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<Project>>, ApiError> {
    Ok(ApiResponse::ok(state.projects.featured()?))
}

async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<Project>, ApiError> {
    Ok(ApiResponse::ok(state.projects.get(&id)?))
}

async fn create_project(
    State(state): State<AppState>,
    _principal: Principal,
    ApiJson(draft): ApiJson<ProjectDraft>,
) -> Result<ApiResponse<Project>, ApiError> {
    let project = state.projects.create(draft)?;
    Ok(ApiResponse::created(project).with_message("Project created successfully"))
}

async fn update_project(
    State(state): State<AppState>,
    _principal: Principal,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<ProjectPatch>,
) -> Result<ApiResponse<Project>, ApiError> {
    let project = state.projects.update(&id, patch)?;
    Ok(ApiResponse::ok(project).with_message("Project updated successfully"))
}

async fn delete_project(
    State(state): State<AppState>,
    _principal: Principal,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>, ApiError> {
    state.projects.delete(&id)?;
    Ok(ApiResponse::message("Project deleted successfully"))
}

async fn upload_thumbnail(
    State(state): State<AppState>,
    _principal: Principal,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<ApiResponse<Project>, ApiError> {
    let mut multipart = multipart?;
    let file = read_file_field(&mut multipart, "thumbnail")
        .await?
        .ok_or_else(|| ApiError::Validation("No file uploaded".into()))?;
    state.uploads.check_image(&file)?;

    let id = state.projects.get(&id)?.id;
    let path = state.uploads.store_image("thumbnail", &file).await?;

    let project = state.projects.set_thumbnail(id, path)?;
    Ok(ApiResponse::ok(project).with_message("Thumbnail uploaded successfully"))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_projects).post(create_project))
        .route("/featured", get(featured_projects))
        .route(
            "/:id",
            get(get_project).put(update_project).delete(delete_project),
        )
        .route("/:id/thumbnail", post(upload_thumbnail))
}
