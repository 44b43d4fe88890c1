//! CRUD and listing for [`Project`] records.

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter};
use uuid::Uuid;

use folio_shared::pagination::PageRequest;

use crate::database::{decode_json, decode_timestamp, decode_uuid, encode_timestamp, Database};
use crate::error::Result;
use crate::models::Project;

const PROJECT_COLUMNS: &str = "id, title, description, tech_stack, thumbnail, live_demo_url, github_url, featured, sort_order, created_at, updated_at";

/// Filters for [`Database::list_projects`].
#[derive(Debug, Clone, Default)]
pub struct ProjectQuery {
    /// `Some(true)` keeps featured projects only, `Some(false)` the rest.
    pub featured: Option<bool>,
    /// `None` returns every matching project.
    pub page: Option<PageRequest>,
}

impl Database {
    pub fn insert_project(&self, project: &Project) -> Result<()> {
        self.conn().execute(
            "INSERT INTO projects (id, title, description, tech_stack, thumbnail, live_demo_url, github_url, featured, sort_order, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                project.id.to_string(),
                project.title,
                project.description,
                serde_json::to_string(&project.tech_stack)?,
                project.thumbnail,
                project.live_demo_url,
                project.github_url,
                project.featured as i32,
                project.order,
                encode_timestamp(&project.created_at),
                encode_timestamp(&project.updated_at),
            ],
        )?;
        tracing::debug!(id = %project.id, "inserted project");
        Ok(())
    }

    pub fn get_project(&self, id: Uuid) -> Result<Project> {
        let project = self.conn().query_row(
            &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1"),
            params![id.to_string()],
            row_to_project,
        )?;
        Ok(project)
    }

    /// Projects ordered by `order` ascending, newest first among equals,
    /// plus the number matching the filter.
    pub fn list_projects(&self, query: &ProjectQuery) -> Result<(Vec<Project>, u64)> {
        let mut values: Vec<Value> = Vec::new();
        let where_sql = match query.featured {
            Some(featured) => {
                values.push(Value::Integer(featured as i64));
                " WHERE featured = ?1"
            }
            None => "",
        };

        let total: i64 = self.conn().query_row(
            &format!("SELECT COUNT(*) FROM projects{where_sql}"),
            params_from_iter(values.iter()),
            |row| row.get(0),
        )?;

        let mut sql = format!(
            "SELECT {PROJECT_COLUMNS} FROM projects{where_sql}
             ORDER BY sort_order ASC, created_at DESC, rowid DESC"
        );
        if let Some(page) = &query.page {
            let limit_idx = values.len() + 1;
            sql.push_str(&format!(" LIMIT ?{limit_idx} OFFSET ?{}", limit_idx + 1));
            values.push(Value::Integer(i64::from(page.limit())));
            values.push(Value::Integer(
                i64::try_from(page.offset()).unwrap_or(i64::MAX),
            ));
        }

        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), row_to_project)?;

        let mut projects = Vec::new();
        for row in rows {
            projects.push(row?);
        }
        Ok((projects, total.max(0) as u64))
    }

    pub fn update_project(&self, project: &Project) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE projects
             SET title = ?2, description = ?3, tech_stack = ?4, thumbnail = ?5,
                 live_demo_url = ?6, github_url = ?7, featured = ?8, sort_order = ?9,
                 updated_at = ?10
             WHERE id = ?1",
            params![
                project.id.to_string(),
                project.title,
                project.description,
                serde_json::to_string(&project.tech_stack)?,
                project.thumbnail,
                project.live_demo_url,
                project.github_url,
                project.featured as i32,
                project.order,
                encode_timestamp(&project.updated_at),
            ],
        )?;
        Ok(affected > 0)
    }

    /// Delete a project by UUID.  Returns `true` if a row was deleted.
    pub fn delete_project(&self, id: Uuid) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM projects WHERE id = ?1", params![id.to_string()])?;
        Ok(affected > 0)
    }
}

fn row_to_project(row: &rusqlite::Row<'_>) -> rusqlite::Result<Project> {
    let id_str: String = row.get(0)?;
    let stack_str: String = row.get(3)?;
    let featured_int: i32 = row.get(7)?;
    let created_str: String = row.get(9)?;
    let updated_str: String = row.get(10)?;

    Ok(Project {
        id: decode_uuid(0, &id_str)?,
        title: row.get(1)?,
        description: row.get(2)?,
        tech_stack: decode_json(3, &stack_str)?,
        thumbnail: row.get(4)?,
        live_demo_url: row.get(5)?,
        github_url: row.get(6)?,
        featured: featured_int != 0,
        order: row.get(8)?,
        created_at: decode_timestamp(9, &created_str)?,
        updated_at: decode_timestamp(10, &updated_str)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use folio_shared::content::{ProjectDraft, ProjectPatch};

    fn test_db() -> (Database, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("projects.db")).unwrap();
        (db, dir)
    }

    fn project(title: &str, order: i64, featured: bool) -> Project {
        Project::from_draft(&ProjectDraft {
            title: title.into(),
            description: format!("{title} description"),
            tech_stack: vec!["rust".into()],
            featured,
            order,
            ..Default::default()
        })
    }

    fn titles(projects: &[Project]) -> Vec<&str> {
        projects.iter().map(|p| p.title.as_str()).collect()
    }

    #[test]
    fn test_insert_get_delete() {
        let (db, _dir) = test_db();
        let p = project("Compiler", 0, false);
        db.insert_project(&p).unwrap();

        assert_eq!(db.get_project(p.id).unwrap(), p);
        assert!(db.delete_project(p.id).unwrap());
        assert!(!db.delete_project(p.id).unwrap());
        assert!(matches!(db.get_project(p.id), Err(StoreError::NotFound)));
    }

    #[test]
    fn test_ordering() {
        let (db, _dir) = test_db();
        db.insert_project(&project("Late", 2, false)).unwrap();
        db.insert_project(&project("Early Old", 1, false)).unwrap();
        db.insert_project(&project("Early New", 1, false)).unwrap();

        let (all, total) = db.list_projects(&ProjectQuery::default()).unwrap();
        assert_eq!(total, 3);
        assert_eq!(titles(&all), vec!["Early New", "Early Old", "Late"]);
    }

    #[test]
    fn test_featured_filter() {
        let (db, _dir) = test_db();
        db.insert_project(&project("Star", 0, true)).unwrap();
        db.insert_project(&project("Plain", 0, false)).unwrap();

        let featured = ProjectQuery {
            featured: Some(true),
            ..Default::default()
        };
        let (hits, total) = db.list_projects(&featured).unwrap();
        assert_eq!(total, 1);
        assert_eq!(titles(&hits), vec!["Star"]);

        let plain = ProjectQuery {
            featured: Some(false),
            ..Default::default()
        };
        assert_eq!(titles(&db.list_projects(&plain).unwrap().0), vec!["Plain"]);
    }

    #[test]
    fn test_paged_listing() {
        let (db, _dir) = test_db();
        for i in 0..5 {
            db.insert_project(&project(&format!("P{i}"), i, false)).unwrap();
        }

        let query = ProjectQuery {
            featured: None,
            page: Some(PageRequest::new(2, 2)),
        };
        let (page, total) = db.list_projects(&query).unwrap();
        assert_eq!(total, 5);
        assert_eq!(titles(&page), vec!["P2", "P3"]);
    }

    #[test]
    fn test_update() {
        let (db, _dir) = test_db();
        let mut p = project("Old", 0, false);
        db.insert_project(&p).unwrap();

        p.apply(&ProjectPatch {
            title: Some("New".into()),
            featured: Some(true),
            order: Some(7),
            ..Default::default()
        });
        assert!(db.update_project(&p).unwrap());

        let stored = db.get_project(p.id).unwrap();
        assert_eq!(stored.title, "New");
        assert!(stored.featured);
        assert_eq!(stored.order, 7);
        assert_eq!(stored.tech_stack, vec!["rust"]);
    }
}
