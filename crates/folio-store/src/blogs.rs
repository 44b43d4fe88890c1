//! CRUD, listing and search for [`Blog`] records.

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter};
use uuid::Uuid;

use folio_shared::pagination::PageRequest;
use folio_shared::UserId;

use crate::database::{decode_json, decode_timestamp, decode_uuid, encode_timestamp, Database};
use crate::error::{Result, StoreError};
use crate::models::{Blog, BlogAuthor};

const BLOG_SELECT: &str = "SELECT b.id, b.title, b.slug, b.content, b.excerpt, b.cover_image, b.tags,
        b.published, b.views, b.author_id, u.name, u.avatar, u.bio, b.created_at, b.updated_at
     FROM blogs b
     LEFT JOIN users u ON u.id = b.author_id";

/// Filters for [`Database::list_blogs`].
#[derive(Debug, Clone, Default)]
pub struct BlogQuery {
    /// Hide drafts.
    pub published_only: bool,
    /// Full-text terms; any matching term qualifies a blog.
    pub search: Option<String>,
    /// Exact tag match.
    pub tag: Option<String>,
    pub page: PageRequest,
}

impl BlogQuery {
    /// WHERE clause and its positional values, or `None` when the search
    /// text has no indexable terms and nothing can match.
    fn filters(&self) -> Option<(String, Vec<Value>)> {
        let mut clauses: Vec<String> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if self.published_only {
            clauses.push("b.published = 1".to_string());
        }

        if let Some(search) = non_blank(&self.search) {
            values.push(Value::Text(fts_match_expression(search)?));
            clauses.push(format!(
                "b.rowid IN (SELECT rowid FROM blogs_fts WHERE blogs_fts MATCH ?{})",
                values.len()
            ));
        }

        if let Some(tag) = non_blank(&self.tag) {
            values.push(Value::Text(tag.to_string()));
            clauses.push(format!(
                "EXISTS (SELECT 1 FROM json_each(b.tags) WHERE json_each.value = ?{})",
                values.len()
            ));
        }

        let sql = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };
        Some((sql, values))
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Turn free text into an FTS5 query: every alphanumeric run becomes a
/// quoted term and the terms are OR-ed, so operators typed by a visitor are
/// never interpreted.
fn fts_match_expression(search: &str) -> Option<String> {
    let terms: Vec<String> = search
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| format!("\"{t}\""))
        .collect();

    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" OR "))
    }
}

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new blog. A duplicate slug yields [`StoreError::Conflict`].
    pub fn insert_blog(&self, blog: &Blog) -> Result<()> {
        self.conn().execute(
            "INSERT INTO blogs (id, title, slug, content, excerpt, cover_image, tags, published, views, author_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                blog.id.to_string(),
                blog.title,
                blog.slug,
                blog.content,
                blog.excerpt,
                blog.cover_image,
                serde_json::to_string(&blog.tags)?,
                blog.published as i32,
                blog.views,
                blog.author_id.map(|a| a.to_string()),
                encode_timestamp(&blog.created_at),
                encode_timestamp(&blog.updated_at),
            ],
        )?;
        tracing::debug!(id = %blog.id, slug = %blog.slug, "inserted blog");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn get_blog(&self, id: Uuid) -> Result<Blog> {
        let blog = self.conn().query_row(
            &format!("{BLOG_SELECT} WHERE b.id = ?1"),
            params![id.to_string()],
            row_to_blog,
        )?;
        Ok(blog)
    }

    pub fn get_blog_by_slug(&self, slug: &str) -> Result<Blog> {
        let blog = self.conn().query_row(
            &format!("{BLOG_SELECT} WHERE b.slug = ?1"),
            params![slug],
            row_to_blog,
        )?;
        Ok(blog)
    }

    /// Count one view of the blog at `slug` and return it with the new
    /// total. Drafts are only reachable with `include_drafts`; otherwise
    /// they behave as missing.
    pub fn record_blog_view(&self, slug: &str, include_drafts: bool) -> Result<Blog> {
        let affected = self.conn().execute(
            "UPDATE blogs SET views = views + 1
             WHERE slug = ?1 AND (published = 1 OR ?2)",
            params![slug, include_drafts],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_blog_by_slug(slug)
    }

    /// One page of blogs, newest first, plus the number of blogs matching
    /// the filters.
    pub fn list_blogs(&self, query: &BlogQuery) -> Result<(Vec<Blog>, u64)> {
        let Some((where_sql, mut values)) = query.filters() else {
            return Ok((Vec::new(), 0));
        };

        let total: i64 = self.conn().query_row(
            &format!("SELECT COUNT(*) FROM blogs b{where_sql}"),
            params_from_iter(values.iter()),
            |row| row.get(0),
        )?;

        let limit_idx = values.len() + 1;
        values.push(Value::Integer(i64::from(query.page.limit())));
        values.push(Value::Integer(
            i64::try_from(query.page.offset()).unwrap_or(i64::MAX),
        ));

        let mut stmt = self.conn().prepare(&format!(
            "{BLOG_SELECT}{where_sql}
             ORDER BY b.created_at DESC, b.rowid DESC
             LIMIT ?{limit_idx} OFFSET ?{}",
            limit_idx + 1
        ))?;
        let rows = stmt.query_map(params_from_iter(values.iter()), row_to_blog)?;

        let mut blogs = Vec::new();
        for row in rows {
            blogs.push(row?);
        }
        Ok((blogs, total.max(0) as u64))
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Persist editable fields. `views` and the author are left alone so a
    /// stale copy cannot roll back concurrent view counts.
    pub fn update_blog(&self, blog: &Blog) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE blogs
             SET title = ?2, slug = ?3, content = ?4, excerpt = ?5, cover_image = ?6,
                 tags = ?7, published = ?8, updated_at = ?9
             WHERE id = ?1",
            params![
                blog.id.to_string(),
                blog.title,
                blog.slug,
                blog.content,
                blog.excerpt,
                blog.cover_image,
                serde_json::to_string(&blog.tags)?,
                blog.published as i32,
                encode_timestamp(&blog.updated_at),
            ],
        )?;
        Ok(affected > 0)
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete a blog by UUID.  Returns `true` if a row was deleted.
    pub fn delete_blog(&self, id: Uuid) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM blogs WHERE id = ?1", params![id.to_string()])?;
        Ok(affected > 0)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a row of [`BLOG_SELECT`] to a [`Blog`].
fn row_to_blog(row: &rusqlite::Row<'_>) -> rusqlite::Result<Blog> {
    let id_str: String = row.get(0)?;
    let tags_str: String = row.get(6)?;
    let published_int: i32 = row.get(7)?;
    let author_str: Option<String> = row.get(9)?;
    let author_name: Option<String> = row.get(10)?;
    let author_avatar: Option<String> = row.get(11)?;
    let author_bio: Option<String> = row.get(12)?;
    let created_str: String = row.get(13)?;
    let updated_str: String = row.get(14)?;

    let author_id = author_str
        .map(|s| decode_uuid(9, &s).map(UserId))
        .transpose()?;

    // the user row may be gone; the reference is weak
    let author = match (author_id, author_name) {
        (Some(id), Some(name)) => Some(BlogAuthor {
            id,
            name,
            avatar: author_avatar.unwrap_or_default(),
            bio: author_bio.unwrap_or_default(),
        }),
        _ => None,
    };

    Ok(Blog {
        id: decode_uuid(0, &id_str)?,
        title: row.get(1)?,
        slug: row.get(2)?,
        content: row.get(3)?,
        excerpt: row.get(4)?,
        cover_image: row.get(5)?,
        tags: decode_json(6, &tags_str)?,
        published: published_int != 0,
        views: row.get(8)?,
        author_id,
        author,
        created_at: decode_timestamp(13, &created_str)?,
        updated_at: decode_timestamp(14, &updated_str)?,
    })
}
