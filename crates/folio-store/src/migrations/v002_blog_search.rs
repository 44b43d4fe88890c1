//! v002 -- Full-text index over blogs.
//!
//! An external-content FTS5 table mirrors `title`, `content` and `tags`;
//! triggers keep it in step with every insert, delete and relevant update.

use rusqlite::Connection;

const UP_SQL: &str = r#"
CREATE VIRTUAL TABLE IF NOT EXISTS blogs_fts USING fts5(
    title,
    content,
    tags,
    content = 'blogs',
    content_rowid = 'rowid'
);

CREATE TRIGGER IF NOT EXISTS blogs_fts_insert AFTER INSERT ON blogs BEGIN
    INSERT INTO blogs_fts(rowid, title, content, tags)
    VALUES (new.rowid, new.title, new.content, new.tags);
END;

CREATE TRIGGER IF NOT EXISTS blogs_fts_delete AFTER DELETE ON blogs BEGIN
    INSERT INTO blogs_fts(blogs_fts, rowid, title, content, tags)
    VALUES ('delete', old.rowid, old.title, old.content, old.tags);
END;

CREATE TRIGGER IF NOT EXISTS blogs_fts_update AFTER UPDATE OF title, content, tags ON blogs BEGIN
    INSERT INTO blogs_fts(blogs_fts, rowid, title, content, tags)
    VALUES ('delete', old.rowid, old.title, old.content, old.tags);
    INSERT INTO blogs_fts(rowid, title, content, tags)
    VALUES (new.rowid, new.title, new.content, new.tags);
END;

-- index rows written before this migration
INSERT INTO blogs_fts(blogs_fts) VALUES ('rebuild');
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
