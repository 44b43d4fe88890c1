//! CRUD operations for [`User`] records.

use rusqlite::{params, OptionalExtension};

use folio_shared::UserId;

use crate::database::{decode_json, decode_timestamp, decode_uuid, encode_timestamp, Database};
use crate::error::Result;
use crate::models::User;

const USER_COLUMNS: &str = "id, name, email, password_hash, title, bio, avatar, social_links, role, created_at, updated_at";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new user. A duplicate email yields [`StoreError::Conflict`].
    ///
    /// [`StoreError::Conflict`]: crate::StoreError::Conflict
    pub fn insert_user(&self, user: &User) -> Result<()> {
        self.conn().execute(
            "INSERT INTO users (id, name, email, password_hash, title, bio, avatar, social_links, role, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                user.id.to_string(),
                user.name,
                user.email,
                user.password_hash,
                user.title,
                user.bio,
                user.avatar,
                serde_json::to_string(&user.social_links)?,
                user.role,
                encode_timestamp(&user.created_at),
                encode_timestamp(&user.updated_at),
            ],
        )?;
        tracing::debug!(user = %user.id, "inserted user");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn get_user(&self, id: UserId) -> Result<User> {
        let user = self.conn().query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![id.to_string()],
            row_to_user,
        )?;
        Ok(user)
    }

    /// Look up a user by email. The argument is matched as given, so callers
    /// normalize it first.
    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = self
            .conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                params![email],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// The earliest registered user; its record is the public profile.
    pub fn first_user(&self) -> Result<User> {
        let user = self.conn().query_row(
            &format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC, rowid ASC LIMIT 1"),
            [],
            row_to_user,
        )?;
        Ok(user)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Persist profile fields. Email and password are not touched.
    pub fn update_user_profile(&self, user: &User) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE users
             SET name = ?2, title = ?3, bio = ?4, avatar = ?5, social_links = ?6, updated_at = ?7
             WHERE id = ?1",
            params![
                user.id.to_string(),
                user.name,
                user.title,
                user.bio,
                user.avatar,
                serde_json::to_string(&user.social_links)?,
                encode_timestamp(&user.updated_at),
            ],
        )?;
        Ok(affected > 0)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let id_str: String = row.get(0)?;
    let social_str: String = row.get(7)?;
    let created_str: String = row.get(9)?;
    let updated_str: String = row.get(10)?;

    Ok(User {
        id: UserId(decode_uuid(0, &id_str)?),
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        title: row.get(4)?,
        bio: row.get(5)?,
        avatar: row.get(6)?,
        social_links: decode_json(7, &social_str)?,
        role: row.get(8)?,
        created_at: decode_timestamp(9, &created_str)?,
        updated_at: decode_timestamp(10, &updated_str)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use folio_shared::content::ProfilePatch;

    fn test_db() -> (Database, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("users.db")).unwrap();
        (db, dir)
    }

    #[test]
    fn test_insert_and_lookup() {
        let (db, _dir) = test_db();
        let user = User::new("Ada", "ada@example.com", "hash".into());
        db.insert_user(&user).unwrap();

        assert_eq!(db.get_user(user.id).unwrap(), user);
        assert_eq!(
            db.find_user_by_email("ada@example.com").unwrap(),
            Some(user.clone())
        );
        assert_eq!(db.find_user_by_email("nobody@example.com").unwrap(), None);
        assert_eq!(db.first_user().unwrap().id, user.id);
    }

    #[test]
    fn test_duplicate_email_conflicts() {
        let (db, _dir) = test_db();
        db.insert_user(&User::new("A", "a@x.com", "h".into())).unwrap();

        let err = db
            .insert_user(&User::new("B", "A@X.com", "h".into()))
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(err.conflicting_column(), Some("email"));
    }

    #[test]
    fn test_missing_user_not_found() {
        let (db, _dir) = test_db();
        assert!(matches!(db.get_user(UserId::new()), Err(StoreError::NotFound)));
        assert!(matches!(db.first_user(), Err(StoreError::NotFound)));
    }

    #[test]
    fn test_first_user_is_oldest() {
        let (db, _dir) = test_db();
        let first = User::new("First", "first@x.com", "h".into());
        db.insert_user(&first).unwrap();
        db.insert_user(&User::new("Second", "second@x.com", "h".into()))
            .unwrap();

        assert_eq!(db.first_user().unwrap().id, first.id);
    }

    #[test]
    fn test_update_profile() {
        let (db, _dir) = test_db();
        let mut user = User::new("A", "a@x.com", "hash".into());
        db.insert_user(&user).unwrap();

        user.apply(&ProfilePatch {
            title: Some("Engineer".into()),
            ..Default::default()
        });
        user.avatar = "/uploads/avatar.png".into();
        assert!(db.update_user_profile(&user).unwrap());

        let stored = db.get_user(user.id).unwrap();
        assert_eq!(stored.title, "Engineer");
        assert_eq!(stored.avatar, "/uploads/avatar.png");
        assert_eq!(stored.password_hash, "hash");
    }
}
