//! Domain model structs persisted in the SQLite database.
//!
//! Every struct derives `Serialize` with camelCase field names so it can be
//! handed straight to the HTTP layer.

use std::collections::BTreeMap;

use chrono::{DateTime, SubsecRound, Utc};
use serde::Serialize;
use uuid::Uuid;

use folio_shared::constants::DEFAULT_ROLE;
use folio_shared::content::{
    normalize_email, normalize_labels, BlogDraft, BlogPatch, ProfilePatch, ProjectDraft,
    ProjectPatch,
};
use folio_shared::slug::slugify;
use folio_shared::UserId;

/// Current time at the precision the database keeps.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A registered account. Doubles as the public profile.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    /// Trimmed and lowercased; unique.
    pub email: String,
    /// Argon2id PHC string. Never serialized.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub title: String,
    pub bio: String,
    /// Public path of the avatar image, empty when unset.
    pub avatar: String,
    pub social_links: BTreeMap<String, String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: &str, email: &str, password_hash: String) -> Self {
        let created_at = now();
        Self {
            id: UserId::new(),
            name: name.trim().to_string(),
            email: normalize_email(email),
            password_hash,
            title: String::new(),
            bio: String::new(),
            avatar: String::new(),
            social_links: BTreeMap::new(),
            role: DEFAULT_ROLE.to_string(),
            created_at,
            updated_at: created_at,
        }
    }

    pub fn apply(&mut self, patch: &ProfilePatch) {
        if let Some(name) = ProfilePatch::text(&patch.name) {
            self.name = name.to_string();
        }
        if let Some(title) = ProfilePatch::text(&patch.title) {
            self.title = title.to_string();
        }
        if let Some(bio) = ProfilePatch::text(&patch.bio) {
            self.bio = bio.to_string();
        }
        if let Some(links) = &patch.social_links {
            self.social_links
                .extend(links.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        self.updated_at = now();
    }
}

// ---------------------------------------------------------------------------
// Blog
// ---------------------------------------------------------------------------

/// Author details resolved from `users` when a blog is read.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BlogAuthor {
    pub id: UserId,
    pub name: String,
    pub avatar: String,
    pub bio: String,
}

/// A blog post.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Blog {
    pub id: Uuid,
    pub title: String,
    /// Derived from `title`; unique.
    pub slug: String,
    /// Markdown source.
    pub content: String,
    pub excerpt: String,
    pub cover_image: String,
    pub tags: Vec<String>,
    pub published: bool,
    pub views: i64,
    /// Weak reference to the writing user.
    #[serde(skip_serializing)]
    pub author_id: Option<UserId>,
    /// Filled in on read when the author still exists.
    pub author: Option<BlogAuthor>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Blog {
    /// Build a new record from a validated draft.
    pub fn from_draft(draft: &BlogDraft, author_id: Option<UserId>) -> Self {
        let created_at = now();
        let title = draft.title.trim().to_string();
        Self {
            id: Uuid::new_v4(),
            slug: slugify(&title),
            title,
            content: draft.content.clone(),
            excerpt: draft.excerpt.clone(),
            cover_image: draft.cover_image.clone(),
            tags: normalize_labels(&draft.tags),
            published: draft.published,
            views: 0,
            author_id,
            author: None,
            created_at,
            updated_at: created_at,
        }
    }

    /// Merge a validated patch. The slug follows the title: it is derived
    /// again only when the title actually changes.
    pub fn apply(&mut self, patch: &BlogPatch) {
        if let Some(title) = &patch.title {
            let title = title.trim();
            if title != self.title {
                self.title = title.to_string();
                self.slug = slugify(title);
            }
        }
        if let Some(content) = &patch.content {
            self.content = content.clone();
        }
        if let Some(excerpt) = &patch.excerpt {
            self.excerpt = excerpt.clone();
        }
        if let Some(cover_image) = &patch.cover_image {
            self.cover_image = cover_image.clone();
        }
        if let Some(tags) = &patch.tags {
            self.tags = normalize_labels(tags);
        }
        if let Some(published) = patch.published {
            self.published = published;
        }
        self.updated_at = now();
    }
}

/// A blog without its body, as shown in public listings.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BlogSummary {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub cover_image: String,
    pub tags: Vec<String>,
    pub published: bool,
    pub views: i64,
    pub author: Option<BlogAuthor>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Blog> for BlogSummary {
    fn from(blog: Blog) -> Self {
        Self {
            id: blog.id,
            title: blog.title,
            slug: blog.slug,
            excerpt: blog.excerpt,
            cover_image: blog.cover_image,
            tags: blog.tags,
            published: blog.published,
            views: blog.views,
            author: blog.author,
            created_at: blog.created_at,
            updated_at: blog.updated_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Project
// ---------------------------------------------------------------------------

/// A portfolio project.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub tech_stack: Vec<String>,
    pub thumbnail: String,
    pub live_demo_url: String,
    pub github_url: String,
    pub featured: bool,
    /// Explicit display order, ascending.
    pub order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn from_draft(draft: &ProjectDraft) -> Self {
        let created_at = now();
        Self {
            id: Uuid::new_v4(),
            title: draft.title.trim().to_string(),
            description: draft.description.clone(),
            tech_stack: normalize_labels(&draft.tech_stack),
            thumbnail: draft.thumbnail.clone(),
            live_demo_url: draft.live_demo_url.trim().to_string(),
            github_url: draft.github_url.trim().to_string(),
            featured: draft.featured,
            order: draft.order,
            created_at,
            updated_at: created_at,
        }
    }

    pub fn apply(&mut self, patch: &ProjectPatch) {
        if let Some(title) = &patch.title {
            self.title = title.trim().to_string();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(tech_stack) = &patch.tech_stack {
            self.tech_stack = normalize_labels(tech_stack);
        }
        if let Some(thumbnail) = &patch.thumbnail {
            self.thumbnail = thumbnail.clone();
        }
        if let Some(url) = &patch.live_demo_url {
            self.live_demo_url = url.trim().to_string();
        }
        if let Some(url) = &patch.github_url {
            self.github_url = url.trim().to_string();
        }
        if let Some(featured) = patch.featured {
            self.featured = featured;
        }
        if let Some(order) = patch.order {
            self.order = order;
        }
        self.updated_at = now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(title: &str) -> BlogDraft {
        BlogDraft {
            title: title.into(),
            content: "body".into(),
            tags: vec!["rust".into(), " rust ".into(), "web".into()],
            ..Default::default()
        }
    }

    #[test]
    fn test_blog_from_draft() {
        let blog = Blog::from_draft(&draft("  Hello World  "), None);
        assert_eq!(blog.title, "Hello World");
        assert_eq!(blog.slug, "hello-world");
        assert_eq!(blog.tags, vec!["rust", "web"]);
        assert!(!blog.published);
        assert_eq!(blog.views, 0);
    }

    #[test]
    fn test_slug_regenerated_only_on_title_change() {
        let mut blog = Blog::from_draft(&draft("Hello World"), None);
        // pretend an older slug scheme produced something else
        blog.slug = "legacy-slug".into();

        blog.apply(&BlogPatch {
            title: Some("Hello World".into()),
            content: Some("new body".into()),
            ..Default::default()
        });
        assert_eq!(blog.slug, "legacy-slug");
        assert_eq!(blog.content, "new body");

        blog.apply(&BlogPatch {
            title: Some("Goodbye World".into()),
            ..Default::default()
        });
        assert_eq!(blog.slug, "goodbye-world");
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User::new("A", " A@X.com ", "$argon2id$secret".into());
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["email"], "a@x.com");
        assert_eq!(json["role"], "admin");
    }

    #[test]
    fn test_profile_patch_merges_links() {
        let mut user = User::new("A", "a@x.com", String::new());
        user.social_links.insert("github".into(), "https://github.com/a".into());

        let mut links = BTreeMap::new();
        links.insert("twitter".into(), "https://twitter.com/a".into());
        user.apply(&ProfilePatch {
            name: Some("".into()),
            bio: Some("Writes Rust".into()),
            social_links: Some(links),
            ..Default::default()
        });

        assert_eq!(user.name, "A");
        assert_eq!(user.bio, "Writes Rust");
        assert_eq!(user.social_links.len(), 2);
    }

    #[test]
    fn test_blog_summary_drops_content() {
        let blog = Blog::from_draft(&draft("Hello"), None);
        let json = serde_json::to_value(BlogSummary::from(blog)).unwrap();
        assert!(json.get("content").is_none());
        assert_eq!(json["slug"], "hello");
    }

    #[test]
    fn test_project_serializes_camel_case() {
        let project = Project::from_draft(&ProjectDraft {
            title: "P".into(),
            description: "D".into(),
            live_demo_url: "https://demo".into(),
            order: 3,
            ..Default::default()
        });
        let json = serde_json::to_value(&project).unwrap();
        assert_eq!(json["liveDemoUrl"], "https://demo");
        assert_eq!(json["order"], 3);
        assert!(json.get("techStack").is_some());
    }
}
