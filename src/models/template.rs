//! Lure template model
//!
//! The template catalog is a data table, so templates can be added
//! without code changes. `{{link}}` in the html body is replaced with
//! the per-recipient tracking link at dispatch time.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use validator::Validate;

/// Sender address forced on every template for domain reputation.
const FORCED_FROM_EMAIL: &str = "security@kinetis.org";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EmailTemplate {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub subject: String,
    pub from_name: String,
    pub from_email: String,
    pub category: Option<String>,
    pub html_content: String,
    pub difficulty_level: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTemplate {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "subject is required"))]
    pub subject: String,
    pub from_name: String,
    pub category: Option<String>,
    #[validate(length(min = 1, message = "html content is required"))]
    pub html_content: String,
}

impl EmailTemplate {
    pub async fn find_by_slug(pool: &PgPool, slug: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, EmailTemplate>("SELECT * FROM email_templates WHERE slug = $1")
            .bind(slug)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, EmailTemplate>("SELECT * FROM email_templates ORDER BY name")
            .fetch_all(pool)
            .await
    }

    pub async fn create(pool: &PgPool, data: CreateTemplate) -> Result<Self, sqlx::Error> {
        let slug = slugify(&data.name);

        sqlx::query_as::<_, EmailTemplate>(
            r#"
            INSERT INTO email_templates (slug, name, subject, from_name, from_email, category, html_content, difficulty_level)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'medium')
            RETURNING *
            "#
        )
        .bind(&slug)
        .bind(&data.name)
        .bind(&data.subject)
        .bind(&data.from_name)
        .bind(FORCED_FROM_EMAIL)
        .bind(&data.category)
        .bind(&data.html_content)
        .fetch_one(pool)
        .await
    }

    /// Substitute the tracking link into the html body.
    pub fn render(&self, tracking_link: &str) -> String {
        self.html_content.replace("{{link}}", tracking_link)
    }

    /// Display form of the sender, e.g. `HR <security@kinetis.org>`.
    pub fn from_header(&self) -> String {
        format!("{} <{}>", self.from_name, self.from_email)
    }
}

/// `"Black Friday Offer"` -> `"black-friday-offer"`
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = true;
    for c in name.chars() {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    slug.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("Black Friday Offer"), "black-friday-offer");
        assert_eq!(slugify("  HR / Payroll!! "), "hr-payroll");
        assert_eq!(slugify("already-a-slug"), "already-a-slug");
    }

    #[test]
    fn render_substitutes_the_tracking_link() {
        let template = EmailTemplate {
            id: Uuid::new_v4(),
            slug: "test".to_string(),
            name: "Test".to_string(),
            subject: "s".to_string(),
            from_name: "HR".to_string(),
            from_email: "security@kinetis.org".to_string(),
            category: None,
            html_content: "<a href=\"{{link}}\">click</a>".to_string(),
            difficulty_level: None,
            created_at: Utc::now(),
        };
        assert_eq!(
            template.render("https://x.test/track?c=1"),
            "<a href=\"https://x.test/track?c=1\">click</a>"
        );
        assert_eq!(template.from_header(), "HR <security@kinetis.org>");
    }
}
