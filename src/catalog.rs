//! Read-only catalog of published gigs and categories.

use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use sqlx::{FromRow, PgPool};

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Gig {
    pub id: i64,
    pub title: String,
    pub seller: String,
    pub rating: f64,
    pub reviews: i64,
    pub category: String,
    pub tier: String,
    pub tokens: i64,
    pub eta: String,
}

#[async_trait]
pub trait Catalog: Send + Sync {
    async fn categories(&self) -> anyhow::Result<Vec<String>>;
    async fn list_gigs(&self) -> anyhow::Result<Vec<Gig>>;
    async fn get_gig(&self, id: i64) -> anyhow::Result<Option<Gig>>;
}

#[derive(Clone)]
pub struct PgCatalog {
    db: PgPool,
}

impl PgCatalog {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Catalog for PgCatalog {
    async fn categories(&self) -> anyhow::Result<Vec<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as(r#"SELECT name FROM categories ORDER BY position ASC"#)
                .fetch_all(&self.db)
                .await
                .context("list categories")?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    async fn list_gigs(&self) -> anyhow::Result<Vec<Gig>> {
        let gigs = sqlx::query_as::<_, Gig>(
            r#"
            SELECT id, title, seller, rating, reviews, category, tier, tokens, eta
            FROM gigs
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.db)
        .await
        .context("list gigs")?;
        Ok(gigs)
    }

    async fn get_gig(&self, id: i64) -> anyhow::Result<Option<Gig>> {
        let gig = sqlx::query_as::<_, Gig>(
            r#"
            SELECT id, title, seller, rating, reviews, category, tier, tokens, eta
            FROM gigs
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("get gig")?;
        Ok(gig)
    }
}

/// Fixed catalog matching the rows seeded by the catalog migration.
pub struct StaticCatalog {
    categories: Vec<String>,
    gigs: Vec<Gig>,
}

impl Default for StaticCatalog {
    fn default() -> Self {
        Self {
            categories: [
                "Programming & Tech",
                "Design & Creative",
                "Marketing",
                "Writing & Translation",
                "Learning & Coaching",
                "Lifestyle",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            gigs: vec![
                Gig {
                    id: 1,
                    title: "I will build a responsive portfolio website".into(),
                    seller: "Aarav Kumar".into(),
                    rating: 4.9,
                    reviews: 38,
                    category: "Programming & Tech".into(),
                    tier: "Advanced".into(),
                    tokens: 60,
                    eta: "3-5 days".into(),
                },
                Gig {
                    id: 2,
                    title: "I will design a minimal logo for your brand".into(),
                    seller: "Sara Jain".into(),
                    rating: 4.8,
                    reviews: 52,
                    category: "Design & Creative".into(),
                    tier: "Intermediate".into(),
                    tokens: 35,
                    eta: "2-3 days".into(),
                },
                Gig {
                    id: 3,
                    title: "I will coach you for technical interviews".into(),
                    seller: "Rohit Verma".into(),
                    rating: 5.0,
                    reviews: 19,
                    category: "Learning & Coaching".into(),
                    tier: "Advanced".into(),
                    tokens: 50,
                    eta: "1-2 days".into(),
                },
            ],
        }
    }
}

#[async_trait]
impl Catalog for StaticCatalog {
    async fn categories(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.categories.clone())
    }

    async fn list_gigs(&self) -> anyhow::Result<Vec<Gig>> {
        Ok(self.gigs.clone())
    }

    async fn get_gig(&self, id: i64) -> anyhow::Result<Option<Gig>> {
        Ok(self.gigs.iter().find(|g| g.id == id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_catalog_lookup() {
        let catalog = StaticCatalog::default();
        assert_eq!(catalog.categories().await.unwrap().len(), 6);
        assert_eq!(catalog.list_gigs().await.unwrap().len(), 3);

        let gig = catalog.get_gig(2).await.unwrap().expect("gig 2");
        assert_eq!(gig.seller, "Sara Jain");
        assert_eq!(gig.tokens, 35);
        assert!(catalog.get_gig(99).await.unwrap().is_none());
    }
}
