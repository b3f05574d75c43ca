use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::db::Database;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(rename = "_id")]
    pub id: i64,
    pub product_id: i64,
    pub user_email: String,
    pub user_name: Option<String>,
    pub user_image: Option<String>,
    pub rating: f64,
    pub description: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReview {
    #[serde(default)]
    pub user_email: String,
    pub user_name: Option<String>,
    pub user_image: Option<String>,
    pub rating: Option<f64>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug)]
pub enum ReviewOutcome {
    Created(Review),
    Duplicate,
    ProductNotFound,
}

const REVIEW_COLUMNS: &str =
    "id, product_id, author_email, author_name, author_image, rating, description, created_at";

pub struct Reviews<'a> {
    db: &'a Database,
}

impl<'a> Reviews<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Inserts the review unless the author already reviewed this product.
    /// Ratings are stored as given; the handler only checks presence.
    pub async fn submit_review(&self, product_id: i64, input: CreateReview) -> Result<ReviewOutcome> {
        let rating = input
            .rating
            .ok_or_else(|| anyhow::anyhow!("rating is required"))?;

        let conn = self.db.connection();
        let _guard = self.db.write_lock().await;

        let mut exists = conn
            .query("SELECT 1 FROM products WHERE id = ?", libsql::params![product_id])
            .await?;
        if exists.next().await?.is_none() {
            return Ok(ReviewOutcome::ProductNotFound);
        }

        let query = format!(
            r#"
            INSERT INTO reviews (product_id, author_email, author_name, author_image, rating, description)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(product_id, author_email) DO NOTHING
            RETURNING {REVIEW_COLUMNS}
        "#
        );

        let mut rows = conn
            .query(
                &query,
                libsql::params![
                    product_id,
                    input.user_email.trim(),
                    input.user_name,
                    input.user_image,
                    rating,
                    input.description
                ],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(ReviewOutcome::Created(self.row_to_review(&row)?)),
            None => Ok(ReviewOutcome::Duplicate),
        }
    }

    pub async fn list_by_product(&self, product_id: i64) -> Result<Vec<Review>> {
        let query = format!(
            r#"
            SELECT {REVIEW_COLUMNS} FROM reviews
            WHERE product_id = ?
            ORDER BY created_at DESC, id DESC
        "#
        );

        let _guard = self.db.read_lock().await;
        let mut rows = self
            .db
            .connection()
            .query(&query, libsql::params![product_id])
            .await?;
        let mut reviews = Vec::new();

        while let Some(row) = rows.next().await? {
            reviews.push(self.row_to_review(&row)?);
        }

        Ok(reviews)
    }

    fn row_to_review(&self, row: &libsql::Row) -> Result<Review> {
        Ok(Review {
            id: row.get(0)?,
            product_id: row.get(1)?,
            user_email: row.get(2)?,
            user_name: row.get(3)?,
            user_image: row.get(4)?,
            rating: row.get(5)?,
            description: row.get(6)?,
            timestamp: row.get(7)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::products::{CreateProduct, Products};
    use crate::test_utils::init_test_tracing;

    async fn seed_product(db: &Database, name: &str) -> Result<i64> {
        let product = Products::new(db)
            .create_product(CreateProduct {
                product_name: name.into(),
                product_image: "img".into(),
                product_description: "d".into(),
                user_email: "owner@x.com".into(),
                ..Default::default()
            })
            .await?;
        Ok(product.id)
    }

    fn review(email: &str, rating: f64) -> CreateReview {
        CreateReview {
            user_email: email.into(),
            rating: Some(rating),
            description: "nice".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn one_review_per_author_and_product() -> Result<()> {
        init_test_tracing();
        let db = Database::in_memory().await?;
        let first = seed_product(&db, "First").await?;
        let second = seed_product(&db, "Second").await?;
        let reviews = Reviews::new(&db);

        assert!(matches!(
            reviews.submit_review(first, review("r@x.com", 4.0)).await?,
            ReviewOutcome::Created(_)
        ));
        assert!(matches!(
            reviews.submit_review(first, review("r@x.com", 1.0)).await?,
            ReviewOutcome::Duplicate
        ));
        // same author, different product is fine
        assert!(matches!(
            reviews.submit_review(second, review("r@x.com", 5.0)).await?,
            ReviewOutcome::Created(_)
        ));

        let listed = reviews.list_by_product(first).await?;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].rating, 4.0);
        Ok(())
    }

    #[tokio::test]
    async fn any_numeric_rating_is_accepted() -> Result<()> {
        init_test_tracing();
        let db = Database::in_memory().await?;
        let id = seed_product(&db, "P").await?;
        let reviews = Reviews::new(&db);

        let ReviewOutcome::Created(stored) = reviews.submit_review(id, review("r@x.com", 42.5)).await? else {
            panic!("expected review to be stored");
        };
        assert_eq!(stored.rating, 42.5);
        assert_eq!(stored.product_id, id);
        Ok(())
    }

    #[tokio::test]
    async fn reviews_need_an_existing_product() -> Result<()> {
        let db = Database::in_memory().await?;
        let reviews = Reviews::new(&db);
        assert!(matches!(
            reviews.submit_review(77, review("r@x.com", 3.0)).await?,
            ReviewOutcome::ProductNotFound
        ));
        assert!(reviews.list_by_product(77).await?.is_empty());
        Ok(())
    }
}
