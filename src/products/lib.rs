use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::api::Page;
use crate::db::{Database, json_string_list};

pub const FEATURED_LIMIT: i64 = 4;
pub const TRENDING_LIMIT: i64 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Pending => "pending",
            ProductStatus::Accepted => "accepted",
            ProductStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(ProductStatus::Pending),
            "accepted" => Some(ProductStatus::Accepted),
            "rejected" => Some(ProductStatus::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    Regular,
    Featured,
}

impl ProductType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::Regular => "regular",
            ProductType::Featured => "featured",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "regular" => Some(ProductType::Regular),
            "featured" => Some(ProductType::Featured),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: i64,
    pub product_name: String,
    pub product_image: String,
    pub product_description: String,
    pub external_link: Option<String>,
    pub tags: Vec<String>,
    pub vote: i64,
    pub liked_users: Vec<String>,
    pub report: i64,
    pub reported_users: Vec<String>,
    pub status: ProductStatus,
    #[serde(rename = "type")]
    pub product_type: ProductType,
    pub timestamp: String,
    pub user_email: String,
    pub user_name: Option<String>,
    pub user_image: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProduct {
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub product_image: String,
    #[serde(default)]
    pub product_description: String,
    pub external_link: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub user_email: String,
    pub user_name: Option<String>,
    pub user_image: Option<String>,
}

impl CreateProduct {
    /// Names of required fields that are missing or blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("productName", &self.product_name),
            ("productImage", &self.product_image),
            ("productDescription", &self.product_description),
            ("userEmail", &self.user_email),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProduct {
    pub product_name: Option<String>,
    pub product_image: Option<String>,
    pub product_description: Option<String>,
    pub external_link: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToggleRequest {
    #[serde(default)]
    pub user: String,
}

/// Which actor set a toggle operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tally {
    Votes,
    Reports,
}

impl Tally {
    fn member_table(self) -> &'static str {
        match self {
            Tally::Votes => "product_voters",
            Tally::Reports => "product_reporters",
        }
    }

    fn counter_column(self) -> &'static str {
        match self {
            Tally::Votes => "vote",
            Tally::Reports => "report",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tally::Votes => "vote",
            Tally::Reports => "report",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleAction {
    Added,
    Removed,
}

#[derive(Debug, Clone)]
pub struct ToggleResult {
    pub product: Product,
    pub action: ToggleAction,
}

const PRODUCT_COLUMNS: &str = r#"
    p.id, p.product_name, p.product_image, p.product_description, p.external_link, p.tags,
    p.vote,
    (SELECT json_group_array(email) FROM
        (SELECT email FROM product_voters WHERE product_id = p.id ORDER BY rowid)),
    p.report,
    (SELECT json_group_array(email) FROM
        (SELECT email FROM product_reporters WHERE product_id = p.id ORDER BY rowid)),
    p.status, p.type, p.created_at, p.owner_email, p.owner_name, p.owner_image
"#;

const TAG_FILTER: &str =
    "EXISTS (SELECT 1 FROM json_each(p.tags) WHERE lower(json_each.value) = lower(?))";

/// Trims, drops blanks and de-duplicates (case-insensitively) while keeping
/// first-seen order.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.trim();
        if tag.is_empty() || out.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            continue;
        }
        out.push(tag.to_string());
    }
    out
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub struct Products<'a> {
    db: &'a Database,
}

impl<'a> Products<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub async fn create_product(&self, input: CreateProduct) -> Result<Product> {
        let query = r#"
            INSERT INTO products (
                product_name, product_image, product_description, external_link, tags,
                status, type, owner_email, owner_name, owner_image
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
        "#;

        let tags = serde_json::to_string(&normalize_tags(input.tags))?;

        let id: i64 = {
            let _guard = self.db.write_lock().await;
            let mut rows = self
                .db
                .connection()
                .query(
                    query,
                    libsql::params![
                        input.product_name.trim(),
                        input.product_image.trim(),
                        input.product_description,
                        blank_to_none(input.external_link),
                        tags,
                        ProductStatus::Pending.as_str(),
                        ProductType::Regular.as_str(),
                        input.user_email.trim(),
                        input.user_name,
                        input.user_image
                    ],
                )
                .await?;

            match rows.next().await? {
                Some(row) => row.get(0)?,
                None => anyhow::bail!("Failed to create product"),
            }
        };

        self.get_product(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("product {} vanished after insert", id))
    }

    pub async fn get_product(&self, id: i64) -> Result<Option<Product>> {
        let _guard = self.db.read_lock().await;
        self.fetch_product(id).await
    }

    /// Lock-free lookup for callers already holding the write lock.
    async fn fetch_product(&self, id: i64) -> Result<Option<Product>> {
        let query = format!("SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = ?");

        let mut rows = self
            .db
            .connection()
            .query(&query, libsql::params![id])
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(self.row_to_product(&row)?))
        } else {
            Ok(None)
        }
    }

    /// Caller holds the write lock.
    async fn exists(&self, id: i64) -> Result<bool> {
        let mut rows = self
            .db
            .connection()
            .query("SELECT 1 FROM products WHERE id = ?", libsql::params![id])
            .await?;
        Ok(rows.next().await?.is_some())
    }

    async fn collect(&self, query: &str, params: Vec<libsql::Value>) -> Result<Vec<Product>> {
        let _guard = self.db.read_lock().await;
        let mut rows = self.db.connection().query(query, params).await?;
        let mut products = Vec::new();

        while let Some(row) = rows.next().await? {
            products.push(self.row_to_product(&row)?);
        }

        Ok(products)
    }

    pub async fn list_featured(&self, limit: i64) -> Result<Vec<Product>> {
        let query = format!(
            r#"
            SELECT {PRODUCT_COLUMNS} FROM products p
            WHERE p.type = ?
            ORDER BY p.created_at DESC, p.id DESC
            LIMIT ?
        "#
        );
        self.collect(&query, vec![ProductType::Featured.as_str().into(), limit.into()])
            .await
    }

    pub async fn list_trending(&self, limit: i64) -> Result<Vec<Product>> {
        let query = format!(
            r#"
            SELECT {PRODUCT_COLUMNS} FROM products p
            ORDER BY p.vote DESC, p.created_at DESC, p.id DESC
            LIMIT ?
        "#
        );
        self.collect(&query, vec![limit.into()]).await
    }

    /// All products, newest first, optionally narrowed to one tag and paged.
    pub async fn list_products(&self, tag: Option<&str>, page: Option<Page>) -> Result<Vec<Product>> {
        let mut query = format!("SELECT {PRODUCT_COLUMNS} FROM products p");
        let mut params: Vec<libsql::Value> = Vec::new();

        if let Some(tag) = tag {
            query.push_str(&format!(" WHERE {TAG_FILTER}"));
            params.push(tag.trim().into());
        }

        query.push_str(" ORDER BY p.created_at DESC, p.id DESC");

        if let Some(page) = page {
            query.push_str(" LIMIT ? OFFSET ?");
            params.push(page.limit.into());
            params.push(page.offset.into());
        }

        self.collect(&query, params).await
    }

    pub async fn count_products(&self, tag: Option<&str>) -> Result<i64> {
        let _guard = self.db.read_lock().await;
        let mut rows = match tag {
            Some(tag) => {
                let query = format!("SELECT COUNT(*) FROM products p WHERE {TAG_FILTER}");
                self.db
                    .connection()
                    .query(&query, libsql::params![tag.trim()])
                    .await?
            }
            None => {
                self.db
                    .connection()
                    .query("SELECT COUNT(*) FROM products", ())
                    .await?
            }
        };

        match rows.next().await? {
            Some(row) => Ok(row.get(0)?),
            None => Ok(0),
        }
    }

    pub async fn list_by_owner(&self, email: &str) -> Result<Vec<Product>> {
        let query = format!(
            r#"
            SELECT {PRODUCT_COLUMNS} FROM products p
            WHERE p.owner_email = ?
            ORDER BY p.created_at DESC, p.id DESC
        "#
        );
        self.collect(&query, vec![email.into()]).await
    }

    pub async fn list_reported(&self) -> Result<Vec<Product>> {
        let query = format!(
            r#"
            SELECT {PRODUCT_COLUMNS} FROM products p
            WHERE p.report > 0
            ORDER BY p.report DESC, p.id DESC
        "#
        );
        self.collect(&query, vec![]).await
    }

    /// `None` if the product does not exist, otherwise the number of rows changed.
    pub async fn update_product(&self, id: i64, input: UpdateProduct) -> Result<Option<u64>> {
        let mut updates = Vec::new();
        let mut params: Vec<libsql::Value> = Vec::new();

        if let Some(name) = &input.product_name {
            updates.push("product_name = ?");
            params.push(name.trim().into());
        }
        if let Some(image) = &input.product_image {
            updates.push("product_image = ?");
            params.push(image.trim().into());
        }
        if let Some(description) = &input.product_description {
            updates.push("product_description = ?");
            params.push(description.clone().into());
        }
        if let Some(link) = input.external_link {
            updates.push("external_link = ?");
            params.push(blank_to_none(Some(link)).into());
        }
        if let Some(tags) = input.tags {
            updates.push("tags = ?");
            params.push(serde_json::to_string(&normalize_tags(tags))?.into());
        }

        let _guard = self.db.write_lock().await;
        if !self.exists(id).await? {
            return Ok(None);
        }
        if updates.is_empty() {
            return Ok(Some(0));
        }

        updates.push("updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')");
        params.push(id.into());

        let query = format!("UPDATE products SET {} WHERE id = ?", updates.join(", "));
        let modified = self.db.connection().execute(&query, params).await?;
        Ok(Some(modified))
    }

    /// Removes the product together with its voter, reporter and review rows.
    pub async fn delete_product(&self, id: i64) -> Result<bool> {
        let _guard = self.db.begin().await?;
        let result = self.delete_product_internal(id).await;
        self.db.finish(result).await
    }

    async fn delete_product_internal(&self, id: i64) -> Result<bool> {
        let conn = self.db.connection();
        for child in ["product_voters", "product_reporters", "reviews"] {
            conn.execute(
                &format!("DELETE FROM {child} WHERE product_id = ?"),
                libsql::params![id],
            )
            .await?;
        }

        let removed = conn
            .execute("DELETE FROM products WHERE id = ?", libsql::params![id])
            .await?;
        Ok(removed > 0)
    }

    /// Adds `actor` to the product's voter (or reporter) set and bumps the
    /// counter, or removes it and decrements if it was already there.
    ///
    /// Membership test and both writes run in one transaction under the
    /// database write lock, so two concurrent toggles for the same product
    /// are applied one after the other and readers only see the committed
    /// result.
    pub async fn toggle(&self, id: i64, actor: &str, tally: Tally) -> Result<Option<ToggleResult>> {
        let _guard = self.db.begin().await?;
        let result = self.toggle_internal(id, actor, tally).await;
        self.db.finish(result).await
    }

    async fn toggle_internal(&self, id: i64, actor: &str, tally: Tally) -> Result<Option<ToggleResult>> {
        if !self.exists(id).await? {
            return Ok(None);
        }

        let conn = self.db.connection();
        let table = tally.member_table();
        let counter = tally.counter_column();

        let removed = conn
            .execute(
                &format!("DELETE FROM {table} WHERE product_id = ? AND email = ?"),
                libsql::params![id, actor],
            )
            .await?;

        let action = if removed > 0 {
            conn.execute(
                &format!("UPDATE products SET {counter} = {counter} - 1 WHERE id = ?"),
                libsql::params![id],
            )
            .await?;
            ToggleAction::Removed
        } else {
            conn.execute(
                &format!("INSERT INTO {table} (product_id, email) VALUES (?, ?)"),
                libsql::params![id, actor],
            )
            .await?;
            conn.execute(
                &format!("UPDATE products SET {counter} = {counter} + 1 WHERE id = ?"),
                libsql::params![id],
            )
            .await?;
            ToggleAction::Added
        };

        let product = self
            .fetch_product(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("product {} vanished during toggle", id))?;

        Ok(Some(ToggleResult { product, action }))
    }

    pub async fn set_status(&self, id: i64, status: ProductStatus) -> Result<Option<u64>> {
        self.set_column(id, "status", status.as_str()).await
    }

    pub async fn set_type(&self, id: i64, product_type: ProductType) -> Result<Option<u64>> {
        self.set_column(id, "type", product_type.as_str()).await
    }

    async fn set_column(&self, id: i64, column: &str, value: &str) -> Result<Option<u64>> {
        let query = format!(
            r#"
            UPDATE products
            SET {column} = ?, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
            WHERE id = ? AND {column} != ?
        "#
        );

        let _guard = self.db.write_lock().await;
        if !self.exists(id).await? {
            return Ok(None);
        }
        let modified = self
            .db
            .connection()
            .execute(&query, libsql::params![value, id, value])
            .await?;
        Ok(Some(modified))
    }

    fn row_to_product(&self, row: &libsql::Row) -> Result<Product> {
        let status_str: String = row.get(10)?;
        let status = ProductStatus::from_str(&status_str)
            .ok_or_else(|| anyhow::anyhow!("Invalid product status: {}", status_str))?;
        let type_str: String = row.get(11)?;
        let product_type = ProductType::from_str(&type_str)
            .ok_or_else(|| anyhow::anyhow!("Invalid product type: {}", type_str))?;

        Ok(Product {
            id: row.get(0)?,
            product_name: row.get(1)?,
            product_image: row.get(2)?,
            product_description: row.get(3)?,
            external_link: row.get(4)?,
            tags: json_string_list(row.get(5)?)?,
            vote: row.get(6)?,
            liked_users: json_string_list(row.get(7)?)?,
            report: row.get(8)?,
            reported_users: json_string_list(row.get(9)?)?,
            status,
            product_type,
            timestamp: row.get(12)?,
            user_email: row.get(13)?,
            user_name: row.get(14)?,
            user_image: row.get(15)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::init_test_tracing;
    use std::sync::Arc;

    fn submission(name: &str, owner: &str, tags: &[&str]) -> CreateProduct {
        CreateProduct {
            product_name: name.to_string(),
            product_image: "img".to_string(),
            product_description: "d".to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            user_email: owner.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn new_products_start_pending_and_empty() -> Result<()> {
        init_test_tracing();
        let db = Database::in_memory().await?;
        let lib = Products::new(&db);

        let product = lib.create_product(submission("X", "a@x.com", &["ai", " AI ", ""])).await?;
        assert_eq!(product.vote, 0);
        assert_eq!(product.report, 0);
        assert_eq!(product.status, ProductStatus::Pending);
        assert_eq!(product.product_type, ProductType::Regular);
        assert!(product.liked_users.is_empty());
        assert!(product.reported_users.is_empty());
        assert_eq!(product.tags, vec!["ai".to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn vote_toggle_alternates() -> Result<()> {
        init_test_tracing();
        let db = Database::in_memory().await?;
        let lib = Products::new(&db);
        let product = lib.create_product(submission("X", "a@x.com", &[])).await?;

        let first = lib.toggle(product.id, "b@y.com", Tally::Votes).await?.expect("product");
        assert_eq!(first.action, ToggleAction::Added);
        assert_eq!(first.product.vote, 1);
        assert_eq!(first.product.liked_users, vec!["b@y.com".to_string()]);

        let second = lib.toggle(product.id, "b@y.com", Tally::Votes).await?.expect("product");
        assert_eq!(second.action, ToggleAction::Removed);
        assert_eq!(second.product.vote, 0);
        assert!(second.product.liked_users.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn counters_match_sets_after_mixed_toggles() -> Result<()> {
        init_test_tracing();
        let db = Database::in_memory().await?;
        let lib = Products::new(&db);
        let product = lib.create_product(submission("X", "a@x.com", &[])).await?;

        let actors = ["a@x.com", "b@x.com", "a@x.com", "c@x.com", "b@x.com", "d@x.com", "a@x.com"];
        for actor in actors {
            lib.toggle(product.id, actor, Tally::Votes).await?;
            lib.toggle(product.id, actor, Tally::Reports).await?;
        }

        let product = lib.get_product(product.id).await?.expect("product");
        assert_eq!(product.vote, product.liked_users.len() as i64);
        assert_eq!(product.report, product.reported_users.len() as i64);
        assert_eq!(product.liked_users, vec!["c@x.com", "d@x.com", "a@x.com"]);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn readers_see_counters_matching_sets_during_toggles() -> Result<()> {
        init_test_tracing();
        let db = Arc::new(Database::in_memory().await?);
        let id = Products::new(&db).create_product(submission("X", "a@x.com", &[])).await?.id;

        let mut writers = Vec::new();
        for _ in 0..4 {
            let db = db.clone();
            writers.push(tokio::spawn(async move {
                for i in 0..50 {
                    let actor = format!("user{}@x.com", i % 5);
                    Products::new(&db).toggle(id, &actor, Tally::Votes).await?;
                }
                anyhow::Ok(())
            }));
        }

        loop {
            let done = writers.iter().all(|w| w.is_finished());
            let product = Products::new(&db).get_product(id).await?.expect("product");
            assert_eq!(product.vote, product.liked_users.len() as i64);

            let trending = Products::new(&db).list_trending(TRENDING_LIMIT).await?;
            assert_eq!(trending[0].vote, trending[0].liked_users.len() as i64);

            if done {
                break;
            }
            tokio::task::yield_now().await;
        }
        for writer in writers {
            writer.await??;
        }

        // every actor toggled an even number of times
        let product = Products::new(&db).get_product(id).await?.expect("product");
        assert_eq!(product.vote, 0);
        assert!(product.liked_users.is_empty());
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn update_racing_delete_never_reports_a_silent_noop() -> Result<()> {
        init_test_tracing();
        let db = Arc::new(Database::in_memory().await?);

        for _ in 0..20 {
            let id = Products::new(&db).create_product(submission("X", "a@x.com", &[])).await?.id;

            let updater = {
                let db = db.clone();
                tokio::spawn(async move {
                    Products::new(&db)
                        .update_product(
                            id,
                            UpdateProduct {
                                product_name: Some("Renamed".into()),
                                ..Default::default()
                            },
                        )
                        .await
                })
            };
            let deleter = {
                let db = db.clone();
                tokio::spawn(async move { Products::new(&db).delete_product(id).await })
            };

            let updated = updater.await??;
            assert!(deleter.await??);
            assert!(matches!(updated, None | Some(1)), "got {updated:?}");
        }
        Ok(())
    }

    #[tokio::test]
    async fn toggling_missing_product_is_none() -> Result<()> {
        let db = Database::in_memory().await?;
        let lib = Products::new(&db);
        assert!(lib.toggle(404, "a@x.com", Tally::Reports).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn moderation_is_unconditional() -> Result<()> {
        init_test_tracing();
        let db = Database::in_memory().await?;
        let lib = Products::new(&db);
        let id = lib.create_product(submission("X", "a@x.com", &[])).await?.id;

        assert_eq!(lib.set_status(id, ProductStatus::Accepted).await?, Some(1));
        assert_eq!(lib.set_status(id, ProductStatus::Accepted).await?, Some(0));
        assert_eq!(lib.set_status(id, ProductStatus::Rejected).await?, Some(1));
        assert_eq!(lib.set_status(id, ProductStatus::Accepted).await?, Some(1));
        assert_eq!(lib.set_type(id, ProductType::Featured).await?, Some(1));
        assert_eq!(lib.set_status(999, ProductStatus::Accepted).await?, None);

        let product = lib.get_product(id).await?.expect("product");
        assert_eq!(product.status, ProductStatus::Accepted);
        assert_eq!(product.product_type, ProductType::Featured);
        Ok(())
    }

    #[tokio::test]
    async fn listings_filter_and_order() -> Result<()> {
        init_test_tracing();
        let db = Database::in_memory().await?;
        let lib = Products::new(&db);

        let a = lib.create_product(submission("A", "a@x.com", &["AI", "tools"])).await?;
        let b = lib.create_product(submission("B", "b@x.com", &["games"])).await?;
        let c = lib.create_product(submission("C", "a@x.com", &["ai"])).await?;

        lib.toggle(b.id, "v1@x.com", Tally::Votes).await?;
        lib.toggle(b.id, "v2@x.com", Tally::Votes).await?;
        lib.toggle(c.id, "v1@x.com", Tally::Votes).await?;
        lib.toggle(a.id, "r@x.com", Tally::Reports).await?;
        lib.set_type(a.id, ProductType::Featured).await?;

        let trending: Vec<i64> = lib.list_trending(TRENDING_LIMIT).await?.iter().map(|p| p.id).collect();
        assert_eq!(trending, vec![b.id, c.id, a.id]);

        let featured = lib.list_featured(FEATURED_LIMIT).await?;
        assert_eq!(featured.len(), 1);
        assert_eq!(featured[0].id, a.id);

        let ai: Vec<i64> = lib.list_products(Some("ai"), None).await?.iter().map(|p| p.id).collect();
        assert_eq!(ai, vec![c.id, a.id]);
        assert_eq!(lib.count_products(Some("AI")).await?, 2);
        assert_eq!(lib.count_products(None).await?, 3);

        let paged = lib
            .list_products(None, Some(Page { limit: 2, offset: 2 }))
            .await?;
        assert_eq!(paged.len(), 1);
        assert_eq!(paged[0].id, a.id);

        let mine: Vec<i64> = lib.list_by_owner("a@x.com").await?.iter().map(|p| p.id).collect();
        assert_eq!(mine, vec![c.id, a.id]);

        let reported = lib.list_reported().await?;
        assert_eq!(reported.len(), 1);
        assert_eq!(reported[0].reported_users, vec!["r@x.com".to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn update_and_delete() -> Result<()> {
        init_test_tracing();
        let db = Database::in_memory().await?;
        let lib = Products::new(&db);
        let id = lib.create_product(submission("X", "a@x.com", &[])).await?.id;
        lib.toggle(id, "v@x.com", Tally::Votes).await?;

        let changed = lib
            .update_product(
                id,
                UpdateProduct {
                    product_name: Some("Renamed".into()),
                    tags: Some(vec!["new".into()]),
                    ..Default::default()
                },
            )
            .await?;
        assert_eq!(changed, Some(1));
        assert_eq!(lib.update_product(id, UpdateProduct::default()).await?, Some(0));
        assert_eq!(lib.update_product(999, UpdateProduct::default()).await?, None);

        let product = lib.get_product(id).await?.expect("product");
        assert_eq!(product.product_name, "Renamed");
        assert_eq!(product.tags, vec!["new".to_string()]);
        assert_eq!(product.vote, 1);

        assert!(lib.delete_product(id).await?);
        assert!(!lib.delete_product(id).await?);
        assert!(lib.get_product(id).await?.is_none());

        let mut rows = db
            .connection()
            .query("SELECT COUNT(*) FROM product_voters", ())
            .await?;
        let row = rows.next().await?.expect("count row");
        assert_eq!(row.get::<i64>(0)?, 0);
        Ok(())
    }

    #[test]
    fn reports_missing_required_fields() {
        let input = CreateProduct {
            product_name: "X".into(),
            product_image: " ".into(),
            ..Default::default()
        };
        assert_eq!(
            input.missing_fields(),
            vec!["productImage", "productDescription", "userEmail"]
        );
    }
}
