use anyhow::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::db::Database;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    #[serde(rename = "_id")]
    pub id: i64,
    pub code: String,
    pub expiry_date: NaiveDate,
    pub description: String,
    pub discount: f64,
    pub created_at: String,
    pub updated_at: String,
}

impl Coupon {
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiry_date < today
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCoupon {
    #[serde(default)]
    pub code: String,
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub description: String,
    pub discount: Option<f64>,
}

impl CreateCoupon {
    pub fn validate(&self) -> Result<(), String> {
        if self.code.trim().is_empty() {
            return Err("code is required".to_string());
        }
        if self.expiry_date.is_none() {
            return Err("expiryDate is required".to_string());
        }
        match self.discount {
            None => Err("discount is required".to_string()),
            Some(d) if !d.is_finite() || d < 0.0 => Err("discount must be a non-negative number".to_string()),
            Some(_) => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCoupon {
    pub code: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub discount: Option<f64>,
}

#[derive(Debug)]
pub enum CouponWrite<T> {
    Done(T),
    NotFound,
    DuplicateCode,
}

const COUPON_COLUMNS: &str = "id, code, expiry_date, description, discount, created_at, updated_at";

pub struct Coupons<'a> {
    db: &'a Database,
}

impl<'a> Coupons<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub async fn create_coupon(&self, input: CreateCoupon) -> Result<CouponWrite<Coupon>> {
        let expiry = input
            .expiry_date
            .ok_or_else(|| anyhow::anyhow!("expiryDate is required"))?;
        let discount = input
            .discount
            .ok_or_else(|| anyhow::anyhow!("discount is required"))?;

        let query = format!(
            r#"
            INSERT INTO coupons (code, expiry_date, description, discount)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(code) DO NOTHING
            RETURNING {COUPON_COLUMNS}
        "#
        );

        let _guard = self.db.write_lock().await;
        let mut rows = self
            .db
            .connection()
            .query(
                &query,
                libsql::params![
                    input.code.trim(),
                    expiry.format(DATE_FORMAT).to_string(),
                    input.description,
                    discount
                ],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(CouponWrite::Done(self.row_to_coupon(&row)?)),
            None => Ok(CouponWrite::DuplicateCode),
        }
    }

    pub async fn get_coupon(&self, id: i64) -> Result<Option<Coupon>> {
        let _guard = self.db.read_lock().await;
        self.fetch_by_id(id).await
    }

    pub async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>> {
        let _guard = self.db.read_lock().await;
        self.fetch_by_code(code).await
    }

    /// The coupon for `code` if it exists and is still usable on `today`.
    pub async fn find_valid(&self, code: &str, today: NaiveDate) -> Result<Option<Coupon>> {
        Ok(self
            .find_by_code(code)
            .await?
            .filter(|coupon| !coupon.is_expired(today)))
    }

    async fn fetch_by_id(&self, id: i64) -> Result<Option<Coupon>> {
        let query = format!("SELECT {COUPON_COLUMNS} FROM coupons WHERE id = ?");
        self.fetch_one(&query, libsql::params![id]).await
    }

    async fn fetch_by_code(&self, code: &str) -> Result<Option<Coupon>> {
        let query = format!("SELECT {COUPON_COLUMNS} FROM coupons WHERE code = ?");
        self.fetch_one(&query, libsql::params![code.trim()]).await
    }

    async fn fetch_one(&self, query: &str, params: impl libsql::params::IntoParams) -> Result<Option<Coupon>> {
        let mut rows = self.db.connection().query(query, params).await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(self.row_to_coupon(&row)?))
        } else {
            Ok(None)
        }
    }

    pub async fn list_coupons(&self) -> Result<Vec<Coupon>> {
        let query = format!("SELECT {COUPON_COLUMNS} FROM coupons ORDER BY expiry_date ASC, id ASC");

        let _guard = self.db.read_lock().await;
        let mut rows = self.db.connection().query(&query, ()).await?;
        let mut coupons = Vec::new();

        while let Some(row) = rows.next().await? {
            coupons.push(self.row_to_coupon(&row)?);
        }

        Ok(coupons)
    }

    /// The existence and code-uniqueness checks run under the write lock
    /// together with the update.
    pub async fn update_coupon(&self, id: i64, input: UpdateCoupon) -> Result<CouponWrite<u64>> {
        let _guard = self.db.write_lock().await;
        if self.fetch_by_id(id).await?.is_none() {
            return Ok(CouponWrite::NotFound);
        }

        let mut updates = Vec::new();
        let mut params: Vec<libsql::Value> = Vec::new();

        if let Some(code) = &input.code {
            if let Some(other) = self.fetch_by_code(code).await? {
                if other.id != id {
                    return Ok(CouponWrite::DuplicateCode);
                }
            }
            updates.push("code = ?");
            params.push(code.trim().into());
        }
        if let Some(expiry) = input.expiry_date {
            updates.push("expiry_date = ?");
            params.push(expiry.format(DATE_FORMAT).to_string().into());
        }
        if let Some(description) = input.description {
            updates.push("description = ?");
            params.push(description.into());
        }
        if let Some(discount) = input.discount {
            updates.push("discount = ?");
            params.push(discount.into());
        }

        if updates.is_empty() {
            return Ok(CouponWrite::Done(0));
        }

        updates.push("updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')");
        params.push(id.into());

        let query = format!("UPDATE coupons SET {} WHERE id = ?", updates.join(", "));
        let modified = self.db.connection().execute(&query, params).await?;
        Ok(CouponWrite::Done(modified))
    }

    pub async fn delete_coupon(&self, id: i64) -> Result<bool> {
        let _guard = self.db.write_lock().await;
        let result = self
            .db
            .connection()
            .execute("DELETE FROM coupons WHERE id = ?", libsql::params![id])
            .await?;
        Ok(result > 0)
    }

    fn row_to_coupon(&self, row: &libsql::Row) -> Result<Coupon> {
        let expiry_str: String = row.get(2)?;
        let expiry_date = NaiveDate::parse_from_str(&expiry_str, DATE_FORMAT)
            .map_err(|e| anyhow::anyhow!("Invalid coupon expiry {}: {}", expiry_str, e))?;

        Ok(Coupon {
            id: row.get(0)?,
            code: row.get(1)?,
            expiry_date,
            description: row.get(3)?,
            discount: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }
}
