//! Postgres-backed repositories.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::aggregates::{Order, Quote, QuoteCustomer, QuoteItem, QuoteStatus, QuoteTotals};
use crate::domain::pricing::{
    AccountClassification, BusinessProfile, PricingRuleSet, PricingRules, RuleSetError, TaxSettings, VerificationStatus,
};
use crate::domain::repository::{BusinessProfileRepository, QuoteRepository, RepositoryError, RuleSetRepository};
use crate::domain::value_objects::{Money, Percentage};

#[derive(sqlx::FromRow)]
struct RuleSetRow {
    version: i64,
    guest_price_visible: bool,
    individual_price_visible: bool,
    business_unverified_price_visible: bool,
    business_verified_price_visible: bool,
    business_verified_can_buy: bool,
    bulk_pricing_enabled: bool,
    minimum_order_quantity: i32,
    discount_cap_percentage: Decimal,
    tax_enabled: bool,
    gst_rate_percentage: Decimal,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RuleSetRow> for PricingRuleSet {
    type Error = RepositoryError;

    fn try_from(row: RuleSetRow) -> Result<Self, Self::Error> {
        let percentage = |v: Decimal| Percentage::new(v).map_err(|e| RepositoryError::Corrupt(e.to_string()));
        Ok(Self {
            version: u64::try_from(row.version).map_err(|_| RepositoryError::Corrupt("negative rule set version".into()))?,
            rules: PricingRules {
                guest_price_visible: row.guest_price_visible,
                individual_price_visible: row.individual_price_visible,
                business_unverified_price_visible: row.business_unverified_price_visible,
                business_verified_price_visible: row.business_verified_price_visible,
                business_verified_can_buy: row.business_verified_can_buy,
                bulk_pricing_enabled: row.bulk_pricing_enabled,
                minimum_order_quantity: u32::try_from(row.minimum_order_quantity).unwrap_or(1).max(1),
                discount_cap_percentage: percentage(row.discount_cap_percentage)?,
                tax: TaxSettings { enabled: row.tax_enabled, gst_rate_percentage: percentage(row.gst_rate_percentage)? },
            },
            updated_at: row.updated_at,
        })
    }
}

const RULE_SET_COLUMNS: &str = "version, guest_price_visible, individual_price_visible, business_unverified_price_visible, \
    business_verified_price_visible, business_verified_can_buy, bulk_pricing_enabled, minimum_order_quantity, \
    discount_cap_percentage, tax_enabled, gst_rate_percentage, updated_at";

pub struct PgRuleSetRepository {
    pool: PgPool,
}

impl PgRuleSetRepository {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    /// Inserts the default rule set when the table is empty.
    pub async fn ensure_initialized(&self) -> Result<PricingRuleSet, RepositoryError> {
        if let Some(existing) = self.load().await? {
            return Ok(existing);
        }
        tracing::info!("initialising default pricing rules");
        match self.update(0, PricingRules::default()).await {
            Ok(created) => Ok(created),
            // Another instance initialised it first.
            Err(RepositoryError::RuleSet(RuleSetError::VersionConflict { .. })) => {
                self.load().await?.ok_or_else(|| RepositoryError::Corrupt("pricing rules missing".into()))
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl RuleSetRepository for PgRuleSetRepository {
    async fn load(&self) -> Result<Option<PricingRuleSet>, RepositoryError> {
        let row = sqlx::query_as::<_, RuleSetRow>(&format!("SELECT {RULE_SET_COLUMNS} FROM pricing_rules WHERE id = 1"))
            .fetch_optional(&self.pool)
            .await?;
        row.map(PricingRuleSet::try_from).transpose()
    }

    async fn update(&self, expected_version: u64, rules: PricingRules) -> Result<PricingRuleSet, RepositoryError> {
        rules.validate()?;
        let expected = i64::try_from(expected_version).map_err(|_| RepositoryError::Corrupt("version overflow".into()))?;
        let sql = if expected_version == 0 {
            format!(
                "INSERT INTO pricing_rules (id, version, guest_price_visible, individual_price_visible, \
                 business_unverified_price_visible, business_verified_price_visible, business_verified_can_buy, \
                 bulk_pricing_enabled, minimum_order_quantity, discount_cap_percentage, tax_enabled, gst_rate_percentage, updated_at) \
                 VALUES (1, $1 + 1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, NOW()) \
                 ON CONFLICT (id) DO NOTHING RETURNING {RULE_SET_COLUMNS}"
            )
        } else {
            format!(
                "UPDATE pricing_rules SET version = version + 1, guest_price_visible = $2, individual_price_visible = $3, \
                 business_unverified_price_visible = $4, business_verified_price_visible = $5, business_verified_can_buy = $6, \
                 bulk_pricing_enabled = $7, minimum_order_quantity = $8, discount_cap_percentage = $9, tax_enabled = $10, \
                 gst_rate_percentage = $11, updated_at = NOW() WHERE id = 1 AND version = $1 RETURNING {RULE_SET_COLUMNS}"
            )
        };
        let row = sqlx::query_as::<_, RuleSetRow>(&sql)
            .bind(expected)
            .bind(rules.guest_price_visible)
            .bind(rules.individual_price_visible)
            .bind(rules.business_unverified_price_visible)
            .bind(rules.business_verified_price_visible)
            .bind(rules.business_verified_can_buy)
            .bind(rules.bulk_pricing_enabled)
            .bind(i32::try_from(rules.minimum_order_quantity).unwrap_or(i32::MAX))
            .bind(rules.discount_cap_percentage.value())
            .bind(rules.tax.enabled)
            .bind(rules.tax.gst_rate_percentage.value())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => PricingRuleSet::try_from(row),
            None => {
                let actual = self.load().await?.map(|r| r.version).unwrap_or(0);
                tracing::warn!(expected_version, actual, "stale pricing rules update rejected");
                Err(RuleSetError::VersionConflict { expected: expected_version, actual }.into())
            }
        }
    }
}

#[derive(sqlx::FromRow)]
struct BusinessProfileRow {
    user_id: Uuid,
    company_name: String,
    gstin: Option<String>,
    verification_status: String,
}

pub struct PgBusinessProfileRepository {
    pool: PgPool,
}

impl PgBusinessProfileRepository {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[async_trait]
impl BusinessProfileRepository for PgBusinessProfileRepository {
    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<BusinessProfile>, RepositoryError> {
        let row = sqlx::query_as::<_, BusinessProfileRow>(
            "SELECT user_id, company_name, gstin, verification_status FROM business_profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| BusinessProfile {
            user_id: r.user_id,
            company_name: r.company_name,
            gstin: r.gstin,
            verification_status: VerificationStatus::parse(&r.verification_status),
        }))
    }
}

#[derive(sqlx::FromRow)]
struct QuoteRow {
    id: Uuid,
    quote_number: String,
    version: i64,
    user_id: Option<Uuid>,
    customer_name: String,
    customer_email: String,
    customer_phone: Option<String>,
    customer_company: Option<String>,
    classification: String,
    status: String,
    currency: String,
    subtotal: Option<Decimal>,
    tax: Option<Decimal>,
    total: Option<Decimal>,
    customer_notes: Option<String>,
    admin_notes: Option<String>,
    order_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct QuoteItemRow {
    id: Uuid,
    product_id: String,
    variant_id: Option<String>,
    name: String,
    sku: Option<String>,
    quantity: i32,
    list_price: Option<Decimal>,
    unit_price: Option<Decimal>,
    discount_percentage: Option<Decimal>,
    total: Option<Decimal>,
}

pub struct PgQuoteRepository {
    pool: PgPool,
}

impl PgQuoteRepository {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    /// Writes the quote row and its items. Updates only apply while the stored
    /// version still matches; returns the version now stored.
    async fn write_quote(tx: &mut Transaction<'_, Postgres>, quote: &Quote, insert: bool) -> Result<u64, RepositoryError> {
        let totals = quote.totals();
        let customer = quote.customer();
        let version = i64::try_from(quote.version()).map_err(|_| RepositoryError::Corrupt("quote version overflow".into()))?;
        let sql = if insert {
            "INSERT INTO quotes (id, quote_number, user_id, customer_name, customer_email, customer_phone, customer_company, \
             classification, status, currency, subtotal, tax, total, customer_notes, admin_notes, order_id, created_at, updated_at, \
             version) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)"
        } else {
            "UPDATE quotes SET quote_number = $2, user_id = $3, customer_name = $4, customer_email = $5, customer_phone = $6, \
             customer_company = $7, classification = $8, status = $9, currency = $10, subtotal = $11, tax = $12, total = $13, \
             customer_notes = $14, admin_notes = $15, order_id = $16, created_at = $17, updated_at = $18, \
             version = version + 1 WHERE id = $1 AND version = $19"
        };
        let written = sqlx::query(sql)
            .bind(quote.id())
            .bind(quote.quote_number())
            .bind(customer.user_id)
            .bind(&customer.name)
            .bind(&customer.email)
            .bind(&customer.phone)
            .bind(&customer.company)
            .bind(quote.classification().as_str())
            .bind(quote.status().as_str())
            .bind(quote.currency())
            .bind(totals.map(|t| t.subtotal.amount()))
            .bind(totals.map(|t| t.tax.amount()))
            .bind(totals.map(|t| t.total.amount()))
            .bind(quote.customer_notes())
            .bind(quote.admin_notes())
            .bind(quote.order_id())
            .bind(quote.created_at())
            .bind(quote.updated_at())
            .bind(version)
            .execute(&mut **tx)
            .await?;
        if written.rows_affected() == 0 {
            tracing::warn!(quote_id = %quote.id(), version, "stale quote write rejected");
            return Err(RepositoryError::Conflict(format!("quote {}", quote.id())));
        }

        sqlx::query("DELETE FROM quote_items WHERE quote_id = $1").bind(quote.id()).execute(&mut **tx).await?;
        for (position, item) in quote.items().iter().enumerate() {
            sqlx::query(
                "INSERT INTO quote_items (id, quote_id, position, product_id, variant_id, name, sku, quantity, list_price, \
                 unit_price, discount_percentage, total) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
            )
            .bind(item.id)
            .bind(quote.id())
            .bind(position as i32)
            .bind(&item.product_id)
            .bind(&item.variant_id)
            .bind(&item.name)
            .bind(&item.sku)
            .bind(i32::try_from(item.quantity).unwrap_or(i32::MAX))
            .bind(item.list_price.as_ref().map(Money::amount))
            .bind(item.unit_price.as_ref().map(Money::amount))
            .bind(item.discount_percentage.map(|d| d.value()))
            .bind(item.total.as_ref().map(Money::amount))
            .execute(&mut **tx)
            .await?;
        }
        Ok(if insert { quote.version() } else { quote.version() + 1 })
    }
}

fn restore_quote(row: QuoteRow, items: Vec<QuoteItemRow>) -> Result<Quote, RepositoryError> {
    let currency = row.currency;
    let money = |v: Option<Decimal>| v.map(|a| Money::new(a, &currency));
    let classification = AccountClassification::parse(&row.classification)
        .ok_or_else(|| RepositoryError::Corrupt(format!("unknown classification {}", row.classification)))?;
    let status = QuoteStatus::parse(&row.status)
        .ok_or_else(|| RepositoryError::Corrupt(format!("unknown quote status {}", row.status)))?;
    let totals = match (money(row.subtotal), money(row.tax), money(row.total)) {
        (Some(subtotal), Some(tax), Some(total)) => Some(QuoteTotals { subtotal, tax, total }),
        _ => None,
    };
    let items = items
        .into_iter()
        .map(|i| {
            Ok(QuoteItem {
                id: i.id,
                product_id: i.product_id,
                variant_id: i.variant_id,
                name: i.name,
                sku: i.sku,
                quantity: u32::try_from(i.quantity).map_err(|_| RepositoryError::Corrupt("negative quantity".into()))?,
                list_price: money(i.list_price),
                unit_price: money(i.unit_price),
                discount_percentage: i
                    .discount_percentage
                    .map(Percentage::new)
                    .transpose()
                    .map_err(|e| RepositoryError::Corrupt(e.to_string()))?,
                total: money(i.total),
            })
        })
        .collect::<Result<Vec<_>, RepositoryError>>()?;
    let customer = QuoteCustomer {
        user_id: row.user_id,
        name: row.customer_name,
        email: row.customer_email,
        phone: row.customer_phone,
        company: row.customer_company,
    };
    let version = u64::try_from(row.version).map_err(|_| RepositoryError::Corrupt("negative quote version".into()))?;
    Ok(Quote::restore(
        row.id, row.quote_number, version, customer, classification, status, items, currency.clone(), totals,
        row.customer_notes, row.admin_notes, row.order_id, row.created_at, row.updated_at,
    ))
}

#[async_trait]
impl QuoteRepository for PgQuoteRepository {
    async fn insert(&self, quote: &Quote) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        Self::write_quote(&mut tx, quote, true).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Quote>, RepositoryError> {
        let Some(row) = sqlx::query_as::<_, QuoteRow>("SELECT * FROM quotes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };
        let items = sqlx::query_as::<_, QuoteItemRow>(
            "SELECT id, product_id, variant_id, name, sku, quantity, list_price, unit_price, discount_percentage, total \
             FROM quote_items WHERE quote_id = $1 ORDER BY position",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        restore_quote(row, items).map(Some)
    }

    async fn save(&self, quote: &Quote) -> Result<u64, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let version = Self::write_quote(&mut tx, quote, false).await?;
        tx.commit().await?;
        Ok(version)
    }

    async fn save_conversion(&self, quote: &Quote, order: &Order) -> Result<u64, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        // The quote row is locked by this update until commit.
        let version = Self::write_quote(&mut tx, quote, false).await?;
        sqlx::query(
            "INSERT INTO orders (id, order_number, quote_id, customer_id, email, currency, subtotal, tax, total, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(order.id())
        .bind(order.order_number())
        .bind(order.quote_id())
        .bind(order.customer_id())
        .bind(order.email())
        .bind(order.total().currency())
        .bind(order.subtotal().amount())
        .bind(order.tax().amount())
        .bind(order.total().amount())
        .bind(order.created_at())
        .execute(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => RepositoryError::Conflict(format!("quote {}", quote.id())),
            other => RepositoryError::Database(other),
        })?;
        for item in order.items() {
            sqlx::query(
                "INSERT INTO order_items (id, order_id, product_id, variant_id, name, sku, quantity, unit_price, total) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            )
            .bind(item.id)
            .bind(order.id())
            .bind(&item.product_id)
            .bind(&item.variant_id)
            .bind(&item.name)
            .bind(&item.sku)
            .bind(i32::try_from(item.quantity).unwrap_or(i32::MAX))
            .bind(item.unit_price.amount())
            .bind(item.total.amount())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(version)
    }
}
