use std::collections::HashMap;

use base64::engine::general_purpose;
use base64::Engine;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use sqlx::migrate::Migrator;
use sqlx::pool::PoolConnection;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Connection, FromRow, Pool, Postgres, QueryBuilder};

use crate::checkout;
use crate::error::{ServiceError, ServiceResult};
use crate::models::{
    CartItem, Category, Image, Otp, Payment, Product, ProductOverview, ProductSold, Role,
    SalesReport, Session, Transaction, User,
};

mod migration;
#[cfg(test)]
mod tests;

/// Number of products per listing page.
pub const PRODUCT_PAGE_SIZE: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductSort {
    NameAsc,
    NameDesc,
    PriceAsc,
    PriceDesc,
}

/// Filter/sort/pagination parameters of the product listing.
#[derive(Debug, Clone)]
pub struct ProductQuery {
    pub category_id: Option<u64>,
    pub search: Option<String>,
    pub sort: ProductSort,
    /// 1-based page number.
    pub page: u64,
}

#[derive(Debug, Clone)]
pub struct ProductPage {
    pub total: u64,
    pub page: u64,
    pub products: Vec<ProductOverview>,
}

#[derive(Clone)]
pub struct AppState {
    pub pool: Pool<Postgres>,
}

impl AppState {
    pub async fn connect(url: &str) -> AppState {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .expect("connect to database");

        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: Pool<Postgres>) -> AppState {
        let migrator = Migrator::new(migration::postgresql_migrations())
            .await
            .expect("load migrations");
        migrator.run(&pool).await.expect("run migrations");

        AppState { pool }
    }
}

pub struct DatabaseConnection {
    pub connection: PoolConnection<Postgres>,
}

fn generate_session_token() -> String {
    let raw: [u8; 32] = rand::random();
    general_purpose::URL_SAFE_NO_PAD.encode(raw)
}

fn role_to_db(role: Role) -> i32 {
    match role {
        Role::Admin => 1,
        Role::Cashier => 2,
    }
}

fn role_from_db(value: i32) -> ServiceResult<Role> {
    match value {
        1 => Ok(Role::Admin),
        2 => Ok(Role::Cashier),
        other => Err(ServiceError::InternalServerError(format!(
            "invalid role value in database: {other}"
        ))),
    }
}

const USER_COLUMNS: &str =
    "id, uuid, role, username, password_hash, email, is_disabled, otp_code, otp_valid_until";

#[derive(FromRow)]
struct UserRow {
    id: i64,
    uuid: String,
    role: i32,
    username: String,
    password_hash: Vec<u8>,
    email: String,
    is_disabled: bool,
    otp_code: Option<i32>,
    otp_valid_until: Option<DateTime<Utc>>,
}

impl UserRow {
    fn into_user(self) -> ServiceResult<User> {
        let otp = match (self.otp_code, self.otp_valid_until) {
            (Some(code), Some(valid_until)) => Some(Otp { code, valid_until }),
            _ => None,
        };

        Ok(User {
            id: self.id as u64,
            uuid: self.uuid,
            role: role_from_db(self.role)?,
            username: self.username,
            password_hash: self.password_hash,
            email: self.email,
            is_disabled: self.is_disabled,
            otp,
        })
    }
}

#[derive(FromRow)]
struct SessionRow {
    token: String,
    user_id: i64,
    valid_until: DateTime<Utc>,
}

#[derive(FromRow)]
struct CategoryRow {
    id: i64,
    name: String,
    user_id: i64,
    is_deleted: bool,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: row.id as u64,
            name: row.name,
            owner_id: row.user_id as u64,
            is_deleted: row.is_deleted,
        }
    }
}

#[derive(FromRow)]
struct ProductRow {
    id: i64,
    name: String,
    price: i64,
    description: Option<String>,
    category_id: i64,
    user_id: i64,
    is_deactivated: bool,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id as u64,
            name: row.name,
            price: row.price,
            description: row.description,
            category_id: row.category_id as u64,
            owner_id: row.user_id as u64,
            is_deactivated: row.is_deactivated,
        }
    }
}

#[derive(FromRow)]
struct ProductOverviewRow {
    id: i64,
    name: String,
    price: i64,
    has_image: bool,
    category_id: i64,
    category_name: String,
    category_user_id: i64,
    category_is_deleted: bool,
}

impl From<ProductOverviewRow> for ProductOverview {
    fn from(row: ProductOverviewRow) -> Self {
        ProductOverview {
            id: row.id as u64,
            name: row.name,
            price: row.price,
            has_image: row.has_image,
            category: Category {
                id: row.category_id as u64,
                name: row.category_name,
                owner_id: row.category_user_id as u64,
                is_deleted: row.category_is_deleted,
            },
        }
    }
}

#[derive(FromRow)]
struct ImageRow {
    image_data: Option<Vec<u8>>,
    image_mimetype: Option<String>,
}

impl ImageRow {
    fn into_image(self) -> Option<Image> {
        match (self.image_data, self.image_mimetype) {
            (Some(data), Some(mimetype)) => Some(Image { data, mimetype }),
            _ => None,
        }
    }
}

#[derive(FromRow)]
struct TransactionRow {
    id: i64,
    user_id: i64,
    created_at: DateTime<Utc>,
    total: i64,
    sales_report_id: Option<i64>,
}

impl From<TransactionRow> for Transaction {
    fn from(row: TransactionRow) -> Self {
        Transaction {
            id: row.id as u64,
            user_id: row.user_id as u64,
            created_at: row.created_at,
            total: row.total,
            sales_report_id: row.sales_report_id.map(|id| id as u64),
            items: Vec::new(),
        }
    }
}

#[derive(FromRow)]
struct ProductSoldRow {
    id: i64,
    transaction_id: i64,
    product_id: i64,
    qty: i64,
    subtotal: i64,
}

impl From<ProductSoldRow> for ProductSold {
    fn from(row: ProductSoldRow) -> Self {
        ProductSold {
            id: row.id as u64,
            transaction_id: row.transaction_id as u64,
            product_id: row.product_id as u64,
            qty: row.qty,
            subtotal: row.subtotal,
        }
    }
}

#[derive(FromRow)]
struct SalesReportRow {
    id: i64,
    name: String,
    report_date: DateTime<Utc>,
    date_start: DateTime<Utc>,
    date_end: DateTime<Utc>,
    total_sales: i64,
    graph: Option<String>,
}

impl From<SalesReportRow> for SalesReport {
    fn from(row: SalesReportRow) -> Self {
        SalesReport {
            id: row.id as u64,
            name: row.name,
            report_date: row.report_date,
            date_start: row.date_start,
            date_end: row.date_end,
            total_sales: row.total_sales,
            graph: row.graph,
        }
    }
}

#[derive(FromRow)]
struct PaymentRow {
    id: i64,
    transaction_id: i64,
    payment_amount: i64,
    change: i64,
}

impl From<PaymentRow> for Payment {
    fn from(row: PaymentRow) -> Self {
        Payment {
            id: row.id as u64,
            transaction_id: row.transaction_id as u64,
            payment_amount: row.payment_amount,
            change: row.change,
        }
    }
}

impl DatabaseConnection {
    // ------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------

    pub async fn create_session_token(
        &mut self,
        user_id: u64,
        valid_until: DateTime<Utc>,
    ) -> ServiceResult<String> {
        let token = generate_session_token();

        sqlx::query("INSERT INTO sessions (token, user_id, valid_until) VALUES ($1, $2, $3)")
            .bind(&token)
            .bind(user_id as i64)
            .bind(valid_until)
            .execute(&mut *self.connection)
            .await?;

        Ok(token)
    }

    pub async fn get_session_by_session_token(
        &mut self,
        session_token: String,
    ) -> ServiceResult<Option<Session>> {
        let row: Option<SessionRow> = sqlx::query_as(
            "SELECT token, user_id, valid_until FROM sessions WHERE token = $1 AND valid_until > NOW()",
        )
        .bind(&session_token)
        .fetch_optional(&mut *self.connection)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let user = self.get_user_by_id(row.user_id as u64).await?;
        Ok(user.map(|user| Session {
            user,
            token: row.token,
            valid_until: row.valid_until,
        }))
    }

    pub async fn delete_session_token(&mut self, session_token: String) -> ServiceResult<()> {
        sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(&session_token)
            .execute(&mut *self.connection)
            .await?;

        Ok(())
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    pub async fn store_user(&mut self, user: User) -> ServiceResult<User> {
        let otp_code = user.otp.map(|otp| otp.code);
        let otp_valid_until = user.otp.map(|otp| otp.valid_until);

        let row: UserRow = if user.id == 0 {
            sqlx::query_as(
                "INSERT INTO users (uuid, role, username, password_hash, email, is_disabled, otp_code, otp_valid_until) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
                 RETURNING id, uuid, role, username, password_hash, email, is_disabled, otp_code, otp_valid_until",
            )
            .bind(&user.uuid)
            .bind(role_to_db(user.role))
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(&user.email)
            .bind(user.is_disabled)
            .bind(otp_code)
            .bind(otp_valid_until)
            .fetch_one(&mut *self.connection)
            .await?
        } else {
            sqlx::query_as(
                "UPDATE users SET uuid = $2, role = $3, username = $4, password_hash = $5, email = $6, is_disabled = $7, otp_code = $8, otp_valid_until = $9 \
                 WHERE id = $1 \
                 RETURNING id, uuid, role, username, password_hash, email, is_disabled, otp_code, otp_valid_until",
            )
            .bind(user.id as i64)
            .bind(&user.uuid)
            .bind(role_to_db(user.role))
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(&user.email)
            .bind(user.is_disabled)
            .bind(otp_code)
            .bind(otp_valid_until)
            .fetch_one(&mut *self.connection)
            .await?
        };

        row.into_user()
    }

    pub async fn get_user_by_id(&mut self, id: u64) -> ServiceResult<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id as i64)
                .fetch_optional(&mut *self.connection)
                .await?;

        row.map(UserRow::into_user).transpose()
    }

    pub async fn get_user_by_uuid(&mut self, uuid: &str) -> ServiceResult<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE uuid = $1"))
                .bind(uuid)
                .fetch_optional(&mut *self.connection)
                .await?;

        row.map(UserRow::into_user).transpose()
    }

    pub async fn get_user_by_username(&mut self, username: &str) -> ServiceResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&mut *self.connection)
        .await?;

        row.map(UserRow::into_user).transpose()
    }

    pub async fn get_user_by_email(&mut self, email: &str) -> ServiceResult<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
                .bind(email)
                .fetch_optional(&mut *self.connection)
                .await?;

        row.map(UserRow::into_user).transpose()
    }

    /// Duplicate check used by registration, matches on username and email together.
    pub async fn get_user_by_username_and_email(
        &mut self,
        username: &str,
        email: &str,
    ) -> ServiceResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1 AND email = $2"
        ))
        .bind(username)
        .bind(email)
        .fetch_optional(&mut *self.connection)
        .await?;

        row.map(UserRow::into_user).transpose()
    }

    pub async fn get_cashiers(&mut self, disabled: bool) -> ServiceResult<Vec<User>> {
        let rows: Vec<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE role = 2 AND is_disabled = $1 ORDER BY id"
        ))
        .bind(disabled)
        .fetch_all(&mut *self.connection)
        .await?;

        rows.into_iter().map(UserRow::into_user).collect()
    }

    pub async fn get_user_image(&mut self, id: u64) -> ServiceResult<Option<Image>> {
        let row: Option<ImageRow> =
            sqlx::query_as("SELECT image_data, image_mimetype FROM users WHERE id = $1")
                .bind(id as i64)
                .fetch_optional(&mut *self.connection)
                .await?;

        Ok(row.and_then(ImageRow::into_image))
    }

    pub async fn store_user_image(&mut self, id: u64, image: Image) -> ServiceResult<()> {
        sqlx::query("UPDATE users SET image_data = $2, image_mimetype = $3 WHERE id = $1")
            .bind(id as i64)
            .bind(&image.data)
            .bind(&image.mimetype)
            .execute(&mut *self.connection)
            .await?;

        Ok(())
    }

    // ------------------------------------------------------------------
    // Categories
    // ------------------------------------------------------------------

    pub async fn get_all_categories(&mut self) -> ServiceResult<Vec<Category>> {
        let rows: Vec<CategoryRow> = sqlx::query_as(
            "SELECT id, name, user_id, is_deleted FROM categories WHERE is_deleted = FALSE ORDER BY name",
        )
        .fetch_all(&mut *self.connection)
        .await?;

        Ok(rows.into_iter().map(Category::from).collect())
    }

    pub async fn get_category_by_id(&mut self, id: u64) -> ServiceResult<Option<Category>> {
        let row: Option<CategoryRow> = sqlx::query_as(
            "SELECT id, name, user_id, is_deleted FROM categories WHERE id = $1 AND is_deleted = FALSE",
        )
        .bind(id as i64)
        .fetch_optional(&mut *self.connection)
        .await?;

        Ok(row.map(Category::from))
    }

    /// Application level uniqueness check before category inserts.
    pub async fn get_category_by_name(&mut self, name: &str) -> ServiceResult<Option<Category>> {
        let row: Option<CategoryRow> = sqlx::query_as(
            "SELECT id, name, user_id, is_deleted FROM categories WHERE name = $1 AND is_deleted = FALSE",
        )
        .bind(name)
        .fetch_optional(&mut *self.connection)
        .await?;

        Ok(row.map(Category::from))
    }

    pub async fn store_category(&mut self, category: Category) -> ServiceResult<Category> {
        let row: CategoryRow = if category.id == 0 {
            sqlx::query_as(
                "INSERT INTO categories (name, user_id, is_deleted) VALUES ($1, $2, $3) \
                 RETURNING id, name, user_id, is_deleted",
            )
            .bind(&category.name)
            .bind(category.owner_id as i64)
            .bind(category.is_deleted)
            .fetch_one(&mut *self.connection)
            .await?
        } else {
            sqlx::query_as(
                "UPDATE categories SET name = $2, user_id = $3, is_deleted = $4 WHERE id = $1 \
                 RETURNING id, name, user_id, is_deleted",
            )
            .bind(category.id as i64)
            .bind(&category.name)
            .bind(category.owner_id as i64)
            .bind(category.is_deleted)
            .fetch_one(&mut *self.connection)
            .await?
        };

        Ok(row.into())
    }

    // ------------------------------------------------------------------
    // Products
    // ------------------------------------------------------------------

    pub async fn get_products(&mut self, query: &ProductQuery) -> ServiceResult<ProductPage> {
        fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &ProductQuery) {
            if let Some(category_id) = query.category_id {
                qb.push(" AND p.category_id = ").push_bind(category_id as i64);
            }
            if let Some(ref search) = query.search {
                qb.push(" AND p.name ILIKE ").push_bind(format!("%{search}%"));
            }
        }

        let mut count_query =
            QueryBuilder::new("SELECT COUNT(*) FROM products p WHERE p.is_deactivated = FALSE");
        push_filters(&mut count_query, query);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(&mut *self.connection)
            .await?;

        let mut select_query = QueryBuilder::new(
            "SELECT p.id, p.name, p.price, p.image_data IS NOT NULL AS has_image, \
             c.id AS category_id, c.name AS category_name, c.user_id AS category_user_id, c.is_deleted AS category_is_deleted \
             FROM products p JOIN categories c ON c.id = p.category_id \
             WHERE p.is_deactivated = FALSE",
        );
        push_filters(&mut select_query, query);

        select_query.push(match query.sort {
            ProductSort::NameAsc => " ORDER BY p.name ASC",
            ProductSort::NameDesc => " ORDER BY p.name DESC",
            ProductSort::PriceAsc => " ORDER BY p.price ASC",
            ProductSort::PriceDesc => " ORDER BY p.price DESC",
        });

        let page = query.page.max(1);
        let offset = (page - 1) * PRODUCT_PAGE_SIZE;
        select_query.push(" LIMIT ").push_bind(PRODUCT_PAGE_SIZE as i64);
        select_query.push(" OFFSET ").push_bind(offset as i64);

        let mut rows = select_query
            .build_query_as::<ProductOverviewRow>()
            .fetch(&mut *self.connection);

        let mut products = Vec::new();
        while let Some(row) = rows.try_next().await? {
            products.push(row.into());
        }

        Ok(ProductPage {
            total: total as u64,
            page,
            products,
        })
    }

    pub async fn get_product_by_id(&mut self, id: u64) -> ServiceResult<Option<Product>> {
        let row: Option<ProductRow> = sqlx::query_as(
            "SELECT id, name, price, description, category_id, user_id, is_deactivated \
             FROM products WHERE id = $1",
        )
        .bind(id as i64)
        .fetch_optional(&mut *self.connection)
        .await?;

        Ok(row.map(Product::from))
    }

    /// Application level uniqueness check before product inserts.
    pub async fn get_product_by_name(&mut self, name: &str) -> ServiceResult<Option<Product>> {
        let row: Option<ProductRow> = sqlx::query_as(
            "SELECT id, name, price, description, category_id, user_id, is_deactivated \
             FROM products WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&mut *self.connection)
        .await?;

        Ok(row.map(Product::from))
    }

    pub async fn store_product(&mut self, product: Product) -> ServiceResult<Product> {
        let row: ProductRow = if product.id == 0 {
            sqlx::query_as(
                "INSERT INTO products (name, price, description, category_id, user_id, is_deactivated) \
                 VALUES ($1, $2, $3, $4, $5, $6) \
                 RETURNING id, name, price, description, category_id, user_id, is_deactivated",
            )
            .bind(&product.name)
            .bind(product.price)
            .bind(&product.description)
            .bind(product.category_id as i64)
            .bind(product.owner_id as i64)
            .bind(product.is_deactivated)
            .fetch_one(&mut *self.connection)
            .await?
        } else {
            sqlx::query_as(
                "UPDATE products SET name = $2, price = $3, description = $4, category_id = $5, user_id = $6, is_deactivated = $7 \
                 WHERE id = $1 \
                 RETURNING id, name, price, description, category_id, user_id, is_deactivated",
            )
            .bind(product.id as i64)
            .bind(&product.name)
            .bind(product.price)
            .bind(&product.description)
            .bind(product.category_id as i64)
            .bind(product.owner_id as i64)
            .bind(product.is_deactivated)
            .fetch_one(&mut *self.connection)
            .await?
        };

        Ok(row.into())
    }

    pub async fn get_product_image(&mut self, id: u64) -> ServiceResult<Option<Image>> {
        let row: Option<ImageRow> =
            sqlx::query_as("SELECT image_data, image_mimetype FROM products WHERE id = $1")
                .bind(id as i64)
                .fetch_optional(&mut *self.connection)
                .await?;

        Ok(row.and_then(ImageRow::into_image))
    }

    pub async fn store_product_image(&mut self, id: u64, image: Image) -> ServiceResult<()> {
        sqlx::query("UPDATE products SET image_data = $2, image_mimetype = $3 WHERE id = $1")
            .bind(id as i64)
            .bind(&image.data)
            .bind(&image.mimetype)
            .execute(&mut *self.connection)
            .await?;

        Ok(())
    }

    pub async fn delete_product_image(&mut self, id: u64) -> ServiceResult<()> {
        sqlx::query("UPDATE products SET image_data = NULL, image_mimetype = NULL WHERE id = $1")
            .bind(id as i64)
            .execute(&mut *self.connection)
            .await?;

        Ok(())
    }

    // ------------------------------------------------------------------
    // Transactions
    // ------------------------------------------------------------------

    /// Record a transaction for the given cashier.
    ///
    /// The header and all line items are written in one database
    /// transaction. Any failure, including an unknown product in the cart,
    /// rolls the whole write back, no header with a stale zero total
    /// becomes visible.
    pub async fn create_transaction(
        &mut self,
        user_id: u64,
        cart: &[CartItem],
    ) -> ServiceResult<Transaction> {
        let mut tx = self.connection.begin().await?;

        let header: TransactionRow = sqlx::query_as(
            "INSERT INTO transactions (user_id, created_at, total) VALUES ($1, $2, 0) \
             RETURNING id, user_id, created_at, total, sales_report_id",
        )
        .bind(user_id as i64)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        // Current catalog prices; deactivated products are not sellable.
        let mut prices = HashMap::new();
        for item in cart {
            let price: Option<(i64,)> = sqlx::query_as(
                "SELECT price FROM products WHERE id = $1 AND is_deactivated = FALSE",
            )
            .bind(item.product_id as i64)
            .fetch_optional(&mut *tx)
            .await?;

            if let Some((price,)) = price {
                prices.insert(item.product_id, price);
            }
        }

        let (total, lines) = checkout::price_cart(cart, |id| prices.get(&id).copied())?;

        let mut items = Vec::with_capacity(lines.len());
        for line in &lines {
            let row: ProductSoldRow = sqlx::query_as(
                "INSERT INTO products_sold (transaction_id, product_id, qty, subtotal) \
                 VALUES ($1, $2, $3, $4) \
                 RETURNING id, transaction_id, product_id, qty, subtotal",
            )
            .bind(header.id)
            .bind(line.product_id as i64)
            .bind(line.qty)
            .bind(line.subtotal)
            .fetch_one(&mut *tx)
            .await?;

            items.push(row.into());
        }

        sqlx::query("UPDATE transactions SET total = $1 WHERE id = $2")
            .bind(total)
            .bind(header.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let mut transaction = Transaction::from(header);
        transaction.total = total;
        transaction.items = items;
        Ok(transaction)
    }

    pub async fn get_transaction_by_id(&mut self, id: u64) -> ServiceResult<Option<Transaction>> {
        let row: Option<TransactionRow> = sqlx::query_as(
            "SELECT id, user_id, created_at, total, sales_report_id FROM transactions WHERE id = $1",
        )
        .bind(id as i64)
        .fetch_optional(&mut *self.connection)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut transaction = Transaction::from(row);
        transaction.items = self.get_transaction_items(transaction.id).await?;
        Ok(Some(transaction))
    }

    pub async fn get_transactions(&mut self) -> ServiceResult<Vec<Transaction>> {
        let rows: Vec<TransactionRow> = sqlx::query_as(
            "SELECT id, user_id, created_at, total, sales_report_id FROM transactions ORDER BY id",
        )
        .fetch_all(&mut *self.connection)
        .await?;

        let mut transactions = Vec::with_capacity(rows.len());
        for row in rows {
            let mut transaction = Transaction::from(row);
            transaction.items = self.get_transaction_items(transaction.id).await?;
            transactions.push(transaction);
        }

        Ok(transactions)
    }

    async fn get_transaction_items(&mut self, transaction_id: u64) -> ServiceResult<Vec<ProductSold>> {
        let rows: Vec<ProductSoldRow> = sqlx::query_as(
            "SELECT id, transaction_id, product_id, qty, subtotal \
             FROM products_sold WHERE transaction_id = $1 ORDER BY id",
        )
        .bind(transaction_id as i64)
        .fetch_all(&mut *self.connection)
        .await?;

        Ok(rows.into_iter().map(ProductSold::from).collect())
    }

    // ------------------------------------------------------------------
    // Sales reports
    // ------------------------------------------------------------------

    /// Nothing writes sales reports yet, transactions only carry the
    /// optional link.
    pub async fn get_sales_reports(&mut self) -> ServiceResult<Vec<SalesReport>> {
        let rows: Vec<SalesReportRow> = sqlx::query_as(
            "SELECT id, name, report_date, date_start, date_end, total_sales, graph \
             FROM sales_reports ORDER BY id",
        )
        .fetch_all(&mut *self.connection)
        .await?;

        Ok(rows.into_iter().map(SalesReport::from).collect())
    }

    // ------------------------------------------------------------------
    // Payments
    // ------------------------------------------------------------------

    pub async fn store_payment(&mut self, payment: Payment) -> ServiceResult<Payment> {
        let row: PaymentRow = sqlx::query_as(
            "INSERT INTO payments (transaction_id, payment_amount, change) VALUES ($1, $2, $3) \
             RETURNING id, transaction_id, payment_amount, change",
        )
        .bind(payment.transaction_id as i64)
        .bind(payment.payment_amount)
        .bind(payment.change)
        .fetch_one(&mut *self.connection)
        .await
        .map_err(|err| {
            if let sqlx::Error::Database(ref db_error) = err {
                if db_error.is_unique_violation() {
                    return ServiceError::Conflict(format!(
                        "A payment for transaction {} already exists.",
                        payment.transaction_id
                    ));
                }
            }
            err.into()
        })?;

        Ok(row.into())
    }

    pub async fn get_payment_by_transaction_id(
        &mut self,
        transaction_id: u64,
    ) -> ServiceResult<Option<Payment>> {
        let row: Option<PaymentRow> = sqlx::query_as(
            "SELECT id, transaction_id, payment_amount, change FROM payments WHERE transaction_id = $1",
        )
        .bind(transaction_id as i64)
        .fetch_optional(&mut *self.connection)
        .await?;

        Ok(row.map(Payment::from))
    }
}
