use std::fmt::Debug;

use chrono::{DateTime, Utc};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Role {
    Admin,
    Cashier,
}

/// One-time password stored on a user during a verification flow.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct Otp {
    pub code: i32,
    pub valid_until: DateTime<Utc>,
}

impl Otp {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.valid_until
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct User {
    pub id: u64,
    /// External identifier, exposed instead of the numeric id.
    pub uuid: String,
    pub role: Role,
    pub username: String,
    pub password_hash: Vec<u8>,
    pub email: String,
    pub is_disabled: bool,
    pub otp: Option<Otp>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Category {
    pub id: u64,
    pub name: String,
    pub owner_id: u64,
    pub is_deleted: bool,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Product {
    pub id: u64,
    pub name: String,
    /// Price in the smallest currency unit.
    pub price: i64,
    pub description: Option<String>,
    pub category_id: u64,
    pub owner_id: u64,
    pub is_deactivated: bool,
}

/// Listing projection of a product joined with its category.
#[derive(Debug, PartialEq, Clone)]
pub struct ProductOverview {
    pub id: u64,
    pub name: String,
    pub price: i64,
    pub has_image: bool,
    pub category: Category,
}

#[derive(PartialEq, Clone)]
pub struct Image {
    pub data: Vec<u8>,
    pub mimetype: String,
}

impl Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field(
                "data",
                &format!("{:?}[..20]", &self.data[..20.min(self.data.len())]),
            )
            .field("mimetype", &self.mimetype)
            .finish()
    }
}

/// Client-supplied cart entry, the input of the transaction recorder.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct CartItem {
    pub product_id: u64,
    pub qty: i64,
}

/// Priced line item of a recorded transaction.
#[derive(Debug, PartialEq, Clone)]
pub struct ProductSold {
    pub id: u64,
    pub transaction_id: u64,
    pub product_id: u64,
    pub qty: i64,
    pub subtotal: i64,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Transaction {
    pub id: u64,
    /// The recording cashier.
    pub user_id: u64,
    pub created_at: DateTime<Utc>,
    /// Sum of all line subtotals, written once after the lines are inserted.
    pub total: i64,
    pub sales_report_id: Option<u64>,
    pub items: Vec<ProductSold>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Payment {
    pub id: u64,
    pub transaction_id: u64,
    pub payment_amount: i64,
    /// payment_amount - transaction total; negative when under-tendered.
    pub change: i64,
}

/// Aggregated sales summary. The schema carries it, no code path fills it.
#[derive(Debug, PartialEq, Clone)]
pub struct SalesReport {
    pub id: u64,
    pub name: String,
    pub report_date: DateTime<Utc>,
    pub date_start: DateTime<Utc>,
    pub date_end: DateTime<Utc>,
    pub total_sales: i64,
    pub graph: Option<String>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Session {
    pub user: User,
    pub token: String,
    pub valid_until: DateTime<Utc>,
}
