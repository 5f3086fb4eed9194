use aide::axum::routing::{get_with, post_with};
use aide::axum::ApiRouter;
use aide::transform::TransformOperation;
use axum::extract::Path;
use axum::Json;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::database::AppState;
use crate::error::{ServiceError, ServiceResult};
use crate::request_state::RequestState;
use crate::{checkout, env, models};

use super::Created;

pub fn router(app_state: AppState) -> ApiRouter {
    ApiRouter::new()
        .api_route(
            "/transaction",
            post_with(create_transaction, create_transaction_docs),
        )
        .api_route(
            "/transaction/:id",
            get_with(get_transaction, get_transaction_docs),
        )
        .api_route(
            "/transactions",
            get_with(list_transactions, list_transactions_docs),
        )
        .api_route(
            "/:transaction_id/payment",
            post_with(record_payment, record_payment_docs),
        )
        .api_route(
            "/sales-reports",
            get_with(list_sales_reports, list_sales_reports_docs),
        )
        .with_state(app_state)
}

#[derive(Debug, PartialEq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartItemDto {
    pub product_id: u64,
    pub qty: i64,
}

#[derive(Debug, PartialEq, Deserialize, JsonSchema)]
pub struct CreateTransactionDto {
    pub products: Vec<CartItemDto>,
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDto {
    pub transaction_id: u64,
    pub user_id: u64,
    pub total: i64,
    pub created_at: String,
}

impl From<&models::Transaction> for TransactionDto {
    fn from(value: &models::Transaction) -> Self {
        Self {
            transaction_id: value.id.to_owned(),
            user_id: value.user_id.to_owned(),
            total: value.total,
            created_at: format!("{:?}", value.created_at),
        }
    }
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductSoldDto {
    pub product_sold_id: u64,
    pub transaction_id: u64,
    pub product_id: u64,
    pub qty: i64,
    pub subtotal: i64,
}

impl From<&models::ProductSold> for ProductSoldDto {
    fn from(value: &models::ProductSold) -> Self {
        Self {
            product_sold_id: value.id.to_owned(),
            transaction_id: value.transaction_id.to_owned(),
            product_id: value.product_id.to_owned(),
            qty: value.qty,
            subtotal: value.subtotal,
        }
    }
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDetailDto {
    pub transaction_id: u64,
    pub user_id: u64,
    pub total: i64,
    pub created_at: String,
    pub sales_report_id: Option<u64>,
    pub products: Vec<ProductSoldDto>,
}

impl From<&models::Transaction> for TransactionDetailDto {
    fn from(value: &models::Transaction) -> Self {
        Self {
            transaction_id: value.id.to_owned(),
            user_id: value.user_id.to_owned(),
            total: value.total,
            created_at: format!("{:?}", value.created_at),
            sales_report_id: value.sales_report_id.to_owned(),
            products: value.items.iter().map(|i| i.into()).collect(),
        }
    }
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
pub struct TransactionCreatedDto {
    pub r#type: String,
    pub message: String,
    pub transaction: TransactionDto,
}

async fn create_transaction(
    mut state: RequestState,
    form: Json<CreateTransactionDto>,
) -> ServiceResult<Created<TransactionCreatedDto>> {
    let session = state.session_require_cashier()?;
    let form = form.0;

    let cart: Vec<models::CartItem> = form
        .products
        .iter()
        .map(|item| models::CartItem {
            product_id: item.product_id,
            qty: item.qty,
        })
        .collect();

    let transaction = state
        .db
        .create_transaction(session.user.id, &cart)
        .await?;

    Ok(Created(TransactionCreatedDto {
        r#type: "success".to_string(),
        message: "Create transaction success".to_string(),
        transaction: TransactionDto::from(&transaction),
    }))
}

fn create_transaction_docs(op: TransformOperation) -> TransformOperation {
    op.description("Record a transaction from a cart of products.")
        .tag("transactions")
        .response::<201, Json<TransactionCreatedDto>>()
        .response_with::<400, (), _>(|res| {
            res.description("The cart is empty or contains an invalid quantity!")
        })
        .response_with::<404, (), _>(|res| {
            res.description("A product in the cart does not exist!")
        })
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["cashier"])
}

async fn get_transaction(
    mut state: RequestState,
    Path(id): Path<u64>,
) -> ServiceResult<Json<TransactionDetailDto>> {
    let session = state.session_require()?;

    let transaction = state.db.get_transaction_by_id(id).await?;

    if let Some(transaction) = transaction {
        if session.user.role == models::Role::Admin || transaction.user_id == session.user.id {
            return Ok(Json(TransactionDetailDto::from(&transaction)));
        }
    }

    Err(ServiceError::NotFound(format!(
        "Transaction with ID {id} not found."
    )))
}

fn get_transaction_docs(op: TransformOperation) -> TransformOperation {
    op.description("Get a recorded transaction with its line items.")
        .tag("transactions")
        .response::<200, Json<TransactionDetailDto>>()
        .response_with::<404, (), _>(|res| {
            res.description("The requested transaction does not exist!")
        })
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .security_requirement_scopes("SessionToken", ["admin", "cashier"])
}

async fn list_transactions(
    mut state: RequestState,
) -> ServiceResult<Json<Vec<TransactionDetailDto>>> {
    state.session_require_admin()?;

    let transactions = state.db.get_transactions().await?;
    Ok(Json(transactions.iter().map(|t| t.into()).collect()))
}

fn list_transactions_docs(op: TransformOperation) -> TransformOperation {
    op.description("List all recorded transactions.")
        .tag("transactions")
        .response::<200, Json<Vec<TransactionDetailDto>>>()
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["admin"])
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SalesReportDto {
    pub sales_report_id: u64,
    pub sales_report_name: String,
    pub sales_report_date: String,
    pub date_start: String,
    pub date_end: String,
    pub total_sales: i64,
    pub graph: Option<String>,
}

impl From<&models::SalesReport> for SalesReportDto {
    fn from(value: &models::SalesReport) -> Self {
        Self {
            sales_report_id: value.id.to_owned(),
            sales_report_name: value.name.to_owned(),
            sales_report_date: format!("{:?}", value.report_date),
            date_start: format!("{:?}", value.date_start),
            date_end: format!("{:?}", value.date_end),
            total_sales: value.total_sales,
            graph: value.graph.to_owned(),
        }
    }
}

async fn list_sales_reports(
    mut state: RequestState,
) -> ServiceResult<Json<Vec<SalesReportDto>>> {
    state.session_require_admin()?;

    let reports = state.db.get_sales_reports().await?;
    Ok(Json(reports.iter().map(|r| r.into()).collect()))
}

fn list_sales_reports_docs(op: TransformOperation) -> TransformOperation {
    op.description("List all sales reports.")
        .tag("transactions")
        .response::<200, Json<Vec<SalesReportDto>>>()
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["admin"])
}

#[derive(Debug, PartialEq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordPaymentDto {
    pub payment_amount: i64,
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDto {
    pub payment_id: u64,
    pub transaction_id: u64,
    pub payment_amount: i64,
    pub change: i64,
}

impl From<&models::Payment> for PaymentDto {
    fn from(value: &models::Payment) -> Self {
        Self {
            payment_id: value.id.to_owned(),
            transaction_id: value.transaction_id.to_owned(),
            payment_amount: value.payment_amount,
            change: value.change,
        }
    }
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
pub struct PaymentRecordedDto {
    pub r#type: String,
    pub message: String,
    pub payment: PaymentDto,
}

async fn record_payment(
    mut state: RequestState,
    Path(transaction_id): Path<u64>,
    form: Json<RecordPaymentDto>,
) -> ServiceResult<Created<PaymentRecordedDto>> {
    state.session_require_cashier()?;
    let form = form.0;

    if form.payment_amount < 0 {
        return Err(ServiceError::BadRequest(
            "Payment amount must be a non-negative integer.".to_string(),
        ));
    }

    let Some(transaction) = state.db.get_transaction_by_id(transaction_id).await? else {
        return Err(ServiceError::NotFound(format!(
            "Transaction with ID {transaction_id} not found."
        )));
    };

    // Fast path for the common case; the unique constraint on the payments
    // table still catches two concurrent calls.
    if state
        .db
        .get_payment_by_transaction_id(transaction_id)
        .await?
        .is_some()
    {
        return Err(ServiceError::Conflict(format!(
            "A payment for transaction {transaction_id} already exists."
        )));
    }

    let change = checkout::change_due(transaction.total, form.payment_amount);
    if *env::REQUIRE_FULL_TENDER && change < 0 {
        return Err(ServiceError::BadRequest(
            "Payment amount is less than the transaction total.".to_string(),
        ));
    }

    let payment = state
        .db
        .store_payment(models::Payment {
            id: 0,
            transaction_id,
            payment_amount: form.payment_amount,
            change,
        })
        .await?;

    Ok(Created(PaymentRecordedDto {
        r#type: "success".to_string(),
        message: "This is the Payment Result".to_string(),
        payment: PaymentDto::from(&payment),
    }))
}

fn record_payment_docs(op: TransformOperation) -> TransformOperation {
    op.description("Record the payment for a transaction.")
        .tag("transactions")
        .response::<201, Json<PaymentRecordedDto>>()
        .response_with::<404, (), _>(|res| {
            res.description("The requested transaction does not exist!")
        })
        .response_with::<409, (), _>(|res| {
            res.description("A payment for this transaction already exists!")
        })
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["cashier"])
}
