use aide::axum::routing::{get_with, patch_with};
use aide::axum::ApiRouter;
use aide::transform::TransformOperation;
use aide::OperationOutput;
use axum::extract::{Multipart, Path, Query};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::database::{AppState, ProductQuery, ProductSort, PRODUCT_PAGE_SIZE};
use crate::error::{ServiceError, ServiceResult};
use crate::models;
use crate::request_state::RequestState;

use super::categories::CategoryDto;
use super::{Created, MessageDto};

const SUPPORTED_IMAGE_TYPES: [&str; 5] = [
    "image/png",
    "image/jpeg",
    "image/jpg",
    "image/webp",
    "image/svg",
];

pub fn router(app_state: AppState) -> ApiRouter {
    ApiRouter::new()
        .api_route(
            "/product/:id/image",
            get_with(get_product_image, get_product_image_docs)
                .put_with(upload_product_image, upload_product_image_docs)
                .delete_with(delete_product_image, delete_product_image_docs),
        )
        .api_route(
            "/product/:id/deactivate",
            patch_with(deactivate_product, deactivate_product_docs),
        )
        .api_route(
            "/product/:id",
            get_with(get_product, get_product_docs).put_with(update_product, update_product_docs),
        )
        .api_route(
            "/products",
            get_with(list_products, list_products_docs)
                .post_with(create_product, create_product_docs),
        )
        .with_state(app_state)
}

/// Raw image response with the stored mimetype as content type.
#[derive(Debug, PartialEq)]
pub struct ImageDto(pub models::Image);

impl IntoResponse for ImageDto {
    fn into_response(self) -> axum::response::Response {
        let mut headers = HeaderMap::new();
        if let Ok(content_type) = HeaderValue::from_str(&self.0.mimetype) {
            headers.insert(header::CONTENT_TYPE, content_type);
        }

        (StatusCode::OK, headers, self.0.data).into_response()
    }
}

impl OperationOutput for ImageDto {
    type Inner = Vec<u8>;
}

/// Read an image from a multipart upload, ignoring unsupported field types.
pub async fn read_image_field(multipart: &mut Multipart) -> Option<models::Image> {
    while let Ok(Some(field)) = multipart.next_field().await {
        let content_type = field.content_type().unwrap_or("").to_lowercase();
        if SUPPORTED_IMAGE_TYPES.iter().any(|t| *t == content_type) {
            if let Ok(data) = field.bytes().await {
                return Some(models::Image {
                    data: data.to_vec(),
                    mimetype: content_type,
                });
            }
        }
    }

    None
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductDto {
    pub product_id: u64,
    pub product_name: String,
    pub price: i64,
    pub description: Option<String>,
    pub category_id: u64,
    pub user_id: u64,
    pub is_deactivated: bool,
}

impl From<&models::Product> for ProductDto {
    fn from(value: &models::Product) -> Self {
        Self {
            product_id: value.id.to_owned(),
            product_name: value.name.to_owned(),
            price: value.price,
            description: value.description.to_owned(),
            category_id: value.category_id.to_owned(),
            user_id: value.owner_id.to_owned(),
            is_deactivated: value.is_deactivated,
        }
    }
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductOverviewDto {
    pub product_id: u64,
    pub product_name: String,
    pub price: i64,
    pub image_url: Option<String>,
    pub category: CategoryDto,
}

impl From<&models::ProductOverview> for ProductOverviewDto {
    fn from(value: &models::ProductOverview) -> Self {
        Self {
            product_id: value.id.to_owned(),
            product_name: value.name.to_owned(),
            price: value.price,
            image_url: value
                .has_image
                .then(|| format!("/product/{}/image", value.id)),
            category: CategoryDto::from(&value.category),
        }
    }
}

#[derive(Debug, PartialEq, Deserialize, JsonSchema)]
pub struct ProductListQueryDto {
    /// Restrict the listing to one category.
    pub id_cat: Option<u64>,
    /// Substring filter on the product name.
    pub search: Option<String>,
    /// One of `name_asc`, `name_desc`, `price_asc`, `price_desc`.
    pub sort: Option<String>,
    /// 1-based page number.
    pub page: Option<u64>,
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductListDto {
    pub total_products: u64,
    pub products_limit: u64,
    pub total_pages: u64,
    pub current_page: u64,
    pub result: Vec<ProductOverviewDto>,
}

async fn list_products(
    mut state: RequestState,
    query: Query<ProductListQueryDto>,
) -> ServiceResult<Json<ProductListDto>> {
    state.session_require()?;
    let query = query.0;

    let sort = match query.sort.as_deref() {
        Some("name_desc") => ProductSort::NameDesc,
        Some("price_asc") => ProductSort::PriceAsc,
        Some("price_desc") => ProductSort::PriceDesc,
        // Default to alphabetical order if no valid sort option is provided.
        _ => ProductSort::NameAsc,
    };

    let page = state
        .db
        .get_products(&ProductQuery {
            category_id: query.id_cat,
            search: query.search,
            sort,
            page: query.page.unwrap_or(1),
        })
        .await?;

    Ok(Json(ProductListDto {
        total_products: page.total,
        products_limit: PRODUCT_PAGE_SIZE,
        total_pages: page.total.div_ceil(PRODUCT_PAGE_SIZE),
        current_page: page.page,
        result: page.products.iter().map(|p| p.into()).collect(),
    }))
}

fn list_products_docs(op: TransformOperation) -> TransformOperation {
    op.description("List active products, filtered, sorted and paginated.")
        .tag("catalog")
        .response::<200, Json<ProductListDto>>()
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .security_requirement_scopes("SessionToken", ["admin", "cashier"])
}

async fn get_product(
    mut state: RequestState,
    Path(id): Path<u64>,
) -> ServiceResult<Json<ProductDto>> {
    state.session_require()?;

    let product = state.db.get_product_by_id(id).await?;

    if let Some(product) = product {
        return Ok(Json(ProductDto::from(&product)));
    }

    Err(ServiceError::NotFound(format!(
        "Product with ID {id} not found."
    )))
}

fn get_product_docs(op: TransformOperation) -> TransformOperation {
    op.description("Get a product by id.")
        .tag("catalog")
        .response::<200, Json<ProductDto>>()
        .response_with::<404, (), _>(|res| res.description("The requested product does not exist!"))
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .security_requirement_scopes("SessionToken", ["admin", "cashier"])
}

#[derive(Debug, PartialEq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaveProductDto {
    pub product_name: String,
    pub price: i64,
    pub description: String,
    pub category_id: u64,
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
pub struct ProductSavedDto {
    pub r#type: String,
    pub message: String,
    pub product: ProductDto,
}

fn validate_product(form: &SaveProductDto) -> ServiceResult<()> {
    if form.product_name.trim().is_empty() {
        return Err(ServiceError::BadRequest(
            "Product Name is required".to_string(),
        ));
    }
    if form.price <= 0 {
        return Err(ServiceError::BadRequest(
            "Price must be a positive number".to_string(),
        ));
    }
    if form.description.trim().is_empty() {
        return Err(ServiceError::BadRequest(
            "Description is required".to_string(),
        ));
    }

    Ok(())
}

async fn create_product(
    mut state: RequestState,
    form: Json<SaveProductDto>,
) -> ServiceResult<Created<ProductSavedDto>> {
    let session = state.session_require_admin()?;
    let form = form.0;

    validate_product(&form)?;

    if state
        .db
        .get_product_by_name(&form.product_name)
        .await?
        .is_some()
    {
        return Err(ServiceError::BadRequest(
            "Product already exists".to_string(),
        ));
    }

    if state.db.get_category_by_id(form.category_id).await?.is_none() {
        return Err(ServiceError::BadRequest(
            "Category does not exist".to_string(),
        ));
    }

    let product = models::Product {
        id: 0,
        name: form.product_name,
        price: form.price,
        description: Some(form.description),
        category_id: form.category_id,
        owner_id: session.user.id,
        is_deactivated: false,
    };
    let product = state.db.store_product(product).await?;

    Ok(Created(ProductSavedDto {
        r#type: "success".to_string(),
        message: "Product created successfully".to_string(),
        product: ProductDto::from(&product),
    }))
}

fn create_product_docs(op: TransformOperation) -> TransformOperation {
    op.description("Create a new product.")
        .tag("catalog")
        .response::<201, Json<ProductSavedDto>>()
        .response_with::<400, (), _>(|res| res.description("The product already exists!"))
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["admin"])
}

async fn update_product(
    mut state: RequestState,
    Path(id): Path<u64>,
    form: Json<SaveProductDto>,
) -> ServiceResult<Json<ProductSavedDto>> {
    state.session_require_admin()?;
    let form = form.0;

    validate_product(&form)?;

    let Some(mut product) = state.db.get_product_by_id(id).await? else {
        return Err(ServiceError::NotFound(format!(
            "Product with ID {id} not found."
        )));
    };

    product.name = form.product_name;
    product.price = form.price;
    product.description = Some(form.description);
    product.category_id = form.category_id;

    let product = state.db.store_product(product).await?;

    Ok(Json(ProductSavedDto {
        r#type: "success".to_string(),
        message: "Product updated successfully".to_string(),
        product: ProductDto::from(&product),
    }))
}

fn update_product_docs(op: TransformOperation) -> TransformOperation {
    op.description("Update an existing product.")
        .tag("catalog")
        .response::<200, Json<ProductSavedDto>>()
        .response_with::<404, (), _>(|res| res.description("The requested product does not exist!"))
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["admin"])
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
pub struct ProductDeactivatedDto {
    pub message: String,
    pub product: ProductDto,
}

async fn deactivate_product(
    mut state: RequestState,
    Path(id): Path<u64>,
) -> ServiceResult<Json<ProductDeactivatedDto>> {
    state.session_require_admin()?;

    let Some(mut product) = state.db.get_product_by_id(id).await? else {
        return Err(ServiceError::NotFound(format!(
            "Product with ID {id} not found."
        )));
    };

    // Deactivated products disappear from listings and cannot be sold.
    product.is_deactivated = true;
    let product = state.db.store_product(product).await?;

    Ok(Json(ProductDeactivatedDto {
        message: "Product deactivated successfully".to_string(),
        product: ProductDto::from(&product),
    }))
}

fn deactivate_product_docs(op: TransformOperation) -> TransformOperation {
    op.description("Deactivate a product.")
        .tag("catalog")
        .response::<200, Json<ProductDeactivatedDto>>()
        .response_with::<404, (), _>(|res| res.description("The requested product does not exist!"))
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["admin"])
}

async fn get_product_image(
    mut state: RequestState,
    Path(id): Path<u64>,
) -> ServiceResult<ImageDto> {
    state.session_require()?;

    if state.db.get_product_by_id(id).await?.is_none() {
        return Err(ServiceError::NotFound(format!(
            "Product with ID {id} not found."
        )));
    }

    let image = state.db.get_product_image(id).await?;

    if let Some(image) = image {
        return Ok(ImageDto(image));
    }

    Err(ServiceError::NotFound("Product Image is empty".to_string()))
}

fn get_product_image_docs(op: TransformOperation) -> TransformOperation {
    op.description("Get the image of a product.")
        .tag("catalog")
        .response_with::<200, (), _>(|res| res.description("The image bytes."))
        .response_with::<404, (), _>(|res| res.description("The product has no image!"))
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .security_requirement_scopes("SessionToken", ["admin", "cashier"])
}

async fn upload_product_image(
    mut state: RequestState,
    Path(id): Path<u64>,
    mut multipart: Multipart,
) -> ServiceResult<Json<MessageDto>> {
    state.session_require_admin()?;

    if state.db.get_product_by_id(id).await?.is_none() {
        return Err(ServiceError::NotFound(format!(
            "Product with ID {id} not found."
        )));
    }

    let Some(image) = read_image_field(&mut multipart).await else {
        return Err(ServiceError::BadRequest(
            "Please upload an image.".to_string(),
        ));
    };

    state.db.store_product_image(id, image).await?;

    Ok(Json(MessageDto {
        message: "Product Image updated successfully.".to_string(),
    }))
}

fn upload_product_image_docs(op: TransformOperation) -> TransformOperation {
    op.description("Upload or replace the image of a product.")
        .tag("catalog")
        .response::<200, Json<MessageDto>>()
        .response_with::<404, (), _>(|res| res.description("The requested product does not exist!"))
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["admin"])
}

async fn delete_product_image(
    mut state: RequestState,
    Path(id): Path<u64>,
) -> ServiceResult<StatusCode> {
    state.session_require_admin()?;

    state.db.delete_product_image(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn delete_product_image_docs(op: TransformOperation) -> TransformOperation {
    op.description("Delete the image of a product.")
        .tag("catalog")
        .response_with::<204, (), _>(|res| res.description("The image was successfully deleted!"))
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["admin"])
}
