use aide::axum::routing::{get_with, put_with};
use aide::axum::ApiRouter;
use aide::transform::TransformOperation;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::Json;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::database::AppState;
use crate::error::{ServiceError, ServiceResult};
use crate::models;
use crate::request_state::RequestState;

use super::Created;

pub fn router(app_state: AppState) -> ApiRouter {
    ApiRouter::new()
        .api_route(
            "/categories",
            get_with(list_categories, list_categories_docs)
                .post_with(create_category, create_category_docs),
        )
        .api_route(
            "/category/:id",
            put_with(update_category, update_category_docs)
                .delete_with(delete_category, delete_category_docs),
        )
        .with_state(app_state)
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDto {
    pub category_id: u64,
    pub category_name: String,
    pub user_id: u64,
    pub is_deleted: bool,
}

impl From<&models::Category> for CategoryDto {
    fn from(value: &models::Category) -> Self {
        Self {
            category_id: value.id.to_owned(),
            category_name: value.name.to_owned(),
            user_id: value.owner_id.to_owned(),
            is_deleted: value.is_deleted,
        }
    }
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
pub struct CategoryListDto {
    pub result: Vec<CategoryDto>,
}

async fn list_categories(mut state: RequestState) -> ServiceResult<Json<CategoryListDto>> {
    state.session_require()?;

    let categories = state.db.get_all_categories().await?;
    Ok(Json(CategoryListDto {
        result: categories.iter().map(|c| c.into()).collect(),
    }))
}

fn list_categories_docs(op: TransformOperation) -> TransformOperation {
    op.description("List all categories.")
        .tag("catalog")
        .response::<200, Json<CategoryListDto>>()
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .security_requirement_scopes("SessionToken", ["admin", "cashier"])
}

#[derive(Debug, PartialEq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaveCategoryDto {
    pub category_name: String,
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
pub struct CategorySavedDto {
    pub r#type: String,
    pub message: String,
    pub category: CategoryDto,
}

async fn create_category(
    mut state: RequestState,
    form: Json<SaveCategoryDto>,
) -> ServiceResult<Created<CategorySavedDto>> {
    let session = state.session_require_admin()?;
    let form = form.0;

    if form.category_name.trim().is_empty() {
        return Err(ServiceError::BadRequest("Category is required".to_string()));
    }

    // Uniqueness is checked at the application layer before the insert.
    if state
        .db
        .get_category_by_name(&form.category_name)
        .await?
        .is_some()
    {
        return Err(ServiceError::BadRequest(
            "Category already exists".to_string(),
        ));
    }

    let category = models::Category {
        id: 0,
        name: form.category_name,
        owner_id: session.user.id,
        is_deleted: false,
    };
    let category = state.db.store_category(category).await?;

    Ok(Created(CategorySavedDto {
        r#type: "success".to_string(),
        message: "Category created successfully".to_string(),
        category: CategoryDto::from(&category),
    }))
}

fn create_category_docs(op: TransformOperation) -> TransformOperation {
    op.description("Create a new category.")
        .tag("catalog")
        .response::<201, Json<CategorySavedDto>>()
        .response_with::<400, (), _>(|res| res.description("The category already exists!"))
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["admin"])
}

async fn update_category(
    mut state: RequestState,
    Path(id): Path<u64>,
    form: Json<SaveCategoryDto>,
) -> ServiceResult<Json<CategorySavedDto>> {
    state.session_require_admin()?;
    let form = form.0;

    if form.category_name.trim().is_empty() {
        return Err(ServiceError::BadRequest("Category is required".to_string()));
    }

    if let Some(existing) = state.db.get_category_by_name(&form.category_name).await? {
        if existing.id != id {
            return Err(ServiceError::BadRequest(
                "Category already exists".to_string(),
            ));
        }
    }

    let Some(mut category) = state.db.get_category_by_id(id).await? else {
        return Err(ServiceError::NotFound(
            "The requested category does not exist".to_string(),
        ));
    };

    category.name = form.category_name;
    let category = state.db.store_category(category).await?;

    Ok(Json(CategorySavedDto {
        r#type: "success".to_string(),
        message: "Category updated successfully".to_string(),
        category: CategoryDto::from(&category),
    }))
}

fn update_category_docs(op: TransformOperation) -> TransformOperation {
    op.description("Rename an existing category.")
        .tag("catalog")
        .response::<200, Json<CategorySavedDto>>()
        .response_with::<404, (), _>(|res| res.description("The requested category does not exist!"))
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["admin"])
}

async fn delete_category(
    mut state: RequestState,
    Path(id): Path<u64>,
) -> ServiceResult<StatusCode> {
    state.session_require_admin()?;

    let Some(mut category) = state.db.get_category_by_id(id).await? else {
        return Err(ServiceError::NotFound(
            "The requested category does not exist".to_string(),
        ));
    };

    // Soft delete, products keep their reference.
    category.is_deleted = true;
    state.db.store_category(category).await?;

    Ok(StatusCode::NO_CONTENT)
}

fn delete_category_docs(op: TransformOperation) -> TransformOperation {
    op.description("Delete an existing category.")
        .tag("catalog")
        .response_with::<204, (), _>(|res| res.description("The category was successfully deleted!"))
        .response_with::<404, (), _>(|res| res.description("The requested category does not exist!"))
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["admin"])
}
