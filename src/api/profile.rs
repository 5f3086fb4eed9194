use aide::axum::routing::get_with;
use aide::axum::ApiRouter;
use aide::transform::TransformOperation;
use axum::extract::Multipart;
use axum::Json;

use crate::database::AppState;
use crate::error::{ServiceError, ServiceResult};
use crate::request_state::RequestState;

use super::products::{read_image_field, ImageDto};
use super::MessageDto;

pub fn router(app_state: AppState) -> ApiRouter {
    ApiRouter::new()
        .api_route(
            "/profile/image",
            get_with(get_profile_image, get_profile_image_docs)
                .put_with(upload_profile_image, upload_profile_image_docs),
        )
        .with_state(app_state)
}

async fn get_profile_image(mut state: RequestState) -> ServiceResult<ImageDto> {
    let session = state.session_require_cashier()?;

    let image = state.db.get_user_image(session.user.id).await?;

    if let Some(image) = image {
        return Ok(ImageDto(image));
    }

    Err(ServiceError::NotFound(
        "Profile picture is empty".to_string(),
    ))
}

fn get_profile_image_docs(op: TransformOperation) -> TransformOperation {
    op.description("Get the profile picture of the current cashier.")
        .tag("cashiers")
        .response_with::<200, (), _>(|res| res.description("The image bytes."))
        .response_with::<404, (), _>(|res| res.description("No profile picture was uploaded!"))
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["cashier"])
}

async fn upload_profile_image(
    mut state: RequestState,
    mut multipart: Multipart,
) -> ServiceResult<Json<MessageDto>> {
    let session = state.session_require_cashier()?;

    let Some(image) = read_image_field(&mut multipart).await else {
        return Err(ServiceError::BadRequest(
            "Please upload an image.".to_string(),
        ));
    };

    state.db.store_user_image(session.user.id, image).await?;

    Ok(Json(MessageDto {
        message: "Image uploaded successfully.".to_string(),
    }))
}

fn upload_profile_image_docs(op: TransformOperation) -> TransformOperation {
    op.description("Upload or replace the profile picture of the current cashier.")
        .tag("cashiers")
        .response::<200, Json<MessageDto>>()
        .response_with::<400, (), _>(|res| res.description("No image was uploaded!"))
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["cashier"])
}
