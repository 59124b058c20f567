//! Custom extractors for request validation.

use aide::operation::OperationInput;
use aide::OperationOutput;
use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use schemars::JsonSchema;
use validator::Validate;

use crate::types::error::AppError;

/// JSON extractor that runs `validator::Validate` after deserializing.
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: serde::de::DeserializeOwned + Validate + JsonSchema,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(payload) = Json::<T>::from_request(req, state).await.map_err(|err| match err {
            JsonRejection::MissingJsonContentType(_) => {
                AppError::invalid_argument("missing Content-Type: application/json header")
            }
            _ => AppError::invalid_argument("invalid JSON payload"),
        })?;

        payload.validate().map_err(|errors| {
            let message = errors
                .field_errors()
                .values()
                .flat_map(|v| v.iter())
                .find_map(|e| e.message.clone())
                .unwrap_or_else(|| "validation error".into());
            AppError::invalid_argument(message)
        })?;

        Ok(Self(payload))
    }
}

impl<T> OperationInput for ValidatedJson<T>
where
    T: JsonSchema,
{
    fn operation_input(ctx: &mut aide::generate::GenContext, operation: &mut aide::openapi::Operation) {
        Json::<T>::operation_input(ctx, operation);
    }

    fn inferred_early_responses(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) -> Vec<(Option<u16>, aide::openapi::Response)> {
        AppError::inferred_responses(ctx, operation)
    }
}
