//! Product catalog commands.

use tracing::info;
use serde_json::Value;

use super::{acknowledged, to_result, CommandContext};
use crate::error::{ApiError, ErrorCode};
use crate::protocol::{AddProductArgs, DeleteProductArgs, ListArgs};

/// `add_product`: upsert into the list's catalog. Returns the stored record.
pub async fn add_product(ctx: &CommandContext, args: AddProductArgs) -> Result<Value, ApiError> {
    let (list_id, input) = args.into_parts();

    let product = ctx
        .manager
        .add_or_update_product(&list_id, input)
        .await
        .map_err(|e| ApiError::from_list_error(ErrorCode::AddProductFailed, e))?;

    info!(list_id = %list_id, key = %product.key, "Product saved");
    to_result(ErrorCode::AddProductFailed, &product)
}

/// `get_products`: the list's whole catalog, keyed by product key.
pub async fn get_products(ctx: &CommandContext, args: ListArgs) -> Result<Value, ApiError> {
    let products = ctx
        .manager
        .get_products(&args.list_id)
        .await
        .map_err(|e| ApiError::from_list_error(ErrorCode::GetProductsFailed, e))?;

    to_result(ErrorCode::GetProductsFailed, &products)
}

/// `delete_product`: succeeds whether or not the product existed.
pub async fn delete_product(ctx: &CommandContext, args: DeleteProductArgs) -> Result<Value, ApiError> {
    ctx.manager
        .delete_product(&args.list_id, &args.key)
        .await
        .map_err(|e| ApiError::from_list_error(ErrorCode::DeleteProductFailed, e))?;

    Ok(acknowledged())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::context;
    use serde_json::json;

    fn add_args(key: &str, name: &str) -> AddProductArgs {
        serde_json::from_value(json!({"key": key, "name": name})).unwrap()
    }

    #[tokio::test]
    async fn test_add_product_returns_record() {
        let ctx = context();
        let result = add_product(&ctx, add_args("milk", "Milk")).await.unwrap();

        assert_eq!(
            result,
            json!({"key": "milk", "name": "Milk", "category": "other", "unit": "pcs", "image": ""})
        );

        let products = get_products(&ctx, serde_json::from_value(json!({})).unwrap()).await.unwrap();
        assert_eq!(products["milk"]["name"], "Milk");
    }

    #[tokio::test]
    async fn test_add_product_validation() {
        let ctx = context();
        let err = add_product(&ctx, add_args("milk", "  ")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::AddProductFailed);
    }

    #[tokio::test]
    async fn test_delete_missing_is_ok() {
        let ctx = context();
        let args: DeleteProductArgs = serde_json::from_value(json!({"key": "ghost"})).unwrap();
        assert_eq!(delete_product(&ctx, args).await.unwrap(), json!({"success": true}));
    }
}
