//! Active-set commands.

use serde_json::Value;

use super::{acknowledged, to_result, CommandContext};
use crate::error::{ApiError, ErrorCode};
use crate::protocol::{ListArgs, SetQtyArgs};

/// `set_qty`: zero removes the item from the active set.
///
/// ## When This Fails
/// - `invariant_violation`: the key isn't in the list's catalog
/// - `set_qty_failed`: negative/oversized quantity or storage failure
pub async fn set_qty(ctx: &CommandContext, args: SetQtyArgs) -> Result<Value, ApiError> {
    ctx.manager
        .set_quantity(&args.list_id, &args.key, args.qty)
        .await
        .map_err(|e| ApiError::from_list_error(ErrorCode::SetQtyFailed, e))?;

    Ok(acknowledged())
}

/// `get_active`: key → `{qty}` for everything currently needed.
pub async fn get_active(ctx: &CommandContext, args: ListArgs) -> Result<Value, ApiError> {
    let active = ctx
        .manager
        .get_active(&args.list_id)
        .await
        .map_err(|e| ApiError::from_list_error(ErrorCode::GetActiveFailed, e))?;

    to_result(ErrorCode::GetActiveFailed, &active)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::context;
    use basket_core::NewProduct;
    use serde_json::json;

    fn qty_args(key: &str, qty: i64) -> SetQtyArgs {
        serde_json::from_value(json!({"key": key, "qty": qty})).unwrap()
    }

    #[tokio::test]
    async fn test_unknown_product_is_invariant_violation() {
        let ctx = context();
        let err = set_qty(&ctx, qty_args("ghost", 3)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvariantViolation);
    }

    #[tokio::test]
    async fn test_negative_quantity_is_set_qty_failed() {
        let ctx = context();
        let err = set_qty(&ctx, qty_args("milk", -1)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::SetQtyFailed);
    }

    #[tokio::test]
    async fn test_active_snapshot() {
        let ctx = context();
        ctx.manager
            .add_or_update_product("groceries", NewProduct::new("milk", "Milk"))
            .await
            .unwrap();

        set_qty(&ctx, qty_args("milk", 2)).await.unwrap();
        let active = get_active(&ctx, serde_json::from_value(json!({})).unwrap()).await.unwrap();
        assert_eq!(active, json!({"milk": {"qty": 2}}));

        set_qty(&ctx, qty_args("milk", 0)).await.unwrap();
        let active = get_active(&ctx, serde_json::from_value(json!({})).unwrap()).await.unwrap();
        assert_eq!(active, json!({}));
    }
}
