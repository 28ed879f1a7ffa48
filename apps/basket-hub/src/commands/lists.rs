//! Registry and category commands.

use basket_core::User;
use basket_lists::seed;
use serde_json::{json, Value};
use tracing::info;

use super::{to_result, CommandContext};
use crate::error::{ApiError, ErrorCode};
use crate::protocol::CreateListArgs;

pub async fn get_catalogues(ctx: &CommandContext) -> Result<Value, ApiError> {
    let catalogues = ctx
        .manager
        .get_catalogues()
        .await
        .map_err(|e| ApiError::from_list_error(ErrorCode::GetCataloguesFailed, e))?;

    to_result(ErrorCode::GetCataloguesFailed, &catalogues)
}

/// `get_lists`: only the lists `user` may see.
pub async fn get_lists(ctx: &CommandContext, user: &User) -> Result<Value, ApiError> {
    let lists = ctx
        .manager
        .get_visible_lists(user)
        .await
        .map_err(|e| ApiError::from_list_error(ErrorCode::GetListsFailed, e))?;

    to_result(ErrorCode::GetListsFailed, &lists)
}

/// `create_list`: the caller becomes the owner.
///
/// Result: `{"list_id": "...", "list": {catalogue, owner, visibility, ...}}`
pub async fn create_list(ctx: &CommandContext, user: &User, args: CreateListArgs) -> Result<Value, ApiError> {
    let (list_id, meta) = ctx
        .manager
        .create_list(&user.id, args.into())
        .await
        .map_err(|e| ApiError::from_list_error(ErrorCode::CreateListFailed, e))?;

    info!(list_id = %list_id, owner = %user.id, "List created over WebSocket");

    let list = to_result(ErrorCode::CreateListFailed, &meta)?;
    Ok(json!({ "list_id": list_id, "list": list }))
}

/// `get_categories`: never fails, falls back to the built-in set.
pub async fn get_categories(ctx: &CommandContext) -> Result<Value, ApiError> {
    let categories = seed::load_categories(&ctx.data_dir, ctx.country.as_deref()).await;
    to_result(ErrorCode::GetCategoriesFailed, &categories)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{alice, context};

    fn create_args(value: Value) -> CreateListArgs {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_bootstrap_registries() {
        let ctx = context();

        let catalogues = get_catalogues(&ctx).await.unwrap();
        assert_eq!(catalogues["groceries"]["products_store"], "shopping_list_manager.products");

        let lists = get_lists(&ctx, &alice()).await.unwrap();
        assert_eq!(lists["groceries"]["owner"], "system");
        assert_eq!(lists["groceries"]["visibility"], "shared");
    }

    #[tokio::test]
    async fn test_private_lists_are_filtered() {
        let ctx = context();
        let bob = User::new("bob", false);
        let admin = User::new("root", true);

        let created = create_list(&ctx, &bob, create_args(json!({"name": "Secret", "visibility": "private"})))
            .await
            .unwrap();
        let list_id = created["list_id"].as_str().unwrap().to_string();
        assert_eq!(created["list"]["owner"], "bob");
        assert_eq!(created["list"]["catalogue"], list_id.as_str());

        let for_alice = get_lists(&ctx, &alice()).await.unwrap();
        assert!(for_alice.get(&list_id).is_none());

        let for_bob = get_lists(&ctx, &bob).await.unwrap();
        assert!(for_bob.get(&list_id).is_some());

        let for_admin = get_lists(&ctx, &admin).await.unwrap();
        assert!(for_admin.get(&list_id).is_some());
    }

    #[tokio::test]
    async fn test_create_list_rejects_unknown_catalogue() {
        let ctx = context();
        let err = create_list(&ctx, &alice(), create_args(json!({"name": "Shared", "catalogue": "nope"})))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::CreateListFailed);
    }

    #[tokio::test]
    async fn test_categories_fall_back_to_builtin() {
        let ctx = context();
        let categories = get_categories(&ctx).await.unwrap();
        let ids: Vec<&str> = categories
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|c| c["id"].as_str())
            .collect();
        assert_eq!(ids, vec!["produce", "dairy", "other"]);
    }
}
