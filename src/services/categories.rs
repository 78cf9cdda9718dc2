use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::audit;
use crate::context::OperationContext;
use crate::db::DbPool;
use crate::entities::category;
use crate::errors::ServiceError;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 30, message = "Category name is required"))]
    pub name: String,
    pub parent_category_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct CategoryService {
    db_pool: Arc<DbPool>,
}

impl CategoryService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, ctx, request), fields(name = %request.name))]
    pub async fn create_category(
        &self,
        ctx: &OperationContext,
        request: CreateCategoryRequest,
    ) -> Result<category::Model, ServiceError> {
        request.validate()?;
        let slug = slugify(&request.name);

        let db = &*self.db_pool;
        let txn = db.begin().await?;

        let taken = category::Entity::find()
            .filter(category::Column::Slug.eq(&slug))
            .count(&txn)
            .await?;
        if taken > 0 {
            return Err(ServiceError::Conflict(format!(
                "A category with slug '{slug}' already exists"
            )));
        }

        let now = Utc::now();
        let category_model = category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name.clone()),
            slug: Set(slug),
            parent_category_id: Set(request.parent_category_id),
            created_at: Set(now),
            modified_at: Set(now),
        }
        .insert(&txn)
        .await?;

        audit::record_created_best_effort(&txn, ctx, &category_model).await;
        txn.commit().await?;

        info!(category_id = %category_model.id, "Category created");
        Ok(category_model)
    }

    pub async fn list_categories(&self) -> Result<Vec<category::Model>, ServiceError> {
        let db = &*self.db_pool;
        Ok(category::Entity::find()
            .order_by_desc(category::Column::CreatedAt)
            .all(db)
            .await?)
    }
}

/// Lowercases, keeps alphanumerics, and collapses everything else into
/// single hyphens.
fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_was_hyphen = true;
    for c in name.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            slug.push('-');
            last_was_hyphen = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_lowercases_and_hyphenates() {
        assert_eq!(slugify("Power Tools"), "power-tools");
        assert_eq!(slugify("  Nuts & Bolts  "), "nuts-bolts");
        assert_eq!(slugify("Plain"), "plain");
    }
}
