use crate::{
    db::DbPool,
    errors::ServiceError,
    events::{Event, EventSender},
    models::profile::{self, UserType},
    services::{like_pattern, page_index},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder,
};
use serde::{Deserialize, Serialize};
use slog::Logger;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Editable profile fields. Email belongs to the identity provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct ProfileUpdate {
    #[validate(length(min = 1, max = 255))]
    pub full_name: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    #[validate(length(max = 255))]
    pub company_name: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    #[validate(length(max = 120))]
    pub city: Option<String>,
    #[validate(length(max = 120))]
    pub state: Option<String>,
    #[validate(length(max = 20))]
    pub postal_code: Option<String>,
    #[validate(length(min = 2, max = 80))]
    pub country: Option<String>,
}

/// Admin edit, which may also change the role
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct AdminProfileUpdate {
    #[serde(flatten)]
    #[validate]
    pub profile: ProfileUpdate,

    pub user_type: Option<UserType>,
}

#[derive(Clone)]
pub struct ProfileService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    logger: Logger,
}

impl ProfileService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, logger: Logger) -> Self {
        Self {
            db_pool,
            event_sender,
            logger,
        }
    }

    #[instrument(skip(self))]
    pub async fn get_profile(&self, profile_id: Uuid) -> Result<profile::Model, ServiceError> {
        profile::Entity::find_by_id(profile_id)
            .one(self.db_pool.as_ref())
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Profile with ID {} not found", profile_id))
            })
    }

    /// The caller's own edit; the role is not editable here
    #[instrument(skip(self))]
    pub async fn update_own_profile(
        &self,
        profile_id: Uuid,
        update: ProfileUpdate,
    ) -> Result<profile::Model, ServiceError> {
        self.apply(profile_id, update, None).await
    }

    #[instrument(skip(self))]
    pub async fn update_profile(
        &self,
        profile_id: Uuid,
        update: AdminProfileUpdate,
    ) -> Result<profile::Model, ServiceError> {
        let updated = self
            .apply(profile_id, update.profile, update.user_type)
            .await?;

        if let Some(user_type) = update.user_type {
            slog::warn!(self.logger, "Profile role changed";
                "profile_id" => %profile_id,
                "user_type" => %user_type,
            );
        }
        Ok(updated)
    }

    /// Profiles ordered by creation, newest first
    #[instrument(skip(self))]
    pub async fn list_profiles(
        &self,
        user_type: Option<UserType>,
        search: Option<String>,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<profile::Model>, u64), ServiceError> {
        let mut query = profile::Entity::find().order_by_desc(profile::Column::CreatedAt);
        if let Some(user_type) = user_type {
            query = query.filter(profile::Column::UserType.eq(user_type));
        }
        if let Some(pattern) = like_pattern(search.as_deref()) {
            query = query.filter(
                Condition::any()
                    .add(profile::Column::Email.like(pattern.clone()))
                    .add(profile::Column::FullName.like(pattern.clone()))
                    .add(profile::Column::CompanyName.like(pattern)),
            );
        }

        let paginator = query.paginate(self.db_pool.as_ref(), limit);
        let total = paginator.num_items().await?;
        let profiles = paginator.fetch_page(page_index(page)).await?;

        Ok((profiles, total))
    }

    async fn apply(
        &self,
        profile_id: Uuid,
        update: ProfileUpdate,
        user_type: Option<UserType>,
    ) -> Result<profile::Model, ServiceError> {
        update.validate()?;

        let mut model = self.get_profile(profile_id).await?.into_active_model();

        macro_rules! set_optional {
            ($($field:ident),+ $(,)?) => {
                $(if let Some(value) = update.$field {
                    model.$field = Set(Some(value));
                })+
            };
        }
        set_optional!(
            full_name,
            phone,
            company_name,
            address,
            city,
            state,
            postal_code,
            country,
        );

        if let Some(user_type) = user_type {
            model.user_type = Set(user_type);
        }
        model.updated_at = Set(Utc::now());

        let updated = model.update(self.db_pool.as_ref()).await?;
        self.event_sender
            .send_or_log(Event::ProfileUpdated(updated.id))
            .await;
        Ok(updated)
    }
}
