pub mod jwt;
pub mod password;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use diesel::prelude::*;
use tracing::warn;
use uuid::Uuid;

use crate::{
    access::{self, AccessError, Action},
    enums::Role,
    error::{AppError, AppResult},
    models::User,
    schema::users,
    state::AppState,
};

/// The verified caller of a request, loaded fresh from the store.
#[derive(Debug, Clone)]
pub struct Actor {
    pub user: User,
}

impl Actor {
    pub fn id(&self) -> Uuid {
        self.user.id
    }

    pub fn role(&self) -> Role {
        self.user.role
    }

    pub fn authorize(&self, action: Action) -> AppResult<()> {
        access::authorize(self.role(), action).map_err(|err| self.denied(err))
    }

    pub fn authorize_owned(&self, action: Action, owner_id: Uuid) -> AppResult<()> {
        access::authorize_owned(self.role(), self.id(), action, owner_id)
            .map_err(|err| self.denied(err))
    }

    fn denied(&self, err: AccessError) -> AppError {
        warn!(user_id = %self.id(), role = %self.role(), reason = %err, "access denied");
        AppError::forbidden(err.to_string())
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Actor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::unauthorized("no token provided"))?;

        let claims = state
            .jwt
            .verify_token(bearer.token())
            .map_err(|err| AppError::unauthorized(err.to_string()))?;

        let mut conn = state.db()?;
        let user: User = users::table
            .find(claims.sub)
            .first(&mut conn)
            .optional()?
            .ok_or_else(|| AppError::not_found("user not found"))?;

        if !user.is_active {
            return Err(AppError::forbidden("account is deactivated"));
        }

        Ok(Actor { user })
    }
}

/// An [`Actor`] whose role is admin; used as the guard of the admin router.
#[derive(Debug, Clone)]
pub struct AdminActor(pub Actor);

#[async_trait]
impl FromRequestParts<AppState> for AdminActor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let actor = Actor::from_request_parts(parts, state).await?;
        match actor.role() {
            Role::Admin => Ok(AdminActor(actor)),
            Role::Seeker | Role::Recruiter => {
                warn!(user_id = %actor.id(), role = %actor.role(), "non-admin hit admin route");
                Err(AppError::forbidden("access denied: admins only"))
            }
        }
    }
}
