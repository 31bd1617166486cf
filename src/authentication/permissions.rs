use log::warn;

use crate::{database::schema::Id, error::ApiError, jwt::SessionData};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
}

impl Action {
    pub fn is_safe(self) -> bool {
        matches!(self, Action::Read)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    NewRecipe,
    Recipe { author_id: Id },
    /// Tags and ingredients.
    Catalog,
    /// Favorites, shopping cart entries and subscriptions of `owner_id`.
    UserRelation { owner_id: Id },
}

pub fn authorize(
    actor: Option<&SessionData>,
    action: Action,
    resource: Resource,
) -> Result<(), ApiError> {
    if action.is_safe() {
        return Ok(());
    }

    let Some(session) = actor else {
        return Err(ApiError::Unauthenticated(String::from(
            "Authentication credentials were not provided",
        )));
    };

    let allowed = match resource {
        Resource::NewRecipe => action == Action::Create,
        Resource::Recipe { author_id } => session.user_id == author_id || session.is_admin,
        Resource::Catalog => session.is_admin,
        Resource::UserRelation { owner_id } => session.user_id == owner_id,
    };

    if !allowed {
        warn!(
            "Denied {:?} on {:?} for user {}",
            action, resource, session.user_id
        );
        return Err(ApiError::Forbidden(String::from(
            "You don't have permission to perform this action",
        )));
    }

    Ok(())
}
