//! Caller extraction from identity-service headers.

use crate::policy::access::{require_role, Caller, Role};
use crate::RollcallError;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

/// Header carrying the authenticated user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Header carrying the caller's role.
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = RollcallError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| parts.headers.get(name).and_then(|value| value.to_str().ok());
        Caller::from_attributes(header(USER_ID_HEADER), header(USER_ROLE_HEADER))
    }
}

/// A caller holding the teacher role.
#[derive(Debug, Clone)]
pub struct Teacher(pub Caller);

/// A caller holding the student role.
#[derive(Debug, Clone)]
pub struct Student(pub Caller);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Teacher {
    type Rejection = RollcallError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let caller = Caller::from_request_parts(parts, state).await?;
        require_role(&caller, &Role::Teacher)?;
        Ok(Self(caller))
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Student {
    type Rejection = RollcallError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let caller = Caller::from_request_parts(parts, state).await?;
        require_role(&caller, &Role::Student)?;
        Ok(Self(caller))
    }
}
