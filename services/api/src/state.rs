//! Application state shared across handlers

use common::rbac::PermissionResolver;
use std::sync::Arc;

use crate::{
    middleware::JwtVerifier,
    repositories::{FairRepository, StandRepository},
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub fair_repository: FairRepository,
    pub stand_repository: StandRepository,
    pub resolver: Arc<PermissionResolver>,
    pub jwt_verifier: JwtVerifier,
}
