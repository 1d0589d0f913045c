use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::FromRef;

use crate::bind::Binder;
use crate::mapping::{Record, StructureWalker};

use super::models::User;
use super::store::ColumnStore;

#[derive(Clone)]
pub struct AppState {
    pub binder: Binder,
    pub users: Arc<ColumnStore>,
}

impl AppState {
    pub fn new(binder: Binder) -> Self {
        Self {
            binder,
            users: Arc::new(ColumnStore::new()),
        }
    }

    /// external name -> column for every stored `User` field.
    pub fn user_columns(&self) -> BTreeMap<String, String> {
        StructureWalker::new(self.binder.mapper()).storage_columns(User::descriptor())
    }
}

impl FromRef<AppState> for Binder {
    fn from_ref(state: &AppState) -> Self {
        state.binder.clone()
    }
}
