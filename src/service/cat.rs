use std::sync::Arc;

use tracing::Span;
use uuid::Uuid;

use super::StoreResultExt;
use crate::breeds::BreedValidator;
use crate::error::{Error, Result};
use crate::models::*;
use crate::store::CatStore;

/// Operative management.
///
/// New and changed breeds are checked against the breed catalog before
/// anything is written.
#[derive(Clone)]
pub struct CatService {
    cats: Arc<dyn CatStore>,
    breeds: Arc<dyn BreedValidator>,
    span: Span,
}

impl CatService {
    pub fn new(cats: Arc<dyn CatStore>, breeds: Arc<dyn BreedValidator>, span: Span) -> Self {
        Self { cats, breeds, span }
    }

    #[tracing::instrument(parent = &self.span, skip(self, input), fields(name = %input.name), err)]
    pub async fn create_cat(&self, input: CreateCatInput) -> Result<Cat> {
        input.validate()?;
        self.breeds.validate(&input.breed).await?;

        let cat = self
            .cats
            .add_cat(input)
            .or_error(Error::CatNotFound, "creating cat")?;

        tracing::info!(cat_id = %cat.id, "cat created");
        Ok(cat)
    }

    /// Apply a partial update. The merged record must still be valid.
    #[tracing::instrument(parent = &self.span, skip(self, input), err)]
    pub async fn update_cat(&self, id: Uuid, input: UpdateCatInput) -> Result<Cat> {
        let mut cat = self.get_cat(id)?;

        if let Some(breed) = &input.breed {
            self.breeds.validate(breed).await?;
        }

        cat.apply(input);
        cat.validate()?;

        self.cats
            .update_cat(&cat)
            .or_error(Error::CatNotFound, "updating cat")
    }

    #[tracing::instrument(parent = &self.span, skip(self), err)]
    pub fn delete_cat(&self, id: Uuid) -> Result<()> {
        self.cats
            .delete_cat(id)
            .or_error(Error::CatNotFound, "deleting cat")?;

        tracing::info!(cat_id = %id, "cat deleted");
        Ok(())
    }

    pub fn list_cats(&self) -> Result<Vec<Cat>> {
        self.cats
            .list_cats()
            .or_error(Error::CatNotFound, "listing cats")
    }

    pub fn get_cat(&self, id: Uuid) -> Result<Cat> {
        self.cats
            .get_cat(id)
            .or_error(Error::CatNotFound, "loading cat")
    }

    pub fn get_cat_by_name(&self, name: &str) -> Result<Cat> {
        self.cats
            .get_cat_by_name(name)
            .or_error(Error::CatNotFound, "loading cat by name")
    }
}
