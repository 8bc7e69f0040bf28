//! Solution service

use tracing::{debug, info};

use crate::application::views::SolutionView;
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{
    slugify, validate_name, validate_slug, DomainError, Principal, Solution, SolutionId,
};

use super::{authorize_write, load_solution, Store};

/// Changes to apply to a solution; `None` leaves a field as it is.
#[derive(Debug, Clone, Default)]
pub struct SolutionUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub slug: Option<String>,
}

pub struct SolutionService {
    store: Store,
}

impl SolutionService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Create a solution. Without an explicit slug one is derived from the
    /// name.
    pub fn create(
        &self,
        actor: &Principal,
        name: &str,
        description: &str,
        slug: Option<&str>,
    ) -> ApplicationResult<Solution> {
        debug!("create: solution name={}", name);
        authorize_write(actor)?;
        validate_name("solution", name)?;
        let slug = slug.map(str::to_string).unwrap_or_else(|| slugify(name));
        validate_slug(&slug)?;

        let solution = Solution::new(name, description, slug, &actor.name);
        let tx = self.store.write()?;
        tx.insert_solution(&solution)?;
        tx.commit()?;

        info!(solution = %solution.id, slug = %solution.slug, "solution created");
        Ok(solution)
    }

    pub fn update(
        &self,
        actor: &Principal,
        id: SolutionId,
        update: SolutionUpdate,
    ) -> ApplicationResult<Solution> {
        debug!("update: solution={} {:?}", id, update);
        authorize_write(actor)?;

        let tx = self.store.write()?;
        let mut solution = load_solution(&*tx, id)?;
        if let Some(name) = update.name {
            validate_name("solution", &name)?;
            solution.name = name;
        }
        if let Some(description) = update.description {
            solution.description = description;
        }
        if let Some(slug) = update.slug {
            validate_slug(&slug)?;
            solution.slug = slug;
        }
        tx.update_solution(&solution)?;
        tx.commit()?;

        info!(solution = %solution.id, "solution updated");
        Ok(solution)
    }

    /// Delete an unused solution. A final step always needs its solution,
    /// so deleting one still in use is refused.
    pub fn delete(&self, actor: &Principal, id: SolutionId) -> ApplicationResult<()> {
        debug!("delete: solution={}", id);
        authorize_write(actor)?;

        let tx = self.store.write()?;
        let solution = load_solution(&*tx, id)?;
        let steps = tx.final_steps_using(id)?;
        if steps > 0 {
            return Err(DomainError::SolutionInUse {
                name: solution.name,
                steps,
            }
            .into());
        }
        if !tx.delete_solution(id)? {
            return Err(ApplicationError::SolutionNotFound(id));
        }
        tx.commit()?;
        info!(solution = %id, "solution deleted");
        Ok(())
    }

    pub fn get(&self, id: SolutionId) -> ApplicationResult<SolutionView> {
        let tx = self.store.read()?;
        Ok(SolutionView::from(&load_solution(&*tx, id)?))
    }

    pub fn list(&self) -> ApplicationResult<Vec<SolutionView>> {
        let tx = self.store.read()?;
        Ok(tx
            .list_solutions()?
            .iter()
            .map(SolutionView::from)
            .collect())
    }
}
