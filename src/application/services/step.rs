//! Step service
//!
//! Steps are created on a path and may later be shared with other paths.
//! Role changes are validated against the flags rule and against the
//! options the step already offers.

use tracing::{debug, info};

use crate::application::views::StepDetailView;
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{
    validate_option, validate_step, validate_terminal, OptionDraft, OptionId, PathId, Principal,
    Step, StepDraft, StepId, StepRole,
};
use crate::infrastructure::traits::GraphTx;

use super::{authorize_write, load_option, load_path, load_solution, load_step, Store};

pub struct StepService {
    store: Store,
}

impl StepService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    fn checked_role(
        tx: &dyn GraphTx,
        draft: &StepDraft,
        actor: &Principal,
    ) -> ApplicationResult<StepRole> {
        let role = validate_step(draft, actor)?;
        if let Some(solution) = role.solution() {
            load_solution(tx, solution)?;
        }
        Ok(role)
    }

    /// Create a step on `path`.
    ///
    /// Each option in `previous` is re-pointed at the new step, linking it
    /// into the walk in one transaction.
    pub fn create(
        &self,
        actor: &Principal,
        path: PathId,
        draft: &StepDraft,
        previous: &[OptionId],
    ) -> ApplicationResult<Step> {
        debug!("create: step name={} path={}", draft.name, path);
        authorize_write(actor)?;

        let tx = self.store.write()?;
        let role = Self::checked_role(&*tx, draft, actor)?;
        load_path(&*tx, path)?;

        let mut step = Step::new(draft.name.clone(), role, &actor.name);
        step.paths.insert(path);
        tx.insert_step(&step)?;

        for id in previous {
            let mut option = load_option(&*tx, *id)?;
            option.next_step = Some(step.id);
            validate_option(
                &OptionDraft {
                    name: option.name.clone(),
                    step: option.step,
                    next_step: option.next_step,
                },
                actor,
            )?;
            tx.update_option(&option)?;
        }
        tx.commit()?;

        info!(step = %step.id, name = %step.name, role = %step.role, "step created");
        Ok(step)
    }

    /// Rename the step or change its role.
    pub fn update(
        &self,
        actor: &Principal,
        id: StepId,
        draft: &StepDraft,
    ) -> ApplicationResult<Step> {
        debug!("update: step={} {:?}", id, draft);
        authorize_write(actor)?;

        let tx = self.store.write()?;
        let mut step = load_step(&*tx, id)?;
        let role = Self::checked_role(&*tx, draft, actor)?;
        validate_terminal(&draft.name, role, tx.count_options(id)?, actor)?;

        step.name = draft.name.clone();
        step.role = role;
        tx.update_step(&step)?;
        tx.commit()?;

        info!(step = %step.id, name = %step.name, role = %step.role, "step updated");
        Ok(step)
    }

    /// Administrative delete. Options offered by the step go with it;
    /// so do the options leading to it.
    pub fn delete(&self, actor: &Principal, id: StepId) -> ApplicationResult<()> {
        debug!("delete: step={}", id);
        authorize_write(actor)?;

        let tx = self.store.write()?;
        if !tx.delete_step(id)? {
            return Err(ApplicationError::StepNotFound(id));
        }
        tx.commit()?;
        info!(step = %id, "step deleted");
        Ok(())
    }

    pub fn get(&self, id: StepId) -> ApplicationResult<StepDetailView> {
        let tx = self.store.read()?;
        let step = load_step(&*tx, id)?;
        StepDetailView::load(&*tx, step)
    }
}
