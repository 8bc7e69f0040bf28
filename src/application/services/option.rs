//! Option service

use tracing::{debug, info};

use crate::application::views::OptionView;
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{
    validate_option, validate_terminal, OptionDraft, OptionId, Principal, StepId, StepOption,
};
use crate::infrastructure::traits::GraphTx;

use super::{authorize_write, load_option, load_step, Store};

/// Changes to apply to an option; `None` leaves a field as it is.
#[derive(Debug, Clone, Default)]
pub struct OptionUpdate {
    pub name: Option<String>,
    pub step: Option<StepId>,
    /// `Some(None)` clears the next step
    pub next_step: Option<Option<StepId>>,
}

pub struct OptionService {
    store: Store,
}

impl OptionService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Validate a candidate option against the rules and the stored graph.
    ///
    /// `adds_to_step` is true when the option is new on its step, which
    /// then offers one more option than it does now.
    fn check(
        tx: &dyn GraphTx,
        draft: &OptionDraft,
        adds_to_step: bool,
        actor: &Principal,
    ) -> ApplicationResult<()> {
        validate_option(draft, actor)?;
        let step = load_step(tx, draft.step)?;
        if adds_to_step {
            let outgoing = tx.count_options(step.id)? + 1;
            validate_terminal(&step.name, step.role, outgoing, actor)?;
        }
        if let Some(next) = draft.next_step {
            load_step(tx, next)?;
        }
        Ok(())
    }

    pub fn create(&self, actor: &Principal, draft: &OptionDraft) -> ApplicationResult<StepOption> {
        debug!("create: option name={} step={}", draft.name, draft.step);
        authorize_write(actor)?;

        let tx = self.store.write()?;
        Self::check(&*tx, draft, true, actor)?;
        let option = StepOption::new(draft.name.clone(), draft.step, draft.next_step, &actor.name);
        tx.insert_option(&option)?;
        tx.commit()?;

        info!(option = %option.id, name = %option.name, step = %option.step, "option created");
        Ok(option)
    }

    pub fn update(
        &self,
        actor: &Principal,
        id: OptionId,
        update: OptionUpdate,
    ) -> ApplicationResult<StepOption> {
        debug!("update: option={} {:?}", id, update);
        authorize_write(actor)?;

        let tx = self.store.write()?;
        let mut option = load_option(&*tx, id)?;
        let draft = OptionDraft {
            name: update.name.unwrap_or_else(|| option.name.clone()),
            step: update.step.unwrap_or(option.step),
            next_step: update.next_step.unwrap_or(option.next_step),
        };
        Self::check(&*tx, &draft, draft.step != option.step, actor)?;

        option.name = draft.name;
        option.step = draft.step;
        option.next_step = draft.next_step;
        tx.update_option(&option)?;
        tx.commit()?;

        info!(option = %option.id, name = %option.name, "option updated");
        Ok(option)
    }

    pub fn delete(&self, actor: &Principal, id: OptionId) -> ApplicationResult<()> {
        debug!("delete: option={}", id);
        authorize_write(actor)?;

        let tx = self.store.write()?;
        if !tx.delete_option(id)? {
            return Err(ApplicationError::OptionNotFound(id));
        }
        tx.commit()?;
        info!(option = %id, "option deleted");
        Ok(())
    }

    pub fn get(&self, id: OptionId) -> ApplicationResult<OptionView> {
        let tx = self.store.read()?;
        Ok(OptionView::from(&load_option(&*tx, id)?))
    }
}
