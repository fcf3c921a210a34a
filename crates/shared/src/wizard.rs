//! Wizard state for authoring one invitation.
//!
//! All mutation goes through [`reduce`], which returns a fresh snapshot.
//! [`WizardStore`] is the owned context handed to step handlers.

use serde::{Deserialize, Serialize};

use crate::domain::{FormDataPatch, InvitationFormData, InvitationId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    #[default]
    Template,
    Details,
    Preview,
    Payment,
}

impl WizardStep {
    pub const ORDER: [WizardStep; 4] = [
        WizardStep::Template,
        WizardStep::Details,
        WizardStep::Preview,
        WizardStep::Payment,
    ];

    pub fn index(self) -> usize {
        match self {
            WizardStep::Template => 0,
            WizardStep::Details => 1,
            WizardStep::Preview => 2,
            WizardStep::Payment => 3,
        }
    }

    /// The following step; the last step stays put.
    pub fn next(self) -> Self {
        Self::ORDER
            .get(self.index() + 1)
            .copied()
            .unwrap_or(self)
    }

    /// The preceding step; the first step stays put.
    pub fn previous(self) -> Self {
        self.index()
            .checked_sub(1)
            .and_then(|index| Self::ORDER.get(index).copied())
            .unwrap_or(self)
    }

    pub fn is_last(self) -> bool {
        self == WizardStep::Payment
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardState {
    pub step: WizardStep,
    pub form_data: InvitationFormData,
    pub invitation_id: Option<InvitationId>,
    pub is_loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WizardAction {
    SetStep(WizardStep),
    NextStep,
    PreviousStep,
    UpdateFormData(FormDataPatch),
    SetInvitationId(Option<InvitationId>),
    SetLoading(bool),
    SetError(Option<String>),
    Reset,
}

pub fn reduce(state: &WizardState, action: WizardAction) -> WizardState {
    match action {
        // No ordering guard: any step may be set directly.
        WizardAction::SetStep(step) => WizardState {
            step,
            error: None,
            ..state.clone()
        },
        WizardAction::NextStep => WizardState {
            step: state.step.next(),
            error: None,
            ..state.clone()
        },
        WizardAction::PreviousStep => WizardState {
            step: state.step.previous(),
            error: None,
            ..state.clone()
        },
        WizardAction::UpdateFormData(patch) => WizardState {
            form_data: state.form_data.merged(&patch),
            ..state.clone()
        },
        WizardAction::SetInvitationId(invitation_id) => WizardState {
            invitation_id,
            ..state.clone()
        },
        WizardAction::SetLoading(is_loading) => WizardState {
            is_loading,
            ..state.clone()
        },
        WizardAction::SetError(error) => WizardState {
            error,
            ..state.clone()
        },
        WizardAction::Reset => WizardState::default(),
    }
}

#[derive(Debug, Clone, Default)]
pub struct WizardStore {
    state: WizardState,
}

impl WizardStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: WizardState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn step(&self) -> WizardStep {
        self.state.step
    }

    pub fn form_data(&self) -> &InvitationFormData {
        &self.state.form_data
    }

    pub fn error(&self) -> Option<&str> {
        self.state.error.as_deref()
    }

    pub fn dispatch(&mut self, action: WizardAction) -> &WizardState {
        self.state = reduce(&self.state, action);
        &self.state
    }

    pub fn set_step(&mut self, step: WizardStep) {
        self.dispatch(WizardAction::SetStep(step));
    }

    pub fn next_step(&mut self) {
        self.dispatch(WizardAction::NextStep);
    }

    pub fn previous_step(&mut self) {
        self.dispatch(WizardAction::PreviousStep);
    }

    pub fn update_form_data(&mut self, patch: FormDataPatch) {
        self.dispatch(WizardAction::UpdateFormData(patch));
    }

    pub fn set_invitation_id(&mut self, invitation_id: Option<InvitationId>) {
        self.dispatch(WizardAction::SetInvitationId(invitation_id));
    }

    pub fn set_loading(&mut self, is_loading: bool) {
        self.dispatch(WizardAction::SetLoading(is_loading));
    }

    pub fn set_error(&mut self, error: Option<String>) {
        self.dispatch(WizardAction::SetError(error));
    }

    pub fn reset(&mut self) {
        self.dispatch(WizardAction::Reset);
    }
}

#[cfg(test)]
#[path = "tests/wizard_tests.rs"]
mod tests;
