//! Workflow state abstraction for the Pregel runtime
//!
//! Defines how a committed partial update is merged into the shared state.
//! Each field's merge behaviour must follow the policy the state declares in
//! its [`StateSchema`].

use super::schema::StateSchema;
use super::vertex::StateUpdate;

/// Trait for workflow state managed by the Pregel runtime
///
/// # Example
///
/// ```ignore
/// #[derive(Clone, Default)]
/// struct TriageState {
///     symptom: String,
///     notes: Vec<String>,
/// }
///
/// impl WorkflowState for TriageState {
///     type Update = TriageUpdate;
///
///     fn schema(&self) -> &StateSchema {
///         triage_schema()
///     }
///
///     fn apply_update(&self, update: Self::Update) -> Self {
///         let mut new = self.clone();
///         if let Some(notes) = update.notes {
///             notes.apply_to(&mut new.notes);
///         }
///         new
///     }
/// }
/// ```
pub trait WorkflowState: Clone + Send + Sync + 'static {
    /// The update type produced by vertices
    type Update: StateUpdate;

    /// Field declarations used to validate updates before commit
    fn schema(&self) -> &StateSchema;

    /// Apply an update to produce a new state
    ///
    /// This should be a pure function - the original state is not modified.
    fn apply_update(&self, update: Self::Update) -> Self;

    /// Check if the state represents a terminal condition
    ///
    /// When true, the workflow stops after the current commit.
    fn is_terminal(&self) -> bool {
        false
    }

    /// Apply multiple updates in commit order
    fn apply_updates(&self, updates: Vec<Self::Update>) -> Self {
        updates
            .into_iter()
            .fold(self.clone(), |state, update| state.apply_update(update))
    }
}
