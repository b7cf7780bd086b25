//! Service layer for deployment window evaluation and profile management.
//!
//! Leaves first: [`window_evaluator`] answers "is this instant inside a
//! recurrence rule, and when does that flip"; [`state_calculator`] applies
//! the blackout/maintenance precedence algorithm over a set of profiles;
//! [`exclusion`] combines per-profile bypass lists; [`orchestrator`] wires
//! them to the policy store and user directory.

pub mod exclusion;
pub mod orchestrator;
pub mod state_calculator;
pub mod window_evaluator;

pub use exclusion::{get_combined_user_ids, get_user_action_state_for_user, CombinedUserIds};
pub use orchestrator::DeploymentWindowService;
pub use state_calculator::{
    calculate_state_for_profiles, get_applied_profile_and_calculate_states, AppliedEvaluation,
};
pub use window_evaluator::{get_active_window, WindowEvaluation};
