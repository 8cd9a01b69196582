use crate::status::TransitionPolicy;

/// Knobs of the projection engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProjectorConfig {
    pub transition_policy: TransitionPolicy,
    /// Reject application events without `_jobPostingAddress`.
    pub require_job_posting_address: bool,
}

impl Default for ProjectorConfig {
    fn default() -> Self {
        Self {
            transition_policy: TransitionPolicy::Unconditional,
            require_job_posting_address: true,
        }
    }
}
