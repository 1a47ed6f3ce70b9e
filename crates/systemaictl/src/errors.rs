//! Exit codes for systemai

/// Exit code for success
pub const EXIT_SUCCESS: i32 = 0;

/// Exit code for general errors, including failed actions
pub const EXIT_GENERAL_ERROR: i32 = 1;

/// Exit code when the configuration cannot be loaded or saved
pub const EXIT_CONFIG_ERROR: i32 = 78;

/// Exit code when the planner could not produce a plan
pub const EXIT_PLANNING_ERROR: i32 = 69;

/// Exit code when the validator rejected the plan
pub const EXIT_PLAN_REJECTED: i32 = 65;
