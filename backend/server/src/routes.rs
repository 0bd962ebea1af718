//! HTTP handlers, one submodule per area. Handlers parse, call into `records`, and
//! shape the JSON. Domain rules stay in `records`.
pub mod hackathons;
pub mod health;
pub mod ide;
pub mod teams;
pub mod users;
pub mod workspace;

pub use hackathons::{
    activity_dashboard_handler, add_judge_handler, advance_handler, clear_flag_handler,
    create_hackathon_handler, get_hackathon_handler, leaderboard_handler,
    participant_credentials_handler, participants_handler, register_handler, search_handler,
    team_matches_handler, update_hackathon_handler, withdraw_handler,
};
pub use health::health_handler;
pub use ide::{activity_handler, execute_handler, login_handler, logout_handler, terminal_handler};
pub use teams::{
    create_team_handler, get_team_handler, join_team_handler, leave_team_handler,
    list_teams_handler, remove_member_handler, score_handler, submission_handler,
    team_credentials_handler, teammate_matches_handler,
};
pub use users::{
    add_organization_member_handler, create_organization_handler, create_user_handler,
    get_organization_handler, get_user_handler, update_profile_handler,
};
pub use workspace::{
    close_pull_handler, commit_handler, commit_log_handler, create_branch_handler,
    delete_branch_handler, delete_file_handler, get_branch_handler, list_branches_handler,
    list_pulls_handler, merge_pull_handler, open_pull_handler, write_file_handler,
};
