// Core infrastructure modules
pub mod core;

// Change orchestration
pub mod changes;
pub mod changeset;
pub mod cli;
pub mod config;
pub mod orchestrator;
pub mod report;

#[cfg(test)]
mod test_utils;

/// Identifies this tool to database servers and in logs.
pub fn client_tag() -> String {
    format!(
        "sqlship v{} ({})",
        env!("CARGO_PKG_VERSION"),
        option_env!("SQLSHIP_VCS_REVISION").unwrap_or("dev")
    )
}
