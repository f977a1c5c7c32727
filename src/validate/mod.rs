// ABOUTME: Job spec validation module
// ABOUTME: Pure checks for untrusted submissions and connection URLs

pub mod spec;
pub mod url;

pub use spec::validate_job_spec;
pub use url::check_postgres_url;
