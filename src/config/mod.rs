//! Configuration module
//!
//! Policy types for the trust boundary plus TOML loading, hashing, and
//! validation for the command-line front end.

mod parser;
mod types;
mod validation;

pub use parser::{
    compute_config_hash, load_config, load_config_with_hash, parse_path_list, parse_robots_policy,
};
pub use types::{
    Config, FetchConfig, OutputConfig, RemoteFetchPolicy, RobotsPolicy, SandboxOptions,
};
pub use validation::validate;
