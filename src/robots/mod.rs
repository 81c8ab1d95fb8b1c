//! Robots.txt handling module
//!
//! Fetching, parsing, and caching of robots.txt files, plus the policy-aware
//! checker that decides whether a candidate URL may be fetched and how long
//! to wait before fetching it.

mod cache;
mod checker;
mod parser;

pub use cache::{shared_cache, RobotsCache, RobotsCacheEntry};
pub use checker::{robots_url_for, RobotsTxtChecker, RobotsVerdict};
pub use parser::ParsedRobots;
