//! Network boundary module
//!
//! Address classification (the SSRF guard) and the secure fetch path that
//! validates every connection, including every redirect hop.

mod address;
mod fetcher;

pub use address::{classify_address, is_fetchable, AddressClass};
pub use fetcher::{FetchedBody, Fetcher, SecureFetcher};
