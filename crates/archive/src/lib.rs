//! Suncast Archive Client
//!
//! Talks to the SDO browse archive:
//! - **Locator:** reads the daily HTML index and picks out the most recent
//!   frame links of the wanted variant
//! - **Cache:** resolves frame links to files in the durable `originals/`
//!   directory, downloading only on a miss
//! - **HTTP:** the GET-only seam both of them go through

pub mod cache;
pub mod http;
pub mod locator;

pub use cache::*;
pub use http::*;
pub use locator::*;
