//! Suncast Publisher
//!
//! Posts a finished animation as a status with attached media. Publishing
//! is best effort: the upload + post pair is retried a bounded number of
//! times and then abandoned, and the artifact on disk is never touched.
//!
//! The [`Publisher`] trait is the seam; [`TwitterPublisher`] is the
//! OAuth 1.0a backend and [`TwitterAuthorizer`] runs the PIN flow that
//! produces its access keys.

pub mod authorize;
pub mod credentials;
pub mod oauth;
pub mod publish;
pub mod twitter;

pub use authorize::{AccessToken, RequestToken, TwitterAuthorizer};
pub use credentials::{ConsumerKeys, Credentials};
pub use publish::{publish_artifact, PostedStatus, PublishOutcome, Publisher};
pub use twitter::TwitterPublisher;
