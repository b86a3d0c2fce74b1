//! Document store adapters over the Firestore REST API.
//!
//! [`FirestoreClient`] owns transport; the repositories translate between
//! stored documents and domain types.

mod client;
mod reports;
mod users;
mod value;

pub use client::{FirestoreAuth, FirestoreClient, FirestoreError};
pub use reports::{FirestoreReportRepository, UIN_INDEX_COLLECTION};
pub use users::FirestoreUserRepository;
