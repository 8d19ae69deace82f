//! Client for the SIAKAD academic portal.

pub mod auth;
pub mod catalog;
pub mod client;
pub mod errors;
pub mod json;
pub mod models;
pub mod sections;
pub mod session;

pub use auth::{AuthState, Authenticator, Credentials};
pub use catalog::{TrackCatalog, list_terms};
pub use client::PortalClient;
pub use errors::{AuthError, CatalogError, PortalError};
pub use models::{RosterEntry, Section, SectionList, Term, Track};
pub use sections::{ActiveContext, SectionFetcher};
pub use session::{Session, SessionStore};
