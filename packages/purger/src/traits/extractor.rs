//! Collaborators that talk to the record source.
//!
//! A purge needs two things from the outside world: a signed-in session and
//! something that turns one page of the client's file into rows. Both are
//! injected into [`crate::JobRunner`]; this crate never scrapes anything
//! itself.

use async_trait::async_trait;

use crate::error::Result;
use crate::security::credentials::Credentials;
use crate::types::{
    context::JobContext,
    record::{default_units, ExtractionUnit, Record},
};

/// Scoped access to the record source.
///
/// `release` is called exactly once for every successful `acquire`, on every
/// exit path of the job.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    type Session: Send;

    /// Open and sign in a session.
    async fn acquire(&self, credentials: &Credentials, ctx: &JobContext) -> Result<Self::Session>;

    /// Close the session.
    async fn release(&self, session: Self::Session);
}

/// Per-page extraction.
#[async_trait]
pub trait Extractor<S: Send>: Send + Sync {
    /// Units to extract, in order.
    fn units(&self) -> Vec<ExtractionUnit> {
        default_units()
    }

    /// Extract one unit.
    ///
    /// Files may be written under `ctx.documents_directory()`. An error here
    /// only skips this unit; the job carries on with the next one.
    async fn extract(
        &self,
        session: &mut S,
        unit: &ExtractionUnit,
        ctx: &JobContext,
    ) -> Result<Vec<Record>>;
}
