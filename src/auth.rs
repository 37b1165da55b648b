//! Caller authentication for ingestion.
//!
//! Uploading statements requires an authenticated operator; retrieval
//! does not. The provider is injected into the orchestrator so tests can
//! substitute a fixed session.

/// An authenticated caller.
#[derive(Debug, Clone)]
pub struct Session {
    /// Who is ingesting, e.g. a staff account name.
    pub subject: String,
}

/// Supplies the current session, if any.
///
/// Consulted once per ingestion batch, before any storage I/O.
pub trait AuthProvider: Send + Sync {
    fn current_session(&self) -> Option<Session>;
}

/// Operator identity from the `STMT_OPERATOR` environment variable.
///
/// Unset or blank means unauthenticated, which fails an upload batch
/// before any file is touched.
pub struct EnvAuth;

impl AuthProvider for EnvAuth {
    fn current_session(&self) -> Option<Session> {
        match std::env::var("STMT_OPERATOR") {
            Ok(subject) if !subject.trim().is_empty() => Some(Session { subject }),
            _ => None,
        }
    }
}
