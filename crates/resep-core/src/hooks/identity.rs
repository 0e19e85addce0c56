/// Supplies the current user's opaque identifier.
///
/// `None` is a valid answer (signed out, or not resolved yet) and makes
/// per-user fetches a no-op.
pub trait UserIdentity: Send + Sync {
    fn user_identifier(&self) -> Option<String>;
}

/// A fixed identifier, e.g. from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticIdentity(Option<String>);

impl StaticIdentity {
    pub fn new(user_identifier: impl Into<String>) -> Self {
        Self(Some(user_identifier.into()))
    }

    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl From<Option<String>> for StaticIdentity {
    fn from(value: Option<String>) -> Self {
        Self(value)
    }
}

impl UserIdentity for StaticIdentity {
    fn user_identifier(&self) -> Option<String> {
        self.0.clone()
    }
}
