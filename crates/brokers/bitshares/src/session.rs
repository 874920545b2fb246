/// Sign-in state against the bridge for one adapter instance.
///
/// Once authenticated it stays authenticated; there is no expiry handling.
/// Callers that need a fresh login build a new adapter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    authenticated: bool,
    account: Option<String>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Account the session signed in as.
    pub fn account(&self) -> Option<&str> {
        self.account.as_deref()
    }

    pub(crate) fn mark_authenticated(&mut self, account: &str) {
        self.authenticated = true;
        self.account = Some(account.to_string());
    }
}
