use parking_lot::RwLock;

/// Source of the optional session credential sent with authenticated calls.
pub trait CredentialProvider: Send + Sync {
    fn session_token(&self) -> Option<String>;
}

/// In-memory credential, replaced when the user logs in or out.
#[derive(Debug, Default)]
pub struct StaticCredentials {
    token: RwLock<Option<String>>,
}

impl StaticCredentials {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token.filter(|t| !t.trim().is_empty())),
        }
    }

    pub fn set(&self, token: Option<String>) {
        *self.token.write() = token.filter(|t| !t.trim().is_empty());
    }
}

impl CredentialProvider for StaticCredentials {
    fn session_token(&self) -> Option<String> {
        self.token.read().clone()
    }
}
