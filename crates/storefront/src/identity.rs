//! Signed-in identity and change notifications.
//!
//! The provider publishes the current [`Identity`] (or `None` for an
//! anonymous session) on a `tokio::sync::watch` channel. Containers hold a
//! receiver and re-source their collections whenever it changes.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::info;

use figurine_core::{Email, IdentityKey};

/// An authenticated principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Stable key; also the key of the user's remote documents.
    pub key: IdentityKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<Email>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl Identity {
    #[must_use]
    pub const fn new(key: IdentityKey) -> Self {
        Self {
            key,
            email: None,
            display_name: None,
        }
    }

    #[must_use]
    pub fn with_email(mut self, email: Email) -> Self {
        self.email = Some(email);
        self
    }

    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Name to greet the user with: display name, else the email's local
    /// part, else the key.
    #[must_use]
    pub fn greeting_name(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .or_else(|| self.email.as_ref().map(Email::local_part))
            .unwrap_or_else(|| self.key.as_str())
    }
}

/// Publishes the session's current identity.
///
/// Cheap to clone; clones share the same channel.
#[derive(Debug, Clone)]
pub struct IdentityProvider {
    tx: Arc<watch::Sender<Option<Identity>>>,
}

impl Default for IdentityProvider {
    fn default() -> Self {
        Self::anonymous()
    }
}

impl IdentityProvider {
    /// A provider with nobody signed in.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::with_identity(None)
    }

    /// A provider starting from a restored identity.
    #[must_use]
    pub fn with_identity(identity: Option<Identity>) -> Self {
        let (tx, _rx) = watch::channel(identity);
        Self { tx: Arc::new(tx) }
    }

    /// The identity right now.
    #[must_use]
    pub fn current(&self) -> Option<Identity> {
        self.tx.borrow().clone()
    }

    /// Sign `identity` in. Re-signing the same identity does not notify.
    pub fn sign_in(&self, identity: Identity) {
        let changed = self.tx.send_if_modified(|current| {
            if current.as_ref() == Some(&identity) {
                return false;
            }
            *current = Some(identity.clone());
            true
        });
        if changed {
            info!(key = %identity.key, "Identity signed in");
        }
    }

    /// Sign out. A no-op for an anonymous session.
    pub fn sign_out(&self) {
        let previous = self.tx.send_if_modified(|current| current.take().is_some());
        if previous {
            info!("Identity signed out");
        }
    }

    /// Receiver that observes every identity change from now on.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn identity(key: &str) -> Identity {
        Identity::new(IdentityKey::parse(key).unwrap())
    }

    #[test]
    fn test_greeting_name_fallbacks() {
        let bare = identity("uid9");
        assert_eq!(bare.greeting_name(), "uid9");

        let with_email = bare
            .clone()
            .with_email(Email::parse("zenitsu@figuro.ph").unwrap());
        assert_eq!(with_email.greeting_name(), "zenitsu");

        let named = with_email.with_display_name("Zenitsu Agatsuma");
        assert_eq!(named.greeting_name(), "Zenitsu Agatsuma");

        let blank = identity("uid9").with_display_name("  ");
        assert_eq!(blank.greeting_name(), "uid9");
    }

    #[tokio::test]
    async fn test_sign_in_and_out_notify_subscribers() {
        let provider = IdentityProvider::anonymous();
        let mut rx = provider.subscribe();
        assert!(rx.borrow_and_update().is_none());

        provider.sign_in(identity("a1"));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().as_ref(), Some(&identity("a1")));

        provider.sign_out();
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_none());
        assert!(provider.current().is_none());
    }

    #[test]
    fn test_repeated_sign_in_does_not_notify() {
        let provider = IdentityProvider::with_identity(Some(identity("a1")));
        let mut rx = provider.subscribe();

        provider.sign_in(identity("a1"));
        assert!(!rx.has_changed().unwrap());

        provider.sign_out();
        provider.sign_out();
        assert!(rx.has_changed().unwrap());
        rx.mark_unchanged();
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_identity_serde_shape() {
        let id = identity("k1").with_display_name("Nezuko");
        let value = serde_json::to_value(&id).unwrap();
        assert_eq!(value["key"], "k1");
        assert_eq!(value["displayName"], "Nezuko");
        assert!(value.get("email").is_none());
    }
}
