//! Ambient client registry.
//!
//! A [`ClientContext`] is one node in a scope tree. Installing a client on a
//! node makes it visible to that node and every descendant created with
//! [`ClientContext::child`]; siblings and ancestors never see it. Lookups walk
//! from the node towards the root and return the nearest installed client.
//!
//! An explicitly passed client always wins over the ambient one, see
//! [`ClientContext::resolve`].

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::debug;

use crate::client::RemoteClient;
use crate::error::{BindingError, Result};

struct ScopeNode {
    parent: Option<Arc<ScopeNode>>,
    client: RwLock<Option<Arc<dyn RemoteClient>>>,
}

/// Handle to a scope in the client registry. Clones share the same scope.
#[derive(Clone)]
pub struct ClientContext {
    node: Arc<ScopeNode>,
}

static GLOBAL: Lazy<ClientContext> = Lazy::new(ClientContext::root);

impl ClientContext {
    /// A fresh root scope with no client installed.
    pub fn root() -> Self {
        Self {
            node: Arc::new(ScopeNode {
                parent: None,
                client: RwLock::new(None),
            }),
        }
    }

    /// The process-wide root scope.
    pub fn global() -> Self {
        GLOBAL.clone()
    }

    /// A new scope nested under this one.
    pub fn child(&self) -> Self {
        Self {
            node: Arc::new(ScopeNode {
                parent: Some(Arc::clone(&self.node)),
                client: RwLock::new(None),
            }),
        }
    }

    /// Install `client` at this scope, replacing any client installed here.
    pub fn set(&self, client: Arc<dyn RemoteClient>) {
        debug!(replaced = self.node.client.read().is_some(), "installing client");
        *self.node.client.write() = Some(client);
    }

    /// Remove the client installed at this scope, exposing the ancestors' again.
    pub fn clear(&self) -> Option<Arc<dyn RemoteClient>> {
        self.node.client.write().take()
    }

    /// The nearest installed client, or `None`. Never fails.
    pub fn try_get(&self) -> Option<Arc<dyn RemoteClient>> {
        let mut node = Some(&self.node);
        while let Some(current) = node {
            if let Some(client) = current.client.read().as_ref() {
                return Some(Arc::clone(client));
            }
            node = current.parent.as_ref();
        }
        None
    }

    /// The nearest installed client.
    ///
    /// # Errors
    ///
    /// [`BindingError::Configuration`] when no scope up to the root has one.
    pub fn get(&self) -> Result<Arc<dyn RemoteClient>> {
        self.try_get().ok_or_else(BindingError::missing_client)
    }

    /// `explicit` if given, otherwise the ambient client.
    ///
    /// # Errors
    ///
    /// [`BindingError::Configuration`] when neither is available.
    pub fn resolve(
        &self,
        explicit: Option<&Arc<dyn RemoteClient>>,
    ) -> Result<Arc<dyn RemoteClient>> {
        match explicit {
            Some(client) => Ok(Arc::clone(client)),
            None => self.get(),
        }
    }

    fn depth(&self) -> usize {
        let mut depth = 0;
        let mut node = self.node.parent.as_ref();
        while let Some(current) = node {
            depth += 1;
            node = current.parent.as_ref();
        }
        depth
    }
}

impl Default for ClientContext {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Debug for ClientContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientContext")
            .field("depth", &self.depth())
            .field("has_local_client", &self.node.client.read().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::NoopClient;

    fn client() -> Arc<dyn RemoteClient> {
        Arc::new(NoopClient)
    }

    #[test]
    fn empty_scope_fails_get_but_not_try_get() {
        let ctx = ClientContext::root();
        assert!(ctx.try_get().is_none());
        let err = ctx.get().err().expect("get must fail without a client");
        assert!(matches!(err, BindingError::Configuration(_)));
    }

    #[test]
    fn descendants_see_ancestor_client() {
        let root = ClientContext::root();
        let installed = client();
        root.set(Arc::clone(&installed));
        let grandchild = root.child().child();
        let found = grandchild.get().unwrap();
        assert!(Arc::ptr_eq(&found, &installed));
    }

    #[test]
    fn siblings_and_ancestors_are_unaffected() {
        let root = ClientContext::root();
        let left = root.child();
        let right = root.child();
        left.set(client());
        assert!(left.try_get().is_some());
        assert!(right.try_get().is_none());
        assert!(root.try_get().is_none());
    }

    #[test]
    fn nearest_scope_wins_and_clear_restores_parent() {
        let root = ClientContext::root();
        let outer = client();
        let inner = client();
        root.set(Arc::clone(&outer));
        let child = root.child();
        child.set(Arc::clone(&inner));
        assert!(Arc::ptr_eq(&child.get().unwrap(), &inner));
        child.clear();
        assert!(Arc::ptr_eq(&child.get().unwrap(), &outer));
    }

    #[test]
    fn explicit_client_overrides_ambient() {
        let root = ClientContext::root();
        let ambient = client();
        let explicit = client();
        root.set(Arc::clone(&ambient));
        let resolved = root.resolve(Some(&explicit)).unwrap();
        assert!(Arc::ptr_eq(&resolved, &explicit));
        let fallback = root.resolve(None).unwrap();
        assert!(Arc::ptr_eq(&fallback, &ambient));
    }

    #[test]
    fn explicit_client_resolves_without_ambient() {
        let root = ClientContext::root();
        assert!(root.resolve(Some(&client())).is_ok());
        assert!(root.resolve(None).is_err());
    }

    #[test]
    fn debug_reports_depth() {
        let ctx = ClientContext::root().child().child();
        assert!(format!("{ctx:?}").contains("depth: 2"));
    }

    #[test]
    fn global_is_one_shared_scope() {
        let installed = client();
        ClientContext::global().set(Arc::clone(&installed));
        let seen = ClientContext::global().child().get().unwrap();
        assert!(Arc::ptr_eq(&seen, &installed));
        assert!(ClientContext::root().try_get().is_none(), "fresh roots stay separate");
        ClientContext::global().clear();
        assert!(ClientContext::global().try_get().is_none());
    }
}
