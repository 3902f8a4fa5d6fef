//! Scoped open windows
//!
//! `request_update` is the only sanctioned way to open a realm. The guard
//! closes it on every exit path: normal return, `Err`, panic unwind, and for
//! the async form completion or drop of the future. A call only closes what it
//! opened, so nested calls inside an open window leave closing to the
//! outermost one and each window is closed exactly once.

use std::future::Future;

use crate::Realm;

/// Keeps a realm open while alive
#[derive(Debug)]
#[must_use = "the realm closes as soon as the guard is dropped"]
pub struct OpenGuard {
    realm: Realm,
    opened: bool,
}

impl OpenGuard {
    /// Open `realm` until the guard is dropped
    pub fn acquire(realm: &Realm) -> Self {
        let opened = realm.dangerously_open();
        if !opened {
            tracing::trace!(realm = %realm.id(), "request_update inside an open window");
        }
        Self {
            realm: realm.clone(),
            opened,
        }
    }

    /// Whether this guard opened the realm (and will close it)
    pub fn opened(&self) -> bool {
        self.opened
    }
}

impl Drop for OpenGuard {
    fn drop(&mut self) {
        if self.opened {
            self.opened = false;
            self.realm.dangerously_close();
        }
    }
}

impl Realm {
    /// Run `update` with the realm open, closing it afterwards
    pub fn request_update<R>(&self, update: impl FnOnce() -> R) -> R {
        let _guard = OpenGuard::acquire(self);
        update()
    }

    /// Async form: the realm stays open until the future settles
    pub async fn request_update_async<F, Fut, R>(&self, update: F) -> R
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = R>,
    {
        let _guard = OpenGuard::acquire(self);
        update().await
    }
}

#[cfg(test)]
mod tests {
    use crate::Dom;

    #[test]
    fn test_closes_after_error() {
        let dom = Dom::new();
        let host = dom.create_element("x-el");
        let realm = dom.create_realm(host).unwrap();
        realm.initialize().unwrap();

        let result: Result<(), &str> = realm.request_update(|| {
            assert!(realm.is_open());
            Err("render failed")
        });
        assert_eq!(result, Err("render failed"));
        assert!(!realm.is_open());
    }

    #[test]
    fn test_closes_after_panic() {
        let dom = Dom::new();
        let host = dom.create_element("x-el");
        let realm = dom.create_realm(host).unwrap();
        realm.initialize().unwrap();

        let caught = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            realm.request_update::<()>(|| panic!("boom"))
        }));
        assert!(caught.is_err());
        assert!(!realm.is_open());
    }

    #[test]
    fn test_nested_update_closes_once() {
        let dom = Dom::new();
        let host = dom.create_element("x-el");
        let realm = dom.create_realm(host).unwrap();
        realm.initialize().unwrap();

        realm.request_update(|| {
            realm.request_update(|| assert!(realm.is_open()));
            // Inner call did not close the outer window
            assert!(realm.is_open());
        });
        assert!(!realm.is_open());
    }
}
