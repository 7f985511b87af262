//! In-memory navigator
//!
//! Stands in for `window.location` in tests and non-browser hosts. Records
//! every `replace_url` and `navigate` call.

use parking_lot::Mutex;

use crate::traits::Navigator;

#[derive(Debug, Default)]
struct Inner {
    current: String,
    replaced: Vec<String>,
    navigations: Vec<String>,
}

#[derive(Debug, Default)]
pub struct MemoryNavigator {
    inner: Mutex<Inner>,
}

impl MemoryNavigator {
    #[must_use]
    pub fn new(current_url: impl Into<String>) -> Self {
        Self {
            inner: Mutex::new(Inner { current: current_url.into(), ..Inner::default() }),
        }
    }

    /// Simulate the browser landing on `url` (e.g. an authorization redirect)
    pub fn set_current_url(&self, url: impl Into<String>) {
        self.inner.lock().current = url.into();
    }

    /// URLs passed to `replace_url`, oldest first
    #[must_use]
    pub fn replaced(&self) -> Vec<String> {
        self.inner.lock().replaced.clone()
    }

    /// URLs passed to `navigate`, oldest first
    #[must_use]
    pub fn navigations(&self) -> Vec<String> {
        self.inner.lock().navigations.clone()
    }

    #[must_use]
    pub fn last_navigation(&self) -> Option<String> {
        self.inner.lock().navigations.last().cloned()
    }
}

impl Navigator for MemoryNavigator {
    fn current_url(&self) -> String {
        self.inner.lock().current.clone()
    }

    fn replace_url(&self, url: &str) {
        let mut inner = self.inner.lock();
        inner.current = url.to_string();
        inner.replaced.push(url.to_string());
    }

    fn navigate(&self, url: &str) {
        let mut inner = self.inner.lock();
        inner.current = url.to_string();
        inner.navigations.push(url.to_string());
    }
}
