//! Storage for user callbacks invoked from engine components.

use std::cell::RefCell;

/// A boxed `FnMut` that components call back into the UI through.
///
/// A callback that re-enters its own component and triggers itself again is
/// skipped instead of panicking on the double borrow.
pub(crate) struct Callback<A> {
    name: &'static str,
    inner: RefCell<Box<dyn FnMut(A)>>,
}

impl<A> Callback<A> {
    pub(crate) fn new(name: &'static str, f: impl FnMut(A) + 'static) -> Self {
        Self {
            name,
            inner: RefCell::new(Box::new(f)),
        }
    }

    pub(crate) fn invoke(&self, arg: A) {
        match self.inner.try_borrow_mut() {
            Ok(mut f) => f(arg),
            Err(_) => log::warn!("Skipping re-entrant {} callback", self.name),
        }
    }
}

impl Callback<()> {
    pub(crate) fn from_fn(name: &'static str, mut f: impl FnMut() + 'static) -> Self {
        Self::new(name, move |()| f())
    }
}
