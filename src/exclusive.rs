// Exclusive ownership: one holder, one resource, released exactly once
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

use log::{debug, trace};

use crate::error::HolderError;
use crate::state::HolderState;

const HOLDER: &str = "exclusive";

/// ExclusiveHolder: sole owner of a heap-allocated `T`
///
/// The holder has no `Clone` impl, so two holders can never alias the same
/// resource. Ownership moves only by a Rust move or by [`transfer`].
///
/// ```compile_fail
/// use holders::ExclusiveHolder;
///
/// fn assert_clone<T: Clone>() {}
/// assert_clone::<ExclusiveHolder<i32>>();
/// ```
///
/// A plain move leaves the old binding unusable:
///
/// ```compile_fail
/// use holders::ExclusiveHolder;
///
/// let first = ExclusiveHolder::new(1);
/// let second = first;
/// assert_eq!(*first, *second);
/// ```
///
/// [`transfer`]: ExclusiveHolder::transfer
pub struct ExclusiveHolder<T> {
    resource: Option<NonNull<T>>,
    _owns: PhantomData<T>,
}

// The holder owns its `T` the same way `Box<T>` does.
unsafe impl<T: Send> Send for ExclusiveHolder<T> {}
unsafe impl<T: Sync> Sync for ExclusiveHolder<T> {}

impl<T> ExclusiveHolder<T> {
    /// Boxes `value` and takes ownership of the allocation.
    pub fn new(value: T) -> Self {
        Self::from_box(Box::new(value))
    }

    /// Takes ownership of an already-allocated resource.
    pub fn from_box(resource: Box<T>) -> Self {
        trace!("{HOLDER} holder acquired {}", std::any::type_name::<T>());
        ExclusiveHolder {
            resource: NonNull::new(Box::into_raw(resource)),
            _owns: PhantomData,
        }
    }

    pub fn empty() -> Self {
        ExclusiveHolder {
            resource: None,
            _owns: PhantomData,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.resource.is_none()
    }

    pub fn state(&self) -> HolderState {
        HolderState::from_present(self.resource.is_some())
    }

    pub fn get(&self) -> Result<&T, HolderError> {
        match self.resource {
            // SAFETY: the pointer came from `Box::into_raw` and is only freed by `dispose`.
            Some(ptr) => Ok(unsafe { ptr.as_ref() }),
            None => Err(HolderError::null_dereference(HOLDER)),
        }
    }

    pub fn access(&mut self) -> Result<&mut T, HolderError> {
        match self.resource {
            // SAFETY: `&mut self` guarantees this is the only live borrow of the resource.
            Some(mut ptr) => Ok(unsafe { ptr.as_mut() }),
            None => Err(HolderError::null_dereference(HOLDER)),
        }
    }

    /// Releases the resource if one is held. Calling it again does nothing.
    pub fn dispose(&mut self) {
        if let Some(ptr) = self.resource.take() {
            // SAFETY: `take` cleared the only copy of the pointer, so it is freed once.
            unsafe { drop(Box::from_raw(ptr.as_ptr())) };
            debug!("{HOLDER} holder released {}", std::any::type_name::<T>());
        }
    }

    /// Moves ownership into a new holder and leaves this one empty.
    pub fn transfer(&mut self) -> ExclusiveHolder<T> {
        if self.resource.is_some() {
            trace!("{HOLDER} holder transferred {}", std::any::type_name::<T>());
        }
        ExclusiveHolder {
            resource: self.resource.take(),
            _owns: PhantomData,
        }
    }

    /// Disposes the current resource and takes ownership of `resource`.
    pub fn reset(&mut self, resource: Box<T>) {
        self.dispose();
        *self = Self::from_box(resource);
    }

    /// Hands the resource back to the caller without destroying it.
    pub fn into_box(mut self) -> Option<Box<T>> {
        self.resource
            .take()
            // SAFETY: ownership of the allocation leaves the holder with the box.
            .map(|ptr| unsafe { Box::from_raw(ptr.as_ptr()) })
    }
}

impl<T> Default for ExclusiveHolder<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> From<Box<T>> for ExclusiveHolder<T> {
    fn from(resource: Box<T>) -> Self {
        Self::from_box(resource)
    }
}

/// Panics on an empty holder; use [`ExclusiveHolder::get`] for a checked read.
impl<T> Deref for ExclusiveHolder<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        match self.get() {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }
}

/// Panics on an empty holder; use [`ExclusiveHolder::access`] for a checked write.
impl<T> DerefMut for ExclusiveHolder<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match self.access() {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }
}

impl<T> Drop for ExclusiveHolder<T> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<T: fmt::Debug> fmt::Debug for ExclusiveHolder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Ok(value) => f.debug_tuple("ExclusiveHolder").field(value).finish(),
            Err(_) => f.write_str("ExclusiveHolder(<empty>)"),
        }
    }
}
