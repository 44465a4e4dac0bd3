// Shared ownership: many holders, one resource, one counter
use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;
use std::ptr::NonNull;

use log::{debug, error, trace};

use crate::counter::{AtomicCount, LocalCount, RefCounter};
use crate::error::HolderError;
use crate::state::HolderState;

/// The (resource, count) pair every alias points at.
///
/// Resource and counter are separate allocations, released together.
struct SharedPair<T, C> {
    resource: NonNull<T>,
    count: NonNull<C>,
}

impl<T, C> Clone for SharedPair<T, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, C> Copy for SharedPair<T, C> {}

impl<T, C> SharedPair<T, C> {
    fn counter(&self) -> &C {
        // SAFETY: the counter outlives every holder that still has the pair.
        unsafe { self.count.as_ref() }
    }

    fn resource(&self) -> &T {
        // SAFETY: same lifetime as the counter.
        unsafe { self.resource.as_ref() }
    }
}

/// SharedHolder: reference-counted owner of a heap-allocated `T`
///
/// Cloning aliases the resource and bumps the count; disposing (or dropping)
/// the last alias releases the resource and the counter. The counter type is
/// pluggable: [`LocalCount`] keeps holders on one thread, [`AtomicCount`]
/// (see [`SyncSharedHolder`]) lets them cross threads.
///
/// Assigning a holder onto itself does not get past the borrow checker:
///
/// ```compile_fail
/// use holders::SharedHolder;
///
/// let mut holder: SharedHolder<i32> = SharedHolder::new(1);
/// holder.assign_from(&holder);
/// ```
pub struct SharedHolder<T, C: RefCounter = LocalCount> {
    pair: Option<SharedPair<T, C>>,
    _owns: PhantomData<(T, C)>,
}

/// Shared holder whose count may be touched from several threads at once.
pub type SyncSharedHolder<T> = SharedHolder<T, AtomicCount>;

// Sending one alias while others stay behind means both threads share `T` and
// the counter, so both must be `Sync` (this rules out `LocalCount`).
unsafe impl<T: Send + Sync, C: RefCounter + Send + Sync> Send for SharedHolder<T, C> {}
unsafe impl<T: Send + Sync, C: RefCounter + Send + Sync> Sync for SharedHolder<T, C> {}

impl<T, C: RefCounter> SharedHolder<T, C> {
    pub fn new(value: T) -> Self {
        Self::from_box(Box::new(value))
    }

    /// Takes ownership of a fresh resource with a new counter set to 1.
    pub fn from_box(resource: Box<T>) -> Self {
        let pair = SharedPair {
            resource: NonNull::from(Box::leak(resource)),
            count: NonNull::from(Box::leak(Box::new(C::with_count(1)))),
        };
        trace!("{} holder acquired {}", C::KIND, std::any::type_name::<T>());
        SharedHolder {
            pair: Some(pair),
            _owns: PhantomData,
        }
    }

    pub fn empty() -> Self {
        SharedHolder {
            pair: None,
            _owns: PhantomData,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pair.is_none()
    }

    pub fn state(&self) -> HolderState {
        HolderState::from_present(self.pair.is_some())
    }

    /// Number of live holders aliasing this resource; 0 when empty.
    pub fn count(&self) -> usize {
        self.pair.as_ref().map_or(0, |pair| pair.counter().current())
    }

    /// True when both holders alias the same pair, or both are empty.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.pair, &other.pair) {
            (Some(a), Some(b)) => a.count == b.count,
            (None, None) => true,
            _ => false,
        }
    }

    pub fn access(&self) -> Result<&T, HolderError> {
        self.pair
            .as_ref()
            .map(|pair| pair.resource())
            .ok_or_else(|| HolderError::null_dereference(C::KIND))
    }

    /// Mutable access, only while this holder is the sole owner.
    pub fn access_mut(&mut self) -> Result<&mut T, HolderError> {
        let pair = self
            .pair
            .as_mut()
            .ok_or_else(|| HolderError::null_dereference(C::KIND))?;
        match pair.counter().current() {
            // SAFETY: a count of 1 means no other alias can observe the resource,
            // and `&mut self` keeps this one from being cloned meanwhile.
            1 => Ok(unsafe { pair.resource.as_mut() }),
            count => Err(HolderError::Aliased { count }),
        }
    }

    /// Drops this holder's share; the last share releases resource and counter.
    pub fn dispose(&mut self) {
        let Some(pair) = self.pair.take() else {
            return;
        };
        match pair.counter().decrement() {
            Ok(0) => {
                // SAFETY: the count hit zero, so no other holder references the pair.
                unsafe {
                    drop(Box::from_raw(pair.resource.as_ptr()));
                    drop(Box::from_raw(pair.count.as_ptr()));
                }
                debug!("{} holder released {}", C::KIND, std::any::type_name::<T>());
            }
            Ok(remaining) => {
                trace!("{} holder detached, {remaining} owners remain", C::KIND);
            }
            Err(err) => {
                error!("{err}; leaving the resource untouched");
            }
        }
    }

    /// Copy assignment: drops the current share and aliases `source`.
    ///
    /// Does nothing when both holders already alias the same pair.
    pub fn assign_from(&mut self, source: &Self) {
        if self.ptr_eq(source) {
            trace!("{} holder assigned from an alias of itself", C::KIND);
            return;
        }
        let incoming = source.clone();
        self.dispose();
        *self = incoming;
    }

    /// Moves the value out if this is the only owner.
    pub fn try_unwrap(mut self) -> Result<T, Self> {
        let Some(pair) = self.pair else {
            return Err(self);
        };
        if !pair.counter().try_claim_unique() {
            return Err(self);
        }
        self.pair = None;
        // SAFETY: the count was claimed 1 -> 0, so this holder owned the pair alone.
        let value = unsafe {
            drop(Box::from_raw(pair.count.as_ptr()));
            *Box::from_raw(pair.resource.as_ptr())
        };
        Ok(value)
    }
}

impl<T, C: RefCounter> Clone for SharedHolder<T, C> {
    fn clone(&self) -> Self {
        if let Some(pair) = &self.pair {
            let count = pair.counter().increment();
            trace!("{} holder aliased, {count} owners", C::KIND);
        }
        SharedHolder {
            pair: self.pair,
            _owns: PhantomData,
        }
    }
}

impl<T, C: RefCounter> Default for SharedHolder<T, C> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T, C: RefCounter> From<Box<T>> for SharedHolder<T, C> {
    fn from(resource: Box<T>) -> Self {
        Self::from_box(resource)
    }
}

/// Panics on an empty holder; use [`SharedHolder::access`] for a checked read.
impl<T, C: RefCounter> Deref for SharedHolder<T, C> {
    type Target = T;

    fn deref(&self) -> &T {
        match self.access() {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }
}

impl<T, C: RefCounter> Drop for SharedHolder<T, C> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<T: fmt::Debug, C: RefCounter> fmt::Debug for SharedHolder<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.access() {
            Ok(value) => f
                .debug_struct("SharedHolder")
                .field("value", value)
                .field("count", &self.count())
                .finish(),
            Err(_) => f.write_str("SharedHolder(<empty>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct DropCounter(Rc<Cell<usize>>);

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    struct SyncDropCounter(Arc<AtomicUsize>);

    impl Drop for SyncDropCounter {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_new_holder_counts_one() {
        let holder: SharedHolder<i32> = SharedHolder::new(5);
        assert_eq!(holder.count(), 1);
        assert_eq!(*holder, 5);
        assert_eq!(holder.state(), HolderState::Owning);
    }

    #[test]
    fn test_empty_holder_counts_zero() {
        let holder: SharedHolder<i32> = SharedHolder::empty();
        assert_eq!(holder.count(), 0);
        assert_eq!(
            holder.access(),
            Err(HolderError::NullDereference { holder: "shared" })
        );
        let copy = holder.clone();
        assert_eq!(copy.count(), 0);
        assert!(copy.is_empty());
    }

    #[test]
    fn test_clone_aliases_and_increments() {
        let a: SharedHolder<String> = SharedHolder::new("hello".to_string());
        let b = a.clone();
        let c = b.clone();
        assert!(a.ptr_eq(&c));
        assert_eq!(a.count(), 3);
        assert_eq!(c.access().map(String::as_str), Ok("hello"));
    }

    #[test]
    fn test_last_dispose_releases() {
        let drops = Rc::new(Cell::new(0));
        let mut a: SharedHolder<_> = SharedHolder::new(DropCounter(drops.clone()));
        let mut b = a.clone();

        a.dispose();
        assert_eq!(drops.get(), 0);
        assert_eq!(b.count(), 1);
        assert_eq!(a.count(), 0);

        b.dispose();
        assert_eq!(drops.get(), 1);
        assert!(b.is_empty());

        b.dispose();
        a.dispose();
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn test_assign_from_alias_is_noop() {
        let mut a: SharedHolder<i32> = SharedHolder::new(1);
        let b = a.clone();
        a.assign_from(&b);
        assert_eq!(a.count(), 2);
        assert!(a.ptr_eq(&b));
    }

    #[test]
    fn test_reassign_self_clone_keeps_count() {
        let mut a: SharedHolder<i32> = SharedHolder::new(1);
        a = a.clone();
        assert_eq!(a.count(), 1);
        assert_eq!(*a, 1);
    }

    #[test]
    fn test_assign_over_sole_owner_releases_target() {
        let drops_a = Rc::new(Cell::new(0));
        let drops_b = Rc::new(Cell::new(0));
        let a: SharedHolder<_> = SharedHolder::new(DropCounter(drops_a.clone()));
        let mut b: SharedHolder<_> = SharedHolder::new(DropCounter(drops_b.clone()));

        let before = a.count();
        b.assign_from(&a);

        assert_eq!(drops_b.get(), 1);
        assert_eq!(drops_a.get(), 0);
        assert!(a.ptr_eq(&b));
        assert_eq!(a.count(), before + 1);
    }

    #[test]
    fn test_assign_empty_source_empties_target() {
        let drops = Rc::new(Cell::new(0));
        let mut target: SharedHolder<_> = SharedHolder::new(DropCounter(drops.clone()));
        target.assign_from(&SharedHolder::empty());
        assert_eq!(drops.get(), 1);
        assert_eq!(target.state(), HolderState::Empty);
    }

    #[test]
    fn test_access_mut_requires_sole_owner() {
        let mut a: SharedHolder<Vec<i32>> = SharedHolder::new(vec![1]);
        a.access_mut().unwrap().push(2);

        let b = a.clone();
        assert_eq!(a.access_mut(), Err(HolderError::Aliased { count: 2 }));
        drop(b);
        assert_eq!(a.access_mut().map(|v| v.len()), Ok(2));
    }

    #[test]
    fn test_try_unwrap_sole_owner() {
        let a: SharedHolder<Vec<i32>> = SharedHolder::new(vec![1, 2, 3]);
        assert_eq!(a.try_unwrap().ok(), Some(vec![1, 2, 3]));

        let b: SharedHolder<Vec<i32>> = SharedHolder::new(vec![4]);
        let _other = b.clone();
        let b = b.try_unwrap().unwrap_err();
        assert_eq!(b.count(), 2);

        assert!(SharedHolder::<i32>::empty().try_unwrap().is_err());
    }

    #[test]
    fn test_sync_holder_releases_once_across_threads() {
        let drops = Arc::new(AtomicUsize::new(0));
        let holder: SyncSharedHolder<_> = SharedHolder::new(SyncDropCounter(drops.clone()));

        crossbeam::scope(|scope| {
            for _ in 0..8 {
                let local = holder.clone();
                scope.spawn(move |_| {
                    let copies: Vec<_> = (0..100).map(|_| local.clone()).collect();
                    assert!(local.count() > copies.len());
                });
            }
        })
        .unwrap();

        assert_eq!(holder.count(), 1);
        assert_eq!(drops.load(Ordering::SeqCst), 0);
        drop(holder);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_debug_output() {
        let holder: SharedHolder<i32> = SharedHolder::new(3);
        assert_eq!(
            format!("{:?}", holder),
            "SharedHolder { value: 3, count: 1 }"
        );
        assert_eq!(
            format!("{:?}", SharedHolder::<i32>::empty()),
            "SharedHolder(<empty>)"
        );
    }
}
