// Copyright 2026 the Triptych Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Images shared between two graphics APIs.
//!
//! A [`SharedResourceHandle`] is one display image registered under a second
//! API. It is reference counted: the zero-copy bridge keeps one reference per
//! registered image, and every outstanding [`SharedWriteLock`] keeps another.
//! The registration is released when the last reference drops.
//!
//! Write access is exclusive. [`SharedResourceHandle::acquire`] hands out at
//! most one [`SharedWriteLock`] at a time; a second attempt fails with
//! [`FrameError::LockContended`] instead of blocking.

use alloc::rc::Rc;
use core::cell::Cell;
use core::fmt;

use crate::device::InteropDevice;
use crate::error::{FrameError, Result};
use crate::panel::Extent;

/// One display image registered with an [`InteropDevice`].
pub struct SharedResourceHandle<I: InteropDevice> {
    interop: Rc<I>,
    object: I::Object,
    extent: Extent,
    locked: Cell<bool>,
}

impl<I: InteropDevice> fmt::Debug for SharedResourceHandle<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedResourceHandle")
            .field("extent", &self.extent)
            .field("locked", &self.locked.get())
            .finish_non_exhaustive()
    }
}

impl<I: InteropDevice> SharedResourceHandle<I> {
    /// Registers `image` with `interop`.
    ///
    /// # Errors
    ///
    /// Returns whatever the interop device's registration returns.
    pub fn register(interop: &Rc<I>, image: &I::Image, extent: Extent) -> Result<Rc<Self>> {
        let object = interop.register(image, extent)?;
        Ok(Rc::new(Self {
            interop: Rc::clone(interop),
            object,
            extent,
            locked: Cell::new(false),
        }))
    }

    /// Takes the write lock.
    ///
    /// # Errors
    ///
    /// [`FrameError::LockContended`] if a lock is already outstanding, or the
    /// interop device's lock error.
    pub fn acquire(self: &Rc<Self>) -> Result<SharedWriteLock<I>> {
        if self.locked.replace(true) {
            return Err(FrameError::LockContended);
        }
        if let Err(e) = self.interop.lock(&self.object) {
            self.locked.set(false);
            return Err(e);
        }
        Ok(SharedWriteLock {
            handle: Rc::clone(self),
            released: false,
        })
    }

    /// Size of the shared image.
    #[must_use]
    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// The rendering API's object for the image.
    #[must_use]
    pub fn object(&self) -> &I::Object {
        &self.object
    }

    /// Whether a write lock is outstanding.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked.get()
    }
}

impl<I: InteropDevice> Drop for SharedResourceHandle<I> {
    fn drop(&mut self) {
        self.interop.unregister(&self.object);
    }
}

/// Proof of exclusive write access to a [`SharedResourceHandle`].
///
/// Released explicitly with [`release`](Self::release), which reports unlock
/// failures, or implicitly on drop, which ignores them.
#[must_use = "dropping the lock releases it immediately"]
pub struct SharedWriteLock<I: InteropDevice> {
    handle: Rc<SharedResourceHandle<I>>,
    released: bool,
}

impl<I: InteropDevice> fmt::Debug for SharedWriteLock<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedWriteLock")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

impl<I: InteropDevice> SharedWriteLock<I> {
    /// The locked handle.
    #[must_use]
    pub fn handle(&self) -> &SharedResourceHandle<I> {
        &self.handle
    }

    /// The rendering API's object for the locked image.
    #[must_use]
    pub fn object(&self) -> &I::Object {
        &self.handle.object
    }

    /// Size of the locked image.
    #[must_use]
    pub fn extent(&self) -> Extent {
        self.handle.extent
    }

    /// Unlocks the image, flushing the rendering API's writes.
    ///
    /// # Errors
    ///
    /// Returns the interop device's unlock error. The lock is released
    /// either way.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.handle.locked.set(false);
        self.handle.interop.unlock(&self.handle.object)
    }
}

impl<I: InteropDevice> Drop for SharedWriteLock<I> {
    fn drop(&mut self) {
        if !self.released {
            self.handle.locked.set(false);
            _ = self.handle.interop.unlock(&self.handle.object);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeInterop, Op};

    fn handle(interop: &Rc<FakeInterop>, image: u32) -> Rc<SharedResourceHandle<FakeInterop>> {
        SharedResourceHandle::register(interop, &image, Extent::new(4, 4)).unwrap()
    }

    #[test]
    fn second_acquire_is_contended() {
        let interop = Rc::new(FakeInterop::default());
        let h = handle(&interop, 0);
        let lock = h.acquire().unwrap();
        assert!(h.is_locked());
        assert_eq!(h.acquire().unwrap_err(), FrameError::LockContended);
        lock.release().unwrap();
        assert!(!h.is_locked());
        let again = h.acquire().unwrap();
        drop(again);
        assert!(!h.is_locked(), "dropping a lock must release it");
    }

    #[test]
    fn failed_lock_leaves_handle_unlocked() {
        let interop = Rc::new(FakeInterop::default());
        let h = handle(&interop, 0);
        interop.fail_next_lock.set(true);
        assert!(matches!(
            h.acquire(),
            Err(FrameError::InteropFailed { .. })
        ));
        assert!(!h.is_locked());
        assert!(h.acquire().is_ok());
    }

    #[test]
    fn registration_outlives_every_reference() {
        let interop = Rc::new(FakeInterop::default());
        let h = handle(&interop, 7);
        let lock = h.acquire().unwrap();
        drop(h);
        assert!(
            !interop.ops().contains(&Op::Unregister(7)),
            "an outstanding lock keeps the registration alive"
        );
        lock.release().unwrap();
        assert_eq!(
            interop.ops(),
            [Op::Register(7), Op::Lock(7), Op::Unlock(7), Op::Unregister(7)]
        );
    }
}
