//! Ownership wrappers for native graphics objects.
//!
//! A native name is useless without the call that frees it, so the two are
//! bundled together the moment the name is created. Stage objects stay in an
//! exclusively owned [`GlObject`] and die with the request that made them;
//! linked programs are wrapped in a [`Program`](crate::Program) and shared
//! through `Rc` once they outlive a request.

use std::fmt;
use std::rc::Rc;

use crate::backend::{GraphicsBackend, StageKind};

type Release<H> = Box<dyn FnOnce(H)>;

/// Exclusively owned native handle, released exactly once on drop.
pub struct GlObject<H: Copy> {
    handle: H,
    release: Option<Release<H>>,
}

impl<H: Copy> GlObject<H> {
    /// Takes ownership of a freshly created handle.
    ///
    /// `None` means creation failed; there is nothing to release and no
    /// object is returned.
    pub fn init(handle: Option<H>, release: impl FnOnce(H) + 'static) -> Option<Self> {
        handle.map(|handle| Self {
            handle,
            release: Some(Box::new(release)),
        })
    }

    pub fn get(&self) -> H {
        self.handle
    }
}

impl<H: Copy> Drop for GlObject<H> {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release(self.handle);
        }
    }
}

impl<H: Copy + fmt::Debug> fmt::Debug for GlObject<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("GlObject").field(&self.handle).finish()
    }
}

/// Creates a shader stage object whose release goes back through `backend`.
pub(crate) fn create_shader<B>(backend: &Rc<B>, kind: StageKind) -> Option<GlObject<B::Shader>>
where
    B: GraphicsBackend + 'static,
{
    let owner = Rc::clone(backend);
    GlObject::init(backend.create_shader(kind), move |shader| {
        owner.delete_shader(shader)
    })
}

/// Creates an empty program object whose release goes back through `backend`.
pub(crate) fn create_program<B>(backend: &Rc<B>) -> Option<GlObject<B::Program>>
where
    B: GraphicsBackend + 'static,
{
    let owner = Rc::clone(backend);
    GlObject::init(backend.create_program(), move |program| {
        owner.delete_program(program)
    })
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    #[test]
    fn failed_creation_yields_nothing_and_never_releases() {
        let released = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&released);
        let object = GlObject::<u32>::init(None, move |h| log.borrow_mut().push(h));
        assert!(object.is_none());
        assert!(released.borrow().is_empty());
    }

    #[test]
    fn releases_once_on_drop() {
        let released = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&released);
        let object = GlObject::init(Some(7u32), move |h| log.borrow_mut().push(h)).unwrap();
        assert_eq!(object.get(), 7);
        drop(object);
        assert_eq!(*released.borrow(), vec![7]);
    }
}
