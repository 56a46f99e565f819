use std::alloc::{self, Layout};
use std::ptr::{self, NonNull};

/// One link of the queue's chain.
///
/// Every node from the head up to (but excluding) the tail carries a value;
/// the tail node is always empty until the next push fills it. Nodes are
/// leaked into raw pointers on allocation and only turned back into a `Box`
/// by the thread that unlinks them, so the head and tail pointers never
/// alias a live `Box`.
pub(crate) struct Node<T> {
    pub(crate) value: Option<T>,
    /// Owning link to the successor; null on the tail node.
    pub(crate) next: *mut Node<T>,
}

impl<T> Node<T> {
    fn vacant() -> Self {
        Self {
            value: None,
            next: ptr::null_mut(),
        }
    }

    pub(crate) fn alloc() -> NonNull<Self> {
        NonNull::from(Box::leak(Box::new(Self::vacant())))
    }

    /// Like [`Node::alloc`], but returns `None` when the allocator is out of
    /// memory instead of aborting the process.
    pub(crate) fn try_alloc() -> Option<NonNull<Self>> {
        let layout = Layout::new::<Self>();
        // SAFETY: `Node<T>` always holds a pointer-sized link, so the layout
        // is never zero-sized.
        let ptr = NonNull::new(unsafe { alloc::alloc(layout) }.cast::<Self>())?;
        // SAFETY: `ptr` is a fresh allocation with the layout of `Self`; the
        // queue later frees it with `Box::from_raw`, which matches the global
        // allocator and layout used here.
        unsafe { ptr.as_ptr().write(Self::vacant()) };
        Some(ptr)
    }

    /// Reclaim a node produced by [`Node::alloc`] or [`Node::try_alloc`].
    ///
    /// # Safety
    ///
    /// `ptr` must be unlinked from every other pointer that could still be
    /// used to reach it, and must not be freed twice.
    pub(crate) unsafe fn into_box(ptr: NonNull<Self>) -> Box<Self> {
        Box::from_raw(ptr.as_ptr())
    }
}
