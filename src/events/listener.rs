//! Listener handles and the bindings stored in a registry

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use super::Event;

/// Result returned by listener code. An `Err` aborts the current dispatch.
pub type ListenerResult = anyhow::Result<()>;

/// Value passed to a listener as its explicit receiver
pub type Receiver = Rc<dyn Any>;

type ListenerFn = dyn Fn(Option<&dyn Any>, &mut Event) -> ListenerResult;

/// A shared handle to listener code
///
/// Identity is the shared callable: clones compare equal, while two listeners
/// built separately never do, even from identical closures.
#[derive(Clone)]
pub struct Listener {
    func: Rc<ListenerFn>,
}

impl Listener {
    /// Wrap a listener that receives its bound receiver and the event
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(Option<&dyn Any>, &mut Event) -> ListenerResult + 'static,
    {
        Self {
            func: Rc::new(func),
        }
    }

    /// Wrap a listener that ignores its receiver and cannot fail
    pub fn infallible<F>(func: F) -> Self
    where
        F: Fn(&mut Event) + 'static,
    {
        Self::new(move |_, event| {
            func(event);
            Ok(())
        })
    }

    /// Invoke the listener
    pub fn call(&self, receiver: Option<&dyn Any>, event: &mut Event) -> ListenerResult {
        (self.func)(receiver, event)
    }

    /// Whether both handles point at the same listener
    pub fn same_as(&self, other: &Listener) -> bool {
        // Compare data addresses only; vtable pointers may differ across codegen units.
        std::ptr::eq(
            Rc::as_ptr(&self.func) as *const (),
            Rc::as_ptr(&other.func) as *const (),
        )
    }
}

impl PartialEq for Listener {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl Eq for Listener {}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Listener")
            .field(&(Rc::as_ptr(&self.func) as *const ()))
            .finish()
    }
}

/// Stored association of a listener, its receiver and its priority
#[derive(Clone)]
pub struct ListenerBinding {
    pub(crate) listener: Listener,
    pub(crate) receiver: Option<Receiver>,
    pub(crate) priority: i32,
}

impl ListenerBinding {
    pub fn new(listener: Listener, receiver: Option<Receiver>, priority: i32) -> Self {
        Self {
            listener,
            receiver,
            priority,
        }
    }

    pub fn listener(&self) -> &Listener {
        &self.listener
    }

    pub fn receiver(&self) -> Option<&Receiver> {
        self.receiver.as_ref()
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Invoke the bound listener with the bound receiver
    pub fn invoke(&self, event: &mut Event) -> ListenerResult {
        self.listener.call(self.receiver.as_deref(), event)
    }
}

impl fmt::Debug for ListenerBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerBinding")
            .field("listener", &self.listener)
            .field("receiver", &self.receiver.as_ref().map(|_| "[Receiver]"))
            .field("priority", &self.priority)
            .finish()
    }
}
