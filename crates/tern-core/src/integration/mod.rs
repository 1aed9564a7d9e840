//! Integration layer: the external collaborators the client talks to.

pub mod session;
pub mod transport;

pub use session::{MemorySessionStore, Session, SessionStore};
pub use transport::{BoxedTransport, DisabledTransport, FnTransport, Transport};
