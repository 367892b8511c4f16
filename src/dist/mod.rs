//! Distribution: the transport boundary and the reference transports.
//!
//! A [`Transport`] binds [`Endpoint`]s and opens [`Connection`]s. Each
//! connection is an ordered, unreliable pair of frame halves; the runtime
//! observes connection loss as the end of the [`FrameStream`].
//!
//! Two transports ship with the crate:
//!
//! - [`MemoryTransport`]: An in-process hub, for tests and simulations
//! - [`TcpTransport`]: Tokio TCP with length-delimited frames

mod error;
mod memory;
mod tcp;
mod transport;

pub(crate) mod protocol;

pub(crate) use self::protocol::DistMessage;

pub use self::error::TransportError;
pub use self::memory::MemoryTransport;
pub use self::tcp::TcpTransport;
pub use self::transport::Connection;
pub use self::transport::Endpoint;
pub use self::transport::FrameSink;
pub use self::transport::FrameStream;
pub use self::transport::Transport;
