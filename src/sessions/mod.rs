//! [`Session`](crate::Session) implementations.
//!
//! | Module       | Session                                      |
//! |--------------|----------------------------------------------|
//! | [`loopback`] | [`LoopbackSession`] (in-process, recording)  |
//!
//! Bindings to a real messaging SDK live with the application that embeds
//! the SDK; they only need to implement [`SessionFactory`](crate::SessionFactory)
//! and [`Session`](crate::Session).

pub mod loopback;

pub use loopback::{LoopbackController, LoopbackFactory, LoopbackSession};
