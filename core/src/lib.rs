//! # mpvjs core
//!
//! The value model shared by the mpvjs bridge and the libmpv node format it is
//! marshalled into.
//!
//! - [`HostValue`] is the JSON-like value the embedding host sends and receives.
//! - [`sys`] mirrors the `#[repr(C)]` structures of the libmpv client API.
//! - [`OwnedNode`] builds an `mpv_node` tree that owns every byte it points to,
//!   and [`node_to_host`] reads engine trees back.
//!
//! Nothing in this crate talks to libmpv or to a host; it only converts.

extern crate alloc;

pub mod node;
pub mod sys;
pub mod value;

pub use node::{OwnedNode, node_to_host, read_c_str};
pub use value::{HostValue, Map, ValueKind};
