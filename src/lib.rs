//! Decoders for the in-memory layouts of EASTL-style containers, suitable for
//! building data visualizers in a debugger front-end.
//!
//! `layout_decoder` turns a `(type name, address)` pair from a debugged
//! process into a [`DecodedNode`]: a labeled summary value, an item count, and
//! (when the host asks for it) one child node per logical element. All memory
//! access goes through the host-provided [`Inspector`] trait, so the crate
//! itself never touches the target process directly.
//!
//! ## Getting Started
//!
//! 1. Implement [`Inspector`] for whatever the host uses to read target memory
//!    (a ptrace handle, a core dump, a remote stub...). Only four methods are
//!    required: [`platform`](Inspector::platform),
//!    [`read_bytes`](Inspector::read_bytes),
//!    [`resolve_type`](Inspector::resolve_type) and
//!    [`is_expanded`](Inspector::is_expanded).
//! 2. Build a [`LayoutDecoder`] (via [`LayoutDecoder::new`] or
//!    [`LayoutDecoder::builder`] to tweak limits).
//! 3. Call [`LayoutDecoder::decode`] with a [`ValueRef`]. Types without a
//!    decoder return [`DecodeError::UnrecognizedLayout`], which the host
//!    should treat as "use the generic struct display".
//!
//! An in-memory [`Snapshot`](snapshot::Snapshot) inspector is included for
//! decoding captured memory offline.
//!
//! ## Features
//!
//! - `std`: implements `std::error::Error` on the crate's error types.
//! - `trace-nodes`: logs every emitted node via `trace!`.
//! - `core_error`: implements `core::error::Error` when `std` is disabled.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

#[macro_use]
extern crate log;

pub mod abi;
pub mod catalogue;
pub mod inspector;
pub mod node;
pub mod snapshot;
pub mod typename;

mod decoder;
mod error;
mod format;
mod scalar;

pub use decoder::{Limits, LayoutDecoder, LayoutDecoderBuilder, LayoutDecoderBuilderError, ValueRef};
pub use error::{DecodeError, SanityViolation};
pub use format::DisplayFormat;
pub use inspector::Inspector;
pub use node::{Children, DecodedNode, ItemCount, Special, Value};
