//! XBee Home Automation API protocol
//!
//! This crate models the API protocol spoken with a locally attached or
//! remote XBee radio module: AT command request/response frames correlated
//! by a 1-byte frame ID, and unsolicited data frames carrying digital and
//! analog pin samples.
//!
//! The physical transport is external. It delivers one decoded field
//! dictionary per physical frame (already unframed, unescaped, and
//! checksum-validated) into [`Session::deliver`], and exposes two send
//! primitives through the [`Transport`] trait. Everything in between
//! lives here: frame-type and command dispatch, binary field decoding,
//! frame-ID allocation, and response correlation.
//!
//! # Example
//!
//! ```rust,ignore
//! use xh_protocol::{Command, CommandName, Session};
//!
//! let session = Session::default();
//! session.set_transport(Box::new(serial_transport));
//!
//! // Ask the module for its network ID and wait for the echoed frame ID.
//! let request = Command::request(&session, CommandName::ID);
//! let waiter = session.expect_response(request.frame_id());
//! request.send(&session)?;
//! let response = waiter.wait(std::time::Duration::from_secs(1))?;
//! ```

mod command;
mod constants;
mod data;
mod dispatch;
mod error;
mod fields;
mod frame;
mod input_sample;
mod node_discover;
mod registry;
mod session;
mod transport;

pub use command::*;
pub use constants::*;
pub use data::*;
pub use dispatch::*;
pub use error::*;
pub use fields::*;
pub use frame::*;
pub use input_sample::*;
pub use node_discover::*;
pub use registry::*;
pub use session::*;
pub use transport::*;
