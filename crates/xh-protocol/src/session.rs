//! Protocol session: frame-ID allocation, the shared send path, and
//! inbound delivery with request/response correlation.
//!
//! The session owns the two pieces of shared mutable state the protocol
//! needs, each behind its own lock: the 1-byte frame-ID counter and the
//! registered transport handle. Everything else it touches (the dispatch
//! registries) is immutable after construction, so delivery and sending
//! may run concurrently from any number of threads.

use std::collections::HashMap;
use std::sync::{mpsc, Mutex};
use std::time::Duration;

use crate::command::Command;
use crate::constants::{MAX_FRAME_ID, MIN_FRAME_ID};
use crate::dispatch::{parse_frame, Registries};
use crate::error::ProtocolError;
use crate::fields::FrameDict;
use crate::frame::Frame;
use crate::transport::{EncodedCommand, Transport};

/// One protocol session over one radio module.
pub struct Session {
    registries: Registries,
    /// Next unclaimed frame ID for an outbound command.
    next_frame_id: Mutex<u8>,
    /// Registered transport; the lock doubles as the send lock.
    transport: Mutex<Option<Box<dyn Transport>>>,
    /// Outstanding response waiters, keyed by frame ID.
    pending: Mutex<HashMap<u8, mpsc::Sender<Command>>>,
    /// Where uncorrelated frames go.
    subscriber: Mutex<Option<mpsc::Sender<Frame>>>,
}

impl Session {
    /// Create a session over the given registries.
    pub fn new(registries: Registries) -> Self {
        Session {
            registries,
            next_frame_id: Mutex::new(MIN_FRAME_ID),
            transport: Mutex::new(None),
            pending: Mutex::new(HashMap::new()),
            subscriber: Mutex::new(None),
        }
    }

    /// The session's dispatch registries.
    pub fn registries(&self) -> &Registries {
        &self.registries
    }

    /// Register the transport used by [`Command::send`]. Replaces any
    /// previously registered handle.
    pub fn set_transport(&self, transport: Box<dyn Transport>) {
        *self.transport.lock().unwrap() = Some(transport);
    }

    /// Allocate the next outbound frame ID, wrapping 255 back to 1.
    ///
    /// The wire field is one byte, so after 255 requests are outstanding
    /// simultaneously a new request reuses a live ID and responses can
    /// correlate to the wrong waiter. That window is a protocol
    /// limitation; widening the ID space would break wire compatibility.
    pub(crate) fn allocate_frame_id(&self) -> u8 {
        let mut next = self.next_frame_id.lock().unwrap();
        let id = *next;
        *next = if id == MAX_FRAME_ID {
            MIN_FRAME_ID
        } else {
            id + 1
        };
        id
    }

    /// Send an encoded command through the registered transport, under
    /// the send lock.
    pub(crate) fn send_encoded(
        &self,
        frame: &EncodedCommand,
        dest_serial: Option<u64>,
    ) -> Result<(), ProtocolError> {
        let mut guard = self.transport.lock().unwrap();
        let transport = guard.as_deref_mut().ok_or(ProtocolError::NoTransport)?;
        match dest_serial {
            Some(serial) => {
                transport.send_remote_at(frame, xh_encoding::number_to_serial_bytes(serial))
            }
            None => transport.send_at(frame),
        }
    }

    /// Subscribe to frames that no response waiter claims: unsolicited
    /// data frames, generic frames, and responses nobody is waiting for.
    /// Replaces any previous subscriber.
    pub fn subscribe(&self) -> mpsc::Receiver<Frame> {
        let (sender, receiver) = mpsc::channel();
        *self.subscriber.lock().unwrap() = Some(sender);
        receiver
    }

    /// Register interest in the response to an already-allocated frame
    /// ID, before sending the request so the response cannot race the
    /// registration.
    pub fn expect_response(&self, frame_id: u8) -> ResponseWaiter {
        let (sender, receiver) = mpsc::channel();
        self.pending.lock().unwrap().insert(frame_id, sender);
        ResponseWaiter { frame_id, receiver }
    }

    /// Deliver one raw frame dictionary from the transport.
    ///
    /// Safe to call concurrently with sends and with other deliveries. A
    /// frame that fails to parse is logged and dropped; it never
    /// propagates into the transport's delivery loop, so one malformed
    /// frame cannot take down the receive path.
    pub fn deliver(&self, dict: FrameDict) {
        let frame = match parse_frame(&self.registries, dict) {
            Ok(frame) => frame,
            Err(err) => {
                log::warn!("dropping undecodable frame: {err}");
                return;
            }
        };

        let frame = match self.route_response(frame) {
            Some(frame) => frame,
            None => return,
        };

        let mut subscriber = self.subscriber.lock().unwrap();
        match subscriber.as_ref() {
            Some(sender) => {
                if let Err(mpsc::SendError(frame)) = sender.send(frame) {
                    log::debug!("subscriber gone, dropping {frame}");
                    *subscriber = None;
                }
            }
            None => log::debug!("no subscriber, dropping {frame}"),
        }
    }

    /// Hand a response to its waiter, if one is outstanding. Returns the
    /// frame back if nobody claims it.
    fn route_response(&self, frame: Frame) -> Option<Frame> {
        let command = match frame {
            Frame::Command(command) if command.is_response() => command,
            other => return Some(other),
        };

        let waiter = self.pending.lock().unwrap().remove(&command.frame_id());
        match waiter {
            Some(sender) => match sender.send(command) {
                Ok(()) => None,
                // The waiter timed out and dropped its receiver.
                Err(mpsc::SendError(command)) => Some(Frame::Command(command)),
            },
            None => Some(Frame::Command(command)),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Session::new(Registries::standard())
    }
}

/// A claim on the response to one outstanding request.
#[derive(Debug)]
pub struct ResponseWaiter {
    frame_id: u8,
    receiver: mpsc::Receiver<Command>,
}

impl ResponseWaiter {
    /// The frame ID this waiter is correlated on.
    pub fn frame_id(&self) -> u8 {
        self.frame_id
    }

    /// Block until the response arrives, up to the given deadline.
    pub fn wait(self, timeout: Duration) -> Result<Command, ProtocolError> {
        self.receiver
            .recv_timeout(timeout)
            .map_err(|_| ProtocolError::ResponseTimeout {
                frame_id: self.frame_id,
            })
    }
}
