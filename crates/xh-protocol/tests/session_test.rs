//! End-to-end tests for the session: concurrent frame-ID allocation, the
//! send path through a transport, and inbound delivery with
//! request/response correlation.

use std::collections::HashSet;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use xh_protocol::{
    Command, CommandName, CommandStatus, EncodedCommand, FieldValue, Frame, FrameDict, Parameter,
    ProtocolError, SampleValue, Session, Transport, FIELD_COMMAND, FIELD_FRAME_ID, FIELD_ID,
    FIELD_PARAMETER, FIELD_SAMPLES, FIELD_SOURCE_ADDR, FIELD_SOURCE_ADDR_LONG, FIELD_STATUS,
};

/// One frame captured by the recording transport.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SentFrame {
    command: &'static str,
    frame_id: Vec<u8>,
    parameter: Option<Vec<u8>>,
    dest_addr_long: Option<[u8; 8]>,
}

/// A transport that records what it is asked to send.
#[derive(Clone, Default)]
struct RecordingTransport {
    sent: Arc<Mutex<Vec<SentFrame>>>,
}

impl Transport for RecordingTransport {
    fn send_at(&mut self, frame: &EncodedCommand) -> Result<(), ProtocolError> {
        self.sent.lock().unwrap().push(SentFrame {
            command: frame.command,
            frame_id: frame.frame_id.clone(),
            parameter: frame.parameter.clone(),
            dest_addr_long: None,
        });
        Ok(())
    }

    fn send_remote_at(
        &mut self,
        frame: &EncodedCommand,
        dest_addr_long: [u8; 8],
    ) -> Result<(), ProtocolError> {
        self.sent.lock().unwrap().push(SentFrame {
            command: frame.command,
            frame_id: frame.frame_id.clone(),
            parameter: frame.parameter.clone(),
            dest_addr_long: Some(dest_addr_long),
        });
        Ok(())
    }
}

fn at_response_dict(name: &str, frame_id: u8) -> FrameDict {
    FrameDict::new()
        .with(FIELD_ID, FieldValue::Text("at_response".into()))
        .with(FIELD_FRAME_ID, FieldValue::Bytes(vec![frame_id]))
        .with(FIELD_COMMAND, FieldValue::Text(name.into()))
        .with(FIELD_STATUS, FieldValue::Bytes(vec![0x00]))
}

#[test]
fn concurrent_allocation_yields_unique_ids() {
    // 5 threads x 51 allocations covers exactly one wrap cycle; within a
    // cycle no two allocations may share an ID.
    let session = Arc::new(Session::default());
    let mut handles = Vec::new();
    for _ in 0..5 {
        let session = Arc::clone(&session);
        handles.push(thread::spawn(move || {
            (0..51)
                .map(|_| Command::request(&session, CommandName::ID).frame_id())
                .collect::<Vec<u8>>()
        }));
    }

    let mut seen = HashSet::new();
    for handle in handles {
        for id in handle.join().unwrap() {
            assert_ne!(id, 0, "frame ID 0 is reserved");
            assert!(seen.insert(id), "frame ID {id} allocated twice in one cycle");
        }
    }
    assert_eq!(seen.len(), 255);
}

#[test]
fn send_local_and_remote_commands() {
    let session = Session::default();
    let transport = RecordingTransport::default();
    let sent = Arc::clone(&transport.sent);
    session.set_transport(Box::new(transport));

    Command::request(&session, CommandName::ID)
        .with_parameter(0x3ef7)
        .send(&session)
        .unwrap();
    Command::remote_request(&session, CommandName::NI, 0x0013_a200_1234_5678)
        .send(&session)
        .unwrap();

    let sent = sent.lock().unwrap();
    assert_eq!(
        sent[0],
        SentFrame {
            command: "ID",
            frame_id: vec![1],
            parameter: Some(vec![0x3e, 0xf7]),
            dest_addr_long: None,
        }
    );
    assert_eq!(
        sent[1],
        SentFrame {
            command: "NI",
            frame_id: vec![2],
            parameter: None,
            dest_addr_long: Some([0x00, 0x13, 0xa2, 0x00, 0x12, 0x34, 0x56, 0x78]),
        }
    );
}

#[test]
fn send_with_explicit_transport_bypasses_session_handle() {
    let session = Session::default();
    let mut transport = RecordingTransport::default();

    // No transport registered on the session, but an explicit handle works.
    Command::request(&session, CommandName::NT)
        .send_with(&mut transport)
        .unwrap();
    assert_eq!(transport.sent.lock().unwrap().len(), 1);
}

#[test]
fn response_correlates_to_waiter() {
    let session = Arc::new(Session::default());
    let request = Command::request(&session, CommandName::NT);
    let waiter = session.expect_response(request.frame_id());

    let delivering = Arc::clone(&session);
    let frame_id = request.frame_id();
    let deliverer = thread::spawn(move || {
        delivering.deliver(
            at_response_dict("NT", frame_id)
                .with(FIELD_PARAMETER, FieldValue::Bytes(vec![0x3c])),
        );
    });

    let response = waiter.wait(Duration::from_secs(1)).unwrap();
    deliverer.join().unwrap();

    assert_eq!(response.frame_id(), frame_id);
    assert_eq!(response.name(), CommandName::NT);
    assert_eq!(response.status(), Some(CommandStatus::Ok));
}

#[test]
fn uncorrelated_frames_reach_the_subscriber() {
    let session = Session::default();
    let frames = session.subscribe();

    let mut samples = std::collections::BTreeMap::new();
    samples.insert("dio-1".to_owned(), SampleValue::Bool(true));
    session.deliver(
        FrameDict::new()
            .with(FIELD_ID, FieldValue::Text("rx_io_data_long_addr".into()))
            .with(FIELD_SOURCE_ADDR, FieldValue::Bytes(vec![0x12, 0x34]))
            .with(
                FIELD_SOURCE_ADDR_LONG,
                FieldValue::Bytes(vec![0x00, 0x13, 0xa2, 0x00, 0x12, 0x34, 0x56, 0x78]),
            )
            .with(FIELD_SAMPLES, FieldValue::Samples(vec![samples])),
    );

    // A response nobody is waiting for also falls through.
    session.deliver(at_response_dict("MY", 0x11));

    let data = match frames.recv_timeout(Duration::from_secs(1)).unwrap() {
        Frame::Data(data) => data,
        other => panic!("expected data frame, got {other:?}"),
    };
    assert_eq!(data.source_address(), 0x1234);
    assert_eq!(data.samples().len(), 1);

    let command = match frames.recv_timeout(Duration::from_secs(1)).unwrap() {
        Frame::Command(command) => command,
        other => panic!("expected command frame, got {other:?}"),
    };
    assert_eq!(command.frame_id(), 0x11);
}

#[test]
fn long_node_name_response_reaches_the_subscriber() {
    let session = Session::default();
    let frames = session.subscribe();

    session.deliver(
        at_response_dict("NI", 0x09)
            .with(FIELD_PARAMETER, FieldValue::Bytes(b"LivingRoom".to_vec())),
    );

    let command = match frames.recv_timeout(Duration::from_secs(1)).unwrap() {
        Frame::Command(command) => command,
        other => panic!("expected command frame, got {other:?}"),
    };
    assert_eq!(command.name(), CommandName::NI);
    assert_eq!(
        command.parameter(),
        Some(&Parameter::Text("LivingRoom".to_owned()))
    );
}

#[test]
fn malformed_frame_does_not_break_delivery() {
    let session = Session::default();
    let frames = session.subscribe();

    // Bad status byte: dropped with a warning, not propagated.
    session.deliver(
        at_response_dict("ID", 0x01).with(FIELD_STATUS, FieldValue::Bytes(vec![0x09])),
    );
    // Missing discriminator: same.
    session.deliver(FrameDict::new());

    // The receive path still works afterwards.
    session.deliver(at_response_dict("ID", 0x02));
    let frame = frames.recv_timeout(Duration::from_secs(1)).unwrap();
    assert!(matches!(frame, Frame::Command(_)));
    assert!(matches!(
        frames.try_recv(),
        Err(mpsc::TryRecvError::Empty)
    ));
}

#[test]
fn timed_out_waiter_releases_its_response() {
    let session = Session::default();
    let frames = session.subscribe();

    let waiter = session.expect_response(5);
    assert_eq!(
        waiter.wait(Duration::from_millis(1)).unwrap_err(),
        ProtocolError::ResponseTimeout { frame_id: 5 }
    );

    // The late response goes to the subscriber instead of vanishing.
    session.deliver(at_response_dict("NT", 5));
    let frame = frames.recv_timeout(Duration::from_secs(1)).unwrap();
    assert!(matches!(frame, Frame::Command(_)));
}
