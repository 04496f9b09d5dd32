//! End-to-end channel scenarios over an in-memory transport: typed
//! reads/writes, minimal-frame batching, partial commits, and the
//! shared schema registry.

use dio_protocol::{
    bit_record, IoChannel, MemoryTransport, ProtocolError, Schema, TransportError, WriteBatch,
};

bit_record! {
    /// Operator panel inputs as wired on the demo rig.
    pub struct PanelIn {
        start_button => 0,
        stop_button => 1,
        estop_button => 2,
        reset_button => 3,
        in_position => 4,
        estop_sensor => 5,
        reset_sensor => 6,
    }
}

bit_record! {
    /// Station outputs; address 3 is unused on the rig.
    pub struct StationOut {
        start => 0,
        stop => 1,
        estop => 2,
        motion => 4,
    }
}

fn output_channel() -> IoChannel<StationOut, MemoryTransport> {
    IoChannel::new(MemoryTransport::new(64)).unwrap()
}

#[test]
fn record_write_is_one_range_call() {
    let mut chan = output_channel();
    chan.write_record(&StationOut {
        start: true,
        stop: false,
        estop: false,
        motion: true,
    })
    .unwrap();

    assert_eq!(chan.transport().write_calls(), 1);
    assert!(chan.transport().get(0));
    assert!(!chan.transport().get(1));
    // The unmapped gap at address 3 is written as false.
    assert!(!chan.transport().get(3));
    assert!(chan.transport().get(4));
}

#[test]
fn typed_read_reflects_bank_state() {
    let mut transport = MemoryTransport::new(64);
    transport.set(0, true);
    transport.set(2, true);
    transport.set(4, true);
    transport.set(6, true);

    let mut chan: IoChannel<PanelIn, _> = IoChannel::new(transport).unwrap();
    let panel = chan.read_record().unwrap();
    assert!(panel.start_button);
    assert!(!panel.stop_button);
    assert!(panel.estop_button);
    assert!(panel.in_position);
    assert!(panel.reset_sensor);
    // One range read covered the whole span.
    assert_eq!(chan.transport().read_calls(), 1);
}

#[test]
fn batch_touches_each_cluster_once() {
    let mut chan = output_channel();
    let frames = chan
        .batch()
        .set_field("start", true)
        .unwrap()
        .set_field("stop", true)
        .unwrap()
        .set_field("motion", true)
        .unwrap()
        .commit()
        .unwrap();

    // {0,1} and {4}: two transport calls for three field writes.
    assert_eq!(frames, 2);
    assert_eq!(chan.transport().write_calls(), 2);
}

#[test]
fn batch_by_address_with_last_write_wins() {
    let mut chan = output_channel();
    let batch = chan
        .batch()
        .set(10, true)
        .set(11, true)
        .set(12, true)
        .set(11, false);
    assert_eq!(batch.pending_len(), 3);

    let frames = batch.frames();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].start_address, 10);
    assert_eq!(frames[0].data, vec![true, false, true]);

    batch.commit().unwrap();
    assert!(!chan.transport().get(11));
}

#[test]
fn partial_commit_reports_progress() {
    let mut chan = output_channel();
    chan.transport_mut().fail_on(20);

    let err = chan
        .batch()
        .set(0, true)
        .set(1, true)
        .set(20, true)
        .set(30, true)
        .commit()
        .unwrap_err();

    assert_eq!(err.frames_applied, 1);
    assert_eq!(err.failed_start, 20);
    assert!(matches!(err.source, TransportError::Device { .. }));

    // Frames before the failure landed, later ones were aborted.
    assert!(chan.transport().get(0));
    assert!(chan.transport().get(1));
    assert!(!chan.transport().get(20));
    assert!(!chan.transport().get(30));
}

#[test]
fn standalone_batch_targets_any_transport() {
    let mut transport = MemoryTransport::new(64);
    let mut batch = WriteBatch::<StationOut>::new().unwrap();
    batch.set_field("estop", true).unwrap();
    batch.set(8, true);

    assert_eq!(batch.commit_to(&mut transport).unwrap(), 2);
    assert!(transport.get(2));
    assert!(transport.get(8));
    assert!(batch.is_empty());
}

#[test]
fn schema_registry_is_shared_across_consumers() {
    let a = Schema::<PanelIn>::get().unwrap();
    let chan = output_channel();
    let b = Schema::<StationOut>::get().unwrap();
    assert!(std::ptr::eq(chan.schema(), b));
    assert_eq!(a.map().span_size(), 7);
    assert_eq!(b.map().span_size(), 5);

    // Registry is thread-shareable: compile from several threads at once.
    let handles: Vec<_> = (0..4)
        .map(|_| std::thread::spawn(|| Schema::<PanelIn>::get().unwrap().map().span_size()))
        .collect();
    for h in handles {
        assert_eq!(h.join().unwrap(), 7);
    }
}

#[test]
fn unknown_field_is_caller_error() {
    let mut chan = output_channel();
    let err = chan.write_field("spindle_on", true).unwrap_err();
    assert_eq!(err.to_string(), "field 'spindle_on' carries no address tag");
    assert!(matches!(err, ProtocolError::UnknownField(_)));
}

#[test]
fn field_and_record_views_stay_consistent() {
    let mut chan = output_channel();
    chan.write_field("motion", true).unwrap();
    chan.write_field("start", true).unwrap();

    let rec = chan.read_record().unwrap();
    assert!(rec.motion);
    assert!(rec.start);
    assert!(!rec.stop);

    // Encoding the record back writes the same bank image.
    chan.write_record(&rec).unwrap();
    let raw = chan.read_raw().unwrap();
    assert_eq!(raw, vec![true, false, false, false, true]);
}
