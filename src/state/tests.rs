use super::*;
use crate::config::{OutOfRangePolicy, RoomConfig};
use crate::protocol::{ProtocolError, ServerMessage};
use crate::room::{SessionHandle, SessionId};
use std::sync::Arc;
use std::thread;
use tokio::sync::mpsc::{self, error::TryRecvError};

fn connect(core: &SyncCore) -> (SessionId, mpsc::Receiver<ServerMessage>) {
    connect_with(core, 64)
}

fn connect_with(core: &SyncCore, buffer: usize) -> (SessionId, mpsc::Receiver<ServerMessage>) {
    let (handle, rx) = SessionHandle::new(buffer);
    (core.on_connect(handle), rx)
}

fn move_json(unit_id: u64, x: f64, y: f64, z: f64) -> String {
    format!(
        r#"{{"type":"move_unit","unit_id":{},"x":{},"y":{},"z":{}}}"#,
        unit_id, x, y, z
    )
}

fn move_msg(unit_id: u64, x: f64, y: f64, z: f64) -> ServerMessage {
    ServerMessage::MoveUnit { unit_id, x, y, z }
}

#[test]
fn test_unit_table_dense_growth() {
    let mut table = UnitTable::new();
    assert!(table.is_empty());

    table.set(3, Position::new(4.0, 5.0, 6.0));

    assert_eq!(table.len(), 4);
    for i in 0..3 {
        assert_eq!(table.get(i), Some(Position::default()));
    }
    assert_eq!(table.get(3), Some(Position::new(4.0, 5.0, 6.0)));
    assert_eq!(table.get(4), None);

    // Writing below the end does not shrink or grow
    table.set(1, Position::new(1.0, 1.0, 1.0));
    assert_eq!(table.len(), 4);
}

#[test]
fn test_first_session_gets_empty_init() {
    let core = SyncCore::default();
    let (_, mut rx) = connect(&core);

    assert_eq!(rx.try_recv().unwrap(), ServerMessage::Init { units: vec![] });
    assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
}

#[test]
fn test_example_scenario() {
    let core = SyncCore::default();

    let (a, mut a_rx) = connect(&core);
    assert_eq!(a_rx.try_recv().unwrap(), ServerMessage::Init { units: vec![] });

    let dispatch = core
        .on_message(a, r#"{"type":"move_unit","unit_id":2,"x":1,"y":0,"z":0}"#)
        .unwrap();
    assert_eq!(
        dispatch,
        Dispatch::Broadcast {
            unit_id: 2,
            delivered: 1
        }
    );

    let expected = vec![
        Position::default(),
        Position::default(),
        Position::new(1.0, 0.0, 0.0),
    ];
    assert_eq!(core.snapshot(), expected);
    assert_eq!(a_rx.try_recv().unwrap(), move_msg(2, 1.0, 0.0, 0.0));

    let (_, mut b_rx) = connect(&core);
    assert_eq!(b_rx.try_recv().unwrap(), ServerMessage::Init { units: expected });
}

#[test]
fn test_dense_growth_through_core() {
    let core = SyncCore::default();
    let (a, _rx) = connect(&core);

    core.on_message(a, &move_json(5, 1.5, 2.5, 3.5)).unwrap();

    let units = core.snapshot();
    assert_eq!(units.len(), 6);
    assert!(units[..5].iter().all(|p| *p == Position::default()));
    assert_eq!(units[5], Position::new(1.5, 2.5, 3.5));
}

#[test]
fn test_last_write_wins_and_broadcast_order() {
    let core = SyncCore::default();
    let (a, mut a_rx) = connect(&core);
    let (b, mut b_rx) = connect(&core);
    a_rx.try_recv().unwrap();
    b_rx.try_recv().unwrap();

    core.on_message(a, &move_json(0, 1.0, 1.0, 1.0)).unwrap();
    core.on_message(b, &move_json(0, 9.0, 8.0, 7.0)).unwrap();

    assert_eq!(core.snapshot(), vec![Position::new(9.0, 8.0, 7.0)]);

    for rx in [&mut a_rx, &mut b_rx] {
        assert_eq!(rx.try_recv().unwrap(), move_msg(0, 1.0, 1.0, 1.0));
        assert_eq!(rx.try_recv().unwrap(), move_msg(0, 9.0, 8.0, 7.0));
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
    }
}

#[test]
fn test_broadcast_includes_sender() {
    let core = SyncCore::default();
    let mut sessions: Vec<_> = (0..3).map(|_| connect(&core)).collect();
    for (_, rx) in sessions.iter_mut() {
        rx.try_recv().unwrap();
    }

    let sender = sessions[1].0;
    let dispatch = core.on_message(sender, &move_json(0, 3.0, 2.0, 1.0)).unwrap();
    assert_eq!(
        dispatch,
        Dispatch::Broadcast {
            unit_id: 0,
            delivered: 3
        }
    );

    for (_, rx) in sessions.iter_mut() {
        assert_eq!(rx.try_recv().unwrap(), move_msg(0, 3.0, 2.0, 1.0));
    }
}

#[test]
fn test_disconnect_keeps_table_and_other_sessions() {
    let core = SyncCore::default();
    let (a, mut a_rx) = connect(&core);
    let (b, mut b_rx) = connect(&core);
    a_rx.try_recv().unwrap();
    b_rx.try_recv().unwrap();

    core.on_message(a, &move_json(1, 1.0, 2.0, 3.0)).unwrap();
    core.on_disconnect(a);
    // Idempotent
    core.on_disconnect(a);

    assert_eq!(core.unit_count(), 2);
    assert_eq!(core.registry().len(), 1);

    core.on_message(b, &move_json(0, 4.0, 4.0, 4.0)).unwrap();
    b_rx.try_recv().unwrap();
    assert_eq!(b_rx.try_recv().unwrap(), move_msg(0, 4.0, 4.0, 4.0));

    // The departed session's queue drains its last message then closes
    assert_eq!(a_rx.try_recv().unwrap(), move_msg(1, 1.0, 2.0, 3.0));
    assert_eq!(a_rx.try_recv(), Err(TryRecvError::Disconnected));

    let metrics = core.metrics().get_snapshot();
    assert_eq!(metrics.sessions_joined, 2);
    assert_eq!(metrics.sessions_left, 1);
}

#[test]
fn test_departed_session_cannot_move() {
    let core = SyncCore::default();
    let (a, _a_rx) = connect(&core);
    core.on_disconnect(a);

    let err = core.on_message(a, &move_json(0, 1.0, 1.0, 1.0)).unwrap_err();
    assert_eq!(err, CommandError::NotJoined);
    assert!(core.should_disconnect(&err));
    assert!(core.snapshot().is_empty());
}

#[test]
fn test_malformed_input_tolerated() {
    let core = SyncCore::default();
    let (a, mut a_rx) = connect(&core);
    a_rx.try_recv().unwrap();

    let payloads = [
        "not json",
        "[]",
        r#"{"unit_id":0,"x":1,"y":1,"z":1}"#,
        r#"{"type":"move_unit","unit_id":-3,"x":1,"y":1,"z":1}"#,
        r#"{"type":"move_unit","unit_id":0,"x":"a","y":1,"z":1}"#,
    ];
    for payload in payloads {
        let err = core.on_message(a, payload).unwrap_err();
        assert!(matches!(err, CommandError::Protocol(_)));
        assert!(!core.should_disconnect(&err));
    }

    assert_eq!(a_rx.try_recv(), Err(TryRecvError::Empty));
    assert!(core.registry().contains(&a));
    assert!(core.snapshot().is_empty());
    assert_eq!(core.metrics().get_snapshot().messages_dropped, payloads.len() as u64);
}

#[test]
fn test_missing_tag_reports_protocol_error() {
    let core = SyncCore::default();
    let (a, _rx) = connect(&core);

    assert_eq!(
        core.on_message(a, r#"{"x":1}"#),
        Err(CommandError::Protocol(ProtocolError::MissingType))
    );
}

#[test]
fn test_unknown_tag_ignored() {
    let core = SyncCore::default();
    let (a, mut a_rx) = connect(&core);
    a_rx.try_recv().unwrap();

    let dispatch = core
        .on_message(a, r#"{"type":"hello","msg":"Hello server!"}"#)
        .unwrap();

    assert_eq!(dispatch, Dispatch::Ignored("hello".to_string()));
    assert_eq!(a_rx.try_recv(), Err(TryRecvError::Empty));
}

#[test]
fn test_unit_id_out_of_range_disconnect_policy() {
    let core = SyncCore::new(RoomConfig {
        max_unit_id: 10,
        ..RoomConfig::default()
    });
    let (a, mut a_rx) = connect(&core);
    a_rx.try_recv().unwrap();

    // Boundary is inclusive
    core.on_message(a, &move_json(10, 1.0, 0.0, 0.0)).unwrap();
    a_rx.try_recv().unwrap();

    let err = core.on_message(a, &move_json(11, 1.0, 0.0, 0.0)).unwrap_err();
    assert_eq!(
        err,
        CommandError::UnitIdOutOfRange {
            unit_id: 11,
            max: 10
        }
    );
    assert!(core.should_disconnect(&err));
    assert_eq!(core.unit_count(), 11);
    assert_eq!(a_rx.try_recv(), Err(TryRecvError::Empty));
}

#[test]
fn test_unit_id_out_of_range_drop_policy() {
    let core = SyncCore::new(RoomConfig {
        max_unit_id: 3,
        out_of_range: OutOfRangePolicy::Drop,
        ..RoomConfig::default()
    });
    let (a, _rx) = connect(&core);

    let err = core
        .on_message(a, &move_json(u64::MAX, 0.0, 0.0, 0.0))
        .unwrap_err();
    assert!(matches!(err, CommandError::UnitIdOutOfRange { .. }));
    assert!(!core.should_disconnect(&err));
    assert!(core.snapshot().is_empty());
}

#[test]
fn test_slow_session_evicted_without_blocking_others() {
    let core = SyncCore::default();
    let (slow_handle, mut slow_rx) = SessionHandle::new(1);
    let slow = core.on_connect(slow_handle);
    let (fast, mut fast_rx) = connect(&core);
    fast_rx.try_recv().unwrap();

    // The slow queue already holds its init, so the first update overflows it
    let dispatch = core.on_message(fast, &move_json(0, 1.0, 0.0, 0.0)).unwrap();
    assert_eq!(
        dispatch,
        Dispatch::Broadcast {
            unit_id: 0,
            delivered: 1
        }
    );
    assert!(!core.registry().contains(&slow));
    assert_eq!(core.metrics().get_snapshot().sessions_evicted, 1);

    assert_eq!(fast_rx.try_recv().unwrap(), move_msg(0, 1.0, 0.0, 0.0));
    assert!(matches!(slow_rx.try_recv(), Ok(ServerMessage::Init { .. })));
    assert_eq!(slow_rx.try_recv(), Err(TryRecvError::Disconnected));
}

#[test]
fn test_last_move_timestamp_tracked() {
    let core = SyncCore::default();
    assert!(core.last_move_at().is_none());

    let (a, _rx) = connect(&core);
    core.on_message(a, &move_json(0, 0.0, 0.0, 0.0)).unwrap();
    assert!(core.last_move_at().is_some());
}

#[test]
fn test_concurrent_moves_keep_table_dense() {
    let core = Arc::new(SyncCore::default());
    let mut handles = vec![];

    for i in 0..10u64 {
        let core = Arc::clone(&core);
        handles.push(thread::spawn(move || {
            let (id, _rx) = connect_with(&core, 512);
            for step in 0..20u64 {
                let unit_id = i * 20 + step;
                core.on_message(id, &move_json(unit_id, i as f64, step as f64, 0.0))
                    .unwrap();
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    let units = core.snapshot();
    assert_eq!(units.len(), 200);
    for i in 0..10u64 {
        for step in 0..20u64 {
            let unit = units[(i * 20 + step) as usize];
            assert_eq!(unit, Position::new(i as f64, step as f64, 0.0));
        }
    }
}

#[test]
fn test_snapshot_matches_moves_committed_before_join() {
    let core = Arc::new(SyncCore::default());
    let (writer, _writer_rx) = connect_with(&core, 256);

    let mover = {
        let core = Arc::clone(&core);
        thread::spawn(move || {
            for unit_id in 0..100u64 {
                core.on_message(writer, &move_json(unit_id, unit_id as f64, 1.0, 1.0))
                    .unwrap();
            }
        })
    };

    // Joiners racing the writer must see a prefix of the writer's moves,
    // followed by exactly the moves committed after their join
    let mut joiners = Vec::new();
    for _ in 0..20 {
        joiners.push(connect_with(&core, 256));
    }
    mover.join().unwrap();

    for (_, mut rx) in joiners {
        let mut units = match rx.try_recv().unwrap() {
            ServerMessage::Init { units } => units,
            other => panic!("expected init, got {:?}", other),
        };
        for (i, unit) in units.iter().enumerate() {
            assert_eq!(*unit, Position::new(i as f64, 1.0, 1.0));
        }
        while let Ok(msg) = rx.try_recv() {
            match msg {
                ServerMessage::MoveUnit { unit_id, x, y, z } => {
                    assert_eq!(unit_id as usize, units.len());
                    units.push(Position::new(x, y, z));
                }
                other => panic!("unexpected message {:?}", other),
            }
        }
        assert_eq!(units, core.snapshot());
    }
}

#[test]
fn test_lifted_bound_still_rejects_unaddressable_unit_id() {
    let core = SyncCore::new(RoomConfig {
        max_unit_id: u64::MAX,
        ..RoomConfig::default()
    });
    let (a, mut a_rx) = connect(&core);
    a_rx.try_recv().unwrap();

    let err = core
        .on_message(a, &move_json(u64::MAX, 1.0, 1.0, 1.0))
        .unwrap_err();

    assert_eq!(
        err,
        CommandError::UnitIdOutOfRange {
            unit_id: u64::MAX,
            max: u64::MAX
        }
    );
    assert!(core.snapshot().is_empty());
    assert_eq!(a_rx.try_recv(), Err(TryRecvError::Empty));

    // Session is still usable afterwards
    assert!(core.registry().contains(&a));
    core.on_message(a, &move_json(0, 2.0, 2.0, 2.0)).unwrap();
    assert_eq!(core.snapshot(), vec![Position::new(2.0, 2.0, 2.0)]);
}
