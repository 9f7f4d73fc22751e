//! Integration test for the loopback transport.
//!
//! Verifies that a client and a scripted server exchange protocol frames in
//! the same process, in order, with zero network I/O.

use std::sync::Arc;

use sync_shared::protocol::HEADER_LEN;
use sync_shared::transport::{ClientTransport, LoopbackPair};
use sync_shared::{Message, MessageBody, NULL_IDENTITY, Pose2, new_identity};

#[test]
fn test_loopback_client_server_same_process() -> anyhow::Result<()> {
    let pair = LoopbackPair::new();
    pair.client.connect()?;

    let remote = new_identity();
    pair.server.send_message(&Message::connect(remote))?;
    pair.server.send_message(&Message::update(
        remote,
        remote,
        Pose2::new(10.0, 20.0, 90.0),
    ))?;

    let first = pair.client.receive_next()?.expect("connect frame");
    assert_eq!(first.len(), HEADER_LEN);
    assert_eq!(Message::decode(&first)?, Message::connect(remote));

    let second = Message::decode(&pair.client.receive_next()?.expect("update frame"))?;
    assert!(matches!(
        second.body,
        MessageBody::Update { target, pose } if target == remote && pose == Pose2::new(10.0, 20.0, 90.0)
    ));

    assert!(pair.client.receive_next()?.is_none());
    Ok(())
}

#[test]
fn test_loopback_multiple_messages_keep_order() -> anyhow::Result<()> {
    let pair = LoopbackPair::new();
    pair.client.connect()?;
    let me = pair.client.local_identity();

    let count = 100;
    for i in 0..count {
        let pose = Pose2::new(i as f32, 0.0, 0.0);
        pair.client
            .send(Message::update_local_player(me, pose).encode())?;
    }

    let received = pair.server.drain_messages();
    assert_eq!(received.len(), count);
    for (i, message) in received.iter().enumerate() {
        assert_eq!(message.sender, me);
        assert_eq!(
            message.body,
            MessageBody::UpdateLocalPlayer {
                pose: Pose2::new(i as f32, 0.0, 0.0)
            }
        );
    }
    Ok(())
}

#[test]
fn test_loopback_shared_between_threads() -> anyhow::Result<()> {
    let pair = LoopbackPair::new();
    pair.client.connect()?;
    let client: Arc<dyn ClientTransport> = Arc::new(pair.client.clone());

    let bolt = new_identity();
    let server = pair.server.clone();
    let producer = std::thread::spawn(move || {
        for _ in 0..50 {
            server
                .send_message(&Message::remove_projectile(bolt, bolt, None))
                .unwrap();
        }
    });
    producer.join().unwrap();

    let mut seen = 0;
    while let Some(frame) = client.receive_next()? {
        let message = Message::decode(&frame)?;
        assert_eq!(
            message.body,
            MessageBody::RemoveProjectile {
                projectile: bolt,
                hit_target: NULL_IDENTITY
            }
        );
        seen += 1;
    }
    assert_eq!(seen, 50);
    Ok(())
}

#[test]
fn test_loopback_disconnect_stops_delivery() -> anyhow::Result<()> {
    let pair = LoopbackPair::new();
    pair.client.connect()?;
    pair.server
        .send_message(&Message::connect(new_identity()))?;

    pair.server.force_disconnect()?;
    assert!(!pair.client.is_connected());
    assert!(pair.client.receive_next().is_err());
    assert_eq!(pair.server.pending_for_client(), 1);
    Ok(())
}
