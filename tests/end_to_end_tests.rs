//! Sender-to-receiver loopback over the binary codec.
//!
//! Every segment crosses the "wire" as encoded bytes, so these tests
//! exercise the codec, the sender, the receiver, and the reassembler as one
//! pipeline.

use bytes::Bytes;
use wirestream::{
    ByteStream, Reassembler, ReceiverMessage, SenderMessage, SenderState, TcpReceiver, TcpSender,
    Wrap32, MAX_PAYLOAD_SIZE,
};

const RTO: u64 = 1000;

fn endpoints(tx_capacity: u64, rx_capacity: u64) -> (TcpSender, TcpReceiver) {
    let tx = TcpSender::new(ByteStream::new(tx_capacity), Wrap32::new(12345), RTO);
    let rx = TcpReceiver::new(Reassembler::new(ByteStream::new(rx_capacity)));
    (tx, rx)
}

/// Push the sender, carry every segment across the wire, and ack back.
fn exchange(tx: &mut TcpSender, rx: &mut TcpReceiver) {
    let mut wire = Vec::new();
    tx.push(|msg| wire.push(msg.encode()));
    for bytes in wire {
        rx.receive(SenderMessage::decode(&bytes).expect("wire segment decodes"));
    }
    let reply = ReceiverMessage::decode(&rx.send().encode()).expect("wire ack decodes");
    tx.receive(&reply);
}

#[test]
fn lossless_transfer_small() {
    let (mut tx, mut rx) = endpoints(64, 64);

    tx.writer().push(Bytes::from_static(b"hello world"));
    tx.writer().close();

    // SYN probe, then data once the real window arrives.
    while tx.state() != SenderState::FinAcked {
        exchange(&mut tx, &mut rx);
    }

    assert!(rx.output().is_closed());
    assert_eq!(rx.reader().read(64), Bytes::from_static(b"hello world"));
    assert!(rx.output().is_finished());
    assert_eq!(tx.sequence_numbers_in_flight(), 0);
}

#[test]
fn lossless_transfer_spans_segments() {
    let data: Vec<u8> = (0..3000u32).map(|i| (i % 251) as u8).collect();
    let (mut tx, mut rx) = endpoints(4096, 65535);

    tx.writer().push(Bytes::from(data.clone()));
    tx.writer().close();

    let mut segment_payloads = 0usize;
    while tx.state() != SenderState::FinAcked {
        let mut wire = Vec::new();
        tx.push(|msg| wire.push(msg.encode()));
        for bytes in &wire {
            let msg = SenderMessage::decode(bytes).expect("wire segment decodes");
            assert!(msg.payload.len() <= MAX_PAYLOAD_SIZE);
            if !msg.payload.is_empty() {
                segment_payloads += 1;
            }
            rx.receive(msg);
        }
        let reply = ReceiverMessage::decode(&rx.send().encode()).expect("wire ack decodes");
        tx.receive(&reply);
    }

    // 3000 bytes at a 1452-byte cap: three data segments.
    assert_eq!(segment_payloads, 3);
    let received = rx.reader().read(4096);
    assert_eq!(received, Bytes::from(data));
    assert!(rx.output().is_finished());
}

#[test]
fn retransmission_recovers_from_loss() {
    let (mut tx, mut rx) = endpoints(64, 64);

    tx.writer().push(Bytes::from_static(b"retry me"));
    tx.writer().close();

    // Every first transmission is lost; only timer-driven retransmissions
    // reach the receiver.
    let mut rto = RTO;
    while tx.state() != SenderState::FinAcked {
        tx.push(|_lost| {});

        let mut wire = Vec::new();
        tx.tick(rto, |msg| wire.push(msg.encode()));
        rto *= 2; // mirror the sender's backoff to keep expiring on time
        for bytes in wire {
            rx.receive(SenderMessage::decode(&bytes).expect("wire segment decodes"));
        }

        let reply = ReceiverMessage::decode(&rx.send().encode()).expect("wire ack decodes");
        tx.receive(&reply);
        if tx.sequence_numbers_in_flight() == 0 {
            rto = RTO; // ack progress reloaded the sender's RTO
        }
    }

    assert_eq!(rx.reader().read(64), Bytes::from_static(b"retry me"));
    assert!(rx.output().is_finished());
    assert_eq!(tx.consecutive_retransmissions(), 0);
}

#[test]
fn reordered_segments_reassemble() {
    let (mut tx, mut rx) = endpoints(64, 64);

    // Establish the connection first.
    exchange(&mut tx, &mut rx);
    assert_eq!(tx.state(), SenderState::Established);

    tx.writer().push(Bytes::from_static(b"abc"));
    tx.push(|_| {});
    tx.writer().push(Bytes::from_static(b"def"));

    let mut wire = Vec::new();
    tx.push(|msg| wire.push(msg.encode()));
    assert_eq!(wire.len(), 1);

    // Deliver the second segment first by replaying from the sender's
    // outstanding queue via retransmission.
    rx.receive(SenderMessage::decode(&wire[0]).expect("decodes"));
    assert_eq!(rx.output().bytes_pushed(), 0);
    assert_eq!(rx.bytes_pending(), 3);

    let mut retx = Vec::new();
    tx.tick(RTO, |msg| retx.push(msg.encode()));
    rx.receive(SenderMessage::decode(&retx[0]).expect("decodes"));
    assert_eq!(rx.reader().read(6), Bytes::from_static(b"abcdef"));
}

#[test]
fn rst_propagates_across_the_wire() {
    let (mut tx, mut rx) = endpoints(64, 64);
    exchange(&mut tx, &mut rx);

    // The application aborts the outbound stream.
    tx.writer().set_error();
    let rst = SenderMessage::decode(&tx.make_empty_message().encode()).expect("decodes");
    assert!(rst.rst);

    rx.receive(rst);
    assert!(rx.output().has_error());
    assert!(rx.send().rst);
}
