//! End-to-end message scenarios: whole wire messages through the
//! interpreter and session layers, checked against the exact events and
//! anomalies they must produce.

mod common;

use std::net::Ipv4Addr;
use std::time::Duration;

use common::*;
use dnswatch_engine::{DnsConfig, DnsEvent, EventKind, Origin, Transport};

// ---------------------------------------------------------------------------
// Queries and replies
// ---------------------------------------------------------------------------

#[test]
fn minimal_a_query() {
    let (mut interp, conn, sink) = interp();

    let mut msg = header(0x1234, 0x0100, [1, 0, 0, 0]);
    msg.extend_from_slice(&question("example.com", 1, 1));

    assert!(interp.parse_message(&msg, Origin::Query));
    assert!(conn.weirds().is_empty());

    let begins = sink.of_kind(EventKind::Message);
    assert_eq!(begins.len(), 1);
    match &begins[0] {
        DnsEvent::Message { origin, header, len } => {
            assert_eq!(*origin, 1);
            assert_eq!(header.id, 0x1234);
            assert!(!header.qr);
            assert_eq!(header.opcode, 0);
            assert_eq!(header.qdcount, 1);
            assert_eq!(*len, msg.len());
        }
        other => panic!("unexpected event {other:?}"),
    }

    let requests = sink.of_kind(EventKind::Request);
    assert_eq!(requests.len(), 1);
    match &requests[0] {
        DnsEvent::Request { query, .. } => {
            assert_eq!(query.qname, "example.com");
            assert_eq!(query.qtype, 1);
            assert_eq!(query.qclass, 1);
        }
        other => panic!("unexpected event {other:?}"),
    }

    assert_eq!(sink.of_kind(EventKind::MessageEnd).len(), 1);
}

#[test]
fn case_folding_round_trip() {
    let (mut interp, _, sink) = interp();

    let mut msg = header(7, 0x0100, [1, 0, 0, 0]);
    msg.extend_from_slice(&question("Example.COM", 1, 1));

    assert!(interp.parse_message(&msg, Origin::Query));

    let requests = sink.of_kind(EventKind::Request);
    assert_eq!(requests.len(), 1);
    match &requests[0] {
        DnsEvent::Request { query, .. } => assert_eq!(query.qname, "example.com"),
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn a_reply_with_ttl() {
    let (mut interp, conn, sink) = interp();

    let mut msg = header(0x1234, 0x8180, [1, 1, 0, 0]);
    msg.extend_from_slice(&question("example.com", 1, 1));
    msg.extend_from_slice(&rr(&pointer(12), 1, 1, 300, &[192, 0, 2, 1]));

    assert!(interp.parse_message(&msg, Origin::Reply));
    assert!(conn.weirds().is_empty());
    assert_eq!(conn.confirmation_count(), 1);

    let answers = sink.of_kind(EventKind::AReply);
    assert_eq!(answers.len(), 1);
    match &answers[0] {
        DnsEvent::AReply { answer, addr, .. } => {
            assert_eq!(*addr, Ipv4Addr::new(192, 0, 2, 1));
            assert_eq!(answer.ttl, Duration::from_secs(300));
            assert_eq!(answer.name, "example.com");
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn reply_question_classified_as_query_reply() {
    let (mut interp, _, sink) = interp();

    let mut msg = header(9, 0x8180, [1, 1, 0, 0]);
    msg.extend_from_slice(&question("example.com", 1, 1));
    msg.extend_from_slice(&rr(&pointer(12), 1, 1, 60, &[192, 0, 2, 7]));

    assert!(interp.parse_message(&msg, Origin::Reply));
    assert_eq!(sink.of_kind(EventKind::QueryReply).len(), 1);
    assert!(sink.of_kind(EventKind::Request).is_empty());
    assert!(sink.of_kind(EventKind::Rejected).is_empty());
}

#[test]
fn reply_with_no_records_is_rejected() {
    let (mut interp, _, sink) = interp();

    // QR=1, REFUSED, no answer/authority/additional records at all.
    let mut msg = header(9, 0x8185, [1, 0, 0, 0]);
    msg.extend_from_slice(&question("example.com", 1, 1));

    assert!(interp.parse_message(&msg, Origin::Reply));
    assert_eq!(sink.of_kind(EventKind::Rejected).len(), 1);
    assert!(sink.of_kind(EventKind::QueryReply).is_empty());
}

#[test]
fn all_sections_consumed() {
    let (mut interp, conn, sink) = interp();

    let mut msg = header(3, 0x8180, [1, 2, 1, 1]);
    msg.extend_from_slice(&question("example.com", 1, 1));
    msg.extend_from_slice(&rr(&pointer(12), 1, 1, 60, &[192, 0, 2, 1]));
    msg.extend_from_slice(&rr(&pointer(12), 1, 1, 60, &[192, 0, 2, 2]));
    msg.extend_from_slice(&rr(&pointer(12), 2, 1, 60, &qname("ns1.example.com")));
    msg.extend_from_slice(&rr(&pointer(12), 1, 1, 60, &[192, 0, 2, 3]));

    assert!(interp.parse_message(&msg, Origin::Reply));
    assert!(conn.weirds().is_empty());
    assert_eq!(sink.of_kind(EventKind::AReply).len(), 3);
    assert_eq!(sink.of_kind(EventKind::NsReply).len(), 1);
    assert_eq!(sink.of_kind(EventKind::QueryReply).len(), 1);
}

// ---------------------------------------------------------------------------
// Compression-loop guard
// ---------------------------------------------------------------------------

#[test]
fn compression_self_pointer_aborts_message() {
    let (mut interp, conn, sink) = interp();

    // The qname at offset 12 is a pointer to offset 12: itself.
    let mut msg = header(5, 0x0100, [1, 0, 0, 0]);
    msg.extend_from_slice(&pointer(12));
    msg.extend_from_slice(&[0x00, 0x01, 0x00, 0x01]);

    assert!(!interp.parse_message(&msg, Origin::Query));
    assert_eq!(
        conn.weird_names(),
        vec!["DNS_label_forward_compress_offset"]
    );
    assert!(sink.of_kind(EventKind::Request).is_empty());
    // Parsing still finishes the message's bookkeeping.
    assert_eq!(sink.of_kind(EventKind::MessageEnd).len(), 1);
}

// ---------------------------------------------------------------------------
// TCP framing
// ---------------------------------------------------------------------------

#[test]
fn tcp_segmentation_reassembles_one_message() {
    let (mut sess, conn, sink) = session(Transport::Tcp);

    // A 50-byte query: 12-byte header + 32-char label + terminator + 4.
    let mut body = header(0x0042, 0x0100, [1, 0, 0, 0]);
    body.extend_from_slice(&question("abcdefghijklmnopqrstuvwxyz012345", 1, 1));
    assert_eq!(body.len(), 50);

    // Segment 1: length prefix 0x0032 plus the first body byte.
    sess.deliver_stream(&[0x00, 0x32, body[0]], true);
    assert!(sink.of_kind(EventKind::Message).is_empty());

    // Segment 2: the remaining 49 bytes.
    sess.deliver_stream(&body[1..], true);

    let begins = sink.of_kind(EventKind::Message);
    assert_eq!(begins.len(), 1);
    match &begins[0] {
        DnsEvent::Message { len, .. } => assert_eq!(*len, 50),
        other => panic!("unexpected event {other:?}"),
    }
    assert!(conn.weirds().is_empty());

    // The framer is back between messages: a further message parses too.
    let mut next = vec![0x00, 0x32];
    next.extend_from_slice(&body);
    sess.deliver_stream(&next, true);
    assert_eq!(sink.of_kind(EventKind::Message).len(), 2);
}

// ---------------------------------------------------------------------------
// Sanity gate
// ---------------------------------------------------------------------------

#[test]
fn oversized_qdcount_rejected() {
    let (mut interp, conn, sink) = interp();

    let msg = header(1, 0x0100, [10_000, 0, 0, 0]);
    assert!(!interp.parse_message(&msg, Origin::Query));

    assert_eq!(conn.weird_names(), vec!["DNS_Conn_count_too_large"]);
    assert_eq!(conn.violations(), vec!["DNS_Conn_count_too_large"]);
    assert!(sink.of_kind(EventKind::Request).is_empty());
    assert_eq!(sink.of_kind(EventKind::MessageEnd).len(), 1);
}

#[test]
fn qdcount_gate_disabled_by_zero() {
    let (mut interp, conn, _) = interp_with(
        DnsConfig {
            max_queries: 0,
            ..DnsConfig::default()
        },
        53,
    );

    // 100 questions declared but none present: the gate stays quiet and the
    // parse fails on truncation instead.
    let msg = header(1, 0x0100, [100, 0, 0, 0]);
    assert!(!interp.parse_message(&msg, Origin::Query));
    assert!(conn.violations().is_empty());
}

// ---------------------------------------------------------------------------
// Role flip
// ---------------------------------------------------------------------------

#[test]
fn mid_flow_capture_flips_roles_once() {
    let (mut interp, conn, sink) = interp();

    // First observed packet is delivered as a query but carries QR=1.
    let mut reply = header(0x0077, 0x8180, [1, 1, 0, 0]);
    reply.extend_from_slice(&question("example.com", 1, 1));
    reply.extend_from_slice(&rr(&pointer(12), 1, 1, 60, &[192, 0, 2, 1]));

    assert!(interp.parse_message(&reply, Origin::Query));
    assert_eq!(conn.flip_count(), 1);

    // The message was treated as a reply.
    match &sink.of_kind(EventKind::Message)[0] {
        DnsEvent::Message { origin, .. } => assert_eq!(*origin, 0),
        other => panic!("unexpected event {other:?}"),
    }

    // Later messages never flip again.
    assert!(interp.parse_message(&reply, Origin::Query));
    assert_eq!(conn.flip_count(), 1);
}

// ---------------------------------------------------------------------------
// Skip policy
// ---------------------------------------------------------------------------

#[test]
fn skip_both_sections_ends_early() {
    // skip_all_auth plus an empty additional section: once the answers are
    // parsed there is nothing left worth doing, so the trailing authority
    // records are never touched.
    let (mut interp, conn, sink) = interp_with(
        DnsConfig {
            skip_all_auth: true,
            ..DnsConfig::default()
        },
        53,
    );

    let mut msg = header(2, 0x8180, [1, 1, 1, 0]);
    msg.extend_from_slice(&question("example.com", 1, 1));
    msg.extend_from_slice(&rr(&pointer(12), 1, 1, 60, &[192, 0, 2, 1]));
    msg.extend_from_slice(&rr(&pointer(12), 2, 1, 60, &qname("ns1.example.com")));

    assert!(interp.parse_message(&msg, Origin::Reply));
    assert!(conn.weirds().is_empty());
    assert_eq!(sink.of_kind(EventKind::AReply).len(), 1);
    assert!(sink.of_kind(EventKind::NsReply).is_empty());
}

#[test]
fn skipped_authority_still_consumed_for_additional() {
    // Authority events are suppressed but the records are still walked so
    // the additional section stays in frame.
    let (mut interp, conn, sink) = interp_with(
        DnsConfig {
            skip_all_auth: true,
            ..DnsConfig::default()
        },
        53,
    );

    let mut msg = header(2, 0x8180, [1, 1, 1, 1]);
    msg.extend_from_slice(&question("example.com", 1, 1));
    msg.extend_from_slice(&rr(&pointer(12), 1, 1, 60, &[192, 0, 2, 1]));
    msg.extend_from_slice(&rr(&pointer(12), 2, 1, 60, &qname("ns1.example.com")));
    msg.extend_from_slice(&rr(&pointer(12), 1, 1, 60, &[192, 0, 2, 9]));

    assert!(interp.parse_message(&msg, Origin::Reply));
    assert!(conn.weirds().is_empty());
    assert!(sink.of_kind(EventKind::NsReply).is_empty());
    // The additional A record made it through with correct framing.
    let answers = sink.of_kind(EventKind::AReply);
    assert_eq!(answers.len(), 2);
}

#[test]
fn skip_table_matches_responder() {
    let config = DnsConfig::default();
    config.skip_auth.insert("192.0.2.53".parse().unwrap(), ());
    config.skip_addl.insert("192.0.2.53".parse().unwrap(), ());
    let (mut interp, _, sink) = interp_with(config, 53);

    let mut msg = header(2, 0x8180, [1, 1, 1, 0]);
    msg.extend_from_slice(&question("example.com", 1, 1));
    msg.extend_from_slice(&rr(&pointer(12), 1, 1, 60, &[192, 0, 2, 1]));
    msg.extend_from_slice(&rr(&pointer(12), 2, 1, 60, &qname("ns1.example.com")));

    assert!(interp.parse_message(&msg, Origin::Reply));
    assert!(sink.of_kind(EventKind::NsReply).is_empty());
    assert_eq!(sink.of_kind(EventKind::AReply).len(), 1);
}

// ---------------------------------------------------------------------------
// Truncation
// ---------------------------------------------------------------------------

#[test]
fn declared_records_missing_fails() {
    let (mut interp, conn, _) = interp();

    // One answer declared, none present.
    let mut msg = header(4, 0x8180, [1, 1, 0, 0]);
    msg.extend_from_slice(&question("example.com", 1, 1));

    assert!(!interp.parse_message(&msg, Origin::Reply));
    assert_eq!(conn.weird_names(), vec!["DNS_truncated_ans_too_short"]);
}

#[test]
fn rdlength_past_end_fails() {
    let (mut interp, conn, _) = interp();

    let mut msg = header(4, 0x8180, [1, 1, 0, 0]);
    msg.extend_from_slice(&question("example.com", 1, 1));
    // A record claiming 200 bytes of rdata with only 4 present.
    msg.extend_from_slice(&rr_with_rdlength(
        &pointer(12),
        1,
        1,
        60,
        200,
        &[192, 0, 2, 1],
    ));

    assert!(!interp.parse_message(&msg, Origin::Reply));
    assert_eq!(
        conn.weird_names(),
        vec!["DNS_truncated_RR_rdlength_lt_len"]
    );
}
