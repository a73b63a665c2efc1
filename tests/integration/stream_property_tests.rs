//! End-to-end properties of the assembly pipeline over whole streams.

use serde_json::json;
use stream_assembler::stream::directive::DirectiveState;
use stream_assembler::stream::session::SessionState;

use super::test_helpers::{assemble, data_frame, started_session};

fn booking_stream() -> String {
    [
        data_frame("Καλησπέρα! "),
        data_frame("Your table is "),
        data_frame("reserved.<act"),
        data_frame("ion type=\"x\">{\"type\":\"book\",\"people\":2}</ac"),
        data_frame("tion>"),
        "data: [DONE]\n\n".to_owned(),
    ]
    .concat()
}

#[test]
fn end_to_end_example_with_split_frame_and_marker() {
    let snapshot = assemble([
        "data: {\"response\":\"Hello \"}\n",
        "data: {\"response\":\"world<act",
        "ion>{\"type\":\"book\"}</action>\"}\n",
        "data: [DONE]\n",
    ]);

    assert_eq!(snapshot.raw_text, r#"Hello world<action>{"type":"book"}</action>"#);
    assert_eq!(snapshot.display_text, "Hello world");
    assert_eq!(snapshot.directive.state, DirectiveState::Complete);
    assert_eq!(snapshot.directive.kind.as_deref(), Some("book"));
    assert_eq!(snapshot.directive.payload, Some(json!({"type": "book"})));
    assert_eq!(snapshot.session_state, SessionState::Complete);
}

#[test]
fn end_to_end_example_with_escaped_wire_json() {
    let snapshot = assemble([
        "data: {\"response\":\"Hello \"}\n",
        "data: {\"response\":\"world<act",
        "ion>{\\\"type\\\":\\\"book\\\"}</action>\"}\n",
        "data: [DONE]\n",
    ]);

    assert_eq!(snapshot.raw_text, r#"Hello world<action>{"type":"book"}</action>"#);
    assert_eq!(snapshot.display_text, "Hello world");
    assert_eq!(snapshot.directive.kind.as_deref(), Some("book"));
}

#[test]
fn chunk_boundary_invariance_over_every_two_way_split() {
    let stream = booking_stream();
    let reference = assemble([stream.as_str()]);

    assert_eq!(reference.display_text, "Καλησπέρα! Your table is reserved.");
    assert_eq!(reference.directive.kind.as_deref(), Some("book"));

    let bytes = stream.as_bytes();
    for split in 0..=bytes.len() {
        let mut session = started_session();
        session.submit_bytes(&bytes[..split]);
        session.submit_bytes(&bytes[split..]);
        let snapshot = session.finish();

        assert_eq!(snapshot.raw_text, reference.raw_text, "split at byte {split}");
        assert_eq!(snapshot.display_text, reference.display_text, "split at byte {split}");
        assert_eq!(snapshot.directive, reference.directive, "split at byte {split}");
    }
}

#[test]
fn chunk_boundary_invariance_for_fixed_chunk_sizes() {
    let stream = booking_stream();
    let reference = assemble([stream.as_str()]);

    for size in 1..=17 {
        let mut session = started_session();
        for chunk in stream.as_bytes().chunks(size) {
            session.submit_bytes(chunk);
        }
        let snapshot = session.finish();
        assert_eq!(snapshot.raw_text, reference.raw_text, "chunk size {size}");
        assert_eq!(snapshot.display_text, reference.display_text, "chunk size {size}");
    }
}

#[test]
fn split_marker_is_hidden_once_both_halves_arrive() {
    let mut session = started_session();

    let first = session.submit(&data_frame("Done. <act"));
    assert_eq!(first.directive.state, DirectiveState::Absent);

    let second = session.submit(&data_frame("ion>{\"type\":"));
    assert_eq!(second.display_text, "Done.");
    assert_eq!(second.directive.state, DirectiveState::Open);
    assert!(!second.display_text.contains('<'));
}

#[test]
fn display_equals_raw_after_every_submit_without_marker() {
    let mut session = started_session();
    for piece in ["Plain ", "reply ", "with <b>markup</b> ", " and  spaces "] {
        let snapshot = session.submit(&data_frame(piece));
        assert_eq!(snapshot.display_text, snapshot.raw_text);
    }
    let snapshot = session.finish();
    assert_eq!(snapshot.display_text, "Plain reply with <b>markup</b>  and  spaces ");
}

#[test]
fn malformed_directive_degrades_and_stays_hidden() {
    let snapshot = assemble([
        data_frame("Ok <action>{not json</action> bye").as_str(),
        "data: [DONE]\n",
    ]);

    assert_eq!(snapshot.display_text, "Ok");
    assert_eq!(snapshot.directive.state, DirectiveState::Complete);
    assert_eq!(snapshot.directive.kind.as_deref(), Some("unknown"));
    assert!(snapshot.directive.payload.is_none());
}

#[test]
fn empty_submit_never_changes_text() {
    let mut session = started_session();
    for chunk in ["data: {\"response\":\"a<act", "ion>\"}\n", "data: x"] {
        let before = session.submit(chunk);
        let after = session.submit("");
        assert_eq!(before.raw_text, after.raw_text);
        assert_eq!(before.display_text, after.display_text);
    }
}

#[test]
fn non_json_frames_contribute_verbatim_text() {
    let snapshot = assemble(["data: Hello\n", "data: {\"response\":\" there\"}\n", "data:  friend \n"]);
    assert_eq!(snapshot.raw_text, "Hello therefriend");
}

#[test]
fn abort_mid_stream_retains_partial_text() {
    let mut session = started_session();
    session.submit("data: {\"response\":\"Hello \"}\n");
    let partial = session.submit("data: {\"response\":\"wo\"}\ndata: {\"response\":\"rld\"");
    assert_eq!(partial.raw_text, "Hello wo");

    let aborted = session.abort("network");
    assert_eq!(aborted.session_state, SessionState::Aborted);
    assert_eq!(aborted.raw_text, "Hello wo");
    assert_eq!(aborted.display_text, "Hello wo");
    assert_eq!(aborted.error.as_deref(), Some("network"));

    let late = session.submit("}\n");
    assert_eq!(late.raw_text, "Hello wo", "frames after abort are never applied");
}
