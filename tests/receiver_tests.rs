//! Receiver dispatch: hook-name derivation along the rule path, missing
//! hooks, and event payloads.

mod common;

use common::*;
use quill::prelude::*;

#[test]
fn anonymous_combinators_become_sub_paths_of_the_production() {
    let mut grammar = TableGrammar::new(refer("list_item"));
    grammar.define(
        "list_item",
        any(vec![all(vec![chr('-'), chr(' ')]), chr('*')]),
    );
    let mut recorder = Recorder::new();
    quill::engine::parse(&grammar, "- ", &mut recorder).unwrap();

    let names = recorder.names();
    assert!(names.contains(&"try__list_item".to_string()));
    assert!(names.contains(&"got__list_item__all__chr_2d".to_string()));
    assert!(names.contains(&"got__list_item__all__chr_20".to_string()));
    assert!(names.contains(&"got__list_item".to_string()));
}

#[test]
fn the_walk_stops_at_the_nearest_underscore_name() {
    // doc_body contains item_mark: the inner production is the prefix for
    // everything beneath it.
    let mut grammar = TableGrammar::new(refer("doc_body"));
    grammar.define("doc_body", all(vec![refer("item_mark"), chr('x')]));
    grammar.define("item_mark", chr('-'));

    let mut recorder = Recorder::new();
    quill::engine::parse(&grammar, "-x", &mut recorder).unwrap();

    let names = recorder.names();
    assert!(names.contains(&"got__item_mark".to_string()));
    assert!(
        !names.iter().any(|n| n.contains("doc_body__item_mark")),
        "the underscore name must cut the path: {:?}",
        names
    );
    assert!(names.contains(&"got__doc_body__chr_78".to_string()));
}

#[test]
fn missing_hooks_are_silently_skipped() {
    let grammar = top_grammar(all(vec![chr('a'), chr('b')]));
    let mut receiver = SelectiveRecorder::with_hooks(["got__TOP", "try__TOP__chr_61"]);
    quill::engine::parse(&grammar, "ab", &mut receiver).unwrap();
    assert_eq!(receiver.events, vec!["try__TOP__chr_61", "got__TOP"]);
}

#[test]
fn try_events_carry_no_text_and_got_events_carry_the_match() {
    let grammar = top_grammar(all(vec![chr('a'), chr('b')]));
    let mut recorder = Recorder::new();
    quill::engine::parse(&grammar, "ab", &mut recorder).unwrap();

    for (name, event) in &recorder.events {
        if name.starts_with("try__") {
            assert!(event.text.is_empty(), "{} had text {:?}", name, event.text);
        }
    }
    let (_, got_top) = recorder
        .events
        .iter()
        .find(|(name, _)| name == "got__TOP")
        .expect("the top rule matched");
    assert_eq!(got_top.text, "ab");
    assert_eq!(got_top.start, 0);
    assert_eq!(got_top.level, 1);
}

#[test]
fn events_expose_the_frame_bindings() {
    let grammar = top_grammar(all(vec![set("kind", lit(4)), chr('a')]));
    let mut recorder = Recorder::new();
    quill::engine::parse(&grammar, "a", &mut recorder).unwrap();

    let (_, got_top) = recorder
        .events
        .iter()
        .find(|(name, _)| name == "got__TOP")
        .unwrap();
    assert_eq!(got_top.vars.get("kind"), Some(&Value::Int(4)));
}

#[test]
fn repeated_calls_of_one_combinator_reuse_the_derived_names() {
    let grammar = top_grammar(rep(2, 2, chr('a')));
    let mut recorder = Recorder::new();
    quill::engine::parse(&grammar, "aa", &mut recorder).unwrap();
    assert_eq!(
        recorder.names(),
        vec![
            "try__TOP",
            "try__TOP__chr_61",
            "got__TOP__chr_61",
            "try__TOP__chr_61",
            "got__TOP__chr_61",
            "got__TOP",
        ]
    );
}

#[test]
fn two_parses_with_fresh_receivers_see_identical_event_sequences() {
    let grammar = top_grammar(any(vec![
        all(vec![chr('a'), chr('b')]),
        all(vec![chr('a'), chr('c')]),
    ]));
    let first = parse_events(&grammar, "ac");
    let second = parse_events(&grammar, "ac");
    assert_eq!(first, second);
}
