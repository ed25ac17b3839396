//! End-to-end scenarios: small grammars exercising the whole engine, with
//! exact receiver event sequences where the ordering is the point.

mod common;

use common::*;
use quill::prelude::*;
use quill::errors::ErrorKind;

#[test]
fn literal_match_fires_events_in_depth_first_order() {
    let grammar = top_grammar(all(vec![chr('a'), chr('b')]));
    let events = parse_events(&grammar, "ab");
    assert_eq!(
        events,
        vec![
            "try__TOP",
            "try__TOP__chr_61",
            "got__TOP__chr_61",
            "try__TOP__chr_62",
            "got__TOP__chr_62",
            "got__TOP",
        ]
    );
}

#[test]
fn alternation_reports_the_failed_branch_then_the_match() {
    let grammar = top_grammar(any(vec![chr('x'), chr('y')]));
    let events = parse_events(&grammar, "y");
    assert_eq!(
        events,
        vec![
            "try__TOP",
            "try__TOP__chr_78",
            "not__TOP__chr_78",
            "try__TOP__chr_79",
            "got__TOP__chr_79",
            "got__TOP",
        ]
    );
}

#[test]
fn repetition_respects_both_bounds() {
    let grammar = top_grammar(rep(2, 3, chr('a')));

    let err = run_parse(&grammar, "a").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::ParseFailed { .. }));

    run_parse(&grammar, "aa").expect("two repetitions reach the minimum");
    run_parse(&grammar, "aaa").expect("three repetitions reach the maximum");

    let err = run_parse(&grammar, "aaaa").unwrap_err();
    assert!(
        matches!(err.kind, ErrorKind::IncompleteParse { consumed: 3, len: 4 }),
        "the upper bound stops consumption at three: {:?}",
        err.kind
    );
}

#[test]
fn negative_lookahead_consumes_what_its_positive_child_matched() {
    let grammar = top_grammar(all(vec![but(chr('a'), vec![chr('b')]), chr('a')]));
    run_parse(&grammar, "aa").expect("'b' does not match at the entry, so but() accepts 'a'");

    // A negative child that matches at the same entry position vetoes the
    // positive match.
    let veto = top_grammar(but(chr('a'), vec![rng('a', 'z')]));
    let err = run_parse(&veto, "a").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::ParseFailed { .. }));
}

#[test]
fn state_driven_dispatch_selects_the_mapped_rule() {
    let branch = |n: i64| {
        all(vec![
            set("kind", lit(n)),
            case("kind", vec![("1", chr('a')), ("2", chr('b'))]),
        ])
    };

    run_parse(&top_grammar(branch(1)), "a").expect("kind 1 selects the 'a' rule");
    run_parse(&top_grammar(branch(2)), "b").expect("kind 2 selects the 'b' rule");

    let err = run_parse(&top_grammar(branch(3)), "a").unwrap_err();
    match err.kind {
        ErrorKind::MissingKey { var, key } => {
            assert_eq!(var, "kind");
            assert_eq!(key, "3");
        }
        other => panic!("expected a missing dispatch key, got {:?}", other),
    }
}

#[test]
fn zero_progress_repetition_terminates() {
    let grammar = top_grammar(rep(0, 0, empty()));
    run_parse(&grammar, "").expect("empty repetition over empty input succeeds");

    // On non-empty input the guard still fires; the parse then fails only
    // because input is left over.
    let err = run_parse(&grammar, "x").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::IncompleteParse { consumed: 0, len: 1 }));
}

#[test]
fn recursive_production_through_refer() {
    let mut grammar = TableGrammar::new(refer("wrapped"));
    grammar.define(
        "wrapped",
        any(vec![
            all(vec![chr('('), refer("wrapped"), chr(')')]),
            chr('x'),
        ]),
    );

    run_parse(&grammar, "x").expect("base case");
    run_parse(&grammar, "((x))").expect("two levels of nesting");
    assert!(run_parse(&grammar, "((x)").is_err());
}
