//! Semantics of the primitive combinator library, driven through a bare
//! parser so cursor positions can be asserted directly.

mod common;

use common::*;
use quill::prelude::*;
use rstest::rstest;

fn verdict(top: &Combinator, input: &str) -> (bool, usize) {
    let grammar = TableGrammar::new(top.clone());
    let mut receiver = NullReceiver;
    let mut parser = Parser::new(&grammar, input, &mut receiver);
    let matched = parser.call_bool(top).expect("no engine error expected");
    (matched, parser.pos())
}

// ============================================================================
// SEQUENCE AND CHOICE
// ============================================================================

#[test]
fn all_consumes_cumulatively() {
    let top = all(vec![chr('a'), chr('b'), chr('c')]);
    assert_eq!(verdict(&top, "abc"), (true, 3));
}

#[test]
fn all_resets_on_any_child_failure() {
    let top = all(vec![chr('a'), chr('b')]);
    assert_eq!(verdict(&top, "ax"), (false, 0));
}

#[test]
fn any_keeps_the_first_successful_branch() {
    let top = any(vec![chr('x'), chr('y')]);
    assert_eq!(verdict(&top, "y"), (true, 1));
}

#[test]
fn any_fails_without_moving_when_children_roll_back() {
    let top = any(vec![chr('x'), chr('y')]);
    assert_eq!(verdict(&top, "z"), (false, 0));
}

#[test]
fn all_of_one_behaves_like_its_child() {
    let wrapped = all(vec![chr('a')]);
    let bare = chr('a');
    assert_eq!(verdict(&wrapped, "ab"), verdict(&bare, "ab"));
    assert_eq!(verdict(&wrapped, "xb"), verdict(&bare, "xb"));
}

// ============================================================================
// REPETITION
// ============================================================================

#[rstest]
#[case("", 0, 0, true, 0)]
#[case("aaa", 0, 0, true, 3)]
#[case("a", 2, 3, false, 0)]
#[case("aa", 2, 3, true, 2)]
#[case("aaa", 2, 3, true, 3)]
#[case("aaaa", 2, 3, true, 3)]
#[case("bbb", 0, 0, true, 0)]
fn rep_bounds_and_rollback(
    #[case] input: &str,
    #[case] min: i64,
    #[case] max: i64,
    #[case] matched: bool,
    #[case] pos: usize,
) {
    let top = rep(min, max, chr('a'));
    assert_eq!(verdict(&top, input), (matched, pos));
}

#[test]
fn rep_with_computed_bounds() {
    // min = 3 - 1, max = 1 + 1: exactly two repetitions.
    let top = rep_bounds(sub(lit(3), lit(1)), add(lit(1), lit(1)), chr('a'));
    assert_eq!(verdict(&top, "aa"), (true, 2));
    assert_eq!(verdict(&top, "a"), (false, 0));
    assert_eq!(verdict(&top, "aaa"), (true, 2));
}

// ============================================================================
// TERMINAL MATCHERS
// ============================================================================

#[test]
fn chr_advances_exactly_one_on_success() {
    assert_eq!(verdict(&chr('a'), "ab"), (true, 1));
}

#[test]
fn chr_fails_without_reading_at_end_of_input() {
    assert_eq!(verdict(&chr('a'), ""), (false, 0));
}

#[test]
fn rng_matches_the_inclusive_bounds() {
    assert_eq!(verdict(&rng('a', 'z'), "a"), (true, 1));
    assert_eq!(verdict(&rng('a', 'z'), "z"), (true, 1));
    assert_eq!(verdict(&rng('a', 'z'), "A"), (false, 0));
}

// ============================================================================
// LOOKAHEAD
// ============================================================================

#[test]
fn but_restores_the_positive_match_position() {
    let top = but(chr('a'), vec![chr('b')]);
    assert_eq!(verdict(&top, "ab"), (true, 1));
}

#[test]
fn but_resets_when_a_negative_matches_at_entry() {
    let top = but(chr('a'), vec![rng('a', 'z')]);
    assert_eq!(verdict(&top, "a"), (false, 0));
}

#[test]
fn chk_equal_has_the_child_verdict_with_no_movement() {
    let top = chk("=", chr('a'));
    assert_eq!(verdict(&top, "a"), (true, 0));
    assert_eq!(verdict(&top, "b"), (false, 0));
}

#[test]
fn chk_negated_inverts_the_verdict() {
    let top = chk("!", chr('a'));
    assert_eq!(verdict(&top, "a"), (false, 0));
    assert_eq!(verdict(&top, "b"), (true, 0));
}

#[test]
fn chk_lookbehind_examines_the_previous_char() {
    // After consuming 'a', look behind for it.
    let top = all(vec![chr('a'), chk("<=", chr('a')), chr('b')]);
    assert_eq!(verdict(&top, "ab"), (true, 2));
}

#[test]
fn chk_lookbehind_at_start_is_clamped() {
    // At position 0 the lookbehind clamps and examines position 0 itself.
    let top = chk("<=", chr('a'));
    assert_eq!(verdict(&top, "a"), (true, 0));
}

// ============================================================================
// STATE, ARITHMETIC, PLACEHOLDERS
// ============================================================================

#[test]
fn set_bindings_are_visible_to_later_siblings() {
    let top = all(vec![
        set("mode", lit(2)),
        case("mode", vec![("2", chr('b'))]),
    ]);
    assert_eq!(verdict(&top, "b"), (true, 1));
}

#[test]
fn flip_returns_the_mapped_ground_value() {
    // flip's value feeds a set binding, which case then dispatches on.
    let top = all(vec![
        set("mode", lit(1)),
        set("glyph", flip("mode", vec![("1", Value::Str("a".into()))])),
        case("glyph", vec![("a", chr('a'))]),
    ]);
    assert_eq!(verdict(&top, "a"), (true, 1));
}

#[test]
fn flip_calls_a_mapped_combinator() {
    // A combinator-valued entry is called, not returned.
    let top = all(vec![
        set("mode", lit(1)),
        flip("mode", vec![("1", Value::Comb(chr('z')))]),
    ]);
    assert_eq!(verdict(&top, "z"), (true, 1));
}

#[test]
fn auto_detect_indent_feeds_state() {
    let top = all(vec![
        set("indent", auto_detect_indent()),
        case("indent", vec![("1", chr('i'))]),
    ]);
    assert_eq!(verdict(&top, "i"), (true, 1));
}

#[test]
fn reserved_placeholders_always_succeed() {
    assert_eq!(verdict(&max(5), ""), (true, 0));
    assert_eq!(verdict(&exclude(chr('a')), "b"), (true, 0));
}

#[test]
fn built_in_terminals() {
    assert_eq!(verdict(&start_of_line(), "x"), (true, 0));
    let after_newline = all(vec![chr('a'), chr('\n'), start_of_line(), chr('b')]);
    assert_eq!(verdict(&after_newline, "a\nb"), (true, 3));
    let mid_line = all(vec![chr('a'), start_of_line()]);
    assert_eq!(verdict(&mid_line, "ab"), (false, 0));

    assert_eq!(verdict(&end_of_stream(), ""), (true, 0));
    assert_eq!(verdict(&end_of_stream(), "x"), (false, 0));

    assert_eq!(verdict(&empty(), "x"), (true, 0));
}
