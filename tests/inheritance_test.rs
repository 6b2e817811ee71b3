//! End-to-end inheritance behavior across multi-level layout chains.

use sablon::{Engine, Error, MemoryProvider};
use serde_json::json;

const LAYOUT: &str = "|{% block block1 %}block 1 from layout{% endblock %}\
|{% block block2 %}block 2 from layout{% endblock %}\
|{% block block3 %}{% block block4 %}nested block 4 from layout{% endblock %}{% endblock %}|";

const LEVEL1: &str =
    r#"{% extends "layout" %}{% block block1 %}block 1 from level1{% endblock %}"#;

const LEVEL2: &str = r#"{% extends "level1" %}{% block block2 %}{% block block5 %}nested block 5 from level2{% endblock %}{% endblock %}"#;

const LEVEL3: &str = r#"{% extends "level2" %}{% block block5 %}block 5 from level3{% endblock %}{% block block4 %}block 4 from level3{% endblock %}"#;

const LEVEL4: &str =
    r#"{% extends "level3" %}{% block block3 %}block 3 from level4{% endblock %}"#;

fn levels_engine() -> Engine<MemoryProvider> {
    Engine::new(MemoryProvider::from_pairs([
        ("layout", LAYOUT),
        ("level1", LEVEL1),
        ("level2", LEVEL2),
        ("level3", LEVEL3),
        ("level4", LEVEL4),
    ]))
}

#[test]
fn layout_renders_standalone() {
    let engine = levels_engine();
    assert_eq!(
        engine.render("layout", &json!({})).unwrap(),
        "|block 1 from layout|block 2 from layout|nested block 4 from layout|"
    );
}

#[test]
fn level1_overrides_one_block() {
    let engine = levels_engine();
    assert_eq!(
        engine.render("level1", &json!({})).unwrap(),
        "|block 1 from level1|block 2 from layout|nested block 4 from layout|"
    );
}

#[test]
fn level2_introduces_nested_block() {
    let engine = levels_engine();
    assert_eq!(
        engine.render("level2", &json!({})).unwrap(),
        "|block 1 from level1|nested block 5 from level2|nested block 4 from layout|"
    );
}

#[test]
fn level3_overrides_blocks_from_two_ancestors() {
    let engine = levels_engine();
    assert_eq!(
        engine.render("level3", &json!({})).unwrap(),
        "|block 1 from level1|block 5 from level3|block 4 from level3|"
    );
}

#[test]
fn level4_override_drops_nested_block() {
    let engine = levels_engine();
    assert_eq!(
        engine.render("level4", &json!({})).unwrap(),
        "|block 1 from level1|block 5 from level3|block 3 from level4|"
    );
}

#[test]
fn un_overridden_block_uses_nearest_ancestor_body() {
    let engine = Engine::new(MemoryProvider::from_pairs([
        ("root", "{% block footer %}X{% endblock %}"),
        ("child", r#"{% extends "root" %}"#),
    ]));
    assert_eq!(engine.render("child", &json!({})).unwrap(), "X");
}

#[test]
fn super_composes_through_three_levels() {
    let engine = Engine::new(MemoryProvider::from_pairs([
        (
            "a",
            "{% block intro %}INTRO{% endblock %}|BEFORE|{% block data %}INNER{% endblock %}|AFTER",
        ),
        (
            "b",
            r#"{% extends "a" %}{% block data %}({{ super() }}){% endblock %}"#,
        ),
        (
            "c",
            r#"{% extends "b" %}{% block intro %}--{{ super() }}--{% endblock %}{% block data %}[{{ super() }}]{% endblock %}"#,
        ),
    ]));
    assert_eq!(
        engine.render("c", &json!({})).unwrap(),
        "--INTRO--|BEFORE|[(INNER)]|AFTER"
    );
}

#[test]
fn super_counts_from_current_override() {
    // The offset is relative to the override currently executing, not to
    // the leaf: super(2) from the leaf-most of three declarations reaches
    // the root, super(3) is out of range.
    let provider = MemoryProvider::from_pairs([
        ("a", "{% block x %}A{% endblock %}"),
        ("b", r#"{% extends "a" %}{% block x %}B{{ super() }}{% endblock %}"#),
    ]);
    provider.insert(
        "c2",
        r#"{% extends "b" %}{% block x %}C{{ super(2) }}{% endblock %}"#,
    );
    provider.insert(
        "c3",
        r#"{% extends "b" %}{% block x %}C{{ super(3) }}{% endblock %}"#,
    );
    let engine = Engine::new(provider);

    // super() in b reaches a; chained through c's bare super it renders BA.
    engine.provider().insert(
        "c1",
        r#"{% extends "b" %}{% block x %}C{{ super() }}{% endblock %}"#,
    );
    assert_eq!(engine.render("c1", &json!({})).unwrap(), "CBA");
    assert_eq!(engine.render("c2", &json!({})).unwrap(), "CA");

    match engine.render("c3", &json!({})) {
        Err(Error::SuperOutOfRange {
            block,
            requested,
            available,
        }) => {
            assert_eq!(block, "x");
            assert_eq!(requested, 3);
            assert_eq!(available, 2);
        }
        other => panic!("Expected SuperOutOfRange, got {:?}", other),
    }
}

#[test]
fn super_without_ancestor_fails() {
    let engine = Engine::new(MemoryProvider::from_pairs([(
        "only",
        "{% block solo %}{{ super() }}{% endblock %}",
    )]));
    match engine.render("only", &json!({})) {
        Err(Error::SuperOutOfRange { available, .. }) => assert_eq!(available, 0),
        other => panic!("Expected SuperOutOfRange, got {:?}", other),
    }
}

#[test]
fn super_against_empty_ancestor_renders_empty() {
    let engine = Engine::new(MemoryProvider::from_pairs([(
        "a",
        "{% block foo %}{% endblock %}",
    )]));
    let out = engine
        .render_str(
            r#"{% extends "a" %}{% block foo %}{{ super() }}{% endblock %}"#,
            &json!({}),
        )
        .unwrap();
    assert_eq!(out, "");
}

#[test]
fn shortcut_block_renders_expression() {
    let engine = Engine::new(MemoryProvider::new());
    assert_eq!(
        engine.render_str(r#"{% block foo "42" %}"#, &json!({})).unwrap(),
        "42"
    );
}

#[test]
fn shortcut_block_can_be_overridden() {
    let engine = Engine::new(MemoryProvider::from_pairs([(
        "base",
        r#"<{% block title "untitled" %}>"#,
    )]));
    assert_eq!(engine.render("base", &json!({})).unwrap(), "<untitled>");
    let out = engine
        .render_str(
            r#"{% extends "base" %}{% block title %}home{% endblock %}"#,
            &json!({}),
        )
        .unwrap();
    assert_eq!(out, "<home>");
}

#[test]
fn child_prelude_runs_but_emits_nothing() {
    let engine = Engine::new(MemoryProvider::from_pairs([
        ("base", "({% block b %}x{% endblock %})"),
        (
            "child",
            "{% extends \"base\" %}this text is outside any block{% block b %}y{% endblock %}",
        ),
    ]));
    assert_eq!(engine.render("child", &json!({})).unwrap(), "(y)");
}

#[test]
fn blocks_render_with_model_data() {
    let engine = Engine::new(MemoryProvider::from_pairs([
        (
            "base",
            "{% block greeting %}Hello {{ user.name }}{% endblock %}",
        ),
        (
            "child",
            r#"{% extends "base" %}{% block greeting %}{{ super() }}!{% endblock %}"#,
        ),
    ]));
    assert_eq!(
        engine
            .render("child", &json!({"user": {"name": "Ada"}}))
            .unwrap(),
        "Hello Ada!"
    );
}

#[test]
fn conditional_inside_block_renders_per_branch() {
    let engine = Engine::new(MemoryProvider::from_pairs([
        (
            "base",
            "{% block b %}{% if admin %}admin{% else %}guest{% endif %}{% endblock %}",
        ),
        ("child", r#"{% extends "base" %}"#),
    ]));
    assert_eq!(
        engine.render("child", &json!({"admin": true})).unwrap(),
        "admin"
    );
    assert_eq!(engine.render("child", &json!({})).unwrap(), "guest");
}
