use pretty_assertions::assert_eq;
use scoped_snippets::{EngineOptions, Environment, MemorySnippets, TemplateError};
use serde_json::{json, Value};

fn environment() -> Environment {
    let mut env = Environment::with_provider(EngineOptions::default(), MemorySnippets::new());
    env.register_snippet("simple", "Hello, {{ name }}!");
    env.register_snippet("for_loop", "Item: {{ item }}");
    env.register_snippet("with_object", "Name: {{ object.name }}");
    env
}

fn render(env: &Environment, template: &str, assigns: Value) -> String {
    env.render_str(template, &assigns).unwrap()
}

#[test]
fn renders_a_simple_snippet() {
    let env = environment();
    assert_eq!(render(&env, "{% render 'simple', name: 'World' %}", Value::Null), "Hello, World!");
}

#[test]
fn include_is_the_same_tag() {
    let env = environment();
    assert_eq!(render(&env, "{% include 'simple', name: 'World' %}", Value::Null), "Hello, World!");
}

#[test]
fn renders_a_snippet_for_each_item() {
    let env = environment();
    let out = render(&env, "{% render 'for_loop' for items as item %}", json!({"items": ["A", "B", "C"]}));
    assert_eq!(out, "Item: AItem: BItem: C");
}

#[test]
fn for_without_alias_uses_item() {
    let env = environment();
    let out = render(&env, "{% render 'for_loop' for items %}", json!({"items": [1, 2]}));
    assert_eq!(out, "Item: 1Item: 2");
}

#[test]
fn renders_a_snippet_with_an_object() {
    let env = environment();
    let out = render(&env, "{% render 'with_object' with user as object %}", json!({"user": {"name": "John"}}));
    assert_eq!(out, "Name: John");
}

#[test]
fn with_without_alias_uses_object() {
    let env = environment();
    let out = render(&env, "{% render 'with_object' with user %}", json!({"user": {"name": "Jane"}}));
    assert_eq!(out, "Name: Jane");
}

#[test]
fn does_not_see_caller_variables() {
    let mut env = environment();
    env.register_snippet("isolated", "{{ outside_var }}");
    let out = render(&env, "{% assign outside_var = 'Outside' %}{% render 'isolated' %}", Value::Null);
    assert_eq!(out, "");
    let out = render(&env, "{% render 'isolated' %}", json!({"outside_var": "Outside"}));
    assert_eq!(out, "");
}

#[test]
fn provides_all_forloop_variables() {
    let mut env = environment();
    env.register_snippet(
        "forloop_vars",
        "{{ forloop.index }},{{ forloop.index0 }},{{ forloop.first }},{{ forloop.last }},{{ forloop.length }},{{ forloop.rindex }},{{ forloop.rindex0 }}|",
    );
    let out = render(&env, "{% render 'forloop_vars' for items as item %}", json!({"items": ["A", "B", "C"]}));
    assert_eq!(out, "1,0,true,false,3,3,2|2,1,false,false,3,2,1|3,2,false,true,3,1,0|");
}

#[test]
fn alias_names_the_bound_value() {
    let env = environment();
    assert_eq!(render(&env, "{% render 'simple' with 'Alias' as name %}", Value::Null), "Hello, Alias!");
}

#[test]
fn does_not_pollute_the_outer_scope() {
    let env = environment();
    let out = render(&env, "{% render 'simple' with 'Inner' as name %}{{ name }}", json!({"name": "Outer"}));
    assert_eq!(out, "Hello, Inner!Outer");
}

#[test]
fn snippet_assigns_stay_inside() {
    let mut env = environment();
    env.register_snippet("leaky", "{% assign secret = 'x' %}{% capture note %}y{% endcapture %}");
    let out = render(&env, "{% render 'leaky' %}[{{ secret }}{{ note }}]", Value::Null);
    assert_eq!(out, "[]");
}

#[test]
fn params_resolve_against_the_caller() {
    let mut env = environment();
    env.register_snippet("card", "{{ title }}/{{ count }}/{{ flag }}/{{ raw }}");
    let out = render(
        &env,
        "{% render 'card', title: product.title, count: 3 flag: enabled, raw: some-thing %}",
        json!({"product": {"title": "Hat"}, "enabled": false}),
    );
    assert_eq!(out, "Hat/3/false/some-thing");
}

#[test]
fn params_are_bound_on_every_iteration() {
    let mut env = environment();
    env.register_snippet("row", "{{ prefix }}{{ item }};");
    let out = render(&env, "{% render 'row' for items, prefix: sep %}", json!({"items": ["a", "b"], "sep": "-"}));
    assert_eq!(out, "-a;-b;");
}

#[test]
fn each_iteration_gets_a_fresh_isolated_scope() {
    let mut env = environment();
    env.register_snippet("acc", "[{{ seen }}{{ secret }}]{% assign seen = item %}");
    let out = render(&env, "{% render 'acc' for items %}", json!({"items": ["a", "b"], "secret": "S", "seen": "X"}));
    assert_eq!(out, "[][]");
}

#[test]
fn duplicate_param_keeps_last_value() {
    let env = environment();
    assert_eq!(render(&env, "{% render 'simple', name: 'A', name: 'B' %}", Value::Null), "Hello, B!");
}

#[test]
fn snippet_name_from_a_variable() {
    let env = environment();
    let out = render(&env, "{% render which, name: 'Var' %}", json!({"which": "simple"}));
    assert_eq!(out, "Hello, Var!");
}

#[test]
fn unresolved_bareword_is_the_snippet_name() {
    let env = environment();
    assert_eq!(render(&env, "{% render simple, name: 'Bare' %}", Value::Null), "Hello, Bare!");
}

#[test]
fn non_iterable_for_value_renders_nothing() {
    let env = environment();
    for assigns in [json!({"items": "ABC"}), json!({"items": 5}), json!({})] {
        assert_eq!(render(&env, "{% render 'for_loop' for items %}", assigns), "");
    }
}

#[test]
fn object_iterates_as_pairs() {
    let mut env = environment();
    env.register_snippet("pair", "{{ item[0] }}={{ item[1] }};");
    let out = render(&env, "{% render 'pair' for settings %}", json!({"settings": {"a": 1}}));
    assert_eq!(out, "a=1;");
}

#[test]
fn snippets_can_render_snippets() {
    let mut env = environment();
    env.register_snippet("outer", "<{% render 'simple', name: who %}>");
    let out = render(&env, "{% render 'outer', who: person %}", json!({"person": "Nested"}));
    assert_eq!(out, "<Hello, Nested!>");
}

#[test]
fn self_rendering_snippet_hits_depth_limit() {
    let mut env = environment();
    env.register_snippet("loop", "{% render 'loop' %}");
    let err = env.render_str("{% render 'loop' %}", &Value::Null).unwrap_err();
    assert!(matches!(err, TemplateError::Runtime(_)));
}

#[test]
fn unknown_snippet_is_an_error() {
    let env = environment();
    let err = env.render_str("before{% render 'nope' %}after", &Value::Null).unwrap_err();
    assert!(matches!(&err, TemplateError::UnknownSnippet(name) if name == "nope"));
    assert_eq!(err.to_string(), "Unknown snippet 'nope'");
}

#[test]
fn malformed_markup_fails_at_parse_time() {
    let env = environment();
    let err = env.parse("{% render %}").unwrap_err();
    assert!(matches!(err, TemplateError::Syntax(_)));
    let err = env.parse("{% include 'simple' with %}").unwrap_err();
    assert!(matches!(&err, TemplateError::Syntax(msg) if msg.contains("'include'")));
}

#[test]
fn rendering_twice_is_identical() {
    let env = environment();
    let template = env.parse("{% render 'for_loop' for items %}{% render 'simple' with n as name %}").unwrap();
    let assigns = json!({"items": ["x", "y"], "n": "Again"});
    let first = env.render(&template, &assigns).unwrap();
    let second = env.render(&template, &assigns).unwrap();
    assert_eq!(first, second);
    assert_eq!(first, "Item: xItem: yHello, Again!");
}

#[test]
fn environments_do_not_share_snippets() {
    let mut a = environment();
    let b = environment();
    a.register_snippet("only_a", "A");
    assert_eq!(render(&a, "{% render 'only_a' %}", Value::Null), "A");
    assert!(b.render_str("{% render 'only_a' %}", &Value::Null).is_err());

    a.reset_snippets();
    assert!(a.render_str("{% render 'simple' %}", &Value::Null).is_err());
    assert_eq!(render(&b, "{% render 'simple', name: 'b' %}", Value::Null), "Hello, b!");
}
