use pretty_assertions::assert_eq;
use scoped_snippets::{render, TemplateError};
use serde_json::{json, Value};

#[test]
fn captures_content_into_a_variable() {
    let out = render("{% capture my_variable %}Hello, Capture!{% endcapture %}{{ my_variable }}", &Value::Null).unwrap();
    assert_eq!(out, "Hello, Capture!");
}

#[test]
fn captures_complex_content_with_logic() {
    let out = render("{% capture complex %}{% for i in (1..3) %}{{ i }}{% endfor %}{% endcapture %}{{ complex }}", &Value::Null).unwrap();
    assert_eq!(out, "123");
}

#[test]
fn overwrites_previously_captured_variables() {
    let out = render("{% capture var %}First{% endcapture %}{% capture var %}Second{% endcapture %}{{ var }}", &Value::Null).unwrap();
    assert_eq!(out, "Second");
}

#[test]
fn emits_nothing_in_place() {
    let out = render("a{% capture x %}hidden{% endcapture %}b", &Value::Null).unwrap();
    assert_eq!(out, "ab");
}

#[test]
fn sees_and_shadows_caller_variables() {
    let out = render("{% capture greeting %}Hi {{ name }}{% endcapture %}{{ greeting }}", &json!({"name": "Ann"})).unwrap();
    assert_eq!(out, "Hi Ann");
    let out = render("{% capture name %}new{% endcapture %}{{ name }}", &json!({"name": "old"})).unwrap();
    assert_eq!(out, "new");
}

#[test]
fn usable_in_later_conditionals() {
    let src = "{% capture flag %}yes{% endcapture %}{% if flag == 'yes' %}ok{% endif %}";
    assert_eq!(render(src, &Value::Null).unwrap(), "ok");
}

#[test]
fn requires_a_variable_name_and_end_tag() {
    assert!(matches!(render("{% capture %}x{% endcapture %}", &Value::Null), Err(TemplateError::Syntax(_))));
    assert!(matches!(render("{% capture a b %}x{% endcapture %}", &Value::Null), Err(TemplateError::Syntax(_))));
    assert!(matches!(render("{% capture a %}x", &Value::Null), Err(TemplateError::Syntax(_))));
}

#[test]
fn capture_inside_for_is_scoped_to_the_body() {
    let src = "{% for i in (1..3) %}{% capture last %}{{ i }}{% endcapture %}{% endfor %}[{{ last }}]";
    assert_eq!(render(src, &Value::Null).unwrap(), "[]");
    let src = "{% for i in (1..3) %}{% capture last %}{{ i }}{% endcapture %}[{{ last }}]{% endfor %}";
    assert_eq!(render(src, &Value::Null).unwrap(), "[1][2][3]");
    let src = "{% for i in (1..3) %}{% endfor %}{% capture last %}done{% endcapture %}[{{ last }}]";
    assert_eq!(render(src, &Value::Null).unwrap(), "[done]");
}
