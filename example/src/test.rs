use serde_json::json;

use crate::templates;

#[test]
fn button() {
    assert_eq!(
        templates::button().render(&json!({"id": 7, "label": "<Save>"})).unwrap(),
        "<button type=\"button\" data-id=\"7\">&lt;Save&gt;</button>\n"
    );
}

#[test]
fn todo_list() {
    let html = templates::todo_list()
        .render(&json!({
            "title": "Today",
            "todos": [
                {"title": "a", "done": true, "priority": 1},
                {"title": "b", "done": false, "priority": 3},
            ],
        }))
        .unwrap();
    assert_eq!(
        html,
        "<h2>Today (1 left)</h2>\n<ul>\n  <li class=\"done\">1. a</li>\n  <li class=\"\">2. b !</li>\n</ul>\n"
    );
}

#[test]
fn badge() {
    assert_eq!(
        templates::badge().render(&json!({"icon": "<i>*</i>", "name": "admin"})).unwrap(),
        "<span class=\"badge\"><i>*</i> ADMIN</span>\n"
    );
}

#[test]
fn hello_first_last() {
    assert_eq!(
        templates::hello_first_last()
            .render(&json!({"firstname": "King", "lastname": "Tubby"}))
            .unwrap()
            .trim(),
        "<p>Hello King Tubby</p>"
    );
}
