use serde::Serialize;
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[cfg(test)]
mod test;

mod templates {
    stache::directory!("templates/");
    stache::file!("template/badge.hbs");
    //language=handlebars
    stache::str!("hello_first_last", r#"
        <p>Hello {{firstname}} {{lastname}}</p>
    "#);
}

#[derive(Serialize)]
struct Todo {
    title: &'static str,
    done: bool,
    priority: u8,
}

fn main() -> Result<(), stache::RenderError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let html = templates::button().render(&json!({"id": 42, "label": "My Todo"}))?;
    println!("{}", html);

    let todos = vec![
        Todo { title: "Write docs", done: true, priority: 1 },
        Todo { title: "Ship <release>", done: false, priority: 3 },
    ];
    let html2 = templates::todo_list().render(&json!({"title": "Today", "todos": todos}))?;
    println!("{}", html2);

    let html3 = templates::badge().render(&json!({"icon": "<i>*</i>", "name": "admin"}))?;
    println!("{}", html3);

    let html4 = templates::hello_first_last().render_serialize(&json!({
        "firstname": "King",
        "lastname": "Tubby",
    }))?;
    println!("{}", html4);
    Ok(())
}
