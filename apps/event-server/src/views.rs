//! Server-rendered HTML pages.
//!
//! Event and registration text coming from the store was escaped when it was
//! sanitized and is emitted verbatim. Anything else (raw form echoes, error
//! messages, titles) goes through `html_escape` here or in [`FormData`].

use domain::validate::{is_invalid, EventForm, FieldError, NAME_MAX, TEXT_MAX};
use domain::{Event, Registration};
use http_common::{display_time, html_escape, segment_href, system_time_to_rfc3339};
use std::time::SystemTime;

/// Values pre-filled into a form, already safe to place in HTML.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormData {
    pub name: String,
    pub text: String,
}

impl FormData {
    /// Echo of raw submitted input.
    pub fn from_raw_event(form: &EventForm) -> Self {
        Self {
            name: html_escape(&form.name),
            text: html_escape(&form.description),
        }
    }

    /// Current values of a stored event.
    pub fn from_event(event: &Event) -> Self {
        Self {
            name: event.name.clone(),
            text: event.description.clone(),
        }
    }
}

fn time_tag(t: SystemTime) -> String {
    format!(
        r#"<time datetime="{}">{}</time>"#,
        system_time_to_rfc3339(t),
        html_escape(&display_time(t))
    )
}

fn layout(title: &str, admin: bool, body: &str) -> String {
    let nav = if admin {
        r#"<nav><a href="/admin">Events</a> <a href="/admin/logout">Log out</a></nav>"#
    } else {
        r#"<nav><a href="/">Events</a></nav>"#
    };
    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <link rel="stylesheet" href="/static/styles.css">
</head>
<body>
    <header>
        {nav}
    </header>
    <main>
        <h1>{title}</h1>
{body}
    </main>
</body>
</html>"##,
        title = html_escape(title),
        nav = nav,
        body = body,
    )
}

fn errors_block(errors: &[FieldError]) -> String {
    if errors.is_empty() {
        return String::new();
    }
    let items: String = errors
        .iter()
        .map(|e| format!("<li>{}</li>", html_escape(&e.message)))
        .collect();
    format!(r#"<ul class="errors">{}</ul>"#, items)
}

fn field_class(field: &str, errors: &[FieldError]) -> &'static str {
    if is_invalid(field, errors) {
        "field field--invalid"
    } else {
        "field"
    }
}

fn event_form(
    action: &str,
    submit: &str,
    text_field: &str,
    data: &FormData,
    errors: &[FieldError],
) -> String {
    format!(
        r#"<form method="post" action="{action}">
    {errors}
    <div class="{name_class}">
        <label for="name">Name</label>
        <input type="text" id="name" name="name" maxlength="{name_max}" value="{name}">
    </div>
    <div class="{text_class}">
        <label for="{text_field}">{text_label}</label>
        <textarea id="{text_field}" name="{text_field}" maxlength="{text_max}">{text}</textarea>
    </div>
    <button type="submit">{submit}</button>
</form>"#,
        action = html_escape(action),
        errors = errors_block(errors),
        name_class = field_class("name", errors),
        name_max = NAME_MAX,
        name = data.name,
        text_class = field_class(text_field, errors),
        text_field = text_field,
        text_label = if text_field == "comment" { "Comment" } else { "Description" },
        text_max = TEXT_MAX,
        text = data.text,
        submit = submit,
    )
}

fn events_list(events: &[Event], admin: bool) -> String {
    if events.is_empty() {
        return r#"<p class="empty">No events yet.</p>"#.to_string();
    }
    let prefix = if admin { "/admin" } else { "" };
    let items: String = events
        .iter()
        .map(|e| {
            format!(
                r#"<li><a href="{href}">{name}</a></li>"#,
                href = html_escape(&segment_href(prefix, e.slug.as_str())),
                name = e.name,
            )
        })
        .collect();
    format!(r#"<ul class="events">{}</ul>"#, items)
}

fn registrations_list(registrations: &[Registration]) -> String {
    if registrations.is_empty() {
        return r#"<p class="empty">No registrations yet.</p>"#.to_string();
    }
    let items: String = registrations
        .iter()
        .map(|r| {
            let comment = if r.comment.is_empty() {
                String::new()
            } else {
                format!(r#"<p class="comment">{}</p>"#, r.comment)
            };
            format!(
                r#"<li><strong>{name}</strong> {at}{comment}</li>"#,
                name = r.name,
                at = time_tag(r.created),
                comment = comment,
            )
        })
        .collect();
    format!(r#"<ul class="registrations">{}</ul>"#, items)
}

fn event_details(event: &Event) -> String {
    format!(
        r#"<section class="event">
    <p class="description">{description}</p>
    <p class="meta">Created {created}, updated {updated}</p>
</section>"#,
        description = event.description,
        created = time_tag(event.created),
        updated = time_tag(event.updated),
    )
}

/// Event list; the admin variant links to edit forms and carries the create form.
pub fn index_page(
    title: &str,
    events: &[Event],
    admin: bool,
    errors: &[FieldError],
    data: &FormData,
) -> String {
    let mut body = events_list(events, admin);
    if admin {
        body.push_str("\n<h2>New event</h2>\n");
        body.push_str(&event_form("/admin/", "Create", "description", data, errors));
    }
    layout(title, admin, &body)
}

/// Public event page with its registrations and the registration form.
pub fn event_page(event: &Event, registrations: &[Registration], errors: &[FieldError]) -> String {
    let action = segment_href("", event.slug.as_str());
    let body = format!(
        "{details}\n<h2>Registrations</h2>\n{list}\n<h2>Register</h2>\n{form}",
        details = event_details(event),
        list = registrations_list(registrations),
        form = event_form(&action, "Register", "comment", &FormData::default(), errors),
    );
    layout(&unescaped_title(&event.name), false, &body)
}

/// Admin edit form for one event, followed by its registrations.
pub fn edit_page(
    event: &Event,
    registrations: &[Registration],
    errors: &[FieldError],
    data: &FormData,
) -> String {
    let action = segment_href("/admin", event.slug.as_str());
    let body = format!(
        "{details}\n{form}\n<h2>Registrations</h2>\n{list}",
        details = event_details(event),
        form = event_form(&action, "Save", "description", data, errors),
        list = registrations_list(registrations),
    );
    layout(&unescaped_title(&event.name), true, &body)
}

pub fn login_page(message: Option<&str>) -> String {
    let message = message
        .map(|m| format!(r#"<p class="errors">{}</p>"#, html_escape(m)))
        .unwrap_or_default();
    let body = format!(
        r#"{message}
<form method="post" action="/admin/login">
    <div class="field">
        <label for="username">Username</label>
        <input type="text" id="username" name="username" autocomplete="username">
    </div>
    <div class="field">
        <label for="password">Password</label>
        <input type="password" id="password" name="password" autocomplete="current-password">
    </div>
    <button type="submit">Log in</button>
</form>"#
    );
    layout("Log in", false, &body)
}

pub fn error_page(title: &str) -> String {
    layout(title, false, r#"<p><a href="/">Back to the event list</a></p>"#)
}

// Stored names are entity-encoded; the layout escapes titles itself, so turn
// the common entities back first to avoid showing them twice.
fn unescaped_title(stored: &str) -> String {
    stored
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#x2F;", "/")
        .replace("&#x5C;", "\\")
        .replace("&#96;", "`")
        .replace("&amp;", "&")
}
