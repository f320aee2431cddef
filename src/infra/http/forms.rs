//! urlencoded form bodies and the post form page.

use std::collections::HashMap;

use axum::{Form, http::StatusCode, response::Response};

use crate::domain::entities::GroupRecord;
use crate::domain::forms::FieldErrors;
use crate::presentation::views::{
    LayoutContext, PostFormTemplate, PostFormValues, PostFormView, render_template_response,
};

/// Raw `application/x-www-form-urlencoded` fields.
pub(super) type FormInput = Form<HashMap<String, String>>;

pub(super) fn submitted_values(input: &HashMap<String, String>) -> PostFormValues {
    let field = |name: &str| input.get(name).cloned().unwrap_or_default();
    PostFormValues {
        text: field("text"),
        group: field("group"),
        image: field("image"),
    }
}

/// Render the create/edit form. Invalid submissions are shown back with 200.
pub(super) fn post_form_response(
    viewer: &str,
    edit_id: Option<i64>,
    values: PostFormValues,
    errors: &FieldErrors,
    groups: &[GroupRecord],
) -> Response {
    let title = if edit_id.is_some() {
        "Edit post"
    } else {
        "New post"
    };
    let content = PostFormView::new(edit_id, values, errors, groups);
    let view = LayoutContext::new(title, Some(viewer.to_string()), content);
    render_template_response(PostFormTemplate { view }, StatusCode::OK)
}
