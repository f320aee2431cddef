//! Creating and editing posts, and commenting on them.

mod support;

use axum::http::StatusCode;
use support::{TestApp, body_text, location};

#[tokio::test]
async fn anonymous_create_redirects_to_login() {
    let app = TestApp::new();

    let response = app.get("/create", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/login/?next=/create");

    let response = app.post_form("/create", None, &[("text", "sneaky")]).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(app.store.posts().is_empty());
}

#[tokio::test]
async fn unknown_forwarded_user_is_anonymous() {
    let app = TestApp::new();

    let response = app.get("/create", Some("nobody")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn create_form_lists_groups() {
    let app = TestApp::new();
    app.store.seed_user("leo");
    app.store.seed_group("Cats", "cats");

    let response = app.get("/create", Some("leo")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("name=\"text\""));
    assert!(html.contains(">cats</option>"));
}

#[tokio::test]
async fn valid_post_is_created_once_and_redirects_to_profile() {
    let app = TestApp::new();
    let author = app.store.seed_user("leo");
    let group = app.store.seed_group("Cats", "cats");

    let response = app
        .post_form(
            "/create",
            Some("leo"),
            &[("text", "  A new post  "), ("group", &group.id.to_string())],
        )
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/profile/leo");

    let posts = app.store.posts();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].author_id, author.id);
    assert_eq!(posts[0].text, "A new post");
    assert_eq!(posts[0].group_id, Some(group.id));
}

#[tokio::test]
async fn blank_text_rerenders_form_without_writing() {
    let app = TestApp::new();
    app.store.seed_user("leo");

    let response = app
        .post_form("/create", Some("leo"), &[("text", "   "), ("image", "cat.png")])
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("This field is required."));
    assert!(html.contains("value=\"cat.png\""));
    assert!(app.store.posts().is_empty());
}

#[tokio::test]
async fn unknown_group_is_an_invalid_choice() {
    let app = TestApp::new();
    app.store.seed_user("leo");

    let response = app
        .post_form("/create", Some("leo"), &[("text", "hi"), ("group", "999")])
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Select a valid choice."));
    assert!(app.store.posts().is_empty());
}

#[tokio::test]
async fn author_edit_changes_only_submitted_fields() {
    let app = TestApp::new();
    let author = app.store.seed_user("leo");
    let group = app.store.seed_group("Cats", "cats");
    let post = app.store.seed_post(author.id, "original", None);

    let form = app
        .get(&format!("/posts/{}/edit", post.id), Some("leo"))
        .await;
    assert_eq!(form.status(), StatusCode::OK);
    assert!(body_text(form).await.contains("original"));

    let response = app
        .post_form(
            &format!("/posts/{}/edit", post.id),
            Some("leo"),
            &[("text", "edited"), ("group", &group.id.to_string())],
        )
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/posts/{}", post.id));

    let stored = app.store.post(post.id).expect("post still exists");
    assert_eq!(stored.text, "edited");
    assert_eq!(stored.group_id, Some(group.id));
    assert_eq!(stored.author_id, post.author_id);
    assert_eq!(stored.pub_date, post.pub_date);
    assert_eq!(app.store.posts().len(), 1);
}

#[tokio::test]
async fn edit_without_image_field_keeps_stored_image() {
    let app = TestApp::new();
    app.store.seed_user("leo");

    let response = app
        .post_form(
            "/create",
            Some("leo"),
            &[("text", "with picture"), ("image", "posts/cat.gif")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let post = app.store.posts().pop().expect("post created");
    assert_eq!(post.image.as_deref(), Some("posts/cat.gif"));

    let response = app
        .post_form(
            &format!("/posts/{}/edit", post.id),
            Some("leo"),
            &[("text", "new text")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let stored = app.store.post(post.id).expect("post still exists");
    assert_eq!(stored.text, "new text");
    assert_eq!(stored.image.as_deref(), Some("posts/cat.gif"));
}

#[tokio::test]
async fn edit_with_empty_image_field_clears_it() {
    let app = TestApp::new();
    app.store.seed_user("leo");
    app.post_form(
        "/create",
        Some("leo"),
        &[("text", "with picture"), ("image", "posts/cat.gif")],
    )
    .await;
    let post = app.store.posts().pop().expect("post created");

    app.post_form(
        &format!("/posts/{}/edit", post.id),
        Some("leo"),
        &[("text", "no picture"), ("image", "")],
    )
    .await;

    let stored = app.store.post(post.id).expect("post still exists");
    assert_eq!(stored.image, None);
}

#[tokio::test]
async fn editing_someone_elses_post_redirects_to_detail() {
    let app = TestApp::new();
    let author = app.store.seed_user("leo");
    app.store.seed_user("mallory");
    let post = app.store.seed_post(author.id, "untouchable", None);

    let response = app
        .get(&format!("/posts/{}/edit", post.id), Some("mallory"))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/posts/{}", post.id));

    let response = app
        .post_form(
            &format!("/posts/{}/edit", post.id),
            Some("mallory"),
            &[("text", "defaced")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/posts/{}", post.id));
    assert_eq!(
        app.store.post(post.id).expect("post").text,
        "untouchable"
    );
}

#[tokio::test]
async fn invalid_edit_keeps_the_stored_post() {
    let app = TestApp::new();
    let author = app.store.seed_user("leo");
    let post = app.store.seed_post(author.id, "keep me", None);

    let response = app
        .post_form(&format!("/posts/{}/edit", post.id), Some("leo"), &[("text", "")])
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Edit post"));
    assert!(html.contains("This field is required."));
    assert_eq!(app.store.post(post.id).expect("post").text, "keep me");
}

#[tokio::test]
async fn comment_is_added_and_shown_on_detail() {
    let app = TestApp::new();
    let author = app.store.seed_user("leo");
    app.store.seed_user("reader");
    let post = app.store.seed_post(author.id, "discuss me", None);

    let response = app
        .post_form(
            &format!("/posts/{}/comment", post.id),
            Some("reader"),
            &[("text", "Nice post")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/posts/{}", post.id));
    assert_eq!(app.store.comments().len(), 1);

    let html = body_text(app.get(&format!("/posts/{}", post.id), None).await).await;
    assert!(html.contains("Nice post"));
}

#[tokio::test]
async fn blank_comment_is_not_stored() {
    let app = TestApp::new();
    let author = app.store.seed_user("leo");
    let post = app.store.seed_post(author.id, "discuss me", None);

    let response = app
        .post_form(
            &format!("/posts/{}/comment", post.id),
            Some("leo"),
            &[("text", " ")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/posts/{}", post.id));
    assert!(app.store.comments().is_empty());
}

#[tokio::test]
async fn anonymous_comment_redirects_to_login() {
    let app = TestApp::new();
    let author = app.store.seed_user("leo");
    let post = app.store.seed_post(author.id, "discuss me", None);

    let uri = format!("/posts/{}/comment", post.id);
    let response = app.post_form(&uri, None, &[("text", "hi")]).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/auth/login/?next={uri}"));
    assert!(app.store.comments().is_empty());
}

#[tokio::test]
async fn commenting_on_missing_post_is_not_found() {
    let app = TestApp::new();
    app.store.seed_user("leo");

    let response = app
        .post_form("/posts/404/comment", Some("leo"), &[("text", "hi")])
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_redirect_encodes_author_profile_path() {
    let app = TestApp::new();
    app.store.seed_user("leo@home");

    let response = app
        .post_form("/create", Some("leo@home"), &[("text", "hello")])
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/profile/leo%40home");
}
