//! Postgres adapter tests. Run with `DATABASE_URL` set and `--ignored`.

use std::collections::HashSet;

use sqlx::PgPool;

use yatube::{
    application::{
        pagination::PageRequest,
        repos::{
            CommentsRepo, CreateCommentParams, CreateGroupParams, CreatePostParams,
            CreateUserParams, FollowsRepo, GroupsRepo, GroupsWriteRepo, PostScope, PostsRepo,
            PostsWriteRepo, RepoError, UpdatePostParams, UsersRepo, UsersWriteRepo,
        },
    },
    domain::entities::UserRecord,
    infra::db::PostgresRepositories,
};

async fn user(repos: &PostgresRepositories, username: &str) -> UserRecord {
    repos
        .create_user(CreateUserParams {
            username: username.to_string(),
            first_name: String::new(),
            last_name: String::new(),
        })
        .await
        .expect("create user")
}

async fn post(repos: &PostgresRepositories, author_id: i64, text: &str, group_id: Option<i64>) {
    repos
        .create_post(CreatePostParams {
            author_id,
            text: text.to_string(),
            group_id,
            image: None,
        })
        .await
        .expect("create post");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn listings_are_scoped_and_paginated(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let author = user(&repos, "leo").await;
    let other = user(&repos, "anna").await;
    let group = repos
        .create_group(CreateGroupParams {
            title: "Cats".to_string(),
            slug: "cats".to_string(),
            description: "All about cats".to_string(),
        })
        .await
        .expect("create group");

    for n in 0..15 {
        post(&repos, author.id, &format!("post {n}"), Some(group.id)).await;
    }
    post(&repos, other.id, "elsewhere", None).await;

    assert_eq!(repos.count_posts(PostScope::All).await.expect("count"), 16);
    assert_eq!(
        repos
            .count_posts(PostScope::Group(group.id))
            .await
            .expect("count"),
        15
    );

    let window = PageRequest::new(2, 10).resolve(15);
    let page = repos
        .list_posts(PostScope::Author(author.id), window)
        .await
        .expect("list");
    assert_eq!(page.len(), 5);
    assert_eq!(page[0].post.text, "post 4");
    assert_eq!(page[0].group.as_ref().map(|g| g.slug.as_str()), Some("cats"));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn follow_edges_are_unique_and_drive_the_feed(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let reader = user(&repos, "reader").await;
    let author = user(&repos, "author").await;
    let stranger = user(&repos, "stranger").await;
    post(&repos, author.id, "followed post", None).await;
    post(&repos, stranger.id, "stranger post", None).await;

    assert!(repos.follow(reader.id, author.id).await.expect("follow"));
    assert!(!repos.follow(reader.id, author.id).await.expect("follow again"));
    assert!(repos.is_following(reader.id, author.id).await.expect("exists"));

    let scope = PostScope::FollowedBy(reader.id);
    assert_eq!(repos.count_posts(scope).await.expect("count"), 1);
    let feed = repos
        .list_posts(scope, PageRequest::first(10).resolve(1))
        .await
        .expect("feed");
    assert_eq!(feed[0].post.text, "followed post");

    assert!(repos.unfollow(reader.id, author.id).await.expect("unfollow"));
    assert!(!repos.unfollow(reader.id, author.id).await.expect("unfollow again"));
    assert_eq!(repos.count_posts(scope).await.expect("count"), 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn self_follow_is_rejected_by_the_schema(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let narcissus = user(&repos, "narcissus").await;

    let err = repos
        .follow(narcissus.id, narcissus.id)
        .await
        .expect_err("check constraint");
    assert!(matches!(err, RepoError::Integrity { .. }));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn update_keeps_author_and_pub_date(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let author = user(&repos, "leo").await;
    let created = repos
        .create_post(CreatePostParams {
            author_id: author.id,
            text: "original".to_string(),
            group_id: None,
            image: None,
        })
        .await
        .expect("create");

    let updated = repos
        .update_post(UpdatePostParams {
            id: created.id,
            text: "edited".to_string(),
            group_id: None,
            image: Some("posts/cat.png".to_string()),
        })
        .await
        .expect("update");

    assert_eq!(updated.text, "edited");
    assert_eq!(updated.author_id, created.author_id);
    assert_eq!(updated.pub_date, created.pub_date);
    assert_eq!(updated.image.as_deref(), Some("posts/cat.png"));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn comments_are_listed_oldest_first(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let author = user(&repos, "leo").await;
    post(&repos, author.id, "discuss", None).await;
    let post_id = repos
        .list_posts(PostScope::All, PageRequest::first(10).resolve(1))
        .await
        .expect("list")[0]
        .post
        .id;

    for text in ["first", "second"] {
        repos
            .create_comment(CreateCommentParams {
                post_id,
                author_id: author.id,
                text: text.to_string(),
            })
            .await
            .expect("comment");
    }

    let comments = repos.list_for_post(post_id).await.expect("comments");
    let texts: Vec<&str> = comments.iter().map(|c| c.comment.text.as_str()).collect();
    assert_eq!(texts, ["first", "second"]);
    assert_eq!(comments[0].author.username, "leo");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn duplicate_usernames_and_slugs_are_reported(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    user(&repos, "leo").await;

    let err = repos
        .create_user(CreateUserParams {
            username: "leo".to_string(),
            first_name: String::new(),
            last_name: String::new(),
        })
        .await
        .expect_err("duplicate user");
    assert!(matches!(err, RepoError::Duplicate { .. }));

    let found = UsersRepo::find_by_username(&repos, "leo")
        .await
        .expect("lookup");
    assert!(found.is_some());

    let params = CreateGroupParams {
        title: "Cats".to_string(),
        slug: "cats".to_string(),
        description: String::new(),
    };
    repos.create_group(params.clone()).await.expect("group");
    let err = repos.create_group(params).await.expect_err("duplicate slug");
    assert!(matches!(err, RepoError::Duplicate { ref constraint } if constraint == "groups_slug_key"));
    assert!(GroupsRepo::find_by_slug(&repos, "cats").await.expect("lookup").is_some());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn listing_indexes_exist(pool: PgPool) {
    let rows: Vec<String> = sqlx::query_scalar(
        "SELECT indexname FROM pg_indexes WHERE schemaname = 'public' \
         AND tablename IN ('posts', 'comments', 'follows')",
    )
    .fetch_all(&pool)
    .await
    .expect("fetch indexes");
    let names: HashSet<String> = rows.into_iter().collect();

    for expected in [
        "posts_pub_date_id_idx",
        "posts_author_pub_date_idx",
        "posts_group_pub_date_idx",
        "comments_post_created_idx",
        "follows_author_idx",
        "follows_user_author_key",
    ] {
        assert!(names.contains(expected), "missing index {expected}");
    }
}
