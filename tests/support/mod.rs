//! In-memory repositories and a router harness for integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{HeaderName, Request, Response, header},
};
use http_body_util::BodyExt;
use time::{Duration, OffsetDateTime};
use tower::ServiceExt;

use yatube::{
    application::{
        feed::FeedService,
        follows::FollowService,
        pagination::PageWindow,
        posts::PostService,
        repos::{
            CommentsRepo, CreateCommentParams, CreateGroupParams, CreatePostParams,
            CreateUserParams, FollowsRepo, GroupsRepo, GroupsWriteRepo, HealthRepo, PostScope,
            PostsRepo, PostsWriteRepo, RepoError, UpdatePostParams, UsersRepo, UsersWriteRepo,
        },
    },
    cache::{CacheConfig, ManualClock, PageCache},
    domain::entities::{
        CommentEntry, CommentRecord, FollowRecord, GroupRecord, PostEntry, PostRecord, UserRecord,
    },
    infra::http::{self, AdminState, HttpState, TrustedHeaderAuthenticator},
};

pub const USER_HEADER: &str = "x-remote-user";

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: Vec<UserRecord>,
    groups: Vec<GroupRecord>,
    posts: Vec<PostRecord>,
    comments: Vec<CommentRecord>,
    follows: Vec<FollowRecord>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn entry(&self, post: &PostRecord) -> Option<PostEntry> {
        let author = self.users.iter().find(|user| user.id == post.author_id)?;
        let group = post
            .group_id
            .and_then(|id| self.groups.iter().find(|group| group.id == id))
            .map(GroupRecord::as_ref);
        Some(PostEntry {
            post: post.clone(),
            author: author.as_author(),
            group,
        })
    }

    fn in_scope(&self, post: &PostRecord, scope: PostScope) -> bool {
        match scope {
            PostScope::All => true,
            PostScope::Group(id) => post.group_id == Some(id),
            PostScope::Author(id) => post.author_id == id,
            PostScope::FollowedBy(user_id) => self
                .follows
                .iter()
                .any(|follow| follow.user_id == user_id && follow.author_id == post.author_id),
        }
    }
}

/// Every repository trait over shared vectors.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().expect("memory store lock")
    }

    pub fn seed_user(&self, username: &str) -> UserRecord {
        let mut tables = self.tables();
        let user = UserRecord {
            id: tables.next_id(),
            username: username.to_string(),
            first_name: String::new(),
            last_name: String::new(),
            created_at: OffsetDateTime::now_utc(),
        };
        tables.users.push(user.clone());
        user
    }

    pub fn seed_group(&self, title: &str, slug: &str) -> GroupRecord {
        let mut tables = self.tables();
        let group = GroupRecord {
            id: tables.next_id(),
            title: title.to_string(),
            slug: slug.to_string(),
            description: format!("About {title}"),
        };
        tables.groups.push(group.clone());
        group
    }

    /// Insert a post; later seeds are newer.
    pub fn seed_post(&self, author_id: i64, text: &str, group_id: Option<i64>) -> PostRecord {
        let mut tables = self.tables();
        let id = tables.next_id();
        let post = PostRecord {
            id,
            text: text.to_string(),
            pub_date: OffsetDateTime::UNIX_EPOCH + Duration::seconds(id),
            author_id,
            group_id,
            image: None,
        };
        tables.posts.push(post.clone());
        post
    }

    pub fn seed_follow(&self, user_id: i64, author_id: i64) {
        let mut tables = self.tables();
        let id = tables.next_id();
        tables.follows.push(FollowRecord {
            id,
            user_id,
            author_id,
        });
    }

    pub fn posts(&self) -> Vec<PostRecord> {
        self.tables().posts.clone()
    }

    pub fn post(&self, id: i64) -> Option<PostRecord> {
        self.tables().posts.iter().find(|post| post.id == id).cloned()
    }

    pub fn comments(&self) -> Vec<CommentRecord> {
        self.tables().comments.clone()
    }

    pub fn follows(&self) -> Vec<FollowRecord> {
        self.tables().follows.clone()
    }
}

#[async_trait]
impl PostsRepo for MemoryStore {
    async fn count_posts(&self, scope: PostScope) -> Result<u64, RepoError> {
        let tables = self.tables();
        Ok(tables
            .posts
            .iter()
            .filter(|post| tables.in_scope(post, scope))
            .count() as u64)
    }

    async fn list_posts(
        &self,
        scope: PostScope,
        window: PageWindow,
    ) -> Result<Vec<PostEntry>, RepoError> {
        let tables = self.tables();
        let mut posts: Vec<&PostRecord> = tables
            .posts
            .iter()
            .filter(|post| tables.in_scope(post, scope))
            .collect();
        posts.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then(b.id.cmp(&a.id)));
        Ok(posts
            .into_iter()
            .skip(window.offset() as usize)
            .take(window.limit() as usize)
            .filter_map(|post| tables.entry(post))
            .collect())
    }

    async fn find_post(&self, id: i64) -> Result<Option<PostEntry>, RepoError> {
        let tables = self.tables();
        Ok(tables
            .posts
            .iter()
            .find(|post| post.id == id)
            .and_then(|post| tables.entry(post)))
    }
}

#[async_trait]
impl PostsWriteRepo for MemoryStore {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let mut tables = self.tables();
        let id = tables.next_id();
        let post = PostRecord {
            id,
            text: params.text,
            pub_date: OffsetDateTime::UNIX_EPOCH + Duration::seconds(id),
            author_id: params.author_id,
            group_id: params.group_id,
            image: params.image,
        };
        tables.posts.push(post.clone());
        Ok(post)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let mut tables = self.tables();
        let post = tables
            .posts
            .iter_mut()
            .find(|post| post.id == params.id)
            .ok_or(RepoError::NotFound)?;
        post.text = params.text;
        post.group_id = params.group_id;
        post.image = params.image;
        Ok(post.clone())
    }
}

#[async_trait]
impl GroupsRepo for MemoryStore {
    async fn list_groups(&self) -> Result<Vec<GroupRecord>, RepoError> {
        let mut groups = self.tables().groups.clone();
        groups.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(groups)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError> {
        Ok(self
            .tables()
            .groups
            .iter()
            .find(|group| group.slug == slug)
            .cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<GroupRecord>, RepoError> {
        Ok(self
            .tables()
            .groups
            .iter()
            .find(|group| group.id == id)
            .cloned())
    }
}

#[async_trait]
impl GroupsWriteRepo for MemoryStore {
    async fn create_group(&self, params: CreateGroupParams) -> Result<GroupRecord, RepoError> {
        let mut tables = self.tables();
        if tables.groups.iter().any(|group| group.slug == params.slug) {
            return Err(RepoError::Duplicate {
                constraint: "groups_slug_key".to_string(),
            });
        }
        let group = GroupRecord {
            id: tables.next_id(),
            title: params.title,
            slug: params.slug,
            description: params.description,
        };
        tables.groups.push(group.clone());
        Ok(group)
    }
}

#[async_trait]
impl UsersRepo for MemoryStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError> {
        Ok(self
            .tables()
            .users
            .iter()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<UserRecord>, RepoError> {
        Ok(self
            .tables()
            .users
            .iter()
            .find(|user| user.id == id)
            .cloned())
    }
}

#[async_trait]
impl UsersWriteRepo for MemoryStore {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let mut tables = self.tables();
        let user = UserRecord {
            id: tables.next_id(),
            username: params.username,
            first_name: params.first_name,
            last_name: params.last_name,
            created_at: OffsetDateTime::now_utc(),
        };
        tables.users.push(user.clone());
        Ok(user)
    }
}

#[async_trait]
impl CommentsRepo for MemoryStore {
    async fn list_for_post(&self, post_id: i64) -> Result<Vec<CommentEntry>, RepoError> {
        let tables = self.tables();
        let mut comments: Vec<CommentEntry> = tables
            .comments
            .iter()
            .filter(|comment| comment.post_id == post_id)
            .filter_map(|comment| {
                let author = tables.users.iter().find(|user| user.id == comment.author_id)?;
                Some(CommentEntry {
                    comment: comment.clone(),
                    author: author.as_author(),
                })
            })
            .collect();
        comments.sort_by(|a, b| {
            a.comment
                .created
                .cmp(&b.comment.created)
                .then(a.comment.id.cmp(&b.comment.id))
        });
        Ok(comments)
    }

    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let mut tables = self.tables();
        let comment = CommentRecord {
            id: tables.next_id(),
            text: params.text,
            created: OffsetDateTime::now_utc(),
            author_id: params.author_id,
            post_id: params.post_id,
        };
        tables.comments.push(comment.clone());
        Ok(comment)
    }
}

#[async_trait]
impl FollowsRepo for MemoryStore {
    async fn follow(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError> {
        let mut tables = self.tables();
        if tables
            .follows
            .iter()
            .any(|follow| follow.user_id == user_id && follow.author_id == author_id)
        {
            return Ok(false);
        }
        let id = tables.next_id();
        tables.follows.push(FollowRecord {
            id,
            user_id,
            author_id,
        });
        Ok(true)
    }

    async fn unfollow(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError> {
        let mut tables = self.tables();
        let before = tables.follows.len();
        tables
            .follows
            .retain(|follow| !(follow.user_id == user_id && follow.author_id == author_id));
        Ok(tables.follows.len() < before)
    }

    async fn is_following(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError> {
        Ok(self
            .tables()
            .follows
            .iter()
            .any(|follow| follow.user_id == user_id && follow.author_id == author_id))
    }
}

#[async_trait]
impl HealthRepo for MemoryStore {
    async fn ping(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

/// Public and admin routers wired to one [`MemoryStore`] and a manual clock.
pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub cache: Arc<PageCache>,
    pub clock: Arc<ManualClock>,
    router: Router,
    admin: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::default());
        let clock = Arc::new(ManualClock::new());
        let cache = Arc::new(PageCache::new(CacheConfig::default(), clock.clone()));

        let feed = Arc::new(FeedService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
        ));
        let posts = Arc::new(PostService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
        ));
        let follows = Arc::new(FollowService::new(store.clone(), store.clone()));
        let auth = Arc::new(TrustedHeaderAuthenticator::new(
            HeaderName::from_static(USER_HEADER),
            store.clone(),
        ));

        let router = http::build_router(HttpState {
            feed,
            posts,
            follows,
            health: store.clone(),
            auth,
            cache: cache.clone(),
            login_path: Arc::from("/auth/login/"),
            page_size: 10,
        });
        let admin = http::build_admin_router(AdminState {
            health: store.clone(),
            cache: cache.clone(),
        });

        Self {
            store,
            cache,
            clock,
            router,
            admin,
        }
    }

    pub async fn get(&self, uri: &str, user: Option<&str>) -> Response<Body> {
        let mut builder = Request::get(uri);
        if let Some(user) = user {
            builder = builder.header(USER_HEADER, user);
        }
        let request = builder.body(Body::empty()).expect("request");
        self.router.clone().oneshot(request).await.expect("response")
    }

    pub async fn post_form(
        &self,
        uri: &str,
        user: Option<&str>,
        fields: &[(&str, &str)],
    ) -> Response<Body> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        let mut builder = Request::post(uri).header(
            header::CONTENT_TYPE,
            "application/x-www-form-urlencoded",
        );
        if let Some(user) = user {
            builder = builder.header(USER_HEADER, user);
        }
        let request = builder.body(Body::from(body)).expect("request");
        self.router.clone().oneshot(request).await.expect("response")
    }

    pub async fn clear_cache(&self) -> Response<Body> {
        let request = Request::post("/_cache/clear")
            .body(Body::empty())
            .expect("request");
        self.admin.clone().oneshot(request).await.expect("response")
    }
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf8 body")
}

pub fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .expect("location header")
}

/// Number of post cards rendered on a listing page.
pub fn post_cards(html: &str) -> usize {
    html.matches("<article class=\"post\"").count()
}
