use std::{process, sync::Arc, time::Duration};

use axum::http::HeaderName;
use tokio::{sync::watch, try_join};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;
use yatube::{
    application::{
        error::AppError,
        feed::FeedService,
        follows::FollowService,
        posts::PostService,
        repos::{
            CommentsRepo, CreateGroupParams, CreateUserParams, FollowsRepo, GroupsRepo,
            GroupsWriteRepo, HealthRepo, PostsRepo, PostsWriteRepo, RepoError, UsersRepo,
            UsersWriteRepo,
        },
    },
    cache::{CacheConfig, PageCache, SystemClock},
    config,
    domain::{
        entities::{USERNAME_MAX_CHARS, is_valid_username},
        error::DomainError,
        slug::{generate_unique_slug_async, is_valid_slug},
    },
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, AdminState, HttpState, TrustedHeaderAuthenticator},
        telemetry,
    },
};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
        config::Command::Group(args) => match args.command {
            config::GroupCommand::Create(create) => run_group_create(settings, create).await,
        },
        config::Command::User(args) => match args.command {
            config::UserCommand::Create(create) => run_user_create(settings, create).await,
        },
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    PostgresRepositories::run_migrations(repositories.pool())
        .await
        .map_err(|err| AppError::from(InfraError::migration(err.to_string())))?;

    let (http_state, admin_state) = build_application_context(repositories, &settings)?;
    serve_http(&settings, http_state, admin_state).await
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    PostgresRepositories::run_migrations(repositories.pool())
        .await
        .map_err(|err| AppError::from(InfraError::migration(err.to_string())))?;
    info!(target = "yatube::migrate", "migrations applied");
    Ok(())
}

async fn run_group_create(
    settings: config::Settings,
    args: config::GroupCreateArgs,
) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let groups: Arc<dyn GroupsRepo> = repositories.clone();
    let groups_write: Arc<dyn GroupsWriteRepo> = repositories;

    let slug = match args.slug {
        Some(slug) if is_valid_slug(&slug) => slug,
        Some(slug) => {
            return Err(DomainError::validation(
                "slug",
                format!("`{slug}` may only contain lowercase letters, digits, `-` and `_`"),
            )
            .into());
        }
        None => generate_unique_slug_async(&args.title, |candidate| {
            let groups = groups.clone();
            let candidate = candidate.to_string();
            async move { Ok::<_, RepoError>(groups.find_by_slug(&candidate).await?.is_none()) }
        })
        .await
        .map_err(|err| AppError::validation(err.to_string()))?,
    };

    let group = groups_write
        .create_group(CreateGroupParams {
            title: args.title.trim().to_string(),
            slug,
            description: args.description,
        })
        .await
        .map_err(|err| repo_error_to_app("group", err))?;

    info!(
        target = "yatube::cli",
        group_id = group.id,
        slug = %group.slug,
        "group created"
    );
    Ok(())
}

async fn run_user_create(
    settings: config::Settings,
    args: config::UserCreateArgs,
) -> Result<(), AppError> {
    let username = args.username.trim();
    if !is_valid_username(username) {
        return Err(DomainError::validation(
            "username",
            format!(
                "`{username}` may only contain letters, digits and `@ . + - _` \
                 (at most {USERNAME_MAX_CHARS} characters)"
            ),
        )
        .into());
    }

    let repositories = init_repositories(&settings).await?;
    let users: Arc<dyn UsersWriteRepo> = repositories;

    let user = users
        .create_user(CreateUserParams {
            username: username.to_string(),
            first_name: args.first_name,
            last_name: args.last_name,
        })
        .await
        .map_err(|err| repo_error_to_app("user", err))?;

    info!(
        target = "yatube::cli",
        user_id = user.id,
        username = %user.username,
        "user created"
    );
    Ok(())
}

fn repo_error_to_app(entity: &str, err: RepoError) -> AppError {
    match err {
        RepoError::Duplicate { constraint } => {
            AppError::validation(format!("{entity} already exists ({constraint})"))
        }
        RepoError::Integrity { message } | RepoError::InvalidInput { message } => {
            AppError::validation(message)
        }
        other => AppError::from(InfraError::database(other.to_string())),
    }
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool =
        PostgresRepositories::connect(database_url, settings.database.max_connections.get())
            .await
            .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

fn build_application_context(
    repositories: Arc<PostgresRepositories>,
    settings: &config::Settings,
) -> Result<(HttpState, AdminState), AppError> {
    let posts_repo: Arc<dyn PostsRepo> = repositories.clone();
    let posts_write_repo: Arc<dyn PostsWriteRepo> = repositories.clone();
    let groups_repo: Arc<dyn GroupsRepo> = repositories.clone();
    let users_repo: Arc<dyn UsersRepo> = repositories.clone();
    let comments_repo: Arc<dyn CommentsRepo> = repositories.clone();
    let follows_repo: Arc<dyn FollowsRepo> = repositories.clone();
    let health_repo: Arc<dyn HealthRepo> = repositories;

    let feed = Arc::new(FeedService::new(
        posts_repo.clone(),
        groups_repo.clone(),
        users_repo.clone(),
        comments_repo.clone(),
        follows_repo.clone(),
    ));
    let posts = Arc::new(PostService::new(
        posts_repo,
        posts_write_repo,
        groups_repo,
        comments_repo,
    ));
    let follows = Arc::new(FollowService::new(users_repo.clone(), follows_repo));

    let user_header = HeaderName::from_bytes(settings.auth.user_header.as_bytes())
        .map_err(|err| InfraError::configuration(format!("auth.user_header: {err}")))?;
    let auth = Arc::new(TrustedHeaderAuthenticator::new(user_header, users_repo));

    let cache = Arc::new(PageCache::new(
        CacheConfig::from(&settings.cache),
        Arc::new(SystemClock),
    ));

    let http_state = HttpState {
        feed,
        posts,
        follows,
        health: health_repo.clone(),
        auth,
        cache: cache.clone(),
        login_path: Arc::from(settings.auth.login_path.as_str()),
        page_size: settings.pagination.page_size.get(),
    };
    let admin_state = AdminState {
        health: health_repo,
        cache,
    };

    Ok((http_state, admin_state))
}

async fn serve_http(
    settings: &config::Settings,
    http_state: HttpState,
    admin_state: AdminState,
) -> Result<(), AppError> {
    let public_router = http::build_router(http_state);
    let admin_router = http::build_admin_router(admin_state);

    let public_listener = tokio::net::TcpListener::bind(settings.server.public_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    let admin_listener = tokio::net::TcpListener::bind(settings.server.admin_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "yatube::serve",
        public = %settings.server.public_addr,
        admin = %settings.server.admin_addr,
        "listening"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let public_server = axum::serve(public_listener, public_router.into_make_service())
        .with_graceful_shutdown(wait_for_shutdown(shutdown_rx.clone()));
    let admin_server = axum::serve(admin_listener, admin_router.into_make_service())
        .with_graceful_shutdown(wait_for_shutdown(shutdown_rx.clone()));

    let grace = settings.server.graceful_shutdown;
    tokio::select! {
        result = async { try_join!(public_server, admin_server) } => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        _ = shutdown_deadline(shutdown_rx, grace) => {
            warn!(
                target = "yatube::serve",
                grace_seconds = grace.as_secs(),
                "graceful shutdown window elapsed, dropping open connections"
            );
        }
    }

    info!(target = "yatube::serve", "server stopped");
    Ok(())
}

async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}

async fn shutdown_deadline(rx: watch::Receiver<bool>, grace: Duration) {
    wait_for_shutdown(rx).await;
    tokio::time::sleep(grace).await;
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = terminate.recv() => {},
                }
            }
            Err(err) => {
                warn!(target = "yatube::serve", error = %err, "SIGTERM handler unavailable");
                ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    ctrl_c().await;

    info!(target = "yatube::serve", "shutdown signal received");
}

async fn ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(target = "yatube::serve", error = %err, "Ctrl+C handler unavailable");
        std::future::pending::<()>().await;
    }
}
