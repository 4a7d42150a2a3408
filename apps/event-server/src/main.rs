//! event-server: server-rendered event listing and registration site.
//!
//! Public visitors browse events at `/` and register at `/:slug`. The admin
//! area under `/admin` creates and edits events and is gated by a session
//! cookie obtained from `/admin/login`.
//!
//! - Storage: SQLite file (default, `sqlite` feature) or in-memory.
//! - Static files from `STATIC_DIR` are served under `/static`.
//!
//! Run:
//! ```bash
//! ADMIN_PASSWORD=change-me cargo run -p event-server
//!
//! # drop and recreate the tables in DB_PATH
//! ADMIN_PASSWORD=change-me cargo run -p event-server -- reset-db
//! ```
//!
//! Configuration: See `config.rs` for all environment variables.

mod auth;
mod config;
mod views;

use std::any::Any;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use admin_auth::{AuthError, AuthGate, Credentials};
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use domain::adapters::memory_repo::InMemoryRepo;
use domain::service::{EventService, RegistrationService, SubmitError};
use domain::validate::{EventForm, FieldError, RegistrationForm};
use domain::{
    Clock, CoreError, Event, EventInput, EventRepository, Registration, RegistrationInput, Slug,
};
use http_common::{expired_cookie, segment_href, session_cookie};
use serde::Deserialize;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use auth::{session_id, RequireAdmin, SESSION_COOKIE};
use views::FormData;

const CREATE_FAILED: &str = "Could not create event";
const EDIT_FAILED: &str = "Could not update event";
const REGISTER_FAILED: &str = "Could not register you for the event";
const LOGIN_FAILED: &str = "Wrong username or password.";

// Local repo abstraction supporting memory or sqlite (feature-gated).
enum RepoKind {
    Memory(Arc<InMemoryRepo>),
    #[cfg(feature = "sqlite")]
    Sqlite(sqlite_adapter::SqliteRepo),
}

#[derive(Clone)]
struct AnyRepo {
    kind: Arc<RepoKind>,
}

impl AnyRepo {
    fn memory(repo: Arc<InMemoryRepo>) -> Self {
        Self {
            kind: Arc::new(RepoKind::Memory(repo)),
        }
    }

    #[cfg(feature = "sqlite")]
    fn sqlite(repo: sqlite_adapter::SqliteRepo) -> Self {
        Self {
            kind: Arc::new(RepoKind::Sqlite(repo)),
        }
    }
}

impl EventRepository for AnyRepo {
    fn create_event(&self, input: &EventInput, at: SystemTime) -> Result<Event, CoreError> {
        match &*self.kind {
            RepoKind::Memory(r) => r.create_event(input, at),
            #[cfg(feature = "sqlite")]
            RepoKind::Sqlite(r) => r.create_event(input, at),
        }
    }

    fn edit_event(
        &self,
        old_slug: &Slug,
        input: &EventInput,
        at: SystemTime,
    ) -> Result<Event, CoreError> {
        match &*self.kind {
            RepoKind::Memory(r) => r.edit_event(old_slug, input, at),
            #[cfg(feature = "sqlite")]
            RepoKind::Sqlite(r) => r.edit_event(old_slug, input, at),
        }
    }

    fn list_events(&self) -> Result<Vec<Event>, CoreError> {
        match &*self.kind {
            RepoKind::Memory(r) => r.list_events(),
            #[cfg(feature = "sqlite")]
            RepoKind::Sqlite(r) => r.list_events(),
        }
    }

    fn get_event(&self, slug: &Slug) -> Result<Option<Event>, CoreError> {
        match &*self.kind {
            RepoKind::Memory(r) => r.get_event(slug),
            #[cfg(feature = "sqlite")]
            RepoKind::Sqlite(r) => r.get_event(slug),
        }
    }

    fn register_for_event(
        &self,
        input: &RegistrationInput,
        event_id: i64,
        at: SystemTime,
    ) -> Result<Registration, CoreError> {
        match &*self.kind {
            RepoKind::Memory(r) => r.register_for_event(input, event_id, at),
            #[cfg(feature = "sqlite")]
            RepoKind::Sqlite(r) => r.register_for_event(input, event_id, at),
        }
    }

    fn registrations_for_event(&self, event_id: i64) -> Result<Vec<Registration>, CoreError> {
        match &*self.kind {
            RepoKind::Memory(r) => r.registrations_for_event(event_id),
            #[cfg(feature = "sqlite")]
            RepoKind::Sqlite(r) => r.registrations_for_event(event_id),
        }
    }
}

#[derive(Clone)]
struct StdClock;
impl Clock for StdClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

#[derive(Clone)]
struct AppState {
    events: Arc<EventService<AnyRepo, StdClock>>,
    registrations: Arc<RegistrationService<AnyRepo, StdClock>>,
    auth: Arc<AuthGate>,
    clock: StdClock,
}

impl AppState {
    fn new(repo: AnyRepo, auth: AuthGate) -> Self {
        Self {
            events: Arc::new(EventService::new(repo.clone(), StdClock)),
            registrations: Arc::new(RegistrationService::new(repo, StdClock)),
            auth: Arc::new(auth),
            clock: StdClock,
        }
    }

    fn now(&self) -> SystemTime {
        self.clock.now()
    }
}

#[tokio::main]
async fn main() {
    // Load and validate config first (fail fast on misconfiguration)
    let cfg = match config::Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(&cfg);

    if std::env::args().nth(1).as_deref() == Some("reset-db") {
        if let Err(e) = reset_db(&cfg) {
            error!(err = %e, "reset-db failed");
            std::process::exit(1);
        }
        return;
    }

    cfg.warn_if_insecure();

    let repo = match build_repo(&cfg) {
        Ok(r) => r,
        Err(e) => {
            error!(err = %e, path = %cfg.db_path.display(), "failed to open event store");
            std::process::exit(1);
        }
    };
    let gate = AuthGate::new(
        Credentials::new(cfg.admin_username.clone(), cfg.admin_password.clone()),
        cfg.session_ttl,
    );
    let app = app(AppState::new(repo, gate), cfg.static_dir.clone());

    let addr: SocketAddr = ([0, 0, 0, 0], cfg.port).into();
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(%addr, err = %e, "bind failed");
            std::process::exit(1);
        }
    };
    info!(%addr, "event-server listening");
    if let Err(e) = axum::serve(listener, app).await {
        error!(err = %e, "server error");
        std::process::exit(1);
    }
}

fn init_tracing(cfg: &config::Config) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);
    match cfg.log_format {
        config::LogFormat::Json => {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_timer(fmt::time::SystemTime)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
        config::LogFormat::Pretty => {
            registry
                .with(
                    fmt::layer()
                        .pretty()
                        .with_target(true)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
    }
}

// Construct a repository instance based on config and feature flags.
fn build_repo(cfg: &config::Config) -> Result<AnyRepo, CoreError> {
    match cfg.storage_provider {
        #[cfg(feature = "sqlite")]
        config::StorageProvider::Sqlite => Ok(AnyRepo::sqlite(sqlite_adapter::SqliteRepo::open(
            &cfg.db_path,
        )?)),
        #[cfg(not(feature = "sqlite"))]
        config::StorageProvider::Sqlite => {
            tracing::warn!("built without the sqlite feature; using in-memory storage");
            Ok(AnyRepo::memory(Arc::new(InMemoryRepo::new())))
        }
        config::StorageProvider::Memory => Ok(AnyRepo::memory(Arc::new(InMemoryRepo::new()))),
    }
}

#[cfg(feature = "sqlite")]
fn reset_db(cfg: &config::Config) -> Result<(), CoreError> {
    let repo = sqlite_adapter::SqliteRepo::open(&cfg.db_path)?;
    repo.drop_schema()?;
    repo.create_schema()?;
    info!(path = %cfg.db_path.display(), "schema recreated");
    Ok(())
}

#[cfg(not(feature = "sqlite"))]
fn reset_db(_cfg: &config::Config) -> Result<(), CoreError> {
    Err(CoreError::Repository(
        "built without the sqlite feature".into(),
    ))
}

fn app(state: AppState, static_dir: PathBuf) -> Router {
    // Request ID header name
    let x_request_id = axum::http::HeaderName::from_static("x-request-id");

    Router::new()
        .route("/", get(index))
        .route("/admin", get(admin_index).post(create_event))
        .route("/admin/", get(admin_index).post(create_event))
        .route("/admin/login", get(login_form).post(login))
        .route("/admin/logout", get(logout))
        .route("/admin/:slug", get(edit_form).post(apply_edit))
        .route("/:slug", get(show_event).post(register))
        .nest_service("/static", ServeDir::new(static_dir))
        .fallback(not_found)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid))
        .with_state(state)
}

// ============================================================================
// Responses
// ============================================================================

fn html(status: StatusCode, body: String) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        body,
    )
        .into_response()
}

fn not_found_page() -> Response {
    html(StatusCode::NOT_FOUND, views::error_page("Page not found"))
}

fn server_error() -> Response {
    html(
        StatusCode::INTERNAL_SERVER_ERROR,
        views::error_page("Something went wrong"),
    )
}

async fn not_found() -> Response {
    not_found_page()
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(%detail, "handler panicked");
    server_error()
}

// Event plus its registrations, or the response to send instead.
fn load_event(state: &AppState, slug: &str) -> Result<(Event, Vec<Registration>), Response> {
    let event = match state.events.get(slug) {
        Ok(Some(e)) => e,
        Ok(None) => return Err(not_found_page()),
        Err(e) => {
            error!(err = %e, %slug, "event lookup failed");
            return Err(server_error());
        }
    };
    match state.events.registrations(&event) {
        Ok(regs) => Ok((event, regs)),
        Err(e) => {
            error!(err = %e, %slug, "registration lookup failed");
            Err(server_error())
        }
    }
}

fn render_index(
    state: &AppState,
    admin: bool,
    errors: &[FieldError],
    data: &FormData,
) -> Response {
    match state.events.list() {
        Ok(events) => {
            let title = if admin { "Manage events" } else { "Events" };
            html(
                StatusCode::OK,
                views::index_page(title, &events, admin, errors, data),
            )
        }
        Err(e) => {
            error!(err = %e, "listing events failed");
            server_error()
        }
    }
}

// ============================================================================
// Public pages
// ============================================================================

async fn index(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if state
        .auth
        .is_authenticated(session_id(&headers).as_deref(), state.now())
    {
        return Redirect::to("/admin").into_response();
    }
    render_index(&state, false, &[], &FormData::default())
}

async fn show_event(State(state): State<AppState>, Path(slug): Path<String>) -> Response {
    match load_event(&state, &slug) {
        Ok((event, regs)) => html(StatusCode::OK, views::event_page(&event, &regs, &[])),
        Err(resp) => resp,
    }
}

async fn register(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Form(form): Form<RegistrationForm>,
) -> Response {
    let errors = match state.registrations.register(&slug, &form) {
        Ok(reg) => {
            info!(%slug, registration = reg.id, "registration stored");
            return Redirect::to(&segment_href("", &slug)).into_response();
        }
        Err(SubmitError::NotFound) => {
            return (StatusCode::NOT_FOUND, "Error!").into_response();
        }
        Err(SubmitError::Invalid(errors)) => {
            info!(%slug, count = errors.len(), "registration rejected");
            errors
        }
        Err(SubmitError::Store(e)) => {
            error!(err = %e, %slug, "storing registration failed");
            vec![FieldError::general(REGISTER_FAILED)]
        }
    };
    match load_event(&state, &slug) {
        Ok((event, regs)) => html(StatusCode::OK, views::event_page(&event, &regs, &errors)),
        Err(resp) => resp,
    }
}

// ============================================================================
// Admin pages
// ============================================================================

async fn admin_index(_admin: RequireAdmin, State(state): State<AppState>) -> Response {
    render_index(&state, true, &[], &FormData::default())
}

async fn create_event(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Form(form): Form<EventForm>,
) -> Response {
    let errors = match state.events.create(&form) {
        Ok(event) => {
            info!(slug = %event.slug, user = %admin.user.username, "event created");
            return Redirect::to("/admin").into_response();
        }
        Err(SubmitError::Invalid(errors)) => {
            info!(count = errors.len(), "event create rejected");
            errors
        }
        Err(SubmitError::NotFound) => return not_found_page(),
        Err(SubmitError::Store(e)) => {
            error!(err = %e, "creating event failed");
            vec![FieldError::general(CREATE_FAILED)]
        }
    };
    render_index(&state, true, &errors, &FormData::from_raw_event(&form))
}

async fn edit_form(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Response {
    match load_event(&state, &slug) {
        Ok((event, regs)) => {
            let data = FormData::from_event(&event);
            html(StatusCode::OK, views::edit_page(&event, &regs, &[], &data))
        }
        Err(resp) => resp,
    }
}

async fn apply_edit(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Form(form): Form<EventForm>,
) -> Response {
    let errors = match state.events.edit(&slug, &form) {
        Ok(event) => {
            info!(from = %slug, to = %event.slug, user = %admin.user.username, "event updated");
            return Redirect::to("/admin").into_response();
        }
        Err(SubmitError::NotFound) => return not_found_page(),
        Err(SubmitError::Invalid(errors)) => {
            info!(%slug, count = errors.len(), "event edit rejected");
            errors
        }
        Err(SubmitError::Store(e)) => {
            error!(err = %e, %slug, "updating event failed");
            vec![FieldError::general(EDIT_FAILED)]
        }
    };
    render_index(&state, true, &errors, &FormData::from_raw_event(&form))
}

// ============================================================================
// Login / logout
// ============================================================================

#[derive(Deserialize, Default)]
#[serde(default)]
struct LoginForm {
    username: String,
    password: String,
}

async fn login_form(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if state
        .auth
        .is_authenticated(session_id(&headers).as_deref(), state.now())
    {
        return Redirect::to("/admin").into_response();
    }
    html(StatusCode::OK, views::login_page(None))
}

async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Response {
    match state.auth.login(&form.username, &form.password, state.now()) {
        Ok(sid) => {
            info!(user = %form.username, "admin logged in");
            let cookie = session_cookie(SESSION_COOKIE, &sid, state.auth.session_ttl());
            ([(header::SET_COOKIE, cookie)], Redirect::to("/admin")).into_response()
        }
        Err(AuthError::Store) => {
            error!("session store unavailable");
            server_error()
        }
        Err(_) => html(StatusCode::UNAUTHORIZED, views::login_page(Some(LOGIN_FAILED))),
    }
}

async fn logout(admin: RequireAdmin, State(state): State<AppState>) -> Response {
    state.auth.logout(&admin.session_id);
    info!(user = %admin.user.username, "admin logged out");
    (
        [(header::SET_COOKIE, expired_cookie(SESSION_COOKIE))],
        Redirect::to("/"),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use domain::validate::NAME_MESSAGE;
    use std::time::Duration;
    use tower::util::ServiceExt;

    const PASSWORD: &str = "correct horse";

    fn test_app() -> (Router, Arc<InMemoryRepo>) {
        let repo = Arc::new(InMemoryRepo::new());
        let gate = AuthGate::new(
            Credentials::new("admin", PASSWORD),
            Duration::from_secs(60),
        );
        let state = AppState::new(AnyRepo::memory(repo.clone()), gate);
        (app(state, PathBuf::from("./public")), repo)
    }

    fn seed(repo: &InMemoryRepo, name: &str) -> Event {
        repo.create_event(
            &EventInput {
                name: name.into(),
                description: "A party".into(),
            },
            SystemTime::now(),
        )
        .unwrap()
    }

    fn get_req(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(c) = cookie {
            builder = builder.header(header::COOKIE, c);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn post_req(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(c) = cookie {
            builder = builder.header(header::COOKIE, c);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn send(router: &Router, req: Request<Body>) -> Response {
        router.clone().oneshot(req).await.unwrap()
    }

    async fn body_text(resp: Response) -> String {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn location(resp: &Response) -> &str {
        resp.headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
    }

    // Logs in and returns the `sid=...` pair to send back as a Cookie header.
    async fn login_cookie(router: &Router) -> String {
        let resp = send(
            router,
            post_req("/admin/login", "username=admin&password=correct+horse", None),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/admin");
        let set_cookie = resp
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    #[tokio::test]
    async fn public_index_lists_events() {
        let (router, repo) = test_app();
        seed(&repo, "Test event");
        let resp = send(&router, get_req("/", None)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().contains_key("x-request-id"));
        let body = body_text(resp).await;
        assert!(body.contains(r#"href="/test-event""#));
        assert!(!body.contains("<form"));
    }

    #[tokio::test]
    async fn admin_routes_redirect_when_logged_out() {
        let (router, repo) = test_app();
        seed(&repo, "Test event");
        for req in [
            get_req("/admin", None),
            get_req("/admin/test-event", None),
            get_req("/admin/logout", None),
            post_req("/admin/", "name=Sneaky", None),
            get_req("/admin", Some("sid=forged")),
        ] {
            let resp = send(&router, req).await;
            assert_eq!(resp.status(), StatusCode::SEE_OTHER);
            assert_eq!(location(&resp), "/admin/login");
        }
        assert_eq!(repo.list_events().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_login_shows_message() {
        let (router, _) = test_app();
        let resp = send(
            &router,
            post_req("/admin/login", "username=admin&password=nope", None),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert!(resp.headers().get(header::SET_COOKIE).is_none());
        assert!(body_text(resp).await.contains(LOGIN_FAILED));
    }

    #[tokio::test]
    async fn logged_in_admin_skips_login_and_public_index() {
        let (router, _) = test_app();
        let cookie = login_cookie(&router).await;
        let resp = send(&router, get_req("/admin/login", Some(&cookie))).await;
        assert_eq!(location(&resp), "/admin");
        let resp = send(&router, get_req("/", Some(&cookie))).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/admin");
    }

    #[tokio::test]
    async fn create_then_view_event() {
        let (router, _) = test_app();
        let cookie = login_cookie(&router).await;
        let resp = send(
            &router,
            post_req(
                "/admin/",
                "name=Test+event&description=Bring+%3Cfriends%3E",
                Some(&cookie),
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/admin");

        let resp = send(&router, get_req("/test-event", None)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_text(resp).await;
        assert!(body.contains("<title>Test event</title>"));
        assert!(body.contains("Bring &lt;friends&gt;"));
        assert!(!body.contains("<friends>"));
    }

    #[tokio::test]
    async fn invalid_create_rerenders_with_errors_and_input() {
        let (router, repo) = test_app();
        let cookie = login_cookie(&router).await;
        let long_name = "a".repeat(65);
        let resp = send(
            &router,
            post_req(
                "/admin/",
                &format!("name={}&description=kept", long_name),
                Some(&cookie),
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_text(resp).await;
        assert!(body.contains(NAME_MESSAGE));
        assert!(body.contains(&format!(r#"value="{}""#, long_name)));
        assert!(body.contains(">kept</textarea>"));
        assert!(repo.list_events().unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_name_is_a_field_error() {
        let (router, repo) = test_app();
        seed(&repo, "Test event");
        let cookie = login_cookie(&router).await;
        let resp = send(
            &router,
            post_req("/admin/", "name=TEST+EVENT", Some(&cookie)),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_text(resp).await;
        assert!(body.contains(domain::service::NAME_TAKEN_MESSAGE));
        assert_eq!(repo.list_events().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn store_failure_on_create_shows_generic_error() {
        let (router, repo) = test_app();
        let cookie = login_cookie(&router).await;
        repo.set_fail_writes(true);
        let resp = send(
            &router,
            post_req("/admin/", "name=Lost+event", Some(&cookie)),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_text(resp).await;
        assert!(body.contains(CREATE_FAILED));
        assert!(body.contains(r#"value="Lost event""#));
        assert!(repo.list_events().unwrap().is_empty());
    }

    #[tokio::test]
    async fn edit_moves_event_to_new_slug() {
        let (router, repo) = test_app();
        seed(&repo, "Old name");
        let cookie = login_cookie(&router).await;

        let resp = send(&router, get_req("/admin/old-name", Some(&cookie))).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_text(resp).await.contains(r#"value="Old name""#));

        let resp = send(
            &router,
            post_req(
                "/admin/old-name",
                "name=New+name&description=Moved",
                Some(&cookie),
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/admin");

        let resp = send(&router, get_req("/old-name", None)).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let resp = send(&router, get_req("/new-name", None)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_text(resp).await.contains("Moved"));
    }

    #[tokio::test]
    async fn invalid_edit_rerenders_admin_list() {
        let (router, repo) = test_app();
        seed(&repo, "Party");
        seed(&repo, "Other");
        let cookie = login_cookie(&router).await;
        let resp = send(
            &router,
            post_req("/admin/party", "name=&description=x", Some(&cookie)),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_text(resp).await;
        assert!(body.contains("field field--invalid"));
        assert!(body.contains(NAME_MESSAGE));
        assert!(body.contains(r#"href="/admin/other""#));
        assert!(body.contains(r#"action="/admin/""#));
        assert!(body.contains(">x</textarea>"));
        let stored = repo.get_event(&Slug::new("party").unwrap()).unwrap().unwrap();
        assert_eq!(stored.description, "A party");
    }

    #[tokio::test]
    async fn store_failure_on_edit_shows_generic_error() {
        let (router, repo) = test_app();
        seed(&repo, "Party");
        let cookie = login_cookie(&router).await;
        repo.set_fail_writes(true);
        let resp = send(
            &router,
            post_req("/admin/party", "name=Renamed&description=x", Some(&cookie)),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_text(resp).await;
        assert!(body.contains(EDIT_FAILED));
        assert!(body.contains(r#"value="Renamed""#));
        let stored = repo.get_event(&Slug::new("party").unwrap()).unwrap().unwrap();
        assert_eq!(stored.name, "Party");
        assert!(repo.get_event(&Slug::new("renamed").unwrap()).unwrap().is_none());
    }

    #[tokio::test]
    async fn edit_of_unknown_event_is_404() {
        let (router, _) = test_app();
        let cookie = login_cookie(&router).await;
        let resp = send(
            &router,
            post_req("/admin/nope", "name=Whatever", Some(&cookie)),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let resp = send(&router, get_req("/admin/nope", Some(&cookie))).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn registration_redirects_to_event_page() {
        let (router, repo) = test_app();
        let event = seed(&repo, "Test event");
        let resp = send(
            &router,
            post_req("/test-event", "name=J%C3%B3n&comment=See+you", None),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/test-event");

        let regs = repo.registrations_for_event(event.id).unwrap();
        assert_eq!(regs.len(), 1);
        assert_eq!(regs[0].name, "Jón");

        let body = body_text(send(&router, get_req("/test-event", None)).await).await;
        assert!(body.contains("<strong>Jón</strong>"));
        assert!(body.contains("See you"));
    }

    #[tokio::test]
    async fn store_failure_on_registration_shows_generic_error() {
        let (router, repo) = test_app();
        let event = seed(&repo, "Test event");
        repo.set_fail_writes(true);
        let resp = send(&router, post_req("/test-event", "name=Anna", None)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_text(resp).await;
        assert!(body.contains(REGISTER_FAILED));
        assert!(body.contains("<title>Test event</title>"));
        assert!(repo.registrations_for_event(event.id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn registration_for_unknown_event_is_plain_error() {
        let (router, _) = test_app();
        let resp = send(&router, post_req("/nope", "name=Anna", None)).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_text(resp).await, "Error!");
    }

    #[tokio::test]
    async fn invalid_registration_resets_the_form() {
        let (router, repo) = test_app();
        let event = seed(&repo, "Test event");
        let long_comment = "c".repeat(401);
        let resp = send(
            &router,
            post_req(
                "/test-event",
                &format!("name=&comment={}", long_comment),
                None,
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_text(resp).await;
        assert!(body.contains(NAME_MESSAGE));
        assert!(!body.contains(&long_comment));
        assert!(repo.registrations_for_event(event.id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn logout_ends_the_session() {
        let (router, _) = test_app();
        let cookie = login_cookie(&router).await;
        let resp = send(&router, get_req("/admin/logout", Some(&cookie))).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/");
        let cleared = resp
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap();
        assert!(cleared.contains("Max-Age=0"));

        let resp = send(&router, get_req("/admin", Some(&cookie))).await;
        assert_eq!(location(&resp), "/admin/login");
    }

    #[tokio::test]
    async fn unknown_routes_render_404_page() {
        let (router, _) = test_app();
        let resp = send(&router, get_req("/no/such/page", None)).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(body_text(resp).await.contains("Page not found"));
        let resp = send(&router, get_req("/no-such-event", None)).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn store_outage_renders_500_page() {
        let (router, repo) = test_app();
        repo.set_offline(true);
        let resp = send(&router, get_req("/", None)).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_text(resp).await.contains("Something went wrong"));
    }

    #[test]
    fn panic_handler_renders_500_page() {
        let resp = handle_panic(Box::new("boom"));
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
