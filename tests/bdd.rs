use std::{fmt, fs::File, net::SocketAddr};

use anyhow::Context;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use cucumber::{gherkin::Step, given, then, when, World as _};
use folio::{
    auth, bootstrap,
    config::AppConfig,
    db::init_pool,
    error::AppError,
    models::project::{NewProject, Project, ProjectPatch},
    routes::create_router,
    services::projects,
    state::AppState,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

#[derive(Debug, cucumber::World, Default)]
struct AppWorld {
    state: Option<TestState>,
    created_project: Option<Project>,
    session_cookies: Vec<String>,
    last_response: Option<HttpSnapshot>,
}

#[derive(Debug)]
struct HttpSnapshot {
    status: StatusCode,
    body: Value,
}

impl AppWorld {
    fn app_state(&self) -> &AppState {
        self.state
            .as_ref()
            .expect("state must be initialised first")
            .app()
    }

    fn router(&self) -> Router {
        self.state
            .as_ref()
            .expect("state must be initialised first")
            .router
            .clone()
    }

    fn snapshot(&self) -> &HttpSnapshot {
        self.last_response
            .as_ref()
            .expect("a request must run first")
    }

    fn created(&self) -> &Project {
        self.created_project
            .as_ref()
            .expect("a project must be created first")
    }
}

struct TestState {
    app: AppState,
    router: Router,
    _root: TempDir,
}

impl fmt::Debug for TestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestState").finish()
    }
}

impl TestState {
    async fn new() -> anyhow::Result<Self> {
        let root = TempDir::new().context("create temp dir for bdd world")?;
        let db_path = root.path().join("bdd.sqlite");
        File::create(&db_path)?;
        let database_url = format!("sqlite://{}", db_path.to_string_lossy());

        let config = AppConfig {
            database_url: database_url.clone(),
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            secret_key: "bdd-cookie-secret".into(),
            debug: false,
        };

        let db = init_pool(&config.database_url).await?;
        bootstrap::ensure_schema(&db).await?;
        bootstrap::seed(&db).await?;

        let app = AppState::new(config, db);
        let router = create_router(app.clone());
        Ok(Self {
            app,
            router,
            _root: root,
        })
    }

    fn app(&self) -> &AppState {
        &self.app
    }
}

#[given("a fresh application state")]
async fn given_fresh_state(world: &mut AppWorld) {
    world.state = Some(TestState::new().await.expect("state"));
    world.created_project = None;
    world.session_cookies.clear();
    world.last_response = None;
}

// --- bootstrap ---

#[when("the bootstrap seeding runs again")]
async fn when_bootstrap_again(world: &mut AppWorld) {
    let db = &world.app_state().db;
    bootstrap::ensure_schema(db).await.expect("schema");
    bootstrap::seed(db).await.expect("seed");
}

#[then(regex = r#"^there is exactly (\d+) user named \"([^\"]+)\"$"#)]
async fn then_user_count(world: &mut AppWorld, expected: i64, username: String) {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ?1")
        .bind(&username)
        .fetch_one(&world.app_state().db)
        .await
        .expect("count users");
    assert_eq!(count, expected);
}

#[then(regex = r"^there are (\d+) projects$")]
async fn then_project_count(world: &mut AppWorld, expected: i64) {
    let count = projects::count(&world.app_state().db)
        .await
        .expect("count projects");
    assert_eq!(count, expected);
}

// --- authentication ---

#[then(regex = r#"^I can authenticate as \"([^\"]+)\" using password \"([^\"]+)\"$"#)]
async fn then_can_authenticate(world: &mut AppWorld, username: String, password: String) {
    let user = auth::authenticate(world.app_state(), &username, &password)
        .await
        .expect("authentication");
    assert_eq!(user.username, username);
}

#[when(regex = r#"^I fail to authenticate as \"([^\"]+)\" using password \"([^\"]+)\"$"#)]
async fn when_fail_authenticate(world: &mut AppWorld, username: String, password: String) {
    let result = auth::authenticate(world.app_state(), &username, &password).await;
    assert!(matches!(result, Err(AppError::BadCredentials)));
}

#[then(regex = r#"^the last login timestamp for \"([^\"]+)\" is (set|empty)$"#)]
async fn then_last_login(world: &mut AppWorld, username: String, expectation: String) {
    let user = folio::services::users::find_by_username(&world.app_state().db, &username)
        .await
        .expect("query user")
        .expect("user exists");
    match expectation.as_str() {
        "set" => assert!(user.last_login.is_some()),
        _ => assert!(user.last_login.is_none()),
    }
}

// --- project repository ---

#[when(regex = r#"^I create a project titled \"([^\"]+)\" described as \"([^\"]+)\"$"#)]
async fn when_create_project(world: &mut AppWorld, title: String, description: String) {
    let new = NewProject {
        title,
        description,
        link: None,
        image: None,
        category: None,
    };
    let project = projects::create(&world.app_state().db, &new)
        .await
        .expect("create project");
    world.created_project = Some(project);
}

#[then(regex = r#"^fetching that project returns title \"([^\"]+)\" and description \"([^\"]+)\"$"#)]
async fn then_fetch_project(world: &mut AppWorld, title: String, description: String) {
    let id = world.created().id;
    let project = projects::get(&world.app_state().db, id)
        .await
        .expect("get project")
        .expect("project exists");
    assert_eq!(project.title, title);
    assert_eq!(project.description, description);
}

#[then(regex = r#"^that project has link \"([^\"]+)\" and category \"([^\"]+)\"$"#)]
async fn then_project_defaults(world: &mut AppWorld, link: String, category: String) {
    let id = world.created().id;
    let project = projects::get(&world.app_state().db, id)
        .await
        .expect("get project")
        .expect("project exists");
    assert_eq!(project.link, link);
    assert_eq!(project.category, category);
}

#[when(regex = r#"^I update only the title of that project to \"([^\"]+)\"$"#)]
async fn when_update_title(world: &mut AppWorld, title: String) {
    let id = world.created().id;
    let patch = ProjectPatch {
        title: Some(title),
        ..Default::default()
    };
    projects::update(&world.app_state().db, id, &patch)
        .await
        .expect("update project");
}

#[then(regex = r"^deleting project (\d+) reports not found$")]
async fn then_delete_missing(world: &mut AppWorld, id: i64) {
    let result = projects::delete(&world.app_state().db, id).await;
    assert!(matches!(result, Err(AppError::NotFound("project"))));
}

#[then(regex = r#"^creating a project titled \"([^\"]*)\" described as \"([^\"]*)\" is rejected$"#)]
async fn then_create_rejected(world: &mut AppWorld, title: String, description: String) {
    let new = NewProject {
        title,
        description,
        link: None,
        image: None,
        category: None,
    };
    let result = projects::create(&world.app_state().db, &new).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

// --- HTTP layer ---

#[when(regex = r#"^I GET \"([^\"]+)\"$"#)]
async fn when_get(world: &mut AppWorld, path: String) {
    perform_request(world, Method::GET, &path, None).await;
}

#[when(regex = r#"^I POST \"([^\"]+)\"$"#)]
async fn when_post_empty(world: &mut AppWorld, path: String) {
    perform_request(world, Method::POST, &path, None).await;
}

#[when(regex = r#"^I POST \"([^\"]+)\" with body:$"#)]
async fn when_post_body(world: &mut AppWorld, step: &Step, path: String) {
    let body = step.docstring.clone().expect("docstring body");
    perform_request(world, Method::POST, &path, Some(body)).await;
}

#[when(regex = r#"^I PUT \"([^\"]+)\" with body:$"#)]
async fn when_put_body(world: &mut AppWorld, step: &Step, path: String) {
    let body = step.docstring.clone().expect("docstring body");
    perform_request(world, Method::PUT, &path, Some(body)).await;
}

#[when(regex = r#"^I DELETE \"([^\"]+)\"$"#)]
async fn when_delete(world: &mut AppWorld, path: String) {
    perform_request(world, Method::DELETE, &path, None).await;
}

#[then(regex = r#"^the response status is (\d+) and the envelope status is \"(\w+)\"$"#)]
async fn then_response_status(world: &mut AppWorld, status: u16, envelope: String) {
    let snapshot = world.snapshot();
    assert_eq!(snapshot.status.as_u16(), status, "body: {}", snapshot.body);
    assert_eq!(snapshot.body["status"].as_str(), Some(envelope.as_str()));
}

#[then(regex = r#"^the envelope message is \"([^\"]+)\"$"#)]
async fn then_envelope_message(world: &mut AppWorld, message: String) {
    let snapshot = world.snapshot();
    assert_eq!(snapshot.body["message"].as_str(), Some(message.as_str()));
}

#[then(regex = r#"^the envelope \"([^\"]+)\" has field \"([^\"]+)\" equal to \"([^\"]+)\"$"#)]
async fn then_envelope_payload_field(
    world: &mut AppWorld,
    payload: String,
    field: String,
    expected: String,
) {
    let snapshot = world.snapshot();
    assert_eq!(
        snapshot.body[&payload][&field].as_str(),
        Some(expected.as_str()),
        "body: {}",
        snapshot.body
    );
}

#[then(regex = r#"^the envelope field \"([^\"]+)\" is (true|false)$"#)]
async fn then_envelope_bool(world: &mut AppWorld, field: String, expected: String) {
    let snapshot = world.snapshot();
    assert_eq!(
        snapshot.body[&field].as_bool(),
        Some(expected == "true"),
        "body: {}",
        snapshot.body
    );
}

#[then("the response sets a session cookie")]
async fn then_session_cookie(world: &mut AppWorld) {
    assert!(!world.session_cookies.is_empty());
}

#[then(regex = r"^the dashboard stats report (\d+) projects and (\d+) visits$")]
async fn then_dashboard_stats(world: &mut AppWorld, project_count: i64, total_visits: i64) {
    let snapshot = world.snapshot();
    let stats = &snapshot.body["dashboard"]["stats"];
    assert_eq!(stats["project_count"].as_i64(), Some(project_count));
    assert_eq!(stats["total_visits"].as_i64(), Some(total_visits));
}

async fn perform_request(world: &mut AppWorld, method: Method, path: &str, body: Option<String>) {
    let router = world.router();
    let mut builder = Request::builder().method(method).uri(path);
    if !world.session_cookies.is_empty() {
        builder = builder.header(header::COOKIE, world.session_cookies.join("; "));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json)),
        None => builder.body(Body::empty()),
    }
    .expect("request");

    let response = router.oneshot(request).await.expect("router response");
    let status = response.status();

    let set_cookies: Vec<String> = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .map(str::to_string)
        .collect();
    for cookie in set_cookies {
        // A removal cookie comes back with an empty value.
        match cookie.split_once('=') {
            Some((_, "")) => world.session_cookies.clear(),
            _ => world.session_cookies = vec![cookie],
        }
    }

    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    let value: Value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    world.last_response = Some(HttpSnapshot {
        status,
        body: value,
    });
}

#[tokio::main]
async fn main() {
    AppWorld::cucumber()
        .fail_on_skipped()
        .with_default_cli()
        .run("tests/features")
        .await;
}
