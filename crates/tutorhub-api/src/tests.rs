//! Engine and router tests against an in-memory SQLite store.

use std::{
  collections::HashMap,
  io,
  sync::{Arc, Mutex},
};

use axum::{
  body::Body,
  http::{Request, StatusCode, header},
};
use chrono::{DateTime, Duration, Utc};
use serde_json::{Value, json};
use tower::ServiceExt as _;
use tutorhub_core::{
  Error,
  cache::{DetailCache, detail_key},
  course::{Course, CourseFields, CourseInput},
  engine::CourseEngine,
  identity::{Identity, IdentityVerifier},
  notify::Notifier,
  schedule::render_local,
  store::CourseRepository,
  subject::Subject,
  user::Principal,
};
use tutorhub_store_sqlite::SqliteStore;
use uuid::Uuid;

use super::*;

const SECRET: &[u8] = b"test-secret-test-secret-test-secret!";

// ─── Fixtures ────────────────────────────────────────────────────────────────

/// Answers tickets from a fixed table.
struct StaticVerifier {
  tickets: HashMap<String, Identity>,
}

impl StaticVerifier {
  fn new(entries: &[(&str, Identity)]) -> Self {
    let tickets = entries
      .iter()
      .map(|(t, id)| ((*t).to_owned(), id.clone()))
      .collect();
    Self { tickets }
  }
}

impl IdentityVerifier for StaticVerifier {
  type Error = io::Error;

  fn login_url(&self) -> String { "https://sso.test/login?service=cb".into() }

  fn logout_url(&self, redirect: Option<&str>) -> String {
    format!("https://sso.test/logout?url={}", redirect.unwrap_or_default())
  }

  async fn verify(&self, ticket: &str) -> Result<Identity, io::Error> {
    self
      .tickets
      .get(ticket)
      .cloned()
      .ok_or_else(|| io::Error::other(format!("internal detail: {ticket}")))
  }
}

/// A cache whose every call fails.
struct BrokenCache;

impl DetailCache for BrokenCache {
  type Error = io::Error;

  async fn get(&self, _: &str) -> Result<Option<String>, io::Error> {
    Err(io::Error::other("cache down"))
  }

  async fn set(&self, _: String, _: String) -> Result<(), io::Error> {
    Err(io::Error::other("cache down"))
  }

  async fn delete(&self, _: &str) -> Result<(), io::Error> {
    Err(io::Error::other("cache down"))
  }
}

#[derive(Default)]
struct Recorder {
  created: Mutex<Vec<Uuid>>,
}

impl Notifier for Recorder {
  fn course_created(&self, course: &Course) {
    self.created.lock().unwrap().push(course.id);
  }
}

fn identity(npm: i64, username: &str, name: &str) -> Identity {
  Identity {
    npm,
    username: username.into(),
    name: name.into(),
    org_code: Some("01.00.12.01".into()),
    faculty: Some("ILMU KOMPUTER".into()),
  }
}

async fn store_with_users() -> Arc<SqliteStore> {
  let store = SqliteStore::open_in_memory().await.unwrap();
  store.upsert_user(&identity(1, "tia", "Tia")).await.unwrap();
  store.upsert_user(&identity(2, "sam", "Sam")).await.unwrap();
  store.upsert_user(&identity(3, "rui", "Rui")).await.unwrap();
  store.upsert_user(&identity(9, "ada", "Ada")).await.unwrap();
  store.set_admin(9, true).await.unwrap();
  Arc::new(store)
}

async fn who(store: &SqliteStore, npm: i64) -> Principal {
  store.get_principal(npm).await.unwrap().unwrap()
}

fn engine(store: &Arc<SqliteStore>) -> CourseEngine<SqliteStore, MemoryCache> {
  CourseEngine::new(Arc::clone(store), Arc::new(MemoryCache::new()))
}

fn input(name: &str, at: DateTime<Utc>, capacity: Option<i64>) -> CourseInput {
  CourseInput {
    name: name.into(),
    subject: "ddp".into(),
    scheduled_at: render_local(at),
    capacity,
    link: Some("https://zoom.us/j/1234567890".into()),
    ..CourseInput::default()
  }
}

fn soon() -> DateTime<Utc> { Utc::now() + Duration::hours(1) }

fn conflict_message(err: Error) -> String {
  match err {
    Error::Conflict(m) => m,
    other => panic!("expected conflict, got {other:?}"),
  }
}

// ─── Scenario ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_enroll_full_delete_scenario() {
  let store = store_with_users().await;
  let engine = engine(&store);
  let teacher = who(&store, 1).await;

  let view = engine
    .create(&teacher, input("Recursion", soon(), Some(1)))
    .await
    .unwrap();
  assert_eq!(view.capacity, Some(1));
  assert_eq!(view.subject, "DDP");
  let id: Uuid = view.id.parse().unwrap();

  engine.enroll(id, &who(&store, 2).await).await.unwrap();
  let detail = engine.detail(id, &who(&store, 1).await).await.unwrap();
  assert_eq!(detail.summary.students_count, 1);
  assert_eq!(detail.students, vec!["Sam".to_string()]);

  let err = engine.enroll(id, &who(&store, 3).await).await.unwrap_err();
  assert_eq!(conflict_message(err), "Course is already full.");

  engine.delete(id, &who(&store, 1).await).await.unwrap();
  let err = engine.detail(id, &teacher).await.unwrap_err();
  assert!(matches!(err, Error::NotFound(_)), "{err:?}");
}

#[tokio::test]
async fn concurrent_enrolls_respect_capacity_of_one() {
  let store = store_with_users().await;
  for npm in 100..110 {
    store
      .upsert_user(&identity(npm, &format!("student{npm}"), "Student"))
      .await
      .unwrap();
  }
  let engine = Arc::new(engine(&store));
  let view = engine
    .create(&who(&store, 1).await, input("Race", soon(), Some(1)))
    .await
    .unwrap();
  let id: Uuid = view.id.parse().unwrap();

  let mut handles = Vec::new();
  for npm in 100..110 {
    let engine = Arc::clone(&engine);
    let caller = who(&store, npm).await;
    handles.push(tokio::spawn(async move { engine.enroll(id, &caller).await }));
  }

  let mut successes = 0;
  for handle in handles {
    match handle.await.unwrap() {
      Ok(()) => successes += 1,
      Err(err) => assert_eq!(conflict_message(err), "Course is already full."),
    }
  }

  assert_eq!(successes, 1);
  assert_eq!(store.list_students(id).await.unwrap().len(), 1);
}

// ─── Enrollment rules ────────────────────────────────────────────────────────

#[tokio::test]
async fn teacher_cannot_enroll_in_own_course() {
  let store = store_with_users().await;
  let engine = engine(&store);
  let teacher = who(&store, 1).await;
  let id: Uuid = engine
    .create(&teacher, input("Mine", soon(), None))
    .await
    .unwrap()
    .id
    .parse()
    .unwrap();

  let err = engine.enroll(id, &teacher).await.unwrap_err();
  assert_eq!(conflict_message(err), "You cannot enroll to your own course.");
  assert!(store.list_students(id).await.unwrap().is_empty());
}

#[tokio::test]
async fn started_courses_refuse_enrollment() {
  let store = store_with_users().await;
  let engine = engine(&store);

  let past = store
    .insert_course(1, CourseFields {
      name:         "Yesterday".into(),
      subject:      Subject::Psd,
      scheduled_at: Utc::now() - Duration::hours(1),
      meeting_link: None,
      capacity:     None,
      notes:        None,
      notes_short:  None,
      hidden:       false,
    })
    .await
    .unwrap();

  let err = engine.enroll(past.id, &who(&store, 2).await).await.unwrap_err();
  assert_eq!(conflict_message(err), "Course has already started!");
}

#[tokio::test]
async fn unenroll_twice_fails_the_second_time() {
  let store = store_with_users().await;
  let engine = engine(&store);
  let id: Uuid = engine
    .create(&who(&store, 1).await, input("Twice", soon(), None))
    .await
    .unwrap()
    .id
    .parse()
    .unwrap();
  let student = who(&store, 2).await;

  engine.enroll(id, &student).await.unwrap();
  engine.unenroll(id, &student).await.unwrap();
  let err = engine.unenroll(id, &student).await.unwrap_err();
  assert_eq!(conflict_message(err), "You are not enrolled to this course.");

  let err = engine.unenroll(id, &who(&store, 1).await).await.unwrap_err();
  assert!(matches!(err, Error::Conflict(_)));
}

#[tokio::test]
async fn duplicate_enrollment_is_a_conflict() {
  let store = store_with_users().await;
  let engine = engine(&store);
  let id: Uuid = engine
    .create(&who(&store, 1).await, input("Dup", soon(), None))
    .await
    .unwrap()
    .id
    .parse()
    .unwrap();
  let student = who(&store, 2).await;

  engine.enroll(id, &student).await.unwrap();
  let err = engine.enroll(id, &student).await.unwrap_err();
  assert_eq!(conflict_message(err), "You are already enrolled to this course.");
}

#[tokio::test]
async fn missing_course_is_not_found() {
  let store = store_with_users().await;
  let engine = engine(&store);
  let caller = who(&store, 2).await;
  let id = Uuid::new_v4();

  assert!(matches!(engine.enroll(id, &caller).await, Err(Error::NotFound(_))));
  assert!(matches!(engine.unenroll(id, &caller).await, Err(Error::NotFound(_))));
  assert!(matches!(engine.delete(id, &caller).await, Err(Error::NotFound(_))));
  assert!(matches!(
    engine.update(id, &caller, input("x", soon(), None)).await,
    Err(Error::NotFound(_))
  ));
}

// ─── Create and update rules ─────────────────────────────────────────────────

#[tokio::test]
async fn create_validates_window_and_link() {
  let store = store_with_users().await;
  let engine = engine(&store);
  let teacher = who(&store, 1).await;

  let err = engine
    .create(&teacher, input("Late", Utc::now() + Duration::days(29), None))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Validation(_)), "{err:?}");

  let err = engine
    .create(&teacher, input("Past", Utc::now() - Duration::hours(1), None))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Validation(_)), "{err:?}");

  let mut bad_link = input("Link", soon(), None);
  bad_link.link = Some("https://evil.com/j/1234567890".into());
  let err = engine.create(&teacher, bad_link).await.unwrap_err();
  assert!(matches!(err, Error::Validation(m) if m == "Invalid Meet/Zoom URL."));
}

#[tokio::test]
async fn non_positive_capacity_means_unlimited() {
  let store = store_with_users().await;
  let engine = engine(&store);
  let view = engine
    .create(&who(&store, 1).await, input("Open", soon(), Some(0)))
    .await
    .unwrap();
  assert_eq!(view.capacity, None);
}

#[tokio::test]
async fn teachers_may_hold_two_upcoming_courses() {
  let store = store_with_users().await;
  let engine = engine(&store);
  let teacher = who(&store, 1).await;

  // Courses already in the past do not count.
  store
    .insert_course(1, CourseFields {
      name:         "Old".into(),
      subject:      Subject::Other,
      scheduled_at: Utc::now() - Duration::days(2),
      meeting_link: None,
      capacity:     None,
      notes:        None,
      notes_short:  None,
      hidden:       false,
    })
    .await
    .unwrap();

  engine.create(&teacher, input("One", soon(), None)).await.unwrap();
  engine.create(&teacher, input("Two", soon(), None)).await.unwrap();
  let err = engine
    .create(&teacher, input("Three", soon(), None))
    .await
    .unwrap_err();
  assert_eq!(
    conflict_message(err),
    "You can only have at most 2 upcoming classes."
  );

  // Someone else is unaffected.
  engine
    .create(&who(&store, 2).await, input("Other", soon(), None))
    .await
    .unwrap();
}

#[tokio::test]
async fn concurrent_creates_respect_the_quota() {
  let store = store_with_users().await;
  let engine = Arc::new(engine(&store));
  let teacher = who(&store, 1).await;

  let handles: Vec<_> = (0..8)
    .map(|i| {
      let engine = Arc::clone(&engine);
      let teacher = teacher.clone();
      tokio::spawn(async move {
        engine.create(&teacher, input(&format!("Burst {i}"), soon(), None)).await
      })
    })
    .collect();

  let mut created = 0;
  for handle in handles {
    match handle.await.unwrap() {
      Ok(_) => created += 1,
      Err(err) => assert_eq!(
        conflict_message(err),
        "You can only have at most 2 upcoming classes."
      ),
    }
  }
  assert_eq!(created, 2);
}

#[tokio::test]
async fn update_never_moves_a_course_earlier() {
  let store = store_with_users().await;
  let engine = engine(&store);
  let teacher = who(&store, 1).await;
  let start = Utc::now() + Duration::hours(3);
  let id: Uuid = engine
    .create(&teacher, input("Shift", start, None))
    .await
    .unwrap()
    .id
    .parse()
    .unwrap();

  let err = engine
    .update(id, &teacher, input("Shift", start - Duration::hours(1), None))
    .await
    .unwrap_err();
  assert_eq!(conflict_message(err), "You cannot reopen a class.");

  let same = engine
    .update(id, &teacher, input("Renamed", start, None))
    .await
    .unwrap();
  assert_eq!(same.name, "Renamed");

  let later = start + Duration::hours(2);
  let moved = engine
    .update(id, &teacher, input("Renamed", later, None))
    .await
    .unwrap();
  assert_eq!(moved.scheduled_at, render_local(later));

  let err = engine
    .update(id, &teacher, input("Renamed", Utc::now() + Duration::days(30), None))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Validation(_)), "{err:?}");
}

#[tokio::test]
async fn resubmitting_the_rendered_time_is_not_a_reopen() {
  let store = store_with_users().await;
  let engine = engine(&store);
  let teacher = who(&store, 1).await;

  let mut submitted = input("Precise", Utc::now() + Duration::hours(3), None);
  submitted.scheduled_at = format!("{}.750", submitted.scheduled_at);
  let created = engine.create(&teacher, submitted).await.unwrap();
  let id: Uuid = created.id.parse().unwrap();

  let teacher = who(&store, 1).await;
  let shown = engine.detail(id, &teacher).await.unwrap().summary.scheduled_at;
  assert_eq!(shown, created.scheduled_at);

  let resubmitted = CourseInput {
    scheduled_at: shown.clone(),
    ..input("Precise, renamed", Utc::now(), None)
  };
  let updated = engine.update(id, &teacher, resubmitted).await.unwrap();
  assert_eq!(updated.name, "Precise, renamed");
  assert_eq!(updated.scheduled_at, shown);
}

#[tokio::test]
async fn only_teacher_or_admin_may_mutate() {
  let store = store_with_users().await;
  let engine = engine(&store);
  let id: Uuid = engine
    .create(&who(&store, 1).await, input("Guarded", soon(), None))
    .await
    .unwrap()
    .id
    .parse()
    .unwrap();

  let stranger = who(&store, 2).await;
  let err = engine
    .update(id, &stranger, input("Hijack", soon(), None))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Authorization(_)));
  assert!(matches!(
    engine.delete(id, &stranger).await,
    Err(Error::Authorization(_))
  ));

  let admin = who(&store, 9).await;
  engine
    .update(id, &admin, input("Moderated", soon(), None))
    .await
    .unwrap();
  engine.delete(id, &admin).await.unwrap();
}

#[tokio::test]
async fn notifier_hears_only_successful_creations() {
  let store = store_with_users().await;
  let recorder = Arc::new(Recorder::default());
  let engine = engine(&store).with_notifier(recorder.clone());
  let teacher = who(&store, 1).await;

  let view = engine.create(&teacher, input("Loud", soon(), None)).await.unwrap();
  let _ = engine
    .create(&teacher, input("Bad", Utc::now() - Duration::hours(2), None))
    .await
    .unwrap_err();

  let created = recorder.created.lock().unwrap().clone();
  assert_eq!(created, vec![view.id.parse::<Uuid>().unwrap()]);
}

// ─── Listings ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn hidden_courses_are_only_available_to_admins() {
  let store = store_with_users().await;
  let engine = engine(&store);

  let mut hidden = input("Secret", soon(), None);
  hidden.hidden = true;
  engine.create(&who(&store, 1).await, hidden).await.unwrap();
  engine
    .create(&who(&store, 1).await, input("Public", soon(), None))
    .await
    .unwrap();

  let student = who(&store, 2).await;
  let names: Vec<_> = engine
    .available(&student, 1)
    .await
    .unwrap()
    .into_iter()
    .map(|v| v.name)
    .collect();
  assert_eq!(names, vec!["Public".to_string()]);
  assert_eq!(engine.list(&student, 1).await.unwrap().len(), 2);

  let admin = who(&store, 9).await;
  let admin_view = engine.available(&admin, 1).await.unwrap();
  assert_eq!(admin_view.len(), 2);
  assert!(admin_view.iter().all(|v| v.is_enrolled));
}

#[tokio::test]
async fn mine_and_enrolled_follow_membership() {
  let store = store_with_users().await;
  let engine = engine(&store);
  let id: Uuid = engine
    .create(&who(&store, 1).await, input("Mine", soon(), None))
    .await
    .unwrap()
    .id
    .parse()
    .unwrap();
  engine.enroll(id, &who(&store, 2).await).await.unwrap();

  let teacher = who(&store, 1).await;
  assert_eq!(engine.mine(&teacher, 1).await.unwrap().len(), 1);
  assert!(engine.enrolled(&teacher, 1).await.unwrap().is_empty());

  let student = who(&store, 2).await;
  let enrolled = engine.enrolled(&student, 1).await.unwrap();
  assert_eq!(enrolled.len(), 1);
  assert!(enrolled[0].is_enrolled);
  assert_eq!(enrolled[0].students_count, 1);
  assert!(engine.mine(&student, 1).await.unwrap().is_empty());

  assert!(engine.list(&student, 2).await.unwrap().is_empty());
}

// ─── Detail and cache coherence ──────────────────────────────────────────────

#[tokio::test]
async fn detail_is_members_only() {
  let store = store_with_users().await;
  let engine = engine(&store);
  let id: Uuid = engine
    .create(&who(&store, 1).await, input("Private", soon(), None))
    .await
    .unwrap()
    .id
    .parse()
    .unwrap();

  let err = engine.detail(id, &who(&store, 3).await).await.unwrap_err();
  assert!(matches!(err, Error::Authorization(_)));

  assert!(engine.detail(id, &who(&store, 9).await).await.is_ok());

  let err = engine.detail(Uuid::new_v4(), &who(&store, 3).await).await.unwrap_err();
  assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn mutations_invalidate_cached_detail() {
  let store = store_with_users().await;
  let cache = Arc::new(MemoryCache::new());
  let engine = CourseEngine::new(Arc::clone(&store), Arc::clone(&cache));
  let id: Uuid = engine
    .create(&who(&store, 1).await, input("Cached", soon(), None))
    .await
    .unwrap()
    .id
    .parse()
    .unwrap();
  let key = detail_key(id);

  let teacher = who(&store, 1).await;
  assert_eq!(engine.detail(id, &teacher).await.unwrap().summary.students_count, 0);
  assert!(cache.get(&key).await.unwrap().is_some());

  engine.enroll(id, &who(&store, 2).await).await.unwrap();
  assert!(cache.get(&key).await.unwrap().is_none());
  assert_eq!(engine.detail(id, &teacher).await.unwrap().summary.students_count, 1);

  engine.enroll(id, &who(&store, 3).await).await.unwrap();
  assert_eq!(engine.detail(id, &teacher).await.unwrap().students.len(), 2);

  engine.unenroll(id, &who(&store, 3).await).await.unwrap();
  assert_eq!(engine.detail(id, &teacher).await.unwrap().students.len(), 1);

  engine
    .update(id, &teacher, input("Renamed", soon(), None))
    .await
    .unwrap();
  assert_eq!(engine.detail(id, &teacher).await.unwrap().summary.name, "Renamed");

  engine.delete(id, &teacher).await.unwrap();
  assert!(cache.get(&key).await.unwrap().is_none());
  assert!(matches!(engine.detail(id, &teacher).await, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn cached_detail_is_personalised_per_caller() {
  let store = store_with_users().await;
  let engine = engine(&store);
  let id: Uuid = engine
    .create(&who(&store, 1).await, input("Shared", soon(), None))
    .await
    .unwrap()
    .id
    .parse()
    .unwrap();
  engine.enroll(id, &who(&store, 2).await).await.unwrap();

  // The student populates the cache; the teacher reads the cached copy.
  assert!(engine.detail(id, &who(&store, 2).await).await.unwrap().summary.is_enrolled);
  assert!(!engine.detail(id, &who(&store, 1).await).await.unwrap().summary.is_enrolled);
}

#[tokio::test]
async fn cache_failures_never_fail_requests() {
  let store = store_with_users().await;
  let engine = CourseEngine::new(Arc::clone(&store), Arc::new(BrokenCache));
  let id: Uuid = engine
    .create(&who(&store, 1).await, input("Flaky", soon(), None))
    .await
    .unwrap()
    .id
    .parse()
    .unwrap();

  engine.enroll(id, &who(&store, 2).await).await.unwrap();
  let detail = engine.detail(id, &who(&store, 2).await).await.unwrap();
  assert_eq!(detail.summary.students_count, 1);
  engine.unenroll(id, &who(&store, 2).await).await.unwrap();
  engine.delete(id, &who(&store, 1).await).await.unwrap();
}

// ─── HTTP ────────────────────────────────────────────────────────────────────

async fn app_state(
  allowed_faculty: Option<&str>,
) -> AppState<SqliteStore, MemoryCache, StaticVerifier> {
  let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
  let mut outsider = identity(4, "Law.Student", "Lex");
  outsider.faculty = Some("HUKUM".into());
  let verifier = StaticVerifier::new(&[
    ("ticket-tia", identity(1, "Tia.Teacher", "Tia")),
    ("ticket-sam", identity(2, "sam", "Sam")),
    ("ticket-lex", outsider),
  ]);

  let keys = SessionKeys::new(SECRET, Duration::hours(24)).unwrap();
  let binder = Binder::new(Arc::clone(&store), Arc::new(verifier), keys)
    .with_allowed_faculty(allowed_faculty.map(str::to_owned))
    .with_app_root("/app");
  let engine = CourseEngine::new(store, Arc::new(MemoryCache::new()));

  AppState { engine: Arc::new(engine), binder: Arc::new(binder) }
}

async fn send(
  state: &AppState<SqliteStore, MemoryCache, StaticVerifier>,
  method: &str,
  uri: &str,
  cookie: Option<&str>,
  body: Option<Value>,
) -> axum::response::Response {
  let mut builder = Request::builder().method(method).uri(uri);
  if let Some(cookie) = cookie {
    builder = builder.header(header::COOKIE, cookie);
  }
  let body = match body {
    Some(json) => {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
      Body::from(json.to_string())
    }
    None => Body::empty(),
  };
  router(state.clone())
    .oneshot(builder.body(body).unwrap())
    .await
    .unwrap()
}

async fn json_body(resp: axum::response::Response) -> Value {
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  serde_json::from_slice(&bytes).unwrap()
}

/// Log in through the callback and return the `name=value` cookie pair.
async fn log_in(
  state: &AppState<SqliteStore, MemoryCache, StaticVerifier>,
  ticket: &str,
) -> String {
  let resp = send(state, "GET", &format!("/auth/callback?ticket={ticket}"), None, None).await;
  assert_eq!(resp.status(), StatusCode::SEE_OTHER);
  assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/app");
  let set_cookie = resp.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
  assert!(set_cookie.contains("HttpOnly"), "{set_cookie}");
  assert!(set_cookie.contains("Max-Age=86400"), "{set_cookie}");
  set_cookie.split(';').next().unwrap().to_owned()
}

#[tokio::test]
async fn hello_world() {
  let state = app_state(None).await;
  let resp = send(&state, "GET", "/", None, None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(json_body(resp).await["message"], "Hello world!");
}

#[tokio::test]
async fn login_redirects_to_provider() {
  let state = app_state(None).await;
  let resp = send(&state, "GET", "/auth/login", None, None).await;
  assert_eq!(resp.status(), StatusCode::SEE_OTHER);
  assert_eq!(
    resp.headers().get(header::LOCATION).unwrap(),
    "https://sso.test/login?service=cb"
  );
}

#[tokio::test]
async fn callback_sets_cookie_and_me_reflects_user() {
  let state = app_state(None).await;
  let cookie = log_in(&state, "ticket-tia").await;
  assert!(cookie.starts_with("access-token="), "{cookie}");

  let resp = send(&state, "GET", "/me", Some(&cookie), None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let me = json_body(resp).await;
  assert_eq!(me["npm"], 1);
  assert_eq!(me["username"], "tia.teacher");
  assert_eq!(me["name"], "Tia");
  assert_eq!(me["is_admin"], false);
}

#[tokio::test]
async fn bad_ticket_is_a_generic_authentication_error() {
  let state = app_state(None).await;
  let resp = send(&state, "GET", "/auth/callback?ticket=forged", None, None).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  let body = json_body(resp).await;
  assert_eq!(body["error"], "authentication");
  assert_eq!(body["message"], "Authentication failure. Please try again.");
  assert!(!body.to_string().contains("internal detail"));
}

#[tokio::test]
async fn faculty_gate_refuses_outsiders() {
  let state = app_state(Some("ILMU KOMPUTER")).await;
  let resp = send(&state, "GET", "/auth/callback?ticket=ticket-lex", None, None).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);
  assert!(resp.headers().get(header::SET_COOKIE).is_none());

  log_in(&state, "ticket-sam").await;
}

#[tokio::test]
async fn protected_routes_require_a_valid_session() {
  let state = app_state(None).await;

  let resp = send(&state, "GET", "/course/list", None, None).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  assert_eq!(json_body(resp).await["error"], "authentication");

  let resp = send(&state, "GET", "/course/list", Some("access-token=junk.junk"), None).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

  // A well-signed token for a user that does not exist.
  let keys = SessionKeys::new(SECRET, Duration::hours(24)).unwrap();
  let ghost = format!("{SESSION_COOKIE}={}", keys.mint(777, "ghost").unwrap());
  let resp = send(&state, "GET", "/course/list", Some(&ghost), None).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn course_lifecycle_over_http() {
  let state = app_state(None).await;
  let tia = log_in(&state, "ticket-tia").await;
  let sam = log_in(&state, "ticket-sam").await;

  let body = json!({
    "name": "Discrete Maths Drill",
    "matkul": "matdis",
    "datetime": render_local(soon()),
    "students_limit": 1,
    "link": "https://meet.google.com/abc-defg-hij",
    "notes_short": "bring paper",
  });
  let resp = send(&state, "POST", "/course/create", Some(&tia), Some(body)).await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let created = json_body(resp).await;
  assert_eq!(created["subject"], "MatDis");
  assert_eq!(created["teacher"], "Tia");
  let id = created["id"].as_str().unwrap().to_owned();

  let resp = send(&state, "GET", "/course/mine", Some(&tia), None).await;
  assert_eq!(json_body(resp).await.as_array().unwrap().len(), 1);

  let resp = send(&state, "POST", &format!("/course/{id}/enroll"), Some(&tia), None).await;
  assert_eq!(resp.status(), StatusCode::CONFLICT);

  let resp = send(&state, "POST", &format!("/course/{id}/enroll"), Some(&sam), None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(json_body(resp).await["message"], "Successfully enrolled!");

  let resp = send(&state, "GET", &format!("/course/{id}/detail"), Some(&sam), None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let detail = json_body(resp).await;
  assert_eq!(detail["students"], json!(["Sam"]));
  assert_eq!(detail["is_enrolled"], true);
  assert_eq!(detail["meeting_link"], "https://meet.google.com/abc-defg-hij");

  let resp = send(&state, "GET", "/course/enrolled?page=1", Some(&sam), None).await;
  assert_eq!(json_body(resp).await.as_array().unwrap().len(), 1);

  let resp = send(&state, "DELETE", &format!("/course/{id}/delete"), Some(&sam), None).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);

  let resp = send(&state, "DELETE", &format!("/course/{id}/delete"), Some(&tia), None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(json_body(resp).await["message"], "Course deleted.");

  let resp = send(&state, "GET", &format!("/course/{id}/detail"), Some(&tia), None).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_course_body_is_a_validation_error() {
  let state = app_state(None).await;
  let tia = log_in(&state, "ticket-tia").await;

  let body = json!({
    "name": "Nope",
    "subject": "alchemy",
    "scheduled_at": render_local(soon()),
  });
  let resp = send(&state, "POST", "/course/create", Some(&tia), Some(body)).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  assert_eq!(json_body(resp).await["error"], "validation");
}

#[tokio::test]
async fn malformed_requests_keep_the_error_envelope() {
  let state = app_state(None).await;
  let tia = log_in(&state, "ticket-tia").await;

  let nameless = json!({
    "subject": "ddp",
    "scheduled_at": render_local(soon()),
  });
  let resp = send(&state, "POST", "/course/create", Some(&tia), Some(nameless)).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let body = json_body(resp).await;
  assert_eq!(body["error"], "validation");
  assert!(body["message"].as_str().unwrap().contains("name"), "{body}");

  let resp = send(&state, "GET", "/course/not-a-uuid/detail", Some(&tia), None).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  assert_eq!(json_body(resp).await["error"], "validation");

  let resp = send(&state, "GET", "/course/list?page=-1", Some(&tia), None).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  assert_eq!(json_body(resp).await["error"], "validation");

  let resp = send(&state, "GET", "/auth/callback", None, None).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  assert_eq!(json_body(resp).await["error"], "validation");
}

#[tokio::test]
async fn logout_clears_cookie_and_reports_provider_logout() {
  let state = app_state(None).await;
  let tia = log_in(&state, "ticket-tia").await;

  let resp = send(&state, "GET", "/auth/logout", Some(&tia), None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let set_cookie = resp.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
  assert!(set_cookie.starts_with("access-token=;"), "{set_cookie}");

  let body = json_body(resp).await;
  assert_eq!(body["message"], "Logged out.");
  assert_eq!(body["sso_logout_url"], "https://sso.test/logout?url=/app");
}
