// tests/api_tests.rs

use gigmarket::{config::Config, routes, state::AppState};
use sqlx::sqlite::SqlitePoolOptions;

/// Helper function to spawn the app on a random port for testing.
/// Returns the base URL (e.g., "http://127.0.0.1:12345").
async fn spawn_app() -> String {
    // 1. Create a pool. One connection keeps the in-memory database
    //    alive for the lifetime of the test server.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory sqlite");

    // 2. Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    // 3. Create test configuration and state
    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        upload_dir: tempfile::tempdir()
            .expect("Failed to create upload dir")
            .keep()
            .to_string_lossy()
            .into_owned(),
        admin_email: None,
        admin_password: None,
    };

    let state = AppState::new(pool, config);

    // 4. Create the router with the app state
    let app = routes::create_router(state);

    // 5. Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    // 6. Spawn the server in the background
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}

fn unique_email(tag: &str) -> String {
    format!("{}_{}@example.com", tag, &uuid::Uuid::new_v4().to_string()[..8])
}

#[tokio::test]
async fn health_check_404() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    // Act
    let response = client
        .get(&format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn register_works() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let email = unique_email("reg");

    // Act: mixed-case email must be stored lowercase
    let response = client
        .post(&format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "name": "Test Buyer",
            "email": email.to_uppercase(),
            "password": "password123"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["email"], email);
    assert_eq!(body["role"], "buyer");
    // The password hash must never appear in a response
    assert!(body.get("password").is_none());
}

#[tokio::test]
async fn register_fails_validation() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    // Act: Send a password that is too short
    let response = client
        .post(&format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "name": "Shorty",
            "email": unique_email("short"),
            "password": "pw"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn register_rejects_admin_role() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(&format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "name": "Sneaky",
            "email": unique_email("sneaky"),
            "password": "password123",
            "role": "admin"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn duplicate_email_conflicts() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let email = unique_email("dup");

    let first = client
        .post(&format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "name": "First",
            "email": email,
            "password": "password123"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(first.status().as_u16(), 201);

    // Act: same address again, with different casing
    let second = client
        .post(&format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "name": "Second",
            "email": email.to_uppercase(),
            "password": "password123"
        }))
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(second.status().as_u16(), 409);
}

#[tokio::test]
async fn login_and_me_flow() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let email = unique_email("login");

    client
        .post(&format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "name": "Login User",
            "email": email,
            "password": "password123"
        }))
        .send()
        .await
        .unwrap();

    // 1. Wrong password is rejected
    let bad = client
        .post(&format!("{}/api/auth/login", address))
        .json(&serde_json::json!({"email": email, "password": "wrong-password"}))
        .send()
        .await
        .unwrap();
    assert_eq!(bad.status().as_u16(), 401);

    // 2. Correct credentials return a bearer token
    let login: serde_json::Value = client
        .post(&format!("{}/api/auth/login", address))
        .json(&serde_json::json!({"email": email, "password": "password123"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(login["type"], "Bearer");
    let token = login["token"].as_str().expect("Token not found");

    // 3. /me without a token is unauthorized
    let anon = client
        .get(&format!("{}/api/auth/me", address))
        .send()
        .await
        .unwrap();
    assert_eq!(anon.status().as_u16(), 401);

    // 4. /me with the token returns the account, no seller profile yet
    let me: serde_json::Value = client
        .get(&format!("{}/api/auth/me", address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["email"], email);
    assert!(me["seller"].is_null());
}

#[tokio::test]
async fn login_throttled_after_burst() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let email = unique_email("throttle");

    client
        .post(&format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "name": "Throttled",
            "email": email,
            "password": "password123"
        }))
        .send()
        .await
        .unwrap();

    // Burn through the per-email allowance with bad passwords
    for _ in 0..gigmarket::config::LOGIN_MAX_ATTEMPTS {
        let response = client
            .post(&format!("{}/api/auth/login", address))
            .json(&serde_json::json!({"email": email, "password": "wrong-password"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 401);
    }

    // The next attempt is throttled, even with the right password
    let throttled = client
        .post(&format!("{}/api/auth/login", address))
        .json(&serde_json::json!({"email": email, "password": "password123"}))
        .send()
        .await
        .unwrap();
    assert_eq!(throttled.status().as_u16(), 429);
}

#[tokio::test]
async fn account_update_and_password_change() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let email = unique_email("account");

    client
        .post(&format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "name": "Old Name",
            "email": email,
            "password": "password123"
        }))
        .send()
        .await
        .unwrap();

    let login: serde_json::Value = client
        .post(&format!("{}/api/auth/login", address))
        .json(&serde_json::json!({"email": email, "password": "password123"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let token = login["token"].as_str().unwrap();

    // 1. Rename and set an avatar
    let updated: serde_json::Value = client
        .put(&format!("{}/api/auth/me", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({"name": "New Name", "avatar_url": "/uploads/avatar.png"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(updated["name"], "New Name");
    assert_eq!(updated["avatar_url"], "/uploads/avatar.png");

    // 2. Password change requires the current password
    let wrong = client
        .put(&format!("{}/api/auth/password", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "current_password": "not-the-password",
            "new_password": "password456"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status().as_u16(), 401);

    let right = client
        .put(&format!("{}/api/auth/password", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "current_password": "password123",
            "new_password": "password456"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(right.status().as_u16(), 200);

    // 3. Only the new password logs in now
    let old_login = client
        .post(&format!("{}/api/auth/login", address))
        .json(&serde_json::json!({"email": email, "password": "password123"}))
        .send()
        .await
        .unwrap();
    assert_eq!(old_login.status().as_u16(), 401);

    let new_login = client
        .post(&format!("{}/api/auth/login", address))
        .json(&serde_json::json!({"email": email, "password": "password456"}))
        .send()
        .await
        .unwrap();
    assert_eq!(new_login.status().as_u16(), 200);
}

#[tokio::test]
async fn upload_and_serve_media() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let email = unique_email("upload");

    client
        .post(&format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "name": "Uploader",
            "email": email,
            "password": "password123"
        }))
        .send()
        .await
        .unwrap();
    let login: serde_json::Value = client
        .post(&format!("{}/api/auth/login", address))
        .json(&serde_json::json!({"email": email, "password": "password123"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let token = login["token"].as_str().unwrap();

    // 1. Anonymous uploads are rejected
    let anon_form = reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(vec![1, 2, 3]).file_name("anon.png"),
    );
    let anon = client
        .post(&format!("{}/api/uploads/media", address))
        .multipart(anon_form)
        .send()
        .await
        .unwrap();
    assert_eq!(anon.status().as_u16(), 401);

    // 2. Upload an image and fetch it back through /uploads
    let png_bytes = vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0, 0, 0, 0];
    let form = reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(png_bytes.clone())
            .file_name("photo.png")
            .mime_str("image/png")
            .unwrap(),
    );
    let uploaded: serde_json::Value = client
        .post(&format!("{}/api/uploads/image", address))
        .header("Authorization", format!("Bearer {}", token))
        .multipart(form)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(uploaded["kind"], "image");
    assert_eq!(uploaded["name"], "photo.png");
    let url = uploaded["url"].as_str().unwrap();
    assert!(url.starts_with("/uploads/"));

    let served = client
        .get(&format!("{}{}", address, url))
        .send()
        .await
        .unwrap();
    assert_eq!(served.status().as_u16(), 200);
    assert_eq!(served.bytes().await.unwrap().to_vec(), png_bytes);

    // 3. The image endpoint rejects everything that is not an image
    let text_form = reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(b"just words".to_vec())
            .file_name("notes.txt")
            .mime_str("text/plain")
            .unwrap(),
    );
    let rejected = client
        .post(&format!("{}/api/uploads/image", address))
        .header("Authorization", format!("Bearer {}", token))
        .multipart(text_form)
        .send()
        .await
        .unwrap();
    assert_eq!(rejected.status().as_u16(), 400);

    // 4. The media endpoint takes it and labels it a plain file
    let media_form = reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(b"just words".to_vec())
            .file_name("notes.txt")
            .mime_str("text/plain")
            .unwrap(),
    );
    let media: serde_json::Value = client
        .post(&format!("{}/api/uploads/media", address))
        .header("Authorization", format!("Bearer {}", token))
        .multipart(media_form)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(media["kind"], "file");

    // 5. A multipart body without any file field is a bad request
    let empty_form = reqwest::multipart::Form::new().text("note", "no file here");
    let no_file = client
        .post(&format!("{}/api/uploads/media", address))
        .header("Authorization", format!("Bearer {}", token))
        .multipart(empty_form)
        .send()
        .await
        .unwrap();
    assert_eq!(no_file.status().as_u16(), 400);
}
