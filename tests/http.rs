mod common;

use common::{TestServer, file, get_request, json_body, multipart_request, text};
use http::{Method, StatusCode};
use tower::ServiceExt;

/// Creates the spec's example "Memes" board (laugh.mp3 + boo.mp3, no
/// explicit titles) and returns its JSON.
async fn create_memes_board(server: &TestServer, cookie: &str) -> serde_json::Value {
    let request = multipart_request(
        Method::POST,
        "/soundboards",
        Some(cookie),
        &[
            text("title", "Memes"),
            file("audioFiles", "laugh.mp3", "audio/mpeg", vec![1u8; 5_000]),
            text("audioTitle", ""),
            file("audioFiles", "boo.mp3", "audio/mpeg", vec![2u8; 20_000]),
        ],
    );
    let response = server.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    json_body(response).await
}

#[tokio::test]
async fn create_returns_board_with_filename_titles_and_distinct_ids() {
    let server = TestServer::new();
    let (_, cookie) = server.login_as("alice").await;

    let board = create_memes_board(&server, &cookie).await;
    assert_eq!(board["title"], "Memes");
    let sounds = board["sounds"].as_array().unwrap();
    assert_eq!(sounds.len(), 2);
    assert_eq!(sounds[0]["title"], "laugh.mp3");
    assert_eq!(sounds[1]["title"], "boo.mp3");
    assert_ne!(sounds[0]["unique_id"], sounds[1]["unique_id"]);

    let response = server.app().oneshot(get_request("/soundboards", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let listing = json_body(response).await;
    assert_eq!(listing.as_array().unwrap().len(), 1);
    assert_eq!(listing[0]["title"], "Memes");
}

#[tokio::test]
async fn create_requires_login() {
    let server = TestServer::new();
    let request = multipart_request(
        Method::POST,
        "/soundboards",
        None,
        &[text("title", "Memes")],
    );
    let response = server.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn one_invalid_clip_aborts_the_whole_create() {
    let server = TestServer::new();
    let (_, cookie) = server.login_as("alice").await;

    let request = multipart_request(
        Method::POST,
        "/soundboards",
        Some(&cookie),
        &[
            text("title", "Broken"),
            file("audioFiles", "ok.mp3", "audio/mpeg", vec![0u8; 1_000]),
            file("audioFiles", "cat.png", "image/png", vec![0u8; 1_000]),
        ],
    );
    let response = server.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Nothing was persisted, neither metadata nor blobs.
    let response = server.app().oneshot(get_request("/soundboards", None)).await.unwrap();
    let listing = json_body(response).await;
    assert!(listing.as_array().unwrap().is_empty());
    assert_eq!(server.storage.object_count(), 0);
}

#[tokio::test]
async fn sound_bytes_round_trip_with_stored_content_type() {
    let server = TestServer::new();
    let (_, cookie) = server.login_as("alice").await;

    let payload: Vec<u8> = (0..=255u8).cycle().take(4_096).collect();
    let request = multipart_request(
        Method::POST,
        "/soundboards",
        Some(&cookie),
        &[
            text("title", "RoundTrip"),
            file("audioFiles", "blip.wav", "audio/wav", payload.clone()),
        ],
    );
    let response = server.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let board = json_body(response).await;
    let unique_id = board["sounds"][0]["unique_id"].as_str().unwrap().to_string();

    let response = server
        .app()
        .oneshot(get_request(&format!("/sounds/{unique_id}"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "audio/wav"
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], &payload[..]);
}

#[tokio::test]
async fn fetching_a_missing_sound_is_404() {
    let server = TestServer::new();
    let response = server
        .app()
        .oneshot(get_request("/sounds/doesnotexist", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn edit_deletes_one_clip_and_adds_another() {
    let server = TestServer::new();
    let (_, cookie) = server.login_as("alice").await;
    let board = create_memes_board(&server, &cookie).await;
    let board_id = board["id"].as_str().unwrap().to_string();
    let laugh_id = board["sounds"][0]["id"].as_str().unwrap().to_string();
    let laugh_unique = board["sounds"][0]["unique_id"].as_str().unwrap().to_string();

    let request = multipart_request(
        Method::PUT,
        &format!("/soundboards/{board_id}"),
        Some(&cookie),
        &[
            text("deleteSounds", &laugh_id),
            text("newTitle", "Yay"),
            file("audioFile", "yay.wav", "audio/wav", vec![3u8; 100_000]),
        ],
    );
    let response = server.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let board = json_body(response).await;
    let titles: Vec<_> = board["sounds"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["boo.mp3", "Yay"]);

    // The removed clip's payload is gone too.
    let response = server
        .app()
        .oneshot(get_request(&format!("/sounds/{laugh_unique}"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rename_and_delete_of_the_same_clip_ends_in_deletion() {
    let server = TestServer::new();
    let (_, cookie) = server.login_as("alice").await;
    let board = create_memes_board(&server, &cookie).await;
    let board_id = board["id"].as_str().unwrap().to_string();
    let laugh_id = board["sounds"][0]["id"].as_str().unwrap().to_string();

    let request = multipart_request(
        Method::PUT,
        &format!("/soundboards/{board_id}"),
        Some(&cookie),
        &[
            text(&format!("editTitles[{laugh_id}]"), "Renamed"),
            text("deleteSounds", &laugh_id),
        ],
    );
    let response = server.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let board = json_body(response).await;
    let sounds = board["sounds"].as_array().unwrap();
    assert_eq!(sounds.len(), 1);
    assert_eq!(sounds[0]["title"], "boo.mp3");
}

#[tokio::test]
async fn deleting_an_unknown_clip_id_is_a_no_op() {
    let server = TestServer::new();
    let (_, cookie) = server.login_as("alice").await;
    let board = create_memes_board(&server, &cookie).await;
    let board_id = board["id"].as_str().unwrap().to_string();

    let request = multipart_request(
        Method::PUT,
        &format!("/soundboards/{board_id}"),
        Some(&cookie),
        &[text("deleteSounds", "ffffffff-ffff-ffff-ffff-ffffffffffff")],
    );
    let response = server.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let board = json_body(response).await;
    assert_eq!(board["sounds"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn an_invalid_addition_leaves_the_board_unchanged() {
    let server = TestServer::new();
    let (_, cookie) = server.login_as("alice").await;
    let board = create_memes_board(&server, &cookie).await;
    let board_id = board["id"].as_str().unwrap().to_string();
    let laugh_id = board["sounds"][0]["id"].as_str().unwrap().to_string();

    // The deletion would succeed on its own, but the invalid addition must
    // fail the whole transaction.
    let request = multipart_request(
        Method::PUT,
        &format!("/soundboards/{board_id}"),
        Some(&cookie),
        &[
            text("deleteSounds", &laugh_id),
            file("audioFile", "cat.png", "image/png", vec![0u8; 500]),
        ],
    );
    let response = server.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = server
        .app()
        .oneshot(get_request(&format!("/soundboards/{board_id}"), None))
        .await
        .unwrap();
    let board = json_body(response).await;
    let titles: Vec<_> = board["sounds"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["laugh.mp3", "boo.mp3"]);
}

#[tokio::test]
async fn an_invalid_replacement_leaves_the_board_unchanged() {
    let server = TestServer::new();
    let (_, cookie) = server.login_as("alice").await;
    let board = create_memes_board(&server, &cookie).await;
    let board_id = board["id"].as_str().unwrap().to_string();
    let laugh_id = board["sounds"][0]["id"].as_str().unwrap().to_string();

    let request = multipart_request(
        Method::PUT,
        &format!("/soundboards/{board_id}"),
        Some(&cookie),
        &[file(
            &format!("editSounds[{laugh_id}]"),
            "cat.png",
            "image/png",
            vec![0u8; 500],
        )],
    );
    let response = server.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = server
        .app()
        .oneshot(get_request(&format!("/soundboards/{board_id}"), None))
        .await
        .unwrap();
    let board = json_body(response).await;
    assert_eq!(board["sounds"][0]["filename"], "laugh.mp3");
    assert_eq!(board["sounds"][0]["content_type"], "audio/mpeg");
}

/// Clip tokens are random, so a key collision cannot be provoked through
/// the HTTP surface; this exercises the commit seam directly with a key
/// another clip already owns.
#[tokio::test]
async fn a_clip_key_collision_aborts_the_commit_with_no_partial_state() {
    use soundboard_server::domain::{ClipStorage, SoundboardRepository};
    use soundboard_server::edit::{self, CreateRequest, NewClip, UploadedFile};
    use soundboard_server::errors::{AppError, StorageError};

    let clip = |name: &str| NewClip {
        file: UploadedFile {
            filename: name.to_string(),
            content_type: "audio/mpeg".to_string(),
            bytes: vec![0u8; 100],
        },
        title: None,
    };

    let server = TestServer::new();
    let outcome = edit::build_board(
        uuid::Uuid::new_v4(),
        CreateRequest {
            title: "Collide".to_string(),
            description: None,
            image: None,
            sounds: vec![clip("a.mp3"), clip("b.mp3")],
        },
    )
    .unwrap();
    let board_id = outcome.board.id;
    let first_key = outcome.new_uploads[0].key.clone();
    let second_key = outcome.new_uploads[1].key.clone();

    server
        .storage
        .overwrite(&first_key, vec![9u8; 10], "audio/mpeg")
        .await
        .unwrap();

    let err = edit::commit(&*server.storage, &*server.state.board_repo, outcome, true)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::StorageError(StorageError::AlreadyExists(_))
    ));

    // Neither the aggregate nor the second payload made it in.
    assert!(
        server
            .state
            .board_repo
            .get_by_id(board_id)
            .await
            .unwrap()
            .is_none()
    );
    assert!(!server.storage.has_key(&second_key));
}

#[tokio::test]
async fn only_the_creator_may_edit_or_delete() {
    let server = TestServer::new();
    let (_, alice) = server.login_as("alice").await;
    let (_, mallory) = server.login_as("mallory").await;
    let board = create_memes_board(&server, &alice).await;
    let board_id = board["id"].as_str().unwrap().to_string();

    let request = multipart_request(
        Method::PUT,
        &format!("/soundboards/{board_id}"),
        Some(&mallory),
        &[text("title", "Taken over")],
    );
    let response = server.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let request = http::Request::builder()
        .method(Method::DELETE)
        .uri(format!("/soundboards/{board_id}"))
        .header("cookie", &mallory)
        .body(axum::body::Body::empty())
        .unwrap();
    let response = server.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // The creator still can.
    let request = multipart_request(
        Method::PUT,
        &format!("/soundboards/{board_id}"),
        Some(&alice),
        &[text("title", "Still mine")],
    );
    let response = server.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let board = json_body(response).await;
    assert_eq!(board["title"], "Still mine");
}

#[tokio::test]
async fn deleting_a_board_removes_its_clip_payloads() {
    let server = TestServer::new();
    let (_, cookie) = server.login_as("alice").await;
    let board = create_memes_board(&server, &cookie).await;
    let board_id = board["id"].as_str().unwrap().to_string();

    let request = http::Request::builder()
        .method(Method::DELETE)
        .uri(format!("/soundboards/{board_id}"))
        .header("cookie", &cookie)
        .body(axum::body::Body::empty())
        .unwrap();
    let response = server.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = server
        .app()
        .oneshot(get_request(&format!("/soundboards/{board_id}"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(server.storage.object_count(), 0);
}

#[tokio::test]
async fn fetching_an_unknown_board_is_404_and_a_bad_id_is_400() {
    let server = TestServer::new();
    let response = server
        .app()
        .oneshot(get_request(
            "/soundboards/ffffffff-ffff-ffff-ffff-ffffffffffff",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = server
        .app()
        .oneshot(get_request("/soundboards/not-a-uuid", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_callback_establishes_a_session() {
    let server = TestServer::new();

    let response = server
        .app()
        .oneshot(get_request("/auth/callback?code=code-for-carol", None))
        .await
        .unwrap();
    assert!(response.status().is_redirection());
    let cookie = response
        .headers()
        .get("set-cookie")
        .unwrap()
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();

    let response = server
        .app()
        .oneshot(get_request("/user", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let user = json_body(response).await;
    assert_eq!(user["username"], "carol");
    assert_eq!(user["external_id"], "sub-carol");
}

#[tokio::test]
async fn user_endpoint_returns_null_without_a_session() {
    let server = TestServer::new();
    let response = server.app().oneshot(get_request("/user", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(json_body(response).await.is_null());
}

#[tokio::test]
async fn a_rejected_oauth_code_fails_the_login() {
    let server = TestServer::new();
    let response = server
        .app()
        .oneshot(get_request("/auth/callback?code=bogus", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn cover_image_round_trips_and_missing_cover_is_404() {
    let server = TestServer::new();
    let (_, cookie) = server.login_as("alice").await;

    let png = vec![0x89u8, 0x50, 0x4e, 0x47, 0, 1, 2, 3];
    let request = multipart_request(
        Method::POST,
        "/soundboards",
        Some(&cookie),
        &[
            text("title", "WithCover"),
            file("image", "cover.png", "image/png", png.clone()),
        ],
    );
    let response = server.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let board = json_body(response).await;
    let board_id = board["id"].as_str().unwrap().to_string();

    let response = server
        .app()
        .oneshot(get_request(&format!("/image/{board_id}"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("content-type").unwrap(), "image/png");
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], &png[..]);

    // A board created without a cover has none to serve.
    let bare = create_memes_board(&server, &cookie).await;
    let bare_id = bare["id"].as_str().unwrap();
    let response = server
        .app()
        .oneshot(get_request(&format!("/image/{bare_id}"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn logout_invalidates_the_session() {
    let server = TestServer::new();
    let (_, cookie) = server.login_as("alice").await;

    let response = server
        .app()
        .oneshot(get_request("/logout", Some(&cookie)))
        .await
        .unwrap();
    assert!(response.status().is_redirection());

    let response = server
        .app()
        .oneshot(get_request("/user", Some(&cookie)))
        .await
        .unwrap();
    assert!(json_body(response).await.is_null());
}
