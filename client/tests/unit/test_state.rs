//! Token handling when the backend rejects a submission

use std::sync::Arc;

use mockito::Server;
use openapi_client::{DeploymentCreate, TeamCreate, UserInputVar};
use serde_json::json;

use vmlab::app::options::AppOptions;
use vmlab::app::state::AppState;
use vmlab::authn::token::AccessToken;
use vmlab::authn::token_mngr::TokenManager;
use vmlab::errors::ClientError;
use vmlab::http::deployments::DeploymentCreator;
use vmlab::storage::layout::StorageLayout;

fn request() -> DeploymentCreate {
    DeploymentCreate {
        name: "Lab".to_string(),
        app_id: "a1".to_string(),
        release_tag: "latest".to_string(),
        user_input_var: UserInputVar::default(),
        teams: vec![TeamCreate {
            name: "Team #1".to_string(),
            user_ids: vec!["u1".to_string()],
        }],
    }
}

async fn state_with_token(base_url: &str, layout: &StorageLayout) -> AppState {
    TokenManager::new(Arc::new(layout.token_file()))
        .store(AccessToken::from_raw("tok"))
        .await
        .unwrap();
    let options = AppOptions {
        backend_base_url: base_url.to_string(),
        layout: layout.clone(),
        ..AppOptions::default()
    };
    AppState::init(&options).await.unwrap()
}

#[tokio::test]
async fn test_forbidden_submit_keeps_token_file() {
    let dir = tempfile::tempdir().unwrap();
    let layout = StorageLayout::new(dir.path());
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/deployments")
        .with_status(403)
        .with_body(json!({"detail": "Instructor role required"}).to_string())
        .create_async()
        .await;

    let state = state_with_token(&server.url(), &layout).await;
    let token = state.bearer().await.unwrap();
    let err = state
        .http_client
        .create_deployment(&request(), &token.raw)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Forbidden(_)));

    assert!(!state.handle_rejection(&err).await.unwrap());
    assert!(layout.token_file().exists().await);
    assert!(state.bearer().await.is_ok());
}

#[tokio::test]
async fn test_unauthorized_submit_clears_token_file() {
    let dir = tempfile::tempdir().unwrap();
    let layout = StorageLayout::new(dir.path());
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/deployments")
        .with_status(401)
        .with_body(json!({"detail": "Token expired"}).to_string())
        .create_async()
        .await;

    let state = state_with_token(&server.url(), &layout).await;
    let token = state.bearer().await.unwrap();
    let err = state
        .http_client
        .create_deployment(&request(), &token.raw)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::AuthError(_)));

    assert!(state.handle_rejection(&err).await.unwrap());
    assert!(!layout.token_file().exists().await);
    assert!(matches!(state.bearer().await, Err(ClientError::AuthError(_))));
}

#[tokio::test]
async fn test_other_failures_keep_token_file() {
    let dir = tempfile::tempdir().unwrap();
    let layout = StorageLayout::new(dir.path());
    let state = state_with_token("http://localhost:8000", &layout).await;

    let err = ClientError::TransientFetchError("503 Service Unavailable: down".to_string());
    assert!(!state.handle_rejection(&err).await.unwrap());
    assert!(layout.token_file().exists().await);
}
