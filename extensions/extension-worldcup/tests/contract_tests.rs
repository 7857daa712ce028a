//! Contract tests for the World Cup extension.
//!
//! These tests drive the full extension, HTTP gateway included, against a
//! local stub server speaking just enough HTTP/1.1 for the client, and check
//! the replies and errors a host would see through the registry.

use blockpad_extension_core::prelude::*;
use extension_worldcup::{WorldCupConfig, WorldCupExtension};
use serde_json::json;
use std::net::SocketAddr;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

// ============================================================================
// Stub Server Helpers
// ============================================================================

/// Canned status and body the stub serves per endpoint.
#[derive(Clone)]
struct StubRoutes {
    teams: (u16, String),
    matches: (u16, String),
}

/// Start a stub results server and return its address.
async fn start_stub_server(routes: StubRoutes) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind stub server");
    let addr = listener.local_addr().expect("Failed to read stub address");

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut stream, _)) => {
                    let routes = routes.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_stub_connection(&mut stream, routes).await {
                            eprintln!("Stub server error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    eprintln!("Accept error: {}", e);
                    break;
                }
            }
        }
    });

    addr
}

/// Handle a single connection to the stub server.
async fn handle_stub_connection(
    stream: &mut TcpStream,
    routes: StubRoutes,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let (read_half, mut write_half) = stream.split();
    let mut reader = BufReader::new(read_half);

    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;

    // Drain headers until the blank line; these requests carry no body.
    loop {
        let mut header = String::new();
        let n = reader.read_line(&mut header).await?;
        if n == 0 || header == "\r\n" {
            break;
        }
    }

    let path = request_line.split_whitespace().nth(1).unwrap_or("/");
    let (status, body) = if path.starts_with("/teams/results") {
        routes.teams
    } else if path.starts_with("/matches/country") {
        routes.matches
    } else {
        (404, "[]".to_string())
    };

    let reason = match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Error",
    };
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason,
        body.len(),
        body
    );
    write_half.write_all(response.as_bytes()).await?;
    write_half.flush().await?;

    Ok(())
}

fn teams_body() -> String {
    json!([
        {"country": "Brazil", "fifa_code": "BRA", "group_letter": "A", "wins": 3, "points": 9},
        {"country": "Croatia", "fifa_code": "CRO", "group_letter": "A", "wins": 1, "points": 3},
        {"country": "Germany", "fifa_code": "GER", "group_letter": "G", "wins": 2, "points": 7}
    ])
    .to_string()
}

fn matches_body() -> String {
    json!([
        {
            "home_team": {"country": "Brazil", "code": "BRA", "goals": 3},
            "away_team": {"country": "Croatia", "code": "CRO", "goals": 1},
            "winner": "Brazil",
            "datetime": "2014-06-12T17:00:00.000-03:00",
            "status": "completed"
        },
        {
            "home_team": {"country": "Brazil", "code": "BRA", "goals": null},
            "away_team": {"country": "Mexico", "code": "MEX", "goals": null},
            "winner": null,
            "datetime": "2014-06-17T16:00:00.000-03:00",
            "status": "future"
        }
    ])
    .to_string()
}

fn ok_routes() -> StubRoutes {
    StubRoutes {
        teams: (200, teams_body()),
        matches: (200, matches_body()),
    }
}

fn config_for(addr: SocketAddr) -> WorldCupConfig {
    WorldCupConfig {
        base_url: format!("http://{}", addr),
        user_agent: None,
        timeout_secs: 2,
    }
}

fn registry_against(addr: SocketAddr) -> ExtensionRegistry {
    let mut registry = ExtensionRegistry::new();
    registry
        .register(WorldCupExtension::new(config_for(addr)))
        .expect("Failed to register extension");
    registry
}

// ============================================================================
// Lookup Tests
// ============================================================================

#[tokio::test]
async fn test_group_block_end_to_end() {
    let addr = start_stub_server(ok_routes()).await;
    let registry = registry_against(addr);

    let reply = registry
        .invoke("worldcup", "get_group", &["GER".to_string()])
        .await
        .unwrap();

    assert_eq!(reply, Reply::Text("G".to_string()));
}

#[tokio::test]
async fn test_group_block_unknown_code_is_empty() {
    let addr = start_stub_server(ok_routes()).await;
    let registry = registry_against(addr);

    let reply = registry
        .invoke("worldcup", "get_group", &["QAT".to_string()])
        .await
        .unwrap();

    assert_eq!(reply, Reply::Empty);
}

#[tokio::test]
async fn test_match_block_end_to_end() {
    let addr = start_stub_server(ok_routes()).await;
    let registry = registry_against(addr);

    let reply = registry
        .invoke(
            "worldcup",
            "match_result",
            &["Brazil".to_string(), "Croatia".to_string()],
        )
        .await
        .unwrap();

    assert_eq!(reply, Reply::Text("Brazil".to_string()));
}

#[tokio::test]
async fn test_match_block_undecided_is_empty() {
    let addr = start_stub_server(ok_routes()).await;
    let registry = registry_against(addr);

    let reply = registry
        .invoke(
            "worldcup",
            "match_result",
            &["Brazil".to_string(), "Mexico".to_string()],
        )
        .await
        .unwrap();

    assert_eq!(reply, Reply::Empty);
}

// ============================================================================
// Descriptor and Lifecycle Tests
// ============================================================================

#[tokio::test]
async fn test_descriptor_and_status_through_registry() {
    // Descriptor and status never touch the network.
    let mut registry = ExtensionRegistry::new();
    registry
        .register(WorldCupExtension::new(WorldCupConfig::default()))
        .expect("Failed to register extension");

    let descriptor = registry.descriptor_of("worldcup").unwrap();
    assert_eq!(descriptor.display_name, "World Cup");
    assert_eq!(descriptor.blocks.len(), 2);
    assert_eq!(descriptor.menu("countries").unwrap().options.len(), 32);
    assert_eq!(descriptor.menu("codes").unwrap().options.len(), 32);

    let status = registry.status_of("worldcup").unwrap();
    assert!(status.is_ready());
    assert_eq!(status.message, "Ready");
}

#[tokio::test]
async fn test_lifecycle_register_invoke_shutdown() {
    let addr = start_stub_server(ok_routes()).await;
    let mut registry = registry_against(addr);

    assert!(registry.contains("worldcup"));
    let reply = registry
        .invoke("worldcup", "get_group", &["BRA".to_string()])
        .await
        .unwrap();
    assert_eq!(reply, Reply::Text("A".to_string()));

    registry.shutdown_all();
    assert_eq!(registry.count(), 0);

    let err = registry
        .invoke("worldcup", "get_group", &["BRA".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, ExtensionError::ExtensionNotFound(_)));
}

// ============================================================================
// Failure Tests
// ============================================================================

#[tokio::test]
async fn test_server_error_maps_to_upstream() {
    let addr = start_stub_server(StubRoutes {
        teams: (500, "boom".to_string()),
        matches: (500, "boom".to_string()),
    })
    .await;
    let registry = registry_against(addr);

    let err = registry
        .invoke("worldcup", "get_group", &["BRA".to_string()])
        .await
        .unwrap_err();

    assert!(matches!(err, ExtensionError::Upstream(_)));
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn test_malformed_body_maps_to_upstream() {
    let addr = start_stub_server(StubRoutes {
        teams: (200, "not json".to_string()),
        matches: (200, "not json".to_string()),
    })
    .await;
    let registry = registry_against(addr);

    let err = registry
        .invoke("worldcup", "get_group", &["BRA".to_string()])
        .await
        .unwrap_err();

    assert!(matches!(err, ExtensionError::Upstream(_)));
    assert!(err.to_string().contains("Parse error"));
}

#[tokio::test]
async fn test_connection_refused_maps_to_network() {
    // Bind to learn a free port, then close it before the extension connects.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let registry = registry_against(addr);

    let err = registry
        .invoke("worldcup", "get_group", &["BRA".to_string()])
        .await
        .unwrap_err();

    assert!(matches!(err, ExtensionError::Network(_)));
}

#[tokio::test]
async fn test_timeout_maps_to_timeout() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    // Accept connections and go quiet, never answering.
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    tokio::spawn(async move {
                        let _stream = stream;
                        tokio::time::sleep(std::time::Duration::from_secs(30)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    let mut registry = ExtensionRegistry::new();
    let config = WorldCupConfig {
        base_url: format!("http://{}", addr),
        user_agent: None,
        timeout_secs: 1,
    };
    registry
        .register(WorldCupExtension::new(config))
        .expect("Failed to register extension");

    let err = registry
        .invoke("worldcup", "get_group", &["BRA".to_string()])
        .await
        .unwrap_err();

    assert!(matches!(err, ExtensionError::Timeout(1)));
}

#[tokio::test]
async fn test_upstream_failure_leaves_extension_registered() {
    let addr = start_stub_server(StubRoutes {
        teams: (500, "down for maintenance".to_string()),
        matches: (500, "down for maintenance".to_string()),
    })
    .await;
    let registry = registry_against(addr);

    let err = registry
        .invoke("worldcup", "get_group", &["BRA".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, ExtensionError::Upstream(_)));

    // Still registered and still reporting ready for the next block run.
    assert!(registry.contains("worldcup"));
    assert!(registry.status_of("worldcup").unwrap().is_ready());
}
