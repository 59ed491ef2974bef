//! Integration tests for the Consul key-value client against a mock HTTP
//! server.

use anyhow::Result;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;

use strata_config::{ConsulClient, ConsulSettings, StrataError};

/// Connection settings pointing at a mock server.
fn settings_for(server: &ServerGuard) -> ConsulSettings {
    let address = server.host_with_port();
    let (host, port) = address
        .rsplit_once(':')
        .map(|(h, p)| (h.to_owned(), p.parse().unwrap_or(0)))
        .unwrap_or_else(|| (address.clone(), 0));
    ConsulSettings {
        host,
        port,
        scheme: "http".to_owned(),
        token: None,
        datacenter: None,
    }
}

/// A KV record the way Consul serialises it, payload base64-encoded.
fn kv_record(key: &str, value: &str) -> serde_json::Value {
    json!({
        "LockIndex": 0,
        "Key": key,
        "Flags": 0,
        "Value": BASE64.encode(value),
        "CreateIndex": 924,
        "ModifyIndex": 924
    })
}

fn connected_client(server: &ServerGuard) -> Result<ConsulClient> {
    Ok(ConsulClient::connected(Some(settings_for(server)))?)
}

#[test]
fn fetches_and_decodes_a_bare_key() -> Result<()> {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/v1/kv/MY_DUMMY_VAR")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!([kv_record("MY_DUMMY_VAR", "foo")]).to_string())
        .create();

    let client = connected_client(&server)?;
    let value = client.get_raw_value("MY_DUMMY_VAR", None)?;

    assert_eq!(value, Some(b"foo".to_vec()));
    mock.assert();
    Ok(())
}

#[test]
fn namespaces_the_lookup_under_the_path() -> Result<()> {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/v1/kv/my_service/my_variable")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(json!([kv_record("my_service/my_variable", "foo")]).to_string())
        .create();

    let client = connected_client(&server)?;
    let value = client.get_raw_value("my_variable", Some("my_service"))?;

    assert_eq!(value, Some(b"foo".to_vec()));
    mock.assert();
    Ok(())
}

#[test]
fn missing_key_is_absent_not_an_error() -> Result<()> {
    let mut server = Server::new();
    let _mock = server
        .mock("GET", "/v1/kv/NOT_THERE")
        .match_query(Matcher::Any)
        .with_status(404)
        .create();

    let client = connected_client(&server)?;
    assert_eq!(client.get_raw_value("NOT_THERE", None)?, None);
    Ok(())
}

#[test]
fn empty_record_set_is_absent() -> Result<()> {
    let mut server = Server::new();
    let _mock = server
        .mock("GET", "/v1/kv/EMPTY")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("[]")
        .create();

    let client = connected_client(&server)?;
    assert_eq!(client.get_raw_value("EMPTY", None)?, None);
    Ok(())
}

#[test]
fn record_with_null_payload_is_absent() -> Result<()> {
    let mut server = Server::new();
    let _mock = server
        .mock("GET", "/v1/kv/NULL_VALUE")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(json!([{"Key": "NULL_VALUE", "Value": null}]).to_string())
        .create();

    let client = connected_client(&server)?;
    assert_eq!(client.get_raw_value("NULL_VALUE", None)?, None);
    Ok(())
}

#[test]
fn fetch_without_connection_is_an_error() {
    let client = ConsulClient::new();
    let outcome = client.get_raw_value("ANY", None);
    assert!(matches!(outcome, Err(StrataError::UndefinedConnection)));
}

#[test]
fn connection_creation_is_first_call_wins() -> Result<()> {
    let mut server = Server::new();
    let original = settings_for(&server);
    let mut client = ConsulClient::new();
    let first_host = client.create_connection(Some(original))?.host().to_owned();

    let other = ConsulSettings {
        host: "elsewhere".to_owned(),
        ..ConsulSettings::default()
    };
    let second_host = client.create_connection(Some(other))?.host().to_owned();

    assert_eq!(first_host, second_host);

    // The original connection still serves lookups.
    let _mock = server
        .mock("GET", "/v1/kv/STILL_HERE")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(json!([kv_record("STILL_HERE", "yes")]).to_string())
        .create();
    assert_eq!(client.get_raw_value("STILL_HERE", None)?, Some(b"yes".to_vec()));
    Ok(())
}

#[test]
fn token_and_datacenter_travel_as_query_parameters() -> Result<()> {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/v1/kv/SECRET")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("token".into(), "tok123".into()),
            Matcher::UrlEncoded("dc".into(), "mydc".into()),
        ]))
        .with_status(200)
        .with_body(json!([kv_record("SECRET", "s3cr3t")]).to_string())
        .create();

    let settings = ConsulSettings {
        token: Some("tok123".to_owned()),
        datacenter: Some("mydc".to_owned()),
        ..settings_for(&server)
    };
    let client = ConsulClient::connected(Some(settings))?;

    assert_eq!(client.get_raw_value("SECRET", None)?, Some(b"s3cr3t".to_vec()));
    mock.assert();
    Ok(())
}

#[test]
fn unreachable_backend_is_a_transport_error() -> Result<()> {
    // Bind a port, then free it, so the request is refused.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        listener.local_addr()?.port()
    };
    let settings = ConsulSettings {
        host: "127.0.0.1".to_owned(),
        port,
        ..ConsulSettings::default()
    };
    let client = ConsulClient::connected(Some(settings))?;
    let outcome = client.get_raw_value("ANY", None);
    assert!(matches!(outcome, Err(StrataError::Transport { .. })));
    Ok(())
}
