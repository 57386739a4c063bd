use durable_lint::api::Server;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::thread;
use tempfile::tempdir;

fn send(stream: &mut TcpStream, reader: &mut BufReader<TcpStream>, command: &str) -> serde_json::Value {
    stream.write_all(command.as_bytes()).unwrap();
    stream.write_all(b"\n").unwrap();
    let mut response = String::new();
    reader.read_line(&mut response).unwrap();
    serde_json::from_str(&response).unwrap()
}

#[test]
fn test_ipc_server_lifecycle() {
    let server = Server::bind(0, None).unwrap();
    let address = server.local_addr();
    let handle = thread::spawn(move || server.serve());

    let mut stream = TcpStream::connect(address).expect("Failed to connect to server");
    let mut reader = BufReader::new(stream.try_clone().unwrap());

    let pong = send(&mut stream, &mut reader, r#"{"command": "PING"}"#);
    assert_eq!(pong["status"], "success");
    assert_eq!(pong["data"], "PONG");

    let rules = send(&mut stream, &mut reader, r#"{"command": "RULES"}"#);
    let ids: Vec<&str> = rules["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|r| r["id"].as_str())
        .collect();
    assert_eq!(ids, vec!["DF0102", "DF0103"]);

    let missing = send(
        &mut stream,
        &mut reader,
        r#"{"command": "ANALYZE", "params": {"path": "/invalid/path/test"}}"#,
    );
    assert_eq!(missing["status"], "error");
    assert!(missing["message"].as_str().unwrap().contains("not found"));

    let unknown = send(&mut stream, &mut reader, r#"{"command": "FLY"}"#);
    assert_eq!(unknown["status"], "error");

    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("flow.rs"),
        "#[durable_execution]\nasync fn flow(ctx: DurableContext) { uuid::Uuid::new_v4(); }\n",
    )
    .unwrap();
    let request = serde_json::json!({
        "command": "ANALYZE",
        "params": { "path": dir.path().to_string_lossy() }
    });
    let analyzed = send(&mut stream, &mut reader, &request.to_string());
    assert_eq!(analyzed["status"], "success", "{}", analyzed);
    // No manifest, so the framework version is undetermined (DF0001).
    let diagnostics = analyzed["data"]["diagnostics"].as_array().unwrap();
    let ids: Vec<&str> = diagnostics.iter().filter_map(|d| d["rule_id"].as_str()).collect();
    assert_eq!(ids, vec!["DF0001", "DF0102"]);
    assert_eq!(diagnostics[1]["line"], 2);

    let bye = send(&mut stream, &mut reader, r#"{"command": "SHUTDOWN"}"#);
    assert_eq!(bye["status"], "success");

    handle.join().unwrap().unwrap();
}
