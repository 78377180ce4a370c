mod test_utils;

use logjar::{
    Context, FlushState, LogLevel, Logger, SocketHandler, SocketHandlerBuilder,
    SocketHandlerError, WireRecord,
};
use rstest::rstest;
use serde_json::{Value, json};
use tempfile::NamedTempFile;
use test_utils::HttpSink;

fn parse_lines(body: &str) -> Vec<Value> {
    body.split_terminator("\r\n")
        .map(|line| serde_json::from_str(line).expect("valid JSON line"))
        .collect()
}

#[rstest]
fn logger_ships_records_when_handler_is_dropped() {
    let sink = HttpSink::start();
    let logger = Logger::new();
    logger.push_handler(
        SocketHandlerBuilder::new(sink.address(), 42, "secret")
            .build()
            .expect("connect"),
    );

    logger.alert("disk {disk} failing", [("disk".to_owned(), json!("sda"))].into_iter().collect());
    logger.debug("retrying", Context::new());
    drop(logger.pop_handler());

    let request = sink.next_request().expect("request shipped");
    assert!(request.head.starts_with("POST /channel/42 HTTP/1.1\r\n"));
    assert!(request.head.contains("Authorization: Bearer secret"));
    assert_eq!(request.content_length(), Some(request.body.len()));

    let lines = parse_lines(&request.body_text());
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["level"], "alert");
    assert_eq!(lines[0]["message"], "disk sda failing");
    assert!(lines[0]["timestamp"].is_i64());
    assert_eq!(lines[1]["level"], "debug");
    assert_eq!(lines[1]["message"], "retrying");
}

#[rstest]
fn threshold_limits_what_is_shipped() {
    let sink = HttpSink::start();
    let logger = Logger::new();
    logger.push_handler_with_level(
        SocketHandlerBuilder::new(sink.address(), 1, "t")
            .build()
            .expect("connect"),
        LogLevel::Warning,
    );

    logger.info("chatter", Context::new());
    logger.critical("outage", Context::new());
    drop(logger);

    let request = sink.next_request().expect("request shipped");
    let lines = parse_lines(&request.body_text());
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["message"], "outage");
}

#[rstest]
fn scoped_handler_ships_once() {
    let sink = HttpSink::start();
    let config = SocketHandlerBuilder::new(sink.address(), 7, "t")
        .with_path("/ingest/".into())
        .build_config()
        .expect("config");

    let buffered = SocketHandler::scoped(config, |handler| {
        handler.append_json(&WireRecord {
            level: "alert",
            message: "Line5",
            timestamp: 1000,
        });
        handler.append_json(&WireRecord {
            level: "debug",
            message: "Line6",
            timestamp: 1001,
        });
        Ok::<_, SocketHandlerError>(handler.buffered_len())
    })
    .expect("scoped run");

    let request = sink.next_request().expect("request shipped");
    assert!(request.head.starts_with("POST /ingest/7 HTTP/1.1\r\n"));
    assert_eq!(request.body.len(), buffered);
    assert_eq!(
        request.body_text(),
        "{\"level\":\"alert\",\"message\":\"Line5\",\"timestamp\":1000}\r\n\
         {\"level\":\"debug\",\"message\":\"Line6\",\"timestamp\":1001}\r\n"
    );
    assert!(sink.next_request().is_none());
}

#[rstest]
fn builds_from_ini_file() {
    use std::io::Write;

    let sink = HttpSink::start();
    let mut file = NamedTempFile::new().expect("create temp ini file");
    writeln!(
        file,
        "[socket_handler]\naddress = {}\nchannel = 5\ntoken = from-ini\npoll_timeout_ms = 250",
        sink.address()
    )
    .expect("write ini contents");

    let mut handler = SocketHandlerBuilder::from_ini_file(file.path(), None)
        .and_then(|builder| builder.build())
        .expect("handler from ini");
    handler.append(b"ping\r\n");
    handler.flush().expect("flush");
    assert_eq!(handler.state(), FlushState::Idle);

    let request = sink.next_request().expect("request shipped");
    assert!(request.head.starts_with("POST /channel/5 HTTP/1.1\r\n"));
    assert!(request.head.contains("Authorization: Bearer from-ini"));
    assert_eq!(request.body, b"ping\r\n");
}

#[rstest]
fn refused_connection_is_reported_before_logging() {
    let listener = std::net::TcpListener::bind(("127.0.0.1", 0)).expect("bind");
    let addr = listener.local_addr().expect("address");
    drop(listener);

    let result = SocketHandlerBuilder::new(format!("http://{addr}"), 1, "t").build();
    assert!(matches!(result, Err(SocketHandlerError::Connection(_))));
}
