mod common;

use application::query::QueryEngine;
use common::MockDevice;
use domain::{DomainError, Line, Query};
use std::sync::Arc;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(3);

fn line(s: &str) -> Line {
    Line::new(s).unwrap()
}

#[tokio::test]
async fn reply_is_returned_and_delivered() {
    // GIVEN: an engine over a device that answers :VOLT?
    let device = MockDevice::new();
    device.reply(":VOLT?", "12.000");
    let (engine, mut deliveries) = QueryEngine::open(device.transport(), 8).await.unwrap();

    // WHEN: the query is submitted
    let reply = engine.submit(&Query::request(":VOLT?"), TIMEOUT).await.unwrap();

    // THEN: the caller gets the line and the drain side gets the matched pair
    assert_eq!(reply, Some(line("12.000")));
    let exchange = deliveries.try_recv().unwrap();
    assert_eq!(exchange.query_text(), ":VOLT?");
    assert_eq!(exchange.response(), &line("12.000"));
    assert_eq!(device.written(), vec![":VOLT?"]);
}

#[tokio::test]
async fn command_is_fire_and_forget() {
    let device = MockDevice::new();
    let (engine, mut deliveries) = QueryEngine::open(device.transport(), 8).await.unwrap();

    let reply = engine.submit(&Query::command(":OUTP ON"), TIMEOUT).await.unwrap();

    assert_eq!(reply, None);
    assert_eq!(device.written(), vec![":OUTP ON"]);
    assert!(deliveries.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn concurrent_callers_are_paired_in_submission_order() {
    // Each reply is slow, so without the exchange lock writes would interleave
    let device = MockDevice::new();
    let queries = [":OUTP?", ":MEAS:CURR?", ":MEAS:VOLT?", ":CURR?", ":VOLT?"];
    for (i, q) in queries.iter().enumerate() {
        device
            .reply(q, &format!("reply-{}", i))
            .delay(q, Duration::from_millis(100));
    }
    let (engine, mut deliveries) = QueryEngine::open(device.transport(), 8).await.unwrap();
    let engine = Arc::new(engine);

    let mut handles = Vec::new();
    for (i, q) in queries.iter().enumerate() {
        let engine = engine.clone();
        let q = q.to_string();
        handles.push(tokio::spawn(async move {
            let reply = engine.submit(&Query::request(q.clone()), TIMEOUT).await;
            (i, reply)
        }));
    }

    for handle in handles {
        let (i, reply) = handle.await.unwrap();
        assert_eq!(reply.unwrap(), Some(line(&format!("reply-{}", i))));
    }

    // Nth delivered exchange belongs to the Nth written query
    let written = device.written();
    assert_eq!(written.len(), queries.len());
    for query in &written {
        let exchange = deliveries.try_recv().unwrap();
        assert_eq!(exchange.query_text(), query);
    }
}

#[tokio::test(start_paused = true)]
async fn timeout_is_recoverable_and_releases_lock() {
    // GIVEN: a device that never answers :MEAS:VOLT?
    let device = MockDevice::new();
    device.reply(":VOLT?", "5.000");
    let (engine, mut deliveries) = QueryEngine::open(device.transport(), 8).await.unwrap();

    // WHEN: the silent query is submitted
    let started = tokio::time::Instant::now();
    let err = engine
        .submit(&Query::request(":MEAS:VOLT?"), TIMEOUT)
        .await
        .unwrap_err();

    // THEN: QueryTimeout after the full deadline, nothing delivered
    assert_eq!(
        err,
        DomainError::QueryTimeout {
            query: ":MEAS:VOLT?".to_string(),
            timeout_ms: 3000,
        }
    );
    assert!(err.is_recoverable());
    assert!(started.elapsed() >= TIMEOUT);
    assert!(deliveries.try_recv().is_err());

    // AND: the engine still serves the next query
    let reply = engine.submit(&Query::request(":VOLT?"), TIMEOUT).await.unwrap();
    assert_eq!(reply, Some(line("5.000")));
    assert!(!engine.is_closed());
}

#[tokio::test(start_paused = true)]
async fn late_reply_is_not_attributed_to_next_query() {
    // :CURR? answers after 5 s, well past its 3 s deadline
    let device = MockDevice::new();
    device
        .reply(":CURR?", "1.000")
        .delay(":CURR?", Duration::from_secs(5))
        .reply(":VOLT?", "5.000");
    let (engine, mut deliveries) = QueryEngine::open(device.transport(), 8).await.unwrap();

    let err = engine.submit(&Query::request(":CURR?"), TIMEOUT).await.unwrap_err();
    assert!(matches!(err, DomainError::QueryTimeout { .. }));

    // Let the straggler land
    tokio::time::sleep(Duration::from_secs(3)).await;

    let reply = engine.submit(&Query::request(":VOLT?"), TIMEOUT).await.unwrap();
    assert_eq!(reply, Some(line("5.000")));

    let exchange = deliveries.try_recv().unwrap();
    assert_eq!(exchange.query_text(), ":VOLT?");
    assert_eq!(exchange.response(), &line("5.000"));
    assert!(deliveries.try_recv().is_err());
}

#[tokio::test]
async fn unsolicited_line_is_discarded_before_next_query() {
    let device = MockDevice::new();
    device.reply(":OUTP?", "OFF");
    let (engine, _deliveries) = QueryEngine::open(device.transport(), 8).await.unwrap();

    device.push_line("ERR -113");

    let reply = engine.submit(&Query::request(":OUTP?"), TIMEOUT).await.unwrap();
    assert_eq!(reply, Some(line("OFF")));
}

#[tokio::test]
async fn close_releases_pending_caller() {
    // GIVEN: a caller blocked on a reply that never comes
    let device = MockDevice::new();
    let (engine, _deliveries) = QueryEngine::open(device.transport(), 8).await.unwrap();
    let engine = Arc::new(engine);

    let pending = {
        let engine = engine.clone();
        tokio::spawn(async move {
            engine
                .submit(&Query::request(":MEAS:CURR?"), Duration::from_secs(60))
                .await
        })
    };
    while device.written().is_empty() {
        tokio::task::yield_now().await;
    }

    // WHEN: the link is closed
    engine.close().await.unwrap();

    // THEN: the caller fails promptly instead of hanging
    let result = tokio::time::timeout(Duration::from_secs(1), pending)
        .await
        .expect("pending submit must not hang")
        .unwrap();
    assert!(matches!(result, Err(DomainError::Connection(_))));
    assert!(engine.is_closed());
    assert!(!device.is_open());

    // Later submissions fail without touching the link
    let err = engine.submit(&Query::request(":VOLT?"), TIMEOUT).await.unwrap_err();
    assert!(err.is_connection_loss());
    assert_eq!(device.written(), vec![":MEAS:CURR?"]);
}

#[tokio::test]
async fn link_loss_fails_pending_caller_with_reason() {
    let device = MockDevice::new();
    let (engine, _deliveries) = QueryEngine::open(device.transport(), 8).await.unwrap();
    let engine = Arc::new(engine);

    let pending = {
        let engine = engine.clone();
        tokio::spawn(async move {
            engine
                .submit(&Query::request(":VOLT?"), Duration::from_secs(60))
                .await
        })
    };
    while device.written().is_empty() {
        tokio::task::yield_now().await;
    }

    device.lose_link("USB device removed");

    let result = tokio::time::timeout(Duration::from_secs(1), pending)
        .await
        .expect("pending submit must not hang")
        .unwrap();
    assert_eq!(
        result,
        Err(DomainError::Connection("USB device removed".to_string()))
    );
    assert_eq!(engine.lost_reason().as_deref(), Some("USB device removed"));
}

#[tokio::test]
async fn write_failure_closes_link() {
    let device = MockDevice::new();
    let (engine, _deliveries) = QueryEngine::open(device.transport(), 8).await.unwrap();

    device.fail_writes(true);
    let err = engine.submit(&Query::command(":VOLT 1.000"), TIMEOUT).await.unwrap_err();

    assert!(err.is_connection_loss());
    assert!(engine.is_closed());
}

#[tokio::test]
async fn full_delivery_queue_drops_newest() {
    let device = MockDevice::new();
    device.reply(":VOLT?", "1.000").reply(":CURR?", "2.000");
    let (engine, mut deliveries) = QueryEngine::open(device.transport(), 1).await.unwrap();

    // Both callers still get their replies
    assert!(engine.submit(&Query::request(":VOLT?"), TIMEOUT).await.unwrap().is_some());
    assert!(engine.submit(&Query::request(":CURR?"), TIMEOUT).await.unwrap().is_some());

    assert_eq!(deliveries.try_recv().unwrap().query_text(), ":VOLT?");
    assert!(deliveries.try_recv().is_err());
}

#[tokio::test]
async fn open_failure_is_connection_error() {
    let device = MockDevice::new();
    device.fail_open(true);

    let result = QueryEngine::open(device.transport(), 8).await;
    assert!(matches!(result, Err(DomainError::Connection(_))));
}
