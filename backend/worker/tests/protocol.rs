//! End-to-end capture round trips: popup requester, background capturer and
//! the simulated browser sharing one bus.

use std::sync::Arc;
use std::time::Duration;

use miru_browser::SimulatedBrowser;
use miru_core::{BusMessage, CaptureOutcome, MiruBus, Subscription};
use miru_popup::{Requester, RequesterSettings, View};
use miru_worker::{Capturer, CapturerSettings};

const WAIT: Duration = Duration::from_secs(2);

fn start(browser: Arc<SimulatedBrowser>) -> (MiruBus, Requester, Subscription) {
    let bus = MiruBus::new();
    let observer = bus.subscribe();
    Capturer::new(browser, bus.clone(), CapturerSettings::default()).spawn();
    let popup = Requester::mount(bus.clone(), RequesterSettings::default());
    (bus, popup, observer)
}

/// Every outcome currently buffered on `observer`.
fn outcomes(observer: &mut Subscription) -> Vec<CaptureOutcome> {
    let mut seen = Vec::new();
    while let Some(envelope) = observer.try_recv() {
        if let BusMessage::ScreenshotTaken(outcome) = envelope.message {
            seen.push(outcome);
        }
    }
    seen
}

async fn wait_for_view(popup: &mut Requester) -> View<'_> {
    tokio::time::timeout(WAIT, popup.wait_for_outcome())
        .await
        .expect("outcome within timeout")
        .expect("bus still open")
}

#[tokio::test]
async fn no_active_tab_shows_error_without_image() {
    let browser = Arc::new(SimulatedBrowser::new());
    let (_bus, mut popup, mut observer) = start(browser.clone());

    popup.submit_capture_request();
    let view = wait_for_view(&mut popup).await;

    assert_eq!(
        view,
        View::Error(
            "Could not get active tab for screenshot capture (no active tab found or tab ID missing)."
        )
    );
    assert_eq!(popup.state().pending_image(), None);
    assert_eq!(browser.capture_count(), 0);
    assert_eq!(outcomes(&mut observer).len(), 1);
}

#[tokio::test]
async fn successful_capture_shows_image_without_error() {
    let browser = Arc::new(SimulatedBrowser::with_active_tab(1, 10, "https://example.com"));
    browser.serve_fixed_capture("data:image/png;base64,AAAA");
    let (_bus, mut popup, _observer) = start(browser);

    popup.submit_capture_request();
    let view = wait_for_view(&mut popup).await;

    assert_eq!(view, View::Image("data:image/png;base64,AAAA"));
    assert_eq!(popup.state().pending_error(), None);
}

#[tokio::test]
async fn empty_capture_result_is_reported() {
    let browser = Arc::new(SimulatedBrowser::with_active_tab(1, 10, "https://example.com"));
    browser.return_empty_capture();
    let (_bus, mut popup, mut observer) = start(browser);

    popup.submit_capture_request();
    wait_for_view(&mut popup).await;

    let seen = outcomes(&mut observer);
    assert_eq!(seen.len(), 1);
    assert_eq!(
        seen[0].error.as_deref(),
        Some("captureVisibleTab returned undefined dataUrl")
    );
    assert!(seen[0].data_url.is_none());
}

#[tokio::test]
async fn query_failure_never_calls_capture() {
    let browser = Arc::new(SimulatedBrowser::with_active_tab(1, 10, "https://example.com"));
    browser.fail_tab_query("Extension context invalidated.");
    let (_bus, mut popup, _observer) = start(browser.clone());

    popup.submit_capture_request();
    let view = wait_for_view(&mut popup).await;

    assert_eq!(
        view,
        View::Error("Error querying tabs: Extension context invalidated.")
    );
    assert_eq!(browser.query_count(), 1);
    assert_eq!(browser.capture_count(), 0);
}

#[tokio::test]
async fn out_of_order_outcomes_overwrite_the_newer_one() {
    let browser = Arc::new(SimulatedBrowser::with_active_tab(1, 10, "https://first.example"));
    browser.push_capture_delay(Duration::from_millis(300));
    let (_bus, mut popup, mut observer) = start(browser.clone());

    let first = popup.submit_capture_request();
    while browser.capture_count() < 1 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    // The first capture is already snapshotted; switch tabs for the second.
    browser.open_tab(1, Some(11), "https://second.example");
    let second = popup.submit_capture_request();

    let second_image = match wait_for_view(&mut popup).await {
        View::Image(data_url) => data_url.to_string(),
        other => panic!("expected image, got {:?}", other),
    };
    let first_image = match wait_for_view(&mut popup).await {
        View::Image(data_url) => data_url.to_string(),
        other => panic!("expected image, got {:?}", other),
    };
    assert_ne!(first_image, second_image);
    assert_eq!(popup.view(), View::Image(first_image.as_str()));

    let seen = outcomes(&mut observer);
    let order: Vec<_> = seen.iter().map(|o| o.request_id).collect();
    assert_eq!(order, vec![Some(second), Some(first)]);
}

#[tokio::test]
async fn every_request_gets_exactly_one_outcome() {
    let browser = Arc::new(SimulatedBrowser::with_active_tab(1, 10, "https://example.com"));
    let (_bus, mut popup, mut observer) = start(browser.clone());

    let mut sent = Vec::new();
    for round in 0..6 {
        match round % 3 {
            0 => {
                browser.reset_failures();
                browser.focus(1);
            }
            1 => browser.blur_all(),
            _ => {
                browser.focus(1);
                browser.fail_capture("The tab was closed.");
            }
        }
        sent.push(popup.submit_capture_request());
        wait_for_view(&mut popup).await;
    }

    let mut answered: Vec<_> = outcomes(&mut observer)
        .into_iter()
        .map(|o| {
            assert!(o.data_url.is_some() != o.error.is_some());
            o.request_id.unwrap()
        })
        .collect();
    answered.sort();
    assert_eq!(answered, sent);
}

#[tokio::test]
async fn acknowledgement_reaches_requester() {
    let browser = Arc::new(SimulatedBrowser::with_active_tab(1, 10, "https://example.com"));
    let (_bus, mut popup, _observer) = start(browser);

    let (_, pending) = popup.submit_with_reply();
    let ack = tokio::time::timeout(WAIT, pending.recv())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(ack["status"], "Screenshot capture initiated");
    let preview = ack["dataUrlPreview"].as_str().unwrap();
    assert!(preview.starts_with("data:image/png;base64,"));
    assert!(preview.ends_with("..."));
}

#[tokio::test]
async fn capturer_stops_when_bus_closes() {
    let browser = Arc::new(SimulatedBrowser::new());
    let bus = MiruBus::new();
    let handle = Capturer::new(browser, bus.clone(), CapturerSettings::default()).spawn();

    bus.close();
    let result = tokio::time::timeout(WAIT, handle).await.unwrap().unwrap();
    assert!(result.is_ok());
}
