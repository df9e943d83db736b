use std::sync::Arc;
use std::time::Duration;

use log::debug;
use tokio::sync::{mpsc, watch, Notify};
use tokio::time::sleep;

/// How often the feeder re-checks the page count while it is exhausted.
pub const FEED_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Produces page numbers for the fetch workers.
///
/// Behavior:
/// - Sends `start, start + 1, ...` while they are within the known
///   page count (read from `page_count`, written by the coordinator)
/// - When the next page is beyond the page count it waits for either a
///   page count change, the stop signal, or the poll interval
/// - Returns on `stop`; dropping `pages` closes the channel so the
///   workers drain and exit
///
/// Backpressure comes from the bounded `pages` channel.
pub async fn run_feeder(
    start: i64,
    mut page_count: watch::Receiver<i64>,
    stop: Arc<Notify>,
    pages: mpsc::Sender<i64>,
) {
    let mut next = start;

    loop {
        let known = *page_count.borrow_and_update();

        if next <= known {
            tokio::select! {
                biased;

                _ = stop.notified() => break,

                sent = pages.send(next) => {
                    if sent.is_err() {
                        break;
                    }
                    next += 1;
                }
            }
        } else {
            tokio::select! {
                biased;

                _ = stop.notified() => break,

                changed = page_count.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }

                _ = sleep(FEED_POLL_INTERVAL) => {}
            }
        }
    }

    debug!("[Feeder] stopped after dispatching pages {}..{}", start, next - 1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn feeds_up_to_page_count_then_waits_for_growth() {
        let (count_tx, count_rx) = watch::channel(3);
        let stop = Arc::new(Notify::new());
        let (tx, mut rx) = mpsc::channel(4);

        let feeder = tokio::spawn(run_feeder(2, count_rx, stop.clone(), tx));

        assert_eq!(rx.recv().await, Some(2));
        assert_eq!(rx.recv().await, Some(3));

        // exhausted: nothing more until the count grows
        sleep(Duration::from_millis(350)).await;
        assert!(rx.try_recv().is_err());

        count_tx.send_replace(5);
        assert_eq!(rx.recv().await, Some(4));
        assert_eq!(rx.recv().await, Some(5));

        stop.notify_one();
        feeder.await.unwrap();
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_before_waiting_is_not_lost() {
        let (_count_tx, count_rx) = watch::channel(1);
        let stop = Arc::new(Notify::new());
        let (tx, mut rx) = mpsc::channel(2);

        stop.notify_one();
        let feeder = tokio::spawn(run_feeder(2, count_rx, stop, tx));

        feeder.await.unwrap();
        assert_eq!(rx.recv().await, None);
    }
}
