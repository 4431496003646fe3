//! Page session: a single-page app keeps changing its URL without reloading, so each
//! navigation schedules a fresh pass once the page has settled.
//!
//! Navigations arriving inside the settle window replace the pending one. Each pass parses
//! the page it was handed; nothing from an earlier pass is reused.
//!
//! Driven by the browser host. The HTTP routes take single snapshots through [`extract_page`].

#![allow(dead_code)]

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::{extract_page, PageReport};

/// How long a page must stay on one URL before it is extracted.
pub const SETTLE_DELAY: Duration = Duration::from_millis(1000);

const REPORT_BUFFER: usize = 16;

#[derive(Debug, Clone)]
pub struct Navigation {
    pub url: String,
    pub html: String,
}

#[derive(Debug, thiserror::Error)]
#[error("page session has been torn down")]
pub struct SessionClosed;

/// Owns the background task. Dropping the session stops it; no report is sent afterwards.
pub struct PageSession {
    navigations: mpsc::UnboundedSender<Navigation>,
    task: JoinHandle<()>,
}

impl PageSession {
    pub fn spawn() -> (Self, mpsc::Receiver<PageReport>) {
        Self::with_delay(SETTLE_DELAY)
    }

    pub fn with_delay(delay: Duration) -> (Self, mpsc::Receiver<PageReport>) {
        let (navigations, incoming) = mpsc::unbounded_channel();
        let (reports, outgoing) = mpsc::channel(REPORT_BUFFER);
        let task = tokio::spawn(run_session(incoming, reports, delay));
        (Self { navigations, task }, outgoing)
    }

    pub fn navigate(&self, url: impl Into<String>, html: impl Into<String>) -> Result<(), SessionClosed> {
        self.navigations
            .send(Navigation {
                url: url.into(),
                html: html.into(),
            })
            .map_err(|_| SessionClosed)
    }
}

impl Drop for PageSession {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_session(
    mut incoming: mpsc::UnboundedReceiver<Navigation>,
    reports: mpsc::Sender<PageReport>,
    delay: Duration,
) {
    while let Some(mut latest) = incoming.recv().await {
        loop {
            tokio::select! {
                next = incoming.recv() => match next {
                    Some(navigation) => {
                        debug!("Navigation to {} supersedes {}", navigation.url, latest.url);
                        latest = navigation;
                    }
                    None => return,
                },
                _ = tokio::time::sleep(delay) => break,
            }
        }

        let report = extract_page(&latest.url, &latest.html);
        if reports.send(report).await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CARD: &str = r#"<html><body><div class="job-card">
        <h3>Backend Engineer</h3><span class="company">Acme</span>
        <span class="location">Remote</span>
        <p>Design and operate the services behind our public API for customers.</p>
    </div></body></html>"#;

    #[tokio::test(start_paused = true)]
    async fn test_latest_navigation_wins() {
        let (session, mut reports) = PageSession::spawn();

        session.navigate("https://acme.example/a", "<html><body></body></html>").unwrap();
        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_millis(500)).await;
        session.navigate("https://acme.example/careers", CARD).unwrap();

        let report = reports.recv().await.unwrap();
        assert_eq!(report.url, "https://acme.example/careers");
        assert_eq!(report.message.jobs.len(), 1);
        assert!(reports.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_the_page_to_settle() {
        let (session, mut reports) = PageSession::spawn();

        session.navigate("https://acme.example/careers", CARD).unwrap();
        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_millis(900)).await;
        assert!(reports.try_recv().is_err());

        let report = reports.recv().await.unwrap();
        assert_eq!(report.message.platform, "generic");
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_navigations_each_report() {
        let (session, mut reports) = PageSession::spawn();

        session.navigate("https://acme.example/one", CARD).unwrap();
        assert_eq!(reports.recv().await.unwrap().url, "https://acme.example/one");

        session.navigate("https://acme.example/two", CARD).unwrap();
        assert_eq!(reports.recv().await.unwrap().url, "https://acme.example/two");
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_tears_down() {
        let (session, mut reports) = PageSession::spawn();
        session.navigate("https://acme.example/careers", CARD).unwrap();
        drop(session);

        assert!(reports.recv().await.is_none());
    }
}
