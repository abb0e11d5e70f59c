//! Background entry loader.
//!
//! Runs the fetch phase of loads off the caller's thread. Results come
//! back through a channel and are applied with
//! [`Session::finish_load`](super::Session::finish_load), which rejects
//! any that a newer load superseded.

use std::sync::{mpsc, Arc};
use std::time::Duration;

use super::fetch::{fetch_entry, FetchedEntry, LoadTicket};
use crate::api::VolumeServer;
use crate::error::VolsegError;

enum LoaderRequest {
    Fetch(LoadTicket),
    Shutdown,
}

/// Background thread that fetches entries for load tickets.
pub struct EntryLoader {
    request_tx: mpsc::Sender<LoaderRequest>,
    result_rx: mpsc::Receiver<FetchedEntry>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl EntryLoader {
    /// Spawn the loader thread.
    pub fn new(api: Arc<dyn VolumeServer>) -> Result<Self, VolsegError> {
        let (request_tx, request_rx) = mpsc::channel::<LoaderRequest>();
        let (result_tx, result_rx) = mpsc::channel::<FetchedEntry>();

        let thread = std::thread::Builder::new()
            .name("entry-loader".into())
            .spawn(move || Self::thread_loop(&*api, &request_rx, &result_tx))
            .map_err(VolsegError::ThreadSpawn)?;

        Ok(Self {
            request_tx,
            result_rx,
            thread: Some(thread),
        })
    }

    /// Queue a fetch (non-blocking). Tickets still queued when a newer one
    /// arrives are skipped.
    pub fn submit(&self, ticket: LoadTicket) {
        let _ = self.request_tx.send(LoaderRequest::Fetch(ticket));
    }

    /// Non-blocking check for a completed fetch.
    pub fn try_recv(&self) -> Option<FetchedEntry> {
        self.result_rx.try_recv().ok()
    }

    /// Wait for the next completed fetch. `None` once the loader stopped.
    pub fn recv(&self) -> Option<FetchedEntry> {
        self.result_rx.recv().ok()
    }

    /// Wait up to `timeout` for the next completed fetch.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<FetchedEntry> {
        self.result_rx.recv_timeout(timeout).ok()
    }

    /// Stop the loader thread and wait for it. A fetch in progress is
    /// finished first.
    pub fn shutdown(&mut self) {
        let _ = self.request_tx.send(LoaderRequest::Shutdown);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }

    fn thread_loop(
        api: &dyn VolumeServer,
        request_rx: &mpsc::Receiver<LoaderRequest>,
        result_tx: &mpsc::Sender<FetchedEntry>,
    ) {
        while let Ok(request) = request_rx.recv() {
            match drain_latest(request, request_rx) {
                LoaderRequest::Shutdown => break,
                LoaderRequest::Fetch(ticket) => {
                    log::debug!(
                        "{}: fetching generation {}",
                        ticket.entry(),
                        ticket.generation()
                    );
                    if result_tx.send(fetch_entry(api, ticket)).is_err() {
                        break;
                    }
                }
            }
        }
    }
}

impl Drop for EntryLoader {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Drain pending requests, keeping only the newest. A queued shutdown is
/// never replaced.
fn drain_latest(
    initial: LoaderRequest,
    rx: &mpsc::Receiver<LoaderRequest>,
) -> LoaderRequest {
    let mut latest = initial;
    while let Ok(newer) = rx.try_recv() {
        if !matches!(latest, LoaderRequest::Shutdown) {
            latest = newer;
        }
    }
    latest
}

#[cfg(test)]
mod tests {
    use super::super::mock::{self, MockServer};
    use super::super::LoadMode;
    use super::*;
    use crate::entry::resolve_source;

    #[test]
    fn drain_keeps_newest_fetch() {
        let server = MockServer::sample();
        let mut session = mock::session(&server);
        let entry = resolve_source("emd-1832").unwrap();
        let first = session.begin_load(entry.clone(), LoadMode::Auto);
        let second = session.begin_load(entry.clone(), LoadMode::Auto);
        let third = session.begin_load(entry, LoadMode::Auto);

        let (tx, rx) = mpsc::channel();
        tx.send(LoaderRequest::Fetch(second)).unwrap();
        tx.send(LoaderRequest::Fetch(third)).unwrap();
        match drain_latest(LoaderRequest::Fetch(first), &rx) {
            LoaderRequest::Fetch(ticket) => assert_eq!(ticket.generation(), 3),
            LoaderRequest::Shutdown => unreachable!("fetch expected"),
        }

        tx.send(LoaderRequest::Shutdown).unwrap();
        tx.send(LoaderRequest::Shutdown).unwrap();
        assert!(matches!(
            drain_latest(LoaderRequest::Shutdown, &rx),
            LoaderRequest::Shutdown
        ));
    }

    #[test]
    fn loads_in_background() {
        let server = MockServer::sample();
        let mut session = mock::session(&server);
        let mut loader = EntryLoader::new(session.api()).unwrap();

        let ticket = session
            .begin_load(resolve_source("emd-1832").unwrap(), LoadMode::Auto);
        loader.submit(ticket);
        let fetched = loader.recv_timeout(Duration::from_secs(10)).unwrap();
        assert_eq!(fetched.ticket().generation(), 1);
        assert!(fetched.result().is_ok());

        session.finish_load(fetched).unwrap();
        assert_eq!(session.lattice_nodes().len(), 3);

        loader.shutdown();
        assert!(loader.try_recv().is_none());
    }

    #[test]
    fn late_result_is_rejected() {
        let server = MockServer::sample();
        let mut session = mock::session(&server);
        let loader = EntryLoader::new(session.api()).unwrap();

        let entry = resolve_source("emd-1832").unwrap();
        loader.submit(session.begin_load(entry.clone(), LoadMode::Auto));
        let fetched = loader.recv().unwrap();
        let _newer = session.begin_load(entry, LoadMode::MeshStreaming);

        assert!(matches!(
            session.finish_load(fetched),
            Err(VolsegError::StaleLoad { .. })
        ));
        assert_eq!(session.scene().node_count(), 0);
    }
}
