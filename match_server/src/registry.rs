use std::collections::BTreeMap;
use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use fourinaline::ServerError;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::{CoordinatorConfig, MatchCoordinator, Teardown};

/// All matches hosted by one server, by name.
///
/// Coordinators report their teardown on a channel. The registry drains it on every call
/// and forgets the torn down matches, so that their names can be reused.
#[derive(Debug)]
pub struct SessionRegistry {
    config: CoordinatorConfig,
    matches: Mutex<BTreeMap<String, Arc<MatchCoordinator>>>,
    teardown_tx: Sender<Teardown>,
    teardown_rx: Receiver<Teardown>,
}

impl SessionRegistry {
    pub fn new(config: CoordinatorConfig) -> Self {
        let (teardown_tx, teardown_rx) = unbounded();
        Self {
            config,
            matches: Mutex::new(BTreeMap::new()),
            teardown_tx,
            teardown_rx,
        }
    }

    pub fn create_match(&self, name: &str) -> Result<Arc<MatchCoordinator>, ServerError> {
        let mut matches = self.matches.lock();
        self.reap(&mut matches);
        if matches.contains_key(name) {
            return Err(ServerError::MatchAlreadyExists {
                name: name.to_string(),
            });
        }
        let coordinator = MatchCoordinator::new(
            name,
            self.config.clone(),
            Some(self.teardown_tx.clone()),
        );
        matches.insert(name.to_string(), Arc::clone(&coordinator));
        info!(match_name = name, "Match created");
        Ok(coordinator)
    }

    pub fn get(&self, name: &str) -> Result<Arc<MatchCoordinator>, ServerError> {
        let mut matches = self.matches.lock();
        self.reap(&mut matches);
        matches
            .get(name)
            .cloned()
            .ok_or_else(|| ServerError::UnknownMatch {
                name: name.to_string(),
            })
    }

    /// Names of the live matches, sorted.
    pub fn match_names(&self) -> Vec<String> {
        let mut matches = self.matches.lock();
        self.reap(&mut matches);
        matches.keys().cloned().collect()
    }

    /// Tears down every match.
    pub fn shutdown(&self) {
        let coordinators: Vec<_> = self.matches.lock().values().cloned().collect();
        for coordinator in coordinators {
            coordinator.shutdown();
        }
        self.reap(&mut self.matches.lock());
    }

    fn reap(&self, matches: &mut BTreeMap<String, Arc<MatchCoordinator>>) {
        for Teardown { match_name } in self.teardown_rx.try_iter() {
            // The name may have been taken again by a new match in the meantime.
            if matches
                .get(&match_name)
                .is_some_and(|coordinator| coordinator.is_torn_down())
            {
                matches.remove(&match_name);
                debug!(%match_name, "Torn down match forgotten");
            }
        }
    }
}
