use crate::autocomplete::SuggestionQuery;
use crate::identity::IdentityStore;
use crate::session::{Effect, Event, GameSession};
use crate::transport::{GuessEndpoint, SuggestionEndpoint};
use crate::ui::{Clipboard, GameView, Notifier};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info};

const DEFAULT_SUGGESTION_CACHE: NonZeroUsize = match NonZeroUsize::new(64) {
    Some(size) => size,
    None => unreachable!(),
};

#[derive(Clone, Debug)]
pub struct RuntimeOptions {
    pub suggestion_cache_size: NonZeroUsize,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            suggestion_cache_size: DEFAULT_SUGGESTION_CACHE,
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RunExit {
    /// The page must be re-bootstrapped from the server.
    Reload,
    Quit,
    /// The front end dropped its event sender.
    Closed,
}

/// Channel the front end feeds UI events into.
pub fn ui_channel() -> (UnboundedSender<Event>, UnboundedReceiver<Event>) {
    mpsc::unbounded_channel()
}

/// Runs a session's effects: network calls and timers are spawned tasks
/// whose results come back as events, and events are handled strictly one
/// at a time.
pub struct Driver<E> {
    endpoints: Arc<E>,
    cache: LruCache<SuggestionQuery, Vec<String>>,
    results_tx: UnboundedSender<(u64, Event)>,
    results_rx: UnboundedReceiver<(u64, Event)>,
    epoch: u64,
}

impl<E> Driver<E>
where
    E: GuessEndpoint + SuggestionEndpoint,
{
    pub fn new(endpoints: Arc<E>, options: RuntimeOptions) -> Self {
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        Self {
            endpoints,
            cache: LruCache::new(options.suggestion_cache_size),
            results_tx,
            results_rx,
            epoch: 0,
        }
    }

    /// Drives `session` until it asks for a reload or exit. Results of tasks
    /// spawned by an earlier run are discarded.
    pub async fn run<U, I>(
        &mut self,
        session: &mut GameSession<U, I>,
        initial: Vec<Effect>,
        ui_events: &mut UnboundedReceiver<Event>,
    ) -> RunExit
    where
        U: GameView + Notifier + Clipboard,
        I: IdentityStore,
    {
        self.epoch += 1;
        self.cache.clear();
        if let Some(exit) = self.apply(initial) {
            return exit;
        }
        loop {
            let event = tokio::select! {
                incoming = ui_events.recv() => match incoming {
                    Some(event) => event,
                    None => {
                        info!("ui event source closed");
                        return RunExit::Closed;
                    }
                },
                Some((epoch, event)) = self.results_rx.recv() => {
                    if epoch != self.epoch {
                        debug!(epoch, current = self.epoch, "dropping result from previous page load");
                        continue;
                    }
                    event
                }
            };
            if let Event::SuggestionsLoaded {
                query,
                result: Ok(labels),
                ..
            } = &event
            {
                self.cache.put(query.clone(), labels.clone());
            }
            let effects = session.handle(event);
            if let Some(exit) = self.apply(effects) {
                return exit;
            }
        }
    }

    fn apply(&mut self, effects: Vec<Effect>) -> Option<RunExit> {
        for effect in effects {
            match effect {
                Effect::FetchSuggestions(request) => {
                    if let Some(labels) = self.cache.get(&request.query) {
                        debug!(seq = request.seq, "suggestions served from cache");
                        let event = Event::SuggestionsLoaded {
                            seq: request.seq,
                            query: request.query,
                            result: Ok(labels.clone()),
                        };
                        let _ = self.results_tx.send((self.epoch, event));
                        continue;
                    }
                    let endpoints = Arc::clone(&self.endpoints);
                    let tx = self.results_tx.clone();
                    let epoch = self.epoch;
                    tokio::spawn(async move {
                        let result = endpoints.suggest(request.query.clone()).await;
                        let event = Event::SuggestionsLoaded {
                            seq: request.seq,
                            query: request.query,
                            result,
                        };
                        let _ = tx.send((epoch, event));
                    });
                }
                Effect::SubmitGuess { ticket, form } => {
                    let endpoints = Arc::clone(&self.endpoints);
                    let tx = self.results_tx.clone();
                    let epoch = self.epoch;
                    tokio::spawn(async move {
                        let result = endpoints.submit(form).await;
                        let _ = tx.send((epoch, Event::GuessCompleted { ticket, result }));
                    });
                }
                Effect::Schedule { after, timer } => {
                    let tx = self.results_tx.clone();
                    let epoch = self.epoch;
                    tokio::spawn(async move {
                        tokio::time::sleep(after).await;
                        let _ = tx.send((epoch, Event::TimerFired(timer)));
                    });
                }
                Effect::Reload => {
                    info!("reloading game page");
                    return Some(RunExit::Reload);
                }
                Effect::Exit => return Some(RunExit::Quit),
            }
        }
        None
    }
}
