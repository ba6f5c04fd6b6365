use core::cell::{Cell, RefCell};
use futures_util::future::{FutureExt, LocalBoxFuture, Shared};
use std::rc::Rc;

use crate::*;

type InitResult<M> = Result<Rc<M>, BridgeError>;
type PendingInit<M> = Shared<LocalBoxFuture<'static, InitResult<M>>>;

enum BridgeState<M> {
    NotStarted,
    Initializing { attempt: u64, pending: PendingInit<M> },
    Ready(Rc<M>),
    Failed(BridgeError),
}

/// Snapshot of the bridge lifecycle for presentation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BridgeStatus {
    NotStarted,
    Initializing,
    Ready,
    Failed(BridgeError),
}

impl BridgeStatus {
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

struct BridgeInner<I: Interpreter, F> {
    interpreter: I,
    fetcher: F,
    config: BridgeConfig,
    state: RefCell<BridgeState<I::Module>>,
    attempts: Cell<u64>,
}

/// Owns interpreter bootstrap and engine module loading.
///
/// Cloning yields another handle to the same bridge. At most one
/// initialization runs at a time; callers arriving while it is in flight
/// await the same shared future. A failed bridge starts over on the next
/// [`RuntimeBridge::ensure_ready`] call.
pub struct RuntimeBridge<I: Interpreter, F> {
    inner: Rc<BridgeInner<I, F>>,
}

impl<I: Interpreter, F> Clone for RuntimeBridge<I, F> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<I, F> RuntimeBridge<I, F>
where
    I: Interpreter + 'static,
    F: BundleFetcher + 'static,
{
    pub fn new(interpreter: I, fetcher: F, config: BridgeConfig) -> Self {
        Self {
            inner: Rc::new(BridgeInner {
                interpreter,
                fetcher,
                config,
                state: RefCell::new(BridgeState::NotStarted),
                attempts: Cell::new(0),
            }),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }

    pub fn status(&self) -> BridgeStatus {
        match &*self.inner.state.borrow() {
            BridgeState::NotStarted => BridgeStatus::NotStarted,
            BridgeState::Initializing { .. } => BridgeStatus::Initializing,
            BridgeState::Ready(_) => BridgeStatus::Ready,
            BridgeState::Failed(err) => BridgeStatus::Failed(err.clone()),
        }
    }

    pub async fn ensure_ready(&self) -> InitResult<I::Module> {
        let (attempt, pending) = {
            let mut state = self.inner.state.borrow_mut();
            match &*state {
                BridgeState::Ready(module) => return Ok(module.clone()),
                BridgeState::Initializing { attempt, pending } => (*attempt, pending.clone()),
                BridgeState::NotStarted | BridgeState::Failed(_) => {
                    let attempt = self.inner.attempts.get() + 1;
                    self.inner.attempts.set(attempt);
                    log::debug!("runtime bridge: initialization attempt {}", attempt);
                    let pending = Self::initialize(self.inner.clone())
                        .boxed_local()
                        .shared();
                    *state = BridgeState::Initializing {
                        attempt,
                        pending: pending.clone(),
                    };
                    (attempt, pending)
                }
            }
        };

        let result = pending.await;
        self.settle(attempt, &result);
        result
    }

    pub async fn create_session(
        &self,
        config: GameConfig,
        options: SessionOptions,
        on_end: EndCallback,
    ) -> Result<Box<dyn EngineSession>> {
        config.validate()?;
        let module = self.ensure_ready().await?;
        log::debug!(
            "creating session {}x{} with {} mines ({:?})",
            config.rows,
            config.cols,
            config.mines,
            options
        );
        module.create_session(config, options, on_end)
    }

    async fn initialize(inner: Rc<BridgeInner<I, F>>) -> InitResult<I::Module> {
        let config = &inner.config;

        inner.interpreter.start().await?;
        log::info!("interpreter started");

        let bundle = inner.fetcher.fetch(&config.bundle_url).await?;
        log::info!(
            "fetched engine bundle {} ({} bytes)",
            config.bundle_url,
            bundle.len()
        );

        inner
            .interpreter
            .unpack(bundle, &config.archive_format)
            .await?;

        let module = inner
            .interpreter
            .import(&config.module_name, &config.factory_name)
            .await?;
        log::info!("engine module {} loaded", config.module_name);

        Ok(Rc::new(module))
    }

    // Only the attempt that is still current may move the state on.
    fn settle(&self, attempt: u64, result: &InitResult<I::Module>) {
        let mut state = self.inner.state.borrow_mut();
        let is_current = matches!(
            &*state,
            BridgeState::Initializing { attempt: current, .. } if *current == attempt
        );
        if !is_current {
            return;
        }

        *state = match result {
            Ok(module) => BridgeState::Ready(module.clone()),
            Err(err) => {
                log::error!("runtime bridge failed: {}", err);
                BridgeState::Failed(err.clone())
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use futures::executor::block_on;
    use futures::future::join_all;
    use std::pin::pin;

    #[test]
    fn concurrent_callers_share_one_initialization() {
        let (bridge, probe) = fake_bridge();

        let results = block_on(join_all((0..8).map(|_| bridge.ensure_ready())));

        assert!(results.iter().all(|result| result.is_ok()));
        assert_eq!(probe.starts.get(), 1);
        assert_eq!(probe.fetches.get(), 1);
        assert_eq!(probe.unpacks.get(), 1);
        assert_eq!(probe.imports.get(), 1);
        assert_eq!(bridge.status(), BridgeStatus::Ready);
    }

    #[test]
    fn ready_bridge_reuses_cached_module() {
        let (bridge, probe) = fake_bridge();

        let first = block_on(bridge.ensure_ready()).unwrap();
        let second = block_on(bridge.ensure_ready()).unwrap();

        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(probe.fetches.get(), 1);
        assert_eq!(probe.imports.get(), 1);
    }

    #[test]
    fn status_reports_in_flight_initialization() {
        let (bridge, _probe) = fake_bridge();
        assert_eq!(bridge.status(), BridgeStatus::NotStarted);

        block_on(async {
            let mut pending = pin!(bridge.ensure_ready());
            assert!(futures::poll!(&mut pending).is_pending());
            assert_eq!(bridge.status(), BridgeStatus::Initializing);
            pending.await.unwrap();
        });

        assert!(bridge.status().is_ready());
    }

    #[test]
    fn network_failure_leaves_bridge_failed_until_retried() {
        let (bridge, probe) = fake_bridge();
        probe.failing_fetches.set(1);

        let err = block_on(bridge.ensure_ready()).err().unwrap();
        assert!(matches!(err, BridgeError::Network(_)));
        assert!(matches!(bridge.status(), BridgeStatus::Failed(_)));
        assert_eq!(probe.imports.get(), 0);

        block_on(bridge.ensure_ready()).unwrap();
        assert_eq!(probe.starts.get(), 2);
        assert_eq!(probe.fetches.get(), 2);
        assert_eq!(probe.imports.get(), 1);
        assert!(bridge.status().is_ready());
    }

    #[test]
    fn stale_attempt_does_not_overwrite_newer_one() {
        let (bridge, probe) = fake_bridge();
        probe.failing_fetches.set(1);

        block_on(async {
            let mut first = pin!(bridge.ensure_ready());
            let mut late = pin!(bridge.ensure_ready());
            assert!(futures::poll!(&mut first).is_pending());
            assert!(futures::poll!(&mut late).is_pending());

            assert!(first.await.is_err());
            assert!(matches!(bridge.status(), BridgeStatus::Failed(_)));

            let mut retry = pin!(bridge.ensure_ready());
            assert!(futures::poll!(&mut retry).is_pending());
            assert_eq!(bridge.status(), BridgeStatus::Initializing);

            // settles the first attempt's failure after the retry began
            assert!(late.await.is_err());
            assert_eq!(bridge.status(), BridgeStatus::Initializing);

            retry.await.unwrap();
        });

        assert!(bridge.status().is_ready());
        assert_eq!(probe.fetches.get(), 2);
        assert_eq!(probe.imports.get(), 1);
    }

    #[test]
    fn corrupt_bundle_and_missing_module_are_reported() {
        let (bridge, probe) = fake_bridge();
        probe.corrupt_bundle.set(true);
        let err = block_on(bridge.ensure_ready()).err().unwrap();
        assert!(matches!(err, BridgeError::Unpack(_)));

        probe.corrupt_bundle.set(false);
        probe.missing_module.set(true);
        let err = block_on(bridge.ensure_ready()).err().unwrap();
        assert!(matches!(err, BridgeError::Module(_)));
        assert_eq!(probe.unpacks.get(), 2);
        assert_eq!(probe.imports.get(), 1);
    }

    #[test]
    fn create_session_waits_for_readiness() {
        let (bridge, probe) = fake_bridge();

        let session = block_on(bridge.create_session(
            GameConfig::beginner(),
            SessionOptions::default(),
            Box::new(|_: bool| {}),
        ))
        .unwrap();

        assert_eq!((session.rows(), session.cols()), (9, 9));
        assert_eq!(probe.sessions.get(), 1);
    }

    #[test]
    fn create_session_rejects_invalid_config_before_loading() {
        let (bridge, probe) = fake_bridge();

        let err = block_on(bridge.create_session(
            GameConfig::new_unchecked(2, 2, 4),
            SessionOptions::default(),
            Box::new(|_: bool| {}),
        ))
        .err()
        .unwrap();

        assert!(matches!(err, GameError::InvalidConfig { .. }));
        assert_eq!(probe.starts.get(), 0);
    }
}
