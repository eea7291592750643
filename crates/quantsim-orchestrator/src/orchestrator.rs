//! Bounded-concurrency execution of a validated strategy across a resolved
//! universe: a blocking `run` for the single-aggregate-response
//! mode, and a streaming `run_streaming` that emits one `Progress` event
//! per completed instrument before the terminal `Complete`/`Error`.
//!
//! Concurrency is a `rayon::ThreadPool` sized to `W = config.max_concurrency`
//! (default 10), built fresh per run rather than drawn from a fixed global
//! pool. Completed `TickerResult`s are published on a `std::sync::mpsc`
//! channel the orchestrator drains in arrival order.

use crate::error::OrchestratorError;
use crate::event::Event;
use crate::worker::simulate_one;
use quantsim_core::bar::Bar;
use quantsim_core::config::BacktestConfig;
use quantsim_core::data::MarketDataProvider;
use quantsim_core::error::SimulationError;
use quantsim_core::portfolio::{compute_backtest_result, BacktestResult};
use quantsim_core::simulator::SimulatorParams;
use quantsim_core::ticker_result::TickerResult;
use quantsim_core::universe::{apply_universe_limit, UniverseResolver};
use quantsim_sandbox::CompiledStrategy;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{mpsc as std_mpsc, Arc};
use std::task::{Context, Poll};
use tokio::sync::mpsc as tokio_mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Bounded so a slow consumer applies backpressure to the worker pool
/// rather than letting completed events pile up unbounded.
const EVENT_BUFFER: usize = 64;

static NEXT_JOB_ID: AtomicU64 = AtomicU64::new(1);

fn sim_params(config: &BacktestConfig) -> SimulatorParams {
    SimulatorParams {
        initial_capital: config.initial_capital,
        position_size: config.position_size,
        commission: config.commission,
        slippage: config.slippage,
    }
}

/// Shared preparation for both entry points.
fn prepare(
    config: &BacktestConfig,
    provider: &dyn MarketDataProvider,
    universe: &dyn UniverseResolver,
) -> Result<(CompiledStrategy, Vec<String>, HashMap<String, Vec<Bar>>), OrchestratorError> {
    config.validate()?;
    let compiled = quantsim_sandbox::validate(&config.strategy_source)?;

    let symbols = universe.resolve(&config.universe_id)?;
    let symbols = apply_universe_limit(symbols, config.universe_limit);

    let bars = provider
        .load_bars(&symbols, config.start_date, config.end_date, &config.interval)
        .map_err(|e| OrchestratorError::Data(e.to_string()))?;

    Ok((compiled, symbols, bars))
}

/// Simulate one symbol, or produce a failed `TickerResult` recording that no
/// bars were available for it. A symbol absent from `bars` (no coverage
/// from the data provider) is a per-instrument `DataUnavailable`: skipped,
/// but still recorded so the caller sees it in `BacktestResult.failures`
/// rather than it silently vanishing from the run.
fn simulate_or_skip(
    symbol: &str,
    bars: &HashMap<String, Vec<Bar>>,
    compiled: &CompiledStrategy,
    params: SimulatorParams,
) -> TickerResult {
    match bars.get(symbol) {
        Some(series) => simulate_one(symbol, series, compiled, params),
        None => {
            tracing::warn!(symbol, "no bar data available for instrument");
            TickerResult::failed(
                symbol,
                SimulationError::DataUnavailable {
                    symbol: symbol.to_string(),
                }
                .to_string(),
            )
        }
    }
}

fn build_pool(worker_count: usize) -> Result<rayon::ThreadPool, OrchestratorError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(worker_count.max(1))
        .build()
        .map_err(|e| OrchestratorError::Data(e.to_string()))
}

/// Run a backtest to completion and return the single aggregate response.
pub fn run(
    config: &BacktestConfig,
    provider: &dyn MarketDataProvider,
    universe: &dyn UniverseResolver,
) -> Result<BacktestResult, OrchestratorError> {
    let (compiled, symbols, bars) = prepare(config, provider, universe)?;
    let params = sim_params(config);
    let pool = build_pool(config.max_concurrency)?;

    let results: Vec<TickerResult> = pool.install(|| {
        use rayon::prelude::*;
        symbols
            .par_iter()
            .map(|symbol| simulate_or_skip(symbol, &bars, &compiled, params))
            .collect()
    });

    let successful = results.iter().filter(|r| r.success).count();
    if successful == 0 {
        return Err(OrchestratorError::AllInstrumentsFailed(symbols.len()));
    }

    Ok(compute_backtest_result(
        &results,
        config.initial_capital,
        config.sample_trades_limit,
    ))
}

/// A live streaming run. Implements
/// `futures::Stream<Item = Event>`; dropping or calling `cancel()` stops the
/// worker pool from starting new instruments (in-flight ones still finish).
pub struct RunHandle {
    stream: ReceiverStream<Event>,
    cancel: Arc<AtomicBool>,
}

impl RunHandle {
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }
}

impl futures::Stream for RunHandle {
    type Item = Event;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Event>> {
        Pin::new(&mut self.get_mut().stream).poll_next(cx)
    }
}

/// Start a streaming run: one `Init`, one `Progress` per completed
/// instrument in completion order, then exactly one `Complete` or `Error`.
pub fn run_streaming(
    config: BacktestConfig,
    provider: Arc<dyn MarketDataProvider>,
    universe: Arc<dyn UniverseResolver>,
) -> Result<RunHandle, OrchestratorError> {
    let (compiled, symbols, bars) = prepare(&config, provider.as_ref(), universe.as_ref())?;
    let params = sim_params(&config);
    let total = symbols.len();
    let job_id = format!("job-{}", NEXT_JOB_ID.fetch_add(1, Ordering::Relaxed));

    let (tx, rx) = tokio_mpsc::channel(EVENT_BUFFER);
    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_worker = cancel.clone();
    let worker_count = config.max_concurrency;
    let initial_capital = config.initial_capital;
    let sample_trades_limit = config.sample_trades_limit;

    std::thread::spawn(move || {
        if tx
            .blocking_send(Event::Init {
                total_tickers: total,
                job_id,
            })
            .is_err()
        {
            return;
        }

        if total == 0 {
            let _ = tx.blocking_send(Event::Error {
                message: "empty universe after applying universe_limit".to_string(),
            });
            return;
        }

        let pool = match build_pool(worker_count) {
            Ok(pool) => pool,
            Err(err) => {
                let _ = tx.blocking_send(Event::Error {
                    message: err.to_string(),
                });
                return;
            }
        };

        let (result_tx, result_rx) = std_mpsc::channel::<TickerResult>();

        pool.spawn(move || {
            use rayon::prelude::*;
            symbols.par_iter().for_each(|symbol| {
                if cancel_worker.load(Ordering::SeqCst) {
                    return;
                }
                let result = simulate_or_skip(symbol, &bars, &compiled, params);
                let _ = result_tx.send(result);
            });
        });

        let mut results = Vec::with_capacity(total);
        let completed = AtomicUsize::new(0);
        for result in result_rx {
            let count = completed.fetch_add(1, Ordering::SeqCst) + 1;
            let event = Event::progress(result.symbol.clone(), count, total, result.clone());
            results.push(result);
            if tx.blocking_send(event).is_err() {
                // Stream consumer gone; stop draining, let in-flight work finish quietly.
                return;
            }
        }

        let successful = results.iter().filter(|r| r.success).count();
        if successful == 0 {
            let _ = tx.blocking_send(Event::Error {
                message: format!("all {total} instruments failed or had no data"),
            });
            return;
        }

        let result = compute_backtest_result(&results, initial_capital, sample_trades_limit);
        let _ = tx.blocking_send(Event::Complete { result });
    });

    Ok(RunHandle {
        stream: ReceiverStream::new(rx),
        cancel,
    })
}
