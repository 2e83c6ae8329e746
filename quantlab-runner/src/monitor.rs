//! Signal transition monitoring.
//!
//! Each tick regenerates signals over the full price window (the pipeline
//! is stateless, so this is the same computation a backtest would do) and
//! compares the latest signal against the previous tick's. Only
//! transitions produce events, and the position store gates which
//! transitions are worth telling anyone about:
//!
//! - flat -> long is a Buy, suppressed when a position is already open;
//! - any -> flat is an Exit, suppressed when nothing is open;
//! - any -> short is observed and recorded but never notified. Short
//!   entries are tracked so the state machine stays correct, while
//!   notification is reserved until short execution exists downstream.

use std::collections::BTreeMap;

use chrono::{TimeZone, Utc};
use quantlab_core::domain::{PriceSeries, Signal};
use quantlab_core::strategy::Strategy;
use quantlab_core::Error;
use serde::Serialize;

use crate::notify::{Notifier, SignalAlert, SignalKind};
use crate::positions::PositionStore;

/// Outcome of one monitoring sweep.
#[derive(Debug, Default, Serialize)]
pub struct MonitorSummary {
    /// Alerts that passed suppression, in symbol order.
    pub alerts: Vec<SignalAlert>,
    /// Symbols whose signal generation failed, with the error text.
    pub errors: Vec<(String, String)>,
    /// Notifier failures as (notifier, symbol, error). Delivery problems
    /// never abort the sweep.
    pub delivery_failures: Vec<(String, String, String)>,
}

/// Watches a universe for signal transitions and dispatches alerts.
pub struct SignalMonitor {
    strategy: Box<dyn Strategy>,
    store: Box<dyn PositionStore>,
    notifiers: Vec<Box<dyn Notifier>>,
    last_signals: BTreeMap<String, Signal>,
}

impl SignalMonitor {
    pub fn new(strategy: Box<dyn Strategy>, store: Box<dyn PositionStore>) -> Self {
        Self {
            strategy,
            store,
            notifiers: Vec::new(),
            last_signals: BTreeMap::new(),
        }
    }

    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }

    pub fn store(&self) -> &dyn PositionStore {
        self.store.as_ref()
    }

    pub fn store_mut(&mut self) -> &mut dyn PositionStore {
        self.store.as_mut()
    }

    /// Last observed signal for a symbol; unseen symbols read as flat.
    pub fn last_signal(&self, symbol: &str) -> Signal {
        self.last_signals.get(symbol).copied().unwrap_or(0)
    }

    /// Regenerates signals for one symbol and returns the alert its latest
    /// transition warrants, if any. Always records the new signal state,
    /// including for suppressed and short transitions.
    pub fn check(
        &mut self,
        symbol: &str,
        series: &PriceSeries,
    ) -> quantlab_core::Result<Option<SignalAlert>> {
        let warmup = self.strategy.warmup_bars();
        if series.len() <= warmup {
            return Err(Error::InsufficientData {
                required: warmup + 1,
                available: series.len(),
            });
        }

        let signals = self.strategy.generate_signals(series)?;
        let current = *signals.last().expect("non-empty past warmup");
        let previous = self.last_signal(symbol);
        self.last_signals.insert(symbol.to_string(), current);

        if current == previous {
            return Ok(None);
        }

        let kind = match current {
            1 => SignalKind::Buy,
            -1 => SignalKind::Sell,
            _ => SignalKind::Exit,
        };
        let holding = self.store.has_position(symbol);
        let actionable = match kind {
            SignalKind::Buy => !holding,
            SignalKind::Exit => holding,
            SignalKind::Sell => false,
        };
        if !actionable {
            return Ok(None);
        }

        let close = series.close();
        let price = *close.last().expect("non-empty past warmup");
        let date = *series.dates().last().expect("non-empty past warmup");
        let timestamp = Utc
            .from_utc_datetime(&date.and_hms_opt(0, 0, 0).expect("midnight is valid"));

        Ok(Some(SignalAlert {
            symbol: symbol.to_string(),
            timestamp,
            kind,
            price,
            strategy: self.strategy.name().to_string(),
            reason: format!("signal {previous} -> {current}"),
            metadata: BTreeMap::new(),
        }))
    }

    /// Sweeps a universe, dispatching each alert through every notifier.
    pub fn scan_and_notify(&mut self, universe: &BTreeMap<String, PriceSeries>) -> MonitorSummary {
        let mut summary = MonitorSummary::default();
        for (symbol, series) in universe {
            match self.check(symbol, series) {
                Ok(Some(alert)) => {
                    for notifier in &self.notifiers {
                        if let Err(err) = notifier.send(&alert) {
                            summary.delivery_failures.push((
                                notifier.name().to_string(),
                                symbol.clone(),
                                err.to_string(),
                            ));
                        }
                    }
                    summary.alerts.push(alert);
                }
                Ok(None) => {}
                Err(err) => summary.errors.push((symbol.clone(), err.to_string())),
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use chrono::NaiveDate;
    use quantlab_core::strategy::MaCrossStrategy;

    use crate::positions::MemoryPositionStore;

    fn close_series(closes: &[f64]) -> PriceSeries {
        let base = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let dates = (0..closes.len())
            .map(|i| base + chrono::Duration::days(i as i64))
            .collect();
        PriceSeries::from_close(dates, closes.to_vec()).unwrap()
    }

    fn make_monitor() -> SignalMonitor {
        let strategy = MaCrossStrategy::new(2, 4, 0.0, false).unwrap();
        SignalMonitor::new(Box::new(strategy), Box::new(MemoryPositionStore::new()))
    }

    /// fast(2) over the last two 30s is 30, slow(4) is 20: long.
    fn long_series() -> PriceSeries {
        close_series(&[10.0, 10.0, 10.0, 10.0, 30.0, 30.0])
    }

    /// All closes equal, both averages equal: flat.
    fn flat_series() -> PriceSeries {
        close_series(&[10.0; 6])
    }

    /// fast(2) is 5, slow(4) is 17.5: short.
    fn short_series() -> PriceSeries {
        close_series(&[30.0, 30.0, 30.0, 30.0, 5.0, 5.0])
    }

    #[derive(Clone, Default)]
    struct RecordingNotifier {
        sent: Arc<Mutex<Vec<SignalAlert>>>,
    }

    impl Notifier for RecordingNotifier {
        fn name(&self) -> &str {
            "recording"
        }

        fn send(&self, alert: &SignalAlert) -> anyhow::Result<()> {
            self.sent.lock().unwrap().push(alert.clone());
            Ok(())
        }
    }

    struct FailingNotifier;

    impl Notifier for FailingNotifier {
        fn name(&self) -> &str {
            "failing"
        }

        fn send(&self, _alert: &SignalAlert) -> anyhow::Result<()> {
            anyhow::bail!("channel down")
        }
    }

    #[test]
    fn buy_transition_emits_alert() {
        let mut monitor = make_monitor();
        let alert = monitor.check("ACME", &long_series()).unwrap().unwrap();
        assert_eq!(alert.kind, SignalKind::Buy);
        assert_eq!(alert.symbol, "ACME");
        assert_eq!(alert.price, 30.0);
        assert_eq!(monitor.last_signal("ACME"), 1);
    }

    #[test]
    fn no_transition_no_alert() {
        let mut monitor = make_monitor();
        monitor.check("ACME", &long_series()).unwrap();
        // Same state next tick.
        assert!(monitor.check("ACME", &long_series()).unwrap().is_none());
    }

    #[test]
    fn buy_suppressed_when_already_holding() {
        let mut monitor = make_monitor();
        monitor.store_mut().add_position("ACME", 10.0, 100.0).unwrap();
        assert!(monitor.check("ACME", &long_series()).unwrap().is_none());
        // The state machine still advanced.
        assert_eq!(monitor.last_signal("ACME"), 1);
    }

    #[test]
    fn exit_requires_open_position() {
        let mut monitor = make_monitor();
        monitor.check("ACME", &long_series()).unwrap();
        // Long to flat with nothing in the store: suppressed.
        assert!(monitor.check("ACME", &flat_series()).unwrap().is_none());

        let mut monitor = make_monitor();
        monitor.store_mut().add_position("ACME", 10.0, 100.0).unwrap();
        monitor.check("ACME", &long_series()).unwrap();
        let alert = monitor.check("ACME", &flat_series()).unwrap().unwrap();
        assert_eq!(alert.kind, SignalKind::Exit);
    }

    #[test]
    fn short_transition_recorded_but_never_notified() {
        let mut monitor = make_monitor();
        assert!(monitor.check("ACME", &short_series()).unwrap().is_none());
        assert_eq!(monitor.last_signal("ACME"), -1);

        // The recorded short means short to flat is a real transition.
        let mut with_position = monitor;
        with_position
            .store_mut()
            .add_position("ACME", 10.0, 100.0)
            .unwrap();
        let alert = with_position.check("ACME", &flat_series()).unwrap().unwrap();
        assert_eq!(alert.kind, SignalKind::Exit);
    }

    #[test]
    fn short_window_errors() {
        let mut monitor = make_monitor();
        let err = monitor.check("ACME", &close_series(&[10.0; 3])).unwrap_err();
        assert!(matches!(err, Error::InsufficientData { .. }));
    }

    #[test]
    fn sweep_dispatches_and_collects_errors() {
        let recording = RecordingNotifier::default();
        let strategy = MaCrossStrategy::new(2, 4, 0.0, false).unwrap();
        let mut monitor = SignalMonitor::new(
            Box::new(strategy),
            Box::new(MemoryPositionStore::new()),
        )
        .with_notifier(Box::new(recording.clone()));

        let mut universe = BTreeMap::new();
        universe.insert("LONG".to_string(), long_series());
        universe.insert("QUIET".to_string(), flat_series());
        universe.insert("TINY".to_string(), close_series(&[10.0; 2]));

        let summary = monitor.scan_and_notify(&universe);
        assert_eq!(summary.alerts.len(), 1);
        assert_eq!(summary.alerts[0].symbol, "LONG");
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].0, "TINY");
        assert_eq!(recording.sent.lock().unwrap().len(), 1);
    }

    #[test]
    fn delivery_failure_does_not_drop_the_alert() {
        let recording = RecordingNotifier::default();
        let strategy = MaCrossStrategy::new(2, 4, 0.0, false).unwrap();
        let mut monitor = SignalMonitor::new(
            Box::new(strategy),
            Box::new(MemoryPositionStore::new()),
        )
        .with_notifier(Box::new(FailingNotifier))
        .with_notifier(Box::new(recording.clone()));

        let mut universe = BTreeMap::new();
        universe.insert("LONG".to_string(), long_series());

        let summary = monitor.scan_and_notify(&universe);
        assert_eq!(summary.alerts.len(), 1);
        assert_eq!(summary.delivery_failures.len(), 1);
        assert_eq!(summary.delivery_failures[0].0, "failing");
        // The second notifier still received it.
        assert_eq!(recording.sent.lock().unwrap().len(), 1);
    }
}
