//! Unit tests for MarketEngine - day lifecycle, tick scheduling and price effects.

#[cfg(test)]
mod engine_tests {
    use crate::bus::EventBus;
    use crate::config::{ClockConfig, MarketConfig};
    use crate::error::MarketError;
    use crate::events::{AccountEvent, Event, MarketEvent};
    use crate::market::{EffectDirection, EffectStrength, Industry, MarketEngine, MarketState, PriceEffect};
    use crate::notifier::MessageLog;
    use crate::random::{RandomSource, SeededRandom};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    fn one_second_ticks() -> MarketConfig {
        MarketConfig {
            min_processing_secs: 1.0,
            max_processing_secs: 1.0,
            ..MarketConfig::default()
        }
    }

    fn endless_day() -> ClockConfig {
        ClockConfig {
            infinite_day: true,
            ..ClockConfig::default()
        }
    }

    fn engine_with(config: MarketConfig, clock: ClockConfig, seed: u64) -> (Arc<MarketEngine>, Arc<MessageLog>) {
        let log = Arc::new(MessageLog::new());
        let rng: Arc<dyn RandomSource> = Arc::new(SeededRandom::new(seed));
        let engine = MarketEngine::new(config, &clock, rng, EventBus::new(256), log.clone());
        (engine, log)
    }

    fn count_events<F>(engine: &MarketEngine, matches: F) -> Arc<AtomicUsize>
    where
        F: Fn(&Event) -> bool + Send + Sync + 'static,
    {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        engine.bus().on(move |event| {
            if matches(event) {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        count
    }

    fn is_processed(event: &Event) -> bool {
        matches!(event, Event::Market(MarketEvent::StockProcessed(_)))
    }

    // ============= Initialization Tests =============

    #[test]
    fn test_initialize_lists_distinct_companies() {
        let (engine, _) = engine_with(MarketConfig::default(), ClockConfig::default(), 42);
        engine.initialize(3, false).unwrap();

        let symbols = engine.symbols();
        assert_eq!(symbols.len(), 3);
        assert_ne!(symbols[0], symbols[1]);
        assert_ne!(symbols[1], symbols[2]);
        assert_eq!(engine.state(), MarketState::Idle);
        assert_eq!(engine.active_symbol(), None);
    }

    #[test]
    fn test_initialize_activates_first() {
        let (engine, _) = engine_with(MarketConfig::default(), ClockConfig::default(), 42);
        let activated = count_events(&engine, |e| {
            matches!(e, Event::Market(MarketEvent::ActiveStockProcessed(_)))
        });
        engine.initialize(3, true).unwrap();

        assert_eq!(engine.active_symbol(), Some(engine.symbols()[0].clone()));
        assert_eq!(activated.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_same_seed_same_market() {
        let (a, _) = engine_with(MarketConfig::default(), ClockConfig::default(), 42);
        let (b, _) = engine_with(MarketConfig::default(), ClockConfig::default(), 42);
        a.initialize(3, false).unwrap();
        b.initialize(3, false).unwrap();

        assert_eq!(a.symbols(), b.symbols());
        let ceilings = |engine: &MarketEngine| -> Vec<f64> {
            engine.snapshots().iter().map(|s| s.ceiling).collect()
        };
        assert_eq!(ceilings(&a), ceilings(&b));
    }

    #[test]
    fn test_seed_42_lists_recorded_market() {
        let (engine, _) = engine_with(MarketConfig::default(), ClockConfig::default(), 42);
        engine.initialize(3, false).unwrap();

        assert_eq!(engine.symbols(), vec!["T", "RFST", "JPMO"]);
        let recorded = [112.96120218348555, 75.94447502581451, 112.3295083781172];
        for (snapshot, ceiling) in engine.snapshots().iter().zip(recorded) {
            assert!(
                (snapshot.ceiling - ceiling).abs() < 1e-9,
                "{} ceiling {}",
                snapshot.symbol,
                snapshot.ceiling
            );
        }
        let first = engine.get_stock("T").unwrap();
        assert!((first.lock().unwrap().price_history()[0] - 68.83299045959815).abs() < 1e-9);
    }

    #[test]
    fn test_initialize_twice_fails() {
        let (engine, _) = engine_with(MarketConfig::default(), ClockConfig::default(), 1);
        engine.initialize(2, false).unwrap();
        assert_eq!(engine.initialize(2, false), Err(MarketError::AlreadyInitialized));
        assert_eq!(engine.stock_count(), 2);
    }

    #[test]
    fn test_initialize_too_many() {
        let (engine, _) = engine_with(MarketConfig::default(), ClockConfig::default(), 1);
        assert_eq!(
            engine.initialize(12, false),
            Err(MarketError::NotEnoughCompanies {
                requested: 12,
                available: 11
            })
        );
        assert_eq!(engine.stock_count(), 0);
    }

    #[test]
    fn test_add_stock() {
        let (engine, _) = engine_with(MarketConfig::default(), ClockConfig::default(), 1);
        let added = count_events(&engine, |e| matches!(e, Event::Market(MarketEvent::StockAdded(_))));

        let stock = engine.add_stock("ZON", "Ezon Moboil Corporation", Industry::OilAndGas).unwrap();
        assert_eq!(stock.lock().unwrap().industry(), Industry::OilAndGas);
        assert!(engine.get_stock("ZON").is_some());
        assert!(engine.get_stock("NOPE").is_none());
        assert_eq!(added.load(Ordering::SeqCst), 1);

        assert!(matches!(
            engine.add_stock("ZON", "Again", Industry::OilAndGas),
            Err(MarketError::DuplicateSymbol { .. })
        ));
    }

    // ============= Lifecycle Tests =============

    #[tokio::test(start_paused = true)]
    async fn test_full_state_cycle() {
        let (engine, log) = engine_with(one_second_ticks(), endless_day(), 3);
        engine.initialize(2, false).unwrap();
        let closed = count_events(&engine, |e| matches!(e, Event::Market(MarketEvent::Closed)));

        engine.begin_day().unwrap();
        assert_eq!(engine.state(), MarketState::DayStarted);
        assert!(log.contains("The market is open"));
        assert!(log.contains("It closes at 05:00PM"));

        // no skipping ahead
        assert_eq!(
            engine.next_day(),
            Err(MarketError::InvalidTransition {
                from: MarketState::DayStarted,
                to: MarketState::Idle
            })
        );

        engine.end_day().unwrap();
        assert_eq!(engine.state(), MarketState::DayEnded);
        assert!(log.contains("The market is now closed"));
        assert!(engine.end_day().is_err());

        engine.bus().publish(Event::Account(AccountEvent::AllPositionsClosed));
        assert_eq!(engine.state(), MarketState::Closed);
        assert_eq!(closed.load(Ordering::SeqCst), 1);

        engine.next_day().unwrap();
        assert_eq!(engine.state(), MarketState::Idle);
        engine.begin_day().unwrap();
        assert_eq!(engine.state(), MarketState::DayStarted);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_instant_day_reports_start_before_end() {
        for seed in 1..=50 {
            let clock = ClockConfig {
                day_duration_secs: 0.0,
                ..ClockConfig::default()
            };
            let (engine, _) = engine_with(MarketConfig::default(), clock, seed);
            engine.initialize(2, false).unwrap();

            let order = Arc::new(Mutex::new(Vec::new()));
            let recorder = order.clone();
            engine.bus().on(move |event| match event {
                Event::Market(MarketEvent::DayStarted) => recorder.lock().unwrap().push("started"),
                Event::Market(MarketEvent::DayEnded) => recorder.lock().unwrap().push("ended"),
                _ => {}
            });

            engine.begin_day().unwrap();
            tokio::time::timeout(Duration::from_secs(5), async {
                while order.lock().unwrap().len() < 2 {
                    tokio::time::sleep(Duration::from_millis(1)).await;
                }
            })
            .await
            .expect("day never ended");

            assert_eq!(*order.lock().unwrap(), vec!["started", "ended"]);
            assert_eq!(engine.state(), MarketState::DayEnded);
        }
    }

    #[test]
    fn test_settlement_ignored_outside_day_end() {
        let (engine, _) = engine_with(MarketConfig::default(), ClockConfig::default(), 3);
        engine.bus().publish(Event::Account(AccountEvent::AllPositionsClosed));
        assert_eq!(engine.state(), MarketState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_stock_ticks_on_its_own_timer() {
        let (engine, _) = engine_with(one_second_ticks(), endless_day(), 8);
        engine.initialize(3, false).unwrap();
        let ticks = count_events(&engine, is_processed);

        engine.begin_day().unwrap();
        tokio::time::sleep(Duration::from_millis(10_500)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 30);

        for stock in engine.stocks() {
            assert_eq!(stock.lock().unwrap().price_history().len(), 11);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_begin_day_starts_nothing() {
        let (engine, _) = engine_with(one_second_ticks(), endless_day(), 8);
        engine.initialize(3, false).unwrap();
        let ticks = count_events(&engine, is_processed);

        engine.begin_day().unwrap();
        assert_eq!(
            engine.begin_day(),
            Err(MarketError::InvalidTransition {
                from: MarketState::DayStarted,
                to: MarketState::DayStarted
            })
        );

        tokio::time::sleep(Duration::from_millis(10_500)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 30);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_tick_after_day_end() {
        let (engine, _) = engine_with(one_second_ticks(), endless_day(), 8);
        engine.initialize(3, false).unwrap();
        let ticks = count_events(&engine, is_processed);

        engine.begin_day().unwrap();
        tokio::time::sleep(Duration::from_millis(5_500)).await;
        engine.end_day().unwrap();
        let at_close = ticks.load(Ordering::SeqCst);
        assert_eq!(at_close, 15);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), at_close);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closing_bell_ends_day() {
        // 450 simulated minutes over 45 seconds
        let clock = ClockConfig {
            day_duration_secs: 45.0,
            ..ClockConfig::default()
        };
        let (engine, _) = engine_with(one_second_ticks(), clock, 8);
        engine.initialize(2, false).unwrap();
        let ticks = count_events(&engine, is_processed);
        let ended = count_events(&engine, |e| matches!(e, Event::Market(MarketEvent::DayEnded)));

        engine.begin_day().unwrap();
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(engine.state(), MarketState::DayStarted);
        assert!(engine.current_time() > engine.clock().open_time());

        tokio::time::sleep(Duration::from_secs(26)).await;
        assert_eq!(engine.state(), MarketState::DayEnded);
        assert_eq!(ended.load(Ordering::SeqCst), 1);
        assert_eq!(engine.current_time(), engine.clock().close_time());

        let at_close = ticks.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), at_close);
    }

    // ============= Active Symbol Tests =============

    #[tokio::test(start_paused = true)]
    async fn test_active_stock_events() {
        let (engine, _) = engine_with(one_second_ticks(), endless_day(), 8);
        engine.initialize(3, false).unwrap();
        let active = count_events(&engine, |e| {
            matches!(e, Event::Market(MarketEvent::ActiveStockProcessed(_)))
        });
        let cleared = count_events(&engine, |e| matches!(e, Event::Market(MarketEvent::ActiveStockCleared)));

        let symbol = engine.symbols()[1].clone();
        assert!(engine.set_active_symbol(&symbol));
        assert_eq!(active.load(Ordering::SeqCst), 1);
        assert_eq!(
            engine.active_stock().unwrap().lock().unwrap().symbol(),
            symbol.as_str()
        );

        engine.begin_day().unwrap();
        tokio::time::sleep(Duration::from_millis(3_500)).await;
        assert_eq!(active.load(Ordering::SeqCst), 4);

        engine.clear_active_symbol();
        assert_eq!(cleared.load(Ordering::SeqCst), 1);
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(active.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_unknown_active_symbol() {
        let (engine, _) = engine_with(MarketConfig::default(), ClockConfig::default(), 8);
        engine.initialize(3, true).unwrap();
        assert!(!engine.set_active_symbol("NOPE"));
        assert_eq!(engine.active_symbol(), None);
    }

    // ============= Price Effect Tests =============

    /// Three stocks over two industries, open, with ticks too slow to interfere
    fn mixed_market(seed: u64) -> Arc<MarketEngine> {
        let slow_ticks = MarketConfig {
            min_processing_secs: 1_000.0,
            max_processing_secs: 1_000.0,
            ..MarketConfig::default()
        };
        let (engine, _) = engine_with(slow_ticks, endless_day(), seed);
        engine.add_stock("AAPN", "Pineapple, Inc.", Industry::Technology).unwrap();
        engine.add_stock("GOOF", "Goofle LLC", Industry::Technology).unwrap();
        engine.add_stock("ZON", "Ezon Moboil Corporation", Industry::OilAndGas).unwrap();
        engine.begin_day().unwrap();
        engine
    }

    fn volume_samples(engine: &MarketEngine, symbol: &str) -> usize {
        engine.get_stock(symbol).unwrap().lock().unwrap().volume_history().len()
    }

    fn has_effect(engine: &MarketEngine, symbol: &str) -> bool {
        engine
            .get_stock(symbol)
            .unwrap()
            .lock()
            .unwrap()
            .external_effect()
            .is_some()
    }

    #[tokio::test(start_paused = true)]
    async fn test_effect_hits_matching_industry_then_expires() {
        let engine = mixed_market(4);
        let cleared = count_events(&engine, |e| matches!(e, Event::Market(MarketEvent::PriceEffectCleared)));

        let affected = engine.set_price_effect(PriceEffect::new(
            Industry::Technology,
            EffectDirection::Positive,
            EffectStrength::Strong,
        ));
        assert_eq!(affected, Some(2));
        assert!(has_effect(&engine, "AAPN"));
        assert!(has_effect(&engine, "GOOF"));
        assert!(!has_effect(&engine, "ZON"));

        tokio::time::sleep(Duration::from_millis(14_500)).await;
        assert!(has_effect(&engine, "AAPN"));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!has_effect(&engine, "AAPN"));
        assert!(!has_effect(&engine, "GOOF"));
        assert_eq!(cleared.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_effect_preempts_expiry() {
        let engine = mixed_market(4);
        let cleared = count_events(&engine, |e| matches!(e, Event::Market(MarketEvent::PriceEffectCleared)));

        engine.set_price_effect(PriceEffect::new(
            Industry::Technology,
            EffectDirection::Positive,
            EffectStrength::Weak,
        ));
        tokio::time::sleep(Duration::from_secs(10)).await;
        engine.set_price_effect(PriceEffect::new(
            Industry::OilAndGas,
            EffectDirection::Negative,
            EffectStrength::Strong,
        ));

        // the first timer would have fired at 15s
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(cleared.load(Ordering::SeqCst), 0);
        assert!(has_effect(&engine, "ZON"));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(cleared.load(Ordering::SeqCst), 1);
        assert!(!has_effect(&engine, "ZON"));
        assert!(!has_effect(&engine, "AAPN"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_day_end_clears_effects() {
        let engine = mixed_market(4);
        engine.set_price_effect(PriceEffect::new(
            Industry::OilAndGas,
            EffectDirection::Positive,
            EffectStrength::Strong,
        ));

        engine.end_day().unwrap();
        assert!(!has_effect(&engine, "ZON"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_retargets_every_stock() {
        let engine = mixed_market(4);
        engine.set_price_effect(PriceEffect::new(
            Industry::Technology,
            EffectDirection::Negative,
            EffectStrength::Weak,
        ));
        let zon = volume_samples(&engine, "ZON");
        let aapn = volume_samples(&engine, "AAPN");

        tokio::time::sleep(Duration::from_millis(15_500)).await;
        assert_eq!(volume_samples(&engine, "ZON"), zon + 1);
        assert_eq!(volume_samples(&engine, "AAPN"), aapn + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_effect_refused_outside_trading_day() {
        let engine = mixed_market(4);
        let applied = count_events(&engine, |e| matches!(e, Event::Market(MarketEvent::PriceEffectApplied(_))));
        engine.end_day().unwrap();

        let effect = PriceEffect::new(Industry::OilAndGas, EffectDirection::Positive, EffectStrength::Strong);
        assert_eq!(engine.set_price_effect(effect), None);
        assert!(!has_effect(&engine, "ZON"));
        assert_eq!(applied.load(Ordering::SeqCst), 0);
    }
}
