//! Unit tests for Stock - price bounds, trend regimes and external effects.

#[cfg(test)]
mod stock_tests {
    use crate::constants::stock::*;
    use crate::market::{EffectDirection, EffectStrength, Industry, PriceEffect, PriceQuote, Stock};
    use crate::random::{ConstantRandom, RandomSource, SeededRandom};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Plays back a fixed list of unit draws, then repeats the fallback.
    struct ScriptedRandom {
        script: Mutex<VecDeque<f64>>,
        fallback: f64,
    }

    impl ScriptedRandom {
        fn new(script: &[f64], fallback: f64) -> Self {
            Self {
                script: Mutex::new(script.iter().copied().collect()),
                fallback,
            }
        }
    }

    impl RandomSource for ScriptedRandom {
        fn next_unit(&self) -> f64 {
            self.script.lock().unwrap().pop_front().unwrap_or(self.fallback)
        }

        fn next_u64(&self) -> u64 {
            0
        }
    }

    fn stock_with(rng: Arc<dyn RandomSource>) -> Stock {
        Stock::new("AAPN", "Pineapple, Inc.", Industry::Technology, rng)
    }

    fn assert_in_bounds(stock: &Stock) {
        let price = stock.current_price();
        assert!(price >= MINIMUM_PRICE, "price {} below floor", price);
        assert!(
            price <= stock.ceiling() + ABOVE_CEILING_MARGIN,
            "price {} above ceiling {}",
            price,
            stock.ceiling()
        );
        let volume = stock.current_volume();
        assert!((0.0..=VOLUME_MAX_VALUE).contains(&volume), "volume {}", volume);
        let trend = stock.current_trend();
        assert!((-1.0..=1.0).contains(&trend), "trend {}", trend);
    }

    // ============= Creation Tests =============

    #[test]
    fn test_new_stock_starts_approaching() {
        let stock = stock_with(Arc::new(ConstantRandom(0.5)));

        assert_eq!(stock.ceiling(), 112.5);
        assert_eq!(stock.current_price(), 56.25);
        assert_eq!(stock.current_price_change(), 0.0);
        assert_eq!(stock.current_volume(), 50.0);
        assert_eq!(stock.current_trend(), 0.0);
        assert_eq!(stock.target_approach_delay(), 11);
        assert_eq!(stock.price_history().len(), 1);
        assert_eq!(stock.volume_history().len(), 1);
        assert_eq!(stock.trend_history().len(), 1);
        assert!(stock.external_effect().is_none());
    }

    #[test]
    fn test_initial_price_respects_floor() {
        // ceiling 149.625, raw first sample 0.748
        let stock = stock_with(Arc::new(ConstantRandom(0.995)));
        assert_eq!(stock.current_price(), MINIMUM_PRICE);
        assert_in_bounds(&stock);
    }

    #[test]
    fn test_ceiling_drawn_from_upper_half() {
        for seed in 1..50 {
            let stock = stock_with(Arc::new(SeededRandom::new(seed)));
            assert!(stock.ceiling() >= CEILING_MAX_VALUE / 2.0);
            assert!(stock.ceiling() <= CEILING_MAX_VALUE);
        }
    }

    #[test]
    fn test_snapshot_and_quote() {
        let stock = stock_with(Arc::new(ConstantRandom(0.5)));
        let snapshot = stock.snapshot();
        assert_eq!(snapshot.symbol, "AAPN");
        assert_eq!(snapshot.company_name, "Pineapple, Inc.");
        assert_eq!(snapshot.industry, Industry::Technology);
        assert_eq!(snapshot.price, stock.current_price());
        assert_eq!(snapshot.ceiling, stock.ceiling());

        let quote = stock.quote();
        assert_eq!(PriceQuote::symbol(&quote), "AAPN");
        assert_eq!(quote.current_price(), 56.25);
    }

    // ============= Tick Tests =============

    #[test]
    fn test_bounds_hold_over_many_ticks() {
        for seed in [1, 7, 42, 1234] {
            let mut stock = stock_with(Arc::new(SeededRandom::new(seed)));
            for _ in 0..2_000 {
                stock.process();
                assert_in_bounds(&stock);
            }
        }
    }

    #[test]
    fn test_bounds_hold_under_effects() {
        let mut stock = stock_with(Arc::new(SeededRandom::new(99)));
        let effects = [
            PriceEffect::new(Industry::Technology, EffectDirection::Positive, EffectStrength::Strong),
            PriceEffect::new(Industry::Technology, EffectDirection::Negative, EffectStrength::Strong),
            PriceEffect::new(Industry::Technology, EffectDirection::Positive, EffectStrength::Weak),
            PriceEffect::new(Industry::Technology, EffectDirection::Negative, EffectStrength::Weak),
        ];
        for effect in effects {
            stock.set_external_effect(effect);
            for _ in 0..500 {
                stock.process();
                assert_in_bounds(&stock);
            }
            stock.clear_external_effect();
        }
    }

    #[test]
    fn test_histories_only_grow() {
        let mut stock = stock_with(Arc::new(SeededRandom::new(5)));
        let mut last_len = stock.price_history().len();
        for _ in 0..100 {
            stock.process();
            assert_eq!(stock.price_history().len(), last_len + 1);
            last_len = stock.price_history().len();
            assert_eq!(stock.volume_history().len(), stock.trend_history().len());
        }
    }

    #[test]
    fn test_approach_moves_a_fraction_per_tick() {
        // ceiling 75, price 37.5, delay 8, volume 50, trend 0.5 -> target 62.5
        let rng = ScriptedRandom::new(&[0.0, 0.5, 0.0, 0.5, 0.75], 0.0);
        let mut stock = stock_with(Arc::new(rng));
        assert_eq!(stock.price_target(), 62.5);

        stock.process();
        assert_eq!(stock.current_price(), 40.625);
        assert_eq!(stock.current_price_change(), 3.125);
        stock.process();
        assert_eq!(stock.current_price(), 43.75);

        // still on the same approach
        assert_eq!(stock.volume_history().len(), 1);
        assert_eq!(stock.price_target(), 62.5);
    }

    #[test]
    fn test_arrival_retargets() {
        // flat target: the first tick arrives immediately
        let mut stock = stock_with(Arc::new(ConstantRandom(0.5)));
        stock.process();

        assert_eq!(stock.volume_history().len(), 2);
        assert_eq!(stock.trend_history().len(), 2);
        assert!((stock.current_price() - 56.3).abs() < 1e-9);
    }

    // ============= Trend Regime Tests =============

    #[test]
    fn test_mid_range_trend_gains_momentum() {
        // ceiling 75, price 37.5, delay 8, volume 0, trend 0.5 -> flat target
        // then on arrival: delay 8, volume 10, nudge 0.5 * 0.2
        let rng = ScriptedRandom::new(&[0.0, 0.5, 0.0, 0.0, 0.75, 0.0, 0.0, 0.1, 0.5], 0.0);
        let mut stock = stock_with(Arc::new(rng));
        assert_eq!(stock.current_trend(), 0.5);

        stock.process();
        assert!((stock.current_trend() - 0.6).abs() < 1e-9);
        assert_eq!(stock.current_volume(), 10.0);
        assert!((stock.price_target() - 43.5).abs() < 1e-9);
    }

    #[test]
    fn test_near_ceiling_forces_pull_back() {
        // ceiling 75 and price 75
        let mut stock = stock_with(Arc::new(ConstantRandom(0.0)));
        assert_eq!(stock.ceiling(), 75.0);
        assert_eq!(stock.current_price(), 75.0);

        stock.process();
        assert_eq!(stock.current_trend(), -1.0);
        assert_eq!(stock.target_approach_delay(), TARGET_APPROACH_DELAY_MAX);
    }

    #[test]
    fn test_approach_delay_range() {
        for seed in 1..30 {
            let mut stock = stock_with(Arc::new(SeededRandom::new(seed)));
            for _ in 0..50 {
                stock.process();
                let delay = stock.target_approach_delay();
                assert!((TARGET_APPROACH_DELAY_MIN..=TARGET_APPROACH_DELAY_MAX).contains(&delay));
            }
        }
    }

    // ============= External Effect Tests =============

    #[test]
    fn test_strong_positive_effect_trend() {
        for seed in 1..20 {
            let mut stock = stock_with(Arc::new(SeededRandom::new(seed)));
            stock.set_external_effect(PriceEffect::new(
                Industry::Technology,
                EffectDirection::Positive,
                EffectStrength::Strong,
            ));
            stock.process();

            let trend = stock.current_trend();
            assert!((TREND_STRONG..=1.0).contains(&trend), "trend {}", trend);
            assert!(stock.current_volume() >= VOLUME_MAX_VALUE / 2.0);
        }
    }

    #[test]
    fn test_weak_negative_effect_trend() {
        for seed in 1..20 {
            let mut stock = stock_with(Arc::new(SeededRandom::new(seed)));
            stock.set_external_effect(PriceEffect::new(
                Industry::Technology,
                EffectDirection::Negative,
                EffectStrength::Weak,
            ));

            let trend = stock.current_trend();
            assert!((-TREND_STRONG..=-TREND_WEAK).contains(&trend), "trend {}", trend);
            let volume = stock.current_volume();
            assert!((VOLUME_MAX_VALUE / 3.0..=VOLUME_MAX_VALUE / 2.0).contains(&volume));
        }
    }

    #[test]
    fn test_setting_effect_retargets_immediately() {
        let mut stock = stock_with(Arc::new(SeededRandom::new(3)));
        let effect = PriceEffect::new(Industry::Technology, EffectDirection::Positive, EffectStrength::Strong);
        stock.set_external_effect(effect);

        assert_eq!(stock.external_effect(), Some(effect));
        assert_eq!(stock.volume_history().len(), 2);
        assert_eq!(stock.price_history().len(), 1);
    }

    #[test]
    fn test_clear_without_effect_only_retargets() {
        let mut stock = stock_with(Arc::new(SeededRandom::new(11)));
        stock.process();
        let prices = stock.price_history().len();
        let volumes = stock.volume_history().len();
        let trends = stock.trend_history().len();

        stock.clear_external_effect();

        assert_eq!(stock.price_history().len(), prices);
        assert_eq!(stock.volume_history().len(), volumes + 1);
        assert_eq!(stock.trend_history().len(), trends + 1);
        assert!(stock.external_effect().is_none());
    }
}
