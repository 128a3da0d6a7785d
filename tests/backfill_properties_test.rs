use chrono::{Days, NaiveDate};
use tachograph::config::{EstimatorConfig, PricingConfig};
use tachograph::estimator::{ChargeEstimator, ChargeInputs, ChargePowerModel, LinearTaperModel};
use tachograph::reconcile::{Checkpoint, assign_odometers, plan_backfill};
use tachograph::record::RecordBuilder;
use tachograph::units::{kwh_to_wh, parse_tracking_date};
use tachograph::vehicle::{ChargeSession, ChargeType, DailyStat, VehicleSnapshot};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 7, 15).unwrap()
}

/// `n` contiguous days ending today, with varying distances
fn window(n: u64) -> Vec<DailyStat> {
    (0..n)
        .map(|i| {
            let date = today().checked_sub_days(Days::new(i)).unwrap();
            let distance = ((i * 37) % 90) as f64 + 0.3;
            DailyStat::new(date, distance, distance * 160.0)
        })
        .collect()
}

#[test]
fn odometers_match_current_minus_more_recent_distances() {
    for n in [1, 2, 7, 30] {
        let mut stats = window(n);
        // Order of the input must not matter
        stats.reverse();
        assign_odometers(&mut stats, 50_000.0);

        let mut more_recent = 0.0;
        let mut previous = f64::INFINITY;
        for day in &stats {
            let odo = day.odometer_km.unwrap();
            assert!((odo - (50_000.0 - more_recent)).abs() < 1e-6);
            assert!(odo <= previous);
            previous = odo;
            more_recent += day.distance_km;
        }
    }
}

#[test]
fn nothing_at_or_before_checkpoint_is_planned() {
    for offset in 2..10 {
        let cp = Checkpoint {
            date: today().checked_sub_days(Days::new(offset)).unwrap(),
            odometer_km: 0.0,
        };
        let plan = plan_backfill(window(14), 50_000.0, Some(&cp), today());
        assert_eq!(plan.len() as u64, offset - 1);
        assert!(plan.iter().all(|d| d.date > cp.date && d.date < today()));
        assert!(plan.windows(2).all(|w| w[0].date < w[1].date));
    }
}

#[test]
fn without_checkpoint_all_days_before_today_are_planned() {
    for n in [1, 2, 5, 31] {
        let plan = plan_backfill(window(n), 50_000.0, None, today());
        assert_eq!(plan.len() as u64, n - 1);
    }
}

#[test]
fn estimator_reference_case() {
    let cfg = EstimatorConfig {
        capacity_kwh: 70.0,
        ..EstimatorConfig::default()
    };
    let session = LinearTaperModel::new(&cfg).estimate(&ChargeInputs {
        battery_pct: 50.0,
        ac_limit_pct: 80.0,
        dc_limit_pct: 100.0,
        minutes_to_full: 60.0,
        is_charging: true,
    });
    assert_eq!(session.charge_type, ChargeType::Dc);
    assert_eq!(session.power_kw, 35.0);
}

#[test]
fn estimator_not_charging_is_always_idle() {
    let mut estimator = ChargeEstimator::from_config(&EstimatorConfig::default());
    for battery_pct in [0.0, 20.0, 50.0, 99.0] {
        for minutes in [0.0, 15.0, 600.0] {
            let snapshot = VehicleSnapshot {
                odometer_km: 1.0,
                battery_pct,
                charge_limit_ac_pct: 80.0,
                charge_limit_dc_pct: 90.0,
                minutes_to_full: minutes,
                is_charging: false,
                engine_running: false,
                last_updated: today().and_hms_opt(8, 0, 0).unwrap(),
            };
            assert_eq!(estimator.update(&snapshot), ChargeSession::idle());
        }
    }
}

#[test]
fn zero_energy_day_reports_zero_consumption() {
    let day = DailyStat::new(today(), 12.0, 0.0);
    let record = RecordBuilder::new(PricingConfig::default()).build(
        &day,
        &[],
        ChargeSession::idle(),
        80.0,
    );
    assert_eq!(record.bc_consumption, 0.0);
}

#[test]
fn record_converts_back_within_rounding() {
    let builder = RecordBuilder::new(PricingConfig::default());
    let mut stats = window(20);
    assign_odometers(&mut stats, 50_000.0);
    for day in &stats {
        let record = builder.build(day, &[], ChargeSession::idle(), 50.0);
        assert_eq!(parse_tracking_date(&record.date).unwrap(), day.date);
        assert!((record.trip - day.distance_km).abs() <= 0.05 + 1e-9);
        assert!((kwh_to_wh(record.quantity) - day.total_consumed_wh).abs() <= 50.0 + 1e-6);
    }
}
