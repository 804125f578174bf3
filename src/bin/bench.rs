//! Benchmark for travel time lookups and chain mutation throughput.
//!
//! Run with: cargo run --release --bin bench

use chrono::{NaiveDate, TimeDelta};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use route_chain::{
    console, BoundingBox, DistanceMode, DistanceProvider, GeoPoint, HardSoftScore, Haversine,
    Route, RoutingConfig, RoutingPlan, Stop, TimeWindow,
};
use std::error::Error;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

const SEED: u64 = 0;
const ROUTES: usize = 6;
const STOPS: usize = 500;
const MOVES: usize = 200_000;

const VEHICLE_NAMES: [&str; 6] = ["Alpha", "Bravo", "Charlie", "Delta", "Echo", "Foxtrot"];

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("route_chain=info".parse()?))
        .init();

    console::print_banner();
    let run_start = Instant::now();
    let config = RoutingConfig::default();
    let mut rng = StdRng::seed_from_u64(SEED);

    let plan = generate(&mut rng, &config)?;
    let locations = plan.locations();
    console::print_config(plan.routes().len(), plan.stops().len(), locations.len());

    // On-demand: every lookup recomputes the great circle
    let mut timer = console::BenchTimer::start("OnDemand");
    let mut checksum = 0i64;
    for from in &locations {
        for to in &locations {
            checksum += Haversine.travel_seconds(from, to);
            timer.record_op();
        }
    }
    timer.finish();

    let build_start = Instant::now();
    plan.prepare_distances(config.distance_mode);
    info!(
        entries = plan.distances().matrix_len(),
        elapsed_ms = build_start.elapsed().as_millis() as u64,
        "Distances prepared"
    );

    let mut timer = console::BenchTimer::start("Matrix");
    let mut matrix_checksum = 0i64;
    for from in &locations {
        for to in &locations {
            matrix_checksum += plan.travel_seconds(from, to);
            timer.record_op();
        }
    }
    timer.finish();
    if checksum != matrix_checksum {
        return Err(format!(
            "matrix disagrees with on-demand: {} != {}",
            matrix_checksum, checksum
        )
        .into());
    }

    let mut plan = plan;
    for stop in 0..plan.stops().len() {
        let route = stop % ROUTES;
        let position = plan.routes()[route].len();
        plan.move_stop(stop, route, position)?;
    }
    console::print_score("Initial score", score(&plan));

    let mut timer = console::BenchTimer::start("MoveStop");
    for _ in 0..MOVES {
        let stop = rng.gen_range(0..plan.stops().len());
        let to_route = rng.gen_range(0..ROUTES);
        let mut len = plan.routes()[to_route].len();
        if plan.stop(stop).and_then(|s| s.route_idx()) == Some(to_route) {
            len -= 1;
        }
        let position = rng.gen_range(0..=len);
        plan.move_stop(stop, to_route, position)?;
        timer.record_op();
    }
    timer.finish();

    let consistent = match plan.check_invariants() {
        Ok(()) => true,
        Err(violation) => {
            tracing::error!(%violation, "Chain invariants broken");
            false
        }
    };

    plan.prepare_distances(DistanceMode::OnDemand);
    console::print_summary(run_start.elapsed(), score(&plan), consistent);
    Ok(())
}

/// Hard: capacity excess plus late minutes. Soft: driving seconds.
fn score(plan: &RoutingPlan) -> HardSoftScore {
    let excess: i64 = plan
        .route_views()
        .map(|r| i64::from(r.excess_demand()))
        .sum();
    HardSoftScore::of(
        -(excess + plan.total_late_minutes()),
        -plan.total_travel_seconds(),
    )
}

/// Random stops around Philadelphia with restaurant-style morning windows.
fn generate(rng: &mut StdRng, config: &RoutingConfig) -> Result<RoutingPlan, Box<dyn Error>> {
    let area = BoundingBox::new(
        GeoPoint::new(39.7656099067391, -76.83782328143754),
        GeoPoint::new(40.77636644354855, -74.9300739430771),
    )?;
    let (sw, ne) = (area.south_west(), area.north_east());
    let random_point = |rng: &mut StdRng| {
        GeoPoint::new(
            rng.gen_range(sw.latitude..ne.latitude),
            rng.gen_range(sw.longitude..ne.longitude),
        )
    };

    let day = NaiveDate::from_ymd_opt(2025, 1, 6).ok_or("invalid date")?;
    let departure = day.and_time(config.default_departure);

    let routes = (0..ROUTES)
        .map(|i| {
            let depot = random_point(rng);
            Route::new(i, VEHICLE_NAMES[i], 200, depot, departure)
        })
        .collect();

    let mut stops = Vec::with_capacity(STOPS);
    for i in 0..STOPS {
        let open = departure + TimeDelta::hours(rng.gen_range(0..4));
        let window = TimeWindow::new(open, open + TimeDelta::hours(4))?;
        let stop = Stop::new(i, format!("Customer {}", i), random_point(rng))
            .with_demand(rng.gen_range(1..=10))
            .with_time_window(window)
            .with_service_duration(TimeDelta::minutes(rng.gen_range(5..=30)));
        stops.push(stop);
    }

    Ok(RoutingPlan::new("bench", stops, routes)?.with_bounds(area))
}
