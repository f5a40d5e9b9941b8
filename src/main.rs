use std::time::Instant;

use log::info;

use tour_route_core::{
    Planner, Report, Result, RouteOptions, TourInput, logging,
    optimizer::{CommandOptimizer, RouteOptimizer},
    utils,
};

fn main() -> Result<()> {
    let now = Instant::now();
    let options = RouteOptions::from_args()?;
    logging::init_logger(&options)?;
    info!("options: {options}");

    let input = TourInput::read(&options)?;
    let optimizer = options.optimizer_path().map(CommandOptimizer::new);
    let cancel = utils::shutdown_token();

    let planner = Planner::from_options(&options)?.with_catalog(&input.catalog);
    let plans = planner.plan_all(
        &input.routes,
        optimizer.as_ref().map(|o| o as &dyn RouteOptimizer),
        &cancel,
    );

    let report = Report::build(plans, &options);
    report.write(&options)?;

    info!(
        "output: tours={} failed={} time={:.2}s",
        report.tours.len(),
        report.failed_count(),
        now.elapsed().as_secs_f32()
    );

    Ok(())
}
