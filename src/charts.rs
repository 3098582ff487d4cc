use plotters::prelude::*;
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use crate::logger::sanitize_filename;
use crate::timeseries::AggregatedTimeSeries;

/// Cumulative allocation share per batch, stacked over arms.
/// `result[arm][batch]` is the share of arms `0..=arm` in percent,
/// so the last arm's row is 100 whenever anything was allocated.
pub fn stacked_shares(aggregated: &AggregatedTimeSeries) -> Vec<Vec<f64>> {
    let mut stacked = vec![Vec::with_capacity(aggregated.batches()); aggregated.n_bandits()];
    for batch in 0..aggregated.batches() {
        let mut running = 0.0;
        for (arm, share) in aggregated.allocation_share(batch).into_iter().enumerate() {
            running += share;
            stacked[arm].push(running);
        }
    }
    stacked
}

/// Allocation share per batch, one row per arm: `result[arm][batch]` in percent
pub fn share_lines(aggregated: &AggregatedTimeSeries) -> Vec<Vec<f64>> {
    let mut lines = vec![Vec::with_capacity(aggregated.batches()); aggregated.n_bandits()];
    for batch in 0..aggregated.batches() {
        for (arm, share) in aggregated.allocation_share(batch).into_iter().enumerate() {
            lines[arm].push(share);
        }
    }
    lines
}

/// Stacked area chart of how traffic was shared between arms as the experiment progressed
pub fn create_allocation_chart(aggregated: &AggregatedTimeSeries, title: &str, filename: &str) -> Result<(), Box<dyn Error>> {
    if aggregated.batches() == 0 {
        return Err("Cannot create allocation chart: no batches".into());
    }
    let stacked = stacked_shares(aggregated);

    let root = BitMapBackend::new(filename, (1000, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 25))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(1f64..aggregated.batches().max(2) as f64, 0f64..100f64)?;

    chart.configure_mesh()
        .x_desc("Batch")
        .y_desc("Cumulative allocation share (%)")
        .draw()?;

    // Highest band first so every lower band is painted over it
    for arm in (0..stacked.len()).rev() {
        let color = Palette99::pick(arm).mix(0.8);
        let points: Vec<(f64, f64)> = stacked[arm].iter().enumerate().map(|(b, &s)| ((b + 1) as f64, s)).collect();
        chart.draw_series(AreaSeries::new(points, 0.0, color.filled()).border_style(&BLACK))?
            .label(format!("Arm {}", arm))
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }

    chart.configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// One line per arm with its share of the traffic allocated so far
pub fn create_allocation_line_chart(aggregated: &AggregatedTimeSeries, title: &str, filename: &str) -> Result<(), Box<dyn Error>> {
    if aggregated.batches() == 0 {
        return Err("Cannot create allocation line chart: no batches".into());
    }
    let lines = share_lines(aggregated);

    let root = BitMapBackend::new(filename, (1000, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 25))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(1f64..aggregated.batches().max(2) as f64, 0f64..100f64)?;

    chart.configure_mesh()
        .x_desc("Batch")
        .y_desc("Allocation share (%)")
        .draw()?;

    for (arm, shares) in lines.iter().enumerate() {
        let color = Palette99::pick(arm).to_rgba();
        let points: Vec<(f64, f64)> = shares.iter().enumerate().map(|(b, &s)| ((b + 1) as f64, s)).collect();
        chart.draw_series(LineSeries::new(points, color.stroke_width(2)))?
            .label(format!("Arm {}", arm))
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    }

    chart.configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Line chart of the cumulative reward of every policy
pub fn create_gain_chart(results: &[(&str, &AggregatedTimeSeries)], title: &str, filename: &str) -> Result<(), Box<dyn Error>> {
    let batches = results.iter().map(|(_, r)| r.batches()).max().unwrap_or(0);
    if batches == 0 {
        return Err("Cannot create gain chart: no batches".into());
    }
    let max_gain = results
        .iter()
        .flat_map(|(_, r)| r.gains())
        .fold(0.0, f64::max);
    let y_max = if max_gain > 0.0 { max_gain * 1.05 } else { 1.0 };

    let root = BitMapBackend::new(filename, (1000, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 25))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(1f64..batches.max(2) as f64, 0f64..y_max)?;

    chart.configure_mesh()
        .x_desc("Batch")
        .y_desc("Average cumulative successes")
        .draw()?;

    for (index, (label, aggregated)) in results.iter().enumerate() {
        let color = Palette99::pick(index).to_rgba();
        let points: Vec<(f64, f64)> = aggregated.gains().into_iter().enumerate().map(|(b, g)| ((b + 1) as f64, g)).collect();
        chart.draw_series(LineSeries::new(points, color.stroke_width(2)))?
            .label(*label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    }

    chart.configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Render every chart of a scenario under `charts/<scenario>/`
///
/// # Arguments
/// * `scenario_name` - Name of the scenario (for the output directory)
/// * `results` - (policy short name, averaged series) for every variant
pub fn render_scenario_charts(scenario_name: &str, results: &[(&str, &AggregatedTimeSeries)]) -> Result<Vec<PathBuf>, Box<dyn Error>> {
    let dir = PathBuf::from("charts").join(sanitize_filename(scenario_name));
    fs::create_dir_all(&dir)?;

    let mut written = Vec::with_capacity(2 * results.len() + 1);
    for (label, aggregated) in results {
        let path = dir.join(format!("allocation-{}.png", sanitize_filename(label)));
        create_allocation_chart(aggregated, &format!("{} allocation share", label), &path.to_string_lossy())?;
        written.push(path);

        let path = dir.join(format!("allocation-lines-{}.png", sanitize_filename(label)));
        create_allocation_line_chart(aggregated, &format!("{} allocation share per arm", label), &path.to_string_lossy())?;
        written.push(path);
    }
    let path = dir.join("gains.png");
    create_gain_chart(results, &format!("{} cumulative successes", scenario_name), &path.to_string_lossy())?;
    written.push(path);
    Ok(written)
}
