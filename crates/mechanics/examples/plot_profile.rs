use gearcore::GearSpec;
use mechanics::profile::{Polyline, ProfileFidelity, ProfileResolution, generator_for, pitch_circle};
use plotters::prelude::*;

fn closed(polyline: &Polyline, dx: f64) -> Vec<(f64, f64)> {
    polyline
        .iter()
        .chain(polyline.first())
        .map(|p| (p.x + dx, p.y))
        .collect()
}

fn draw_pair(
    filename: &str,
    title: &str,
    fidelity: ProfileFidelity,
    a: &GearSpec,
    b: &GearSpec,
) -> Result<(), Box<dyn std::error::Error>> {
    let generator = generator_for(fidelity, ProfileResolution::default());
    let centre_distance = (a.pitch_diameter() + b.pitch_diameter()) / 2.0;

    let x_min = -a.outer_radius() * 1.1;
    let x_max = centre_distance + b.outer_radius() * 1.1;
    let half_height = a.outer_radius().max(b.outer_radius()) * 1.1;

    let root = BitMapBackend::new(filename, (1200, 700)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("Arial", 28))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, -half_height..half_height)?;

    chart.configure_mesh().x_desc("x").y_desc("y").draw()?;

    for (spec, dx, colour) in [(a, 0.0, &BLUE), (b, centre_distance, &RED)] {
        let profile = generator.build_profile(spec);
        chart
            .draw_series(LineSeries::new(closed(&profile.outer, dx), colour))?
            .label(format!("{} teeth", spec.teeth))
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], colour.filled()));
        chart.draw_series(LineSeries::new(closed(&profile.bore, dx), colour))?;
        chart.draw_series(LineSeries::new(
            closed(&pitch_circle(spec, 96), dx),
            BLACK.mix(0.3),
        ))?;
    }

    chart.configure_series_labels().border_style(&BLACK).draw()?;

    root.present()?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let pinion = GearSpec::new(12, 4.0, 20.0, 5.0, 8.0);
    let wheel = GearSpec::new(24, 4.0, 20.0, 5.0, 12.0);

    draw_pair(
        "involute_pair.png",
        "Involute profile, 12/24 teeth",
        ProfileFidelity::Involute,
        &pinion,
        &wheel,
    )?;
    draw_pair(
        "trapezoid_pair.png",
        "Trapezoid profile, 12/24 teeth",
        ProfileFidelity::Trapezoid,
        &pinion,
        &wheel,
    )?;

    println!("Wrote plots: involute_pair.png, trapezoid_pair.png");
    Ok(())
}
