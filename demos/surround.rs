use admgain::{GainCalculator, Layout, LayoutName, ObjectMetadata, PolarPosition, Position};

fn main() {
    let mut calc = GainCalculator::new(Layout::from_catalog(LayoutName::Surround0_5_0).unwrap()).unwrap();

    // rotate around
    for azi in [-180, -90, 0, 90, 180] {
        let metadata = ObjectMetadata::point_source(Position::Polar(PolarPosition::new(azi as f64, 0.0, 1.0)), 1.0, 0.0);
        let (direct, _) = calc.calculate_gains(&metadata).unwrap();
        let active: Vec<_> = direct.iter().enumerate().filter(|(_, &g)| g > 0.01).collect();
        println!("azi={azi:4}: {active:?}");
    }
}
