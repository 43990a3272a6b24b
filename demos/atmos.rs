use admgain::{GainCalculator, Layout, LayoutName, ObjectMetadata, PolarPosition, Position};

fn main() {
    let layout = Layout::from_catalog(LayoutName::FourPlusNinePlusZero).unwrap();
    println!("speakers: {}", layout.n_ch());
    let mut calc = GainCalculator::new(layout).unwrap();

    // elevated source
    let metadata = ObjectMetadata::point_source(Position::Polar(PolarPosition::new(45.0, 30.0, 1.0)), 1.0, 0.0);
    let (direct, _) = calc.calculate_gains(&metadata).unwrap();
    let active: Vec<_> = direct.iter().enumerate().filter(|(_, &g)| g > 0.01).collect();
    println!("active speakers: {active:?}");
}
