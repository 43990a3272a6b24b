use admgain::{GainCalculator, Layout, LayoutName, ObjectMetadata, PolarPosition, Position};

fn main() {
    let mut calc = GainCalculator::new(Layout::from_catalog(LayoutName::Stereo0_2_0).unwrap()).unwrap();

    // pan left
    let metadata = ObjectMetadata::point_source(Position::Polar(PolarPosition::new(30.0, 0.0, 1.0)), 1.0, 0.0);
    let (direct, _) = calc.calculate_gains(&metadata).unwrap();
    println!("L={:.2} R={:.2}", direct[0], direct[1]);

    // pan center
    let metadata = ObjectMetadata::point_source(Position::Polar(PolarPosition::new(0.0, 0.0, 1.0)), 1.0, 0.0);
    let (direct, _) = calc.calculate_gains(&metadata).unwrap();
    println!("L={:.2} R={:.2}", direct[0], direct[1]);
}
