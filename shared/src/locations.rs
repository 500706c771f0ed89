use super::models::Location;

/// Stations sampled on every snapshot, in write order.
pub fn roster() -> Vec<Location> {
    vec![
        Location::new("BKK", 13.729984, 100.536443),
        Location::new("Chiangmai", 18.840633, 98.969661),
        Location::new("Khonkaen", 16.445329, 102.835251),
        Location::new("Rayong", 12.671521, 101.275875),
        Location::new("Saraburi", 14.685833, 100.871996),
        Location::new("Surat", 9.126057, 99.325355),
    ]
}
