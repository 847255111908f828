use geo::Point;

/// One validated record of a geographic point and its metric.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthRecord {
    pub latitude: f64,
    pub longitude: f64,
    pub region: String,
    pub health_metric: f64,
    pub additional_info: Option<String>,
}

impl HealthRecord {
    /// Position in (x = longitude, y = latitude) order.
    pub fn position(&self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }
}
