use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid coordinates: lat {latitude}, lon {longitude}")]
    InvalidCoordinates { latitude: f64, longitude: f64 },
    #[error("invalid bus line: {0:?}")]
    InvalidBusLine(String),
    #[error("occupancy level out of range 0..=4: {0}")]
    InvalidOccupancyLevel(u8),
    #[error("no destinations configured")]
    NoDestinations,
    #[error("state lock poisoned")]
    StateLock,
}
