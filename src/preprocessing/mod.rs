mod standard_scaler;

pub use standard_scaler::{ScalerError, StandardScaler};
