//! Feature preprocessing
//!
//! Scaling is the only preprocessing step the sonar pipeline needs: every
//! feature is already a numeric band energy in [0, 1], so there is no
//! imputation or encoding stage. The fitted scaler is stored inside the model
//! artifact and reapplied verbatim at inference time.

mod scaler;

pub use scaler::{Scaler, ScalerKind};
