pub mod alert;
pub mod settings;

pub use alert::{Alert, AlertStatus, LabelSet};
pub use settings::Settings;
