pub mod i18n;
pub mod pii;
pub mod models;

pub use i18n::{Language, Localized};
pub use pii::Masked;
