//! Storage service providers

pub mod generic;
pub mod google_drive;
pub mod onedrive;

pub use generic::GenericResolver;
pub use google_drive::GoogleDriveResolver;
pub use onedrive::{OneDriveResolver, OneDriveTokens};
