pub mod donations;
pub mod health;
