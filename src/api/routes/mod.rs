pub mod descriptors;
pub mod groups;
pub mod health;
pub mod history;
