pub mod classifier;
pub mod confirmation;
pub mod dispatcher;
pub mod gesture;
pub mod landmark;
pub mod scheduler;
