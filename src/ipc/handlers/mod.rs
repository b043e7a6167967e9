pub mod analytics;
pub mod comments;
pub mod core;
pub mod exports;
pub mod grading;
pub mod roster;
pub mod rubric;
pub mod split;
