pub mod docmap;
pub mod manuscript;
pub mod submission_form;

pub use docmap::*;
pub use manuscript::*;
pub use submission_form::*;
