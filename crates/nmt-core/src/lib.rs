pub mod eval;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod search;
pub mod settings;
pub mod text;
pub mod vocab;
