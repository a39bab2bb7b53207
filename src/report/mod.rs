//! Report rendering.

pub mod generator;

pub use generator::{
    format_stat, generate_agreement_markdown, generate_json_report, generate_significance_markdown,
    RenderOptions,
};
