//! Result-set to chart decision engine.
//!
//! [`classifier`] buckets columns, [`selector`] picks one chart strategy
//! from an ordered rule list, [`renderer`] binds the chosen columns to
//! Vega-Lite channels, and [`pipeline`] composes the three.

pub mod classifier;
pub mod pipeline;
pub mod renderer;
pub mod selector;

pub use classifier::{ColumnProfile, classify};
pub use pipeline::{PREVIEW_ROWS, PipelineOutput, ResultPipeline, run};
pub use renderer::{BUBBLE_MAX_MARKER_SIZE, MalformedChartSpec, render};
pub use selector::{ChartSpec, ChartStrategy, ColorEncoding, TooltipField, select};
