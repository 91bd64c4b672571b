pub mod display;
pub mod response;
pub mod result_set;

pub use display::{
    ChartKind, DISPLAY_ARTIFACT_SCHEMA_VERSION, DisplayArtifact, TextTone, json_schema,
};
pub use response::{
    CommandFailure, Failure, FailureCode, FailureResponse, RESPONSE_SCHEMA_VERSION, Response,
    ResponseMeta, Warning, WarningCode,
};
pub use result_set::{CellValue, Column, ResultSet, SemanticType};
