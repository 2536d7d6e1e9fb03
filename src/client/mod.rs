//! Browser-side half of the service: collect the form, post it to
//! `/analyze-page`, and render whatever comes back.

pub mod input;
pub mod render;
pub mod submit;

pub use input::{FileUpload, FormValues, InputSource, Payload, PageQuery};
pub use render::{ConsoleSink, OutputSink, RecordingSink, Rendered};
pub use submit::{SubmitError, Submitter};
