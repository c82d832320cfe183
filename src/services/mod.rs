pub mod extractor;
pub mod page_source;
pub mod snapshot;
pub mod sync;

pub use extractor::*;
pub use page_source::*;
pub use snapshot::*;
pub use sync::*;
